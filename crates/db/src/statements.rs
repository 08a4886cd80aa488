//! SQL statement builders.
//!
//! Only validated [`Ident`]s and [`QualifiedName`]s are interpolated, always
//! in their double-quoted form. Every value is a `$n` placeholder; the
//! doc comment of each builder lists the bind order the repository must
//! follow.

use sarcmp_core::error::CoreError;
use sarcmp_core::ident::{Ident, QualifiedName};
use sarcmp_core::landcover::{AreaSource, DerivedClass, Region};

/// Column holding the geometry in every table this pipeline writes.
pub const GEOM: &str = "geom";

/// Scene metadata table written by the ingestion tooling.
pub const META_TABLE: &str = "meta";

fn region_table(schema: &str, table: &str) -> Result<QualifiedName, CoreError> {
    Ok(QualifiedName::new(Ident::new(schema)?, Ident::new(table)?))
}

fn area_expression(region: &Region) -> Result<String, CoreError> {
    Ok(match region.area {
        AreaSource::Computed => format!("ST_Area(p.{})", Ident::new(region.geom_column)?),
        AreaSource::Column(column) => format!("p.{}", Ident::new(column)?),
    })
}

// ---------------------------------------------------------------------------
// Schema management
// ---------------------------------------------------------------------------

pub fn create_schema(schema: &Ident) -> String {
    format!("CREATE SCHEMA IF NOT EXISTS {schema}")
}

pub fn drop_table(table: &QualifiedName) -> String {
    format!("DROP TABLE IF EXISTS {table}")
}

pub fn rename_table(from: &QualifiedName, to: &Ident) -> String {
    format!("ALTER TABLE {from} RENAME TO {to}")
}

pub fn create_gist_index(table: &QualifiedName) -> String {
    format!("CREATE INDEX ON {table} USING GIST ({GEOM})")
}

// ---------------------------------------------------------------------------
// Land-cover points of interest
// ---------------------------------------------------------------------------

/// Random points inside the class polygons of `region`, with DEM slope.
///
/// Binds: `$1` class codes (`integer[]` or `text[]`), `$2` density,
/// `$3` per-polygon cap, `$4` minimum area.
pub fn generate_poi(region: &Region, staging: &QualifiedName) -> Result<String, CoreError> {
    let polygons = region_table(region.polygon_schema, region.polygon_table)?;
    let slope = region_table(region.slope_schema, region.slope_table)?;
    let geom = Ident::new(region.geom_column)?;
    let class_column = Ident::new(region.class_column)?;
    let area = area_expression(region)?;

    Ok(format!(
        "CREATE TABLE {staging} AS \
         WITH polys AS ( \
             SELECT ({area})::double precision AS area, p.{geom} AS geom \
             FROM {polygons} p \
             WHERE p.{class_column} = ANY($1) \
         ), \
         pts AS ( \
             SELECT area, \
                    (ST_Dump(ST_GeneratePoints(geom, LEAST(FLOOR(area / $2), $3)::integer))).geom AS geom \
             FROM polys \
             WHERE area > $4 AND FLOOR(area / $2) >= 1 AND $3 >= 1 \
         ) \
         SELECT pts.area, pts.geom, ST_NearestValue(s.rast, 1, pts.geom) AS slope \
         FROM pts \
         JOIN {slope} s ON ST_Intersects(s.rast, pts.geom)"
    ))
}

/// Areas of every polygon of one class, for planning point counts.
///
/// Binds: `$1` class codes.
pub fn polygon_areas(region: &Region) -> Result<String, CoreError> {
    let polygons = region_table(region.polygon_schema, region.polygon_table)?;
    let class_column = Ident::new(region.class_column)?;
    let area = area_expression(region)?;
    Ok(format!(
        "SELECT ({area})::double precision FROM {polygons} p WHERE p.{class_column} = ANY($1)"
    ))
}

/// Points of the parent class that fall inside the derivation zone.
///
/// Binds: `$1` zone value.
pub fn derive_poi(
    derived: &DerivedClass,
    parent: &QualifiedName,
    staging: &QualifiedName,
) -> Result<String, CoreError> {
    let zone = region_table(derived.zone_schema, derived.zone_table)?;
    let zone_column = Ident::new(derived.zone_column)?;
    Ok(format!(
        "CREATE TABLE {staging} AS \
         SELECT p.area, p.geom, p.slope \
         FROM {parent} p \
         WHERE EXISTS ( \
             SELECT 1 FROM {zone} z \
             WHERE z.{zone_column} = $1 AND ST_Intersects(p.geom, z.geom) \
         )"
    ))
}

// ---------------------------------------------------------------------------
// Drawn samples
// ---------------------------------------------------------------------------

/// Random subset of the base points.
///
/// Binds: `$1` sample limit; then, if `with_aoi`, `xmin ymin xmax ymax`
/// as doubles and the target EPSG; then, if `with_slope`, slope min and max.
pub fn draw_sample(
    poi: &QualifiedName,
    staging: &QualifiedName,
    with_aoi: bool,
    with_slope: bool,
) -> String {
    let mut filters: Vec<String> = Vec::new();
    let mut next = 2;
    if with_aoi {
        filters.push(format!(
            "ST_Intersects(geom, ST_Transform(ST_MakeEnvelope(${}, ${}, ${}, ${}, 4326), ${}))",
            next,
            next + 1,
            next + 2,
            next + 3,
            next + 4
        ));
        next += 5;
    }
    if with_slope {
        filters.push(format!("slope >= ${} AND slope <= ${}", next, next + 1));
    }

    let where_clause = if filters.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", filters.join(" AND "))
    };

    format!(
        "CREATE TABLE {staging} AS \
         SELECT area, geom, slope FROM {poi}{where_clause} \
         ORDER BY RANDOM() LIMIT $1"
    )
}

// ---------------------------------------------------------------------------
// Scene catalog
// ---------------------------------------------------------------------------

/// Binds: `$1` lowercase product name.
pub fn find_product(scene: &Ident) -> String {
    format!("SELECT id::bigint FROM {scene}.\"product\" WHERE lower(name) = $1 ORDER BY id LIMIT 1")
}

/// Binds: `$1` product id, `$2` lowercase band name.
pub fn find_band(scene: &Ident) -> String {
    format!(
        "SELECT idx::integer FROM {scene}.\"band\" WHERE pid = $1 AND lower(name) = $2 \
         ORDER BY idx LIMIT 1"
    )
}

/// Binds: `$1` product id.
pub fn catalog_range(scene: &Ident) -> String {
    format!("SELECT MIN(fdate), MAX(fdate) FROM {scene}.\"cat\" WHERE pid = $1")
}

pub fn orbit_directions() -> String {
    format!("SELECT fdate, orbitdirection FROM \"{META_TABLE}\"")
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

pub fn create_result_table(table: &QualifiedName, bands: &[Ident; 2]) -> String {
    let [first, second] = bands;
    format!(
        "CREATE TABLE {table} ( \
             fdate TIMESTAMP NOT NULL, \
             {GEOM} GEOMETRY NOT NULL, \
             {first} DOUBLE PRECISION NOT NULL, \
             {second} DOUBLE PRECISION NOT NULL \
         )"
    )
}

/// Values of both bands at the pixel under every sample point, for every
/// scene of one product inside one time window.
///
/// A pixel holding its band's no-data value reads as NULL and the point is
/// dropped for that scene. Falling back to a neighbouring pixel would store
/// values the point never had.
///
/// `end_operator` must come from [`Task::end_operator`](sarcmp_core::partition::Task::end_operator).
///
/// Binds: `$1` product id, `$2` first band index, `$3` second band index,
/// `$4` window start, `$5` window end.
pub fn extract_window(
    destination: &QualifiedName,
    scene: &Ident,
    raster: &QualifiedName,
    sample: &QualifiedName,
    bands: &[Ident; 2],
    end_operator: &str,
) -> String {
    let [first, second] = bands;
    format!(
        "INSERT INTO {destination} (fdate, {GEOM}, {first}, {second}) \
         WITH cat AS ( \
             SELECT fid, fdate FROM {scene}.\"cat\" \
             WHERE pid = $1 AND fdate >= $4 AND fdate {end_operator} $5 \
         ), \
         tile AS ( \
             SELECT cat.fdate, lc.geom, \
                    ST_Value(s.rast, $2, lc.geom, true) AS v1, \
                    ST_Value(s.rast, $3, lc.geom, true) AS v2 \
             FROM {raster} s \
             JOIN cat ON s.fid = cat.fid \
             JOIN {sample} lc ON ST_Intersects(s.rast, lc.geom) \
         ) \
         SELECT fdate, geom, v1, v2 FROM tile \
         WHERE v1 IS NOT NULL AND v2 IS NOT NULL \
         ORDER BY fdate"
    )
}

/// Binds: none.
pub fn select_extraction(table: &QualifiedName, bands: &[Ident; 2]) -> String {
    let [first, second] = bands;
    format!(
        "SELECT fdate, ST_AsText({GEOM}) AS geom, \
                {first}::double precision AS first, {second}::double precision AS second \
         FROM {table} ORDER BY fdate, geom"
    )
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Names of the stored statistic columns, e.g. `gamma_vv_mean`.
#[derive(Debug, Clone)]
pub struct StatColumns {
    /// `[algorithm][band]` -> (mean, stddev)
    pub per_algorithm: [[(Ident, Ident); 2]; 2],
    /// `[band]` -> (mean, stddev) of the difference
    pub error: [(Ident, Ident); 2],
    /// `[band]` -> rmse
    pub rmse: [Ident; 2],
}

impl StatColumns {
    pub fn new(algorithms: &[Ident; 2], bands: &[Ident; 2]) -> Result<Self, CoreError> {
        let pair = |prefix: String| -> Result<(Ident, Ident), CoreError> {
            Ok((
                Ident::new(&format!("{prefix}_mean"))?,
                Ident::new(&format!("{prefix}_stddev"))?,
            ))
        };
        let per_band = |alg: &Ident| -> Result<[(Ident, Ident); 2], CoreError> {
            Ok([
                pair(format!("{}_{}", alg.as_str(), bands[0].as_str()))?,
                pair(format!("{}_{}", alg.as_str(), bands[1].as_str()))?,
            ])
        };
        Ok(Self {
            per_algorithm: [per_band(&algorithms[0])?, per_band(&algorithms[1])?],
            error: [
                pair(format!("{}_error", bands[0].as_str()))?,
                pair(format!("{}_error", bands[1].as_str()))?,
            ],
            rmse: [
                Ident::new(&format!("{}_rmse", bands[0].as_str()))?,
                Ident::new(&format!("{}_rmse", bands[1].as_str()))?,
            ],
        })
    }
}

/// Joined pairs of both algorithms' extraction records.
///
/// With `with_orbit`, binds `$1` orbit direction as stored in `meta`.
fn joined_pairs(
    first: &QualifiedName,
    second: &QualifiedName,
    bands: &[Ident; 2],
    date_expr: &str,
    with_orbit: bool,
) -> String {
    let [b0, b1] = bands;
    let orbit_filter = if with_orbit {
        format!(
            " WHERE EXISTS ( \
                 SELECT 1 FROM \"{META_TABLE}\" m \
                 WHERE m.fdate = a.fdate AND upper(trim(m.orbitdirection)) = $1 \
             )"
        )
    } else {
        String::new()
    };
    format!(
        "SELECT {date_expr} AS fdate, ST_AsText(a.{GEOM}) AS geom, \
                a.{b0} AS a0, a.{b1} AS a1, b.{b0} AS c0, b.{b1} AS c1 \
         FROM {first} a \
         JOIN {second} b ON a.fdate = b.fdate AND ST_Equals(a.{GEOM}, b.{GEOM}){orbit_filter}"
    )
}

fn per_algorithm_columns(columns: &StatColumns) -> String {
    let mut out = Vec::new();
    for (alg, source) in [("a", 0), ("c", 1)] {
        for band in 0..2 {
            let (mean, stddev) = &columns.per_algorithm[source][band];
            out.push(format!("AVG({alg}{band}) AS {mean}"));
            out.push(format!("STDDEV({alg}{band}) AS {stddev}"));
        }
    }
    out.join(", ")
}

/// Per-geometry error statistics.
///
/// Binds: `$1` orbit direction when `with_orbit`.
pub fn create_error_table(
    staging: &QualifiedName,
    first: &QualifiedName,
    second: &QualifiedName,
    bands: &[Ident; 2],
    columns: &StatColumns,
    with_orbit: bool,
) -> String {
    let pairs = joined_pairs(first, second, bands, "a.fdate", with_orbit);
    let stats = per_algorithm_columns(columns);
    let errors: Vec<String> = (0..2)
        .map(|band| {
            let (mean, stddev) = &columns.error[band];
            format!("AVG(a{band} - c{band}) AS {mean}, STDDEV(a{band} - c{band}) AS {stddev}")
        })
        .collect();
    format!(
        "CREATE TABLE {staging} AS \
         WITH pts AS ({pairs}) \
         SELECT geom, COUNT(*) AS samples, {stats}, {errors} \
         FROM pts GROUP BY geom",
        errors = errors.join(", ")
    )
}

/// Per-day statistics and RMSE, ordered by date.
///
/// Binds: `$1` orbit direction when `with_orbit`.
pub fn create_timeline_table(
    staging: &QualifiedName,
    first: &QualifiedName,
    second: &QualifiedName,
    bands: &[Ident; 2],
    columns: &StatColumns,
    with_orbit: bool,
) -> String {
    let pairs = joined_pairs(first, second, bands, "DATE(a.fdate)", with_orbit);
    let stats = per_algorithm_columns(columns);
    let rmse: Vec<String> = (0..2)
        .map(|band| {
            let column = &columns.rmse[band];
            format!("SQRT(AVG(POWER(a{band} - c{band}, 2))) AS {column}")
        })
        .collect();
    format!(
        "CREATE TABLE {staging} AS \
         WITH pts AS ({pairs}) \
         SELECT fdate, COUNT(*) AS samples, {stats}, {rmse} \
         FROM pts GROUP BY fdate ORDER BY fdate",
        rmse = rmse.join(", ")
    )
}

fn stored_stat_aliases(columns: &StatColumns) -> String {
    let mut out = Vec::new();
    for (prefix, source) in [("f", 0), ("s", 1)] {
        for band in 0..2 {
            let (mean, stddev) = &columns.per_algorithm[source][band];
            out.push(format!("{mean} AS {prefix}{band}_mean"));
            out.push(format!("{stddev} AS {prefix}{band}_stddev"));
        }
    }
    out.join(", ")
}

/// Read back a stored error table with fixed column aliases.
pub fn select_error_table(table: &QualifiedName, columns: &StatColumns) -> String {
    let stats = stored_stat_aliases(columns);
    let (e0_mean, e0_stddev) = &columns.error[0];
    let (e1_mean, e1_stddev) = &columns.error[1];
    format!(
        "SELECT geom, samples, {stats}, \
                {e0_mean} AS d0_mean, {e0_stddev} AS d0_stddev, \
                {e1_mean} AS d1_mean, {e1_stddev} AS d1_stddev \
         FROM {table} ORDER BY geom"
    )
}

/// Read back a stored timeline table with fixed column aliases.
pub fn select_timeline_table(table: &QualifiedName, columns: &StatColumns) -> String {
    let stats = stored_stat_aliases(columns);
    let [r0, r1] = &columns.rmse;
    format!(
        "SELECT fdate, samples, {stats}, {r0} AS r0, {r1} AS r1 \
         FROM {table} ORDER BY fdate"
    )
}
