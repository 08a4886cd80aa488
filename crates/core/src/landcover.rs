//! Land-cover classes, study regions, slope buckets and orbit filters.
//!
//! Region definitions describe where each class's polygons live in the
//! `ancillary` schema and how densely they are sampled. The figures below
//! are the values the Fiji and Alps analyses were run with.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::CoreError;
use crate::ident::Ident;

// ---------------------------------------------------------------------------
// Slope buckets
// ---------------------------------------------------------------------------

/// Terrain-steepness stratum, in degrees of the DEM slope raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SlopeBucket {
    Flat,
    Steep,
}

impl SlopeBucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Flat => "flat",
            Self::Steep => "steep",
        }
    }

    /// Inclusive `(min, max)` slope range in degrees.
    pub fn bounds(&self) -> (f64, f64) {
        match self {
            Self::Flat => (0.0, 15.0),
            Self::Steep => (20.0, 1000.0),
        }
    }

    /// Parse the CLI form, where an empty string means "no bucket".
    pub fn parse_optional(value: &str) -> Result<Option<Self>, CoreError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(None),
            "flat" => Ok(Some(Self::Flat)),
            "steep" => Ok(Some(Self::Steep)),
            other => Err(CoreError::Validation(format!(
                "Unknown slope bucket '{other}' (expected flat, steep or empty)"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Orbit direction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrbitDirection {
    Ascending,
    Descending,
}

impl OrbitDirection {
    /// Value stored in `meta.orbitdirection`.
    pub fn meta_value(&self) -> &'static str {
        match self {
            Self::Ascending => "ASCENDING",
            Self::Descending => "DESCENDING",
        }
    }

    pub fn table_suffix(&self) -> &'static str {
        match self {
            Self::Ascending => "ascending",
            Self::Descending => "descending",
        }
    }

    /// Parse a `meta.orbitdirection` value; anything unrecognised is `None`.
    pub fn from_meta(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "ASCENDING" => Some(Self::Ascending),
            "DESCENDING" => Some(Self::Descending),
            _ => None,
        }
    }
}

/// Optional orbit-direction restriction on the aggregation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum OrbitFilter {
    #[default]
    Both,
    Only(OrbitDirection),
}

impl OrbitFilter {
    pub fn direction(&self) -> Option<OrbitDirection> {
        match self {
            Self::Both => None,
            Self::Only(d) => Some(*d),
        }
    }

    /// Whether a scene with the given orbit passes the filter.
    pub fn admits(&self, orbit: Option<OrbitDirection>) -> bool {
        match self {
            Self::Both => true,
            Self::Only(d) => orbit == Some(*d),
        }
    }
}

impl FromStr for OrbitFilter {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "both" => Ok(Self::Both),
            "ascending" => Ok(Self::Only(OrbitDirection::Ascending)),
            "descending" => Ok(Self::Only(OrbitDirection::Descending)),
            other => Err(CoreError::Validation(format!(
                "Unknown orbit filter '{other}' (expected both, ascending or descending)"
            ))),
        }
    }
}

impl fmt::Display for OrbitFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Both => f.write_str("both"),
            Self::Only(d) => f.write_str(d.table_suffix()),
        }
    }
}

// ---------------------------------------------------------------------------
// Regions and class definitions
// ---------------------------------------------------------------------------

/// How a region's polygon table encodes the land-cover class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassCodes {
    /// Integer identifiers in the class column.
    Ids(&'static [i32]),
    /// Text codes (e.g. CORINE `code_18`).
    Codes(&'static [&'static str]),
}

/// Where a polygon's area comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AreaSource {
    /// `ST_Area(<geometry>)` in the layer's projected units.
    Computed,
    /// A precomputed attribute column.
    Column(&'static str),
}

/// Sampling parameters for one land-cover class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassDefinition {
    pub name: &'static str,
    pub codes: ClassCodes,
    /// Area units per generated point.
    pub density: f64,
    /// Polygons must be strictly larger than this to be sampled.
    pub min_area: f64,
    /// Upper bound on points generated inside a single polygon.
    pub max_cap: i32,
}

/// A class derived from another class's points by spatial intersection
/// with a zone layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivedClass {
    pub name: &'static str,
    pub parent: &'static str,
    pub zone_schema: &'static str,
    pub zone_table: &'static str,
    pub zone_column: &'static str,
    pub zone_value: i32,
}

/// A study region: where its polygons live and how each class is sampled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub name: &'static str,
    pub polygon_schema: &'static str,
    pub polygon_table: &'static str,
    pub geom_column: &'static str,
    pub class_column: &'static str,
    pub area: AreaSource,
    pub slope_schema: &'static str,
    pub slope_table: &'static str,
    pub classes: &'static [ClassDefinition],
    pub derived: &'static [DerivedClass],
}

/// Default per-polygon point cap shared by both regions.
pub const DEFAULT_MAX_CAP: i32 = 10_000;

pub const FIJI: Region = Region {
    name: "fiji",
    polygon_schema: "ancillary",
    polygon_table: "fiji_32760",
    geom_column: "geom",
    class_column: "id",
    area: AreaSource::Computed,
    slope_schema: "ancillary",
    slope_table: "dem_slope",
    classes: &[
        ClassDefinition {
            name: "forest",
            codes: ClassCodes::Ids(&[1, 15]),
            density: 10_000.0,
            min_area: 100_000.0,
            max_cap: DEFAULT_MAX_CAP,
        },
        ClassDefinition {
            name: "grassland",
            codes: ClassCodes::Ids(&[2]),
            density: 10_000.0,
            min_area: 100_000.0,
            max_cap: DEFAULT_MAX_CAP,
        },
        ClassDefinition {
            name: "cultivated",
            codes: ClassCodes::Ids(&[3, 16, 23, 25, 27]),
            density: 10_000.0,
            min_area: 100_000.0,
            max_cap: DEFAULT_MAX_CAP,
        },
        // Smaller plantations are oversampled.
        ClassDefinition {
            name: "sugarcane",
            codes: ClassCodes::Ids(&[6]),
            density: 1_000.0,
            min_area: 1_000.0,
            max_cap: DEFAULT_MAX_CAP,
        },
        ClassDefinition {
            name: "coconut",
            codes: ClassCodes::Ids(&[7, 12]),
            density: 1_000.0,
            min_area: 1_000.0,
            max_cap: DEFAULT_MAX_CAP,
        },
    ],
    // Forest inside the moist rainfall zone is taken as evergreen.
    derived: &[DerivedClass {
        name: "evergreen",
        parent: "forest",
        zone_schema: "ancillary",
        zone_table: "rainfall_zone",
        zone_column: "dn",
        zone_value: 3,
    }],
};

pub const ALPS: Region = Region {
    name: "alps",
    polygon_schema: "ancillary",
    polygon_table: "clc2018_clc2018_v2018_20b",
    geom_column: "shape",
    class_column: "code_18",
    area: AreaSource::Column("area_ha"),
    slope_schema: "ancillary",
    slope_table: "dem_slope",
    classes: &[ClassDefinition {
        name: "forest",
        // CORINE broad-leaved, coniferous and mixed forest.
        codes: ClassCodes::Codes(&["311", "312", "313"]),
        density: 5.0,
        min_area: 15.0,
        max_cap: DEFAULT_MAX_CAP,
    }],
    derived: &[],
};

pub const REGIONS: &[Region] = &[FIJI, ALPS];

impl Region {
    pub fn by_name(name: &str) -> Result<&'static Region, CoreError> {
        let wanted = name.trim().to_ascii_lowercase();
        REGIONS
            .iter()
            .find(|r| r.name == wanted)
            .ok_or_else(|| CoreError::NotFound(format!("region '{name}'")))
    }

    pub fn class(&self, name: &str) -> Result<&ClassDefinition, CoreError> {
        self.classes
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| CoreError::UnknownClass {
                region: self.name,
                class: name.to_string(),
            })
    }

    /// Every class name this region produces, derived classes included.
    pub fn class_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.classes
            .iter()
            .map(|c| c.name)
            .chain(self.derived.iter().map(|d| d.name))
    }
}

/// Union of the class names all regions produce.
pub fn known_classes() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = REGIONS.iter().flat_map(|r| r.class_names()).collect();
    names.sort_unstable();
    names.dedup();
    names
}

/// Split requested class names into known identifiers and skipped names.
///
/// Unknown classes are not an error: the caller logs and skips them.
pub fn resolve_classes(requested: &[String]) -> (Vec<Ident>, Vec<String>) {
    let known = known_classes();
    let mut accepted: Vec<Ident> = Vec::new();
    let mut skipped = Vec::new();

    for name in requested {
        let normalized = name.trim().to_ascii_lowercase();
        match Ident::new(&normalized) {
            Ok(ident) if known.contains(&normalized.as_str()) => {
                if !accepted.contains(&ident) {
                    accepted.push(ident);
                }
            }
            _ => skipped.push(name.clone()),
        }
    }

    (accepted, skipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn slope_bucket_parsing() {
        assert_eq!(SlopeBucket::parse_optional("").unwrap(), None);
        assert_eq!(
            SlopeBucket::parse_optional("Flat").unwrap(),
            Some(SlopeBucket::Flat)
        );
        assert_eq!(
            SlopeBucket::parse_optional("steep").unwrap(),
            Some(SlopeBucket::Steep)
        );
        assert!(SlopeBucket::parse_optional("hilly").is_err());
    }

    #[test]
    fn slope_buckets_do_not_overlap() {
        let (_, flat_max) = SlopeBucket::Flat.bounds();
        let (steep_min, _) = SlopeBucket::Steep.bounds();
        assert!(flat_max < steep_min);
    }

    #[test]
    fn orbit_filter_parsing_is_case_insensitive() {
        assert_eq!("both".parse::<OrbitFilter>().unwrap(), OrbitFilter::Both);
        assert_eq!(
            "ASCENDING".parse::<OrbitFilter>().unwrap(),
            OrbitFilter::Only(OrbitDirection::Ascending)
        );
        assert_matches!("sideways".parse::<OrbitFilter>(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn orbit_filter_admits() {
        let asc = OrbitFilter::Only(OrbitDirection::Ascending);
        assert!(asc.admits(Some(OrbitDirection::Ascending)));
        assert!(!asc.admits(Some(OrbitDirection::Descending)));
        assert!(!asc.admits(None));
        assert!(OrbitFilter::Both.admits(None));
    }

    #[test]
    fn region_lookup() {
        assert_eq!(Region::by_name("Fiji").unwrap().name, "fiji");
        assert_matches!(Region::by_name("mars"), Err(CoreError::NotFound(_)));
        assert_matches!(
            FIJI.class("tundra"),
            Err(CoreError::UnknownClass { region: "fiji", .. })
        );
    }

    #[test]
    fn oversampled_classes() {
        assert_eq!(FIJI.class("sugarcane").unwrap().density, 1_000.0);
        assert_eq!(FIJI.class("forest").unwrap().min_area, 100_000.0);
    }

    #[test]
    fn every_class_name_is_a_valid_identifier() {
        for name in known_classes() {
            assert!(Ident::new(name).is_ok(), "{name}");
        }
    }

    #[test]
    fn resolve_classes_skips_unknown_and_dedups() {
        let requested = vec![
            "forest".to_string(),
            "Grassland".to_string(),
            "forest".to_string(),
            "tundra".to_string(),
            "x; drop".to_string(),
        ];
        let (accepted, skipped) = resolve_classes(&requested);
        let names: Vec<&str> = accepted.iter().map(|i| i.as_str()).collect();
        assert_eq!(names, vec!["forest", "grassland"]);
        assert_eq!(skipped, vec!["tundra".to_string(), "x; drop".to_string()]);
    }

    #[test]
    fn evergreen_is_known_through_derivation() {
        assert!(known_classes().contains(&"evergreen"));
    }
}
