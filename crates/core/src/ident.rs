//! SQL identifier allow-list and the persisted schema/table naming convention.
//!
//! Every schema, table and column name that reaches a statement string goes
//! through [`Ident`]. Values (dates, band names, counts, coordinates) are
//! always bound parameters and never pass through here.
//!
//! The schema layout is a public contract consumed by the plotting tools:
//!
//! | Stage        | Schema                      | Table                              |
//! |--------------|-----------------------------|------------------------------------|
//! | base POI     | `landcover_poi`             | `<class>`                          |
//! | drawn sample | `sample[_<slope>]`          | `<class>`                          |
//! | extraction   | `result_<alg>[_<slope>]`    | `<product>_<class>`                |
//! | error stats  | `error[_<slope>]`           | `<product>_<class>[_<orbit>]`      |
//! | timeline     | `timeline[_<slope>]`        | `<product>_<class>[_<orbit>]`      |

use std::fmt;

use serde::Serialize;

use crate::error::CoreError;
use crate::landcover::{OrbitFilter, SlopeBucket};

/// PostgreSQL truncates identifiers beyond this many bytes.
pub const MAX_IDENT_LEN: usize = 63;

/// A validated SQL identifier: `^[a-z][a-z0-9_]*$`, at most 63 bytes.
///
/// `Display` renders the double-quoted form, ready for interpolation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Ident(String);

impl Ident {
    pub fn new(raw: &str) -> Result<Self, CoreError> {
        let valid = !raw.is_empty()
            && raw.len() <= MAX_IDENT_LEN
            && raw.starts_with(|c: char| c.is_ascii_lowercase())
            && raw
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
        if valid {
            Ok(Self(raw.to_string()))
        } else {
            Err(CoreError::InvalidIdentifier(raw.to_string()))
        }
    }

    /// Validate after lowercasing, for user input such as `S1_GRD`.
    pub fn normalized(raw: &str) -> Result<Self, CoreError> {
        Self::new(&raw.trim().to_ascii_lowercase())
    }

    /// Append `_<suffix>` and re-validate the result.
    pub fn suffixed(&self, suffix: &str) -> Result<Self, CoreError> {
        Self::new(&format!("{}_{suffix}", self.0))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The allow-list excludes '"', so no escaping is needed.
        write!(f, "\"{}\"", self.0)
    }
}

/// A schema-qualified table name, rendered as `"schema"."table"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct QualifiedName {
    pub schema: Ident,
    pub table: Ident,
}

impl QualifiedName {
    pub fn new(schema: Ident, table: Ident) -> Self {
        Self { schema, table }
    }

    /// Sibling table in the same schema, used for build-then-swap.
    pub fn staging(&self, tag: &str) -> Result<Self, CoreError> {
        // Leave room for the tag within the identifier limit.
        let budget = MAX_IDENT_LEN.saturating_sub(tag.len() + 6);
        let base: String = self.table.as_str().chars().take(budget).collect();
        Ok(Self {
            schema: self.schema.clone(),
            table: Ident::new(&format!("{base}__stg_{tag}"))?,
        })
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

// ---------------------------------------------------------------------------
// Naming convention
// ---------------------------------------------------------------------------

/// Schema holding the base land-cover points of interest.
pub const POI_SCHEMA: &str = "landcover_poi";

fn with_slope(base: &str, slope: Option<SlopeBucket>) -> Result<Ident, CoreError> {
    match slope {
        Some(bucket) => Ident::new(&format!("{base}_{}", bucket.as_str())),
        None => Ident::new(base),
    }
}

/// `landcover_poi.<class>`
pub fn poi_table(class: &Ident) -> Result<QualifiedName, CoreError> {
    Ok(QualifiedName::new(Ident::new(POI_SCHEMA)?, class.clone()))
}

/// `sample[_<slope>].<class>`
pub fn sample_table(class: &Ident, slope: Option<SlopeBucket>) -> Result<QualifiedName, CoreError> {
    Ok(QualifiedName::new(with_slope("sample", slope)?, class.clone()))
}

/// `result_<alg>[_<slope>].<product>_<class>`
pub fn result_table(
    algorithm: &Ident,
    product: &Ident,
    class: &Ident,
    slope: Option<SlopeBucket>,
) -> Result<QualifiedName, CoreError> {
    let schema = with_slope(&format!("result_{}", algorithm.as_str()), slope)?;
    Ok(QualifiedName::new(schema, product.suffixed(class.as_str())?))
}

fn aggregate_table(
    schema_base: &str,
    product: &Ident,
    class: &Ident,
    slope: Option<SlopeBucket>,
    orbit: OrbitFilter,
) -> Result<QualifiedName, CoreError> {
    let schema = with_slope(schema_base, slope)?;
    let mut table = product.suffixed(class.as_str())?;
    if let Some(direction) = orbit.direction() {
        table = table.suffixed(direction.table_suffix())?;
    }
    Ok(QualifiedName::new(schema, table))
}

/// `error[_<slope>].<product>_<class>[_<orbit>]`
pub fn error_table(
    product: &Ident,
    class: &Ident,
    slope: Option<SlopeBucket>,
    orbit: OrbitFilter,
) -> Result<QualifiedName, CoreError> {
    aggregate_table("error", product, class, slope, orbit)
}

/// `timeline[_<slope>].<product>_<class>[_<orbit>]`
pub fn timeline_table(
    product: &Ident,
    class: &Ident,
    slope: Option<SlopeBucket>,
    orbit: OrbitFilter,
) -> Result<QualifiedName, CoreError> {
    aggregate_table("timeline", product, class, slope, orbit)
}

/// `scene_<alg>` -- the catalog schema written by the ingestion tooling.
pub fn scene_schema(algorithm: &Ident) -> Result<Ident, CoreError> {
    Ident::new(&format!("scene_{}", algorithm.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landcover::OrbitDirection;
    use assert_matches::assert_matches;

    fn id(s: &str) -> Ident {
        Ident::new(s).unwrap()
    }

    // -----------------------------------------------------------------------
    // Allow-list
    // -----------------------------------------------------------------------

    #[test]
    fn accepts_snake_case() {
        assert_eq!(id("s1_grd").as_str(), "s1_grd");
    }

    #[test]
    fn renders_quoted() {
        assert_eq!(id("forest").to_string(), "\"forest\"");
    }

    #[test]
    fn rejects_injection_attempt() {
        assert_matches!(
            Ident::new("forest; DROP TABLE meta"),
            Err(CoreError::InvalidIdentifier(_))
        );
    }

    #[test]
    fn rejects_quote_and_uppercase() {
        assert!(Ident::new("for\"est").is_err());
        assert!(Ident::new("Forest").is_err());
    }

    #[test]
    fn rejects_leading_digit_and_empty() {
        assert!(Ident::new("1forest").is_err());
        assert!(Ident::new("").is_err());
    }

    #[test]
    fn rejects_overlong() {
        assert!(Ident::new(&"a".repeat(MAX_IDENT_LEN)).is_ok());
        assert!(Ident::new(&"a".repeat(MAX_IDENT_LEN + 1)).is_err());
    }

    #[test]
    fn normalized_lowercases_product_names() {
        assert_eq!(Ident::normalized("S1_GRD").unwrap().as_str(), "s1_grd");
    }

    // -----------------------------------------------------------------------
    // Naming convention
    // -----------------------------------------------------------------------

    #[test]
    fn poi_and_sample_tables() {
        let forest = id("forest");
        assert_eq!(
            poi_table(&forest).unwrap().to_string(),
            "\"landcover_poi\".\"forest\""
        );
        assert_eq!(
            sample_table(&forest, None).unwrap().to_string(),
            "\"sample\".\"forest\""
        );
        assert_eq!(
            sample_table(&forest, Some(SlopeBucket::Steep)).unwrap().to_string(),
            "\"sample_steep\".\"forest\""
        );
    }

    #[test]
    fn result_table_layout() {
        let name = result_table(&id("gamma"), &id("s1_grd"), &id("forest"), Some(SlopeBucket::Flat))
            .unwrap();
        assert_eq!(name.schema.as_str(), "result_gamma_flat");
        assert_eq!(name.table.as_str(), "s1_grd_forest");
    }

    #[test]
    fn aggregate_tables_take_orbit_suffix() {
        let product = id("s1_grd");
        let class = id("grassland");
        let both = error_table(&product, &class, None, OrbitFilter::Both).unwrap();
        assert_eq!(both.to_string(), "\"error\".\"s1_grd_grassland\"");

        let asc = timeline_table(
            &product,
            &class,
            Some(SlopeBucket::Flat),
            OrbitFilter::Only(OrbitDirection::Ascending),
        )
        .unwrap();
        assert_eq!(asc.schema.as_str(), "timeline_flat");
        assert_eq!(asc.table.as_str(), "s1_grd_grassland_ascending");
    }

    #[test]
    fn staging_name_fits_identifier_limit() {
        let long = QualifiedName::new(id("error"), id(&"x".repeat(MAX_IDENT_LEN)));
        let staging = long.staging("0123abcd").unwrap();
        assert!(staging.table.as_str().len() <= MAX_IDENT_LEN);
        assert!(staging.table.as_str().ends_with("__stg_0123abcd"));
        assert_eq!(staging.schema, long.schema);
    }
}
