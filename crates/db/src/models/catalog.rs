//! Scene catalog rows (`scene_<alg>.cat`, `meta`).

use sarcmp_core::ident::{Ident, QualifiedName};
use sarcmp_core::landcover::OrbitDirection;
use sarcmp_core::partition::TimeRange;
use sarcmp_core::types::AcquisitionTime;
use serde::Serialize;
use sqlx::FromRow;

use crate::error::DbError;

/// A product resolved against one algorithm's scene catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedProduct {
    pub algorithm: Ident,
    /// `scene_<alg>`
    pub scene: Ident,
    pub product: Ident,
    pub pid: i64,
    /// Raster band indices of the two configured bands.
    pub band_indices: [i32; 2],
}

impl ResolvedProduct {
    /// Raster table `scene_<alg>.<product>`.
    pub fn raster(&self) -> QualifiedName {
        QualifiedName::new(self.scene.clone(), self.product.clone())
    }
}

/// Earliest and latest acquisition of one product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow, Serialize)]
pub struct CatalogRange {
    pub first: Option<AcquisitionTime>,
    pub last: Option<AcquisitionTime>,
}

impl CatalogRange {
    /// Convert to a [`TimeRange`]; `None` when the product has no scenes.
    pub fn to_range(&self) -> Result<Option<TimeRange>, DbError> {
        match (self.first, self.last) {
            (Some(first), Some(last)) => {
                Ok(Some(TimeRange::new(first.and_utc(), last.and_utc())?))
            }
            _ => Ok(None),
        }
    }
}

/// One row of the `meta` table.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct OrbitRow {
    pub fdate: AcquisitionTime,
    pub orbitdirection: Option<String>,
}

impl OrbitRow {
    pub fn direction(&self) -> Option<OrbitDirection> {
        self.orbitdirection
            .as_deref()
            .and_then(OrbitDirection::from_meta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32) -> AcquisitionTime {
        NaiveDate::from_ymd_opt(2020, 1, day)
            .unwrap()
            .and_hms_opt(6, 30, 0)
            .unwrap()
    }

    #[test]
    fn empty_catalog_has_no_range() {
        let range = CatalogRange {
            first: None,
            last: None,
        };
        assert_eq!(range.to_range().unwrap(), None);
    }

    #[test]
    fn catalog_bounds_become_utc_range() {
        let range = CatalogRange {
            first: Some(at(1)),
            last: Some(at(31)),
        }
        .to_range()
        .unwrap()
        .unwrap();
        assert_eq!(range.start().naive_utc(), at(1));
        assert_eq!(range.end().naive_utc(), at(31));
    }

    #[test]
    fn orbit_row_parses_direction() {
        let row = OrbitRow {
            fdate: at(3),
            orbitdirection: Some("ASCENDING".into()),
        };
        assert_eq!(row.direction(), Some(OrbitDirection::Ascending));

        let unknown = OrbitRow {
            fdate: at(3),
            orbitdirection: None,
        };
        assert_eq!(unknown.direction(), None);
    }
}
