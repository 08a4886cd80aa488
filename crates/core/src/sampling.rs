//! Sample-point planning: how many points each land-cover polygon receives,
//! and the filters applied when drawing an analysis sample.
//!
//! Point placement itself happens in PostGIS (`ST_GeneratePoints`); this
//! module owns the deterministic part so it can be checked in isolation.

use serde::Serialize;

use crate::error::CoreError;
use crate::landcover::{ClassDefinition, SlopeBucket};

/// Number of points generated inside a polygon of `area` for `class`.
///
/// `min(floor(area / density), max_cap)`, or 0 when the polygon does not
/// exceed the class's minimum area.
pub fn points_for_polygon(area: f64, class: &ClassDefinition) -> u32 {
    if !(area > class.min_area) || class.density <= 0.0 {
        return 0;
    }
    let raw = (area / class.density).floor();
    raw.min(class.max_cap.max(0) as f64) as u32
}

/// Outcome of planning point generation over a set of polygons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SamplePlan {
    pub polygons: usize,
    pub qualifying: usize,
    pub per_polygon: Vec<u32>,
    pub total_points: u64,
}

/// Plan point counts for every polygon area of one class.
///
/// No qualifying polygon is a valid, empty plan.
pub fn plan_samples(areas: &[f64], class: &ClassDefinition) -> SamplePlan {
    let per_polygon: Vec<u32> = areas.iter().map(|&a| points_for_polygon(a, class)).collect();
    let qualifying = areas.iter().filter(|&&a| a > class.min_area).count();
    let total_points = per_polygon.iter().map(|&n| u64::from(n)).sum();
    SamplePlan {
        polygons: areas.len(),
        qualifying,
        per_polygon,
        total_points,
    }
}

/// Check a class definition before it is turned into a statement.
pub fn validate_class(class: &ClassDefinition) -> Result<(), CoreError> {
    if !(class.density > 0.0) {
        return Err(CoreError::Validation(format!(
            "Class '{}' must have a positive sampling density",
            class.name
        )));
    }
    if class.max_cap < 0 {
        return Err(CoreError::Validation(format!(
            "Class '{}' must have a non-negative point cap",
            class.name
        )));
    }
    if class.min_area < 0.0 {
        return Err(CoreError::Validation(format!(
            "Class '{}' must have a non-negative minimum area",
            class.name
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Drawn samples
// ---------------------------------------------------------------------------

/// Geographic bounding box (EPSG:4326 degrees) and the EPSG code of the
/// layer it is compared against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
    pub target_epsg: i32,
}

impl BoundingBox {
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64, target_epsg: i32) -> Result<Self, CoreError> {
        if !(xmin < xmax && ymin < ymax) {
            return Err(CoreError::Validation(format!(
                "Bounding box must satisfy xmin < xmax and ymin < ymax, got ({xmin}, {ymin}, {xmax}, {ymax})"
            )));
        }
        if !(-180.0..=180.0).contains(&xmin)
            || !(-180.0..=180.0).contains(&xmax)
            || !(-90.0..=90.0).contains(&ymin)
            || !(-90.0..=90.0).contains(&ymax)
        {
            return Err(CoreError::Validation(
                "Bounding box must be given in longitude/latitude degrees".to_string(),
            ));
        }
        if target_epsg <= 0 {
            return Err(CoreError::Validation(format!(
                "Invalid target EPSG code {target_epsg}"
            )));
        }
        Ok(Self {
            xmin,
            ymin,
            xmax,
            ymax,
            target_epsg,
        })
    }

    /// Parse the five CLI values `xmin ymin xmax ymax target-epsg`.
    pub fn from_args(values: &[String]) -> Result<Self, CoreError> {
        let [xmin, ymin, xmax, ymax, epsg] = values else {
            return Err(CoreError::Validation(format!(
                "Bounding box needs 5 values (xmin ymin xmax ymax target-epsg), got {}",
                values.len()
            )));
        };
        let coord = |v: &String| {
            v.trim()
                .parse::<f64>()
                .map_err(|_| CoreError::Validation(format!("Invalid coordinate '{v}'")))
        };
        let epsg: i32 = epsg
            .trim()
            .parse()
            .map_err(|_| CoreError::Validation(format!("Invalid EPSG code '{epsg}'")))?;
        Self::new(coord(xmin)?, coord(ymin)?, coord(xmax)?, coord(ymax)?, epsg)
    }
}

/// Parameters for drawing an analysis sample from the base points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SampleRequest {
    pub samples: i64,
    pub aoi: Option<BoundingBox>,
    pub slope: Option<SlopeBucket>,
}

impl SampleRequest {
    pub fn new(samples: i64, aoi: Option<BoundingBox>, slope: Option<SlopeBucket>) -> Result<Self, CoreError> {
        if samples < 1 {
            return Err(CoreError::Validation(
                "Sample count must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            samples,
            aoi,
            slope,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landcover::{ClassCodes, FIJI};
    use assert_matches::assert_matches;

    fn class(density: f64, min_area: f64, max_cap: i32) -> ClassDefinition {
        ClassDefinition {
            name: "test",
            codes: ClassCodes::Ids(&[1]),
            density,
            min_area,
            max_cap,
        }
    }

    // -----------------------------------------------------------------------
    // Per-polygon counts
    // -----------------------------------------------------------------------

    #[test]
    fn count_is_area_over_density() {
        assert_eq!(points_for_polygon(250_000.0, &class(10_000.0, 100_000.0, 10_000)), 25);
    }

    #[test]
    fn count_rounds_down() {
        assert_eq!(points_for_polygon(129_999.0, &class(10_000.0, 100_000.0, 10_000)), 12);
    }

    #[test]
    fn count_never_exceeds_cap() {
        let c = class(1.0, 0.0, 50);
        for area in [10.0, 50.0, 51.0, 1e6, 1e12] {
            assert!(points_for_polygon(area, &c) <= 50);
        }
        assert_eq!(points_for_polygon(1e12, &c), 50);
    }

    #[test]
    fn polygons_at_or_below_min_area_get_nothing() {
        let c = class(10.0, 1_000.0, 10_000);
        assert_eq!(points_for_polygon(999.0, &c), 0);
        assert_eq!(points_for_polygon(1_000.0, &c), 0);
        assert_eq!(points_for_polygon(1_010.0, &c), 101);
    }

    #[test]
    fn nan_area_gets_nothing() {
        assert_eq!(points_for_polygon(f64::NAN, &class(10.0, 0.0, 10)), 0);
    }

    // -----------------------------------------------------------------------
    // Plans
    // -----------------------------------------------------------------------

    #[test]
    fn plan_sums_qualifying_polygons() {
        let forest = FIJI.class("forest").unwrap();
        let plan = plan_samples(&[50_000.0, 200_000.0, 1e10], forest);
        assert_eq!(plan.polygons, 3);
        assert_eq!(plan.qualifying, 2);
        assert_eq!(plan.per_polygon, vec![0, 20, 10_000]);
        assert_eq!(plan.total_points, 10_020);
    }

    #[test]
    fn plan_without_qualifying_polygons_is_empty() {
        let plan = plan_samples(&[1.0, 2.0], &class(1.0, 10.0, 5));
        assert_eq!(plan.qualifying, 0);
        assert_eq!(plan.total_points, 0);

        let empty = plan_samples(&[], &class(1.0, 10.0, 5));
        assert_eq!(empty.polygons, 0);
        assert_eq!(empty.total_points, 0);
    }

    #[test]
    fn region_classes_are_valid() {
        for c in FIJI.classes {
            validate_class(c).unwrap();
        }
        assert_matches!(validate_class(&class(0.0, 0.0, 1)), Err(CoreError::Validation(_)));
        assert_matches!(validate_class(&class(1.0, 0.0, -1)), Err(CoreError::Validation(_)));
    }

    // -----------------------------------------------------------------------
    // Bounding boxes and requests
    // -----------------------------------------------------------------------

    #[test]
    fn bbox_from_cli_values() {
        let args: Vec<String> = ["177.0", "-18.5", "178.5", "-17.0", "32760"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let bbox = BoundingBox::from_args(&args).unwrap();
        assert_eq!(bbox.target_epsg, 32760);
        assert_eq!(bbox.xmin, 177.0);
    }

    #[test]
    fn bbox_rejects_wrong_arity_and_inverted_corners() {
        let four: Vec<String> = vec!["1".into(), "2".into(), "3".into(), "4".into()];
        assert!(BoundingBox::from_args(&four).is_err());
        assert!(BoundingBox::new(10.0, 0.0, 5.0, 1.0, 4326).is_err());
        assert!(BoundingBox::new(0.0, 0.0, 1.0, 1.0, 0).is_err());
        assert!(BoundingBox::new(0.0, 0.0, 1.0, 95.0, 4326).is_err());
    }

    #[test]
    fn sample_request_needs_positive_count() {
        assert!(SampleRequest::new(0, None, None).is_err());
        assert!(SampleRequest::new(10_000, None, Some(SlopeBucket::Flat)).is_ok());
    }
}
