//! Cross-checking materialized aggregation tables against an in-process
//! recomputation.

use std::collections::HashMap;

use serde::Serialize;

use crate::aggregate::{ErrorRecord, TimelineRecord};
use crate::stats::{approx_eq_opt, Summary};

/// Default absolute tolerance for statistic comparisons.
pub const DEFAULT_TOLERANCE: f64 = 1e-6;

/// A single disagreement between expected and stored rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mismatch {
    /// Geometry WKT or ISO date identifying the row.
    pub key: String,
    pub field: String,
    pub expected: Option<f64>,
    pub actual: Option<f64>,
}

fn compare_summary(
    key: &str,
    field: &str,
    expected: &Summary,
    actual: &Summary,
    tolerance: f64,
    out: &mut Vec<Mismatch>,
) {
    if !approx_eq_opt(Some(expected.mean), Some(actual.mean), tolerance) {
        out.push(Mismatch {
            key: key.to_string(),
            field: format!("{field}_mean"),
            expected: Some(expected.mean),
            actual: Some(actual.mean),
        });
    }
    if !approx_eq_opt(expected.stddev, actual.stddev, tolerance) {
        out.push(Mismatch {
            key: key.to_string(),
            field: format!("{field}_stddev"),
            expected: expected.stddev,
            actual: actual.stddev,
        });
    }
}

fn missing(key: &str, field: &str) -> Mismatch {
    Mismatch {
        key: key.to_string(),
        field: field.to_string(),
        expected: None,
        actual: None,
    }
}

/// Compare error rows keyed by geometry. Row order is irrelevant.
pub fn compare_error_records(
    expected: &[ErrorRecord],
    actual: &[ErrorRecord],
    band_names: [&str; 2],
    tolerance: f64,
) -> Vec<Mismatch> {
    let mut out = Vec::new();
    let stored: HashMap<&str, &ErrorRecord> = actual.iter().map(|r| (r.geom.as_str(), r)).collect();

    for exp in expected {
        let Some(act) = stored.get(exp.geom.as_str()) else {
            out.push(missing(&exp.geom, "row missing from stored table"));
            continue;
        };
        for (band, name) in band_names.iter().enumerate() {
            compare_summary(&exp.geom, &format!("first_{name}"), &exp.first[band], &act.first[band], tolerance, &mut out);
            compare_summary(&exp.geom, &format!("second_{name}"), &exp.second[band], &act.second[band], tolerance, &mut out);
            compare_summary(&exp.geom, &format!("{name}_error"), &exp.difference[band], &act.difference[band], tolerance, &mut out);
        }
    }

    let recomputed: HashMap<&str, ()> = expected.iter().map(|r| (r.geom.as_str(), ())).collect();
    for act in actual {
        if !recomputed.contains_key(act.geom.as_str()) {
            out.push(missing(&act.geom, "unexpected row in stored table"));
        }
    }
    out
}

/// Compare timeline rows keyed by date. Row order is irrelevant.
pub fn compare_timeline_records(
    expected: &[TimelineRecord],
    actual: &[TimelineRecord],
    band_names: [&str; 2],
    tolerance: f64,
) -> Vec<Mismatch> {
    let mut out = Vec::new();
    let stored: HashMap<_, &TimelineRecord> = actual.iter().map(|r| (r.date, r)).collect();

    for exp in expected {
        let key = exp.date.to_string();
        let Some(act) = stored.get(&exp.date) else {
            out.push(missing(&key, "row missing from stored table"));
            continue;
        };
        for (band, name) in band_names.iter().enumerate() {
            compare_summary(&key, &format!("first_{name}"), &exp.first[band], &act.first[band], tolerance, &mut out);
            compare_summary(&key, &format!("second_{name}"), &exp.second[band], &act.second[band], tolerance, &mut out);
            if !approx_eq_opt(Some(exp.rmse[band]), Some(act.rmse[band]), tolerance) {
                out.push(Mismatch {
                    key: key.clone(),
                    field: format!("{name}_rmse"),
                    expected: Some(exp.rmse[band]),
                    actual: Some(act.rmse[band]),
                });
            }
        }
    }

    for act in actual {
        if !expected.iter().any(|e| e.date == act.date) {
            out.push(missing(&act.date.to_string(), "unexpected row in stored table"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn summary(mean: f64, stddev: Option<f64>) -> Summary {
        Summary { mean, stddev }
    }

    fn error_row(geom: &str, diff_mean: f64) -> ErrorRecord {
        ErrorRecord {
            geom: geom.to_string(),
            samples: 2,
            first: [summary(-10.0, Some(1.0)), summary(-16.0, Some(1.0))],
            second: [summary(-11.0, Some(1.0)), summary(-17.0, None)],
            difference: [summary(diff_mean, Some(0.1)), summary(1.0, Some(0.1))],
        }
    }

    fn timeline_row(day: u32, rmse: f64) -> TimelineRecord {
        TimelineRecord {
            date: NaiveDate::from_ymd_opt(2020, 1, day).unwrap(),
            samples: 3,
            first: [summary(-10.0, Some(1.0)), summary(-16.0, Some(1.0))],
            second: [summary(-11.0, Some(1.0)), summary(-17.0, Some(1.0))],
            rmse: [rmse, 0.5],
        }
    }

    const BANDS: [&str; 2] = ["vv", "vh"];

    #[test]
    fn identical_error_rows_agree() {
        let rows = vec![error_row("POINT(0 0)", 1.0), error_row("POINT(1 1)", 0.5)];
        let mut shuffled = rows.clone();
        shuffled.reverse();
        assert!(compare_error_records(&rows, &shuffled, BANDS, DEFAULT_TOLERANCE).is_empty());
    }

    #[test]
    fn error_drift_beyond_tolerance_is_reported() {
        let expected = vec![error_row("POINT(0 0)", 1.0)];
        let actual = vec![error_row("POINT(0 0)", 1.001)];
        let mismatches = compare_error_records(&expected, &actual, BANDS, DEFAULT_TOLERANCE);
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].field, "vv_error_mean");
    }

    #[test]
    fn missing_and_extra_rows_are_reported() {
        let expected = vec![error_row("POINT(0 0)", 1.0)];
        let actual = vec![error_row("POINT(9 9)", 1.0)];
        let mismatches = compare_error_records(&expected, &actual, BANDS, DEFAULT_TOLERANCE);
        assert_eq!(mismatches.len(), 2);
    }

    #[test]
    fn timeline_rmse_drift_is_reported() {
        let expected = vec![timeline_row(1, 1.1547005), timeline_row(2, 0.0)];
        let actual = vec![timeline_row(2, 0.0), timeline_row(1, 1.1547)];
        assert!(compare_timeline_records(&expected, &actual, BANDS, DEFAULT_TOLERANCE).is_empty());

        let drifted = vec![timeline_row(1, 1.2), timeline_row(2, 0.0)];
        let mismatches = compare_timeline_records(&expected, &drifted, BANDS, DEFAULT_TOLERANCE);
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].field, "vv_rmse");
    }
}
