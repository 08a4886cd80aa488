//! Materialized error and timeline rows, read back with fixed aliases.

use sarcmp_core::aggregate::{ErrorRecord, TimelineRecord};
use sarcmp_core::error::CoreError;
use sarcmp_core::stats::Summary;
use sarcmp_core::types::AcquisitionDate;
use sqlx::FromRow;

fn summary(mean: Option<f64>, stddev: Option<f64>, field: &str) -> Result<Summary, CoreError> {
    let mean = mean.ok_or_else(|| CoreError::Internal(format!("Stored {field} mean is null")))?;
    Ok(Summary { mean, stddev })
}

fn sample_count(samples: i64) -> Result<u64, CoreError> {
    u64::try_from(samples)
        .map_err(|_| CoreError::Internal(format!("Stored sample count {samples} is negative")))
}

/// A row of `error[_<slope>].<product>_<class>[_<orbit>]`.
///
/// `f*` columns are the first algorithm, `s*` the second, `d*` the
/// difference; the digit is the band position.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct ErrorRow {
    pub geom: String,
    pub samples: i64,
    pub f0_mean: Option<f64>,
    pub f0_stddev: Option<f64>,
    pub f1_mean: Option<f64>,
    pub f1_stddev: Option<f64>,
    pub s0_mean: Option<f64>,
    pub s0_stddev: Option<f64>,
    pub s1_mean: Option<f64>,
    pub s1_stddev: Option<f64>,
    pub d0_mean: Option<f64>,
    pub d0_stddev: Option<f64>,
    pub d1_mean: Option<f64>,
    pub d1_stddev: Option<f64>,
}

impl TryFrom<ErrorRow> for ErrorRecord {
    type Error = CoreError;

    fn try_from(row: ErrorRow) -> Result<Self, Self::Error> {
        Ok(ErrorRecord {
            samples: sample_count(row.samples)?,
            first: [
                summary(row.f0_mean, row.f0_stddev, "first band 0")?,
                summary(row.f1_mean, row.f1_stddev, "first band 1")?,
            ],
            second: [
                summary(row.s0_mean, row.s0_stddev, "second band 0")?,
                summary(row.s1_mean, row.s1_stddev, "second band 1")?,
            ],
            difference: [
                summary(row.d0_mean, row.d0_stddev, "difference band 0")?,
                summary(row.d1_mean, row.d1_stddev, "difference band 1")?,
            ],
            geom: row.geom,
        })
    }
}

/// A row of `timeline[_<slope>].<product>_<class>[_<orbit>]`.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct TimelineRow {
    pub fdate: AcquisitionDate,
    pub samples: i64,
    pub f0_mean: Option<f64>,
    pub f0_stddev: Option<f64>,
    pub f1_mean: Option<f64>,
    pub f1_stddev: Option<f64>,
    pub s0_mean: Option<f64>,
    pub s0_stddev: Option<f64>,
    pub s1_mean: Option<f64>,
    pub s1_stddev: Option<f64>,
    pub r0: Option<f64>,
    pub r1: Option<f64>,
}

impl TryFrom<TimelineRow> for TimelineRecord {
    type Error = CoreError;

    fn try_from(row: TimelineRow) -> Result<Self, Self::Error> {
        let rmse = |value: Option<f64>, band: usize| {
            value.ok_or_else(|| CoreError::Internal(format!("Stored band {band} rmse is null")))
        };
        Ok(TimelineRecord {
            date: row.fdate,
            samples: sample_count(row.samples)?,
            first: [
                summary(row.f0_mean, row.f0_stddev, "first band 0")?,
                summary(row.f1_mean, row.f1_stddev, "first band 1")?,
            ],
            second: [
                summary(row.s0_mean, row.s0_stddev, "second band 0")?,
                summary(row.s1_mean, row.s1_stddev, "second band 1")?,
            ],
            rmse: [rmse(row.r0, 0)?, rmse(row.r1, 1)?],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::NaiveDate;

    fn error_row() -> ErrorRow {
        ErrorRow {
            geom: "POINT(1 2)".into(),
            samples: 3,
            f0_mean: Some(-10.0),
            f0_stddev: Some(1.0),
            f1_mean: Some(-16.0),
            f1_stddev: None,
            s0_mean: Some(-11.0),
            s0_stddev: Some(1.0),
            s1_mean: Some(-17.0),
            s1_stddev: Some(1.0),
            d0_mean: Some(1.0),
            d0_stddev: Some(0.0),
            d1_mean: Some(1.0),
            d1_stddev: Some(0.0),
        }
    }

    #[test]
    fn error_row_converts_positionally() {
        let record = ErrorRecord::try_from(error_row()).unwrap();
        assert_eq!(record.geom, "POINT(1 2)");
        assert_eq!(record.samples, 3);
        assert_eq!(record.first[1].mean, -16.0);
        assert_eq!(record.first[1].stddev, None);
        assert_eq!(record.second[0].mean, -11.0);
        assert_eq!(record.difference[0].mean, 1.0);
    }

    #[test]
    fn null_mean_is_rejected() {
        let mut row = error_row();
        row.d1_mean = None;
        assert_matches!(ErrorRecord::try_from(row), Err(CoreError::Internal(_)));
    }

    #[test]
    fn negative_sample_count_is_rejected() {
        let mut row = error_row();
        row.samples = -1;
        assert_matches!(
            ErrorRecord::try_from(row),
            Err(CoreError::Internal(msg)) if msg.contains("-1")
        );
    }

    #[test]
    fn timeline_row_converts() {
        let row = TimelineRow {
            fdate: NaiveDate::from_ymd_opt(2020, 1, 5).unwrap(),
            samples: 2,
            f0_mean: Some(1.0),
            f0_stddev: None,
            f1_mean: Some(2.0),
            f1_stddev: None,
            s0_mean: Some(1.5),
            s0_stddev: None,
            s1_mean: Some(2.5),
            s1_stddev: None,
            r0: Some(0.5),
            r1: Some(0.5),
        };
        let record = TimelineRecord::try_from(row).unwrap();
        assert_eq!(record.rmse, [0.5, 0.5]);
        assert_eq!(record.second[1].mean, 2.5);
        assert_eq!(record.samples, 2);
    }

    #[test]
    fn timeline_negative_sample_count_is_rejected() {
        let row = TimelineRow {
            fdate: NaiveDate::from_ymd_opt(2020, 1, 5).unwrap(),
            samples: -4,
            f0_mean: Some(1.0),
            f0_stddev: None,
            f1_mean: Some(2.0),
            f1_stddev: None,
            s0_mean: Some(1.5),
            s0_stddev: None,
            s1_mean: Some(2.5),
            s1_stddev: None,
            r0: Some(0.5),
            r1: Some(0.5),
        };
        assert_matches!(TimelineRecord::try_from(row), Err(CoreError::Internal(_)));
    }
}
