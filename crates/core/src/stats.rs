//! Descriptive statistics with the same semantics as the PostgreSQL
//! aggregates used by the materialized tables: `AVG`, `STDDEV`
//! (sample standard deviation, `NULL` below two values) and
//! `SQRT(AVG((a - b)^2))`.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Mean and sample standard deviation of one column within a group.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub mean: f64,
    pub stddev: Option<f64>,
}

/// Single-pass mean/variance accumulator (Welford).
#[derive(Debug, Clone, Copy, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
}

impl RunningStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, x: f64) {
        self.count += 1;
        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (x - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then_some(self.mean)
    }

    pub fn sample_stddev(&self) -> Option<f64> {
        (self.count > 1).then(|| (self.m2 / (self.count - 1) as f64).sqrt())
    }

    pub fn summary(&self) -> Option<Summary> {
        self.mean().map(|mean| Summary {
            mean,
            stddev: self.sample_stddev(),
        })
    }
}

impl FromIterator<f64> for RunningStats {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut stats = Self::new();
        for x in iter {
            stats.push(x);
        }
        stats
    }
}

/// Accumulates squared pairwise differences for an RMSE.
#[derive(Debug, Clone, Copy, Default)]
pub struct RmseAccumulator {
    count: u64,
    sum_sq: f64,
}

impl RmseAccumulator {
    pub fn push(&mut self, a: f64, b: f64) {
        let d = a - b;
        self.count += 1;
        self.sum_sq += d * d;
    }

    pub fn value(&self) -> Option<f64> {
        (self.count > 0).then(|| (self.sum_sq / self.count as f64).sqrt())
    }
}

pub fn mean(values: &[f64]) -> Option<f64> {
    values.iter().copied().collect::<RunningStats>().mean()
}

pub fn sample_stddev(values: &[f64]) -> Option<f64> {
    values.iter().copied().collect::<RunningStats>().sample_stddev()
}

/// Root-mean-square error between two paired series.
pub fn rmse(a: &[f64], b: &[f64]) -> Result<f64, CoreError> {
    if a.len() != b.len() {
        return Err(CoreError::Validation(format!(
            "RMSE needs paired series, got lengths {} and {}",
            a.len(),
            b.len()
        )));
    }
    let mut acc = RmseAccumulator::default();
    for (&x, &y) in a.iter().zip(b) {
        acc.push(x, y);
    }
    acc.value()
        .ok_or_else(|| CoreError::Validation("RMSE of empty series".to_string()))
}

/// Whether two optional statistics agree within `tolerance`.
///
/// Both absent counts as agreement; one absent does not.
pub fn approx_eq_opt(a: Option<f64>, b: Option<f64>, tolerance: f64) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(x), Some(y)) => (x - y).abs() <= tolerance,
        _ => false,
    }
}
