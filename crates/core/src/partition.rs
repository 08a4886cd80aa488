//! Temporal task partitioning for the parallel extraction workers.
//!
//! A [`TimeRange`] is split into contiguous [`Task`]s, one per worker. All
//! boundary arithmetic happens in whole seconds (catalog acquisition times
//! carry second resolution) and every boundary is computed from the range
//! start, so rounding never accumulates across tasks.
//!
//! Two boundary policies are supported:
//!
//! - **Half-open** (`epsilon == 0`, the default): task `i` covers
//!   `[b_i, b_{i+1})` and only the final task is closed at the range end.
//!   Adjacent tasks share a boundary instant but never a timestamp.
//! - **Epsilon gap** (`epsilon > 0`): every task is closed and task `i > 0`
//!   starts `epsilon` after the previous task's end. With a one-second
//!   epsilon this reproduces the legacy `[start, end]` windows without
//!   double-counting a scene that sits exactly on a boundary.

use chrono::Duration;
use serde::Serialize;

use crate::error::CoreError;
use crate::types::Timestamp;

/// Validated analysis window. Invariant: `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    start: Timestamp,
    end: Timestamp,
}

impl TimeRange {
    pub fn new(start: Timestamp, end: Timestamp) -> Result<Self, CoreError> {
        if start > end {
            return Err(CoreError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> Timestamp {
        self.start
    }

    pub fn end(&self) -> Timestamp {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// One worker's slice of a [`TimeRange`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Task {
    pub index: usize,
    pub start: Timestamp,
    pub end: Timestamp,
    /// Whether `end` itself belongs to this task.
    pub end_inclusive: bool,
}

impl Task {
    /// Whether an acquisition at `t` falls inside this task's window.
    pub fn contains(&self, t: Timestamp) -> bool {
        t >= self.start && (t < self.end || (self.end_inclusive && t == self.end))
    }

    /// SQL comparison operator for the upper bound of this window.
    pub fn end_operator(&self) -> &'static str {
        if self.end_inclusive {
            "<="
        } else {
            "<"
        }
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// Splits a [`TimeRange`] into per-worker [`Task`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskPartitioner {
    epsilon: Duration,
}

impl Default for TaskPartitioner {
    fn default() -> Self {
        Self::half_open()
    }
}

impl TaskPartitioner {
    /// Contiguous `[b_i, b_{i+1})` windows with a closed final task.
    pub fn half_open() -> Self {
        Self {
            epsilon: Duration::zero(),
        }
    }

    /// Closed windows separated by `epsilon`.
    pub fn with_epsilon(epsilon: Duration) -> Result<Self, CoreError> {
        if epsilon < Duration::zero() {
            return Err(CoreError::Validation(
                "Partition epsilon must not be negative".to_string(),
            ));
        }
        Ok(Self { epsilon })
    }

    pub fn epsilon(&self) -> Duration {
        self.epsilon
    }

    /// Partition `range` across `workers` tasks.
    ///
    /// - `workers == 0` is rejected.
    /// - A zero-length range yields one degenerate closed task.
    /// - A range shorter than `workers` seconds yields one task per second,
    ///   so callers may receive fewer tasks than requested.
    /// - An epsilon that is not strictly shorter than the smallest task is
    ///   rejected, since it would swallow whole tasks.
    pub fn split(&self, range: TimeRange, workers: usize) -> Result<Vec<Task>, CoreError> {
        if workers == 0 {
            return Err(CoreError::Validation(
                "Worker count must be at least 1".to_string(),
            ));
        }

        let total_secs = range.duration().num_seconds();
        if total_secs == 0 {
            return Ok(vec![Task {
                index: 0,
                start: range.start,
                end: range.end,
                end_inclusive: true,
            }]);
        }

        let n = (workers as i64).min(total_secs);
        let shortest = Duration::seconds(total_secs / n);
        if !self.epsilon.is_zero() && self.epsilon >= shortest {
            return Err(CoreError::Validation(format!(
                "Partition epsilon of {}s must be shorter than the {}s task interval",
                self.epsilon.num_seconds(),
                shortest.num_seconds()
            )));
        }

        let boundary = |i: i64| -> Timestamp {
            if i == n {
                range.end
            } else {
                range.start + Duration::seconds(total_secs * i / n)
            }
        };

        let tasks = (0..n)
            .map(|i| {
                let gap_mode = !self.epsilon.is_zero();
                let start = if gap_mode && i > 0 {
                    boundary(i) + self.epsilon
                } else {
                    boundary(i)
                };
                Task {
                    index: i as usize,
                    start,
                    end: boundary(i + 1),
                    end_inclusive: gap_mode || i == n - 1,
                }
            })
            .collect();

        Ok(tasks)
    }
}
