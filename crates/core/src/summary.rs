//! Per-unit outcomes and the run summary reported at the end of a command.
//!
//! Every unit of work (one extraction task, one class aggregation, one
//! sample table) yields an outcome, so a partial failure is visible as a
//! named gap instead of silently missing rows.

use serde::Serialize;
use uuid::Uuid;

use crate::partition::Task;
use crate::types::Timestamp;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Succeeded { rows: u64 },
    Failed { reason: String },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    pub fn rows(&self) -> u64 {
        match self {
            Self::Succeeded { rows } => *rows,
            Self::Failed { .. } => 0,
        }
    }
}

/// Outcome of one extraction worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskReport {
    pub task: Task,
    pub outcome: Outcome,
}

/// All worker outcomes for one `(algorithm, class)` extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractionReport {
    pub algorithm: String,
    pub class: String,
    pub table: String,
    pub reports: Vec<TaskReport>,
    /// Set when the table could not be prepared or published at all.
    pub setup_error: Option<String>,
}

impl ExtractionReport {
    pub fn succeeded(&self) -> usize {
        self.reports.iter().filter(|r| r.outcome.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.reports.len() - self.succeeded()
    }

    pub fn rows(&self) -> u64 {
        self.reports.iter().map(|r| r.outcome.rows()).sum()
    }

    /// Time windows whose rows are missing because their worker failed.
    pub fn gaps(&self) -> Vec<(Timestamp, Timestamp)> {
        self.reports
            .iter()
            .filter(|r| !r.outcome.is_success())
            .map(|r| (r.task.start, r.task.end))
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.setup_error.is_none() && self.failed() == 0
    }
}

/// Outcome of a unit of work outside the extraction fan-out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitReport {
    pub unit: String,
    pub outcome: Outcome,
}

/// Everything a command did, reported once at exit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub command: String,
    pub extractions: Vec<ExtractionReport>,
    pub units: Vec<UnitReport>,
    /// Requested units that were skipped (e.g. unknown class names).
    pub skipped: Vec<String>,
}

impl RunSummary {
    pub fn new(command: &str) -> Self {
        Self {
            run_id: Uuid::now_v7(),
            command: command.to_string(),
            extractions: Vec::new(),
            units: Vec::new(),
            skipped: Vec::new(),
        }
    }

    pub fn record_unit(&mut self, unit: impl Into<String>, outcome: Outcome) {
        self.units.push(UnitReport {
            unit: unit.into(),
            outcome,
        });
    }

    pub fn failures(&self) -> usize {
        let extraction_failures: usize = self
            .extractions
            .iter()
            .map(|e| e.failed() + usize::from(e.setup_error.is_some()))
            .sum();
        let unit_failures = self.units.iter().filter(|u| !u.outcome.is_success()).count();
        extraction_failures + unit_failures
    }

    pub fn successes(&self) -> usize {
        let extraction_successes: usize = self.extractions.iter().map(|e| e.succeeded()).sum();
        let unit_successes = self.units.iter().filter(|u| u.outcome.is_success()).count();
        extraction_successes + unit_successes
    }

    pub fn is_success(&self) -> bool {
        self.failures() == 0
    }
}
