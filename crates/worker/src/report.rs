//! End-of-run reporting.

use sarcmp_core::summary::{Outcome, RunSummary};

/// Log one line per unit of work and a final tally.
pub fn log_summary(summary: &RunSummary) {
    for extraction in &summary.extractions {
        if let Some(reason) = &extraction.setup_error {
            tracing::error!(
                algorithm = %extraction.algorithm,
                class = %extraction.class,
                error = %reason,
                "Extraction not run",
            );
            continue;
        }
        tracing::info!(
            algorithm = %extraction.algorithm,
            class = %extraction.class,
            table = %extraction.table,
            succeeded = extraction.succeeded(),
            failed = extraction.failed(),
            rows = extraction.rows(),
            "Extraction summary",
        );
    }

    for unit in &summary.units {
        match &unit.outcome {
            Outcome::Succeeded { rows } => {
                tracing::info!(unit = %unit.unit, rows, "Completed");
            }
            Outcome::Failed { reason } => {
                tracing::error!(unit = %unit.unit, error = %reason, "Failed");
            }
        }
    }

    for name in &summary.skipped {
        tracing::warn!(class = %name, "Skipped unknown land-cover class");
    }

    tracing::info!(
        run_id = %summary.run_id,
        command = %summary.command,
        succeeded = summary.successes(),
        failed = summary.failures(),
        skipped = summary.skipped.len(),
        "Run finished",
    );
}

/// Pretty JSON rendering of the summary for `--json`.
pub fn to_json(summary: &RunSummary) -> serde_json::Result<String> {
    serde_json::to_string_pretty(summary)
}
