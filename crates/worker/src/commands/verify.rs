//! `sarcmp verify`: recompute the comparison tables in process and check
//! the stored ones against them.

use std::collections::HashMap;

use sarcmp_core::aggregate::{aggregate_errors, aggregate_timeline};
use sarcmp_core::config::AggregationConfig;
use sarcmp_core::ident::Ident;
use sarcmp_core::landcover::OrbitDirection;
use sarcmp_core::summary::{Outcome, RunSummary};
use sarcmp_core::types::AcquisitionTime;
use sarcmp_core::verify::{compare_error_records, compare_timeline_records, Mismatch, DEFAULT_TOLERANCE};
use sarcmp_db::repositories::{AggregationRepo, ExtractionRepo, SceneCatalogRepo};
use sarcmp_db::statements::StatColumns;
use sarcmp_db::DbError;
use sqlx::PgPool;

use super::aggregate::{result_tables, AggregateKind};
use crate::error::WorkerError;

/// Mismatches logged individually per table; the rest are only counted.
const MAX_LOGGED_MISMATCHES: usize = 20;

/// Rows compared and disagreements found for one stored table.
struct Check {
    compared: usize,
    mismatches: Vec<Mismatch>,
}

pub async fn run(
    pool: &PgPool,
    config: &AggregationConfig,
    summary: &mut RunSummary,
) -> Result<(), WorkerError> {
    let columns = StatColumns::new(&config.algorithms, &config.bands)?;
    let orbits = if config.orbit.direction().is_some() {
        SceneCatalogRepo::orbit_directions(pool).await?
    } else {
        HashMap::new()
    };

    for class in &config.classes {
        match verify_class(pool, config, class, &columns, &orbits).await {
            Ok(checks) => {
                for (kind, check) in checks {
                    let unit = format!("verify {kind} {}", class.as_str());
                    summary.record_unit(unit, outcome(kind, class, check));
                }
            }
            Err(e) => {
                let reason = e.driver_message();
                tracing::error!(class = %class.as_str(), error = %reason, "Verification failed");
                summary.record_unit(format!("verify {}", class.as_str()), Outcome::Failed { reason });
            }
        }
    }
    Ok(())
}

async fn verify_class(
    pool: &PgPool,
    config: &AggregationConfig,
    class: &Ident,
    columns: &StatColumns,
    orbits: &HashMap<AcquisitionTime, OrbitDirection>,
) -> Result<[(AggregateKind, Check); 2], DbError> {
    let [first, second] = result_tables(config, class)?;
    let a = ExtractionRepo::fetch_records(pool, &first, &config.bands).await?;
    let b = ExtractionRepo::fetch_records(pool, &second, &config.bands).await?;
    let band_names = [config.bands[0].as_str(), config.bands[1].as_str()];

    let expected = aggregate_errors(&a, &b, config.orbit, orbits);
    let stored = AggregationRepo::fetch_error_rows(pool, &AggregateKind::Error.table(config, class)?, columns).await?;
    let errors = Check {
        compared: stored.len(),
        mismatches: compare_error_records(&expected, &stored, band_names, DEFAULT_TOLERANCE),
    };

    let expected = aggregate_timeline(&a, &b, config.orbit, orbits);
    let stored =
        AggregationRepo::fetch_timeline_rows(pool, &AggregateKind::Timeline.table(config, class)?, columns)
            .await?;
    let timeline = Check {
        compared: stored.len(),
        mismatches: compare_timeline_records(&expected, &stored, band_names, DEFAULT_TOLERANCE),
    };

    Ok([(AggregateKind::Error, errors), (AggregateKind::Timeline, timeline)])
}

fn outcome(kind: AggregateKind, class: &Ident, check: Check) -> Outcome {
    if check.mismatches.is_empty() {
        tracing::info!(
            kind = %kind,
            class = %class.as_str(),
            rows = check.compared,
            "Stored table matches recomputation",
        );
        return Outcome::Succeeded {
            rows: check.compared as u64,
        };
    }

    for m in check.mismatches.iter().take(MAX_LOGGED_MISMATCHES) {
        tracing::warn!(
            kind = %kind,
            class = %class.as_str(),
            key = %m.key,
            field = %m.field,
            expected = ?m.expected,
            actual = ?m.actual,
            "Mismatch",
        );
    }
    Outcome::Failed {
        reason: format!(
            "{} mismatches across {} stored rows",
            check.mismatches.len(),
            check.compared
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_check_succeeds_with_row_count() {
        let check = Check {
            compared: 7,
            mismatches: Vec::new(),
        };
        let forest = Ident::new("forest").unwrap();
        assert_eq!(
            outcome(AggregateKind::Error, &forest, check),
            Outcome::Succeeded { rows: 7 }
        );
    }

    #[test]
    fn mismatches_fail_the_unit() {
        let check = Check {
            compared: 3,
            mismatches: vec![Mismatch {
                key: "2020-01-05".into(),
                field: "vv_rmse".into(),
                expected: Some(1.0),
                actual: Some(1.5),
            }],
        };
        let forest = Ident::new("forest").unwrap();
        assert_eq!(
            outcome(AggregateKind::Timeline, &forest, check),
            Outcome::Failed {
                reason: "1 mismatches across 3 stored rows".into()
            }
        );
    }
}
