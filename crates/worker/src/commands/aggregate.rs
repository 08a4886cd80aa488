//! `sarcmp error` and `sarcmp timeline`: materialized comparisons of two
//! algorithms' extraction results.

use std::fmt;

use sarcmp_core::config::AggregationConfig;
use sarcmp_core::error::CoreError;
use sarcmp_core::ident::{error_table, result_table, timeline_table, Ident, QualifiedName};
use sarcmp_core::summary::{Outcome, RunSummary};
use sarcmp_db::repositories::aggregation_repo::AggregationSource;
use sarcmp_db::repositories::AggregationRepo;
use sarcmp_db::statements::StatColumns;
use sqlx::PgPool;

use crate::error::WorkerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateKind {
    Error,
    Timeline,
}

impl fmt::Display for AggregateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => f.write_str("error"),
            Self::Timeline => f.write_str("timeline"),
        }
    }
}

impl AggregateKind {
    pub fn table(&self, config: &AggregationConfig, class: &Ident) -> Result<QualifiedName, CoreError> {
        match self {
            Self::Error => error_table(&config.product, class, config.slope, config.orbit),
            Self::Timeline => timeline_table(&config.product, class, config.slope, config.orbit),
        }
    }
}

/// Extraction tables of both algorithms for one class.
pub fn result_tables(config: &AggregationConfig, class: &Ident) -> Result<[QualifiedName; 2], CoreError> {
    Ok([
        result_table(&config.algorithms[0], &config.product, class, config.slope)?,
        result_table(&config.algorithms[1], &config.product, class, config.slope)?,
    ])
}

pub async fn run(
    pool: &PgPool,
    config: &AggregationConfig,
    kind: AggregateKind,
    summary: &mut RunSummary,
) -> Result<(), WorkerError> {
    let columns = StatColumns::new(&config.algorithms, &config.bands)?;

    for class in &config.classes {
        let [first, second] = result_tables(config, class)?;
        let target = kind.table(config, class)?;
        let source = AggregationSource {
            results: [&first, &second],
            bands: &config.bands,
            columns: &columns,
            orbit: config.orbit,
        };

        let built = match kind {
            AggregateKind::Error => AggregationRepo::build_error_table(pool, target.clone(), &source).await,
            AggregateKind::Timeline => {
                AggregationRepo::build_timeline_table(pool, target.clone(), &source).await
            }
        };
        let outcome = match built {
            Ok(rows) => {
                tracing::info!(table = %target, orbit = %config.orbit, rows, "Aggregation table rebuilt");
                Outcome::Succeeded { rows }
            }
            Err(e) => {
                let reason = e.driver_message();
                tracing::error!(table = %target, error = %reason, "Aggregation failed; previous table kept");
                Outcome::Failed { reason }
            }
        };
        summary.record_unit(format!("{kind} {}", class.as_str()), outcome);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sarcmp_core::landcover::{OrbitDirection, OrbitFilter, SlopeBucket};

    fn config(orbit: OrbitFilter, slope: Option<SlopeBucket>) -> AggregationConfig {
        AggregationConfig::new(
            "S1_GRD",
            vec![Ident::new("forest").unwrap()],
            &["gamma".to_string(), "snap".to_string()],
            &["vv".to_string(), "vh".to_string()],
            slope,
            orbit,
        )
        .unwrap()
    }

    #[test]
    fn tables_follow_layout() {
        let forest = Ident::new("forest").unwrap();
        let c = config(OrbitFilter::Only(OrbitDirection::Descending), Some(SlopeBucket::Flat));
        assert_eq!(
            AggregateKind::Error.table(&c, &forest).unwrap().to_string(),
            "\"error_flat\".\"s1_grd_forest_descending\""
        );
        assert_eq!(
            AggregateKind::Timeline.table(&c, &forest).unwrap().to_string(),
            "\"timeline_flat\".\"s1_grd_forest_descending\""
        );

        let [first, second] = result_tables(&c, &forest).unwrap();
        assert_eq!(first.to_string(), "\"result_gamma_flat\".\"s1_grd_forest\"");
        assert_eq!(second.to_string(), "\"result_snap_flat\".\"s1_grd_forest\"");
    }

    #[test]
    fn kind_names_unit_labels() {
        assert_eq!(AggregateKind::Error.to_string(), "error");
        assert_eq!(AggregateKind::Timeline.to_string(), "timeline");
    }
}
