//! `sarcmp extract`: per-scene backscatter at every sample point.

use sarcmp_core::config::ExtractionConfig;
use sarcmp_core::ident::{result_table, sample_table, Ident};
use sarcmp_core::partition::{Task, TimeRange};
use sarcmp_core::summary::{ExtractionReport, RunSummary};
use sarcmp_db::models::catalog::ResolvedProduct;
use sarcmp_db::repositories::SceneCatalogRepo;
use sarcmp_db::DbError;
use sqlx::PgPool;

use crate::coordinator::{run_extraction, ExtractionJob};
use crate::error::WorkerError;

pub async fn run(
    pool: &PgPool,
    config: &ExtractionConfig,
    summary: &mut RunSummary,
) -> Result<(), WorkerError> {
    for algorithm in &config.algorithms {
        let (product, tasks) = match plan(pool, config, algorithm).await {
            Ok(planned) => planned,
            Err(e) => {
                let reason = e.driver_message();
                tracing::error!(algorithm = %algorithm.as_str(), error = %reason, "Cannot extract");
                for class in &config.classes {
                    summary.extractions.push(ExtractionReport {
                        algorithm: algorithm.as_str().to_string(),
                        class: class.as_str().to_string(),
                        table: result_table(algorithm, &config.product, class, config.slope)?
                            .to_string(),
                        reports: Vec::new(),
                        setup_error: Some(reason.clone()),
                    });
                }
                continue;
            }
        };

        for class in &config.classes {
            let job = ExtractionJob {
                product: product.clone(),
                class: class.clone(),
                sample: sample_table(class, config.slope)?,
                target: result_table(algorithm, &config.product, class, config.slope)?,
                bands: config.bands.clone(),
                tasks: tasks.clone(),
            };
            summary.extractions.push(run_extraction(pool, &job).await);
        }
    }
    Ok(())
}

/// Resolve the product against one algorithm's catalog and split the
/// analysis window into worker tasks.
async fn plan(
    pool: &PgPool,
    config: &ExtractionConfig,
    algorithm: &Ident,
) -> Result<(ResolvedProduct, Vec<Task>), DbError> {
    let product = SceneCatalogRepo::resolve(pool, algorithm, &config.product, &config.bands).await?;
    let range = window(pool, config, &product).await?;
    let tasks = config.partitioner.split(range, config.threads)?;

    tracing::info!(
        algorithm = %algorithm.as_str(),
        product = %config.product.as_str(),
        start = %range.start(),
        end = %range.end(),
        tasks = tasks.len(),
        "Planned extraction window",
    );
    Ok((product, tasks))
}

/// The configured window, with missing bounds taken from the catalog.
async fn window(
    pool: &PgPool,
    config: &ExtractionConfig,
    product: &ResolvedProduct,
) -> Result<TimeRange, DbError> {
    if let (Some(start), Some(end)) = (config.start, config.end) {
        return Ok(TimeRange::new(start, end)?);
    }
    let catalog = SceneCatalogRepo::catalog_range(pool, &product.algorithm, product.pid)
        .await?
        .to_range()?
        .ok_or_else(|| DbError::EmptyCatalog {
            algorithm: product.algorithm.as_str().to_string(),
            product: product.product.as_str().to_string(),
        })?;
    Ok(TimeRange::new(
        config.start.unwrap_or(catalog.start()),
        config.end.unwrap_or(catalog.end()),
    )?)
}
