//! Parallel extraction coordinator.
//!
//! One Tokio task per time window, each with its own pooled connection.
//! Every spawned task is joined; a failed or panicked worker becomes a
//! failed [`TaskReport`] while its siblings run to completion. There is no
//! cancellation.

use std::future::Future;

use sarcmp_core::ident::{Ident, QualifiedName};
use sarcmp_core::partition::Task;
use sarcmp_core::summary::{ExtractionReport, Outcome, TaskReport};
use sarcmp_db::models::catalog::ResolvedProduct;
use sarcmp_db::repositories::ExtractionRepo;
use sarcmp_db::DbError;
use sqlx::PgPool;

/// Run `work` once per task concurrently and collect every outcome,
/// ordered by task index.
pub async fn run_tasks<F, Fut>(tasks: &[Task], work: F) -> Vec<TaskReport>
where
    F: Fn(Task) -> Fut,
    Fut: Future<Output = Result<u64, DbError>> + Send + 'static,
{
    let handles: Vec<_> = tasks
        .iter()
        .map(|task| (*task, tokio::spawn(work(*task))))
        .collect();

    let mut reports = Vec::with_capacity(handles.len());
    for (task, handle) in handles {
        let outcome = match handle.await {
            Ok(Ok(rows)) => {
                tracing::info!(
                    task = task.index,
                    start = %task.start,
                    end = %task.end,
                    rows,
                    "Extraction task finished",
                );
                Outcome::Succeeded { rows }
            }
            Ok(Err(e)) => {
                let reason = e.driver_message();
                tracing::error!(
                    task = task.index,
                    start = %task.start,
                    end = %task.end,
                    error = %reason,
                    "Extraction task failed",
                );
                Outcome::Failed { reason }
            }
            Err(join_err) => {
                let reason = if join_err.is_panic() {
                    "worker panicked".to_string()
                } else {
                    join_err.to_string()
                };
                tracing::error!(task = task.index, error = %reason, "Extraction task aborted");
                Outcome::Failed { reason }
            }
        };
        reports.push(TaskReport { task, outcome });
    }
    reports.sort_by_key(|r| r.task.index);
    reports
}

/// Everything needed to extract one `(algorithm, class)` pair.
#[derive(Debug, Clone)]
pub struct ExtractionJob {
    pub product: ResolvedProduct,
    pub class: Ident,
    pub sample: QualifiedName,
    pub target: QualifiedName,
    pub bands: [Ident; 2],
    pub tasks: Vec<Task>,
}

impl ExtractionJob {
    fn empty_report(&self) -> ExtractionReport {
        ExtractionReport {
            algorithm: self.product.algorithm.as_str().to_string(),
            class: self.class.as_str().to_string(),
            table: self.target.to_string(),
            reports: Vec::new(),
            setup_error: None,
        }
    }
}

/// Extract one `(algorithm, class)` pair into a staging table and publish
/// it once every worker has joined.
///
/// The table is published when at least one window succeeded, with the
/// failed windows reported as gaps. When every window failed the previous
/// table is kept.
pub async fn run_extraction(pool: &PgPool, job: &ExtractionJob) -> ExtractionReport {
    let mut report = job.empty_report();

    let staged = match ExtractionRepo::prepare(pool, job.target.clone(), &job.bands).await {
        Ok(staged) => staged,
        Err(e) => {
            tracing::error!(table = %job.target, error = %e.driver_message(), "Failed to prepare result table");
            report.setup_error = Some(e.driver_message());
            return report;
        }
    };

    tracing::info!(
        algorithm = %job.product.algorithm.as_str(),
        class = %job.class.as_str(),
        tasks = job.tasks.len(),
        table = %job.target,
        "Starting extraction",
    );

    report.reports = run_tasks(&job.tasks, |task| {
        let pool = pool.clone();
        let staging = staged.staging.clone();
        let product = job.product.clone();
        let sample = job.sample.clone();
        let bands = job.bands.clone();
        async move {
            ExtractionRepo::insert_window(&pool, &staging, &product, &sample, &bands, &task).await
        }
    })
    .await;

    if report.succeeded() == 0 {
        ExtractionRepo::discard(pool, &staged).await;
        tracing::warn!(table = %job.target, "Every extraction task failed; previous table kept");
        return report;
    }

    if let Err(e) = ExtractionRepo::publish(pool, &staged).await {
        tracing::error!(table = %job.target, error = %e.driver_message(), "Failed to publish result table");
        report.setup_error = Some(e.driver_message());
        return report;
    }

    tracing::info!(
        table = %job.target,
        succeeded = report.succeeded(),
        failed = report.failed(),
        rows = report.rows(),
        "Extraction published",
    );
    for (start, end) in report.gaps() {
        tracing::warn!(table = %job.target, %start, %end, "Missing time window");
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use sarcmp_core::error::CoreError;
    use sarcmp_core::partition::{TaskPartitioner, TimeRange};

    fn tasks(n: usize) -> Vec<Task> {
        let range = TimeRange::new(
            Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2020, 1, 31, 0, 0, 0).unwrap(),
        )
        .unwrap();
        TaskPartitioner::half_open().split(range, n).unwrap()
    }

    // -----------------------------------------------------------------------
    // Fan-out
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn every_task_reports_once_in_index_order() {
        let tasks = tasks(4);
        let reports = run_tasks(&tasks, |task| async move {
            // Finish in reverse order.
            tokio::time::sleep(std::time::Duration::from_millis(20 * (4 - task.index as u64))).await;
            Ok(task.index as u64 * 10)
        })
        .await;

        assert_eq!(reports.len(), 4);
        for (i, report) in reports.iter().enumerate() {
            assert_eq!(report.task.index, i);
            assert_eq!(report.outcome, Outcome::Succeeded { rows: i as u64 * 10 });
        }
    }

    #[tokio::test]
    async fn failure_does_not_stop_siblings() {
        let tasks = tasks(3);
        let reports = run_tasks(&tasks, |task| async move {
            if task.index == 1 {
                Err(DbError::Core(CoreError::Internal("connection reset".into())))
            } else {
                Ok(5)
            }
        })
        .await;

        assert!(reports[0].outcome.is_success());
        assert_eq!(
            reports[1].outcome,
            Outcome::Failed {
                reason: "Internal error: connection reset".into()
            }
        );
        assert!(reports[2].outcome.is_success());
    }

    #[tokio::test]
    async fn panicking_worker_is_a_failed_task() {
        let tasks = tasks(2);
        let reports = run_tasks(&tasks, |task| async move {
            if task.index == 0 {
                panic!("boom");
            }
            Ok(1)
        })
        .await;

        assert_eq!(
            reports[0].outcome,
            Outcome::Failed {
                reason: "worker panicked".into()
            }
        );
        assert_eq!(reports[1].outcome, Outcome::Succeeded { rows: 1 });
    }

    #[tokio::test]
    async fn no_tasks_no_reports() {
        let reports = run_tasks(&[], |_| async { Ok(0) }).await;
        assert!(reports.is_empty());
    }
}
