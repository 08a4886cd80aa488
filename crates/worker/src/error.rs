use sarcmp_core::error::CoreError;
use sarcmp_db::DbError;

/// Errors that abort a whole command before any unit of work runs.
///
/// Failures of individual units are recorded in the run summary instead.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
}
