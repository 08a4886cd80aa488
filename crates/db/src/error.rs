use sarcmp_core::error::CoreError;

/// Errors raised by the database layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A domain-level error, typically an identifier that failed validation.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A driver or server error from sqlx.
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Product '{product}' not found in scene_{algorithm}.product")]
    ProductNotFound { algorithm: String, product: String },

    #[error("Band '{band}' not found for product '{product}' in scene_{algorithm}.band")]
    BandNotFound {
        algorithm: String,
        product: String,
        band: String,
    },

    #[error("Scene catalog scene_{algorithm}.cat has no acquisitions for product '{product}'")]
    EmptyCatalog { algorithm: String, product: String },
}

impl DbError {
    /// Driver-reported message, preferring the server's own text.
    pub fn driver_message(&self) -> String {
        match self {
            DbError::Sqlx(sqlx::Error::Database(db_err)) => db_err.message().to_string(),
            other => other.to_string(),
        }
    }
}
