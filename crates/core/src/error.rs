use crate::types::Timestamp;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Invalid time range: start {start} is after end {end}")]
    InvalidRange { start: Timestamp, end: Timestamp },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid identifier {0:?}: expected lowercase ASCII letters, digits or underscores")]
    InvalidIdentifier(String),

    #[error("Unknown land-cover class {class:?} for region {region}")]
    UnknownClass { region: &'static str, class: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
