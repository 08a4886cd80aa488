//! Row types read back from the database.
//!
//! Each submodule holds `FromRow` structs matching the fixed column aliases
//! emitted by [`crate::statements`], with conversions into the core records.

pub mod aggregate;
pub mod catalog;
pub mod extraction;
