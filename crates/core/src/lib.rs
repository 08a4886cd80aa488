//! Domain logic for the SAR backscatter comparison pipeline.
//!
//! This crate has no internal dependencies and performs no I/O, so the
//! database layer, the worker binary and tests can all share it.

pub mod aggregate;
pub mod config;
pub mod error;
pub mod ident;
pub mod landcover;
pub mod partition;
pub mod sampling;
pub mod stats;
pub mod summary;
pub mod types;
pub mod verify;
