//! The `sarcmp` pipeline runner: command-line surface, the parallel
//! extraction coordinator and one module per pipeline stage.

pub mod cli;
pub mod commands;
pub mod coordinator;
pub mod error;
pub mod report;
