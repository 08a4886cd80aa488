//! One module per pipeline stage.
//!
//! Each stage records one outcome per unit of work in the [`RunSummary`]
//! and moves on; only errors that prevent every unit from running (bad
//! arguments, unreachable database) are returned.

pub mod aggregate;
pub mod extract;
pub mod poi;
pub mod sample;
pub mod verify;

use sarcmp_core::summary::RunSummary;
use sqlx::PgPool;

use crate::cli::Command;
use crate::error::WorkerError;
use aggregate::AggregateKind;

/// Run one parsed command to completion.
pub async fn run(pool: &PgPool, command: Command) -> Result<RunSummary, WorkerError> {
    let mut summary = RunSummary::new(command.name());

    match command {
        Command::Poi(args) => poi::run(pool, args, &mut summary).await?,
        Command::Sample(args) => {
            let (config, skipped) = args.into_config()?;
            summary.skipped = skipped;
            sample::run(pool, &config, &mut summary).await;
        }
        Command::Extract(args) => {
            let (config, skipped) = args.into_config()?;
            summary.skipped = skipped;
            extract::run(pool, &config, &mut summary).await?;
        }
        Command::Error(args) => {
            let (config, skipped) = args.into_config()?;
            summary.skipped = skipped;
            aggregate::run(pool, &config, AggregateKind::Error, &mut summary).await?;
        }
        Command::Timeline(args) => {
            let (config, skipped) = args.into_config()?;
            summary.skipped = skipped;
            aggregate::run(pool, &config, AggregateKind::Timeline, &mut summary).await?;
        }
        Command::Verify(args) => {
            let (config, skipped) = args.into_config()?;
            summary.skipped = skipped;
            verify::run(pool, &config, &mut summary).await?;
        }
    }

    Ok(summary)
}
