use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use sarcmp_db::DatabaseConfig;
use sarcmp_worker::cli::Cli;
use sarcmp_worker::{commands, report};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sarcmp_worker=info,sarcmp_db=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let db_config = DatabaseConfig::resolve(
        cli.database_url.as_deref(),
        cli.database.as_deref(),
        cli.command.workers(),
    );
    tracing::info!(
        url = %db_config.redacted_url(),
        max_connections = db_config.max_connections,
        acquire_timeout_secs = db_config.acquire_timeout.as_secs(),
        "Connecting to database",
    );
    let pool = sarcmp_db::create_pool(&db_config)
        .await
        .context("Failed to connect to database")?;
    sarcmp_db::health_check(&pool)
        .await
        .context("Database health check failed")?;

    let summary = commands::run(&pool, cli.command).await?;
    report::log_summary(&summary);
    if cli.json {
        println!("{}", report::to_json(&summary)?);
    }

    pool.close().await;

    Ok(if summary.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
