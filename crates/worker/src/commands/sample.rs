//! `sarcmp sample`: draw analysis samples from the base points.

use sarcmp_core::config::SampleConfig;
use sarcmp_core::summary::{Outcome, RunSummary};
use sarcmp_db::repositories::SampleRepo;
use sqlx::PgPool;

pub async fn run(pool: &PgPool, config: &SampleConfig, summary: &mut RunSummary) {
    for class in &config.classes {
        let outcome = match SampleRepo::draw(pool, class, &config.request).await {
            Ok(rows) => {
                if rows < config.request.samples as u64 {
                    tracing::warn!(
                        class = %class.as_str(),
                        requested = config.request.samples,
                        drawn = rows,
                        "Fewer points available than requested",
                    );
                }
                Outcome::Succeeded { rows }
            }
            Err(e) => {
                let reason = e.driver_message();
                tracing::error!(class = %class.as_str(), error = %reason, "Sample draw failed");
                Outcome::Failed { reason }
            }
        };
        summary.record_unit(format!("sample {}", class.as_str()), outcome);
    }
}
