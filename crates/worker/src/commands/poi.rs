//! `sarcmp poi`: base land-cover points for a region.

use sarcmp_core::landcover::{ClassDefinition, Region};
use sarcmp_core::sampling::plan_samples;
use sarcmp_core::summary::{Outcome, RunSummary};
use sarcmp_db::repositories::PoiRepo;
use sarcmp_db::DbError;
use sqlx::PgPool;

use crate::cli::PoiArgs;
use crate::error::WorkerError;

/// Requested class names, or every class of the region when none given.
fn requested_classes(region: &Region, classes: &[String]) -> Vec<String> {
    if classes.is_empty() {
        region.class_names().map(str::to_string).collect()
    } else {
        classes.iter().map(|c| c.trim().to_ascii_lowercase()).collect()
    }
}

pub async fn run(pool: &PgPool, args: PoiArgs, summary: &mut RunSummary) -> Result<(), WorkerError> {
    let region = Region::by_name(&args.region)?;
    let requested = requested_classes(region, &args.classes);

    for name in &requested {
        if !region.class_names().any(|known| known == name) {
            summary.skipped.push(name.clone());
        }
    }

    for class in region.classes {
        if !requested.iter().any(|r| r == class.name) {
            continue;
        }
        let outcome = match generate(pool, region, class).await {
            Ok(rows) => Outcome::Succeeded { rows },
            Err(e) => failed(class.name, e),
        };
        summary.record_unit(format!("poi {}", class.name), outcome);
    }

    // Derived classes read their parent's fresh points.
    for derived in region.derived {
        if !requested.iter().any(|r| r == derived.name) {
            continue;
        }
        let outcome = match PoiRepo::generate_derived(pool, derived).await {
            Ok(rows) => Outcome::Succeeded { rows },
            Err(e) => failed(derived.name, e),
        };
        summary.record_unit(format!("poi {}", derived.name), outcome);
    }

    Ok(())
}

async fn generate(pool: &PgPool, region: &Region, class: &ClassDefinition) -> Result<u64, DbError> {
    let areas = PoiRepo::polygon_areas(pool, region, class).await?;
    let plan = plan_samples(&areas, class);
    tracing::info!(
        region = region.name,
        class = class.name,
        polygons = plan.polygons,
        qualifying = plan.qualifying,
        planned = plan.total_points,
        "Generating points of interest",
    );

    let rows = PoiRepo::generate(pool, region, class).await?;
    if rows != plan.total_points {
        // Points off the slope raster are dropped by the join.
        tracing::warn!(
            class = class.name,
            planned = plan.total_points,
            generated = rows,
            "Generated fewer points than planned",
        );
    }
    Ok(rows)
}

fn failed(class: &str, e: DbError) -> Outcome {
    let reason = e.driver_message();
    tracing::error!(class, error = %reason, "Point generation failed");
    Outcome::Failed { reason }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sarcmp_core::landcover::{ALPS, FIJI};

    #[test]
    fn all_region_classes_by_default() {
        let classes = requested_classes(&FIJI, &[]);
        assert!(classes.contains(&"sugarcane".to_string()));
        assert!(classes.contains(&"evergreen".to_string()));
        assert_eq!(requested_classes(&ALPS, &[]), ["forest"]);
    }

    #[test]
    fn explicit_classes_are_normalized() {
        let classes = requested_classes(&FIJI, &[" Forest ".to_string()]);
        assert_eq!(classes, ["forest"]);
    }
}
