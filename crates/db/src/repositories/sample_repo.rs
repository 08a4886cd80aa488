//! Repository for drawn analysis samples (`sample[_<slope>].<class>`).

use sarcmp_core::ident::{poi_table, sample_table, Ident};
use sarcmp_core::sampling::SampleRequest;
use sqlx::PgPool;

use crate::error::DbError;
use crate::statements;
use crate::swap::{self, Staged};

pub struct SampleRepo;

impl SampleRepo {
    /// Draw up to `request.samples` random points of `class`, replacing
    /// the previous sample. Returns the number of points drawn.
    pub async fn draw(pool: &PgPool, class: &Ident, request: &SampleRequest) -> Result<u64, DbError> {
        let target = sample_table(class, request.slope)?;
        swap::ensure_schema(pool, &target.schema).await?;
        let staged = Staged::new(target)?;

        let built = async {
            let query = statements::draw_sample(
                &poi_table(class)?,
                &staged.staging,
                request.aoi.is_some(),
                request.slope.is_some(),
            );
            tracing::debug!(sql = %query, "Drawing sample");

            let mut q = sqlx::query(&query).bind(request.samples);
            if let Some(aoi) = request.aoi {
                q = q
                    .bind(aoi.xmin)
                    .bind(aoi.ymin)
                    .bind(aoi.xmax)
                    .bind(aoi.ymax)
                    .bind(aoi.target_epsg);
            }
            if let Some(slope) = request.slope {
                let (min, max) = slope.bounds();
                q = q.bind(min).bind(max);
            }
            let rows = q.execute(pool).await?.rows_affected();

            sqlx::query(&statements::create_gist_index(&staged.staging))
                .execute(pool)
                .await?;
            Ok::<u64, DbError>(rows)
        }
        .await;

        swap::finish(pool, &staged, built).await
    }
}
