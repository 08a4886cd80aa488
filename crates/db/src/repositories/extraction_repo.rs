//! Repository for extraction result tables
//! (`result_<alg>[_<slope>].<product>_<class>`).
//!
//! An extraction run prepares one staging table, lets every worker insert
//! its own time window into it, then publishes or discards it as a whole.

use sarcmp_core::aggregate::ExtractionRecord;
use sarcmp_core::ident::{Ident, QualifiedName};
use sarcmp_core::partition::Task;
use sqlx::PgPool;

use crate::error::DbError;
use crate::models::catalog::ResolvedProduct;
use crate::models::extraction::ExtractionRow;
use crate::statements;
use crate::swap::{self, Staged};

pub struct ExtractionRepo;

impl ExtractionRepo {
    /// Create an empty staging table beside `target`.
    pub async fn prepare(
        pool: &PgPool,
        target: QualifiedName,
        bands: &[Ident; 2],
    ) -> Result<Staged, DbError> {
        swap::ensure_schema(pool, &target.schema).await?;
        let staged = Staged::new(target)?;
        sqlx::query(&statements::create_result_table(&staged.staging, bands))
            .execute(pool)
            .await?;
        Ok(staged)
    }

    /// Extract every scene of `product` inside `task`'s window at the
    /// points of `sample`. Returns the number of inserted rows.
    pub async fn insert_window(
        pool: &PgPool,
        staging: &QualifiedName,
        product: &ResolvedProduct,
        sample: &QualifiedName,
        bands: &[Ident; 2],
        task: &Task,
    ) -> Result<u64, DbError> {
        let query = statements::extract_window(
            staging,
            &product.scene,
            &product.raster(),
            sample,
            bands,
            task.end_operator(),
        );
        let result = sqlx::query(&query)
            .bind(product.pid)
            .bind(product.band_indices[0])
            .bind(product.band_indices[1])
            .bind(task.start.naive_utc())
            .bind(task.end.naive_utc())
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Index the staging table and swap it in for the target.
    pub async fn publish(pool: &PgPool, staged: &Staged) -> Result<(), DbError> {
        let indexed = sqlx::query(&statements::create_gist_index(&staged.staging))
            .execute(pool)
            .await
            .map(|_| 0)
            .map_err(DbError::from);
        swap::finish(pool, staged, indexed).await?;
        Ok(())
    }

    /// Drop the staging table, keeping the previous target.
    pub async fn discard(pool: &PgPool, staged: &Staged) {
        swap::discard(pool, staged).await;
    }

    /// All stored records of a result table, ordered by date and geometry.
    pub async fn fetch_records(
        pool: &PgPool,
        table: &QualifiedName,
        bands: &[Ident; 2],
    ) -> Result<Vec<ExtractionRecord>, sqlx::Error> {
        let rows = sqlx::query_as::<_, ExtractionRow>(&statements::select_extraction(table, bands))
            .fetch_all(pool)
            .await?;
        Ok(rows.into_iter().filter_map(ExtractionRow::into_record).collect())
    }
}
