//! Repository for the materialized comparison tables
//! (`error[_<slope>].*` and `timeline[_<slope>].*`).

use sarcmp_core::aggregate::{ErrorRecord, TimelineRecord};
use sarcmp_core::ident::{Ident, QualifiedName};
use sarcmp_core::landcover::OrbitFilter;
use sqlx::PgPool;

use crate::error::DbError;
use crate::models::aggregate::{ErrorRow, TimelineRow};
use crate::statements::{self, StatColumns};
use crate::swap::{self, Staged};

/// Inputs shared by both aggregations of one class.
#[derive(Debug, Clone)]
pub struct AggregationSource<'a> {
    /// Result tables of the reference and the comparison algorithm.
    pub results: [&'a QualifiedName; 2],
    pub bands: &'a [Ident; 2],
    pub columns: &'a StatColumns,
    pub orbit: OrbitFilter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Grouping {
    Geometry,
    Day,
}

pub struct AggregationRepo;

impl AggregationRepo {
    /// Rebuild the per-geometry error table. Returns its row count.
    pub async fn build_error_table(
        pool: &PgPool,
        target: QualifiedName,
        source: &AggregationSource<'_>,
    ) -> Result<u64, DbError> {
        Self::build(pool, target, source, Grouping::Geometry).await
    }

    /// Rebuild the per-day timeline table. Returns its row count.
    pub async fn build_timeline_table(
        pool: &PgPool,
        target: QualifiedName,
        source: &AggregationSource<'_>,
    ) -> Result<u64, DbError> {
        Self::build(pool, target, source, Grouping::Day).await
    }

    async fn build(
        pool: &PgPool,
        target: QualifiedName,
        source: &AggregationSource<'_>,
        grouping: Grouping,
    ) -> Result<u64, DbError> {
        swap::ensure_schema(pool, &target.schema).await?;
        let staged = Staged::new(target)?;

        let [first, second] = source.results;
        let direction = source.orbit.direction();
        let sql = match grouping {
            Grouping::Geometry => statements::create_error_table(
                &staged.staging,
                first,
                second,
                source.bands,
                source.columns,
                direction.is_some(),
            ),
            Grouping::Day => statements::create_timeline_table(
                &staged.staging,
                first,
                second,
                source.bands,
                source.columns,
                direction.is_some(),
            ),
        };
        tracing::debug!(sql = %sql, "Building aggregation table");

        let mut query = sqlx::query(&sql);
        if let Some(direction) = direction {
            query = query.bind(direction.meta_value());
        }
        let built = query
            .execute(pool)
            .await
            .map(|r| r.rows_affected())
            .map_err(DbError::from);

        swap::finish(pool, &staged, built).await
    }

    pub async fn fetch_error_rows(
        pool: &PgPool,
        table: &QualifiedName,
        columns: &StatColumns,
    ) -> Result<Vec<ErrorRecord>, DbError> {
        let rows = sqlx::query_as::<_, ErrorRow>(&statements::select_error_table(table, columns))
            .fetch_all(pool)
            .await?;
        rows.into_iter()
            .map(|row| ErrorRecord::try_from(row).map_err(DbError::from))
            .collect()
    }

    pub async fn fetch_timeline_rows(
        pool: &PgPool,
        table: &QualifiedName,
        columns: &StatColumns,
    ) -> Result<Vec<TimelineRecord>, DbError> {
        let rows =
            sqlx::query_as::<_, TimelineRow>(&statements::select_timeline_table(table, columns))
                .fetch_all(pool)
                .await?;
        rows.into_iter()
            .map(|row| TimelineRecord::try_from(row).map_err(DbError::from))
            .collect()
    }
}
