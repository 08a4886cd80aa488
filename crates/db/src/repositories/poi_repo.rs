//! Repository for the base land-cover points (`landcover_poi.<class>`).

use sarcmp_core::ident::{poi_table, Ident, POI_SCHEMA};
use sarcmp_core::landcover::{ClassCodes, ClassDefinition, DerivedClass, Region};
use sarcmp_core::sampling::validate_class;
use sqlx::PgPool;

use crate::error::DbError;
use crate::statements;
use crate::swap::{self, Staged};

/// Generates and replaces base point tables.
pub struct PoiRepo;

impl PoiRepo {
    /// Area of every polygon belonging to `class`.
    pub async fn polygon_areas(
        pool: &PgPool,
        region: &Region,
        class: &ClassDefinition,
    ) -> Result<Vec<f64>, DbError> {
        let query = statements::polygon_areas(region)?;
        let areas = match class.codes {
            ClassCodes::Ids(ids) => {
                sqlx::query_scalar::<_, f64>(&query)
                    .bind(ids.to_vec())
                    .fetch_all(pool)
                    .await?
            }
            ClassCodes::Codes(codes) => {
                sqlx::query_scalar::<_, f64>(&query)
                    .bind(codes.iter().map(|c| c.to_string()).collect::<Vec<_>>())
                    .fetch_all(pool)
                    .await?
            }
        };
        Ok(areas)
    }

    /// Rebuild `landcover_poi.<class>` from the region's polygons.
    ///
    /// Returns the number of generated points; zero qualifying polygons
    /// yields an empty table.
    pub async fn generate(
        pool: &PgPool,
        region: &Region,
        class: &ClassDefinition,
    ) -> Result<u64, DbError> {
        validate_class(class)?;
        swap::ensure_schema(pool, &Ident::new(POI_SCHEMA)?).await?;

        let staged = Staged::new(poi_table(&Ident::new(class.name)?)?)?;
        let built = Self::build(pool, region, class, &staged).await;
        swap::finish(pool, &staged, built).await
    }

    async fn build(
        pool: &PgPool,
        region: &Region,
        class: &ClassDefinition,
        staged: &Staged,
    ) -> Result<u64, DbError> {
        let sql = statements::generate_poi(region, &staged.staging)?;
        tracing::debug!(sql = %sql, "Generating points of interest");

        let query = match class.codes {
            ClassCodes::Ids(ids) => sqlx::query(&sql).bind(ids.to_vec()),
            ClassCodes::Codes(codes) => {
                sqlx::query(&sql).bind(codes.iter().map(|c| c.to_string()).collect::<Vec<_>>())
            }
        };
        let rows = query
            .bind(class.density)
            .bind(class.max_cap)
            .bind(class.min_area)
            .execute(pool)
            .await?
            .rows_affected();

        sqlx::query(&statements::create_gist_index(&staged.staging))
            .execute(pool)
            .await?;
        Ok(rows)
    }

    /// Rebuild a derived class from its parent's points.
    pub async fn generate_derived(pool: &PgPool, derived: &DerivedClass) -> Result<u64, DbError> {
        swap::ensure_schema(pool, &Ident::new(POI_SCHEMA)?).await?;

        let parent = poi_table(&Ident::new(derived.parent)?)?;
        let staged = Staged::new(poi_table(&Ident::new(derived.name)?)?)?;

        let built = async {
            let query = statements::derive_poi(derived, &parent, &staged.staging)?;
            tracing::debug!(sql = %query, "Deriving points of interest");
            let rows = sqlx::query(&query)
                .bind(derived.zone_value)
                .execute(pool)
                .await?
                .rows_affected();
            sqlx::query(&statements::create_gist_index(&staged.staging))
                .execute(pool)
                .await?;
            Ok::<u64, DbError>(rows)
        }
        .await;

        swap::finish(pool, &staged, built).await
    }
}
