//! Repository for the per-algorithm scene catalog (`scene_<alg>.*`) and
//! the shared `meta` table.

use std::collections::HashMap;

use sarcmp_core::ident::{scene_schema, Ident};
use sarcmp_core::landcover::OrbitDirection;
use sarcmp_core::types::AcquisitionTime;
use sqlx::PgPool;

use crate::error::DbError;
use crate::models::catalog::{CatalogRange, OrbitRow, ResolvedProduct};
use crate::statements;

/// Read-only lookups against the catalog written by the ingestion tooling.
pub struct SceneCatalogRepo;

impl SceneCatalogRepo {
    /// Catalog id of `product`, matched case-insensitively.
    pub async fn product_id(
        pool: &PgPool,
        algorithm: &Ident,
        product: &Ident,
    ) -> Result<i64, DbError> {
        let query = statements::find_product(&scene_schema(algorithm)?);
        sqlx::query_scalar::<_, i64>(&query)
            .bind(product.as_str())
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| DbError::ProductNotFound {
                algorithm: algorithm.as_str().to_string(),
                product: product.as_str().to_string(),
            })
    }

    /// Raster band index of `band` for product `pid`.
    pub async fn band_index(
        pool: &PgPool,
        algorithm: &Ident,
        product: &Ident,
        pid: i64,
        band: &Ident,
    ) -> Result<i32, DbError> {
        let query = statements::find_band(&scene_schema(algorithm)?);
        sqlx::query_scalar::<_, i32>(&query)
            .bind(pid)
            .bind(band.as_str())
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| DbError::BandNotFound {
                algorithm: algorithm.as_str().to_string(),
                product: product.as_str().to_string(),
                band: band.as_str().to_string(),
            })
    }

    /// Resolve product id and both band indices before any worker starts.
    pub async fn resolve(
        pool: &PgPool,
        algorithm: &Ident,
        product: &Ident,
        bands: &[Ident; 2],
    ) -> Result<ResolvedProduct, DbError> {
        let pid = Self::product_id(pool, algorithm, product).await?;
        let first = Self::band_index(pool, algorithm, product, pid, &bands[0]).await?;
        let second = Self::band_index(pool, algorithm, product, pid, &bands[1]).await?;

        Ok(ResolvedProduct {
            algorithm: algorithm.clone(),
            scene: scene_schema(algorithm)?,
            product: product.clone(),
            pid,
            band_indices: [first, second],
        })
    }

    /// Earliest and latest acquisition of product `pid`.
    pub async fn catalog_range(
        pool: &PgPool,
        algorithm: &Ident,
        pid: i64,
    ) -> Result<CatalogRange, DbError> {
        let query = statements::catalog_range(&scene_schema(algorithm)?);
        let (first, last) = sqlx::query_as::<_, (Option<AcquisitionTime>, Option<AcquisitionTime>)>(&query)
            .bind(pid)
            .fetch_one(pool)
            .await?;
        Ok(CatalogRange { first, last })
    }

    /// Orbit direction of every acquisition listed in `meta`.
    ///
    /// Rows with an unrecognised direction are left out.
    pub async fn orbit_directions(
        pool: &PgPool,
    ) -> Result<HashMap<AcquisitionTime, OrbitDirection>, sqlx::Error> {
        let rows = sqlx::query_as::<_, OrbitRow>(&statements::orbit_directions())
            .fetch_all(pool)
            .await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| row.direction().map(|d| (row.fdate, d)))
            .collect())
    }
}
