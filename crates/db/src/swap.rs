//! Build-then-swap for derived tables.
//!
//! Every derived table is built under a staging name in the target schema
//! and then swapped in with a drop and a rename inside one transaction, so
//! readers see either the previous table or the complete new one.

use sarcmp_core::ident::{Ident, QualifiedName};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbError;
use crate::statements;

/// Short random suffix for staging table names.
pub fn staging_tag() -> String {
    let hex = Uuid::now_v7().simple().to_string();
    hex[hex.len() - 8..].to_string()
}

/// A staging table and the table it will replace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Staged {
    pub target: QualifiedName,
    pub staging: QualifiedName,
}

impl Staged {
    pub fn new(target: QualifiedName) -> Result<Self, DbError> {
        let staging = target.staging(&staging_tag())?;
        Ok(Self { target, staging })
    }
}

pub async fn ensure_schema(pool: &PgPool, schema: &Ident) -> Result<(), sqlx::Error> {
    sqlx::query(&statements::create_schema(schema))
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn drop_table(pool: &PgPool, table: &QualifiedName) -> Result<(), sqlx::Error> {
    sqlx::query(&statements::drop_table(table))
        .execute(pool)
        .await?;
    Ok(())
}

/// Replace `staged.target` with `staged.staging` atomically.
pub async fn replace_table(pool: &PgPool, staged: &Staged) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query(&statements::drop_table(&staged.target))
        .execute(&mut *tx)
        .await?;
    sqlx::query(&statements::rename_table(
        &staged.staging,
        &staged.target.table,
    ))
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    tracing::debug!(table = %staged.target, "Swapped in rebuilt table");
    Ok(())
}

/// Drop a staging table after a failed build, logging instead of failing.
pub async fn discard(pool: &PgPool, staged: &Staged) {
    if let Err(e) = drop_table(pool, &staged.staging).await {
        tracing::warn!(
            error = %e,
            table = %staged.staging,
            "Failed to drop staging table",
        );
    }
}

/// Publish a finished build, or clean up after a failed one.
///
/// On success the staging table replaces the target and the built row
/// count is returned. On any failure the staging table is dropped and the
/// previous target stays untouched.
pub async fn finish(pool: &PgPool, staged: &Staged, built: Result<u64, DbError>) -> Result<u64, DbError> {
    let rows = match built {
        Ok(rows) => rows,
        Err(e) => {
            discard(pool, staged).await;
            return Err(e);
        }
    };
    if let Err(e) = replace_table(pool, staged).await {
        discard(pool, staged).await;
        return Err(e.into());
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_is_eight_hex_digits() {
        let tag = staging_tag();
        assert_eq!(tag.len(), 8);
        assert!(tag.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn staging_lives_in_target_schema() {
        let target = QualifiedName::new(
            Ident::new("error_flat").unwrap(),
            Ident::new("s1_grd_forest_asc").unwrap(),
        );
        let staged = Staged::new(target.clone()).unwrap();
        assert_eq!(staged.staging.schema, target.schema);
        assert!(staged
            .staging
            .table
            .as_str()
            .starts_with("s1_grd_forest_asc__stg_"));
    }
}
