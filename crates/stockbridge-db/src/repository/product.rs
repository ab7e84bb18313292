//! # Catalog Repository
//!
//! Postgres operations on `catalog_products`.
//!
//! ## Update vs. Insert
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ProductUpsert { external_id: 42, ... }                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  find_by_external_id(42)                                                │
//! │       │                                                                 │
//! │       ├── Some(row) → update(row.id, upsert)   counted as "updated"     │
//! │       │                                                                 │
//! │       └── None      → insert(upsert)           counted as "created"     │
//! │                                                                         │
//! │  external_id is UNIQUE, so a concurrent insert of the same item        │
//! │  surfaces as DbError::UniqueViolation (per-record failure).            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::CatalogStore;
use stockbridge_core::{CatalogProduct, ProductUpsert};

const SELECT_COLUMNS: &str = r#"
    id, external_id, sku, name, description,
    price_cents, cost_price_cents, stock_quantity, unit,
    category_id, category_name, brand_id, brand_name,
    is_active, external_last_modified, external_created_at,
    last_synced_at, created_at, updated_at
"#;

/// Repository for catalog product operations.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: PgPool,
}

impl CatalogRepository {
    /// Creates a new CatalogRepository.
    pub fn new(pool: PgPool) -> Self {
        CatalogRepository { pool }
    }

    /// Gets a product by its backend id.
    pub async fn get_by_id(&self, id: Uuid) -> DbResult<Option<CatalogProduct>> {
        let sql = format!("SELECT {} FROM catalog_products WHERE id = $1", SELECT_COLUMNS);
        let product = sqlx::query_as::<_, CatalogProduct>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }
}

#[async_trait]
impl CatalogStore for CatalogRepository {
    async fn find_by_external_id(&self, external_id: i64) -> DbResult<Option<CatalogProduct>> {
        let sql = format!(
            "SELECT {} FROM catalog_products WHERE external_id = $1",
            SELECT_COLUMNS
        );
        let product = sqlx::query_as::<_, CatalogProduct>(&sql)
            .bind(external_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    async fn insert(&self, upsert: &ProductUpsert) -> DbResult<CatalogProduct> {
        debug!(sku = %upsert.sku, external_id = upsert.external_id, "Inserting catalog product");

        let sql = format!(
            r#"
            INSERT INTO catalog_products (
                id, external_id, sku, name, description,
                price_cents, cost_price_cents, stock_quantity, unit,
                category_id, category_name, brand_id, brand_name,
                is_active, external_last_modified, external_created_at,
                last_synced_at, created_at, updated_at
            ) VALUES (
                $1, $2, $3, $4, $5,
                $6, $7, $8, $9,
                $10, $11, $12, $13,
                $14, $15, $16,
                $17, NOW(), NOW()
            )
            RETURNING {}
            "#,
            SELECT_COLUMNS
        );

        let product = sqlx::query_as::<_, CatalogProduct>(&sql)
            .bind(Uuid::new_v4())
            .bind(upsert.external_id)
            .bind(&upsert.sku)
            .bind(&upsert.name)
            .bind(&upsert.description)
            .bind(upsert.price_cents)
            .bind(upsert.cost_price_cents)
            .bind(upsert.stock_quantity)
            .bind(&upsert.unit)
            .bind(upsert.category_id)
            .bind(&upsert.category_name)
            .bind(upsert.brand_id)
            .bind(&upsert.brand_name)
            .bind(upsert.is_active)
            .bind(upsert.external_last_modified)
            .bind(upsert.external_created_at)
            .bind(upsert.last_synced_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match DbError::from(e) {
                DbError::UniqueViolation { field, .. } => {
                    DbError::duplicate(field, upsert.external_id.to_string())
                }
                other => other,
            })?;

        Ok(product)
    }

    async fn update(&self, id: Uuid, upsert: &ProductUpsert) -> DbResult<CatalogProduct> {
        debug!(%id, sku = %upsert.sku, "Updating catalog product");

        let sql = format!(
            r#"
            UPDATE catalog_products SET
                external_id = $2,
                sku = $3,
                name = $4,
                description = $5,
                price_cents = $6,
                cost_price_cents = $7,
                stock_quantity = $8,
                unit = $9,
                category_id = $10,
                category_name = $11,
                brand_id = $12,
                brand_name = $13,
                is_active = $14,
                external_last_modified = $15,
                external_created_at = $16,
                last_synced_at = $17,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            SELECT_COLUMNS
        );

        let product = sqlx::query_as::<_, CatalogProduct>(&sql)
            .bind(id)
            .bind(upsert.external_id)
            .bind(&upsert.sku)
            .bind(&upsert.name)
            .bind(&upsert.description)
            .bind(upsert.price_cents)
            .bind(upsert.cost_price_cents)
            .bind(upsert.stock_quantity)
            .bind(&upsert.unit)
            .bind(upsert.category_id)
            .bind(&upsert.category_name)
            .bind(upsert.brand_id)
            .bind(&upsert.brand_name)
            .bind(upsert.is_active)
            .bind(upsert.external_last_modified)
            .bind(upsert.external_created_at)
            .bind(upsert.last_synced_at)
            .fetch_optional(&self.pool)
            .await?;

        product.ok_or_else(|| DbError::not_found("CatalogProduct", id))
    }

    /// Soft-deletes a product by setting is_active = false.
    ///
    /// Rows are never removed by ERP delete events so that storefront
    /// order history keeps resolving.
    async fn soft_delete(&self, id: Uuid, at: DateTime<Utc>) -> DbResult<()> {
        debug!(%id, "Soft-deleting catalog product");

        let result = sqlx::query(
            r#"
            UPDATE catalog_products
            SET
                is_active = FALSE,
                external_last_modified = $2,
                updated_at = $2
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("CatalogProduct", id));
        }

        Ok(())
    }

    async fn delete_all(&self) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM catalog_products")
            .execute(&self.pool)
            .await?;

        debug!(deleted = result.rows_affected(), "Cleared catalog");
        Ok(result.rows_affected())
    }

    async fn deactivate_missing(&self, keep: &[i64], at: DateTime<Utc>) -> DbResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE catalog_products
            SET is_active = FALSE, updated_at = $2
            WHERE external_id IS NOT NULL
              AND is_active = TRUE
              AND NOT (external_id = ANY($1))
            "#,
        )
        .bind(keep)
        .bind(at)
        .execute(&self.pool)
        .await?;

        debug!(deactivated = result.rows_affected(), "Deactivated products missing from ERP");
        Ok(result.rows_affected())
    }

    async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM catalog_products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Integration Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use stockbridge_core::mapping::map_external_product;
    use stockbridge_core::ExternalProduct;

    async fn database() -> Database {
        let url = std::env::var("DATABASE_URL").unwrap();
        Database::new(DbConfig::new(url).max_connections(2).run_migrations(true))
            .await
            .unwrap()
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL pointing at a disposable Postgres database"]
    async fn test_insert_update_soft_delete_cycle() {
        let repo = database().await.catalog();
        let external_id = 900_000_000 + (Utc::now().timestamp_subsec_nanos() as i64 % 1_000_000);

        let item = ExternalProduct {
            no: Some("IT-CYCLE".to_string()),
            unit_price: Some(15.5),
            ..ExternalProduct::with_id(external_id)
        };
        let upsert = map_external_product(&item, Utc::now());

        let created = repo.insert(&upsert).await.unwrap();
        assert_eq!(created.price_cents, 1550);

        let found = repo.find_by_external_id(external_id).await.unwrap().unwrap();
        assert_eq!(found.id, created.id);

        let changed = ProductUpsert {
            price_cents: 2000,
            ..upsert.clone()
        };
        let updated = repo.update(created.id, &changed).await.unwrap();
        assert_eq!(updated.price_cents, 2000);

        repo.soft_delete(created.id, Utc::now()).await.unwrap();
        let deleted = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert!(!deleted.is_active);

        let duplicate = repo.insert(&upsert).await.unwrap_err();
        assert!(matches!(duplicate, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL pointing at a disposable Postgres database"]
    async fn test_update_missing_row_is_not_found() {
        let repo = database().await.catalog();
        let upsert = map_external_product(&ExternalProduct::with_id(1), Utc::now());
        let err = repo.update(Uuid::new_v4(), &upsert).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
