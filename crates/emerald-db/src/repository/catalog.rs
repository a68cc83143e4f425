//! # Catalog Repository
//!
//! Read access to products and their category tax rates. The engine
//! treats the catalog as read-only: it snapshots prices at sale time
//! and never writes back.
//!
//! Category and product inserts exist for provisioning and tests.

use sqlx::SqlitePool;
use std::collections::HashMap;
use tracing::debug;

use crate::error::{DbError, DbResult};
use emerald_core::types::{CatalogEntry, Category, Product, TaxRate};
use emerald_core::validation::validate_tax_rate_bps;

/// Repository for catalog reads (products joined with category tax
/// rates).
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    /// Inserts a category. The tax rate is validated here as well as by
    /// the schema CHECK, so the caller gets a typed error instead of a
    /// constraint message.
    pub async fn insert_category(&self, category: &Category) -> DbResult<()> {
        validate_tax_rate_bps(category.tax_rate_bps).map_err(|e| DbError::CheckViolation {
            message: e.to_string(),
        })?;

        sqlx::query(
            r#"
            INSERT INTO categories (id, name, tax_rate_bps, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&category.id)
        .bind(&category.name)
        .bind(category.tax_rate_bps)
        .bind(category.created_at)
        .bind(category.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Inserts a product.
    pub async fn insert_product(&self, product: &Product) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO products
                (id, sku, name, category_id, price_cents, cost_cents,
                 strain, thc_percent, is_active, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&product.id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(&product.category_id)
        .bind(product.price_cents)
        .bind(product.cost_cents)
        .bind(&product.strain)
        .bind(product.thc_percent)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a product by ID.
    pub async fn get_product(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, sku, name, category_id, price_cents, cost_cents,
                   strain, thc_percent, is_active, created_at, updated_at
            FROM products
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Reads the pricing view for one product: current price and the
    /// category tax rate, or `default_rate` if the product is
    /// uncategorized.
    pub async fn catalog_entry(
        &self,
        product_id: &str,
        default_rate: TaxRate,
    ) -> DbResult<Option<CatalogEntry>> {
        let row = sqlx::query_as::<_, (String, i64, Option<u32>, bool)>(
            r#"
            SELECT p.id, p.price_cents, c.tax_rate_bps, p.is_active
            FROM products p
            LEFT JOIN categories c ON c.id = p.category_id
            WHERE p.id = ?1
            "#,
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(product_id, price_cents, tax_rate_bps, is_active)| CatalogEntry {
            product_id,
            price_cents,
            tax_rate_bps: tax_rate_bps.unwrap_or(default_rate.bps()),
            is_active,
        }))
    }

    /// Snapshots the pricing view for a set of products, keyed by
    /// product ID. Products not in the catalog are simply absent from
    /// the map; the caller decides whether that is an error.
    pub async fn snapshot(
        &self,
        product_ids: &[&str],
        default_rate: TaxRate,
    ) -> DbResult<HashMap<String, CatalogEntry>> {
        debug!(count = product_ids.len(), "Snapshotting catalog entries");

        let mut entries = HashMap::with_capacity(product_ids.len());

        for id in product_ids {
            if entries.contains_key(*id) {
                continue;
            }
            if let Some(entry) = self.catalog_entry(id, default_rate).await? {
                entries.insert(entry.product_id.clone(), entry);
            }
        }

        Ok(entries)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
