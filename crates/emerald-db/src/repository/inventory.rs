//! # Inventory Ledger Repository
//!
//! The only writer of `inventory.quantity`. Stock moves through two
//! operations:
//!
//! - [`InventoryRepository::decrement`]: conditional update that only
//!   applies when enough stock is on hand. Checking and decrementing in
//!   one statement is what makes concurrent sales of the last unit
//!   safe; a read-then-write sequence would let both sales pass the
//!   check.
//! - [`InventoryRepository::increase`]: unconditional addition, used by
//!   refunds, voids and restocks.
//!
//! Both run on a caller-supplied connection so the engine can scope
//! them to a sale's transaction.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use emerald_core::types::InventoryRecord;

/// Repository for the per-product inventory ledger.
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    /// Inserts an inventory record (one per product).
    pub async fn insert(&self, record: &InventoryRecord) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO inventory
                (id, product_id, quantity, reorder_level, reorder_quantity,
                 last_restock_date, expiry_date, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&record.id)
        .bind(&record.product_id)
        .bind(record.quantity)
        .bind(record.reorder_level)
        .bind(record.reorder_quantity)
        .bind(record.last_restock_date)
        .bind(record.expiry_date)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets the inventory record for a product.
    pub async fn get_by_product_id(&self, product_id: &str) -> DbResult<Option<InventoryRecord>> {
        let record = sqlx::query_as::<_, InventoryRecord>(
            r#"
            SELECT id, product_id, quantity, reorder_level, reorder_quantity,
                   last_restock_date, expiry_date, created_at, updated_at
            FROM inventory
            WHERE product_id = ?1
            "#,
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Current on-hand quantity for a product, or `None` if the product
    /// has no inventory row.
    pub async fn quantity_on_hand(&self, product_id: &str) -> DbResult<Option<i64>> {
        let quantity: Option<i64> =
            sqlx::query_scalar("SELECT quantity FROM inventory WHERE product_id = ?1")
                .bind(product_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(quantity)
    }

    /// Atomically decrements stock for a sale, but only if at least
    /// `quantity` units are on hand.
    ///
    /// Returns `Some(new_quantity)` when the decrement applied, `None`
    /// when stock was insufficient (or the row is missing). On `None`
    /// the caller is expected to roll back its transaction.
    pub async fn decrement(
        conn: &mut SqliteConnection,
        product_id: &str,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> DbResult<Option<i64>> {
        debug!(product_id = %product_id, quantity, "Decrementing inventory");

        let new_quantity: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE inventory
            SET quantity = quantity - ?2, updated_at = ?3
            WHERE product_id = ?1 AND quantity >= ?2
            RETURNING quantity
            "#,
        )
        .bind(product_id)
        .bind(quantity)
        .bind(now)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(new_quantity)
    }

    /// Adds stock back (refund, void) or in (restock). Restocks also
    /// stamp `last_restock_date`; reversals don't.
    ///
    /// Returns the new quantity; errors with `NotFound` if the product
    /// has no inventory row.
    pub async fn increase(
        conn: &mut SqliteConnection,
        product_id: &str,
        quantity: i64,
        restock: bool,
        now: DateTime<Utc>,
    ) -> DbResult<i64> {
        debug!(product_id = %product_id, quantity, restock, "Increasing inventory");

        let sql = if restock {
            r#"
            UPDATE inventory
            SET quantity = quantity + ?2, last_restock_date = ?3, updated_at = ?3
            WHERE product_id = ?1
            RETURNING quantity
            "#
        } else {
            r#"
            UPDATE inventory
            SET quantity = quantity + ?2, updated_at = ?3
            WHERE product_id = ?1
            RETURNING quantity
            "#
        };

        let new_quantity: Option<i64> = sqlx::query_scalar(sql)
            .bind(product_id)
            .bind(quantity)
            .bind(now)
            .fetch_optional(&mut *conn)
            .await?;

        new_quantity.ok_or_else(|| DbError::not_found("Inventory", product_id))
    }

    /// Products at or below their reorder threshold, lowest stock
    /// first.
    pub async fn low_stock(&self) -> DbResult<Vec<InventoryRecord>> {
        let records = sqlx::query_as::<_, InventoryRecord>(
            r#"
            SELECT id, product_id, quantity, reorder_level, reorder_quantity,
                   last_restock_date, expiry_date, created_at, updated_at
            FROM inventory
            WHERE quantity <= reorder_level
            ORDER BY quantity ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn seed_product(db: &Database, product_id: &str, stock: i64, reorder_level: i64) {
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO products (id, sku, name, price_cents, is_active, created_at, updated_at)
             VALUES (?1, ?2, ?3, 1000, 1, ?4, ?4)",
        )
        .bind(product_id)
        .bind(format!("SKU-{product_id}"))
        .bind(format!("Product {product_id}"))
        .bind(now)
        .execute(db.pool())
        .await
        .unwrap();

        db.inventory()
            .insert(&InventoryRecord {
                id: format!("inv-{product_id}"),
                product_id: product_id.into(),
                quantity: stock,
                reorder_level,
                reorder_quantity: 0,
                last_restock_date: None,
                expiry_date: None,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_decrement_applies_when_stock_suffices() {
        let db = test_db().await;
        seed_product(&db, "p1", 10, 2).await;

        let mut conn = db.pool().acquire().await.unwrap();
        let new_qty = InventoryRepository::decrement(&mut conn, "p1", 3, Utc::now())
            .await
            .unwrap();
        drop(conn);

        assert_eq!(new_qty, Some(7));
        assert_eq!(
            db.inventory().quantity_on_hand("p1").await.unwrap(),
            Some(7)
        );
    }

    #[tokio::test]
    async fn test_decrement_refused_when_stock_short() {
        let db = test_db().await;
        seed_product(&db, "p1", 2, 2).await;

        let mut conn = db.pool().acquire().await.unwrap();
        let new_qty = InventoryRepository::decrement(&mut conn, "p1", 3, Utc::now())
            .await
            .unwrap();
        drop(conn);

        assert_eq!(new_qty, None);
        // Untouched
        assert_eq!(
            db.inventory().quantity_on_hand("p1").await.unwrap(),
            Some(2)
        );
    }

    #[tokio::test]
    async fn test_decrement_to_exactly_zero() {
        let db = test_db().await;
        seed_product(&db, "p1", 3, 2).await;

        let mut conn = db.pool().acquire().await.unwrap();
        let new_qty = InventoryRepository::decrement(&mut conn, "p1", 3, Utc::now())
            .await
            .unwrap();

        assert_eq!(new_qty, Some(0));
    }

    #[tokio::test]
    async fn test_increase_restock_stamps_restock_date() {
        let db = test_db().await;
        seed_product(&db, "p1", 1, 2).await;

        // Refund-style reversal leaves last_restock_date alone
        let mut conn = db.pool().acquire().await.unwrap();
        InventoryRepository::increase(&mut conn, "p1", 2, false, Utc::now())
            .await
            .unwrap();
        drop(conn);
        let rec = db.inventory().get_by_product_id("p1").await.unwrap().unwrap();
        assert_eq!(rec.quantity, 3);
        assert!(rec.last_restock_date.is_none());

        // Restock stamps it
        let mut conn = db.pool().acquire().await.unwrap();
        InventoryRepository::increase(&mut conn, "p1", 5, true, Utc::now())
            .await
            .unwrap();
        drop(conn);
        let rec = db.inventory().get_by_product_id("p1").await.unwrap().unwrap();
        assert_eq!(rec.quantity, 8);
        assert!(rec.last_restock_date.is_some());
    }

    #[tokio::test]
    async fn test_increase_missing_row_is_not_found() {
        let db = test_db().await;

        let mut conn = db.pool().acquire().await.unwrap();
        let err = InventoryRepository::increase(&mut conn, "ghost", 1, false, Utc::now())
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_low_stock_listing() {
        let db = test_db().await;
        seed_product(&db, "low", 2, 5).await;
        seed_product(&db, "ok", 50, 5).await;

        let low = db.inventory().low_stock().await.unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].product_id, "low");
    }
}
