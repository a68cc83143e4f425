//! # Transaction Repository
//!
//! Persistence for sale transactions and their line items.
//!
//! Two operations carry the engine's concurrency guarantees:
//!
//! - [`TransactionRepository::insert`] relies on the UNIQUE index on
//!   `transaction_number`: when two registers race for the same daily
//!   sequence slot the loser gets a `UniqueViolation` and the engine
//!   retries with a fresh number.
//! - [`TransactionRepository::transition_status`] updates the status
//!   only `WHERE payment_status = <expected>`, so exactly one of two
//!   concurrent refund attempts wins.

use chrono::{DateTime, Duration, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use emerald_core::types::{PaymentStatus, Transaction, TransactionItem};

/// Repository for sale transactions.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
}

impl TransactionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        TransactionRepository { pool }
    }

    /// Number of transactions created in the day starting at
    /// `day_start` (UTC midnight). Feeds the daily sequence: the next
    /// transaction number is this count plus one.
    pub async fn count_for_day(&self, day_start: DateTime<Utc>) -> DbResult<i64> {
        let day_end = day_start + Duration::days(1);

        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM transactions WHERE created_at >= ?1 AND created_at < ?2",
        )
        .bind(day_start)
        .bind(day_end)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Inserts a transaction row. A duplicate `transaction_number`
    /// surfaces as [`crate::error::DbError::UniqueViolation`].
    pub async fn insert(conn: &mut SqliteConnection, txn: &Transaction) -> DbResult<()> {
        debug!(
            transaction_number = %txn.transaction_number,
            total_cents = txn.total_cents,
            "Inserting transaction"
        );

        sqlx::query(
            r#"
            INSERT INTO transactions
                (id, transaction_number, customer_id, user_id,
                 subtotal_cents, tax_cents, discount_cents, total_cents,
                 payment_method, payment_status, register_id, notes,
                 created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
        )
        .bind(&txn.id)
        .bind(&txn.transaction_number)
        .bind(&txn.customer_id)
        .bind(&txn.user_id)
        .bind(txn.subtotal_cents)
        .bind(txn.tax_cents)
        .bind(txn.discount_cents)
        .bind(txn.total_cents)
        .bind(txn.payment_method)
        .bind(txn.payment_status)
        .bind(&txn.register_id)
        .bind(&txn.notes)
        .bind(txn.created_at)
        .bind(txn.updated_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Inserts a line item under its parent transaction.
    pub async fn insert_item(conn: &mut SqliteConnection, item: &TransactionItem) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO transaction_items
                (id, transaction_id, product_id, quantity,
                 unit_price_cents, discount_cents, total_cents, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&item.id)
        .bind(&item.transaction_id)
        .bind(&item.product_id)
        .bind(item.quantity)
        .bind(item.unit_price_cents)
        .bind(item.discount_cents)
        .bind(item.total_cents)
        .bind(item.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Gets a transaction by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Transaction>> {
        let txn = sqlx::query_as::<_, Transaction>(
            r#"
            SELECT id, transaction_number, customer_id, user_id,
                   subtotal_cents, tax_cents, discount_cents, total_cents,
                   payment_method, payment_status, register_id, notes,
                   created_at, updated_at
            FROM transactions
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(txn)
    }

    /// Gets a transaction by its human-readable number.
    pub async fn get_by_number(&self, number: &str) -> DbResult<Option<Transaction>> {
        let txn = sqlx::query_as::<_, Transaction>(
            r#"
            SELECT id, transaction_number, customer_id, user_id,
                   subtotal_cents, tax_cents, discount_cents, total_cents,
                   payment_method, payment_status, register_id, notes,
                   created_at, updated_at
            FROM transactions
            WHERE transaction_number = ?1
            "#,
        )
        .bind(number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(txn)
    }

    /// Line items of a transaction, in insertion order.
    pub async fn items_for(&self, transaction_id: &str) -> DbResult<Vec<TransactionItem>> {
        let items = sqlx::query_as::<_, TransactionItem>(
            r#"
            SELECT id, transaction_id, product_id, quantity,
                   unit_price_cents, discount_cents, total_cents, created_at
            FROM transaction_items
            WHERE transaction_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(transaction_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Moves a transaction from `from` to `to`, but only if it is still
    /// in `from`. Returns whether the transition applied; `false` means
    /// someone else transitioned it first.
    pub async fn transition_status(
        conn: &mut SqliteConnection,
        id: &str,
        from: PaymentStatus,
        to: PaymentStatus,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        debug!(id = %id, ?from, ?to, "Transitioning transaction status");

        let result = sqlx::query(
            r#"
            UPDATE transactions
            SET payment_status = ?3, updated_at = ?4
            WHERE id = ?1 AND payment_status = ?2
            "#,
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::pool::{Database, DbConfig};
    use chrono::NaiveTime;
    use emerald_core::types::PaymentMethod;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn txn(id: &str, number: &str) -> Transaction {
        let now = Utc::now();
        Transaction {
            id: id.into(),
            transaction_number: number.into(),
            customer_id: None,
            user_id: "op-1".into(),
            subtotal_cents: 9000,
            tax_cents: 1395,
            discount_cents: 0,
            total_cents: 10395,
            payment_method: PaymentMethod::Cash,
            payment_status: PaymentStatus::Completed,
            register_id: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_insert_and_read_back() {
        let db = test_db().await;
        let repo = db.transactions();

        let mut conn = db.pool().acquire().await.unwrap();
        TransactionRepository::insert(&mut conn, &txn("t1", "TXN-20240120-0001"))
            .await
            .unwrap();
        drop(conn);

        let loaded = repo.get_by_id("t1").await.unwrap().unwrap();
        assert_eq!(loaded.transaction_number, "TXN-20240120-0001");
        assert_eq!(loaded.payment_status, PaymentStatus::Completed);
        assert_eq!(loaded.payment_method, PaymentMethod::Cash);
        assert!(loaded.balances());

        let by_number = repo.get_by_number("TXN-20240120-0001").await.unwrap();
        assert_eq!(by_number.unwrap().id, "t1");
    }

    #[tokio::test]
    async fn test_duplicate_number_is_unique_violation() {
        let db = test_db().await;

        let mut conn = db.pool().acquire().await.unwrap();
        TransactionRepository::insert(&mut conn, &txn("t1", "TXN-20240120-0001"))
            .await
            .unwrap();

        let err = TransactionRepository::insert(&mut conn, &txn("t2", "TXN-20240120-0001"))
            .await
            .unwrap_err();

        assert!(err.is_unique_violation_on("transaction_number"));
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_count_for_day() {
        let db = test_db().await;
        let repo = db.transactions();

        let mut conn = db.pool().acquire().await.unwrap();
        TransactionRepository::insert(&mut conn, &txn("t1", "TXN-A"))
            .await
            .unwrap();
        TransactionRepository::insert(&mut conn, &txn("t2", "TXN-B"))
            .await
            .unwrap();
        drop(conn);

        let today = Utc::now().date_naive().and_time(NaiveTime::MIN).and_utc();
        assert_eq!(repo.count_for_day(today).await.unwrap(), 2);
        assert_eq!(
            repo.count_for_day(today - Duration::days(1)).await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_transition_applies_exactly_once() {
        let db = test_db().await;
        let repo = db.transactions();

        let mut conn = db.pool().acquire().await.unwrap();
        TransactionRepository::insert(&mut conn, &txn("t1", "TXN-20240120-0001"))
            .await
            .unwrap();

        let first = TransactionRepository::transition_status(
            &mut conn,
            "t1",
            PaymentStatus::Completed,
            PaymentStatus::Refunded,
            Utc::now(),
        )
        .await
        .unwrap();
        assert!(first);

        // Already refunded; the guarded update no longer matches
        let second = TransactionRepository::transition_status(
            &mut conn,
            "t1",
            PaymentStatus::Completed,
            PaymentStatus::Refunded,
            Utc::now(),
        )
        .await
        .unwrap();
        assert!(!second);
        drop(conn);

        let loaded = repo.get_by_id("t1").await.unwrap().unwrap();
        assert_eq!(loaded.payment_status, PaymentStatus::Refunded);
    }
}
