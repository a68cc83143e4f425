//! # Customer Repository
//!
//! Customer reads plus the loyalty accumulator. The lifetime aggregates
//! (`total_spent_cents`, `visit_count`, `loyalty_points`) are adjusted
//! with relative SQL arithmetic, never read-modify-write from the
//! application, so concurrent sales for the same customer both land.
//!
//! Refunds floor spend and points at zero (legacy rows may hold fewer
//! points than the refund would debit) and deliberately leave
//! `visit_count` alone: the customer did visit.

use sqlx::{SqliteConnection, SqlitePool};
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::{DbError, DbResult};
use emerald_core::types::Customer;

/// Repository for customers and their loyalty aggregates.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Inserts a customer.
    pub async fn insert(&self, customer: &Customer) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO customers
                (id, first_name, last_name, email, phone, medical_card,
                 total_spent_cents, visit_count, loyalty_points,
                 created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.first_name)
        .bind(&customer.last_name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(&customer.medical_card)
        .bind(customer.total_spent_cents)
        .bind(customer.visit_count)
        .bind(customer.loyalty_points)
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a customer by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            SELECT id, first_name, last_name, email, phone, medical_card,
                   total_spent_cents, visit_count, loyalty_points,
                   created_at, updated_at
            FROM customers
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    /// Credits a completed sale to the customer: spend and points go
    /// up, visit count ticks once.
    pub async fn apply_purchase(
        conn: &mut SqliteConnection,
        customer_id: &str,
        total_cents: i64,
        points: i64,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        debug!(customer_id = %customer_id, total_cents, points, "Applying purchase to loyalty");

        let result = sqlx::query(
            r#"
            UPDATE customers
            SET total_spent_cents = total_spent_cents + ?2,
                visit_count = visit_count + 1,
                loyalty_points = loyalty_points + ?3,
                updated_at = ?4
            WHERE id = ?1
            "#,
        )
        .bind(customer_id)
        .bind(total_cents)
        .bind(points)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", customer_id));
        }

        Ok(())
    }

    /// Reverses a sale's loyalty credit. Spend and points are debited
    /// but floored at zero; the visit still happened, so `visit_count`
    /// is not decremented.
    pub async fn apply_refund(
        conn: &mut SqliteConnection,
        customer_id: &str,
        total_cents: i64,
        points: i64,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        debug!(customer_id = %customer_id, total_cents, points, "Reversing loyalty credit");

        let result = sqlx::query(
            r#"
            UPDATE customers
            SET total_spent_cents = MAX(0, total_spent_cents - ?2),
                loyalty_points = MAX(0, loyalty_points - ?3),
                updated_at = ?4
            WHERE id = ?1
            "#,
        )
        .bind(customer_id)
        .bind(total_cents)
        .bind(points)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", customer_id));
        }

        Ok(())
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

    fn customer(id: &str) -> Customer {
        let now = Utc::now();
        Customer {
            id: id.into(),
            first_name: "Jane".into(),
            last_name: "Doe".into(),
            email: None,
            phone: None,
            medical_card: None,
            total_spent_cents: 0,
            visit_count: 0,
            loyalty_points: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_purchase_then_refund_round_trip() {
        let db = test_db().await;
        let repo = db.customers();
        repo.insert(&customer("c1")).await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        CustomerRepository::apply_purchase(&mut conn, "c1", 10_000, 5, Utc::now())
            .await
            .unwrap();
        drop(conn);
        let c = repo.get_by_id("c1").await.unwrap().unwrap();
        assert_eq!(c.total_spent_cents, 10_000);
        assert_eq!(c.visit_count, 1);
        assert_eq!(c.loyalty_points, 5);

        let mut conn = db.pool().acquire().await.unwrap();
        CustomerRepository::apply_refund(&mut conn, "c1", 10_000, 5, Utc::now())
            .await
            .unwrap();
        drop(conn);
        let c = repo.get_by_id("c1").await.unwrap().unwrap();
        assert_eq!(c.total_spent_cents, 0);
        assert_eq!(c.loyalty_points, 0);
        // Visit is history; it stays
        assert_eq!(c.visit_count, 1);
    }

    #[tokio::test]
    async fn test_refund_floors_at_zero() {
        let db = test_db().await;
        let repo = db.customers();
        repo.insert(&customer("c1")).await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        CustomerRepository::apply_purchase(&mut conn, "c1", 1_000, 1, Utc::now())
            .await
            .unwrap();
        // Debit more than the balance: clamps, never negative
        CustomerRepository::apply_refund(&mut conn, "c1", 5_000, 10, Utc::now())
            .await
            .unwrap();
        drop(conn);

        let c = repo.get_by_id("c1").await.unwrap().unwrap();
        assert_eq!(c.total_spent_cents, 0);
        assert_eq!(c.loyalty_points, 0);
    }

    #[tokio::test]
    async fn test_unknown_customer_is_not_found() {
        let db = test_db().await;
        let mut conn = db.pool().acquire().await.unwrap();

        let err = CustomerRepository::apply_purchase(&mut conn, "ghost", 100, 0, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
