//! # Compliance Log Repository
//!
//! Append-only audit trail for seed-to-sale reporting. Entries record
//! who did what to which entity, with JSON before/after snapshots of
//! the entity's relevant state. There is no update or delete path.
//!
//! Compliance writes happen after the sale's unit of work commits: a
//! failed audit write must never roll back a completed sale, so the
//! engine logs it as a warning instead.

use chrono::Utc;
use serde_json::json;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use emerald_core::types::{ComplianceEventType, ComplianceLogEntry, Transaction};

/// Repository for the append-only compliance log.
#[derive(Debug, Clone)]
pub struct ComplianceRepository {
    pool: SqlitePool,
}

impl ComplianceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ComplianceRepository { pool }
    }

    /// Appends one audit entry. `before`/`after` are serialized to JSON
    /// text columns.
    pub async fn append(
        &self,
        event_type: ComplianceEventType,
        user_id: &str,
        entity_type: &str,
        entity_id: &str,
        action: &str,
        before: Option<&serde_json::Value>,
        after: Option<&serde_json::Value>,
    ) -> DbResult<ComplianceLogEntry> {
        let entry = ComplianceLogEntry {
            id: Uuid::new_v4().to_string(),
            event_type,
            user_id: user_id.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            action: action.to_string(),
            before_state: before.map(|v| v.to_string()),
            after_state: after.map(|v| v.to_string()),
            created_at: Utc::now(),
        };

        debug!(
            entity_type = %entry.entity_type,
            entity_id = %entry.entity_id,
            action = %entry.action,
            "Appending compliance entry"
        );

        sqlx::query(
            r#"
            INSERT INTO compliance_log
                (id, event_type, user_id, entity_type, entity_id, action,
                 before_state, after_state, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&entry.id)
        .bind(entry.event_type)
        .bind(&entry.user_id)
        .bind(&entry.entity_type)
        .bind(&entry.entity_id)
        .bind(&entry.action)
        .bind(&entry.before_state)
        .bind(&entry.after_state)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;

        Ok(entry)
    }

    /// Audits a completed sale. No before-state: the transaction did
    /// not exist before.
    pub async fn log_sale(&self, txn: &Transaction, user_id: &str) -> DbResult<ComplianceLogEntry> {
        let after = json!({
            "transactionNumber": txn.transaction_number,
            "totalCents": txn.total_cents,
            "paymentStatus": txn.payment_status,
            "items": "see transaction_items",
        });

        self.append(
            ComplianceEventType::Sale,
            user_id,
            "transaction",
            &txn.id,
            &format!("Sale completed: {}", txn.transaction_number),
            None,
            Some(&after),
        )
        .await
    }

    /// Audits a refund: before is the settled sale, after the refunded
    /// state.
    pub async fn log_refund(
        &self,
        before: &Transaction,
        after: &Transaction,
        user_id: &str,
    ) -> DbResult<ComplianceLogEntry> {
        self.append(
            ComplianceEventType::Return,
            user_id,
            "transaction",
            &after.id,
            &format!("Sale refunded: {}", after.transaction_number),
            Some(&json!({ "paymentStatus": before.payment_status })),
            Some(&json!({
                "paymentStatus": after.payment_status,
                "totalCents": after.total_cents,
            })),
        )
        .await
    }

    /// Audits a void.
    pub async fn log_void(
        &self,
        before: &Transaction,
        after: &Transaction,
        user_id: &str,
    ) -> DbResult<ComplianceLogEntry> {
        self.append(
            ComplianceEventType::Void,
            user_id,
            "transaction",
            &after.id,
            &format!("Sale voided: {}", after.transaction_number),
            Some(&json!({ "paymentStatus": before.payment_status })),
            Some(&json!({ "paymentStatus": after.payment_status })),
        )
        .await
    }

    /// Audits a manual stock adjustment (restock, shrinkage count).
    pub async fn log_inventory_adjustment(
        &self,
        product_id: &str,
        quantity_before: i64,
        quantity_after: i64,
        user_id: &str,
        reason: &str,
    ) -> DbResult<ComplianceLogEntry> {
        self.append(
            ComplianceEventType::InventoryAdjustment,
            user_id,
            "inventory",
            product_id,
            reason,
            Some(&json!({ "quantity": quantity_before })),
            Some(&json!({ "quantity": quantity_after })),
        )
        .await
    }

    /// Most recent entries first.
    pub async fn list_recent(&self, limit: u32) -> DbResult<Vec<ComplianceLogEntry>> {
        let entries = sqlx::query_as::<_, ComplianceLogEntry>(
            r#"
            SELECT id, event_type, user_id, entity_type, entity_id, action,
                   before_state, after_state, created_at
            FROM compliance_log
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Full audit history for one entity, oldest first.
    pub async fn list_for_entity(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> DbResult<Vec<ComplianceLogEntry>> {
        let entries = sqlx::query_as::<_, ComplianceLogEntry>(
            r#"
            SELECT id, event_type, user_id, entity_type, entity_id, action,
                   before_state, after_state, created_at
            FROM compliance_log
            WHERE entity_type = ?1 AND entity_id = ?2
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .bind(entity_type)
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
