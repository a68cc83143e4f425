//! # Sale Engine
//!
//! Orchestrates a sale's unit of work: validate, price, then commit the
//! transaction row, its line items, the stock decrements and the
//! loyalty credit in one database transaction. Either everything lands
//! or nothing does.
//!
//! ```text
//! create_sale
//!   │ validate input, fail fast on stock
//!   │ snapshot catalog, price cart (pure, emerald-core)
//!   ▼
//!   BEGIN ──► insert transaction + items
//!        ──► conditional stock decrements (rollback on shortfall)
//!        ──► loyalty credit
//!   COMMIT
//!   │
//!   ▼ post-commit, best-effort
//!   compliance log · event sink
//! ```
//!
//! Compliance logging and event publication run after commit: the sale
//! is financially complete at COMMIT, and an audit-trail hiccup must
//! not undo it. Their failures come back as warnings on the outcome.
//!
//! ## Transaction numbers
//! `TXN-YYYYMMDD-NNNN` is derived from a count of today's transactions.
//! Two concurrent sales can compute the same ordinal; the UNIQUE index
//! on `transaction_number` catches the loser, which retries with a
//! fresh count, up to [`MAX_TXN_NUMBER_ATTEMPTS`] times.

use std::sync::Arc;

use chrono::{NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::DbError;
use crate::events::{EngineEvent, EventSink, NullEventSink};
use crate::pool::Database;
use crate::repository::customer::CustomerRepository;
use crate::repository::inventory::InventoryRepository;
use crate::repository::transaction::TransactionRepository;
use emerald_core::loyalty::points_for_amount;
use emerald_core::pricing::{price_cart, CartLine};
use emerald_core::types::{
    format_transaction_number, PaymentMethod, PaymentStatus, Transaction, TransactionItem,
};
use emerald_core::validation::{validate_cart_size, validate_non_negative_cents, validate_quantity, validate_uuid};
use emerald_core::{CoreError, MAX_TXN_NUMBER_ATTEMPTS};

// =============================================================================
// Errors
// =============================================================================

/// Errors from engine operations: business rule violations from
/// emerald-core, plus the engine's own failure modes.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A business rule rejected the request (bad line, unknown product,
    /// insufficient stock, double refund, ...).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// No transaction with this ID exists.
    #[error("Transaction not found: {0}")]
    NotFound(String),

    /// Every attempt at allocating a daily transaction number collided.
    /// Only plausible under pathological write contention; the sale was
    /// not recorded and can be retried.
    #[error("Could not allocate a transaction number after {attempts} attempts")]
    TransactionNumberExhausted { attempts: u32 },

    /// Infrastructure failure (pool, SQL, migration).
    #[error(transparent)]
    Db(#[from] DbError),
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

// =============================================================================
// Requests and Outcomes
// =============================================================================

/// A sale request from a register.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSaleRequest {
    /// Optional: walk-in sales have no customer.
    pub customer_id: Option<String>,
    pub lines: Vec<CartLine>,
    pub payment_method: PaymentMethod,
    /// Order-level discount in cents, on top of any line discounts.
    #[serde(default)]
    pub discount_cents: i64,
    #[serde(default)]
    pub register_id: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A persisted sale: the transaction row plus its line items.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleRecord {
    pub transaction: Transaction,
    pub items: Vec<TransactionItem>,
}

/// Result of a committed engine operation. `warnings` reports
/// best-effort post-commit steps (compliance log) that failed without
/// affecting the sale itself.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleOutcome {
    pub sale: SaleRecord,
    pub warnings: Vec<String>,
}

// =============================================================================
// Engine
// =============================================================================

/// The transaction engine. Cheap to clone; clones share the pool and
/// the event sink.
#[derive(Clone)]
pub struct SaleEngine {
    db: Database,
    events: Arc<dyn EventSink>,
}

impl SaleEngine {
    /// Creates an engine that drops events. Use [`SaleEngine::with_events`]
    /// to attach a sink.
    pub fn new(db: Database) -> Self {
        SaleEngine {
            db,
            events: Arc::new(NullEventSink),
        }
    }

    /// Creates an engine publishing to the given sink.
    pub fn with_events(db: Database, events: Arc<dyn EventSink>) -> Self {
        SaleEngine { db, events }
    }

    /// Returns the underlying database handle.
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Processes a sale end to end. On success the transaction is
    /// committed with status `Completed`, stock is decremented and the
    /// customer (if any) has been credited.
    ///
    /// ## Errors
    /// All of [`CoreError`]'s validation and conflict variants, plus
    /// [`EngineError::TransactionNumberExhausted`] under extreme
    /// sequence contention. On any error, no state was changed.
    pub async fn create_sale(
        &self,
        req: &CreateSaleRequest,
        operator_id: &str,
    ) -> EngineResult<SaleOutcome> {
        validate_cart_size(req.lines.len()).map_err(CoreError::from)?;
        validate_non_negative_cents("discountAmount", req.discount_cents)
            .map_err(CoreError::from)?;
        if let Some(customer_id) = &req.customer_id {
            validate_uuid("customerId", customer_id).map_err(CoreError::from)?;
        }

        // Fail fast on stock before pricing. This read is advisory (a
        // concurrent sale can still win the race); the conditional
        // decrement inside the unit of work is the real guard.
        let inventory = self.db.inventory();
        for line in &req.lines {
            validate_quantity(line.quantity).map_err(|e| CoreError::InvalidLineItem {
                reason: e.to_string(),
            })?;

            let available = inventory
                .quantity_on_hand(&line.product_id)
                .await?
                .ok_or_else(|| CoreError::UnknownProduct(line.product_id.clone()))?;

            if available < line.quantity {
                return Err(CoreError::InsufficientStock {
                    product_id: line.product_id.clone(),
                    available,
                    requested: line.quantity,
                }
                .into());
            }
        }

        let settings = self.db.settings();
        let default_rate = settings.default_tax_rate().await?;
        let points_rate_bps = settings.loyalty_points_rate_bps().await?;

        let product_ids: Vec<&str> = req.lines.iter().map(|l| l.product_id.as_str()).collect();
        let catalog = self.db.catalog().snapshot(&product_ids, default_rate).await?;

        let pricing = price_cart(&req.lines, &catalog, req.discount_cents)?;
        let points = points_for_amount(pricing.total(), points_rate_bps);

        let transactions = self.db.transactions();

        for attempt in 1..=MAX_TXN_NUMBER_ATTEMPTS {
            let now = Utc::now();
            let today = now.date_naive();
            let day_start = today.and_time(NaiveTime::MIN).and_utc();

            let seq = transactions.count_for_day(day_start).await? + 1;
            let number = format_transaction_number(today, seq as u32);

            let txn = Transaction {
                id: Uuid::new_v4().to_string(),
                transaction_number: number,
                customer_id: req.customer_id.clone(),
                user_id: operator_id.to_string(),
                subtotal_cents: pricing.subtotal_cents,
                tax_cents: pricing.tax_cents,
                discount_cents: pricing.discount_cents,
                total_cents: pricing.total_cents,
                payment_method: req.payment_method,
                payment_status: PaymentStatus::Completed,
                register_id: req.register_id.clone(),
                notes: req.notes.clone(),
                created_at: now,
                updated_at: now,
            };

            let mut tx = self.db.pool().begin().await.map_err(DbError::from)?;

            match TransactionRepository::insert(&mut tx, &txn).await {
                Ok(()) => {}
                Err(err) if err.is_unique_violation_on("transaction_number") => {
                    tx.rollback().await.map_err(DbError::from)?;
                    warn!(
                        attempt,
                        transaction_number = %txn.transaction_number,
                        "Transaction number collision, retrying"
                    );
                    continue;
                }
                Err(err) => return Err(err.into()),
            }

            let mut items = Vec::with_capacity(pricing.lines.len());
            for line in &pricing.lines {
                let item = TransactionItem {
                    id: Uuid::new_v4().to_string(),
                    transaction_id: txn.id.clone(),
                    product_id: line.product_id.clone(),
                    quantity: line.quantity,
                    unit_price_cents: line.unit_price_cents,
                    discount_cents: line.discount_cents,
                    total_cents: line.total_cents,
                    created_at: now,
                };
                TransactionRepository::insert_item(&mut tx, &item).await?;
                items.push(item);
            }

            let mut stock_levels = Vec::with_capacity(req.lines.len());
            for line in &req.lines {
                match InventoryRepository::decrement(&mut tx, &line.product_id, line.quantity, now)
                    .await?
                {
                    Some(new_quantity) => stock_levels.push((line.product_id.clone(), new_quantity)),
                    None => {
                        // Lost the race since the fail-fast check
                        tx.rollback().await.map_err(DbError::from)?;
                        let available = inventory
                            .quantity_on_hand(&line.product_id)
                            .await?
                            .unwrap_or(0);
                        return Err(CoreError::InsufficientStock {
                            product_id: line.product_id.clone(),
                            available,
                            requested: line.quantity,
                        }
                        .into());
                    }
                }
            }

            if let Some(customer_id) = &req.customer_id {
                CustomerRepository::apply_purchase(
                    &mut tx,
                    customer_id,
                    pricing.total_cents,
                    points,
                    now,
                )
                .await?;
            }

            tx.commit().await.map_err(DbError::from)?;

            info!(
                transaction_number = %txn.transaction_number,
                total_cents = txn.total_cents,
                lines = items.len(),
                "Sale completed"
            );

            let mut warnings = Vec::new();
            if let Err(err) = self.db.compliance().log_sale(&txn, operator_id).await {
                warn!(error = %err, "Compliance log write failed after sale commit");
                warnings.push(format!("compliance log write failed: {err}"));
            }

            self.events.publish(EngineEvent::SaleCompleted {
                transaction_id: txn.id.clone(),
                transaction_number: txn.transaction_number.clone(),
                total_cents: txn.total_cents,
                user_id: operator_id.to_string(),
                timestamp: now,
            });
            for (product_id, quantity) in stock_levels {
                self.events.publish(EngineEvent::InventoryUpdated {
                    product_id,
                    quantity,
                    timestamp: now,
                });
            }

            return Ok(SaleOutcome {
                sale: SaleRecord { transaction: txn, items },
                warnings,
            });
        }

        Err(EngineError::TransactionNumberExhausted {
            attempts: MAX_TXN_NUMBER_ATTEMPTS,
        })
    }

    /// Refunds a settled sale: status moves to `Refunded`, stock comes
    /// back, the loyalty credit is reversed. Allowed exactly once.
    pub async fn refund_sale(
        &self,
        transaction_id: &str,
        operator_id: &str,
    ) -> EngineResult<SaleOutcome> {
        self.reverse_sale(transaction_id, operator_id, PaymentStatus::Refunded)
            .await
    }

    /// Voids a sale recorded in error. Same reversal side effects as a
    /// refund; the distinct terminal status records that no funds were
    /// settled.
    pub async fn void_sale(
        &self,
        transaction_id: &str,
        operator_id: &str,
    ) -> EngineResult<SaleOutcome> {
        self.reverse_sale(transaction_id, operator_id, PaymentStatus::Voided)
            .await
    }

    async fn reverse_sale(
        &self,
        transaction_id: &str,
        operator_id: &str,
        to: PaymentStatus,
    ) -> EngineResult<SaleOutcome> {
        let transactions = self.db.transactions();

        let before = transactions
            .get_by_id(transaction_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(transaction_id.to_string()))?;

        if before.payment_status.is_terminal() {
            return Err(CoreError::AlreadyRefunded {
                transaction_id: before.id,
                status: before.payment_status,
            }
            .into());
        }
        if !before.payment_status.can_transition_to(to) {
            return Err(CoreError::InvalidStatusTransition {
                from: before.payment_status,
                to,
            }
            .into());
        }

        let items = transactions.items_for(transaction_id).await?;
        let points_rate_bps = self.db.settings().loyalty_points_rate_bps().await?;
        let points = points_for_amount(before.total(), points_rate_bps);

        let now = Utc::now();
        let mut tx = self.db.pool().begin().await.map_err(DbError::from)?;

        let applied = TransactionRepository::transition_status(
            &mut tx,
            transaction_id,
            PaymentStatus::Completed,
            to,
            now,
        )
        .await?;

        if !applied {
            // A concurrent reversal won; report what they left behind.
            tx.rollback().await.map_err(DbError::from)?;
            let current = transactions
                .get_by_id(transaction_id)
                .await?
                .map(|t| t.payment_status)
                .unwrap_or(before.payment_status);
            return Err(CoreError::AlreadyRefunded {
                transaction_id: transaction_id.to_string(),
                status: current,
            }
            .into());
        }

        let mut stock_levels = Vec::with_capacity(items.len());
        for item in &items {
            let new_quantity =
                InventoryRepository::increase(&mut tx, &item.product_id, item.quantity, false, now)
                    .await?;
            stock_levels.push((item.product_id.clone(), new_quantity));
        }

        if let Some(customer_id) = &before.customer_id {
            CustomerRepository::apply_refund(&mut tx, customer_id, before.total_cents, points, now)
                .await?;
        }

        tx.commit().await.map_err(DbError::from)?;

        let mut after = before.clone();
        after.payment_status = to;
        after.updated_at = now;

        info!(
            transaction_number = %after.transaction_number,
            status = ?to,
            "Sale reversed"
        );

        let mut warnings = Vec::new();
        let audit = match to {
            PaymentStatus::Voided => {
                self.db
                    .compliance()
                    .log_void(&before, &after, operator_id)
                    .await
            }
            _ => {
                self.db
                    .compliance()
                    .log_refund(&before, &after, operator_id)
                    .await
            }
        };
        if let Err(err) = audit {
            warn!(error = %err, "Compliance log write failed after reversal commit");
            warnings.push(format!("compliance log write failed: {err}"));
        }

        for (product_id, quantity) in stock_levels {
            self.events.publish(EngineEvent::InventoryUpdated {
                product_id,
                quantity,
                timestamp: now,
            });
        }

        Ok(SaleOutcome {
            sale: SaleRecord {
                transaction: after,
                items,
            },
            warnings,
        })
    }

    /// Loads a sale with its line items.
    pub async fn get_sale(&self, transaction_id: &str) -> EngineResult<SaleRecord> {
        let transactions = self.db.transactions();
        let transaction = transactions
            .get_by_id(transaction_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(transaction_id.to_string()))?;
        let items = transactions.items_for(transaction_id).await?;

        Ok(SaleRecord { transaction, items })
    }

    /// Adds received stock for a product, stamping the restock date and
    /// auditing the adjustment. Returns the new on-hand quantity.
    pub async fn restock(
        &self,
        product_id: &str,
        quantity: i64,
        operator_id: &str,
    ) -> EngineResult<i64> {
        validate_quantity(quantity).map_err(CoreError::from)?;

        let now = Utc::now();
        let mut conn = self.db.pool().acquire().await.map_err(DbError::from)?;
        let after =
            match InventoryRepository::increase(&mut conn, product_id, quantity, true, now).await {
                Ok(new_quantity) => new_quantity,
                Err(DbError::NotFound { .. }) => {
                    return Err(CoreError::UnknownProduct(product_id.to_string()).into());
                }
                Err(err) => return Err(err.into()),
            };
        drop(conn);

        // Derived from the same atomic update; a separate read could
        // interleave with a concurrent adjustment and misstate the delta.
        let before = after - quantity;

        if let Err(err) = self
            .db
            .compliance()
            .log_inventory_adjustment(
                product_id,
                before,
                after,
                operator_id,
                &format!("Restock: +{quantity}"),
            )
            .await
        {
            warn!(error = %err, "Compliance log write failed after restock");
        }

        self.events.publish(EngineEvent::InventoryUpdated {
            product_id: product_id.to_string(),
            quantity: after,
            timestamp: now,
        });

        Ok(after)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
