//! # Domain Types
//!
//! Core domain types for Emerald POS: the product/category catalog,
//! per-product inventory records, customers with loyalty aggregates,
//! sale transactions with their immutable line items, and the
//! append-only compliance log.
//!
//! ## Dual-key identity
//! Every entity has an `id` (UUID v4, immutable, used for relations)
//! and, where it matters to humans, a business identifier (`sku`,
//! `transaction_number`).
//!
//! ## Snapshot pattern
//! A [`TransactionItem`] freezes the unit price at sale time. It is
//! never recomputed from the current catalog price, so historical sales
//! stay correct when products are repriced or deactivated.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate in basis points (1 bp = 0.01%, so 1550 = 15.5%).
///
/// Basis points keep tax math in integers; percentages only appear at
/// the edges (category CRUD, display).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a percentage (e.g. `15.5`).
    pub fn from_percentage(pct: f64) -> Self {
        TaxRate((pct * 100.0).round() as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// How a sale was tendered. Payment gateway integration is out of
/// scope; these are recorded tags only.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    Debit,
    Credit,
}

// =============================================================================
// Payment Status
// =============================================================================

/// The state machine of a sale transaction.
///
/// ```text
/// Pending ──► Completed ──► Refunded   (settled funds reversed)
///                      └──► Voided     (funds were never settled)
/// ```
///
/// `Pending` only exists while a sale is being validated and priced; a
/// persisted transaction is always `Completed` or one of the two
/// terminals. Exactly one terminal transition is allowed, and it is
/// enforced by a conditional update on the current status.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    /// Sale is being validated and priced (never persisted).
    Pending,
    /// Sale committed: stock decremented, loyalty credited.
    Completed,
    /// Settled sale reversed: stock restored, loyalty debited.
    Refunded,
    /// Recorded in error, no funds settled. Side effects reversed.
    Voided,
}

impl PaymentStatus {
    /// Whether `self -> to` is a legal transition. This is the single
    /// place transition rules live; callers never compare status
    /// strings.
    pub fn can_transition_to(self, to: PaymentStatus) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, to),
            (Pending, Completed) | (Completed, Refunded) | (Completed, Voided)
        )
    }

    /// Terminal states admit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, PaymentStatus::Refunded | PaymentStatus::Voided)
    }
}

impl Default for PaymentStatus {
    fn default() -> Self {
        PaymentStatus::Pending
    }
}

// =============================================================================
// Catalog: Category and Product
// =============================================================================

/// Product category. Carries the tax rate applied to all member
/// products' line totals.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Category {
    pub id: String,
    pub name: String,
    /// Tax rate in basis points; 0..=10000 (0% to 100%).
    pub tax_rate_bps: u32,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// A catalog product. Immutable during a sale; mutated only via
/// catalog CRUD (out of scope for the engine).
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Product {
    pub id: String,
    /// Stock Keeping Unit - business identifier, unique.
    pub sku: String,
    pub name: String,
    /// Uncategorized products fall back to the store-wide
    /// `default_tax_rate` setting when priced.
    pub category_id: Option<String>,
    /// Current unit price in cents.
    pub price_cents: i64,
    /// Unit cost in cents (margin reporting, not used by the engine).
    pub cost_cents: Option<i64>,
    /// Strain name (dispensary attribute, non-functional to the engine).
    pub strain: Option<String>,
    /// THC percentage (dispensary attribute, non-functional to the engine).
    pub thc_percent: Option<f64>,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

/// The catalog view the engine prices against: current price, the
/// category tax rate, and the active flag, read fresh at sale time
/// (never from a cache).
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CatalogEntry {
    pub product_id: String,
    pub price_cents: i64,
    pub tax_rate_bps: u32,
    pub is_active: bool,
}

impl CatalogEntry {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    #[inline]
    pub fn tax_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.tax_rate_bps)
    }
}

// =============================================================================
// Inventory
// =============================================================================

/// Per-product on-hand quantity, one-to-one with [`Product`].
///
/// `quantity` is never negative and is mutated only through the
/// inventory ledger's decrement/increase operations, never by direct
/// assignment.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InventoryRecord {
    pub id: String,
    pub product_id: String,
    pub quantity: i64,
    /// Threshold below which restocking is flagged (not enforced here).
    pub reorder_level: i64,
    /// Suggested restock quantity.
    pub reorder_quantity: i64,
    #[ts(as = "Option<String>")]
    pub last_restock_date: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub expiry_date: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl InventoryRecord {
    /// Whether on-hand quantity has fallen to the reorder threshold.
    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.reorder_level
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A dispensary customer. Sales may be anonymous (walk-in), so the
/// transaction's customer reference is optional.
///
/// The lifetime aggregates (`total_spent_cents`, `visit_count`,
/// `loyalty_points`) are mutated only by the loyalty accumulator, in
/// lockstep with a committed sale or refund.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// Medical card number (compliance attribute, non-functional here).
    pub medical_card: Option<String>,
    /// Lifetime spend in cents, floored at zero across refunds.
    pub total_spent_cents: i64,
    pub visit_count: i64,
    pub loyalty_points: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Transaction and Transaction Items
// =============================================================================

/// A sale transaction. Created once per sale; the status transitions
/// afterwards but the monetary fields and line items are immutable
/// post-creation.
///
/// Invariant: `total == subtotal + tax − discount` (all cents).
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Transaction {
    pub id: String,
    /// Human-readable `TXN-YYYYMMDD-NNNN`, sequential per day, unique.
    pub transaction_number: String,
    pub customer_id: Option<String>,
    /// Operator (authenticated user) id, supplied by the identity
    /// provider. Stored opaquely; authorization happens upstream.
    pub user_id: String,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub register_id: Option<String>,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// Checks the money invariant. Always true for engine-created
    /// transactions; used by audits and tests.
    pub fn balances(&self) -> bool {
        self.total_cents == self.subtotal_cents + self.tax_cents - self.discount_cents
    }
}

/// A line item of a [`Transaction`]. Owned exclusively by its parent;
/// deleted only by cascading transaction deletion (not exposed).
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TransactionItem {
    pub id: String,
    pub transaction_id: String,
    pub product_id: String,
    pub quantity: i64,
    /// Unit price in cents at sale time (frozen).
    pub unit_price_cents: i64,
    /// Per-line discount in cents.
    pub discount_cents: i64,
    /// `unit_price × quantity − discount`, in cents.
    pub total_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl TransactionItem {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// Formats the human-readable transaction number for the `seq`-th sale
/// of `date` (1-based).
///
/// ## Example
/// ```rust
/// use chrono::NaiveDate;
/// use emerald_core::types::format_transaction_number;
///
/// let date = NaiveDate::from_ymd_opt(2024, 1, 20).unwrap();
/// assert_eq!(format_transaction_number(date, 3), "TXN-20240120-0003");
/// ```
pub fn format_transaction_number(date: NaiveDate, seq: u32) -> String {
    format!("TXN-{}-{:04}", date.format("%Y%m%d"), seq)
}

// =============================================================================
// Compliance Log
// =============================================================================

/// Kind of audited event (seed-to-sale reporting).
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplianceEventType {
    Sale,
    Return,
    Void,
    InventoryAdjustment,
}

/// An append-only audit record. Never updated, never deleted.
///
/// `before_state`/`after_state` hold JSON documents (serialized
/// `serde_json::Value`) describing the mutated entity around the event.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ComplianceLogEntry {
    pub id: String,
    pub event_type: ComplianceEventType,
    /// Operator who caused the event.
    pub user_id: String,
    /// e.g. "transaction", "inventory".
    pub entity_type: String,
    pub entity_id: String,
    /// Human-readable action description.
    pub action: String,
    pub before_state: Option<String>,
    pub after_state: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Settings
// =============================================================================

/// A persisted key-value setting (`loyalty_points_rate`,
/// `default_tax_rate`, ...).
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Setting {
    pub key: String,
    pub value: String,
    pub category: Option<String>,
    pub description: Option<String>,
    pub updated_by: Option<String>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
