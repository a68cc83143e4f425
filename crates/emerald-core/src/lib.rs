//! # emerald-core: Pure Business Logic for Emerald POS
//!
//! The heart of the dispensary point-of-sale system: every rule with
//! financial or regulatory consequences lives here as a pure function
//! with zero I/O dependencies.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  API surface (external)                                      │
//! │        │                                                     │
//! │        ▼                                                     │
//! │  emerald-db: SaleEngine + repositories (SQLite, sqlx)        │
//! │        │                                                     │
//! │        ▼                                                     │
//! │  ★ emerald-core (THIS CRATE) ★                               │
//! │    money · pricing · loyalty · validation · types · errors   │
//! │    NO I/O · NO DATABASE · NO NETWORK · PURE FUNCTIONS        │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Transaction, InventoryRecord, ...)
//! - [`money`] - Integer-cent money with aggregate half-even tax rounding
//! - [`pricing`] - The cart pricing & tax calculator
//! - [`loyalty`] - Loyalty point arithmetic
//! - [`validation`] - Input validation rules
//! - [`error`] - Typed domain errors
//!
//! ## Design principles
//!
//! 1. Deterministic: same input, same output, always.
//! 2. Integer money: cents (`i64`) everywhere, never floats.
//! 3. Typed errors: enum variants, never strings or panics.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod loyalty;
pub mod money;
pub mod pricing;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use pricing::{price_cart, CartLine, PricedLine, PricingResult};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct lines in a single sale.
///
/// Keeps transaction sizes reasonable; could become a per-store setting
/// later.
pub const MAX_CART_LINES: usize = 100;

/// Maximum quantity of a single line.
///
/// Guards against accidental over-entry (typing 1000 instead of 10).
pub const MAX_LINE_QUANTITY: i64 = 999;

/// Bounded retries for the daily transaction-number sequence when two
/// concurrent sales compute the same ordinal.
pub const MAX_TXN_NUMBER_ATTEMPTS: u32 = 3;
