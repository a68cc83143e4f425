//! # Error Types
//!
//! Typed domain errors for emerald-core.
//!
//! The taxonomy the API layer maps onto status codes:
//! - validation errors (`InvalidLineItem`, `InvalidDiscount`,
//!   `UnknownProduct`) - caller error, raised before any mutation,
//!   never retried;
//! - conflict errors (`InsufficientStock`, `AlreadyRefunded`) -
//!   detected mid-operation, terminal;
//! - everything infrastructural lives in emerald-db's `DbError` and is
//!   not classified further here.

use thiserror::Error;

use crate::types::PaymentStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations raised by the pricing calculator and the
/// transaction engine. Never strings, never panics.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A cart line is unusable: empty cart, zero/negative quantity,
    /// or a quantity above the per-line maximum.
    #[error("Invalid line item: {reason}")]
    InvalidLineItem { reason: String },

    /// The product id has no catalog entry (or no inventory record).
    #[error("Unknown product: {0}")]
    UnknownProduct(String),

    /// A discount would drive a line or the order total negative.
    #[error("Invalid discount: {reason}")]
    InvalidDiscount { reason: String },

    /// Not enough stock on hand to cover a requested line quantity.
    /// Carries the available quantity so the caller can surface it.
    #[error(
        "Insufficient stock for product {product_id}: available {available}, requested {requested}"
    )]
    InsufficientStock {
        product_id: String,
        available: i64,
        requested: i64,
    },

    /// The transaction already reached a terminal state; refund/void
    /// are allowed exactly once.
    #[error("Transaction {transaction_id} is already {status:?}")]
    AlreadyRefunded {
        transaction_id: String,
        status: PaymentStatus,
    },

    /// A status transition the state machine forbids.
    #[error("Cannot transition transaction from {from:?} to {to:?}")]
    InvalidStatusTransition {
        from: PaymentStatus,
        to: PaymentStatus,
    },

    /// Input validation failure (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Early input validation, before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            product_id: "p-42".to_string(),
            available: 1,
            requested: 2,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for product p-42: available 1, requested 2"
        );

        let err = CoreError::UnknownProduct("p-404".to_string());
        assert_eq!(err.to_string(), "Unknown product: p-404");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
