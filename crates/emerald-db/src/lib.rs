//! # emerald-db: Database Layer + Transaction Engine for Emerald POS
//!
//! All SQLite access for the dispensary POS lives in this crate, along
//! with the [`engine::SaleEngine`] that composes repositories into one
//! atomic unit of work per sale, refund or void.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      emerald-db                              │
//! │                                                              │
//! │   ┌────────────┐   ┌──────────────────┐   ┌──────────────┐  │
//! │   │  Database  │   │   Repositories   │   │  Migrations  │  │
//! │   │ (pool.rs)  │◄──│ catalog inventory│   │  (embedded)  │  │
//! │   │ SqlitePool │   │ customer txn     │   │ 001_init.sql │  │
//! │   │ WAL + FKs  │   │ compliance       │   └──────────────┘  │
//! │   └────────────┘   │ settings         │                     │
//! │         ▲          └──────────────────┘                     │
//! │         │                   ▲                               │
//! │   ┌─────┴───────────────────┴─────┐   ┌──────────────────┐  │
//! │   │   SaleEngine (engine.rs)      │──►│ EventSink        │  │
//! │   │   create / refund / void      │   │ (events.rs)      │  │
//! │   └───────────────────────────────┘   └──────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//! - [`engine`] - The sale transaction engine
//! - [`events`] - Post-commit event sink
//!
//! ## Usage
//!
//! ```rust,ignore
//! use emerald_db::{Database, DbConfig, SaleEngine};
//!
//! let db = Database::new(DbConfig::new("path/to/pos.db")).await?;
//! let engine = SaleEngine::new(db);
//!
//! let outcome = engine.create_sale(&request, operator_id).await?;
//! println!("{}", outcome.sale.transaction.transaction_number);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod engine;
pub mod error;
pub mod events;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use engine::{CreateSaleRequest, EngineError, EngineResult, SaleEngine, SaleOutcome, SaleRecord};
pub use error::{DbError, DbResult};
pub use events::{BroadcastEventSink, EngineEvent, EventSink, NullEventSink};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::catalog::CatalogRepository;
pub use repository::compliance::ComplianceRepository;
pub use repository::customer::CustomerRepository;
pub use repository::inventory::InventoryRepository;
pub use repository::settings::SettingsRepository;
pub use repository::transaction::TransactionRepository;
