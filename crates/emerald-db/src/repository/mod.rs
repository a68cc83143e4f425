//! # Repository Layer
//!
//! One repository per aggregate. Each repository owns a clone of the
//! pool (cloning a pool is cheap; it is reference-counted internally).
//!
//! Operations that must participate in a sale's unit of work are
//! associated functions taking `&mut SqliteConnection`, so the engine
//! can run them inside one `BEGIN`/`COMMIT`. Plain reads and fixture
//! writes take `&self` and go through the pool.

pub mod catalog;
pub mod compliance;
pub mod customer;
pub mod inventory;
pub mod settings;
pub mod transaction;

pub use catalog::CatalogRepository;
pub use compliance::ComplianceRepository;
pub use customer::CustomerRepository;
pub use inventory::InventoryRepository;
pub use settings::SettingsRepository;
pub use transaction::TransactionRepository;
