//! Late Base
//!
//! Catalog of coffee distributors and the coffees they sell, stored as
//! JSON files on disk and mirrored to a GitHub repository.

pub mod catalog;
pub mod config;
pub mod models;
pub mod storage;
pub mod sync;

pub use catalog::{Catalog, CatalogError, UNKNOWN_DISTRIBUTOR};
pub use config::{Config, ConfigError};
pub use models::{Coffee, CoffeeFields, Distributor, DistributorFields, PriceTier, SyncSettings};
pub use storage::{LocalStore, Record, StoreError};
pub use sync::{SyncError, SyncOrchestrator};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
