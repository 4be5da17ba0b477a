mod coffee;
mod distributor;
mod number;
mod settings;

pub use coffee::{Coffee, CoffeeFields, PriceTier};
pub use distributor::{Distributor, DistributorFields};
pub use settings::{SyncSettings, DEFAULT_BRANCH, DEFAULT_INTERVAL_MINUTES};

/// Generates a new record id. UUID v7 keeps ids unique and creation-ordered.
pub(crate) fn new_id() -> String {
    uuid::Uuid::now_v7().to_string()
}
