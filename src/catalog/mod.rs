//! Catalog service: distributors, coffees and the sync settings they travel with.
//!
//! The catalog owns the in-memory collections for the session and writes
//! every change through to the [`LocalStore`]. When auto-sync is enabled,
//! each successful mutation is announced on the write hook so the sync
//! orchestrator can push it.

mod search;

use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;

pub use search::Query;

use crate::models::{Coffee, CoffeeFields, Distributor, DistributorFields, SyncSettings};
use crate::storage::{LocalStore, Record, StoreError};

/// Label shown for coffees whose distributor can't be resolved.
pub const UNKNOWN_DISTRIBUTOR: &str = "Unknown distributor";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Missing required field: {0}")]
    Validation(&'static str),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CatalogError {
    fn distributor_not_found(id: &str) -> Self {
        CatalogError::NotFound {
            kind: "Distributor",
            id: id.to_string(),
        }
    }

    fn coffee_not_found(id: &str) -> Self {
        CatalogError::NotFound {
            kind: "Coffee",
            id: id.to_string(),
        }
    }
}

/// In-memory catalog backed by a [`LocalStore`].
pub struct Catalog {
    store: LocalStore,
    distributors: Vec<Distributor>,
    coffees: Vec<Coffee>,
    settings: SyncSettings,
    write_hook: Option<UnboundedSender<Record>>,
}

impl Catalog {
    /// Loads the catalog from the store.
    pub fn open(store: LocalStore) -> Result<Self, StoreError> {
        let snapshot = store.load()?;
        Ok(Self {
            store,
            distributors: snapshot.distributors,
            coffees: snapshot.coffees,
            settings: snapshot.settings,
            write_hook: None,
        })
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    /// Registers the channel that receives a notice after each write.
    pub fn set_write_hook(&mut self, hook: UnboundedSender<Record>) {
        self.write_hook = Some(hook);
    }

    /// Drops the write hook, closing the channel once no other sender remains.
    pub fn clear_write_hook(&mut self) {
        self.write_hook = None;
    }

    fn notify_write(&self, record: Record) {
        if !self.settings.auto_sync || !self.settings.is_configured() {
            return;
        }
        if let Some(hook) = &self.write_hook {
            if hook.send(record).is_err() {
                tracing::debug!("Write hook closed; skipping sync notice");
            }
        }
    }

    // ========== Distributors ==========

    pub fn distributors(&self) -> &[Distributor] {
        &self.distributors
    }

    pub fn distributor(&self, id: &str) -> Option<&Distributor> {
        self.distributors.iter().find(|d| d.id == id)
    }

    /// Finds a distributor by id, falling back to a case-insensitive exact name match.
    pub fn find_distributor(&self, identifier: &str) -> Option<&Distributor> {
        self.distributor(identifier).or_else(|| {
            let wanted = identifier.trim().to_lowercase();
            self.distributors
                .iter()
                .find(|d| d.name.to_lowercase() == wanted)
        })
    }

    /// Creates a distributor and returns its id.
    pub fn add_distributor(&mut self, fields: DistributorFields) -> Result<String, CatalogError> {
        if let Some(field) = fields.missing_field() {
            return Err(CatalogError::Validation(field));
        }

        let distributor = Distributor::new(fields);
        let id = distributor.id.clone();

        let mut next = self.distributors.clone();
        next.push(distributor);
        self.store.save_distributors(&next)?;
        self.distributors = next;

        tracing::info!(%id, "Added distributor");
        self.notify_write(Record::Distributors);
        Ok(id)
    }

    pub fn update_distributor(
        &mut self,
        id: &str,
        fields: DistributorFields,
    ) -> Result<(), CatalogError> {
        if let Some(field) = fields.missing_field() {
            return Err(CatalogError::Validation(field));
        }

        let mut next = self.distributors.clone();
        let distributor = next
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| CatalogError::distributor_not_found(id))?;
        distributor.apply(fields);

        self.store.save_distributors(&next)?;
        self.distributors = next;

        self.notify_write(Record::Distributors);
        Ok(())
    }

    /// Deletes a distributor together with every coffee that references it.
    ///
    /// Returns the number of coffees removed.
    pub fn delete_distributor(&mut self, id: &str) -> Result<usize, CatalogError> {
        if self.distributor(id).is_none() {
            return Err(CatalogError::distributor_not_found(id));
        }

        let distributors: Vec<Distributor> = self
            .distributors
            .iter()
            .filter(|d| d.id != id)
            .cloned()
            .collect();
        let coffees: Vec<Coffee> = self
            .coffees
            .iter()
            .filter(|c| c.distributor_id != id)
            .cloned()
            .collect();
        let removed = self.coffees.len() - coffees.len();

        // Children first, so a failure in between never leaves orphans behind.
        if removed > 0 {
            self.store.save_coffees(&coffees)?;
            self.coffees = coffees;
        }
        self.store.save_distributors(&distributors)?;
        self.distributors = distributors;

        tracing::info!(%id, removed_coffees = removed, "Deleted distributor");
        self.notify_write(Record::Distributors);
        Ok(removed)
    }

    pub fn search_distributors(&self, query: &str) -> Vec<&Distributor> {
        let query = Query::new(query);
        self.distributors
            .iter()
            .filter(|d| search::distributor_matches(&query, d))
            .collect()
    }

    pub fn coffee_count(&self, distributor_id: &str) -> usize {
        self.coffees
            .iter()
            .filter(|c| c.distributor_id == distributor_id)
            .count()
    }

    // ========== Coffees ==========

    pub fn coffees(&self) -> &[Coffee] {
        &self.coffees
    }

    pub fn coffee(&self, id: &str) -> Option<&Coffee> {
        self.coffees.iter().find(|c| c.id == id)
    }

    /// Finds a coffee by id, falling back to a case-insensitive exact name match.
    pub fn find_coffee(&self, identifier: &str) -> Option<&Coffee> {
        self.coffee(identifier).or_else(|| {
            let wanted = identifier.trim().to_lowercase();
            self.coffees.iter().find(|c| c.name.to_lowercase() == wanted)
        })
    }

    /// Coffees offered by one distributor, in stored order.
    pub fn coffees_for(&self, distributor_id: &str) -> Vec<&Coffee> {
        self.coffees
            .iter()
            .filter(|c| c.distributor_id == distributor_id)
            .collect()
    }

    /// Name of the coffee's distributor, or [`UNKNOWN_DISTRIBUTOR`].
    pub fn distributor_label(&self, coffee: &Coffee) -> &str {
        self.distributor(&coffee.distributor_id)
            .map(|d| d.name.as_str())
            .unwrap_or(UNKNOWN_DISTRIBUTOR)
    }

    /// Creates a coffee and returns its id.
    ///
    /// The distributor reference is not checked; dangling references are
    /// shown as [`UNKNOWN_DISTRIBUTOR`].
    pub fn add_coffee(&mut self, fields: CoffeeFields) -> Result<String, CatalogError> {
        validate_coffee(&fields)?;

        let coffee = Coffee::new(fields);
        let id = coffee.id.clone();
        if !coffee.distributor_id.is_empty() && self.distributor(&coffee.distributor_id).is_none()
        {
            tracing::warn!(%id, distributor_id = %coffee.distributor_id, "Coffee references unknown distributor");
        }

        let mut next = self.coffees.clone();
        next.push(coffee);
        self.store.save_coffees(&next)?;
        self.coffees = next;

        tracing::info!(%id, "Added coffee");
        self.notify_write(Record::Coffees);
        Ok(id)
    }

    pub fn update_coffee(&mut self, id: &str, fields: CoffeeFields) -> Result<(), CatalogError> {
        validate_coffee(&fields)?;

        let mut next = self.coffees.clone();
        let coffee = next
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| CatalogError::coffee_not_found(id))?;
        coffee.apply(fields);

        self.store.save_coffees(&next)?;
        self.coffees = next;

        self.notify_write(Record::Coffees);
        Ok(())
    }

    pub fn delete_coffee(&mut self, id: &str) -> Result<(), CatalogError> {
        if self.coffee(id).is_none() {
            return Err(CatalogError::coffee_not_found(id));
        }

        let next: Vec<Coffee> = self.coffees.iter().filter(|c| c.id != id).cloned().collect();
        self.store.save_coffees(&next)?;
        self.coffees = next;

        self.notify_write(Record::Coffees);
        Ok(())
    }

    pub fn search_coffees(&self, query: &str) -> Vec<&Coffee> {
        let query = Query::new(query);
        self.coffees
            .iter()
            .filter(|c| {
                let owner = self
                    .distributor(&c.distributor_id)
                    .map(|d| d.name.as_str())
                    .unwrap_or("");
                search::coffee_matches(&query, c, owner)
            })
            .collect()
    }

    // ========== Sync support ==========

    /// Replaces both collections wholesale (used by pull). Does not notify the write hook.
    pub fn replace_all(
        &mut self,
        distributors: Vec<Distributor>,
        coffees: Vec<Coffee>,
    ) -> Result<(), StoreError> {
        self.store.save_distributors(&distributors)?;
        self.store.save_coffees(&coffees)?;
        self.distributors = distributors;
        self.coffees = coffees;
        Ok(())
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// Persists new settings.
    pub fn update_settings(&mut self, settings: SyncSettings) -> Result<(), StoreError> {
        self.store.save_settings(&settings)?;
        self.settings = settings;
        Ok(())
    }

    /// Removes the stored credential.
    pub fn clear_token(&mut self) -> Result<(), StoreError> {
        let mut settings = self.settings.clone();
        settings.clear_token();
        self.update_settings(settings)
    }
}

fn validate_coffee(fields: &CoffeeFields) -> Result<(), CatalogError> {
    if let Some(field) = fields.missing_field() {
        return Err(CatalogError::Validation(field));
    }
    if let Some(field) = fields.invalid_number() {
        return Err(CatalogError::Validation(field));
    }
    Ok(())
}
