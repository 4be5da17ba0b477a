//! JSON record storage for the local catalog.
//!
//! Each record lives in its own file under the data directory:
//! ```text
//! <DATA_DIR>/
//!   distributors.json
//!   coffees.json
//!   sync_config.json
//! ```
//!
//! Records are read and written independently; there is no transaction
//! spanning more than one file.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::models::{Coffee, Distributor, SyncSettings};

/// Records persisted by the local store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Record {
    Distributors,
    Coffees,
    SyncConfig,
}

impl Record {
    pub const ALL: [Record; 3] = [Record::Distributors, Record::Coffees, Record::SyncConfig];

    /// Returns the filename for this record.
    pub fn filename(&self) -> &'static str {
        match self {
            Record::Distributors => "distributors.json",
            Record::Coffees => "coffees.json",
            Record::SyncConfig => "sync_config.json",
        }
    }
}

/// Everything the store holds, as loaded at startup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub distributors: Vec<Distributor>,
    pub coffees: Vec<Coffee>,
    pub settings: SyncSettings,
}

/// Errors that can occur during record storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error for {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize {record:?}: {source}")]
    Serialize {
        record: Record,
        #[source]
        source: serde_json::Error,
    },
}

/// File-backed store for the catalog records.
#[derive(Debug, Clone)]
pub struct LocalStore {
    data_dir: PathBuf,
}

impl LocalStore {
    /// Creates a store rooted at `data_dir`. Nothing is touched until the first save.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Returns the data directory path.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Returns the full path for a record.
    pub fn path(&self, record: Record) -> PathBuf {
        self.data_dir.join(record.filename())
    }

    /// Checks if a record exists on disk.
    pub fn exists(&self, record: Record) -> bool {
        self.path(record).exists()
    }

    /// Loads all three records, defaulting the missing ones.
    pub fn load(&self) -> Result<Snapshot, StoreError> {
        let snapshot = Snapshot {
            distributors: self.read(Record::Distributors)?.unwrap_or_default(),
            coffees: self.read(Record::Coffees)?.unwrap_or_default(),
            settings: self.read(Record::SyncConfig)?.unwrap_or_default(),
        };
        tracing::debug!(
            distributors = snapshot.distributors.len(),
            coffees = snapshot.coffees.len(),
            "Loaded catalog from {}",
            self.data_dir.display()
        );
        Ok(snapshot)
    }

    /// Reads one record.
    ///
    /// Returns `Ok(None)` if the file doesn't exist.
    pub fn read<T: DeserializeOwned>(&self, record: Record) -> Result<Option<T>, StoreError> {
        let path = self.path(record);

        match fs::read(&path) {
            Ok(bytes) => {
                let value = serde_json::from_slice(&bytes)
                    .map_err(|source| StoreError::Parse { path, source })?;
                Ok(Some(value))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }

    /// Overwrites one record wholesale.
    ///
    /// Creates the data directory if it doesn't exist.
    pub fn save<T: Serialize + ?Sized>(&self, record: Record, value: &T) -> Result<(), StoreError> {
        fs::create_dir_all(&self.data_dir).map_err(|source| StoreError::Io {
            path: self.data_dir.clone(),
            source,
        })?;

        let bytes = serde_json::to_vec_pretty(value)
            .map_err(|source| StoreError::Serialize { record, source })?;

        let path = self.path(record);
        fs::write(&path, bytes).map_err(|source| StoreError::Io { path, source })?;

        Ok(())
    }

    pub fn save_distributors(&self, distributors: &[Distributor]) -> Result<(), StoreError> {
        self.save(Record::Distributors, distributors)
    }

    pub fn save_coffees(&self, coffees: &[Coffee]) -> Result<(), StoreError> {
        self.save(Record::Coffees, coffees)
    }

    pub fn save_settings(&self, settings: &SyncSettings) -> Result<(), StoreError> {
        self.save(Record::SyncConfig, settings)
    }
}
