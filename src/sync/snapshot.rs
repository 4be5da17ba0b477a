//! The JSON document stored in the remote mirror.
//!
//! ```json
//! { "distributors": [...], "coffees": [...], "lastUpdated": "2024-05-01T10:00:00Z" }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::error::SyncError;
use crate::models::{Coffee, Distributor};

/// Catalog as read back from the mirror. Missing collections read as empty.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCatalog {
    #[serde(default)]
    pub distributors: Vec<Distributor>,
    #[serde(default)]
    pub coffees: Vec<Coffee>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OutgoingCatalog<'a> {
    distributors: &'a [Distributor],
    coffees: &'a [Coffee],
    last_updated: DateTime<Utc>,
}

#[derive(Serialize)]
struct Collections<'a> {
    distributors: &'a [Distributor],
    coffees: &'a [Coffee],
}

/// Serializes the collections for upload.
pub fn encode(
    distributors: &[Distributor],
    coffees: &[Coffee],
    last_updated: DateTime<Utc>,
) -> Result<Vec<u8>, SyncError> {
    serde_json::to_vec_pretty(&OutgoingCatalog {
        distributors,
        coffees,
        last_updated,
    })
    .map_err(SyncError::Encode)
}

pub fn decode(bytes: &[u8]) -> Result<RemoteCatalog, SyncError> {
    serde_json::from_slice(bytes).map_err(|e| SyncError::Decode(e.to_string()))
}

/// Hex SHA-256 of the collections, ignoring the timestamp.
pub fn digest(distributors: &[Distributor], coffees: &[Coffee]) -> Result<String, SyncError> {
    let bytes = serde_json::to_vec(&Collections {
        distributors,
        coffees,
    })
    .map_err(SyncError::Encode)?;
    Ok(Sha256::digest(&bytes)
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect())
}
