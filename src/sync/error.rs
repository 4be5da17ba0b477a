//! Sync error types.

use reqwest::StatusCode;
use thiserror::Error;

use crate::storage::StoreError;

/// Errors returned by the remote mirror client.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The write was rejected because the concurrency token is stale.
    #[error("Remote copy changed since it was last read (stale SHA); pull before pushing again")]
    Conflict,

    /// The credential was rejected.
    #[error("GitHub rejected the access token ({0})")]
    Auth(StatusCode),

    /// The repository or branch doesn't exist (or isn't visible with this token).
    #[error("Repository or branch not found: {0}")]
    NotFound(String),

    /// Transport failure or timeout.
    #[error("Network error: {0}")]
    Network(String),

    /// Any other non-success response.
    #[error("GitHub API error ({status}): {message}")]
    Api { status: StatusCode, message: String },

    /// The response body couldn't be understood.
    #[error("Unexpected response from GitHub: {0}")]
    Decode(String),
}

impl RemoteError {
    pub fn is_auth(&self) -> bool {
        matches!(self, RemoteError::Auth(_))
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            RemoteError::Decode(e.to_string())
        } else {
            RemoteError::Network(e.to_string())
        }
    }
}

/// Errors that can occur during sync orchestration.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Sync is not configured (or the credential was cleared)
    #[error("Sync not configured. Run 'latebase settings set --owner <owner> --repo <repo> --token <token>'.")]
    NotConfigured,

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Failed to encode catalog: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Remote catalog is not valid: {0}")]
    Decode(String),
}

impl SyncError {
    pub fn is_auth(&self) -> bool {
        matches!(self, SyncError::Remote(e) if e.is_auth())
    }
}
