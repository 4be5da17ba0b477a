//! Mirror of the catalog in a GitHub repository.
//!
//! The whole catalog travels as a single JSON file written through the
//! GitHub contents API. Writes are guarded by the blob SHA the file had
//! when it was last read, so a concurrent edit from another device is
//! rejected instead of silently overwritten.
//!
//! # Usage
//!
//! ```no_run
//! use latebase::catalog::Catalog;
//! use latebase::storage::LocalStore;
//! use latebase::sync::{RemoteOptions, SyncOrchestrator};
//! use std::sync::Arc;
//! use tokio::sync::Mutex;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let catalog = Catalog::open(LocalStore::new("/tmp/latebase"))?;
//! let orchestrator = SyncOrchestrator::new(Arc::new(Mutex::new(catalog)), RemoteOptions::default())?;
//! orchestrator.sync_now().await?;
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod orchestrator;
mod snapshot;
mod timer;

#[cfg(test)]
pub(crate) mod fake_remote;

pub use client::{
    GitHubClient, RemoteBlob, RemoteOptions, RepoInfo, DEFAULT_API_URL, DEFAULT_REMOTE_PATH,
    DEFAULT_TIMEOUT,
};
pub use error::{RemoteError, SyncError};
pub use orchestrator::{PullOutcome, SharedCatalog, SyncOrchestrator, SyncOutcome, SyncPhase};
pub use snapshot::{decode, digest, encode, RemoteCatalog};
pub use timer::AutoSyncTimer;
