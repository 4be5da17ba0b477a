use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_BRANCH: &str = "main";
pub const DEFAULT_INTERVAL_MINUTES: u32 = 15;

fn default_branch() -> String {
    DEFAULT_BRANCH.to_string()
}

fn default_interval() -> u32 {
    DEFAULT_INTERVAL_MINUTES
}

/// Remote mirror settings, persisted as the `sync_config` record.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncSettings {
    /// GitHub account or organisation that owns the repository
    #[serde(default)]
    pub owner: String,
    /// Repository name
    #[serde(default)]
    pub repo: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    /// Personal access token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Push after every local change and on the interval timer
    #[serde(default)]
    pub auto_sync: bool,
    #[serde(default = "default_interval")]
    pub interval_minutes: u32,

    /// Blob SHA seen by the last successful push or pull
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_sha: Option<String>,
    /// SHA-256 of the collections at the last successful push
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_pushed_digest: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            owner: String::new(),
            repo: String::new(),
            branch: default_branch(),
            token: None,
            auto_sync: false,
            interval_minutes: DEFAULT_INTERVAL_MINUTES,
            remote_sha: None,
            last_pushed_digest: None,
            last_synced_at: None,
        }
    }
}

impl SyncSettings {
    /// Returns true if a repository and a non-empty token are set.
    pub fn is_configured(&self) -> bool {
        !self.owner.trim().is_empty()
            && !self.repo.trim().is_empty()
            && self.token.as_deref().is_some_and(|t| !t.trim().is_empty())
    }

    /// Returns true if the auto-sync timer should run with these settings.
    pub fn wants_timer(&self) -> bool {
        self.auto_sync && self.is_configured() && self.interval_minutes > 0
    }

    /// Token with everything but the first four characters hidden.
    pub fn masked_token(&self) -> Option<String> {
        self.token.as_ref().map(|t| {
            let visible: String = t.chars().take(4).collect();
            format!("{}…", visible)
        })
    }

    /// Drops the credential and the cached remote state tied to it.
    pub fn clear_token(&mut self) {
        self.token = None;
        self.remote_sha = None;
    }

    /// Returns true if switching to `other` points at a different remote blob.
    pub fn targets_differ(&self, other: &SyncSettings) -> bool {
        self.owner != other.owner || self.repo != other.repo || self.branch != other.branch
    }
}

impl fmt::Debug for SyncSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncSettings")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("branch", &self.branch)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("auto_sync", &self.auto_sync)
            .field("interval_minutes", &self.interval_minutes)
            .field("remote_sha", &self.remote_sha)
            .field("last_pushed_digest", &self.last_pushed_digest)
            .field("last_synced_at", &self.last_synced_at)
            .finish()
    }
}
