//! Push/pull orchestration between the local catalog and the GitHub mirror.
//!
//! Only one remote exchange runs at a time. A push requested while another
//! exchange is in flight is coalesced into a single follow-up push; a pull
//! waits its turn. The auto-sync timer and the write listener both go
//! through the same entry points.

use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard as StdMutexGuard};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::{Mutex, MutexGuard};
use tokio::task::JoinHandle;

use super::client::{GitHubClient, RemoteOptions, RepoInfo};
use super::error::{RemoteError, SyncError};
use super::snapshot;
use super::timer::AutoSyncTimer;
use crate::catalog::Catalog;
use crate::models::SyncSettings;
use crate::storage::Record;

/// Catalog shared between command handlers and the orchestrator.
pub type SharedCatalog = Arc<Mutex<Catalog>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Idle,
    Syncing,
    AutoSyncArmed,
}

impl std::fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncPhase::Idle => write!(f, "idle"),
            SyncPhase::Syncing => write!(f, "syncing"),
            SyncPhase::AutoSyncArmed => write!(f, "auto-sync armed"),
        }
    }
}

/// Result of a push request.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// The catalog was written; `sha` is the new concurrency token.
    Pushed { sha: String },
    /// Nothing changed since the last push.
    Unchanged,
    /// Another exchange was in flight; it will push once more when done.
    Coalesced,
}

/// Result of a pull.
#[derive(Debug, Clone, PartialEq)]
pub enum PullOutcome {
    Imported { distributors: usize, coffees: usize },
    /// The mirror file doesn't exist yet; local data was left alone.
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Manual,
    Timer,
    Write,
    Queued,
}

impl Trigger {
    /// Manual pushes always write; the rest skip when the collections are unchanged.
    fn skips_unchanged(self) -> bool {
        self != Trigger::Manual
    }
}

struct Inner {
    catalog: SharedCatalog,
    options: RemoteOptions,
    http: reqwest::Client,
    in_flight: Mutex<()>,
    pending_push: AtomicBool,
    timer: StdMutex<AutoSyncTimer>,
    phase: StdMutex<SyncPhase>,
}

impl Inner {
    fn timer(&self) -> StdMutexGuard<'_, AutoSyncTimer> {
        self.timer.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_phase(&self, phase: SyncPhase) {
        *self.phase.lock().unwrap_or_else(|e| e.into_inner()) = phase;
    }

    /// Resting phase: armed if the timer runs, idle otherwise.
    fn settle_phase(&self) {
        let armed = self.timer().is_armed();
        self.set_phase(if armed {
            SyncPhase::AutoSyncArmed
        } else {
            SyncPhase::Idle
        });
    }

    fn try_begin(&self) -> Option<Exchange<'_>> {
        let guard = self.in_flight.try_lock().ok()?;
        self.set_phase(SyncPhase::Syncing);
        Some(Exchange {
            _guard: guard,
            inner: self,
        })
    }

    async fn begin(&self) -> Exchange<'_> {
        let guard = self.in_flight.lock().await;
        self.set_phase(SyncPhase::Syncing);
        Exchange {
            _guard: guard,
            inner: self,
        }
    }
}

/// The single in-flight remote exchange. Dropping it returns to the resting phase.
struct Exchange<'a> {
    _guard: MutexGuard<'a, ()>,
    inner: &'a Inner,
}

impl Drop for Exchange<'_> {
    fn drop(&mut self) {
        self.inner.settle_phase();
    }
}

/// Coordinates pushes, pulls and the auto-sync timer.
#[derive(Clone)]
pub struct SyncOrchestrator {
    inner: Arc<Inner>,
}

impl SyncOrchestrator {
    pub fn new(catalog: SharedCatalog, options: RemoteOptions) -> Result<Self, RemoteError> {
        let http = options.http_client()?;
        Ok(Self {
            inner: Arc::new(Inner {
                catalog,
                options,
                http,
                in_flight: Mutex::new(()),
                pending_push: AtomicBool::new(false),
                timer: StdMutex::new(AutoSyncTimer::new()),
                phase: StdMutex::new(SyncPhase::Idle),
            }),
        })
    }

    pub fn catalog(&self) -> &SharedCatalog {
        &self.inner.catalog
    }

    /// Snapshot of the stored sync settings.
    pub async fn settings(&self) -> SyncSettings {
        self.inner.catalog.lock().await.settings().clone()
    }

    pub fn phase(&self) -> SyncPhase {
        *self.inner.phase.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Period of the running auto-sync timer, if any.
    pub fn auto_sync_period(&self) -> Option<Duration> {
        let timer = self.inner.timer();
        timer.is_armed().then(|| timer.period()).flatten()
    }

    /// Number of timers torn down by re-arming or cancelling.
    pub fn timer_cancellations(&self) -> u64 {
        self.inner.timer().cancellations()
    }

    // ========== Push ==========

    /// Pushes the local catalog now ("sync now").
    pub async fn sync_now(&self) -> Result<SyncOutcome, SyncError> {
        self.push(Trigger::Manual).await
    }

    async fn push(&self, trigger: Trigger) -> Result<SyncOutcome, SyncError> {
        let Some(exchange) = self.inner.try_begin() else {
            self.inner.pending_push.store(true, Ordering::SeqCst);
            tracing::debug!(?trigger, "Sync already in flight; push coalesced");
            return Ok(SyncOutcome::Coalesced);
        };

        let result = self.push_locked(trigger).await;
        self.finish(exchange).await;
        result
    }

    /// Runs pushes queued during the exchange, then releases it.
    async fn finish<'a>(&'a self, mut exchange: Exchange<'a>) {
        loop {
            while self.inner.pending_push.swap(false, Ordering::SeqCst) {
                if let Err(e) = self.push_locked(Trigger::Queued).await {
                    tracing::warn!("Queued sync failed: {}", e);
                }
            }
            drop(exchange);

            // A request may have slipped in between the last check and the release.
            if !self.inner.pending_push.load(Ordering::SeqCst) {
                return;
            }
            match self.inner.try_begin() {
                Some(next) => exchange = next,
                None => return,
            }
        }
    }

    async fn push_locked(&self, trigger: Trigger) -> Result<SyncOutcome, SyncError> {
        let (client, settings, distributors, coffees) = {
            let catalog = self.inner.catalog.lock().await;
            let settings = catalog.settings().clone();
            let client =
                GitHubClient::from_settings(self.inner.http.clone(), &self.inner.options, &settings)?;
            (
                client,
                settings,
                catalog.distributors().to_vec(),
                catalog.coffees().to_vec(),
            )
        };

        let digest = snapshot::digest(&distributors, &coffees)?;
        if trigger.skips_unchanged() && settings.last_pushed_digest.as_deref() == Some(&digest) {
            tracing::debug!(?trigger, "Catalog unchanged since last push");
            return Ok(SyncOutcome::Unchanged);
        }

        let sha = match settings.remote_sha.clone() {
            Some(sha) => Some(sha),
            None => self
                .checked(client.fetch_blob().await)
                .await?
                .map(|blob| blob.sha),
        };

        let now = Utc::now();
        let content = snapshot::encode(&distributors, &coffees, now)?;
        let message = format!(
            "Update catalog ({} distributors, {} coffees)",
            distributors.len(),
            coffees.len()
        );

        match client.put_blob(&content, sha.as_deref(), &message).await {
            Ok(new_sha) => {
                self.record_sync(&settings, |s| {
                    s.remote_sha = Some(new_sha.clone());
                    s.last_pushed_digest = Some(digest);
                    s.last_synced_at = Some(now);
                })
                .await?;
                tracing::info!(repo = %client.repo_slug(), sha = %new_sha, ?trigger, "Pushed catalog");
                Ok(SyncOutcome::Pushed { sha: new_sha })
            }
            Err(RemoteError::Conflict) => {
                // The next attempt re-reads the token and overwrites: last writer wins.
                self.record_sync(&settings, |s| s.remote_sha = None).await?;
                tracing::warn!(repo = %client.repo_slug(), "Push rejected: remote changed");
                Err(RemoteError::Conflict.into())
            }
            Err(e) => {
                if e.is_auth() {
                    self.forget_credential().await;
                }
                Err(e.into())
            }
        }
    }

    // ========== Pull ==========

    /// Replaces the local collections with the mirror's ("import").
    ///
    /// Waits for any in-flight exchange first.
    pub async fn pull(&self) -> Result<PullOutcome, SyncError> {
        let exchange = self.inner.begin().await;
        let result = self.pull_locked().await;
        self.finish(exchange).await;
        result
    }

    async fn pull_locked(&self) -> Result<PullOutcome, SyncError> {
        let (client, settings) = {
            let catalog = self.inner.catalog.lock().await;
            let settings = catalog.settings().clone();
            let client =
                GitHubClient::from_settings(self.inner.http.clone(), &self.inner.options, &settings)?;
            (client, settings)
        };

        let Some(blob) = self.checked(client.fetch_blob().await).await? else {
            tracing::info!(repo = %client.repo_slug(), "Nothing to import: remote file not found");
            return Ok(PullOutcome::NotFound);
        };

        let remote = snapshot::decode(&blob.content)?;
        let digest = snapshot::digest(&remote.distributors, &remote.coffees)?;
        let outcome = PullOutcome::Imported {
            distributors: remote.distributors.len(),
            coffees: remote.coffees.len(),
        };

        {
            let mut catalog = self.inner.catalog.lock().await;
            catalog.replace_all(remote.distributors, remote.coffees)?;
        }
        self.record_sync(&settings, |s| {
            s.remote_sha = Some(blob.sha.clone());
            s.last_pushed_digest = Some(digest);
            s.last_synced_at = Some(Utc::now());
        })
        .await?;

        tracing::info!(repo = %client.repo_slug(), sha = %blob.sha, ?outcome, "Imported catalog");
        Ok(outcome)
    }

    // ========== Connectivity ==========

    /// Checks that the configured repository is reachable with the stored token.
    pub async fn test_connection(&self) -> Result<RepoInfo, SyncError> {
        let client = {
            let catalog = self.inner.catalog.lock().await;
            GitHubClient::from_settings(
                self.inner.http.clone(),
                &self.inner.options,
                catalog.settings(),
            )?
        };
        self.checked(client.check_access().await).await
    }

    // ========== Settings & timer ==========

    /// Persists new settings and re-arms the auto-sync timer to match.
    pub async fn apply_settings(&self, mut settings: SyncSettings) -> Result<(), SyncError> {
        {
            let mut catalog = self.inner.catalog.lock().await;
            if catalog.settings().targets_differ(&settings) {
                settings.remote_sha = None;
                settings.last_pushed_digest = None;
            }
            catalog.update_settings(settings.clone())?;
        }
        self.rearm_with(&settings);
        Ok(())
    }

    /// Arms (or disarms) the timer from the stored settings.
    pub async fn rearm(&self) {
        let settings = self.settings().await;
        self.rearm_with(&settings);
    }

    fn rearm_with(&self, settings: &SyncSettings) {
        if settings.wants_timer() {
            let period = Duration::from_secs(u64::from(settings.interval_minutes) * 60);
            self.arm_timer(period);
            tracing::info!(minutes = settings.interval_minutes, "Auto-sync armed");
        } else if self.inner.timer().cancel() {
            tracing::info!("Auto-sync disarmed");
        }
        self.settle_unless_syncing();
    }

    /// Starts the repeating timer. Each tick spawns its push as a separate
    /// task, so re-arming or cancelling never aborts an exchange in flight.
    fn arm_timer(&self, period: Duration) {
        let weak = Arc::downgrade(&self.inner);
        self.inner.timer().arm(period, move || {
            if let Some(inner) = weak.upgrade() {
                let orchestrator = SyncOrchestrator { inner };
                tokio::spawn(async move { orchestrator.timer_tick().await });
            }
            std::future::ready(())
        });
    }

    async fn timer_tick(&self) {
        match self.push(Trigger::Timer).await {
            Ok(outcome) => tracing::debug!(?outcome, "Auto-sync tick"),
            Err(e) => tracing::warn!("Auto-sync failed: {}", e),
        }
    }

    /// Stops the auto-sync timer. Exchanges already running are left to finish.
    pub fn shutdown(&self) {
        self.inner.timer().cancel();
        self.settle_unless_syncing();
    }

    /// Waits for the in-flight exchange and any push queued behind it.
    pub async fn wait_for_idle(&self) {
        let exchange = self.inner.begin().await;
        self.finish(exchange).await;
    }

    // ========== Write listener ==========

    /// Pushes after catalog writes announced on `notices`.
    ///
    /// A burst of notices is folded into one push. The task ends when every
    /// sender is dropped.
    pub fn spawn_write_listener(&self, mut notices: UnboundedReceiver<Record>) -> JoinHandle<()> {
        let orchestrator = self.clone();
        tokio::spawn(async move {
            while let Some(record) = notices.recv().await {
                while notices.try_recv().is_ok() {}
                match orchestrator.push(Trigger::Write).await {
                    Ok(outcome) => tracing::debug!(?record, ?outcome, "Sync after write"),
                    Err(e) => tracing::warn!("Auto-sync: {}", e),
                }
            }
        })
    }

    // ========== Helpers ==========

    /// Passes a remote result through, clearing the credential on auth failures.
    async fn checked<T>(&self, result: Result<T, RemoteError>) -> Result<T, SyncError> {
        match result {
            Ok(value) => Ok(value),
            Err(e) if e.is_auth() => {
                self.forget_credential().await;
                Err(e.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn forget_credential(&self) {
        {
            let mut catalog = self.inner.catalog.lock().await;
            if let Err(e) = catalog.clear_token() {
                tracing::error!("Failed to clear rejected token: {}", e);
            }
        }
        tracing::warn!("GitHub rejected the access token; it has been removed from settings");
        // Only after the token is gone, so no tick can retry with it.
        self.inner.timer().cancel();
        self.settle_unless_syncing();
    }

    fn settle_unless_syncing(&self) {
        if self.phase() != SyncPhase::Syncing {
            self.inner.settle_phase();
        }
    }

    /// Applies bookkeeping to the stored settings, unless they now target another remote.
    async fn record_sync(
        &self,
        seen: &SyncSettings,
        update: impl FnOnce(&mut SyncSettings),
    ) -> Result<(), SyncError> {
        let mut catalog = self.inner.catalog.lock().await;
        let mut current = catalog.settings().clone();
        if current.targets_differ(seen) {
            return Ok(());
        }
        update(&mut current);
        catalog.update_settings(current)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Coffee, CoffeeFields, Distributor, DistributorFields};
    use crate::storage::LocalStore;
    use crate::sync::fake_remote::{FakeGitHub, GOOD_TOKEN};
    use tempfile::TempDir;
    use tokio::sync::mpsc;

    fn settings(token: &str) -> SyncSettings {
        SyncSettings {
            owner: "latebase".into(),
            repo: "catalog".into(),
            token: Some(token.into()),
            ..SyncSettings::default()
        }
    }

    async fn setup(server: &FakeGitHub, token: &str) -> (SyncOrchestrator, TempDir) {
        setup_with(server.options(), token).await
    }

    async fn setup_with(options: RemoteOptions, token: &str) -> (SyncOrchestrator, TempDir) {
        let temp = TempDir::new().unwrap();
        let mut catalog = Catalog::open(LocalStore::new(temp.path())).unwrap();
        catalog.update_settings(settings(token)).unwrap();
        let orchestrator = SyncOrchestrator::new(Arc::new(Mutex::new(catalog)), options).unwrap();
        (orchestrator, temp)
    }

    async fn wait_for_phase(orchestrator: &SyncOrchestrator, phase: SyncPhase) {
        for _ in 0..200 {
            if orchestrator.phase() == phase {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("phase never became {:?}", phase);
    }

    async fn seed(orchestrator: &SyncOrchestrator) -> (Vec<Distributor>, Vec<Coffee>) {
        let mut catalog = orchestrator.catalog().lock().await;
        let a = catalog
            .add_distributor(
                DistributorFields::new("Finca Alta", "Colombia", "Huila", "ventas@alta.co")
                    .with_description("Micro-lots"),
            )
            .unwrap();
        let b = catalog
            .add_distributor(DistributorFields::new("Kaffa", "Ethiopia", "Sidamo", "hi@kaffa.et"))
            .unwrap();
        for (owner, name) in [(&a, "Pink Bourbon"), (&b, "Guji"), (&a, "Gesha")] {
            catalog
                .add_coffee(
                    CoffeeFields::new(owner.as_str(), name, "Somewhere")
                        .with_profile("Variety", "Washed", "Light")
                        .with_altitude(1900.0)
                        .with_score(87.5)
                        .with_notes("florals")
                        .with_prices(12.0, 22.0, 40.0),
                )
                .unwrap();
        }
        (catalog.distributors().to_vec(), catalog.coffees().to_vec())
    }

    #[tokio::test]
    async fn test_push_then_pull_roundtrip() {
        let server = FakeGitHub::start().await;
        let (orchestrator, _temp) = setup(&server, GOOD_TOKEN).await;
        let (distributors, coffees) = seed(&orchestrator).await;

        let outcome = orchestrator.sync_now().await.unwrap();
        assert!(matches!(outcome, SyncOutcome::Pushed { .. }));

        // a second device pulls the same state
        let (other, _other_temp) = setup(&server, GOOD_TOKEN).await;
        let pulled = other.pull().await.unwrap();
        assert_eq!(
            pulled,
            PullOutcome::Imported {
                distributors: 2,
                coffees: 3
            }
        );
        let catalog = other.catalog().lock().await;
        assert_eq!(catalog.distributors(), distributors.as_slice());
        assert_eq!(catalog.coffees(), coffees.as_slice());
    }

    #[tokio::test]
    async fn test_pull_replaces_local_wholesale() {
        let server = FakeGitHub::start().await;
        let (orchestrator, temp) = setup(&server, GOOD_TOKEN).await;
        let (distributors, coffees) = seed(&orchestrator).await;
        orchestrator.sync_now().await.unwrap();

        {
            let mut catalog = orchestrator.catalog().lock().await;
            let first = catalog.distributors()[0].id.clone();
            catalog.delete_distributor(&first).unwrap();
            catalog
                .add_distributor(DistributorFields::new("Local only", "Peru", "Cusco", "x"))
                .unwrap();
        }

        orchestrator.pull().await.unwrap();

        let catalog = orchestrator.catalog().lock().await;
        assert_eq!(catalog.distributors(), distributors.as_slice());
        assert_eq!(catalog.coffees(), coffees.as_slice());

        // persisted too
        let reopened = Catalog::open(LocalStore::new(temp.path())).unwrap();
        assert_eq!(reopened.coffees(), coffees.as_slice());
    }

    #[tokio::test]
    async fn test_pull_missing_file_leaves_local_untouched() {
        let server = FakeGitHub::start().await;
        let (orchestrator, _temp) = setup(&server, GOOD_TOKEN).await;
        let (distributors, _) = seed(&orchestrator).await;

        assert_eq!(orchestrator.pull().await.unwrap(), PullOutcome::NotFound);

        let catalog = orchestrator.catalog().lock().await;
        assert_eq!(catalog.distributors(), distributors.as_slice());
    }

    #[tokio::test]
    async fn test_stale_token_conflicts_without_overwriting() {
        let server = FakeGitHub::start().await;
        let (orchestrator, _temp) = setup(&server, GOOD_TOKEN).await;
        seed(&orchestrator).await;
        orchestrator.sync_now().await.unwrap();

        // someone else writes in between
        server.overwrite(b"{\"distributors\":[],\"coffees\":[]}");
        let theirs = server.content();

        let err = orchestrator.sync_now().await.unwrap_err();
        assert!(matches!(err, SyncError::Remote(RemoteError::Conflict)));
        assert_eq!(server.content(), theirs);
        assert_eq!(orchestrator.phase(), SyncPhase::Idle);

        // token was dropped, so a manual retry re-reads it and wins
        assert!(orchestrator.catalog().lock().await.settings().remote_sha.is_none());
        let retry = orchestrator.sync_now().await.unwrap();
        assert!(matches!(retry, SyncOutcome::Pushed { .. }));
        assert_ne!(server.content(), theirs);
    }

    #[tokio::test]
    async fn test_push_over_existing_file_uses_fetched_token() {
        let server = FakeGitHub::start().await;
        server.overwrite(b"{}");
        let (orchestrator, _temp) = setup(&server, GOOD_TOKEN).await;
        seed(&orchestrator).await;

        let outcome = orchestrator.sync_now().await.unwrap();

        let sha = match outcome {
            SyncOutcome::Pushed { sha } => sha,
            other => panic!("expected a push, got {:?}", other),
        };
        assert_eq!(server.sha(), Some(sha.clone()));
        assert_eq!(
            orchestrator.catalog().lock().await.settings().remote_sha,
            Some(sha)
        );
    }

    #[tokio::test]
    async fn test_auth_error_clears_credential() {
        let server = FakeGitHub::start().await;
        let (orchestrator, temp) = setup(&server, "expired").await;
        seed(&orchestrator).await;

        let err = orchestrator.sync_now().await.unwrap_err();
        assert!(err.is_auth());

        assert!(orchestrator.catalog().lock().await.settings().token.is_none());
        let reopened = Catalog::open(LocalStore::new(temp.path())).unwrap();
        assert!(reopened.settings().token.is_none());

        // no further calls with the bad credential
        assert!(matches!(
            orchestrator.sync_now().await,
            Err(SyncError::NotConfigured)
        ));
        assert!(matches!(
            orchestrator.pull().await,
            Err(SyncError::NotConfigured)
        ));
        assert_eq!(server.put_count(), 0);
    }

    #[tokio::test]
    async fn test_auth_error_disarms_timer() {
        let server = FakeGitHub::start().await;
        let (orchestrator, _temp) = setup(&server, "expired").await;
        let mut s = settings("expired");
        s.auto_sync = true;
        orchestrator.apply_settings(s).await.unwrap();
        assert_eq!(orchestrator.phase(), SyncPhase::AutoSyncArmed);

        assert!(orchestrator.test_connection().await.unwrap_err().is_auth());

        assert_eq!(orchestrator.auto_sync_period(), None);
        assert_eq!(orchestrator.phase(), SyncPhase::Idle);
    }

    #[tokio::test]
    async fn test_concurrent_requests_are_coalesced() {
        let server = FakeGitHub::start().await;
        server.set_put_delay(Duration::from_millis(300));
        let (orchestrator, _temp) = setup(&server, GOOD_TOKEN).await;
        seed(&orchestrator).await;

        let first = tokio::spawn({
            let orchestrator = orchestrator.clone();
            async move { orchestrator.sync_now().await }
        });
        for _ in 0..100 {
            if orchestrator.phase() == SyncPhase::Syncing {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(orchestrator.phase(), SyncPhase::Syncing);

        // a change lands while the first push is in flight
        orchestrator
            .catalog()
            .lock()
            .await
            .add_distributor(DistributorFields::new("Late arrival", "Peru", "Cusco", "x"))
            .unwrap();
        assert_eq!(
            orchestrator.sync_now().await.unwrap(),
            SyncOutcome::Coalesced
        );
        assert_eq!(
            orchestrator.sync_now().await.unwrap(),
            SyncOutcome::Coalesced
        );

        assert!(matches!(
            first.await.unwrap().unwrap(),
            SyncOutcome::Pushed { .. }
        ));
        assert_eq!(server.put_count(), 2);
        assert_eq!(server.max_concurrent_puts(), 1);
        let remote = snapshot::decode(&server.content().unwrap()).unwrap();
        assert_eq!(remote.distributors.len(), 3);
        assert_eq!(orchestrator.phase(), SyncPhase::Idle);
    }

    #[tokio::test]
    async fn test_timer_push_skips_unchanged_catalog() {
        let server = FakeGitHub::start().await;
        let (orchestrator, _temp) = setup(&server, GOOD_TOKEN).await;
        seed(&orchestrator).await;

        orchestrator.sync_now().await.unwrap();
        assert_eq!(
            orchestrator.push(Trigger::Timer).await.unwrap(),
            SyncOutcome::Unchanged
        );
        assert_eq!(server.put_count(), 1);

        // manual pushes always write
        assert!(matches!(
            orchestrator.sync_now().await.unwrap(),
            SyncOutcome::Pushed { .. }
        ));

        orchestrator
            .catalog()
            .lock()
            .await
            .add_distributor(DistributorFields::new("New", "Peru", "Cusco", "x"))
            .unwrap();
        assert!(matches!(
            orchestrator.push(Trigger::Timer).await.unwrap(),
            SyncOutcome::Pushed { .. }
        ));
        assert_eq!(server.put_count(), 3);
    }

    #[tokio::test]
    async fn test_apply_settings_rearms_single_timer() {
        let server = FakeGitHub::start().await;
        let (orchestrator, _temp) = setup(&server, GOOD_TOKEN).await;
        assert_eq!(orchestrator.phase(), SyncPhase::Idle);

        let mut s = settings(GOOD_TOKEN);
        s.auto_sync = true;
        s.interval_minutes = 5;
        orchestrator.apply_settings(s.clone()).await.unwrap();
        assert_eq!(orchestrator.phase(), SyncPhase::AutoSyncArmed);
        assert_eq!(
            orchestrator.auto_sync_period(),
            Some(Duration::from_secs(300))
        );
        assert_eq!(orchestrator.timer_cancellations(), 0);

        s.interval_minutes = 10;
        orchestrator.apply_settings(s.clone()).await.unwrap();
        assert_eq!(
            orchestrator.auto_sync_period(),
            Some(Duration::from_secs(600))
        );
        assert_eq!(orchestrator.timer_cancellations(), 1);

        s.auto_sync = false;
        orchestrator.apply_settings(s).await.unwrap();
        assert_eq!(orchestrator.auto_sync_period(), None);
        assert_eq!(orchestrator.timer_cancellations(), 2);
        assert_eq!(orchestrator.phase(), SyncPhase::Idle);
    }

    #[tokio::test]
    async fn test_apply_settings_without_token_stays_idle() {
        let server = FakeGitHub::start().await;
        let (orchestrator, _temp) = setup(&server, GOOD_TOKEN).await;

        let mut s = settings(GOOD_TOKEN);
        s.auto_sync = true;
        s.token = None;
        orchestrator.apply_settings(s).await.unwrap();

        assert_eq!(orchestrator.auto_sync_period(), None);
        assert_eq!(orchestrator.phase(), SyncPhase::Idle);
    }

    #[tokio::test]
    async fn test_changing_repository_forgets_token() {
        let server = FakeGitHub::start().await;
        let (orchestrator, _temp) = setup(&server, GOOD_TOKEN).await;
        seed(&orchestrator).await;
        orchestrator.sync_now().await.unwrap();

        let mut s = orchestrator.catalog().lock().await.settings().clone();
        assert!(s.remote_sha.is_some());
        s.repo = "other".into();
        orchestrator.apply_settings(s).await.unwrap();

        let stored = orchestrator.catalog().lock().await.settings().clone();
        assert!(stored.remote_sha.is_none());
        assert!(stored.last_pushed_digest.is_none());
    }

    #[tokio::test]
    async fn test_write_listener_pushes_after_mutation() {
        let server = FakeGitHub::start().await;
        let (orchestrator, _temp) = setup(&server, GOOD_TOKEN).await;
        let mut s = settings(GOOD_TOKEN);
        s.auto_sync = true;
        orchestrator.apply_settings(s).await.unwrap();

        let (tx, rx) = mpsc::unbounded_channel();
        orchestrator.catalog().lock().await.set_write_hook(tx);
        let listener = orchestrator.spawn_write_listener(rx);

        {
            let mut catalog = orchestrator.catalog().lock().await;
            catalog
                .add_distributor(DistributorFields::new("A", "CO", "Huila", "x"))
                .unwrap();
            catalog
                .add_distributor(DistributorFields::new("B", "CO", "Huila", "y"))
                .unwrap();
            catalog.clear_write_hook();
        }
        listener.await.unwrap();
        orchestrator.shutdown();

        let remote = snapshot::decode(&server.content().unwrap()).unwrap();
        assert_eq!(remote.distributors.len(), 2);
        assert_eq!(server.put_count(), 1);
    }

    #[tokio::test]
    async fn test_connection_reports_repository() {
        let server = FakeGitHub::start().await;
        let (orchestrator, _temp) = setup(&server, GOOD_TOKEN).await;

        let info = orchestrator.test_connection().await.unwrap();
        assert_eq!(info.full_name, "latebase/catalog");
    }

    #[tokio::test]
    async fn test_unconfigured_sync_fails_fast() {
        let server = FakeGitHub::start().await;
        let temp = TempDir::new().unwrap();
        let catalog = Catalog::open(LocalStore::new(temp.path())).unwrap();
        let orchestrator =
            SyncOrchestrator::new(Arc::new(Mutex::new(catalog)), server.options()).unwrap();

        assert!(matches!(
            orchestrator.sync_now().await,
            Err(SyncError::NotConfigured)
        ));
        assert!(matches!(
            orchestrator.test_connection().await,
            Err(SyncError::NotConfigured)
        ));
        assert_eq!(orchestrator.phase(), SyncPhase::Idle);
    }

    #[tokio::test]
    async fn test_rearm_during_timer_push_lets_it_finish() {
        let server = FakeGitHub::start().await;
        let (orchestrator, _temp) = setup(&server, GOOD_TOKEN).await;
        seed(&orchestrator).await;
        orchestrator.sync_now().await.unwrap();

        orchestrator
            .catalog()
            .lock()
            .await
            .add_distributor(DistributorFields::new("Late arrival", "Peru", "Cusco", "x"))
            .unwrap();
        server.set_put_delay(Duration::from_millis(500));
        orchestrator.arm_timer(Duration::from_millis(50));
        wait_for_phase(&orchestrator, SyncPhase::Syncing).await;

        // settings change while the timed push is on the wire
        let mut s = orchestrator.settings().await;
        s.auto_sync = false;
        orchestrator.apply_settings(s).await.unwrap();
        assert_eq!(orchestrator.auto_sync_period(), None);

        orchestrator.wait_for_idle().await;

        assert_eq!(server.put_count(), 2);
        let remote = snapshot::decode(&server.content().unwrap()).unwrap();
        assert_eq!(remote.distributors.len(), 3);
        assert_eq!(
            orchestrator.settings().await.remote_sha,
            server.sha(),
            "token from the timed push must be kept"
        );
        assert_eq!(orchestrator.phase(), SyncPhase::Idle);
    }

    #[tokio::test]
    async fn test_shutdown_does_not_abort_timer_push() {
        let server = FakeGitHub::start().await;
        let (orchestrator, _temp) = setup(&server, GOOD_TOKEN).await;
        seed(&orchestrator).await;
        server.set_put_delay(Duration::from_millis(300));

        orchestrator.arm_timer(Duration::from_millis(50));
        wait_for_phase(&orchestrator, SyncPhase::Syncing).await;
        orchestrator.shutdown();
        orchestrator.wait_for_idle().await;

        assert_eq!(server.put_count(), 1);
        assert!(orchestrator.settings().await.remote_sha.is_some());
    }

    #[tokio::test]
    async fn test_timeout_is_network_error_and_keeps_settings() {
        let server = FakeGitHub::start().await;
        server.set_put_delay(Duration::from_secs(2));
        let options = RemoteOptions {
            timeout: Duration::from_millis(300),
            ..server.options()
        };
        let (orchestrator, _temp) = setup_with(options, GOOD_TOKEN).await;
        seed(&orchestrator).await;
        let before = orchestrator.settings().await;

        let err = orchestrator.sync_now().await.unwrap_err();

        assert!(matches!(err, SyncError::Remote(RemoteError::Network(_))));
        assert_eq!(orchestrator.settings().await, before);
        assert_eq!(orchestrator.phase(), SyncPhase::Idle);
    }
}
