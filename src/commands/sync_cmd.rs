//! Sync CLI commands for mirroring the catalog to GitHub.

use clap::{Args, Subcommand};
use std::future::Future;
use std::time::Duration;

use latebase::sync::{PullOutcome, SyncError, SyncOrchestrator, SyncOutcome};

/// Push to (or pull from) the GitHub mirror
#[derive(Debug, Args)]
pub struct SyncCommand {
    #[command(subcommand)]
    command: Option<SyncSubcommand>,
}

#[derive(Debug, Subcommand)]
enum SyncSubcommand {
    /// Replace the local catalog with the copy stored on GitHub
    Pull {
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },

    /// Show sync configuration and state
    Status,

    /// Check that the repository is reachable with the stored token
    Test,

    /// Keep pushing on the auto-sync interval until interrupted
    Watch,
}

impl SyncCommand {
    pub async fn run(
        &self,
        orchestrator: &SyncOrchestrator,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            None => self.push(orchestrator).await,
            Some(SyncSubcommand::Pull { force }) => self.pull(orchestrator, *force).await,
            Some(SyncSubcommand::Status) => self.status(orchestrator).await,
            Some(SyncSubcommand::Test) => self.test(orchestrator).await,
            Some(SyncSubcommand::Watch) => self.watch(orchestrator).await,
        }
    }

    async fn push(&self, orchestrator: &SyncOrchestrator) -> Result<(), Box<dyn std::error::Error>> {
        println!("Pushing catalog to GitHub...");
        match orchestrator.sync_now().await {
            Ok(SyncOutcome::Pushed { sha }) => {
                println!("✓ pushed ({})", short_sha(&sha));
                Ok(())
            }
            Ok(SyncOutcome::Unchanged) => {
                println!("✓ up to date");
                Ok(())
            }
            Ok(SyncOutcome::Coalesced) => {
                println!("✓ queued behind a sync already in progress");
                Ok(())
            }
            Err(e) => Err(explain(e).into()),
        }
    }

    async fn pull(
        &self,
        orchestrator: &SyncOrchestrator,
        force: bool,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if !force
            && !super::confirm("Replace local distributors and coffees with the GitHub copy?")?
        {
            println!("Import cancelled.");
            return Ok(());
        }

        println!("Pulling catalog from GitHub...");
        match orchestrator.pull().await {
            Ok(PullOutcome::Imported {
                distributors,
                coffees,
            }) => {
                println!(
                    "✓ imported {} distributor(s) and {} coffee(s)",
                    distributors, coffees
                );
                Ok(())
            }
            Ok(PullOutcome::NotFound) => {
                println!("Nothing to import: the repository has no catalog file yet.");
                println!("Run 'latebase sync' to create it.");
                Ok(())
            }
            Err(e) => Err(explain(e).into()),
        }
    }

    async fn status(&self, orchestrator: &SyncOrchestrator) -> Result<(), Box<dyn std::error::Error>> {
        let settings = orchestrator.settings().await;

        println!("Sync Status");
        println!("===========");
        println!();

        if !settings.is_configured() {
            println!("Status: Not configured");
            println!();
            println!("To enable sync, run:");
            println!();
            println!("  latebase settings set --owner <owner> --repo <repo> --token <token>");
            return Ok(());
        }

        println!(
            "Repository: {}/{} ({})",
            settings.owner, settings.repo, settings.branch
        );
        println!(
            "Auto-sync:  {}",
            if settings.auto_sync {
                format!("enabled, every {} min", settings.interval_minutes)
            } else {
                "disabled".to_string()
            }
        );
        println!("State:      {}", orchestrator.phase());
        match settings.last_synced_at {
            Some(at) => println!("Last sync:  {}", at.to_rfc3339()),
            None => println!("Last sync:  never"),
        }
        if let Some(sha) = &settings.remote_sha {
            println!("Remote SHA: {}", short_sha(sha));
        }
        Ok(())
    }

    async fn test(&self, orchestrator: &SyncOrchestrator) -> Result<(), Box<dyn std::error::Error>> {
        print!("Connecting to GitHub... ");
        match orchestrator.test_connection().await {
            Ok(info) => {
                println!("✓ connected");
                println!();
                println!("Repository:     {}", info.full_name);
                println!("Default branch: {}", info.default_branch);
                println!(
                    "Visibility:     {}",
                    if info.private { "private" } else { "public" }
                );
                Ok(())
            }
            Err(e) => {
                println!("✗ failed");
                Err(explain(e).into())
            }
        }
    }

    async fn watch(&self, orchestrator: &SyncOrchestrator) -> Result<(), Box<dyn std::error::Error>> {
        orchestrator.rearm().await;
        let Some(period) = orchestrator.auto_sync_period() else {
            return Err(
                "Auto-sync is off. Enable it with 'latebase settings set --auto-sync true'.".into(),
            );
        };

        println!(
            "Auto-sync every {} min. Press Ctrl-C to stop.",
            period.as_secs() / 60
        );
        watch_until(orchestrator, tokio::signal::ctrl_c()).await
    }
}

/// How often `watch` checks that the timer is still armed.
const ARMED_CHECK: Duration = Duration::from_secs(1);

/// Keeps the process alive until `stop` resolves or the timer is disarmed.
///
/// The timer goes away when the token is rejected or auto-sync is turned
/// off, so waiting for Ctrl-C after that would do nothing.
async fn watch_until<F>(
    orchestrator: &SyncOrchestrator,
    stop: F,
) -> Result<(), Box<dyn std::error::Error>>
where
    F: Future<Output = std::io::Result<()>>,
{
    tokio::pin!(stop);
    let mut check = tokio::time::interval(ARMED_CHECK);

    loop {
        tokio::select! {
            signal = &mut stop => {
                signal?;
                orchestrator.shutdown();
                orchestrator.wait_for_idle().await;
                println!("Stopped.");
                return Ok(());
            }
            _ = check.tick() => {
                if orchestrator.auto_sync_period().is_some() {
                    continue;
                }
                orchestrator.wait_for_idle().await;
                let settings = orchestrator.settings().await;
                let hint = if settings.token.is_none() {
                    "Auto-sync stopped: the token was rejected. Set a new one with 'latebase settings set --token <token>'."
                } else {
                    "Auto-sync stopped: it was turned off. Enable it with 'latebase settings set --auto-sync true'."
                };
                return Err(hint.into());
            }
        }
    }
}

fn short_sha(sha: &str) -> &str {
    sha.get(..7).unwrap_or(sha)
}

/// Adds a hint for the failures a user can act on.
fn explain(e: SyncError) -> String {
    if e.is_auth() {
        format!(
            "{}\nThe token has been removed. Set a new one with 'latebase settings set --token <token>'.",
            e
        )
    } else {
        e.to_string()
    }
}
