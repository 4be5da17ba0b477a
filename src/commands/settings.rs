use clap::{Args, Subcommand};
use serde::Serialize;

use super::OutputFormat;
use latebase::models::SyncSettings;
use latebase::sync::SyncOrchestrator;

#[derive(Args)]
pub struct SettingsCommand {
    #[command(subcommand)]
    pub command: SettingsSubcommand,
}

#[derive(Subcommand)]
pub enum SettingsSubcommand {
    /// Show the GitHub sync settings
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Change the GitHub sync settings
    Set {
        /// Account or organisation that owns the repository
        #[arg(long)]
        owner: Option<String>,

        /// Repository name
        #[arg(long)]
        repo: Option<String>,

        /// Branch to read and write
        #[arg(long)]
        branch: Option<String>,

        /// Personal access token with contents read/write permission
        #[arg(long)]
        token: Option<String>,

        /// Push after every change and on a timer
        #[arg(long)]
        auto_sync: Option<bool>,

        /// Minutes between timed pushes
        #[arg(long)]
        interval: Option<u32>,
    },

    /// Forget the stored access token
    ClearToken,
}

/// Settings as shown to the user: the token is masked.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SettingsView<'a> {
    owner: &'a str,
    repo: &'a str,
    branch: &'a str,
    token: Option<String>,
    auto_sync: bool,
    interval_minutes: u32,
    configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    remote_sha: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_synced_at: Option<String>,
}

impl<'a> From<&'a SyncSettings> for SettingsView<'a> {
    fn from(s: &'a SyncSettings) -> Self {
        Self {
            owner: &s.owner,
            repo: &s.repo,
            branch: &s.branch,
            token: s.masked_token(),
            auto_sync: s.auto_sync,
            interval_minutes: s.interval_minutes,
            configured: s.is_configured(),
            remote_sha: s.remote_sha.as_deref(),
            last_synced_at: s.last_synced_at.map(|t| t.to_rfc3339()),
        }
    }
}

impl SettingsCommand {
    pub async fn run(
        &self,
        orchestrator: &SyncOrchestrator,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let current = orchestrator.catalog().lock().await.settings().clone();

        match &self.command {
            SettingsSubcommand::Show { format } => {
                let view = SettingsView::from(&current);
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&view)?);
                    }
                    OutputFormat::Text => print_settings(&view),
                }
                Ok(())
            }

            SettingsSubcommand::Set {
                owner,
                repo,
                branch,
                token,
                auto_sync,
                interval,
            } => {
                let has_updates = owner.is_some()
                    || repo.is_some()
                    || branch.is_some()
                    || token.is_some()
                    || auto_sync.is_some()
                    || interval.is_some();

                if !has_updates {
                    return Err("Nothing to update. Provide at least one option.".into());
                }

                let mut next = current.clone();
                if let Some(owner) = owner {
                    next.owner = owner.trim().to_string();
                }
                if let Some(repo) = repo {
                    next.repo = repo.trim().to_string();
                }
                if let Some(branch) = branch {
                    let branch = branch.trim();
                    if branch.is_empty() {
                        return Err("Branch cannot be empty".into());
                    }
                    next.branch = branch.to_string();
                }
                if let Some(token) = token {
                    let token = token.trim();
                    next.token = (!token.is_empty()).then(|| token.to_string());
                }
                if let Some(auto_sync) = auto_sync {
                    next.auto_sync = *auto_sync;
                }
                if let Some(interval) = interval {
                    if *interval == 0 {
                        return Err("Interval must be at least 1 minute".into());
                    }
                    next.interval_minutes = *interval;
                }

                orchestrator.apply_settings(next.clone()).await?;

                println!("Settings saved.");
                println!();
                print_settings(&SettingsView::from(&next));
                if next.auto_sync && !next.is_configured() {
                    println!();
                    println!("Auto-sync stays off until owner, repo and token are all set.");
                }
                Ok(())
            }

            SettingsSubcommand::ClearToken => {
                if current.token.is_none() {
                    println!("No token stored.");
                    return Ok(());
                }
                let mut next = current;
                next.clear_token();
                orchestrator.apply_settings(next).await?;
                println!("Token removed. Sync is disabled until a new token is set.");
                Ok(())
            }
        }
    }
}

fn print_settings(view: &SettingsView<'_>) {
    let or_unset = |s: &str| {
        if s.is_empty() {
            "(not set)".to_string()
        } else {
            s.to_string()
        }
    };

    println!("GitHub Sync Settings");
    println!("====================\n");
    println!("Owner:      {}", or_unset(view.owner));
    println!("Repository: {}", or_unset(view.repo));
    println!("Branch:     {}", view.branch);
    println!(
        "Token:      {}",
        view.token.as_deref().unwrap_or("(not set)")
    );
    println!(
        "Auto-sync:  {} (every {} min)",
        if view.auto_sync { "enabled" } else { "disabled" },
        view.interval_minutes
    );
    println!(
        "Status:     {}",
        if view.configured {
            "configured"
        } else {
            "not configured"
        }
    );
    if let Some(at) = &view.last_synced_at {
        println!("Last sync:  {}", at);
    }
}
