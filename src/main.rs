use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{
    CoffeeCommand, ConfigCommand, DistributorCommand, SearchCommand, SettingsCommand, SyncCommand,
};
use latebase::catalog::Catalog;
use latebase::config::Config;
use latebase::storage::LocalStore;
use latebase::sync::SyncOrchestrator;

#[derive(Parser)]
#[command(name = "latebase")]
#[command(version)]
#[command(about = "Catalog of coffee distributors and their coffees, synced to GitHub", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage distributors
    Distributor(DistributorCommand),

    /// Manage coffees
    Coffee(CoffeeCommand),

    /// Search distributors and coffees
    Search(SearchCommand),

    /// Manage GitHub sync settings
    Settings(SettingsCommand),

    /// Sync with the GitHub mirror
    Sync(SyncCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "latebase=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let cli_config_path = cli.config.clone();
    let config = Config::load(cli.config)?;

    let command = match cli.command {
        Some(Commands::Config(cmd)) => return cmd.run(&config, cli_config_path),
        Some(command) => command,
        None => {
            println!("Use --help to see available commands");
            return Ok(());
        }
    };

    let mut catalog = Catalog::open(LocalStore::new(config.data_dir.value.clone()))?;

    // Writes made while the command runs are pushed when auto-sync is on.
    let (notices, rx) = mpsc::unbounded_channel();
    catalog.set_write_hook(notices);
    let catalog = Arc::new(Mutex::new(catalog));
    let orchestrator = SyncOrchestrator::new(catalog.clone(), config.remote_options())?;
    let listener = orchestrator.spawn_write_listener(rx);

    let result = execute_command(&command, &orchestrator).await;

    // Closing the hook lets the listener finish any pending push and exit.
    catalog.lock().await.clear_write_hook();
    if let Err(e) = listener.await {
        tracing::warn!("Write listener stopped abnormally: {}", e);
    }
    orchestrator.shutdown();
    orchestrator.wait_for_idle().await;

    result
}

async fn execute_command(
    command: &Commands,
    orchestrator: &SyncOrchestrator,
) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = orchestrator.catalog();
    match command {
        Commands::Distributor(cmd) => cmd.run(catalog).await,
        Commands::Coffee(cmd) => cmd.run(catalog).await,
        Commands::Search(cmd) => cmd.run(catalog).await,
        Commands::Settings(cmd) => cmd.run(orchestrator).await,
        Commands::Sync(cmd) => cmd.run(orchestrator).await,
        Commands::Config(_) => Ok(()),
    }
}
