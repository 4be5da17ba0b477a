use clap::ValueEnum;
use std::io::{self, Write};

mod coffee;
mod config_cmd;
mod distributor;
mod search;
mod settings;
mod sync_cmd;

pub use coffee::CoffeeCommand;
pub use config_cmd::ConfigCommand;
pub use distributor::DistributorCommand;
pub use search::SearchCommand;
pub use settings::SettingsCommand;
pub use sync_cmd::SyncCommand;

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Asks a yes/no question on stdin. Anything but "y" means no.
fn confirm(prompt: &str) -> io::Result<bool> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

/// Shortens `text` to `width` characters, marking the cut with "...".
fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() > width {
        let kept: String = text.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        text.to_string()
    }
}
