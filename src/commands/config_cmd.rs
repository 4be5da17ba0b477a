use clap::{Args, Subcommand};
use std::fs;
use std::io::Write;
use std::path::PathBuf;

use super::OutputFormat;
use latebase::config::{Config, ConfigValue};

#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show current configuration values
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Initialize configuration file
    Init,
}

const DEFAULT_CONFIG: &str = r#"# latebase configuration

# Directory for distributors.json, coffees.json and sync_config.json
# (default: platform data dir, e.g. /home/<user>/.local/share/latebase)
# "~" is not expanded. Use an absolute path, or one relative to this file.
# data_dir: /home/me/.local/share/latebase

# GitHub REST API base URL (change for GitHub Enterprise)
# api_url: https://api.github.com

# Path of the catalog file inside the repository
remote_path: data.json

# Timeout for each GitHub request, in seconds
# request_timeout_secs: 30
"#;

impl ConfigCommand {
    pub fn run(
        &self,
        config: &Config,
        cli_config_path: Option<PathBuf>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ConfigSubcommand::Show { format } => {
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(config)?);
                    }
                    OutputFormat::Text => {
                        println!("Configuration");
                        println!("=============\n");

                        if let Some(path) = &config.config_file {
                            println!("Config file: {}", path.display());
                        } else {
                            let path = cli_config_path.unwrap_or_else(Config::default_config_path);
                            println!("Config file: {} (not found)", path.display());
                        }
                        println!();

                        print_value("data_dir", &config.data_dir, |v| v.display().to_string());
                        print_value("api_url", &config.api_url, String::clone);
                        print_value("remote_path", &config.remote_path, String::clone);
                        print_value(
                            "request_timeout_secs",
                            &config.request_timeout_secs,
                            u64::to_string,
                        );
                    }
                }
                Ok(())
            }

            ConfigSubcommand::Init => {
                let config_path = cli_config_path.unwrap_or_else(Config::default_config_path);

                if config_path.exists() {
                    println!("Config file already exists: {}", config_path.display());
                    println!("Use 'latebase config show' to view current configuration.");
                    return Ok(());
                }

                if let Some(parent) = config_path.parent() {
                    fs::create_dir_all(parent)?;
                }

                let mut file = fs::File::create(&config_path)?;
                file.write_all(DEFAULT_CONFIG.as_bytes())?;

                println!("Created config file: {}", config_path.display());
                println!("\nEdit this file to customize your settings.");
                Ok(())
            }
        }
    }
}

fn print_value<T>(name: &str, value: &ConfigValue<T>, render: impl Fn(&T) -> String) {
    println!("{}: {}", name, render(&value.value));
    println!("  source: {}", value.source);
    println!();
}
