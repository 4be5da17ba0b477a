use clap::Args;
use serde_json::json;

use super::coffee::print_coffees;
use super::distributor::print_distributors;
use super::OutputFormat;
use latebase::sync::SharedCatalog;

/// Search distributors and coffees at once
#[derive(Args)]
pub struct SearchCommand {
    /// Text to look for (case-insensitive)
    query: String,

    /// Output format
    #[arg(long, short, value_enum, default_value = "text")]
    format: OutputFormat,
}

impl SearchCommand {
    pub async fn run(&self, catalog: &SharedCatalog) -> Result<(), Box<dyn std::error::Error>> {
        let catalog = catalog.lock().await;
        let distributors = catalog.search_distributors(&self.query);
        let coffees = catalog.search_coffees(&self.query);

        match self.format {
            OutputFormat::Json => {
                let found = json!({
                    "distributors": distributors,
                    "coffees": coffees,
                });
                println!("{}", serde_json::to_string_pretty(&found)?);
            }
            OutputFormat::Text => {
                println!("Distributors");
                println!("============\n");
                print_distributors(&catalog, distributors, &self.format)?;
                println!();
                println!("Coffees");
                println!("=======\n");
                print_coffees(&catalog, coffees, &self.format)?;
            }
        }
        Ok(())
    }
}
