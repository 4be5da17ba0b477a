use clap::{Args, Subcommand};
use serde::Serialize;

use super::{confirm, truncate, OutputFormat};
use latebase::catalog::Catalog;
use latebase::models::{Coffee, Distributor, DistributorFields};
use latebase::sync::SharedCatalog;

#[derive(Args)]
pub struct DistributorCommand {
    #[command(subcommand)]
    pub command: DistributorSubcommand,
}

#[derive(Subcommand)]
pub enum DistributorSubcommand {
    /// Register a new distributor
    Add {
        /// Name of the distributor
        name: String,

        /// Country
        #[arg(long)]
        country: String,

        /// Region or state
        #[arg(long)]
        region: String,

        /// Contact details (phone, email, web)
        #[arg(long)]
        contact: String,

        /// Free-form description
        #[arg(long)]
        description: Option<String>,
    },

    /// List all distributors
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show a distributor's details and its coffees
    Show {
        /// Distributor ID or name
        identifier: String,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Update an existing distributor
    Update {
        /// Distributor ID or name
        identifier: String,

        /// New name
        #[arg(long)]
        name: Option<String>,

        /// New country
        #[arg(long)]
        country: Option<String>,

        /// New region
        #[arg(long)]
        region: Option<String>,

        /// New contact details
        #[arg(long)]
        contact: Option<String>,

        /// New description (pass "" to clear)
        #[arg(long)]
        description: Option<String>,
    },

    /// Delete a distributor and all of its coffees
    Delete {
        /// Distributor ID or name
        identifier: String,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },

    /// Search distributors by name, location or description
    Search {
        /// Text to look for (empty lists everything)
        #[arg(default_value = "")]
        query: String,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// List the coffees offered by a distributor
    Coffees {
        /// Distributor ID or name
        identifier: String,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(Serialize)]
struct DistributorDetail<'a> {
    #[serde(flatten)]
    distributor: &'a Distributor,
    coffees: Vec<&'a Coffee>,
}

impl DistributorCommand {
    pub async fn run(&self, catalog: &SharedCatalog) -> Result<(), Box<dyn std::error::Error>> {
        let mut catalog = catalog.lock().await;

        match &self.command {
            DistributorSubcommand::Add {
                name,
                country,
                region,
                contact,
                description,
            } => {
                let mut fields = DistributorFields::new(name, country, region, contact);
                if let Some(description) = description {
                    fields = fields.with_description(description);
                }

                let id = catalog.add_distributor(fields)?;
                let created = catalog
                    .distributor(&id)
                    .ok_or_else(|| format!("Distributor not found: {}", id))?;
                println!("Created distributor:");
                println!("{}", created);
                Ok(())
            }

            DistributorSubcommand::List { format } => {
                print_distributors(&catalog, catalog.distributors().iter().collect(), format)
            }

            DistributorSubcommand::Show { identifier, format } => {
                let distributor = find(&catalog, identifier)?;
                let coffees = catalog.coffees_for(&distributor.id);

                match format {
                    OutputFormat::Json => {
                        let detail = DistributorDetail {
                            distributor,
                            coffees,
                        };
                        println!("{}", serde_json::to_string_pretty(&detail)?);
                    }
                    OutputFormat::Text => {
                        println!("{}", distributor);
                        if coffees.is_empty() {
                            println!("No coffees registered for this distributor.");
                        } else {
                            println!("Coffees:");
                            for coffee in coffees {
                                println!("  - {}", coffee);
                            }
                        }
                    }
                }
                Ok(())
            }

            DistributorSubcommand::Update {
                identifier,
                name,
                country,
                region,
                contact,
                description,
            } => {
                let has_updates = name.is_some()
                    || country.is_some()
                    || region.is_some()
                    || contact.is_some()
                    || description.is_some();

                if !has_updates {
                    return Err("Nothing to update. Provide at least one option.".into());
                }

                let current = find(&catalog, identifier)?;
                let id = current.id.clone();
                let mut fields = DistributorFields::from(current);

                if let Some(name) = name {
                    fields.name = name.clone();
                }
                if let Some(country) = country {
                    fields.country = country.clone();
                }
                if let Some(region) = region {
                    fields.region = region.clone();
                }
                if let Some(contact) = contact {
                    fields.contact = contact.clone();
                }
                if let Some(description) = description {
                    fields.description = description.clone();
                }

                catalog.update_distributor(&id, fields)?;
                let updated = catalog
                    .distributor(&id)
                    .ok_or_else(|| format!("Distributor not found: {}", id))?;
                println!("Updated distributor:");
                println!("{}", updated);
                Ok(())
            }

            DistributorSubcommand::Delete { identifier, force } => {
                let distributor = find(&catalog, identifier)?;
                let id = distributor.id.clone();
                let name = distributor.name.clone();
                let count = catalog.coffee_count(&id);

                if !force {
                    let prompt = if count > 0 {
                        format!(
                            "Delete distributor '{}' and its {} coffee(s)?",
                            name, count
                        )
                    } else {
                        format!("Delete distributor '{}'?", name)
                    };
                    if !confirm(&prompt)? {
                        println!("Deletion cancelled.");
                        return Ok(());
                    }
                }

                let removed = catalog.delete_distributor(&id)?;
                println!("Deleted distributor: {}", name);
                if removed > 0 {
                    println!("Removed {} coffee(s).", removed);
                }
                Ok(())
            }

            DistributorSubcommand::Search { query, format } => {
                let found = catalog.search_distributors(query);
                print_distributors(&catalog, found, format)
            }

            DistributorSubcommand::Coffees { identifier, format } => {
                let distributor = find(&catalog, identifier)?;
                let coffees = catalog.coffees_for(&distributor.id);
                super::coffee::print_coffees(&catalog, coffees, format)
            }
        }
    }
}

fn find<'a>(catalog: &'a Catalog, identifier: &str) -> Result<&'a Distributor, String> {
    catalog
        .find_distributor(identifier)
        .ok_or_else(|| format!("Distributor not found: {}", identifier))
}

pub(super) fn print_distributors(
    catalog: &Catalog,
    distributors: Vec<&Distributor>,
    format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    if distributors.is_empty() {
        println!("No distributors found");
        return Ok(());
    }

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&distributors)?);
        }
        OutputFormat::Text => {
            println!(
                "{:<36}  {:<30}  {:<28}  COFFEES",
                "ID", "NAME", "LOCATION"
            );
            println!("{}", "-".repeat(108));
            for distributor in &distributors {
                println!(
                    "{:<36}  {:<30}  {:<28}  {}",
                    distributor.id,
                    truncate(&distributor.name, 30),
                    truncate(&distributor.location(), 28),
                    catalog.coffee_count(&distributor.id)
                );
            }
            println!("\nTotal: {} distributor(s)", distributors.len());
        }
    }
    Ok(())
}
