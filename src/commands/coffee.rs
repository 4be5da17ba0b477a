use clap::{Args, Subcommand};
use serde::Serialize;

use super::{confirm, truncate, OutputFormat};
use latebase::catalog::Catalog;
use latebase::models::{Coffee, CoffeeFields};
use latebase::sync::SharedCatalog;

#[derive(Args)]
pub struct CoffeeCommand {
    #[command(subcommand)]
    pub command: CoffeeSubcommand,
}

#[derive(Subcommand)]
pub enum CoffeeSubcommand {
    /// Register a new coffee
    Add {
        /// Name of the coffee
        name: String,

        /// Distributor ID or name
        #[arg(long)]
        distributor: String,

        /// Origin (farm, region)
        #[arg(long)]
        origin: String,

        /// Botanical variety
        #[arg(long)]
        variety: String,

        /// Processing method (washed, natural, honey...)
        #[arg(long)]
        process: String,

        /// Roast level
        #[arg(long)]
        roast: String,

        /// Altitude in metres above sea level
        #[arg(long, default_value_t = 0.0)]
        altitude: f64,

        /// SCA cupping score
        #[arg(long, default_value_t = 0.0)]
        score: f64,

        /// Tasting notes
        #[arg(long)]
        notes: Option<String>,

        /// Price of a 250 g bag
        #[arg(long = "price-250", default_value_t = 0.0)]
        price_250g: f64,

        /// Price of a 500 g bag
        #[arg(long = "price-500", default_value_t = 0.0)]
        price_500g: f64,

        /// Price of a 1 kg bag
        #[arg(long = "price-1kg", default_value_t = 0.0)]
        price_1kg: f64,
    },

    /// List all coffees
    List {
        /// Only coffees from this distributor (ID or name)
        #[arg(long)]
        distributor: Option<String>,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show a coffee's details
    Show {
        /// Coffee ID or name
        identifier: String,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Update an existing coffee
    Update {
        /// Coffee ID or name
        identifier: String,

        #[arg(long)]
        name: Option<String>,

        /// Move to another distributor (ID or name)
        #[arg(long)]
        distributor: Option<String>,

        #[arg(long)]
        origin: Option<String>,

        #[arg(long)]
        variety: Option<String>,

        #[arg(long)]
        process: Option<String>,

        #[arg(long)]
        roast: Option<String>,

        #[arg(long)]
        altitude: Option<f64>,

        #[arg(long)]
        score: Option<f64>,

        /// Tasting notes (pass "" to clear)
        #[arg(long)]
        notes: Option<String>,

        #[arg(long = "price-250")]
        price_250g: Option<f64>,

        #[arg(long = "price-500")]
        price_500g: Option<f64>,

        #[arg(long = "price-1kg")]
        price_1kg: Option<f64>,
    },

    /// Delete a coffee
    Delete {
        /// Coffee ID or name
        identifier: String,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },

    /// Search coffees by name, origin, profile, notes or distributor
    Search {
        /// Text to look for (empty lists everything)
        #[arg(default_value = "")]
        query: String,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

/// A coffee with its resolved distributor name, for JSON output.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CoffeeView<'a> {
    #[serde(flatten)]
    coffee: &'a Coffee,
    distributor_name: &'a str,
}

impl CoffeeCommand {
    pub async fn run(&self, catalog: &SharedCatalog) -> Result<(), Box<dyn std::error::Error>> {
        let mut catalog = catalog.lock().await;

        match &self.command {
            CoffeeSubcommand::Add {
                name,
                distributor,
                origin,
                variety,
                process,
                roast,
                altitude,
                score,
                notes,
                price_250g,
                price_500g,
                price_1kg,
            } => {
                let distributor_id = resolve_distributor(&catalog, distributor);
                let mut fields = CoffeeFields::new(distributor_id, name, origin)
                    .with_profile(variety, process, roast)
                    .with_altitude(*altitude)
                    .with_score(*score)
                    .with_prices(*price_250g, *price_500g, *price_1kg);
                if let Some(notes) = notes {
                    fields = fields.with_notes(notes);
                }

                let id = catalog.add_coffee(fields)?;
                let created = catalog
                    .coffee(&id)
                    .ok_or_else(|| format!("Coffee not found: {}", id))?;
                println!("Created coffee:");
                println!("{}", created.render(catalog.distributor_label(created)));
                Ok(())
            }

            CoffeeSubcommand::List {
                distributor,
                format,
            } => {
                let coffees = match distributor {
                    Some(identifier) => {
                        let owner = catalog
                            .find_distributor(identifier)
                            .ok_or_else(|| format!("Distributor not found: {}", identifier))?;
                        catalog.coffees_for(&owner.id)
                    }
                    None => catalog.coffees().iter().collect(),
                };
                print_coffees(&catalog, coffees, format)
            }

            CoffeeSubcommand::Show { identifier, format } => {
                let coffee = find(&catalog, identifier)?;
                let label = catalog.distributor_label(coffee);

                match format {
                    OutputFormat::Json => {
                        let view = CoffeeView {
                            coffee,
                            distributor_name: label,
                        };
                        println!("{}", serde_json::to_string_pretty(&view)?);
                    }
                    OutputFormat::Text => {
                        println!("{}", coffee.render(label));
                    }
                }
                Ok(())
            }

            CoffeeSubcommand::Update {
                identifier,
                name,
                distributor,
                origin,
                variety,
                process,
                roast,
                altitude,
                score,
                notes,
                price_250g,
                price_500g,
                price_1kg,
            } => {
                let has_updates = name.is_some()
                    || distributor.is_some()
                    || origin.is_some()
                    || variety.is_some()
                    || process.is_some()
                    || roast.is_some()
                    || altitude.is_some()
                    || score.is_some()
                    || notes.is_some()
                    || price_250g.is_some()
                    || price_500g.is_some()
                    || price_1kg.is_some();

                if !has_updates {
                    return Err("Nothing to update. Provide at least one option.".into());
                }

                let current = find(&catalog, identifier)?;
                let id = current.id.clone();
                let mut fields = CoffeeFields::from(current);

                if let Some(distributor) = distributor {
                    fields.distributor_id = resolve_distributor(&catalog, distributor);
                }
                for (value, target) in [
                    (name, &mut fields.name),
                    (origin, &mut fields.origin),
                    (variety, &mut fields.variety),
                    (process, &mut fields.process),
                    (roast, &mut fields.roast_level),
                    (notes, &mut fields.notes),
                ] {
                    if let Some(value) = value {
                        *target = value.clone();
                    }
                }
                for (value, target) in [
                    (altitude, &mut fields.altitude),
                    (score, &mut fields.score),
                    (price_250g, &mut fields.price_250g),
                    (price_500g, &mut fields.price_500g),
                    (price_1kg, &mut fields.price_1kg),
                ] {
                    if let Some(value) = value {
                        *target = *value;
                    }
                }

                catalog.update_coffee(&id, fields)?;
                let updated = catalog
                    .coffee(&id)
                    .ok_or_else(|| format!("Coffee not found: {}", id))?;
                println!("Updated coffee:");
                println!("{}", updated.render(catalog.distributor_label(updated)));
                Ok(())
            }

            CoffeeSubcommand::Delete { identifier, force } => {
                let coffee = find(&catalog, identifier)?;
                let id = coffee.id.clone();
                let name = coffee.name.clone();

                if !force && !confirm(&format!("Delete coffee '{}'?", name))? {
                    println!("Deletion cancelled.");
                    return Ok(());
                }

                catalog.delete_coffee(&id)?;
                println!("Deleted coffee: {}", name);
                Ok(())
            }

            CoffeeSubcommand::Search { query, format } => {
                let found = catalog.search_coffees(query);
                print_coffees(&catalog, found, format)
            }
        }
    }
}

fn find<'a>(catalog: &'a Catalog, identifier: &str) -> Result<&'a Coffee, String> {
    catalog
        .find_coffee(identifier)
        .ok_or_else(|| format!("Coffee not found: {}", identifier))
}

/// Maps a distributor ID or name to its ID. Unknown values are kept as given.
fn resolve_distributor(catalog: &Catalog, identifier: &str) -> String {
    match catalog.find_distributor(identifier) {
        Some(distributor) => distributor.id.clone(),
        None => {
            eprintln!(
                "Warning: no distributor matches '{}'; the coffee will show as unassigned.",
                identifier
            );
            identifier.trim().to_string()
        }
    }
}

pub(super) fn print_coffees(
    catalog: &Catalog,
    coffees: Vec<&Coffee>,
    format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    if coffees.is_empty() {
        println!("No coffees found");
        return Ok(());
    }

    match format {
        OutputFormat::Json => {
            let views: Vec<_> = coffees
                .iter()
                .map(|&coffee| CoffeeView {
                    coffee,
                    distributor_name: catalog.distributor_label(coffee),
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&views)?);
        }
        OutputFormat::Text => {
            println!(
                "{:<36}  {:<24}  {:<22}  {:<18}  {:>5}  {:>9}",
                "ID", "NAME", "DISTRIBUTOR", "ORIGIN", "SCORE", "500G"
            );
            println!("{}", "-".repeat(124));
            for coffee in &coffees {
                println!(
                    "{:<36}  {:<24}  {:<22}  {:<18}  {:>5}  {:>9}",
                    coffee.id,
                    truncate(&coffee.name, 24),
                    truncate(catalog.distributor_label(coffee), 22),
                    truncate(&coffee.origin, 18),
                    coffee.score,
                    format!("${:.2}", coffee.price_500g)
                );
            }
            println!("\nTotal: {} coffee(s)", coffees.len());
        }
    }
    Ok(())
}
