//! Ecofarm Calculator CLI
//!
//! Land and feed allocation calculator for mixed livestock farms.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ecofarm_calculator::calculator::Calculator;
use ecofarm_calculator::catalog::ReferenceCatalog;
use ecofarm_calculator::{db, import, reference, report, scenario};

#[derive(Parser)]
#[command(name = "ecofarm-calculator")]
#[command(about = "Land and feed allocation calculator for mixed livestock farms")]
struct Cli {
    /// Path to the SQLite catalog database
    #[arg(short, long, env = "ECOFARM_DB", default_value = "ecofarm.db")]
    database: PathBuf,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import ingredients and species from a directory of TOML fragments
    Import {
        /// Directory to scan for *.toml files
        source_dir: PathBuf,

        /// Clear the existing catalog before importing
        #[arg(long)]
        clear: bool,
    },

    /// Run an allocation simulation for a scenario file
    Simulate {
        /// Scenario file (.toml or .json)
        scenario: PathBuf,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,

        /// Show the per-group breakdown
        #[arg(long)]
        details: bool,
    },

    /// List all ingredients in the catalog
    ListIngredients,

    /// List all species and their diet formulations
    ListSpecies,

    /// Show details for a specific species
    Species {
        /// Species ID
        id: String,
    },

    /// Initialize empty database with schema
    Init,

    /// Replace the catalog with the built-in reference data
    LoadSample,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut conn = Connection::open(&cli.database)
        .with_context(|| format!("Failed to open {}", cli.database.display()))?;
    db::init_schema(&conn)?;

    match cli.command {
        Commands::Import { source_dir, clear } => {
            let stats = import::import_to_database(&mut conn, &source_dir, clear)?;
            println!("\n{}", stats);

            let catalog = db::load_catalog(&conn)?;
            println!(
                "Catalog now holds {} ingredients and {} species",
                catalog.ingredients().len(),
                catalog.all_species().len()
            );
        }

        Commands::Simulate {
            scenario,
            json,
            details,
        } => {
            let input = scenario::load_scenario(&scenario)?;
            let calculator = Calculator::new(open_catalog(&conn)?);
            let result = calculator.simulate(&input);

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                if details {
                    println!("{}", report::format_group_details(&result));
                }
                println!("{}", result);
            }
        }

        Commands::ListIngredients => {
            let ingredients = db::list_ingredients(&conn)?;
            if ingredients.is_empty() {
                println!("No ingredients in database. Run 'import' or 'load-sample' first.");
            } else {
                println!("{:<14} {:<28} {:>10} {:>8}", "ID", "Ingredient", "Cost/kg", "DM");
                println!("{}", "-".repeat(63));
                for i in ingredients {
                    println!(
                        "{:<14} {:<28} {:>10.2} {:>7.0}%",
                        i.id,
                        i.name,
                        i.default_cost_per_kg,
                        i.dry_matter_fraction * 100.0
                    );
                }
            }
        }

        Commands::ListSpecies => {
            let species = db::list_species(&conn)?;
            if species.is_empty() {
                println!("No species in database. Run 'import' or 'load-sample' first.");
            } else {
                for s in species {
                    println!("{} ({}), {} days", s.name, s.id, s.standard_cycle_days);
                    for f in s.formulations {
                        println!("  {:<10} {:<28} {:.2} kg DM/day", f.id, f.name, f.daily_intake_kg());
                    }
                }
            }
        }

        Commands::Species { id } => {
            let catalog = open_catalog(&conn)?;
            if let Some(s) = catalog.species(&id) {
                println!("Species: {}", s.name);
                println!("  ID: {}", s.id);
                println!("  Standard weight: {} kg", s.standard_weight_kg);
                println!("  Standard cycle: {} days", s.standard_cycle_days);
                println!("  Formulations:");
                for f in &s.formulations {
                    println!("    {} - {} ({:.2} kg DM/day)", f.id, f.name, f.daily_intake_kg());
                    for line in &f.composition {
                        let name = catalog
                            .ingredient(&line.ingredient_id)
                            .map_or(line.ingredient_id.as_str(), |i| i.name.as_str());
                        println!("      {} @ {} kg DM/day", name, line.daily_dry_matter_kg);
                    }
                }
            } else {
                println!("Species '{}' not found", id);
            }
        }

        Commands::Init => {
            println!("Database initialized at: {}", cli.database.display());
        }

        Commands::LoadSample => {
            let catalog = reference::builtin_catalog()?;
            db::store_catalog(&mut conn, &catalog)?;
            println!(
                "Loaded {} ingredients and {} species",
                catalog.ingredients().len(),
                catalog.all_species().len()
            );
        }
    }

    Ok(())
}

/// The stored catalog, or the built-in one when the store is empty
fn open_catalog(conn: &Connection) -> Result<ReferenceCatalog> {
    let catalog = db::load_catalog(conn)?;
    if catalog.is_empty() {
        info!("catalog database is empty, using built-in reference data");
        return Ok(reference::builtin_catalog()?);
    }
    Ok(catalog)
}
