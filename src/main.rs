//! Ecomdb CLI - serve and inspect the e-commerce dataset

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use ecomdb::config::{self, EcomdbConfig};
use ecomdb::storage::Database;
use ecomdb::{ui, Entity};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "ecomdb")]
#[command(version)]
#[command(about = "E-commerce dataset (customers, sellers, catalog, orders, deliveries) over HTTP")]
#[command(long_about = r#"
Ecomdb keeps a fixed e-commerce schema in a single SQLite file, seeds it on
first start, and serves it over HTTP.

Example usage:
  ecomdb serve --port 5001
  ecomdb stats --database ecommerce.db
  ecomdb list catalog --column name
  ecomdb get customer 2
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database and start the HTTP server
    Serve {
        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// Address to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Create the schema and seed empty tables
    Init {
        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// Show row counts per table
    Stats {
        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// Print every row of a table, or a single column
    List {
        /// Table (customer, seller, catalog, order, order_item, delivery)
        entity: String,

        /// Only print this column
        #[arg(long)]
        column: Option<String>,

        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// Print one row by id
    Get {
        /// Table (customer, seller, catalog, order)
        entity: String,

        /// Row id
        id: i64,

        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// Write a default ecomdb.toml
    Config {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

fn open_database(settings: &EcomdbConfig, database: Option<PathBuf>) -> anyhow::Result<Database> {
    let path = settings.database_path(database);
    config::ensure_db_dir(&path)?;
    Ok(Database::new(path).with_foreign_keys(settings.foreign_keys.unwrap_or(false)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let settings = config::load_config(cli.config.as_deref())?.unwrap_or_default();

    match cli.command {
        Commands::Serve { database, host, port } => {
            let db = open_database(&settings, database)?;
            let host = settings.host(host);
            let port = settings.port(port);

            // The service cannot answer anything without its schema
            let report = match db.initialize() {
                Ok(report) => report,
                Err(e) => {
                    ui::error(&format!("Failed to initialize {}: {}", db.path().display(), e));
                    return Err(e.into());
                }
            };

            ui::header("Ecomdb");
            ui::info("Database", &db.path().display().to_string());
            if !report.seeded.is_empty() {
                ui::info("Seeded", &join_entities(&report.seeded));
            }
            println!("{} Server running at http://{}:{}", ui::Icons::GLOBE, host, port);

            ecomdb::server::start_server(&host, port, db).await?;
        }

        Commands::Init { database } => {
            let db = open_database(&settings, database)?;
            let report = db.initialize()?;

            ui::header(&format!("Initialized {}", db.path().display()));
            if report.added_item_id {
                ui::success("Added column order.item_id");
            }
            if report.seeded.is_empty() {
                ui::summary_row("Seeded:", "nothing (all tables already had rows)");
            } else {
                ui::summary_row(&format!("{} Seeded:", ui::Icons::SEED), &join_entities(&report.seeded));
            }

            let stats = db.connect()?.stats()?;
            println!("{}", ui::stats_table(&stats));
        }

        Commands::Stats { database } => {
            let db = open_database(&settings, database)?;
            let stats = db.connect()?.stats()?;

            ui::section(&format!("{} Ecomdb Statistics ({})", ui::Icons::STATS, db.path().display()));
            println!("{}", ui::stats_table(&stats));
        }

        Commands::List { entity, column, database } => {
            let entity: Entity = entity.parse()?;
            let db = open_database(&settings, database)?;
            let store = db.connect()?;

            let output = match column {
                Some(column) => serde_json::to_string_pretty(&store.get_column(entity, &column)?)?,
                None => serde_json::to_string_pretty(&store.list_all(entity)?)?,
            };
            println!("{}", output);
        }

        Commands::Get { entity, id, database } => {
            let entity: Entity = entity.parse()?;
            let db = open_database(&settings, database)?;

            match db.connect()?.get_by_id(entity, id)? {
                Some(row) => println!("{}", serde_json::to_string_pretty(&row)?),
                None => ui::warn(&format!("{} {} not found", entity, id)),
            }
        }

        Commands::Config { force } => {
            let path = cli.config.unwrap_or_else(config::default_config_path);
            config::write_config(&path, &EcomdbConfig::defaults(), force)?;
            ui::success(&format!("Wrote {}", path.display()));
        }
    }

    Ok(())
}

fn join_entities(entities: &[Entity]) -> String {
    entities
        .iter()
        .map(Entity::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
