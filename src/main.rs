use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use uuid::Uuid;

use homebase::{
    import_fill_ups, import_readings, logging, open_database, seed_all, table_counts, Config,
    Handlers, TopicExchange,
};

/// Actor recorded on audit events written by the CLI
const CLI_ACTOR: &str = "cli";

#[derive(Parser)]
#[command(name = "homebase", version, about = "Personal tracker apps")]
struct Cli {
    /// Database file (overrides HOMEBASE_DB)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the database and every table
    Init,
    /// Load sample data into empty apps
    Seed,
    /// Import rows from a CSV file
    Import {
        #[command(subcommand)]
        source: ImportSource,
    },
    /// Row count per table
    Summary,
    /// Audit trail of one entity
    Events { kind: String, id: Uuid },
}

#[derive(Subcommand)]
enum ImportSource {
    /// Blood pressure readings
    Readings {
        file: PathBuf,
        #[arg(long)]
        user: Uuid,
    },
    /// Fuel fill-ups for one vehicle
    FillUps {
        file: PathBuf,
        #[arg(long)]
        vehicle: Uuid,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(Config::log_format()?);
    let config = Config::load()?;

    let db_path = cli.db.unwrap_or(config.db_path);
    let conn = open_database(&db_path)?;
    // Nobody subscribes in the CLI; published messages are dropped
    let exchange = TopicExchange::new();
    let handlers = Handlers::new(&conn, &exchange, CLI_ACTOR);

    match cli.command {
        Command::Init => {
            println!("🗄️  Database ready at {}", db_path.display());
        }
        Command::Seed => {
            println!("🌱 Seeding sample data...");
            let summary = seed_all(&handlers, Utc::now().date_naive())?;
            for app in &summary.seeded {
                println!("✓ Seeded {}", app);
            }
            for app in &summary.skipped {
                println!("• {} already has data, skipped", app);
            }
        }
        Command::Import { source } => {
            let summary = match source {
                ImportSource::Readings { file, user } => {
                    println!("📂 Importing readings from {}", file.display());
                    import_readings(&handlers, &file, user)?
                }
                ImportSource::FillUps { file, vehicle } => {
                    println!("📂 Importing fill-ups from {}", file.display());
                    import_fill_ups(&handlers, &file, vehicle)?
                }
            };
            println!("✓ Inserted: {}", summary.inserted);
            println!("✓ Duplicates skipped: {}", summary.duplicates);
        }
        Command::Summary => {
            println!("📊 {}", db_path.display());
            println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
            for (table, count) in table_counts(&conn)? {
                println!("{:<22} {:>8}", table, count);
            }
        }
        Command::Events { kind, id } => {
            let events = handlers
                .history(&kind, id)
                .with_context(|| format!("Failed to load events for {} {}", kind, id))?;
            if events.is_empty() {
                println!("No events for {} {}", kind, id);
            }
            for event in events {
                println!(
                    "{}  {:<8} {}  {}",
                    event.timestamp.to_rfc3339(),
                    event.event_type,
                    event.actor,
                    event.data
                );
            }
        }
    }

    Ok(())
}
