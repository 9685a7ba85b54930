//! # Udadisi CLI (`udadisi`)
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `udadisi init` | Create the SQLite database and run schema migrations |
//! | `udadisi reset --yes` | Drop and recreate document and occurrence tables |
//! | `udadisi ingest <file>` | Ingest mined records from a JSON Lines file |
//! | `udadisi trends <location> [term]` | Print trends as JSON |
//! | `udadisi miner add ...` | Register a miner for a location |
//! | `udadisi locations` | List registered miners by location |
//! | `udadisi serve` | Start the HTTP API server |
//!
//! ## Examples
//!
//! ```bash
//! udadisi init --config ./config/udadisi.toml
//! udadisi ingest ./mined/2015-08-04.jsonl
//! udadisi trends nairobi --from 201508040000 --interval 24 --limit 10
//! udadisi trends nairobi gps --from 201508040000 --interval 24
//! udadisi serve
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use udadisi::miners::NewMiner;
use udadisi::trends::TrendQuery;
use udadisi::{config, ingest, migrate, miners, server, trends};

/// Udadisi: trend aggregation over mined term occurrences.
#[derive(Parser)]
#[command(name = "udadisi", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/udadisi.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Safe to run repeatedly.
    Init,

    /// Drop all documents and occurrences. Miners are kept.
    Reset {
        /// Confirm the reset.
        #[arg(long)]
        yes: bool,
    },

    /// Ingest mined records from a JSON Lines file.
    ///
    /// Documents already stored under the same source URI and location
    /// are skipped.
    Ingest {
        /// Path to the `.jsonl` file.
        path: PathBuf,
    },

    /// Print trends for a location as JSON.
    ///
    /// Without a term, prints ranked totals for every term. With a term
    /// (SQL LIKE pattern), prints one record per grouped run with a
    /// sub-term breakdown and source documents.
    Trends {
        /// Location substring, matched case-insensitively.
        location: String,

        /// Term or LIKE pattern.
        term: Option<String>,

        /// Window start (`YYYYMMDDHHMM` or RFC 3339).
        #[arg(long)]
        from: Option<String>,

        /// Window end (`YYYYMMDDHHMM` or RFC 3339). Defaults to `from + interval`.
        #[arg(long)]
        to: Option<String>,

        /// Window length in hours; also the velocity denominator.
        #[arg(long)]
        interval: Option<String>,

        /// Maximum number of root-level results.
        #[arg(long)]
        limit: Option<String>,

        /// Minimum velocity (accepted, not applied).
        #[arg(long)]
        velocity: Option<String>,

        /// Only count documents from this source (e.g. `twitter`).
        #[arg(long)]
        source: Option<String>,
    },

    /// Manage miners.
    Miner {
        #[command(subcommand)]
        action: MinerAction,
    },

    /// List registered miners by location.
    Locations,

    /// Start the HTTP API server on `[server].bind`.
    Serve,
}

#[derive(Subcommand)]
enum MinerAction {
    /// Register a miner.
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        location: String,
        #[arg(long)]
        source: String,
        #[arg(long)]
        url: String,
        #[arg(long, allow_hyphen_values = true)]
        latitude: Option<f64>,
        #[arg(long, allow_hyphen_values = true)]
        longitude: Option<f64>,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Reset { yes } => {
            if !yes {
                anyhow::bail!("reset deletes all documents and occurrences; pass --yes to confirm");
            }
            migrate::reset_data(&cfg).await?;
            println!("Data reset.");
        }
        Commands::Ingest { path } => {
            ingest::run_ingest(&cfg, &path).await?;
        }
        Commands::Trends {
            location,
            term,
            from,
            to,
            interval,
            limit,
            velocity,
            source,
        } => {
            let query = TrendQuery {
                from,
                to,
                interval,
                limit,
                velocity,
                source,
            };
            trends::run_trends(&cfg, &location, term.as_deref(), &query).await?;
        }
        Commands::Miner { action } => match action {
            MinerAction::Add {
                name,
                location,
                source,
                url,
                latitude,
                longitude,
            } => {
                let miner = NewMiner {
                    name,
                    source,
                    location,
                    url,
                    latitude,
                    longitude,
                };
                miners::run_add_miner(&cfg, miner).await?;
            }
        },
        Commands::Locations => {
            miners::run_list_locations(&cfg).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
