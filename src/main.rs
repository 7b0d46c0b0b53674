//! # Docket Harvest CLI (`harvest`)
//!
//! ## Usage
//!
//! ```bash
//! harvest --config ./config/harvest.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `harvest init` | Create the SQLite database and its tables |
//! | `harvest discover` | Crawl and persist the entity list |
//! | `harvest ingest` | Harvest documents for every entity not yet done |
//! | `harvest export <path>` | Write stored documents as `;`-separated text |
//! | `harvest status` | Show store counts and pending entities |
//!
//! Diagnostics go to stderr through `tracing`; set `RUST_LOG` to change the
//! filter (default `docket_harvest=warn`).

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::bail;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use docket_harvest::progress::ProgressMode;
use docket_harvest::{config, export, ingest, migrate, stats};

/// Docket Harvest: resumable per-author document harvester.
#[derive(Parser)]
#[command(name = "harvest", version)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/harvest.toml")]
    config: PathBuf,

    /// Progress output: `human`, `json` or `off`.
    ///
    /// Defaults to `human` on a terminal and `off` otherwise.
    #[arg(long, global = true)]
    progress: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Idempotent.
    Init,

    /// Crawl the entity listing and persist it.
    Discover,

    /// Harvest documents for every entity not yet marked done.
    Ingest {
        /// Re-run discovery before ingesting instead of reusing the stored list.
        #[arg(long)]
        reload_entities: bool,
    },

    /// Export stored documents to a `;`-separated file.
    Export {
        /// Output file path.
        output: PathBuf,
    },

    /// Show store counts and entities still pending.
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docket_harvest=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let progress_mode = match cli.progress.as_deref() {
        None => ProgressMode::default_for_tty(),
        Some(value) => match ProgressMode::parse(value) {
            Some(mode) => mode,
            None => bail!("Unknown progress mode '{}'. Use human, json or off.", value),
        },
    };

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Discover => {
            ingest::run_discover(&cfg).await?;
        }
        Commands::Ingest { reload_entities } => {
            ingest::run_ingest(&cfg, reload_entities, Arc::from(progress_mode.reporter())).await?;
        }
        Commands::Export { output } => {
            let store = ingest::open_store(&cfg).await?;
            let rows = export::run_export(&store, &output).await?;
            println!("export");
            println!("  documents: {}", rows);
            println!("  path: {}", output.display());
            println!("ok");
            store.pool().close().await;
        }
        Commands::Status => {
            let store = ingest::open_store(&cfg).await?;
            stats::run_stats(&cfg, &store).await?;
            store.pool().close().await;
        }
    }

    Ok(())
}
