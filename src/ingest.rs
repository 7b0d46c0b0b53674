//! Ingestion run orchestration.
//!
//! Wires the configured collaborators together: SQLite store → entity list
//! (freshly discovered or previously persisted) → HTTP page and detail
//! fetchers → entity driver. Prints a summary on stdout.

use anyhow::{bail, Result};
use std::sync::Arc;

use crate::client::build_client;
use crate::config::Config;
use crate::db;
use crate::detail::HttpDetailSource;
use crate::discovery::discover_entities;
use crate::driver::run_entities;
use crate::extract::ExifTool;
use crate::migrate;
use crate::models::Entity;
use crate::page::HttpPageSource;
use crate::pagination::{PaginationSettings, Pipeline};
use crate::progress::ProgressReporter;
use crate::store::sqlite::SqliteStore;
use crate::store::{self, Store};

/// Open the SQLite store, creating its tables if needed.
pub async fn open_store(config: &Config) -> Result<SqliteStore> {
    let pool = db::connect(config).await?;
    migrate::create_tables(&pool).await?;
    Ok(SqliteStore::new(pool))
}

/// Build the HTTP-backed pipeline described by `config`.
pub fn build_pipeline(
    config: &Config,
    store: Arc<dyn Store>,
    client: reqwest::Client,
    progress: Arc<dyn ProgressReporter>,
) -> Pipeline {
    let extractor = Arc::new(ExifTool::new(&config.extractor));
    Pipeline {
        store,
        pages: Arc::new(HttpPageSource::new(client.clone(), config.listing.clone())),
        details: Arc::new(HttpDetailSource::new(
            client,
            extractor,
            config.ingest.temp_dir.clone(),
        )),
        progress,
        settings: PaginationSettings::from_config(&config.ingest),
    }
}

/// Crawl the entity listing and persist it, replacing nothing else.
pub async fn refresh_entities(
    config: &Config,
    store: &dyn Store,
    client: &reqwest::Client,
) -> Result<Vec<Entity>> {
    let entities = discover_entities(client, &config.discovery).await?;
    store::save_entities(store, &entities).await?;
    Ok(entities)
}

pub async fn run_discover(config: &Config) -> Result<()> {
    let store = open_store(config).await?;
    let client = build_client(&config.ingest)?;

    let entities = refresh_entities(config, &store, &client).await?;

    println!("discover");
    println!("  entities: {}", entities.len());
    println!("ok");

    store.pool().close().await;
    Ok(())
}

pub async fn run_ingest(
    config: &Config,
    reload_entities: bool,
    progress: Arc<dyn ProgressReporter>,
) -> Result<()> {
    let store = Arc::new(open_store(config).await?);
    let client = build_client(&config.ingest)?;

    let entities = if reload_entities {
        refresh_entities(config, store.as_ref(), &client).await?
    } else {
        store::load_entities(store.as_ref()).await?
    };
    if entities.is_empty() {
        bail!("No entities stored. Run `harvest discover` or pass --reload-entities.");
    }

    let pipeline = build_pipeline(config, store.clone(), client, progress);
    let summary = run_entities(&pipeline, &entities).await?;

    println!("ingest");
    println!("  entities: {}", entities.len());
    println!("  completed: {}", summary.completed);
    println!("  skipped (already done): {}", summary.skipped);
    println!("  incomplete: {}", summary.incomplete);
    println!("  rejected (empty name): {}", summary.rejected);
    println!("  documents stored: {}", summary.documents_stored);
    println!("ok");

    store.pool().close().await;
    Ok(())
}
