//! Store statistics and pending-work overview for `harvest status`.

use anyhow::Result;

use crate::config::Config;
use crate::models::Entity;
use crate::store::{self, Namespace, Store};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStats {
    pub entities: usize,
    pub documents: usize,
    pub done: usize,
    /// Entities without a WorkStatus marker, in store order.
    pub pending: Vec<Entity>,
}

pub async fn collect_stats(store: &dyn Store) -> Result<StoreStats> {
    let entities = store::load_entities(store).await?;
    let documents = store.scan(Namespace::Documents).await?.len();
    let done = store.scan(Namespace::WorkStatus).await?.len();

    let mut pending = Vec::new();
    for entity in entities.iter() {
        if !store::is_entity_done(store, &entity.name).await? {
            pending.push(entity.clone());
        }
    }

    Ok(StoreStats {
        entities: entities.len(),
        documents,
        done,
        pending,
    })
}

/// Print the summary to stdout.
pub async fn run_stats(config: &Config, store: &dyn Store) -> Result<()> {
    let stats = collect_stats(store).await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("docket-harvest — Store Status");
    println!("=============================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!();
    println!("  Entities:    {}", stats.entities);
    println!("  Done:        {} / {}", stats.done, stats.entities);
    println!("  Documents:   {}", stats.documents);

    if !stats.pending.is_empty() {
        println!();
        println!("  Pending:");
        for entity in &stats.pending {
            println!("    {:<10} {}", entity.id, entity.name);
        }
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes >= 1_073_741_824 {
        format!("{:.1} GB", bytes as f64 / 1_073_741_824.0)
    } else if bytes >= 1_048_576 {
        format!("{:.1} MB", bytes as f64 / 1_048_576.0)
    } else if bytes >= 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{} B", bytes)
    }
}
