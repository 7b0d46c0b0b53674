//! Entity driver: walks the entity list one entity at a time.
//!
//! Concurrency lives inside a single entity's pagination, so at most `K`
//! page workers run system-wide. An entity whose WorkStatus marker is
//! present is skipped without fetching a single page; the marker is written
//! only after pagination returned complete. An entity whose name is empty
//! once normalized is rejected, since its listing query would carry no
//! author filter.

use anyhow::{Context, Result};
use tracing::warn;

use crate::models::Entity;
use crate::page::normalize_entity_name;
use crate::pagination::{paginate_entity, Pipeline};
use crate::progress::IngestEvent;
use crate::store;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestSummary {
    /// Entities that reached their termination condition and were marked done.
    pub completed: usize,
    /// Entities already marked done before this run.
    pub skipped: usize,
    /// Entities left unmarked because some page could not be fetched.
    pub incomplete: usize,
    /// Entities whose name gives an empty listing filter; never fetched.
    pub rejected: usize,
    pub documents_stored: usize,
}

pub async fn run_entities(pipeline: &Pipeline, entities: &[Entity]) -> Result<IngestSummary> {
    let mut summary = IngestSummary::default();

    for entity in entities {
        if normalize_entity_name(&entity.name).is_empty() {
            warn!(
                "Skipping entity {} ({:?}): empty name filter",
                entity.id, entity.name
            );
            summary.rejected += 1;
            continue;
        }

        if store::is_entity_done(pipeline.store.as_ref(), &entity.name).await? {
            pipeline.progress.report(IngestEvent::EntitySkipped {
                entity: entity.name.clone(),
            });
            summary.skipped += 1;
            continue;
        }

        pipeline.progress.report(IngestEvent::EntityStarted {
            entity: entity.name.clone(),
        });

        let outcome = paginate_entity(pipeline, &entity.name)
            .await
            .with_context(|| format!("Ingestion of {} aborted", entity.name))?;

        summary.documents_stored += outcome.stored.len();

        if outcome.complete {
            store::mark_entity_done(pipeline.store.as_ref(), &entity.name)
                .await
                .with_context(|| format!("Failed to mark {} done", entity.name))?;
            summary.completed += 1;
        } else {
            warn!(
                "{} left pending after {:?}; it will be retried from page 1",
                entity.name, outcome.stop
            );
            summary.incomplete += 1;
        }

        pipeline.progress.report(IngestEvent::EntityFinished {
            entity: entity.name.clone(),
            stored: outcome.stored.len(),
            complete: outcome.complete,
        });
    }

    Ok(summary)
}
