//! Pagination coordinator: one entity's listing, fetched concurrently.
//!
//! The number of pages is unknown up front. The coordinator hands out page
//! numbers 1, 2, 3, ... to at most `K` workers at a time and stops handing
//! them out once any worker raises the [`Termination`] signal.
//!
//! ```text
//!             ┌── permit ──▶ worker(page 1) ──┐
//!  launcher ──┼── permit ──▶ worker(page 2) ──┼──▶ mpsc ──▶ consumer ──▶ Store
//!   (1..)     └── permit ──▶ worker(page K) ──┘
//! ```
//!
//! Rules:
//!
//! - The launcher acquires a gate permit first and checks the signal second,
//!   so a signal raised while it waits prevents the next launch.
//! - Raising the signal only stops new launches. Workers already in flight
//!   finish, and whatever they send is persisted before
//!   [`paginate_entity`] returns. A higher page answering empty never
//!   discards documents found by a lower page, and vice versa.
//! - Only the consumer task writes to the store. Workers read it to skip
//!   downloads for URLs that are already stored; the consumer re-checks
//!   before each write, so two workers racing on the same URL still produce
//!   one record.
//! - Documents of one entity are persisted in arrival order, not page order.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::IngestConfig;
use crate::detail::DetailSource;
use crate::error::FetchError;
use crate::models::{Document, DocumentRef, Page};
use crate::page::PageSource;
use crate::progress::{IngestEvent, ProgressReporter};
use crate::store::{self, Store};

/// Collaborators shared by every entity of a run.
pub struct Pipeline {
    pub store: Arc<dyn Store>,
    pub pages: Arc<dyn PageSource>,
    pub details: Arc<dyn DetailSource>,
    pub progress: Arc<dyn ProgressReporter>,
    pub settings: PaginationSettings,
}

#[derive(Debug, Clone)]
pub struct PaginationSettings {
    /// Maximum page workers in flight (`K`).
    pub concurrency: usize,
    /// Extra attempts for a page that failed transiently.
    pub page_retries: u32,
    pub retry_base: Duration,
    pub max_pages: Option<u32>,
}

impl PaginationSettings {
    pub fn from_config(config: &IngestConfig) -> Self {
        Self {
            concurrency: config.concurrency,
            page_retries: config.page_retries,
            retry_base: Duration::from_millis(config.retry_base_ms),
            max_pages: config.max_pages,
        }
    }
}

impl Default for PaginationSettings {
    fn default() -> Self {
        Self::from_config(&IngestConfig::default())
    }
}

/// Why pagination stopped issuing pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stop {
    /// The page listed zero items.
    Exhausted { page: u32 },
    /// The page payload did not decode, or the listing refused the request.
    Malformed { page: u32 },
    /// The page kept failing with transient errors after all retries.
    Unreachable { page: u32 },
    /// `max_pages` pages were launched; later pages were never looked at.
    PageLimit { after: u32 },
    /// The consumer could not write to the store.
    PersistenceFailed,
}

impl Stop {
    /// Whether this stop leaves pages that may hold unseen documents.
    fn loses_data(&self) -> bool {
        matches!(
            self,
            Stop::Unreachable { .. } | Stop::PageLimit { .. } | Stop::PersistenceFailed
        )
    }
}

/// One-shot stop signal. The first raise wins; later raises only
/// contribute to [`is_incomplete`](Termination::is_incomplete).
#[derive(Debug, Default)]
pub struct Termination {
    first: OnceLock<Stop>,
    incomplete: AtomicBool,
}

impl Termination {
    /// Returns `true` for the raise that actually set the signal.
    pub fn raise(&self, stop: Stop) -> bool {
        if stop.loses_data() {
            self.incomplete.store(true, Ordering::SeqCst);
        }
        self.first.set(stop).is_ok()
    }

    pub fn is_raised(&self) -> bool {
        self.first.get().is_some()
    }

    pub fn first(&self) -> Option<Stop> {
        self.first.get().copied()
    }

    pub fn is_incomplete(&self) -> bool {
        self.incomplete.load(Ordering::SeqCst)
    }
}

/// What one [`paginate_entity`] call did.
#[derive(Debug)]
pub struct EntityOutcome {
    /// Documents written by this call, in arrival order.
    pub stored: Vec<Document>,
    pub pages_launched: u32,
    pub stop: Option<Stop>,
    /// `false` when some page could not be fetched; the entity should not be
    /// marked done.
    pub complete: bool,
}

/// Discover, fetch and persist every new document listed for `entity_name`.
///
/// Returns an error only for failures that make the run untrustworthy: a
/// store write failed or a worker panicked. Page-level and item-level
/// failures are logged and reflected in [`EntityOutcome::complete`].
pub async fn paginate_entity(pipeline: &Pipeline, entity_name: &str) -> Result<EntityOutcome> {
    let concurrency = pipeline.settings.concurrency.max(1);
    let gate = Arc::new(Semaphore::new(concurrency));
    let termination = Arc::new(Termination::default());
    let (tx, rx) = mpsc::channel::<Document>(concurrency * 4);

    let consumer = tokio::spawn(persist_documents(
        Arc::clone(&pipeline.store),
        Arc::clone(&pipeline.progress),
        entity_name.to_string(),
        rx,
        Arc::clone(&termination),
    ));

    let mut workers = JoinSet::new();
    let mut page = 1u32;
    loop {
        let permit = Arc::clone(&gate)
            .acquire_owned()
            .await
            .context("Admission gate closed")?;
        if termination.is_raised() {
            break;
        }
        if let Some(max) = pipeline.settings.max_pages {
            if page > max {
                termination.raise(Stop::PageLimit { after: max });
                break;
            }
        }

        let worker = PageWorker {
            entity: entity_name.to_string(),
            page,
            pages: Arc::clone(&pipeline.pages),
            details: Arc::clone(&pipeline.details),
            store: Arc::clone(&pipeline.store),
            progress: Arc::clone(&pipeline.progress),
            termination: Arc::clone(&termination),
            tx: tx.clone(),
            page_retries: pipeline.settings.page_retries,
            retry_base: pipeline.settings.retry_base,
        };
        workers.spawn(worker.run(permit));
        page += 1;
    }
    let pages_launched = page - 1;

    // The consumer ends once every worker's sender clone is gone.
    drop(tx);

    let mut worker_failure = None;
    while let Some(joined) = workers.join_next().await {
        if let Err(e) = joined {
            worker_failure.get_or_insert(e);
        }
    }

    let stored = consumer
        .await
        .context("Persistence task panicked")?
        .with_context(|| format!("Failed to persist documents for {}", entity_name))?;

    if let Some(e) = worker_failure {
        return Err(anyhow!("Page worker for {} failed: {}", entity_name, e));
    }

    let stop = termination.first();
    info!(
        "{}: {} pages launched, {} documents stored, stop: {:?}",
        entity_name,
        pages_launched,
        stored.len(),
        stop
    );

    Ok(EntityOutcome {
        stored,
        pages_launched,
        stop,
        complete: !termination.is_incomplete(),
    })
}

/// Single writer for one entity: drains the merge channel into the store.
async fn persist_documents(
    store: Arc<dyn Store>,
    progress: Arc<dyn ProgressReporter>,
    entity: String,
    mut rx: mpsc::Receiver<Document>,
    termination: Arc<Termination>,
) -> Result<Vec<Document>> {
    let mut stored = Vec::new();

    while let Some(doc) = rx.recv().await {
        match store_once(store.as_ref(), &doc).await {
            Ok(true) => {
                progress.report(IngestEvent::DocumentStored {
                    entity: entity.clone(),
                    url: doc.url.clone(),
                    author: doc.author.clone(),
                });
                stored.push(doc);
            }
            Ok(false) => {
                debug!("{} arrived twice; keeping the first copy", doc.url);
                progress.report(IngestEvent::DocumentSkipped {
                    entity: entity.clone(),
                    url: doc.url,
                });
            }
            Err(e) => {
                termination.raise(Stop::PersistenceFailed);
                return Err(e.context(format!("Failed to store {}", doc.url)));
            }
        }
    }

    Ok(stored)
}

async fn store_once(store: &dyn Store, doc: &Document) -> Result<bool> {
    if store::document_exists(store, &doc.url).await? {
        return Ok(false);
    }
    store::save_document(store, doc).await?;
    Ok(true)
}

struct PageWorker {
    entity: String,
    page: u32,
    pages: Arc<dyn PageSource>,
    details: Arc<dyn DetailSource>,
    store: Arc<dyn Store>,
    progress: Arc<dyn ProgressReporter>,
    termination: Arc<Termination>,
    tx: mpsc::Sender<Document>,
    page_retries: u32,
    retry_base: Duration,
}

impl PageWorker {
    /// Holds `_permit` until the page and all of its documents are handled.
    async fn run(self, _permit: OwnedSemaphorePermit) {
        self.progress.report(IngestEvent::PageStarted {
            entity: self.entity.clone(),
            page: self.page,
        });

        let refs = match self.fetch_page().await {
            Ok(Page::Refs(refs)) => refs,
            Ok(Page::Empty) => {
                debug!("{} page {} is empty", self.entity, self.page);
                self.termination
                    .raise(Stop::Exhausted { page: self.page });
                self.finished(0);
                return;
            }
            Err(e) if e.is_transient() => {
                warn!(
                    "{} page {} unreachable, stopping pagination: {}",
                    self.entity, self.page, e
                );
                self.termination
                    .raise(Stop::Unreachable { page: self.page });
                return;
            }
            Err(e) => {
                warn!(
                    "{} page {} unusable, stopping pagination: {}",
                    self.entity, self.page, e
                );
                self.termination
                    .raise(Stop::Malformed { page: self.page });
                return;
            }
        };

        self.finished(refs.len());

        for doc_ref in &refs {
            match self.fetch_document(doc_ref).await {
                Ok(Some(doc)) => {
                    if self.tx.send(doc).await.is_err() {
                        debug!("{} page {}: persistence closed", self.entity, self.page);
                        return;
                    }
                }
                Ok(None) => {}
                Err(e) => warn!("Skipping {}: {:#}", doc_ref.source_uri, e),
            }
        }
    }

    fn finished(&self, refs: usize) {
        self.progress.report(IngestEvent::PageFinished {
            entity: self.entity.clone(),
            page: self.page,
            refs,
        });
    }

    async fn fetch_page(&self) -> Result<Page, FetchError> {
        let mut attempt = 0;
        loop {
            match self.pages.fetch_page(&self.entity, self.page).await {
                Err(e) if e.is_transient() && attempt < self.page_retries => {
                    attempt += 1;
                    let delay = backoff(self.retry_base, attempt);
                    warn!(
                        "{} page {} failed ({}), retry {}/{} in {:?}",
                        self.entity, self.page, e, attempt, self.page_retries, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                other => return other,
            }
        }
    }

    /// `Ok(None)` when the document's URL is already stored.
    async fn fetch_document(&self, doc_ref: &DocumentRef) -> Result<Option<Document>> {
        let detail = self.details.resolve(&doc_ref.source_uri).await?;

        if store::document_exists(self.store.as_ref(), &detail.url).await? {
            self.progress.report(IngestEvent::DocumentSkipped {
                entity: self.entity.clone(),
                url: detail.url,
            });
            return Ok(None);
        }

        let doc = self.details.materialize(&detail, &self.entity).await?;
        Ok(Some(doc))
    }
}

/// Exponential backoff: base, 2·base, 4·base, ... capped at 32·base.
fn backoff(base: Duration, attempt: u32) -> Duration {
    base * (1u32 << attempt.saturating_sub(1).min(5))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_raise_wins() {
        let t = Termination::default();
        assert!(!t.is_raised());
        assert!(t.raise(Stop::Exhausted { page: 4 }));
        assert!(!t.raise(Stop::Malformed { page: 2 }));
        assert_eq!(t.first(), Some(Stop::Exhausted { page: 4 }));
        assert!(!t.is_incomplete());
    }

    #[test]
    fn late_unreachable_still_marks_incomplete() {
        let t = Termination::default();
        t.raise(Stop::Exhausted { page: 3 });
        t.raise(Stop::Unreachable { page: 2 });
        assert_eq!(t.first(), Some(Stop::Exhausted { page: 3 }));
        assert!(t.is_incomplete());
    }

    #[test]
    fn page_limit_is_incomplete() {
        let t = Termination::default();
        t.raise(Stop::PageLimit { after: 2 });
        assert!(t.is_incomplete());
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let base = Duration::from_millis(10);
        assert_eq!(backoff(base, 1), Duration::from_millis(10));
        assert_eq!(backoff(base, 2), Duration::from_millis(20));
        assert_eq!(backoff(base, 3), Duration::from_millis(40));
        assert_eq!(backoff(base, 12), Duration::from_millis(320));
    }
}
