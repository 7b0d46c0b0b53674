//! Ingest progress reporting.
//!
//! Reports per-entity, per-page and per-document progress during
//! `harvest ingest`. Progress is emitted on **stderr** so stdout remains
//! parseable for scripts; diagnostics (retries, skipped references) go
//! through `tracing` instead.

use std::io::Write;

/// A single progress event emitted by the driver or the pagination workers.
#[derive(Clone, Debug)]
pub enum IngestEvent {
    /// WorkStatus already set; no pages will be fetched.
    EntitySkipped { entity: String },
    EntityStarted { entity: String },
    PageStarted { entity: String, page: u32 },
    PageFinished { entity: String, page: u32, refs: usize },
    /// The URL is already stored; nothing was downloaded or written.
    DocumentSkipped { entity: String, url: String },
    DocumentStored {
        entity: String,
        url: String,
        author: String,
    },
    EntityFinished {
        entity: String,
        stored: usize,
        complete: bool,
    },
}

/// Receives progress events. Called concurrently from page workers.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: IngestEvent);
}

/// Human-friendly progress on stderr.
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, event: IngestEvent) {
        let line = match &event {
            IngestEvent::EntitySkipped { entity } => format!("skip {}  already done\n", entity),
            IngestEvent::EntityStarted { entity } => format!("entity {}\n", entity),
            IngestEvent::PageStarted { entity, page } => {
                format!("  {}  page {}  fetching...\n", entity, page)
            }
            IngestEvent::PageFinished { entity, page, refs } => {
                format!("  {}  page {}  {} items\n", entity, page, refs)
            }
            IngestEvent::DocumentSkipped { url, .. } => format!("    exists  {}\n", url),
            IngestEvent::DocumentStored { url, author, .. } => {
                if author.is_empty() {
                    format!("    stored  {}\n", url)
                } else {
                    format!("    stored  {}  ({})\n", url, author)
                }
            }
            IngestEvent::EntityFinished {
                entity,
                stored,
                complete,
            } => {
                let state = if *complete { "done" } else { "incomplete" };
                format!("entity {}  {}  {} documents stored\n", entity, state, stored)
            }
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl ProgressReporter for JsonProgress {
    fn report(&self, event: IngestEvent) {
        let obj = match &event {
            IngestEvent::EntitySkipped { entity } => serde_json::json!({
                "event": "entity_skipped",
                "entity": entity,
            }),
            IngestEvent::EntityStarted { entity } => serde_json::json!({
                "event": "entity_started",
                "entity": entity,
            }),
            IngestEvent::PageStarted { entity, page } => serde_json::json!({
                "event": "page_started",
                "entity": entity,
                "page": page,
            }),
            IngestEvent::PageFinished { entity, page, refs } => serde_json::json!({
                "event": "page_finished",
                "entity": entity,
                "page": page,
                "refs": refs,
            }),
            IngestEvent::DocumentSkipped { entity, url } => serde_json::json!({
                "event": "document_skipped",
                "entity": entity,
                "url": url,
            }),
            IngestEvent::DocumentStored {
                entity,
                url,
                author,
            } => serde_json::json!({
                "event": "document_stored",
                "entity": entity,
                "url": url,
                "author": author,
            }),
            IngestEvent::EntityFinished {
                entity,
                stored,
                complete,
            } => serde_json::json!({
                "event": "entity_finished",
                "entity": entity,
                "stored": stored,
                "complete": complete,
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _event: IngestEvent) {}
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "off" => Some(ProgressMode::Off),
            "human" => Some(ProgressMode::Human),
            "json" => Some(ProgressMode::Json),
            _ => None,
        }
    }

    pub fn reporter(&self) -> Box<dyn ProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
