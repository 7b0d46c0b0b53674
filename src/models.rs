//! Core data models used throughout the harvester.
//!
//! Entities and documents are persisted as JSON values in the store; page
//! and detail types are transient and only live inside one pagination run.

use serde::{Deserialize, Serialize};

/// A named subject whose documents are ingested (e.g. a legislator).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub name: String,
}

impl Entity {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// One item listed on a page; points at the detail document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRef {
    pub source_uri: String,
    pub upstream_id: Option<i64>,
}

/// Result of fetching one listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Page {
    /// The page listed zero items: end of data.
    Empty,
    Refs(Vec<DocumentRef>),
}

impl Page {
    pub fn from_refs(refs: Vec<DocumentRef>) -> Self {
        if refs.is_empty() {
            Page::Empty
        } else {
            Page::Refs(refs)
        }
    }
}

/// A resolved detail payload, before the referenced file is downloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detail {
    pub id: String,
    /// Canonical full-text URL; the identity of the resulting [`Document`].
    pub url: String,
}

/// Persisted record for one fetched item. Keyed by `url` in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub metadata_text: String,
    pub author: String,
    pub url: String,
    pub entity_name: String,
}
