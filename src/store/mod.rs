//! Storage abstraction for the harvester.
//!
//! The [`Store`] trait is a small key-value surface with three independent
//! namespaces. Values are opaque bytes at this level; the typed helpers at
//! the bottom of this module encode records as JSON.
//!
//! Implementations must be `Send + Sync` and make a single key's `put`
//! atomic. The pagination coordinator writes from exactly one task per
//! entity and reads from many.

pub mod memory;
pub mod sqlite;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::models::{Document, Entity};

/// Independent key spaces, one per record kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Namespace {
    /// Entities keyed by id.
    Entities,
    /// Documents keyed by canonical URL.
    Documents,
    /// Completion markers keyed by entity name.
    WorkStatus,
}

impl Namespace {
    pub const ALL: [Namespace; 3] = [
        Namespace::Entities,
        Namespace::Documents,
        Namespace::WorkStatus,
    ];

    /// Table (bucket) name used by persistent backends.
    pub fn table(&self) -> &'static str {
        match self {
            Namespace::Entities => "entities",
            Namespace::Documents => "documents",
            Namespace::WorkStatus => "work_status",
        }
    }
}

/// Abstract key-value backend.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`put`](Store::put) | Insert or replace the value for a key |
/// | [`get`](Store::get) | Fetch a value by key |
/// | [`scan`](Store::scan) | Every entry in a namespace, in key order |
/// | [`contains`](Store::contains) | Presence check |
#[async_trait]
pub trait Store: Send + Sync {
    async fn put(&self, ns: Namespace, key: &str, value: &[u8]) -> Result<()>;

    async fn get(&self, ns: Namespace, key: &str) -> Result<Option<Vec<u8>>>;

    async fn scan(&self, ns: Namespace) -> Result<Vec<(String, Vec<u8>)>>;

    async fn contains(&self, ns: Namespace, key: &str) -> Result<bool> {
        Ok(self.get(ns, key).await?.is_some())
    }
}

pub async fn save_entities(store: &dyn Store, entities: &[Entity]) -> Result<()> {
    for entity in entities {
        let value = serde_json::to_vec(entity)?;
        store.put(Namespace::Entities, &entity.id, &value).await?;
    }
    Ok(())
}

pub async fn load_entities(store: &dyn Store) -> Result<Vec<Entity>> {
    decode_all(store, Namespace::Entities).await
}

pub async fn document_exists(store: &dyn Store, url: &str) -> Result<bool> {
    store.contains(Namespace::Documents, url).await
}

pub async fn save_document(store: &dyn Store, doc: &Document) -> Result<()> {
    let value = serde_json::to_vec(doc)?;
    store.put(Namespace::Documents, &doc.url, &value).await
}

pub async fn load_documents(store: &dyn Store) -> Result<Vec<Document>> {
    decode_all(store, Namespace::Documents).await
}

pub async fn is_entity_done(store: &dyn Store, entity_name: &str) -> Result<bool> {
    store.contains(Namespace::WorkStatus, entity_name).await
}

/// Record that ingestion for `entity_name` reached its termination condition.
/// The value is the completion time; only presence is meaningful.
pub async fn mark_entity_done(store: &dyn Store, entity_name: &str) -> Result<()> {
    let marker = chrono::Utc::now().to_rfc3339();
    store
        .put(Namespace::WorkStatus, entity_name, marker.as_bytes())
        .await
}

async fn decode_all<T: serde::de::DeserializeOwned>(
    store: &dyn Store,
    ns: Namespace,
) -> Result<Vec<T>> {
    store
        .scan(ns)
        .await?
        .into_iter()
        .map(|(key, value)| {
            serde_json::from_slice(&value)
                .with_context(|| format!("Corrupt record in {}: {}", ns.table(), key))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::memory::InMemoryStore;
    use super::*;

    #[tokio::test]
    async fn documents_are_keyed_by_url() {
        let store = InMemoryStore::new();
        let doc = Document {
            id: "7".into(),
            metadata_text: "[Author] Ana\n".into(),
            author: "Ana".into(),
            url: "http://docs.test/7.pdf".into(),
            entity_name: "Ana".into(),
        };
        save_document(&store, &doc).await.unwrap();
        save_document(&store, &doc).await.unwrap();

        assert!(document_exists(&store, "http://docs.test/7.pdf").await.unwrap());
        assert_eq!(load_documents(&store).await.unwrap(), vec![doc]);
    }

    #[tokio::test]
    async fn entities_are_keyed_by_id() {
        let store = InMemoryStore::new();
        let twins = [Entity::new("10", "Ana Lima"), Entity::new("20", "Ana Lima")];
        save_entities(&store, &twins).await.unwrap();
        save_entities(&store, &twins[..1]).await.unwrap();

        assert_eq!(load_entities(&store).await.unwrap(), twins.to_vec());
    }

    #[tokio::test]
    async fn work_status_is_presence_only() {
        let store = InMemoryStore::new();
        assert!(!is_entity_done(&store, "Ana").await.unwrap());
        mark_entity_done(&store, "Ana").await.unwrap();
        assert!(is_entity_done(&store, "Ana").await.unwrap());
        assert!(!is_entity_done(&store, "Bruno").await.unwrap());
    }

    #[tokio::test]
    async fn corrupt_record_names_its_key() {
        let store = InMemoryStore::new();
        store
            .put(Namespace::Entities, "broken", b"not json")
            .await
            .unwrap();
        let err = load_entities(&store).await.unwrap_err();
        assert!(err.to_string().contains("entities: broken"));
    }
}
