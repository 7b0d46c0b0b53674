//! Integration tests for the SQLite-backed store.
//!
//! Each test writes a config into a fresh `TempDir`, opens the database
//! through the same path the CLI uses and exercises the store directly.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use docket_harvest::config::{load_config, Config};
use docket_harvest::detail::DetailSource;
use docket_harvest::driver::run_entities;
use docket_harvest::error::FetchError;
use docket_harvest::export::run_export;
use docket_harvest::ingest::open_store;
use docket_harvest::migrate;
use docket_harvest::models::{Detail, Document, DocumentRef, Entity, Page};
use docket_harvest::page::PageSource;
use docket_harvest::pagination::{PaginationSettings, Pipeline};
use docket_harvest::progress::NoProgress;
use docket_harvest::stats::collect_stats;
use docket_harvest::store::{self, Namespace, Store};
use tempfile::TempDir;

fn test_config(tmp: &TempDir) -> Config {
    let path = tmp.path().join("harvest.toml");
    let content = format!(
        r#"
[db]
path = "{}"

[listing]
url = "http://127.0.0.1:1/proposicoes"
periods = ["2022"]
"#,
        tmp.path().join("data/harvest.sqlite").display()
    );
    std::fs::write(&path, content).unwrap();
    load_config(&path).unwrap()
}

#[tokio::test]
async fn put_get_scan_contains() {
    let tmp = TempDir::new().unwrap();
    let cfg = test_config(&tmp);
    let store = open_store(&cfg).await.unwrap();

    store.put(Namespace::Entities, "b", b"2").await.unwrap();
    store.put(Namespace::Entities, "a", b"1").await.unwrap();
    store.put(Namespace::Entities, "a", b"one").await.unwrap();

    assert_eq!(
        store.get(Namespace::Entities, "a").await.unwrap(),
        Some(b"one".to_vec())
    );
    assert_eq!(store.get(Namespace::Documents, "a").await.unwrap(), None);
    assert!(store.contains(Namespace::Entities, "b").await.unwrap());
    assert!(!store.contains(Namespace::WorkStatus, "b").await.unwrap());

    let entries = store.scan(Namespace::Entities).await.unwrap();
    assert_eq!(
        entries,
        vec![
            ("a".to_string(), b"one".to_vec()),
            ("b".to_string(), b"2".to_vec()),
        ]
    );
}

#[tokio::test]
async fn migrations_are_idempotent_and_keep_data() {
    let tmp = TempDir::new().unwrap();
    let cfg = test_config(&tmp);

    migrate::run_migrations(&cfg).await.unwrap();
    let store = open_store(&cfg).await.unwrap();
    store::save_entities(&store, &[Entity::new("1", "Ana")])
        .await
        .unwrap();
    store.pool().close().await;

    migrate::run_migrations(&cfg).await.unwrap();
    let store = open_store(&cfg).await.unwrap();
    assert_eq!(
        store::load_entities(&store).await.unwrap(),
        vec![Entity::new("1", "Ana")]
    );
}

#[tokio::test]
async fn corrupt_record_is_reported() {
    let tmp = TempDir::new().unwrap();
    let cfg = test_config(&tmp);
    let store = open_store(&cfg).await.unwrap();

    store
        .put(Namespace::Documents, "http://docs.test/x.pdf", b"not json")
        .await
        .unwrap();

    let err = store::load_documents(&store).await.unwrap_err();
    assert!(format!("{:#}", err).contains("http://docs.test/x.pdf"));
}

// ─── Resume across runs ─────────────────────────────────────────────

/// One page per entity, one document per page.
struct OnePage;

#[async_trait]
impl PageSource for OnePage {
    async fn fetch_page(&self, entity_name: &str, page: u32) -> Result<Page, FetchError> {
        if entity_name == "Offline" {
            return Err(FetchError::Status {
                status: 502,
                url: "http://listing.test".into(),
            });
        }
        if page > 1 {
            return Ok(Page::Empty);
        }
        Ok(Page::from_refs(vec![DocumentRef {
            source_uri: format!("http://api.test/{}", entity_name),
            upstream_id: None,
        }]))
    }
}

struct EchoDetails;

#[async_trait]
impl DetailSource for EchoDetails {
    async fn resolve(&self, source_uri: &str) -> Result<Detail, FetchError> {
        Ok(Detail {
            id: "1".into(),
            url: source_uri.replace("api.test", "docs.test"),
        })
    }

    async fn materialize(
        &self,
        detail: &Detail,
        entity_name: &str,
    ) -> Result<Document, FetchError> {
        Ok(Document {
            id: detail.id.clone(),
            metadata_text: String::new(),
            author: entity_name.to_string(),
            url: detail.url.clone(),
            entity_name: entity_name.to_string(),
        })
    }
}

#[tokio::test]
async fn resume_picks_up_pending_entities() {
    let tmp = TempDir::new().unwrap();
    let cfg = test_config(&tmp);
    let entities = vec![
        Entity::new("1", "Ana"),
        Entity::new("2", "Offline"),
        Entity::new("3", "Carla"),
    ];

    let store = Arc::new(open_store(&cfg).await.unwrap());
    store::save_entities(store.as_ref(), &entities).await.unwrap();

    let pipeline = Pipeline {
        store: store.clone(),
        pages: Arc::new(OnePage),
        details: Arc::new(EchoDetails),
        progress: Arc::new(NoProgress),
        settings: PaginationSettings {
            concurrency: 2,
            page_retries: 1,
            retry_base: Duration::from_millis(1),
            max_pages: None,
        },
    };

    let first = run_entities(&pipeline, &entities).await.unwrap();
    assert_eq!(first.completed, 2);
    assert_eq!(first.incomplete, 1);

    let stats = collect_stats(store.as_ref()).await.unwrap();
    assert_eq!(stats.done, 2);
    assert_eq!(stats.documents, 2);
    assert_eq!(stats.pending, vec![Entity::new("2", "Offline")]);

    let second = run_entities(&pipeline, &entities).await.unwrap();
    assert_eq!(second.skipped, 2);
    assert_eq!(second.incomplete, 1);
    assert_eq!(second.documents_stored, 0);

    let out = tmp.path().join("out/docs.csv");
    let rows = run_export(store.as_ref(), &out).await.unwrap();
    assert_eq!(rows, 2);
    assert_eq!(
        std::fs::read_to_string(&out).unwrap(),
        "ENTITY;URL;AUTHOR\n\
         Ana;http://docs.test/Ana;Ana\n\
         Carla;http://docs.test/Carla;Carla\n"
    );
}
