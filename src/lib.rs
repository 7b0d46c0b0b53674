//! # Docket Harvest
//!
//! A resumable harvester for per-author document listings.
//!
//! For every known entity (an author), the harvester walks a paginated JSON
//! listing whose length is not known up front, resolves each listed
//! reference to a canonical document URL, downloads the file, extracts its
//! embedded metadata and stores one record per URL. Progress is persisted in
//! SQLite, so an interrupted run resumes at the first entity not yet done.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌──────────────┐   ┌──────────────┐   ┌──────────┐
//! │ Discovery  │──▶│ Entity driver │──▶│  Pagination  │──▶│  SQLite  │
//! │ HTML list  │   │  one at once  │   │  K workers   │   │ KV store │
//! └────────────┘   └──────────────┘   └──────┬───────┘   └────┬─────┘
//!                                            │                │
//!                               page / detail / exiftool       ▼
//!                                                         ┌──────────┐
//!                                                         │  export  │
//!                                                         └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! harvest init                  # create database
//! harvest discover              # crawl the entity list
//! harvest ingest                # harvest documents for every pending entity
//! harvest status
//! harvest export out/docs.csv
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`error`] | Fetch error classification |
//! | [`store`] | Namespaced key-value store (memory and SQLite) |
//! | [`page`] | Listing page fetcher |
//! | [`detail`] | Detail resolution and file download |
//! | [`extract`] | Embedded metadata extraction |
//! | [`pagination`] | Concurrent pagination coordinator |
//! | [`driver`] | Per-entity resume loop |
//! | [`discovery`] | Entity list crawler |
//! | [`export`] | `;`-separated document export |
//! | [`stats`] | Store status summary |
//! | [`progress`] | Progress reporting |
//! | [`ingest`] | Ingestion run wiring |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema creation |

pub mod client;
pub mod config;
pub mod db;
pub mod detail;
pub mod discovery;
pub mod driver;
pub mod error;
pub mod export;
pub mod extract;
pub mod ingest;
pub mod migrate;
pub mod models;
pub mod page;
pub mod pagination;
pub mod progress;
pub mod stats;
pub mod store;
