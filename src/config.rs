//! TOML configuration for `harvest`.
//!
//! Everything that decides what a "complete" ingestion means lives here:
//! the listing endpoint, the period selectors sent with every page query,
//! the worker limit and the retry policy for transient page failures.
//!
//! ```toml
//! [db]
//! path = "./data/harvest.sqlite"
//!
//! [listing]
//! url = "https://dadosabertos.camara.leg.br/api/v2/proposicoes"
//! periods = ["2022", "2021", "2020", "2019"]
//!
//! [ingest]
//! concurrency = 4
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub listing: ListingConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub extractor: ExtractorConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

/// Paginated listing endpoint, queried once per (entity, page).
#[derive(Debug, Deserialize, Clone)]
pub struct ListingConfig {
    pub url: String,
    #[serde(default = "default_entity_param")]
    pub entity_param: String,
    #[serde(default = "default_page_param")]
    pub page_param: String,
    #[serde(default = "default_period_param")]
    pub period_param: String,
    /// Period selectors; each one is sent as a repeated `period_param`.
    #[serde(default)]
    pub periods: Vec<String>,
    /// Fixed query pairs appended to every page request (ordering etc).
    #[serde(default = "default_extra_params")]
    pub extra_params: Vec<(String, String)>,
}

fn default_entity_param() -> String {
    "autor".to_string()
}
fn default_page_param() -> String {
    "pagina".to_string()
}
fn default_period_param() -> String {
    "ano".to_string()
}
fn default_extra_params() -> Vec<(String, String)> {
    vec![
        ("ordem".to_string(), "ASC".to_string()),
        ("ordenarPor".to_string(), "id".to_string()),
    ]
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    /// Maximum page workers in flight for one entity.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Extra attempts for a page that failed with a transient error.
    #[serde(default = "default_page_retries")]
    pub page_retries: u32,
    #[serde(default = "default_retry_base_ms")]
    pub retry_base_ms: u64,
    /// Stop issuing pages past this number even if no empty page was seen.
    #[serde(default)]
    pub max_pages: Option<u32>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Directory for downloaded files; the system temp dir when unset.
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            page_retries: default_page_retries(),
            retry_base_ms: default_retry_base_ms(),
            max_pages: None,
            timeout_secs: None,
            user_agent: default_user_agent(),
            temp_dir: None,
        }
    }
}

fn default_concurrency() -> usize {
    4
}
fn default_page_retries() -> u32 {
    2
}
fn default_retry_base_ms() -> u64 {
    1000
}
fn default_user_agent() -> String {
    concat!("docket-harvest/", env!("CARGO_PKG_VERSION")).to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExtractorConfig {
    #[serde(default = "default_extractor_program")]
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            program: default_extractor_program(),
            args: Vec::new(),
        }
    }
}

fn default_extractor_program() -> String {
    "exiftool".to_string()
}

/// HTML listing that yields the entity list.
#[derive(Debug, Deserialize, Clone)]
pub struct DiscoveryConfig {
    /// Page URL with a `{page}` placeholder.
    #[serde(default = "default_discovery_url")]
    pub url: String,
    #[serde(default = "default_discovery_pages")]
    pub pages: u32,
    #[serde(default = "default_discovery_selector")]
    pub selector: String,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            url: default_discovery_url(),
            pages: default_discovery_pages(),
            selector: default_discovery_selector(),
        }
    }
}

fn default_discovery_url() -> String {
    "https://www.camara.leg.br/deputados/quem-sao/resultado?search=&partido=&uf=&legislatura=56&sexo=&pagina={page}"
        .to_string()
}
fn default_discovery_pages() -> u32 {
    24
}
fn default_discovery_selector() -> String {
    ".lista-resultados__cabecalho > a".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.listing.url.trim().is_empty() {
        anyhow::bail!("listing.url must not be empty");
    }

    if config.ingest.concurrency == 0 {
        anyhow::bail!("ingest.concurrency must be >= 1");
    }

    if config.ingest.max_pages == Some(0) {
        anyhow::bail!("ingest.max_pages must be >= 1 when set");
    }

    if !config.discovery.url.contains("{page}") {
        anyhow::bail!("discovery.url must contain a {{page}} placeholder");
    }

    Ok(())
}
