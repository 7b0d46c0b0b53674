//! Page fetcher: one page of an entity's paginated document listing.
//!
//! The listing is a JSON endpoint answering
//! `GET {url}?autor=<name>&pagina=<n>&ano=2022&ano=2021...` with
//!
//! ```json
//! { "dados": [ { "id": 2190237, "uri": "https://.../proposicoes/2190237" } ],
//!   "links": [ ... ] }
//! ```
//!
//! A page with zero items is reported as [`Page::Empty`], the normal end of
//! pagination. A body that does not decode is [`FetchError::Malformed`].

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::ListingConfig;
use crate::error::FetchError;
use crate::models::{DocumentRef, Page};

#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch page `page` (1-based) of `entity_name`'s listing.
    async fn fetch_page(&self, entity_name: &str, page: u32) -> Result<Page, FetchError>;
}

pub struct HttpPageSource {
    client: reqwest::Client,
    listing: ListingConfig,
}

impl HttpPageSource {
    pub fn new(client: reqwest::Client, listing: ListingConfig) -> Self {
        Self { client, listing }
    }

    /// Query pairs for one page request, in the order they are sent.
    pub fn query_pairs(&self, entity_name: &str, page: u32) -> Vec<(String, String)> {
        let mut pairs = vec![
            (
                self.listing.entity_param.clone(),
                normalize_entity_name(entity_name).to_string(),
            ),
            (self.listing.page_param.clone(), page.to_string()),
        ];
        pairs.extend(self.listing.extra_params.iter().cloned());
        for period in &self.listing.periods {
            pairs.push((self.listing.period_param.clone(), period.clone()));
        }
        pairs
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn fetch_page(&self, entity_name: &str, page: u32) -> Result<Page, FetchError> {
        let response = self
            .client
            .get(&self.listing.url)
            .query(&self.query_pairs(entity_name, page))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: response.url().to_string(),
            });
        }

        let body = response.bytes().await?;
        parse_listing(&body)
    }
}

#[derive(Deserialize)]
struct ListingResponse {
    dados: Vec<ListingItem>,
}

#[derive(Deserialize)]
struct ListingItem {
    #[serde(default)]
    id: Option<i64>,
    uri: String,
}

pub fn parse_listing(body: &[u8]) -> Result<Page, FetchError> {
    let listing: ListingResponse =
        serde_json::from_slice(body).map_err(|e| FetchError::Malformed(e.to_string()))?;

    let refs = listing
        .dados
        .into_iter()
        .map(|item| DocumentRef {
            source_uri: item.uri,
            upstream_id: item.id,
        })
        .collect();

    Ok(Page::from_refs(refs))
}

/// Strip a trailing parenthetical suffix: `"Ana Lima (PT-SP)"` → `"Ana Lima"`.
pub fn normalize_entity_name(name: &str) -> &str {
    match name.find('(') {
        Some(idx) => name[..idx].trim(),
        None => name.trim(),
    }
}
