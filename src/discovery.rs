//! Entity discovery from a paginated HTML listing.
//!
//! Visits `discovery.url` for pages `1..=discovery.pages` and collects the
//! anchors matching `discovery.selector`. Each anchor yields one [`Entity`]:
//! the id is the last path segment of its `href`, the name its text.
//!
//! Discovery runs before any ingestion, so every failure here is a setup
//! error and aborts the run.

use std::collections::HashSet;

use anyhow::{anyhow, bail, Context, Result};
use scraper::{Html, Selector};
use tracing::info;

use crate::config::DiscoveryConfig;
use crate::models::Entity;

pub async fn discover_entities(
    client: &reqwest::Client,
    config: &DiscoveryConfig,
) -> Result<Vec<Entity>> {
    let mut entities = Vec::new();
    let mut seen = HashSet::new();

    for page in 1..=config.pages {
        let url = config.url.replace("{page}", &page.to_string());
        info!("Visiting {}", url);

        let response = client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", url))?;
        if !response.status().is_success() {
            bail!("HTTP {} from {}", response.status(), url);
        }
        let html = response.text().await?;

        for entity in parse_entities(&html, &config.selector)? {
            if seen.insert(entity.id.clone()) {
                entities.push(entity);
            }
        }
    }

    Ok(entities)
}

/// Extract entities from one listing page, in document order.
pub fn parse_entities(html: &str, selector: &str) -> Result<Vec<Entity>> {
    let selector =
        Selector::parse(selector).map_err(|e| anyhow!("Invalid selector '{}': {}", selector, e))?;
    let document = Html::parse_document(html);

    let entities = document
        .select(&selector)
        .filter_map(|anchor| {
            let href = anchor.value().attr("href")?;
            let id = href.trim_end_matches('/').rsplit('/').next()?.trim();
            let name = anchor.text().collect::<String>();
            let name = name.trim();
            if id.is_empty() || name.is_empty() {
                return None;
            }
            Some(Entity::new(id, name))
        })
        .collect();

    Ok(entities)
}
