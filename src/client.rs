//! Shared HTTP client construction.

use anyhow::Result;
use std::time::Duration;

use crate::config::IngestConfig;

/// Build the client shared by discovery, page and detail fetchers.
///
/// No timeout is applied unless `ingest.timeout_secs` is set; a request that
/// times out surfaces as a transient [`FetchError`](crate::error::FetchError).
pub fn build_client(config: &IngestConfig) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());
    if let Some(secs) = config.timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    Ok(builder.build()?)
}
