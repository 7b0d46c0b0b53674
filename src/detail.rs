//! Detail fetcher: turns a listed reference into a persistable [`Document`].
//!
//! Work is split in two so the caller can skip already-stored documents
//! before paying for the file download:
//!
//! 1. [`DetailSource::resolve`] fetches the detail JSON and picks the
//!    canonical URL (`statusProposicao.url`, falling back to
//!    `urlInteiroTeor`). That URL is the document's identity.
//! 2. [`DetailSource::materialize`] downloads the file at that URL into a
//!    scoped temp file, runs the metadata extractor over it and builds the
//!    record. The temp file is removed when it goes out of scope, on every
//!    path.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;

use crate::error::FetchError;
use crate::extract::{author_of, flatten, MetadataExtractor};
use crate::models::{Detail, Document};

const TEMP_PREFIX: &str = "harvest_";

#[async_trait]
pub trait DetailSource: Send + Sync {
    async fn resolve(&self, source_uri: &str) -> Result<Detail, FetchError>;

    async fn materialize(&self, detail: &Detail, entity_name: &str)
        -> Result<Document, FetchError>;
}

pub struct HttpDetailSource {
    client: reqwest::Client,
    extractor: Arc<dyn MetadataExtractor>,
    temp_dir: Option<PathBuf>,
}

impl HttpDetailSource {
    pub fn new(
        client: reqwest::Client,
        extractor: Arc<dyn MetadataExtractor>,
        temp_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            client,
            extractor,
            temp_dir,
        }
    }

    fn temp_file(&self) -> Result<NamedTempFile, FetchError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(TEMP_PREFIX);
        let file = match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        Ok(file)
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl DetailSource for HttpDetailSource {
    async fn resolve(&self, source_uri: &str) -> Result<Detail, FetchError> {
        let body = self.get(source_uri).await?.bytes().await?;
        parse_detail(&body)
    }

    async fn materialize(
        &self,
        detail: &Detail,
        entity_name: &str,
    ) -> Result<Document, FetchError> {
        let mut response = self.get(&detail.url).await?;

        // `file` owns the path and removes it on drop; writes go through an
        // async handle on the same file.
        let file = self.temp_file()?;
        let mut out = tokio::fs::File::from_std(file.reopen()?);
        while let Some(chunk) = response.chunk().await? {
            out.write_all(&chunk).await?;
        }
        out.flush().await?;
        drop(out);

        let fields = self.extractor.extract(file.path()).await?;

        Ok(Document {
            id: detail.id.clone(),
            metadata_text: flatten(&fields),
            author: author_of(&fields),
            url: detail.url.clone(),
            entity_name: entity_name.to_string(),
        })
    }
}

#[derive(Deserialize)]
struct DetailResponse {
    dados: DetailData,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DetailData {
    id: i64,
    #[serde(default)]
    status_proposicao: Option<DetailStatus>,
    #[serde(default)]
    url_inteiro_teor: Option<String>,
}

#[derive(Deserialize)]
struct DetailStatus {
    #[serde(default)]
    url: Option<String>,
}

pub fn parse_detail(body: &[u8]) -> Result<Detail, FetchError> {
    let detail: DetailResponse =
        serde_json::from_slice(body).map_err(|e| FetchError::Malformed(e.to_string()))?;
    let data = detail.dados;

    let primary = data.status_proposicao.and_then(|s| s.url);
    let url = non_empty(primary)
        .or_else(|| non_empty(data.url_inteiro_teor))
        .ok_or(FetchError::MissingUrl)?;

    Ok(Detail {
        id: data.id.to_string(),
        url,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
