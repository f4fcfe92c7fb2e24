//! External show-metadata provider.
//!
//! Lookups resolve one show identifier to a [`ShowMetadata`] document.
//! [`HttpMetadataProvider`] fetches `GET {base_url}/{id}` and expects JSON;
//! a `file://` base URL reads `{dir}/{id}.json` instead, which is handy for
//! offline fixtures.
//!
//! A failed lookup is an [`IngestError::Lookup`] value for that one id; the
//! caller decides to log it and move on.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;

use episode_browser_core::error::IngestError;
use episode_browser_core::normalize::ShowMetadata;

use crate::config::{CrawlerConfig, ProviderConfig};

#[async_trait]
pub trait MetadataProvider: Send + Sync {
    async fn lookup(&self, id: &str) -> Result<ShowMetadata, IngestError>;
}

pub struct HttpMetadataProvider {
    client: reqwest::Client,
    base_url: String,
}

impl HttpMetadataProvider {
    pub fn new(base_url: &str, provider: &ProviderConfig, crawler: &CrawlerConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(crawler.user_agent.clone())
            .timeout(Duration::from_secs(provider.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn fetch(&self, id: &str) -> Result<ShowMetadata> {
        if let Some(dir) = self.base_url.strip_prefix("file://") {
            let path = PathBuf::from(dir).join(format!("{}.json", id));
            let raw = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("no metadata file {}", path.display()))?;
            return serde_json::from_str(&raw).context("malformed metadata JSON");
        }

        let url = format!("{}/{}", self.base_url, id);
        let meta = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json::<ShowMetadata>()
            .await?;
        Ok(meta)
    }
}

#[async_trait]
impl MetadataProvider for HttpMetadataProvider {
    async fn lookup(&self, id: &str) -> Result<ShowMetadata, IngestError> {
        self.fetch(id).await.map_err(|e| IngestError::Lookup {
            id: id.to_string(),
            message: format!("{:#}", e),
        })
    }
}
