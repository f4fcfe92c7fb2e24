//! Static HTML snapshot source.
//!
//! Serves pages over HTTP(S) with `reqwest`, or from disk for `file://`
//! URLs and plain paths. A static document never grows, so its "height" is
//! the markup length and the crawler settles after a single scroll.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::config::CrawlerConfig;
use crate::crawler::{PageSession, SnapshotSource};

pub struct HtmlSnapshotSource {
    client: reqwest::Client,
}

impl HtmlSnapshotSource {
    pub fn new(config: &CrawlerConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }

    async fn fetch_markup(&self, url: &str) -> Result<String> {
        if url.starts_with("http://") || url.starts_with("https://") {
            let resp = self
                .client
                .get(url)
                .send()
                .await
                .with_context(|| format!("Failed to fetch {}", url))?
                .error_for_status()
                .with_context(|| format!("Bad response from {}", url))?;
            return resp
                .text()
                .await
                .with_context(|| format!("Failed to read body of {}", url));
        }

        let path = PathBuf::from(url.strip_prefix("file://").unwrap_or(url));
        tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read page file: {}", path.display()))
    }
}

struct StaticPage {
    html: String,
}

#[async_trait]
impl PageSession for StaticPage {
    async fn scroll_height(&mut self) -> Result<u64> {
        Ok(self.html.len() as u64)
    }

    async fn scroll_to_bottom(&mut self) -> Result<()> {
        Ok(())
    }

    async fn snapshot(&mut self) -> Result<String> {
        Ok(self.html.clone())
    }
}

#[async_trait]
impl SnapshotSource for HtmlSnapshotSource {
    async fn fetch(&self, url: &str) -> Result<Box<dyn PageSession>> {
        let html = self.fetch_markup(url).await?;
        tracing::debug!(url, bytes = html.len(), "page fetched");
        Ok(Box::new(StaticPage { html }))
    }
}
