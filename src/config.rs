//! TOML configuration.
//!
//! Every section except `[db]` is optional; missing keys fall back to the
//! `default_*` values below. [`load_config`] parses and validates in one go
//! so commands can assume a usable configuration.
//!
//! ```toml
//! [db]
//! path = "./data/episodes.sqlite"
//!
//! [crawler]
//! settle_interval_ms = 2000
//! max_duration_secs = 120
//!
//! [crawler.episodes]
//! item = "article.episode-item-wrapper"
//! title = ".ipc-title__text"
//! link = "a.ipc-title-link-wrapper"
//! metadata = "span.air-date"
//!
//! [provider]
//! base_url = "http://localhost:8700/title"
//!
//! [retrieval]
//! page_size = 50
//!
//! [server]
//! bind = "127.0.0.1:8050"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::crawler::SelectorSet;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CrawlerConfig {
    #[serde(default = "default_settle_interval_ms")]
    pub settle_interval_ms: u64,
    #[serde(default = "default_max_duration_secs")]
    pub max_duration_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_series_selectors")]
    pub series: SelectorConfig,
    #[serde(default = "default_episode_selectors")]
    pub episodes: SelectorConfig,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            settle_interval_ms: default_settle_interval_ms(),
            max_duration_secs: default_max_duration_secs(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            series: default_series_selectors(),
            episodes: default_episode_selectors(),
        }
    }
}

impl CrawlerConfig {
    pub fn settle_interval(&self) -> Duration {
        Duration::from_millis(self.settle_interval_ms)
    }

    pub fn max_duration(&self) -> Duration {
        Duration::from_secs(self.max_duration_secs)
    }
}

fn default_settle_interval_ms() -> u64 {
    2000
}
fn default_max_duration_secs() -> u64 {
    120
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/91.0.4472.124 Safari/537.36"
        .to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

/// CSS selectors locating one kind of list item and its parts.
///
/// `title`, `link`, `metadata` and the optional fields are evaluated inside
/// each `item` element.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct SelectorConfig {
    pub item: String,
    pub title: String,
    pub link: String,
    #[serde(default = "default_link_attr")]
    pub link_attr: String,
    pub metadata: String,
    #[serde(default)]
    pub air_date: Option<String>,
    #[serde(default)]
    pub rating: Option<String>,
    #[serde(default)]
    pub votes: Option<String>,
    #[serde(default)]
    pub plot: Option<String>,
}

fn default_link_attr() -> String {
    "href".to_string()
}

fn default_series_selectors() -> SelectorConfig {
    SelectorConfig {
        item: "li.ipc-metadata-list-summary-item".to_string(),
        title: "a.ipc-title-link-wrapper".to_string(),
        link: "a.ipc-title-link-wrapper".to_string(),
        link_attr: default_link_attr(),
        metadata: "div.dli-title-metadata".to_string(),
        air_date: None,
        rating: None,
        votes: None,
        plot: None,
    }
}

fn default_episode_selectors() -> SelectorConfig {
    SelectorConfig {
        item: "article.episode-item-wrapper".to_string(),
        title: ".ipc-title__text".to_string(),
        link: "a.ipc-title-link-wrapper".to_string(),
        link_attr: default_link_attr(),
        metadata: "span.air-date".to_string(),
        air_date: Some("span.air-date".to_string()),
        rating: Some("span.ipc-rating-star--rating".to_string()),
        votes: Some("span.ipc-rating-star--voteCount".to_string()),
        plot: Some("div.ipc-html-content-inner-div".to_string()),
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProviderConfig {
    /// Lookups are `GET {base_url}/{id}`. Series sync needs this set.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_cast_limit")]
    pub cast_limit: usize,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            delay_ms: default_delay_ms(),
            timeout_secs: default_timeout_secs(),
            cast_limit: default_cast_limit(),
        }
    }
}

impl ProviderConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

fn default_delay_ms() -> u64 {
    1000
}
fn default_cast_limit() -> usize {
    episode_browser_core::models::DEFAULT_CAST_LIMIT
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_similar_limit")]
    pub similar_limit: usize,
    #[serde(default = "default_rank_free_text")]
    pub rank_free_text: bool,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            similar_limit: default_similar_limit(),
            rank_free_text: default_rank_free_text(),
        }
    }
}

fn default_page_size() -> u32 {
    episode_browser_core::query::DEFAULT_PAGE_SIZE
}
fn default_similar_limit() -> usize {
    episode_browser_core::rank::DEFAULT_SIMILAR_LIMIT
}
fn default_rank_free_text() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8050".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate crawler
    if config.crawler.settle_interval_ms == 0 {
        anyhow::bail!("crawler.settle_interval_ms must be > 0");
    }
    if config.crawler.max_duration_secs == 0 {
        anyhow::bail!("crawler.max_duration_secs must be > 0");
    }
    SelectorSet::compile(&config.crawler.series)
        .with_context(|| "Invalid selector in [crawler.series]")?;
    SelectorSet::compile(&config.crawler.episodes)
        .with_context(|| "Invalid selector in [crawler.episodes]")?;

    // Validate retrieval
    if config.retrieval.page_size < 1 {
        anyhow::bail!("retrieval.page_size must be >= 1");
    }
    if config.retrieval.similar_limit < 1 {
        anyhow::bail!("retrieval.similar_limit must be >= 1");
    }

    Ok(config)
}
