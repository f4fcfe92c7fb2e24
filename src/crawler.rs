//! Infinite-scroll crawler.
//!
//! [`load_all`] drives a [`PageSession`] until the page stops growing:
//!
//! 1. Fetch the page and measure its scroll height.
//! 2. Scroll to the bottom, wait `settle_interval`, measure again.
//! 3. Stop once two consecutive measurements agree.
//!
//! The loop is bounded by `max_duration`. When the budget runs out the
//! crawler keeps whatever content has loaded and flags the report as timed
//! out; a page that never settles is not an error.
//!
//! Item extraction runs on the final snapshot with CSS selectors from
//! config. An item without a title or metadata element is skipped and
//! counted, never fatal to the batch.

use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, warn};

use episode_browser_core::error::{IngestError, Outcome, SkipReason};
use episode_browser_core::models::RawItem;

use crate::config::{CrawlerConfig, SelectorConfig};

/// Produces page sessions for URLs.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Box<dyn PageSession>>;
}

/// One open page. Dropped when the crawl finishes.
#[async_trait]
pub trait PageSession: Send {
    /// Current scrollable height of the document.
    async fn scroll_height(&mut self) -> Result<u64>;

    async fn scroll_to_bottom(&mut self) -> Result<()>;

    /// Markup of the document as currently loaded.
    async fn snapshot(&mut self) -> Result<String>;
}

/// Timing knobs for [`load_all`].
#[derive(Debug, Clone, Copy)]
pub struct CrawlSettings {
    pub settle_interval: Duration,
    pub max_duration: Duration,
}

impl CrawlSettings {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            settle_interval: config.settle_interval(),
            max_duration: config.max_duration(),
        }
    }
}

/// Outcome of one crawl.
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub items: Vec<RawItem>,
    pub skipped: usize,
    pub iterations: u32,
    pub elapsed: Duration,
    pub timed_out: bool,
}

/// Compiled form of a [`SelectorConfig`].
#[derive(Debug, Clone)]
pub struct SelectorSet {
    item: Selector,
    title: Selector,
    link: Selector,
    link_attr: String,
    metadata: Selector,
    air_date: Option<Selector>,
    rating: Option<Selector>,
    votes: Option<Selector>,
    plot: Option<Selector>,
}

fn parse_selector(field: &str, css: &str) -> Result<Selector> {
    if css.trim().is_empty() {
        return Err(anyhow!("selector '{}' is empty", field));
    }
    Selector::parse(css).map_err(|e| anyhow!("selector '{}' = '{}': {:?}", field, css, e))
}

fn parse_optional(field: &str, css: &Option<String>) -> Result<Option<Selector>> {
    css.as_deref().map(|c| parse_selector(field, c)).transpose()
}

impl SelectorSet {
    pub fn compile(config: &SelectorConfig) -> Result<Self> {
        if config.link_attr.trim().is_empty() {
            return Err(anyhow!("selector 'link_attr' is empty"));
        }
        Ok(Self {
            item: parse_selector("item", &config.item)?,
            title: parse_selector("title", &config.title)?,
            link: parse_selector("link", &config.link)?,
            link_attr: config.link_attr.clone(),
            metadata: parse_selector("metadata", &config.metadata)?,
            air_date: parse_optional("air_date", &config.air_date)?,
            rating: parse_optional("rating", &config.rating)?,
            votes: parse_optional("votes", &config.votes)?,
            plot: parse_optional("plot", &config.plot)?,
        })
    }
}

/// Collapsed, trimmed text content of an element.
fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn first_text(scope: ElementRef<'_>, selector: &Selector) -> Option<String> {
    scope
        .select(selector)
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty())
}

fn optional_text(scope: ElementRef<'_>, selector: &Option<Selector>) -> Option<String> {
    selector.as_ref().and_then(|s| first_text(scope, s))
}

fn looks_like_id(segment: &str) -> bool {
    let prefix = segment.chars().take_while(|c| c.is_ascii_alphabetic()).count();
    let rest = &segment[prefix..];
    prefix > 0 && !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit())
}

/// Pull the item identifier out of a link reference.
///
/// `/title/tt0096697/?ref_=x` and `https://host/title/tt0096697/` both give
/// `tt0096697`. The first segment shaped like letters-then-digits wins,
/// otherwise the second path segment is used.
pub fn extract_id(href: &str) -> Option<String> {
    let href = href.trim();
    let path = match href.find("://") {
        Some(pos) => {
            let after = &href[pos + 3..];
            after.find('/').map(|p| &after[p..]).unwrap_or("")
        }
        None => href,
    };
    let path = path.split(['?', '#']).next().unwrap_or("");
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    segments
        .iter()
        .find(|s| looks_like_id(s))
        .or_else(|| segments.get(1))
        .map(|s| s.to_string())
}

/// Extract every item from a settled snapshot, in document order.
pub fn extract_items(html: &str, selectors: &SelectorSet) -> Vec<Outcome<RawItem>> {
    let document = Html::parse_document(html);
    document
        .select(&selectors.item)
        .map(|item| {
            let Some(title) = first_text(item, &selectors.title) else {
                return Outcome::Skip(SkipReason::MissingTitle);
            };
            let Some(metadata) = first_text(item, &selectors.metadata) else {
                return Outcome::Skip(SkipReason::MissingMetadata);
            };
            let link_id = item
                .select(&selectors.link)
                .next()
                .and_then(|a| a.value().attr(&selectors.link_attr))
                .and_then(extract_id);

            Outcome::Ok(RawItem {
                title,
                link_id,
                metadata,
                air_date: optional_text(item, &selectors.air_date),
                rating: optional_text(item, &selectors.rating),
                votes: optional_text(item, &selectors.votes),
                plot: optional_text(item, &selectors.plot),
            })
        })
        .collect()
}

/// Load `url` completely and extract its items.
///
/// Only a failure to open or read the page is an error.
pub async fn load_all(
    source: &dyn SnapshotSource,
    url: &str,
    selectors: &SelectorSet,
    settings: CrawlSettings,
) -> Result<CrawlReport> {
    let start = Instant::now();
    let mut session = source.fetch(url).await?;

    let mut last_height = session.scroll_height().await?;
    let mut iterations: u32 = 0;
    let mut timed_out = false;

    loop {
        if start.elapsed() >= settings.max_duration {
            timed_out = true;
            let err = IngestError::StabilityTimeout {
                elapsed: start.elapsed(),
                iterations,
            };
            warn!(url, "{}", err);
            break;
        }

        session.scroll_to_bottom().await?;
        iterations += 1;
        tokio::time::sleep(settings.settle_interval).await;

        let height = session.scroll_height().await?;
        debug!(url, iteration = iterations, height, last_height, "scrolled");
        if height == last_height {
            break;
        }
        last_height = height;
    }

    let html = session.snapshot().await?;
    drop(session);

    let mut items = Vec::new();
    let mut skipped = 0usize;
    for (index, outcome) in extract_items(&html, selectors).into_iter().enumerate() {
        match outcome {
            Outcome::Ok(item) => items.push(item),
            Outcome::Skip(reason) => {
                skipped += 1;
                warn!(url, index, %reason, "skipping item");
            }
        }
    }

    let elapsed = start.elapsed();
    info!(
        url,
        items = items.len(),
        skipped,
        iterations,
        elapsed_ms = elapsed.as_millis() as u64,
        timed_out,
        "crawl finished"
    );

    Ok(CrawlReport {
        items,
        skipped,
        iterations,
        elapsed,
        timed_out,
    })
}
