//! Storage abstraction for Episode Browser.
//!
//! The [`Store`] trait defines every storage operation the ingestion and
//! retrieval pipeline needs, so the query engine runs unchanged over the
//! SQLite backend in the app crate and the [`memory::InMemoryStore`] used
//! in tests.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.
//!
//! # Idempotency
//!
//! Episodes are keyed on `(show, season, episode)` and series on `title`.
//! Writing the same record twice leaves exactly one row holding the latest
//! field values.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

use crate::models::{Episode, EpisodeFilter, EpisodeKey, EpisodeOrder, Series};

/// One window of a filtered episode listing, with the full match count.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EpisodeSlice {
    pub episodes: Vec<Episode>,
    /// Number of episodes matching the filter, ignoring `limit`/`offset`.
    pub total: u64,
}

/// Abstract storage backend.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`upsert_episode`](Store::upsert_episode) | Insert or update one episode |
/// | [`upsert_episodes`](Store::upsert_episodes) | Upsert a batch atomically |
/// | [`upsert_series`](Store::upsert_series) | Insert or update one series |
/// | [`query_episodes`](Store::query_episodes) | Filtered, ordered, paginated listing |
/// | [`get_episode`](Store::get_episode) | Lookup by natural key |
/// | [`episodes_for_show`](Store::episodes_for_show) | One show's full catalog |
/// | [`get_series`](Store::get_series) | Lookup by title |
/// | [`list_series`](Store::list_series) | All series, by title |
/// | [`count_episodes`](Store::count_episodes) | Stored episode count |
/// | [`count_series`](Store::count_series) | Stored series count |
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert or update a single episode by natural key.
    async fn upsert_episode(&self, episode: &Episode) -> Result<()>;

    /// Upsert a batch. Either every episode is written or none is.
    ///
    /// Returns the number of episodes written.
    async fn upsert_episodes(&self, episodes: &[Episode]) -> Result<usize>;

    /// Insert or update a series by title.
    async fn upsert_series(&self, series: &Series) -> Result<()>;

    /// List episodes matching `filter` in `order`.
    ///
    /// `limit = None` returns every match after `offset`. `total` always
    /// reflects the complete match count, read consistently with the page.
    async fn query_episodes(
        &self,
        filter: &EpisodeFilter,
        order: EpisodeOrder,
        limit: Option<u64>,
        offset: u64,
    ) -> Result<EpisodeSlice>;

    async fn get_episode(&self, key: &EpisodeKey) -> Result<Option<Episode>>;

    /// Every episode of `show` in natural order.
    async fn episodes_for_show(&self, show: &str) -> Result<Vec<Episode>> {
        let filter = EpisodeFilter {
            show: Some(show.to_string()),
            ..Default::default()
        };
        Ok(self
            .query_episodes(&filter, EpisodeOrder::Natural, None, 0)
            .await?
            .episodes)
    }

    async fn get_series(&self, title: &str) -> Result<Option<Series>>;

    async fn list_series(&self) -> Result<Vec<Series>>;

    async fn count_episodes(&self) -> Result<u64>;

    async fn count_series(&self) -> Result<u64>;
}
