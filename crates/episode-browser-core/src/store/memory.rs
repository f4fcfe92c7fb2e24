//! In-memory [`Store`] implementation for tests and embedding.
//!
//! Uses `BTreeMap`s behind `std::sync::RwLock`. Keying episodes on
//! [`EpisodeKey`] gives natural order for free; filtering is a linear scan.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::models::{Episode, EpisodeFilter, EpisodeKey, EpisodeOrder, Series};

use super::{EpisodeSlice, Store};

/// In-memory store.
pub struct InMemoryStore {
    episodes: RwLock<BTreeMap<EpisodeKey, Episode>>,
    series: RwLock<BTreeMap<String, Series>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            episodes: RwLock::new(BTreeMap::new()),
            series: RwLock::new(BTreeMap::new()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow!("in-memory store lock poisoned")
}

/// Air date ascending with undated episodes last, then natural order.
pub(crate) fn aired_cmp(a: &Episode, b: &Episode) -> Ordering {
    let by_date = match (a.air_date, b.air_date) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_date.then_with(|| a.key().cmp(&b.key()))
}

#[async_trait]
impl Store for InMemoryStore {
    async fn upsert_episode(&self, episode: &Episode) -> Result<()> {
        let mut episodes = self.episodes.write().map_err(poisoned)?;
        episodes.insert(episode.key(), episode.clone());
        Ok(())
    }

    async fn upsert_episodes(&self, batch: &[Episode]) -> Result<usize> {
        let mut episodes = self.episodes.write().map_err(poisoned)?;
        for ep in batch {
            episodes.insert(ep.key(), ep.clone());
        }
        Ok(batch.len())
    }

    async fn upsert_series(&self, series: &Series) -> Result<()> {
        let mut stored = self.series.write().map_err(poisoned)?;
        stored.insert(series.title.clone(), series.clone());
        Ok(())
    }

    async fn query_episodes(
        &self,
        filter: &EpisodeFilter,
        order: EpisodeOrder,
        limit: Option<u64>,
        offset: u64,
    ) -> Result<EpisodeSlice> {
        let episodes = self.episodes.read().map_err(poisoned)?;
        let mut matched: Vec<Episode> = episodes
            .values()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        if order == EpisodeOrder::Aired {
            matched.sort_by(aired_cmp);
        }

        let total = matched.len() as u64;
        let take = limit.map(|l| l as usize).unwrap_or(usize::MAX);
        let episodes = matched
            .into_iter()
            .skip(offset as usize)
            .take(take)
            .collect();
        Ok(EpisodeSlice { episodes, total })
    }

    async fn get_episode(&self, key: &EpisodeKey) -> Result<Option<Episode>> {
        let episodes = self.episodes.read().map_err(poisoned)?;
        Ok(episodes.get(key).cloned())
    }

    async fn get_series(&self, title: &str) -> Result<Option<Series>> {
        let series = self.series.read().map_err(poisoned)?;
        Ok(series.get(title).cloned())
    }

    async fn list_series(&self) -> Result<Vec<Series>> {
        let series = self.series.read().map_err(poisoned)?;
        Ok(series.values().cloned().collect())
    }

    async fn count_episodes(&self) -> Result<u64> {
        Ok(self.episodes.read().map_err(poisoned)?.len() as u64)
    }

    async fn count_series(&self) -> Result<u64> {
        Ok(self.series.read().map_err(poisoned)?.len() as u64)
    }
}
