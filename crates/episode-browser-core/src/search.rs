//! Query execution over any [`Store`].
//!
//! All frontends (CLI, HTTP) delegate here. The algorithm:
//!
//! 1. Without free text, or with ranking switched off, the store applies the
//!    filter, ordering and `LIMIT/OFFSET` itself and returns the page plus
//!    the total match count.
//! 2. With free text and ranking on, the store returns every episode that
//!    passes the filter (free text included, as a title-or-plot substring
//!    pre-filter). The candidates are ranked with a TF-IDF space fitted on
//!    the fly, then the requested page is cut from the ranked list.
//!
//! Similar-episode suggestions fetch the source episode's show catalog and
//! hand it to [`suggest_similar`].

use anyhow::Result;
use serde::Serialize;

use crate::models::{Episode, EpisodeKey, EpisodeOrder};
use crate::query::Query;
use crate::rank::{rank_by_text, suggest_similar, ScoredEpisode};
use crate::store::Store;

/// One result row. `score` is set only for ranked free-text queries.
#[derive(Debug, Clone, Serialize)]
pub struct EpisodeHit {
    #[serde(flatten)]
    pub episode: Episode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

/// A page of results plus the pagination state needed to render controls.
#[derive(Debug, Clone, Serialize)]
pub struct ResultPage {
    pub hits: Vec<EpisodeHit>,
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
    pub total_pages: u32,
    pub has_next: bool,
}

impl ResultPage {
    fn new(hits: Vec<EpisodeHit>, page: u32, page_size: u32, total: u64) -> Self {
        let pages = total_pages(total, page_size);
        Self {
            hits,
            page,
            page_size,
            total,
            total_pages: pages,
            has_next: page < pages,
        }
    }
}

/// Number of pages needed for `total` results, never less than 1.
pub fn total_pages(total: u64, page_size: u32) -> u32 {
    let size = page_size.max(1) as u64;
    let pages = total.div_ceil(size).max(1);
    u32::try_from(pages).unwrap_or(u32::MAX)
}

/// Execute `query` against `store` and return the requested page.
///
/// A page past the end yields an empty `hits` list with the real `total`.
pub async fn search<S: Store + ?Sized>(store: &S, query: &Query) -> Result<ResultPage> {
    let page = query.page.max(1);
    let page_size = query.page_size.max(1);
    let offset = query.offset();
    let filter = query.store_filter();

    match query.text() {
        Some(text) if query.rank => {
            let candidates = store
                .query_episodes(&filter, EpisodeOrder::Natural, None, 0)
                .await?;
            let ranked = rank_by_text(candidates.episodes, text);
            let total = ranked.len() as u64;
            let hits = ranked
                .into_iter()
                .skip(offset as usize)
                .take(page_size as usize)
                .map(|s| EpisodeHit {
                    episode: s.episode,
                    score: Some(s.score),
                })
                .collect();
            Ok(ResultPage::new(hits, page, page_size, total))
        }
        _ => {
            let slice = store
                .query_episodes(&filter, query.order, Some(page_size as u64), offset)
                .await?;
            let hits = slice
                .episodes
                .into_iter()
                .map(|episode| EpisodeHit {
                    episode,
                    score: None,
                })
                .collect();
            Ok(ResultPage::new(hits, page, page_size, slice.total))
        }
    }
}

/// An episode together with its similar-episode suggestions.
#[derive(Debug, Clone, Serialize)]
pub struct EpisodeDetail {
    pub episode: Episode,
    pub similar: Vec<ScoredEpisode>,
}

/// Look up an episode and up to `limit` similar episodes from the same show.
///
/// Returns `None` when the key is unknown.
pub async fn episode_detail<S: Store + ?Sized>(
    store: &S,
    key: &EpisodeKey,
    limit: usize,
) -> Result<Option<EpisodeDetail>> {
    let Some(episode) = store.get_episode(key).await? else {
        return Ok(None);
    };
    let catalog = store.episodes_for_show(&episode.show).await?;
    let similar = suggest_similar(&episode, catalog, limit);
    Ok(Some(EpisodeDetail { episode, similar }))
}
