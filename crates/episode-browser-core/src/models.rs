//! Core data models used throughout Episode Browser.
//!
//! These types represent the raw crawl items, the normalized episode and
//! series records, and the filter predicates that flow through the
//! ingestion and retrieval pipeline.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::SkipReason;

/// Maximum number of cast members kept on a [`Series`].
pub const DEFAULT_CAST_LIMIT: usize = 10;

/// Raw item extracted from a settled page snapshot, before normalization.
///
/// `title` and `metadata` are guaranteed present (items missing either are
/// skipped during extraction). Everything else is whatever text the page
/// happened to carry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawItem {
    /// Title text (for episode lists this is the composite `S1.E2 ∙ Name`).
    pub title: String,
    /// Identifier taken from the item's link attribute (e.g. `tt0096697`).
    pub link_id: Option<String>,
    /// Free-text metadata badge (e.g. `1989–2025 790 eps TV-PG`).
    pub metadata: String,
    pub air_date: Option<String>,
    pub rating: Option<String>,
    pub votes: Option<String>,
    pub plot: Option<String>,
}

/// Natural key of an episode: `(show, season, episode)`.
///
/// The derived ordering is the default result ordering of the query engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EpisodeKey {
    pub show: String,
    pub season: u32,
    pub episode: u32,
}

impl std::fmt::Display for EpisodeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} S{}.E{}", self.show, self.season, self.episode)
    }
}

/// A normalized episode record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub show: String,
    pub season: u32,
    pub episode: u32,
    pub title: String,
    pub air_date: Option<NaiveDate>,
    /// Rating in `[0.0, 10.0]`.
    pub rating: Option<f64>,
    pub votes: Option<u64>,
    pub plot: Option<String>,
}

impl Episode {
    /// Build an episode from its required fields.
    ///
    /// Rejects an empty show or title and the unnumbered `(0, 0)` sentinel,
    /// so every constructed episode has a usable natural key.
    pub fn new(
        show: impl Into<String>,
        season: u32,
        episode: u32,
        title: impl Into<String>,
    ) -> Result<Self, SkipReason> {
        let show = show.into().trim().to_string();
        let title = title.into().trim().to_string();
        if show.is_empty() {
            return Err(SkipReason::MissingShow);
        }
        if title.is_empty() {
            return Err(SkipReason::MissingTitle);
        }
        if season == 0 || episode == 0 {
            return Err(SkipReason::UnnumberedEpisode);
        }
        Ok(Self {
            show,
            season,
            episode,
            title,
            air_date: None,
            rating: None,
            votes: None,
            plot: None,
        })
    }

    pub fn with_air_date(mut self, air_date: Option<NaiveDate>) -> Self {
        self.air_date = air_date;
        self
    }

    pub fn with_rating(mut self, rating: Option<f64>) -> Self {
        self.rating = rating.filter(|r| r.is_finite() && (0.0..=10.0).contains(r));
        self
    }

    pub fn with_votes(mut self, votes: Option<u64>) -> Self {
        self.votes = votes;
        self
    }

    pub fn with_plot(mut self, plot: Option<String>) -> Self {
        self.plot = plot
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());
        self
    }

    pub fn key(&self) -> EpisodeKey {
        EpisodeKey {
            show: self.show.clone(),
            season: self.season,
            episode: self.episode,
        }
    }

    /// Text indexed by the relevance ranker: title and plot concatenated.
    pub fn search_text(&self) -> String {
        match &self.plot {
            Some(plot) => format!("{} {}", self.title, plot),
            None => self.title.clone(),
        }
    }
}

/// A normalized series record, keyed on `title`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub title: String,
    pub year: Option<i32>,
    pub genres: Vec<String>,
    pub directors: Vec<String>,
    pub cast: Vec<String>,
    pub rating: Option<f64>,
    pub plot: Option<String>,
    /// Runtime in minutes.
    pub runtime: Option<u32>,
    pub num_episodes: Option<u32>,
}

impl Series {
    pub fn new(title: impl Into<String>) -> Result<Self, SkipReason> {
        let title = title.into().trim().to_string();
        if title.is_empty() {
            return Err(SkipReason::MissingTitle);
        }
        Ok(Self {
            title,
            year: None,
            genres: Vec::new(),
            directors: Vec::new(),
            cast: Vec::new(),
            rating: None,
            plot: None,
            runtime: None,
            num_episodes: None,
        })
    }

    /// Keep only the first `limit` cast members, preserving billing order.
    pub fn cap_cast(mut self, limit: usize) -> Self {
        self.cast.truncate(limit);
        self
    }
}

/// Result ordering for unranked queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EpisodeOrder {
    /// `(show, season, episode)` ascending.
    #[default]
    Natural,
    /// Air date ascending, undated episodes last, then natural order.
    Aired,
}

/// Conjunction of optional episode predicates.
///
/// A `None` field applies no constraint. Episodes with a null air date or
/// rating never satisfy a date or rating bound.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EpisodeFilter {
    /// Case-insensitive substring matched against title OR plot.
    pub text: Option<String>,
    pub show: Option<String>,
    pub aired_from: Option<NaiveDate>,
    pub aired_to: Option<NaiveDate>,
    pub min_rating: Option<f64>,
    pub season: Option<u32>,
}

impl EpisodeFilter {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Evaluate every predicate against one episode.
    pub fn matches(&self, ep: &Episode) -> bool {
        if let Some(text) = &self.text {
            let needle = text.to_lowercase();
            let in_title = ep.title.to_lowercase().contains(&needle);
            let in_plot = ep
                .plot
                .as_deref()
                .map(|p| p.to_lowercase().contains(&needle))
                .unwrap_or(false);
            if !in_title && !in_plot {
                return false;
            }
        }
        if let Some(show) = &self.show {
            if &ep.show != show {
                return false;
            }
        }
        if self.aired_from.is_some() || self.aired_to.is_some() {
            let Some(date) = ep.air_date else {
                return false;
            };
            if self.aired_from.is_some_and(|from| date < from) {
                return false;
            }
            if self.aired_to.is_some_and(|to| date > to) {
                return false;
            }
        }
        if let Some(min) = self.min_rating {
            match ep.rating {
                Some(r) if r >= min => {}
                _ => return false,
            }
        }
        if let Some(season) = self.season {
            if ep.season != season {
                return false;
            }
        }
        true
    }
}
