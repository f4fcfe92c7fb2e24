//! Query state and its transition function.
//!
//! A [`Query`] is rebuilt from the current user input on every interaction.
//! [`transition`] is pure: it takes the current query and one
//! [`QueryEvent`] (the full filter input plus an optional page action) and
//! returns the next query. Any filter change sends the page back to 1 and
//! discards a page action arriving in the same event.
//!
//! Raw inputs go through [`FilterInput::to_filter`], which turns blank or
//! malformed values into "no constraint" instead of errors.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{EpisodeFilter, EpisodeOrder};

/// Default number of episodes per page.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Date format accepted for range filters.
pub const FILTER_DATE_FORMAT: &str = "%Y-%m-%d";

/// Row offset for a 1-based `page`; pages below 1 are clamped to 1.
pub fn page_offset(page: u32, page_size: u32) -> u64 {
    (page.max(1) as u64 - 1) * page_size.max(1) as u64
}

/// A complete query: filters, ranking switch and pagination state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    #[serde(default)]
    pub filter: EpisodeFilter,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Rank free-text results by relevance instead of natural order.
    #[serde(default = "default_rank")]
    pub rank: bool,
    /// Ordering used when results are not ranked.
    #[serde(default)]
    pub order: EpisodeOrder,
}

fn default_page() -> u32 {
    1
}
fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}
fn default_rank() -> bool {
    true
}

impl Default for Query {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl Query {
    pub fn new(page_size: u32) -> Self {
        Self {
            filter: EpisodeFilter::default(),
            page: 1,
            page_size: page_size.max(1),
            rank: true,
            order: EpisodeOrder::Natural,
        }
    }

    pub fn with_filter(mut self, filter: EpisodeFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    pub fn offset(&self) -> u64 {
        page_offset(self.page, self.page_size)
    }

    /// Free-text term, if one is set and not blank.
    pub fn text(&self) -> Option<&str> {
        self.filter
            .text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    /// The filter handed to a store: free text trimmed, blank text dropped.
    pub fn store_filter(&self) -> EpisodeFilter {
        EpisodeFilter {
            text: self.text().map(str::to_string),
            ..self.filter.clone()
        }
    }
}

/// Filter values as typed by a user, before validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterInput {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub show: Option<String>,
    /// `YYYY-MM-DD`.
    #[serde(default)]
    pub aired_from: Option<String>,
    /// `YYYY-MM-DD`.
    #[serde(default)]
    pub aired_to: Option<String>,
    #[serde(default)]
    pub min_rating: Option<f64>,
    #[serde(default)]
    pub season: Option<i64>,
}

fn non_blank(s: &Option<String>) -> Option<String> {
    s.as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn parse_filter_date(s: &Option<String>) -> Option<NaiveDate> {
    non_blank(s).and_then(|v| NaiveDate::parse_from_str(&v, FILTER_DATE_FORMAT).ok())
}

impl FilterInput {
    /// Validate into an [`EpisodeFilter`].
    ///
    /// Blank strings, unparsable dates, an inverted date range, negative or
    /// non-finite ratings and non-positive seasons all become `None`.
    pub fn to_filter(&self) -> EpisodeFilter {
        let mut aired_from = parse_filter_date(&self.aired_from);
        let mut aired_to = parse_filter_date(&self.aired_to);
        if let (Some(from), Some(to)) = (aired_from, aired_to) {
            if from > to {
                aired_from = None;
                aired_to = None;
            }
        }

        EpisodeFilter {
            text: non_blank(&self.text),
            show: non_blank(&self.show),
            aired_from,
            aired_to,
            min_rating: self.min_rating.filter(|r| r.is_finite() && *r >= 0.0),
            season: self
                .season
                .filter(|s| *s > 0)
                .and_then(|s| u32::try_from(s).ok()),
        }
    }
}

/// Pagination intent attached to an interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageAction {
    Previous,
    Next,
    Goto(u32),
}

/// One interaction: the full current filter input plus an optional page action.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryEvent {
    #[serde(default)]
    pub filters: FilterInput,
    #[serde(default)]
    pub page_action: Option<PageAction>,
}

/// Compute the next query from the current one and an event.
pub fn transition(current: &Query, event: &QueryEvent) -> Query {
    let filter = event.filters.to_filter();
    let mut next = current.clone();
    next.page_size = current.page_size.max(1);

    if filter != current.filter {
        next.filter = filter;
        next.page = 1;
        return next;
    }

    let page = current.page.max(1);
    next.page = match event.page_action {
        None => page,
        Some(PageAction::Previous) => page.saturating_sub(1).max(1),
        Some(PageAction::Next) => page.saturating_add(1),
        Some(PageAction::Goto(p)) => p.max(1),
    };
    next
}
