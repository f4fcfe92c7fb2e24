//! Field normalization for raw crawl text.
//!
//! Every parser here is total: malformed input yields `None` (or the
//! unnumbered sentinel for season/episode markers), never a panic or an
//! error. Deciding whether a missing field sinks the whole record is left
//! to [`normalize_episode`] and [`normalize_series`].
//!
//! # Conventions
//!
//! | Input | Parser | Result |
//! |-------|--------|--------|
//! | `"1989–2025 790 eps TV-PG"` | [`parse_episode_count`] | `Some(790)` |
//! | `"S3.E14 ∙ Homer's Phobia"` | [`parse_season_episode`] | `3, 14, "Homer's Phobia"` |
//! | `"Tue, Sep 28, 1999"` | [`parse_air_date`] | `1999-09-28` |
//! | `"(1.2K)"` | [`parse_votes`] | `Some(1200)` |
//! | `"2.5"` | [`parse_votes`] | `Some(2500)` (decimal ≤ 100 is read as thousands) |
//! | `"(87)"` | [`parse_votes`] | `Some(87)` |
//! | `"8.3"` | [`parse_rating`] | `Some(8.3)` |

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Outcome, SkipReason};
use crate::models::{Episode, RawItem, Series};

/// Marker substring identifying the episode-count token in a metadata badge.
pub const EPISODE_COUNT_MARKER: &str = "eps";

/// Textual air-date format used by episode listings (`Tue, Sep 28, 1999`).
pub const AIR_DATE_FORMAT: &str = "%a, %b %d, %Y";

/// Separators accepted between the `S<n>.E<m>` marker and the episode name.
const TITLE_SEPARATORS: [char; 2] = ['∙', '·'];

/// Decimal vote values at or below this are taken to be in thousands.
const VOTES_THOUSANDS_CEILING: f64 = 100.0;

/// Season/episode numbers split out of a composite title.
///
/// `season == 0 && episode == 0` is the unnumbered sentinel: the title did
/// not follow `S<season>.E<episode> ∙ <name>` and `title` holds the whole
/// trimmed input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeasonEpisode {
    pub season: u32,
    pub episode: u32,
    pub title: String,
}

impl SeasonEpisode {
    fn unnumbered(title: &str) -> Self {
        Self {
            season: 0,
            episode: 0,
            title: title.trim().to_string(),
        }
    }

    pub fn is_numbered(&self) -> bool {
        self.season > 0 && self.episode > 0
    }
}

/// Extended show metadata as returned by the external metadata provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShowMetadata {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub directors: Vec<String>,
    #[serde(default)]
    pub cast: Vec<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub plot: Option<String>,
    /// Runtime strings in minutes, e.g. `["22"]`.
    #[serde(default)]
    pub runtimes: Vec<String>,
}

/// Find the episode count in a metadata badge.
///
/// Looks for the first whitespace token containing
/// [`EPISODE_COUNT_MARKER`]. Digits glued in front of the marker (`12eps`)
/// win; otherwise the count comes from the preceding token, with a leading
/// year range (`1989–2025790`) peeled off when the badge text was
/// concatenated without spaces.
pub fn parse_episode_count(metadata: &str) -> Option<u32> {
    let tokens: Vec<&str> = metadata.split_whitespace().collect();
    let pos = tokens
        .iter()
        .position(|t| t.contains(EPISODE_COUNT_MARKER))?;

    let token = tokens[pos];
    let marker_at = token.find(EPISODE_COUNT_MARKER)?;
    let glued = digits(&token[..marker_at]);
    if !glued.is_empty() {
        return glued.parse().ok();
    }

    let prev = tokens.get(pos.checked_sub(1)?)?;
    trailing_count(prev)
}

fn digits(s: &str) -> String {
    s.chars().filter(|c| c.is_ascii_digit()).collect()
}

fn trailing_count(token: &str) -> Option<u32> {
    match token.rfind(['–', '-']) {
        Some(idx) => {
            let dash_len = token[idx..].chars().next().map_or(1, char::len_utf8);
            let after = digits(&token[idx + dash_len..]);
            // A bare four-digit tail is the end year of the range, not a count.
            if after.len() > 4 {
                after[4..].parse().ok()
            } else if !after.is_empty() && after.len() < 4 {
                after.parse().ok()
            } else {
                None
            }
        }
        None => {
            let d = digits(token);
            if d.is_empty() {
                None
            } else {
                d.parse().ok()
            }
        }
    }
}

/// Split a composite `S<season>.E<episode> ∙ <name>` title.
///
/// Anything that does not follow the pattern yields the unnumbered
/// sentinel rather than a guess.
pub fn parse_season_episode(text: &str) -> SeasonEpisode {
    let Some((marker, name)) = text.split_once(TITLE_SEPARATORS) else {
        return SeasonEpisode::unnumbered(text);
    };

    let Some((s, e)) = marker.trim().split_once('.') else {
        return SeasonEpisode::unnumbered(text);
    };

    let season = s
        .trim()
        .strip_prefix(['S', 's'])
        .and_then(|n| n.trim().parse::<u32>().ok());
    let episode = e
        .trim()
        .strip_prefix(['E', 'e'])
        .and_then(|n| n.trim().parse::<u32>().ok());

    match (season, episode) {
        (Some(season), Some(episode)) => SeasonEpisode {
            season,
            episode,
            title: name.trim().to_string(),
        },
        _ => SeasonEpisode::unnumbered(text),
    }
}

/// Parse a listing date such as `Tue, Sep 28, 1999`.
pub fn parse_air_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), AIR_DATE_FORMAT).ok()
}

/// Parse a vote count such as `(1.2K)`, `(345)` or `1,234`.
///
/// Parentheses, whitespace and thousands separators are stripped and a
/// `K` suffix multiplies by 1000. A decimal value of at most 100 without a
/// suffix is taken to already be in thousands (`2.5` → 2500); whole
/// numbers are always literal.
pub fn parse_votes(text: &str) -> Option<u64> {
    let cleaned: String = text
        .chars()
        .filter(|c| !matches!(c, '(' | ')' | ',') && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let (number, multiplier) = match cleaned.strip_suffix(['K', 'k']) {
        Some(n) => (n, 1000.0),
        None => (cleaned.as_str(), 1.0),
    };

    let mut value: f64 = number.parse().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }

    if multiplier == 1.0 && number.contains('.') && value <= VOTES_THOUSANDS_CEILING {
        value *= 1000.0;
    }

    Some((value * multiplier).round() as u64)
}

/// Parse a rating; values outside `[0, 10]` are rejected.
pub fn parse_rating(text: &str) -> Option<f64> {
    let value: f64 = text.trim().parse().ok()?;
    if value.is_finite() && (0.0..=10.0).contains(&value) {
        Some(value)
    } else {
        None
    }
}

/// Parse the leading minutes out of a runtime string (`"22"`, `"22 min"`).
pub fn parse_runtime(text: &str) -> Option<u32> {
    let lead: String = text
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    lead.parse().ok()
}

/// Turn one raw episode-list item into an [`Episode`] of `show`.
///
/// Skips the item when the show is blank, the title carries no usable
/// season/episode marker, or the remaining episode name is empty. Optional
/// fields that fail to parse are stored as null. When the page has no
/// dedicated air-date element, the metadata badge is tried as a date.
pub fn normalize_episode(show: &str, raw: &RawItem) -> Outcome<Episode> {
    if show.trim().is_empty() {
        return Outcome::Skip(SkipReason::MissingShow);
    }

    let se = parse_season_episode(&raw.title);
    if !se.is_numbered() {
        return Outcome::Skip(SkipReason::UnnumberedEpisode);
    }

    let air_date = raw
        .air_date
        .as_deref()
        .and_then(parse_air_date)
        .or_else(|| parse_air_date(&raw.metadata));

    Episode::new(show, se.season, se.episode, se.title)
        .map(|ep| {
            ep.with_air_date(air_date)
                .with_rating(raw.rating.as_deref().and_then(parse_rating))
                .with_votes(raw.votes.as_deref().and_then(parse_votes))
                .with_plot(raw.plot.clone())
        })
        .into()
}

/// Merge a raw list item with its provider metadata into a [`Series`].
///
/// The provider's title wins; the list title is the fallback. The episode
/// count always comes from the list badge.
pub fn normalize_series(raw: &RawItem, meta: &ShowMetadata, cast_limit: usize) -> Outcome<Series> {
    let title = meta
        .title
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .unwrap_or(&raw.title);

    Series::new(title)
        .map(|mut s| {
            s.year = meta.year;
            s.genres = meta.genres.clone();
            s.directors = meta.directors.clone();
            s.cast = meta.cast.clone();
            s.rating = meta
                .rating
                .filter(|r| r.is_finite() && (0.0..=10.0).contains(r));
            s.plot = meta
                .plot
                .as_deref()
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string);
            s.runtime = meta.runtimes.first().and_then(|r| parse_runtime(r));
            s.num_episodes = parse_episode_count(&raw.metadata);
            s.cap_cast(cast_limit)
        })
        .into()
}
