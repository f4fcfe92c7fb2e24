//! SQLite-backed [`Store`] implementation.
//!
//! Upserts use `INSERT ... ON CONFLICT DO UPDATE` on the natural keys, so
//! re-ingesting an unchanged source leaves the row count untouched. A batch
//! of episodes is written inside one transaction; a listing reads its page
//! and its total count inside one transaction, so readers never see half a
//! batch.
//!
//! SQLite's `lower()` only folds ASCII, so each row also carries its title
//! and plot lowercased in Rust; the free-text filter matches against those.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Row, Sqlite, SqlitePool};

use episode_browser_core::models::{Episode, EpisodeFilter, EpisodeKey, EpisodeOrder, Series};
use episode_browser_core::store::{EpisodeSlice, Store};

type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

/// Dates are stored as ISO text so lexicographic order is date order.
const DATE_FORMAT: &str = "%Y-%m-%d";

const EPISODE_COLUMNS: &str =
    "show, season, episode, episode_title, air_date, rating, votes, plot";

const SERIES_COLUMNS: &str =
    r#"title, year, genres, directors, "cast", rating, plot, runtime, num_episodes"#;

const FILTER_CLAUSE: &str = r#"
    WHERE (? IS NULL OR instr(title_folded, ?) > 0 OR instr(plot_folded, ?) > 0)
      AND (? IS NULL OR show = ?)
      AND (? IS NULL OR air_date >= ?)
      AND (? IS NULL OR air_date <= ?)
      AND (? IS NULL OR rating >= ?)
      AND (? IS NULL OR season = ?)
"#;

/// SQLite implementation of the [`Store`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Filter values in the shape the SQL expects.
struct FilterBinds {
    text: Option<String>,
    show: Option<String>,
    from: Option<String>,
    to: Option<String>,
    min_rating: Option<f64>,
    season: Option<i64>,
}

impl FilterBinds {
    fn new(filter: &EpisodeFilter) -> Self {
        Self {
            text: filter.text.as_ref().map(|t| t.to_lowercase()),
            show: filter.show.clone(),
            from: filter.aired_from.map(|d| d.format(DATE_FORMAT).to_string()),
            to: filter.aired_to.map(|d| d.format(DATE_FORMAT).to_string()),
            min_rating: filter.min_rating,
            season: filter.season.map(i64::from),
        }
    }

    fn bind<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(self.text.as_deref())
            .bind(self.text.as_deref())
            .bind(self.text.as_deref())
            .bind(self.show.as_deref())
            .bind(self.show.as_deref())
            .bind(self.from.as_deref())
            .bind(self.from.as_deref())
            .bind(self.to.as_deref())
            .bind(self.to.as_deref())
            .bind(self.min_rating)
            .bind(self.min_rating)
            .bind(self.season)
            .bind(self.season)
    }
}

fn order_clause(order: EpisodeOrder) -> &'static str {
    match order {
        EpisodeOrder::Natural => "ORDER BY show, season, episode",
        EpisodeOrder::Aired => "ORDER BY air_date IS NULL, air_date, show, season, episode",
    }
}

fn episode_upsert(ep: &Episode) -> SqliteQuery<'_> {
    sqlx::query(
        r#"
        INSERT INTO episodes (show, season, episode, episode_title, air_date, rating, votes, plot,
                              title_folded, plot_folded)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(show, season, episode) DO UPDATE SET
            episode_title = excluded.episode_title,
            air_date = excluded.air_date,
            rating = excluded.rating,
            votes = excluded.votes,
            plot = excluded.plot,
            title_folded = excluded.title_folded,
            plot_folded = excluded.plot_folded
        "#,
    )
    .bind(&ep.show)
    .bind(i64::from(ep.season))
    .bind(i64::from(ep.episode))
    .bind(&ep.title)
    .bind(ep.air_date.map(|d| d.format(DATE_FORMAT).to_string()))
    .bind(ep.rating)
    .bind(ep.votes.and_then(stored_votes))
    .bind(&ep.plot)
    .bind(ep.title.to_lowercase())
    .bind(ep.plot.as_deref().unwrap_or_default().to_lowercase())
}

/// Vote counts beyond `i64::MAX` cannot be stored and are dropped.
fn stored_votes(votes: u64) -> Option<i64> {
    match i64::try_from(votes) {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("vote count {} out of range, not stored", votes);
            None
        }
    }
}

fn row_to_episode(row: &SqliteRow) -> Result<Episode> {
    let season: i64 = row.get("season");
    let episode: i64 = row.get("episode");
    let air_date: Option<String> = row.get("air_date");
    let votes: Option<i64> = row.get("votes");

    Ok(Episode {
        show: row.get("show"),
        season: u32::try_from(season).with_context(|| format!("bad season in row: {}", season))?,
        episode: u32::try_from(episode)
            .with_context(|| format!("bad episode in row: {}", episode))?,
        title: row.get("episode_title"),
        air_date: air_date.and_then(|d| NaiveDate::parse_from_str(&d, DATE_FORMAT).ok()),
        rating: row.get("rating"),
        votes: votes.and_then(|v| u64::try_from(v).ok()),
        plot: row.get("plot"),
    })
}

fn json_list(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_default()
}

fn row_to_series(row: &SqliteRow) -> Series {
    let genres: String = row.get("genres");
    let directors: String = row.get("directors");
    let cast: String = row.get("cast");
    let year: Option<i64> = row.get("year");
    let runtime: Option<i64> = row.get("runtime");
    let num_episodes: Option<i64> = row.get("num_episodes");

    Series {
        title: row.get("title"),
        year: year.and_then(|y| i32::try_from(y).ok()),
        genres: json_list(&genres),
        directors: json_list(&directors),
        cast: json_list(&cast),
        rating: row.get("rating"),
        plot: row.get("plot"),
        runtime: runtime.and_then(|r| u32::try_from(r).ok()),
        num_episodes: num_episodes.and_then(|n| u32::try_from(n).ok()),
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn upsert_episode(&self, episode: &Episode) -> Result<()> {
        episode_upsert(episode).execute(&self.pool).await?;
        Ok(())
    }

    async fn upsert_episodes(&self, episodes: &[Episode]) -> Result<usize> {
        let mut tx = self.pool.begin().await?;
        for ep in episodes {
            episode_upsert(ep)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Failed to upsert {}", ep.key()))?;
        }
        tx.commit().await?;
        Ok(episodes.len())
    }

    async fn upsert_series(&self, series: &Series) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO series (title, year, genres, directors, "cast", rating, plot, runtime, num_episodes)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(title) DO UPDATE SET
                year = excluded.year,
                genres = excluded.genres,
                directors = excluded.directors,
                "cast" = excluded."cast",
                rating = excluded.rating,
                plot = excluded.plot,
                runtime = excluded.runtime,
                num_episodes = excluded.num_episodes
            "#,
        )
        .bind(&series.title)
        .bind(series.year)
        .bind(serde_json::to_string(&series.genres)?)
        .bind(serde_json::to_string(&series.directors)?)
        .bind(serde_json::to_string(&series.cast)?)
        .bind(series.rating)
        .bind(&series.plot)
        .bind(series.runtime.map(i64::from))
        .bind(series.num_episodes.map(i64::from))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn query_episodes(
        &self,
        filter: &EpisodeFilter,
        order: EpisodeOrder,
        limit: Option<u64>,
        offset: u64,
    ) -> Result<EpisodeSlice> {
        let binds = FilterBinds::new(filter);
        let select_sql = format!(
            "SELECT {} FROM episodes {} {} LIMIT ? OFFSET ?",
            EPISODE_COLUMNS,
            FILTER_CLAUSE,
            order_clause(order)
        );
        let count_sql = format!("SELECT COUNT(*) FROM episodes {}", FILTER_CLAUSE);
        // SQLite reads a negative LIMIT as "no limit".
        let limit = limit.map(|l| l.min(i64::MAX as u64) as i64).unwrap_or(-1);
        let offset = offset.min(i64::MAX as u64) as i64;

        let mut tx = self.pool.begin().await?;
        let rows = binds
            .bind(sqlx::query(&select_sql))
            .bind(limit)
            .bind(offset)
            .fetch_all(&mut *tx)
            .await?;
        let total: i64 = binds
            .bind(sqlx::query(&count_sql))
            .fetch_one(&mut *tx)
            .await?
            .get(0);
        tx.commit().await?;

        let episodes = rows
            .iter()
            .map(row_to_episode)
            .collect::<Result<Vec<_>>>()?;
        Ok(EpisodeSlice {
            episodes,
            total: total.max(0) as u64,
        })
    }

    async fn get_episode(&self, key: &EpisodeKey) -> Result<Option<Episode>> {
        let sql = format!(
            "SELECT {} FROM episodes WHERE show = ? AND season = ? AND episode = ?",
            EPISODE_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(&key.show)
            .bind(i64::from(key.season))
            .bind(i64::from(key.episode))
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_episode).transpose()
    }

    async fn get_series(&self, title: &str) -> Result<Option<Series>> {
        let sql = format!("SELECT {} FROM series WHERE title = ?", SERIES_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(title)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(row_to_series))
    }

    async fn list_series(&self) -> Result<Vec<Series>> {
        let sql = format!("SELECT {} FROM series ORDER BY title", SERIES_COLUMNS);
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(row_to_series).collect())
    }

    async fn count_episodes(&self) -> Result<u64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM episodes")
            .fetch_one(&self.pool)
            .await?;
        Ok(n.max(0) as u64)
    }

    async fn count_series(&self) -> Result<u64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM series")
            .fetch_one(&self.pool)
            .await?;
        Ok(n.max(0) as u64)
    }
}
