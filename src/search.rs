//! `epb search`: filtered, paginated, optionally ranked episode listing.
//!
//! Input flags become a [`FilterInput`], which degrades malformed values to
//! "no filter". The query runs through the core search algorithm against
//! the SQLite store.

use anyhow::Result;

use episode_browser_core::models::EpisodeOrder;
use episode_browser_core::query::{FilterInput, Query};
use episode_browser_core::search::{search, EpisodeHit, ResultPage};

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteStore;

/// Search flags as given on the command line.
#[derive(Debug, Clone, Default)]
pub struct SearchArgs {
    pub text: Option<String>,
    pub show: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub min_rating: Option<f64>,
    pub season: Option<i64>,
    pub page: u32,
    pub page_size: Option<u32>,
    pub no_rank: bool,
    pub by_air_date: bool,
}

impl SearchArgs {
    pub fn to_query(&self, config: &Config) -> Query {
        let input = FilterInput {
            text: self.text.clone(),
            show: self.show.clone(),
            aired_from: self.from.clone(),
            aired_to: self.to.clone(),
            min_rating: self.min_rating,
            season: self.season,
        };
        let mut query = Query::new(self.page_size.unwrap_or(config.retrieval.page_size))
            .with_filter(input.to_filter())
            .with_page(self.page);
        query.rank = config.retrieval.rank_free_text && !self.no_rank;
        if self.by_air_date {
            query.order = EpisodeOrder::Aired;
        }
        query
    }
}

/// Run one query against the configured database.
pub async fn search_episodes(config: &Config, query: &Query) -> Result<ResultPage> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());
    let page = search(&store, query).await;
    pool.close().await;
    page
}

/// Vote count for display: thousands as `"<n>K"`, smaller counts verbatim.
pub fn format_votes(votes: u64) -> String {
    if votes >= 1000 {
        format!("{}K", votes / 1000)
    } else {
        votes.to_string()
    }
}

pub(crate) fn print_hit(n: u64, hit: &EpisodeHit) {
    let ep = &hit.episode;
    match hit.score {
        Some(score) => println!(
            "{}. [{:.2}] {} S{}.E{} {}",
            n, score, ep.show, ep.season, ep.episode, ep.title
        ),
        None => println!(
            "{}. {} S{}.E{} {}",
            n, ep.show, ep.season, ep.episode, ep.title
        ),
    }
    if let Some(date) = ep.air_date {
        println!("    aired: {}", date.format("%Y-%m-%d"));
    }
    match (ep.rating, ep.votes) {
        (Some(r), Some(v)) => println!("    rating: {:.1} ({} votes)", r, format_votes(v)),
        (Some(r), None) => println!("    rating: {:.1}", r),
        _ => {}
    }
    if let Some(ref plot) = ep.plot {
        println!("    plot: {}", plot);
    }
    println!();
}

pub async fn run_search(config: &Config, args: &SearchArgs) -> Result<()> {
    let query = args.to_query(config);
    let page = search_episodes(config, &query).await?;

    if page.hits.is_empty() {
        if page.total > 0 {
            println!(
                "No results on page {} ({} results over {} pages).",
                page.page, page.total, page.total_pages
            );
        } else {
            println!("No results.");
        }
        return Ok(());
    }

    let first = query.offset() + 1;
    for (i, hit) in page.hits.iter().enumerate() {
        print_hit(first + i as u64, hit);
    }

    println!(
        "page {} of {} ({} results)",
        page.page, page.total_pages, page.total
    );
    if page.has_next {
        println!("next: --page {}", page.page + 1);
    }
    Ok(())
}
