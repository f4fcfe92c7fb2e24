//! Record retrieval: one episode with suggestions, similar episodes, series.
//!
//! Used by `epb get`, `epb similar` and `epb series`. The HTTP server calls
//! the same core functions directly.

use anyhow::{bail, Result};

use episode_browser_core::models::{EpisodeKey, Series};
use episode_browser_core::search::{episode_detail, EpisodeDetail};
use episode_browser_core::store::Store;

use crate::config::Config;
use crate::db;
use crate::search::format_votes;
use crate::sqlite_store::SqliteStore;

/// Look up an episode and its similar episodes.
pub async fn get_episode(config: &Config, key: &EpisodeKey, limit: usize) -> Result<EpisodeDetail> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());
    let detail = episode_detail(&store, key, limit).await;
    pool.close().await;

    match detail? {
        Some(d) => Ok(d),
        None => bail!("episode not found: {}", key),
    }
}

pub async fn run_get(config: &Config, key: &EpisodeKey) -> Result<()> {
    let detail = get_episode(config, key, config.retrieval.similar_limit).await?;
    let ep = &detail.episode;

    println!("--- Episode ---");
    println!("show:     {}", ep.show);
    println!("season:   {}", ep.season);
    println!("episode:  {}", ep.episode);
    println!("title:    {}", ep.title);
    if let Some(date) = ep.air_date {
        println!("aired:    {}", date.format("%Y-%m-%d"));
    }
    if let Some(r) = ep.rating {
        println!("rating:   {:.1}", r);
    }
    if let Some(v) = ep.votes {
        println!("votes:    {}", format_votes(v));
    }
    println!();
    println!("--- Plot ---");
    println!("{}", ep.plot.as_deref().unwrap_or("(no plot)"));
    println!();

    println!("--- Similar ({}) ---", detail.similar.len());
    for s in &detail.similar {
        println!(
            "[{:.2}] S{}.E{} {}",
            s.score, s.episode.season, s.episode.episode, s.episode.title
        );
    }

    Ok(())
}

pub async fn run_similar(config: &Config, key: &EpisodeKey, limit: Option<usize>) -> Result<()> {
    let limit = limit.unwrap_or(config.retrieval.similar_limit);
    let detail = get_episode(config, key, limit).await?;

    if detail.similar.is_empty() {
        println!("No similar episodes.");
        return Ok(());
    }
    for (i, s) in detail.similar.iter().enumerate() {
        println!(
            "{}. [{:.2}] {} S{}.E{} {}",
            i + 1,
            s.score,
            s.episode.show,
            s.episode.season,
            s.episode.episode,
            s.episode.title
        );
    }
    Ok(())
}

fn print_series(s: &Series) {
    match s.year {
        Some(y) => println!("{} ({})", s.title, y),
        None => println!("{}", s.title),
    }
    if !s.genres.is_empty() {
        println!("    genres: {}", s.genres.join(", "));
    }
    if !s.directors.is_empty() {
        println!("    directors: {}", s.directors.join(", "));
    }
    if !s.cast.is_empty() {
        println!("    cast: {}", s.cast.join(", "));
    }
    if let Some(r) = s.rating {
        println!("    rating: {:.1}", r);
    }
    if let Some(rt) = s.runtime {
        println!("    runtime: {} min", rt);
    }
    if let Some(n) = s.num_episodes {
        println!("    episodes: {}", n);
    }
    if let Some(ref plot) = s.plot {
        println!("    plot: {}", plot);
    }
}

/// Print one series by title, or every stored series.
pub async fn run_series(config: &Config, title: Option<&str>) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());

    let listed = match title {
        Some(t) => store.get_series(t).await.map(|s| s.into_iter().collect()),
        None => store.list_series().await,
    };
    pool.close().await;
    let listed: Vec<Series> = listed?;

    if listed.is_empty() {
        match title {
            Some(t) => bail!("series not found: {}", t),
            None => println!("No series."),
        }
        return Ok(());
    }
    for s in &listed {
        print_series(s);
        println!();
    }
    Ok(())
}
