//! Database statistics.
//!
//! `epb stats` prints totals, a per-show breakdown (episodes, seasons,
//! aired range, average rating) and the database file size.

use anyhow::Result;
use sqlx::Row;

use episode_browser_core::store::Store;

use crate::config::Config;
use crate::db;
use crate::progress::format_number;
use crate::sqlite_store::SqliteStore;

struct ShowStats {
    show: String,
    episodes: i64,
    seasons: i64,
    first_aired: Option<String>,
    last_aired: Option<String>,
    avg_rating: Option<f64>,
}

pub async fn run_stats(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());

    let total_episodes = store.count_episodes().await?;
    let total_series = store.count_series().await?;

    let rows = sqlx::query(
        r#"
        SELECT
            show,
            COUNT(*) AS episodes,
            COUNT(DISTINCT season) AS seasons,
            MIN(air_date) AS first_aired,
            MAX(air_date) AS last_aired,
            AVG(rating) AS avg_rating
        FROM episodes
        GROUP BY show
        ORDER BY episodes DESC, show ASC
        "#,
    )
    .fetch_all(&pool)
    .await?;
    pool.close().await;

    let shows: Vec<ShowStats> = rows
        .iter()
        .map(|row| ShowStats {
            show: row.get("show"),
            episodes: row.get("episodes"),
            seasons: row.get("seasons"),
            first_aired: row.get("first_aired"),
            last_aired: row.get("last_aired"),
            avg_rating: row.get("avg_rating"),
        })
        .collect();

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("Episode Browser — Database Stats");
    println!("================================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!();
    println!("  Episodes:    {}", format_number(total_episodes));
    println!("  Series:      {}", format_number(total_series));
    println!("  Shows:       {}", shows.len());

    if !shows.is_empty() {
        println!();
        println!("  By show:");
        println!(
            "  {:<28} {:>8} {:>7}   {:<23} {:>6}",
            "SHOW", "EPISODES", "SEASONS", "AIRED", "RATING"
        );
        println!("  {}", "-".repeat(78));
        for s in &shows {
            let aired = match (&s.first_aired, &s.last_aired) {
                (Some(a), Some(b)) => format!("{} – {}", a, b),
                _ => "-".to_string(),
            };
            let rating = s
                .avg_rating
                .map(|r| format!("{:.1}", r))
                .unwrap_or_else(|| "-".to_string());
            println!(
                "  {:<28} {:>8} {:>7}   {:<23} {:>6}",
                s.show, s.episodes, s.seasons, aired, rating
            );
        }
    }

    println!();
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
