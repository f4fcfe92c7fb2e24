use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    migrate_pool(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create every table and index on an open pool. Safe to run repeatedly.
pub async fn migrate_pool(pool: &SqlitePool) -> Result<()> {
    // Create episodes table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS episodes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            show TEXT NOT NULL,
            season INTEGER NOT NULL CHECK (season > 0),
            episode INTEGER NOT NULL CHECK (episode > 0),
            episode_title TEXT NOT NULL,
            air_date TEXT,
            rating REAL,
            votes INTEGER,
            plot TEXT,
            title_folded TEXT NOT NULL DEFAULT '',
            plot_folded TEXT NOT NULL DEFAULT '',
            UNIQUE(show, season, episode)
        )
        "#,
    )
    .execute(pool)
    .await?;

    add_folded_columns(pool).await?;

    // Create series table; list columns hold JSON arrays
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS series (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL UNIQUE,
            year INTEGER,
            genres TEXT NOT NULL DEFAULT '[]',
            directors TEXT NOT NULL DEFAULT '[]',
            "cast" TEXT NOT NULL DEFAULT '[]',
            rating REAL,
            plot TEXT,
            runtime INTEGER,
            num_episodes INTEGER
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_episodes_show ON episodes(show)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_episodes_air_date ON episodes(air_date)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_episodes_rating ON episodes(rating)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Databases created before the folded search columns existed get them
/// added and filled here.
async fn add_folded_columns(pool: &SqlitePool) -> Result<()> {
    let present: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM pragma_table_info('episodes') WHERE name = 'title_folded'",
    )
    .fetch_one(pool)
    .await?;
    if present > 0 {
        return Ok(());
    }

    let mut tx = pool.begin().await?;
    sqlx::query("ALTER TABLE episodes ADD COLUMN title_folded TEXT NOT NULL DEFAULT ''")
        .execute(&mut *tx)
        .await?;
    sqlx::query("ALTER TABLE episodes ADD COLUMN plot_folded TEXT NOT NULL DEFAULT ''")
        .execute(&mut *tx)
        .await?;

    let rows: Vec<(i64, String, Option<String>)> =
        sqlx::query_as("SELECT id, episode_title, plot FROM episodes")
            .fetch_all(&mut *tx)
            .await?;
    for (id, title, plot) in rows {
        sqlx::query("UPDATE episodes SET title_folded = ?, plot_folded = ? WHERE id = ?")
            .bind(title.to_lowercase())
            .bind(plot.unwrap_or_default().to_lowercase())
            .bind(id)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;
    tracing::info!("added folded search columns to episodes");
    Ok(())
}
