//! # Episode Browser CLI (`epb`)
//!
//! ## Usage
//!
//! ```bash
//! epb --config ./config/epb.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `epb init` | Create the SQLite database and run schema migrations |
//! | `epb sync episodes --show <name> <url>` | Crawl an episode list into the store |
//! | `epb sync series <url>` | Crawl a show list and resolve each show's metadata |
//! | `epb search [text]` | Filtered, paginated, ranked episode search |
//! | `epb get <show> <season> <episode>` | One episode plus similar episodes |
//! | `epb similar <show> <season> <episode>` | Similar episodes only |
//! | `epb series [title]` | Stored series |
//! | `epb stats` | Database statistics |
//! | `epb serve` | JSON HTTP interface |
//!
//! Diagnostics go to stderr through `tracing`; set `RUST_LOG=info` (or
//! `debug` to trace every scroll) for more detail.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use episode_browser::progress::ProgressMode;
use episode_browser::search::SearchArgs;
use episode_browser::{config, get, ingest, migrate, search, server, stats};
use episode_browser_core::models::EpisodeKey;

/// Episode Browser: crawl, store and search TV episode metadata.
#[derive(Parser)]
#[command(
    name = "epb",
    about = "Episode Browser — crawl, store and search TV episode metadata",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/epb.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the episodes and series tables.
    /// Running it again is harmless.
    Init,

    /// Crawl a listing page and store what it contains.
    Sync {
        #[command(subcommand)]
        target: SyncTarget,

        /// Crawl and normalize, but write nothing.
        #[arg(long, global = true)]
        dry_run: bool,

        /// Progress output on stderr. Defaults to `human` on a terminal.
        #[arg(long, global = true, value_enum)]
        progress: Option<ProgressMode>,
    },

    /// Search stored episodes.
    ///
    /// Without TEXT, results are in (show, season, episode) order. With
    /// TEXT, episodes whose title or plot contain it are ranked by TF-IDF
    /// relevance unless `--no-rank` is given.
    Search {
        /// Free-text term matched against title and plot.
        text: Option<String>,

        /// Only this show.
        #[arg(long)]
        show: Option<String>,

        /// Aired on or after this date (YYYY-MM-DD).
        #[arg(long)]
        from: Option<String>,

        /// Aired on or before this date (YYYY-MM-DD).
        #[arg(long)]
        to: Option<String>,

        /// Minimum rating.
        #[arg(long)]
        min_rating: Option<f64>,

        /// Only this season.
        #[arg(long, allow_negative_numbers = true)]
        season: Option<i64>,

        /// Page number, starting at 1.
        #[arg(long, default_value_t = 1)]
        page: u32,

        /// Results per page (defaults to `[retrieval].page_size`).
        #[arg(long)]
        page_size: Option<u32>,

        /// Keep natural order for free-text searches.
        #[arg(long)]
        no_rank: bool,

        /// Order unranked results by air date.
        #[arg(long)]
        by_air_date: bool,
    },

    /// Show one episode and its most similar episodes.
    Get {
        show: String,
        season: u32,
        episode: u32,
    },

    /// List episodes of the same show most similar to the given one.
    Similar {
        show: String,
        season: u32,
        episode: u32,

        /// Number of suggestions (defaults to `[retrieval].similar_limit`).
        #[arg(long)]
        limit: Option<usize>,
    },

    /// List stored series, or show one by title.
    Series { title: Option<String> },

    /// Show database statistics.
    Stats,

    /// Start the JSON HTTP server on `[server].bind`.
    Serve,
}

#[derive(Subcommand)]
enum SyncTarget {
    /// Crawl an episode list page for one show.
    Episodes {
        /// Show name the episodes are stored under.
        #[arg(long)]
        show: String,

        /// Episode list URL (http, https, file:// or a local path).
        url: String,
    },

    /// Crawl a show list page and resolve every show through the metadata provider.
    Series {
        /// Show list URL (http, https, file:// or a local path).
        url: String,

        /// Also write the resolved metadata to this JSON file.
        #[arg(long)]
        json: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Sync {
            target,
            dry_run,
            progress,
        } => {
            let progress = progress.unwrap_or_else(ProgressMode::default_for_tty);
            match target {
                SyncTarget::Episodes { show, url } => {
                    ingest::run_sync_episodes(&cfg, &show, &url, dry_run, progress).await?;
                }
                SyncTarget::Series { url, json } => {
                    ingest::run_sync_series(&cfg, &url, dry_run, json.as_deref(), progress)
                        .await?;
                }
            }
        }
        Commands::Search {
            text,
            show,
            from,
            to,
            min_rating,
            season,
            page,
            page_size,
            no_rank,
            by_air_date,
        } => {
            let args = SearchArgs {
                text,
                show,
                from,
                to,
                min_rating,
                season,
                page,
                page_size,
                no_rank,
                by_air_date,
            };
            search::run_search(&cfg, &args).await?;
        }
        Commands::Get {
            show,
            season,
            episode,
        } => {
            let key = EpisodeKey {
                show,
                season,
                episode,
            };
            get::run_get(&cfg, &key).await?;
        }
        Commands::Similar {
            show,
            season,
            episode,
            limit,
        } => {
            let key = EpisodeKey {
                show,
                season,
                episode,
            };
            get::run_similar(&cfg, &key, limit).await?;
        }
        Commands::Series { title } => {
            get::run_series(&cfg, title.as_deref()).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
