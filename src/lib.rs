//! # Episode Browser
//!
//! Crawl TV episode listings, normalize them into typed records, keep them
//! in SQLite, and search them with filters, pagination and TF-IDF ranking.
//!
//! ## Data flow
//!
//! ```text
//! listing page ── crawler (scroll until stable, CSS extraction)
//!                    │ RawItem
//!                    ├── provider lookup (series only, paced)
//!                    ▼
//!               normalizer ── skip + log malformed items
//!                    │ Episode / Series
//!                    ▼
//!               SqliteStore (upsert on natural key)
//!                    │
//!          search / rank / suggest
//!              │             │
//!          epb CLI       JSON over HTTP
//! ```
//!
//! Pure logic (models, normalizer, query state machine, ranker, store
//! trait) lives in the `episode-browser-core` crate; this crate adds I/O.
//!
//! ## Example session
//!
//! ```bash
//! epb init
//! epb sync episodes --show "The Simpsons" https://www.imdb.com/title/tt0096697/episodes/
//! epb search "bear" --show "The Simpsons"
//! epb get "The Simpsons" 3 14
//! epb serve
//! ```
//!
//! ## Layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | `epb.toml` loading and validation |
//! | [`crawler`] | Scroll-until-stable loop and item extraction |
//! | [`snapshot`] | HTTP / file page source |
//! | [`provider`] | External show-metadata lookups |
//! | [`ingest`] | Sync sessions |
//! | [`sqlite_store`] | SQLite `Store` backend |
//! | [`search`] | `epb search` |
//! | [`get`] | `epb get`, `epb similar`, `epb series` |
//! | [`stats`] | `epb stats` |
//! | [`server`] | JSON HTTP interface |
//! | [`db`] | SQLite pool setup |
//! | [`migrate`] | Episode and series tables |
//! | [`progress`] | Sync progress on stderr |

pub mod config;
pub mod crawler;
pub mod db;
pub mod get;
pub mod ingest;
pub mod migrate;
pub mod progress;
pub mod provider;
pub mod search;
pub mod server;
pub mod snapshot;
pub mod sqlite_store;
pub mod stats;
