//! # Episode Browser Core
//!
//! Runtime-free logic for Episode Browser: data models, metadata
//! normalization, the store abstraction, the query state machine, TF-IDF
//! ranking and the search algorithm.
//!
//! This crate has no tokio, sqlx, HTTP or filesystem dependencies. The app
//! crate supplies the crawler, the SQLite store and the frontends.
//!
//! | Module | Role |
//! |--------|------|
//! | [`models`] | Raw items, episodes, series, filters |
//! | [`error`] | Skip reasons and session errors |
//! | [`normalize`] | Free-text metadata parsing |
//! | [`query`] | Query state and transitions |
//! | [`rank`] | TF-IDF relevance and suggestions |
//! | [`search`] | Query execution over a [`store::Store`] |
//! | [`store`] | Storage trait and in-memory backend |

pub mod error;
pub mod models;
pub mod normalize;
pub mod query;
pub mod rank;
pub mod search;
pub mod store;
