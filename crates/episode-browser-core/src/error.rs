//! Failure taxonomy for the ingestion pipeline.
//!
//! Per-item problems are values ([`Outcome::Skip`]) so a batch can keep
//! going; only [`IngestError`] values travel through `Result` and decide
//! whether a session continues or aborts.

use std::time::Duration;

/// Why a single item or record was dropped from a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum SkipReason {
    #[error("missing title")]
    MissingTitle,
    #[error("missing metadata block")]
    MissingMetadata,
    #[error("missing show name")]
    MissingShow,
    #[error("missing identifier")]
    MissingIdentifier,
    #[error("title has no season/episode marker")]
    UnnumberedEpisode,
}

/// Result of processing one item: either a value or a skip.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Ok(T),
    Skip(SkipReason),
}

impl<T> Outcome<T> {
    pub fn ok(self) -> Option<T> {
        match self {
            Outcome::Ok(v) => Some(v),
            Outcome::Skip(_) => None,
        }
    }
}

impl<T> From<Result<T, SkipReason>> for Outcome<T> {
    fn from(r: Result<T, SkipReason>) -> Self {
        match r {
            Ok(v) => Outcome::Ok(v),
            Err(reason) => Outcome::Skip(reason),
        }
    }
}

/// Session-level failures.
///
/// `StabilityTimeout` and `Lookup` are reported and absorbed by the caller;
/// `Storage` aborts the ingestion session.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("page did not stabilize within {elapsed:?} ({iterations} scrolls); using partial content")]
    StabilityTimeout { elapsed: Duration, iterations: u32 },

    #[error("metadata lookup failed for {id}: {message}")]
    Lookup { id: String, message: String },

    #[error("storage failure: {0:#}")]
    Storage(#[source] anyhow::Error),
}

impl IngestError {
    /// Whether the session must stop.
    pub fn is_fatal(&self) -> bool {
        matches!(self, IngestError::Storage(_))
    }
}
