//! Sync progress on stderr.
//!
//! A crawl can spend minutes scrolling and the series flow pauses between
//! metadata lookups, so `epb sync` reports each phase as it goes. Output
//! goes to stderr; stdout carries only the final summary.

use std::fmt;
use std::io::Write;

use serde::Serialize;

/// Stage of a sync session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    /// Loading the page and scrolling until it stops growing.
    Crawling,
    /// Resolving identifiers through the metadata provider.
    LookingUp,
    /// Writing records.
    Storing,
}

/// One progress update. `total` is unknown while crawling.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SyncProgressEvent {
    pub target: String,
    pub phase: SyncPhase,
    pub done: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

impl SyncProgressEvent {
    pub fn crawling(target: &str) -> Self {
        Self {
            target: target.to_string(),
            phase: SyncPhase::Crawling,
            done: 0,
            total: None,
        }
    }

    pub fn looking_up(target: &str, done: u64, total: u64) -> Self {
        Self {
            target: target.to_string(),
            phase: SyncPhase::LookingUp,
            done,
            total: Some(total),
        }
    }

    pub fn storing(target: &str, done: u64, total: u64) -> Self {
        Self {
            target: target.to_string(),
            phase: SyncPhase::Storing,
            done,
            total: Some(total),
        }
    }
}

impl fmt::Display for SyncProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.total.map(format_number).unwrap_or_default();
        match self.phase {
            SyncPhase::Crawling => write!(f, "sync {}  loading page...", self.target),
            SyncPhase::LookingUp => write!(
                f,
                "sync {}  looking up  {} / {}",
                self.target,
                format_number(self.done),
                total
            ),
            SyncPhase::Storing => write!(
                f,
                "sync {}  stored  {} / {} records",
                self.target,
                format_number(self.done),
                total
            ),
        }
    }
}

/// Receives progress updates from the ingest flows.
pub trait SyncProgressReporter: Send + Sync {
    fn report(&self, event: SyncProgressEvent);
}

/// One readable line per event.
pub struct HumanProgress;

impl SyncProgressReporter for HumanProgress {
    fn report(&self, event: SyncProgressEvent) {
        let mut err = std::io::stderr().lock();
        let _ = writeln!(err, "{}", event);
    }
}

/// One JSON object per event, e.g.
/// `{"target":"series","phase":"looking_up","done":3,"total":250}`.
pub struct JsonLinesProgress;

impl SyncProgressReporter for JsonLinesProgress {
    fn report(&self, event: SyncProgressEvent) {
        match serde_json::to_string(&event) {
            Ok(line) => {
                let mut err = std::io::stderr().lock();
                let _ = writeln!(err, "{}", line);
            }
            Err(e) => tracing::debug!("progress event not serializable: {}", e),
        }
    }
}

/// Discards every event.
pub struct NoProgress;

impl SyncProgressReporter for NoProgress {
    fn report(&self, _event: SyncProgressEvent) {}
}

/// Group digits in threes: `1234567` → `1,234,567`.
pub(crate) fn format_number(n: u64) -> String {
    let digits = n.to_string();
    let head = digits.len() % 3;
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i != 0 && (i + 3 - head) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// `--progress` values.
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Human output on an interactive terminal, nothing otherwise.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Box<dyn SyncProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(HumanProgress),
            ProgressMode::Json => Box::new(JsonLinesProgress),
        }
    }
}
