//! Flat-file persistence for apps and reviews.
//!
//! Both tables are whole-file CSVs scanned in full on every operation.
//! Read-modify-write operations hold the owning table's write lock for the
//! full sequence; rewrites replace the file atomically.

pub mod apps;
pub mod reviews;
pub mod table;

pub use apps::AppRepository;
pub use reviews::ReviewRepository;
pub use table::CsvTable;

use chrono::{DateTime, SecondsFormat, Utc};

/// Errors surfaced by the record store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("blocking task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Format a timestamp the way it is stored on disk (RFC 3339, seconds, UTC).
pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse a stored timestamp. Any RFC 3339 offset is accepted.
pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
