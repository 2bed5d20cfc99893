//! Harvested-review table.

use std::path::Path;
use std::sync::Arc;

use chrono::{Duration, Utc};
use csv::StringRecord;
use tracing::{debug, info};

use super::table::CsvTable;
use super::{format_datetime, parse_datetime, StoreResult};
use crate::models::Review;
use crate::schema::reviews;

/// Parse one stored row. Returns `None` for malformed rows.
fn parse_row(row: &StringRecord) -> Option<Review> {
    if row.len() < reviews::HEADER.len() {
        return None;
    }

    Some(Review {
        id: row.get(reviews::ID)?.to_string(),
        app_id: row.get(reviews::APP_ID)?.to_string(),
        author: row.get(reviews::AUTHOR)?.to_string(),
        title: row.get(reviews::TITLE)?.to_string(),
        content: row.get(reviews::CONTENT)?.to_string(),
        rating: row.get(reviews::RATING)?.trim().parse().ok()?,
        created_at: parse_datetime(row.get(reviews::CREATED_AT)?)?,
    })
}

fn to_row(review: &Review) -> Vec<String> {
    vec![
        review.id.clone(),
        review.app_id.clone(),
        review.author.clone(),
        review.title.clone(),
        review.content.clone(),
        review.rating.to_string(),
        format_datetime(&review.created_at),
    ]
}

/// Repository over the reviews table.
///
/// The recency cutoff given at open time is the window used to deduplicate
/// inserts: a review is a duplicate if a review with the same ID for the same
/// app is still within the window.
#[derive(Debug, Clone)]
pub struct ReviewRepository {
    table: Arc<CsvTable>,
    recency_cutoff: Duration,
}

impl ReviewRepository {
    /// Open the reviews table, creating an empty one if missing.
    pub fn open(path: &Path, recency_cutoff: Duration) -> StoreResult<Self> {
        Ok(Self {
            table: Arc::new(CsvTable::open(path, reviews::HEADER)?),
            recency_cutoff,
        })
    }

    /// The configured recency cutoff.
    pub fn recency_cutoff(&self) -> Duration {
        self.recency_cutoff
    }

    /// All well-formed reviews, in file order.
    pub async fn all(&self) -> StoreResult<Vec<Review>> {
        let rows = self.table.read_rows().await?;
        Ok(rows.iter().filter_map(parse_row).collect())
    }

    /// Reviews for an app created within `cutoff` of now, newest first.
    pub async fn get_recent(&self, app_id: &str, cutoff: Duration) -> StoreResult<Vec<Review>> {
        let now = Utc::now();
        let rows = self.table.read_rows().await?;

        let mut recent: Vec<Review> = rows
            .iter()
            .filter(|row| row.get(reviews::APP_ID) == Some(app_id))
            .filter_map(parse_row)
            .filter(|review| review.is_recent(now, cutoff))
            .collect();

        recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(recent)
    }

    /// Recent reviews for an app using the configured cutoff.
    pub async fn recent(&self, app_id: &str) -> StoreResult<Vec<Review>> {
        self.get_recent(app_id, self.recency_cutoff).await
    }

    /// Append a review unless it is already present in the app's recent set.
    ///
    /// Returns `true` if a row was written.
    pub async fn insert(&self, review: &Review) -> StoreResult<bool> {
        let _guard = self.table.write_lock().await;

        let existing = self.get_recent(&review.app_id, self.recency_cutoff).await?;
        if existing.iter().any(|r| r.id == review.id) {
            debug!(
                app_id = %review.app_id,
                review_id = %review.id,
                "Review already stored"
            );
            return Ok(false);
        }

        self.table.append_row(to_row(review)).await?;
        Ok(true)
    }

    /// Drop every review older than `cutoff`, across all apps.
    ///
    /// Malformed rows are dropped too. Returns the number of rows removed.
    pub async fn compact(&self, cutoff: Duration) -> StoreResult<usize> {
        let _guard = self.table.write_lock().await;

        let now = Utc::now();
        let rows = self.table.read_rows().await?;
        let total = rows.len();

        let kept: Vec<Vec<String>> = rows
            .iter()
            .filter(|row| {
                row.len() >= reviews::HEADER.len()
                    && row
                        .get(reviews::CREATED_AT)
                        .and_then(parse_datetime)
                        .is_some_and(|created_at| created_at >= now - cutoff)
            })
            .map(|row| row.iter().map(str::to_string).collect())
            .collect();

        let removed = total - kept.len();
        self.table.rewrite(kept).await?;

        info!(removed, remaining = total - removed, "Compacted reviews table");
        Ok(removed)
    }
}
