//! Remote review sources.

pub mod appstore;
pub mod http_client;

pub use appstore::{AppStoreClient, RetryConfig};
pub use http_client::HttpClient;

use async_trait::async_trait;
use chrono::Duration;

use crate::models::Review;

/// Errors returned by a review source.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error(
        "failed to fetch reviews for app {app_id} (page {page}) after {attempts} attempts: {last_error}"
    )]
    RetriesExhausted {
        app_id: String,
        page: u32,
        attempts: u32,
        last_error: String,
    },

    #[error("feed for app {app_id} did not end within {max_pages} pages")]
    PageLimit { app_id: String, max_pages: u32 },
}

/// A paginated source of reviews for tracked apps.
#[async_trait]
pub trait ReviewSource: Send + Sync {
    /// Fetch every review for `app_id` newer than `since`, newest first.
    ///
    /// Either the full set is returned or an error; partial results from
    /// earlier pages are never surfaced.
    async fn fetch_recent_reviews(
        &self,
        app_id: &str,
        since: Duration,
    ) -> Result<Vec<Review>, FetchError>;
}
