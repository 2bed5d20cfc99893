//! Shared test helpers used by unit and integration tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Notify;

use crate::models::Review;
use crate::scrapers::{FetchError, ReviewSource};

/// Build a review with filler text fields.
pub fn review(app_id: &str, id: &str, created_at: DateTime<Utc>) -> Review {
    Review {
        id: id.to_string(),
        app_id: app_id.to_string(),
        author: format!("author of {id}"),
        title: format!("title of {id}"),
        content: format!("content of {id}"),
        rating: 4,
        created_at,
    }
}

/// A review source that always returns the same answer and counts calls.
#[derive(Debug, Default)]
pub struct StaticSource {
    reviews: Vec<Review>,
    fail: bool,
    calls: AtomicUsize,
    called: Notify,
}

impl StaticSource {
    /// Source that succeeds with the given reviews.
    pub fn with_reviews(reviews: Vec<Review>) -> Self {
        Self {
            reviews,
            ..Default::default()
        }
    }

    /// Source whose every fetch fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    /// Number of fetches made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Wait until at least `n` fetches have completed.
    pub async fn wait_for_calls(&self, n: usize) {
        while self.calls() < n {
            self.called.notified().await;
        }
    }
}

#[async_trait]
impl ReviewSource for StaticSource {
    async fn fetch_recent_reviews(
        &self,
        app_id: &str,
        since: Duration,
    ) -> Result<Vec<Review>, FetchError> {
        let result = if self.fail {
            Err(FetchError::RetriesExhausted {
                app_id: app_id.to_string(),
                page: 1,
                attempts: 3,
                last_error: "unexpected status 500 Internal Server Error".to_string(),
            })
        } else {
            let now = Utc::now();
            Ok(self
                .reviews
                .iter()
                .filter(|r| r.app_id == app_id && now - r.created_at <= since)
                .cloned()
                .collect())
        };

        self.calls.fetch_add(1, Ordering::SeqCst);
        self.called.notify_one();
        result
    }
}
