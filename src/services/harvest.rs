//! Fetch reviews for one app and persist the new ones.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::models::Review;
use crate::repository::ReviewRepository;
use crate::scrapers::{FetchError, ReviewSource};

/// Outcome of a single harvest.
#[derive(Debug, Clone)]
pub struct HarvestResult {
    /// Everything the source returned, newest first.
    pub reviews: Vec<Review>,
    /// How many of them were new rows.
    pub inserted: usize,
}

/// Pulls reviews from a source and writes them through the review store.
#[derive(Clone)]
pub struct ReviewHarvester {
    source: Arc<dyn ReviewSource>,
    reviews: ReviewRepository,
}

impl ReviewHarvester {
    pub fn new(source: Arc<dyn ReviewSource>, reviews: ReviewRepository) -> Self {
        Self { source, reviews }
    }

    /// Fetch recent reviews for an app and insert each one.
    ///
    /// Individual insert failures are logged and skipped. A fetch failure is
    /// returned without touching the store.
    pub async fn harvest(&self, app_id: &str) -> Result<HarvestResult, FetchError> {
        let reviews = self
            .source
            .fetch_recent_reviews(app_id, self.reviews.recency_cutoff())
            .await?;

        let mut inserted = 0;
        for review in &reviews {
            match self.reviews.insert(review).await {
                Ok(true) => inserted += 1,
                Ok(false) => {}
                Err(e) => warn!(
                    app_id,
                    review_id = %review.id,
                    "Failed to store review: {}",
                    e
                ),
            }
        }

        debug!(app_id, fetched = reviews.len(), inserted, "Harvested reviews");
        Ok(HarvestResult { reviews, inserted })
    }
}
