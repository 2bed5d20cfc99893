//! Periodic eviction of expired reviews.

use std::time::Duration;

use chrono::Duration as ChronoDuration;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use super::Shutdown;
use crate::repository::{ReviewRepository, StoreResult};

/// Compacts the reviews table on a fixed cadence.
#[derive(Clone)]
pub struct CleanupScheduler {
    reviews: ReviewRepository,
    every: Duration,
    shutdown: Shutdown,
}

impl CleanupScheduler {
    pub fn new(reviews: ReviewRepository, every: Duration, shutdown: Shutdown) -> Self {
        Self {
            reviews,
            every: every.max(Duration::from_secs(1)),
            shutdown,
        }
    }

    /// Drop reviews older than the store's recency cutoff.
    pub async fn run_once(&self) -> StoreResult<usize> {
        let cutoff: ChronoDuration = self.reviews.recency_cutoff();
        self.reviews.compact(cutoff).await
    }

    /// Spawn the cleanup loop. The first pass runs immediately.
    pub fn start(&self) {
        info!(every_secs = self.every.as_secs(), "Starting cleanup scheduler");
        let scheduler = self.clone();
        self.shutdown.spawn(async move { scheduler.run().await });
    }

    async fn run(&self) {
        let mut ticker = tokio::time::interval(self.every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.run_once().await {
                        error!("Error cleaning up old reviews: {}", e);
                    }
                }
            }
        }

        info!("Cleanup scheduler stopped");
    }

    /// Stop the loop and wait for it to exit.
    pub async fn stop(&self) {
        self.shutdown.stop().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::review;
    use chrono::Utc;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_first_tick_compacts_immediately() {
        let dir = tempdir().unwrap();
        let reviews =
            ReviewRepository::open(&dir.path().join("reviews.csv"), ChronoDuration::hours(48))
                .unwrap();
        let now = Utc::now();
        reviews.insert(&review("1", "fresh", now)).await.unwrap();
        reviews
            .insert(&review("1", "stale", now - ChronoDuration::hours(72)))
            .await
            .unwrap();

        let scheduler =
            CleanupScheduler::new(reviews.clone(), Duration::from_secs(3600), Shutdown::new());
        scheduler.start();

        let mut remaining = reviews.all().await.unwrap().len();
        for _ in 0..100 {
            if remaining == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
            remaining = reviews.all().await.unwrap().len();
        }
        assert_eq!(remaining, 1);

        tokio::time::timeout(Duration::from_secs(5), scheduler.stop())
            .await
            .expect("stop should interrupt the wait");
    }

    #[tokio::test]
    async fn test_errors_do_not_end_the_loop() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("reviews.csv");
        let reviews = ReviewRepository::open(&path, ChronoDuration::hours(48)).unwrap();
        std::fs::remove_file(&path).unwrap();

        let shutdown = Shutdown::new();
        let scheduler = CleanupScheduler::new(reviews, Duration::from_secs(1), shutdown.clone());
        assert!(scheduler.run_once().await.is_err());

        scheduler.start();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(shutdown.running(), 1);

        scheduler.stop().await;
        assert_eq!(shutdown.running(), 0);
    }
}
