//! Per-app polling loops.
//!
//! Each tracked app gets its own loop. A loop waits until
//! `last_fetched + poll_every_seconds`, runs one harvest cycle, and waits
//! again. Apps are read once at start; apps added later are not picked up
//! until the scheduler is restarted.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use super::Shutdown;
use crate::models::App;
use crate::repository::{AppRepository, StoreResult};
use crate::scrapers::FetchError;
use crate::services::ReviewHarvester;

/// Summary of one completed poll cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub fetched: usize,
    pub inserted: usize,
    /// Timestamp recorded as the app's `last_fetched`.
    pub fetched_at: DateTime<Utc>,
}

/// Runs one independent polling loop per tracked app.
#[derive(Clone)]
pub struct PollingScheduler {
    apps: AppRepository,
    harvester: ReviewHarvester,
    shutdown: Shutdown,
}

impl PollingScheduler {
    pub fn new(apps: AppRepository, harvester: ReviewHarvester, shutdown: Shutdown) -> Self {
        Self {
            apps,
            harvester,
            shutdown,
        }
    }

    /// Load all apps and spawn a loop for each. Returns the number of loops.
    pub async fn start(&self) -> StoreResult<usize> {
        info!("Starting polling scheduler");

        let apps = self.apps.list().await?;
        let count = apps.len();
        for app in apps {
            self.spawn_app(app);
        }

        info!(apps = count, "Polling scheduler started");
        Ok(count)
    }

    fn spawn_app(&self, app: App) {
        let scheduler = self.clone();
        self.shutdown.spawn(async move { scheduler.poll_app(app).await });
    }

    /// Fetch and persist reviews for one app, then record the fetch time.
    ///
    /// `last_fetched` is only advanced when the fetch succeeds, even if it
    /// returned nothing. Failing to write `last_fetched` is logged and does
    /// not fail the cycle.
    pub async fn run_cycle(&self, app_id: &str) -> Result<CycleReport, FetchError> {
        let result = self.harvester.harvest(app_id).await?;

        let fetched_at = Utc::now();
        if let Err(e) = self.apps.update_last_fetched(app_id, fetched_at).await {
            error!(app_id, "Failed to update last fetched time: {}", e);
        }

        Ok(CycleReport {
            fetched: result.reviews.len(),
            inserted: result.inserted,
            fetched_at,
        })
    }

    async fn poll_app(&self, app: App) {
        info!(
            app_id = %app.id,
            poll_every_seconds = app.poll_every_seconds,
            "Polling app"
        );

        // Scheduling baseline. Advances on every attempt so a failing app is
        // retried one interval later rather than immediately.
        let mut baseline = app.last_fetched;

        loop {
            if self.shutdown.is_cancelled() {
                break;
            }

            let next_poll = app.next_poll_after(baseline);
            let wait = (next_poll - Utc::now()).to_std().unwrap_or(Duration::ZERO);
            if !wait.is_zero() {
                tokio::select! {
                    biased;
                    _ = self.shutdown.cancelled() => break,
                    _ = tokio::time::sleep(wait) => {}
                }
            }

            match self.run_cycle(&app.id).await {
                Ok(report) => {
                    info!(
                        app_id = %app.id,
                        fetched = report.fetched,
                        inserted = report.inserted,
                        "Poll cycle complete"
                    );
                    baseline = report.fetched_at;
                }
                Err(e) => {
                    warn!(app_id = %app.id, "Error fetching reviews: {}", e);
                    baseline = Utc::now();
                }
            }
        }

        info!(app_id = %app.id, "Stopped polling app");
    }

    /// Stop every loop and wait for them to exit.
    ///
    /// Waiting loops return immediately; a cycle already in flight finishes
    /// first.
    pub async fn stop(&self) {
        self.shutdown.stop().await;
        info!("Polling scheduler stopped");
    }
}
