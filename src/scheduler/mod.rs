//! Background schedulers.
//!
//! Every scheduler loop is spawned through a shared [`Shutdown`] handle: one
//! cancellation token fanned out to all loops, and one task tracker that
//! counts them so a stop can wait for every loop to exit.

pub mod cleanup;
pub mod polling;

pub use cleanup::CleanupScheduler;
pub use polling::{CycleReport, PollingScheduler};

use std::future::Future;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Shared stop signal plus completion tracking for scheduler loops.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    token: CancellationToken,
    tracker: TaskTracker,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a tracked loop.
    pub fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tracker.spawn(future);
    }

    /// Resolves once a stop has been requested.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Number of loops still running.
    pub fn running(&self) -> usize {
        self.tracker.len()
    }

    /// Signal every loop to stop and wait until all of them have exited.
    pub async fn stop(&self) {
        self.token.cancel();
        self.tracker.close();
        self.tracker.wait().await;
    }
}
