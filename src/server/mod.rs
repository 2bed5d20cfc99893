//! HTTP API for browsing harvested reviews.
//!
//! Serves the recent-review window from the store and can trigger an
//! ad-hoc harvest for a single app.

mod handlers;
mod routes;

pub use handlers::ApiError;
pub use routes::create_router;

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use crate::config::Settings;
use crate::repository::ReviewRepository;
use crate::scrapers::{AppStoreClient, HttpClient};
use crate::services::ReviewHarvester;

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub reviews: ReviewRepository,
    pub harvester: ReviewHarvester,
}

impl AppState {
    pub fn new(settings: &Settings) -> anyhow::Result<Self> {
        let reviews = ReviewRepository::open(&settings.reviews_csv, settings.recency_cutoff())
            .with_context(|| format!("failed to open {}", settings.reviews_csv.display()))?;
        let http = HttpClient::new(settings.request_timeout(), settings.user_agent.as_deref())?;
        let client = AppStoreClient::new(http, settings.reviews_url_template.clone());
        let harvester = ReviewHarvester::new(Arc::new(client), reviews.clone());

        Ok(Self::from_parts(reviews, harvester))
    }

    pub fn from_parts(reviews: ReviewRepository, harvester: ReviewHarvester) -> Self {
        Self { reviews, harvester }
    }
}

/// Start the web server and run until Ctrl-C.
pub async fn serve(settings: &Settings) -> anyhow::Result<()> {
    let state = AppState::new(settings)?;
    let app = create_router(state);

    let addr = settings.bind_addr()?;
    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to install Ctrl-C handler");
    }
    info!("Shutdown signal received");
}
