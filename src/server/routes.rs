//! Route definitions for the web server.

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;

use super::handlers;
use super::AppState;

/// Create the router with all API routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/ready", get(handlers::ready))
        .route("/api/reviews", get(handlers::recent_reviews))
        .route("/api/reviews_by_app", get(handlers::reviews_by_app))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
