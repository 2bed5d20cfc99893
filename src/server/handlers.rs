//! Request handlers.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use tracing::{error, warn};

use super::AppState;
use crate::models::Review;
use crate::repository::StoreError;

/// Errors returned to API callers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("missing app_id")]
    MissingAppId,

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::MissingAppId => (StatusCode::BAD_REQUEST, "Missing app_id").into_response(),
            ApiError::Store(e) => {
                // Store details stay in the log.
                error!(error = %e, "Failed to read reviews");
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error").into_response()
            }
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AppQuery {
    app_id: Option<String>,
}

impl AppQuery {
    fn app_id(&self) -> Result<&str, ApiError> {
        match self.app_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => Ok(id),
            _ => Err(ApiError::MissingAppId),
        }
    }
}

pub async fn ready() -> &'static str {
    "API is ready"
}

/// Recent reviews for an app, newest first.
pub async fn recent_reviews(
    State(state): State<AppState>,
    Query(query): Query<AppQuery>,
) -> Result<Json<Vec<Review>>, ApiError> {
    let app_id = query.app_id()?;
    let reviews = state.reviews.recent(app_id).await?;
    Ok(Json(reviews))
}

/// Harvest an app right now and return what the feed gave back.
pub async fn reviews_by_app(
    State(state): State<AppState>,
    Query(query): Query<AppQuery>,
) -> Result<Json<Vec<Review>>, ApiError> {
    let app_id = query.app_id()?;
    match state.harvester.harvest(app_id).await {
        Ok(result) => Ok(Json(result.reviews)),
        Err(e) => {
            warn!(app_id, "Ad-hoc fetch failed: {}", e);
            Ok(Json(Vec::new()))
        }
    }
}
