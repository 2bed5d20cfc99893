//! HTTP API routes driven in-process.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use tempfile::{tempdir, TempDir};
use tower::ServiceExt;

use reviews_browser::models::Review;
use reviews_browser::repository::ReviewRepository;
use reviews_browser::server::{create_router, AppState};
use reviews_browser::services::ReviewHarvester;
use reviews_browser::testing::{review, StaticSource};

struct TestApp {
    dir: TempDir,
    reviews: ReviewRepository,
    source: Arc<StaticSource>,
    router: Router,
}

fn app(source: StaticSource) -> TestApp {
    let dir = tempdir().unwrap();
    let reviews =
        ReviewRepository::open(&dir.path().join("reviews.csv"), Duration::hours(48)).unwrap();
    let source = Arc::new(source);
    let harvester = ReviewHarvester::new(source.clone(), reviews.clone());
    let router = create_router(AppState::from_parts(reviews.clone(), harvester));

    TestApp {
        dir,
        reviews,
        source,
        router,
    }
}

async fn get(router: Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = router
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

#[tokio::test]
async fn ready_reports_ok() {
    let t = app(StaticSource::default());
    let (status, body) = get(t.router, "/api/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"API is ready");
}

#[tokio::test]
async fn missing_app_id_is_a_client_error() {
    let t = app(StaticSource::default());
    // Any store read would now fail with a 500.
    std::fs::remove_file(t.dir.path().join("reviews.csv")).unwrap();

    let (status, _) = get(t.router.clone(), "/api/reviews").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(t.router.clone(), "/api/reviews?app_id=").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(t.router, "/api/reviews_by_app").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(t.source.calls(), 0);
}

#[tokio::test]
async fn recent_reviews_are_returned_newest_first() {
    let t = app(StaticSource::default());
    let now = Utc::now();
    for (id, age) in [
        ("older", Duration::hours(3)),
        ("newest", Duration::minutes(1)),
        ("expired", Duration::hours(60)),
    ] {
        t.reviews.insert(&review("42", id, now - age)).await.unwrap();
    }
    t.reviews.insert(&review("7", "elsewhere", now)).await.unwrap();

    let (status, body) = get(t.router, "/api/reviews?app_id=42").await;
    assert_eq!(status, StatusCode::OK);

    let reviews: Vec<Review> = serde_json::from_slice(&body).unwrap();
    let ids: Vec<_> = reviews.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["newest", "older"]);

    let raw: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let first = raw[0].as_object().unwrap();
    for field in ["id", "app_id", "author", "title", "content", "rating", "created_at"] {
        assert!(first.contains_key(field), "missing field {field}");
    }
}

#[tokio::test]
async fn store_failure_is_a_server_error() {
    let t = app(StaticSource::default());
    std::fs::remove_file(t.dir.path().join("reviews.csv")).unwrap();

    let (status, body) = get(t.router, "/api/reviews?app_id=42").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, b"Database error");
}

#[tokio::test]
async fn ad_hoc_fetch_returns_and_stores_reviews() {
    let now = Utc::now();
    let t = app(StaticSource::with_reviews(vec![
        review("42", "a", now),
        review("42", "b", now - Duration::minutes(10)),
    ]));

    let (status, body) = get(t.router.clone(), "/api/reviews_by_app?app_id=42").await;
    assert_eq!(status, StatusCode::OK);
    let reviews: Vec<Review> = serde_json::from_slice(&body).unwrap();
    assert_eq!(reviews.len(), 2);
    assert_eq!(t.reviews.all().await.unwrap().len(), 2);

    // Fetching again returns the feed contents without duplicating rows.
    let (_, body) = get(t.router, "/api/reviews_by_app?app_id=42").await;
    let reviews: Vec<Review> = serde_json::from_slice(&body).unwrap();
    assert_eq!(reviews.len(), 2);
    assert_eq!(t.reviews.all().await.unwrap().len(), 2);
}

#[tokio::test]
async fn ad_hoc_fetch_failure_yields_empty_list() {
    let t = app(StaticSource::failing());

    let (status, body) = get(t.router, "/api/reviews_by_app?app_id=42").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"[]");
    assert_eq!(t.source.calls(), 1);
}
