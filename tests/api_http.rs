// tests/api_http.rs
//
// HTTP-level tests for the background service Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET /health
// - POST /message (getLikesData, legacy videoApiRequest, unknown id, updateSettings)
// - GET /debug/cache

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::json;
use serde_json::Value as Json;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt as _; // for `oneshot`

use thumbnail_rating_bar::api::{create_router, AppState};
use thumbnail_rating_bar::cache::{FixtureRatingProvider, RatingCache};
use thumbnail_rating_bar::service::{BackgroundService, RecordingStyleInjector};

const BODY_LIMIT: usize = 1024 * 1024;

fn test_router() -> Router {
    let provider = FixtureRatingProvider::new().with_rating("dQw4w9WgXcQ", 100, 25);
    let service = BackgroundService::new(
        RatingCache::new(Arc::new(provider), Duration::from_secs(600)),
        Arc::new(RecordingStyleInjector::new()),
    );
    create_router(AppState::new(Arc::new(service)))
}

async fn post_message(app: Router, payload: Json) -> (StatusCode, Json) {
    let req = Request::builder()
        .method("POST")
        .uri("/message?page=3")
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("build POST /message");
    let resp = app.oneshot(req).await.expect("oneshot /message");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    (status, serde_json::from_slice(&bytes).unwrap_or(Json::Null))
}

async fn get_json(app: Router, uri: &str) -> Json {
    let req = Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("build GET");
    let resp = app.oneshot(req).await.expect("oneshot GET");
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn api_health_returns_200_and_ok_body() {
    let req = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .expect("build GET /health");
    let resp = test_router().oneshot(req).await.expect("oneshot /health");
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    assert_eq!(String::from_utf8_lossy(&bytes), "ok");
}

#[tokio::test]
async fn message_returns_likes_data() {
    let (status, body) = post_message(
        test_router(),
        json!({ "query": "getLikesData", "videoId": "dQw4w9WgXcQ" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "likes": 100, "dislikes": 25 }));
}

#[tokio::test]
async fn legacy_query_name_is_accepted_and_misses_are_null() {
    let app = test_router();
    let (_, body) = post_message(
        app.clone(),
        json!({ "query": "videoApiRequest", "videoId": "dQw4w9WgXcQ" }),
    )
    .await;
    assert_eq!(body["likes"], 100);

    let (status, body) = post_message(app, json!({ "query": "getLikesData", "videoId": "nope" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Json::Null);
}

#[tokio::test]
async fn malformed_message_is_rejected() {
    let (status, _) = post_message(test_router(), json!({ "query": "launchRockets" })).await;
    assert!(status.is_client_error(), "got {status}");
}

#[tokio::test]
async fn debug_cache_reflects_lookups_and_settings() {
    let app = test_router();
    let before = get_json(app.clone(), "/debug/cache").await;
    assert_eq!(before["entries"], 0);
    assert_eq!(before["ttl_ms"], 600_000);

    post_message(
        app.clone(),
        json!({ "query": "getLikesData", "videoId": "dQw4w9WgXcQ" }),
    )
    .await;
    post_message(app.clone(), json!({ "query": "updateSettings", "cacheDuration": 5000 })).await;

    let after = get_json(app, "/debug/cache").await;
    assert_eq!(after["entries"], 1);
    assert_eq!(after["in_flight"], 0);
    assert_eq!(after["ttl_ms"], 5000);
}
