// tests/metrics.rs
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use thumbnail_rating_bar::cache::{FixtureRatingProvider, RatingCache};
use thumbnail_rating_bar::metrics::Metrics;

// Single test: the Prometheus recorder can only be installed once per process.
#[tokio::test]
async fn metrics_endpoint_contains_cache_series() {
    let metrics = Metrics::init(600_000).expect("install recorder");

    let provider = Arc::new(FixtureRatingProvider::new().with_rating("abc", 1, 1));
    let cache = RatingCache::new(provider, Duration::from_secs(600));
    cache.get_rating("abc").await.expect("miss");
    cache.get_rating("abc").await.expect("hit");
    assert!(cache.get_rating("nope").await.is_err());
    // Settings updates move the gauge along with the cache.
    cache.set_ttl(Duration::from_secs(42));

    let resp = metrics
        .router()
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body::to_bytes(resp.into_body(), 1_048_576).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();

    for needle in [
        "rating_cache_hits_total",
        "rating_cache_misses_total",
        "rating_fetch_errors_total",
        "rating_cache_ttl_ms",
    ] {
        assert!(text.contains(needle), "missing {needle} in:\n{text}");
    }

    let ttl_line = text
        .lines()
        .find(|l| l.starts_with("rating_cache_ttl_ms "))
        .expect("ttl gauge sample");
    let value: f64 = ttl_line["rating_cache_ttl_ms ".len()..].trim().parse().unwrap();
    assert_eq!(value, 42_000.0);
}
