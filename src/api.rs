use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::protocol::{PageId, Request, Response};
use crate::service::BackgroundService;

#[derive(Clone)]
pub struct AppState {
    service: Arc<BackgroundService>,
}

impl AppState {
    pub fn new(service: Arc<BackgroundService>) -> Self {
        Self { service }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/message", post(message))
        .route("/debug/cache", get(debug_cache))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(serde::Deserialize)]
struct MessageQuery {
    #[serde(default)]
    page: Option<u64>,
}

async fn message(
    State(state): State<AppState>,
    Query(q): Query<MessageQuery>,
    Json(req): Json<Request>,
) -> Json<Response> {
    let origin = PageId(q.page.unwrap_or_default());
    Json(state.service.handle(origin, req).await)
}

#[derive(serde::Serialize)]
struct CacheInfo {
    entries: usize,
    in_flight: usize,
    ttl_ms: u64,
}

async fn debug_cache(State(state): State<AppState>) -> Json<CacheInfo> {
    let cache = state.service.cache();
    Json(CacheInfo {
        entries: cache.len(),
        in_flight: cache.in_flight(),
        ttl_ms: cache.ttl().as_millis() as u64,
    })
}
