//! Rating cache service binary.
//! Boots the background service behind an axum HTTP server: `/message` for
//! pages, `/debug/cache` and `/metrics` for operators.

use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use thumbnail_rating_bar::{
    api::{create_router, AppState},
    cache::HttpRatingProvider,
    metrics::Metrics,
    protocol::{PageId, Request},
    service::LoggingStyleInjector,
    settings::{settings_path, start_hot_reload_thread, UserSettings},
    BackgroundService, RatingCache,
};

const ENV_ADDR: &str = "RATING_CACHE_ADDR";
const DEFAULT_ADDR: &str = "127.0.0.1:8787";

/// Compact tracing logs, only when `RATING_BAR_LOG=1`.
fn enable_tracing() {
    let enabled = std::env::var("RATING_BAR_LOG")
        .ok()
        .is_some_and(|v| v == "1");
    if !enabled {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("cache=info,service=info,api=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    enable_tracing();

    let settings = UserSettings::load_default().context("loading settings")?;
    let provider = HttpRatingProvider::from_env().context("building rating provider")?;
    let cache = RatingCache::new(Arc::new(provider), settings.cache_ttl());
    let service = Arc::new(BackgroundService::new(
        cache,
        Arc::new(LoggingStyleInjector),
    ));

    if let Some(path) = settings_path() {
        let rt = tokio::runtime::Handle::current();
        let svc = service.clone();
        start_hot_reload_thread(path, Duration::from_secs(2), move |s| {
            let svc = svc.clone();
            rt.spawn(async move {
                svc.handle(
                    PageId::default(),
                    Request::UpdateSettings {
                        cache_duration: s.cache_duration,
                    },
                )
                .await;
            });
        });
    }

    let metrics = Metrics::init(settings.cache_duration).context("installing metrics recorder")?;
    let router = create_router(AppState::new(service)).merge(metrics.router());

    let addr: SocketAddr = std::env::var(ENV_ADDR)
        .unwrap_or_else(|_| DEFAULT_ADDR.to_string())
        .parse()
        .with_context(|| format!("{ENV_ADDR} is not a socket address"))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(target: "api", %addr, "rating cache listening");

    axum::serve(listener, router).await.context("http server")?;
    Ok(())
}
