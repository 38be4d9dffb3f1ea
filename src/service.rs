//! Background service: answers the page's protocol requests.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::cache::RatingCache;
use crate::protocol::{PageId, Request, Response};

/// Inserts a packaged stylesheet into a page. The browser owns the real one.
#[async_trait]
pub trait StyleInjector: Send + Sync + 'static {
    async fn insert_css(&self, page: PageId, file: &str) -> anyhow::Result<()>;
}

/// Logs every injection; used when no browser is attached.
pub struct LoggingStyleInjector;

#[async_trait]
impl StyleInjector for LoggingStyleInjector {
    async fn insert_css(&self, page: PageId, file: &str) -> anyhow::Result<()> {
        tracing::info!(target: "service", page = page.0, file, "insert css");
        Ok(())
    }
}

/// Remembers injections so tests and the demo can inspect them.
#[derive(Default)]
pub struct RecordingStyleInjector {
    inserted: Mutex<Vec<(PageId, String)>>,
}

impl RecordingStyleInjector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inserted(&self) -> Vec<(PageId, String)> {
        self.inserted
            .lock()
            .expect("style injector mutex poisoned")
            .clone()
    }
}

#[async_trait]
impl StyleInjector for RecordingStyleInjector {
    async fn insert_css(&self, page: PageId, file: &str) -> anyhow::Result<()> {
        self.inserted
            .lock()
            .expect("style injector mutex poisoned")
            .push((page, file.to_string()));
        Ok(())
    }
}

pub struct BackgroundService {
    cache: RatingCache,
    styles: Arc<dyn StyleInjector>,
}

impl BackgroundService {
    pub fn new(cache: RatingCache, styles: Arc<dyn StyleInjector>) -> Self {
        Self { cache, styles }
    }

    pub fn cache(&self) -> &RatingCache {
        &self.cache
    }

    pub async fn handle(&self, origin: PageId, request: Request) -> Response {
        tracing::trace!(target: "service", page = origin.0, query = request.name(), "request");
        match request {
            Request::GetLikesData { video_id } => match self.cache.get_rating(&video_id).await {
                Ok(rating) => Response::Likes(rating.likes_data()),
                Err(e) => {
                    tracing::debug!(target: "service", video_id = %video_id, error = %e, "no likes data");
                    Response::Empty
                }
            },
            Request::InsertCss { files } => {
                for file in files {
                    if let Err(e) = self.styles.insert_css(origin, &file).await {
                        tracing::warn!(target: "service", file = %file, "insert css failed: {e:#}");
                    }
                }
                Response::Empty
            }
            Request::UpdateSettings { cache_duration } => {
                self.cache.set_ttl(Duration::from_millis(cache_duration));
                Response::Empty
            }
        }
    }
}
