//! Remote rating lookups behind the [`RatingProvider`] seam.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::rating::LikesData;

pub const DEFAULT_API_BASE: &str = "https://returnyoutubedislikeapi.com";
pub const ENV_API_BASE: &str = "RATING_API_BASE";

/// Why a remote lookup produced no data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("rating api returned status {0}")]
    Status(u16),
    #[error("rating api transport error: {0}")]
    Transport(String),
    #[error("rating api body could not be decoded: {0}")]
    Decode(String),
    #[error("fetch task ended without a result")]
    Abandoned,
}

/// Does the actual remote call. No retries at this layer.
#[async_trait]
pub trait RatingProvider: Send + Sync + 'static {
    async fn fetch_likes(&self, content_id: &str) -> Result<LikesData, FetchError>;
    fn name(&self) -> &'static str;
}

/// Return YouTube Dislike style API: `GET {base}/Votes?videoId=<id>`.
pub struct HttpRatingProvider {
    http: reqwest::Client,
    base: String,
}

impl HttpRatingProvider {
    pub fn new(base: impl Into<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("thumbnail-rating-bar/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            http,
            base: base.into().trim_end_matches('/').to_string(),
        })
    }

    /// Base URL from `$RATING_API_BASE`, else the public API.
    pub fn from_env() -> anyhow::Result<Self> {
        let base = std::env::var(ENV_API_BASE).unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
        Self::new(base)
    }
}

#[async_trait]
impl RatingProvider for HttpRatingProvider {
    async fn fetch_likes(&self, content_id: &str) -> Result<LikesData, FetchError> {
        let resp = self
            .http
            .get(format!("{}/Votes", self.base))
            .query(&[("videoId", content_id)])
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        resp.json::<LikesData>()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// In-memory provider for tests and the demo: fixed answers, optional latency,
/// and a call counter.
#[derive(Default)]
pub struct FixtureRatingProvider {
    ratings: Mutex<HashMap<String, LikesData>>,
    failing: Mutex<HashSet<String>>,
    latency: Duration,
    calls: AtomicUsize,
}

impl FixtureRatingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_rating(self, content_id: &str, likes: u64, dislikes: u64) -> Self {
        self.set_rating(content_id, likes, dislikes);
        self
    }

    pub fn set_rating(&self, content_id: &str, likes: u64, dislikes: u64) {
        self.ratings
            .lock()
            .expect("fixture provider mutex poisoned")
            .insert(content_id.to_string(), LikesData::new(likes, dislikes));
    }

    /// Make lookups of `content_id` fail with a 429 until cleared.
    pub fn set_failing(&self, content_id: &str, failing: bool) {
        let mut f = self.failing.lock().expect("fixture provider mutex poisoned");
        if failing {
            f.insert(content_id.to_string());
        } else {
            f.remove(content_id);
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RatingProvider for FixtureRatingProvider {
    async fn fetch_likes(&self, content_id: &str) -> Result<LikesData, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if self
            .failing
            .lock()
            .expect("fixture provider mutex poisoned")
            .contains(content_id)
        {
            return Err(FetchError::Status(429));
        }
        self.ratings
            .lock()
            .expect("fixture provider mutex poisoned")
            .get(content_id)
            .copied()
            .ok_or(FetchError::Status(404))
    }

    fn name(&self) -> &'static str {
        "fixture"
    }
}
