//! # Rating cache
//! Process-wide store of [`VideoRating`]s with:
//! - single-flight fetches (concurrent lookups of one id share one remote call),
//! - absolute TTL (no sliding refresh), evicted lazily oldest-first,
//! - failures fanned out to every waiter but never cached.

pub mod provider;

use metrics::{counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::rating::VideoRating;
pub use provider::{FetchError, FixtureRatingProvider, HttpRatingProvider, RatingProvider};

type Waiter = oneshot::Sender<Result<VideoRating, FetchError>>;

/// One-time metrics registration.
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("rating_cache_hits_total", "Lookups served from cache.");
        describe_counter!(
            "rating_cache_misses_total",
            "Lookups that started a remote fetch."
        );
        describe_counter!(
            "rating_cache_coalesced_total",
            "Lookups attached to an in-flight fetch."
        );
        describe_counter!("rating_fetch_errors_total", "Failed remote fetches.");
        describe_gauge!("rating_cache_ttl_ms", "Current cache entry lifetime.");
    });
}

/// Cheap to clone; all clones share one store.
#[derive(Clone)]
pub struct RatingCache {
    inner: Arc<CacheInner>,
}

struct CacheInner {
    provider: Arc<dyn RatingProvider>,
    ttl_ms: AtomicU64,
    state: Mutex<CacheState>,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, VideoRating>,
    /// `(fetched_at, id)` in insertion order, which is also fetch-time order.
    fetch_order: VecDeque<(Instant, String)>,
    in_flight: HashMap<String, Vec<Waiter>>,
}

impl CacheState {
    /// Drops expired entries from the front of the queue; stops at the first
    /// fresh one.
    fn evict_expired(&mut self, now: Instant, ttl: Duration) -> usize {
        let mut removed = 0;
        while let Some((fetched_at, _)) = self.fetch_order.front() {
            if now.saturating_duration_since(*fetched_at) <= ttl {
                break;
            }
            if let Some((_, id)) = self.fetch_order.pop_front() {
                self.entries.remove(&id);
                removed += 1;
            }
        }
        removed
    }
}

impl RatingCache {
    pub fn new(provider: Arc<dyn RatingProvider>, ttl: Duration) -> Self {
        ensure_metrics_described();
        Self {
            inner: Arc::new(CacheInner {
                provider,
                ttl_ms: AtomicU64::new(ttl.as_millis() as u64),
                state: Mutex::new(CacheState::default()),
            }),
        }
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.inner.ttl_ms.load(Ordering::Relaxed))
    }

    pub fn set_ttl(&self, ttl: Duration) {
        self.inner
            .ttl_ms
            .store(ttl.as_millis() as u64, Ordering::Relaxed);
        gauge!("rating_cache_ttl_ms").set(ttl.as_millis() as f64);
        tracing::info!(target: "cache", ttl_ms = ttl.as_millis() as u64, "cache ttl updated");
    }

    /// Cached entries, expired ones included until the next lookup evicts them.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn in_flight(&self) -> usize {
        self.lock().in_flight.len()
    }

    /// Resolve the rating for `content_id` from cache, an in-flight fetch, or a
    /// new remote fetch.
    pub async fn get_rating(&self, content_id: &str) -> Result<VideoRating, FetchError> {
        let rx = {
            let mut st = self.lock();
            let evicted = st.evict_expired(Instant::now(), self.ttl());
            if evicted > 0 {
                tracing::debug!(target: "cache", evicted, "evicted expired ratings");
            }

            if let Some(hit) = st.entries.get(content_id) {
                counter!("rating_cache_hits_total").increment(1);
                return Ok(hit.clone());
            }

            let (tx, rx) = oneshot::channel();
            match st.in_flight.entry(content_id.to_string()) {
                Entry::Occupied(mut waiting) => {
                    counter!("rating_cache_coalesced_total").increment(1);
                    waiting.get_mut().push(tx);
                }
                Entry::Vacant(slot) => {
                    counter!("rating_cache_misses_total").increment(1);
                    slot.insert(vec![tx]);
                    self.spawn_fetch(content_id.to_string());
                }
            }
            rx
        };

        rx.await.unwrap_or(Err(FetchError::Abandoned))
    }

    /// The fetch runs detached so a dropped caller never strands other waiters.
    fn spawn_fetch(&self, content_id: String) {
        let mut guard = FetchGuard {
            cache: self.clone(),
            content_id: Some(content_id),
        };
        tokio::spawn(async move {
            let Some(id) = guard.content_id.clone() else {
                return;
            };
            let result = guard.cache.inner.provider.fetch_likes(&id).await;
            guard.content_id = None;
            guard.cache.complete(id, result);
        });
    }

    fn complete(&self, content_id: String, result: Result<crate::rating::LikesData, FetchError>) {
        let (waiters, outcome) = {
            let mut st = self.lock();
            let waiters = st.in_flight.remove(&content_id).unwrap_or_default();
            let outcome = match result {
                Ok(data) => {
                    let rating = VideoRating::new(content_id.clone(), data, Instant::now());
                    if !st.entries.contains_key(&content_id) {
                        st.fetch_order
                            .push_back((rating.fetched_at, content_id.clone()));
                        st.entries.insert(content_id.clone(), rating.clone());
                    }
                    Ok(rating)
                }
                Err(e) => {
                    counter!("rating_fetch_errors_total").increment(1);
                    tracing::warn!(
                        target: "cache",
                        error = %e,
                        provider = self.inner.provider.name(),
                        content_id = %content_id,
                        "rating fetch failed"
                    );
                    Err(e)
                }
            };
            (waiters, outcome)
        };

        for w in waiters {
            // A waiter that went away just misses the answer.
            let _ = w.send(outcome.clone());
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheState> {
        self.inner.state.lock().expect("rating cache mutex poisoned")
    }
}

/// Owned by the fetch task. If the task unwinds or is dropped before it
/// completes, the waiters for its id get [`FetchError::Abandoned`].
struct FetchGuard {
    cache: RatingCache,
    content_id: Option<String>,
}

impl Drop for FetchGuard {
    fn drop(&mut self) {
        let Some(content_id) = self.content_id.take() else {
            return;
        };
        let waiters = match self.cache.inner.state.lock() {
            Ok(mut st) => st.in_flight.remove(&content_id),
            Err(poisoned) => poisoned.into_inner().in_flight.remove(&content_id),
        };
        counter!("rating_fetch_errors_total").increment(1);
        tracing::warn!(target: "cache", content_id = %content_id, "rating fetch task ended without a result");
        for w in waiters.unwrap_or_default() {
            let _ = w.send(Err(FetchError::Abandoned));
        }
    }
}
