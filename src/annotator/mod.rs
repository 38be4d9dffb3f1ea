//! # Annotator
//! Keeps rating indicators consistent with a live, constantly mutating page.
//!
//! A detection cycle selects candidate thumbnails through the sticky
//! [`LayoutProfile`], marks each with the URL it is being annotated for, and
//! requests ratings over the [`MessageChannel`] without blocking. Responses are
//! rendered only if the element is still attached and still marked for the
//! same URL. Failures join a delayed retry batch; after
//! [`AnnotatorConfig::max_retries`] attempts an element is left alone.
//!
//! Cycles are throttled: mutations arriving during a cycle or its cool-down
//! collapse into one follow-up cycle.

pub mod layout;
pub mod record;
pub mod render;
pub mod scheduler;
pub mod tooltip;

use anyhow::Context;
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::bridge::MessageChannel;
use crate::dom::{NodeId, PageDom};
use crate::protocol::{Request, Response};
use crate::rating::{LikesData, RatingSummary};
use crate::settings::UserSettings;

pub use layout::{Candidate, LayoutDetector, LayoutProfile};
pub use record::{extract_content_id, ThumbnailRecord};
pub use scheduler::{RetryBatch, Throttle};

/// The page document, shared between the cycle and in-flight responses.
pub type SharedDom<D> = Arc<Mutex<D>>;

const DARK_BACKGROUND_PROPERTY: &str = "--yt-spec-general-background-a";
const DARK_BACKGROUND: &str = "#181818";

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("annotator_cycles_total", "Detection cycles run.");
        describe_counter!(
            "annotator_rating_requests_total",
            "Rating requests sent to the background service."
        );
        describe_counter!("annotator_retries_total", "Thumbnails re-queued after a failure.");
        describe_counter!(
            "annotator_abandoned_total",
            "Thumbnails given up on after the retry limit."
        );
    });
}

#[derive(Debug, Clone, Copy)]
pub struct AnnotatorConfig {
    /// Minimum spacing between detection cycles.
    pub throttle: Duration,
    /// Delay before a batch of failed lookups is retried.
    pub retry_delay: Duration,
    /// Upper bound of the random delay added to `retry_delay`.
    pub retry_jitter: Duration,
    pub max_retries: u32,
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        Self {
            throttle: Duration::from_millis(100),
            retry_delay: Duration::from_millis(5000),
            retry_jitter: Duration::from_millis(500),
            max_retries: 10,
        }
    }
}

/// One rating request issued by a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    /// Element carrying the markers and the indicator.
    pub element: NodeId,
    pub profile: LayoutProfile,
    pub url: String,
    pub content_id: String,
}

/// What a single cycle did. The request tasks keep running if this is dropped.
#[derive(Debug, Default)]
pub struct CycleReport {
    pub dispatched: Vec<Dispatch>,
    pub tooltips_augmented: usize,
    tasks: Vec<JoinHandle<()>>,
}

impl CycleReport {
    /// Wait until every response of this cycle has been applied.
    pub async fn settle(self) {
        for task in self.tasks {
            let _ = task.await;
        }
    }
}

#[derive(Debug, Default)]
struct Stats {
    cycles: AtomicU64,
    requests: AtomicU64,
    retries: AtomicU64,
    abandoned: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AnnotatorStats {
    pub cycles: u64,
    pub requests: u64,
    pub retries: u64,
    pub abandoned: u64,
}

struct Inner<D: PageDom> {
    dom: SharedDom<D>,
    channel: Arc<dyn MessageChannel>,
    settings: UserSettings,
    config: AnnotatorConfig,
    detector: Mutex<LayoutDetector>,
    throttle: Throttle,
    retries: RetryBatch<NodeId>,
    dark_theme: OnceCell<bool>,
    stats: Stats,
}

/// Cheap to clone; clones drive the same page.
pub struct Annotator<D: PageDom> {
    inner: Arc<Inner<D>>,
}

impl<D: PageDom> Clone for Annotator<D> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<D: PageDom> Annotator<D> {
    pub fn new(dom: SharedDom<D>, channel: Arc<dyn MessageChannel>, settings: UserSettings) -> Self {
        Self::with_config(dom, channel, settings, AnnotatorConfig::default())
    }

    pub fn with_config(
        dom: SharedDom<D>,
        channel: Arc<dyn MessageChannel>,
        settings: UserSettings,
        config: AnnotatorConfig,
    ) -> Self {
        ensure_metrics_described();
        Self {
            inner: Arc::new(Inner {
                dom,
                channel,
                settings,
                throttle: Throttle::new(config.throttle),
                retries: RetryBatch::new(config.retry_delay, config.retry_jitter),
                config,
                detector: Mutex::new(LayoutDetector::new()),
                dark_theme: OnceCell::new(),
                stats: Stats::default(),
            }),
        }
    }

    pub fn settings(&self) -> &UserSettings {
        &self.inner.settings
    }

    pub fn active_layout(&self) -> Option<LayoutProfile> {
        self.inner
            .detector
            .lock()
            .expect("layout detector mutex poisoned")
            .active()
    }

    pub fn stats(&self) -> AnnotatorStats {
        let s = &self.inner.stats;
        AnnotatorStats {
            cycles: s.cycles.load(Ordering::Relaxed),
            requests: s.requests.load(Ordering::Relaxed),
            retries: s.retries.load(Ordering::Relaxed),
            abandoned: s.abandoned.load(Ordering::Relaxed),
        }
    }

    /// Inject stylesheets and CSS variables, then run the first cycle.
    pub async fn start(&self) -> anyhow::Result<CycleReport> {
        let files = self.inner.settings.css_files();
        if !files.is_empty() {
            self.inner
                .channel
                .send(Request::InsertCss { files })
                .await
                .context("insert css")?;
        }
        {
            let mut dom = self.dom();
            for (name, value) in self.inner.settings.css_variables() {
                dom.set_root_style_property(name, &value);
            }
        }
        Ok(self.notify_mutation().unwrap_or_default())
    }

    /// Run a cycle on every notification from `feed` until it closes or the
    /// annotator is dropped.
    pub fn observe(&self, mut feed: mpsc::UnboundedReceiver<()>) -> JoinHandle<()> {
        let weak = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            while feed.recv().await.is_some() {
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                Annotator { inner }.notify_mutation();
            }
        })
    }

    /// Throttled trigger. Runs a cycle now and returns its report, or folds the
    /// trigger into the pending flag while a cycle is cooling down.
    pub fn notify_mutation(&self) -> Option<CycleReport> {
        if !self.inner.throttle.try_begin() {
            return None;
        }
        let report = self.run_cycle();

        let weak = Arc::downgrade(&self.inner);
        let interval = self.inner.throttle.interval();
        tokio::spawn(async move {
            tokio::time::sleep(interval).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            if inner.throttle.release() {
                Annotator { inner }.notify_mutation();
            }
        });
        Some(report)
    }

    /// One unthrottled detection cycle.
    pub fn run_cycle(&self) -> CycleReport {
        self.inner.stats.cycles.fetch_add(1, Ordering::Relaxed);
        counter!("annotator_cycles_total").increment(1);

        let settings = &self.inner.settings;
        let (dispatched, tooltips_augmented) = {
            let mut dom = self.dom();
            self.inner.dark_theme.get_or_init(|| {
                dom.root_style_property(DARK_BACKGROUND_PROPERTY)
                    .is_some_and(|v| v.trim() == DARK_BACKGROUND)
            });
            let dispatched = if settings.annotates_thumbnails() {
                self.collect_new_thumbnails(&mut *dom)
            } else {
                Vec::new()
            };
            let tooltips = if settings.augments_tooltips() {
                tooltip::augment_tooltips(&mut *dom, settings)
            } else {
                0
            };
            (dispatched, tooltips)
        };

        let tasks = dispatched
            .iter()
            .cloned()
            .map(|d| self.request_rating(d))
            .collect();

        tracing::trace!(
            target: "annotator",
            requests = dispatched.len(),
            tooltips = tooltips_augmented,
            "cycle"
        );
        CycleReport {
            dispatched,
            tooltips_augmented,
            tasks,
        }
    }

    fn dom(&self) -> MutexGuard<'_, D> {
        self.inner.dom.lock().expect("page dom mutex poisoned")
    }

    fn collect_new_thumbnails(&self, dom: &mut D) -> Vec<Dispatch> {
        let candidates = self
            .inner
            .detector
            .lock()
            .expect("layout detector mutex poisoned")
            .candidates(&*dom);

        let mut out = Vec::new();
        for Candidate { node, profile } in candidates {
            let Some(url) = profile.resolve_url(&*dom, node) else {
                continue;
            };
            let element = profile.resolve_annotation_target(&*dom, node);
            let mut record = ThumbnailRecord::read(&*dom, element);

            if record.is_marked_for(&url) && !self.needs_revalidation(dom, profile, &record) {
                continue;
            }
            let Some(content_id) = extract_content_id(&url, self.inner.settings.rate_shorts) else {
                continue;
            };
            if record.source_url.as_deref().is_some_and(|prev| prev != url) {
                render::remove_indicator(dom, element);
                record.reset_retries(dom);
            }
            record.mark_url(dom, &url);
            record.clear_rendered(dom);

            out.push(Dispatch {
                element,
                profile,
                url,
                content_id,
            });
        }
        out
    }

    /// Only an indicator that was drawn and later dropped by the page counts;
    /// in-flight, failed and abandoned lookups never had one.
    fn needs_revalidation(&self, dom: &D, profile: LayoutProfile, record: &ThumbnailRecord) -> bool {
        profile.revalidates_indicator()
            && self.inner.settings.bar_height != 0
            && record.source_url.as_deref().is_some_and(|url| record.was_rendered_for(url))
            && !render::indicator_is_last_child(dom, record.element)
    }

    fn request_rating(&self, dispatch: Dispatch) -> JoinHandle<()> {
        self.inner.stats.requests.fetch_add(1, Ordering::Relaxed);
        counter!("annotator_rating_requests_total").increment(1);

        let this = self.clone();
        tokio::spawn(async move {
            let request = Request::get_likes_data(dispatch.content_id.clone());
            let likes = match this.inner.channel.send(request).await {
                Ok(Response::Likes(data)) => Some(data),
                Ok(Response::Empty) => None,
                Err(e) => {
                    tracing::debug!(target: "annotator", video_id = %dispatch.content_id, "request failed: {e:#}");
                    None
                }
            };
            match likes {
                Some(data) => this.render(&dispatch, data),
                None => this.schedule_retry(dispatch.element),
            }
        })
    }

    fn render(&self, dispatch: &Dispatch, data: LikesData) {
        let settings = &self.inner.settings;
        let is_dark = self.inner.dark_theme.get().copied().unwrap_or(false);
        let mut dom = self.dom();

        let element = dispatch.element;
        if !dom.is_connected(element)
            || !ThumbnailRecord::read(&*dom, element).is_marked_for(&dispatch.url)
        {
            tracing::debug!(target: "annotator", video_id = %dispatch.content_id, "stale response discarded");
            return;
        }

        let summary = RatingSummary::from(data);
        if settings.bar_height != 0 {
            render::render_indicator(&mut *dom, element, &summary, settings);
            ThumbnailRecord::read(&*dom, element).mark_rendered(&mut *dom, &dispatch.url);
        }
        if settings.show_percentage {
            if let Some(line) = dispatch.profile.metadata_line(&*dom, element) {
                render::render_percentage(
                    &mut *dom,
                    line,
                    &summary,
                    is_dark,
                    dispatch.profile.is_mobile(),
                );
            }
        }
    }

    fn schedule_retry(&self, element: NodeId) {
        let Some(delay) = self.inner.retries.push(element) else {
            return;
        };
        let weak: Weak<Inner<D>> = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(inner) = weak.upgrade() {
                Annotator { inner }.flush_retries();
            }
        });
    }

    /// Re-queue every failed element still on the page by clearing its URL
    /// marker, then trigger a cycle to pick them up.
    fn flush_retries(&self) {
        let max = self.inner.config.max_retries;
        {
            let mut dom = self.dom();
            for element in self.inner.retries.take() {
                if !dom.is_connected(element) {
                    continue;
                }
                let mut record = ThumbnailRecord::read(&*dom, element);
                if record.retry_count >= max {
                    self.inner.stats.abandoned.fetch_add(1, Ordering::Relaxed);
                    counter!("annotator_abandoned_total").increment(1);
                    tracing::debug!(target: "annotator", url = ?record.source_url, "retry limit reached");
                    continue;
                }
                record.bump_retries(&mut *dom);
                record.clear_url(&mut *dom);
                self.inner.stats.retries.fetch_add(1, Ordering::Relaxed);
                counter!("annotator_retries_total").increment(1);
            }
        }
        self.notify_mutation();
    }
}
