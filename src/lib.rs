//! Public library surface for the binaries and integration tests.

pub mod api;
pub mod bridge;
pub mod cache;
pub mod dom;
pub mod format;
pub mod metrics;
pub mod protocol;
pub mod rating;
pub mod service;
pub mod settings;

// Page side: layout detection, scheduling and rendering.
pub mod annotator;

// ---- Re-exports for stable public API ----
pub use crate::annotator::{Annotator, AnnotatorConfig, SharedDom};
pub use crate::api::create_router;
pub use crate::bridge::{spawn_background, HttpChannel, LocalChannel, MessageChannel};
pub use crate::cache::{FetchError, RatingCache, RatingProvider};
pub use crate::protocol::{PageId, Request, Response};
pub use crate::service::BackgroundService;
pub use crate::settings::UserSettings;
