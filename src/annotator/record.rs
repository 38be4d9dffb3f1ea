//! Per-thumbnail bookkeeping, stored as markers on the element itself so it
//! lives and dies with the element.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::dom::{NodeId, PageDom};

/// URL the element was last annotated for.
pub const URL_ATTR: &str = "data-ytrb-url";
/// Failed lookups retried so far.
pub const RETRIES_ATTR: &str = "data-ytrb-retries";
/// URL the indicator was last drawn for.
pub const RENDERED_ATTR: &str = "data-ytrb-rendered";

static WATCH_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"[?&]v=([^&]+)").expect("watch id regex"));
static SHORTS_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^/shorts/(.+)$").expect("shorts id regex"));

/// Content id from a watch URL (`?v=`), or from `/shorts/<id>` when enabled.
pub fn extract_content_id(url: &str, rate_shorts: bool) -> Option<String> {
    if let Some(c) = WATCH_ID.captures(url) {
        return c.get(1).map(|m| m.as_str().to_string());
    }
    if rate_shorts {
        if let Some(c) = SHORTS_ID.captures(url) {
            return c.get(1).map(|m| m.as_str().to_string());
        }
    }
    None
}

/// Typed view over an element's markers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailRecord {
    pub element: NodeId,
    pub source_url: Option<String>,
    pub retry_count: u32,
    pub rendered_url: Option<String>,
}

impl ThumbnailRecord {
    pub fn read<D: PageDom + ?Sized>(dom: &D, element: NodeId) -> Self {
        Self {
            element,
            source_url: dom.attr(element, URL_ATTR).filter(|u| !u.is_empty()),
            retry_count: dom
                .attr(element, RETRIES_ATTR)
                .and_then(|r| r.parse().ok())
                .unwrap_or(0),
            rendered_url: dom.attr(element, RENDERED_ATTR).filter(|u| !u.is_empty()),
        }
    }

    pub fn is_marked_for(&self, url: &str) -> bool {
        self.source_url.as_deref() == Some(url)
    }

    /// An indicator was drawn for `url` at some point.
    pub fn was_rendered_for(&self, url: &str) -> bool {
        self.rendered_url.as_deref() == Some(url)
    }

    pub fn mark_url<D: PageDom + ?Sized>(&mut self, dom: &mut D, url: &str) {
        dom.set_attr(self.element, URL_ATTR, url);
        self.source_url = Some(url.to_string());
    }

    pub fn clear_url<D: PageDom + ?Sized>(&mut self, dom: &mut D) {
        dom.remove_attr(self.element, URL_ATTR);
        self.source_url = None;
    }

    pub fn mark_rendered<D: PageDom + ?Sized>(&mut self, dom: &mut D, url: &str) {
        dom.set_attr(self.element, RENDERED_ATTR, url);
        self.rendered_url = Some(url.to_string());
    }

    pub fn clear_rendered<D: PageDom + ?Sized>(&mut self, dom: &mut D) {
        dom.remove_attr(self.element, RENDERED_ATTR);
        self.rendered_url = None;
    }

    pub fn reset_retries<D: PageDom + ?Sized>(&mut self, dom: &mut D) {
        dom.remove_attr(self.element, RETRIES_ATTR);
        self.retry_count = 0;
    }

    pub fn bump_retries<D: PageDom + ?Sized>(&mut self, dom: &mut D) {
        self.retry_count += 1;
        dom.set_attr(self.element, RETRIES_ATTR, &self.retry_count.to_string());
    }
}
