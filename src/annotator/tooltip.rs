//! Augments tooltips rendered by a companion extension (`.ryd-tooltip`) with
//! the percentage and total, and optionally rescales its bar.
//!
//! Purely local: counts come from the tooltip text, never from the cache.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::dom::{first_descendant, query_all, ElementPattern, PageDom};
use crate::format::{exponential_width_percent, parse_localized_integer, tooltip_suffix, TOOLTIP_SENTINEL};
use crate::rating::RatingSummary;
use crate::settings::UserSettings;

const RYD_TOOLTIP: ElementPattern = ElementPattern {
    classes: &["ryd-tooltip"],
    ..ElementPattern::ANY
};
const TOOLTIP_TEXT: ElementPattern = ElementPattern {
    id: Some("tooltip"),
    ..ElementPattern::ANY
};
const RYD_BAR: ElementPattern = ElementPattern {
    id: Some("ryd-bar"),
    ..ElementPattern::ANY
};

static COUNTS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([^/]+)/([^-]+)(-|$)").expect("tooltip counts regex"));

/// Counts from `"1,234 / 56"` style text. `None` for formats that only show
/// one side.
pub fn parse_tooltip_counts(text: &str) -> Option<RatingSummary> {
    let caps = COUNTS.captures(text)?;
    let likes = parse_localized_integer(caps.get(1)?.as_str())?;
    let dislikes = parse_localized_integer(caps.get(2)?.as_str())?;
    Some(RatingSummary::from_counts(likes, dislikes))
}

/// One pass over every `.ryd-tooltip`. Returns how many were augmented.
pub fn augment_tooltips<D: PageDom + ?Sized>(dom: &mut D, settings: &UserSettings) -> usize {
    let mut touched = 0;
    for host in query_all(dom, &[RYD_TOOLTIP]) {
        let Some(tooltip) = first_descendant(dom, host, &TOOLTIP_TEXT) else {
            continue;
        };
        let current = dom.text(tooltip);
        if current.ends_with(TOOLTIP_SENTINEL) {
            continue;
        }

        let summary = parse_tooltip_counts(&current);
        match summary {
            Some(s) if settings.bar_tooltip => {
                dom.set_text(tooltip, &format!("{current}{}", tooltip_suffix(&s)));
            }
            _ => {
                if summary.is_none() {
                    tracing::debug!(target: "annotator", text = %current, "unrecognised tooltip text");
                }
                dom.set_text(tooltip, &format!("{current}{TOOLTIP_SENTINEL}"));
            }
        }

        if settings.use_exponential_scaling {
            if let Some(ratio) = summary.and_then(|s| s.ratio).filter(|r| *r > 0.0) {
                if let Some(bar) = first_descendant(dom, host, &RYD_BAR) {
                    let width = exponential_width_percent(ratio);
                    dom.set_style(bar, "width", &format!("{width}%"));
                }
            }
        }
        touched += 1;
    }
    touched
}
