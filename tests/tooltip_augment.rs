// tests/tooltip_augment.rs
//
// Augmentation of companion-extension tooltips (`.ryd-tooltip`).

use thumbnail_rating_bar::annotator::tooltip::augment_tooltips;
use thumbnail_rating_bar::dom::{MemoryDom, NodeId, PageDom};
use thumbnail_rating_bar::format::TOOLTIP_SENTINEL;
use thumbnail_rating_bar::UserSettings;

/// `.ryd-tooltip > #ryd-bar-container > #ryd-bar` plus `#tooltip` text.
fn ryd_page(text: &str) -> (MemoryDom, NodeId, NodeId) {
    let mut dom = MemoryDom::new();
    let root = dom.root();
    let host = dom.append(root, "div", &[("class", "ryd-tooltip")]);
    let container = dom.append(host, "div", &[("id", "ryd-bar-container")]);
    let bar = dom.append(container, "div", &[("id", "ryd-bar")]);
    dom.set_style(bar, "width", "75%");
    let tooltip = dom.append(host, "tp-yt-paper-tooltip", &[("id", "tooltip")]);
    dom.set_text(tooltip, text);
    (dom, tooltip, bar)
}

#[test]
fn appends_percentage_and_total_once() {
    let (mut dom, tooltip, bar) = ryd_page("1,500 / 500");
    let settings = UserSettings::default();

    assert_eq!(augment_tooltips(&mut dom, &settings), 1);
    let text = dom.text(tooltip);
    assert!(text.starts_with("1,500 / 500 "));
    assert!(text.contains("75.0%"));
    assert!(text.contains("2,000 total"));
    assert!(text.ends_with(TOOLTIP_SENTINEL));
    // no exponential scaling configured
    assert_eq!(dom.style(bar, "width").as_deref(), Some("75%"));

    // second pass leaves it alone
    assert_eq!(augment_tooltips(&mut dom, &settings), 0);
    assert_eq!(dom.text(tooltip), text);
}

#[test]
fn unparseable_text_only_gets_the_sentinel() {
    let (mut dom, tooltip, _) = ryd_page("1,500");
    augment_tooltips(&mut dom, &UserSettings::default());
    assert_eq!(dom.text(tooltip), format!("1,500{TOOLTIP_SENTINEL}"));
}

#[test]
fn tooltip_disabled_marks_without_text_but_still_rescales() {
    let (mut dom, tooltip, bar) = ryd_page("300 / 100");
    let settings = UserSettings {
        bar_tooltip: false,
        use_exponential_scaling: true,
        ..UserSettings::default()
    };
    augment_tooltips(&mut dom, &settings);

    assert_eq!(dom.text(tooltip), format!("300 / 100{TOOLTIP_SENTINEL}"));
    let width = dom.style(bar, "width").expect("width");
    let pct: f64 = width.trim_end_matches('%').parse().expect("numeric width");
    // 100 * 2^(10 * (0.75 - 1)) = 100 * 2^-2.5
    assert!((pct - 17.677669529663685).abs() < 1e-9, "got {pct}");
}

#[test]
fn zero_rating_keeps_host_bar_width() {
    let (mut dom, _, bar) = ryd_page("0 / 12");
    let settings = UserSettings {
        use_exponential_scaling: true,
        ..UserSettings::default()
    };
    augment_tooltips(&mut dom, &settings);
    assert_eq!(dom.style(bar, "width").as_deref(), Some("75%"));
}
