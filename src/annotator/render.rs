//! Builds the `ytrb-*` indicator and the percentage label.

use crate::dom::{NodeId, PageDom};
use crate::format::{
    color_for_ratio, exponential_width_percent, rating_to_display_string, tooltip_text,
};
use crate::rating::{like_count_hidden_by_creator, RatingSummary};
use crate::settings::UserSettings;

pub const BAR_TAG: &str = "ytrb-bar";
const PERCENTAGE_CLASS: &str = "ytrb-percentage";
const SEPARATOR_CLASS: &str = "ytrb-percentage-separator";
const META_CLASSES: &str = "style-scope ytd-video-meta-block ytd-grid-video-renderer";

/// Remove every indicator directly under `target`.
pub fn remove_indicator<D: PageDom + ?Sized>(dom: &mut D, target: NodeId) {
    for child in dom.children(target) {
        if dom.is_tag(child, BAR_TAG) {
            dom.remove(child);
        }
    }
}

/// The indicator is still the element's last child.
pub fn indicator_is_last_child<D: PageDom + ?Sized>(dom: &D, target: NodeId) -> bool {
    dom.children(target)
        .last()
        .is_some_and(|c| dom.is_tag(*c, BAR_TAG))
}

/// Likes segment width in percent.
pub fn likes_width_percent(ratio: f64, exponential: bool) -> f64 {
    if exponential {
        exponential_width_percent(ratio)
    } else {
        100.0 * ratio
    }
}

/// Replace any indicator under `target` with one for `summary`.
pub fn render_indicator<D: PageDom + ?Sized>(
    dom: &mut D,
    target: NodeId,
    summary: &RatingSummary,
    settings: &UserSettings,
) -> NodeId {
    remove_indicator(dom, target);

    let bar = dom.create_element(BAR_TAG);
    if settings.bar_opacity != 100 {
        dom.set_style(
            bar,
            "opacity",
            &(settings.bar_opacity as f64 / 100.0).to_string(),
        );
    }

    match summary.ratio {
        None => {
            let none = dom.create_element("ytrb-no-rating");
            dom.append_child(bar, none);
        }
        Some(ratio) => {
            let rating = dom.create_element("ytrb-rating");
            let likes = dom.create_element("ytrb-likes");
            let width = likes_width_percent(ratio, settings.use_exponential_scaling);
            dom.set_style(likes, "width", &format!("{width}%"));
            let dislikes = dom.create_element("ytrb-dislikes");
            dom.append_child(rating, likes);
            dom.append_child(rating, dislikes);
            dom.append_child(bar, rating);
        }
    }

    if settings.bar_tooltip {
        let tooltip = dom.create_element("ytrb-tooltip");
        let text = dom.create_element("div");
        dom.set_text(text, &tooltip_text(summary));
        dom.append_child(tooltip, text);
        dom.append_child(bar, tooltip);
    }

    dom.append_child(target, bar);
    bar
}

/// Percentage label inside a metadata line. Returns the label, or `None` when
/// old labels were only cleared.
pub fn render_percentage<D: PageDom + ?Sized>(
    dom: &mut D,
    line: NodeId,
    summary: &RatingSummary,
    is_dark: bool,
    mobile: bool,
) -> Option<NodeId> {
    for child in dom.children(line) {
        if dom.has_class(child, PERCENTAGE_CLASS) || (mobile && dom.has_class(child, SEPARATOR_CLASS))
        {
            dom.remove(child);
        }
    }

    let ratio = summary.ratio?;
    if like_count_hidden_by_creator(summary) {
        return None;
    }

    let label = dom.create_element("span");
    dom.set_attr(label, "class", &format!("{META_CLASSES} {PERCENTAGE_CLASS}"));
    let text = rating_to_display_string(ratio);
    if summary.likes == 0 {
        // Zero likes may be a hidden count; don't colour it.
        dom.set_text(label, &text);
    } else {
        let inner = dom.create_element("span");
        let color = color_for_ratio(ratio, is_dark);
        dom.set_style(inner, "color", &format!("{color} !important"));
        dom.set_text(inner, &text);
        dom.append_child(label, inner);
    }

    let last_span = dom
        .children(line)
        .into_iter()
        .rev()
        .find(|c| dom.is_tag(*c, "span"));
    match last_span {
        Some(anchor) => {
            dom.insert_after(anchor, label);
            if mobile {
                let dot = dom.create_element("span");
                dom.set_attr(
                    dot,
                    "class",
                    &format!("ytm-badge-and-byline-separator {SEPARATOR_CLASS}"),
                );
                dom.set_attr(dot, "aria-hidden", "true");
                dom.set_text(dot, "•");
                dom.insert_after(anchor, dot);
            }
        }
        None => {
            // Empty lines (playlists) get a blank meta span for the leading dot.
            dom.prepend_child(line, label);
            let blank = dom.create_element("span");
            dom.set_attr(blank, "class", "style-scope ytd-video-meta-block");
            dom.prepend_child(line, blank);
        }
    }
    Some(label)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::MemoryDom;

    #[test]
    fn indicator_replaces_previous_bar() {
        let mut dom = MemoryDom::new();
        let root = dom.root();
        let thumb = dom.append(root, "a", &[]);
        let settings = UserSettings::default();

        render_indicator(&mut dom, thumb, &RatingSummary::from_counts(3, 1), &settings);
        let bar = render_indicator(&mut dom, thumb, &RatingSummary::from_counts(1, 1), &settings);

        assert_eq!(dom.children(thumb), vec![bar]);
        assert!(indicator_is_last_child(&dom, thumb));
        let likes = dom
            .descendants(bar)
            .into_iter()
            .find(|n| dom.is_tag(*n, "ytrb-likes"))
            .expect("likes segment");
        assert_eq!(dom.style(likes, "width").as_deref(), Some("50%"));
    }

    #[test]
    fn undefined_rating_renders_placeholder_without_opacity_by_default() {
        let mut dom = MemoryDom::new();
        let root = dom.root();
        let thumb = dom.append(root, "a", &[]);
        let settings = UserSettings {
            bar_tooltip: false,
            ..UserSettings::default()
        };
        let bar = render_indicator(&mut dom, thumb, &RatingSummary::from_counts(0, 0), &settings);
        let kids = dom.children(bar);
        assert_eq!(kids.len(), 1);
        assert!(dom.is_tag(kids[0], "ytrb-no-rating"));
        assert_eq!(dom.style(bar, "opacity"), None);
    }

    #[test]
    fn percentage_goes_after_last_span() {
        let mut dom = MemoryDom::new();
        let root = dom.root();
        let line = dom.append(root, "div", &[("id", "metadata-line")]);
        dom.append(line, "span", &[]);
        let views = dom.append(line, "span", &[]);

        let label = render_percentage(&mut dom, line, &RatingSummary::from_counts(9, 1), false, false)
            .expect("label");
        assert_eq!(dom.children(line)[2], label);
        assert_eq!(dom.text(label), "90.0%");
        assert_eq!(dom.children(line)[1], views);

        // a second render replaces rather than stacks
        render_percentage(&mut dom, line, &RatingSummary::from_counts(1, 1), false, false);
        assert_eq!(dom.children(line).len(), 3);
    }

    #[test]
    fn mobile_adds_separator_and_empty_line_gets_blank_span() {
        let mut dom = MemoryDom::new();
        let root = dom.root();
        let line = dom.append(root, "ytm-badge-and-byline-renderer", &[]);
        let anchor = dom.append(line, "span", &[]);
        let label = render_percentage(&mut dom, line, &RatingSummary::from_counts(1, 0), true, true)
            .expect("label");
        let kids = dom.children(line);
        assert_eq!(kids[0], anchor);
        assert!(dom.has_class(kids[1], "ytrb-percentage-separator"));
        assert_eq!(kids[2], label);

        let empty = dom.append(root, "div", &[]);
        let label = render_percentage(&mut dom, empty, &RatingSummary::from_counts(0, 3), false, false)
            .expect("label");
        let kids = dom.children(empty);
        assert_eq!(kids.len(), 2);
        assert_eq!(kids[1], label);
        // zero likes: text only, no coloured inner span
        assert!(dom.children(label).is_empty());
    }

    #[test]
    fn hidden_likes_only_clears_old_labels() {
        let mut dom = MemoryDom::new();
        let root = dom.root();
        let line = dom.append(root, "div", &[]);
        dom.append(line, "span", &[]);
        render_percentage(&mut dom, line, &RatingSummary::from_counts(5, 5), false, false);
        assert_eq!(
            render_percentage(&mut dom, line, &RatingSummary::from_counts(0, 12), false, false),
            None
        );
        assert_eq!(dom.children(line).len(), 1);
    }
}
