// tests/format_props.rs
//
// Display and parsing properties over realistic vote counts.

use thumbnail_rating_bar::format::{parse_localized_integer, rating_to_display_string, tooltip_text};
use thumbnail_rating_bar::rating::{derive_ratio, RatingSummary};

#[test]
fn display_is_100_only_for_unanimous_likes() {
    for likes in [1u64, 7, 999, 1_000, 123_456, 9_999_999] {
        for dislikes in [0u64, 1, 2, 13, 500] {
            let ratio = derive_ratio(likes, dislikes).expect("votes present");
            let shown = rating_to_display_string(ratio);
            if dislikes == 0 {
                assert_eq!(shown, "100%");
            } else {
                assert_ne!(shown, "100.0%", "{likes}/{dislikes}");
                assert_ne!(shown, "100%", "{likes}/{dislikes}");
            }
        }
    }
}

#[test]
fn no_votes_means_no_ratio() {
    assert_eq!(derive_ratio(0, 0), None);
    assert_eq!(RatingSummary::from_counts(0, 0).ratio, None);
}

#[test]
fn localized_counts_parse_like_ascii() {
    assert_eq!(parse_localized_integer("١٬٢٣٤"), Some(1234));
    assert_eq!(parse_localized_integer("۱۲۳٬۴۵۶"), Some(123_456));
    assert_eq!(parse_localized_integer("１，２３４"), Some(1234));
    assert_eq!(parse_localized_integer("1.234.567"), Some(1_234_567));
    assert_eq!(parse_localized_integer("๑๒"), Some(12));
}

#[test]
fn tooltip_text_groups_and_uses_nbsp() {
    let text = tooltip_text(&RatingSummary::from_counts(1_234, 56));
    assert_eq!(
        text,
        "1,234\u{a0}/\u{a0}56 \u{a0}\u{a0} 95.6% \u{a0}\u{a0} 1,290\u{a0}total"
    );
}
