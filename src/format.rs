//! Formatting and parsing helpers shared by the indicator, the percentage
//! label and the tooltip augmentation.

use std::fmt;

use crate::rating::RatingSummary;

/// Appended to an augmented tooltip so later scans leave it alone.
pub const TOOLTIP_SENTINEL: char = '\u{200B}';

const NBSP: char = '\u{00A0}';

/// Digits 0..=9 of every numbering system the host page may localize counts
/// into, one string per system.
const NUMBERING_SYSTEM_DIGITS: [&str; 22] = [
    "٠١٢٣٤٥٦٧٨٩",
    "۰۱۲۳۴۵۶۷۸۹",
    "᭐᭑᭒᭓᭔᭕᭖᭗᭘᭙",
    "০১২৩৪৫৬৭৮৯",
    "०१२३४५६७८९",
    "０１２３４５６７８９",
    "૦૧૨૩૪૫૬૭૮૯",
    "੦੧੨੩੪੫੬੭੮੯",
    "〇一二三四五六七八九",
    "០១២៣៤៥៦៧៨៩",
    "೦೧೨೩೪೫೬೭೮೯",
    "໐໑໒໓໔໕໖໗໘໙",
    "0123456789",
    "᥆᥇᥈᥉᥊᥋᥌᥍᥎᥏",
    "൦൧൨൩൪൫൬൭൮൯",
    "᠐᠑᠒᠓᠔᠕᠖᠗᠘᠙",
    "၀၁၂၃၄၅၆၇၈၉",
    "୦୧୨୩୪୫୬୭୮୯",
    "௦௧௨௩௪௫௬௭௮௯",
    "౦౧౨౩౪౫౬౭౮౯",
    "๐๑๒๓๔๕๖๗๘๙",
    "༠༡༢༣༤༥༦༧༨༩",
];

/// Formats a 0..=1 ratio as a percentage with one decimal.
///
/// Truncates instead of rounding, so anything below 1 tops out at `"99.9%"`.
/// Exactly 1 renders as `"100%"`.
pub fn rating_to_display_string(ratio: f64) -> String {
    if ratio >= 1.0 {
        return "100%".to_string();
    }
    let ratio = if ratio.is_nan() { 0.0 } else { ratio.max(0.0) };
    // 0.9999999999999999 * 1000.0 rounds up to 1000.0 in f64.
    let tenths = ((ratio * 1000.0).floor() as u64).min(999);
    format!("{}.{}%", tenths / 10, tenths % 10)
}

/// Parses a localized integer such as `"1,234"`, `"1 234"` or `"١٬٢٣٤"`.
///
/// Returns `None` when nothing digit-like is left after cleanup.
pub fn parse_localized_integer(text: &str) -> Option<u64> {
    let stripped: String = text
        .chars()
        .filter(|c| !(c.is_whitespace() || *c == ',' || *c == '.'))
        .collect();

    let ascii = if stripped.chars().all(|c| c.is_ascii_digit()) {
        stripped
    } else {
        stripped.chars().filter_map(localized_digit).collect()
    };

    if ascii.is_empty() {
        return None;
    }
    ascii.parse().ok()
}

fn localized_digit(c: char) -> Option<char> {
    NUMBERING_SYSTEM_DIGITS.iter().find_map(|digits| {
        digits
            .chars()
            .position(|d| d == c)
            .and_then(|i| char::from_digit(i as u32, 10))
    })
}

/// An sRGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({},{},{})", self.r, self.g, self.b)
    }
}

/// Red below ~20%, green above ~60%, linear in between.
///
/// Not colour-blind neutral; that is a known limitation of the palette.
pub fn color_for_ratio(ratio: f64, is_dark_background: bool) -> Rgb {
    let ratio = ratio.clamp(0.0, 1.0);
    let r = ((1.0 - ratio) * 1275.0).clamp(0.0, 255.0);
    let mut g = (ratio * 637.5 - 255.0).clamp(0.0, 255.0);
    if !is_dark_background {
        g *= 0.85;
    }
    Rgb {
        r: r.round() as u8,
        g: g.round() as u8,
        b: 0,
    }
}

/// Width of the likes segment with exponential scaling, in percent.
pub fn exponential_width_percent(ratio: f64) -> f64 {
    100.0 * 2f64.powf(10.0 * (ratio - 1.0))
}

/// `1234567` -> `"1,234,567"`.
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Text of the indicator tooltip: `likes / dislikes   pct   total total`.
pub fn tooltip_text(summary: &RatingSummary) -> String {
    format!(
        "{likes}{NBSP}/{NBSP}{dislikes} {NBSP}{NBSP} {pct} {NBSP}{NBSP} {total}{NBSP}total",
        likes = group_thousands(summary.likes),
        dislikes = group_thousands(summary.dislikes),
        pct = rating_to_display_string(summary.ratio.unwrap_or(0.0)),
        total = group_thousands(summary.total),
    )
}

/// Suffix appended to a host tooltip, sentinel included.
pub fn tooltip_suffix(summary: &RatingSummary) -> String {
    format!(
        " {NBSP}{NBSP} {pct} {NBSP}{NBSP} {total} total{TOOLTIP_SENTINEL}",
        pct = rating_to_display_string(summary.ratio.unwrap_or(0.0)),
        total = group_thousands(summary.total),
    )
}

/// Keeps only `#` and alphanumerics, so a stored colour cannot smuggle CSS.
pub fn sanitize_hex_color(s: &str) -> String {
    s.chars()
        .filter(|c| *c == '#' || c.is_ascii_alphanumeric())
        .collect()
}
