//! # Rating model
//! Like/dislike counts as they cross the service boundary, the cached
//! [`VideoRating`] value, and the annotator-side [`RatingSummary`].

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Minimum dislike count for the hidden-likes heuristic to fire.
pub const HIDDEN_LIKES_MIN_DISLIKES: u64 = 10;

/// Raw counts returned by the rating provider and sent back to the page.
///
/// Extra fields of the remote payload (`rating`, `viewCount`, ...) are ignored.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct LikesData {
    pub likes: u64,
    pub dislikes: u64,
}

impl LikesData {
    pub fn new(likes: u64, dislikes: u64) -> Self {
        Self { likes, dislikes }
    }
}

/// likes / (likes + dislikes), or `None` when nobody voted.
pub fn derive_ratio(likes: u64, dislikes: u64) -> Option<f64> {
    let total = likes.saturating_add(dislikes);
    if total == 0 {
        None
    } else {
        Some(likes as f64 / total as f64)
    }
}

/// Cache entry for one content id. Immutable once written.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoRating {
    pub content_id: String,
    pub likes: u64,
    pub dislikes: u64,
    pub derived_ratio: Option<f64>,
    pub fetched_at: Instant,
}

impl VideoRating {
    pub fn new(content_id: impl Into<String>, data: LikesData, fetched_at: Instant) -> Self {
        Self {
            content_id: content_id.into(),
            likes: data.likes,
            dislikes: data.dislikes,
            derived_ratio: derive_ratio(data.likes, data.dislikes),
            fetched_at,
        }
    }

    pub fn likes_data(&self) -> LikesData {
        LikesData::new(self.likes, self.dislikes)
    }
}

/// What the annotator renders from: counts plus the derived total and ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingSummary {
    pub likes: u64,
    pub dislikes: u64,
    pub total: u64,
    pub ratio: Option<f64>,
}

impl RatingSummary {
    pub fn from_counts(likes: u64, dislikes: u64) -> Self {
        Self {
            likes,
            dislikes,
            total: likes.saturating_add(dislikes),
            ratio: derive_ratio(likes, dislikes),
        }
    }
}

impl From<LikesData> for RatingSummary {
    fn from(d: LikesData) -> Self {
        Self::from_counts(d.likes, d.dislikes)
    }
}

/// Zero likes with a pile of dislikes usually means the creator hid the like
/// count, so the percentage would be misleading.
///
/// Heuristic only: there is no upstream contract for it.
pub fn like_count_hidden_by_creator(summary: &RatingSummary) -> bool {
    summary.likes == 0 && summary.dislikes >= HIDDEN_LIKES_MIN_DISLIKES
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_votes_has_no_ratio() {
        let s = RatingSummary::from_counts(0, 0);
        assert_eq!(s.total, 0);
        assert!(s.ratio.is_none());
        assert!(derive_ratio(0, 0).is_none());
    }

    #[test]
    fn ratio_is_likes_over_total() {
        let s = RatingSummary::from_counts(3, 1);
        assert_eq!(s.total, 4);
        assert_eq!(s.ratio, Some(0.75));
    }

    #[test]
    fn hidden_likes_heuristic_needs_ten_dislikes() {
        assert!(!like_count_hidden_by_creator(&RatingSummary::from_counts(0, 9)));
        assert!(like_count_hidden_by_creator(&RatingSummary::from_counts(0, 10)));
        assert!(!like_count_hidden_by_creator(&RatingSummary::from_counts(1, 500)));
    }

    #[test]
    fn likes_data_ignores_extra_api_fields() {
        let raw = r#"{"id":"abc","likes":12,"dislikes":3,"rating":4.2,"viewCount":99}"#;
        let d: LikesData = serde_json::from_str(raw).unwrap();
        assert_eq!(d, LikesData::new(12, 3));
    }
}
