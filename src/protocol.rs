//! Messages exchanged between the page annotator and the background service.
//!
//! Requests are tagged by `query`; every response is either a likes payload or
//! JSON `null` (no data / nothing to return).

use serde::{Deserialize, Serialize};

use crate::rating::LikesData;

/// Identifies the page (tab) a request came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct PageId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "query")]
pub enum Request {
    #[serde(rename = "getLikesData", alias = "videoApiRequest")]
    GetLikesData {
        #[serde(rename = "videoId")]
        video_id: String,
    },
    #[serde(rename = "insertCss")]
    InsertCss { files: Vec<String> },
    #[serde(rename = "updateSettings")]
    UpdateSettings {
        /// Cache TTL in milliseconds.
        #[serde(rename = "cacheDuration")]
        cache_duration: u64,
    },
}

impl Request {
    pub fn get_likes_data(video_id: impl Into<String>) -> Self {
        Self::GetLikesData {
            video_id: video_id.into(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::GetLikesData { .. } => "getLikesData",
            Self::InsertCss { .. } => "insertCss",
            Self::UpdateSettings { .. } => "updateSettings",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Likes(LikesData),
    /// Serialized as `null`: rating unavailable, or a fire-and-forget ack.
    Empty,
}

impl Response {
    pub fn into_likes(self) -> Option<LikesData> {
        match self {
            Self::Likes(d) => Some(d),
            Self::Empty => None,
        }
    }
}

impl From<Option<LikesData>> for Response {
    fn from(v: Option<LikesData>) -> Self {
        v.map_or(Self::Empty, Self::Likes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn requests_use_query_tag_and_camel_case() {
        let r: Request =
            serde_json::from_value(json!({"query": "getLikesData", "videoId": "abc"})).unwrap();
        assert_eq!(r, Request::get_likes_data("abc"));

        let legacy: Request =
            serde_json::from_value(json!({"query": "videoApiRequest", "videoId": "abc"}))
                .unwrap();
        assert_eq!(legacy, r);

        let upd = Request::UpdateSettings {
            cache_duration: 1000,
        };
        assert_eq!(
            serde_json::to_value(&upd).unwrap(),
            json!({"query": "updateSettings", "cacheDuration": 1000})
        );
    }

    #[test]
    fn empty_response_is_null() {
        assert_eq!(serde_json::to_string(&Response::Empty).unwrap(), "null");
        let r: Response = serde_json::from_str("null").unwrap();
        assert_eq!(r, Response::Empty);
        let r: Response = serde_json::from_str(r#"{"likes":1,"dislikes":2}"#).unwrap();
        assert_eq!(r.into_likes(), Some(LikesData::new(1, 2)));
    }
}
