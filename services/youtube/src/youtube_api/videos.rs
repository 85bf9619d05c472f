//! YouTube Videos API types.

use crate::youtube_api::types::PageInfo;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::VecDeque;

/// Response structure for the `videos.list` API call.
///
/// See: <https://developers.google.com/youtube/v3/docs/videos/list>
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoListResponse {
    /// A list of videos that match the request criteria.
    pub items: VecDeque<Video>,
    #[serde(default)]
    pub page_info: PageInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

/// A `video` resource represents a YouTube video.
///
/// Parts that this service does not interpret are kept verbatim in `other` so that callers see
/// the full resource as YouTube returned it.
///
/// See: <https://developers.google.com/youtube/v3/docs/videos#resource>
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    /// The ID that YouTube uses to uniquely identify the video.
    pub id: String,
    pub snippet: VideoSnippet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<VideoStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statistics: Option<VideoStatistics>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// Basic details about a video.
///
/// See: <https://developers.google.com/youtube/v3/docs/videos#snippet>
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSnippet {
    /// The video's title.
    #[serde(default)]
    pub title: String,
    /// The video's description.
    #[serde(default)]
    pub description: String,
    /// Keyword tags associated with the video.
    #[serde(default)]
    pub tags: Vec<String>,
    /// The YouTube video category associated with the video.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<Timestamp>,
    /// Thumbnails, localizations and anything else not modelled above.
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// See: <https://developers.google.com/youtube/v3/docs/videos#status>
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub privacy_status: Option<PrivacyStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_status: Option<String>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PrivacyStatus {
    Private,
    Public,
    Unlisted,
}

/// Statistics about the video.
///
/// The API reports counts as decimal strings.
///
/// See: <https://developers.google.com/youtube/v3/docs/videos#statistics>
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoStatistics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_count: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub like_count: Option<String>,
    /// Only visible to the video owner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dislike_count: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favorite_count: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment_count: Option<String>,
}

/// A sparse update to a video's snippet.
///
/// Only the fields that are present are sent to YouTube; absent fields never appear in the
/// outgoing payload. Snippet fields beyond the four named ones are passed through as given.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl VideoUpdate {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    /// Drops fields that carry no value.
    ///
    /// Blank strings and JSON `null` count as "not provided", so they can never clear the
    /// corresponding field on the remote video.
    pub fn normalized(mut self) -> Self {
        fn keep(field: Option<String>) -> Option<String> {
            field.filter(|v| !v.trim().is_empty())
        }
        self.title = keep(self.title);
        self.description = keep(self.description);
        self.category_id = keep(self.category_id);
        self.other.retain(|_, v| !v.is_null());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.tags.is_none()
            && self.category_id.is_none()
            && self.other.is_empty()
    }
}

/// Request body for `videos.update` with `part=snippet`.
///
/// See: <https://developers.google.com/youtube/v3/docs/videos/update>
#[derive(Debug, Serialize)]
pub(crate) struct VideoUpdateRequest<'a> {
    pub id: &'a str,
    pub snippet: &'a VideoUpdate,
}
