//! Core YouTube API client functionality.

use crate::error::{Error, Result};
use crate::youtube_api::{
    channels::{Channel, ChannelListResponse},
    search::SearchListResponse,
    types::GoogleErrorEnvelope,
    videos::{Video, VideoListResponse, VideoUpdate, VideoUpdateRequest},
};
use http::{Method, StatusCode};
use oauth2::AccessToken;
use serde::Serialize;
use tracing::instrument;

/// `search.list` refuses page sizes above this.
pub const MAX_RESULTS_LIMIT: u32 = 50;

/// Client for interacting with the YouTube Data API v3.
///
/// The client holds no credential of its own. Every call takes the bearer token to use, which the
/// caller obtains from the [`AuthorizationContext`](crate::oauth::AuthorizationContext) once per
/// request.
#[derive(Debug, Clone)]
pub struct YouTubeClient {
    client: reqwest::Client,
    /// Base URL of the Data API, without a trailing slash.
    api_base: String,
}

impl YouTubeClient {
    pub fn new(client: reqwest::Client, api_base: impl Into<String>) -> Self {
        Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, resource: &str) -> String {
        format!("{}/{resource}", self.api_base)
    }

    /// Makes an authenticated HTTP request to the YouTube API with common error handling.
    ///
    /// Non-2xx responses are classified into the crate's error taxonomy: 401 is an
    /// [`Error::Auth`], 404 an [`Error::NotFound`], anything else an [`Error::ExternalApi`]
    /// carrying the status and Google's error message.
    #[instrument(skip(self, token, json_body), level = tracing::Level::TRACE)]
    async fn make_authenticated_request(
        &self,
        token: &AccessToken,
        method: Method,
        url: &str,
        query_params: &[(&str, &str)],
        json_body: Option<&impl Serialize>,
    ) -> Result<reqwest::Response> {
        let mut request = self
            .client
            .request(method.clone(), url)
            .bearer_auth(token.secret())
            .query(query_params);

        if let Some(body) = json_body {
            request = request.json(body);
        }

        let response = request.send().await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "unknown error".to_string());
        let message = serde_json::from_str::<GoogleErrorEnvelope>(&body)
            .map(|envelope| envelope.error.message)
            .ok()
            .filter(|m| !m.is_empty())
            .unwrap_or(body);

        Err(match status {
            StatusCode::UNAUTHORIZED => Error::Auth(message),
            StatusCode::NOT_FOUND => Error::NotFound(message),
            _ => Error::ExternalApi(format!(
                "YouTube API {method} request failed with status {status}: {message}"
            )),
        })
    }

    async fn parse<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
        what: &str,
    ) -> Result<T> {
        response
            .json()
            .await
            .map_err(|e| Error::ExternalApi(format!("parse YouTube {what} response: {e}")))
    }

    /// Fetches one video's snippet, statistics and status.
    ///
    /// # API Reference
    ///
    /// <https://developers.google.com/youtube/v3/docs/videos/list>
    #[instrument(skip(self, token))]
    pub async fn get_video(&self, token: &AccessToken, video_id: &str) -> Result<Video> {
        let url = self.endpoint("videos");
        let query_params = [("part", "snippet,statistics,status"), ("id", video_id)];

        let response = self
            .make_authenticated_request(token, Method::GET, &url, &query_params, None::<&()>)
            .await?;
        let videos: VideoListResponse = Self::parse(response, "videos").await?;

        tracing::debug!(
            video_id,
            returned_items = videos.items.len(),
            "fetched video"
        );

        videos
            .items
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotFound("Video not found".to_string()))
    }

    /// Applies a sparse snippet update to one video.
    ///
    /// The outgoing body contains the video ID and exactly the fields present in `update`.
    ///
    /// # Required Scopes
    ///
    /// * `https://www.googleapis.com/auth/youtube`
    /// * `https://www.googleapis.com/auth/youtube.force-ssl`
    ///
    /// # API Reference
    ///
    /// <https://developers.google.com/youtube/v3/docs/videos/update>
    #[instrument(skip(self, token))]
    pub async fn update_video(
        &self,
        token: &AccessToken,
        video_id: &str,
        update: &VideoUpdate,
    ) -> Result<Video> {
        let url = self.endpoint("videos");
        let body = VideoUpdateRequest {
            id: video_id,
            snippet: update,
        };

        let response = self
            .make_authenticated_request(token, Method::PUT, &url, &[("part", "snippet")], Some(&body))
            .await?;
        let video: Video = Self::parse(response, "videos.update").await?;

        tracing::debug!(video_id, "updated video snippet");

        Ok(video)
    }

    /// Resolves the channel owned by the authenticated user.
    ///
    /// An account without a channel is an [`Error::NotFound`].
    ///
    /// # API Reference
    ///
    /// <https://developers.google.com/youtube/v3/docs/channels/list>
    #[instrument(skip(self, token))]
    pub async fn my_channel(&self, token: &AccessToken) -> Result<Channel> {
        let url = self.endpoint("channels");
        let query_params = [("part", "id"), ("mine", "true"), ("maxResults", "1")];

        let response = self
            .make_authenticated_request(token, Method::GET, &url, &query_params, None::<&()>)
            .await?;
        let mut channels: ChannelListResponse = Self::parse(response, "channels").await?;

        tracing::debug!(
            total_results = channels.page_info.total_results,
            returned_items = channels.items.len(),
            "fetched channels"
        );

        channels.items.pop_front().ok_or_else(|| {
            Error::NotFound("no YouTube channel found for the authorized account".to_string())
        })
    }

    /// Lists the authorized user's uploads, newest first.
    ///
    /// The user's channel is resolved first (`channels.list` with `mine=true`), then searched
    /// with `order=date`. `page_token` is forwarded unmodified so a caller can continue from a
    /// previous response's `nextPageToken`; `max_results` is clamped to what the API accepts.
    ///
    /// # API Reference
    ///
    /// <https://developers.google.com/youtube/v3/docs/search/list>
    #[instrument(skip(self, token))]
    pub async fn list_channel_videos(
        &self,
        token: &AccessToken,
        page_token: Option<&str>,
        max_results: u32,
    ) -> Result<SearchListResponse> {
        let channel_id = self.my_channel(token).await?.id;

        let url = self.endpoint("search");
        let max_results = max_results.min(MAX_RESULTS_LIMIT).to_string();
        let mut query_params = vec![
            ("part", "snippet"),
            ("channelId", channel_id.as_str()),
            ("type", "video"),
            ("order", "date"),
            ("maxResults", max_results.as_str()),
        ];
        if let Some(page_token) = page_token {
            query_params.push(("pageToken", page_token));
        }

        let response = self
            .make_authenticated_request(token, Method::GET, &url, &query_params, None::<&()>)
            .await?;
        let page: SearchListResponse = Self::parse(response, "search").await?;

        tracing::debug!(
            %channel_id,
            returned_items = page.items.len(),
            has_next_page = page.next_page_token.is_some(),
            "fetched channel videos"
        );

        Ok(page)
    }
}
