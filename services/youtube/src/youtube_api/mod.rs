//! YouTube Data API v3 client library.
//!
//! Covers the handful of endpoints the metadata service needs: reading a video, updating a
//! video's snippet, and listing the authorized user's uploads one page at a time.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use youtube_metadata::youtube_api::{VideoUpdate, YouTubeClient};
//!
//! # async fn example(token: oauth2::AccessToken) -> Result<(), youtube_metadata::error::Error> {
//! let client = YouTubeClient::new(reqwest::Client::new(), "https://www.googleapis.com/youtube/v3");
//! let video = client.get_video(&token, "dQw4w9WgXcQ").await?;
//! println!("{}: {:?}", video.snippet.title, video.snippet.tags);
//!
//! let update = VideoUpdate::title("A better title");
//! client.update_video(&token, &video.id, &update).await?;
//! # Ok(())
//! # }
//! ```

pub mod channels;
pub mod client;
pub mod search;
pub mod types;
pub mod videos;

pub use client::{MAX_RESULTS_LIMIT, YouTubeClient};
pub use types::PageInfo;

pub use channels::{Channel, ChannelSnippet};
pub use search::{SearchListResponse, SearchResult, SearchResultId, SearchResultSnippet};
pub use videos::{PrivacyStatus, Video, VideoSnippet, VideoStatistics, VideoStatus, VideoUpdate};
