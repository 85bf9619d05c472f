//! Applies one sparse update across many videos.
//!
//! Every video is updated by its own `videos.update` call. Outcomes are recorded per video, in
//! input order: one video failing never stops, skips or changes the update of any other, and
//! there is no rollback of videos that did succeed.

use crate::error::{Error, Result};
use crate::youtube_api::{Video, VideoUpdate, YouTubeClient};
use futures::stream::{self, StreamExt};
use oauth2::AccessToken;
use serde::{Serialize, Serializer};
use std::future::Future;

/// The single remote operation the bulk updater fans out.
pub trait UpdateVideo: Send + Sync {
    fn update_video(
        &self,
        token: &AccessToken,
        video_id: &str,
        update: &VideoUpdate,
    ) -> impl Future<Output = Result<Video>> + Send;
}

impl UpdateVideo for YouTubeClient {
    fn update_video(
        &self,
        token: &AccessToken,
        video_id: &str,
        update: &VideoUpdate,
    ) -> impl Future<Output = Result<Video>> + Send {
        YouTubeClient::update_video(self, token, video_id, update)
    }
}

/// What happened to one video of a bulk update.
#[derive(Debug, Clone, PartialEq)]
pub enum BulkOutcome {
    Success { video_id: String, video: Video },
    Failure { video_id: String, error: String },
}

impl BulkOutcome {
    pub fn video_id(&self) -> &str {
        match self {
            BulkOutcome::Success { video_id, .. } | BulkOutcome::Failure { video_id, .. } => {
                video_id
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, BulkOutcome::Success { .. })
    }
}

/// Wire shape: `{videoId, success: true, data}` or `{videoId, success: false, error}`.
impl Serialize for BulkOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Wire<'a> {
            video_id: &'a str,
            success: bool,
            #[serde(skip_serializing_if = "Option::is_none")]
            data: Option<&'a Video>,
            #[serde(skip_serializing_if = "Option::is_none")]
            error: Option<&'a str>,
        }

        match self {
            BulkOutcome::Success { video_id, video } => Wire {
                video_id,
                success: true,
                data: Some(video),
                error: None,
            },
            BulkOutcome::Failure { video_id, error } => Wire {
                video_id,
                success: false,
                data: None,
                error: Some(error),
            },
        }
        .serialize(serializer)
    }
}

/// Parses the `updates` object of a bulk request.
pub fn parse_update(updates: serde_json::Value) -> Result<VideoUpdate> {
    if !updates.is_object() {
        return Err(Error::Validation("updates must be a JSON object".to_string()));
    }
    let update: VideoUpdate = serde_json::from_value(updates)
        .map_err(|e| Error::Validation(format!("invalid updates: {e}")))?;
    Ok(update.normalized())
}

/// Rejects bulk input that cannot be processed at all.
pub fn validate(video_ids: &[String], update: &VideoUpdate) -> Result<()> {
    if video_ids.is_empty() {
        return Err(Error::Validation(
            "videos must be a non-empty list of video IDs".to_string(),
        ));
    }
    if update.is_empty() {
        return Err(Error::Validation(
            "updates must contain at least one field".to_string(),
        ));
    }
    Ok(())
}

/// Fans a [`VideoUpdate`] out over many videos with at most `concurrency` calls in flight.
#[derive(Debug, Clone)]
pub struct BulkUpdater<C> {
    client: C,
    concurrency: usize,
}

impl<C: UpdateVideo> BulkUpdater<C> {
    pub fn new(client: C, concurrency: usize) -> Self {
        Self {
            client,
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Updates every video in `video_ids` with `update`.
    ///
    /// Returns one outcome per input ID, in input order, whatever order the calls complete in.
    /// Duplicate IDs are updated once per occurrence. Only malformed input fails the whole call.
    #[tracing::instrument(skip_all, fields(videos = video_ids.len(), concurrency = self.concurrency))]
    pub async fn bulk_update(
        &self,
        token: &AccessToken,
        video_ids: &[String],
        update: &VideoUpdate,
    ) -> Result<Vec<BulkOutcome>> {
        validate(video_ids, update)?;

        // collect first: mapping inside the stream with a closure over these borrows makes the
        // returned future non-`Send`
        let updates: Vec<_> = video_ids
            .iter()
            .map(|video_id| self.update_one(token, video_id, update))
            .collect();
        let outcomes: Vec<BulkOutcome> = stream::iter(updates)
            .buffered(self.concurrency)
            .collect()
            .await;

        let failed = outcomes.iter().filter(|o| !o.is_success()).count();
        tracing::info!(
            succeeded = outcomes.len() - failed,
            failed,
            "bulk update finished"
        );

        Ok(outcomes)
    }

    async fn update_one(
        &self,
        token: &AccessToken,
        video_id: &String,
        update: &VideoUpdate,
    ) -> BulkOutcome {
        match self.client.update_video(token, video_id, update).await {
            Ok(video) => BulkOutcome::Success {
                video_id: video_id.clone(),
                video,
            },
            Err(e) => {
                tracing::warn!(%video_id, error = %e, "bulk update of video failed");
                BulkOutcome::Failure {
                    video_id: video_id.clone(),
                    error: e.to_string(),
                }
            }
        }
    }
}

/// Records the same failure for every video, as when no update could be attempted at all.
pub fn fail_all(video_ids: &[String], error: &Error) -> Vec<BulkOutcome> {
    video_ids
        .iter()
        .map(|video_id| BulkOutcome::Failure {
            video_id: video_id.clone(),
            error: error.to_string(),
        })
        .collect()
}
