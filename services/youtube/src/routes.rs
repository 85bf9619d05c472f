//! HTTP surface of the service.

use crate::bulk::{self, BulkOutcome, BulkUpdater};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::oauth::{AuthorizationContext, YOUTUBE_SCOPES};
use crate::youtube_api::{MAX_RESULTS_LIMIT, SearchListResponse, Video, VideoUpdate, YouTubeClient};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{FromRequest, Path, Query, Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use eyre::Context;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Where the server binary mounts [`router`].
pub const API_PREFIX: &str = "/api/youtube";

#[derive(Debug, Clone)]
pub struct AppState {
    pub auth: Arc<AuthorizationContext>,
    pub youtube: YouTubeClient,
    pub bulk: BulkUpdater<YouTubeClient>,
}

impl AppState {
    pub async fn from_config(config: &Config) -> eyre::Result<Self> {
        let http = reqwest::Client::builder()
            // SSRF no thank you.
            .redirect(reqwest::redirect::Policy::none())
            .timeout(config.request_timeout)
            .build()
            .context("build HTTP client")?;

        let mut auth = AuthorizationContext::new(&config.oauth, http.clone())
            .context("configure OAuth client")?;
        if let Some(path) = &config.token_file {
            auth = auth.with_token_file(path.clone());
        }
        if let Err(e) = auth.restore().await {
            tracing::warn!("ignoring stored credential: {e:#}");
        }

        let youtube = YouTubeClient::new(http, config.api_base.clone());
        Ok(Self {
            auth: Arc::new(auth),
            bulk: BulkUpdater::new(youtube.clone(), config.bulk_concurrency),
            youtube,
        })
    }
}

/// The full application: [`router`] under [`API_PREFIX`], with CORS and request tracing.
pub fn app(state: AppState) -> Router {
    Router::new()
        .nest(API_PREFIX, router(state))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/auth", get(auth_url))
        .route("/auth/callback", post(auth_callback))
        .route("/videos/bulk-update", post(bulk_update))
        .route("/videos/{video_id}", get(get_video).put(update_video))
        .route("/videos/{video_id}/thumbnail", post(update_thumbnail))
        .route("/channel/videos", get(channel_videos))
        .with_state(state)
}

/// JSON body extractor that rejects undecodable bodies as [`Error::Validation`], so they render
/// as `400 {error}` like every other error.
#[derive(Debug, Clone, Copy)]
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(inner) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| {
                Error::Validation(format!("invalid request body: {}", rejection.body_text()))
            })?;
        Ok(JsonBody(inner))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthUrlResponse {
    auth_url: String,
}

async fn auth_url(State(state): State<AppState>) -> Json<AuthUrlResponse> {
    Json(AuthUrlResponse {
        auth_url: state.auth.authorization_url(&YOUTUBE_SCOPES),
    })
}

#[derive(Debug, Deserialize)]
struct CallbackRequest {
    #[serde(default)]
    code: String,
}

#[derive(Debug, Serialize)]
struct CallbackResponse {
    success: bool,
    message: &'static str,
}

async fn auth_callback(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<CallbackRequest>,
) -> Response {
    match state.auth.exchange_code(&request.code).await {
        Ok(_) => Json(CallbackResponse {
            success: true,
            message: "Authentication successful",
        })
        .into_response(),
        // a bad code is the caller's mistake, not a missing login
        Err(e) => e.with_status(StatusCode::BAD_REQUEST),
    }
}

async fn get_video(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> Result<Json<Video>> {
    let token = state.auth.access_token().await?;
    let video = state.youtube.get_video(&token, &video_id).await?;
    Ok(Json(video))
}

#[derive(Debug, Serialize)]
struct UpdateVideoResponse {
    success: bool,
    video: Video,
    message: &'static str,
}

async fn update_video(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    JsonBody(mut update): JsonBody<VideoUpdate>,
) -> Result<Json<UpdateVideoResponse>> {
    // only the four editable fields are accepted here
    update.other.clear();
    let update = update.normalized();
    if update.is_empty() {
        return Err(Error::Validation(
            "request must set at least one of title, description, tags, categoryId".to_string(),
        ));
    }
    let token = state.auth.access_token().await?;
    let video = state.youtube.update_video(&token, &video_id, &update).await?;
    Ok(Json(UpdateVideoResponse {
        success: true,
        video,
        message: "Video updated successfully",
    }))
}

#[derive(Debug, Deserialize)]
struct BulkUpdateRequest {
    videos: Vec<String>,
    #[serde(default)]
    updates: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct BulkUpdateResponse {
    results: Vec<BulkOutcome>,
}

/// Malformed input is the only request-level failure and answers `500 {error}`. Everything
/// else, a missing credential included, is reported per video in `results`.
async fn bulk_update(
    State(state): State<AppState>,
    request: Result<JsonBody<BulkUpdateRequest>, Error>,
) -> Response {
    let (video_ids, update) = match parse_bulk_request(request) {
        Ok(parsed) => parsed,
        Err(e) => return e.with_status(StatusCode::INTERNAL_SERVER_ERROR),
    };

    let results = match state.auth.access_token().await {
        Ok(token) => match state.bulk.bulk_update(&token, &video_ids, &update).await {
            Ok(results) => results,
            Err(e) => return e.with_status(StatusCode::INTERNAL_SERVER_ERROR),
        },
        Err(e) => {
            tracing::warn!(
                videos = video_ids.len(),
                error = %e,
                "bulk update without usable credential"
            );
            bulk::fail_all(&video_ids, &e)
        }
    };
    Json(BulkUpdateResponse { results }).into_response()
}

fn parse_bulk_request(
    request: Result<JsonBody<BulkUpdateRequest>, Error>,
) -> Result<(Vec<String>, VideoUpdate)> {
    let JsonBody(request) = request?;
    let update = bulk::parse_update(request.updates)?;
    bulk::validate(&request.videos, &update)?;
    Ok((request.videos, update))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelVideosQuery {
    max_results: Option<u32>,
    page_token: Option<String>,
}

async fn channel_videos(
    State(state): State<AppState>,
    query: Result<Query<ChannelVideosQuery>, QueryRejection>,
) -> Result<Json<SearchListResponse>> {
    let Query(query) =
        query.map_err(|e| Error::Validation(format!("invalid query: {}", e.body_text())))?;
    let page_token = query.page_token.as_deref().filter(|t| !t.is_empty());
    let max_results = query.max_results.unwrap_or(MAX_RESULTS_LIMIT);

    let token = state.auth.access_token().await?;
    let page = state
        .youtube
        .list_channel_videos(&token, page_token, max_results)
        .await?;
    Ok(Json(page))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThumbnailRequest {
    #[serde(default)]
    thumbnail_url: Option<String>,
}

#[derive(Debug, Serialize)]
struct ThumbnailResponse {
    success: bool,
    message: &'static str,
    note: &'static str,
}

/// Acknowledges a thumbnail change without performing it.
///
/// Nothing is uploaded; YouTube's `thumbnails.set` takes the image bytes themselves, which this
/// endpoint does not receive.
async fn update_thumbnail(
    Path(video_id): Path<String>,
    JsonBody(request): JsonBody<ThumbnailRequest>,
) -> Json<ThumbnailResponse> {
    tracing::debug!(
        %video_id,
        thumbnail_url = request.thumbnail_url.as_deref(),
        "thumbnail update requested"
    );
    Json(ThumbnailResponse {
        success: true,
        message: "Thumbnail update endpoint ready",
        note: "Thumbnail upload is not implemented yet",
    })
}
