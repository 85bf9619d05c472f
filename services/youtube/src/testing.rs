//! In-process stand-in for Google's token endpoint and the parts of the YouTube Data API this
//! service calls. Binds to an ephemeral localhost port; state lives in memory for the lifetime
//! of the test.

use crate::config::{Config, OAuthConfig};
use crate::oauth::AuthorizationContext;
use axum::extract::{Form, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use oauth2::AccessToken;
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub(crate) const CHANNEL_ID: &str = "UC-fake-channel";
pub(crate) const REFRESH_TOKEN: &str = "refresh-token";
const UPLOADS: usize = 5;

#[derive(Default)]
struct FakeState {
    videos: Mutex<HashMap<String, Value>>,
    failing: Mutex<HashSet<String>>,
    issued_tokens: Mutex<HashSet<String>>,
    used_codes: Mutex<HashSet<String>>,
    update_payloads: Mutex<Vec<Value>>,
    last_search_max_results: Mutex<Option<u32>>,
    next_token: AtomicUsize,
    no_channel: AtomicBool,
}

impl FakeState {
    fn issue(&self) -> String {
        let token = format!(
            "access-{}",
            self.next_token.fetch_add(1, Ordering::SeqCst)
        );
        self.issued_tokens.lock().unwrap().insert(token.clone());
        token
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|t| self.issued_tokens.lock().unwrap().contains(t))
    }
}

pub(crate) struct FakeYouTube {
    addr: SocketAddr,
    state: Arc<FakeState>,
}

impl FakeYouTube {
    pub(crate) async fn start() -> Self {
        let state = Arc::new(FakeState::default());
        {
            let mut videos = state.videos.lock().unwrap();
            for id in ["V1", "A", "B", "C", "D", "E"] {
                videos.insert(id.to_string(), seed_video(id));
            }
        }

        let app = Router::new()
            .route("/token", post(token))
            .route("/youtube/v3/videos", get(list_videos).put(update_video))
            .route("/youtube/v3/channels", get(list_channels))
            .route("/youtube/v3/search", get(search))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake YouTube server");
        let addr = listener.local_addr().expect("fake YouTube server address");
        tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("fake YouTube server");
        });

        Self { addr, state }
    }

    pub(crate) fn api_base(&self) -> String {
        format!("http://{}/youtube/v3", self.addr)
    }

    pub(crate) fn config(&self) -> Config {
        Config {
            oauth: OAuthConfig {
                client_id: "client-id".into(),
                client_secret: "client-secret".into(),
                redirect_uri: "http://localhost:3000/api/youtube/auth/callback".into(),
                auth_url: format!("http://{}/auth", self.addr),
                token_url: format!("http://{}/token", self.addr),
            },
            port: 0,
            bulk_concurrency: 2,
            request_timeout: Duration::from_secs(5),
            api_base: self.api_base(),
            token_file: None,
        }
    }

    pub(crate) fn authorization_context(&self) -> AuthorizationContext {
        AuthorizationContext::new(&self.config().oauth, reqwest::Client::new())
            .expect("valid fake OAuth config")
    }

    /// Mints a token without going through the code exchange.
    pub(crate) fn issue_access_token(&self) -> AccessToken {
        AccessToken::new(self.state.issue())
    }

    pub(crate) fn is_issued(&self, token: &AccessToken) -> bool {
        self.state
            .issued_tokens
            .lock()
            .unwrap()
            .contains(token.secret())
    }

    /// Makes every `videos.update` for `video_id` fail with a quota error.
    pub(crate) fn fail_updates_for(&self, video_id: &str) {
        self.state
            .failing
            .lock()
            .unwrap()
            .insert(video_id.to_string());
    }

    /// Bodies received by `videos.update`, in arrival order.
    pub(crate) fn update_payloads(&self) -> Vec<Value> {
        self.state.update_payloads.lock().unwrap().clone()
    }

    /// Makes `channels.list?mine=true` come back empty, as for an account without a channel.
    pub(crate) fn remove_channel(&self) {
        self.state.no_channel.store(true, Ordering::SeqCst);
    }

    pub(crate) fn video(&self, video_id: &str) -> Option<Value> {
        self.state.videos.lock().unwrap().get(video_id).cloned()
    }

    pub(crate) fn last_search_max_results(&self) -> Option<u32> {
        *self.state.last_search_max_results.lock().unwrap()
    }
}

fn seed_video(id: &str) -> Value {
    let (title, description) = if id == "V1" {
        ("Original title".to_string(), "Original description".to_string())
    } else {
        (format!("Video {id}"), format!("Description of {id}"))
    };
    json!({
        "kind": "youtube#video",
        "id": id,
        "snippet": {
            "publishedAt": "2024-01-01T00:00:00Z",
            "channelId": CHANNEL_ID,
            "title": title,
            "description": description,
            "tags": ["old"],
            "categoryId": "22",
        },
        "status": { "privacyStatus": "public", "uploadStatus": "processed" },
        "statistics": { "viewCount": "10", "likeCount": "1", "commentCount": "0" },
    })
}

fn google_error(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(json!({ "error": { "code": status.as_u16(), "message": message } })),
    )
        .into_response()
}

fn unauthorized() -> Response {
    google_error(
        StatusCode::UNAUTHORIZED,
        "Request had invalid authentication credentials.",
    )
}

fn invalid_grant() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": "invalid_grant", "error_description": "Bad Request" })),
    )
        .into_response()
}

async fn token(
    State(state): State<Arc<FakeState>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    match form.get("grant_type").map(String::as_str) {
        Some("authorization_code") => {
            let code = form.get("code").cloned().unwrap_or_default();
            let fresh = code.starts_with("valid") && state.used_codes.lock().unwrap().insert(code);
            if !fresh {
                return invalid_grant();
            }
            Json(json!({
                "access_token": state.issue(),
                "refresh_token": REFRESH_TOKEN,
                "token_type": "Bearer",
                "expires_in": 3599,
                "scope": crate::oauth::YOUTUBE_SCOPES.join(" "),
            }))
            .into_response()
        }
        Some("refresh_token") => {
            if form.get("refresh_token").map(String::as_str) != Some(REFRESH_TOKEN) {
                return invalid_grant();
            }
            Json(json!({
                "access_token": state.issue(),
                "token_type": "Bearer",
                "expires_in": 3599,
            }))
            .into_response()
        }
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "unsupported_grant_type" })),
        )
            .into_response(),
    }
}

async fn list_videos(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if !state.authorized(&headers) {
        return unauthorized();
    }
    let items: Vec<Value> = query
        .get("id")
        .and_then(|id| state.videos.lock().unwrap().get(id).cloned())
        .into_iter()
        .collect();
    Json(json!({
        "kind": "youtube#videoListResponse",
        "pageInfo": { "totalResults": items.len(), "resultsPerPage": items.len() },
        "items": items,
    }))
    .into_response()
}

async fn update_video(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !state.authorized(&headers) {
        return unauthorized();
    }
    state.update_payloads.lock().unwrap().push(body.clone());

    let id = body["id"].as_str().unwrap_or_default().to_string();
    // slow ids finish after the ones behind them; hanging ones outlast any test timeout
    let delay = if id.ends_with("hang") {
        2_000
    } else if id.ends_with("slow") {
        50
    } else {
        5
    };
    tokio::time::sleep(Duration::from_millis(delay)).await;

    if state.failing.lock().unwrap().contains(&id) {
        return google_error(
            StatusCode::FORBIDDEN,
            "The request cannot be completed because you have exceeded your quota.",
        );
    }

    let mut videos = state.videos.lock().unwrap();
    let Some(video) = videos.get_mut(&id) else {
        return google_error(StatusCode::NOT_FOUND, "Video not found");
    };
    if let (Some(stored), Some(patch)) = (
        video["snippet"].as_object_mut(),
        body["snippet"].as_object(),
    ) {
        for (field, value) in patch {
            stored.insert(field.clone(), value.clone());
        }
    }
    Json(json!({
        "kind": "youtube#video",
        "id": id,
        "snippet": video["snippet"].clone(),
    }))
    .into_response()
}

async fn list_channels(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if !state.authorized(&headers) {
        return unauthorized();
    }
    if query.get("mine").map(String::as_str) != Some("true") {
        return google_error(StatusCode::BAD_REQUEST, "No filter selected.");
    }
    let items = if state.no_channel.load(Ordering::SeqCst) {
        json!([])
    } else {
        json!([{ "kind": "youtube#channel", "id": CHANNEL_ID }])
    };
    let total = items.as_array().map_or(0, Vec::len);
    Json(json!({
        "kind": "youtube#channelListResponse",
        "pageInfo": { "totalResults": total, "resultsPerPage": total },
        "items": items,
    }))
    .into_response()
}

/// Serves the channel's uploads newest first, `upload-5` down to `upload-1`.
async fn search(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if !state.authorized(&headers) {
        return unauthorized();
    }
    if query.get("channelId").map(String::as_str) != Some(CHANNEL_ID)
        || query.get("type").map(String::as_str) != Some("video")
        || query.get("order").map(String::as_str) != Some("date")
    {
        return google_error(StatusCode::BAD_REQUEST, "unexpected search parameters");
    }

    let max_results: usize = query
        .get("maxResults")
        .and_then(|m| m.parse().ok())
        .unwrap_or(5);
    *state.last_search_max_results.lock().unwrap() = Some(max_results as u32);
    let offset: usize = match query.get("pageToken") {
        None => 0,
        Some(token) => match token.strip_prefix("page-").and_then(|o| o.parse().ok()) {
            Some(offset) => offset,
            None => return google_error(StatusCode::BAD_REQUEST, "Invalid page token."),
        },
    };

    let end = (offset + max_results).min(UPLOADS);
    let items: Vec<Value> = (offset..end)
        .map(|i| {
            let n = UPLOADS - i;
            json!({
                "kind": "youtube#searchResult",
                "id": { "kind": "youtube#video", "videoId": format!("upload-{n}") },
                "snippet": {
                    "publishedAt": format!("2024-01-0{n}T00:00:00Z"),
                    "channelId": CHANNEL_ID,
                    "title": format!("Upload {n}"),
                    "description": "",
                },
            })
        })
        .collect();

    let mut page = json!({
        "kind": "youtube#searchListResponse",
        "regionCode": "US",
        "pageInfo": { "totalResults": UPLOADS, "resultsPerPage": max_results },
        "items": items,
    });
    if end < UPLOADS {
        page["nextPageToken"] = json!(format!("page-{end}"));
    }
    if offset > 0 {
        page["prevPageToken"] = json!(format!("page-{}", offset.saturating_sub(max_results)));
    }
    Json(page).into_response()
}
