//! Error taxonomy shared by the authorization context, the YouTube client and the HTTP layer.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Missing, invalid or expired credential or authorization code.
    #[error("{0}")]
    Auth(String),
    /// The remote entity does not exist.
    #[error("{0}")]
    NotFound(String),
    /// YouTube rejected the call (validation, quota, permission) or could not be reached.
    #[error("{0}")]
    ExternalApi(String),
    /// Malformed local input.
    #[error("{0}")]
    Validation(String),
}

impl Error {
    pub fn no_active_credential() -> Self {
        Self::Auth("no active credential".to_string())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Auth(_) => StatusCode::UNAUTHORIZED,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::ExternalApi(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Renders this error with an explicit status instead of the default mapping.
    pub fn with_status(self, status: StatusCode) -> Response {
        error_response(status, &self)
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::ExternalApi(format!("YouTube API request timed out: {e}"))
        } else {
            Error::ExternalApi(format!("YouTube API request failed: {e}"))
        }
    }
}

#[derive(Debug, serde::Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

fn error_response(status: StatusCode, error: &Error) -> Response {
    if status.is_server_error() {
        tracing::error!(%status, %error, "request failed");
    } else {
        tracing::warn!(%status, %error, "request rejected");
    }
    (
        status,
        Json(ErrorBody {
            error: &error.to_string(),
        }),
    )
        .into_response()
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        error_response(self.status_code(), &self)
    }
}
