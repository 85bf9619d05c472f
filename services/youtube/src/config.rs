//! Process configuration, read from the environment.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/youtube/v3";
pub const DEFAULT_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// OAuth client registration for the Google Cloud project.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub auth_url: String,
    pub token_url: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub oauth: OAuthConfig,
    pub port: u16,
    /// Upper bound on in-flight `videos.update` calls during a bulk update.
    pub bulk_concurrency: usize,
    pub request_timeout: Duration,
    pub api_base: String,
    /// Where the raw token response is kept between restarts, if anywhere.
    pub token_file: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |var: &'static str| {
            lookup(var)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(var))
        };
        let optional = |var: &'static str, default: &str| {
            lookup(var)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let oauth = OAuthConfig {
            client_id: required("YOUTUBE_CLIENT_ID")?,
            client_secret: required("YOUTUBE_CLIENT_SECRET")?,
            redirect_uri: required("YOUTUBE_REDIRECT_URI")?,
            auth_url: optional("OAUTH_AUTH_URL", DEFAULT_AUTH_URL),
            token_url: optional("OAUTH_TOKEN_URL", DEFAULT_TOKEN_URL),
        };
        for (var, url) in [
            ("YOUTUBE_REDIRECT_URI", &oauth.redirect_uri),
            ("OAUTH_AUTH_URL", &oauth.auth_url),
            ("OAUTH_TOKEN_URL", &oauth.token_url),
        ] {
            oauth2::url::Url::parse(url).map_err(|e| ConfigError::Invalid {
                var,
                reason: e.to_string(),
            })?;
        }

        let port = parse("PORT", &optional("PORT", "3000"))?;
        let bulk_concurrency: usize = parse("BULK_CONCURRENCY", &optional("BULK_CONCURRENCY", "4"))?;
        if bulk_concurrency == 0 {
            return Err(ConfigError::Invalid {
                var: "BULK_CONCURRENCY",
                reason: "must be at least 1".to_string(),
            });
        }
        let timeout_secs: u64 = parse(
            "REQUEST_TIMEOUT_SECS",
            &optional("REQUEST_TIMEOUT_SECS", "30"),
        )?;
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "REQUEST_TIMEOUT_SECS",
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            oauth,
            port,
            bulk_concurrency,
            request_timeout: Duration::from_secs(timeout_secs),
            api_base: optional("YOUTUBE_API_BASE", DEFAULT_API_BASE)
                .trim_end_matches('/')
                .to_string(),
            token_file: lookup("TOKEN_FILE")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
        })
    }
}

fn parse<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        reason: e.to_string(),
    })
}
