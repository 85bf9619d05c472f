//! OAuth 2.0 authorization context for YouTube API access.
//!
//! The [`AuthorizationContext`] owns the single active [`Credential`] of the service. It builds
//! the consent-screen URL, exchanges the authorization code the user comes back with, and hands
//! out fresh bearer tokens to request handlers, refreshing an expired credential on the way.

use crate::config::{ConfigError, OAuthConfig};
use crate::error::{Error, Result};
use eyre::Context;
use oauth2::basic::{BasicClient, BasicErrorResponseType, BasicTokenResponse};
use oauth2::{
    AccessToken, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet,
    EndpointSet, RedirectUrl, RefreshToken, RequestTokenError, Scope, TokenResponse, TokenUrl,
};
use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};
use tokio::sync::RwLock;

/// Scopes requested by the consent flow.
pub const YOUTUBE_SCOPES: [&str; 3] = [
    "https://www.googleapis.com/auth/youtube",
    "https://www.googleapis.com/auth/youtube.force-ssl",
    "https://www.googleapis.com/auth/youtubepartner",
];

/// Subtracted from the server-reported lifetime so a token is never used right at its expiry.
const EXPIRY_BUFFER: Duration = Duration::from_secs(300);

type GoogleClient =
    BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// An OAuth token response together with the instant it stops being usable.
#[derive(Debug, Clone)]
pub struct Credential {
    token: BasicTokenResponse,
    /// When the current access token expires (with safety buffer)
    expires_at: SystemTime,
}

impl Credential {
    /// Wraps a fresh token response, computing its expiry from `expires_in`.
    pub fn new(token: BasicTokenResponse) -> Self {
        Self {
            expires_at: Self::calculate_token_expiry(&token),
            token,
        }
    }

    /// Wraps a token that must be refreshed before first use.
    ///
    /// Used for tokens loaded from storage, whose remaining lifetime is unknown.
    pub fn expired(token: BasicTokenResponse) -> Self {
        Self {
            expires_at: SystemTime::UNIX_EPOCH,
            token,
        }
    }

    pub fn raw_token(&self) -> &BasicTokenResponse {
        &self.token
    }

    pub fn access_token(&self) -> &AccessToken {
        self.token.access_token()
    }

    pub fn refresh_token(&self) -> Option<&RefreshToken> {
        self.token.refresh_token()
    }

    pub fn expires_at(&self) -> SystemTime {
        self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        SystemTime::now() >= self.expires_at
    }

    /// Scopes the user actually granted, as reported by the token endpoint.
    pub fn scopes(&self) -> Vec<String> {
        self.token
            .scopes()
            .map(|scopes| scopes.iter().map(|s| (**s).clone()).collect())
            .unwrap_or_default()
    }

    /// Swaps in a refreshed token response.
    ///
    /// Google usually omits the refresh token from refresh responses, in which case the one we
    /// already hold is kept.
    fn replace(&mut self, new_token: BasicTokenResponse) {
        let old_token = std::mem::replace(&mut self.token, new_token);
        if self.token.refresh_token().is_none() {
            tracing::trace!("new token lacks refresh token, preserving original");
            self.token
                .set_refresh_token(old_token.refresh_token().cloned());
        }
        if self.token.scopes().is_none() {
            self.token.set_scopes(old_token.scopes().cloned());
        }
        self.expires_at = Self::calculate_token_expiry(&self.token);
    }

    /// Uses the current time + expires_in - 5 minutes.
    /// If no expires_in is provided, assumes a conservative 55-minute lifetime.
    fn calculate_token_expiry(token: &BasicTokenResponse) -> SystemTime {
        let now = SystemTime::now();
        match token.expires_in() {
            Some(expires_in) => now + expires_in.saturating_sub(EXPIRY_BUFFER),
            None => now + Duration::from_secs(3300),
        }
    }
}

/// Holds the OAuth client registration and the process's active credential.
///
/// One context is shared by every request (behind an `Arc`). Handlers call
/// [`Self::access_token`] once at the start of a request and pass the token to every remote call
/// they make, so the credential is never refreshed halfway through a request.
pub struct AuthorizationContext {
    client: GoogleClient,
    http: reqwest::Client,
    credential: RwLock<Option<Credential>>,
    token_file: Option<PathBuf>,
}

impl fmt::Debug for AuthorizationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizationContext")
            .field("client_id", self.client.client_id())
            .field("token_file", &self.token_file)
            .finish_non_exhaustive()
    }
}

impl AuthorizationContext {
    pub fn new(config: &OAuthConfig, http: reqwest::Client) -> Result<Self, ConfigError> {
        let invalid = |var: &'static str| {
            move |e: oauth2::url::ParseError| ConfigError::Invalid {
                var,
                reason: e.to_string(),
            }
        };
        let auth_url = AuthUrl::new(config.auth_url.clone()).map_err(invalid("OAUTH_AUTH_URL"))?;
        let token_url =
            TokenUrl::new(config.token_url.clone()).map_err(invalid("OAUTH_TOKEN_URL"))?;
        let redirect_url = RedirectUrl::new(config.redirect_uri.clone())
            .map_err(invalid("YOUTUBE_REDIRECT_URI"))?;

        let client = BasicClient::new(ClientId::new(config.client_id.clone()))
            .set_client_secret(ClientSecret::new(config.client_secret.clone()))
            .set_auth_uri(auth_url)
            .set_token_uri(token_url)
            .set_redirect_uri(redirect_url);

        Ok(Self {
            client,
            http,
            credential: RwLock::new(None),
            token_file: None,
        })
    }

    /// Persists the raw token response to `path` after every exchange and refresh.
    pub fn with_token_file(mut self, path: PathBuf) -> Self {
        self.token_file = Some(path);
        self
    }

    /// Builds the consent-screen URL for the given scopes.
    ///
    /// Offline access is always requested so that the exchange yields a refresh token.
    pub fn authorization_url(&self, scopes: &[&str]) -> String {
        // The callback carries only the code, so the CSRF state is not checked on the way back.
        let (auth_url, _csrf_token) = self
            .client
            .authorize_url(CsrfToken::new_random)
            .add_scopes(scopes.iter().map(|s| Scope::new(s.to_string())))
            .add_extra_param("access_type", "offline")
            .url();
        auth_url.to_string()
    }

    /// Exchanges an authorization code for a credential and makes it the active one.
    ///
    /// Any failure, whether the code is invalid, expired or already used, or the token endpoint
    /// cannot be reached, is an [`Error::Auth`].
    pub async fn exchange_code(&self, code: &str) -> Result<Credential> {
        let code = code.trim();
        if code.is_empty() {
            return Err(Error::Auth("missing authorization code".to_string()));
        }

        let token = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(&self.http)
            .await
            .map_err(|e| Error::Auth(describe_token_error(&e)))?;

        let credential = Credential::new(token);
        tracing::info!(
            scopes = ?credential.scopes(),
            has_refresh_token = credential.refresh_token().is_some(),
            "exchanged authorization code"
        );
        self.install(credential.clone()).await;
        Ok(credential)
    }

    /// Replaces the active credential.
    pub async fn install(&self, credential: Credential) {
        self.persist(&credential).await;
        *self.credential.write().await = Some(credential);
    }

    /// Snapshot of the active credential, if there is one.
    pub async fn credential(&self) -> Option<Credential> {
        self.credential.read().await.clone()
    }

    /// Returns a bearer token that is valid right now.
    ///
    /// Fails with `no active credential` until a code has been exchanged. An expired credential
    /// is refreshed first; if that is impossible the call fails with [`Error::Auth`].
    pub async fn access_token(&self) -> Result<AccessToken> {
        {
            let credential = self.credential.read().await;
            match credential.as_ref() {
                None => return Err(Error::no_active_credential()),
                Some(credential) if !credential.is_expired() => {
                    return Ok(credential.access_token().clone());
                }
                Some(_) => {}
            }
        }

        let mut guard = self.credential.write().await;
        let Some(credential) = guard.as_mut() else {
            return Err(Error::no_active_credential());
        };
        // another request may have refreshed while we waited for the write lock
        if credential.is_expired() {
            tracing::debug!("access token expired, attempting refresh");
            if !self.refresh(credential).await? {
                tracing::error!("access token refresh failed, credential is unusable");
                return Err(Error::Auth(
                    "credential expired and could not be refreshed".to_string(),
                ));
            }
            self.persist(credential).await;
        }
        Ok(credential.access_token().clone())
    }

    /// Attempts to refresh `credential` in place using its refresh token.
    ///
    /// * `Ok(true)` - the credential now holds a fresh access token
    /// * `Ok(false)` - there is no refresh token, or Google rejected it as an invalid grant
    /// * `Err(_)` - the token endpoint failed in some other way
    async fn refresh(&self, credential: &mut Credential) -> Result<bool> {
        let Some(refresh_token) = credential.refresh_token().cloned() else {
            tracing::warn!("no refresh token available, cannot refresh");
            return Ok(false);
        };

        match self
            .client
            .exchange_refresh_token(&refresh_token)
            .request_async(&self.http)
            .await
        {
            Ok(new_token) => {
                tracing::debug!("successfully refreshed OAuth token");
                credential.replace(new_token);
                Ok(true)
            }
            Err(ref e @ RequestTokenError::ServerResponse(ref sr))
                if matches!(sr.error(), BasicErrorResponseType::InvalidGrant) =>
            {
                tracing::warn!("OAuth refresh token considered invalid grant: {}", e);
                Ok(false)
            }
            Err(e) => Err(Error::Auth(format!(
                "refresh access token: {}",
                describe_token_error(&e)
            ))),
        }
    }

    /// Loads a previously persisted token, if a token file is configured and present.
    ///
    /// The loaded credential is treated as expired so that it is refreshed before first use.
    pub async fn restore(&self) -> eyre::Result<bool> {
        let Some(path) = &self.token_file else {
            return Ok(false);
        };
        if !tokio::fs::try_exists(path)
            .await
            .with_context(|| format!("check for token file {}", path.display()))?
        {
            return Ok(false);
        }
        let json = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("read token file {}", path.display()))?;
        let token: BasicTokenResponse =
            serde_json::from_str(&json).context("parse stored OAuth token")?;
        *self.credential.write().await = Some(Credential::expired(token));
        tracing::info!(path = %path.display(), "restored stored credential");
        Ok(true)
    }

    async fn persist(&self, credential: &Credential) {
        let Some(path) = &self.token_file else {
            return;
        };
        let result: eyre::Result<()> = async {
            let json =
                serde_json::to_string(credential.raw_token()).context("serialize OAuth token")?;
            tokio::fs::write(path, json)
                .await
                .context("write token file")
        }
        .await;
        if let Err(e) = result {
            tracing::warn!(path = %path.display(), "failed to persist credential: {e:#}");
        }
    }
}

fn describe_token_error<RE>(
    e: &RequestTokenError<RE, oauth2::basic::BasicErrorResponse>,
) -> String
where
    RE: std::error::Error + 'static,
{
    match e {
        RequestTokenError::ServerResponse(response) => response.to_string(),
        other => other.to_string(),
    }
}
