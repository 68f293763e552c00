//! GitHub App OAuth authentication
//!
//! Implements the token side of the web application flow: exchanging an
//! authorization code for a user token pair, refreshing expired access
//! tokens, and building the app-installation client used for users who
//! haven't linked an account.
//! See: https://docs.github.com/en/apps/creating-github-apps/authenticating-with-a-github-app/generating-a-user-access-token-for-a-github-app

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::EncodingKey;
use octocrab::Octocrab;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::core::credentials::UserCredential;
use crate::core::settings::GitHubSettings;
use crate::error::{GhUtilsError, Result};

/// GitHub OAuth token endpoint
const TOKEN_URL: &str = "https://github.com/login/oauth/access_token";

/// Proactive access-token refresh margin
///
/// Tokens that expire within this window are refreshed before use rather
/// than risking a 401 mid-request.
const ACCESS_EXPIRY_MARGIN_SECS: i64 = 300;

/// A user access token with its optional refresh counterpart
///
/// GitHub Apps issue expiring pairs (access: 8 hours, refresh: 6 months);
/// classic OAuth apps return a bare non-expiring access token, in which
/// case the optional fields are all `None`.
#[derive(Debug, Clone)]
pub struct TokenPair {
    /// The access token for API requests
    pub access_token: SecretString,
    /// When the access token expires (absolute timestamp)
    pub expires_at: Option<DateTime<Utc>>,
    /// The refresh token for obtaining new access tokens
    pub refresh_token: Option<SecretString>,
    /// When the refresh token expires (absolute timestamp)
    pub refresh_expires_at: Option<DateTime<Utc>>,
}

/// Token response from GitHub OAuth
#[derive(Debug, Deserialize)]
struct FullTokenResponse {
    access_token: String,
    #[allow(dead_code)]
    token_type: String,
    #[allow(dead_code)]
    scope: String,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    refresh_token_expires_in: Option<u64>,
}

impl FullTokenResponse {
    fn into_pair(self, now: DateTime<Utc>) -> TokenPair {
        TokenPair {
            access_token: SecretString::from(self.access_token),
            expires_at: self
                .expires_in
                .map(|secs| now + TimeDelta::seconds(secs as i64)),
            refresh_token: self.refresh_token.map(SecretString::from),
            refresh_expires_at: self
                .refresh_token_expires_in
                .map(|secs| now + TimeDelta::seconds(secs as i64)),
        }
    }
}

/// Error response from GitHub
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
    #[allow(dead_code)]
    error_description: Option<String>,
}

/// Authorization code exchange request body
#[derive(Serialize)]
struct CodeExchangeRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    code: &'a str,
}

/// Refresh token request body
#[derive(Serialize)]
struct RefreshTokenRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    grant_type: &'static str,
    refresh_token: &'a str,
}

/// Client for the GitHub OAuth token endpoint
#[derive(Clone)]
pub struct OAuthApp {
    client: Client,
    client_id: String,
    client_secret: SecretString,
    token_url: String,
}

impl OAuthApp {
    /// Create a token endpoint client from app settings
    pub fn new(settings: &GitHubSettings) -> Self {
        Self {
            client: Client::new(),
            client_id: settings.client_id.clone(),
            client_secret: settings.client_secret.clone(),
            token_url: TOKEN_URL.to_string(),
        }
    }

    /// Override the token endpoint URL (for tests)
    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    /// Exchange an authorization code for a token pair
    ///
    /// Called by the OAuth callback collaborator once the login challenge
    /// has been verified.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenPair> {
        let request = CodeExchangeRequest {
            client_id: &self.client_id,
            client_secret: self.client_secret.expose_secret(),
            code,
        };

        let response = self
            .client
            .post(&self.token_url)
            .header("Accept", "application/json")
            .form(&request)
            .send()
            .await?;

        let text = response.text().await?;
        Self::parse_token_response(&text, Utc::now())
            .map_err(GhUtilsError::AuthenticationFailed)
    }

    /// Refresh an expired access token using the refresh token
    ///
    /// Returns new token data with an updated access token and potentially
    /// a new refresh token.
    pub async fn refresh(&self, refresh_token: &SecretString) -> Result<TokenPair> {
        let request = RefreshTokenRequest {
            client_id: &self.client_id,
            client_secret: self.client_secret.expose_secret(),
            grant_type: "refresh_token",
            refresh_token: refresh_token.expose_secret(),
        };

        let response = self
            .client
            .post(&self.token_url)
            .header("Accept", "application/json")
            .form(&request)
            .send()
            .await?;

        let text = response.text().await?;
        Self::parse_token_response(&text, Utc::now()).map_err(GhUtilsError::TokenRefreshFailed)
    }

    /// Parse a token endpoint body, which GitHub returns with status 200
    /// even for errors
    fn parse_token_response(
        text: &str,
        now: DateTime<Utc>,
    ) -> std::result::Result<TokenPair, String> {
        if let Ok(token_response) = serde_json::from_str::<FullTokenResponse>(text) {
            return Ok(token_response.into_pair(now));
        }

        if let Ok(error_response) = serde_json::from_str::<ErrorResponse>(text) {
            return Err(error_response.error);
        }

        Err("Invalid response from GitHub".to_string())
    }
}

/// Per-session user token strategy with lazy refresh
///
/// The refresh happens in the request path: callers obtain the client
/// through [`UserTokenAuth::client`], which rotates the pair first if the
/// access token is about to expire. The session compares
/// [`UserTokenAuth::snapshot`] against the credential it loaded to decide
/// whether a write-back is needed on close.
#[derive(Clone)]
pub struct UserTokenAuth {
    oauth: OAuthApp,
    state: Arc<RwLock<TokenState>>,
}

struct TokenState {
    credential: UserCredential,
    client: Option<Octocrab>,
}

impl UserTokenAuth {
    /// Create a strategy around a stored credential
    pub fn new(oauth: OAuthApp, credential: UserCredential) -> Self {
        Self {
            oauth,
            state: Arc::new(RwLock::new(TokenState {
                credential,
                client: None,
            })),
        }
    }

    fn needs_refresh(credential: &UserCredential, now: DateTime<Utc>) -> bool {
        match credential.expires_at {
            None => false,
            Some(expires_at) => {
                expires_at <= now + TimeDelta::seconds(ACCESS_EXPIRY_MARGIN_SECS)
            }
        }
    }

    /// Get an API client carrying a currently valid access token
    ///
    /// Refreshes the token pair first if the access token is within its
    /// expiry margin and a refresh token is available. A credential without
    /// a refresh token is used as-is; if it's actually expired the API call
    /// fails with 401, which is the caller's to handle.
    pub async fn client(&self) -> Result<Octocrab> {
        let mut state = self.state.write().await;

        if Self::needs_refresh(&state.credential, Utc::now()) {
            if let Some(refresh_token) = state.credential.refresh_token.clone() {
                let pair = self.oauth.refresh(&refresh_token).await?;
                state.credential.apply(pair);
                state.client = None;
            }
        }

        if let Some(client) = &state.client {
            return Ok(client.clone());
        }

        let client = Octocrab::builder()
            .personal_token(state.credential.access_token.expose_secret().to_string())
            .build()?;
        state.client = Some(client.clone());
        Ok(client)
    }

    /// A copy of the credential as it currently stands, rotations included
    pub async fn snapshot(&self) -> UserCredential {
        self.state.read().await.credential.clone()
    }
}

/// Build a client authenticated as the default app installation
///
/// Used when no user credential is available, to get a higher rate limit
/// than unauthenticated requests.
pub fn build_installation_client(settings: &GitHubSettings) -> Result<Octocrab> {
    let key = EncodingKey::from_rsa_pem(settings.private_key.expose_secret().as_bytes())
        .map_err(|e| GhUtilsError::Config(format!("Invalid GitHub App private key: {e}")))?;

    let app = Octocrab::builder()
        .app(settings.app_id.into(), key)
        .build()?;

    Ok(app.installation(settings.default_installation_id.into())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn oauth(token_url: String) -> OAuthApp {
        OAuthApp {
            client: Client::new(),
            client_id: "Iv1.testclient".to_string(),
            client_secret: SecretString::from("secret"),
            token_url,
        }
    }

    #[test]
    fn test_parse_full_token_response() {
        let now = Utc::now();
        let body = r#"{
            "access_token": "ghu_access",
            "token_type": "bearer",
            "scope": "",
            "expires_in": 28800,
            "refresh_token": "ghr_refresh",
            "refresh_token_expires_in": 15811200
        }"#;

        let pair = OAuthApp::parse_token_response(body, now).unwrap();
        assert_eq!(pair.access_token.expose_secret(), "ghu_access");
        assert_eq!(pair.expires_at, Some(now + TimeDelta::seconds(28800)));
        assert_eq!(
            pair.refresh_token.as_ref().map(|t| t.expose_secret()),
            Some("ghr_refresh")
        );
        assert_eq!(
            pair.refresh_expires_at,
            Some(now + TimeDelta::seconds(15811200))
        );
    }

    #[test]
    fn test_parse_bare_token_response() {
        let now = Utc::now();
        let body = r#"{"access_token": "gho_token", "token_type": "bearer", "scope": "repo"}"#;

        let pair = OAuthApp::parse_token_response(body, now).unwrap();
        assert_eq!(pair.access_token.expose_secret(), "gho_token");
        assert_eq!(pair.expires_at, None);
        assert!(pair.refresh_token.is_none());
    }

    #[test]
    fn test_parse_error_response() {
        let body = r#"{"error": "bad_refresh_token", "error_description": "The refresh token passed is incorrect or expired."}"#;
        let err = OAuthApp::parse_token_response(body, Utc::now()).unwrap_err();
        assert_eq!(err, "bad_refresh_token");
    }

    #[tokio::test]
    async fn test_refresh_against_token_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login/oauth/access_token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=ghr_old"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "ghu_new",
                "token_type": "bearer",
                "scope": "",
                "expires_in": 28800,
                "refresh_token": "ghr_new",
                "refresh_token_expires_in": 15811200
            })))
            .expect(1)
            .mount(&server)
            .await;

        let oauth = oauth(format!("{}/login/oauth/access_token", server.uri()));
        let pair = oauth
            .refresh(&SecretString::from("ghr_old"))
            .await
            .unwrap();
        assert_eq!(pair.access_token.expose_secret(), "ghu_new");
    }

    #[tokio::test]
    async fn test_refresh_failure_surfaces_reason() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login/oauth/access_token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"error": "bad_refresh_token"})),
            )
            .mount(&server)
            .await;

        let oauth = oauth(format!("{}/login/oauth/access_token", server.uri()));
        let err = oauth
            .refresh(&SecretString::from("ghr_old"))
            .await
            .unwrap_err();
        assert!(matches!(err, GhUtilsError::TokenRefreshFailed(reason) if reason == "bad_refresh_token"));
    }

    #[tokio::test]
    async fn test_exchange_code() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login/oauth/access_token"))
            .and(body_string_contains("code=authcode123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "ghu_fromcode",
                "token_type": "bearer",
                "scope": "",
                "expires_in": 28800,
                "refresh_token": "ghr_fromcode",
                "refresh_token_expires_in": 15811200
            })))
            .expect(1)
            .mount(&server)
            .await;

        let oauth = oauth(format!("{}/login/oauth/access_token", server.uri()));
        let pair = oauth.exchange_code("authcode123").await.unwrap();
        assert_eq!(pair.access_token.expose_secret(), "ghu_fromcode");
    }
}
