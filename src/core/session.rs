//! Credential lifecycle and session management
//!
//! A session pairs an authenticated API client with the user's login
//! state. Opening one decides which identity to use:
//! - no stored credential → the shared default installation, `LoggedOut`
//! - refresh-expired credential → the installation again, `Expired`
//! - otherwise → a per-user OAuth client with refresh support, `LoggedIn`
//!
//! The auth strategy may rotate the token silently while the client is in
//! use; closing the session detects this and writes the rotated credential
//! back to the store. The write happens after the consumer is done because
//! a refresh can't be forced from outside the request path. Two overlapping
//! sessions for one user may both refresh; last write wins, which is fine
//! because refresh tokens stay valid across a brief overlap window.

use std::future::Future;
use std::sync::Arc;

use octocrab::Octocrab;
use once_cell::sync::OnceCell;
use secrecy::ExposeSecret;

use crate::core::credentials::{CredentialStore, UserCredential};
use crate::core::settings::GitHubSettings;
use crate::core::UserId;
use crate::error::Result;
use crate::github::auth::{OAuthApp, UserTokenAuth};
use crate::github::client::GitHubClient;

/// How a request is authenticated, derived per-session and never stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginState {
    /// Valid credential, fresh or freshly refreshed
    LoggedIn,
    /// No credential on file
    LoggedOut,
    /// Credential on file but its refresh token has expired
    Expired,
}

impl LoginState {
    /// Whether requests run with the user's own identity
    pub fn is_logged_in(&self) -> bool {
        matches!(self, LoginState::LoggedIn)
    }
}

/// Opens per-user sessions against the credential store
pub struct SessionManager {
    settings: GitHubSettings,
    oauth: OAuthApp,
    credentials: Arc<dyn CredentialStore>,
    installation: Arc<OnceCell<Octocrab>>,
}

impl SessionManager {
    /// Create a session manager
    pub fn new(settings: GitHubSettings, credentials: Arc<dyn CredentialStore>) -> Self {
        let oauth = OAuthApp::new(&settings);
        Self {
            settings,
            oauth,
            credentials,
            installation: Arc::new(OnceCell::new()),
        }
    }

    /// Replace the OAuth token endpoint client (for tests)
    pub fn with_oauth(mut self, oauth: OAuthApp) -> Self {
        self.oauth = oauth;
        self
    }

    /// Open a session for a user
    ///
    /// The session is exclusively the caller's until [`Session::close`],
    /// which must run on every exit path so token rotations reach the
    /// store. Store failures propagate; API failures don't happen here
    /// because no request is made yet.
    pub async fn open_session(&self, user_id: UserId) -> Result<Session> {
        let Some(credential) = self.credentials.get(user_id).await? else {
            return Ok(Session {
                github: GitHubClient::installation(
                    self.settings.clone(),
                    self.installation.clone(),
                ),
                state: LoginState::LoggedOut,
                rotation: None,
            });
        };

        if credential.is_refresh_expired() {
            // the credential stays in the store; only logout deletes it
            return Ok(Session {
                github: GitHubClient::installation(
                    self.settings.clone(),
                    self.installation.clone(),
                ),
                state: LoginState::Expired,
                rotation: None,
            });
        }

        let auth = UserTokenAuth::new(self.oauth.clone(), credential.clone());
        Ok(Session {
            github: GitHubClient::user(auth.clone()),
            state: LoginState::LoggedIn,
            rotation: Some(Rotation {
                loaded: credential,
                auth,
                store: Arc::clone(&self.credentials),
            }),
        })
    }

    /// Run a closure inside a session, closing it on every exit path
    ///
    /// The consumer's error takes precedence over a close-time store error.
    pub async fn with_session<T, F, Fut>(&self, user_id: UserId, f: F) -> Result<T>
    where
        F: FnOnce(GitHubClient, LoginState) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let session = self.open_session(user_id).await?;
        let result = f(session.github().clone(), session.state()).await;
        let closed = session.close().await;
        let value = result?;
        closed?;
        Ok(value)
    }

    /// Delete a user's stored credential
    ///
    /// Returns whether a credential existed.
    pub async fn logout(&self, user_id: UserId) -> Result<bool> {
        if self.credentials.get(user_id).await?.is_none() {
            return Ok(false);
        }
        self.credentials.delete(user_id).await?;
        Ok(true)
    }
}

/// An open session: one client, one login state, one deferred write-back
pub struct Session {
    github: GitHubClient,
    state: LoginState,
    rotation: Option<Rotation>,
}

struct Rotation {
    loaded: UserCredential,
    auth: UserTokenAuth,
    store: Arc<dyn CredentialStore>,
}

impl Session {
    /// The authenticated client for this session
    pub fn github(&self) -> &GitHubClient {
        &self.github
    }

    /// The login state this session was opened with
    pub fn state(&self) -> LoginState {
        self.state
    }

    /// Close the session, persisting any token rotation
    ///
    /// Compares the strategy's live token against the one loaded at open;
    /// if they differ the rotated credential is written back. A rotation
    /// that is itself rotated again within one session produces a single
    /// final write — the intermediate pair is unobservable here.
    pub async fn close(self) -> Result<()> {
        let Some(rotation) = self.rotation else {
            return Ok(());
        };

        let live = rotation.auth.snapshot().await;
        if live.access_token.expose_secret() != rotation.loaded.access_token.expose_secret() {
            rotation.store.put(live).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::memory::MemoryStore;
    use chrono::{TimeDelta, Utc};
    use secrecy::SecretString;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings() -> GitHubSettings {
        GitHubSettings {
            app_id: 1,
            client_id: "Iv1.test".to_string(),
            client_secret: SecretString::from("secret"),
            private_key: SecretString::from("not a real key"),
            redirect_uri: "https://example.com/login".to_string(),
            default_installation_id: 1,
        }
    }

    fn fresh_credential(user_id: UserId) -> UserCredential {
        UserCredential {
            user_id,
            access_token: SecretString::from("ghu_fresh"),
            expires_at: Some(Utc::now() + TimeDelta::hours(8)),
            refresh_token: Some(SecretString::from("ghr_refresh")),
            refresh_expires_at: Some(Utc::now() + TimeDelta::days(180)),
        }
    }

    #[tokio::test]
    async fn test_open_session_without_credential_is_logged_out() {
        let store = Arc::new(MemoryStore::new());
        let manager = SessionManager::new(settings(), store);

        let session = manager.open_session(1).await.unwrap();
        assert_eq!(session.state(), LoginState::LoggedOut);
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_open_session_with_expired_refresh_keeps_credential() {
        let store = Arc::new(MemoryStore::new());
        let mut credential = fresh_credential(1);
        credential.refresh_expires_at = Some(Utc::now() - TimeDelta::hours(1));
        store.put(credential).await.unwrap();

        let manager = SessionManager::new(settings(), Arc::clone(&store) as Arc<dyn CredentialStore>);
        let session = manager.open_session(1).await.unwrap();
        assert_eq!(session.state(), LoginState::Expired);
        session.close().await.unwrap();

        // expiry does not delete the record; logout is explicit
        assert!(store.get(1).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_open_session_with_valid_credential_is_logged_in() {
        let store = Arc::new(MemoryStore::new());
        store.put(fresh_credential(1)).await.unwrap();

        let manager = SessionManager::new(settings(), store);
        let session = manager.open_session(1).await.unwrap();
        assert_eq!(session.state(), LoginState::LoggedIn);
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_close_without_rotation_writes_nothing() {
        let store = Arc::new(MemoryStore::new());
        store.put(fresh_credential(1)).await.unwrap();

        let manager = SessionManager::new(settings(), Arc::clone(&store) as Arc<dyn CredentialStore>);
        let session = manager.open_session(1).await.unwrap();
        session.close().await.unwrap();

        let stored = store.get(1).await.unwrap().unwrap();
        assert_eq!(stored.access_token.expose_secret(), "ghu_fresh");
    }

    #[tokio::test]
    async fn test_rotation_is_written_back_on_close() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login/oauth/access_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "ghu_rotated",
                "token_type": "bearer",
                "scope": "",
                "expires_in": 28800,
                "refresh_token": "ghr_rotated",
                "refresh_token_expires_in": 15811200
            })))
            .expect(1)
            .mount(&server)
            .await;

        let store = Arc::new(MemoryStore::new());
        let mut credential = fresh_credential(1);
        // access token already expired, refresh token still good
        credential.expires_at = Some(Utc::now() - TimeDelta::hours(1));
        store.put(credential).await.unwrap();

        let oauth = OAuthApp::new(&settings())
            .with_token_url(format!("{}/login/oauth/access_token", server.uri()));
        let manager = SessionManager::new(settings(), Arc::clone(&store) as Arc<dyn CredentialStore>).with_oauth(oauth);

        let session = manager.open_session(1).await.unwrap();
        assert_eq!(session.state(), LoginState::LoggedIn);

        // first use of the client triggers the refresh
        session.github().octocrab().await.unwrap();
        session.close().await.unwrap();

        let stored = store.get(1).await.unwrap().unwrap();
        assert_eq!(stored.access_token.expose_secret(), "ghu_rotated");
        assert_eq!(
            stored.refresh_token.unwrap().expose_secret(),
            "ghr_rotated"
        );
    }

    #[tokio::test]
    async fn test_logout_deletes_credential() {
        let store = Arc::new(MemoryStore::new());
        store.put(fresh_credential(1)).await.unwrap();

        let manager = SessionManager::new(settings(), Arc::clone(&store) as Arc<dyn CredentialStore>);
        assert!(manager.logout(1).await.unwrap());
        assert!(store.get(1).await.unwrap().is_none());
        assert!(!manager.logout(1).await.unwrap());
    }

    #[tokio::test]
    async fn test_with_session_closes_on_consumer_error() {
        let store = Arc::new(MemoryStore::new());
        store.put(fresh_credential(1)).await.unwrap();
        let manager = SessionManager::new(settings(), store);

        let result: Result<()> = manager
            .with_session(1, |_, state| async move {
                assert_eq!(state, LoginState::LoggedIn);
                Err(crate::GhUtilsError::GitHubApi("boom".to_string()))
            })
            .await;
        assert!(matches!(result, Err(crate::GhUtilsError::GitHubApi(_))));
    }
}
