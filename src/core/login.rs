//! Login challenge handling for the OAuth web flow
//!
//! Starting a login mints a `LoginChallenge` and embeds it, serialized,
//! into the OAuth `state` parameter. The web callback collaborator hands
//! the returned `state` to [`consume_login_state`], which only succeeds if
//! it matches the challenge on file for that user. One challenge is live
//! per user at a time; starting a new login invalidates the previous one.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::core::credentials::{CredentialStore, UserCredential};
use crate::core::settings::GitHubSettings;
use crate::core::UserId;
use crate::error::{GhUtilsError, Result};
use crate::github::auth::OAuthApp;

/// One-time login challenge embedded in the OAuth `state` parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginChallenge {
    /// The user who initiated the login
    pub user_id: UserId,
    /// Random value that must round-trip through GitHub unchanged
    pub challenge_id: Uuid,
}

impl LoginChallenge {
    /// Mint a new challenge for a user
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            challenge_id: Uuid::new_v4(),
        }
    }

    /// Serialize into the OAuth `state` string
    pub fn to_state(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse an OAuth `state` string back into a challenge
    pub fn from_state(state: &str) -> Result<Self> {
        serde_json::from_str(state).map_err(|e| {
            GhUtilsError::AuthenticationFailed(format!("Failed to parse login state: {e}"))
        })
    }
}

/// Persistent store for pending login challenges
#[async_trait]
pub trait ChallengeStore: Send + Sync {
    /// The live challenge for a user, if a login is pending
    async fn get(&self, user_id: UserId) -> Result<Option<LoginChallenge>>;

    /// Insert or replace the challenge for its user
    async fn put(&self, challenge: LoginChallenge) -> Result<()>;

    /// Discard a user's pending challenge
    async fn delete(&self, user_id: UserId) -> Result<()>;
}

/// Start a login flow for a user
///
/// Overwrites any previous pending challenge and returns the GitHub
/// authorization URL to present to the user.
pub async fn begin_login(
    store: &dyn ChallengeStore,
    settings: &GitHubSettings,
    user_id: UserId,
) -> Result<Url> {
    let challenge = LoginChallenge::new(user_id);
    store.put(challenge.clone()).await?;
    Ok(settings.login_url(&challenge.to_state()?))
}

/// Validate and consume the `state` returned by the OAuth callback
///
/// Succeeds only if the state parses and matches the challenge on file for
/// that user; on success the challenge is deleted, so a state value cannot
/// be replayed.
pub async fn consume_login_state(store: &dyn ChallengeStore, state: &str) -> Result<UserId> {
    let challenge = LoginChallenge::from_state(state)?;

    match store.get(challenge.user_id).await? {
        Some(stored) if stored.challenge_id == challenge.challenge_id => {
            store.delete(challenge.user_id).await?;
            Ok(challenge.user_id)
        }
        _ => Err(GhUtilsError::AuthenticationFailed(
            "Invalid login state".to_string(),
        )),
    }
}

/// Complete a login: verify the state, exchange the code, persist tokens
///
/// This is the whole contract of the web callback collaborator; it must
/// run before the browser gets a success response.
pub async fn complete_login(
    challenges: &dyn ChallengeStore,
    credentials: &dyn CredentialStore,
    oauth: &OAuthApp,
    state: &str,
    code: &str,
) -> Result<UserId> {
    let user_id = consume_login_state(challenges, state).await?;
    let pair = oauth.exchange_code(code).await?;
    credentials
        .put(UserCredential::from_pair(user_id, pair))
        .await?;
    Ok(user_id)
}
