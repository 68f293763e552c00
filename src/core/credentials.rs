//! Stored OAuth credentials and the credential store contract
//!
//! Each Discord user who has linked their GitHub account has one
//! `UserCredential` record. The record is created by the OAuth callback,
//! rewritten whenever the token pair rotates, and deleted only by an
//! explicit logout — a refresh-expired credential stays in the store.

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::core::UserId;
use crate::error::Result;
use crate::github::auth::TokenPair;

/// Safety margin when checking refresh-token expiry
///
/// A refresh token that expires within this window is treated as already
/// expired, so we never start minting an access token that dies mid-request.
pub const REFRESH_EXPIRY_MARGIN_SECS: i64 = 60;

/// A user's stored GitHub OAuth token pair
#[derive(Debug, Clone)]
pub struct UserCredential {
    /// Discord account ID this credential belongs to
    pub user_id: UserId,
    /// The access token for API requests
    pub access_token: SecretString,
    /// When the access token expires, if the app issues expiring tokens
    pub expires_at: Option<DateTime<Utc>>,
    /// The refresh token for obtaining new access tokens
    pub refresh_token: Option<SecretString>,
    /// When the refresh token expires
    pub refresh_expires_at: Option<DateTime<Utc>>,
}

/// Serializable mirror of `UserCredential` for persistence
///
/// Uses plain strings since `SecretString` doesn't implement `Serialize`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredCredential {
    pub user_id: UserId,
    pub access_token: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub refresh_token: Option<String>,
    pub refresh_expires_at: Option<DateTime<Utc>>,
}

impl UserCredential {
    /// Create a credential from a freshly exchanged token pair
    pub fn from_pair(user_id: UserId, pair: TokenPair) -> Self {
        Self {
            user_id,
            access_token: pair.access_token,
            expires_at: pair.expires_at,
            refresh_token: pair.refresh_token,
            refresh_expires_at: pair.refresh_expires_at,
        }
    }

    /// Overwrite the token fields with a rotated pair
    pub fn apply(&mut self, pair: TokenPair) {
        self.access_token = pair.access_token;
        self.expires_at = pair.expires_at;
        self.refresh_token = pair.refresh_token;
        self.refresh_expires_at = pair.refresh_expires_at;
    }

    /// Whether the refresh token is expired as of `now`
    ///
    /// A credential with no refresh expiry never refresh-expires. The
    /// boundary is inclusive: an expiry exactly at `now + margin` counts as
    /// expired.
    pub fn is_refresh_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.refresh_expires_at {
            None => false,
            Some(expires_at) => {
                expires_at <= now + TimeDelta::seconds(REFRESH_EXPIRY_MARGIN_SECS)
            }
        }
    }

    /// Whether the refresh token is expired right now
    pub fn is_refresh_expired(&self) -> bool {
        self.is_refresh_expired_at(Utc::now())
    }

    /// Convert to the storable format
    pub fn to_stored(&self) -> StoredCredential {
        StoredCredential {
            user_id: self.user_id,
            access_token: self.access_token.expose_secret().to_string(),
            expires_at: self.expires_at,
            refresh_token: self
                .refresh_token
                .as_ref()
                .map(|t| t.expose_secret().to_string()),
            refresh_expires_at: self.refresh_expires_at,
        }
    }

    /// Create from the storable format
    pub fn from_stored(stored: StoredCredential) -> Self {
        Self {
            user_id: stored.user_id,
            access_token: SecretString::from(stored.access_token),
            expires_at: stored.expires_at,
            refresh_token: stored.refresh_token.map(SecretString::from),
            refresh_expires_at: stored.refresh_expires_at,
        }
    }

    /// Get a masked version of the access token for display
    pub fn masked_token(&self) -> String {
        let exposed = self.access_token.expose_secret();
        if exposed.len() <= 8 {
            "*".repeat(exposed.len())
        } else {
            format!("{}...{}", &exposed[..4], &exposed[exposed.len() - 4..])
        }
    }
}

/// Persistent store for user credentials
///
/// Implemented by the surrounding service; failures are fatal and must
/// surface as [`crate::GhUtilsError::Store`].
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Look up the credential for a user, if one exists
    async fn get(&self, user_id: UserId) -> Result<Option<UserCredential>>;

    /// Insert or replace a credential, keyed by its `user_id`
    async fn put(&self, credential: UserCredential) -> Result<()>;

    /// Delete a user's credential (explicit logout)
    async fn delete(&self, user_id: UserId) -> Result<()>;
}
