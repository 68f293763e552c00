//! GitHub API client wrapper using octocrab
//!
//! A `GitHubClient` is handed out by a session and carries one of two
//! identities: the shared default-installation client, or a per-user OAuth
//! strategy that refreshes lazily in the request path.

use std::sync::Arc;

use octocrab::Octocrab;
use once_cell::sync::OnceCell;

use crate::core::settings::GitHubSettings;
use crate::error::Result;
use crate::github::auth::{build_installation_client, UserTokenAuth};

/// GitHub API client wrapper
#[derive(Clone)]
pub struct GitHubClient {
    auth: ClientAuth,
}

#[derive(Clone)]
enum ClientAuth {
    /// Shared app-installation identity, built once on first use
    Installation {
        settings: GitHubSettings,
        cell: Arc<OnceCell<Octocrab>>,
    },
    /// Per-user OAuth identity with refresh support
    User(UserTokenAuth),
}

impl GitHubClient {
    /// Client authenticated as the default app installation
    ///
    /// The underlying octocrab instance is built lazily into `cell`, so all
    /// logged-out sessions share a single installation client.
    pub(crate) fn installation(settings: GitHubSettings, cell: Arc<OnceCell<Octocrab>>) -> Self {
        Self {
            auth: ClientAuth::Installation { settings, cell },
        }
    }

    /// Client authenticated on behalf of a user
    pub(crate) fn user(auth: UserTokenAuth) -> Self {
        Self {
            auth: ClientAuth::User(auth),
        }
    }

    /// Get an octocrab instance carrying a currently valid token
    ///
    /// For user identities this is the suspension point where an expired
    /// access token gets refreshed.
    pub async fn octocrab(&self) -> Result<Octocrab> {
        match &self.auth {
            ClientAuth::Installation { settings, cell } => cell
                .get_or_try_init(|| build_installation_client(settings))
                .cloned(),
            ClientAuth::User(auth) => auth.client().await,
        }
    }
}
