//! In-memory store implementation
//!
//! Backs all three store contracts with `RwLock`ed maps. Useful for tests
//! and local development; production deployments implement the traits over
//! whatever persistence the surrounding service uses.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::core::config::{ConfigScope, ConfigStore};
use crate::core::credentials::{CredentialStore, UserCredential};
use crate::core::login::{ChallengeStore, LoginChallenge};
use crate::core::UserId;
use crate::error::Result;
use crate::github::repository::RepositoryName;

/// Map-backed implementation of the credential, challenge, and config stores
#[derive(Default)]
pub struct MemoryStore {
    credentials: RwLock<HashMap<UserId, UserCredential>>,
    challenges: RwLock<HashMap<UserId, LoginChallenge>>,
    default_repos: RwLock<HashMap<ConfigScope, RepositoryName>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default repository for a scope
    pub async fn set_default_repo(&self, scope: ConfigScope, repo: RepositoryName) {
        self.default_repos.write().await.insert(scope, repo);
    }

    /// Clear the default repository for a scope
    pub async fn clear_default_repo(&self, scope: ConfigScope) {
        self.default_repos.write().await.remove(&scope);
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn get(&self, user_id: UserId) -> Result<Option<UserCredential>> {
        Ok(self.credentials.read().await.get(&user_id).cloned())
    }

    async fn put(&self, credential: UserCredential) -> Result<()> {
        self.credentials
            .write()
            .await
            .insert(credential.user_id, credential);
        Ok(())
    }

    async fn delete(&self, user_id: UserId) -> Result<()> {
        self.credentials.write().await.remove(&user_id);
        Ok(())
    }
}

#[async_trait]
impl ChallengeStore for MemoryStore {
    async fn get(&self, user_id: UserId) -> Result<Option<LoginChallenge>> {
        Ok(self.challenges.read().await.get(&user_id).cloned())
    }

    async fn put(&self, challenge: LoginChallenge) -> Result<()> {
        self.challenges
            .write()
            .await
            .insert(challenge.user_id, challenge);
        Ok(())
    }

    async fn delete(&self, user_id: UserId) -> Result<()> {
        self.challenges.write().await.remove(&user_id);
        Ok(())
    }
}

#[async_trait]
impl ConfigStore for MemoryStore {
    async fn default_repo(&self, scope: ConfigScope) -> Result<Option<RepositoryName>> {
        Ok(self.default_repos.read().await.get(&scope).cloned())
    }
}
