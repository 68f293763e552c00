//! Default-repository configuration lookup
//!
//! Users and guilds can configure a default repository so references like
//! `#123` work without an explicit `owner/repo`. Settings exist at three
//! scopes; resolution reads the most specific one first.

use async_trait::async_trait;

use crate::core::{GuildId, UserId};
use crate::error::Result;
use crate::github::repository::RepositoryName;

/// A single configuration scope key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigScope {
    /// A user's global setting, applied everywhere
    User { user_id: UserId },
    /// A user's setting for one specific guild
    UserGuild { user_id: UserId, guild_id: GuildId },
    /// A guild-wide setting
    Guild { guild_id: GuildId },
}

/// Where a command was invoked from
///
/// `guild_id` is `None` for DMs; guild-scoped settings only apply inside
/// the matching guild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandScope {
    pub user_id: UserId,
    pub guild_id: Option<GuildId>,
}

impl CommandScope {
    /// Scope for a direct-message invocation
    pub fn dm(user_id: UserId) -> Self {
        Self {
            user_id,
            guild_id: None,
        }
    }

    /// Scope for an invocation inside a guild
    pub fn guild(user_id: UserId, guild_id: GuildId) -> Self {
        Self {
            user_id,
            guild_id: Some(guild_id),
        }
    }
}

/// Persistent store for per-scope default repositories
///
/// Each scope is independently creatable, updatable, and deletable by the
/// surrounding command layer; this core only reads it.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// The default repository configured at `scope`, if any
    async fn default_repo(&self, scope: ConfigScope) -> Result<Option<RepositoryName>>;
}

/// Find the default repository for an invocation
///
/// Reads scopes from most to least specific: the user's setting in this
/// guild, then the guild-wide setting, then the user's global setting.
pub async fn default_repo_for(
    store: &dyn ConfigStore,
    scope: &CommandScope,
) -> Result<Option<RepositoryName>> {
    if let Some(guild_id) = scope.guild_id {
        if let Some(repo) = store
            .default_repo(ConfigScope::UserGuild {
                user_id: scope.user_id,
                guild_id,
            })
            .await?
        {
            return Ok(Some(repo));
        }

        if let Some(repo) = store.default_repo(ConfigScope::Guild { guild_id }).await? {
            return Ok(Some(repo));
        }
    }

    store
        .default_repo(ConfigScope::User {
            user_id: scope.user_id,
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::memory::MemoryStore;

    fn repo(name: &str) -> RepositoryName {
        RepositoryName::parse(name).unwrap()
    }

    #[tokio::test]
    async fn test_precedence_user_guild_first() {
        let store = MemoryStore::new();
        store
            .set_default_repo(ConfigScope::User { user_id: 1 }, repo("global/repo"))
            .await;
        store
            .set_default_repo(ConfigScope::Guild { guild_id: 9 }, repo("guild/repo"))
            .await;
        store
            .set_default_repo(
                ConfigScope::UserGuild {
                    user_id: 1,
                    guild_id: 9,
                },
                repo("user-guild/repo"),
            )
            .await;

        let found = default_repo_for(&store, &CommandScope::guild(1, 9))
            .await
            .unwrap();
        assert_eq!(found, Some(repo("user-guild/repo")));
    }

    #[tokio::test]
    async fn test_precedence_guild_over_global() {
        let store = MemoryStore::new();
        store
            .set_default_repo(ConfigScope::User { user_id: 1 }, repo("global/repo"))
            .await;
        store
            .set_default_repo(ConfigScope::Guild { guild_id: 9 }, repo("guild/repo"))
            .await;

        let found = default_repo_for(&store, &CommandScope::guild(1, 9))
            .await
            .unwrap();
        assert_eq!(found, Some(repo("guild/repo")));
    }

    #[tokio::test]
    async fn test_global_fallback() {
        let store = MemoryStore::new();
        store
            .set_default_repo(ConfigScope::User { user_id: 1 }, repo("global/repo"))
            .await;

        let found = default_repo_for(&store, &CommandScope::guild(1, 9))
            .await
            .unwrap();
        assert_eq!(found, Some(repo("global/repo")));
    }

    #[tokio::test]
    async fn test_guild_settings_ignored_in_dms() {
        let store = MemoryStore::new();
        store
            .set_default_repo(ConfigScope::Guild { guild_id: 9 }, repo("guild/repo"))
            .await;

        let found = default_repo_for(&store, &CommandScope::dm(1)).await.unwrap();
        assert_eq!(found, None);
    }

    #[tokio::test]
    async fn test_none_configured() {
        let store = MemoryStore::new();
        let found = default_repo_for(&store, &CommandScope::guild(1, 9))
            .await
            .unwrap();
        assert_eq!(found, None);
    }
}
