//! Core functionality for ghutils
//!
//! This module contains shared business logic including:
//! - Credential storage contracts and the stored token model
//! - Session management (per-user clients and login state)
//! - Default-repository configuration lookup
//! - Login challenge handling for the OAuth web flow
//! - The unauthenticated-refresh cooldown guard
//! - Application settings

/// Discord account identifier (a 64-bit snowflake)
pub type UserId = u64;

/// Discord guild identifier (a 64-bit snowflake)
pub type GuildId = u64;

pub mod config;
pub mod cooldown;
pub mod credentials;
pub mod login;
pub mod memory;
pub mod session;
pub mod settings;

pub use config::{default_repo_for, CommandScope, ConfigScope, ConfigStore};
pub use cooldown::{check_refresh_cooldown, CooldownDecision};
pub use credentials::{CredentialStore, UserCredential};
pub use login::{begin_login, complete_login, consume_login_state, ChallengeStore, LoginChallenge};
pub use memory::MemoryStore;
pub use session::{LoginState, Session, SessionManager};
pub use settings::{GitHubSettings, Settings};
