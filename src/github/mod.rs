//! GitHub API integration module
//!
//! This module provides all GitHub-related functionality:
//! - OAuth token exchange/refresh and app-installation authentication
//! - The authenticated client wrapper handed out by sessions
//! - Repository name parsing
//! - Reference resolution and autocomplete for issues, PRs, and commits
//! - Count-aware pagination
//! - Commit check-state aggregation
//! - Error classification

pub mod auth;
pub mod checks;
pub mod client;
pub mod error_handler;
pub mod paginator;
pub mod reference;
pub mod repository;

pub use auth::{OAuthApp, TokenPair, UserTokenAuth};
pub use checks::{commit_check_state, CommitCheckState};
pub use client::GitHubClient;
pub use error_handler::classify_github_error;
pub use paginator::{PageItems, SmartPaginator};
pub use reference::{
    CommitKind, CommitSummary, IssueKind, PullRequestKind, Reference, ReferenceKind,
    ReferenceResolver, Suggestion,
};
pub use repository::RepositoryName;
