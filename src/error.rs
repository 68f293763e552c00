//! Custom error types for ghutils
//!
//! User-correctable failures carry the offending input so the command layer
//! can render a consistent "invalid input" response.

use thiserror::Error;

/// Main error type for the ghutils core
#[derive(Error, Debug)]
pub enum GhUtilsError {
    /// Reference omitted the repository and no default repo is configured
    #[error("Missing username and repository: {input}\n\nSet a default repository with `/gh_config default_repo set`, or use the full `owner/repo` form.")]
    MissingRepository {
        /// The raw input value
        input: String,
    },

    /// Repository part of a reference does not match `owner/repo`
    #[error("Invalid repository '{input}': {reason}")]
    MalformedRepository {
        /// The raw repository value
        input: String,
        /// What was wrong with it
        reason: String,
    },

    /// Identifier part of a reference does not match the kind's syntax
    #[error("Malformed reference: {input}")]
    MalformedIdentifier {
        /// The raw identifier value
        input: String,
    },

    /// The API returned 404 for a well-formed reference
    #[error("Failed to resolve reference '{reference}': Not found")]
    NotFound {
        /// The raw input value
        reference: String,
    },

    /// Any other API failure while resolving a reference
    #[error("Failed to resolve reference '{reference}': {source}")]
    Resolution {
        /// The raw input value
        reference: String,
        /// The underlying failure
        source: Box<GhUtilsError>,
    },

    /// Credential or config persistence failure
    #[error("Storage error: {0}")]
    Store(String),

    /// OAuth code exchange or login-state validation failed
    #[error("GitHub authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Token refresh failed with a specific reason
    #[error("Failed to refresh GitHub token: {0}")]
    TokenRefreshFailed(String),

    /// GitHub API error outside of reference resolution
    #[error("GitHub API request failed: {0}")]
    GitHubApi(String),

    /// API rate limit exhausted
    #[error("API rate limit exceeded. Please wait a few minutes and try again, or use `/gh login` for a higher limit.")]
    RateLimited,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("File operation failed: {0}")]
    Io(#[from] std::io::Error),

    /// Network request error
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("Failed to parse response: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML deserialization error
    #[error("Configuration file is invalid: {0}")]
    Toml(String),
}

impl From<octocrab::Error> for GhUtilsError {
    fn from(err: octocrab::Error) -> Self {
        crate::github::error_handler::classify_github_error(err)
    }
}

impl From<toml::de::Error> for GhUtilsError {
    fn from(err: toml::de::Error) -> Self {
        GhUtilsError::Toml(err.to_string())
    }
}

/// Result type alias using GhUtilsError
pub type Result<T> = std::result::Result<T, GhUtilsError>;
