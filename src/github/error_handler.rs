//! GitHub API error detection and classification
//!
//! octocrab's `Display` for API failures hides the interesting parts, so
//! classification digs the status code and message out of the structured
//! error before mapping it onto [`GhUtilsError`].

use crate::error::GhUtilsError;

/// Classify an octocrab error into a more specific GhUtilsError
///
/// 404s become [`GhUtilsError::NotFound`] with an empty reference; the
/// resolver fills in the offending input before surfacing it.
pub fn classify_github_error(err: octocrab::Error) -> GhUtilsError {
    if is_rate_limit(&err) {
        return GhUtilsError::RateLimited;
    }
    if status_code(&err) == Some(404) {
        return GhUtilsError::NotFound {
            reference: String::new(),
        };
    }
    GhUtilsError::GitHubApi(error_message(&err))
}

/// Extract the HTTP status code, if the error came from an API response
pub fn status_code(err: &octocrab::Error) -> Option<u16> {
    match err {
        octocrab::Error::GitHub { source, .. } => Some(source.status_code.as_u16()),
        _ => None,
    }
}

/// Whether the error is an API rate limit rejection
pub fn is_rate_limit(err: &octocrab::Error) -> bool {
    match err {
        octocrab::Error::GitHub { source, .. } => {
            is_rate_limit_parts(source.status_code.as_u16(), &source.message)
        }
        _ => false,
    }
}

fn is_rate_limit_parts(status: u16, message: &str) -> bool {
    status == 403 && message.to_lowercase().contains("rate limit")
}

/// Human-readable message for an octocrab error
pub(crate) fn error_message(err: &octocrab::Error) -> String {
    match err {
        octocrab::Error::GitHub { source, .. } => source.message.clone(),
        other => other.to_string(),
    }
}
