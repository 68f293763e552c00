//! Repository name parsing and formatting
//!
//! `RepositoryName` is the `owner/repo` value type used throughout the
//! reference grammar. It can only be constructed through parsing (or from a
//! canonical GitHub URL), so both fields are always non-empty.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{GhUtilsError, Result};

/// An `owner/repo` pair identifying a GitHub repository
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepositoryName {
    /// Repository owner (user or organization)
    owner: String,
    /// Repository name
    repo: String,
}

impl RepositoryName {
    /// Parse a `owner/repo` string
    ///
    /// Splits on the first `/`; both sides must be non-empty.
    pub fn parse(value: &str) -> Result<Self> {
        let Some((owner, repo)) = value.split_once('/') else {
            return Err(GhUtilsError::MalformedRepository {
                input: value.to_string(),
                reason: "Missing '/' between username and repository".to_string(),
            });
        };

        if owner.is_empty() || repo.is_empty() {
            return Err(GhUtilsError::MalformedRepository {
                input: value.to_string(),
                reason: "Owner and/or repository is blank".to_string(),
            });
        }

        Ok(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }

    /// Parse, returning `None` instead of an error
    pub fn try_parse(value: &str) -> Option<Self> {
        Self::parse(value).ok()
    }

    /// Extract the repository name from a GitHub HTML URL
    ///
    /// Accepts `https://github.com/owner/repo` and any longer path below it
    /// (issue pages, commit pages, and so on).
    pub fn from_url(url: &str) -> Result<Self> {
        let parsed = Url::parse(url).map_err(|_| GhUtilsError::MalformedRepository {
            input: url.to_string(),
            reason: "Not a valid URL".to_string(),
        })?;

        if parsed.host_str() != Some("github.com") {
            return Err(GhUtilsError::MalformedRepository {
                input: url.to_string(),
                reason: "Not a github.com URL".to_string(),
            });
        }

        let mut segments = parsed
            .path()
            .trim_start_matches('/')
            .trim_end_matches(".git")
            .splitn(3, '/');

        match (segments.next(), segments.next()) {
            (Some(owner), Some(repo)) if !owner.is_empty() && !repo.is_empty() => Ok(Self {
                owner: owner.to_string(),
                repo: repo.to_string(),
            }),
            _ => Err(GhUtilsError::MalformedRepository {
                input: url.to_string(),
                reason: "URL path does not contain owner/repo".to_string(),
            }),
        }
    }

    /// Repository owner (user or organization)
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Repository name
    pub fn repo(&self) -> &str {
        &self.repo
    }
}

impl fmt::Display for RepositoryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

impl FromStr for RepositoryName {
    type Err = GhUtilsError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trip() {
        let name = RepositoryName::parse("octocat/Hello-World").unwrap();
        assert_eq!(name.owner(), "octocat");
        assert_eq!(name.repo(), "Hello-World");
        assert_eq!(
            RepositoryName::parse(&name.to_string()).unwrap(),
            name,
        );
    }

    #[test]
    fn test_parse_splits_on_first_slash() {
        let name = RepositoryName::parse("owner/repo/extra").unwrap();
        assert_eq!(name.owner(), "owner");
        assert_eq!(name.repo(), "repo/extra");
    }

    #[test]
    fn test_parse_missing_separator() {
        assert!(matches!(
            RepositoryName::parse("octocat"),
            Err(GhUtilsError::MalformedRepository { .. })
        ));
    }

    #[test]
    fn test_parse_blank_parts() {
        assert!(RepositoryName::parse("/repo").is_err());
        assert!(RepositoryName::parse("owner/").is_err());
        assert!(RepositoryName::parse("/").is_err());
    }

    #[test]
    fn test_try_parse() {
        assert!(RepositoryName::try_parse("a/b").is_some());
        assert!(RepositoryName::try_parse("nope").is_none());
    }

    #[test]
    fn test_from_url() {
        let name = RepositoryName::from_url("https://github.com/octocat/Hello-World").unwrap();
        assert_eq!(name.to_string(), "octocat/Hello-World");

        let name =
            RepositoryName::from_url("https://github.com/octocat/Hello-World/issues/42").unwrap();
        assert_eq!(name.to_string(), "octocat/Hello-World");
    }

    #[test]
    fn test_from_url_rejects_other_hosts() {
        assert!(RepositoryName::from_url("https://gitlab.com/owner/repo").is_err());
        assert!(RepositoryName::from_url("not-a-url").is_err());
    }
}
