//! Reference resolution and autocomplete
//!
//! One algorithm turns short textual references (`owner/repo#123`,
//! `owner/repo@sha`, bare `#123` against a configured default repository,
//! or full GitHub URLs) into resolved API entities. Issues, pull requests,
//! and commits differ only in their separator, identifier syntax, and the
//! two API operations, captured by the [`ReferenceKind`] trait.
//!
//! Resolution surfaces structured errors for the command layer to render;
//! autocomplete never errors, because the interactive suggestion channel
//! has nowhere to put one.

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::config::{default_repo_for, CommandScope, ConfigStore};
use crate::core::session::{LoginState, SessionManager};
use crate::error::{GhUtilsError, Result};
use crate::github::client::GitHubClient;
use crate::github::repository::RepositoryName;

/// GitHub URL form of a reference, e.g. `github.com/owner/repo/issues/123`
static URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:https?://)?github\.com/(?P<repo>[\w-]+/[\w-]+)/(?P<path>[\w-]+)/(?P<reference>[\w-]+)",
    )
    .expect("Invalid reference URL pattern")
});

static ISSUE_NUMBER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+").expect("Invalid issue number pattern"));

static COMMIT_SHA_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9a-f]{5,40}").expect("Invalid commit sha pattern"));

/// Discord's cap on autocomplete suggestions
const MAX_SUGGESTIONS: usize = 25;

/// Discord's display-length budget for a suggestion label
const SUGGESTION_LABEL_BUDGET: usize = 100;

/// A resolved reference: the repository it lives in plus the API entity
#[derive(Debug, Clone)]
pub struct Reference<T> {
    pub repo: RepositoryName,
    pub entity: T,
}

/// An autocomplete suggestion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    /// What the user sees
    pub label: String,
    /// What gets submitted when they pick it
    pub value: String,
}

impl Suggestion {
    fn build(repo: &RepositoryName, separator: char, identifier: &str, description: &str) -> Self {
        let value = format!("{repo}{separator}{identifier}");
        let label = truncate_str(&format!("{value}: {description}"), SUGGESTION_LABEL_BUDGET);
        Self { label, value }
    }

    fn info(message: &str) -> Self {
        Self {
            label: message.to_string(),
            value: String::new(),
        }
    }
}

/// The per-kind capabilities shared resolution is parametrized over
#[async_trait]
pub trait ReferenceKind: Send + Sync {
    /// The API entity this kind resolves to
    type Entity: Send;

    /// Separator between repository and identifier (`#` or `@`)
    fn separator(&self) -> char;

    /// Path segment in GitHub URLs (`issues`, `pull`, `commit`)
    fn url_path(&self) -> &'static str;

    /// Identifier syntax, anchored at the start of the string
    fn identifier_pattern(&self) -> &Regex;

    /// Fetch the entity for an identifier that matched the pattern
    async fn resolve(
        &self,
        github: &GitHubClient,
        repo: &RepositoryName,
        identifier: &str,
    ) -> Result<Self::Entity>;

    /// Search for `(identifier, description)` pairs matching a partial query
    async fn search(
        &self,
        github: &GitHubClient,
        repo: &RepositoryName,
        query: &str,
    ) -> Result<Vec<(String, String)>>;
}

/// Shared resolution algorithm over any [`ReferenceKind`]
pub struct ReferenceResolver {
    sessions: Arc<SessionManager>,
    configs: Arc<dyn ConfigStore>,
}

impl ReferenceResolver {
    /// Create a resolver
    pub fn new(sessions: Arc<SessionManager>, configs: Arc<dyn ConfigStore>) -> Self {
        Self { sessions, configs }
    }

    /// Resolve a raw input string into an entity reference
    ///
    /// Opens a session for the invoking user and closes it on every exit
    /// path. Parse failures, missing default repos, 404s, and other API
    /// failures each map to their own error variant.
    pub async fn resolve<K: ReferenceKind>(
        &self,
        kind: &K,
        scope: &CommandScope,
        input: &str,
    ) -> Result<Reference<K::Entity>> {
        let session = self.sessions.open_session(scope.user_id).await?;
        let result = self.resolve_with(kind, session.github(), scope, input).await;
        let closed = session.close().await;
        let value = result?;
        closed?;
        Ok(value)
    }

    /// Resolve using an already-open client
    ///
    /// For callers that hold a session across several operations.
    pub async fn resolve_with<K: ReferenceKind>(
        &self,
        kind: &K,
        github: &GitHubClient,
        scope: &CommandScope,
        input: &str,
    ) -> Result<Reference<K::Entity>> {
        let (repo, rest) = self.repo_and_query(kind, scope, input).await?;

        // anchored match; trailing characters like `: some title` are fine
        let identifier = kind
            .identifier_pattern()
            .find(&rest)
            .map(|matched| matched.as_str().to_string());
        let Some(identifier) = identifier else {
            return Err(GhUtilsError::MalformedIdentifier { input: rest });
        };

        match kind.resolve(github, &repo, &identifier).await {
            Ok(entity) => Ok(Reference { repo, entity }),
            Err(err) => Err(resolution_error(input, err)),
        }
    }

    /// Produce autocomplete suggestions for a partial input
    ///
    /// Never errors: users who aren't logged in get a single informational
    /// suggestion, parse failures while typing yield an empty list, and API
    /// failures are swallowed (warn-logged unless rate limited).
    pub async fn autocomplete<K: ReferenceKind>(
        &self,
        kind: &K,
        scope: &CommandScope,
        input: &str,
    ) -> Vec<Suggestion> {
        let session = match self.sessions.open_session(scope.user_id).await {
            Ok(session) => session,
            Err(e) => {
                warn!("Failed to open session for autocomplete: {e}");
                return Vec::new();
            }
        };

        let suggestions = match login_sentinel(session.state()) {
            Some(sentinel) => vec![sentinel],
            None => {
                self.autocomplete_with(kind, session.github(), scope, input)
                    .await
            }
        };

        if let Err(e) = session.close().await {
            warn!("Failed to close autocomplete session: {e}");
        }
        suggestions
    }

    async fn autocomplete_with<K: ReferenceKind>(
        &self,
        kind: &K,
        github: &GitHubClient,
        scope: &CommandScope,
        input: &str,
    ) -> Vec<Suggestion> {
        // degrade silently while the user is still typing
        let Ok((repo, query)) = self.repo_and_query(kind, scope, input).await else {
            return Vec::new();
        };

        match kind.search(github, &repo, &query).await {
            Ok(items) => items
                .into_iter()
                .take(MAX_SUGGESTIONS)
                .map(|(identifier, description)| {
                    Suggestion::build(&repo, kind.separator(), &identifier, &description)
                })
                .collect(),
            Err(GhUtilsError::RateLimited) => Vec::new(),
            Err(e) => {
                warn!("Unexpected autocomplete search failure: {e}");
                Vec::new()
            }
        }
    }

    /// Split an input into its repository and identifier parts
    ///
    /// Tries the URL form first, then the kind's separator; an input with
    /// no repository part falls back to the configured default repo, most
    /// specific scope first.
    async fn repo_and_query<K: ReferenceKind>(
        &self,
        kind: &K,
        scope: &CommandScope,
        input: &str,
    ) -> Result<(RepositoryName, String)> {
        let (raw_repo, rest) = match URL_PATTERN.captures(input) {
            Some(caps) if &caps["path"] == kind.url_path() => (
                caps["repo"].to_string(),
                caps["reference"].to_string(),
            ),
            _ => match input.split_once(kind.separator()) {
                Some((left, right)) => (left.to_string(), right.to_string()),
                None => (String::new(), input.to_string()),
            },
        };
        let rest = rest.trim().to_string();

        if raw_repo.is_empty() {
            if let Some(repo) = default_repo_for(self.configs.as_ref(), scope).await? {
                return Ok((repo, rest));
            }
            return Err(GhUtilsError::MissingRepository {
                input: input.to_string(),
            });
        }

        Ok((RepositoryName::parse(&raw_repo)?, rest))
    }
}

/// Sentinel suggestion shown instead of searching when not logged in
fn login_sentinel(state: LoginState) -> Option<Suggestion> {
    match state {
        LoginState::LoggedIn => None,
        LoginState::LoggedOut => Some(Suggestion::info(
            "Autocomplete requires login. Use /gh login to enable it.",
        )),
        LoginState::Expired => Some(Suggestion::info(
            "Your GitHub login has expired. Use /gh login again to re-enable autocomplete.",
        )),
    }
}

/// Attach the offending input to an error coming out of a kind's resolve
fn resolution_error(input: &str, err: GhUtilsError) -> GhUtilsError {
    match err {
        GhUtilsError::NotFound { .. } => GhUtilsError::NotFound {
            reference: input.to_string(),
        },
        e @ (GhUtilsError::MissingRepository { .. }
        | GhUtilsError::MalformedRepository { .. }
        | GhUtilsError::MalformedIdentifier { .. }
        | GhUtilsError::Store(_)) => e,
        other => {
            warn!("Failed to resolve reference '{input}': {other}");
            GhUtilsError::Resolution {
                reference: input.to_string(),
                source: Box::new(other),
            }
        }
    }
}

/// Truncate to a display budget, appending `...` when something was cut
fn truncate_str(text: &str, limit: usize) -> String {
    const MARKER: &str = "...";

    let budget = limit.saturating_sub(MARKER.len());
    if text.chars().count() <= budget {
        return text.to_string();
    }

    let mut truncated: String = text.chars().take(budget).collect();
    truncated.push_str(MARKER);
    truncated
}

/// First 10 characters of a commit SHA
fn shorten_sha(sha: &str) -> &str {
    &sha[..sha.len().min(10)]
}

// ─────────────────────────────────────────────────────────────────────────
// Concrete kinds
// ─────────────────────────────────────────────────────────────────────────

/// Issue and PR search share one endpoint, filtered by an `is:` qualifier
async fn search_issues_and_prs(
    github: &GitHubClient,
    repo: &RepositoryName,
    query: &str,
    issue_type: &str,
) -> Result<Vec<(String, String)>> {
    let gh = github.octocrab().await?;
    let q = format!("{query} is:{issue_type} repo:{repo}");
    let results = gh
        .search()
        .issues_and_pull_requests(&q)
        .per_page(MAX_SUGGESTIONS as u8)
        .send()
        .await?;

    Ok(results
        .items
        .into_iter()
        .map(|issue| (issue.number.to_string(), issue.title))
        .collect())
}

/// Issue references: `owner/repo#123`
pub struct IssueKind;

#[async_trait]
impl ReferenceKind for IssueKind {
    type Entity = octocrab::models::issues::Issue;

    fn separator(&self) -> char {
        '#'
    }

    fn url_path(&self) -> &'static str {
        "issues"
    }

    fn identifier_pattern(&self) -> &Regex {
        &ISSUE_NUMBER_PATTERN
    }

    async fn resolve(
        &self,
        github: &GitHubClient,
        repo: &RepositoryName,
        identifier: &str,
    ) -> Result<Self::Entity> {
        let number = parse_issue_number(identifier)?;
        let gh = github.octocrab().await?;
        Ok(gh.issues(repo.owner(), repo.repo()).get(number).await?)
    }

    async fn search(
        &self,
        github: &GitHubClient,
        repo: &RepositoryName,
        query: &str,
    ) -> Result<Vec<(String, String)>> {
        search_issues_and_prs(github, repo, query, "issue").await
    }
}

/// Pull request references: `owner/repo#123`
pub struct PullRequestKind;

#[async_trait]
impl ReferenceKind for PullRequestKind {
    type Entity = octocrab::models::pulls::PullRequest;

    fn separator(&self) -> char {
        '#'
    }

    fn url_path(&self) -> &'static str {
        "pull"
    }

    fn identifier_pattern(&self) -> &Regex {
        &ISSUE_NUMBER_PATTERN
    }

    async fn resolve(
        &self,
        github: &GitHubClient,
        repo: &RepositoryName,
        identifier: &str,
    ) -> Result<Self::Entity> {
        let number = parse_issue_number(identifier)?;
        let gh = github.octocrab().await?;
        Ok(gh.pulls(repo.owner(), repo.repo()).get(number).await?)
    }

    async fn search(
        &self,
        github: &GitHubClient,
        repo: &RepositoryName,
        query: &str,
    ) -> Result<Vec<(String, String)>> {
        search_issues_and_prs(github, repo, query, "pr").await
    }
}

fn parse_issue_number(identifier: &str) -> Result<u64> {
    identifier
        .parse()
        .map_err(|_| GhUtilsError::MalformedIdentifier {
            input: identifier.to_string(),
        })
}

/// Minimal commit model for the endpoints octocrab has no typed calls for
#[derive(Debug, Clone, Deserialize)]
pub struct CommitSummary {
    pub sha: String,
    pub html_url: String,
    pub commit: CommitDetail,
}

/// The git-level commit data nested inside a commit response
#[derive(Debug, Clone, Deserialize)]
pub struct CommitDetail {
    pub message: String,
}

impl CommitSummary {
    /// First line of the commit message
    pub fn summary_line(&self) -> &str {
        self.commit.message.lines().next().unwrap_or_default()
    }
}

#[derive(Serialize)]
struct PerPageParams {
    per_page: u8,
}

#[derive(Serialize)]
struct SearchParams {
    q: String,
    per_page: u8,
}

#[derive(Debug, Deserialize)]
struct CommitSearchResults {
    items: Vec<CommitSummary>,
}

/// Commit references: `owner/repo@sha`, prefixes of 5 hex chars or more
pub struct CommitKind;

#[async_trait]
impl ReferenceKind for CommitKind {
    type Entity = CommitSummary;

    fn separator(&self) -> char {
        '@'
    }

    fn url_path(&self) -> &'static str {
        "commit"
    }

    fn identifier_pattern(&self) -> &Regex {
        &COMMIT_SHA_PATTERN
    }

    async fn resolve(
        &self,
        github: &GitHubClient,
        repo: &RepositoryName,
        identifier: &str,
    ) -> Result<Self::Entity> {
        let gh = github.octocrab().await?;
        let route = format!(
            "/repos/{}/{}/commits/{}",
            repo.owner(),
            repo.repo(),
            identifier
        );
        Ok(gh.get(&route, None::<&()>).await?)
    }

    async fn search(
        &self,
        github: &GitHubClient,
        repo: &RepositoryName,
        query: &str,
    ) -> Result<Vec<(String, String)>> {
        let gh = github.octocrab().await?;

        let commits: Vec<CommitSummary> = if query.is_empty() {
            // commit search rejects an empty query, so list recent commits
            let route = format!("/repos/{}/{}/commits", repo.owner(), repo.repo());
            gh.get(
                &route,
                Some(&PerPageParams {
                    per_page: MAX_SUGGESTIONS as u8,
                }),
            )
            .await?
        } else {
            let results: CommitSearchResults = gh
                .get(
                    "/search/commits",
                    Some(&SearchParams {
                        q: format!("{query} repo:{repo}"),
                        per_page: MAX_SUGGESTIONS as u8,
                    }),
                )
                .await?;
            results.items
        };

        Ok(commits
            .into_iter()
            .map(|commit| {
                (
                    shorten_sha(&commit.sha).to_string(),
                    commit.summary_line().to_string(),
                )
            })
            .collect())
    }
}
