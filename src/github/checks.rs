//! Commit check-state aggregation
//!
//! A commit's CI state comes from two places: check suites and the older
//! combined-status API. If anything is still running the commit is pending;
//! otherwise a single failure wins over any number of successes; a commit
//! with no checks at all is neutral.
//! https://docs.github.com/en/pull-requests/collaborating-with-pull-requests/collaborating-on-repositories-with-code-quality-features/about-status-checks#types-of-status-checks-on-github

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::github::client::GitHubClient;
use crate::github::paginator::{PageItems, SmartPaginator};
use crate::github::repository::RepositoryName;

/// Aggregate CI state of a commit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitCheckState {
    Success,
    Failure,
    Pending,
    /// No checks or statuses reported anything
    Neutral,
}

/// One check suite from the check-suites listing
#[derive(Debug, Clone, Deserialize)]
pub struct CheckSuite {
    pub status: Option<String>,
    pub conclusion: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CheckSuitesPage {
    total_count: usize,
    check_suites: Vec<CheckSuite>,
}

#[derive(Debug, Deserialize)]
struct CombinedStatus {
    state: String,
}

#[derive(Serialize)]
struct PageParams {
    page: u32,
    per_page: u8,
}

/// Compute the aggregate check state for a commit
///
/// API failures on either endpoint degrade to whatever the other one said
/// rather than failing the whole render.
pub async fn commit_check_state(
    github: &GitHubClient,
    repo: &RepositoryName,
    sha: &str,
) -> CommitCheckState {
    let state = match check_suites_state(github, repo, sha).await {
        Ok(state) => state,
        Err(e) => {
            debug!("Failed to fetch check suites for {repo}@{sha}: {e}");
            CommitCheckState::Neutral
        }
    };

    if matches!(state, CommitCheckState::Pending | CommitCheckState::Failure) {
        return state;
    }

    // if we get here, either all checks passed or there are no checks
    match combined_status(github, repo, sha).await {
        Ok(status) => match status.state.as_str() {
            "success" => CommitCheckState::Success,
            "failure" => CommitCheckState::Failure,
            _ => state,
        },
        Err(e) => {
            debug!("Failed to fetch combined status for {repo}@{sha}: {e}");
            state
        }
    }
}

async fn check_suites_state(
    github: &GitHubClient,
    repo: &RepositoryName,
    sha: &str,
) -> Result<CommitCheckState> {
    let gh = github.octocrab().await?;
    let route = format!(
        "/repos/{}/{}/commits/{}/check-suites",
        repo.owner(),
        repo.repo(),
        sha
    );

    let mut paginator = SmartPaginator::new(100, move |page, per_page| {
        let gh = gh.clone();
        let route = route.clone();
        Box::pin(async move {
            let suites: CheckSuitesPage =
                gh.get(&route, Some(&PageParams { page, per_page })).await?;
            Ok(PageItems {
                items: suites.check_suites,
                total_count: Some(suites.total_count),
            })
        })
    });

    fold_suites(&mut paginator).await
}

/// Fold check suites into one state, stopping early on anything in flight
async fn fold_suites(paginator: &mut SmartPaginator<'_, CheckSuite>) -> Result<CommitCheckState> {
    let mut state = CommitCheckState::Neutral;

    while let Some(suite) = paginator.try_next().await? {
        match suite.status.as_deref() {
            // the default status; it shows up for suites that aren't
            // actually in the UI, so just ignore it
            Some("queued") => {}
            Some("completed") => match suite.conclusion.as_deref() {
                Some("success") => {
                    if state != CommitCheckState::Failure {
                        state = CommitCheckState::Success;
                    }
                }
                Some("failure" | "timed_out" | "startup_failure") => {
                    state = CommitCheckState::Failure;
                }
                _ => {}
            },
            _ => return Ok(CommitCheckState::Pending),
        }
    }

    Ok(state)
}

async fn combined_status(
    github: &GitHubClient,
    repo: &RepositoryName,
    sha: &str,
) -> Result<CombinedStatus> {
    let gh = github.octocrab().await?;
    let route = format!(
        "/repos/{}/{}/commits/{}/status",
        repo.owner(),
        repo.repo(),
        sha
    );
    Ok(gh.get(&route, None::<&()>).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn suite(status: &str, conclusion: Option<&str>) -> CheckSuite {
        CheckSuite {
            status: Some(status.to_string()),
            conclusion: conclusion.map(str::to_string),
        }
    }

    fn paginator_over(
        pages: Vec<Vec<CheckSuite>>,
        calls: Arc<AtomicUsize>,
    ) -> SmartPaginator<'static, CheckSuite> {
        let total: usize = pages.iter().map(Vec::len).sum();
        SmartPaginator::new(100, move |page, _per_page| {
            let pages = pages.clone();
            let calls = Arc::clone(&calls);
            Box::pin(async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(PageItems {
                    items: pages.get(page as usize - 1).cloned().unwrap_or_default(),
                    total_count: Some(total),
                })
            })
        })
    }

    #[tokio::test]
    async fn test_all_success() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut paginator = paginator_over(
            vec![vec![
                suite("completed", Some("success")),
                suite("completed", Some("success")),
            ]],
            calls,
        );
        assert_eq!(
            fold_suites(&mut paginator).await.unwrap(),
            CommitCheckState::Success
        );
    }

    #[tokio::test]
    async fn test_failure_wins_over_success() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut paginator = paginator_over(
            vec![vec![
                suite("completed", Some("failure")),
                suite("completed", Some("success")),
            ]],
            calls,
        );
        assert_eq!(
            fold_suites(&mut paginator).await.unwrap(),
            CommitCheckState::Failure
        );
    }

    #[tokio::test]
    async fn test_in_progress_short_circuits() {
        let calls = Arc::new(AtomicUsize::new(0));
        let pages = vec![
            vec![suite("in_progress", None)],
            vec![suite("completed", Some("success"))],
        ];
        let mut paginator = paginator_over(pages, Arc::clone(&calls));

        assert_eq!(
            fold_suites(&mut paginator).await.unwrap(),
            CommitCheckState::Pending
        );
        // the second page is never requested
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_queued_suites_are_ignored() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut paginator = paginator_over(
            vec![vec![suite("queued", None), suite("completed", Some("success"))]],
            calls,
        );
        assert_eq!(
            fold_suites(&mut paginator).await.unwrap(),
            CommitCheckState::Success
        );
    }

    #[tokio::test]
    async fn test_no_suites_is_neutral() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut paginator = paginator_over(vec![], calls);
        assert_eq!(
            fold_suites(&mut paginator).await.unwrap(),
            CommitCheckState::Neutral
        );
    }

    #[tokio::test]
    async fn test_unrecognized_conclusion_is_skipped() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut paginator = paginator_over(
            vec![vec![suite("completed", Some("skipped"))]],
            calls,
        );
        assert_eq!(
            fold_suites(&mut paginator).await.unwrap(),
            CommitCheckState::Neutral
        );
    }
}
