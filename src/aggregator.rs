//! Repository aggregation
//!
//! Assembles a [`RepositorySummary`] from a fixed sequence of GitHub reads:
//! metadata, four issue/PR searches, the ref listing and one commit listing
//! per non-pull-request ref. Requests are awaited one after another.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::github::{RefListing, RepoApi};
use crate::models::{Commit, GitRef, IssueCounts, RepositorySummary, Selection};

/// What an aggregation produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggregateOutcome {
    /// Metadata, counts and commit lists for every branch
    Ready(RepositorySummary),
    /// The repository has no commits; the summary carries no commit map
    Empty(RepositorySummary),
}

impl AggregateOutcome {
    pub fn summary(&self) -> &RepositorySummary {
        match self {
            Self::Ready(summary) | Self::Empty(summary) => summary,
        }
    }

    pub fn into_summary(self) -> RepositorySummary {
        match self {
            Self::Ready(summary) | Self::Empty(summary) => summary,
        }
    }

    pub fn is_empty_repository(&self) -> bool {
        matches!(self, Self::Empty(_))
    }
}

/// Search queries for open issues, closed issues, open PRs and closed PRs
pub fn search_queries(owner: &str, repo: &str) -> [String; 4] {
    let scope = format!("repo:{}/{}", owner, repo);
    [
        format!("{} type:issue state:open", scope),
        format!("{} type:issue state:closed", scope),
        format!("{} type:pr state:open", scope),
        format!("{} type:pr state:closed", scope),
    ]
}

/// Builds repository summaries from the GitHub API
#[derive(Clone)]
pub struct Aggregator {
    api: Arc<dyn RepoApi>,
}

impl Aggregator {
    pub fn new(api: Arc<dyn RepoApi>) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &Arc<dyn RepoApi> {
        &self.api
    }

    /// Fetch and assemble the summary of `owner/repo`
    ///
    /// With `reset_selection` the default branch and its newest commit are
    /// selected. Without it (silent refresh) the branch of `previous` is kept
    /// while it exists, with its commit moved to the branch head only when the
    /// commit dropped out of the list.
    pub async fn aggregate(
        &self,
        owner: &str,
        repo: &str,
        reset_selection: bool,
        previous: Option<&Selection>,
    ) -> Result<AggregateOutcome> {
        let started = Instant::now();
        debug!(
            "Aggregating {}/{} (reset_selection: {})",
            owner, repo, reset_selection
        );

        let metadata = self.api.repository(owner, repo).await?;
        let counts = self
            .fetch_counts(owner, repo)
            .await
            .with_context(|| format!("Failed to count issues for {}/{}", owner, repo))?;

        let mut summary = RepositorySummary {
            full_name: metadata.full_name,
            owner_login: metadata.owner.login,
            description: metadata.description,
            html_url: metadata.html_url,
            default_branch: metadata.default_branch,
            counts: Some(counts),
            branches: Vec::new(),
            commits_by_branch: None,
            selection: Selection::default(),
        };

        let refs = match self.api.list_refs(owner, repo).await? {
            RefListing::Refs(refs) => refs,
            RefListing::EmptyRepository => {
                info!("{}/{} has no commits", owner, repo);
                return Ok(AggregateOutcome::Empty(summary));
            }
        };

        let mut branch_refs: Vec<&GitRef> = Vec::new();
        let mut commits_by_branch: HashMap<String, Vec<Commit>> = HashMap::new();

        for git_ref in refs.iter().filter(|r| !r.is_pull_request()) {
            let branch = git_ref.branch_name();
            if commits_by_branch.contains_key(branch) {
                debug!("Skipping {}: branch name {} already seen", git_ref.ref_name, branch);
                continue;
            }

            let commits = self.api.list_commits(owner, repo, branch).await?;
            summary.branches.push(branch.to_string());
            commits_by_branch.insert(branch.to_string(), commits);
            branch_refs.push(git_ref);
        }

        summary.commits_by_branch = Some(commits_by_branch);
        summary.selection = match previous.filter(|_| !reset_selection) {
            Some(previous) => match summary.carry_over(previous) {
                Some(selection) => {
                    if selection.commit_sha != previous.commit_sha {
                        debug!(
                            "Commit {} left {}, moving to {:?}",
                            previous.commit_sha, previous.branch, selection.commit_sha
                        );
                    }
                    selection
                }
                None => {
                    debug!("Branch {} no longer exists, using default", previous.branch);
                    default_selection(&summary, &branch_refs)
                }
            },
            None => default_selection(&summary, &branch_refs),
        };

        info!(
            "Aggregated {} in {:.2}s: {} branches, {} refs skipped",
            summary.full_name,
            started.elapsed().as_secs_f64(),
            summary.branches.len(),
            refs.len() - branch_refs.len()
        );

        Ok(AggregateOutcome::Ready(summary))
    }

    async fn fetch_counts(&self, owner: &str, repo: &str) -> Result<IssueCounts> {
        let [open_issues, closed_issues, open_prs, closed_prs] = search_queries(owner, repo);

        Ok(IssueCounts {
            open_issues: self.api.search_count(&open_issues).await?,
            closed_issues: self.api.search_count(&closed_issues).await?,
            open_prs: self.api.search_count(&open_prs).await?,
            closed_prs: self.api.search_count(&closed_prs).await?,
        })
    }
}

/// `refs/heads/master` or `refs/heads/main` if present, else the first ref;
/// then that branch's newest commit
fn default_selection(summary: &RepositorySummary, refs: &[&GitRef]) -> Selection {
    let branch = refs
        .iter()
        .find(|r| r.is_default_candidate())
        .or_else(|| refs.first())
        .map(|r| r.branch_name().to_string());

    match branch {
        Some(branch) => {
            let commit_sha = summary
                .commits(&branch)
                .first()
                .map(|c| c.sha.clone())
                .unwrap_or_default();
            Selection { branch, commit_sha }
        }
        None => Selection::default(),
    }
}
