//! Dashboard state
//!
//! Owned by the TUI event loop. Aggregations are started through
//! [`Dashboard::begin_aggregation`], which hands out a generation number, and
//! their results come back through [`Dashboard::apply`]. A result from an
//! older generation than the current one is dropped.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Local};
use tracing::{debug, warn};

use crate::aggregator::AggregateOutcome;
use crate::models::{RepositoryListEntry, RepositorySummary, Selection, UserProfile};

/// Load state of the current repository
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LoadStatus {
    #[default]
    Idle,
    Loading,
    Ready,
    /// The repository has no commits
    Empty,
    Failed(String),
}

/// Parameters of one aggregation run, handed to the background task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationRequest {
    pub generation: u64,
    pub owner: String,
    pub repo: String,
    pub reset_selection: bool,
    pub previous: Option<Selection>,
}

/// Result of an aggregation as posted back to the event loop
#[derive(Debug, Clone)]
pub struct AggregationResult {
    pub request: AggregationRequest,
    pub outcome: std::result::Result<AggregateOutcome, String>,
}

#[derive(Debug, Default)]
pub struct Dashboard {
    summary: Option<RepositorySummary>,
    repositories: Vec<RepositoryListEntry>,
    user: Option<UserProfile>,
    status: LoadStatus,
    last_updated: Option<DateTime<Local>>,
    generation: u64,
    target: Option<(String, String)>,
}

impl Dashboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn summary(&self) -> Option<&RepositorySummary> {
        self.summary.as_ref()
    }

    pub fn repositories(&self) -> &[RepositoryListEntry] {
        &self.repositories
    }

    pub fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    pub fn status(&self) -> &LoadStatus {
        &self.status
    }

    pub fn last_updated(&self) -> Option<DateTime<Local>> {
        self.last_updated
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Owner and name of the repository the dashboard shows
    pub fn target(&self) -> Option<(&str, &str)> {
        self.target
            .as_ref()
            .map(|(owner, repo)| (owner.as_str(), repo.as_str()))
    }

    pub fn set_user(&mut self, user: UserProfile) {
        self.user = Some(user);
    }

    pub fn set_repositories(&mut self, repositories: Vec<RepositoryListEntry>) {
        self.repositories = repositories;
    }

    /// Index of the shown repository in the repository list
    pub fn target_index(&self) -> Option<usize> {
        let (owner, repo) = self.target()?;
        let full_name = format!("{}/{}", owner, repo);
        self.repositories
            .iter()
            .position(|entry| entry.full_name == full_name)
    }

    /// Start an aggregation of `owner/repo`
    ///
    /// A non-silent start bumps the generation, swaps in a placeholder
    /// summary and sets `Loading`. A silent start reuses the current
    /// generation, leaves the view untouched and carries the current selection.
    pub fn begin_aggregation(
        &mut self,
        owner: &str,
        repo: &str,
        reset_selection: bool,
    ) -> AggregationRequest {
        if reset_selection {
            self.generation += 1;
            self.summary = Some(RepositorySummary::placeholder(owner, repo));
            self.target = Some((owner.to_string(), repo.to_string()));
            self.status = LoadStatus::Loading;
        }

        AggregationRequest {
            generation: self.generation,
            owner: owner.to_string(),
            repo: repo.to_string(),
            reset_selection,
            previous: self.current_selection(),
        }
    }

    /// Start a silent refresh of the shown repository, if there is one
    pub fn begin_refresh(&mut self) -> Option<AggregationRequest> {
        let (owner, repo) = self.target.clone()?;
        Some(self.begin_aggregation(&owner, &repo, false))
    }

    /// Apply a finished aggregation; returns false when the result is stale
    pub fn apply(&mut self, result: AggregationResult) -> bool {
        let AggregationResult { request, outcome } = result;

        if request.generation < self.generation {
            debug!(
                "Discarding stale aggregation of {}/{} (generation {} < {})",
                request.owner, request.repo, request.generation, self.generation
            );
            return false;
        }

        match outcome {
            Ok(AggregateOutcome::Ready(mut summary)) => {
                if !request.reset_selection {
                    self.keep_current_selection(&mut summary);
                }
                self.summary = Some(summary);
                self.status = LoadStatus::Ready;
                self.last_updated = Some(Local::now());
            }
            Ok(AggregateOutcome::Empty(summary)) => {
                self.summary = Some(summary);
                self.status = LoadStatus::Empty;
                self.last_updated = Some(Local::now());
            }
            Err(message) => {
                warn!(
                    "Aggregation of {}/{} failed: {}",
                    request.owner, request.repo, message
                );
                self.status = LoadStatus::Failed(message);
            }
        }
        true
    }

    /// Record a repository list refresh
    pub fn touch(&mut self) {
        self.last_updated = Some(Local::now());
    }

    /// Drop everything; used on logout
    pub fn clear(&mut self) {
        let generation = self.generation;
        *self = Self::default();
        // Results still in flight must stay stale
        self.generation = generation + 1;
    }

    /// Select a branch and its newest commit
    pub fn select_branch(&mut self, branch: &str) -> Result<()> {
        let summary = self.loaded_summary_mut()?;
        if !summary.has_branch(branch) {
            return Err(anyhow!("Unknown branch: {}", branch));
        }

        let commit_sha = summary
            .commits(branch)
            .first()
            .map(|c| c.sha.clone())
            .unwrap_or_default();
        summary.selection = Selection {
            branch: branch.to_string(),
            commit_sha,
        };
        Ok(())
    }

    /// Select a commit of the active branch
    pub fn select_commit(&mut self, sha: &str) -> Result<()> {
        let summary = self.loaded_summary_mut()?;
        if !summary.selected_commits().iter().any(|c| c.sha == sha) {
            return Err(anyhow!(
                "Commit {} is not on branch {}",
                sha,
                summary.selection.branch
            ));
        }

        summary.selection.commit_sha = sha.to_string();
        Ok(())
    }

    pub fn select_next_commit(&mut self) -> Result<()> {
        self.step_commit(1)
    }

    pub fn select_previous_commit(&mut self) -> Result<()> {
        self.step_commit(-1)
    }

    pub fn select_next_branch(&mut self) -> Result<()> {
        self.step_branch(1)
    }

    pub fn select_previous_branch(&mut self) -> Result<()> {
        self.step_branch(-1)
    }

    fn step_commit(&mut self, delta: isize) -> Result<()> {
        let summary = self.loaded_summary_mut()?;
        let commits = summary.selected_commits();
        if commits.is_empty() {
            return Ok(());
        }

        let current = commits
            .iter()
            .position(|c| c.sha == summary.selection.commit_sha);
        let next = step_index(current, commits.len(), delta);
        let sha = commits[next].sha.clone();
        self.select_commit(&sha)
    }

    fn step_branch(&mut self, delta: isize) -> Result<()> {
        let summary = self.loaded_summary_mut()?;
        if summary.branches.is_empty() {
            return Ok(());
        }

        let current = summary
            .branches
            .iter()
            .position(|b| *b == summary.selection.branch);
        let next = step_index(current, summary.branches.len(), delta);
        let branch = summary.branches[next].clone();
        self.select_branch(&branch)
    }

    fn loaded_summary_mut(&mut self) -> Result<&mut RepositorySummary> {
        match self.summary.as_mut() {
            Some(summary) if summary.has_commit_data() => Ok(summary),
            _ => Err(anyhow!("No commit data loaded")),
        }
    }

    fn current_selection(&self) -> Option<Selection> {
        self.summary
            .as_ref()
            .filter(|s| s.has_commit_data())
            .map(|s| s.selection.clone())
    }

    /// Re-apply a selection the user made while a silent refresh was running
    fn keep_current_selection(&self, incoming: &mut RepositorySummary) {
        let Some(current) = self.summary.as_ref() else {
            return;
        };
        if current.full_name != incoming.full_name {
            return;
        }
        if let Some(selection) = incoming.carry_over(&current.selection) {
            incoming.selection = selection;
        }
    }
}

/// Clamped index step; no current position starts at the first entry
fn step_index(current: Option<usize>, len: usize, delta: isize) -> usize {
    match current {
        None => 0,
        Some(i) => {
            let next = i as isize + delta;
            next.clamp(0, len as isize - 1) as usize
        }
    }
}
