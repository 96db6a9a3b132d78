//! Data model for the dashboard
//!
//! Wire types mirror the subset of GitHub's JSON we read; domain types are
//! what the aggregator and the view work with.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Ref prefixes stripped to get a branch name, most specific first
const REF_PREFIXES: [&str; 3] = ["refs/heads/", "refs/tags/", "refs/"];

/// Refs preferred as the default branch
pub const DEFAULT_BRANCH_REFS: [&str; 2] = ["refs/heads/master", "refs/heads/main"];

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct RepoMetadata {
    pub full_name: String,
    pub owner: AccountRef,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub default_branch: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountRef {
    pub login: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchCount {
    pub total_count: u64,
}

/// One entry of `GET /repos/{owner}/{repo}/git/refs`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GitRef {
    #[serde(rename = "ref")]
    pub ref_name: String,
}

impl GitRef {
    pub fn new(ref_name: impl Into<String>) -> Self {
        Self {
            ref_name: ref_name.into(),
        }
    }

    /// Pull-request refs are not branches and never get commits fetched
    pub fn is_pull_request(&self) -> bool {
        self.ref_name.contains("pull")
    }

    /// Branch name used as the commit map key and the `sha` query parameter
    pub fn branch_name(&self) -> &str {
        REF_PREFIXES
            .iter()
            .find_map(|prefix| self.ref_name.strip_prefix(prefix))
            .unwrap_or(&self.ref_name)
    }

    pub fn is_default_candidate(&self) -> bool {
        DEFAULT_BRANCH_REFS.contains(&self.ref_name.as_str())
    }
}

/// One entry of `GET /repos/{owner}/{repo}/commits`
#[derive(Debug, Clone, Deserialize)]
pub struct CommitResponse {
    pub sha: String,
    pub commit: CommitDetail,
    #[serde(default)]
    pub author: Option<AccountRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitDetail {
    pub message: String,
    #[serde(default)]
    pub author: Option<CommitSignature>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitSignature {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

// =============================================================================
// Domain types
// =============================================================================

/// A commit as shown in the commit list and detail pane
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Commit {
    pub sha: String,
    pub message: String,
    pub author_name: Option<String>,
    pub author_date: Option<DateTime<Utc>>,
    pub author_avatar_url: Option<String>,
}

impl Commit {
    pub fn short_sha(&self) -> &str {
        self.sha.get(..7).unwrap_or(&self.sha)
    }

    pub fn summary_line(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }
}

impl From<CommitResponse> for Commit {
    fn from(response: CommitResponse) -> Self {
        let (author_name, author_date) = match response.commit.author {
            Some(signature) => (signature.name, signature.date),
            None => (None, None),
        };

        Self {
            sha: response.sha,
            message: response.commit.message,
            author_name,
            author_date,
            author_avatar_url: response.author.and_then(|a| a.avatar_url),
        }
    }
}

/// Issue and pull request counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IssueCounts {
    pub open_issues: u64,
    pub closed_issues: u64,
    pub open_prs: u64,
    pub closed_prs: u64,
}

/// Entry in the repository selector
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RepositoryListEntry {
    pub full_name: String,
}

impl RepositoryListEntry {
    pub fn new(full_name: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
        }
    }

    pub fn owner(&self) -> &str {
        self.split().0
    }

    pub fn name(&self) -> &str {
        self.split().1
    }

    fn split(&self) -> (&str, &str) {
        self.full_name
            .split_once('/')
            .unwrap_or((self.full_name.as_str(), ""))
    }
}

/// Signed-in user shown in the header and user menu
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserProfile {
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl UserProfile {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.login)
    }
}

/// Branch and commit the view is focused on
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub branch: String,
    pub commit_sha: String,
}

/// Composite repository state assembled by the aggregator
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositorySummary {
    pub full_name: String,
    pub owner_login: String,
    pub description: Option<String>,
    pub html_url: Option<String>,
    pub default_branch: Option<String>,
    pub counts: Option<IssueCounts>,
    /// Branch names in the order the API listed their refs
    pub branches: Vec<String>,
    /// `None` until commit data exists (placeholder or empty repository)
    pub commits_by_branch: Option<HashMap<String, Vec<Commit>>>,
    pub selection: Selection,
}

impl RepositorySummary {
    /// Placeholder shown while a non-silent load is running
    pub fn placeholder(owner: &str, repo: &str) -> Self {
        Self {
            full_name: format!("{}/{}", owner, repo),
            owner_login: owner.to_string(),
            description: None,
            html_url: None,
            default_branch: None,
            counts: None,
            branches: Vec::new(),
            commits_by_branch: None,
            selection: Selection::default(),
        }
    }

    pub fn has_commit_data(&self) -> bool {
        self.commits_by_branch.is_some()
    }

    pub fn commits(&self, branch: &str) -> &[Commit] {
        self.commits_by_branch
            .as_ref()
            .and_then(|map| map.get(branch))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn selected_commits(&self) -> &[Commit] {
        self.commits(&self.selection.branch)
    }

    pub fn selected_commit(&self) -> Option<&Commit> {
        if self.selection.commit_sha.is_empty() {
            return None;
        }
        self.selected_commits()
            .iter()
            .find(|c| c.sha == self.selection.commit_sha)
    }

    pub fn has_branch(&self, branch: &str) -> bool {
        self.commits_by_branch
            .as_ref()
            .is_some_and(|map| map.contains_key(branch))
    }

    /// Whether `selection` names an existing branch and, if set, a commit on it
    pub fn accepts(&self, selection: &Selection) -> bool {
        if selection.branch.is_empty() || !self.has_branch(&selection.branch) {
            return false;
        }
        selection.commit_sha.is_empty()
            || self
                .commits(&selection.branch)
                .iter()
                .any(|c| c.sha == selection.commit_sha)
    }

    /// `previous` adjusted to this summary with the smallest change
    ///
    /// The branch is kept while it exists; a commit that dropped out of the
    /// branch's list falls back to the branch head, or to none if the branch
    /// has no commits. `None` when the branch itself is gone.
    pub fn carry_over(&self, previous: &Selection) -> Option<Selection> {
        if previous.branch.is_empty() || !self.has_branch(&previous.branch) {
            return None;
        }
        if self.accepts(previous) {
            return Some(previous.clone());
        }

        let commit_sha = self
            .commits(&previous.branch)
            .first()
            .map(|c| c.sha.clone())
            .unwrap_or_default();
        Some(Selection {
            branch: previous.branch.clone(),
            commit_sha,
        })
    }

    /// Whether the selection satisfies the branch/commit invariant
    pub fn selection_is_consistent(&self) -> bool {
        let sel = &self.selection;
        if sel.branch.is_empty() {
            return sel.commit_sha.is_empty();
        }
        if !self.has_branch(&sel.branch) {
            return false;
        }
        sel.commit_sha.is_empty() || self.selected_commit().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_ref_branch_name() {
        assert_eq!(GitRef::new("refs/heads/main").branch_name(), "main");
        assert_eq!(
            GitRef::new("refs/heads/feature/login").branch_name(),
            "feature/login"
        );
        assert_eq!(GitRef::new("refs/tags/v1.0").branch_name(), "v1.0");
        assert_eq!(GitRef::new("refs/notes/commits").branch_name(), "notes/commits");
        assert_eq!(GitRef::new("HEAD").branch_name(), "HEAD");
    }

    #[test]
    fn test_git_ref_pull_detection() {
        assert!(GitRef::new("refs/pull/12/head").is_pull_request());
        assert!(!GitRef::new("refs/heads/main").is_pull_request());
        // Substring match, not path segment match
        assert!(GitRef::new("refs/heads/pull-fix").is_pull_request());
    }

    #[test]
    fn test_default_candidates() {
        assert!(GitRef::new("refs/heads/main").is_default_candidate());
        assert!(GitRef::new("refs/heads/master").is_default_candidate());
        assert!(!GitRef::new("refs/heads/mainline").is_default_candidate());
        assert!(!GitRef::new("refs/tags/main").is_default_candidate());
    }

    #[test]
    fn test_commit_from_response() {
        let json = r#"{
            "sha": "0123456789abcdef",
            "commit": {
                "message": "Fix parser\n\nLonger body",
                "author": {"name": "Mona", "email": "mona@example.com", "date": "2024-01-02T03:04:05Z"}
            },
            "author": {"login": "mona", "avatar_url": "https://avatars.example.com/u/1"}
        }"#;

        let response: CommitResponse = serde_json::from_str(json).unwrap();
        let commit = Commit::from(response);

        assert_eq!(commit.short_sha(), "0123456");
        assert_eq!(commit.summary_line(), "Fix parser");
        assert_eq!(commit.author_name.as_deref(), Some("Mona"));
        assert_eq!(
            commit.author_date.unwrap().to_rfc3339(),
            "2024-01-02T03:04:05+00:00"
        );
        assert_eq!(
            commit.author_avatar_url.as_deref(),
            Some("https://avatars.example.com/u/1")
        );
    }

    #[test]
    fn test_commit_without_linked_account() {
        let json = r#"{
            "sha": "abc",
            "commit": {"message": "init", "author": null},
            "author": null
        }"#;

        let commit = Commit::from(serde_json::from_str::<CommitResponse>(json).unwrap());

        assert_eq!(commit.short_sha(), "abc");
        assert!(commit.author_name.is_none());
        assert!(commit.author_avatar_url.is_none());
    }

    #[test]
    fn test_repository_list_entry_split() {
        let entry = RepositoryListEntry::new("octocat/hello-world");
        assert_eq!(entry.owner(), "octocat");
        assert_eq!(entry.name(), "hello-world");

        let odd = RepositoryListEntry::new("no-slash");
        assert_eq!(odd.owner(), "no-slash");
        assert_eq!(odd.name(), "");
    }

    #[test]
    fn test_placeholder_has_no_commit_data() {
        let summary = RepositorySummary::placeholder("octocat", "hello");
        assert_eq!(summary.full_name, "octocat/hello");
        assert!(!summary.has_commit_data());
        assert!(summary.selected_commit().is_none());
        assert!(summary.selection_is_consistent());
        assert!(summary.commits("main").is_empty());
    }

    #[test]
    fn test_carry_over_changes_as_little_as_possible() {
        let commit = |sha: &str| Commit {
            sha: sha.to_string(),
            message: String::new(),
            author_name: None,
            author_date: None,
            author_avatar_url: None,
        };
        let mut summary = RepositorySummary::placeholder("octocat", "hello");
        summary.commits_by_branch = Some(HashMap::from([
            ("dev".to_string(), vec![commit("d3"), commit("d2")]),
            ("stale".to_string(), Vec::new()),
        ]));
        let selection = |branch: &str, sha: &str| Selection {
            branch: branch.to_string(),
            commit_sha: sha.to_string(),
        };

        assert_eq!(summary.carry_over(&selection("dev", "d2")), Some(selection("dev", "d2")));
        assert_eq!(summary.carry_over(&selection("dev", "d1")), Some(selection("dev", "d3")));
        assert_eq!(summary.carry_over(&selection("stale", "s1")), Some(selection("stale", "")));
        assert_eq!(summary.carry_over(&selection("gone", "g1")), None);
        assert_eq!(summary.carry_over(&Selection::default()), None);
    }

    #[test]
    fn test_user_display_name_falls_back_to_login() {
        let user = UserProfile {
            login: "octocat".to_string(),
            name: None,
            avatar_url: None,
        };
        assert_eq!(user.display_name(), "octocat");
    }
}
