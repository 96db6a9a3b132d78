use anyhow::{Context, Result};
use async_trait::async_trait;
use octocrab::Octocrab;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::models::{
    Commit, CommitResponse, GitRef, RepoMetadata, RepositoryListEntry, SearchCount, UserProfile,
};
use crate::session::Session;

/// Message GitHub returns from the ref listing of a repository without commits
const EMPTY_REPOSITORY_MESSAGE: &str = "Git Repository is empty";

/// Page size for list endpoints
const PAGE_SIZE: u8 = 100;
/// Upper bound on repository list pages
const MAX_REPOSITORY_PAGES: u8 = 10;

/// Result of listing a repository's refs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefListing {
    Refs(Vec<GitRef>),
    /// The repository exists but has no commits yet
    EmptyRepository,
}

/// The GitHub reads the dashboard needs
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RepoApi: Send + Sync {
    /// Repository metadata
    async fn repository(&self, owner: &str, repo: &str) -> Result<RepoMetadata>;

    /// `total_count` of an issue search
    async fn search_count(&self, query: &str) -> Result<u64>;

    /// All refs of a repository, in API order
    async fn list_refs(&self, owner: &str, repo: &str) -> Result<RefListing>;

    /// Most recent commits reachable from `branch`
    async fn list_commits(&self, owner: &str, repo: &str, branch: &str) -> Result<Vec<Commit>>;

    /// Public profile of a user
    async fn user(&self, username: &str) -> Result<UserProfile>;

    /// Repositories of the authenticated user
    async fn list_repositories(&self) -> Result<Vec<RepositoryListEntry>>;

    /// Public repositories of a user, used to validate a login
    async fn list_public_repositories(&self, username: &str) -> Result<Vec<RepositoryListEntry>>;
}

/// GitHub client wrapper bound to one session
#[derive(Clone)]
pub struct GitHubClient {
    client: Octocrab,
    username: String,
    commits_per_branch: u8,
    repository_sort: String,
}

impl GitHubClient {
    /// Create a client authenticated with the session's token
    pub fn new(config: &Config, session: &Session) -> Result<Self> {
        let mut builder = Octocrab::builder();

        if let Some(api_url) = &config.github.api_url {
            debug!("Using GitHub API at {}", api_url);
            builder = builder
                .base_uri(api_url.as_str())
                .with_context(|| format!("Invalid GitHub API URL: {}", api_url))?;
        }

        let client = builder
            .personal_token(session.credential().to_string())
            .build()
            .context("Failed to create GitHub client")?;

        Ok(Self {
            client,
            username: session.username().to_string(),
            commits_per_branch: config.github.commits_per_branch,
            repository_sort: config.dashboard.repository_sort.clone(),
        })
    }

    /// Get the session username
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Check that the token can read the user's repositories
    pub async fn verify_login(&self) -> Result<UserProfile> {
        let repos = self
            .list_public_repositories(&self.username)
            .await
            .context("Failed to verify login. Check your username and token.")?;

        info!(
            "Authenticated as GitHub user: {} ({} public repositories)",
            self.username,
            repos.len()
        );

        self.user(&self.username).await
    }
}

/// Whether an octocrab error is GitHub's empty-repository response
fn is_empty_repository(err: &octocrab::Error) -> bool {
    match err {
        octocrab::Error::GitHub { source, .. } => {
            source.message.contains(EMPTY_REPOSITORY_MESSAGE)
        }
        _ => false,
    }
}

#[async_trait]
impl RepoApi for GitHubClient {
    async fn repository(&self, owner: &str, repo: &str) -> Result<RepoMetadata> {
        debug!("Fetching repository metadata for {}/{}", owner, repo);

        self.client
            .get(format!("/repos/{}/{}", owner, repo), None::<&()>)
            .await
            .with_context(|| format!("Failed to fetch repository {}/{}", owner, repo))
    }

    async fn search_count(&self, query: &str) -> Result<u64> {
        debug!("Searching issues: {}", query);

        let result: SearchCount = self
            .client
            .get("/search/issues", Some(&[("q", query), ("per_page", "1")]))
            .await
            .with_context(|| format!("Failed to search issues: {}", query))?;

        Ok(result.total_count)
    }

    async fn list_refs(&self, owner: &str, repo: &str) -> Result<RefListing> {
        debug!("Listing refs for {}/{}", owner, repo);

        let response: std::result::Result<Vec<GitRef>, octocrab::Error> = self
            .client
            .get(format!("/repos/{}/{}/git/refs", owner, repo), None::<&()>)
            .await;

        match response {
            Ok(refs) => Ok(RefListing::Refs(refs)),
            Err(e) if is_empty_repository(&e) => {
                info!("Repository {}/{} is empty", owner, repo);
                Ok(RefListing::EmptyRepository)
            }
            Err(e) => Err(e).with_context(|| format!("Failed to list refs for {}/{}", owner, repo)),
        }
    }

    async fn list_commits(&self, owner: &str, repo: &str, branch: &str) -> Result<Vec<Commit>> {
        debug!("Listing commits for {}/{} @ {}", owner, repo, branch);

        let per_page = self.commits_per_branch.to_string();
        let commits: Vec<CommitResponse> = self
            .client
            .get(
                format!("/repos/{}/{}/commits", owner, repo),
                Some(&[("sha", branch), ("per_page", per_page.as_str())]),
            )
            .await
            .with_context(|| format!("Failed to list commits for {}/{} @ {}", owner, repo, branch))?;

        Ok(commits.into_iter().map(Commit::from).collect())
    }

    async fn user(&self, username: &str) -> Result<UserProfile> {
        debug!("Fetching user profile: {}", username);

        self.client
            .get(format!("/users/{}", username), None::<&()>)
            .await
            .with_context(|| format!("Failed to fetch user {}", username))
    }

    async fn list_repositories(&self) -> Result<Vec<RepositoryListEntry>> {
        debug!("Fetching repositories for: {}", self.username);

        let mut repositories = Vec::new();
        let per_page = PAGE_SIZE.to_string();

        for page in 1..=MAX_REPOSITORY_PAGES {
            let page_str = page.to_string();
            let items: Vec<RepositoryListEntry> = self
                .client
                .get(
                    "/user/repos",
                    Some(&[
                        ("sort", self.repository_sort.as_str()),
                        ("type", "all"),
                        ("per_page", per_page.as_str()),
                        ("page", page_str.as_str()),
                    ]),
                )
                .await
                .with_context(|| format!("Failed to fetch repositories page {}", page))?;

            let full_page = items.len() == PAGE_SIZE as usize;
            repositories.extend(items);

            if !full_page {
                break;
            }
            if page == MAX_REPOSITORY_PAGES {
                warn!(
                    "Reached repository pagination limit ({} pages)",
                    MAX_REPOSITORY_PAGES
                );
            }
        }

        info!("Found {} repositories", repositories.len());
        Ok(repositories)
    }

    async fn list_public_repositories(&self, username: &str) -> Result<Vec<RepositoryListEntry>> {
        debug!("Fetching public repositories for: {}", username);

        self.client
            .get(format!("/users/{}/repos", username), None::<&()>)
            .await
            .with_context(|| format!("Failed to fetch repositories of {}", username))
    }
}
