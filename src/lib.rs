//! githud - Heads-up display for a GitHub repository
//!
//! githud signs in to GitHub with a personal access token and shows issue and
//! pull request counts plus a browsable commit history across the branches of
//! a repository, refreshed in the background every minute.
//!
//! ## Core Features
//!
//! - **Repository aggregation**: metadata, four issue/PR counters, refs and
//!   per-branch commits assembled into one summary
//! - **Silent refresh**: periodic re-aggregation that keeps the user's branch
//!   and commit selection
//! - **Terminal dashboard**: login screen, repository and branch selectors,
//!   commit list and detail pane
//! - **Configuration Management**: YAML-based configuration with XDG compliance
//! - **Authentication**: environment auto-login, CLI flags, GitHub CLI and
//!   token-based authentication
//!
//! ## Modules
//!
//! - [`config`]: Configuration management and parsing
//! - [`session`]: Signed-in state and credential discovery
//! - [`github`]: GitHub API access behind the [`RepoApi`] trait
//! - [`aggregator`]: Builds a [`RepositorySummary`] from API reads
//! - [`dashboard`]: Dashboard state, selection and stale-result handling
//! - [`refresher`]: Background tasks and the poll timer
//! - [`timefmt`]: "N units ago" formatting
//! - [`tui`]: Terminal user interface

pub mod aggregator;
pub mod config;
pub mod dashboard;
pub mod github;
pub mod models;
pub mod refresher;
pub mod session;
pub mod timefmt;
pub mod tui;

pub use aggregator::{AggregateOutcome, Aggregator};
pub use config::Config;
pub use dashboard::{Dashboard, LoadStatus};
pub use github::{GitHubClient, RefListing, RepoApi};
pub use models::{Commit, IssueCounts, RepositoryListEntry, RepositorySummary, Selection};
pub use refresher::{DashboardEvent, Refresher};
pub use session::{AuthStrategy, Session};
pub use timefmt::relative_time;
