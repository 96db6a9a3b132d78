mod common;

use assert_matches::assert_matches;
use common::{assert_contains_all, GitHubFixture, TestEnvironment};
use githud::dashboard::AggregationResult;
use githud::models::Selection;
use githud::refresher::DashboardEvent;
use githud::{
    AggregateOutcome, Aggregator, Config, Dashboard, GitHubClient, LoadStatus, RepoApi, Refresher,
    Session,
};
use std::process::{Command, Output};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_test::{assert_err, assert_ok};

/// Integration tests against a mocked GitHub API and the built binary

const MAIN_SHAS: [&str; 2] = [
    "a1b2c3d4e5f60718293a4b5c6d7e8f9012345678",
    "b2c3d4e5f60718293a4b5c6d7e8f901234567890",
];
const DEV_SHAS: [&str; 2] = [
    "c3d4e5f60718293a4b5c6d7e8f90123456789012",
    "d4e5f60718293a4b5c6d7e8f9012345678901234",
];

async fn populated_fixture() -> GitHubFixture {
    let fixture = GitHubFixture::start("octocat", "hello").await;
    fixture.mount_repository().await;
    fixture.mount_counts([3, 5, 1, 7]).await;
    fixture
        .mount_refs(&["refs/heads/dev", "refs/heads/main", "refs/pull/1/head"])
        .await;
    fixture.mount_commits("main", &MAIN_SHAS).await;
    fixture.mount_commits("dev", &DEV_SHAS).await;
    fixture
}

fn client_for(fixture: &GitHubFixture) -> GitHubClient {
    let mut config = Config::default();
    config.github.api_url = Some(fixture.uri());
    let session = Session::login("octocat", "ghp_integration").unwrap();
    GitHubClient::new(&config, &session).unwrap()
}

#[tokio::test]
async fn test_aggregate_populated_repository() {
    let fixture = populated_fixture().await;
    let aggregator = Aggregator::new(Arc::new(client_for(&fixture)));

    let outcome = assert_ok!(aggregator.aggregate("octocat", "hello", true, None).await);
    let summary = assert_matches!(outcome, AggregateOutcome::Ready(s) => s);

    assert_eq!(summary.full_name, "octocat/hello");
    assert_eq!(summary.description.as_deref(), Some("Fixture repository"));
    let counts = summary.counts.unwrap();
    assert_eq!(
        (counts.open_issues, counts.closed_issues, counts.open_prs, counts.closed_prs),
        (3, 5, 1, 7)
    );

    // Pull refs never reach the commits endpoint
    assert_eq!(summary.branches, vec!["dev", "main"]);
    assert_eq!(summary.selection.branch, "main");
    assert_eq!(summary.selection.commit_sha, MAIN_SHAS[0]);

    let commit = summary.selected_commit().unwrap();
    assert_eq!(commit.summary_line(), format!("Commit {} on main", MAIN_SHAS[0]));
    assert_eq!(commit.author_name.as_deref(), Some("Mona Lisa"));
    assert_eq!(
        commit.author_avatar_url.as_deref(),
        Some("https://avatars.example.com/mona")
    );
    assert!(summary.selection_is_consistent());
}

#[tokio::test]
async fn test_aggregate_silent_keeps_selection() {
    let fixture = populated_fixture().await;
    let aggregator = Aggregator::new(Arc::new(client_for(&fixture)));

    let previous = Selection {
        branch: "dev".to_string(),
        commit_sha: DEV_SHAS[1].to_string(),
    };
    let outcome = aggregator
        .aggregate("octocat", "hello", false, Some(&previous))
        .await
        .unwrap();

    assert_eq!(outcome.summary().selection, previous);
}

#[tokio::test]
async fn test_aggregate_empty_repository() {
    let fixture = GitHubFixture::start("octocat", "blank").await;
    fixture.mount_repository().await;
    fixture.mount_counts([0, 0, 0, 0]).await;
    fixture.mount_empty_repository().await;

    let aggregator = Aggregator::new(Arc::new(client_for(&fixture)));
    let outcome = aggregator.aggregate("octocat", "blank", true, None).await.unwrap();

    assert!(outcome.is_empty_repository());
    let summary = outcome.summary();
    assert!(summary.counts.is_some());
    assert!(!summary.has_commit_data());
    assert!(summary.branches.is_empty());
}

#[tokio::test]
async fn test_aggregate_missing_repository_fails() {
    let fixture = GitHubFixture::start("octocat", "missing").await;
    let aggregator = Aggregator::new(Arc::new(client_for(&fixture)));

    assert_err!(aggregator.aggregate("octocat", "missing", true, None).await);
}

#[tokio::test]
async fn test_verify_login() {
    let fixture = GitHubFixture::start("octocat", "hello").await;
    fixture.mount_public_repositories("octocat", &["hello"]).await;
    fixture.mount_user("octocat", "The Octocat").await;

    let profile = assert_ok!(client_for(&fixture).verify_login().await);
    assert_eq!(profile.login, "octocat");
    assert_eq!(profile.display_name(), "The Octocat");
}

#[tokio::test]
async fn test_verify_login_rejects_bad_credentials() {
    let fixture = GitHubFixture::start("octocat", "hello").await;
    fixture.mount_unauthorized().await;

    let err = client_for(&fixture).verify_login().await.unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to verify login"));
}

#[tokio::test]
async fn test_list_repositories() {
    let fixture = GitHubFixture::start("octocat", "hello").await;
    fixture
        .mount_user_repositories("octocat", &["hello", "spoon-knife"])
        .await;

    let repositories = client_for(&fixture).list_repositories().await.unwrap();
    let names: Vec<&str> = repositories.iter().map(|r| r.full_name.as_str()).collect();
    assert_eq!(names, vec!["octocat/hello", "octocat/spoon-knife"]);
    assert_eq!(repositories[1].owner(), "octocat");
    assert_eq!(repositories[1].name(), "spoon-knife");
}

async fn next_aggregation(rx: &mut mpsc::UnboundedReceiver<DashboardEvent>) -> AggregationResult {
    loop {
        let event = tokio::time::timeout(Duration::from_secs(10), rx.recv())
            .await
            .expect("timed out waiting for an aggregation")
            .expect("channel closed");
        if let DashboardEvent::Aggregated(result) = event {
            return result;
        }
    }
}

#[tokio::test]
async fn test_dashboard_load_then_silent_refresh() {
    let fixture = populated_fixture().await;
    fixture.mount_user_repositories("octocat", &["hello"]).await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let aggregator = Aggregator::new(Arc::new(client_for(&fixture)));
    let refresher = Refresher::new(aggregator, Duration::from_secs(60), tx);
    let mut dashboard = Dashboard::new();

    refresher.load(&mut dashboard, "octocat", "hello");
    assert_eq!(dashboard.status(), &LoadStatus::Loading);

    let result = next_aggregation(&mut rx).await;
    assert!(dashboard.apply(result));
    assert_eq!(dashboard.status(), &LoadStatus::Ready);
    assert!(dashboard.last_updated().is_some());

    dashboard.select_branch("dev").unwrap();
    dashboard.select_commit(DEV_SHAS[1]).unwrap();

    assert!(refresher.run_cycle(&mut dashboard));
    // Silent cycles leave the view as it is while fetching
    assert_eq!(dashboard.status(), &LoadStatus::Ready);

    let result = next_aggregation(&mut rx).await;
    assert!(dashboard.apply(result));

    let summary = dashboard.summary().unwrap();
    assert_eq!(summary.selection.branch, "dev");
    assert_eq!(summary.selection.commit_sha, DEV_SHAS[1]);
}

// =============================================================================
// Binary
// =============================================================================

/// Run the githud binary without any login variables from the host
fn run_githud(env: &TestEnvironment, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_githud"))
        .args(args)
        .env_remove(githud::session::USERNAME_ENV)
        .env_remove(githud::session::TOKEN_ENV)
        .env_remove(githud::session::GITHUB_TOKEN_ENV)
        .env("XDG_CONFIG_HOME", env.temp_dir.path())
        .env("HOME", env.temp_dir.path())
        .output()
        .expect("Failed to execute githud")
}

#[test]
fn test_cli_help() {
    let env = TestEnvironment::new();
    let output = run_githud(&env, &["--help"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_contains_all(&stdout, &["summary", "repos", "auth", "--username", "--token"]);
}

#[test]
fn test_cli_version() {
    let env = TestEnvironment::new();
    let output = run_githud(&env, &["--version"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("githud"));
}

#[test]
fn test_summary_rejects_invalid_repository() {
    let env = TestEnvironment::new();
    let config = env.create_test_config("logging:\n  level: \"warn\"\n");
    let output = run_githud(
        &env,
        &["--config", config.to_str().unwrap(), "summary", "not-a-repo"],
    );

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("expected owner/name"));
}

#[test]
fn test_summary_without_credentials() {
    let env = TestEnvironment::new();
    let config = env.create_test_config("github:\n  auth_method: \"token\"\n");
    let output = run_githud(
        &env,
        &["--config", config.to_str().unwrap(), "summary", "octocat/hello"],
    );

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Not signed in"));
}

#[test]
fn test_invalid_config_is_reported() {
    let env = TestEnvironment::new();
    let config = env.create_test_config("dashboard:\n  poll_interval: \"soon\"\n");
    let output = run_githud(&env, &["--config", config.to_str().unwrap(), "repos"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("poll_interval"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_summary_against_mock_api() {
    let fixture = populated_fixture().await;
    let env = TestEnvironment::new();
    let config = env.create_api_config(&fixture.uri());

    let output = tokio::task::spawn_blocking(move || {
        let output = run_githud(
            &env,
            &[
                "--config",
                config.to_str().unwrap(),
                "summary",
                "octocat/hello",
                "--branch",
                "dev",
                "-u",
                "octocat",
                "-t",
                "ghp_integration",
            ],
        );
        drop(env);
        output
    })
    .await
    .unwrap();

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(output.status.success(), "stderr: {}", stderr);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_contains_all(
        &stdout,
        &[
            "octocat/hello",
            "Issues: 3 open, 5 closed",
            "Pull requests: 1 open, 7 closed",
            "Branches (2)",
            "* dev",
            "Commits on dev (2)",
            &DEV_SHAS[0][..7],
            "Mona Lisa",
        ],
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_summary_json_against_mock_api() {
    let fixture = populated_fixture().await;
    let env = TestEnvironment::new();
    let config = env.create_api_config(&fixture.uri());

    let output = tokio::task::spawn_blocking(move || {
        run_githud(
            &env,
            &[
                "--config",
                config.to_str().unwrap(),
                "-u",
                "octocat",
                "-t",
                "ghp_integration",
                "summary",
                "octocat/hello",
                "--json",
            ],
        )
    })
    .await
    .unwrap();

    assert!(output.status.success());
    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["full_name"], "octocat/hello");
    assert_eq!(summary["counts"]["closed_prs"], 7);
    assert_eq!(summary["selection"]["branch"], "main");
    assert_eq!(summary["selection"]["commit_sha"], MAIN_SHAS[0]);
}
