/// Common test utilities and helpers for githud tests
use githud::session::{GITHUB_TOKEN_ENV, TOKEN_ENV, USERNAME_ENV};
use serde_json::{json, Value};
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Test configuration helper
pub struct TestEnvironment {
    pub temp_dir: TempDir,
    pub config_dir: PathBuf,
    pub original_env: Vec<(String, Option<String>)>,
}

impl TestEnvironment {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_dir = temp_dir.path().join("githud");
        std::fs::create_dir_all(&config_dir).expect("Failed to create config dir");

        // Store original environment variables
        let env_vars = [
            USERNAME_ENV,
            TOKEN_ENV,
            GITHUB_TOKEN_ENV,
            "XDG_CONFIG_HOME",
            "HOME",
        ];
        let original_env = env_vars
            .iter()
            .map(|var| (var.to_string(), env::var(var).ok()))
            .collect();

        Self {
            temp_dir,
            config_dir,
            original_env,
        }
    }

    pub fn create_test_config(&self, content: &str) -> PathBuf {
        let config_path = self.config_dir.join("config.yml");
        std::fs::write(&config_path, content).expect("Failed to write test config");
        config_path
    }

    /// Config pointing the client at a mock API
    pub fn create_api_config(&self, api_url: &str) -> PathBuf {
        self.create_test_config(&format!(
            r#"
github:
  api_url: "{}"
  auth_method: "token"
  commits_per_branch: 5
dashboard:
  poll_interval: "60s"
logging:
  level: "warn"
"#,
            api_url
        ))
    }
}

impl Drop for TestEnvironment {
    fn drop(&mut self) {
        // Restore original environment variables
        for (key, value) in &self.original_env {
            match value {
                Some(val) => env::set_var(key, val),
                None => env::remove_var(key),
            }
        }
    }
}

/// Mock GitHub API serving one repository
pub struct GitHubFixture {
    pub server: MockServer,
    pub owner: String,
    pub repo: String,
}

impl GitHubFixture {
    pub async fn start(owner: &str, repo: &str) -> Self {
        Self {
            server: MockServer::start().await,
            owner: owner.to_string(),
            repo: repo.to_string(),
        }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    fn repo_path(&self, suffix: &str) -> String {
        format!("/repos/{}/{}{}", self.owner, self.repo, suffix)
    }

    pub async fn mount_repository(&self) {
        let body = json!({
            "full_name": format!("{}/{}", self.owner, self.repo),
            "owner": {
                "login": self.owner,
                "avatar_url": format!("https://avatars.example.com/{}", self.owner),
            },
            "description": "Fixture repository",
            "html_url": format!("https://github.com/{}/{}", self.owner, self.repo),
            "default_branch": "main",
        });

        Mock::given(method("GET"))
            .and(path(self.repo_path("")))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// Open issues, closed issues, open PRs, closed PRs
    pub async fn mount_counts(&self, counts: [u64; 4]) {
        let queries = githud::aggregator::search_queries(&self.owner, &self.repo);

        for (query, count) in queries.iter().zip(counts) {
            Mock::given(method("GET"))
                .and(path("/search/issues"))
                .and(query_param("q", query.as_str()))
                .respond_with(
                    ResponseTemplate::new(200).set_body_json(json!({
                        "total_count": count,
                        "incomplete_results": false,
                        "items": [],
                    })),
                )
                .mount(&self.server)
                .await;
        }
    }

    pub async fn mount_refs(&self, refs: &[&str]) {
        let body: Vec<Value> = refs
            .iter()
            .map(|r| json!({ "ref": r, "object": { "sha": "0000000", "type": "commit" } }))
            .collect();

        Mock::given(method("GET"))
            .and(path(self.repo_path("/git/refs")))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// GitHub's answer for a repository without commits
    pub async fn mount_empty_repository(&self) {
        Mock::given(method("GET"))
            .and(path(self.repo_path("/git/refs")))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "message": "Git Repository is empty.",
                "documentation_url": "https://docs.github.com/rest/git/refs#list-matching-references",
            })))
            .mount(&self.server)
            .await;
    }

    pub async fn mount_commits(&self, branch: &str, shas: &[&str]) {
        let body: Vec<Value> = shas.iter().map(|sha| commit_json(sha, branch)).collect();

        Mock::given(method("GET"))
            .and(path(self.repo_path("/commits")))
            .and(query_param("sha", branch))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    pub async fn mount_user(&self, login: &str, name: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/users/{}", login)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "login": login,
                "name": name,
                "avatar_url": format!("https://avatars.example.com/{}", login),
            })))
            .mount(&self.server)
            .await;
    }

    pub async fn mount_public_repositories(&self, login: &str, names: &[&str]) {
        Mock::given(method("GET"))
            .and(path(format!("/users/{}/repos", login)))
            .respond_with(ResponseTemplate::new(200).set_body_json(repository_list(login, names)))
            .mount(&self.server)
            .await;
    }

    pub async fn mount_user_repositories(&self, login: &str, names: &[&str]) {
        Mock::given(method("GET"))
            .and(path("/user/repos"))
            .respond_with(ResponseTemplate::new(200).set_body_json(repository_list(login, names)))
            .mount(&self.server)
            .await;
    }

    pub async fn mount_unauthorized(&self) {
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "message": "Bad credentials",
                "documentation_url": "https://docs.github.com/rest",
            })))
            .mount(&self.server)
            .await;
    }
}

fn commit_json(sha: &str, branch: &str) -> Value {
    json!({
        "sha": sha,
        "commit": {
            "message": format!("Commit {} on {}\n\nBody text", sha, branch),
            "author": {
                "name": "Mona Lisa",
                "email": "mona@example.com",
                "date": "2024-01-02T03:04:05Z",
            },
        },
        "author": {
            "login": "mona",
            "avatar_url": "https://avatars.example.com/mona",
        },
    })
}

fn repository_list(login: &str, names: &[&str]) -> Value {
    Value::Array(
        names
            .iter()
            .map(|name| json!({ "full_name": format!("{}/{}", login, name), "name": name }))
            .collect(),
    )
}

/// Assertion helpers for test validation
pub fn assert_contains_all(text: &str, expected: &[&str]) {
    for item in expected {
        assert!(
            text.contains(item),
            "Expected text to contain '{}', but it didn't. Text: {}",
            item,
            text
        );
    }
}
