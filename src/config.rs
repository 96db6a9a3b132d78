use anyhow::{anyhow, Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure for githud
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    /// GitHub API and authentication settings
    #[serde(default)]
    pub github: GitHubConfig,

    /// Dashboard refresh behavior
    #[serde(default)]
    pub dashboard: DashboardConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// GitHub configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GitHubConfig {
    /// API base URL override (GitHub Enterprise, local mocks)
    #[serde(default)]
    pub api_url: Option<String>,

    /// Authentication method
    #[serde(default = "default_auth_method")]
    pub auth_method: String, // "auto", "gh_cli", "token"

    /// GitHub username used when no other login source is present
    #[serde(default)]
    pub username: Option<String>,

    /// Commits fetched per branch
    #[serde(default = "default_commits_per_branch")]
    pub commits_per_branch: u8,
}

/// Dashboard configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DashboardConfig {
    /// Silent refresh interval
    #[serde(default = "default_poll_interval")]
    pub poll_interval: String, // "60s"

    /// Sort order for the repository selector
    #[serde(default = "default_repository_sort")]
    pub repository_sort: String, // "updated", "pushed", "full_name", "created"
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String, // "info"

    /// Log format
    #[serde(default = "default_log_format")]
    pub format: String, // "compact", "full"

    /// Optional log file for non-interactive commands
    #[serde(default)]
    pub file: Option<String>,
}

// Default value functions
fn default_auth_method() -> String {
    "auto".to_string()
}
fn default_commits_per_branch() -> u8 {
    30
}
fn default_poll_interval() -> String {
    "60s".to_string()
}
fn default_repository_sort() -> String {
    "updated".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "compact".to_string()
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            auth_method: default_auth_method(),
            username: None,
            commits_per_branch: default_commits_per_branch(),
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            repository_sort: default_repository_sort(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
        }
    }
}

impl Config {
    /// Load configuration from the default location or create a default config
    pub fn load_or_default() -> Result<Self> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load(&config_path)
        } else {
            let config = Self::default();

            if let Some(parent) = config_path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
            }

            config.save(&config_path)?;

            tracing::info!("Created default configuration at: {:?}", config_path);
            Ok(config)
        }
    }

    /// Load configuration from a specific file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let mut config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        config.expand_paths()?;
        config.validate()?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self).context("Failed to serialize configuration")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;

        Ok(())
    }

    /// Get the default configuration file path (XDG compliant)
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = config_dir().context("Failed to get user config directory")?;

        Ok(config_dir.join("githud").join("config.yml"))
    }

    /// Expand environment variables in configured paths
    pub fn expand_paths(&mut self) -> Result<()> {
        if let Some(file) = &self.logging.file {
            self.logging.file = Some(
                shellexpand::full(file)
                    .context("Failed to expand logging.file path")?
                    .into_owned(),
            );
        }

        Ok(())
    }

    /// Reject values that would only fail later at runtime
    pub fn validate(&self) -> Result<()> {
        self.poll_interval()?;

        if self.github.commits_per_branch == 0 || self.github.commits_per_branch > 100 {
            return Err(anyhow!(
                "github.commits_per_branch must be between 1 and 100, got {}",
                self.github.commits_per_branch
            ));
        }

        match self.github.auth_method.as_str() {
            "auto" | "gh_cli" | "token" => Ok(()),
            other => Err(anyhow!("Unknown auth method: {}", other)),
        }
    }

    /// Silent refresh interval as a `Duration`
    pub fn poll_interval(&self) -> Result<Duration> {
        let secs = parse_duration(&self.dashboard.poll_interval)
            .context("Failed to parse dashboard.poll_interval")?;

        if secs == 0 {
            return Err(anyhow!("dashboard.poll_interval must be greater than zero"));
        }

        Ok(Duration::from_secs(secs))
    }
}

/// Parse duration strings like "30s", "5m", "1h" into seconds
pub fn parse_duration(duration_str: &str) -> Result<u64> {
    let duration_str = duration_str.trim().to_lowercase();

    if let Some(value) = duration_str.strip_suffix('s') {
        value.parse::<u64>().context("Invalid seconds value")
    } else if let Some(value) = duration_str.strip_suffix('m') {
        value.parse::<u64>().map(|v| v * 60).context("Invalid minutes value")
    } else if let Some(value) = duration_str.strip_suffix('h') {
        value.parse::<u64>().map(|v| v * 3600).context("Invalid hours value")
    } else {
        duration_str
            .parse::<u64>()
            .context("Invalid duration format. Use format like '30s', '5m', '1h'")
    }
}
