//! Session and authentication state
//!
//! The session is created once per login and handed by reference to every
//! component that talks to GitHub. Logging out clears it in place.

use anyhow::{anyhow, Context, Result};
use std::env;
use std::fmt;
use std::process::Command;
use tracing::{debug, warn};

use crate::config::Config;

/// Environment variables that enable automatic login
pub const USERNAME_ENV: &str = "GITHUD_USERNAME";
pub const TOKEN_ENV: &str = "GITHUD_TOKEN";
/// Fallback token variable shared with other GitHub tooling
pub const GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Where the credential came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStrategy {
    /// `GITHUD_USERNAME` + `GITHUD_TOKEN`
    AutoLogin,
    /// `--username` / `--token` flags
    CommandLine,
    /// Login screen
    LoginForm,
    /// `gh auth token`
    GitHubCLI,
    /// `GITHUB_TOKEN`
    EnvironmentToken,
}

/// Signed-in state
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Session {
    logged_in: bool,
    username: String,
    credential: String,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("logged_in", &self.logged_in)
            .field("username", &self.username)
            .field("credential", &"<redacted>")
            .finish()
    }
}

impl Session {
    /// Create a logged-in session
    pub fn login(username: impl Into<String>, credential: impl Into<String>) -> Result<Self> {
        let username = username.into().trim().to_string();
        let credential = credential.into().trim().to_string();

        if username.is_empty() {
            return Err(anyhow!("Username must not be empty"));
        }
        if credential.is_empty() {
            return Err(anyhow!("Personal access token must not be empty"));
        }

        check_token_format(&credential);

        Ok(Self {
            logged_in: true,
            username,
            credential,
        })
    }

    /// Clear all fields
    pub fn logout(&mut self) {
        self.logged_in = false;
        self.username.clear();
        self.credential.clear();
    }

    pub fn is_logged_in(&self) -> bool {
        self.logged_in
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn credential(&self) -> &str {
        &self.credential
    }

    /// Session from `GITHUD_USERNAME` and `GITHUD_TOKEN`, if both are set
    pub fn from_env() -> Option<Self> {
        let username = non_empty_env(USERNAME_ENV)?;
        let token = non_empty_env(TOKEN_ENV)?;

        debug!("Auto-login from {} and {}", USERNAME_ENV, TOKEN_ENV);
        Self::login(username, token).ok()
    }

    /// Resolve a session without user interaction
    ///
    /// Order: explicit flags, auto-login variables, then the configured
    /// username with a token from `github.auth_method`. Returns `Ok(None)`
    /// when no source provides both a username and a token.
    pub fn resolve(
        config: &Config,
        username: Option<&str>,
        token: Option<&str>,
    ) -> Result<Option<(Self, AuthStrategy)>> {
        if let (Some(username), Some(token)) = (username, token) {
            return Ok(Some((Self::login(username, token)?, AuthStrategy::CommandLine)));
        }

        if let Some(session) = Self::from_env() {
            return Ok(Some((session, AuthStrategy::AutoLogin)));
        }

        let username = match username
            .map(str::to_string)
            .or_else(|| config.github.username.clone())
        {
            Some(username) => username,
            None => return Ok(None),
        };

        let (strategy, token) = match token {
            Some(token) => (AuthStrategy::CommandLine, token.to_string()),
            None => match detect_token(config) {
                Ok(found) => found,
                Err(e) => {
                    debug!("No token for configured user {}: {}", username, e);
                    return Ok(None);
                }
            },
        };

        Ok(Some((Self::login(username, token)?, strategy)))
    }
}

/// Obtain a token according to `github.auth_method`
pub fn detect_token(config: &Config) -> Result<(AuthStrategy, String)> {
    match config.github.auth_method.as_str() {
        "auto" => {
            if let Ok(token) = try_github_cli() {
                Ok((AuthStrategy::GitHubCLI, token))
            } else if let Ok(token) = try_environment_token() {
                Ok((AuthStrategy::EnvironmentToken, token))
            } else {
                Err(anyhow!(
                    "No GitHub token found. Please either:\n\
                     1. Install and authenticate GitHub CLI: gh auth login\n\
                     2. Set GITHUB_TOKEN environment variable\n\
                     3. Pass --username and --token"
                ))
            }
        }
        "gh_cli" => {
            let token =
                try_github_cli().context("GitHub CLI authentication failed. Run: gh auth login")?;
            Ok((AuthStrategy::GitHubCLI, token))
        }
        "token" => {
            let token = try_environment_token()
                .context("GITHUB_TOKEN environment variable not found or invalid")?;
            Ok((AuthStrategy::EnvironmentToken, token))
        }
        other => Err(anyhow!("Unknown auth method: {}", other)),
    }
}

/// Try to get a token from the GitHub CLI
fn try_github_cli() -> Result<String> {
    debug!("Attempting GitHub CLI authentication");

    let token_output = Command::new("gh")
        .args(["auth", "token"])
        .output()
        .context("Failed to run GitHub CLI (is gh installed?)")?;

    if !token_output.status.success() {
        return Err(anyhow!(
            "Failed to retrieve token from GitHub CLI: {}",
            String::from_utf8_lossy(&token_output.stderr).trim()
        ));
    }

    let token = String::from_utf8(token_output.stdout)
        .context("GitHub CLI token is not valid UTF-8")?
        .trim()
        .to_string();

    if token.is_empty() {
        return Err(anyhow!("GitHub CLI returned empty token"));
    }

    debug!("Successfully obtained token from GitHub CLI");
    Ok(token)
}

/// Try to get a token from `GITHUB_TOKEN`
fn try_environment_token() -> Result<String> {
    debug!("Attempting environment variable authentication");

    non_empty_env(GITHUB_TOKEN_ENV)
        .ok_or_else(|| anyhow!("{} environment variable not set", GITHUB_TOKEN_ENV))
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Warn on tokens that do not look like GitHub tokens; they are still used
fn check_token_format(token: &str) -> bool {
    const PREFIXES: [&str; 4] = ["ghp_", "gho_", "ghs_", "github_pat_"];

    let looks_valid = PREFIXES.iter().any(|p| token.starts_with(p));
    if !looks_valid {
        warn!("Token doesn't look like a GitHub token (expected ghp_, gho_, ghs_ or github_pat_ prefix)");
    }
    looks_valid
}
