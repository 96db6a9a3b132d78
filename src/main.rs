use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use githud::config::LoggingConfig;
use githud::dashboard::{AggregationResult, Dashboard, LoadStatus};
use githud::session::{TOKEN_ENV, USERNAME_ENV};
use githud::tui;
use githud::tui::widgets::commit_row;
use githud::{Aggregator, AuthStrategy, Config, GitHubClient, RepoApi, Session};

#[derive(Parser)]
#[command(name = "githud")]
#[command(about = "Heads-up display for a GitHub repository")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path (defaults to XDG config location)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// GitHub username
    #[arg(short, long, global = true)]
    username: Option<String>,

    /// Personal access token
    #[arg(short, long, global = true)]
    token: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print issue counts, branches and commits of a repository
    Summary {
        /// Repository as owner/name
        repository: String,

        /// Branch to list commits for (defaults to main/master)
        #[arg(short, long)]
        branch: Option<String>,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// List repositories of the signed-in user
    Repos,

    /// Manage authentication
    Auth {
        #[command(subcommand)]
        auth_command: AuthCommands,
    },
}

#[derive(Subcommand)]
enum AuthCommands {
    /// Show authentication status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = load_config(cli.config.clone())?;

    // Only initialize logging for CLI commands, not TUI
    // TUI has its own log viewer and stdout logging breaks raw mode
    let is_tui = cli.command.is_none();
    if !is_tui {
        init_logging(cli.verbose, &config.logging)?;
        info!("Starting githud v{}", env!("CARGO_PKG_VERSION"));
    }

    let resolved = Session::resolve(&config, cli.username.as_deref(), cli.token.as_deref())?;

    // Execute command (default to TUI if no command specified)
    match cli.command {
        None => tui::run_tui(config, resolved).await,
        Some(Commands::Summary {
            repository,
            branch,
            json,
        }) => cmd_summary(&config, resolved, &repository, branch.as_deref(), json).await,
        Some(Commands::Repos) => cmd_repos(&config, resolved).await,
        Some(Commands::Auth { auth_command }) => cmd_auth(auth_command, &config, resolved).await,
    }
}

/// Initialize logging from verbosity and the logging section
fn init_logging(verbose: bool, logging: &LoggingConfig) -> Result<()> {
    let default_level = if verbose { "debug" } else { logging.level.as_str() };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let writer = match &logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file: {}", path))?;
            BoxMakeWriter::new(Mutex::new(file))
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };

    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(logging.file.is_none());
    let layer = if logging.format == "full" {
        layer.boxed()
    } else {
        layer.compact().boxed()
    };

    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    Ok(())
}

/// Load configuration from specified path or default location
fn load_config(config_path: Option<PathBuf>) -> Result<Config> {
    match config_path {
        Some(path) => Config::load(&path),
        None => Config::load_or_default(),
    }
}

/// Session for non-interactive commands
fn require_session(resolved: Option<(Session, AuthStrategy)>) -> Result<(Session, AuthStrategy)> {
    resolved.ok_or_else(|| {
        anyhow!(
            "Not signed in. Set {} and {}, pass --username and --token, \
             or set github.username in the config file",
            USERNAME_ENV,
            TOKEN_ENV
        )
    })
}

/// Split `owner/name`
fn parse_repository(repository: &str) -> Result<(&str, &str)> {
    match repository.split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
            Ok((owner, name))
        }
        _ => Err(anyhow!(
            "Invalid repository '{}', expected owner/name",
            repository
        )),
    }
}

/// Run one aggregation and print it
async fn cmd_summary(
    config: &Config,
    resolved: Option<(Session, AuthStrategy)>,
    repository: &str,
    branch: Option<&str>,
    json: bool,
) -> Result<()> {
    let (owner, name) = parse_repository(repository)?;
    let (session, strategy) = require_session(resolved)?;
    debug!("Using {:?} credentials for {}", strategy, session.username());

    let client = GitHubClient::new(config, &session)?;
    let aggregator = Aggregator::new(Arc::new(client));

    let mut dashboard = Dashboard::new();
    let request = dashboard.begin_aggregation(owner, name, true);
    let outcome = aggregator
        .aggregate(owner, name, true, None)
        .await
        .with_context(|| format!("Failed to load {}", repository))?;
    dashboard.apply(AggregationResult {
        request,
        outcome: Ok(outcome),
    });

    if let Some(branch) = branch {
        dashboard.select_branch(branch)?;
    }

    let summary = dashboard
        .summary()
        .context("No summary after aggregation")?;

    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }

    println!("📦 {}", summary.full_name);
    if let Some(description) = &summary.description {
        println!("   📝 {}", description);
    }
    if let Some(url) = &summary.html_url {
        println!("   🔗 {}", url);
    }
    if let Some(counts) = &summary.counts {
        println!(
            "   🐛 Issues: {} open, {} closed",
            counts.open_issues, counts.closed_issues
        );
        println!(
            "   🔀 Pull requests: {} open, {} closed",
            counts.open_prs, counts.closed_prs
        );
    }

    if dashboard.status() == &LoadStatus::Empty {
        println!("\n📭 Repository is empty");
        return Ok(());
    }

    println!("\n🌿 Branches ({}):", summary.branches.len());
    for name in &summary.branches {
        let marker = if *name == summary.selection.branch { "*" } else { " " };
        println!("   {} {}", marker, name);
    }

    let commits = summary.selected_commits();
    println!(
        "\n📜 Commits on {} ({}):",
        summary.selection.branch,
        commits.len()
    );
    for commit in commits {
        println!("   {}", commit_row(commit));
    }

    Ok(())
}

/// List repositories of the signed-in user
async fn cmd_repos(config: &Config, resolved: Option<(Session, AuthStrategy)>) -> Result<()> {
    let (session, _) = require_session(resolved)?;
    let client = GitHubClient::new(config, &session)?;

    let repositories = client.list_repositories().await?;

    println!("Repositories ({}):", repositories.len());
    for repo in &repositories {
        println!("  📁 {}", repo.full_name);
    }

    Ok(())
}

/// Handle authentication commands
async fn cmd_auth(
    auth_command: AuthCommands,
    config: &Config,
    resolved: Option<(Session, AuthStrategy)>,
) -> Result<()> {
    match auth_command {
        AuthCommands::Status => {
            let (session, strategy) = require_session(resolved)?;
            let client = GitHubClient::new(config, &session)?;

            match client.verify_login().await {
                Ok(user) => {
                    println!("✅ Authentication successful");
                    println!("   Username: {}", user.login);
                    println!("   Name: {}", user.display_name());
                    println!("   Source: {:?}", strategy);
                    Ok(())
                }
                Err(e) => {
                    println!("❌ Authentication failed: {:#}", e);
                    Err(e)
                }
            }
        }
    }
}
