//! Main application state for the TUI

use super::events::{key_handler, AppAction, LoginAction};
use super::widgets::{
    centered_rect, status_text, BranchList, ColorScheme, CommitDetail, CommitList, CountersBar,
    ErrorDialog, HelpDialog, LogViewer, LoginField, LoginForm, Notice, RepositoryList, UserMenu,
};
use crate::aggregator::Aggregator;
use crate::dashboard::{Dashboard, LoadStatus};
use crate::github::{GitHubClient, RepoApi};
use crate::models::RepositoryListEntry;
use crate::refresher::{DashboardEvent, Refresher};
use crate::session::{AuthStrategy, Session};
use crate::Config;
use anyhow::{Context, Result};
use crossterm::event::KeyEvent;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Clear, ListState, Paragraph},
    Frame,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Fallback when the configured interval cannot be parsed
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);
/// Log lines kept in memory
const MAX_LOG_LINES: usize = 1000;

/// Which screen is shown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Login,
    Dashboard,
}

/// Which dashboard panel has focus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusedPanel {
    Repositories,
    Branches,
    Commits,
}

impl FocusedPanel {
    fn next(self) -> Self {
        match self {
            Self::Repositories => Self::Branches,
            Self::Branches => Self::Commits,
            Self::Commits => Self::Repositories,
        }
    }

    fn previous(self) -> Self {
        match self {
            Self::Repositories => Self::Commits,
            Self::Branches => Self::Repositories,
            Self::Commits => Self::Branches,
        }
    }
}

/// Login form contents
#[derive(Debug, Default)]
struct LoginState {
    username: String,
    token: String,
    focused: LoginField,
    error: Option<String>,
}

/// Application state
pub struct App {
    config: Config,
    session: Session,
    api: Option<Arc<dyn RepoApi>>,
    screen: Screen,
    login: LoginState,

    // Dashboard state and background work
    dashboard: Dashboard,
    refresher: Option<Refresher>,
    events: Option<mpsc::UnboundedReceiver<DashboardEvent>>,

    // UI state
    colors: ColorScheme,
    focused_panel: FocusedPanel,
    repo_list_state: ListState,
    branch_list_state: ListState,
    commit_list_state: ListState,
    logs: Vec<String>,

    // Popup state
    show_help: bool,
    show_user_menu: bool,
    show_error: Option<String>,

    // Exit flag
    should_exit: bool,
}

impl App {
    /// Create the app on the login screen
    pub fn new(config: Config) -> Self {
        // Note: Don't use tracing in TUI - raw mode conflicts with stdout
        // Use self.add_log() for anything the user should see

        let login = LoginState {
            username: config.github.username.clone().unwrap_or_default(),
            ..LoginState::default()
        };

        let mut app = Self {
            config,
            session: Session::default(),
            api: None,
            screen: Screen::Login,
            login,
            dashboard: Dashboard::new(),
            refresher: None,
            events: None,
            colors: ColorScheme::default(),
            focused_panel: FocusedPanel::Repositories,
            repo_list_state: ListState::default(),
            branch_list_state: ListState::default(),
            commit_list_state: ListState::default(),
            logs: Vec::new(),
            show_help: false,
            show_user_menu: false,
            show_error: None,
            should_exit: false,
        };
        app.add_log("Application started".to_string());
        app
    }

    /// Sign in with a session resolved before the TUI started
    pub fn sign_in_with(&mut self, session: Session, strategy: AuthStrategy) -> Result<()> {
        let client = GitHubClient::new(&self.config, &session)?;
        self.add_log(format!(
            "Signed in as {} ({:?})",
            session.username(),
            strategy
        ));
        self.sign_in(session, Arc::new(client));
        Ok(())
    }

    /// Check if the application should exit
    pub fn should_exit(&self) -> bool {
        self.should_exit
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    fn sign_in(&mut self, session: Session, api: Arc<dyn RepoApi>) {
        self.session = session;
        self.api = Some(api);
        self.login = LoginState::default();
        self.screen = Screen::Dashboard;
        self.on_view_mount();
    }

    /// Validate the login form against GitHub and open the dashboard
    async fn submit_login(&mut self) {
        let username = self.login.username.clone();
        let token = self.login.token.clone();

        match self.verify_credentials(&username, &token).await {
            Ok((session, client)) => {
                self.add_log(format!("Signed in as {}", session.username()));
                self.sign_in(session, client);
            }
            Err(e) => {
                self.add_log(format!("ERROR: Sign in failed: {:#}", e));
                self.login.error = Some(format!("{:#}", e));
            }
        }
    }

    async fn verify_credentials(
        &self,
        username: &str,
        token: &str,
    ) -> Result<(Session, Arc<dyn RepoApi>)> {
        let session = Session::login(username, token)?;
        let client = GitHubClient::new(&self.config, &session)?;
        client.verify_login().await?;
        Ok((session, Arc::new(client)))
    }

    /// Clear the session and return to the login screen
    fn sign_out(&mut self) {
        let username = self.session.username().to_string();
        self.on_view_unmount();
        self.session.logout();
        self.api = None;
        self.dashboard.clear();
        self.show_user_menu = false;
        self.screen = Screen::Login;
        self.sync_repository_highlight();
        self.on_selection_changed();
        self.add_log(format!("Signed out {}", username));
    }

    /// Start background work for the dashboard
    pub fn on_view_mount(&mut self) {
        let Some(api) = self.api.clone() else {
            return;
        };

        let poll_interval = match self.config.poll_interval() {
            Ok(interval) => interval,
            Err(e) => {
                self.add_log(format!("WARN: {:#}, polling every 60s", e));
                DEFAULT_POLL_INTERVAL
            }
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let mut refresher = Refresher::new(Aggregator::new(api), poll_interval, tx);
        refresher.mount(self.session.username());
        refresher.start();

        self.refresher = Some(refresher);
        self.events = Some(rx);
        self.add_log(format!(
            "Fetching repositories for {} (refresh every {}s)",
            self.session.username(),
            poll_interval.as_secs()
        ));
    }

    /// Stop the poll timer; results still in flight are dropped with the channel
    pub fn on_view_unmount(&mut self) {
        if let Some(mut refresher) = self.refresher.take() {
            refresher.stop();
        }
        self.events = None;
    }

    /// Bring branch and commit highlights in line with the dashboard selection
    pub fn on_selection_changed(&mut self) {
        let Some(summary) = self.dashboard.summary() else {
            self.branch_list_state.select(None);
            self.commit_list_state.select(None);
            return;
        };

        let branch = summary
            .branches
            .iter()
            .position(|b| *b == summary.selection.branch);
        let commit = summary
            .selected_commits()
            .iter()
            .position(|c| c.sha == summary.selection.commit_sha);
        self.branch_list_state.select(branch);
        self.commit_list_state.select(commit);
    }

    /// Handle keyboard events
    pub async fn handle_key_event(&mut self, key_event: KeyEvent) -> Result<()> {
        match self.screen {
            Screen::Login => {
                if let Some(action) = key_handler::key_to_login_action(&key_event) {
                    self.handle_login_action(action).await;
                }
            }
            Screen::Dashboard => {
                if let Some(action) = key_handler::key_to_app_action(&key_event) {
                    self.handle_app_action(action)?;
                }
            }
        }
        Ok(())
    }

    async fn handle_login_action(&mut self, action: LoginAction) {
        let field = match self.login.focused {
            LoginField::Username => &mut self.login.username,
            LoginField::Token => &mut self.login.token,
        };

        match action {
            LoginAction::Input(c) => field.push(c),
            LoginAction::Backspace => {
                field.pop();
            }
            LoginAction::NextField => {
                self.login.focused = match self.login.focused {
                    LoginField::Username => LoginField::Token,
                    LoginField::Token => LoginField::Username,
                };
            }
            LoginAction::Submit => self.submit_login().await,
            LoginAction::Quit => self.should_exit = true,
        }
    }

    fn handle_app_action(&mut self, action: AppAction) -> Result<()> {
        // Popups take every key until closed
        if self.show_help || self.show_error.is_some() {
            if matches!(action, AppAction::Close | AppAction::Quit) {
                self.show_help = false;
                self.show_error = None;
            }
            return Ok(());
        }
        if self.show_user_menu {
            match action {
                AppAction::SignOut => self.sign_out(),
                AppAction::Close | AppAction::ToggleUserMenu | AppAction::Quit => {
                    self.show_user_menu = false
                }
                _ => {}
            }
            return Ok(());
        }

        match action {
            AppAction::Quit => self.should_exit = true,
            AppAction::ShowHelp => self.show_help = true,
            AppAction::ToggleUserMenu => self.show_user_menu = true,
            AppAction::SignOut | AppAction::Close => {}
            AppAction::NextPanel => self.focused_panel = self.focused_panel.next(),
            AppAction::PreviousPanel => self.focused_panel = self.focused_panel.previous(),
            AppAction::Up => self.move_selection(false)?,
            AppAction::Down => self.move_selection(true)?,
            AppAction::Select => self.open_highlighted_repository(),
            AppAction::Retry => self.reload(),
        }
        Ok(())
    }

    fn move_selection(&mut self, down: bool) -> Result<()> {
        match self.focused_panel {
            FocusedPanel::Repositories => {
                let len = self.dashboard.repositories().len();
                if len == 0 {
                    return Ok(());
                }
                let current = self.repo_list_state.selected().unwrap_or(0);
                let next = if down {
                    (current + 1).min(len - 1)
                } else {
                    current.saturating_sub(1)
                };
                self.repo_list_state.select(Some(next));
                return Ok(());
            }
            FocusedPanel::Branches if self.has_commit_data() => {
                if down {
                    self.dashboard.select_next_branch()?;
                } else {
                    self.dashboard.select_previous_branch()?;
                }
            }
            FocusedPanel::Commits if self.has_commit_data() => {
                if down {
                    self.dashboard.select_next_commit()?;
                } else {
                    self.dashboard.select_previous_commit()?;
                }
            }
            _ => return Ok(()),
        }
        self.on_selection_changed();
        Ok(())
    }

    /// Highlight the shown repository; only called when the target changes
    fn sync_repository_highlight(&mut self) {
        self.repo_list_state.select(self.dashboard.target_index());
    }

    /// Replace the repository list, keeping the highlighted entry
    fn refresh_repositories(&mut self, repositories: Vec<RepositoryListEntry>) {
        let highlighted = self
            .repo_list_state
            .selected()
            .and_then(|i| self.dashboard.repositories().get(i))
            .map(|entry| entry.full_name.clone());

        self.dashboard.set_repositories(repositories);

        let index = highlighted
            .and_then(|name| {
                self.dashboard
                    .repositories()
                    .iter()
                    .position(|entry| entry.full_name == name)
            })
            .or_else(|| self.dashboard.target_index());
        self.repo_list_state.select(index);
    }

    fn has_commit_data(&self) -> bool {
        self.dashboard
            .summary()
            .is_some_and(|s| s.has_commit_data())
    }

    /// Load the repository highlighted in the selector
    fn open_highlighted_repository(&mut self) {
        if self.focused_panel != FocusedPanel::Repositories {
            return;
        }
        let Some(entry) = self
            .repo_list_state
            .selected()
            .and_then(|i| self.dashboard.repositories().get(i))
            .cloned()
        else {
            return;
        };

        self.load(entry.owner(), entry.name());
    }

    /// Non-silent load of the current repository
    fn reload(&mut self) {
        let Some((owner, repo)) = self
            .dashboard
            .target()
            .map(|(o, r)| (o.to_string(), r.to_string()))
        else {
            self.add_log("Nothing to reload".to_string());
            return;
        };
        self.load(&owner, &repo);
    }

    fn load(&mut self, owner: &str, repo: &str) {
        let Some(refresher) = self.refresher.as_ref() else {
            return;
        };
        refresher.load(&mut self.dashboard, owner, repo);
        self.add_log(format!("Loading {}/{}...", owner, repo));
        self.sync_repository_highlight();
        self.on_selection_changed();
    }

    /// Add a log message
    fn add_log(&mut self, message: String) {
        let timestamp = chrono::Local::now().format("%H:%M:%S").to_string();
        self.logs.push(format!("[{}] {}", timestamp, message));

        if self.logs.len() > MAX_LOG_LINES {
            self.logs.drain(..self.logs.len() - MAX_LOG_LINES);
        }
    }

    /// Apply pending background results
    pub async fn update(&mut self) -> Result<()> {
        let mut pending = Vec::new();
        if let Some(rx) = self.events.as_mut() {
            while let Ok(event) = rx.try_recv() {
                pending.push(event);
            }
        }

        for event in pending {
            self.handle_dashboard_event(event);
        }
        Ok(())
    }

    fn handle_dashboard_event(&mut self, event: DashboardEvent) {
        match event {
            DashboardEvent::Tick => {
                let started = match self.refresher.as_ref() {
                    Some(refresher) => refresher.run_cycle(&mut self.dashboard),
                    None => false,
                };
                if started {
                    self.add_log("Refreshing...".to_string());
                }
            }
            DashboardEvent::Aggregated(result) => {
                let name = format!("{}/{}", result.request.owner, result.request.repo);
                if !self.dashboard.apply(result) {
                    return;
                }
                match self.dashboard.status() {
                    LoadStatus::Ready => self.add_log(format!("Updated {}", name)),
                    LoadStatus::Empty => self.add_log(format!("{} is empty", name)),
                    LoadStatus::Failed(e) => {
                        let message = format!("ERROR: Fetching {} failed: {}", name, e);
                        self.add_log(message);
                    }
                    LoadStatus::Idle | LoadStatus::Loading => {}
                }
                self.on_selection_changed();
            }
            DashboardEvent::Repositories(Ok(repositories)) => {
                let count = repositories.len();
                self.refresh_repositories(repositories);
                self.dashboard.touch();

                if self.dashboard.target().is_none() {
                    self.add_log(format!("Found {} repositories", count));
                    if let Some(first) = self.dashboard.repositories().first().cloned() {
                        self.load(first.owner(), first.name());
                    }
                }
            }
            DashboardEvent::Repositories(Err(e)) => {
                self.add_log(format!("ERROR: Failed to list repositories: {}", e));
                if self.dashboard.target().is_none() {
                    self.show_error = Some(format!("Failed to list repositories: {}", e));
                }
            }
            DashboardEvent::Profile(Ok(user)) => {
                self.add_log(format!("Loaded profile of {}", user.login));
                self.dashboard.set_user(user);
            }
            DashboardEvent::Profile(Err(e)) => {
                self.add_log(format!("WARN: Failed to load profile: {}", e));
            }
        }
    }

    fn is_fetching(&self) -> bool {
        self.refresher
            .as_ref()
            .is_some_and(|r| r.in_flight().is_active())
    }

    /// Draw the application UI
    pub fn draw(&mut self, frame: &mut Frame) {
        let size = frame.size();

        match self.screen {
            Screen::Login => {
                let error = self.login.error.as_deref();
                LoginForm::new(
                    &self.login.username,
                    &self.login.token,
                    self.login.focused,
                    error,
                    &self.colors,
                )
                .render(frame, size);
            }
            Screen::Dashboard => self.draw_dashboard(frame, size),
        }
    }

    fn draw_dashboard(&mut self, frame: &mut Frame, size: Rect) {
        let vertical_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // Header
                Constraint::Length(3), // Counters
                Constraint::Min(0),    // Main content
                Constraint::Length(6), // Log
            ])
            .split(size);

        self.draw_header(frame, vertical_chunks[0]);
        CountersBar::new(
            self.dashboard.summary().and_then(|s| s.counts.as_ref()),
            &self.colors,
        )
        .render(frame, vertical_chunks[1]);

        let main_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(22),
                Constraint::Percentage(18),
                Constraint::Percentage(35),
                Constraint::Percentage(25),
            ])
            .split(vertical_chunks[2]);

        RepositoryList::new(
            self.dashboard.repositories(),
            self.focused_panel == FocusedPanel::Repositories,
            &self.colors,
        )
        .render(frame, main_chunks[0], &mut self.repo_list_state);

        self.draw_repository(frame, main_chunks[1], main_chunks[2], main_chunks[3]);

        LogViewer::new(&self.logs, &self.colors).render(frame, vertical_chunks[3]);

        // Popups
        if self.show_help {
            HelpDialog::new(&self.colors).render(frame, size);
        }
        if self.show_user_menu {
            UserMenu::new(self.session.username(), &self.colors).render(frame, size);
        }
        if let Some(error) = self.show_error.as_deref() {
            ErrorDialog::new(error, &self.colors).render(frame, size);
        }
    }

    fn draw_header(&self, frame: &mut Frame, area: Rect) {
        let name = self
            .dashboard
            .user()
            .map(|u| u.display_name())
            .unwrap_or(self.session.username());
        let repository = self
            .dashboard
            .summary()
            .map(|s| s.full_name.as_str())
            .unwrap_or("");
        let status = status_text(self.is_fetching(), self.dashboard.last_updated());

        let line = Line::from(vec![
            Span::styled(
                format!(" {}'s Dashboard ", name),
                Style::default()
                    .fg(self.colors.primary)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("| {} ", repository),
                Style::default().fg(self.colors.text),
            ),
            Span::styled(
                format!("| {} | ? help", status),
                Style::default().fg(self.colors.secondary),
            ),
        ]);

        frame.render_widget(
            Paragraph::new(line).style(Style::default().bg(self.colors.background)),
            area,
        );
    }

    /// Branch, commit and detail panels, or a notice in their place
    fn draw_repository(&mut self, frame: &mut Frame, branches: Rect, commits: Rect, detail: Rect) {
        let content = branches.union(detail);

        let notice = match (self.dashboard.status(), self.dashboard.summary()) {
            (LoadStatus::Failed(e), summary) if !summary.is_some_and(|s| s.has_commit_data()) => {
                Some((
                    "Error",
                    format!("Fetch failed: {}\n\nPress r to retry", e),
                    self.colors.error,
                ))
            }
            (LoadStatus::Empty, _) => Some((
                "Empty",
                "Repository is empty".to_string(),
                self.colors.warning,
            )),
            (_, Some(summary)) if !summary.has_commit_data() => {
                Some(("Loading", "Loading...".to_string(), self.colors.muted))
            }
            (_, None) if self.dashboard.repositories().is_empty() => Some((
                "Repositories",
                "No repositories found".to_string(),
                self.colors.muted,
            )),
            (_, None) => Some(("Repository", "Select a repository".to_string(), self.colors.muted)),
            _ => None,
        };

        if let Some((title, message, color)) = notice {
            Notice::new(title, &message, color).render(frame, content);
            return;
        }

        let Some(summary) = self.dashboard.summary() else {
            return;
        };

        BranchList::new(
            &summary.branches,
            &summary.selection.branch,
            self.focused_panel == FocusedPanel::Branches,
            &self.colors,
        )
        .render(frame, branches, &mut self.branch_list_state);

        CommitList::new(
            summary.selected_commits(),
            &summary.selection.branch,
            self.focused_panel == FocusedPanel::Commits,
            &self.colors,
        )
        .render(frame, commits, &mut self.commit_list_state);

        CommitDetail::new(
            summary.selected_commit(),
            &summary.selection.branch,
            summary.html_url.as_deref(),
            &self.colors,
        )
        .render(frame, detail);

        if let LoadStatus::Failed(e) = self.dashboard.status() {
            // Data is still shown; surface the failure on top of it
            let area = centered_rect(60, 20, content);
            frame.render_widget(Clear, area);
            Notice::new(
                "Refresh failed",
                &format!("{}\nPress r to retry", e),
                self.colors.error,
            )
            .render(frame, area);
        }
    }
}

/// Resolve a session and start the app on the right screen
pub fn initial_app(config: Config, resolved: Option<(Session, AuthStrategy)>) -> Result<App> {
    let mut app = App::new(config);
    if let Some((session, strategy)) = resolved {
        app.sign_in_with(session, strategy)
            .context("Failed to start dashboard")?;
    }
    Ok(app)
}
