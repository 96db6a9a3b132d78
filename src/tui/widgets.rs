//! Widgets for the dashboard and login screens

use chrono::{DateTime, Local};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use crate::models::{Commit, IssueCounts, RepositoryListEntry};
use crate::timefmt::time_ago;

/// Color scheme for the TUI
pub struct ColorScheme {
    pub primary: Color,
    pub secondary: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub info: Color,
    pub text: Color,
    pub muted: Color,
    pub background: Color,
    pub border: Color,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            primary: Color::Blue,
            secondary: Color::Cyan,
            success: Color::Green,
            warning: Color::Yellow,
            error: Color::Red,
            info: Color::Magenta,
            text: Color::White,
            muted: Color::DarkGray,
            background: Color::Black,
            border: Color::Gray,
        }
    }
}

impl ColorScheme {
    pub fn border_for(&self, focused: bool) -> Color {
        if focused {
            self.primary
        } else {
            self.border
        }
    }
}

/// Rectangle of the given percentages centered in `r`
pub fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

/// Right-hand side of the header
pub fn status_text(fetching: bool, last_updated: Option<DateTime<Local>>) -> String {
    if fetching {
        return "Fetching...".to_string();
    }
    match last_updated {
        Some(at) => format!("Last updated {}", at.format("%H:%M:%S")),
        None => "Not loaded".to_string(),
    }
}

/// Summary line, author and relative date of a commit
pub fn commit_caption(commit: &Commit) -> String {
    let author = commit.author_name.as_deref().unwrap_or("unknown");
    let when = commit.author_date.map(time_ago).unwrap_or_default();
    format!("{} ({}, {})", commit.summary_line(), author, when)
}

/// One row of the commit list
pub fn commit_row(commit: &Commit) -> String {
    format!("{} {}", commit.short_sha(), commit_caption(commit))
}

/// Short sha and the branch it is viewed on
pub fn commit_heading(commit: &Commit, branch: &str) -> String {
    if branch.is_empty() {
        commit.short_sha().to_string()
    } else {
        format!("{} on {}", commit.short_sha(), branch)
    }
}

/// Token as shown in the login form
pub fn mask(secret: &str) -> String {
    "*".repeat(secret.chars().count())
}

fn titled_block(title: impl Into<String>, border: Color) -> Block<'static> {
    Block::default()
        .title(title.into())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
}

/// Issue and pull request counters
pub struct CountersBar<'a> {
    counts: Option<&'a IssueCounts>,
    colors: &'a ColorScheme,
}

impl<'a> CountersBar<'a> {
    pub fn new(counts: Option<&'a IssueCounts>, colors: &'a ColorScheme) -> Self {
        Self { counts, colors }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(25); 4])
            .split(area);

        let values = self.counts.map(|c| {
            [c.open_issues, c.closed_issues, c.open_prs, c.closed_prs].map(|v| v.to_string())
        });
        let labels = ["Open issues", "Closed issues", "Open PRs", "Closed PRs"];
        let tints = [
            self.colors.success,
            self.colors.error,
            self.colors.success,
            self.colors.info,
        ];

        for (i, label) in labels.iter().enumerate() {
            let value = values
                .as_ref()
                .map(|v| v[i].clone())
                .unwrap_or_else(|| "-".to_string());
            let paragraph = Paragraph::new(Line::from(Span::styled(
                value,
                Style::default().fg(tints[i]).add_modifier(Modifier::BOLD),
            )))
            .alignment(Alignment::Center)
            .block(titled_block(*label, self.colors.border));

            frame.render_widget(paragraph, chunks[i]);
        }
    }
}

/// Repository selector
pub struct RepositoryList<'a> {
    repositories: &'a [RepositoryListEntry],
    focused: bool,
    colors: &'a ColorScheme,
}

impl<'a> RepositoryList<'a> {
    pub fn new(
        repositories: &'a [RepositoryListEntry],
        focused: bool,
        colors: &'a ColorScheme,
    ) -> Self {
        Self {
            repositories,
            focused,
            colors,
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, state: &mut ListState) {
        let title = format!("Repositories ({})", self.repositories.len());
        let block = titled_block(title, self.colors.border_for(self.focused));

        if self.repositories.is_empty() {
            let paragraph = Paragraph::new("No repositories found")
                .style(Style::default().fg(self.colors.muted))
                .block(block);
            frame.render_widget(paragraph, area);
            return;
        }

        let items: Vec<ListItem> = self
            .repositories
            .iter()
            .map(|repo| {
                ListItem::new(Line::from(vec![
                    Span::styled(
                        format!("{}/", repo.owner()),
                        Style::default().fg(self.colors.muted),
                    ),
                    Span::styled(repo.name(), Style::default().fg(self.colors.text)),
                ]))
            })
            .collect();

        let list = List::new(items)
            .block(block)
            .highlight_style(Style::default().bg(self.colors.secondary).fg(Color::Black))
            .highlight_symbol("> ");

        frame.render_stateful_widget(list, area, state);
    }
}

/// Branch selector
pub struct BranchList<'a> {
    branches: &'a [String],
    selected: &'a str,
    focused: bool,
    colors: &'a ColorScheme,
}

impl<'a> BranchList<'a> {
    pub fn new(
        branches: &'a [String],
        selected: &'a str,
        focused: bool,
        colors: &'a ColorScheme,
    ) -> Self {
        Self {
            branches,
            selected,
            focused,
            colors,
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, state: &mut ListState) {
        let items: Vec<ListItem> = self
            .branches
            .iter()
            .map(|branch| {
                let style = if branch == self.selected {
                    Style::default()
                        .fg(self.colors.primary)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(self.colors.text)
                };
                ListItem::new(Line::from(Span::styled(branch.as_str(), style)))
            })
            .collect();

        let list = List::new(items)
            .block(titled_block(
                format!("Branches ({})", self.branches.len()),
                self.colors.border_for(self.focused),
            ))
            .highlight_style(Style::default().bg(self.colors.secondary).fg(Color::Black))
            .highlight_symbol("> ");

        frame.render_stateful_widget(list, area, state);
    }
}

/// Commits of the selected branch
pub struct CommitList<'a> {
    commits: &'a [Commit],
    branch: &'a str,
    focused: bool,
    colors: &'a ColorScheme,
}

impl<'a> CommitList<'a> {
    pub fn new(
        commits: &'a [Commit],
        branch: &'a str,
        focused: bool,
        colors: &'a ColorScheme,
    ) -> Self {
        Self {
            commits,
            branch,
            focused,
            colors,
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, state: &mut ListState) {
        let items: Vec<ListItem> = self
            .commits
            .iter()
            .map(|commit| {
                ListItem::new(Line::from(vec![
                    Span::styled(
                        format!("{} ", commit.short_sha()),
                        Style::default().fg(self.colors.warning),
                    ),
                    Span::styled(commit_caption(commit), Style::default().fg(self.colors.text)),
                ]))
            })
            .collect();

        let title = if self.branch.is_empty() {
            "Commits".to_string()
        } else {
            format!("Commits on {} ({})", self.branch, self.commits.len())
        };

        let list = List::new(items)
            .block(titled_block(title, self.colors.border_for(self.focused)))
            .highlight_style(Style::default().bg(self.colors.secondary).fg(Color::Black));

        frame.render_stateful_widget(list, area, state);
    }
}

/// Detail pane for the selected commit
pub struct CommitDetail<'a> {
    commit: Option<&'a Commit>,
    branch: &'a str,
    html_url: Option<&'a str>,
    colors: &'a ColorScheme,
}

impl<'a> CommitDetail<'a> {
    pub fn new(
        commit: Option<&'a Commit>,
        branch: &'a str,
        html_url: Option<&'a str>,
        colors: &'a ColorScheme,
    ) -> Self {
        Self {
            commit,
            branch,
            html_url,
            colors,
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let block = titled_block("Commit", self.colors.border);

        let Some(commit) = self.commit else {
            let paragraph = Paragraph::new("No commit selected")
                .style(Style::default().fg(self.colors.muted))
                .block(block);
            frame.render_widget(paragraph, area);
            return;
        };

        let label = Style::default().fg(self.colors.secondary);
        let mut lines = vec![
            Line::from(Span::styled(
                commit_heading(commit, self.branch),
                Style::default()
                    .fg(self.colors.warning)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(vec![
                Span::styled("sha     ", label),
                Span::raw(commit.sha.as_str()),
            ]),
            Line::from(vec![
                Span::styled("author  ", label),
                Span::raw(commit.author_name.as_deref().unwrap_or("unknown")),
            ]),
            Line::from(vec![
                Span::styled("date    ", label),
                Span::raw(commit.author_date.map(time_ago).unwrap_or_default()),
            ]),
        ];
        if let Some(avatar) = &commit.author_avatar_url {
            lines.push(Line::from(vec![
                Span::styled("avatar  ", label),
                Span::raw(avatar.as_str()),
            ]));
        }
        if let Some(url) = self.html_url {
            lines.push(Line::from(vec![
                Span::styled("url     ", label),
                Span::raw(format!("{}/commit/{}", url, commit.sha)),
            ]));
        }
        lines.push(Line::from(""));
        lines.extend(commit.message.lines().map(|l| Line::from(l.to_string())));

        let paragraph = Paragraph::new(Text::from(lines))
            .block(block)
            .style(Style::default().fg(self.colors.text))
            .wrap(Wrap { trim: false });

        frame.render_widget(paragraph, area);
    }
}

/// Centered message inside a bordered panel
pub struct Notice<'a> {
    title: &'a str,
    message: &'a str,
    color: Color,
}

impl<'a> Notice<'a> {
    pub fn new(title: &'a str, message: &'a str, color: Color) -> Self {
        Self {
            title,
            message,
            color,
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let paragraph = Paragraph::new(self.message)
            .block(titled_block(self.title, self.color))
            .style(Style::default().fg(self.color))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });

        frame.render_widget(paragraph, area);
    }
}

/// Log viewer showing the newest lines that fit
pub struct LogViewer<'a> {
    logs: &'a [String],
    colors: &'a ColorScheme,
}

impl<'a> LogViewer<'a> {
    pub fn new(logs: &'a [String], colors: &'a ColorScheme) -> Self {
        Self { logs, colors }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let visible_height = area.height.saturating_sub(2) as usize; // Account for borders
        let start_idx = self.logs.len().saturating_sub(visible_height);

        let items: Vec<ListItem> = self.logs[start_idx..]
            .iter()
            .map(|log| {
                let color = if log.contains("ERROR") {
                    self.colors.error
                } else if log.contains("WARN") {
                    self.colors.warning
                } else {
                    self.colors.muted
                };

                ListItem::new(Line::from(Span::styled(
                    log.as_str(),
                    Style::default().fg(color),
                )))
            })
            .collect();

        let list = List::new(items).block(titled_block(
            format!("Log ({})", self.logs.len()),
            self.colors.border,
        ));

        frame.render_widget(list, area);
    }
}

/// Help dialog widget
pub struct HelpDialog<'a> {
    colors: &'a ColorScheme,
}

impl<'a> HelpDialog<'a> {
    pub fn new(colors: &'a ColorScheme) -> Self {
        Self { colors }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let popup_area = centered_rect(50, 60, area);
        frame.render_widget(Clear, popup_area);

        let help_text = Text::from(vec![
            Line::from(vec![Span::styled(
                "Keyboard Shortcuts",
                Style::default()
                    .fg(self.colors.primary)
                    .add_modifier(Modifier::BOLD),
            )]),
            Line::from(""),
            Line::from("  Tab/S-Tab  Switch panel"),
            Line::from("  ↑/k ↓/j    Move in panel"),
            Line::from("  Enter      Open repository"),
            Line::from("  r          Reload repository"),
            Line::from("  u          User menu"),
            Line::from("  o          Sign out"),
            Line::from("  ?/F1       Show this help"),
            Line::from("  q/Ctrl+C   Quit"),
            Line::from(""),
            Line::from(vec![Span::styled(
                "Press Esc to close",
                Style::default().fg(self.colors.secondary),
            )]),
        ]);

        let paragraph = Paragraph::new(help_text)
            .block(titled_block("Help", self.colors.primary))
            .style(Style::default().fg(self.colors.text));

        frame.render_widget(paragraph, popup_area);
    }
}

/// Popup listing the signed-in user and the sign-out key
pub struct UserMenu<'a> {
    login: &'a str,
    colors: &'a ColorScheme,
}

impl<'a> UserMenu<'a> {
    pub fn new(login: &'a str, colors: &'a ColorScheme) -> Self {
        Self { login, colors }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let popup_area = centered_rect(40, 20, area);
        frame.render_widget(Clear, popup_area);

        let text = Text::from(vec![
            Line::from(format!("Signed in as {}", self.login)),
            Line::from(""),
            Line::from(vec![
                Span::styled("[o] ", Style::default().fg(self.colors.warning)),
                Span::raw("Sign out"),
            ]),
        ]);

        let paragraph = Paragraph::new(text)
            .block(titled_block("User", self.colors.primary))
            .alignment(Alignment::Center);

        frame.render_widget(paragraph, popup_area);
    }
}

/// Error popup
pub struct ErrorDialog<'a> {
    message: &'a str,
    colors: &'a ColorScheme,
}

impl<'a> ErrorDialog<'a> {
    pub fn new(message: &'a str, colors: &'a ColorScheme) -> Self {
        Self { message, colors }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let popup_area = centered_rect(60, 30, area);
        frame.render_widget(Clear, popup_area);

        let paragraph = Paragraph::new(self.message)
            .block(titled_block("Error (press Esc to close)", self.colors.error))
            .style(Style::default().fg(self.colors.text))
            .wrap(Wrap { trim: true });

        frame.render_widget(paragraph, popup_area);
    }
}

/// Which login field has focus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoginField {
    #[default]
    Username,
    Token,
}

/// Username and token form
pub struct LoginForm<'a> {
    username: &'a str,
    token: &'a str,
    focused: LoginField,
    error: Option<&'a str>,
    colors: &'a ColorScheme,
}

impl<'a> LoginForm<'a> {
    pub fn new(
        username: &'a str,
        token: &'a str,
        focused: LoginField,
        error: Option<&'a str>,
        colors: &'a ColorScheme,
    ) -> Self {
        Self {
            username,
            token,
            focused,
            error,
            colors,
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let form_area = centered_rect(50, 50, area);
        frame.render_widget(Clear, form_area);

        let outer = titled_block("Sign in to GitHub", self.colors.primary);
        let inner = outer.inner(form_area);
        frame.render_widget(outer, form_area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Username
                Constraint::Length(3), // Token
                Constraint::Min(0),    // Error / hint
            ])
            .split(inner);

        let field = |title: &'static str, value: String, field: LoginField| {
            Paragraph::new(value)
                .style(Style::default().fg(self.colors.text))
                .block(titled_block(title, self.colors.border_for(self.focused == field)))
        };

        frame.render_widget(
            field("Username", self.username.to_string(), LoginField::Username),
            chunks[0],
        );
        frame.render_widget(
            field("Personal access token", mask(self.token), LoginField::Token),
            chunks[1],
        );

        let footer = match self.error {
            Some(error) => Paragraph::new(error)
                .style(Style::default().fg(self.colors.error))
                .wrap(Wrap { trim: true }),
            None => Paragraph::new("Tab: switch field  Enter: sign in  Esc: quit")
                .style(Style::default().fg(self.colors.muted)),
        };
        frame.render_widget(footer, chunks[2]);
    }
}
