//! Terminal dashboard
//!
//! Login screen and repository dashboard built on ratatui and crossterm.
//! The event loop below is the only owner of UI state; background results
//! reach it through the refresher's channel.

pub mod app;
pub mod events;
pub mod widgets;

use crate::session::{AuthStrategy, Session};
use crate::Config;
use anyhow::Result;
use app::{initial_app, App};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::time::Duration;

/// Launch the TUI application
pub async fn run_tui(config: Config, resolved: Option<(Session, AuthStrategy)>) -> Result<()> {
    // Create app state BEFORE entering raw mode
    // This allows initialization errors to display normally
    let mut app = initial_app(config, resolved)?;

    // Setup terminal (raw mode)
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Main event loop
    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    app.on_view_unmount();
    result
}

/// Main application event loop
async fn run_app<B>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()>
where
    B: ratatui::backend::Backend,
{
    while !app.should_exit() {
        terminal.draw(|f| app.draw(f))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                // Windows reports releases too
                if key.kind == KeyEventKind::Press {
                    app.handle_key_event(key).await?;
                }
            }
        }

        app.update().await?;
    }

    Ok(())
}
