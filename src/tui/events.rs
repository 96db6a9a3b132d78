//! Key mapping for the TUI
//!
//! The login screen takes free text, so it has its own mapping; every other
//! key press goes through [`key_handler::key_to_app_action`].

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Actions on the dashboard screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppAction {
    Quit,
    ShowHelp,
    /// Close the topmost popup
    Close,
    NextPanel,
    PreviousPanel,
    Up,
    Down,
    Select,
    /// Reload the current repository
    Retry,
    ToggleUserMenu,
    /// Only acts while the user menu is open
    SignOut,
}

/// Actions on the login screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginAction {
    Input(char),
    Backspace,
    NextField,
    Submit,
    Quit,
}

/// Helper functions for key event processing
pub mod key_handler {
    use super::*;

    /// Check if a key event matches a specific key combination
    pub fn matches_key(event: &KeyEvent, code: KeyCode, modifiers: KeyModifiers) -> bool {
        event.code == code && event.modifiers == modifiers
    }

    /// Check if a key event is Ctrl+key combination
    pub fn matches_ctrl_key(event: &KeyEvent, code: KeyCode) -> bool {
        matches_key(event, code, KeyModifiers::CONTROL)
    }

    /// Convert key event to dashboard action
    pub fn key_to_app_action(event: &KeyEvent) -> Option<AppAction> {
        if matches_ctrl_key(event, KeyCode::Char('c')) {
            return Some(AppAction::Quit);
        }

        match event.code {
            KeyCode::Char('q') => Some(AppAction::Quit),
            KeyCode::Char('?') | KeyCode::F(1) => Some(AppAction::ShowHelp),
            KeyCode::Esc => Some(AppAction::Close),
            KeyCode::Tab => Some(AppAction::NextPanel),
            KeyCode::BackTab => Some(AppAction::PreviousPanel),
            KeyCode::Up | KeyCode::Char('k') => Some(AppAction::Up),
            KeyCode::Down | KeyCode::Char('j') => Some(AppAction::Down),
            KeyCode::Enter => Some(AppAction::Select),
            KeyCode::Char('r') => Some(AppAction::Retry),
            KeyCode::Char('u') => Some(AppAction::ToggleUserMenu),
            KeyCode::Char('o') => Some(AppAction::SignOut),
            _ => None,
        }
    }

    /// Convert key event to login form action
    pub fn key_to_login_action(event: &KeyEvent) -> Option<LoginAction> {
        if matches_ctrl_key(event, KeyCode::Char('c')) {
            return Some(LoginAction::Quit);
        }

        match event.code {
            KeyCode::Esc => Some(LoginAction::Quit),
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
                Some(LoginAction::NextField)
            }
            KeyCode::Enter => Some(LoginAction::Submit),
            KeyCode::Backspace => Some(LoginAction::Backspace),
            KeyCode::Char(c)
                if event.modifiers.is_empty() || event.modifiers == KeyModifiers::SHIFT =>
            {
                Some(LoginAction::Input(c))
            }
            _ => None,
        }
    }
}
