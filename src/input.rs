//! Keyboard handling, dispatched by application mode.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::state::{AppMode, AppState};

/// What the application loop should do after a key event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputOutcome {
    /// Nothing further
    Continue,
    /// Explicit toggles changed; the closure must be recomputed
    SelectionChanged,
    /// Operator confirmed the selection
    Confirm,
    /// Operator requested cancellation of the running orchestration
    CancelRun,
    /// Leave the application
    Quit,
}

/// Handle one key event against the current state.
pub fn handle_key(state: &mut AppState, key: KeyEvent) -> InputOutcome {
    // Ctrl+C reaches us as a key event under raw mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return match state.mode {
            AppMode::Running => InputOutcome::CancelRun,
            _ => InputOutcome::Quit,
        };
    }

    match state.mode {
        AppMode::Selector => handle_selector_key(state, key),
        AppMode::Running => match key.code {
            KeyCode::Char('q') | KeyCode::Esc => InputOutcome::CancelRun,
            _ => InputOutcome::Continue,
        },
        AppMode::Complete => match key.code {
            KeyCode::Char('q') | KeyCode::Esc | KeyCode::Enter => InputOutcome::Quit,
            _ => InputOutcome::Continue,
        },
    }
}

fn handle_selector_key(state: &mut AppState, key: KeyEvent) -> InputOutcome {
    let selector = &mut state.selector;
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => InputOutcome::Quit,
        KeyCode::Up | KeyCode::Char('k') => {
            selector.scroll.up();
            InputOutcome::Continue
        }
        KeyCode::Down | KeyCode::Char('j') => {
            selector.scroll.down();
            InputOutcome::Continue
        }
        KeyCode::PageUp => {
            selector.scroll.page_up();
            InputOutcome::Continue
        }
        KeyCode::PageDown => {
            selector.scroll.page_down();
            InputOutcome::Continue
        }
        KeyCode::Home => {
            selector.scroll.home();
            InputOutcome::Continue
        }
        KeyCode::End => {
            selector.scroll.end();
            InputOutcome::Continue
        }
        KeyCode::Char(' ') => {
            if selector.toggle_current() {
                InputOutcome::SelectionChanged
            } else {
                state.status_message =
                    "Required by your selection; deselect the dependent first".to_string();
                InputOutcome::Continue
            }
        }
        KeyCode::Char('a') | KeyCode::Char('A') => {
            selector.toggle_all();
            InputOutcome::SelectionChanged
        }
        KeyCode::Enter => InputOutcome::Confirm,
        _ => InputOutcome::Continue,
    }
}
