//! Centralized colors and styles for the TUI.
//!
//! Single source of truth for the palette so the selector, run screen and
//! report screen stay visually consistent.

use ratatui::style::{Color, Modifier, Style};

use crate::report::ExecutionStatus;

/// Core color palette
pub struct Colors;

impl Colors {
    /// Default foreground text color
    pub const FG_PRIMARY: Color = Color::White;

    /// Secondary/muted text color
    pub const FG_SECONDARY: Color = Color::Gray;

    /// Disabled/auto-included text color
    pub const FG_MUTED: Color = Color::DarkGray;

    /// Primary accent - borders, titles
    pub const PRIMARY: Color = Color::Cyan;

    /// Secondary accent - highlighted/selected items
    pub const SECONDARY: Color = Color::Yellow;

    /// Success feedback
    pub const SUCCESS: Color = Color::Green;

    /// Failure feedback
    pub const ERROR: Color = Color::Red;

    /// Skipped/neutral feedback
    pub const INFO: Color = Color::Blue;
}

/// Pre-built styles
pub struct Styles;

impl Styles {
    /// Panel titles
    pub fn title() -> Style {
        Style::default()
            .fg(Colors::PRIMARY)
            .add_modifier(Modifier::BOLD)
    }

    /// The row the cursor is on
    pub fn highlighted() -> Style {
        Style::default()
            .fg(Colors::SECONDARY)
            .add_modifier(Modifier::BOLD)
    }

    /// Dependencies pulled in by the current selection
    pub fn auto_included() -> Style {
        Style::default().fg(Colors::FG_MUTED)
    }

    /// Style for a component's run status
    pub fn status(status: ExecutionStatus) -> Style {
        let color = match status {
            ExecutionStatus::Pending => Colors::FG_MUTED,
            ExecutionStatus::Running => Colors::SECONDARY,
            ExecutionStatus::Skipped => Colors::INFO,
            ExecutionStatus::Succeeded => Colors::SUCCESS,
            ExecutionStatus::Failed => Colors::ERROR,
            ExecutionStatus::Aborted => Colors::ERROR,
        };
        Style::default().fg(color)
    }
}
