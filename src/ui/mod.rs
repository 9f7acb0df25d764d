//! TUI rendering.
//!
//! One render function per screen; `render` dispatches on the application
//! mode. All widgets draw through the virtual-list scroll windows in the
//! state, never at absolute item coordinates.

mod run;
mod selector;

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::Style;
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use crate::app::state::{AppMode, AppState};
use crate::registry::Registry;
use crate::theme::{Colors, Styles};

/// Rows consumed around a main-panel list: title bar, footer and the
/// panel's own borders
pub const CHROME_ROWS: u16 = 8;

/// Render the current screen.
pub fn render(f: &mut Frame, state: &AppState, registry: &Registry) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Min(5),    // Screen body
            Constraint::Length(3), // Footer
        ])
        .split(f.area());

    render_title(f, chunks[0], state);

    match state.mode {
        AppMode::Selector => selector::render(f, chunks[1], state, registry),
        AppMode::Running => run::render_running(f, chunks[1], state),
        AppMode::Complete => run::render_complete(f, chunks[1], state),
    }

    render_footer(f, chunks[2], state);
}

fn render_title(f: &mut Frame, area: Rect, state: &AppState) {
    let title = match state.mode {
        AppMode::Selector => " Component Installer — Select Components ",
        AppMode::Running => " Component Installer — Installing ",
        AppMode::Complete => " Component Installer — Report ",
    };
    let widget = Paragraph::new(title)
        .style(Styles::title())
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(widget, area);
}

fn render_footer(f: &mut Frame, area: Rect, state: &AppState) {
    let widget = Paragraph::new(state.status_message.as_str())
        .style(Style::default().fg(Colors::FG_SECONDARY))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(widget, area);
}
