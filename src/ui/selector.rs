//! Component checklist screen.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::Style;
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph, Wrap};
use ratatui::Frame;

use crate::app::state::AppState;
use crate::registry::Registry;
use crate::theme::{Colors, Styles};

/// Render the checklist plus a description panel for the highlighted
/// component. Only the scroll window's slice of the registry is turned into
/// list items, so arbitrarily large registries render fine.
pub fn render(f: &mut Frame, area: Rect, state: &AppState, registry: &Registry) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);

    render_checklist(f, chunks[0], state, registry);
    render_description(f, chunks[1], state, registry);
}

fn render_checklist(f: &mut Frame, area: Rect, state: &AppState, registry: &Registry) {
    let selector = &state.selector;
    let components = registry.components();

    let items: Vec<ListItem> = selector
        .scroll
        .visible_range()
        .map(|i| {
            let component = &components[i];
            let cursor = if i == selector.scroll.selected { "▸ " } else { "  " };
            let checkbox = if selector.selected[i] {
                "[x]"
            } else if selector.auto_included[i] {
                "[+]"
            } else {
                "[ ]"
            };
            let style = if i == selector.scroll.selected {
                Styles::highlighted()
            } else if selector.auto_included[i] {
                Styles::auto_included()
            } else {
                Style::default().fg(Colors::FG_PRIMARY)
            };
            ListItem::new(format!("{cursor}{checkbox} {}", component.name)).style(style)
        })
        .collect();

    let title = format!(
        " Components ({} selected, {} total) ",
        selector.selected_count(),
        registry.len()
    );
    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(title)
            .title_style(Styles::title())
            .border_style(Style::default().fg(Colors::PRIMARY)),
    );
    f.render_widget(list, area);
}

fn render_description(f: &mut Frame, area: Rect, state: &AppState, registry: &Registry) {
    let selector = &state.selector;
    let mut lines: Vec<Line> = Vec::new();

    if let Some(component) = registry.components().get(selector.scroll.selected) {
        lines.push(Line::styled(component.name.clone(), Styles::title()));
        lines.push(Line::raw(""));
        lines.push(Line::raw(component.description.clone()));
        lines.push(Line::raw(""));
        if component.depends_on.is_empty() {
            lines.push(Line::styled(
                "No dependencies",
                Style::default().fg(Colors::FG_MUTED),
            ));
        } else {
            lines.push(Line::styled(
                format!("Depends on: {}", component.depends_on.join(", ")),
                Style::default().fg(Colors::FG_SECONDARY),
            ));
        }
        if selector.auto_included[selector.scroll.selected] {
            lines.push(Line::raw(""));
            lines.push(Line::styled(
                "Included automatically as a dependency of your selection",
                Style::default().fg(Colors::SECONDARY),
            ));
        }
        if component.check_command.is_some() {
            lines.push(Line::raw(""));
            lines.push(Line::styled(
                "Skipped when already installed",
                Style::default().fg(Colors::FG_MUTED),
            ));
        }
    }

    let widget = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Details ")
                .title_style(Styles::title())
                .border_style(Style::default().fg(Colors::PRIMARY)),
        )
        .wrap(Wrap { trim: false });
    f.render_widget(widget, area);
}
