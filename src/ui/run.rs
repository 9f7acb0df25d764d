//! Run progress and report screens.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::Style;
use ratatui::widgets::{Block, Borders, Gauge, List, ListItem, Paragraph, Wrap};
use ratatui::Frame;

use crate::app::state::AppState;
use crate::theme::{Colors, Styles};

/// Render the live run screen: progress gauge, component statuses and a
/// tail of streamed install action output.
pub fn render_running(f: &mut Frame, area: Rect, state: &AppState) {
    let Some(run) = &state.run else {
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),      // Progress gauge
            Constraint::Percentage(45), // Component statuses
            Constraint::Min(5),         // Output tail
        ])
        .split(area);

    let total = run.statuses.len().max(1);
    let ratio = run.finished_count() as f64 / total as f64;
    let gauge = Gauge::default()
        .block(
            Block::default().borders(Borders::ALL).title(format!(
                " Layer {}/{} ",
                (run.current_layer + 1).min(run.total_layers.max(1)),
                run.total_layers.max(1)
            )),
        )
        .gauge_style(Style::default().fg(Colors::PRIMARY))
        .ratio(ratio);
    f.render_widget(gauge, chunks[0]);

    let items: Vec<ListItem> = run
        .scroll
        .visible_range()
        .filter_map(|i| run.statuses.get(i))
        .map(|(id, status)| {
            ListItem::new(format!("{} {:<9} {}", status.glyph(), status.to_string(), id))
                .style(Styles::status(*status))
        })
        .collect();
    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Components ")
            .title_style(Styles::title()),
    );
    f.render_widget(list, chunks[1]);

    let tail_rows = chunks[2].height.saturating_sub(2) as usize;
    let start = run.output.len().saturating_sub(tail_rows);
    let output = run.output[start..].join("\n");
    let output_widget = Paragraph::new(output)
        .style(Style::default().fg(Colors::FG_SECONDARY))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Output ")
                .title_style(Styles::title()),
        );
    f.render_widget(output_widget, chunks[2]);
}

/// Render the final report.
pub fn render_complete(f: &mut Frame, area: Rect, state: &AppState) {
    let text = state
        .report_text
        .as_deref()
        .unwrap_or("No report available");
    let widget = Paragraph::new(text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Run Report ")
                .title_style(Styles::title()),
        )
        .wrap(Wrap { trim: false });
    f.render_widget(widget, area);
}
