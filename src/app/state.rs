//! Application state definitions.

use std::collections::HashSet;

use crate::registry::Registry;
use crate::report::ExecutionStatus;
use crate::scrolling::ScrollState;

/// Application operating modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    /// Component checklist
    Selector,
    /// Orchestrated run in progress
    Running,
    /// Run finished, report on screen
    Complete,
}

/// Checklist state: explicit toggles plus the live dependency closure.
///
/// `auto_included` marks components that are not explicitly selected but are
/// pulled in by the closure of the current toggles; they render marked and
/// dimmed and cannot be deselected, so the operator always sees why an item
/// will be installed.
#[derive(Debug, Clone)]
pub struct SelectorState {
    pub scroll: ScrollState,
    pub selected: Vec<bool>,
    pub auto_included: Vec<bool>,
}

impl SelectorState {
    pub fn new(total: usize, visible: usize) -> Self {
        Self {
            scroll: ScrollState::new(total, visible),
            selected: vec![false; total],
            auto_included: vec![false; total],
        }
    }

    /// Pre-select a default set of ids
    pub fn with_defaults(mut self, registry: &Registry, defaults: &[String]) -> Self {
        for id in defaults {
            if let Some(i) = registry.index_of(id) {
                self.selected[i] = true;
            }
        }
        self
    }

    /// Toggle the component under the cursor. Returns false when there is
    /// nothing to toggle or the cursor sits on a non-deselectable
    /// auto-included dependency.
    pub fn toggle_current(&mut self) -> bool {
        if self.selected.is_empty() {
            return false;
        }
        let i = self.scroll.selected;
        if self.auto_included[i] && !self.selected[i] {
            return false;
        }
        self.selected[i] = !self.selected[i];
        true
    }

    /// Select everything, or clear everything if all are already selected
    pub fn toggle_all(&mut self) {
        let target = !self.selected.iter().all(|&s| s);
        self.selected.fill(target);
    }

    /// Refresh `auto_included` from a freshly computed closure
    pub fn apply_closure(&mut self, closure: &HashSet<usize>) {
        for (i, auto) in self.auto_included.iter_mut().enumerate() {
            *auto = closure.contains(&i) && !self.selected[i];
        }
    }

    /// The explicit selection (not the closure) as component ids
    pub fn explicit_selection(&self, registry: &Registry) -> Vec<String> {
        registry
            .components()
            .iter()
            .enumerate()
            .filter(|(i, _)| self.selected[*i])
            .map(|(_, c)| c.id.clone())
            .collect()
    }

    /// Number of explicitly selected components
    pub fn selected_count(&self) -> usize {
        self.selected.iter().filter(|&&s| s).count()
    }
}

/// How many streamed output lines the run screen retains
pub const OUTPUT_TAIL_LINES: usize = 200;

/// Live view of an orchestration run.
#[derive(Debug, Clone)]
pub struct RunState {
    /// Closure component ids with their last observed status, registry order
    pub statuses: Vec<(String, ExecutionStatus)>,
    pub scroll: ScrollState,
    /// Tail of streamed install action output
    pub output: Vec<String>,
    pub current_layer: usize,
    pub total_layers: usize,
}

impl RunState {
    pub fn new(closure_ids: Vec<String>, total_layers: usize, visible: usize) -> Self {
        let total = closure_ids.len();
        Self {
            statuses: closure_ids
                .into_iter()
                .map(|id| (id, ExecutionStatus::Pending))
                .collect(),
            scroll: ScrollState::new(total, visible),
            output: Vec::new(),
            current_layer: 0,
            total_layers,
        }
    }

    /// Record a status change and keep the component visible
    pub fn set_status(&mut self, id: &str, status: ExecutionStatus) {
        if let Some(pos) = self.statuses.iter().position(|(sid, _)| sid == id) {
            self.statuses[pos].1 = status;
            if status == ExecutionStatus::Running {
                self.scroll.selected = pos;
                // follow the most recently started component
                let visible = self.scroll.visible;
                self.scroll.set_visible(visible);
            }
        }
    }

    /// Append an output line, bounded to the tail size
    pub fn push_output(&mut self, line: String) {
        self.output.push(line);
        if self.output.len() > OUTPUT_TAIL_LINES {
            self.output.remove(0);
        }
    }

    /// Count of components that reached a terminal state
    pub fn finished_count(&self) -> usize {
        self.statuses
            .iter()
            .filter(|(_, status)| status.is_terminal())
            .count()
    }
}

/// Main application state
#[derive(Debug, Clone)]
pub struct AppState {
    pub mode: AppMode,
    pub selector: SelectorState,
    pub run: Option<RunState>,
    /// Rendered report, present in Complete mode
    pub report_text: Option<String>,
    /// One-line feedback shown in the footer
    pub status_message: String,
}

impl AppState {
    pub fn new(component_count: usize, visible: usize) -> Self {
        Self {
            mode: AppMode::Selector,
            selector: SelectorState::new(component_count, visible),
            run: None,
            report_text: None,
            status_message: "Space toggles, 'a' toggles all, Enter installs, q quits".to_string(),
        }
    }
}
