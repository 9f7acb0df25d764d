//! Interactive application: selector, live run screen, report screen.
//!
//! The orchestrator runs on a background thread and feeds [`RunEvent`]s and
//! the final [`RunReport`] back over channels; the event loop here stays
//! responsive and is the only writer of UI state.

pub mod state;

pub use state::{AppMode, AppState};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossterm::event::{self, Event, KeyEventKind};
use ratatui::backend::Backend;
use ratatui::Terminal;
use tracing::debug;

use crate::error::Result;
use crate::graph::DependencyGraph;
use crate::input::{self, InputOutcome};
use crate::orchestrator::{Orchestrator, RunEvent, RunOptions};
use crate::plan::ExecutionPlan;
use crate::registry::Registry;
use crate::report::RunReport;
use crate::ui::{self, CHROME_ROWS};

/// Event poll interval; also the refresh rate while a run streams output
const TICK: Duration = Duration::from_millis(100);

/// Interactive application driver.
pub struct App<'a> {
    registry: &'a Arc<Registry>,
    graph: DependencyGraph<'a>,
    options: RunOptions,
    state: AppState,
    run_events: Option<Receiver<RunEvent>>,
    report_rx: Option<Receiver<RunReport>>,
    cancel: Option<Arc<AtomicBool>>,
    report: Option<RunReport>,
}

impl<'a> App<'a> {
    /// Create the application over an already-validated registry and graph.
    ///
    /// Graph construction (and with it cycle detection) happens before this,
    /// so a cyclic registry never reaches the selector.
    pub fn new(
        registry: &'a Arc<Registry>,
        graph: DependencyGraph<'a>,
        options: RunOptions,
        defaults: &[String],
    ) -> Self {
        let mut state = AppState::new(registry.len(), 30);
        state.selector = state::SelectorState::new(registry.len(), 30)
            .with_defaults(registry, defaults);
        let mut app = Self {
            registry,
            graph,
            options,
            state,
            run_events: None,
            report_rx: None,
            cancel: None,
            report: None,
        };
        app.refresh_closure();
        app
    }

    /// Run the event loop until the operator quits. Returns the run report
    /// if an orchestration completed, for the caller's exit code.
    pub fn run<B: Backend>(mut self, terminal: &mut Terminal<B>) -> Result<Option<RunReport>> {
        loop {
            self.resize_scroll_windows(terminal.size()?.height);
            self.drain_run_events();
            self.check_run_completion();

            terminal.draw(|f| ui::render(f, &self.state, self.registry))?;

            if !event::poll(TICK)? {
                continue;
            }
            let Event::Key(key) = event::read()? else {
                continue;
            };
            if key.kind != KeyEventKind::Press {
                continue;
            }

            match input::handle_key(&mut self.state, key) {
                InputOutcome::Continue => {}
                InputOutcome::SelectionChanged => self.refresh_closure(),
                InputOutcome::Confirm => self.start_run(),
                InputOutcome::CancelRun => {
                    if let Some(cancel) = &self.cancel {
                        cancel.store(true, Ordering::SeqCst);
                        self.state.status_message = "Cancelling…".to_string();
                    }
                }
                InputOutcome::Quit => break,
            }
        }

        Ok(self.report.take())
    }

    /// Keep virtual-list windows in sync with the terminal height
    fn resize_scroll_windows(&mut self, height: u16) {
        let rows = height.saturating_sub(CHROME_ROWS).max(1) as usize;
        self.state.selector.scroll.set_visible(rows);
        if let Some(run) = &mut self.state.run {
            run.scroll.set_visible((rows / 2).max(1));
        }
    }

    /// Recompute the live closure so auto-included dependencies stay marked
    fn refresh_closure(&mut self) {
        let selection = self.state.selector.explicit_selection(self.registry);
        // Selection ids come from the registry itself, so this cannot miss
        if let Ok(closure) = self.graph.closure(&selection) {
            self.state.selector.apply_closure(&closure);
        }
    }

    /// Build the plan for the confirmed selection and launch the
    /// orchestrator on a background thread.
    fn start_run(&mut self) {
        let selection = self.state.selector.explicit_selection(self.registry);
        if selection.is_empty() {
            self.state.status_message = "Nothing selected".to_string();
            return;
        }

        let plan = match ExecutionPlan::build(&self.graph, &selection) {
            Ok(plan) => plan,
            Err(e) => {
                self.state.status_message = format!("Planning failed: {e}");
                return;
            }
        };

        let closure_ids: Vec<String> = match self.graph.closure_indices(&selection) {
            Ok(indices) => indices
                .into_iter()
                .map(|i| self.registry.components()[i].id.clone())
                .collect(),
            Err(e) => {
                self.state.status_message = format!("Planning failed: {e}");
                return;
            }
        };

        debug!("starting run over {} component(s)", closure_ids.len());
        let total_layers = plan.layers().len();

        let (event_tx, event_rx) = channel();
        let (report_tx, report_rx) = channel();
        let orchestrator = Orchestrator::new(
            Arc::clone(self.registry),
            plan,
            self.options.clone(),
            event_tx,
        );
        self.cancel = Some(orchestrator.cancel_flag());
        thread::spawn(move || {
            let report = orchestrator.run();
            let _ = report_tx.send(report);
        });

        self.run_events = Some(event_rx);
        self.report_rx = Some(report_rx);
        self.state.run = Some(state::RunState::new(closure_ids, total_layers, 15));
        self.state.mode = AppMode::Running;
        self.state.status_message = "Installing… q cancels".to_string();
    }

    /// Apply queued orchestrator events to the run screen
    fn drain_run_events(&mut self) {
        let Some(rx) = &self.run_events else {
            return;
        };
        let Some(run) = &mut self.state.run else {
            return;
        };
        for event in rx.try_iter() {
            match event {
                RunEvent::LayerStarted { index, .. } => run.current_layer = index,
                RunEvent::ComponentStarted { id } => {
                    run.set_status(&id, crate::report::ExecutionStatus::Running);
                }
                RunEvent::ComponentOutput { id, line } => {
                    run.push_output(format!("{id}: {line}"));
                }
                RunEvent::ComponentFinished { id, status } => run.set_status(&id, status),
                RunEvent::Cancelled => {
                    run.push_output("run cancelled".to_string());
                }
            }
        }
    }

    /// Pick up the finished report and switch to the report screen
    fn check_run_completion(&mut self) {
        let Some(rx) = &self.report_rx else {
            return;
        };
        if let Ok(report) = rx.try_recv() {
            self.state.report_text = Some(report.render(self.registry));
            self.report = Some(report);
            self.report_rx = None;
            self.run_events = None;
            self.cancel = None;
            self.state.mode = AppMode::Complete;
            self.state.status_message = "Enter or q exits".to_string();
        }
    }
}
