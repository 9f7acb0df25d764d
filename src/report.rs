//! Per-component outcomes and the final run report.

use std::fmt::Write as _;

use strum::Display;

use crate::registry::Registry;

/// Lifecycle state of a component within a run.
///
/// `Pending` and `Running` are transient; every component in the closure
/// reaches exactly one of the four terminal states per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum ExecutionStatus {
    /// Not yet scheduled
    Pending,
    /// Install action currently executing
    Running,
    /// Idempotency probe reported the component already satisfied
    Skipped,
    /// Install action exited zero
    Succeeded,
    /// Install action (or an unrunnable probe) failed
    Failed,
    /// Never attempted: a dependency did not reach Succeeded/Skipped, or the
    /// run was cancelled before this component started
    Aborted,
}

impl ExecutionStatus {
    /// True for the four end states
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending | Self::Running)
    }

    /// True when the component's effect is present (installed or already was)
    pub fn is_satisfied(self) -> bool {
        matches!(self, Self::Succeeded | Self::Skipped)
    }

    /// Single-character marker used in console output
    pub fn glyph(self) -> &'static str {
        match self {
            Self::Pending => "·",
            Self::Running => "…",
            Self::Skipped => "-",
            Self::Succeeded => "✓",
            Self::Failed => "✗",
            Self::Aborted => "!",
        }
    }
}

/// Outcome of one component: terminal status plus whatever the external
/// process produced. The orchestrator never interprets the output beyond
/// attaching it here.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub status: ExecutionStatus,
    /// Captured combined output of the install action (empty for
    /// skipped/aborted components)
    pub output: String,
    /// Exit code of the install action, when one ran and reported a code
    pub exit_code: Option<i32>,
}

impl ExecutionResult {
    pub fn new(status: ExecutionStatus) -> Self {
        Self {
            status,
            output: String::new(),
            exit_code: None,
        }
    }
}

/// How many output lines a FAILED row reproduces in the report
const FAILURE_EXCERPT_LINES: usize = 4;
/// Column width of an excerpt line before truncation
const FAILURE_EXCERPT_WIDTH: usize = 120;

/// Full mapping of closure component id to outcome, in registry declaration
/// order. Immutable once produced.
#[derive(Debug)]
pub struct RunReport {
    entries: Vec<(String, ExecutionResult)>,
    cancelled: bool,
}

impl RunReport {
    /// Assemble a report in registry declaration order from per-id results.
    ///
    /// Every id in `results` must exist in the registry; ids are sorted by
    /// declaration position so rendering is deterministic.
    pub fn new(
        registry: &Registry,
        mut results: Vec<(String, ExecutionResult)>,
        cancelled: bool,
    ) -> Self {
        results.sort_by_key(|(id, _)| registry.index_of(id).unwrap_or(usize::MAX));
        Self {
            entries: results,
            cancelled,
        }
    }

    /// Per-component entries in registry declaration order
    pub fn entries(&self) -> &[(String, ExecutionResult)] {
        &self.entries
    }

    /// Outcome for a single component
    pub fn result_of(&self, id: &str) -> Option<&ExecutionResult> {
        self.entries
            .iter()
            .find(|(entry_id, _)| entry_id == id)
            .map(|(_, result)| result)
    }

    /// Whether the run was interrupted by a cancellation signal
    pub fn cancelled(&self) -> bool {
        self.cancelled
    }

    /// True when every closure component ended Succeeded or Skipped
    pub fn succeeded(&self) -> bool {
        self.entries
            .iter()
            .all(|(_, result)| result.status.is_satisfied())
    }

    /// Process exit code for the CLI contract: 0 only for a fully
    /// succeeded/skipped run with no aborts
    pub fn exit_code(&self) -> i32 {
        i32::from(!self.succeeded())
    }

    /// Render the final status table: one row per closure component in
    /// registry order, with a truncated output excerpt under FAILED rows.
    pub fn render(&self, registry: &Registry) -> String {
        let mut out = String::new();
        for (id, result) in &self.entries {
            let name = registry.get(id).map(|c| c.name.as_str()).unwrap_or(id);
            let code = match result.exit_code {
                Some(code) if result.status == ExecutionStatus::Failed => {
                    format!(" (exit {code})")
                }
                _ => String::new(),
            };
            let _ = writeln!(
                out,
                "{} {:<9} {:<20} {}{}",
                result.status.glyph(),
                result.status,
                id,
                name,
                code
            );

            if result.status == ExecutionStatus::Failed && !result.output.is_empty() {
                for line in failure_excerpt(&result.output) {
                    let _ = writeln!(out, "    | {line}");
                }
            }
        }

        let summary = if self.cancelled {
            "cancelled"
        } else if self.succeeded() {
            "ok"
        } else {
            "failed"
        };
        let _ = writeln!(
            out,
            "{} component(s): {} succeeded, {} skipped, {} failed, {} aborted [{}]",
            self.entries.len(),
            self.count(ExecutionStatus::Succeeded),
            self.count(ExecutionStatus::Skipped),
            self.count(ExecutionStatus::Failed),
            self.count(ExecutionStatus::Aborted),
            summary
        );
        out
    }

    fn count(&self, status: ExecutionStatus) -> usize {
        self.entries
            .iter()
            .filter(|(_, r)| r.status == status)
            .count()
    }
}

/// Last few non-empty lines of the captured output, width-truncated.
fn failure_excerpt(output: &str) -> Vec<String> {
    let lines: Vec<&str> = output.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(FAILURE_EXCERPT_LINES);
    lines[start..]
        .iter()
        .map(|line| {
            if line.chars().count() > FAILURE_EXCERPT_WIDTH {
                let truncated: String = line.chars().take(FAILURE_EXCERPT_WIDTH).collect();
                format!("{truncated}…")
            } else {
                (*line).to_string()
            }
        })
        .collect()
}
