//! Execution of external probes and install actions.
//!
//! This is the only module that spawns component processes. Install actions
//! run in their own process group and are registered with the global child
//! registry so cancellation and exit cleanup can reach the whole process
//! tree. The installer never interprets what an action does internally; it
//! observes the exit status and captures the combined output.

use std::io::{BufRead, BufReader};
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use tracing::{debug, warn};

use crate::process_guard::{ChildRegistry, CommandProcessGroup};
use crate::registry::InstallAction;

/// Environment variable handed to every probe and install action, pointing
/// at the shared repository root the actions operate on.
pub const ROOT_ENV_VAR: &str = "COMPINSTALL_ROOT";

/// Result of running an install action to completion.
#[derive(Debug, Clone)]
pub struct ActionOutput {
    /// True iff the process ran and exited zero
    pub success: bool,
    /// Exit code, when the process ran and reported one
    pub exit_code: Option<i32>,
    /// Combined captured output (stdout first, then stderr)
    pub output: String,
}

/// What an idempotency probe reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Probe exited zero: the component's effect is already present
    Satisfied,
    /// Probe exited nonzero: the install action should run
    Unsatisfied,
    /// Probe could not be executed at all; the component's state is unknown
    Unavailable(String),
}

/// Run a `check_command` probe through `sh -c`.
///
/// Probes are re-run on every orchestration pass, never cached: they are
/// external side-effecting capabilities, not pure functions.
pub fn run_probe(command: &str, root: &Path) -> ProbeOutcome {
    debug!("running probe: {command}");
    match Command::new("sh")
        .arg("-c")
        .arg(command)
        .current_dir(root)
        .env(ROOT_ENV_VAR, root)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .in_new_process_group()
        .status()
    {
        Ok(status) if status.success() => ProbeOutcome::Satisfied,
        Ok(_) => ProbeOutcome::Unsatisfied,
        Err(e) => {
            warn!("probe '{command}' could not be executed: {e}");
            ProbeOutcome::Unavailable(format!("probe could not be executed: {e}"))
        }
    }
}

/// Run an install action to completion, streaming stdout lines to `on_line`
/// as they arrive and capturing everything for the report.
///
/// A spawn failure is reported as an unsuccessful [`ActionOutput`] rather
/// than an error: from the orchestrator's point of view it is just a failed
/// component.
pub fn run_install_action(
    action: &InstallAction,
    root: &Path,
    mut on_line: impl FnMut(&str),
) -> ActionOutput {
    debug!("spawning install action: {} {:?}", action.program, action.args);

    let mut child = match Command::new(&action.program)
        .args(&action.args)
        .current_dir(root)
        .env(ROOT_ENV_VAR, root)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .in_new_process_group()
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            return ActionOutput {
                success: false,
                exit_code: None,
                output: format!("failed to spawn '{}': {e}", action.program),
            };
        }
    };

    let pid = child.id();
    if let Ok(mut registry) = ChildRegistry::global().lock() {
        registry.register(pid);
    }

    // stderr is drained on its own thread so a chatty action cannot
    // deadlock on a full pipe while we read stdout.
    let stderr_handle = child.stderr.take().map(|stderr| {
        thread::spawn(move || {
            let reader = BufReader::new(stderr);
            let mut lines = Vec::new();
            for line in reader.lines().map_while(Result::ok) {
                lines.push(line);
            }
            lines
        })
    });

    let mut output = String::new();
    if let Some(stdout) = child.stdout.take() {
        let reader = BufReader::new(stdout);
        for line in reader.lines().map_while(Result::ok) {
            on_line(&line);
            output.push_str(&line);
            output.push('\n');
        }
    }

    let status = child.wait();

    if let Some(handle) = stderr_handle {
        if let Ok(lines) = handle.join() {
            for line in lines {
                output.push_str(&line);
                output.push('\n');
            }
        }
    }

    if let Ok(mut registry) = ChildRegistry::global().lock() {
        registry.unregister(pid);
    }

    match status {
        Ok(status) => ActionOutput {
            success: status.success(),
            exit_code: status.code(),
            output,
        },
        Err(e) => ActionOutput {
            success: false,
            exit_code: None,
            output: format!("{output}failed to wait for '{}': {e}", action.program),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(program: &str, args: &[&str]) -> InstallAction {
        InstallAction {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    #[test]
    fn test_probe_satisfied_and_unsatisfied() {
        let root = std::env::temp_dir();
        assert_eq!(run_probe("true", &root), ProbeOutcome::Satisfied);
        assert_eq!(run_probe("false", &root), ProbeOutcome::Unsatisfied);
    }

    #[test]
    fn test_install_action_captures_output_and_status() {
        let root = std::env::temp_dir();
        let mut streamed = Vec::new();
        let result = run_install_action(
            &action("sh", &["-c", "echo one; echo two >&2; echo three; exit 3"]),
            &root,
            |line| streamed.push(line.to_string()),
        );

        assert!(!result.success);
        assert_eq!(result.exit_code, Some(3));
        assert_eq!(streamed, vec!["one", "three"]);
        assert!(result.output.contains("one\n"));
        assert!(result.output.contains("two"));
    }

    #[test]
    fn test_install_action_sees_root_env() {
        let dir = tempfile::tempdir().unwrap();
        let result = run_install_action(
            &action("sh", &["-c", "test -n \"$COMPINSTALL_ROOT\""]),
            dir.path(),
            |_| {},
        );
        assert!(result.success);
    }

    #[test]
    fn test_spawn_failure_is_unsuccessful_output() {
        let root = std::env::temp_dir();
        let result = run_install_action(&action("/nonexistent/program", &[]), &root, |_| {});
        assert!(!result.success);
        assert_eq!(result.exit_code, None);
        assert!(result.output.contains("failed to spawn"));
    }
}
