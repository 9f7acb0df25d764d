//! Plan execution: worker pool, state machine, failure propagation.
//!
//! The orchestrator walks the plan layer by layer. Components within a layer
//! are mutually independent by construction and are dispatched to a bounded
//! pool of worker threads over an mpsc channel; the orchestrator does not
//! advance past a layer until every member has reached a terminal state,
//! since later layers may depend on any of them.
//!
//! The result map has a single writer (the orchestrator thread); workers
//! report outcomes over a channel, so no lock is held across an install
//! action's execution.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::plan::ExecutionPlan;
use crate::process_guard::ChildRegistry;
use crate::registry::{Component, Registry};
use crate::report::{ExecutionResult, ExecutionStatus, RunReport};
use crate::runner::{run_install_action, run_probe, ProbeOutcome};

/// Default worker pool size. Deliberately small: install actions tend to
/// contend on shared external resources such as a package manager lock.
pub const DEFAULT_JOBS: usize = 2;

/// Options controlling a single orchestration run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Bypass idempotency probes unconditionally
    pub force: bool,
    /// Stop scheduling pending components after the first failure
    pub fail_fast: bool,
    /// Worker pool size (1 = fully sequential)
    pub jobs: usize,
    /// How long running actions get between SIGTERM and SIGKILL on cancel
    pub grace_period: Duration,
    /// Repository root handed to probes and install actions
    pub root: PathBuf,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            force: false,
            fail_fast: false,
            jobs: DEFAULT_JOBS,
            grace_period: Duration::from_secs(5),
            root: PathBuf::from("."),
        }
    }
}

/// Progress notifications emitted during a run.
///
/// Consumers (the TUI run screen, the headless printer) receive these on a
/// channel; a dropped receiver never stalls the run.
#[derive(Debug, Clone)]
pub enum RunEvent {
    /// A new scheduling layer began
    LayerStarted { index: usize, total: usize },
    /// A component's probe/install action is about to run
    ComponentStarted { id: String },
    /// One line of install action stdout
    ComponentOutput { id: String, line: String },
    /// A component reached a terminal state
    ComponentFinished { id: String, status: ExecutionStatus },
    /// The run was cancelled; remaining components were aborted
    Cancelled,
}

/// A unit of work handed to the pool
struct Job {
    component: Component,
}

/// Walks an [`ExecutionPlan`] and produces a [`RunReport`].
pub struct Orchestrator {
    registry: Arc<Registry>,
    plan: ExecutionPlan,
    options: RunOptions,
    events: Sender<RunEvent>,
    cancel: Arc<AtomicBool>,
}

impl Orchestrator {
    pub fn new(
        registry: Arc<Registry>,
        plan: ExecutionPlan,
        options: RunOptions,
        events: Sender<RunEvent>,
    ) -> Self {
        Self {
            registry,
            plan,
            options,
            events,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shared cancellation flag. Setting it stops dispatch of pending
    /// components immediately; running actions get the grace period.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Execute the plan to completion and return the report.
    ///
    /// Never returns early: even a cancelled or fully failed run reports a
    /// terminal state for every component in the closure.
    pub fn run(self) -> RunReport {
        let (job_tx, job_rx) = channel::<Job>();
        let (result_tx, result_rx) = channel::<(String, ExecutionResult)>();
        let job_rx = Arc::new(Mutex::new(job_rx));
        // Set on cancellation or on fail-fast; workers consult it when they
        // pick a queued job up, since queued jobs cannot be retracted.
        let abort = Arc::new(AtomicBool::new(false));

        let pool_size = self.options.jobs.max(1);
        let workers: Vec<_> = (0..pool_size)
            .map(|n| {
                self.spawn_worker(
                    n,
                    Arc::clone(&job_rx),
                    result_tx.clone(),
                    Arc::clone(&abort),
                )
            })
            .collect();
        drop(result_tx);

        let mut results: HashMap<String, ExecutionResult> = HashMap::new();
        let mut any_failed = false;
        let mut cancelled = false;
        let total_layers = self.plan.layers().len();

        for (layer_index, layer) in self.plan.layers().iter().enumerate() {
            self.emit(RunEvent::LayerStarted {
                index: layer_index,
                total: total_layers,
            });
            debug!("layer {}/{}: {:?}", layer_index + 1, total_layers, layer);

            let mut in_flight = 0usize;
            for id in layer {
                self.observe_cancel(&mut cancelled, &abort);

                if cancelled || (self.options.fail_fast && any_failed) {
                    self.record_aborted(&mut results, id);
                    continue;
                }

                if !self.deps_satisfied(id, &results) {
                    self.record_aborted(&mut results, id);
                    continue;
                }

                // get() cannot miss: plan ids come from this registry
                let Some(component) = self.registry.get(id) else {
                    warn!("plan references unknown component '{id}'");
                    self.record_aborted(&mut results, id);
                    continue;
                };
                if job_tx
                    .send(Job {
                        component: component.clone(),
                    })
                    .is_ok()
                {
                    in_flight += 1;
                } else {
                    // Pool is gone; nothing can run anymore
                    self.record_aborted(&mut results, id);
                }
            }

            // Barrier: every dispatched component must reach a terminal
            // state before the next layer may start. Polling instead of a
            // blocking recv keeps cancellation observable mid-layer.
            while in_flight > 0 {
                match result_rx.recv_timeout(Duration::from_millis(100)) {
                    Ok((id, result)) => {
                        if result.status == ExecutionStatus::Failed {
                            any_failed = true;
                            if self.options.fail_fast {
                                abort.store(true, Ordering::SeqCst);
                            }
                        }
                        results.insert(id, result);
                        in_flight -= 1;
                    }
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => {
                        warn!("worker pool disconnected mid-layer");
                        break;
                    }
                }
                self.observe_cancel(&mut cancelled, &abort);
            }
        }

        drop(job_tx);
        for worker in workers {
            let _ = worker.join();
        }

        if cancelled {
            self.emit(RunEvent::Cancelled);
            info!("run cancelled; report still covers the full closure");
        }

        let results: Vec<(String, ExecutionResult)> = results.into_iter().collect();
        RunReport::new(&self.registry, results, cancelled)
    }

    /// Transition cancel-flag observation into abort + child interruption,
    /// exactly once.
    fn observe_cancel(&self, cancelled: &mut bool, abort: &Arc<AtomicBool>) {
        if !*cancelled && self.cancel.load(Ordering::SeqCst) {
            *cancelled = true;
            abort.store(true, Ordering::SeqCst);
            info!("cancellation requested, stopping dispatch");
            if let Ok(mut registry) = ChildRegistry::global().lock() {
                registry.interrupt_all(self.options.grace_period);
            }
        }
    }

    /// A component may run only once every dependency reached
    /// Succeeded or Skipped.
    fn deps_satisfied(&self, id: &str, results: &HashMap<String, ExecutionResult>) -> bool {
        let Some(component) = self.registry.get(id) else {
            return false;
        };
        component.depends_on.iter().all(|dep| {
            results
                .get(dep)
                .is_some_and(|result| result.status.is_satisfied())
        })
    }

    fn record_aborted(&self, results: &mut HashMap<String, ExecutionResult>, id: &str) {
        results.insert(
            id.to_string(),
            ExecutionResult::new(ExecutionStatus::Aborted),
        );
        self.emit(RunEvent::ComponentFinished {
            id: id.to_string(),
            status: ExecutionStatus::Aborted,
        });
    }

    fn emit(&self, event: RunEvent) {
        // Receiver may be gone (headless printer exited); that never stalls
        // the run.
        let _ = self.events.send(event);
    }

    fn spawn_worker(
        &self,
        n: usize,
        jobs: Arc<Mutex<Receiver<Job>>>,
        results: Sender<(String, ExecutionResult)>,
        abort: Arc<AtomicBool>,
    ) -> thread::JoinHandle<()> {
        let events = self.events.clone();
        let cancel = Arc::clone(&self.cancel);
        let force = self.options.force;
        let root = self.options.root.clone();

        thread::Builder::new()
            .name(format!("install-worker-{n}"))
            .spawn(move || {
                loop {
                    let job = {
                        let Ok(guard) = jobs.lock() else { break };
                        guard.recv()
                    };
                    let Ok(Job { component }) = job else { break };

                    // Queued jobs cannot be retracted; honor fail-fast and
                    // cancellation here instead.
                    if abort.load(Ordering::SeqCst) || cancel.load(Ordering::SeqCst) {
                        let _ = events.send(RunEvent::ComponentFinished {
                            id: component.id.clone(),
                            status: ExecutionStatus::Aborted,
                        });
                        let _ = results.send((
                            component.id,
                            ExecutionResult::new(ExecutionStatus::Aborted),
                        ));
                        continue;
                    }

                    let _ = events.send(RunEvent::ComponentStarted {
                        id: component.id.clone(),
                    });

                    let result = execute_component(&component, force, &root, |line| {
                        let _ = events.send(RunEvent::ComponentOutput {
                            id: component.id.clone(),
                            line: line.to_string(),
                        });
                    });

                    let _ = events.send(RunEvent::ComponentFinished {
                        id: component.id.clone(),
                        status: result.status,
                    });
                    let _ = results.send((component.id, result));
                }
            })
            .expect("failed to spawn worker thread")
    }
}

/// Run one component: probe (unless forced), then the install action.
fn execute_component(
    component: &Component,
    force: bool,
    root: &std::path::Path,
    on_line: impl FnMut(&str),
) -> ExecutionResult {
    if !force {
        if let Some(check) = &component.check_command {
            match run_probe(check, root) {
                ProbeOutcome::Satisfied => {
                    debug!("'{}' already satisfied, skipping", component.id);
                    return ExecutionResult::new(ExecutionStatus::Skipped);
                }
                ProbeOutcome::Unsatisfied => {}
                ProbeOutcome::Unavailable(msg) => {
                    // Cannot determine the component's state; running the
                    // action blind would defeat the probe contract.
                    let mut result = ExecutionResult::new(ExecutionStatus::Failed);
                    result.output = msg;
                    return result;
                }
            }
        }
    }

    let action_output = run_install_action(&component.install_action, root, on_line);
    let status = if action_output.success {
        ExecutionStatus::Succeeded
    } else {
        ExecutionStatus::Failed
    };
    ExecutionResult {
        status,
        output: action_output.output,
        exit_code: action_output.exit_code,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::DependencyGraph;
    use crate::registry::InstallAction;

    fn component(id: &str, deps: &[&str], program: &str, args: &[&str]) -> Component {
        Component {
            id: id.to_string(),
            name: id.to_string(),
            description: String::new(),
            depends_on: deps.iter().map(|d| d.to_string()).collect(),
            check_command: None,
            install_action: InstallAction {
                program: program.to_string(),
                args: args.iter().map(|a| a.to_string()).collect(),
            },
        }
    }

    fn run(registry: Registry, selection: &[&str], options: RunOptions) -> RunReport {
        let registry = Arc::new(registry);
        let graph = DependencyGraph::build(&registry).unwrap();
        let selection: Vec<String> = selection.iter().map(|s| s.to_string()).collect();
        let plan = ExecutionPlan::build(&graph, &selection).unwrap();
        drop(graph);
        let (tx, rx) = channel();
        let orchestrator = Orchestrator::new(registry, plan, options, tx);
        let report = orchestrator.run();
        drop(rx);
        report
    }

    #[test]
    fn test_dependency_failure_aborts_dependents_only() {
        let registry = Registry::from_components(vec![
            component("a", &[], "false", &[]),
            component("b", &["a"], "true", &[]),
            component("c", &[], "true", &[]),
        ])
        .unwrap();

        let report = run(registry, &["b", "c"], RunOptions::default());
        assert_eq!(
            report.result_of("a").unwrap().status,
            ExecutionStatus::Failed
        );
        assert_eq!(
            report.result_of("b").unwrap().status,
            ExecutionStatus::Aborted
        );
        assert_eq!(
            report.result_of("c").unwrap().status,
            ExecutionStatus::Succeeded
        );
        assert_eq!(report.exit_code(), 1);
    }

    #[test]
    fn test_pre_cancelled_run_aborts_everything() {
        let registry = Registry::from_components(vec![
            component("a", &[], "true", &[]),
            component("b", &["a"], "true", &[]),
        ])
        .unwrap();
        let registry = Arc::new(registry);
        let graph = DependencyGraph::build(&registry).unwrap();
        let plan = ExecutionPlan::build(&graph, &["b".to_string()]).unwrap();
        drop(graph);

        let (tx, _rx) = channel();
        let orchestrator = Orchestrator::new(registry, plan, RunOptions::default(), tx);
        orchestrator.cancel_flag().store(true, Ordering::SeqCst);
        let report = orchestrator.run();

        assert!(report.cancelled());
        for (_, result) in report.entries() {
            assert_eq!(result.status, ExecutionStatus::Aborted);
        }
    }

    #[test]
    fn test_unrunnable_check_command_fails_without_running_action() {
        let dir = tempfile::tempdir().unwrap();
        let missing_root = dir.path().join("gone");

        let mut target = component("tool", &[], "true", &[]);
        target.check_command = Some("true".to_string());

        let result = execute_component(&target, false, &missing_root, |_| {});
        assert_eq!(result.status, ExecutionStatus::Failed);
        // The message comes from the probe spawn, proving the install
        // action was never attempted
        assert!(
            result.output.contains("probe could not be executed"),
            "unexpected output: {}",
            result.output
        );
    }

    #[test]
    fn test_sequential_pool_still_completes() {
        let registry = Registry::from_components(vec![
            component("a", &[], "true", &[]),
            component("b", &[], "true", &[]),
            component("c", &["a", "b"], "true", &[]),
        ])
        .unwrap();
        let options = RunOptions {
            jobs: 1,
            ..RunOptions::default()
        };
        let report = run(registry, &["c"], options);
        assert!(report.succeeded());
        assert_eq!(report.entries().len(), 3);
    }
}
