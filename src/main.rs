//! compinstall - main entry point
//!
//! Dispatches between the interactive selector and the headless subcommands.
//! Registry and graph validation happens here, before any UI comes up, so
//! configuration problems surface as plain errors with exit code 2.

use std::io::stdout;
use std::process::ExitCode;
use std::sync::atomic::Ordering;
use std::sync::mpsc::channel;
use std::sync::Arc;
use std::thread;

use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use compinstall::app::App;
use compinstall::cli::{Cli, Commands};
use compinstall::error::{InstallerError, Result};
use compinstall::graph::DependencyGraph;
use compinstall::orchestrator::{Orchestrator, RunEvent, RunOptions};
use compinstall::plan::ExecutionPlan;
use compinstall::process_guard::{self, ProcessGuard};
use compinstall::registry::Registry;
use compinstall::report::{ExecutionStatus, RunReport};

/// Exit code for registry/selection configuration errors
const CONFIG_EXIT: u8 = 2;

/// Logging goes to stderr so report output on stdout stays clean
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    init_tracing();

    // Ensure child process groups are cleaned up on SIGTERM/SIGHUP
    if let Err(e) = process_guard::init_signal_handlers() {
        warn!("failed to initialize signal handlers: {}", e);
    }
    // Held for the lifetime of the process so any children still registered
    // on a panic or early return are terminated on drop
    let _process_guard = ProcessGuard::new();

    let cli = Cli::parse_args();
    let registry_path = cli
        .registry
        .clone()
        .unwrap_or_else(Registry::default_path);

    debug!("loading registry from {}", registry_path.display());
    let registry = match Registry::load_from_file(&registry_path) {
        Ok(registry) => Arc::new(registry),
        Err(e) => return config_failure(&e),
    };
    // Cycle detection runs here, before any selector or plan
    let graph = match DependencyGraph::build(&registry) {
        Ok(graph) => graph,
        Err(e) => return config_failure(&e),
    };

    match cli.command {
        Some(Commands::Validate) => {
            println!("✓ Registry is valid: {} component(s)", registry.len());
            ExitCode::SUCCESS
        }
        Some(Commands::List) => {
            list_components(&registry);
            ExitCode::SUCCESS
        }
        Some(Commands::Plan { components }) => {
            let selection = resolve_selection(&registry, components);
            match ExecutionPlan::build(&graph, &selection) {
                Ok(plan) => {
                    print_plan(&plan);
                    ExitCode::SUCCESS
                }
                Err(e) => config_failure(&e),
            }
        }
        Some(Commands::Install {
            components,
            force,
            fail_fast,
            jobs,
        }) => {
            let options = RunOptions {
                force,
                fail_fast,
                jobs: jobs.max(1),
                ..RunOptions::default()
            };
            if components.is_empty() {
                run_interactive(&registry, graph, options, &[])
            } else {
                run_headless(&registry, &graph, components, options)
            }
        }
        None => run_interactive(&registry, graph, RunOptions::default(), &[]),
    }
}

fn config_failure(e: &InstallerError) -> ExitCode {
    eprintln!("✗ {e}");
    ExitCode::from(CONFIG_EXIT)
}

/// Empty selection means the whole registry
fn resolve_selection(registry: &Registry, components: Vec<String>) -> Vec<String> {
    if components.is_empty() {
        registry.components().iter().map(|c| c.id.clone()).collect()
    } else {
        components
    }
}

fn list_components(registry: &Registry) {
    for component in registry.components() {
        let deps = if component.depends_on.is_empty() {
            String::new()
        } else {
            format!("  (depends on: {})", component.depends_on.join(", "))
        };
        println!("{:<20} {}{}", component.id, component.name, deps);
    }
}

fn print_plan(plan: &ExecutionPlan) {
    for (i, layer) in plan.layers().iter().enumerate() {
        println!("Layer {}: {}", i + 1, layer.join(", "));
    }
    println!(
        "{} component(s) in {} layer(s)",
        plan.component_count(),
        plan.layers().len()
    );
}

/// Headless install: plan, run, and print events as plain lines.
fn run_headless(
    registry: &Arc<Registry>,
    graph: &DependencyGraph<'_>,
    components: Vec<String>,
    options: RunOptions,
) -> ExitCode {
    let plan = match ExecutionPlan::build(graph, &components) {
        Ok(plan) => plan,
        Err(e) => return config_failure(&e),
    };
    info!(
        "installing {} component(s) in {} layer(s)",
        plan.component_count(),
        plan.layers().len()
    );

    let (event_tx, event_rx) = channel();
    let orchestrator =
        Orchestrator::new(Arc::clone(registry), plan, options, event_tx);

    // Ctrl+C requests cancellation; the orchestrator still produces a report
    let cancel = orchestrator.cancel_flag();
    if let Err(e) = ctrlc::set_handler(move || {
        cancel.store(true, Ordering::SeqCst);
    }) {
        warn!("failed to install Ctrl+C handler: {}", e);
    }

    let printer = thread::spawn(move || {
        for event in event_rx {
            match event {
                RunEvent::LayerStarted { index, total } => {
                    println!("==> Layer {}/{}", index + 1, total);
                }
                RunEvent::ComponentStarted { id } => println!("  -> {id}"),
                RunEvent::ComponentOutput { id, line } => println!("  {id}: {line}"),
                RunEvent::ComponentFinished { id, status } => {
                    let glyph = match status {
                        ExecutionStatus::Succeeded | ExecutionStatus::Skipped => "✓",
                        _ => "✗",
                    };
                    println!("  {glyph} {id}: {status}");
                }
                RunEvent::Cancelled => {
                    eprintln!("Interrupted, aborting remaining components");
                }
            }
        }
    });

    let report = orchestrator.run();
    // The event sender lives inside the orchestrator, so the printer drains
    // and exits once the run is over
    let _ = printer.join();

    println!();
    print!("{}", report.render(registry));
    exit_from_report(&report)
}

/// Interactive install: raw-mode terminal, selector, live run screen.
fn run_interactive(
    registry: &Arc<Registry>,
    graph: DependencyGraph<'_>,
    options: RunOptions,
    defaults: &[String],
) -> ExitCode {
    let report = match run_tui(registry, graph, options, defaults) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("✗ {e}");
            return ExitCode::FAILURE;
        }
    };

    match report {
        Some(report) => {
            // Repeat the report on the normal screen after teardown
            print!("{}", report.render(registry));
            exit_from_report(&report)
        }
        None => ExitCode::SUCCESS,
    }
}

fn run_tui(
    registry: &Arc<Registry>,
    graph: DependencyGraph<'_>,
    options: RunOptions,
    defaults: &[String],
) -> Result<Option<RunReport>> {
    enable_raw_mode()
        .map_err(|e| InstallerError::terminal(format!("Failed to enable raw mode: {e}")))?;
    crossterm::execute!(stdout(), crossterm::terminal::EnterAlternateScreen)
        .map_err(|e| InstallerError::terminal(format!("Failed to enter alternate screen: {e}")))?;

    let backend = CrosstermBackend::new(stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| InstallerError::terminal(format!("Failed to create terminal: {e}")))?;

    let app = App::new(registry, graph, options, defaults);
    let result = app.run(&mut terminal);

    // Always restore the terminal, even when the app errored
    let _ = disable_raw_mode();
    let _ = crossterm::execute!(stdout(), crossterm::terminal::LeaveAlternateScreen);

    result
}

fn exit_from_report(report: &RunReport) -> ExitCode {
    ExitCode::from(report.exit_code() as u8)
}
