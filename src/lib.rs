//! compinstall library
//!
//! Core functionality for the dependency-aware component installer: registry
//! loading and validation, dependency graph and layered planning, the
//! parallel orchestrator, and the interactive selector UI.

pub mod app;
pub mod cli;
pub mod error;
pub mod graph;
pub mod input;
pub mod orchestrator;
pub mod plan;
pub mod process_guard;
pub mod registry;
pub mod report;
pub mod runner;
pub mod scrolling;
pub mod theme;
pub mod ui;

// Re-export main types for convenience
pub use error::{InstallerError, Result};
pub use graph::DependencyGraph;
pub use orchestrator::{Orchestrator, RunEvent, RunOptions, DEFAULT_JOBS};
pub use plan::ExecutionPlan;
pub use process_guard::{ChildRegistry, CommandProcessGroup, ProcessGuard};
pub use registry::{Component, InstallAction, Registry};
pub use report::{ExecutionResult, ExecutionStatus, RunReport};
pub use runner::{ProbeOutcome, ROOT_ENV_VAR};
pub use scrolling::ScrollState;
