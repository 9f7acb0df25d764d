use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::orchestrator::DEFAULT_JOBS;

/// compinstall - interactive, dependency-aware component installer
#[derive(Parser)]
#[command(name = "compinstall")]
#[command(about = "Install components and their dependencies, interactively or headless")]
#[command(version)]
pub struct Cli {
    /// Path to the component registry (default: ~/.config/compinstall/components.json)
    #[arg(short, long, global = true)]
    pub registry: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Install components. With ids, runs headless; without, opens the selector
    Install {
        /// Component ids to install (dependencies are pulled in automatically)
        components: Vec<String>,

        /// Run install actions even when the check command reports satisfied
        #[arg(short, long)]
        force: bool,

        /// Abort remaining components after the first failure
        #[arg(long)]
        fail_fast: bool,

        /// Number of components to install concurrently within a layer
        #[arg(short, long, default_value_t = DEFAULT_JOBS)]
        jobs: usize,
    },
    /// Validate the registry: schema, references, and dependency cycles
    Validate,
    /// List registry components with their dependencies
    List,
    /// Print the layered execution plan for a selection without running it
    Plan {
        /// Component ids to plan for (all components when omitted)
        components: Vec<String>,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        <Self as clap::Parser>::parse()
    }
}
