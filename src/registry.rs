//! Component registry loading and validation.
//!
//! The registry is a declarative JSON file (by default
//! `~/.config/compinstall/components.json`) describing every installable
//! component: display strings, dependency ids, an optional idempotency probe
//! and the external install action. Components are immutable once loaded;
//! only their outcome is tracked separately during a run.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{InstallerError, Result};

/// External executable unit that performs a component's installation work.
///
/// Treated as a black box: the orchestrator only observes the exit status
/// and captured output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallAction {
    /// Program to execute (e.g. "bash")
    pub program: String,
    /// Arguments passed to the program
    #[serde(default)]
    pub args: Vec<String>,
}

/// A named, independently installable unit with declared dependencies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Component {
    /// Unique stable identifier, used for dependency references
    pub id: String,
    /// Display name
    pub name: String,
    /// Display description
    #[serde(default)]
    pub description: String,
    /// Ids of components that must be installed first
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Optional probe; exit status zero means the component is already
    /// satisfied and the install action is skipped
    #[serde(default)]
    pub check_command: Option<String>,
    /// The install action to run
    pub install_action: InstallAction,
}

/// On-disk registry file shape
#[derive(Debug, Deserialize)]
struct RegistryFile {
    components: Vec<Component>,
}

/// Validated, immutable collection of components in declaration order.
#[derive(Debug, Clone)]
pub struct Registry {
    components: Vec<Component>,
    index: HashMap<String, usize>,
}

impl Registry {
    /// Load and validate a registry from a JSON file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read registry from {:?}", path.as_ref()))
            .map_err(|e| InstallerError::malformed(format!("{:#}", e)))?;

        let file: RegistryFile = serde_json::from_str(&content)
            .map_err(|e| InstallerError::malformed(format!("invalid registry JSON: {e}")))?;

        Self::from_components(file.components)
    }

    /// Build a validated registry from in-memory components.
    ///
    /// Fails if a required field is empty, an id occurs twice, a component
    /// depends on itself, or a dependency references a nonexistent id.
    pub fn from_components(components: Vec<Component>) -> Result<Self> {
        let mut index = HashMap::with_capacity(components.len());

        for (i, component) in components.iter().enumerate() {
            if component.id.trim().is_empty() {
                return Err(InstallerError::malformed(format!(
                    "component #{i} has an empty id"
                )));
            }
            if component.name.trim().is_empty() {
                return Err(InstallerError::malformed(format!(
                    "component '{}' has an empty name",
                    component.id
                )));
            }
            if component.install_action.program.trim().is_empty() {
                return Err(InstallerError::malformed(format!(
                    "component '{}' has an empty install action program",
                    component.id
                )));
            }
            if index.insert(component.id.clone(), i).is_some() {
                return Err(InstallerError::DuplicateId(component.id.clone()));
            }
        }

        for component in &components {
            let mut seen = HashSet::new();
            for dep in &component.depends_on {
                if dep == &component.id {
                    return Err(InstallerError::SelfDependency(component.id.clone()));
                }
                if !index.contains_key(dep) {
                    return Err(InstallerError::UnknownDependency {
                        component: component.id.clone(),
                        dependency: dep.clone(),
                    });
                }
                if !seen.insert(dep) {
                    return Err(InstallerError::malformed(format!(
                        "component '{}' lists dependency '{}' twice",
                        component.id, dep
                    )));
                }
            }
        }

        Ok(Self { components, index })
    }

    /// Components in declaration order
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Look up a component by id
    pub fn get(&self, id: &str) -> Option<&Component> {
        self.index.get(id).map(|&i| &self.components[i])
    }

    /// Declaration-order position of an id
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Number of components
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// True when the registry has no components
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Default registry file path: `~/.config/compinstall/components.json`
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("compinstall")
            .join("components.json")
    }
}
