//! Error handling for compinstall
//!
//! Centralized error types using thiserror. Configuration errors
//! (everything that can be wrong with a registry before any component runs)
//! get their own variants so callers can report the offending ids; execution
//! failures are never surfaced through this type, they end up as per-component
//! results in the run report.

use thiserror::Error;

/// Main error type for compinstall
#[derive(Error, Debug)]
pub enum InstallerError {
    /// IO errors (file operations, terminal, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Registry input could not be parsed or a required field is missing/empty
    #[error("Malformed registry: {0}")]
    MalformedRegistry(String),

    /// Two registry entries share the same id
    #[error("Duplicate component id: {0}")]
    DuplicateId(String),

    /// A depends_on entry references an id not present in the registry
    #[error("Component '{component}' depends on unknown id '{dependency}'")]
    UnknownDependency { component: String, dependency: String },

    /// A component lists itself in depends_on
    #[error("Component '{0}' depends on itself")]
    SelfDependency(String),

    /// The dependency graph contains a cycle
    #[error("Dependency cycle: {}", cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<String> },

    /// A selection names an id not present in the registry
    #[error("Unknown component id: {0}")]
    UnknownComponent(String),

    /// The plan builder stalled on a graph that already passed the cycle
    /// check; this indicates a bug, not a user configuration problem
    #[error("Planning error: {0}")]
    Planning(String),

    /// Terminal/UI errors
    #[error("Terminal error: {0}")]
    Terminal(String),

    /// State errors (mutex poisoning, invalid state)
    #[error("State error: {0}")]
    State(String),
}

/// Result type alias for compinstall operations
pub type Result<T> = std::result::Result<T, InstallerError>;

impl InstallerError {
    /// Create a malformed-registry error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedRegistry(msg.into())
    }

    /// Create a planning error
    pub fn planning(msg: impl Into<String>) -> Self {
        Self::Planning(msg.into())
    }

    /// Create a terminal error
    pub fn terminal(msg: impl Into<String>) -> Self {
        Self::Terminal(msg.into())
    }

    /// Create a state error
    pub fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }

    /// True for errors caught before any component runs: a broken registry
    /// or an invalid selection, as opposed to a broken run
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::MalformedRegistry(_)
                | Self::DuplicateId(_)
                | Self::UnknownDependency { .. }
                | Self::SelfDependency(_)
                | Self::CyclicDependency { .. }
                | Self::UnknownComponent(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = InstallerError::DuplicateId("neovim".to_string());
        assert_eq!(err.to_string(), "Duplicate component id: neovim");

        let err = InstallerError::CyclicDependency {
            cycle: vec!["a".to_string(), "b".to_string(), "a".to_string()],
        };
        assert_eq!(err.to_string(), "Dependency cycle: a -> b -> a");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: InstallerError = io_err.into();
        assert!(matches!(err, InstallerError::Io(_)));
    }

    #[test]
    fn test_configuration_classification() {
        assert!(InstallerError::SelfDependency("x".to_string()).is_configuration());
        assert!(InstallerError::malformed("bad json").is_configuration());
        assert!(InstallerError::UnknownComponent("x".to_string()).is_configuration());
        assert!(!InstallerError::terminal("raw mode unavailable").is_configuration());
        assert!(!InstallerError::planning("stalled").is_configuration());
    }
}
