//! Registry loading tests against real files on disk.

use std::fs;

use compinstall::error::InstallerError;
use compinstall::graph::DependencyGraph;
use compinstall::registry::Registry;
use tempfile::TempDir;

fn write_registry(dir: &TempDir, json: &str) -> std::path::PathBuf {
    let path = dir.path().join("components.json");
    fs::write(&path, json).unwrap();
    path
}

#[test]
fn test_load_valid_registry_preserves_declaration_order() {
    let dir = TempDir::new().unwrap();
    let path = write_registry(
        &dir,
        r#"{
            "components": [
                {
                    "id": "git",
                    "name": "Git",
                    "description": "Version control",
                    "install_action": { "program": "sh", "args": ["-c", "true"] }
                },
                {
                    "id": "neovim",
                    "name": "Neovim",
                    "depends_on": ["git"],
                    "check_command": "command -v nvim",
                    "install_action": { "program": "sh", "args": ["-c", "true"] }
                }
            ]
        }"#,
    );

    let registry = Registry::load_from_file(&path).unwrap();
    assert_eq!(registry.len(), 2);
    assert_eq!(registry.index_of("git"), Some(0));
    assert_eq!(registry.index_of("neovim"), Some(1));

    let neovim = registry.get("neovim").unwrap();
    assert_eq!(neovim.name, "Neovim");
    assert_eq!(neovim.depends_on, vec!["git".to_string()]);
    assert_eq!(neovim.check_command.as_deref(), Some("command -v nvim"));
}

#[test]
fn test_optional_fields_default() {
    let dir = TempDir::new().unwrap();
    let path = write_registry(
        &dir,
        r#"{
            "components": [
                {
                    "id": "base",
                    "name": "Base",
                    "install_action": { "program": "true" }
                }
            ]
        }"#,
    );

    let registry = Registry::load_from_file(&path).unwrap();
    let base = registry.get("base").unwrap();
    assert!(base.description.is_empty());
    assert!(base.depends_on.is_empty());
    assert!(base.check_command.is_none());
    assert!(base.install_action.args.is_empty());
}

#[test]
fn test_missing_file_is_malformed() {
    let dir = TempDir::new().unwrap();
    let err = Registry::load_from_file(dir.path().join("nope.json")).unwrap_err();
    assert!(matches!(err, InstallerError::MalformedRegistry(_)));
    assert!(err.is_configuration());
}

#[test]
fn test_invalid_json_is_malformed() {
    let dir = TempDir::new().unwrap();
    let path = write_registry(&dir, "{ not json ");
    let err = Registry::load_from_file(&path).unwrap_err();
    assert!(matches!(err, InstallerError::MalformedRegistry(_)));
}

#[test]
fn test_duplicate_id_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_registry(
        &dir,
        r#"{
            "components": [
                { "id": "a", "name": "A", "install_action": { "program": "true" } },
                { "id": "a", "name": "A again", "install_action": { "program": "true" } }
            ]
        }"#,
    );
    let err = Registry::load_from_file(&path).unwrap_err();
    assert!(matches!(err, InstallerError::DuplicateId(id) if id == "a"));
}

#[test]
fn test_unknown_dependency_names_both_sides() {
    let dir = TempDir::new().unwrap();
    let path = write_registry(
        &dir,
        r#"{
            "components": [
                {
                    "id": "a",
                    "name": "A",
                    "depends_on": ["ghost"],
                    "install_action": { "program": "true" }
                }
            ]
        }"#,
    );
    let err = Registry::load_from_file(&path).unwrap_err();
    match err {
        InstallerError::UnknownDependency {
            component,
            dependency,
        } => {
            assert_eq!(component, "a");
            assert_eq!(dependency, "ghost");
        }
        other => panic!("expected UnknownDependency, got {other:?}"),
    }
}

#[test]
fn test_self_dependency_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_registry(
        &dir,
        r#"{
            "components": [
                {
                    "id": "a",
                    "name": "A",
                    "depends_on": ["a"],
                    "install_action": { "program": "true" }
                }
            ]
        }"#,
    );
    let err = Registry::load_from_file(&path).unwrap_err();
    assert!(matches!(err, InstallerError::SelfDependency(id) if id == "a"));
}

#[test]
fn test_cycle_is_surfaced_at_graph_construction() {
    let dir = TempDir::new().unwrap();
    let path = write_registry(
        &dir,
        r#"{
            "components": [
                {
                    "id": "a", "name": "A", "depends_on": ["b"],
                    "install_action": { "program": "true" }
                },
                {
                    "id": "b", "name": "B", "depends_on": ["c"],
                    "install_action": { "program": "true" }
                },
                {
                    "id": "c", "name": "C", "depends_on": ["a"],
                    "install_action": { "program": "true" }
                }
            ]
        }"#,
    );

    // Mutual references load fine; the cycle is a graph-level error
    let registry = Registry::load_from_file(&path).unwrap();
    let err = DependencyGraph::build(&registry).unwrap_err();
    match err {
        InstallerError::CyclicDependency { ref cycle } => {
            assert!(cycle.len() >= 3);
            assert_eq!(cycle.first(), cycle.last());
        }
        ref other => panic!("expected CyclicDependency, got {other:?}"),
    }
    assert!(err.is_configuration());
}
