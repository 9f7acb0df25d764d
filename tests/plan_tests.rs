//! Planning tests over realistic registries.

use compinstall::error::InstallerError;
use compinstall::graph::DependencyGraph;
use compinstall::plan::ExecutionPlan;
use compinstall::registry::{Component, InstallAction, Registry};

fn component(id: &str, deps: &[&str]) -> Component {
    Component {
        id: id.to_string(),
        name: id.to_string(),
        description: String::new(),
        depends_on: deps.iter().map(|d| d.to_string()).collect(),
        check_command: None,
        install_action: InstallAction {
            program: "true".to_string(),
            args: vec![],
        },
    }
}

/// A registry shaped like a real dotfiles setup: shared tooling feeding
/// editor and shell configuration.
fn dotfiles_registry() -> Registry {
    Registry::from_components(vec![
        component("git", &[]),
        component("curl", &[]),
        component("python", &[]),
        component("dependencies", &["git", "curl"]),
        component("neovim", &["dependencies", "python"]),
        component("zsh", &["dependencies"]),
        component("fonts", &[]),
    ])
    .unwrap()
}

fn plan(registry: &Registry, selection: &[&str]) -> ExecutionPlan {
    let graph = DependencyGraph::build(registry).unwrap();
    let selection: Vec<String> = selection.iter().map(|s| s.to_string()).collect();
    ExecutionPlan::build(&graph, &selection).unwrap()
}

#[test]
fn test_single_selection_pulls_full_closure_in_layers() {
    let registry = dotfiles_registry();
    let plan = plan(&registry, &["neovim"]);

    assert_eq!(
        plan.layers(),
        &[
            vec![
                "git".to_string(),
                "curl".to_string(),
                "python".to_string()
            ],
            vec!["dependencies".to_string()],
            vec!["neovim".to_string()],
        ]
    );
}

#[test]
fn test_unselected_components_stay_out_of_the_plan() {
    let registry = dotfiles_registry();
    let plan = plan(&registry, &["zsh"]);

    // fonts, python and neovim are not in zsh's closure
    assert_eq!(plan.component_count(), 4);
    assert!(plan.component_ids().all(|id| id != "fonts"));
    assert!(plan.component_ids().all(|id| id != "neovim"));
    assert!(plan.component_ids().all(|id| id != "python"));
}

#[test]
fn test_shared_dependency_appears_once() {
    let registry = dotfiles_registry();
    let plan = plan(&registry, &["neovim", "zsh"]);

    let deps_count = plan
        .component_ids()
        .filter(|id| id.as_str() == "dependencies")
        .count();
    assert_eq!(deps_count, 1);
    assert_eq!(plan.component_count(), 6);
}

#[test]
fn test_layers_follow_registry_declaration_order() {
    let registry = dotfiles_registry();
    let plan = plan(&registry, &["fonts", "python", "git"]);

    // One layer, ordered as declared: git before python before fonts
    assert_eq!(
        plan.layers(),
        &[vec![
            "git".to_string(),
            "python".to_string(),
            "fonts".to_string()
        ]]
    );
}

#[test]
fn test_plan_is_deterministic() {
    let registry = dotfiles_registry();
    let first = plan(&registry, &["neovim", "zsh", "fonts"]);
    let second = plan(&registry, &["neovim", "zsh", "fonts"]);
    assert_eq!(first, second);
}

#[test]
fn test_unknown_selection_id_is_rejected() {
    let registry = dotfiles_registry();
    let graph = DependencyGraph::build(&registry).unwrap();
    let err = ExecutionPlan::build(&graph, &["emacs".to_string()]).unwrap_err();
    assert!(matches!(err, InstallerError::UnknownComponent(ref id) if id == "emacs"));
    assert!(err.is_configuration());
}

#[test]
fn test_every_dependency_lands_in_a_strictly_earlier_layer() {
    let registry = dotfiles_registry();
    let plan = plan(&registry, &["neovim", "zsh", "fonts"]);

    let layer_of = |id: &str| {
        plan.layers()
            .iter()
            .position(|layer| layer.iter().any(|l| l == id))
            .unwrap()
    };
    for id in plan.component_ids() {
        let component = registry.get(id).unwrap();
        for dep in &component.depends_on {
            assert!(
                layer_of(dep) < layer_of(id),
                "{dep} must be layered before {id}"
            );
        }
    }
}
