//! Execution plan construction.
//!
//! A plan is an ordered sequence of scheduling layers produced by a layered
//! Kahn topological sort restricted to the selection closure. All
//! dependencies of a component live in strictly earlier layers, so siblings
//! within a layer are mutually independent and safe to run concurrently.
//! Within a layer, ids follow registry declaration order, never hash order,
//! so repeated runs with the same registry and selection produce the same
//! plan.

use std::collections::HashSet;

use crate::error::{InstallerError, Result};
use crate::graph::DependencyGraph;

/// Ordered scheduling layers over a selection closure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPlan {
    layers: Vec<Vec<String>>,
}

impl ExecutionPlan {
    /// Build the plan for a selection.
    ///
    /// Computes the closure, then repeatedly extracts the set of components
    /// whose dependencies are all placed in prior layers. The graph is
    /// already verified acyclic, so the stall branch is a defensive
    /// invariant check, not expected user-facing behavior.
    pub fn build(graph: &DependencyGraph<'_>, selection: &[String]) -> Result<Self> {
        let closure = graph.closure(selection)?;
        let mut remaining: Vec<usize> = closure.iter().copied().collect();
        remaining.sort_unstable();

        let mut placed: HashSet<usize> = HashSet::with_capacity(closure.len());
        let mut layers = Vec::new();

        while !remaining.is_empty() {
            let (ready, blocked): (Vec<usize>, Vec<usize>) = remaining.iter().partition(|&&i| {
                graph
                    .deps_of(i)
                    .iter()
                    // Deps outside the closure cannot exist: closure is
                    // dependency-complete by construction.
                    .all(|dep| placed.contains(dep))
            });

            if ready.is_empty() {
                return Err(InstallerError::planning(format!(
                    "no schedulable component among {} remaining; graph cycle check missed something",
                    blocked.len()
                )));
            }

            placed.extend(&ready);
            // `remaining` is kept sorted, so each layer comes out in
            // registry declaration order.
            layers.push(
                ready
                    .iter()
                    .map(|&i| graph.registry().components()[i].id.clone())
                    .collect(),
            );
            remaining = blocked;
        }

        Ok(Self { layers })
    }

    /// Scheduling layers in execution order
    pub fn layers(&self) -> &[Vec<String>] {
        &self.layers
    }

    /// Every component id in the plan, layer by layer
    pub fn component_ids(&self) -> impl Iterator<Item = &String> {
        self.layers.iter().flatten()
    }

    /// Total number of components across all layers
    pub fn component_count(&self) -> usize {
        self.layers.iter().map(Vec::len).sum()
    }

    /// True when the plan schedules nothing
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Component, InstallAction, Registry};

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

    fn plan_for(components: Vec<Component>, selection: &[&str]) -> ExecutionPlan {
        let registry = Registry::from_components(components).unwrap();
        let graph = DependencyGraph::build(&registry).unwrap();
        let selection: Vec<String> = selection.iter().map(|s| s.to_string()).collect();
        ExecutionPlan::build(&graph, &selection).unwrap()
    }

    #[test]
    fn dependency_lands_in_earlier_layer() {
        let plan = plan_for(
            vec![component("dependencies", &[]), component("neovim", &["dependencies"])],
            &["neovim"],
        );
        assert_eq!(
            plan.layers(),
            &[vec!["dependencies".to_string()], vec!["neovim".to_string()]]
        );
    }

    #[test]
    fn diamond_produces_three_layers() {
        let plan = plan_for(
            vec![
                component("base", &[]),
                component("left", &["base"]),
                component("right", &["base"]),
                component("top", &["left", "right"]),
            ],
            &["top"],
        );
        assert_eq!(
            plan.layers(),
            &[
                vec!["base".to_string()],
                vec!["left".to_string(), "right".to_string()],
                vec!["top".to_string()],
            ]
        );
    }

    #[test]
    fn layer_order_follows_registry_declaration_order() {
        let plan = plan_for(
            vec![
                component("zsh", &[]),
                component("tmux", &[]),
                component("fonts", &[]),
            ],
            &["fonts", "zsh", "tmux"],
        );
        assert_eq!(
            plan.layers(),
            &[vec![
                "zsh".to_string(),
                "tmux".to_string(),
                "fonts".to_string()
            ]]
        );
    }

    #[test]
    fn selection_outside_closure_is_excluded() {
        let plan = plan_for(
            vec![component("a", &[]), component("b", &["a"]), component("c", &[])],
            &["b"],
        );
        assert_eq!(plan.component_count(), 2);
        assert!(plan.component_ids().all(|id| id != "c"));
    }

    #[test]
    fn empty_selection_gives_empty_plan() {
        let plan = plan_for(vec![component("a", &[])], &[]);
        assert!(plan.is_empty());
        assert_eq!(plan.component_count(), 0);
    }
}
