//! Dependency graph over a component registry.
//!
//! Built once from a validated [`Registry`]; cycle detection runs at
//! construction time rather than per-query since the graph is immutable.
//! A cyclic registry is a fatal configuration error and must be rejected
//! before the interactive selector is even shown.

use std::collections::HashSet;

use crate::error::{InstallerError, Result};
use crate::registry::Registry;

/// Directed dependency graph, indexed by registry declaration order.
///
/// `deps[i]` holds the indices component `i` depends on; `dependents[i]`
/// holds the reverse edges.
#[derive(Debug)]
pub struct DependencyGraph<'a> {
    registry: &'a Registry,
    deps: Vec<Vec<usize>>,
    dependents: Vec<Vec<usize>>,
}

impl<'a> DependencyGraph<'a> {
    /// Build the graph and verify it is acyclic.
    ///
    /// Returns [`InstallerError::CyclicDependency`] naming a concrete cycle
    /// path if one exists.
    pub fn build(registry: &'a Registry) -> Result<Self> {
        let n = registry.len();
        let mut deps: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];

        for (i, component) in registry.components().iter().enumerate() {
            for dep in &component.depends_on {
                // Validated at load time; a miss here would be a registry bug.
                let dep_idx = registry
                    .index_of(dep)
                    .ok_or_else(|| InstallerError::state(format!("unvalidated dependency '{dep}'")))?;
                deps[i].push(dep_idx);
                dependents[dep_idx].push(i);
            }
        }

        let graph = Self {
            registry,
            deps,
            dependents,
        };

        if let Some(cycle) = graph.find_cycle() {
            return Err(InstallerError::CyclicDependency { cycle });
        }

        Ok(graph)
    }

    /// The registry this graph was built from
    pub fn registry(&self) -> &Registry {
        self.registry
    }

    /// Dependency indices of component `i`
    pub fn deps_of(&self, i: usize) -> &[usize] {
        &self.deps[i]
    }

    /// Reverse edges: indices of components depending on `i`
    pub fn dependents_of(&self, i: usize) -> &[usize] {
        &self.dependents[i]
    }

    /// Compute the dependency closure of a selection, inclusive of the
    /// selection itself, as a set of registry indices.
    ///
    /// Ids not present in the registry yield [`InstallerError::UnknownComponent`].
    pub fn closure(&self, selected: &[String]) -> Result<HashSet<usize>> {
        let mut closure = HashSet::new();
        let mut stack = Vec::new();

        for id in selected {
            let idx = self
                .registry
                .index_of(id)
                .ok_or_else(|| InstallerError::UnknownComponent(id.clone()))?;
            if closure.insert(idx) {
                stack.push(idx);
            }
        }

        while let Some(idx) = stack.pop() {
            for &dep in &self.deps[idx] {
                if closure.insert(dep) {
                    stack.push(dep);
                }
            }
        }

        Ok(closure)
    }

    /// Closure of a selection by registry index, already in declaration order.
    pub fn closure_indices(&self, selected: &[String]) -> Result<Vec<usize>> {
        let closure = self.closure(selected)?;
        let mut indices: Vec<usize> = closure.into_iter().collect();
        indices.sort_unstable();
        Ok(indices)
    }

    /// Detect a cycle using Kahn's algorithm; on detection, walk dependency
    /// edges among the unresolved nodes to extract a concrete cycle path.
    fn find_cycle(&self) -> Option<Vec<String>> {
        let n = self.registry.len();
        let mut in_degree: Vec<usize> = self.deps.iter().map(Vec::len).collect();

        let mut queue: Vec<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
        let mut processed = 0usize;

        while let Some(idx) = queue.pop() {
            processed += 1;
            for &dependent in &self.dependents[idx] {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    queue.push(dependent);
                }
            }
        }

        if processed == n {
            return None;
        }

        // Every remaining node has at least one unresolved dependency, so
        // following dep edges among them must revisit a node.
        let remaining: HashSet<usize> = (0..n).filter(|&i| in_degree[i] > 0).collect();
        let start = *remaining.iter().min()?;

        let mut path: Vec<usize> = Vec::new();
        let mut seen = HashSet::new();
        let mut current = start;
        loop {
            if !seen.insert(current) {
                // Trim the lead-in so the path starts at the repeated node.
                let pos = path.iter().position(|&i| i == current)?;
                let mut cycle: Vec<String> = path[pos..]
                    .iter()
                    .map(|&i| self.registry.components()[i].id.clone())
                    .collect();
                cycle.push(self.registry.components()[current].id.clone());
                return Some(cycle);
            }
            path.push(current);
            current = *self.deps[current].iter().find(|d| remaining.contains(d))?;
        }
    }
}
