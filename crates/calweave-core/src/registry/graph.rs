//! Data-source dependency graph.
//!
//! An edge `B → A` in `dependencies` means "B depends on A": A is fetched
//! before B and its payload is attached to B's result. The reverse map
//! (`dependents`) is kept in step so unregistration can scrub a node in one
//! pass. Cycles are rejected when edges are set.

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

/// Forward and reverse adjacency over source ids.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DependencyGraph {
    /// `source_id → {dependency_id, ...}`
    dependencies: BTreeMap<String, BTreeSet<String>>,
    /// `dependency_id → {dependent_id, ...}`
    dependents: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, id: &str) {
        self.dependencies.entry(id.to_string()).or_default();
        self.dependents.entry(id.to_string()).or_default();
    }

    pub fn contains(&self, id: &str) -> bool {
        self.dependencies.contains_key(id)
    }

    /// Remove `id`, its forward edges, and every reverse edge naming it.
    /// Sources that depended on `id` lose that edge.
    pub fn remove_node(&mut self, id: &str) {
        if let Some(deps) = self.dependencies.remove(id) {
            for dep in deps {
                if let Some(set) = self.dependents.get_mut(&dep) {
                    set.remove(id);
                }
            }
        }
        if let Some(dependents) = self.dependents.remove(id) {
            for dependent in dependents {
                if let Some(set) = self.dependencies.get_mut(&dependent) {
                    set.remove(id);
                }
            }
        }
    }

    /// Replace the forward edges of `id`.
    ///
    /// Every node must already exist. Returns the offending cycle path (and
    /// leaves the graph untouched) if the new edges would close a cycle.
    pub fn set_dependencies(&mut self, id: &str, deps: &[String]) -> Result<(), Vec<String>> {
        let previous = self.dependencies.get(id).cloned().unwrap_or_default();
        let next: BTreeSet<String> = deps.iter().cloned().collect();

        self.replace_edges(id, &previous, &next);

        if let Some(cycle) = self.find_cycle_through(id) {
            // Roll back.
            self.replace_edges(id, &next, &previous);
            return Err(cycle);
        }
        Ok(())
    }

    fn replace_edges(&mut self, id: &str, old: &BTreeSet<String>, new: &BTreeSet<String>) {
        for dep in old.difference(new) {
            if let Some(set) = self.dependents.get_mut(dep) {
                set.remove(id);
            }
        }
        for dep in new {
            self.dependents
                .entry(dep.clone())
                .or_default()
                .insert(id.to_string());
        }
        self.dependencies.insert(id.to_string(), new.clone());
    }

    /// Direct dependencies of `id`, sorted.
    pub fn dependencies_of(&self, id: &str) -> Vec<String> {
        self.dependencies
            .get(id)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Direct dependents of `id`, sorted.
    pub fn dependents_of(&self, id: &str) -> Vec<String> {
        self.dependents
            .get(id)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// All node ids with dependencies before dependents (Kahn's algorithm,
    /// ties broken by id).
    pub fn topological_order(&self) -> Vec<String> {
        let mut in_degree: BTreeMap<&str, usize> = self
            .dependencies
            .iter()
            .map(|(id, deps)| (id.as_str(), deps.len()))
            .collect();

        let mut queue: VecDeque<&str> = in_degree
            .iter()
            .filter(|(_, &deg)| deg == 0)
            .map(|(&id, _)| id)
            .collect();

        let mut sorted = Vec::with_capacity(in_degree.len());
        while let Some(id) = queue.pop_front() {
            sorted.push(id.to_string());
            if let Some(dependents) = self.dependents.get(id) {
                for dependent in dependents {
                    if let Some(deg) = in_degree.get_mut(dependent.as_str()) {
                        *deg -= 1;
                        if *deg == 0 {
                            queue.push_back(dependent.as_str());
                        }
                    }
                }
            }
        }
        sorted
    }

    /// DFS along forward edges from `start`; returns the path if it leads
    /// back to `start`.
    fn find_cycle_through(&self, start: &str) -> Option<Vec<String>> {
        let mut visited = HashSet::new();
        let mut path = vec![start.to_string()];
        if self.dfs_back_to(start, start, &mut visited, &mut path) {
            Some(path)
        } else {
            None
        }
    }

    fn dfs_back_to(
        &self,
        node: &str,
        target: &str,
        visited: &mut HashSet<String>,
        path: &mut Vec<String>,
    ) -> bool {
        let Some(deps) = self.dependencies.get(node) else {
            return false;
        };
        for dep in deps {
            if dep == target {
                path.push(dep.clone());
                return true;
            }
            if visited.insert(dep.clone()) {
                path.push(dep.clone());
                if self.dfs_back_to(dep, target, visited, path) {
                    return true;
                }
                path.pop();
            }
        }
        false
    }
}
