// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Multi-root directed graph keyed by node name.
//!
//! Nodes keep insertion order so traversals are deterministic. Every
//! traversal uses an explicit stack; deep dependency chains cannot
//! overflow the call stack.

use indexmap::{IndexMap, IndexSet};
use thiserror::Error;

/// Errors from graph operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DagError {
    #[error("a cycle dependency encountered in the tree: {0}")]
    Cycle(String),
    #[error("self dependency is not allowed: {0}")]
    SelfLoop(String),
    #[error("node not found: {0}")]
    NodeNotFound(String),
}

#[derive(Debug, Clone)]
struct Node<T> {
    data: T,
    children: IndexSet<String>,
    parents: IndexSet<String>,
}

/// A directed graph that may have many roots.
#[derive(Debug, Clone)]
pub struct MultiRootDag<T> {
    nodes: IndexMap<String, Node<T>>,
}

impl<T> Default for MultiRootDag<T> {
    fn default() -> Self {
        Self {
            nodes: IndexMap::new(),
        }
    }
}

impl<T> MultiRootDag<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node, replacing the data of an existing node with the same name.
    /// Edges of a replaced node are kept.
    pub fn add_node(&mut self, name: impl Into<String>, data: T) {
        let name = name.into();
        match self.nodes.get_mut(&name) {
            Some(node) => node.data = data,
            None => {
                self.nodes.insert(
                    name,
                    Node {
                        data,
                        children: IndexSet::new(),
                        parents: IndexSet::new(),
                    },
                );
            }
        }
    }

    /// Insert a node unless one with this name exists. Returns true when inserted.
    pub fn add_node_if_not_exist(&mut self, name: impl Into<String>, data: T) -> bool {
        let name = name.into();
        if self.nodes.contains_key(&name) {
            return false;
        }
        self.add_node(name, data);
        true
    }

    pub fn get_node_by_name(&self, name: &str) -> Option<&T> {
        self.nodes.get(name).map(|n| &n.data)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node names with their data, in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = (&str, &T)> {
        self.nodes.iter().map(|(k, n)| (k.as_str(), &n.data))
    }

    /// Every `(from, to)` edge.
    pub fn edges(&self) -> Vec<(String, String)> {
        self.nodes
            .iter()
            .flat_map(|(from, n)| n.children.iter().map(move |to| (from.clone(), to.clone())))
            .collect()
    }

    pub fn children(&self, name: &str) -> Vec<&str> {
        self.nodes
            .get(name)
            .map(|n| n.children.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn parents(&self, name: &str) -> Vec<&str> {
        self.nodes
            .get(name)
            .map(|n| n.parents.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Nodes without incoming edges.
    pub fn root_nodes(&self) -> Vec<&str> {
        self.nodes
            .iter()
            .filter(|(_, n)| n.parents.is_empty())
            .map(|(k, _)| k.as_str())
            .collect()
    }

    /// Add the edge `from -> to`. Duplicate edges are ignored.
    pub fn connect(&mut self, from: &str, to: &str) -> Result<(), DagError> {
        if from == to {
            return Err(DagError::SelfLoop(from.to_string()));
        }
        if !self.nodes.contains_key(to) {
            return Err(DagError::NodeNotFound(to.to_string()));
        }
        let parent = self
            .nodes
            .get_mut(from)
            .ok_or_else(|| DagError::NodeNotFound(from.to_string()))?;
        parent.children.insert(to.to_string());
        if let Some(child) = self.nodes.get_mut(to) {
            child.parents.insert(from.to_string());
        }
        Ok(())
    }

    /// Remove the edge `from -> to` if present.
    pub fn disconnect(&mut self, from: &str, to: &str) {
        if let Some(parent) = self.nodes.get_mut(from) {
            parent.children.shift_remove(to);
        }
        if let Some(child) = self.nodes.get_mut(to) {
            child.parents.shift_remove(from);
        }
    }

    /// Detect a back-edge. The error names the node that closes the cycle.
    pub fn is_cyclic(&self) -> Result<(), DagError> {
        let mut visited: IndexSet<&str> = IndexSet::new();
        for start in self.nodes.keys() {
            if visited.contains(start.as_str()) {
                continue;
            }
            // (node, next child index to explore)
            let mut stack: Vec<(&str, usize)> = vec![(start.as_str(), 0)];
            let mut on_path: IndexSet<&str> = IndexSet::new();
            on_path.insert(start.as_str());
            visited.insert(start.as_str());

            while let Some((name, idx)) = stack.last_mut() {
                let node = match self.nodes.get(*name) {
                    Some(n) => n,
                    None => {
                        stack.pop();
                        continue;
                    }
                };
                match node.children.get_index(*idx) {
                    Some(child) => {
                        *idx += 1;
                        if on_path.contains(child.as_str()) {
                            return Err(DagError::Cycle(child.clone()));
                        }
                        if visited.insert(child.as_str()) {
                            on_path.insert(child.as_str());
                            stack.push((child.as_str(), 0));
                        }
                    }
                    None => {
                        let done = *name;
                        on_path.shift_remove(done);
                        stack.pop();
                    }
                }
            }
        }
        Ok(())
    }

    /// Iterative top-down depth-first walk from `root`.
    ///
    /// `visit` sees each reachable node once with its depth from `root`.
    pub fn dfs<F>(&self, root: &str, mut visit: F) -> Result<(), DagError>
    where
        F: FnMut(&str, &T, usize),
    {
        if !self.nodes.contains_key(root) {
            return Err(DagError::NodeNotFound(root.to_string()));
        }
        let mut seen: IndexSet<&str> = IndexSet::new();
        let mut stack: Vec<(&str, usize)> = vec![(root, 0)];
        while let Some((name, depth)) = stack.pop() {
            if !seen.insert(name) {
                continue;
            }
            let Some(node) = self.nodes.get(name) else {
                continue;
            };
            visit(name, &node.data, depth);
            // reversed so the first child is explored first
            for child in node.children.iter().rev() {
                if !seen.contains(child.as_str()) {
                    stack.push((child.as_str(), depth + 1));
                }
            }
        }
        Ok(())
    }

    /// Nodes reachable from `root` in post-order: leaves first, `root` last.
    pub fn reverse_topological_sort<'a>(
        &'a self,
        root: &'a str,
    ) -> Result<Vec<&'a str>, DagError> {
        if !self.nodes.contains_key(root) {
            return Err(DagError::NodeNotFound(root.to_string()));
        }
        let mut order = Vec::new();
        let mut seen: IndexSet<&'a str> = IndexSet::new();
        let mut stack: Vec<(&'a str, usize)> = vec![(root, 0)];
        seen.insert(root);
        while let Some((name, idx)) = stack.last_mut() {
            let child = self
                .nodes
                .get(*name)
                .and_then(|n| n.children.get_index(*idx));
            match child {
                Some(child) => {
                    *idx += 1;
                    if seen.insert(child.as_str()) {
                        stack.push((child.as_str(), 0));
                    }
                }
                None => {
                    order.push(*name);
                    stack.pop();
                }
            }
        }
        Ok(order)
    }

    /// Every node reachable from `name`, excluding `name` itself.
    pub fn reachable_from(&self, name: &str) -> IndexSet<String> {
        let mut reached = IndexSet::new();
        let mut stack: Vec<&str> = self.children(name);
        while let Some(next) = stack.pop() {
            if next == name || !reached.insert(next.to_string()) {
                continue;
            }
            stack.extend(self.children(next));
        }
        reached
    }

    /// Remove every direct edge `u -> w` that is implied by a longer path
    /// `u -> v -> ... -> w`. Reachability is unchanged.
    pub fn transitive_reduction(&mut self) -> Result<(), DagError> {
        self.is_cyclic()?;
        let names: Vec<String> = self.nodes.keys().cloned().collect();
        for u in &names {
            let direct: Vec<String> = self.children(u).into_iter().map(String::from).collect();
            let mut redundant = IndexSet::new();
            for v in &direct {
                let reach = self.reachable_from(v);
                for w in &direct {
                    if w != v && reach.contains(w) {
                        redundant.insert(w.clone());
                    }
                }
            }
            for w in redundant {
                self.disconnect(u, &w);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "dag_tests.rs"]
mod tests;
