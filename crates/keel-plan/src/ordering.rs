//! Deterministic topological ordering on top of `petgraph`.
//!
//! Nodes are identified by their insertion index; among nodes that are
//! ready at the same time the lowest index goes first. Callers choose
//! the tie-break by choosing the insertion order.

use std::collections::BTreeSet;

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use keel_util::errors::KeelError;

/// A graph of named nodes where an edge `a -> b` means `a` comes first.
pub struct OrderGraph {
    graph: DiGraph<String, ()>,
}

impl OrderGraph {
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
        }
    }

    /// Add a node and return its index.
    pub fn add(&mut self, name: &str) -> usize {
        self.graph.add_node(name.to_string()).index()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.graph
            .node_indices()
            .find(|&idx| self.graph[idx] == name)
            .map(NodeIndex::index)
    }

    /// Require `first` to be ordered before `then`.
    pub fn before(&mut self, first: usize, then: usize) {
        let (a, b) = (NodeIndex::new(first), NodeIndex::new(then));
        if self.graph.find_edge(a, b).is_none() {
            self.graph.add_edge(a, b, ());
        }
    }

    /// Node names in dependency order.
    pub fn order(&self) -> miette::Result<Vec<String>> {
        let mut remaining: Vec<usize> = self
            .graph
            .node_indices()
            .map(|idx| self.graph.neighbors_directed(idx, Direction::Incoming).count())
            .collect();
        let mut ready: BTreeSet<usize> = remaining
            .iter()
            .enumerate()
            .filter(|(_, &n)| n == 0)
            .map(|(i, _)| i)
            .collect();

        let mut ordered = Vec::with_capacity(remaining.len());
        while let Some(next) = ready.pop_first() {
            ordered.push(self.graph[NodeIndex::new(next)].clone());
            for succ in self
                .graph
                .neighbors_directed(NodeIndex::new(next), Direction::Outgoing)
            {
                let slot = &mut remaining[succ.index()];
                *slot -= 1;
                if *slot == 0 {
                    ready.insert(succ.index());
                }
            }
        }

        if ordered.len() < self.graph.node_count() {
            return Err(KeelError::Cycle {
                path: self.describe_cycle(),
            }
            .into());
        }
        Ok(ordered)
    }

    fn describe_cycle(&self) -> String {
        let component = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|c| c.len() > 1 || c.iter().any(|&n| self.graph.find_edge(n, n).is_some()))
            .min_by_key(|c| c.iter().map(|n| n.index()).min())
            .unwrap_or_default();
        let mut names: Vec<(usize, &str)> = component
            .iter()
            .map(|&n| (n.index(), self.graph[n].as_str()))
            .collect();
        names.sort();
        let mut path: Vec<&str> = names.iter().map(|(_, name)| *name).collect();
        if let Some(first) = path.first().copied() {
            path.push(first);
        }
        path.join(" -> ")
    }
}

impl Default for OrderGraph {
    fn default() -> Self {
        Self::new()
    }
}
