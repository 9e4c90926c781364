//! The reconciled dependency graph of one resolution scope.
//!
//! Workspace modules are the roots; every library appears once, at its
//! selected version. Edges remember the version that was requested so
//! trees can show `1.0 -> 2.0` where reconciliation changed it.

use std::collections::{HashMap, HashSet};
use std::fmt;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use keel_core::dependency::Coordinate;

/// A library at its selected version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedLibrary {
    pub coordinate: Coordinate,
    pub version: String,
    pub forced: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GraphNode {
    Module(String),
    Library(ResolvedLibrary),
}

impl GraphNode {
    pub fn as_library(&self) -> Option<&ResolvedLibrary> {
        match self {
            GraphNode::Library(lib) => Some(lib),
            GraphNode::Module(_) => None,
        }
    }
}

impl fmt::Display for GraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphNode::Module(name) => write!(f, "{name} (module)"),
            GraphNode::Library(lib) => write!(f, "{}:{}", lib.coordinate, lib.version),
        }
    }
}

/// Edge label: the version the source asked for.
#[derive(Debug, Clone)]
pub struct Requested {
    pub version: String,
}

/// A resolved dependency graph backed by petgraph.
pub struct DependencyGraph {
    graph: DiGraph<GraphNode, Requested>,
    libraries: HashMap<Coordinate, NodeIndex>,
    modules: Vec<NodeIndex>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            libraries: HashMap::new(),
            modules: Vec::new(),
        }
    }

    /// Add a root for a workspace module.
    pub fn add_module(&mut self, name: &str) -> NodeIndex {
        if let Some(&idx) = self
            .modules
            .iter()
            .find(|&&idx| matches!(&self.graph[idx], GraphNode::Module(n) if n == name))
        {
            return idx;
        }
        let idx = self.graph.add_node(GraphNode::Module(name.to_string()));
        self.modules.push(idx);
        idx
    }

    /// Add or retrieve a library node.
    pub fn add_library(&mut self, library: ResolvedLibrary) -> NodeIndex {
        if let Some(&idx) = self.libraries.get(&library.coordinate) {
            return idx;
        }
        let key = library.coordinate.clone();
        let idx = self.graph.add_node(GraphNode::Library(library));
        self.libraries.insert(key, idx);
        idx
    }

    /// Add a dependency edge from `from` to `to`, once.
    pub fn add_edge(&mut self, from: NodeIndex, to: NodeIndex, requested: &str) {
        if !self.graph.edges(from).any(|e| e.target() == to) {
            self.graph.add_edge(
                from,
                to,
                Requested {
                    version: requested.to_string(),
                },
            );
        }
    }

    pub fn find(&self, coordinate: &Coordinate) -> Option<NodeIndex> {
        self.libraries.get(coordinate).copied()
    }

    pub fn node(&self, idx: NodeIndex) -> &GraphNode {
        &self.graph[idx]
    }

    /// All libraries, sorted by coordinate.
    pub fn libraries(&self) -> Vec<&ResolvedLibrary> {
        let mut libs: Vec<&ResolvedLibrary> = self
            .libraries
            .values()
            .filter_map(|&idx| self.graph[idx].as_library())
            .collect();
        libs.sort_by(|a, b| a.coordinate.cmp(&b.coordinate));
        libs
    }

    /// Libraries reachable from module `name`, including through the
    /// modules it depends on, sorted by coordinate.
    pub fn libraries_of_module(&self, name: &str) -> Vec<&ResolvedLibrary> {
        let Some(&root) = self
            .modules
            .iter()
            .find(|&&idx| matches!(&self.graph[idx], GraphNode::Module(n) if n == name))
        else {
            return Vec::new();
        };
        let mut seen = HashSet::new();
        let mut stack = vec![root];
        let mut libs = Vec::new();
        while let Some(idx) = stack.pop() {
            if !seen.insert(idx) {
                continue;
            }
            if let Some(lib) = self.graph[idx].as_library() {
                libs.push(lib);
            }
            stack.extend(self.graph.neighbors_directed(idx, Direction::Outgoing));
        }
        libs.sort_by(|a, b| a.coordinate.cmp(&b.coordinate));
        libs
    }

    /// Direct dependencies of a node, in insertion order.
    pub fn dependencies_of(&self, idx: NodeIndex) -> Vec<(NodeIndex, &Requested)> {
        let mut deps: Vec<_> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| (e.id(), e.target(), e.weight()))
            .collect();
        deps.sort_by_key(|(id, _, _)| *id);
        deps.into_iter().map(|(_, t, w)| (t, w)).collect()
    }

    /// Who depends on this node.
    pub fn dependents_of(&self, idx: NodeIndex) -> Vec<(NodeIndex, &Requested)> {
        let mut deps: Vec<_> = self
            .graph
            .edges_directed(idx, Direction::Incoming)
            .map(|e| (e.id(), e.source(), e.weight()))
            .collect();
        deps.sort_by_key(|(id, _, _)| *id);
        deps.into_iter().map(|(_, s, w)| (s, w)).collect()
    }

    fn label(&self, idx: NodeIndex, requested: Option<&Requested>) -> String {
        match (&self.graph[idx], requested) {
            (GraphNode::Library(lib), Some(req)) if req.version != lib.version => format!(
                "{}:{} -> {}{}",
                lib.coordinate,
                req.version,
                lib.version,
                if lib.forced { " (forced)" } else { "" }
            ),
            (GraphNode::Library(lib), _) if lib.forced => format!("{} (forced)", self.graph[idx]),
            (node, _) => node.to_string(),
        }
    }

    /// Render every module with its dependency tree.
    pub fn print_tree(&self, max_depth: Option<usize>) -> String {
        let mut output = String::new();
        for &root in &self.modules {
            output.push_str(&format!("{}\n", self.graph[root]));
            let mut visited = HashSet::new();
            visited.insert(root);
            let deps = self.dependencies_of(root);
            let count = deps.len();
            for (i, (idx, req)) in deps.into_iter().enumerate() {
                self.print_subtree(&mut output, idx, req, "", i == count - 1, 1, max_depth, &mut visited);
            }
        }
        output
    }

    #[allow(clippy::too_many_arguments)]
    fn print_subtree(
        &self,
        output: &mut String,
        idx: NodeIndex,
        requested: &Requested,
        prefix: &str,
        is_last: bool,
        depth: usize,
        max_depth: Option<usize>,
        visited: &mut HashSet<NodeIndex>,
    ) {
        let connector = if is_last { "└── " } else { "├── " };
        output.push_str(&format!("{prefix}{connector}{}\n", self.label(idx, Some(requested))));

        if max_depth.is_some_and(|max| depth >= max) {
            return;
        }
        if !visited.insert(idx) {
            return;
        }

        let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
        let deps = self.dependencies_of(idx);
        let count = deps.len();
        for (i, (child, req)) in deps.into_iter().enumerate() {
            self.print_subtree(
                output,
                child,
                req,
                &child_prefix,
                i == count - 1,
                depth + 1,
                max_depth,
                visited,
            );
        }
        visited.remove(&idx);
    }

    /// Resolve `group:artifact`, or a bare artifact name, to a library.
    fn resolve_key(&self, key: &str) -> Option<NodeIndex> {
        if let Some(coordinate) = Coordinate::parse(key) {
            return self.find(&coordinate);
        }
        self.libraries()
            .into_iter()
            .find(|lib| lib.coordinate.artifact == key)
            .and_then(|lib| self.find(&lib.coordinate))
    }

    /// The first path from a module root down to `key`.
    pub fn find_path(&self, key: &str) -> Option<Vec<&GraphNode>> {
        let target = self.resolve_key(key)?;
        for &root in &self.modules {
            let mut path = Vec::new();
            let mut visited = HashSet::new();
            if self.dfs_path(root, target, &mut path, &mut visited) {
                return Some(path.iter().map(|&idx| &self.graph[idx]).collect());
            }
        }
        None
    }

    fn dfs_path(
        &self,
        current: NodeIndex,
        target: NodeIndex,
        path: &mut Vec<NodeIndex>,
        visited: &mut HashSet<NodeIndex>,
    ) -> bool {
        path.push(current);
        if current == target {
            return true;
        }
        if visited.insert(current) {
            for (next, _) in self.dependencies_of(current) {
                if self.dfs_path(next, target, path, visited) {
                    return true;
                }
            }
        }
        path.pop();
        false
    }

    /// Everything that pulls in `key`, walking edges backwards.
    pub fn print_inverted_tree(&self, key: &str) -> String {
        let mut output = String::new();
        let Some(idx) = self.resolve_key(key) else {
            return output;
        };
        output.push_str(&format!("{}\n", self.label(idx, None)));
        let mut visited = HashSet::new();
        visited.insert(idx);
        self.print_dependents(&mut output, idx, "", &mut visited);
        output
    }

    fn print_dependents(
        &self,
        output: &mut String,
        idx: NodeIndex,
        prefix: &str,
        visited: &mut HashSet<NodeIndex>,
    ) {
        let dependents = self.dependents_of(idx);
        let count = dependents.len();
        for (i, (dep_idx, req)) in dependents.into_iter().enumerate() {
            let is_last = i == count - 1;
            let connector = if is_last { "└── " } else { "├── " };
            output.push_str(&format!(
                "{prefix}{connector}{} (requests {})\n",
                self.graph[dep_idx], req.version
            ));
            if visited.insert(dep_idx) {
                let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
                self.print_dependents(output, dep_idx, &child_prefix, visited);
                visited.remove(&dep_idx);
            }
        }
    }

    /// Every library followed by its direct dependents.
    pub fn print_full_inverted_tree(&self) -> String {
        let mut output = String::new();
        for lib in self.libraries() {
            let Some(idx) = self.find(&lib.coordinate) else {
                continue;
            };
            output.push_str(&format!("{}\n", self.label(idx, None)));
            let dependents = self.dependents_of(idx);
            let count = dependents.len();
            for (i, (dep_idx, req)) in dependents.into_iter().enumerate() {
                let connector = if i == count - 1 { "└── " } else { "├── " };
                output.push_str(&format!(
                    "{connector}{} (requests {})\n",
                    self.graph[dep_idx], req.version
                ));
            }
            output.push('\n');
        }
        output
    }

    /// Number of libraries.
    pub fn len(&self) -> usize {
        self.libraries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.libraries.is_empty()
    }
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lib(group: &str, artifact: &str, version: &str) -> ResolvedLibrary {
        ResolvedLibrary {
            coordinate: Coordinate::new(group, artifact),
            version: version.to_string(),
            forced: false,
        }
    }

    fn sample() -> DependencyGraph {
        let mut g = DependencyGraph::new();
        let core = g.add_module("core");
        let a = g.add_library(lib("org.a", "a", "1.0"));
        let b = g.add_library(lib("org.b", "b", "2.0"));
        g.add_edge(core, a, "1.0");
        g.add_edge(a, b, "1.0");
        g
    }

    #[test]
    fn libraries_are_unique_per_coordinate() {
        let mut g = DependencyGraph::new();
        let first = g.add_library(lib("org.a", "a", "1.0"));
        let second = g.add_library(lib("org.a", "a", "1.0"));
        assert_eq!(first, second);
        assert_eq!(g.len(), 1);
    }

    #[test]
    fn tree_shows_upgraded_requests() {
        let tree = sample().print_tree(None);
        assert!(tree.starts_with("core (module)\n"));
        assert!(tree.contains("└── org.a:a:1.0\n"));
        assert!(tree.contains("    └── org.b:b:1.0 -> 2.0\n"));
    }

    #[test]
    fn depth_limit_stops_descent() {
        let tree = sample().print_tree(Some(1));
        assert!(tree.contains("org.a:a:1.0"));
        assert!(!tree.contains("org.b:b"));
    }

    #[test]
    fn path_from_module_to_library() {
        let g = sample();
        let path = g.find_path("org.b:b").unwrap();
        let rendered: Vec<String> = path.iter().map(|n| n.to_string()).collect();
        assert_eq!(rendered, vec!["core (module)", "org.a:a:1.0", "org.b:b:2.0"]);
        assert!(g.find_path("b").is_some());
        assert!(g.find_path("org.missing:lib").is_none());
    }

    #[test]
    fn inverted_tree_walks_back_to_modules() {
        let inv = sample().print_inverted_tree("org.b:b");
        assert!(inv.starts_with("org.b:b:2.0\n"));
        assert!(inv.contains("└── org.a:a:1.0 (requests 1.0)"));
        assert!(inv.contains("    └── core (module) (requests 1.0)"));
    }

    #[test]
    fn module_libraries_follow_project_edges() {
        let mut g = sample();
        let app = g.add_module("app");
        let core = g.add_module("core");
        g.add_edge(app, core, "project");
        let c = g.add_library(lib("org.c", "c", "1.0"));
        g.add_edge(app, c, "1.0");
        let names: Vec<String> = g
            .libraries_of_module("app")
            .iter()
            .map(|l| l.coordinate.to_string())
            .collect();
        assert_eq!(names, vec!["org.a:a", "org.b:b", "org.c:c"]);
        assert_eq!(g.libraries_of_module("core").len(), 2);
        assert!(g.libraries_of_module("nope").is_empty());
    }

    #[test]
    fn full_inverted_tree_lists_every_library() {
        let inv = sample().print_full_inverted_tree();
        assert!(inv.contains("org.a:a:1.0\n└── core (module)"));
        assert!(inv.contains("org.b:b:2.0\n└── org.a:a:1.0"));
    }
}
