//! The uses graph built from a [`DependencyIndex`].
//!
//! Uses petgraph to store unit relationships and answers the two questions the
//! index alone cannot: which units form interface cycles, and through which
//! chains of dependents a unit gets pulled into a project.

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::debug;

use super::index::DependencyIndex;
use super::types::{name_key, EdgeKind};

/// Directed graph of loaded units; an edge `A -> B` means A uses B.
pub struct UsesGraph {
    graph: DiGraph<String, EdgeKind>,
    /// Index: lowercase unit name -> node index.
    node_index: HashMap<String, NodeIndex>,
    /// Root units, by node.
    roots: HashSet<NodeIndex>,
}

/// Node and edge counts, by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    pub units: usize,
    pub interface_edges: usize,
    pub implementation_edges: usize,
    pub roots: usize,
}

impl UsesGraph {
    /// Builds the graph from every unit the index has loaded.
    ///
    /// Nodes are added in key order, so node indices and everything derived
    /// from them are stable across runs.
    pub fn from_index(index: &DependencyIndex) -> Self {
        let mut graph = DiGraph::new();
        let mut node_index = HashMap::new();

        for (key, uses) in index.uses() {
            let idx = graph.add_node(uses.unit.clone());
            node_index.insert(key.clone(), idx);
        }

        for (key, uses) in index.uses() {
            let from = node_index[key];
            for (name, kind) in uses.edges() {
                // Every use names a unit that build() loaded, but an index
                // filled through load() alone may stop short.
                let to = match node_index.get(&name_key(name)) {
                    Some(&to) => to,
                    None => {
                        let to = graph.add_node(name.to_string());
                        node_index.insert(name_key(name), to);
                        to
                    }
                };
                graph.add_edge(from, to, kind);
            }
        }

        let roots = index
            .root_files()
            .iter()
            .filter_map(|root| node_index.get(&name_key(root)).copied())
            .collect();

        let built = Self {
            graph,
            node_index,
            roots,
        };
        debug!(stats = ?built.stats(), "uses graph built");
        built
    }

    /// Groups of units that use each other through interface sections.
    ///
    /// Implementation uses never close a cycle. Only components with more than
    /// one unit are reported; member order follows the component.
    pub fn find_cycles(&self) -> Vec<Vec<String>> {
        let interface = self.graph.filter_map(
            |_, name| Some(name.as_str()),
            |_, &kind| (kind == EdgeKind::Interface).then_some(()),
        );

        tarjan_scc(&interface)
            .into_iter()
            .filter(|component| component.len() > 1)
            .map(|component| {
                component
                    .into_iter()
                    .map(|idx| interface[idx].to_string())
                    .collect()
            })
            .collect()
    }

    /// Every chain of dependents leading from a root unit to `target`.
    ///
    /// Paths run root first and end with the target; a target that is itself
    /// a root yields the one-element path. Chains that would revisit a unit are
    /// dropped, so cycles terminate. An unknown or unreachable target yields
    /// no paths.
    pub fn why(&self, target: &str) -> Vec<Vec<String>> {
        let Some(&start) = self.node_index.get(&name_key(target)) else {
            return Vec::new();
        };

        let mut paths = Vec::new();
        let mut chain = Vec::new();
        self.collect_dependents(start, &mut chain, &mut paths);
        paths
    }

    fn collect_dependents(
        &self,
        node: NodeIndex,
        chain: &mut Vec<NodeIndex>,
        paths: &mut Vec<Vec<String>>,
    ) {
        if chain.contains(&node) {
            return;
        }
        chain.push(node);

        if self.roots.contains(&node) {
            paths.push(
                chain
                    .iter()
                    .rev()
                    .map(|&idx| self.graph[idx].clone())
                    .collect(),
            );
        } else {
            let mut parents: Vec<NodeIndex> = self
                .graph
                .edges_directed(node, Direction::Incoming)
                .map(|e| e.source())
                .collect();
            parents.sort_by_key(|idx| name_key(&self.graph[*idx]));
            parents.dedup();
            for parent in parents {
                self.collect_dependents(parent, chain, paths);
            }
        }

        chain.pop();
    }

    pub fn stats(&self) -> GraphStats {
        let interface_edges = self
            .graph
            .edge_weights()
            .filter(|&&kind| kind == EdgeKind::Interface)
            .count();
        GraphStats {
            units: self.graph.node_count(),
            interface_edges,
            implementation_edges: self.graph.edge_count() - interface_edges,
            roots: self.roots.len(),
        }
    }

    pub fn contains(&self, unit: &str) -> bool {
        self.node_index.contains_key(&name_key(unit))
    }
}

/// Renders a why-path as `>Root>Middle>Target`.
pub fn format_path(path: &[String]) -> String {
    path.iter().map(|unit| format!(">{unit}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::types::{Section, UnitUses};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn project(files: &[(&str, &str)], roots: &[&str]) -> (TempDir, DependencyIndex) {
        let dir = TempDir::new().unwrap();
        for (name, content) in files {
            fs::write(dir.path().join(name), content).unwrap();
        }
        let mut index = DependencyIndex::new();
        index.add_source_dir(dir.path()).unwrap();
        index.build(roots);
        (dir, index)
    }

    fn sorted(mut v: Vec<String>) -> Vec<String> {
        v.sort();
        v
    }

    #[test]
    fn test_three_unit_interface_cycle() {
        let (_dir, index) = project(
            &[
                ("Main.dpr", "program Main; uses A; begin end."),
                ("A.pas", "unit A; interface uses B; implementation end."),
                ("B.pas", "unit B; interface uses C; implementation end."),
                ("C.pas", "unit C; interface uses A; implementation end."),
            ],
            &["Main.dpr"],
        );
        let graph = UsesGraph::from_index(&index);

        let cycles = graph.find_cycles();
        assert_eq!(cycles.len(), 1);
        assert_eq!(sorted(cycles[0].clone()), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_implementation_uses_do_not_form_cycles() {
        let (_dir, index) = project(
            &[
                ("A.pas", "unit A; interface uses B; implementation end."),
                ("B.pas", "unit B; interface implementation uses A; end."),
            ],
            &["A"],
        );
        let graph = UsesGraph::from_index(&index);
        assert!(graph.find_cycles().is_empty());
        assert_eq!(
            graph.stats(),
            GraphStats {
                units: 2,
                interface_edges: 1,
                implementation_edges: 1,
                roots: 1,
            }
        );
    }

    #[test]
    fn test_why_lists_every_chain() {
        let (_dir, index) = project(
            &[
                ("App.dpr", "program App; uses Forms, Data; begin end."),
                ("Forms.pas", "unit Forms; interface uses Utils; implementation end."),
                ("Data.pas", "unit Data; interface implementation uses Utils; end."),
                ("Utils.pas", "unit Utils; interface implementation end."),
            ],
            &["App.dpr"],
        );
        let graph = UsesGraph::from_index(&index);

        let paths: Vec<String> = graph.why("utils").iter().map(|p| format_path(p)).collect();
        assert_eq!(paths, vec![">App>Data>Utils", ">App>Forms>Utils"]);
        assert_eq!(graph.why("App"), vec![vec!["App".to_string()]]);
    }

    #[test]
    fn test_why_survives_cycles() {
        let (_dir, index) = project(
            &[
                ("Main.dpr", "program Main; uses A; begin end."),
                ("A.pas", "unit A; interface uses B; implementation end."),
                ("B.pas", "unit B; interface implementation uses A; end."),
            ],
            &["Main.dpr"],
        );
        let graph = UsesGraph::from_index(&index);
        let paths: Vec<String> = graph.why("B").iter().map(|p| format_path(p)).collect();
        assert_eq!(paths, vec![">Main>A>B"]);
    }

    #[test]
    fn test_why_unreachable_target() {
        let mut index = DependencyIndex::new();
        let orphan = index.load("Orphan").is_none();
        assert!(orphan);
        let graph = UsesGraph::from_index(&index);

        assert!(graph.contains("orphan"));
        assert!(graph.why("Orphan").is_empty());
        assert!(graph.why("Nowhere").is_empty());
    }

    #[test]
    fn test_unloaded_uses_still_get_nodes() {
        let mut uses = UnitUses::new("Main");
        uses.add(Section::Interface, "Lib");
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("Main.pas"), "unit Main; interface uses Lib; end.").unwrap();
        fs::write(dir.path().join("Lib.pas"), "unit Lib; end.").unwrap();

        let mut index = DependencyIndex::new();
        index.add_source_dir(dir.path()).unwrap();
        assert_eq!(index.load("Main"), Some(&uses));
        assert!(index.unit_path("Lib").map(Path::exists).unwrap_or(false));

        let graph = UsesGraph::from_index(&index);
        assert!(graph.contains("lib"));
        assert_eq!(graph.stats().interface_edges, 1);
    }

    #[test]
    fn test_format_path() {
        let path = vec!["Root".to_string(), "Mid".to_string(), "Leaf".to_string()];
        assert_eq!(format_path(&path), ">Root>Mid>Leaf");
        assert_eq!(format_path(&[]), "");
    }
}
