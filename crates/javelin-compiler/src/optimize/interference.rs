//! Interference graph
//!
//! Undirected graph over optimizable variable names; an edge marks two
//! variables that are simultaneously live and so cannot share a register.
//! Adjacency sets are ordered for deterministic coloring.

use super::liveness::LivenessData;
use crate::ir::Method;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default)]
pub struct InterferenceGraph {
    adjacency: BTreeMap<String, BTreeSet<String>>,
}

impl InterferenceGraph {
    pub fn new() -> Self {
        InterferenceGraph::default()
    }

    pub fn add_node(&mut self, name: &str) {
        self.adjacency.entry(name.to_string()).or_default();
    }

    pub fn connect(&mut self, first: &str, second: &str) {
        if first == second {
            return;
        }
        if !self.adjacency.contains_key(first) || !self.adjacency.contains_key(second) {
            return;
        }
        self.adjacency
            .get_mut(first)
            .expect("node exists")
            .insert(second.to_string());
        self.adjacency
            .get_mut(second)
            .expect("node exists")
            .insert(first.to_string());
    }

    /// Add an edge between every pair of the given names.
    pub fn connect_all(&mut self, names: &BTreeSet<String>) {
        let names: Vec<&String> = names.iter().collect();
        for (position, first) in names.iter().enumerate() {
            for second in names.iter().skip(position + 1) {
                self.connect(first, second);
            }
        }
    }

    pub fn nodes(&self) -> impl Iterator<Item = &String> {
        self.adjacency.keys()
    }

    pub fn neighbors(&self, name: &str) -> Option<&BTreeSet<String>> {
        self.adjacency.get(name)
    }

    pub fn degree(&self, name: &str) -> usize {
        self.adjacency.get(name).map_or(0, BTreeSet::len)
    }

    pub fn remove(&mut self, name: &str) {
        if let Some(neighbors) = self.adjacency.remove(name) {
            for neighbor in neighbors {
                if let Some(set) = self.adjacency.get_mut(&neighbor) {
                    set.remove(name);
                }
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    pub fn len(&self) -> usize {
        self.adjacency.len()
    }
}

/// Build the interference graph for one analyzed method: a clique over
/// every instruction's live-in set, and another over live-out plus def.
pub fn build(method: &Method, liveness: &LivenessData) -> InterferenceGraph {
    let mut graph = InterferenceGraph::new();

    for instruction in &method.instructions {
        let id = instruction.id;

        for name in &liveness.live_in[id] {
            graph.add_node(name);
        }
        graph.connect_all(&liveness.live_in[id]);

        let union: BTreeSet<String> = liveness.live_out[id]
            .union(&liveness.defs[id])
            .cloned()
            .collect();
        for name in &union {
            graph.add_node(name);
        }
        graph.connect_all(&union);
    }

    graph
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_connect_all_is_a_clique_without_self_loops() {
        let mut graph = InterferenceGraph::new();
        let names = set(&["a", "b", "c"]);
        for name in &names {
            graph.add_node(name);
        }
        graph.connect_all(&names);

        assert_eq!(graph.degree("a"), 2);
        assert_eq!(graph.degree("b"), 2);
        assert_eq!(graph.degree("c"), 2);
        assert!(!graph.neighbors("a").unwrap().contains("a"));
    }

    #[test]
    fn test_remove_drops_edges_both_ways() {
        let mut graph = InterferenceGraph::new();
        for name in ["a", "b"] {
            graph.add_node(name);
        }
        graph.connect("a", "b");

        graph.remove("a");
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.degree("b"), 0);
    }

    #[test]
    fn test_connect_unknown_node_is_a_no_op() {
        let mut graph = InterferenceGraph::new();
        graph.add_node("a");
        graph.connect("a", "ghost");
        assert_eq!(graph.degree("a"), 0);
    }
}
