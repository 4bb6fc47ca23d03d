//! Graph coloring
//!
//! Chaitin-style simplify/select. The trial color budget starts at zero
//! and is raised to the minimum remaining degree plus one whenever no node
//! can be simplified, so it grows monotonically to the minimum needed.
//! Selection pops the stack and assigns each node the smallest color
//! unused by its neighbors in the full graph.

use super::interference::InterferenceGraph;
use std::collections::{BTreeMap, BTreeSet};

/// Color the graph. Returns the number of colors used and each node's
/// assigned color.
pub fn color(graph: &InterferenceGraph) -> (usize, BTreeMap<String, usize>) {
    let mut work = graph.clone();
    let mut stack: Vec<String> = Vec::new();
    let mut max_colors = 0usize;

    while !work.is_empty() {
        let candidate = work
            .nodes()
            .find(|name| work.degree(name) < max_colors)
            .cloned();
        match candidate {
            Some(name) => {
                work.remove(&name);
                stack.push(name);
            }
            None => {
                let min_degree = work
                    .nodes()
                    .map(|name| work.degree(name))
                    .min()
                    .unwrap_or(0);
                max_colors = min_degree + 1;
            }
        }
    }

    let mut colors: BTreeMap<String, usize> = BTreeMap::new();
    while let Some(name) = stack.pop() {
        let used: BTreeSet<usize> = graph
            .neighbors(&name)
            .into_iter()
            .flatten()
            .filter_map(|neighbor| colors.get(neighbor).copied())
            .collect();

        let mut selected = 0;
        while used.contains(&selected) {
            selected += 1;
        }
        max_colors = max_colors.max(selected + 1);
        colors.insert(name, selected);
    }

    (max_colors, colors)
}
