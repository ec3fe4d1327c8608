//! Cycle detection over the reference graph.
//!
//! Depth-first search where the explored set and the active path are
//! owned by the caller and passed down the recursion, so a search holds no
//! hidden state and can be rerun on any graph.

use std::{
    collections::{BTreeSet, HashSet},
    path::Path,
};

use {
    regcheck_common::{Finding, Section},
    tracing::debug,
};

use crate::{extract::ReferenceEdge, graph::DependencyGraph};

/// Plugin names along a cycle, closed: the first name is repeated last.
pub type Cycle = Vec<String>;

/// Every distinct cycle in `graph`, each rotated to start at its smallest
/// member. Roots and neighbours are visited in sorted order.
pub fn detect_cycles(graph: &DependencyGraph) -> Vec<Cycle> {
    let mut explored = HashSet::new();
    let mut path = Vec::new();
    let mut found = BTreeSet::new();

    for root in graph.nodes() {
        if !explored.contains(root) {
            visit(graph, root, &mut explored, &mut path, &mut found);
        }
    }

    debug!(cycles = found.len(), "cycle detection finished");
    found.into_iter().collect()
}

fn visit<'g>(
    graph: &'g DependencyGraph,
    node: &'g str,
    explored: &mut HashSet<&'g str>,
    path: &mut Vec<&'g str>,
    found: &mut BTreeSet<Cycle>,
) {
    path.push(node);

    for next in graph.targets(node) {
        if let Some(start) = path.iter().position(|n| *n == next) {
            found.insert(canonical(&path[start..]));
        } else if !explored.contains(next) {
            visit(graph, next, explored, path, found);
        }
    }

    path.pop();
    explored.insert(node);
}

/// Rotate so the smallest name leads, then close the loop.
fn canonical(members: &[&str]) -> Cycle {
    let pivot = members
        .iter()
        .enumerate()
        .min_by_key(|(_, name)| **name)
        .map_or(0, |(idx, _)| idx);

    let mut cycle: Cycle = members[pivot..]
        .iter()
        .chain(&members[..pivot])
        .map(|name| name.to_string())
        .collect();
    if let Some(first) = cycle.first().cloned() {
        cycle.push(first);
    }
    cycle
}

/// One advisory warning per cycle, located at the first reference that
/// closes it.
pub fn cycle_findings(cycles: &[Cycle], edges: &[ReferenceEdge], root: &Path) -> Vec<Finding> {
    cycles
        .iter()
        .map(|cycle| {
            let finding = Finding::warning(
                Section::Cycles,
                format!("dependency cycle: {}", cycle.join(" -> ")),
            );
            match closing_edge(cycle, edges) {
                Some(edge) => finding.at(edge.location(root)),
                None => finding,
            }
        })
        .collect()
}

fn closing_edge<'e>(cycle: &[String], edges: &'e [ReferenceEdge]) -> Option<&'e ReferenceEdge> {
    let [.., from, to] = cycle else {
        return None;
    };
    edges
        .iter()
        .find(|edge| edge.from_plugin == *from && edge.to_plugin == *to)
}
