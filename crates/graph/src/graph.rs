use std::collections::{BTreeMap, BTreeSet};

use crate::extract::ReferenceEdge;

/// Plugin to referenced-plugin adjacency.
///
/// Targets are deduplicated and ordered; self edges never enter the graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    adjacency: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_edges<'a>(edges: impl IntoIterator<Item = &'a ReferenceEdge>) -> Self {
        let mut graph = Self::new();
        for edge in edges {
            graph.add_edge(&edge.from_plugin, &edge.to_plugin);
        }
        graph
    }

    pub fn add_node(&mut self, name: &str) {
        self.adjacency.entry(name.to_string()).or_default();
    }

    pub fn add_edge(&mut self, from: &str, to: &str) {
        if from == to {
            return;
        }
        self.add_node(to);
        self.adjacency
            .entry(from.to_string())
            .or_default()
            .insert(to.to_string());
    }

    /// Sorted targets of `name`, empty for unknown nodes.
    pub fn targets(&self, name: &str) -> impl Iterator<Item = &str> {
        self.adjacency
            .get(name)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.adjacency.keys().map(String::as_str)
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.edge_count() == 0
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_and_self_edges_collapse() {
        let mut graph = DependencyGraph::new();
        graph.add_edge("a", "c");
        graph.add_edge("a", "b");
        graph.add_edge("a", "b");
        graph.add_edge("a", "a");

        assert_eq!(graph.targets("a").collect::<Vec<_>>(), ["b", "c"]);
        assert_eq!(graph.nodes().collect::<Vec<_>>(), ["a", "b", "c"]);
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.targets("missing").count(), 0);
    }
}
