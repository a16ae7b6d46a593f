use std::collections::{HashMap, HashSet};

use crate::corpus::NodeId;
use crate::scene::Edge;

/// Precomputed undirected neighbor map plus per-endpoint edge indices.
/// Replaces linear edge scans on every hover with O(1) lookups.
#[derive(Debug, Default)]
pub struct AdjacencyIndex {
    neighbors: HashMap<NodeId, HashSet<NodeId>>,
    edges_by_node: HashMap<NodeId, Vec<usize>>,
    empty: HashSet<NodeId>,
    empty_edges: Vec<usize>,
}

impl AdjacencyIndex {
    pub fn build(edges: &[Edge]) -> Self {
        let mut index = AdjacencyIndex::default();
        for (i, e) in edges.iter().enumerate() {
            index
                .neighbors
                .entry(e.from.clone())
                .or_default()
                .insert(e.to.clone());
            index
                .neighbors
                .entry(e.to.clone())
                .or_default()
                .insert(e.from.clone());
            index.edges_by_node.entry(e.from.clone()).or_default().push(i);
            index.edges_by_node.entry(e.to.clone()).or_default().push(i);
        }
        index
    }

    /// Neighbors of `id`. Empty-set sentinel for unknown or isolated nodes,
    /// never None, so callers iterate unconditionally.
    pub fn get_connected(&self, id: &NodeId) -> &HashSet<NodeId> {
        self.neighbors.get(id).unwrap_or(&self.empty)
    }

    /// Indices (into the scene edge list) of every edge touching `id`.
    pub fn edge_indices(&self, id: &NodeId) -> &[usize] {
        self.edges_by_node
            .get(id)
            .map(Vec::as_slice)
            .unwrap_or(&self.empty_edges)
    }

    /// `{id} ∪ neighbors(id)` as a fresh set the caller may keep or mutate.
    /// Not cached here — the visual resolver caches it keyed on the current
    /// highlight id.
    pub fn get_highlight_set(&self, id: &NodeId) -> HashSet<NodeId> {
        let mut set = HashSet::with_capacity(1 + self.get_connected(id).len());
        set.insert(id.clone());
        for n in self.get_connected(id) {
            set.insert(n.clone());
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::EdgeKind;

    fn id(s: &str) -> NodeId {
        NodeId(s.to_string())
    }

    fn edge(from: &str, to: &str) -> Edge {
        Edge {
            from: id(from),
            to: id(to),
            kind: EdgeKind::Cross,
        }
    }

    #[test]
    fn records_both_endpoints_as_mutual_neighbors() {
        let index = AdjacencyIndex::build(&[edge("a", "b"), edge("b", "c")]);
        assert!(index.get_connected(&id("a")).contains(&id("b")));
        assert!(index.get_connected(&id("b")).contains(&id("a")));
        assert!(index.get_connected(&id("b")).contains(&id("c")));
        assert_eq!(index.get_connected(&id("b")).len(), 2);
    }

    #[test]
    fn unknown_id_yields_empty_sentinel() {
        let index = AdjacencyIndex::build(&[edge("a", "b")]);
        assert!(index.get_connected(&id("zzz")).is_empty());
        assert!(index.edge_indices(&id("zzz")).is_empty());
    }

    #[test]
    fn highlight_set_contains_self_and_is_idempotent() {
        let index = AdjacencyIndex::build(&[edge("a", "b"), edge("a", "c"), edge("d", "e")]);
        let first = index.get_highlight_set(&id("a"));
        assert!(first.contains(&id("a")));
        assert_eq!(first.len(), 3);

        // Interleave other queries, then re-ask: result must be equal.
        let _ = index.get_highlight_set(&id("d"));
        let _ = index.get_highlight_set(&id("zzz"));
        let second = index.get_highlight_set(&id("a"));
        assert_eq!(first, second);

        // Unknown ids still contain themselves.
        let lone = index.get_highlight_set(&id("zzz"));
        assert_eq!(lone.len(), 1);
        assert!(lone.contains(&id("zzz")));
    }

    #[test]
    fn edge_indices_cover_every_touching_edge() {
        let edges = [edge("a", "b"), edge("b", "c"), edge("a", "c")];
        let index = AdjacencyIndex::build(&edges);
        assert_eq!(index.edge_indices(&id("a")), &[0, 2]);
        assert_eq!(index.edge_indices(&id("b")), &[0, 1]);
    }
}
