//! Pathway container: id lists and precomputed pair tables.

use crate::ids::{EdgeId, NodeId, PathwayId, Source};
use serde::{Deserialize, Serialize};

/// A 1-hop pair: two nodes directly connected by at least one edge.
///
/// `a < b` lexicographically; duplicate edges between the same two
/// nodes collapse to a single entry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Pair1 {
    pub a: NodeId,
    pub b: NodeId,
}

/// A 2-hop pair: two nodes sharing at least one common neighbor.
///
/// `bridge_count` is the number of distinct intermediate nodes bridging
/// `a` and `b`. Pairs already present in `pairs1` may still appear here;
/// the scorer weights the two tables differently.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Pair2 {
    pub a: NodeId,
    pub b: NodeId,
    pub bridge_count: usize,
}

/// A single pathway: its topology (as id lists, resolved against the
/// index's global `nodes`/`edges` maps) and precomputed pair tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pathway {
    pub pathway_id: PathwayId,
    pub name: String,
    pub source: Source,
    /// Sorted.
    pub node_ids: Vec<NodeId>,
    /// Sorted.
    pub edge_ids: Vec<EdgeId>,
    pub pairs1: Vec<Pair1>,
    pub pairs2: Vec<Pair2>,
    pub node_count: usize,
    pub edge_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classes: Option<Vec<String>>,
}

impl Pathway {
    /// `node_count`/`edge_count` agree with the length of their id lists,
    /// per §3/§8 invariant 2.
    pub fn counts_consistent(&self) -> bool {
        self.node_count == self.node_ids.len() && self.edge_count == self.edge_ids.len()
    }
}
