//! Pathway edge representation.

use crate::ids::{EdgeId, NodeId, PathwayId};
use serde::{Deserialize, Serialize};

/// A directed or undirected relation between two nodes of the same
/// pathway.
///
/// `directed` is `false` only when both endpoints carried no arrow head
/// (source-B) or the relation was an undirected `binding`/`association`
/// (source-A); otherwise `true`. Self-loops are permitted and retained
/// but excluded from the pair tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub edge_id: EdgeId,
    pub pathway_id: PathwayId,
    pub src: NodeId,
    pub dst: NodeId,
    pub directed: bool,
    pub relation_type: String,
    /// Ordered set of subtype tokens (`phosphorylation`, `start:Arrow`,
    /// `end:Arrow`, ...), drawn from an open vocabulary.
    pub subtypes: Vec<String>,
}

impl Edge {
    pub fn is_self_loop(&self) -> bool {
        self.src == self.dst
    }

    /// The unordered pair of endpoints, lexicographically ordered, or
    /// `None` for a self-loop (self-pairs are omitted from pair tables).
    pub fn unordered_pair(&self) -> Option<(NodeId, NodeId)> {
        if self.is_self_loop() {
            return None;
        }
        if self.src <= self.dst {
            Some((self.src.clone(), self.dst.clone()))
        } else {
            Some((self.dst.clone(), self.src.clone()))
        }
    }
}
