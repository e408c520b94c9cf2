//! Pathway node representation.
//!
//! Rather than a class hierarchy per node kind, a node is a closed tag
//! (`NodeType`) plus a shared payload (`candidates`, `label`, `degree`);
//! `components` is the only type-specific field and is only meaningful
//! for `NodeType::Group`. Parsers build nodes through [`NodeBuilder`],
//! which validates the fields required for each type.

use crate::ids::{NativeId, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Closed set of node kinds a pathway entry can be tagged with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    /// A gene product eligible to carry proteomic evidence.
    ProteinLike,
    /// A small-molecule / compound intermediary.
    Metabolite,
    /// A reference to another pathway (a "map" node).
    PathwayReference,
    /// A composite entry whose members are listed in `components`.
    Group,
    /// Anything else retained for lossless round-tripping (text boxes,
    /// shape annotations, ...); never participates in scoring.
    Other,
}

/// Per-node identifier mapping payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidates {
    /// Identifiers exactly as declared by the source document.
    pub native_ids: BTreeSet<NativeId>,
    /// Canonical protein identifiers resolved through the mapping table,
    /// deduplicated and sorted lexicographically.
    pub canonical_ids: BTreeSet<String>,
    /// Human-readable labels, for debugging only.
    pub labels: BTreeSet<String>,
}

impl Candidates {
    pub fn is_empty(&self) -> bool {
        self.native_ids.is_empty() && self.canonical_ids.is_empty() && self.labels.is_empty()
    }

    /// Merge another candidate set into this one (used when resolving
    /// group nodes from their components).
    pub fn merge(&mut self, other: &Candidates) {
        self.native_ids.extend(other.native_ids.iter().cloned());
        self.canonical_ids.extend(other.canonical_ids.iter().cloned());
        self.labels.extend(other.labels.iter().cloned());
    }
}

/// A pathway node, as produced by a source parser and refined by the
/// index normalizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub node_id: NodeId,
    pub pathway_id: crate::ids::PathwayId,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub label: String,
    pub candidates: Candidates,
    /// Number of distinct neighbors in the undirected projection of the
    /// pathway's edges. Populated by the normalizer; `0` until then.
    #[serde(default)]
    pub degree: usize,
    /// Ordered member node ids, only non-empty for `NodeType::Group`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<NodeId>,
}

/// Builder that validates the fields required for a given [`NodeType`]
/// before a `Node` can be constructed.
pub struct NodeBuilder {
    node_id: NodeId,
    pathway_id: crate::ids::PathwayId,
    node_type: NodeType,
    label: String,
    candidates: Candidates,
    components: Vec<NodeId>,
}

impl NodeBuilder {
    pub fn new(node_id: NodeId, pathway_id: crate::ids::PathwayId, node_type: NodeType) -> Self {
        Self {
            node_id,
            pathway_id,
            node_type,
            label: String::new(),
            candidates: Candidates::default(),
            components: Vec::new(),
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn candidates(mut self, candidates: Candidates) -> Self {
        self.candidates = candidates;
        self
    }

    pub fn components(mut self, components: Vec<NodeId>) -> Self {
        self.components = components;
        self
    }

    /// Build the node, enforcing that group nodes carry at least the
    /// intent of having members tracked (an empty component list is
    /// still valid — an empty group — but the field must be `Group`-typed
    /// to be non-empty).
    pub fn build(self) -> Result<Node, String> {
        if self.node_type != NodeType::Group && !self.components.is_empty() {
            return Err(format!(
                "node {} is not a group but carries components",
                self.node_id
            ));
        }
        Ok(Node {
            node_id: self.node_id,
            pathway_id: self.pathway_id,
            node_type: self.node_type,
            label: self.label,
            candidates: self.candidates,
            degree: 0,
            components: self.components,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::PathwayId;

    #[test]
    fn builder_rejects_components_on_non_group() {
        let pid = PathwayId::new("p1");
        let nid = NodeId::new(&pid, "1");
        let err = NodeBuilder::new(nid.clone(), pid.clone(), NodeType::ProteinLike)
            .components(vec![NodeId::new(&pid, "2")])
            .build()
            .unwrap_err();
        assert!(err.contains("not a group"));
    }

    #[test]
    fn candidates_merge_dedups() {
        let mut a = Candidates::default();
        a.canonical_ids.insert("P00001".into());
        let mut b = Candidates::default();
        b.canonical_ids.insert("P00001".into());
        b.canonical_ids.insert("P00002".into());
        a.merge(&b);
        assert_eq!(a.canonical_ids.len(), 2);
    }
}
