//! The top-level index document: metadata, pathways, and the global
//! node/edge dictionaries.

use crate::ids::{EdgeId, NodeId, PathwayId, Source};
use crate::model::{Edge, Node, Pathway};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The on-disk schema version this build of the crate writes and reads.
/// Bump when the document shape changes in a way that breaks readers.
pub const SCHEMA_VERSION: i64 = 1;

/// One pathway that failed to build, recorded rather than aborting the
/// whole index (§7: `NotFound` / `FetchExhausted` / `ParseError` are all
/// non-fatal at pathway granularity).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildFailure {
    pub pathway_id: String,
    pub reason: String,
}

/// Aggregate statistics over a completed index build.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexStats {
    pub pathway_count: usize,
    pub node_count: usize,
    pub edge_count: usize,
    pub failure_count: usize,
}

/// Metadata describing how and when an index was built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMeta {
    pub schema_version: i64,
    pub parser_version: i64,
    pub source: Source,
    pub organism_code: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub stats: IndexStats,
    #[serde(default)]
    pub failures: Vec<BuildFailure>,
}

/// The complete pathway index for one source + organism.
///
/// Key ordering on disk is fixed: `meta` first, then `pathways` (sorted
/// by pathway id), then `nodes` (sorted by node id), then `edges`
/// (sorted by edge id) — `BTreeMap` gives this ordering for free and
/// `pathways` is sorted explicitly before insertion/serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Index {
    pub meta: IndexMeta,
    pub pathways: Vec<Pathway>,
    pub nodes: BTreeMap<NodeId, Node>,
    pub edges: BTreeMap<EdgeId, Edge>,
}

impl Index {
    /// Look up a node by id across all pathways in this index.
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Look up an edge by id across all pathways in this index.
    pub fn edge(&self, id: &EdgeId) -> Option<&Edge> {
        self.edges.get(id)
    }

    /// Look up a pathway by id. Pathways are few enough per index
    /// (hundreds, not millions) that a linear scan is acceptable; callers
    /// that need repeated lookups should build their own index over the
    /// returned slice.
    pub fn pathway(&self, id: &PathwayId) -> Option<&Pathway> {
        self.pathways.iter().find(|p| &p.pathway_id == id)
    }

    /// Fold in failures discovered after normalization (e.g. a pathway
    /// the fetch cache or a parser could not produce at all, so it never
    /// reached the normalizer), keeping `meta.failures` sorted by
    /// pathway id and `meta.stats.failure_count` consistent with it.
    pub fn record_failures(&mut self, failures: impl IntoIterator<Item = BuildFailure>) {
        self.meta.failures.extend(failures);
        self.meta.failures.sort_by(|a, b| a.pathway_id.cmp(&b.pathway_id));
        self.meta.stats.failure_count = self.meta.failures.len();
    }

    /// Validate the invariants from §3/§8: every edge endpoint is a
    /// known node in the same pathway, every pathway's id lists resolve
    /// to entries that exist globally, and per-pathway counts agree with
    /// list lengths.
    pub fn validate(&self) -> Result<(), String> {
        for pathway in &self.pathways {
            if !pathway.counts_consistent() {
                return Err(format!(
                    "pathway {} has inconsistent node/edge counts",
                    pathway.pathway_id
                ));
            }
            for nid in &pathway.node_ids {
                if !self.nodes.contains_key(nid) {
                    return Err(format!(
                        "pathway {} references unknown node {}",
                        pathway.pathway_id, nid
                    ));
                }
            }
            for eid in &pathway.edge_ids {
                let edge = self
                    .edges
                    .get(eid)
                    .ok_or_else(|| format!("pathway {} references unknown edge {}", pathway.pathway_id, eid))?;
                if !self.nodes.contains_key(&edge.src) || !self.nodes.contains_key(&edge.dst) {
                    return Err(format!("edge {} endpoints are not known nodes", eid));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::Source;

    fn empty_index() -> Index {
        Index {
            meta: IndexMeta {
                schema_version: SCHEMA_VERSION,
                parser_version: 1,
                source: Source::Primary,
                organism_code: "hsa".to_string(),
                created_at: Utc::now(),
                stats: IndexStats::default(),
                failures: vec![BuildFailure {
                    pathway_id: "hsa00010".to_string(),
                    reason: "duplicate node id within pathway".to_string(),
                }],
            },
            pathways: vec![],
            nodes: BTreeMap::new(),
            edges: BTreeMap::new(),
        }
    }

    #[test]
    fn record_failures_merges_sorted_and_updates_count() {
        let mut index = empty_index();
        index.record_failures(vec![BuildFailure {
            pathway_id: "hsa00001".to_string(),
            reason: "fetch exhausted".to_string(),
        }]);
        assert_eq!(index.meta.stats.failure_count, 2);
        assert_eq!(index.meta.failures[0].pathway_id, "hsa00001");
        assert_eq!(index.meta.failures[1].pathway_id, "hsa00010");
    }
}
