//! Node Scorer (§4.H): picks a representative canonical identifier for
//! each pathway node and exposes a per-node score and regulatory gate
//! for the Ranker to consume.

use crate::ids::{looks_like_canonical_id, NodeId, Source};
use crate::model::Index;
use crate::scoring::aggregator::{pick_best, EvidenceTable, RegSite};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeState {
    pub node_id: NodeId,
    pub node_score: f64,
    pub node_has_reg: bool,
    pub representative_canonical_id: Option<String>,
    pub rep_top_reg_sites: Vec<RegSite>,
}

/// Score every node of `index` against `evidence`, keyed by node id.
pub fn score_index(index: &Index, evidence: &EvidenceTable) -> BTreeMap<NodeId, NodeState> {
    let mut out = BTreeMap::new();
    for (node_id, node) in &index.nodes {
        let source = index
            .pathway(&node.pathway_id)
            .map(|p| p.source)
            .unwrap_or(Source::Primary);

        let mut candidates: BTreeSet<String> = node.candidates.canonical_ids.clone();
        if source == Source::Primary {
            for native in &node.candidates.native_ids {
                if looks_like_canonical_id(&native.id) {
                    candidates.insert(native.id.clone());
                }
            }
        }

        let present: Vec<_> = candidates.iter().filter_map(|c| evidence.get(c)).collect();
        let representative = pick_best(present.iter().copied());

        out.insert(
            node_id.clone(),
            NodeState {
                node_id: node_id.clone(),
                node_score: representative.map(|e| e.single_score).unwrap_or(0.0),
                node_has_reg: present.iter().any(|e| e.has_regulatory_evidence),
                representative_canonical_id: representative.map(|e| e.canonical_id.clone()),
                rep_top_reg_sites: representative.map(|e| e.top_reg_sites.clone()).unwrap_or_default(),
            },
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::PathwayId;
    use crate::model::{Candidates, IndexMeta, IndexStats, NodeBuilder, NodeType, Pathway};
    use crate::scoring::aggregator::{aggregate, ColumnMapping};
    use crate::scoring::weights::Weights;
    use crate::tabular::Table;
    use chrono::Utc;
    use std::collections::BTreeMap as Map;

    #[test]
    fn picks_max_scoring_representative() {
        let pid = PathwayId::new("p1");
        let node_id = NodeId::new(&pid, "1");
        let mut candidates = Candidates::default();
        candidates.canonical_ids.insert("P01234".to_string());
        candidates.canonical_ids.insert("P05678".to_string());
        let node = NodeBuilder::new(node_id.clone(), pid.clone(), NodeType::ProteinLike)
            .candidates(candidates)
            .build()
            .unwrap();

        let mut nodes = Map::new();
        nodes.insert(node_id.clone(), node);

        let pathway = Pathway {
            pathway_id: pid.clone(),
            name: "p".to_string(),
            source: Source::Primary,
            node_ids: vec![node_id.clone()],
            edge_ids: vec![],
            pairs1: vec![],
            pairs2: vec![],
            node_count: 1,
            edge_count: 0,
            classes: None,
        };

        let index = Index {
            meta: IndexMeta {
                schema_version: crate::model::SCHEMA_VERSION,
                parser_version: 1,
                source: Source::Primary,
                organism_code: "hsa".to_string(),
                created_at: Utc::now(),
                stats: IndexStats::default(),
                failures: vec![],
            },
            pathways: vec![pathway],
            nodes,
            edges: Map::new(),
        };

        let protein_tsv = "Uniprot\tpvalue\tlog2fc\tphospho_pvalue\tphospho_log2fc\n\
P01234\t0.5\t0\t0.5\t0\n\
P05678\t0.0001\t3\t0.5\t0\n";
        let protein_table = Table::from_reader(protein_tsv.as_bytes(), b'\t').unwrap();
        let (evidence, _) = aggregate(&protein_table, None, &ColumnMapping::default(), &Weights::default(), None);

        let states = score_index(&index, &evidence);
        let state = &states[&node_id];
        assert_eq!(state.representative_canonical_id.as_deref(), Some("P05678"));
        assert!(state.node_score > 0.0);
    }
}
