//! Index Normalizer (§4.E): turns a batch of [`ParsedPathway`]s into the
//! uniform [`Index`] the scorer consumes.
//!
//! Three passes per pathway, run in parallel across pathways via `rayon`:
//! resolve group candidates by a memoized DFS over `components` (cycles
//! degrade to an empty candidate set plus a warning, never an abort),
//! project the directed edge multiset down to an undirected adjacency
//! map to get `degree` and `pairs1`, then walk each node's neighborhood
//! once more to build `pairs2` in Θ(Σdeg(v)²).
//!
//! A structural problem local to one pathway (a duplicate local node id,
//! an edge referencing a node absent from this pathway) fails only that
//! pathway; a node/edge id that collides with one already claimed by an
//! earlier pathway in the same build is treated the same way, recorded
//! as a [`BuildFailure`] rather than aborting the whole index.

use crate::ids::{NodeId, PathwayId, Source};
use crate::model::{Candidates, Index, IndexMeta, IndexStats, BuildFailure, Edge, Node, NodeType, Pair1, Pair2, Pathway, SCHEMA_VERSION};
use crate::parse::ParsedPathway;
use chrono::Utc;
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// The result of normalizing a whole batch: the assembled index plus any
/// non-fatal warnings accumulated along the way (cycles, skipped
/// relations reported by the parsers, ...).
pub struct NormalizeOutcome {
    pub index: Index,
    pub warnings: Vec<String>,
}

struct NormalizedPathway {
    pathway: Pathway,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    warnings: Vec<String>,
}

/// Resolve a node's effective candidates: itself if not a group, or the
/// memoized union of its components' candidates otherwise. `stack`
/// tracks the current recursion path so a component cycle is detected
/// rather than looped forever.
fn resolve_candidates(
    node_id: &NodeId,
    nodes: &HashMap<NodeId, Node>,
    memo: &mut HashMap<NodeId, Candidates>,
    stack: &mut HashSet<NodeId>,
    warnings: &mut Vec<String>,
) -> Candidates {
    if let Some(cached) = memo.get(node_id) {
        return cached.clone();
    }
    let Some(node) = nodes.get(node_id) else {
        return Candidates::default();
    };
    if node.node_type != NodeType::Group {
        let c = node.candidates.clone();
        memo.insert(node_id.clone(), c.clone());
        return c;
    }
    if !stack.insert(node_id.clone()) {
        warnings.push(format!(
            "group {node_id} participates in a component cycle; treated as empty"
        ));
        return Candidates::default();
    }
    let mut combined = Candidates::default();
    for component in &node.components {
        let c = resolve_candidates(component, nodes, memo, stack, warnings);
        combined.merge(&c);
    }
    stack.remove(node_id);
    memo.insert(node_id.clone(), combined.clone());
    combined
}

/// Build the undirected adjacency projection: duplicate edges and
/// opposite-direction edges between the same two nodes collapse to one
/// neighbor relationship (§9 resolution for degree/pair-table purposes).
fn undirected_adjacency(edges: &[Edge]) -> BTreeMap<NodeId, BTreeSet<NodeId>> {
    let mut adjacency: BTreeMap<NodeId, BTreeSet<NodeId>> = BTreeMap::new();
    for edge in edges {
        if let Some((a, b)) = edge.unordered_pair() {
            adjacency.entry(a.clone()).or_default().insert(b.clone());
            adjacency.entry(b).or_default().insert(a);
        }
    }
    adjacency
}

fn build_pairs1(adjacency: &BTreeMap<NodeId, BTreeSet<NodeId>>) -> Vec<Pair1> {
    let mut pairs = BTreeSet::new();
    for (a, neighbors) in adjacency {
        for b in neighbors {
            if a < b {
                pairs.insert(Pair1 { a: a.clone(), b: b.clone() });
            }
        }
    }
    pairs.into_iter().collect()
}

/// For every node `v`, every unordered pair of `v`'s neighbors shares `v`
/// as a bridge; accumulate distinct-bridge counts per pair. Cost is
/// Θ(Σ deg(v)²) as specified.
fn build_pairs2(adjacency: &BTreeMap<NodeId, BTreeSet<NodeId>>) -> Vec<Pair2> {
    let mut bridge_counts: BTreeMap<(NodeId, NodeId), usize> = BTreeMap::new();
    for neighbors in adjacency.values() {
        let ordered: Vec<&NodeId> = neighbors.iter().collect();
        for i in 0..ordered.len() {
            for j in (i + 1)..ordered.len() {
                let (a, b) = if ordered[i] < ordered[j] {
                    (ordered[i].clone(), ordered[j].clone())
                } else {
                    (ordered[j].clone(), ordered[i].clone())
                };
                *bridge_counts.entry((a, b)).or_insert(0) += 1;
            }
        }
    }
    bridge_counts
        .into_iter()
        .map(|((a, b), bridge_count)| Pair2 { a, b, bridge_count })
        .collect()
}

fn normalize_one(parsed: ParsedPathway) -> Result<NormalizedPathway, (String, String)> {
    let ParsedPathway {
        pathway_id,
        name,
        source,
        nodes,
        edges,
        classes,
    } = parsed;

    let mut node_map: HashMap<NodeId, Node> = HashMap::with_capacity(nodes.len());
    for node in nodes {
        if node_map.insert(node.node_id.clone(), node).is_some() {
            return Err((
                pathway_id.to_string(),
                "duplicate node id within pathway".to_string(),
            ));
        }
    }

    let mut edge_map: HashMap<crate::ids::EdgeId, Edge> = HashMap::with_capacity(edges.len());
    for edge in edges {
        if !node_map.contains_key(&edge.src) || !node_map.contains_key(&edge.dst) {
            return Err((
                pathway_id.to_string(),
                format!("edge {} references a node outside this pathway", edge.edge_id),
            ));
        }
        if edge_map.insert(edge.edge_id.clone(), edge).is_some() {
            return Err((pathway_id.to_string(), "duplicate edge id within pathway".to_string()));
        }
    }

    let mut warnings = Vec::new();
    let mut memo: HashMap<NodeId, Candidates> = HashMap::new();
    let group_ids: Vec<NodeId> = node_map
        .iter()
        .filter(|(_, n)| n.node_type == NodeType::Group)
        .map(|(id, _)| id.clone())
        .collect();
    for group_id in &group_ids {
        let mut stack = HashSet::new();
        let resolved = resolve_candidates(group_id, &node_map, &mut memo, &mut stack, &mut warnings);
        if let Some(node) = node_map.get_mut(group_id) {
            node.candidates = resolved;
        }
    }

    let edge_list: Vec<Edge> = edge_map.values().cloned().collect();
    let adjacency = undirected_adjacency(&edge_list);
    for (node_id, neighbors) in &adjacency {
        if let Some(node) = node_map.get_mut(node_id) {
            node.degree = neighbors.len();
        }
    }

    let pairs1 = build_pairs1(&adjacency);
    let pairs2 = build_pairs2(&adjacency);

    let mut node_ids: Vec<NodeId> = node_map.keys().cloned().collect();
    node_ids.sort();
    let mut edge_ids: Vec<crate::ids::EdgeId> = edge_map.keys().cloned().collect();
    edge_ids.sort();

    let pathway = Pathway {
        pathway_id: pathway_id.clone(),
        name,
        source,
        node_count: node_ids.len(),
        edge_count: edge_ids.len(),
        node_ids,
        edge_ids,
        pairs1,
        pairs2,
        classes,
    };

    Ok(NormalizedPathway {
        pathway,
        nodes: node_map.into_values().collect(),
        edges: edge_list,
        warnings,
    })
}

/// Normalize a whole batch of parsed pathways into one [`Index`].
///
/// Pathways normalize independently and in parallel; a pathway that
/// fails (structurally malformed, or colliding with an id already
/// claimed by an earlier pathway in this same batch) is recorded in
/// `meta.failures` and excluded from the index rather than aborting the
/// whole build.
pub fn normalize_pathways(
    parsed: Vec<ParsedPathway>,
    source: Source,
    organism_code: &str,
    parser_version: i64,
    created_at: chrono::DateTime<Utc>,
) -> NormalizeOutcome {
    let results: Vec<Result<NormalizedPathway, (String, String)>> =
        parsed.into_par_iter().map(normalize_one).collect();

    let mut pathways = Vec::new();
    let mut nodes: BTreeMap<NodeId, Node> = BTreeMap::new();
    let mut edges: BTreeMap<crate::ids::EdgeId, Edge> = BTreeMap::new();
    let mut failures = Vec::new();
    let mut warnings = Vec::new();

    for result in results {
        match result {
            Err((pathway_id, reason)) => failures.push(BuildFailure { pathway_id, reason }),
            Ok(normalized) => {
                warnings.extend(normalized.warnings);
                let mut collided = false;
                for node in &normalized.nodes {
                    if nodes.contains_key(&node.node_id) {
                        collided = true;
                        break;
                    }
                }
                for edge in &normalized.edges {
                    if edges.contains_key(&edge.edge_id) {
                        collided = true;
                        break;
                    }
                }
                if collided {
                    failures.push(BuildFailure {
                        pathway_id: normalized.pathway.pathway_id.to_string(),
                        reason: "node or edge id collides with an earlier pathway in this build"
                            .to_string(),
                    });
                    continue;
                }
                for node in normalized.nodes {
                    nodes.insert(node.node_id.clone(), node);
                }
                for edge in normalized.edges {
                    edges.insert(edge.edge_id.clone(), edge);
                }
                pathways.push(normalized.pathway);
            }
        }
    }

    pathways.sort_by(|a, b| a.pathway_id.cmp(&b.pathway_id));

    let stats = IndexStats {
        pathway_count: pathways.len(),
        node_count: nodes.len(),
        edge_count: edges.len(),
        failure_count: failures.len(),
    };

    let meta = IndexMeta {
        schema_version: SCHEMA_VERSION,
        parser_version,
        source,
        organism_code: organism_code.to_string(),
        created_at,
        stats,
        failures,
    };

    NormalizeOutcome {
        index: Index { meta, pathways, nodes, edges },
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::EdgeId;
    use crate::model::NodeBuilder;

    fn node(pid: &PathwayId, local: &str, ty: NodeType) -> Node {
        NodeBuilder::new(NodeId::new(pid, local), pid.clone(), ty)
            .label(local.to_string())
            .build()
            .unwrap()
    }

    fn edge(pid: &PathwayId, id: &str, a: &str, b: &str, directed: bool) -> Edge {
        Edge {
            edge_id: EdgeId::new(pid, id),
            pathway_id: pid.clone(),
            src: NodeId::new(pid, a),
            dst: NodeId::new(pid, b),
            directed,
            relation_type: "activation".to_string(),
            subtypes: vec![],
        }
    }

    #[test]
    fn degree_collapses_duplicate_and_opposite_edges() {
        let pid = PathwayId::new("p1");
        let nodes = vec![
            node(&pid, "a", NodeType::ProteinLike),
            node(&pid, "b", NodeType::ProteinLike),
        ];
        let edges = vec![
            edge(&pid, "e1", "a", "b", true),
            edge(&pid, "e2", "b", "a", true),
        ];
        let parsed = ParsedPathway {
            pathway_id: pid.clone(),
            name: "p".to_string(),
            source: Source::Primary,
            nodes,
            edges,
            classes: None,
        };
        let outcome = normalize_pathways(vec![parsed], Source::Primary, "hsa", 1, Utc::now());
        let a = outcome.index.node(&NodeId::new(&pid, "a")).unwrap();
        assert_eq!(a.degree, 1);
        assert_eq!(outcome.index.pathways[0].pairs1.len(), 1);
    }

    #[test]
    fn group_cycle_yields_empty_candidates_not_abort() {
        let pid = PathwayId::new("p1");
        let g1 = NodeBuilder::new(NodeId::new(&pid, "g1"), pid.clone(), NodeType::Group)
            .components(vec![NodeId::new(&pid, "g2")])
            .build()
            .unwrap();
        let g2 = NodeBuilder::new(NodeId::new(&pid, "g2"), pid.clone(), NodeType::Group)
            .components(vec![NodeId::new(&pid, "g1")])
            .build()
            .unwrap();
        let parsed = ParsedPathway {
            pathway_id: pid.clone(),
            name: "p".to_string(),
            source: Source::Primary,
            nodes: vec![g1, g2],
            edges: vec![],
            classes: None,
        };
        let outcome = normalize_pathways(vec![parsed], Source::Primary, "hsa", 1, Utc::now());
        assert!(outcome.index.meta.failures.is_empty());
        assert!(!outcome.warnings.is_empty());
        let g1 = outcome.index.node(&NodeId::new(&pid, "g1")).unwrap();
        assert!(g1.candidates.is_empty());
    }

    #[test]
    fn pairs2_counts_distinct_bridges() {
        let pid = PathwayId::new("p1");
        let nodes = vec![
            node(&pid, "a", NodeType::ProteinLike),
            node(&pid, "b", NodeType::ProteinLike),
            node(&pid, "c", NodeType::ProteinLike),
            node(&pid, "m", NodeType::ProteinLike),
        ];
        let edges = vec![
            edge(&pid, "e1", "a", "m", false),
            edge(&pid, "e2", "b", "m", false),
            edge(&pid, "e3", "c", "m", false),
        ];
        let parsed = ParsedPathway {
            pathway_id: pid.clone(),
            name: "p".to_string(),
            source: Source::Primary,
            nodes,
            edges,
            classes: None,
        };
        let outcome = normalize_pathways(vec![parsed], Source::Primary, "hsa", 1, Utc::now());
        let pairs2 = &outcome.index.pathways[0].pairs2;
        assert_eq!(pairs2.len(), 3); // (a,b) (a,c) (b,c), each bridged once by m
        assert!(pairs2.iter().all(|p| p.bridge_count == 1));
    }
}
