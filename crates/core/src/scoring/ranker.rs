//! Pathway Ranker (§4.I): combines per-node scores with the pair
//! tables into one final score per pathway, then totally orders every
//! pathway across every loaded index.

use crate::ids::{NodeId, PathwayId, Source};
use crate::model::Pathway;
use crate::scoring::node_scorer::NodeState;
use crate::scoring::weights::Weights;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairContribution1 {
    pub a: NodeId,
    pub b: NodeId,
    pub contribution: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairContribution2 {
    pub a: NodeId,
    pub b: NodeId,
    pub bridge_count: usize,
    pub contribution: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathwayScore {
    pub pathway_id: PathwayId,
    pub source: Source,
    pub name: String,
    pub connection_score: f64,
    pub node_mass: f64,
    pub final_score: f64,
    pub top_pairs1: Vec<PairContribution1>,
    pub top_pairs2: Vec<PairContribution2>,
}

fn node_score_of(states: &BTreeMap<NodeId, NodeState>, id: &NodeId) -> Option<&NodeState> {
    states.get(id)
}

/// Score one pathway. A pathway with no eligible pairs and no scored
/// nodes is not an error: it scores `0` and is still returned (§4.I,
/// "Failure semantics").
pub fn score_pathway(pathway: &Pathway, states: &BTreeMap<NodeId, NodeState>, weights: &Weights) -> PathwayScore {
    let mut conn1 = 0.0;
    let mut contributions1 = Vec::new();
    for pair in &pathway.pairs1 {
        let (Some(sa), Some(sb)) = (node_score_of(states, &pair.a), node_score_of(states, &pair.b)) else {
            continue;
        };
        if sa.node_has_reg && sb.node_has_reg {
            let contribution = sa.node_score * sb.node_score;
            conn1 += contribution;
            contributions1.push(PairContribution1 {
                a: pair.a.clone(),
                b: pair.b.clone(),
                contribution,
            });
        }
    }

    let mut conn2 = 0.0;
    let mut contributions2 = Vec::new();
    for pair in &pathway.pairs2 {
        let (Some(sa), Some(sb)) = (node_score_of(states, &pair.a), node_score_of(states, &pair.b)) else {
            continue;
        };
        if sa.node_has_reg && sb.node_has_reg {
            let bridge_weight = weights.two_hop_base * (1.0 + pair.bridge_count as f64).ln();
            let contribution = sa.node_score * sb.node_score * bridge_weight;
            conn2 += contribution;
            contributions2.push(PairContribution2 {
                a: pair.a.clone(),
                b: pair.b.clone(),
                bridge_count: pair.bridge_count,
                contribution,
            });
        }
    }

    let connection_score = if pathway.node_count > 0 {
        (conn1 + weights.conn2_weight * conn2) / (pathway.node_count as f64).powf(weights.alpha)
    } else {
        0.0
    };

    let mut nonzero_scores: Vec<f64> = pathway
        .node_ids
        .iter()
        .filter_map(|id| states.get(id))
        .map(|s| s.node_score)
        .filter(|&s| s > 0.0)
        .collect();
    nonzero_scores.sort_by(|a, b| b.partial_cmp(a).unwrap());
    nonzero_scores.truncate(weights.node_mass_top_k);
    let node_mass = if nonzero_scores.is_empty() {
        0.0
    } else {
        nonzero_scores.iter().sum::<f64>() / nonzero_scores.len() as f64
    };

    let final_score = connection_score + weights.node_mass_weight * node_mass;

    contributions1.sort_by(|x, y| {
        y.contribution
            .partial_cmp(&x.contribution)
            .unwrap()
            .then_with(|| (x.a.clone(), x.b.clone()).cmp(&(y.a.clone(), y.b.clone())))
    });
    contributions1.truncate(weights.top_edges_n);

    contributions2.sort_by(|x, y| {
        y.contribution
            .partial_cmp(&x.contribution)
            .unwrap()
            .then_with(|| (x.a.clone(), x.b.clone()).cmp(&(y.a.clone(), y.b.clone())))
    });
    contributions2.truncate(weights.top_edges_n);

    PathwayScore {
        pathway_id: pathway.pathway_id.clone(),
        source: pathway.source,
        name: pathway.name.clone(),
        connection_score,
        node_mass,
        final_score,
        top_pairs1: contributions1,
        top_pairs2: contributions2,
    }
}

/// Total, reproducible order over every pathway in every loaded index:
/// `(-final_score, source, pathway_id)`.
pub fn rank(mut scores: Vec<PathwayScore>) -> Vec<PathwayScore> {
    scores.sort_by(|a, b| {
        b.final_score
            .partial_cmp(&a.final_score)
            .unwrap()
            .then_with(|| a.source.cmp(&b.source))
            .then_with(|| a.pathway_id.cmp(&b.pathway_id))
    });
    scores
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Pair1, Pair2};
    use crate::scoring::node_scorer::NodeState;

    fn pathway_abc() -> Pathway {
        let pid = PathwayId::new("p1");
        let a = NodeId::new(&pid, "A");
        let b = NodeId::new(&pid, "B");
        let c = NodeId::new(&pid, "C");
        Pathway {
            pathway_id: pid,
            name: "abc".to_string(),
            source: Source::Primary,
            node_ids: vec![a.clone(), b.clone(), c.clone()],
            edge_ids: vec![],
            pairs1: vec![
                Pair1 { a: a.clone(), b: b.clone() },
                Pair1 { a: b.clone(), b: c.clone() },
            ],
            pairs2: vec![Pair2 { a, b: c, bridge_count: 1 }],
            node_count: 3,
            edge_count: 2,
            classes: None,
        }
    }

    fn state(id: &NodeId, score: f64, has_reg: bool) -> (NodeId, NodeState) {
        (
            id.clone(),
            NodeState {
                node_id: id.clone(),
                node_score: score,
                node_has_reg: has_reg,
                representative_canonical_id: None,
                rep_top_reg_sites: vec![],
            },
        )
    }

    #[test]
    fn scenario_s1_matches_worked_example() {
        let pathway = pathway_abc();
        let a = pathway.node_ids[0].clone();
        let b = pathway.node_ids[1].clone();
        let c = pathway.node_ids[2].clone();
        let states: BTreeMap<NodeId, NodeState> =
            [state(&a, 1.0, true), state(&b, 0.5, true), state(&c, 1.0, true)].into_iter().collect();
        let weights = Weights::default();
        let score = score_pathway(&pathway, &states, &weights);
        assert!((score.connection_score - 0.857).abs() < 0.01);
        assert!((score.node_mass - 0.8333).abs() < 0.001);
        assert!((score.final_score - 1.024).abs() < 0.01);
    }

    #[test]
    fn scenario_s2_ungated_middle_node_drops_pairs1() {
        let pathway = pathway_abc();
        let a = pathway.node_ids[0].clone();
        let b = pathway.node_ids[1].clone();
        let c = pathway.node_ids[2].clone();
        let states: BTreeMap<NodeId, NodeState> =
            [state(&a, 1.0, true), state(&b, 0.5, false), state(&c, 1.0, true)].into_iter().collect();
        let weights = Weights::default();
        let score = score_pathway(&pathway, &states, &weights);
        assert!((score.final_score - 0.447).abs() < 0.01);
    }

    #[test]
    fn zero_eligible_pairs_scores_zero_not_error() {
        let pid = PathwayId::new("empty");
        let pathway = Pathway {
            pathway_id: pid,
            name: "empty".to_string(),
            source: Source::Primary,
            node_ids: vec![],
            edge_ids: vec![],
            pairs1: vec![],
            pairs2: vec![],
            node_count: 0,
            edge_count: 0,
            classes: None,
        };
        let score = score_pathway(&pathway, &BTreeMap::new(), &Weights::default());
        assert_eq!(score.final_score, 0.0);
    }

    #[test]
    fn global_rank_orders_by_score_then_source_then_id() {
        let mut a = score_pathway(&pathway_abc(), &BTreeMap::new(), &Weights::default());
        a.final_score = 1.0;
        a.pathway_id = PathwayId::new("p2");
        let mut b = score_pathway(&pathway_abc(), &BTreeMap::new(), &Weights::default());
        b.final_score = 2.0;
        b.pathway_id = PathwayId::new("p1");
        let ranked = rank(vec![a, b]);
        assert_eq!(ranked[0].pathway_id.as_str(), "p1");
    }
}
