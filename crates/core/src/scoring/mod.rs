//! Evidence Scorer: evidence aggregation (§4.G), per-node scoring
//! (§4.H), and pathway ranking (§4.I).

pub mod aggregator;
pub mod node_scorer;
pub mod ranker;
pub mod weights;

pub use aggregator::{ColumnMapping, EvidenceTable, ProteinEvidence, RegSite};
pub use node_scorer::NodeState;
pub use ranker::{rank, score_pathway, PairContribution1, PairContribution2, PathwayScore};
pub use weights::Weights;
