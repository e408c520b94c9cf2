//! # pathway-index-core
//!
//! Builds a uniform pathway graph index from two independent pathway
//! description dialects, resolves native identifiers to a canonical
//! protein identifier space, and scores/ranks pathways against
//! user-supplied proteomic and phosphoproteomic evidence.
//!
//! See the project README for the CLI surface; this crate has no
//! direct I/O beyond the fetch cache, the index persister, and tabular
//! file readers — parsing, normalization, aggregation, scoring, and
//! ranking are pure functions over in-memory data.

pub mod error;
pub mod fetch;
pub mod ids;
pub mod mapping;
pub mod model;
pub mod normalize;
pub mod parse;
pub mod persist;
pub mod scoring;
pub mod tabular;
pub mod worker;

pub use error::{CoreError, Result};
pub use ids::{EdgeId, NativeId, NodeId, PathwayId, Source};
pub use mapping::MappingTable;
pub use model::{Candidates, Edge, Index, IndexMeta, Node, NodeBuilder, NodeType, Pathway};
pub use worker::{CancelledError, LoopReporter, NoopMonitor, ProgressMonitor};
