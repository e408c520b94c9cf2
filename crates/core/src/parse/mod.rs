//! Pathway document parsers.
//!
//! Each source dialect gets its own submodule ([`source_a`] for the
//! KGML-like format, [`source_b`] for the GPML-like format) but they
//! share the output shape defined here: a [`ParsedPathway`] is exactly
//! the per-pathway slice of the uniform graph representation the Index
//! Normalizer (§4.E) will later stitch into a global [`crate::model::Index`].
//!
//! Parsers resolve non-group node candidates through the [`MappingTable`]
//! as they go (§4.C/§4.D); group candidates are left empty here and
//! filled in by the normalizer's component-union walk (§4.E point 2).

pub mod source_a;
pub mod source_b;

use crate::ids::{PathwayId, Source};
use crate::model::{Edge, Node};
use serde::{Deserialize, Serialize};

/// One successfully parsed pathway, ready for the normalizer.
///
/// Serializable so the builder can cache a parse result on disk keyed
/// by a hash of the source document (§6, "cache directory layout").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedPathway {
    pub pathway_id: PathwayId,
    pub name: String,
    pub source: Source,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub classes: Option<Vec<String>>,
}
