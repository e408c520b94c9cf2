//! Identifier types and the pure tokenization / normalization helpers
//! shared by the parsers, the mapping table, and the scorers.
//!
//! Kept separate from [`crate::model`] because these are value types and
//! free functions with no graph semantics of their own — callers outside
//! the parsers (the node scorer, in particular) also need the canonical-id
//! regex and the UniProt normalization rule.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Which of the two upstream pathway sources a pathway or node came from.
///
/// Identifier namespaces of the two sources never overlap by
/// construction, but both can produce a pathway with the same short key,
/// so every pathway record carries this tag to disambiguate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// The KGML-like dialect (source A).
    Primary,
    /// The GPML-like dialect (source B).
    Secondary,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Source::Primary => "primary",
            Source::Secondary => "secondary",
        })
    }
}

/// An opaque, source-local pathway identifier (e.g. `"hsa04010"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathwayId(pub String);

impl PathwayId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PathwayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PathwayId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for PathwayId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Globally unique node identifier of the form `<pathway-id>:<local-entry-id>`.
///
/// Stable across rebuilds for the same input because `local_entry_id` is
/// taken verbatim from the source document (the KGML `id` attribute, or
/// the GPML `GraphId`), never reassigned by this crate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    /// Build a node id from its owning pathway and the source's local
    /// entry identifier.
    pub fn new(pathway_id: &PathwayId, local_entry_id: &str) -> Self {
        Self(format!("{}:{}", pathway_id.as_str(), local_entry_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The pathway id embedded in this node id (the portion before the
    /// first `:`).
    pub fn pathway_id(&self) -> PathwayId {
        match self.0.split_once(':') {
            Some((p, _)) => PathwayId::new(p),
            None => PathwayId::new(self.0.as_str()),
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Globally unique edge identifier, analogous to [`NodeId`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(pub String);

impl EdgeId {
    pub fn new(pathway_id: &PathwayId, local_edge_id: &str) -> Self {
        Self(format!("{}:{}", pathway_id.as_str(), local_edge_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A raw `(database-namespace, native-id)` pair exactly as declared by a
/// source document, before any mapping-table resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NativeId {
    pub namespace: String,
    pub id: String,
}

impl NativeId {
    pub fn new(namespace: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            id: id.into(),
        }
    }
}

/// Tokenize a source-A `name` attribute into `(namespace, id)` pairs.
///
/// KGML-like `name` attributes are whitespace-separated token lists where
/// a leading `namespace:` prefix on one token applies to every later bare
/// token until a new namespace prefix appears, e.g. `"hsa:207 hsa:208"` or
/// `"hsa:207+208"` (joined tokens may contain `+`, which this function
/// also splits on). Order is preserved and duplicates are removed.
pub fn tokenize_prefixed_name(name: &str) -> Vec<NativeId> {
    let mut out = Vec::new();
    let mut seen = std::collections::HashSet::new();
    let mut current_ns: Option<String> = None;

    for ws_token in name.split_whitespace() {
        for token in ws_token.split('+') {
            if token.is_empty() {
                continue;
            }
            let (ns, id) = match token.split_once(':') {
                Some((ns, id)) if !ns.is_empty() => {
                    current_ns = Some(ns.to_string());
                    (ns.to_string(), id.to_string())
                }
                _ => match &current_ns {
                    Some(ns) => (ns.clone(), token.to_string()),
                    None => ("unknown".to_string(), token.to_string()),
                },
            };
            if id.is_empty() {
                continue;
            }
            let pair = NativeId::new(ns, id);
            if seen.insert(pair.clone()) {
                out.push(pair);
            }
        }
    }
    out
}

/// Matches the canonical protein identifier shape: 6-10 uppercase
/// alphanumeric characters, optionally followed by a `-n` isoform suffix.
pub fn looks_like_canonical_id(token: &str) -> bool {
    canonical_id_regex().is_match(token)
}

fn canonical_id_regex() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"^[A-Z0-9]{6,10}(-[0-9]+)?$").unwrap())
}

/// Normalize a raw UniProt-style accession token per §4.G: upper-case,
/// take the first token when the cell contains a delimited list, and
/// separate any `-n` isoform suffix from the base accession.
///
/// Returns `(exact_token, base_token)` where `base_token` is `None` when
/// there was no isoform suffix to strip (i.e. it would equal `exact_token`).
pub fn normalize_uniprot_cell(cell: &str) -> Option<(String, Option<String>)> {
    let first = cell
        .split(|c: char| matches!(c, ',' | ';' | '|') || c.is_whitespace())
        .find(|s| !s.is_empty())?;
    let upper = first.to_ascii_uppercase();
    let base = upper.split_once('-').map(|(b, _)| b.to_string());
    Some((upper, base))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_id_roundtrip() {
        let p = PathwayId::new("hsa04010");
        let n = NodeId::new(&p, "42");
        assert_eq!(n.as_str(), "hsa04010:42");
        assert_eq!(n.pathway_id(), p);
    }

    #[test]
    fn tokenize_single_prefix_sticks() {
        let toks = tokenize_prefixed_name("hsa:207 208");
        assert_eq!(
            toks,
            vec![NativeId::new("hsa", "207"), NativeId::new("hsa", "208")]
        );
    }

    #[test]
    fn tokenize_plus_joined() {
        let toks = tokenize_prefixed_name("hsa:207+208");
        assert_eq!(
            toks,
            vec![NativeId::new("hsa", "207"), NativeId::new("hsa", "208")]
        );
    }

    #[test]
    fn tokenize_namespace_switch() {
        let toks = tokenize_prefixed_name("GeneID:2475 Ensembl:ENSG00000012048");
        assert_eq!(
            toks,
            vec![
                NativeId::new("GeneID", "2475"),
                NativeId::new("Ensembl", "ENSG00000012048"),
            ]
        );
    }

    #[test]
    fn tokenize_dedup_preserves_order() {
        let toks = tokenize_prefixed_name("hsa:1 hsa:2 hsa:1");
        assert_eq!(toks, vec![NativeId::new("hsa", "1"), NativeId::new("hsa", "2")]);
    }

    #[test]
    fn canonical_id_regex_matches() {
        assert!(looks_like_canonical_id("P01234"));
        assert!(looks_like_canonical_id("Q9Y6K9-2"));
        assert!(!looks_like_canonical_id("p01234"));
        assert!(!looks_like_canonical_id("short"));
    }

    #[test]
    fn uniprot_normalization() {
        let (exact, base) = normalize_uniprot_cell("q9y6k9-2; p01234").unwrap();
        assert_eq!(exact, "Q9Y6K9-2");
        assert_eq!(base.as_deref(), Some("Q9Y6K9"));

        let (exact2, base2) = normalize_uniprot_cell("P01234").unwrap();
        assert_eq!(exact2, "P01234");
        assert_eq!(base2, None);
    }
}
