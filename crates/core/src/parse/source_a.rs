//! Source-A parser: a KGML-like pathway dialect.
//!
//! Per pathway: `entry` elements (typed, with a whitespace-separated
//! `name` attribute carrying one or more namespace-prefixed identifier
//! tokens), `relation` elements (typed, with `subtype` children that
//! encode the edge's biological relation and line style), and `group`
//! entries whose members are declared via `component` sub-elements.

use crate::error::{CoreError, Result};
use crate::ids::{tokenize_prefixed_name, EdgeId, NodeId, PathwayId, Source};
use crate::mapping::MappingTable;
use crate::model::{Candidates, Edge, NodeBuilder, NodeType};
use crate::parse::ParsedPathway;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;

fn attr(tag: &BytesStart, name: &str) -> Option<String> {
    tag.attributes().flatten().find_map(|a| {
        if a.key.as_ref() == name.as_bytes() {
            Some(String::from_utf8_lossy(&a.value).into_owned())
        } else {
            None
        }
    })
}

fn node_type_for(entry_type: &str) -> NodeType {
    match entry_type {
        "gene" => NodeType::ProteinLike,
        "compound" => NodeType::Metabolite,
        "group" => NodeType::Group,
        "map" => NodeType::PathwayReference,
        _ => NodeType::Other,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineStyle {
    Arrow,
    DashedArrow,
    Inhibition,
    Line,
    DashedLine,
}

struct SubtypeInfo {
    token: String,
    #[allow(dead_code)]
    line_style: LineStyle,
    force_undirected: bool,
    compound_entry_id: Option<String>,
}

/// Classify one `<subtype name=".." value="..">` child per §4.C: the
/// `value` selects a line style (and, for `+p`/`-p`, overrides the
/// relation token to phosphorylation/dephosphorylation); `binding` /
/// `association` subtypes force an undirected `line`-style edge;
/// `compound` with a numeric value identifies the intermediate entry id
/// for edge splitting.
fn classify_subtype(name: &str, value: &str) -> SubtypeInfo {
    let lname = name.trim().to_ascii_lowercase();
    let value = value.trim();

    let line_style = match value {
        "-->" => LineStyle::Arrow,
        "..>" => LineStyle::DashedArrow,
        "--|" => LineStyle::Inhibition,
        "---" => LineStyle::Line,
        "-+-" => LineStyle::DashedLine,
        _ => LineStyle::Arrow,
    };

    let is_binding = matches!(lname.as_str(), "binding/association" | "binding" | "association");
    let is_compound = lname == "compound";

    let token = if value == "+p" {
        "phosphorylation".to_string()
    } else if value == "-p" {
        "dephosphorylation".to_string()
    } else if is_binding {
        "binding_association".to_string()
    } else if lname.is_empty() {
        "relation".to_string()
    } else {
        lname.replace([' ', '/'], "_")
    };

    let compound_entry_id = if is_compound {
        Some(value.to_string()).filter(|v| v.chars().all(|c| c.is_ascii_digit()))
    } else {
        None
    };

    SubtypeInfo {
        token,
        line_style: if is_binding { LineStyle::Line } else { line_style },
        force_undirected: is_binding,
        compound_entry_id,
    }
}

struct RawEntry {
    id: String,
    entry_type: String,
    name: String,
    label: Option<String>,
    components: Vec<String>,
}

struct RawRelation {
    entry1: String,
    entry2: String,
    rel_type: String,
    subtypes: Vec<SubtypeInfo>,
}

/// Parse a KGML-like document into a single [`ParsedPathway`].
pub fn parse_str(
    xml: &str,
    default_pathway_id: &str,
    mapping: &MappingTable,
    include_classes: bool,
) -> Result<(ParsedPathway, Vec<String>)> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut pathway_id = default_pathway_id.to_string();
    let mut pathway_title = String::new();
    let mut classes: Vec<String> = Vec::new();

    let mut entries: Vec<RawEntry> = Vec::new();
    let mut relations: Vec<RawRelation> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();

    let mut current_entry: Option<RawEntry> = None;
    let mut current_relation: Option<RawRelation> = None;

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Eof) => break,
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                let local = e.local_name();
                let name = String::from_utf8_lossy(local.as_ref()).into_owned();
                match name.as_str() {
                    "pathway" => {
                        if let Some(id) = attr(&e, "name").or_else(|| attr(&e, "id")) {
                            pathway_id = id;
                        }
                        pathway_title = attr(&e, "title").unwrap_or_default();
                    }
                    "entry" => {
                        let id = attr(&e, "id").ok_or_else(|| CoreError::Parse {
                            unit: pathway_id.clone(),
                            message: "entry missing id".to_string(),
                        })?;
                        let entry_type = attr(&e, "type").unwrap_or_else(|| "other".to_string());
                        let entry_name = attr(&e, "name").unwrap_or_default();
                        current_entry = Some(RawEntry {
                            id,
                            entry_type,
                            name: entry_name,
                            label: None,
                            components: Vec::new(),
                        });
                    }
                    "graphics" => {
                        if let Some(entry) = current_entry.as_mut() {
                            if let Some(label) = attr(&e, "name") {
                                entry.label = Some(label);
                            }
                        }
                    }
                    "component" => {
                        if let Some(entry) = current_entry.as_mut() {
                            if let Some(cid) = attr(&e, "id") {
                                entry.components.push(cid);
                            }
                        }
                    }
                    "relation" => {
                        let entry1 = attr(&e, "entry1").ok_or_else(|| CoreError::Parse {
                            unit: pathway_id.clone(),
                            message: "relation missing entry1".to_string(),
                        })?;
                        let entry2 = attr(&e, "entry2").ok_or_else(|| CoreError::Parse {
                            unit: pathway_id.clone(),
                            message: "relation missing entry2".to_string(),
                        })?;
                        let rel_type = attr(&e, "type").unwrap_or_else(|| "relation".to_string());
                        current_relation = Some(RawRelation {
                            entry1,
                            entry2,
                            rel_type,
                            subtypes: Vec::new(),
                        });
                    }
                    "subtype" => {
                        if let Some(rel) = current_relation.as_mut() {
                            let sname = attr(&e, "name").unwrap_or_default();
                            let svalue = attr(&e, "value").unwrap_or_default();
                            rel.subtypes.push(classify_subtype(&sname, &svalue));
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::End(e)) => {
                let local = e.local_name();
                let name = String::from_utf8_lossy(local.as_ref()).into_owned();
                match name.as_str() {
                    "entry" => {
                        if let Some(entry) = current_entry.take() {
                            entries.push(entry);
                        }
                    }
                    "relation" => {
                        if let Some(rel) = current_relation.take() {
                            relations.push(rel);
                        }
                    }
                    _ => {}
                }
            }
            Ok(_) => {}
            Err(e) => {
                return Err(CoreError::Parse {
                    unit: pathway_id.clone(),
                    message: format!("XML error: {e}"),
                })
            }
        }
        buf.clear();
    }

    if include_classes && !pathway_title.is_empty() {
        classes.push(pathway_title.clone());
    }

    let pid = PathwayId::new(pathway_id.clone());
    let entry_by_id: HashMap<&str, &RawEntry> = entries.iter().map(|e| (e.id.as_str(), e)).collect();

    let mut nodes = Vec::with_capacity(entries.len());
    for raw in &entries {
        let node_type = node_type_for(&raw.entry_type);
        let node_id = NodeId::new(&pid, &raw.id);
        let label = raw.label.clone().unwrap_or_else(|| raw.name.clone());

        let mut candidates = Candidates::default();
        let components: Vec<NodeId> = if node_type == NodeType::Group {
            raw.components.iter().map(|c| NodeId::new(&pid, c)).collect()
        } else {
            for native in tokenize_prefixed_name(&raw.name) {
                let canonical = mapping.map(&native.namespace, &native.id);
                candidates.canonical_ids.extend(canonical);
                candidates.native_ids.insert(native);
            }
            if !label.is_empty() {
                candidates.labels.insert(label.clone());
            }
            Vec::new()
        };

        let node = NodeBuilder::new(node_id, pid.clone(), node_type)
            .label(label)
            .candidates(candidates)
            .components(components)
            .build()
            .map_err(|message| CoreError::Parse {
                unit: pathway_id.clone(),
                message,
            })?;
        nodes.push(node);
    }

    let mut edges = Vec::new();
    for (idx, rel) in relations.iter().enumerate() {
        if !entry_by_id.contains_key(rel.entry1.as_str()) || !entry_by_id.contains_key(rel.entry2.as_str()) {
            warnings.push(format!(
                "relation #{idx} references an unknown entry ({} -> {}); skipped",
                rel.entry1, rel.entry2
            ));
            continue;
        }

        let directed = !rel.subtypes.iter().any(|s| s.force_undirected);
        let subtype_tokens: Vec<String> = rel.subtypes.iter().map(|s| s.token.clone()).collect();
        let compound_id = rel.subtypes.iter().find_map(|s| s.compound_entry_id.clone());

        if let Some(compound_id) = compound_id {
            if !entry_by_id.contains_key(compound_id.as_str()) {
                warnings.push(format!(
                    "relation #{idx} names compound entry {compound_id} which does not exist; skipped"
                ));
                continue;
            }
            let left_id = EdgeId::new(&pid, &format!("r{idx}a"));
            let right_id = EdgeId::new(&pid, &format!("r{idx}b"));
            edges.push(Edge {
                edge_id: left_id,
                pathway_id: pid.clone(),
                src: NodeId::new(&pid, &rel.entry1),
                dst: NodeId::new(&pid, &compound_id),
                directed,
                relation_type: rel.rel_type.to_ascii_lowercase(),
                subtypes: subtype_tokens.clone(),
            });
            edges.push(Edge {
                edge_id: right_id,
                pathway_id: pid.clone(),
                src: NodeId::new(&pid, &compound_id),
                dst: NodeId::new(&pid, &rel.entry2),
                directed,
                relation_type: rel.rel_type.to_ascii_lowercase(),
                subtypes: subtype_tokens,
            });
        } else {
            let edge_id = EdgeId::new(&pid, &format!("r{idx}"));
            edges.push(Edge {
                edge_id,
                pathway_id: pid.clone(),
                src: NodeId::new(&pid, &rel.entry1),
                dst: NodeId::new(&pid, &rel.entry2),
                directed,
                relation_type: rel.rel_type.to_ascii_lowercase(),
                subtypes: subtype_tokens,
            });
        }
    }

    let parsed = ParsedPathway {
        pathway_id: pid,
        name: if pathway_title.is_empty() {
            pathway_id
        } else {
            pathway_title
        },
        source: Source::Primary,
        nodes,
        edges,
        classes: if classes.is_empty() { None } else { Some(classes) },
    };
    Ok((parsed, warnings))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0"?>
<pathway name="path:hsa00010" org="hsa" number="00010" title="Glycolysis">
  <entry id="1" name="hsa:207+208" type="gene">
    <graphics name="AKT1, AKT2"/>
  </entry>
  <entry id="2" name="hsa:5594" type="gene">
    <graphics name="MAPK1"/>
  </entry>
  <entry id="3" name="undefined" type="group">
    <graphics name="group"/>
    <component id="1"/>
    <component id="2"/>
  </entry>
  <entry id="42" name="cpd:C00165" type="compound">
    <graphics name="Diacylglycerol"/>
  </entry>
  <relation entry1="1" entry2="2" type="PPrel">
    <subtype name="activation" value="-->"/>
  </relation>
  <relation entry1="1" entry2="2" type="PPrel">
    <subtype name="compound" value="42"/>
  </relation>
</pathway>
"#;

    #[test]
    fn parses_entries_and_groups() {
        let mapping = MappingTable::default();
        let (pathway, warnings) = parse_str(SAMPLE, "hsa00010", &mapping, false).unwrap();
        assert!(warnings.is_empty());
        assert_eq!(pathway.nodes.len(), 4);
        let group = pathway
            .nodes
            .iter()
            .find(|n| n.node_type == NodeType::Group)
            .unwrap();
        assert_eq!(group.components.len(), 2);
    }

    #[test]
    fn compound_relation_splits_into_two_edges() {
        let mapping = MappingTable::default();
        let (pathway, _) = parse_str(SAMPLE, "hsa00010", &mapping, false).unwrap();
        let compound_edges: Vec<_> = pathway
            .edges
            .iter()
            .filter(|e| e.subtypes.contains(&"compound".to_string()))
            .collect();
        assert_eq!(compound_edges.len(), 2);
        assert_eq!(compound_edges[0].dst.as_str(), "hsa00010:42");
        assert_eq!(compound_edges[1].src.as_str(), "hsa00010:42");
    }

    #[test]
    fn plain_relation_is_directed_single_edge() {
        let mapping = MappingTable::default();
        let (pathway, _) = parse_str(SAMPLE, "hsa00010", &mapping, false).unwrap();
        let activation = pathway
            .edges
            .iter()
            .find(|e| e.subtypes.contains(&"activation".to_string()))
            .unwrap();
        assert!(activation.directed);
    }

    #[test]
    fn tokenizes_plus_joined_gene_ids() {
        let mapping = MappingTable::default();
        let (pathway, _) = parse_str(SAMPLE, "hsa00010", &mapping, false).unwrap();
        let entry1 = pathway.nodes.iter().find(|n| n.node_id.as_str() == "hsa00010:1").unwrap();
        assert_eq!(entry1.candidates.native_ids.len(), 2);
    }

    #[test]
    fn binding_association_is_undirected() {
        let xml = r#"<pathway name="p" title="t">
          <entry id="1" name="hsa:1" type="gene"/>
          <entry id="2" name="hsa:2" type="gene"/>
          <relation entry1="1" entry2="2" type="PPrel">
            <subtype name="binding/association" value="---"/>
          </relation>
        </pathway>"#;
        let mapping = MappingTable::default();
        let (pathway, _) = parse_str(xml, "p", &mapping, false).unwrap();
        assert!(!pathway.edges[0].directed);
    }
}
