//! Source-B parser: a GPML-like pathway dialect.
//!
//! Per pathway: `DataNode` elements (each with a single `Xref` child
//! naming its native database and id, and an optional `GroupRef` back
//! link to a `Group` element), `Interaction` elements whose `Graphics`
//! child lists ordered `Point`s determining endpoints and arrow-head
//! directionality, and `Label`/`Shape` elements retained for lossless
//! round-tripping but never scored.
//!
//! The namespace prefix on element names (if any) is tolerated: lookups
//! go by local name only, so `gpml:DataNode` and `DataNode` parse
//! identically.

use crate::error::{CoreError, Result};
use crate::ids::{EdgeId, NativeId, NodeId, PathwayId, Source};
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

fn node_type_for(gpml_type: &str) -> NodeType {
    match gpml_type {
        "GeneProduct" | "Protein" | "Rna" => NodeType::ProteinLike,
        "Metabolite" => NodeType::Metabolite,
        "Pathway" => NodeType::PathwayReference,
        _ => NodeType::Other,
    }
}

struct RawDataNode {
    graph_id: String,
    text_label: String,
    gpml_type: String,
    group_ref: Option<String>,
    xref: Option<(String, String)>,
}

struct RawGroup {
    graph_id: String,
}

struct RawTextNode {
    graph_id: String,
    text_label: String,
}

struct RawPoint {
    graph_ref: Option<String>,
    arrow_head: Option<String>,
}

struct RawInteraction {
    points: Vec<RawPoint>,
    broken: bool,
}

/// Parse a GPML-like document into a single [`ParsedPathway`].
///
/// Returns `CoreError::Parse` (non-fatal at the build-level caller) when
/// the document contains no `DataNode` carrying an `Xref`, per §4.D's
/// soft-failure rule.
pub fn parse_str(
    xml: &str,
    default_pathway_id: &str,
    mapping: &MappingTable,
) -> Result<(ParsedPathway, Vec<String>)> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut pathway_id = default_pathway_id.to_string();
    let mut pathway_name = String::new();

    let mut data_nodes: Vec<RawDataNode> = Vec::new();
    let mut groups: Vec<RawGroup> = Vec::new();
    let mut text_nodes: Vec<RawTextNode> = Vec::new();
    let mut interactions: Vec<RawInteraction> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();

    let mut current_data_node: Option<RawDataNode> = None;
    let mut current_interaction: Option<RawInteraction> = None;
    let mut in_graphics_of_interaction = false;
    let mut synthetic_text_counter = 0usize;

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Eof) => break,
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                let local = e.local_name();
                let name = String::from_utf8_lossy(local.as_ref()).into_owned();
                match name.as_str() {
                    "Pathway" => {
                        pathway_name = attr(&e, "Name").unwrap_or_default();
                    }
                    "DataNode" => {
                        let graph_id = attr(&e, "GraphId").unwrap_or_else(|| {
                            synthetic_text_counter += 1;
                            format!("dn{synthetic_text_counter}")
                        });
                        current_data_node = Some(RawDataNode {
                            graph_id,
                            text_label: attr(&e, "TextLabel").unwrap_or_default(),
                            gpml_type: attr(&e, "Type").unwrap_or_else(|| "Unknown".to_string()),
                            group_ref: attr(&e, "GroupRef"),
                            xref: None,
                        });
                    }
                    "Xref" => {
                        if let Some(dn) = current_data_node.as_mut() {
                            let db = attr(&e, "Database").unwrap_or_default();
                            let id = attr(&e, "ID").unwrap_or_default();
                            if !id.is_empty() {
                                dn.xref = Some((db, id));
                            }
                        }
                    }
                    "Group" => {
                        if let Some(graph_id) = attr(&e, "GraphId") {
                            groups.push(RawGroup { graph_id });
                        }
                    }
                    "Label" | "Shape" => {
                        synthetic_text_counter += 1;
                        let graph_id = attr(&e, "GraphId")
                            .unwrap_or_else(|| format!("text{synthetic_text_counter}"));
                        text_nodes.push(RawTextNode {
                            graph_id,
                            text_label: attr(&e, "TextLabel").unwrap_or_default(),
                        });
                    }
                    "Interaction" => {
                        current_interaction = Some(RawInteraction {
                            points: Vec::new(),
                            broken: false,
                        });
                    }
                    "Graphics" => {
                        if current_interaction.is_some() {
                            in_graphics_of_interaction = true;
                        }
                    }
                    "Point" => {
                        if let Some(inter) = current_interaction.as_mut() {
                            if in_graphics_of_interaction {
                                inter.points.push(RawPoint {
                                    graph_ref: attr(&e, "GraphRef"),
                                    arrow_head: attr(&e, "ArrowHead"),
                                });
                            }
                        }
                    }
                    "Anchor" => {}
                    _ => {
                        if name == "Broken" {
                            if let Some(inter) = current_interaction.as_mut() {
                                inter.broken = true;
                            }
                        }
                    }
                }
            }
            Ok(Event::End(e)) => {
                let local = e.local_name();
                let name = String::from_utf8_lossy(local.as_ref()).into_owned();
                match name.as_str() {
                    "DataNode" => {
                        if let Some(dn) = current_data_node.take() {
                            data_nodes.push(dn);
                        }
                    }
                    "Interaction" => {
                        if let Some(inter) = current_interaction.take() {
                            interactions.push(inter);
                        }
                    }
                    "Graphics" => {
                        in_graphics_of_interaction = false;
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

    if !data_nodes.iter().any(|dn| dn.xref.is_some()) {
        return Err(CoreError::Parse {
            unit: pathway_id,
            message: "no DataNode carries an Xref".to_string(),
        });
    }

    let pid = PathwayId::new(pathway_id.clone());

    let mut group_members: HashMap<&str, Vec<NodeId>> = HashMap::new();
    for dn in &data_nodes {
        if let Some(gref) = dn.group_ref.as_deref() {
            group_members
                .entry(gref)
                .or_default()
                .push(NodeId::new(&pid, &dn.graph_id));
        }
    }

    let mut nodes = Vec::with_capacity(data_nodes.len() + groups.len() + text_nodes.len());

    for dn in &data_nodes {
        let node_type = node_type_for(&dn.gpml_type);
        let node_id = NodeId::new(&pid, &dn.graph_id);
        let mut candidates = Candidates::default();
        if let Some((db, id)) = &dn.xref {
            let canonical = mapping.map(db, id);
            candidates.canonical_ids.extend(canonical);
            candidates.native_ids.insert(NativeId::new(db.clone(), id.clone()));
        }
        if !dn.text_label.is_empty() {
            candidates.labels.insert(dn.text_label.clone());
        }
        let node = NodeBuilder::new(node_id, pid.clone(), node_type)
            .label(dn.text_label.clone())
            .candidates(candidates)
            .build()
            .map_err(|message| CoreError::Parse {
                unit: pathway_id.clone(),
                message,
            })?;
        nodes.push(node);
    }

    for group in &groups {
        let node_id = NodeId::new(&pid, &group.graph_id);
        let components = group_members.remove(group.graph_id.as_str()).unwrap_or_default();
        let node = NodeBuilder::new(node_id, pid.clone(), NodeType::Group)
            .label(group.graph_id.clone())
            .components(components)
            .build()
            .map_err(|message| CoreError::Parse {
                unit: pathway_id.clone(),
                message,
            })?;
        nodes.push(node);
    }

    for text in &text_nodes {
        let node_id = NodeId::new(&pid, &text.graph_id);
        let mut candidates = Candidates::default();
        if !text.text_label.is_empty() {
            candidates.labels.insert(text.text_label.clone());
        }
        let node = NodeBuilder::new(node_id, pid.clone(), NodeType::Other)
            .label(text.text_label.clone())
            .candidates(candidates)
            .build()
            .map_err(|message| CoreError::Parse {
                unit: pathway_id.clone(),
                message,
            })?;
        nodes.push(node);
    }

    let known_nodes: std::collections::HashSet<&str> =
        data_nodes
            .iter()
            .map(|d| d.graph_id.as_str())
            .chain(groups.iter().map(|g| g.graph_id.as_str()))
            .chain(text_nodes.iter().map(|t| t.graph_id.as_str()))
            .collect();

    let mut edges = Vec::new();
    for (idx, inter) in interactions.iter().enumerate() {
        let Some(first) = inter.points.first() else {
            warnings.push(format!("interaction #{idx} has no points; skipped"));
            continue;
        };
        let Some(last) = inter.points.last() else {
            continue;
        };
        let (Some(start_ref), Some(end_ref)) = (first.graph_ref.as_deref(), last.graph_ref.as_deref())
        else {
            warnings.push(format!("interaction #{idx} endpoints lack GraphRef; skipped"));
            continue;
        };
        if !known_nodes.contains(start_ref) || !known_nodes.contains(end_ref) {
            warnings.push(format!(
                "interaction #{idx} references an unknown node ({start_ref} -> {end_ref}); skipped"
            ));
            continue;
        }

        let start_arrow = first.arrow_head.as_deref().filter(|s| !s.is_empty());
        let end_arrow = last.arrow_head.as_deref().filter(|s| !s.is_empty());
        let directed = start_arrow.is_some() ^ end_arrow.is_some();

        let mut subtypes = Vec::new();
        if let Some(t) = start_arrow {
            subtypes.push(format!("start:{t}"));
        }
        if let Some(t) = end_arrow {
            subtypes.push(format!("end:{t}"));
        }
        if inter.broken {
            subtypes.push("broken".to_string());
        }

        let (src, dst) = if directed {
            if end_arrow.is_some() {
                (start_ref, end_ref)
            } else {
                (end_ref, start_ref)
            }
        } else {
            (start_ref, end_ref)
        };

        edges.push(Edge {
            edge_id: EdgeId::new(&pid, &format!("i{idx}")),
            pathway_id: pid.clone(),
            src: NodeId::new(&pid, src),
            dst: NodeId::new(&pid, dst),
            directed,
            relation_type: "interaction".to_string(),
            subtypes,
        });
    }

    let parsed = ParsedPathway {
        pathway_id: pid,
        name: if pathway_name.is_empty() {
            pathway_id
        } else {
            pathway_name
        },
        source: Source::Secondary,
        nodes,
        edges,
        classes: None,
    };
    Ok((parsed, warnings))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0"?>
<Pathway xmlns="http://pathvisio.org/GPML/2013a" Name="Sample">
  <DataNode TextLabel="AKT1" GraphId="X" Type="GeneProduct">
    <Graphics/>
    <Xref Database="Entrez Gene" ID="207"/>
  </DataNode>
  <DataNode TextLabel="AKT2" GraphId="Y" Type="GeneProduct" GroupRef="g1">
    <Graphics/>
    <Xref Database="Entrez Gene" ID="208"/>
  </DataNode>
  <DataNode TextLabel="AKT3" GraphId="Z" Type="GeneProduct" GroupRef="g1">
    <Graphics/>
    <Xref Database="Entrez Gene" ID="10000"/>
  </DataNode>
  <Group GraphId="g1" Style="Group"/>
  <Interaction>
    <Graphics>
      <Point GraphRef="X" X="0" Y="0"/>
      <Point GraphRef="Y" X="0" Y="0" ArrowHead="Arrow"/>
    </Graphics>
  </Interaction>
</Pathway>
"#;

    #[test]
    fn parses_data_nodes_and_group() {
        let mapping = MappingTable::default();
        let (pathway, warnings) = parse_str(SAMPLE, "wp1", &mapping).unwrap();
        assert!(warnings.is_empty());
        assert_eq!(pathway.nodes.len(), 4); // X, Y, Z, group
        let group = pathway.nodes.iter().find(|n| n.node_type == NodeType::Group).unwrap();
        assert_eq!(group.components.len(), 2);
    }

    #[test]
    fn single_arrow_head_is_directed() {
        let mapping = MappingTable::default();
        let (pathway, _) = parse_str(SAMPLE, "wp1", &mapping).unwrap();
        let edge = &pathway.edges[0];
        assert!(edge.directed);
        assert_eq!(edge.src.as_str(), "wp1:X");
        assert_eq!(edge.dst.as_str(), "wp1:Y");
        assert_eq!(edge.subtypes, vec!["end:Arrow".to_string()]);
    }

    #[test]
    fn no_xref_anywhere_is_soft_failure() {
        let xml = r#"<Pathway Name="Empty"><DataNode GraphId="a" Type="GeneProduct"/></Pathway>"#;
        let mapping = MappingTable::default();
        let err = parse_str(xml, "wp2", &mapping).unwrap_err();
        assert!(matches!(err, CoreError::Parse { .. }));
    }

    #[test]
    fn no_arrow_heads_is_undirected() {
        let xml = r#"<Pathway Name="p">
          <DataNode GraphId="A" Type="GeneProduct"><Xref Database="Entrez Gene" ID="1"/></DataNode>
          <DataNode GraphId="B" Type="GeneProduct"><Xref Database="Entrez Gene" ID="2"/></DataNode>
          <Interaction><Graphics>
            <Point GraphRef="A"/>
            <Point GraphRef="B"/>
          </Graphics></Interaction>
        </Pathway>"#;
        let mapping = MappingTable::default();
        let (pathway, _) = parse_str(xml, "p", &mapping).unwrap();
        assert!(!pathway.edges[0].directed);
    }
}
