//! Cross-build determinism: two independent builds from identical
//! inputs must produce byte-identical index documents (§8, property
//! "two independent builds ... produce byte-identical index documents").

use chrono::{TimeZone, Utc};
use pathway_index_core::mapping::MappingTable;
use pathway_index_core::normalize::normalize_pathways;
use pathway_index_core::parse::source_a;
use pathway_index_core::persist;
use pathway_index_core::{Index, Source};

const KGML: &str = r#"<?xml version="1.0"?>
<pathway name="path:hsa00010" org="hsa" number="00010" title="Glycolysis">
  <entry id="1" name="hsa:207" type="gene"><graphics name="AKT1"/></entry>
  <entry id="2" name="hsa:5594" type="gene"><graphics name="MAPK1"/></entry>
  <relation entry1="1" entry2="2" type="PPrel">
    <subtype name="activation" value="-->"/>
  </relation>
</pathway>
"#;

const ID_MAP: &str = "canonical\thsa\nP00001\t207\nP00002\t5594\n";

fn build_once() -> Index {
    let mapping = MappingTable::from_reader(ID_MAP.as_bytes()).unwrap();
    let (parsed, warnings) = source_a::parse_str(KGML, "hsa00010", &mapping, false).unwrap();
    assert!(warnings.is_empty());
    let created_at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    let outcome = normalize_pathways(vec![parsed], Source::Primary, "hsa", 1, created_at);
    assert!(outcome.warnings.is_empty());
    outcome.index
}

#[test]
fn two_independent_builds_are_byte_identical() {
    let a = build_once();
    let b = build_once();
    let json_a = serde_json::to_string_pretty(&a).unwrap();
    let json_b = serde_json::to_string_pretty(&b).unwrap();
    assert_eq!(json_a, json_b);
}

#[test]
fn persisted_round_trip_matches_in_memory_build() {
    let index = build_once();
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("index.json");
    persist::save(&index, &path).unwrap();
    let reloaded = persist::load(&path).unwrap();

    assert_eq!(index.meta.organism_code, reloaded.meta.organism_code);
    assert_eq!(index.pathways.len(), reloaded.pathways.len());
    assert_eq!(index.nodes.len(), reloaded.nodes.len());
    assert_eq!(index.edges.len(), reloaded.edges.len());
    assert_eq!(
        serde_json::to_string(&index).unwrap(),
        serde_json::to_string(&reloaded).unwrap()
    );
}

#[test]
fn node_counts_and_pair_tables_are_consistent() {
    let index = build_once();
    index.validate().unwrap();
    let pathway = &index.pathways[0];
    assert_eq!(pathway.node_count, 2);
    assert_eq!(pathway.edge_count, 1);
    assert_eq!(pathway.pairs1.len(), 1);
}
