//! Index Persister (§4.F): writes the index as a single structured
//! document with deterministic key order, atomic-replace semantics, and
//! a schema-version-checked loader.
//!
//! The deterministic ordering (`meta`, then `pathways` sorted by id,
//! then `nodes` sorted by id, then `edges` sorted by id) is already
//! guaranteed by the in-memory representation: `pathways` is sorted by
//! the normalizer before this module ever sees it, and `nodes`/`edges`
//! are `BTreeMap`s that serialize in key order. `serde_json` writes
//! `f64` with Rust's shortest round-tripping formatting, satisfying the
//! "floats use the shortest round-tripping representation" rule without
//! any custom float writer.

use crate::error::{CoreError, Result};
use crate::model::{Index, SCHEMA_VERSION};
use std::io::Write;
use std::path::Path;

/// Serialize `index` to pretty-printed JSON and atomically replace the
/// file at `path` (write to a temp file in the same directory, then
/// rename). A build that races another onto the same path cannot
/// produce a torn file: at worst one rename clobbers the other's.
pub fn save(index: &Index, path: &Path) -> Result<()> {
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir).map_err(CoreError::Io)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(CoreError::Io)?;
    serde_json::to_writer_pretty(&mut tmp, index)?;
    tmp.flush().map_err(CoreError::Io)?;
    tmp.persist(path).map_err(|e| CoreError::Io(e.error))?;
    Ok(())
}

/// Load an index from `path`, rejecting a `schema_version` mismatch
/// (and a missing/malformed `meta`) with a clear, fail-fast error
/// rather than attempting to interpret an incompatible document.
pub fn load(path: &Path) -> Result<Index> {
    let file = std::fs::File::open(path).map_err(CoreError::Io)?;
    let reader = std::io::BufReader::new(file);

    let raw: serde_json::Value = serde_json::from_reader(reader)?;
    let found = raw
        .get("meta")
        .and_then(|m| m.get("schema_version"))
        .and_then(|v| v.as_i64())
        .ok_or_else(|| {
            CoreError::SchemaMismatch {
                found: -1,
                expected: SCHEMA_VERSION,
            }
        })?;
    if found != SCHEMA_VERSION {
        return Err(CoreError::SchemaMismatch {
            found,
            expected: SCHEMA_VERSION,
        });
    }

    let index: Index = serde_json::from_value(raw)?;
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::Source;
    use crate::model::{IndexMeta, IndexStats};
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn sample_index() -> Index {
        Index {
            meta: IndexMeta {
                schema_version: SCHEMA_VERSION,
                parser_version: 1,
                source: Source::Primary,
                organism_code: "hsa".to_string(),
                created_at: Utc::now(),
                stats: IndexStats::default(),
                failures: vec![],
            },
            pathways: vec![],
            nodes: BTreeMap::new(),
            edges: BTreeMap::new(),
        }
    }

    #[test]
    fn round_trip_preserves_structure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        let index = sample_index();
        save(&index, &path).unwrap();
        let loaded = load(&path).unwrap();
        assert_eq!(loaded.meta.organism_code, index.meta.organism_code);
        assert_eq!(loaded.meta.schema_version, SCHEMA_VERSION);
    }

    #[test]
    fn schema_mismatch_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        let mut index = sample_index();
        index.meta.schema_version = SCHEMA_VERSION + 1;
        save(&index, &path).unwrap();
        let err = load(&path).unwrap_err();
        assert!(matches!(err, CoreError::SchemaMismatch { .. }));
    }

    #[test]
    fn missing_meta_is_schema_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        std::fs::write(&path, b"{}").unwrap();
        let err = load(&path).unwrap_err();
        assert!(matches!(err, CoreError::SchemaMismatch { .. }));
    }
}
