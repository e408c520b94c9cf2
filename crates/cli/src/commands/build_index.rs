//! `build-index`: drives the Build-time control flow of §2
//! (`A → C/D → E → F`) for one source/organism, end to end.
//!
//! Not named by spec.md's CLI section (which scopes only the scorer),
//! but required ambient tooling to produce the index files `score`
//! consumes — grounded in the original KEGG/WikiPathways build scripts'
//! per-organism fetch-then-parse-then-persist flow.

use crate::args::{BuildIndexArgs, SourceArg};
use chrono::Utc;
use pathway_index_core::error::{CoreError, Result};
use pathway_index_core::fetch::FetchCache;
use pathway_index_core::ids::Source;
use pathway_index_core::mapping::MappingTable;
use pathway_index_core::model::BuildFailure;
use pathway_index_core::normalize::normalize_pathways;
use pathway_index_core::parse::{self, ParsedPathway};
use pathway_index_core::persist;
use pathway_index_core::worker::NoopMonitor;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

/// The original prototype's `PARSER_VERSION` constant, bumped whenever
/// the parsers' output shape changes in a way existing parsed-cache
/// entries would not reflect.
const PARSER_VERSION: i64 = 1;

fn primary_api_base() -> &'static str {
    "https://rest.kegg.jp"
}

fn secondary_api_base() -> &'static str {
    "https://www.wikipathways.org/wpi/webservice"
}

fn pathway_list_url(source: Source, organism: &str) -> String {
    match source {
        Source::Primary => format!("{}/list/pathway/{organism}", primary_api_base()),
        Source::Secondary => format!("{}/listPathways?organism={organism}&format=json", secondary_api_base()),
    }
}

fn raw_pathway_url(source: Source, pathway_id: &str) -> String {
    match source {
        Source::Primary => format!("{}/get/{pathway_id}/kgml", primary_api_base()),
        Source::Secondary => format!(
            "{}/getPathwayAs?fileType=gpml&pwId={pathway_id}",
            secondary_api_base()
        ),
    }
}

fn extract_pathway_ids(value: &serde_json::Value) -> Result<Vec<String>> {
    value
        .get("pathway_ids")
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str().map(String::from)).collect())
        .ok_or_else(|| CoreError::Parse {
            unit: "pathway list".to_string(),
            message: "expected a JSON object with a `pathway_ids` array".to_string(),
        })
}

fn content_digest(text: &str) -> String {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    text.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

#[derive(serde::Serialize, serde::Deserialize)]
struct CachedParse {
    digest: String,
    parsed: ParsedPathway,
}

fn load_cached_parse(path: &Path, digest: &str) -> Option<ParsedPathway> {
    let text = std::fs::read_to_string(path).ok()?;
    let cached: CachedParse = serde_json::from_str(&text).ok()?;
    if cached.digest == digest {
        Some(cached.parsed)
    } else {
        None
    }
}

fn save_cached_parse(path: &Path, digest: &str, parsed: &ParsedPathway) {
    let Some(dir) = path.parent() else { return };
    if std::fs::create_dir_all(dir).is_err() {
        return;
    }
    let cached = CachedParse {
        digest: digest.to_string(),
        parsed: parsed.clone(),
    };
    if let Ok(text) = serde_json::to_string(&cached) {
        let _ = std::fs::write(path, text);
    }
}

fn fetch_and_parse_one(
    cache: &FetchCache,
    mapping: &MappingTable,
    source: Source,
    organism: &str,
    pathway_id: &str,
    cache_dir: &Path,
    include_classes: bool,
) -> Result<ParsedPathway> {
    let source_dir = match source {
        Source::Primary => "primary",
        Source::Secondary => "secondary",
    };
    let ext = match source {
        Source::Primary => "xml",
        Source::Secondary => "gpml",
    };
    let raw_path = cache_dir
        .join("raw")
        .join(source_dir)
        .join(organism)
        .join(format!("{pathway_id}.{ext}"));
    let url = raw_pathway_url(source, pathway_id);
    let raw_text = cache.fetch_text(&url, &raw_path, &NoopMonitor)?;

    let digest = content_digest(&raw_text);
    let parsed_path = cache_dir
        .join("parsed")
        .join(source_dir)
        .join(organism)
        .join(format!("{pathway_id}.parsed"));
    if let Some(cached) = load_cached_parse(&parsed_path, &digest) {
        tracing::debug!(pathway_id, "parsed-cache hit");
        return Ok(cached);
    }

    let (parsed, warnings) = match source {
        Source::Primary => parse::source_a::parse_str(&raw_text, pathway_id, mapping, include_classes)?,
        Source::Secondary => parse::source_b::parse_str(&raw_text, pathway_id, mapping)?,
    };
    for warning in &warnings {
        tracing::warn!(pathway_id, "{warning}");
    }
    save_cached_parse(&parsed_path, &digest, &parsed);
    Ok(parsed)
}

pub fn run(args: BuildIndexArgs) -> Result<()> {
    if !args.id_map.exists() {
        return Err(CoreError::BadInput(format!(
            "id-map file not found: {}",
            args.id_map.display()
        )));
    }
    let mapping = MappingTable::from_path(&args.id_map)?;
    let source = match args.source {
        SourceArg::Primary => Source::Primary,
        SourceArg::Secondary => Source::Secondary,
    };

    let cache = FetchCache::new();
    let list_path: PathBuf = args.cache_dir.join("list").join(format!("{}.json", args.organism));
    let list_json = cache.fetch_json(&pathway_list_url(source, &args.organism), &list_path, &NoopMonitor)?;
    let mut pathway_ids = extract_pathway_ids(&list_json)?;
    if let Some(max) = args.max_pathways {
        pathway_ids.truncate(max);
    }
    tracing::info!(count = pathway_ids.len(), organism = %args.organism, "pathway list fetched");

    let progress = ProgressBar::new(pathway_ids.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let results: Vec<std::result::Result<ParsedPathway, BuildFailure>> = pathway_ids
        .par_iter()
        .map(|pathway_id| {
            let result = fetch_and_parse_one(&cache, &mapping, source, &args.organism, pathway_id, &args.cache_dir, args.include_classes);
            progress.inc(1);
            result.map_err(|err| {
                tracing::warn!(pathway_id, error = %err, "pathway build failed, recorded as a failure");
                BuildFailure {
                    pathway_id: pathway_id.clone(),
                    reason: err.to_string(),
                }
            })
        })
        .collect();
    progress.finish_and_clear();

    let mut fetch_failures = Vec::new();
    let mut parsed = Vec::new();
    for result in results {
        match result {
            Ok(p) => parsed.push(p),
            Err(failure) => fetch_failures.push(failure),
        }
    }

    let mut outcome = normalize_pathways(parsed, source, &args.organism, PARSER_VERSION, Utc::now());
    for warning in &outcome.warnings {
        tracing::warn!("{warning}");
    }
    outcome.index.record_failures(fetch_failures);

    persist::save(&outcome.index, &args.out)?;
    println!(
        "wrote {} pathways ({} nodes, {} edges, {} failures) to {}",
        outcome.index.meta.stats.pathway_count,
        outcome.index.meta.stats.node_count,
        outcome.index.meta.stats.edge_count,
        outcome.index.meta.stats.failure_count,
        args.out.display()
    );
    Ok(())
}
