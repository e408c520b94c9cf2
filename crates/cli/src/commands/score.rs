//! `score`: the Evidence Scorer's CLI surface (§6).

use crate::args::{OutputFormat, ScoreArgs};
use pathway_index_core::error::{CoreError, Result};
use pathway_index_core::mapping::MappingTable;
use pathway_index_core::model::Index;
use pathway_index_core::persist;
use pathway_index_core::scoring::{aggregator, node_scorer, ranker, ColumnMapping, PathwayScore, Weights};
use pathway_index_core::tabular::Table;
use std::io::Write;

fn column_mapping(args: &ScoreArgs) -> ColumnMapping {
    ColumnMapping {
        protein_id_col: args.protein_id_col.clone(),
        p_col_prot: args.p_col_prot.clone(),
        fc_col_prot: args.fc_col_prot.clone(),
        p_col_phospho: args.p_col_phospho.clone(),
        fc_col_phospho: args.fc_col_phospho.clone(),
        p_col_site: args.p_col_site.clone(),
        fc_col_site: args.fc_col_site.clone(),
        site_uniprot_col: args.site_uniprot_col.clone(),
        site_key_col: args.site_key_col.clone(),
        site_key_cols: args.site_key_cols.clone(),
        reg_annot_col: args.reg_annot_col.clone(),
        locprob_col: args.locprob_col.clone(),
    }
}

fn load_index(path: &std::path::Path) -> Result<Index> {
    persist::load(path)
}

fn write_json(scores: &[PathwayScore], out: &std::path::Path) -> Result<()> {
    let file = std::fs::File::create(out)?;
    serde_json::to_writer_pretty(file, scores)?;
    Ok(())
}

fn write_tsv(scores: &[PathwayScore], out: &std::path::Path) -> Result<()> {
    let mut file = std::fs::File::create(out)?;
    writeln!(file, "rank\tpathway_id\tsource\tname\tconnection_score\tnode_mass\tfinal_score")?;
    for (i, s) in scores.iter().enumerate() {
        writeln!(
            file,
            "{}\t{}\t{:?}\t{}\t{:.6}\t{:.6}\t{:.6}",
            i + 1,
            s.pathway_id,
            s.source,
            s.name,
            s.connection_score,
            s.node_mass,
            s.final_score
        )?;
    }
    Ok(())
}

pub fn run(args: ScoreArgs) -> Result<()> {
    if args.primary_index.is_none() && args.secondary_index.is_none() {
        return Err(CoreError::BadInput(
            "at least one of --primary-index or --secondary-index is required".to_string(),
        ));
    }
    if !args.protein_table.exists() {
        return Err(CoreError::BadInput(format!(
            "protein table not found: {}",
            args.protein_table.display()
        )));
    }

    let mapping = column_mapping(&args);
    let mut weights = match &args.weights {
        Some(json) => Weights::from_overrides_json(json)?,
        None => Weights::default(),
    };
    if let Some(locprob_min) = args.locprob_min {
        weights.locprob_min = locprob_min;
    }

    let protein_table = Table::from_path(&args.protein_table)?;
    let site_table = match &args.site_table {
        Some(path) => {
            if !path.exists() {
                return Err(CoreError::BadInput(format!("site table not found: {}", path.display())));
            }
            Some(Table::from_path(path)?)
        }
        None => None,
    };
    let id_map = match &args.id_map {
        Some(path) => {
            if !path.exists() {
                return Err(CoreError::BadInput(format!("id-map file not found: {}", path.display())));
            }
            Some(MappingTable::from_path(path)?)
        }
        None => None,
    };

    let (evidence, warnings) =
        aggregator::aggregate(&protein_table, site_table.as_ref(), &mapping, &weights, id_map.as_ref());
    for warning in &warnings {
        tracing::warn!("{warning}");
    }
    tracing::info!(proteins = evidence.len(), "evidence aggregated");

    let mut all_scores: Vec<PathwayScore> = Vec::new();
    for index_path in [&args.primary_index, &args.secondary_index].into_iter().flatten() {
        let index = load_index(index_path)?;
        let states = node_scorer::score_index(&index, &evidence);
        for pathway in &index.pathways {
            all_scores.push(ranker::score_pathway(pathway, &states, &weights));
        }
    }

    let mut ranked = ranker::rank(all_scores);
    if let Some(max) = args.max_pathways {
        ranked.truncate(max);
    }

    match args.format {
        OutputFormat::Json => write_json(&ranked, &args.out)?,
        OutputFormat::Tsv => write_tsv(&ranked, &args.out)?,
    }

    println!("ranked {} pathways, wrote {}", ranked.len(), args.out.display());
    Ok(())
}
