//! CLI argument definitions for both `pathway-rank` subcommands.
//!
//! All `clap` structs and enums live here so `main.rs` stays minimal and
//! each command handler only imports the types it needs.

use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch, parse, and normalize one source/organism into an index file.
    ///
    /// Not part of the scorer's required interface (§6), but the ambient
    /// tooling that produces the index files `score` consumes.
    BuildIndex(BuildIndexArgs),

    /// Score and rank pathways against user-supplied evidence.
    Score(ScoreArgs),
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum SourceArg {
    Primary,
    Secondary,
}

#[derive(Args, Debug)]
pub struct BuildIndexArgs {
    /// Which pathway dialect to fetch and parse.
    #[arg(long, value_enum)]
    pub source: SourceArg,

    /// Organism code (e.g. `hsa`).
    #[arg(long)]
    pub organism: String,

    /// Root of the on-disk fetch/parse cache.
    #[arg(long, default_value = "cache")]
    pub cache_dir: PathBuf,

    /// Organism identifier-mapping TSV.
    #[arg(long)]
    pub id_map: PathBuf,

    /// Output index file.
    #[arg(short, long)]
    pub out: PathBuf,

    /// Stop after this many pathways (debug).
    #[arg(long)]
    pub max_pathways: Option<usize>,

    /// Retain each pathway's declared class annotations in the output.
    #[arg(long)]
    pub include_classes: bool,

    #[arg(long, default_value = "info", value_enum)]
    pub log_level: LogLevel,
}

#[derive(Args, Debug)]
pub struct ScoreArgs {
    /// Index built from the primary (KGML-like) source.
    #[arg(long)]
    pub primary_index: Option<PathBuf>,

    /// Index built from the secondary (GPML-like) source.
    #[arg(long)]
    pub secondary_index: Option<PathBuf>,

    /// Required: protein-level evidence table.
    #[arg(long)]
    pub protein_table: PathBuf,

    /// Optional: site-level (phosphosite) evidence table.
    #[arg(long)]
    pub site_table: Option<PathBuf>,

    /// Output file for the ranked pathway list.
    #[arg(short, long)]
    pub out: PathBuf,

    /// Output format.
    #[arg(long, default_value = "json", value_enum)]
    pub format: OutputFormat,

    /// Organism identifier-mapping TSV (only needed if evidence tables
    /// carry identifiers other than canonical accessions).
    #[arg(long)]
    pub id_map: Option<PathBuf>,

    /// Partial JSON object of weight overrides.
    #[arg(long)]
    pub weights: Option<String>,

    /// Stop after ranking this many pathways (debug).
    #[arg(long)]
    pub max_pathways: Option<usize>,

    #[arg(long, default_value = "info", value_enum)]
    pub log_level: LogLevel,

    // --- column mapping flags (§6) ---
    #[arg(long, default_value = "Uniprot")]
    pub protein_id_col: String,
    #[arg(long, default_value = "pvalue")]
    pub p_col_prot: String,
    #[arg(long, default_value = "log2fc")]
    pub fc_col_prot: String,
    #[arg(long, default_value = "phospho_pvalue")]
    pub p_col_phospho: String,
    #[arg(long, default_value = "phospho_log2fc")]
    pub fc_col_phospho: String,
    #[arg(long, default_value = "pvalue")]
    pub p_col_site: String,
    #[arg(long, default_value = "log2fc")]
    pub fc_col_site: String,
    #[arg(long, default_value = "Uniprot")]
    pub site_uniprot_col: String,
    #[arg(long)]
    pub site_key_col: Option<String>,
    #[arg(long, value_delimiter = ',')]
    pub site_key_cols: Option<Vec<String>>,
    #[arg(long, default_value = "regulatory")]
    pub reg_annot_col: String,
    #[arg(long)]
    pub locprob_col: Option<String>,
    /// Overrides `locprob_min` from `--weights` when given; otherwise
    /// the weights default (or `--weights` override) applies unchanged.
    #[arg(long)]
    pub locprob_min: Option<f64>,
}

#[derive(ValueEnum, Debug, Clone, Copy, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Tsv,
}

#[derive(ValueEnum, Debug, Clone, Copy, Default)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}
