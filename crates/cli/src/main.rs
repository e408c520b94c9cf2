//! pathway-rank CLI
//!
//! ```text
//! pathway-rank build-index --source primary --organism hsa --id-map map.tsv --out idx.json
//! pathway-rank score --primary-index idx.json --protein-table proteins.tsv --out ranked.json
//! ```

mod args;
mod commands;

use args::Commands;
use clap::Parser;
use pathway_index_core::CoreError;

#[derive(Parser, Debug)]
#[command(name = "pathway-rank", version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

fn main() {
    let cli = Cli::parse();

    let log_level = match &cli.command {
        Commands::BuildIndex(a) => a.log_level,
        Commands::Score(a) => a.log_level,
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(log_level.as_filter()))
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::BuildIndex(args) => commands::build_index::run(args),
        Commands::Score(args) => commands::score::run(args),
    };

    if let Err(err) = result {
        eprintln!("Error: {err}");
        let code = match &err {
            CoreError::BadInput(_) => 2,
            CoreError::SchemaMismatch { .. } => 3,
            _ => 1,
        };
        std::process::exit(code);
    }
}
