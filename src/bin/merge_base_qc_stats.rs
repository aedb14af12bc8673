//! Merge base QC count-based summary statistics.
//!
//! Usage: merge-base-qc-stats --out <FILE> [--chrList <FILE>] <INPUTS>...

use clap::Parser;
use log::info;
use std::path::PathBuf;
use std::process;

use baseqc_stats::commands::{MergeStats, MergeStatsCommand};
use baseqc_stats::config::{init_logging, MergeConfig};
use baseqc_stats::StatsError;

#[derive(Parser)]
#[command(name = "merge-base-qc-stats")]
#[command(version)]
#[command(about = "Merge base QC count-based summary statistics", long_about = None)]
struct Cli {
    /// Output merged stats file
    #[arg(long)]
    out: PathBuf,

    /// Chromosome order file, one name in the first column per line
    /// (defaults to the built-in GRCh37 order)
    #[arg(long = "chrList")]
    chr_list: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Stats files to merge, all sorted in chromosome order then start
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = MergeConfig {
        inputs: cli.inputs,
        output: cli.out,
        chrom_list: cli.chr_list,
    };

    match run(&config) {
        Ok(stats) => {
            info!("Merge stats: {}", stats);
            info!("Done writing to {}", config.output.display());
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

fn run(config: &MergeConfig) -> Result<MergeStats, StatsError> {
    config.validate()?;
    let table = config.chrom_table()?;
    MergeStatsCommand::new()
        .with_chrom_table(table)
        .run_to_path(config.inputs.as_slice(), &config.output)
}
