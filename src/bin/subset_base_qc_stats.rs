//! Narrow base QC stats down to a subset of regions.
//!
//! Usage: subset-base-qc-stats --inStats <FILE> --regionList <FILE> --outStats <FILE>

use clap::Parser;
use log::info;
use std::path::PathBuf;
use std::process;

use baseqc_stats::commands::{SubsetStats, SubsetStatsCommand};
use baseqc_stats::config::{init_logging, SubsetConfig};
use baseqc_stats::StatsError;

#[derive(Parser)]
#[command(name = "subset-base-qc-stats")]
#[command(version)]
#[command(about = "Narrow down base QC stats to just a subset of positions", long_about = None)]
struct Cli {
    /// Stats file to narrow down
    #[arg(long = "inStats")]
    in_stats: PathBuf,

    /// Regions to keep, sorted, one `chrom<TAB>start<TAB>end` per line.
    /// Positions are 0-based and the end is not included in the region.
    #[arg(long = "regionList")]
    region_list: PathBuf,

    /// Output stats file
    #[arg(long = "outStats")]
    out_stats: PathBuf,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = SubsetConfig {
        in_stats: cli.in_stats,
        region_list: cli.region_list,
        out_stats: cli.out_stats,
    };

    match run(&config) {
        Ok(stats) => {
            info!("Subset stats: {}", stats);
            if !stats.is_clean() {
                eprintln!(
                    "Error: {} malformed lines and {} write failures in {}",
                    stats.malformed_lines,
                    stats.write_failures,
                    config.in_stats.display()
                );
                process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

fn run(config: &SubsetConfig) -> Result<SubsetStats, StatsError> {
    config.validate()?;
    SubsetStatsCommand::new().run_paths(&config.in_stats, &config.region_list, &config.out_stats)
}
