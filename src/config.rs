//! Run configuration for the merge and subset tools.
//!
//! Both configs are checked with `validate()` before any file is touched,
//! so a missing argument never leaves a half-written output behind.

use crate::chrom::ChromRankTable;
use crate::record::{Result, StatsError};
use log::LevelFilter;
use std::path::PathBuf;

/// Inputs of a stats merge.
#[derive(Debug, Clone, Default)]
pub struct MergeConfig {
    /// Stats files to merge
    pub inputs: Vec<PathBuf>,
    /// Merged stats file to write
    pub output: PathBuf,
    /// Chromosome order file; the built-in order when None
    pub chrom_list: Option<PathBuf>,
}

impl MergeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.inputs.is_empty() {
            return Err(StatsError::Config("No stats files specified".to_string()));
        }
        if self.output.as_os_str().is_empty() {
            return Err(StatsError::Config("No output file specified".to_string()));
        }
        Ok(())
    }

    /// Build the chromosome order this merge sorts by.
    pub fn chrom_table(&self) -> Result<ChromRankTable> {
        match &self.chrom_list {
            Some(path) => ChromRankTable::from_file(path),
            None => Ok(ChromRankTable::builtin()),
        }
    }
}

/// Inputs of a stats subset.
#[derive(Debug, Clone, Default)]
pub struct SubsetConfig {
    /// Stats file to narrow down
    pub in_stats: PathBuf,
    /// `chrom\tstart\tend` regions to keep
    pub region_list: PathBuf,
    /// Subset stats file to write
    pub out_stats: PathBuf,
}

impl SubsetConfig {
    pub fn validate(&self) -> Result<()> {
        for (flag, path) in [
            ("--inStats", &self.in_stats),
            ("--regionList", &self.region_list),
            ("--outStats", &self.out_stats),
        ] {
            if path.as_os_str().is_empty() {
                return Err(StatsError::Config(format!("{} is required", flag)));
            }
        }
        Ok(())
    }
}

/// Log level for a `-v` count: warnings by default, then info, then debug.
pub fn log_level(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    }
}

/// Initialize stderr logging. `RUST_LOG` overrides the `-v` level.
pub fn init_logging(verbose: u8) {
    env_logger::Builder::new()
        .filter_level(log_level(verbose))
        .parse_default_env()
        .format_timestamp(None)
        .init();
}
