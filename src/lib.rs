//! Base QC summary statistics tools.
//!
//! Per-position QC stats are produced independently per sample or shard.
//! This library combines them and narrows them down:
//!
//! - **Merge**: k-way streaming merge of sorted stats files, summing every
//!   line that shares a (chromosome, start) key. Memory is O(inputs).
//! - **Subset**: keep only the lines of one stats file that fall inside a
//!   list of non-overlapping regions.
//!
//! # Example
//!
//! ```rust,no_run
//! use baseqc_stats::commands::MergeStatsCommand;
//!
//! let cmd = MergeStatsCommand::new();
//! let stats = cmd.run_to_path(&["a.stats", "b.stats"], "merged.stats").unwrap();
//! eprintln!("{}", stats);
//! ```

pub mod chrom;
pub mod commands;
pub mod config;
pub mod record;
pub mod region;
pub mod streaming;

// Re-export commonly used types
pub use chrom::{ChromRankTable, ChromResolver};
pub use record::{StatFields, StatRecord, StatsError, StatsSchema};
pub use region::NonOverlapRegions;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::chrom::{ChromRankTable, ChromResolver};
    pub use crate::commands::{MergeStats, MergeStatsCommand, SubsetStats, SubsetStatsCommand};
    pub use crate::record::{parse_line, RecordKey, StatFields, StatRecord, StatsError, StatsSchema};
    pub use crate::region::{read_regions, NonOverlapRegions};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_merge_then_subset_workflow() {
        use crate::commands::{MergeStatsCommand, SubsetStatsCommand};
        use crate::record::SHORT_HEADER;
        use crate::region::read_regions_from;

        let a = format!("{}\n1\t100\t1\t10.000\t1\n1\t300\t1\t10.000\t1\n", SHORT_HEADER);
        let b = format!("{}\n1\t100\t1\t20.000\t1\n", SHORT_HEADER);

        let mut merged = Vec::new();
        MergeStatsCommand::new()
            .run_readers(
                vec![("a".to_string(), a.as_bytes()), ("b".to_string(), b.as_bytes())],
                &mut merged,
            )
            .unwrap();

        let mut regions = read_regions_from("1\t50\t150\n".as_bytes()).unwrap();
        let mut subset = Vec::new();
        SubsetStatsCommand::new()
            .run(merged.as_slice(), &mut regions, &mut subset)
            .unwrap();

        assert_eq!(
            String::from_utf8(subset).unwrap(),
            format!("{}\n1\t100\t2\t15.000\t2\n", SHORT_HEADER)
        );
    }
}
