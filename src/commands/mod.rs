//! Command implementations.

pub mod merge_stats;
pub mod subset_stats;

pub use merge_stats::{read_schema, Accumulator, MergeStats, MergeStatsCommand, StatsStream};
pub use subset_stats::{SubsetStats, SubsetStatsCommand};
