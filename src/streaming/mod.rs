//! Shared streaming utilities.
//!
//! - Zero-allocation line parsing
//! - Buffered stats output
//! - Buffer sizing
//!
//! Both tools read their inputs line by line and never hold more than one
//! pending line per input stream.

pub mod buffers;
pub mod output;
pub mod parsing;

pub use output::StatsWriter;
pub use parsing::{parse_chrom_pos, parse_region_bytes, parse_u64_fast, trim_line_end};
