//! Narrow a stats file down to the positions inside a region list.
//!
//! The input is scanned once. Only the chromosome and start columns are
//! parsed, so either stats layout works and kept lines are copied byte for
//! byte.
//!
//! The first line whose first two columns are not `chrom\t<integer>` is the
//! header and is always kept. Later lines like that are reported and
//! skipped without stopping the scan.

use crate::record::{Result, StatsError};
use crate::region::{read_regions, NonOverlapRegions};
use crate::streaming::buffers::{DEFAULT_INPUT_BUFFER, DEFAULT_LINE_BUFFER};
use crate::streaming::parsing::{parse_chrom_pos, trim_line_end};
use crate::streaming::StatsWriter;
use log::warn;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

/// Stats subset command.
#[derive(Debug, Clone, Default)]
pub struct SubsetStatsCommand;

impl SubsetStatsCommand {
    pub fn new() -> Self {
        Self
    }

    /// Subset `in_stats` to the regions in `region_list`, writing `out_stats`.
    pub fn run_paths<P, Q, S>(&self, in_stats: P, region_list: Q, out_stats: S) -> Result<SubsetStats>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
        S: AsRef<Path>,
    {
        let in_path = in_stats.as_ref();
        let input = File::open(in_path).map_err(|source| StatsError::Open {
            path: in_path.to_path_buf(),
            source,
        })?;

        let out_path = out_stats.as_ref();
        let output = File::create(out_path).map_err(|source| StatsError::Open {
            path: out_path.to_path_buf(),
            source,
        })?;

        let mut regions = read_regions(region_list)?;
        let reader = BufReader::with_capacity(DEFAULT_INPUT_BUFFER, input);
        self.run(reader, &mut regions, output)
    }

    /// Core scan.
    ///
    /// A read error ends the run; write errors are counted and the scan
    /// goes on.
    pub fn run<R: BufRead, W: Write>(
        &self,
        mut reader: R,
        regions: &mut NonOverlapRegions,
        output: W,
    ) -> Result<SubsetStats> {
        let mut stats = SubsetStats::default();
        let mut writer = StatsWriter::new(output);
        let mut buf = Vec::with_capacity(DEFAULT_LINE_BUFFER);
        let mut header_pending = true;

        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            stats.lines_read += 1;
            let line = trim_line_end(&buf);

            match parse_chrom_pos(line) {
                Some((chrom, pos)) => {
                    let keep = std::str::from_utf8(chrom)
                        .map(|chrom| regions.in_region(chrom, pos))
                        .unwrap_or(false);
                    if keep {
                        stats.lines_kept += 1;
                        emit(&mut writer, line, &mut stats);
                    }
                }
                None if header_pending => {
                    header_pending = false;
                    stats.header_passed = true;
                    emit(&mut writer, line, &mut stats);
                }
                None => {
                    warn!(
                        "Failed to read stats line {}, skipping: {}",
                        stats.lines_read,
                        String::from_utf8_lossy(line)
                    );
                    stats.malformed_lines += 1;
                }
            }
        }

        if let Err(e) = writer.flush() {
            warn!("Failed to flush the output stats file: {}", e);
            stats.write_failures += 1;
        }
        Ok(stats)
    }
}

fn emit<W: Write>(writer: &mut StatsWriter<W>, line: &[u8], stats: &mut SubsetStats) {
    if let Err(e) = writer.write_line(line) {
        warn!("Failed to write a line to the output stats file: {}", e);
        stats.write_failures += 1;
    }
}

/// Statistics from a stats subset.
#[derive(Debug, Default, Clone)]
pub struct SubsetStats {
    /// Lines read, header included
    pub lines_read: usize,
    /// Whether a header line was found and passed through
    pub header_passed: bool,
    /// Data lines inside a region
    pub lines_kept: usize,
    /// Non-header lines that could not be parsed
    pub malformed_lines: usize,
    /// Lines that could not be written
    pub write_failures: usize,
}

impl SubsetStats {
    /// True if every line was parsed and written.
    pub fn is_clean(&self) -> bool {
        self.malformed_lines == 0 && self.write_failures == 0
    }
}

impl std::fmt::Display for SubsetStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Read: {}, Kept: {}, Malformed: {}, Write failures: {}",
            self.lines_read, self.lines_kept, self.malformed_lines, self.write_failures
        )
    }
}
