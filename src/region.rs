//! Non-overlapping region index for position membership queries.
//!
//! Regions are half-open `[start, end)` and kept per chromosome in insertion
//! order. Queries coming from a sorted stats file move forward through each
//! chromosome's regions with a cursor, so a full scan costs O(regions + queries).

use crate::record::{Result, StatsError};
use crate::streaming::parsing::{parse_region_bytes, trim_line_end};
use log::{debug, warn};
use rustc_hash::FxHashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// A half-open interval on one chromosome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub start: u64,
    pub end: u64,
}

impl Region {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// True if `pos` lies in `[start, end)`.
    #[inline]
    pub fn contains(&self, pos: u64) -> bool {
        self.start <= pos && pos < self.end
    }
}

#[derive(Debug, Default)]
struct ChromRegions {
    regions: Vec<Region>,
    cursor: usize,
}

impl ChromRegions {
    fn contains(&mut self, pos: u64) -> bool {
        let regions = &self.regions;
        let mut cursor = self.cursor.min(regions.len());

        // Moving backwards: restart from the first region that ends after pos.
        if cursor > 0 && pos < regions[cursor - 1].end {
            cursor = regions.partition_point(|r| r.end <= pos);
        }

        while cursor < regions.len() && regions[cursor].end <= pos {
            cursor += 1;
        }
        self.cursor = cursor;

        regions.get(cursor).is_some_and(|r| r.contains(pos))
    }
}

/// Per-chromosome ordered, non-overlapping regions.
///
/// Regions must be added in ascending, non-overlapping order for each
/// chromosome. Out-of-order input is not repaired: lookups still never
/// report a position that is outside every region, but may miss one that
/// is inside.
#[derive(Debug, Default)]
pub struct NonOverlapRegions {
    by_chrom: FxHashMap<String, ChromRegions>,
    len: usize,
}

impl NonOverlapRegions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a region to the end of `chrom`'s list.
    pub fn add(&mut self, chrom: &str, start: u64, end: u64) {
        self.by_chrom
            .entry(chrom.to_string())
            .or_default()
            .regions
            .push(Region::new(start, end));
        self.len += 1;
    }

    /// True if `pos` falls inside a region on `chrom`.
    ///
    /// Cheapest when positions per chromosome are queried in ascending
    /// order; any order gives correct answers for a well-formed list.
    /// Unknown chromosomes are never in a region.
    pub fn in_region(&mut self, chrom: &str, pos: u64) -> bool {
        match self.by_chrom.get_mut(chrom) {
            Some(entry) => entry.contains(pos),
            None => false,
        }
    }

    /// Regions on `chrom`, in insertion order.
    pub fn regions(&self, chrom: &str) -> &[Region] {
        self.by_chrom
            .get(chrom)
            .map(|e| e.regions.as_slice())
            .unwrap_or(&[])
    }

    /// Total number of regions.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of chromosomes with at least one region.
    pub fn chrom_count(&self) -> usize {
        self.by_chrom.len()
    }
}

/// Read a `chrom\tstart\tend` region list file.
pub fn read_regions<P: AsRef<Path>>(path: P) -> Result<NonOverlapRegions> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| StatsError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let regions = read_regions_from(file)?;
    debug!(
        "Loaded {} regions on {} chromosomes from {}",
        regions.len(),
        regions.chrom_count(),
        path.display()
    );
    Ok(regions)
}

/// Read a region list from any reader.
///
/// Lines without three tab-separated columns or with non-numeric
/// coordinates are skipped with a warning. Blank lines are ignored.
pub fn read_regions_from<R: Read>(reader: R) -> Result<NonOverlapRegions> {
    let mut reader = BufReader::new(reader);
    let mut regions = NonOverlapRegions::new();
    let mut buf = Vec::with_capacity(256);
    let mut line_number = 0usize;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        line_number += 1;

        let line = trim_line_end(&buf);
        if line.is_empty() {
            continue;
        }

        match parse_region_bytes(line).and_then(|(c, s, e)| {
            std::str::from_utf8(c).ok().map(|c| (c, s, e))
        }) {
            Some((chrom, start, end)) => regions.add(chrom, start, end),
            None => warn!(
                "Invalid line {} found in region list, continuing: {}",
                line_number,
                String::from_utf8_lossy(line)
            ),
        }
    }

    Ok(regions)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> NonOverlapRegions {
        let mut regions = NonOverlapRegions::new();
        regions.add("1", 50, 150);
        regions.add("1", 200, 300);
        regions.add("1", 1000, 1001);
        regions.add("2", 0, 10);
        regions
    }

    #[test]
    fn test_boundaries() {
        let mut regions = sample();
        assert!(!regions.in_region("1", 49));
        assert!(regions.in_region("1", 50));
        assert!(regions.in_region("1", 149));
        assert!(!regions.in_region("1", 150));
        assert!(regions.in_region("1", 200));
        assert!(!regions.in_region("1", 300));
        assert!(regions.in_region("1", 1000));
        assert!(!regions.in_region("1", 1001));
    }

    #[test]
    fn test_monotonic_scan() {
        let mut regions = sample();
        let hits: Vec<u64> = (0..1100).filter(|&p| regions.in_region("1", p)).collect();
        assert_eq!(hits.len(), 100 + 100 + 1);
        assert_eq!(hits[0], 50);
        assert_eq!(*hits.last().unwrap(), 1000);
    }

    #[test]
    fn test_backwards_query() {
        let mut regions = sample();
        assert!(regions.in_region("1", 250));
        assert!(!regions.in_region("1", 2000));
        assert!(regions.in_region("1", 100));
        assert!(!regions.in_region("1", 10));
        assert!(regions.in_region("1", 1000));
        assert!(regions.in_region("1", 60));
    }

    #[test]
    fn test_chromosomes_are_independent() {
        let mut regions = sample();
        assert!(!regions.in_region("1", 5));
        assert!(regions.in_region("2", 5));
        assert!(regions.in_region("1", 60));
        assert!(!regions.in_region("3", 60));
    }

    #[test]
    fn test_unsorted_list_has_no_false_positives() {
        let mut regions = NonOverlapRegions::new();
        regions.add("1", 500, 600);
        regions.add("1", 100, 200);
        regions.add("1", 150, 550);
        for pos in [0, 99, 200, 300, 499, 600, 700] {
            let truth = regions.regions("1").iter().any(|r| r.contains(pos));
            if !truth {
                assert!(!regions.in_region("1", pos), "false positive at {}", pos);
            }
        }
    }

    #[test]
    fn test_read_regions_skips_bad_lines() {
        let content = "1\t50\t150\nbad line\n1\tx\t5\n\n2\t10\t20\textra\n";
        let mut regions = read_regions_from(content.as_bytes()).unwrap();
        assert_eq!(regions.len(), 2);
        assert_eq!(regions.chrom_count(), 2);
        assert!(regions.in_region("1", 100));
        assert!(regions.in_region("2", 19));
    }

    #[test]
    fn test_read_regions_missing_file() {
        let err = read_regions("/nonexistent/regions.txt").unwrap_err();
        assert!(matches!(err, StatsError::Open { .. }));
    }
}
