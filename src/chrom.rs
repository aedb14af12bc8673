//! Chromosome ordering for stats merging.
//!
//! Stats files are sorted by chromosome rank, then start. The rank of a
//! chromosome is its position in either the built-in GRCh37 ordering or an
//! external list (first tab-delimited column per line, e.g. a `.fai` file).

use crate::record::{Result, StatsError};
use crate::streaming::parsing::trim_line_end_str;
use log::warn;
use rustc_hash::{FxHashMap, FxHashSet};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// Built-in chromosome order: autosomes, sex chromosomes, mitochondria,
/// then the GRCh37 unplaced contigs.
pub const DEFAULT_CHROMOSOMES: &[&str] = &[
    "1", "2", "3", "4", "5", "6", "7", "8", "9", "10", "11", "12", "13", "14", "15", "16", "17",
    "18", "19", "20", "21", "22", "X", "Y", "MT",
    "GL000207.1", "GL000226.1", "GL000229.1", "GL000231.1", "GL000210.1", "GL000239.1",
    "GL000235.1", "GL000201.1", "GL000247.1", "GL000245.1", "GL000197.1", "GL000203.1",
    "GL000246.1", "GL000249.1", "GL000196.1", "GL000248.1", "GL000244.1", "GL000238.1",
    "GL000202.1", "GL000234.1", "GL000232.1", "GL000206.1", "GL000240.1", "GL000236.1",
    "GL000241.1", "GL000243.1", "GL000242.1", "GL000230.1", "GL000237.1", "GL000233.1",
    "GL000204.1", "GL000198.1", "GL000208.1", "GL000191.1", "GL000227.1", "GL000228.1",
    "GL000214.1", "GL000221.1", "GL000209.1", "GL000218.1", "GL000220.1", "GL000213.1",
    "GL000211.1", "GL000199.1", "GL000217.1", "GL000216.1", "GL000215.1", "GL000205.1",
    "GL000219.1", "GL000224.1", "GL000223.1", "GL000195.1", "GL000212.1", "GL000222.1",
    "GL000200.1", "GL000193.1", "GL000194.1", "GL000225.1", "GL000192.1",
];

/// Chromosome name to rank lookup.
///
/// Ranks are dense and zero-based in first-seen order. A name listed twice
/// keeps the rank of its first occurrence.
#[derive(Debug, Clone, Default)]
pub struct ChromRankTable {
    ranks: FxHashMap<String, usize>,
    names: Vec<String>,
}

impl ChromRankTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with the built-in chromosome order.
    pub fn builtin() -> Self {
        let mut table = Self::new();
        for name in DEFAULT_CHROMOSOMES {
            table.insert(name);
        }
        table
    }

    /// Load the order from a file whose first column is the chromosome name.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| StatsError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(file)
    }

    /// Load the order from any reader. Blank names are skipped and anything
    /// after the first tab is ignored.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut table = Self::new();
        for line in BufReader::new(reader).lines() {
            let line = line?;
            let line = trim_line_end_str(&line);
            let name = line.split('\t').next().unwrap_or("");
            if !name.is_empty() {
                table.insert(name);
            }
        }
        Ok(table)
    }

    /// Append a chromosome to the order. Returns its rank.
    pub fn insert(&mut self, name: &str) -> usize {
        if let Some(&rank) = self.ranks.get(name) {
            return rank;
        }
        let rank = self.names.len();
        self.ranks.insert(name.to_string(), rank);
        self.names.push(name.to_string());
        rank
    }

    /// Rank of a chromosome, if known.
    #[inline]
    pub fn lookup(&self, name: &str) -> Option<usize> {
        self.ranks.get(name).copied()
    }

    /// Name of the chromosome at `rank`.
    #[inline]
    pub fn name(&self, rank: usize) -> Option<&str> {
        self.names.get(rank).map(|s| s.as_str())
    }

    /// Chromosome names in rank order.
    pub fn chromosomes(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Rank lookup that warns once for each unknown chromosome name.
#[derive(Debug)]
pub struct ChromResolver<'a> {
    table: &'a ChromRankTable,
    unresolved: FxHashSet<String>,
}

impl<'a> ChromResolver<'a> {
    pub fn new(table: &'a ChromRankTable) -> Self {
        Self {
            table,
            unresolved: FxHashSet::default(),
        }
    }

    /// Rank of `name`, or None (with a one-time warning) if it is unknown.
    #[inline]
    pub fn resolve(&mut self, name: &str) -> Option<usize> {
        let rank = self.table.lookup(name);
        if rank.is_none() && !self.unresolved.contains(name) {
            warn!("Skipping chromosome {}: not in the chromosome list", name);
            self.unresolved.insert(name.to_string());
        }
        rank
    }

    /// Number of distinct unknown names seen so far.
    pub fn unresolved_count(&self) -> usize {
        self.unresolved.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_builtin_order() {
        let table = ChromRankTable::builtin();
        assert_eq!(table.len(), DEFAULT_CHROMOSOMES.len());
        assert_eq!(table.lookup("1"), Some(0));
        assert_eq!(table.lookup("22"), Some(21));
        assert_eq!(table.lookup("X"), Some(22));
        assert_eq!(table.lookup("MT"), Some(24));
        assert_eq!(table.lookup("GL000192.1"), Some(table.len() - 1));
        assert_eq!(table.lookup("chr1"), None);
        assert_eq!(table.name(23), Some("Y"));
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "chr1\t248956422\t112\t70\t71").unwrap();
        writeln!(file, "chr2\t242193529").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "chrM").unwrap();

        let table = ChromRankTable::from_file(file.path()).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.lookup("chr1"), Some(0));
        assert_eq!(table.lookup("chr2"), Some(1));
        assert_eq!(table.lookup("chrM"), Some(2));
        assert_eq!(table.lookup("1"), None);
    }

    #[test]
    fn test_duplicate_keeps_first_rank() {
        let table = ChromRankTable::from_reader("a\nb\na\nc\n".as_bytes()).unwrap();
        assert_eq!(table.lookup("a"), Some(0));
        assert_eq!(table.lookup("c"), Some(2));
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_missing_file() {
        let err = ChromRankTable::from_file("/nonexistent/chroms.txt").unwrap_err();
        assert!(matches!(err, StatsError::Open { .. }));
    }

    #[test]
    fn test_resolver_counts_unknown_once() {
        let table = ChromRankTable::builtin();
        let mut resolver = ChromResolver::new(&table);
        assert_eq!(resolver.resolve("2"), Some(1));
        assert_eq!(resolver.resolve("chrUn"), None);
        assert_eq!(resolver.resolve("chrUn"), None);
        assert_eq!(resolver.resolve("HLA-A"), None);
        assert_eq!(resolver.unresolved_count(), 2);
    }
}
