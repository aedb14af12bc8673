//! Streaming k-way merge of base QC stats files.
//!
//! Every input is sorted by (chromosome rank, start). The merge keeps one
//! pending record per input in a min-heap, pops every input sitting at the
//! smallest key, sums their counts into a single line and writes it.
//!
//! # Memory Complexity
//!
//! O(k) for k inputs - one pending record and one read buffer per input,
//! regardless of file size.
//!
//! # Requirements
//!
//! Inputs MUST be sorted by the rank order of the chromosome table, then by
//! start. Sortedness is not checked.

use crate::chrom::{ChromRankTable, ChromResolver};
use crate::record::{
    parse_line, CountOverflow, RecordKey, Result, StatFields, StatRecord, StatsError, StatsSchema,
};
use crate::streaming::buffers::{input_buffer_size, DEFAULT_LINE_BUFFER};
use crate::record::LineError;
use crate::streaming::parsing::trim_line_end;
use crate::streaming::StatsWriter;
use log::{debug, error};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

/// Read the header line of a stats stream and detect its schema.
///
/// Returns None for an unknown header, a header that is not UTF-8 (e.g. a
/// compressed file) or an empty stream.
pub fn read_schema<R: BufRead>(reader: &mut R) -> io::Result<Option<StatsSchema>> {
    let mut header = Vec::with_capacity(DEFAULT_LINE_BUFFER);
    if reader.read_until(b'\n', &mut header)? == 0 {
        return Ok(None);
    }
    Ok(std::str::from_utf8(&header)
        .ok()
        .and_then(StatsSchema::from_header))
}

/// One open input: a reader positioned after the header.
pub struct StatsStream<R: BufRead> {
    reader: R,
    name: String,
    schema: StatsSchema,
    line_buf: Vec<u8>,
    line_number: usize,
    skipped: usize,
    exhausted: bool,
}

impl<R: BufRead> StatsStream<R> {
    /// Wrap a reader whose header (line 1) has already been consumed.
    pub fn new(reader: R, name: impl Into<String>, schema: StatsSchema) -> Self {
        Self {
            reader,
            name: name.into(),
            schema,
            line_buf: Vec::with_capacity(DEFAULT_LINE_BUFFER),
            line_number: 1,
            skipped: 0,
            exhausted: false,
        }
    }

    /// Read the next record whose chromosome is in the table.
    ///
    /// Lines on unknown chromosomes are skipped. A malformed line is an
    /// error naming this stream and the line number.
    pub fn next_record(&mut self, resolver: &mut ChromResolver<'_>) -> Result<Option<StatRecord>> {
        if self.exhausted {
            return Ok(None);
        }

        loop {
            self.line_buf.clear();
            let n = self
                .reader
                .read_until(b'\n', &mut self.line_buf)
                .map_err(|source| StatsError::Read {
                    source_name: self.name.clone(),
                    source,
                })?;
            if n == 0 {
                self.exhausted = true;
                return Ok(None);
            }
            self.line_number += 1;

            let parsed = std::str::from_utf8(trim_line_end(&self.line_buf))
                .map_err(|_| LineError::Encoding)
                .and_then(|line| parse_line(line, self.schema))
                .map_err(|kind| StatsError::Parse {
                    source_name: self.name.clone(),
                    line: self.line_number,
                    kind,
                })?;

            match parsed.resolve(resolver) {
                Some(record) => return Ok(Some(record)),
                None => self.skipped += 1,
            }
        }
    }

    /// Lines dropped so far because their chromosome was unknown.
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

/// Running sum of every record at the current output key.
#[derive(Debug, Default)]
pub struct Accumulator {
    key: Option<RecordKey>,
    fields: StatFields,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a record in. Position columns are copied, counts are summed.
    #[inline]
    pub fn add(&mut self, record: &StatRecord) -> std::result::Result<(), CountOverflow> {
        self.key = Some(record.key);
        self.fields.accumulate(&record.fields)
    }

    /// Take the summed line and reset to all-zero.
    pub fn take(&mut self) -> Option<(RecordKey, StatFields)> {
        let acc = std::mem::take(self);
        acc.key.map(|key| (key, acc.fields))
    }
}

/// Min-heap entry (BinaryHeap is max-heap by default).
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
struct HeapEntry {
    key: RecordKey,
    stream: usize,
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap
        other
            .key
            .cmp(&self.key)
            .then(other.stream.cmp(&self.stream))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Stats merge command configuration.
#[derive(Debug, Clone)]
pub struct MergeStatsCommand {
    /// Chromosome order the inputs are sorted by
    pub chrom_table: ChromRankTable,
}

impl Default for MergeStatsCommand {
    fn default() -> Self {
        Self::new()
    }
}

impl MergeStatsCommand {
    /// Merge command using the built-in chromosome order.
    pub fn new() -> Self {
        Self {
            chrom_table: ChromRankTable::builtin(),
        }
    }

    /// Set the chromosome order (builder pattern).
    pub fn with_chrom_table(mut self, chrom_table: ChromRankTable) -> Self {
        self.chrom_table = chrom_table;
        self
    }

    /// Merge stats files into `output`.
    pub fn run<P: AsRef<Path>, W: Write>(&self, inputs: &[P], output: W) -> Result<MergeStats> {
        let sources = open_inputs(inputs)?;
        let (streams, schema) = self.prepare(sources)?;
        self.merge_streams(streams, schema, output)
    }

    /// Merge stats files into a new file at `output_path`.
    ///
    /// The output file is only created once every input opened and has a
    /// recognised header.
    pub fn run_to_path<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        inputs: &[P],
        output_path: Q,
    ) -> Result<MergeStats> {
        let sources = open_inputs(inputs)?;
        let (streams, schema) = self.prepare(sources)?;

        let output_path = output_path.as_ref();
        let output = File::create(output_path).map_err(|source| StatsError::Open {
            path: output_path.to_path_buf(),
            source,
        })?;
        self.merge_streams(streams, schema, output)
    }

    /// Merge already-open sources, each given as (name, reader at line 1).
    pub fn run_readers<R: BufRead, W: Write>(
        &self,
        sources: Vec<(String, R)>,
        output: W,
    ) -> Result<MergeStats> {
        let (streams, schema) = self.prepare(sources)?;
        self.merge_streams(streams, schema, output)
    }

    /// Read every header and check they agree on one known schema.
    ///
    /// All unrecognised headers are reported before failing.
    fn prepare<R: BufRead>(
        &self,
        sources: Vec<(String, R)>,
    ) -> Result<(Vec<StatsStream<R>>, StatsSchema)> {
        if sources.is_empty() {
            return Err(StatsError::Config("No stats files specified".to_string()));
        }

        let mut detected = Vec::with_capacity(sources.len());
        let mut mismatches = Vec::new();
        for (name, mut reader) in sources {
            let found = read_schema(&mut reader).map_err(|source| StatsError::Read {
                source_name: name.clone(),
                source,
            })?;
            match found {
                Some(schema) => detected.push((name, reader, schema)),
                None => {
                    error!(
                        "Unrecognized header in {}: expected the full or short base QC stats header",
                        name
                    );
                    mismatches.push(name);
                }
            }
        }
        if !mismatches.is_empty() {
            return Err(StatsError::HeaderMismatch { paths: mismatches });
        }

        let schema = detected[0].2;
        let mut streams = Vec::with_capacity(detected.len());
        for (name, reader, found) in detected {
            if found != schema {
                return Err(StatsError::MixedSchemas {
                    path: name,
                    expected: schema,
                    found,
                });
            }
            debug!("Opened {} ({} layout)", name, found);
            streams.push(StatsStream::new(reader, name, found));
        }

        Ok((streams, schema))
    }

    /// Core merge loop.
    ///
    /// Each round pops the smallest key, then keeps popping while the heap
    /// top has the same key, so all inputs at a key (and repeated keys
    /// within one input) become a single output line.
    fn merge_streams<R: BufRead, W: Write>(
        &self,
        mut streams: Vec<StatsStream<R>>,
        schema: StatsSchema,
        output: W,
    ) -> Result<MergeStats> {
        let mut stats = MergeStats {
            streams: streams.len(),
            ..MergeStats::default()
        };
        let mut resolver = ChromResolver::new(&self.chrom_table);
        let mut writer = StatsWriter::new(output);
        writer.write_header(schema)?;

        let mut pending: Vec<Option<StatRecord>> = Vec::with_capacity(streams.len());
        let mut heap: BinaryHeap<HeapEntry> = BinaryHeap::with_capacity(streams.len());
        for (idx, stream) in streams.iter_mut().enumerate() {
            let record = stream.next_record(&mut resolver)?;
            if let Some(ref rec) = record {
                heap.push(HeapEntry {
                    key: rec.key,
                    stream: idx,
                });
            }
            pending.push(record);
        }

        let mut acc = Accumulator::new();
        while let Some(top) = heap.pop() {
            let key = top.key;
            let mut next = Some(top);

            while let Some(entry) = next {
                if let Some(record) = pending[entry.stream].take() {
                    acc.add(&record).map_err(|overflow| StatsError::Overflow {
                        chrom: self.chrom_table.name(key.rank).unwrap_or("?").to_string(),
                        start: key.start,
                        column: overflow.column,
                    })?;
                    stats.records_read += 1;
                }

                let record = streams[entry.stream].next_record(&mut resolver)?;
                if let Some(ref rec) = record {
                    heap.push(HeapEntry {
                        key: rec.key,
                        stream: entry.stream,
                    });
                }
                pending[entry.stream] = record;

                next = match heap.peek() {
                    Some(e) if e.key == key => heap.pop(),
                    _ => None,
                };
            }

            if let Some((key, fields)) = acc.take() {
                let chrom = self.chrom_table.name(key.rank).ok_or_else(|| {
                    StatsError::InvalidFormat(format!("No chromosome with rank {}", key.rank))
                })?;
                writer.write_record(chrom, key.start, &fields, schema)?;
                stats.lines_written += 1;
            }
        }

        writer.flush()?;
        stats.records_skipped = streams.iter().map(|s| s.skipped()).sum();
        stats.unresolved_chroms = resolver.unresolved_count();
        Ok(stats)
    }
}

/// Open every input file for buffered reading, failing on the first that
/// cannot be opened.
fn open_inputs<P: AsRef<Path>>(inputs: &[P]) -> Result<Vec<(String, BufReader<File>)>> {
    let capacity = input_buffer_size(inputs.len());
    inputs
        .iter()
        .map(|path| {
            let path = path.as_ref();
            let file = File::open(path).map_err(|source| StatsError::Open {
                path: path.to_path_buf(),
                source,
            })?;
            Ok((
                path.display().to_string(),
                BufReader::with_capacity(capacity, file),
            ))
        })
        .collect()
}

/// Statistics from a stats merge.
#[derive(Debug, Default, Clone)]
pub struct MergeStats {
    /// Number of input streams
    pub streams: usize,
    /// Data lines merged into the output
    pub records_read: usize,
    /// Data lines dropped because their chromosome was unknown
    pub records_skipped: usize,
    /// Distinct unknown chromosome names
    pub unresolved_chroms: usize,
    /// Data lines written (header excluded)
    pub lines_written: usize,
}

impl std::fmt::Display for MergeStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Streams: {}, Read: {}, Skipped: {} ({} unknown chromosomes), Written: {}",
            self.streams,
            self.records_read,
            self.records_skipped,
            self.unresolved_chroms,
            self.lines_written
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{FULL_HEADER, SHORT_HEADER};

    fn short_file(lines: &[&str]) -> String {
        let mut content = format!("{}\n", SHORT_HEADER);
        for line in lines {
            content.push_str(line);
            content.push('\n');
        }
        content
    }

    fn merge(files: &[String]) -> Result<(String, MergeStats)> {
        let sources = files
            .iter()
            .enumerate()
            .map(|(i, c)| (format!("in{}", i), c.as_bytes()))
            .collect();
        let mut output = Vec::new();
        let stats = MergeStatsCommand::new().run_readers(sources, &mut output)?;
        Ok((String::from_utf8(output).unwrap(), stats))
    }

    fn merge_bytes(files: &[&[u8]]) -> Result<(String, MergeStats)> {
        let sources = files
            .iter()
            .enumerate()
            .map(|(i, c)| (format!("in{}", i), *c))
            .collect();
        let mut output = Vec::new();
        let stats = MergeStatsCommand::new().run_readers(sources, &mut output)?;
        Ok((String::from_utf8(output).unwrap(), stats))
    }

    fn data_lines(output: &str) -> Vec<&str> {
        output.lines().skip(1).collect()
    }

    #[test]
    fn test_merge_sums_shared_keys() {
        let a = short_file(&["1\t100\t1\t30.000\t2", "1\t200\t0\t10.000\t1"]);
        let b = short_file(&["1\t100\t2\t60.000\t1", "2\t5\t1\t0.000\t0"]);
        let (out, stats) = merge(&[a, b]).unwrap();

        assert_eq!(out.lines().next(), Some(SHORT_HEADER));
        assert_eq!(
            data_lines(&out),
            vec!["1\t100\t3\t40.000\t3", "1\t200\t0\t10.000\t1", "2\t5\t1\t0.000\t0"]
        );
        assert_eq!(stats.records_read, 4);
        assert_eq!(stats.lines_written, 3);
    }

    #[test]
    fn test_merge_orders_by_rank_not_name() {
        // Built-in order puts 2 before 10 and X after 22.
        let a = short_file(&["2\t1\t0\t1.000\t1", "X\t1\t0\t1.000\t1"]);
        let b = short_file(&["10\t1\t0\t1.000\t1", "22\t9\t0\t1.000\t1"]);
        let (out, _) = merge(&[a, b]).unwrap();
        let chroms: Vec<&str> = data_lines(&out)
            .iter()
            .map(|l| l.split('\t').next().unwrap())
            .collect();
        assert_eq!(chroms, vec!["2", "10", "22", "X"]);
    }

    #[test]
    fn test_unknown_chromosomes_skipped() {
        let a = short_file(&[
            "1\t1\t1\t1.000\t1",
            "chrUn_1\t5\t9\t9.000\t9",
            "chrUn_1\t6\t9\t9.000\t9",
            "chrUn_2\t1\t9\t9.000\t9",
            "1\t7\t1\t1.000\t1",
        ]);
        let b = short_file(&["1\t7\t2\t4.000\t1"]);
        let (out, stats) = merge(&[a, b]).unwrap();
        assert_eq!(
            data_lines(&out),
            vec!["1\t1\t1\t1.000\t1", "1\t7\t3\t2.500\t2"]
        );
        assert_eq!(stats.records_skipped, 3);
        assert_eq!(stats.unresolved_chroms, 2);
    }

    #[test]
    fn test_repeated_key_within_stream_folds() {
        let a = short_file(&["1\t1\t1\t1.000\t1", "1\t1\t1\t3.000\t1"]);
        let (out, _) = merge(&[a]).unwrap();
        assert_eq!(data_lines(&out), vec!["1\t1\t2\t2.000\t2"]);
    }

    #[test]
    fn test_single_input_is_identity() {
        let a = short_file(&["1\t1\t1\t12.346\t3", "1\t2\t0\t0.000\t0", "MT\t3\t4\t7.500\t2"]);
        let (out, _) = merge(std::slice::from_ref(&a)).unwrap();
        assert_eq!(out, a);
    }

    #[test]
    fn test_header_mismatch_reports_all() {
        let good = short_file(&[]);
        let bad1 = "chrom\tstart\n1\t1\n".to_string();
        let bad2 = String::new();
        let err = merge(&[bad1, good, bad2]).unwrap_err();
        match err {
            StatsError::HeaderMismatch { paths } => assert_eq!(paths, vec!["in0", "in2"]),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_binary_header_is_mismatch() {
        // gzip magic followed by bytes that are not UTF-8
        let gz: &[u8] = &[0x1f, 0x8b, 0x08, 0xff, 0xfe, b'\n'];
        let good = short_file(&[]);
        let err = merge_bytes(&[gz, good.as_bytes(), b"chrom\tstart\n"]).unwrap_err();
        match err {
            StatsError::HeaderMismatch { paths } => assert_eq!(paths, vec!["in0", "in2"]),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_non_utf8_data_line_names_stream() {
        let mut a = short_file(&["1\t1\t0\t1.000\t1"]).into_bytes();
        a.extend_from_slice(b"1\t\xff\n");
        let err = merge_bytes(&[a.as_slice()]).unwrap_err();
        match err {
            StatsError::Parse {
                source_name,
                line,
                kind,
            } => {
                assert_eq!(source_name, "in0");
                assert_eq!(line, 3);
                assert_eq!(kind, LineError::Encoding);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_count_overflow_is_error() {
        let a = short_file(&["1\t1\t18446744073709551615\t1.000\t1"]);
        let b = short_file(&["1\t1\t1\t1.000\t1"]);
        let err = merge(&[a, b]).unwrap_err();
        match err {
            StatsError::Overflow {
                chrom,
                start,
                column,
            } => {
                assert_eq!(chrom, "1");
                assert_eq!(start, 1);
                assert_eq!(column, "ZeroMapQual");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_mixed_schemas_rejected() {
        let short = short_file(&[]);
        let full = format!("{}\n", FULL_HEADER);
        let err = merge(&[full, short]).unwrap_err();
        assert!(matches!(err, StatsError::MixedSchemas { .. }));
    }

    #[test]
    fn test_malformed_line_names_stream() {
        let a = short_file(&["1\t1\t1\t1.000\t1"]);
        let b = short_file(&["1\t1\t1\t1.000"]);
        let err = merge(&[a, b]).unwrap_err();
        match err {
            StatsError::Parse {
                source_name, line, ..
            } => {
                assert_eq!(source_name, "in1");
                assert_eq!(line, 2);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_no_inputs() {
        let err = merge(&[]).unwrap_err();
        assert!(matches!(err, StatsError::Config(_)));
    }

    #[test]
    fn test_header_only_inputs() {
        let (out, stats) = merge(&[short_file(&[]), short_file(&[])]).unwrap();
        assert_eq!(out, format!("{}\n", SHORT_HEADER));
        assert_eq!(stats.lines_written, 0);
    }

    #[test]
    fn test_accumulator_take_resets() {
        let mut acc = Accumulator::new();
        assert!(acc.take().is_none());
        let record = StatRecord {
            key: RecordKey::new(0, 10),
            fields: StatFields {
                total_reads: 4,
                ..StatFields::default()
            },
        };
        acc.add(&record).unwrap();
        acc.add(&record).unwrap();
        let (key, fields) = acc.take().unwrap();
        assert_eq!(key, RecordKey::new(0, 10));
        assert_eq!(fields.total_reads, 8);
        assert!(acc.take().is_none());
    }
}
