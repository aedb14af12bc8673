//! Stats line codec.
//!
//! A base QC stats file is tab-delimited with one header line followed by one
//! data line per genomic position. Two layouts exist: the full 17-column
//! layout and a short 5-column layout carrying only the map quality columns.

use crate::chrom::ChromResolver;
use crate::streaming::parsing::parse_u64_fast;
use std::io::{self, Write};
use std::path::PathBuf;
use thiserror::Error;

/// Header line of a full-schema stats file.
pub const FULL_HEADER: &str = "chrom\tchromStart\tchromEnd\tTotalReads\tDups\tQCFail\tMapped\tPaired\tProperPaired\tZeroMapQual\tMapQual<10\tMapQual255\tPassMapQual\tAverageMapQuality\tAverageMapQualCount\tDepth\tQ20Bases";

/// Header line of a short-schema stats file.
pub const SHORT_HEADER: &str =
    "chrom\tchromStart\tZeroMapQual\tAverageMapQuality\tAverageMapQualCount";

/// Errors produced while reading, merging or subsetting stats files.
#[derive(Error, Debug)]
pub enum StatsError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to open {}: {source}", path.display())]
    Open { path: PathBuf, source: io::Error },

    #[error("Failed reading {source_name}: {source}")]
    Read {
        source_name: String,
        source: io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unrecognized stats header in: {}", paths.join(", "))]
    HeaderMismatch { paths: Vec<String> },

    #[error("{path} uses the {found} stats layout but earlier inputs use the {expected} layout")]
    MixedSchemas {
        path: String,
        expected: StatsSchema,
        found: StatsSchema,
    },

    #[error("Failed reading line {line} from {source_name}: {kind}")]
    Parse {
        source_name: String,
        line: usize,
        kind: LineError,
    },

    #[error("{column} overflows when summing {chrom}:{start}")]
    Overflow {
        chrom: String,
        start: u64,
        column: &'static str,
    },

    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

pub type Result<T> = std::result::Result<T, StatsError>;

/// Why a single data line could not be decoded.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LineError {
    #[error("expected {expected} columns, found {found}")]
    ColumnCount { expected: usize, found: usize },

    #[error("invalid {column} value '{value}'")]
    InvalidValue { column: &'static str, value: String },

    #[error("line is not valid UTF-8")]
    Encoding,
}

/// A summed column that no longer fits in a u64.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("{column} overflows")]
pub struct CountOverflow {
    pub column: &'static str,
}

#[inline]
fn add_count(
    total: &mut u64,
    n: u64,
    column: &'static str,
) -> std::result::Result<(), CountOverflow> {
    *total = total.checked_add(n).ok_or(CountOverflow { column })?;
    Ok(())
}

/// Column layout of a stats file, chosen from its header line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatsSchema {
    /// 17 columns, see [`FULL_HEADER`].
    Full,
    /// 5 columns, see [`SHORT_HEADER`].
    Short,
}

impl StatsSchema {
    /// Select a schema from a header line. Only an exact match counts.
    pub fn from_header(line: &str) -> Option<Self> {
        match crate::streaming::parsing::trim_line_end_str(line) {
            FULL_HEADER => Some(StatsSchema::Full),
            SHORT_HEADER => Some(StatsSchema::Short),
            _ => None,
        }
    }

    /// The header line written for this schema (without newline).
    pub fn header(self) -> &'static str {
        match self {
            StatsSchema::Full => FULL_HEADER,
            StatsSchema::Short => SHORT_HEADER,
        }
    }

    /// Number of tab-separated columns in a data line.
    pub fn column_count(self) -> usize {
        match self {
            StatsSchema::Full => 17,
            StatsSchema::Short => 5,
        }
    }
}

impl std::fmt::Display for StatsSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatsSchema::Full => write!(f, "full"),
            StatsSchema::Short => write!(f, "short"),
        }
    }
}

/// Numeric columns of a stats line.
///
/// The average map quality is held as `sum_map_q` (average times count) so
/// that lines can be added together; the average is recomputed on output.
/// Columns absent from the short schema stay zero.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StatFields {
    pub end: u64,
    pub total_reads: u64,
    pub num_dups: u64,
    pub num_qc_fail: u64,
    pub num_mapped: u64,
    pub num_paired: u64,
    pub num_proper: u64,
    pub num_zero_map_q: u64,
    pub num_lt10_map_q: u64,
    pub num_255_map_q: u64,
    pub num_map_q_pass: u64,
    pub sum_map_q: f64,
    pub avg_map_q_count: u64,
    pub depth: u64,
    pub num_q20: u64,
}

impl StatFields {
    /// Add another line's counts into this one.
    ///
    /// `end` is a coordinate, so it is copied rather than summed. Fails
    /// with the first column whose sum does not fit in a u64.
    pub fn accumulate(&mut self, other: &StatFields) -> std::result::Result<(), CountOverflow> {
        self.end = other.end;
        add_count(&mut self.total_reads, other.total_reads, "TotalReads")?;
        add_count(&mut self.num_dups, other.num_dups, "Dups")?;
        add_count(&mut self.num_qc_fail, other.num_qc_fail, "QCFail")?;
        add_count(&mut self.num_mapped, other.num_mapped, "Mapped")?;
        add_count(&mut self.num_paired, other.num_paired, "Paired")?;
        add_count(&mut self.num_proper, other.num_proper, "ProperPaired")?;
        add_count(&mut self.num_zero_map_q, other.num_zero_map_q, "ZeroMapQual")?;
        add_count(&mut self.num_lt10_map_q, other.num_lt10_map_q, "MapQual<10")?;
        add_count(&mut self.num_255_map_q, other.num_255_map_q, "MapQual255")?;
        add_count(&mut self.num_map_q_pass, other.num_map_q_pass, "PassMapQual")?;
        add_count(&mut self.avg_map_q_count, other.avg_map_q_count, "AverageMapQualCount")?;
        add_count(&mut self.depth, other.depth, "Depth")?;
        add_count(&mut self.num_q20, other.num_q20, "Q20Bases")?;
        self.sum_map_q += other.sum_map_q;
        Ok(())
    }

    /// Average map quality, or 0 when no reads contributed.
    pub fn average_map_quality(&self) -> f64 {
        if self.avg_map_q_count == 0 {
            0.0
        } else {
            self.sum_map_q / self.avg_map_q_count as f64
        }
    }
}

/// Sort key of a stats line: chromosome rank first, then start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordKey {
    pub rank: usize,
    pub start: u64,
}

impl RecordKey {
    pub fn new(rank: usize, start: u64) -> Self {
        Self { rank, start }
    }
}

/// A decoded data line whose chromosome has not been ranked yet.
#[derive(Debug, Clone, PartialEq)]
pub struct StatLine<'a> {
    pub chrom: &'a str,
    pub start: u64,
    pub fields: StatFields,
}

impl StatLine<'_> {
    /// Rank the chromosome, dropping the line if the name is unknown.
    ///
    /// Unknown names are reported by the resolver once per name.
    pub fn resolve(&self, resolver: &mut ChromResolver<'_>) -> Option<StatRecord> {
        let rank = resolver.resolve(self.chrom)?;
        Some(StatRecord {
            key: RecordKey::new(rank, self.start),
            fields: self.fields,
        })
    }
}

/// A ranked data line, ready to be merged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatRecord {
    pub key: RecordKey,
    pub fields: StatFields,
}

fn int_column(value: &str, column: &'static str) -> std::result::Result<u64, LineError> {
    parse_u64_fast(value.as_bytes()).ok_or_else(|| LineError::InvalidValue {
        column,
        value: value.to_string(),
    })
}

fn float_column(value: &str, column: &'static str) -> std::result::Result<f64, LineError> {
    value.parse().map_err(|_| LineError::InvalidValue {
        column,
        value: value.to_string(),
    })
}

/// Decode one data line (without its newline) according to `schema`.
///
/// The column count must match the schema exactly.
pub fn parse_line(line: &str, schema: StatsSchema) -> std::result::Result<StatLine<'_>, LineError> {
    let cols: Vec<&str> = line.split('\t').collect();
    if cols.len() != schema.column_count() {
        return Err(LineError::ColumnCount {
            expected: schema.column_count(),
            found: cols.len(),
        });
    }

    let chrom = cols[0];
    let start = int_column(cols[1], "chromStart")?;

    let fields = match schema {
        StatsSchema::Full => {
            let avg = float_column(cols[13], "AverageMapQuality")?;
            let count = int_column(cols[14], "AverageMapQualCount")?;
            StatFields {
                end: int_column(cols[2], "chromEnd")?,
                total_reads: int_column(cols[3], "TotalReads")?,
                num_dups: int_column(cols[4], "Dups")?,
                num_qc_fail: int_column(cols[5], "QCFail")?,
                num_mapped: int_column(cols[6], "Mapped")?,
                num_paired: int_column(cols[7], "Paired")?,
                num_proper: int_column(cols[8], "ProperPaired")?,
                num_zero_map_q: int_column(cols[9], "ZeroMapQual")?,
                num_lt10_map_q: int_column(cols[10], "MapQual<10")?,
                num_255_map_q: int_column(cols[11], "MapQual255")?,
                num_map_q_pass: int_column(cols[12], "PassMapQual")?,
                sum_map_q: avg * count as f64,
                avg_map_q_count: count,
                depth: int_column(cols[15], "Depth")?,
                num_q20: int_column(cols[16], "Q20Bases")?,
            }
        }
        StatsSchema::Short => {
            let avg = float_column(cols[3], "AverageMapQuality")?;
            let count = int_column(cols[4], "AverageMapQualCount")?;
            StatFields {
                num_zero_map_q: int_column(cols[2], "ZeroMapQual")?,
                sum_map_q: avg * count as f64,
                avg_map_q_count: count,
                ..StatFields::default()
            }
        }
    };

    Ok(StatLine {
        chrom,
        start,
        fields,
    })
}

#[inline]
fn write_int<W: Write>(out: &mut W, itoa_buf: &mut itoa::Buffer, n: u64) -> io::Result<()> {
    out.write_all(b"\t")?;
    out.write_all(itoa_buf.format(n).as_bytes())
}

/// Write one data line, newline included, in `schema` layout.
///
/// The average map quality is written with three decimals.
pub fn write_line<W: Write>(
    out: &mut W,
    itoa_buf: &mut itoa::Buffer,
    chrom: &str,
    start: u64,
    fields: &StatFields,
    schema: StatsSchema,
) -> io::Result<()> {
    out.write_all(chrom.as_bytes())?;
    write_int(out, itoa_buf, start)?;
    match schema {
        StatsSchema::Full => {
            for n in [
                fields.end,
                fields.total_reads,
                fields.num_dups,
                fields.num_qc_fail,
                fields.num_mapped,
                fields.num_paired,
                fields.num_proper,
                fields.num_zero_map_q,
                fields.num_lt10_map_q,
                fields.num_255_map_q,
                fields.num_map_q_pass,
            ] {
                write_int(out, itoa_buf, n)?;
            }
            write!(out, "\t{:.3}", fields.average_map_quality())?;
            write_int(out, itoa_buf, fields.avg_map_q_count)?;
            write_int(out, itoa_buf, fields.depth)?;
            write_int(out, itoa_buf, fields.num_q20)?;
        }
        StatsSchema::Short => {
            write_int(out, itoa_buf, fields.num_zero_map_q)?;
            write!(out, "\t{:.3}", fields.average_map_quality())?;
            write_int(out, itoa_buf, fields.avg_map_q_count)?;
        }
    }
    out.write_all(b"\n")
}

/// Format one data line as a string (without newline).
pub fn format_line(
    chrom: &str,
    start: u64,
    fields: &StatFields,
    schema: StatsSchema,
) -> io::Result<String> {
    let mut buf = Vec::with_capacity(128);
    let mut itoa_buf = itoa::Buffer::new();
    write_line(&mut buf, &mut itoa_buf, chrom, start, fields, schema)?;
    buf.pop();
    String::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}
