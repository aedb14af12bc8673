//! Buffered output for stats streams.
//!
//! Integers go through itoa; the single float column is fixed to three
//! decimals.

use crate::record::{self, StatFields, StatsError, StatsSchema};
use crate::streaming::buffers::DEFAULT_OUTPUT_BUFFER;
use std::io::{BufWriter, Write};

/// Buffered writer for stats lines.
pub struct StatsWriter<W: Write> {
    writer: BufWriter<W>,
    itoa_buf: itoa::Buffer,
}

impl<W: Write> StatsWriter<W> {
    /// Create a new StatsWriter with the default 2MB buffer.
    pub fn new(output: W) -> Self {
        Self::with_capacity(DEFAULT_OUTPUT_BUFFER, output)
    }

    /// Create a new StatsWriter with specified buffer size.
    pub fn with_capacity(capacity: usize, output: W) -> Self {
        Self {
            writer: BufWriter::with_capacity(capacity, output),
            itoa_buf: itoa::Buffer::new(),
        }
    }

    /// Write the header line for `schema`.
    pub fn write_header(&mut self, schema: StatsSchema) -> Result<(), StatsError> {
        self.write_line(schema.header().as_bytes())
    }

    /// Write one aggregated stats line.
    #[inline]
    pub fn write_record(
        &mut self,
        chrom: &str,
        start: u64,
        fields: &StatFields,
        schema: StatsSchema,
    ) -> Result<(), StatsError> {
        record::write_line(
            &mut self.writer,
            &mut self.itoa_buf,
            chrom,
            start,
            fields,
            schema,
        )
        .map_err(StatsError::Io)
    }

    /// Write a full line as-is with newline.
    #[inline]
    pub fn write_line(&mut self, line: &[u8]) -> Result<(), StatsError> {
        self.writer.write_all(line).map_err(StatsError::Io)?;
        self.writer.write_all(b"\n").map_err(StatsError::Io)?;
        Ok(())
    }

    /// Flush the output buffer.
    pub fn flush(&mut self) -> Result<(), StatsError> {
        self.writer.flush().map_err(StatsError::Io)?;
        Ok(())
    }
}
