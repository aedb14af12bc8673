//! Buffer size constants for streaming operations.
//!
//! Every merge input stays open for the whole run, so the per-stream input
//! buffer is kept smaller than the output buffer.

/// Output buffer size (2 MB).
pub const DEFAULT_OUTPUT_BUFFER: usize = 2 * 1024 * 1024;

/// Input buffer size for a single stats stream (256 KB).
pub const DEFAULT_INPUT_BUFFER: usize = 256 * 1024;

/// Input buffer size used per stream once many streams are open (64 KB).
pub const MANY_STREAMS_INPUT_BUFFER: usize = 64 * 1024;

/// Stream count above which [`MANY_STREAMS_INPUT_BUFFER`] is used.
pub const MANY_STREAMS_THRESHOLD: usize = 16;

/// Default line buffer capacity (1 KB).
/// A full-schema stats line is well under this.
pub const DEFAULT_LINE_BUFFER: usize = 1024;

/// Returns the per-stream input buffer size for a merge over `streams` inputs.
#[inline]
pub const fn input_buffer_size(streams: usize) -> usize {
    if streams > MANY_STREAMS_THRESHOLD {
        MANY_STREAMS_INPUT_BUFFER
    } else {
        DEFAULT_INPUT_BUFFER
    }
}
