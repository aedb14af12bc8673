//! Zero-allocation parsing utilities for tab-delimited stats lines.
//!
//! These functions work on raw bytes so the filter path never has to
//! validate or copy a line it is going to write back verbatim.

use memchr::memchr;

/// Fast u64 parsing - no allocation, no error formatting.
///
/// Returns None if the input is empty, contains non-digit characters,
/// or does not fit in a u64.
#[inline(always)]
pub fn parse_u64_fast(bytes: &[u8]) -> Option<u64> {
    if bytes.is_empty() {
        return None;
    }
    let mut n: u64 = 0;
    for &b in bytes {
        let d = b.wrapping_sub(b'0');
        if d > 9 {
            return None;
        }
        n = n.checked_mul(10)?.checked_add(d as u64)?;
    }
    Some(n)
}

/// Strip a trailing `\n` or `\r\n` from a line.
#[inline(always)]
pub fn trim_line_end(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Same as [`trim_line_end`] for `&str` lines.
#[inline(always)]
pub fn trim_line_end_str(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

/// Extract the chromosome token and start position from a stats line.
///
/// Only the first two tab-separated columns are inspected; the rest of the
/// line is ignored, so this works for either stats schema. Returns None for
/// header lines, blank lines and lines whose second column is not an integer.
#[inline(always)]
pub fn parse_chrom_pos(line: &[u8]) -> Option<(&[u8], u64)> {
    let tab1 = memchr(b'\t', line)?;
    let chrom = &line[..tab1];
    if chrom.is_empty() {
        return None;
    }

    let rest = &line[tab1 + 1..];
    let pos_len = memchr(b'\t', rest).unwrap_or(rest.len());
    let pos = parse_u64_fast(&rest[..pos_len])?;

    Some((chrom, pos))
}

/// Parse the three columns of a region-list line: `chrom\tstart\tend`.
///
/// Columns after the third are ignored.
#[inline(always)]
pub fn parse_region_bytes(line: &[u8]) -> Option<(&[u8], u64, u64)> {
    let tab1 = memchr(b'\t', line)?;
    let chrom = &line[..tab1];
    if chrom.is_empty() {
        return None;
    }

    let rest1 = &line[tab1 + 1..];
    let tab2 = memchr(b'\t', rest1)?;
    let start = parse_u64_fast(&rest1[..tab2])?;

    let rest2 = &rest1[tab2 + 1..];
    let end_len = memchr(b'\t', rest2).unwrap_or(rest2.len());
    let end = parse_u64_fast(&rest2[..end_len])?;

    Some((chrom, start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_u64_fast() {
        assert_eq!(parse_u64_fast(b"12345"), Some(12345));
        assert_eq!(parse_u64_fast(b"0"), Some(0));
        assert_eq!(parse_u64_fast(b""), None);
        assert_eq!(parse_u64_fast(b"abc"), None);
        assert_eq!(parse_u64_fast(b"123abc"), None);
        assert_eq!(parse_u64_fast(b"-5"), None);
        assert_eq!(parse_u64_fast(b"18446744073709551615"), Some(u64::MAX));
        assert_eq!(parse_u64_fast(b"18446744073709551616"), None);
    }

    #[test]
    fn test_trim_line_end() {
        assert_eq!(trim_line_end(b"1\t100\n"), b"1\t100");
        assert_eq!(trim_line_end(b"1\t100\r\n"), b"1\t100");
        assert_eq!(trim_line_end(b"1\t100"), b"1\t100");
        assert_eq!(trim_line_end_str("chrom\tchromStart\r\n"), "chrom\tchromStart");
    }

    #[test]
    fn test_parse_chrom_pos() {
        assert_eq!(parse_chrom_pos(b"1\t100\t5\t30.000\t4"), Some((&b"1"[..], 100)));
        assert_eq!(parse_chrom_pos(b"X\t7"), Some((&b"X"[..], 7)));
        assert_eq!(parse_chrom_pos(b"chrom\tchromStart\tZeroMapQual"), None);
        assert_eq!(parse_chrom_pos(b"1"), None);
        assert_eq!(parse_chrom_pos(b"\t100"), None);
        assert_eq!(parse_chrom_pos(b""), None);
    }

    #[test]
    fn test_parse_region_bytes() {
        assert_eq!(parse_region_bytes(b"1\t50\t150"), Some((&b"1"[..], 50, 150)));
        assert_eq!(
            parse_region_bytes(b"MT\t0\t16569\tname"),
            Some((&b"MT"[..], 0, 16569))
        );
        assert_eq!(parse_region_bytes(b"1\t50"), None);
        assert_eq!(parse_region_bytes(b"1\tfifty\t150"), None);
    }
}
