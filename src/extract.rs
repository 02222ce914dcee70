//! Tagged-field extraction and allocation-free IPv4 parsing.
//!
//! The extractor scans raw chunk bytes for the literal tag `ip=`, takes the
//! bytes up to the next `;` as the address candidate, and folds it straight
//! into a 32-bit key: each dot-separated run of ASCII digits is accumulated
//! decimally and folded via `(acc << 8) | seg`. For a well-formed dotted
//! quad this is exactly the big-endian packing of the four octets.
//!
//! # Known limitation: no validation
//!
//! The parser performs digit/period scanning only. It does not check octet
//! count, digit count, or value range: an empty candidate parses to key 0,
//! leading zeros are read as decimal, and a 4-digit segment overflows into
//! the neighboring octet's bits. The result is deterministic but
//! semantically meaningless for malformed input, and it is counted like any
//! other key. This mirrors the reference behavior and keeps the hot loop
//! branch-free; do not "fix" it without changing the key encoding contract.

use memchr::memchr;
use memchr::memmem::{self, Finder};

/// The tag marker preceding an address candidate.
pub const TAG: &[u8] = b"ip=";

/// The delimiter terminating an address candidate.
pub const DELIM: u8 = b';';

/// Reusable scanner for `ip=<candidate>;` occurrences.
///
/// Construct once per worker and reuse across chunks: the `memmem` finder
/// precomputes its search tables.
pub struct TagExtractor {
    finder: Finder<'static>,
}

impl Default for TagExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl TagExtractor {
    pub fn new() -> Self {
        Self {
            finder: memmem::Finder::new(TAG),
        }
    }

    /// Finds the next tagged address at or after `from`.
    ///
    /// Returns the parsed key and the offset just past the delimiter, so the
    /// caller can resume scanning the same buffer for further occurrences.
    /// Returns `None` when no tag remains, or when a tag has no delimiter
    /// before the end of the buffer (line-aligned chunking guarantees that
    /// case only for a truncated final line).
    #[inline]
    pub fn extract_next(&self, buf: &[u8], from: usize) -> Option<(u32, usize)> {
        if from >= buf.len() {
            return None;
        }
        let tag_at = from + self.finder.find(&buf[from..])?;
        let candidate_start = tag_at + TAG.len();
        let delim_rel = memchr(DELIM, &buf[candidate_start..])?;
        let candidate = &buf[candidate_start..candidate_start + delim_rel];
        Some((parse_ip_key(candidate), candidate_start + delim_rel + 1))
    }

    /// Runs the extractor over a whole buffer, invoking `hit` per key.
    ///
    /// This is the worker hot loop: scan, fold, resume past the delimiter.
    #[inline]
    pub fn for_each(&self, buf: &[u8], mut hit: impl FnMut(u32)) -> u64 {
        let mut offset = 0;
        let mut matches = 0u64;
        while let Some((key, next)) = self.extract_next(buf, offset) {
            hit(key);
            matches += 1;
            offset = next;
        }
        matches
    }
}

/// Folds a dotted-decimal candidate into a 32-bit key.
///
/// Fold order is load-bearing: `(acc << 8) | seg` per dot-run defines the
/// key encoding that [`format_ip`] and the report depend on.
#[inline]
pub fn parse_ip_key(candidate: &[u8]) -> u32 {
    let mut acc: u32 = 0;
    let mut seg: u32 = 0;
    for &b in candidate {
        if b == b'.' {
            acc = (acc << 8) | seg;
            seg = 0;
        } else if b.is_ascii_digit() {
            seg = seg.wrapping_mul(10).wrapping_add((b - b'0') as u32);
        }
    }
    (acc << 8) | seg
}

/// Renders a key back to dotted-decimal.
///
/// Inverse of [`parse_ip_key`] for well-formed addresses.
pub fn format_ip(key: u32) -> String {
    format!(
        "{}.{}.{}.{}",
        (key >> 24) & 0xff,
        (key >> 16) & 0xff,
        (key >> 8) & 0xff,
        key & 0xff
    )
}
