use std::ops::Range;

use serde::{Deserialize, Serialize};

/// Byte-offset span of an argument or call inside the host's source text.
///
/// Start is inclusive, end is exclusive. The resolver never reads source
/// text itself; spans are carried through so diagnostics can point back at
/// the argument that failed to convert or the call that was ambiguous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(start: u32, end: u32) -> Self {
        debug_assert!(start <= end, "span start ({start}) must be <= end ({end})");
        Self { start, end }
    }

    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Smallest span covering both `self` and `other`.
    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Convert to a `usize` range clamped to `source_len`, never empty when
    /// the source is non-empty (ariadne needs at least one character).
    pub fn to_range(self, source_len: usize) -> Range<usize> {
        let start = (self.start as usize).min(source_len);
        let end = (self.end as usize).min(source_len).max(start);
        if start == end {
            start..(end + 1).min(source_len)
        } else {
            start..end
        }
    }
}

/// Line start table for turning byte offsets into 1-based (line, column).
#[derive(Debug)]
pub struct LineIndex {
    line_starts: Vec<u32>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0u32];
        for (i, byte) in source.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push((i + 1) as u32);
            }
        }
        Self { line_starts }
    }

    /// 1-based (line, column); column counts bytes.
    pub fn line_col(&self, offset: u32) -> (u32, u32) {
        let line_idx = self
            .line_starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1);
        let line = (line_idx as u32) + 1;
        let col = offset - self.line_starts[line_idx] + 1;
        (line, col)
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_covers_both() {
        let merged = Span::new(5, 10).merge(Span::new(8, 15));
        assert_eq!(merged, Span::new(5, 15));
        assert_eq!(merged.len(), 10);
    }

    #[test]
    fn to_range_clamps_and_widens_empty() {
        assert_eq!(Span::new(2, 2).to_range(10), 2..3);
        assert_eq!(Span::new(4, 40).to_range(10), 4..10);
        assert_eq!(Span::new(12, 14).to_range(10), 10..10);
    }

    #[test]
    fn line_col_across_lines() {
        let idx = LineIndex::new("m.get(\n  \"k\")\nx");
        assert_eq!(idx.line_col(0), (1, 1));
        assert_eq!(idx.line_col(9), (2, 3));
        assert_eq!(idx.line_col(14), (3, 1));
        assert_eq!(idx.line_count(), 3);
    }
}
