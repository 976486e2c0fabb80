//! Grapheme segmentation adapter.
//!
//! Contract:
//! - Input: &str exactly as the surface reports it (no normalization; offsets
//!   must stay valid against the host's own text).
//! - Output: `Vec<Segment>`, one per extended grapheme cluster, carrying both
//!   byte and UTF-16 ranges plus the display width in cells.
//! - Guarantees: clusters are in order, non-overlapping, and concatenate back
//!   to the input.
//! - Does not log content.

use crate::egc_width;
use unicode_segmentation::UnicodeSegmentation;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub cluster: String,
    pub byte_start: usize,
    pub byte_end: usize,
    pub utf16_start: usize,
    pub utf16_end: usize,
    pub width: u16,
}

impl Segment {
    pub fn is_whitespace(&self) -> bool {
        self.cluster.chars().all(char::is_whitespace)
    }

    pub fn is_newline(&self) -> bool {
        self.cluster == "\n" || self.cluster == "\r\n"
    }
}

/// Segment into grapheme clusters with byte / UTF-16 ranges and widths.
pub fn segment(input: &str) -> Vec<Segment> {
    let mut out = Vec::new();
    let mut units = 0usize;
    for (byte, g) in input.grapheme_indices(true) {
        let len16: usize = g.chars().map(char::len_utf16).sum();
        out.push(Segment {
            cluster: g.to_string(),
            byte_start: byte,
            byte_end: byte + g.len(),
            utf16_start: units,
            utf16_end: units + len16,
            width: egc_width(g),
        });
        units += len16;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combining_sequence_is_single_cluster() {
        let segs = segment("e\u{0301}x");
        assert_eq!(segs.len(), 2);
        assert_eq!(segs[0].utf16_end, 2);
        assert_eq!(segs[1].utf16_start, 2);
        assert_eq!(segs[0].width, 1);
    }

    #[test]
    fn ranges_are_contiguous_and_cover_input() {
        let s = "漢😀a\nb";
        let segs = segment(s);
        let mut prev_byte = 0usize;
        let mut prev_u16 = 0usize;
        let mut join = String::new();
        for seg in &segs {
            assert_eq!(seg.byte_start, prev_byte);
            assert_eq!(seg.utf16_start, prev_u16);
            prev_byte = seg.byte_end;
            prev_u16 = seg.utf16_end;
            join.push_str(&seg.cluster);
        }
        assert_eq!(join, s);
        assert_eq!(prev_u16, crate::utf16_len(s));
        assert!(segs.iter().any(Segment::is_newline));
    }

    #[test]
    fn crlf_is_one_newline_cluster() {
        let segs = segment("a\r\nb");
        assert_eq!(segs.len(), 3);
        assert!(segs[1].is_newline());
    }
}
