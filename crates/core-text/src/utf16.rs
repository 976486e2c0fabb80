//! UTF-16 offset arithmetic over UTF-8 strings.
//!
//! Hosts report caret and selection positions in UTF-16 code units. These
//! helpers map such offsets onto byte indices, clamping rather than failing:
//! an offset past the end maps to the end, an offset inside a surrogate pair
//! maps to the start of the pair.

use serde::{Deserialize, Serialize};

/// Half-open `[start, end)` range in UTF-16 code units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Utf16Range {
    pub start: usize,
    pub end: usize,
}

impl Utf16Range {
    /// Construct a range normalizing ordering so that `start <= end`.
    pub fn new(a: usize, b: usize) -> Self {
        if a <= b {
            Self { start: a, end: b }
        } else {
            Self { start: b, end: a }
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// True when `offset` lies in `[start, end)`.
    pub fn contains(&self, offset: usize) -> bool {
        offset >= self.start && offset < self.end
    }

    /// Clamp both ends into `[0, len]`.
    pub fn clamped(self, len: usize) -> Self {
        Self {
            start: self.start.min(len),
            end: self.end.min(len),
        }
    }
}

/// Length of `text` in UTF-16 code units.
pub fn utf16_len(text: &str) -> usize {
    text.chars().map(char::len_utf16).sum()
}

/// Map a UTF-16 offset to a byte index on a char boundary.
pub fn byte_index(text: &str, offset: usize) -> usize {
    let mut units = 0usize;
    for (byte, ch) in text.char_indices() {
        let next = units + ch.len_utf16();
        if next > offset {
            return byte;
        }
        units = next;
    }
    text.len()
}

/// Clamp a UTF-16 offset to a valid scalar boundary not exceeding the text length.
pub fn clamp_offset(text: &str, offset: usize) -> usize {
    let mut units = 0usize;
    for ch in text.chars() {
        let next = units + ch.len_utf16();
        if next > offset {
            return units;
        }
        units = next;
    }
    units
}

/// Slice `text` by a UTF-16 range (clamped).
pub fn slice(text: &str, range: Utf16Range) -> &str {
    let start = byte_index(text, range.start);
    let end = byte_index(text, range.end).max(start);
    &text[start..end]
}

/// Replace the UTF-16 span `range` with `replacement`, returning the new string.
pub fn replace_range(text: &str, range: Utf16Range, replacement: &str) -> String {
    let start = byte_index(text, range.start);
    let end = byte_index(text, range.end).max(start);
    let mut out = String::with_capacity(text.len() - (end - start) + replacement.len());
    out.push_str(&text[..start]);
    out.push_str(replacement);
    out.push_str(&text[end..]);
    out
}
