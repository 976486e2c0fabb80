//! Grapheme cluster display width.
//!
//! `egc_width` is the single authoritative width function: the mirror layout
//! multiplies it by the surface's character advance, so every horizontal
//! measurement flows through here.
//!
//! Width precedence:
//! 1. Newlines and control clusters are zero width.
//! 2. Pictographic clusters (emoji, ZWJ sequences, flags, keycaps) are 2.
//! 3. Otherwise the widest scalar in the cluster per `unicode_width`,
//!    never less than 1 for a printable cluster.

use unicode_width::UnicodeWidthChar;

const ZWJ: char = '\u{200D}';
const VS16: char = '\u{FE0F}';
const KEYCAP_COMBINING: char = '\u{20E3}';

fn is_regional_indicator(c: char) -> bool {
    ('\u{1F1E6}'..='\u{1F1FF}').contains(&c)
}

fn is_extended_pictographic(c: char) -> bool {
    ('\u{1F300}'..='\u{1FAFF}').contains(&c) || ('\u{2600}'..='\u{27BF}').contains(&c)
}

/// Display width (in character advances) of one extended grapheme cluster.
pub fn egc_width(egc: &str) -> u16 {
    let mut chars = egc.chars();
    let Some(first) = chars.next() else {
        return 0;
    };
    if first == '\n' || first == '\r' || (first.is_control() && first != '\t') {
        return 0;
    }
    if first == '\t' {
        return 1;
    }
    let multi = egc.chars().nth(1).is_some();
    if multi
        && egc.chars().any(|c| {
            c == ZWJ || c == VS16 || c == KEYCAP_COMBINING || is_regional_indicator(c)
        })
    {
        return 2;
    }
    if is_extended_pictographic(first) {
        return 2;
    }
    let widest = egc
        .chars()
        .map(|c| UnicodeWidthChar::width(c).unwrap_or(0))
        .max()
        .unwrap_or(0);
    widest.clamp(1, 2) as u16
}
