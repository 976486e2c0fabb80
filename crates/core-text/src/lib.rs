//! Text primitives shared by the overlay engine and the proofreading controller.
//!
//! Offsets handed across the host boundary (surface selection, correction
//! spans) are UTF-16 code-unit positions because that is what editable hosts
//! report. Everything in this crate converts between those offsets and Rust's
//! UTF-8 byte indices without ever splitting a scalar value.
//!
//! Exposed Components:
//! - `utf16`: length / slice / replace / clamp helpers over UTF-16 offsets.
//! - `segment`: grapheme segmentation carrying both byte and UTF-16 ranges.
//! - `width`: single authoritative cluster width function (`egc_width`).
//! - `correction`: the `Correction` record produced by correction engines.
//!
//! Invariants:
//! - Any UTF-16 offset that lands inside a surrogate pair is clamped down to
//!   the start of that pair; helpers never panic on out-of-range input.
//! - `Segment` ranges are contiguous and cover the whole input.

pub mod correction;
pub mod segment;
pub mod utf16;
pub mod width;

pub use correction::{Correction, CorrectionKind};
pub use segment::{Segment, segment};
pub use utf16::{Utf16Range, byte_index, clamp_offset, replace_range, slice, utf16_len};
pub use width::egc_width;
