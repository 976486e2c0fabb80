//! Computed style subset the mirror needs to reproduce a surface's layout.

use crate::geometry::Edges;
use serde::{Deserialize, Serialize};

/// CSS `line-height` as the host computed it.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum LineHeight {
    #[default]
    Normal,
    Px(f64),
    Multiplier(f64),
}

/// Font and box properties copied onto the mirror.
///
/// `char_width_px` is the advance of a single-width cluster; the mirror
/// multiplies it by the cluster width.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceStyle {
    pub font_size_px: f64,
    pub line_height: LineHeight,
    pub char_width_px: f64,
    pub letter_spacing_px: f64,
    pub border: Edges,
    pub padding: Edges,
    /// Soft wrapping enabled (`white-space: pre-wrap`); single-line controls set false.
    pub wrap: bool,
    /// Border-box width of the surface.
    pub box_width_px: f64,
}

impl Default for SurfaceStyle {
    fn default() -> Self {
        Self {
            font_size_px: 16.0,
            line_height: LineHeight::Normal,
            char_width_px: 8.0,
            letter_spacing_px: 0.0,
            border: Edges::uniform(1.0),
            padding: Edges::uniform(4.0),
            wrap: true,
            box_width_px: 320.0,
        }
    }
}
