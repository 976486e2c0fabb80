//! Box metrics derived from a surface's computed style.

use core_surface::{Edges, LineHeight, SurfaceStyle};

/// Multiplier browsers use for `line-height: normal` on common text fonts.
pub const NORMAL_LINE_HEIGHT: f64 = 1.2;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoxMetrics {
    pub border: Edges,
    pub padding: Edges,
    pub line_height_px: f64,
    /// Width available to text: box width minus border and padding, never negative.
    pub content_width: f64,
}

pub fn line_height_px(style: &SurfaceStyle) -> f64 {
    let px = match style.line_height {
        LineHeight::Px(px) => px,
        LineHeight::Multiplier(m) => m * style.font_size_px,
        LineHeight::Normal => NORMAL_LINE_HEIGHT * style.font_size_px,
    };
    if px.is_finite() && px > 0.0 { px } else { NORMAL_LINE_HEIGHT * style.font_size_px.max(1.0) }
}

pub fn measure(style: &SurfaceStyle) -> BoxMetrics {
    let chrome = style.border.horizontal() + style.padding.horizontal();
    BoxMetrics {
        border: style.border,
        padding: style.padding,
        line_height_px: line_height_px(style),
        content_width: (style.box_width_px - chrome).max(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style(line_height: LineHeight) -> SurfaceStyle {
        SurfaceStyle {
            font_size_px: 10.0,
            line_height,
            box_width_px: 100.0,
            border: Edges::uniform(1.0),
            padding: Edges::uniform(4.0),
            ..SurfaceStyle::default()
        }
    }

    #[test]
    fn line_height_variants() {
        assert_eq!(measure(&style(LineHeight::Px(18.0))).line_height_px, 18.0);
        assert_eq!(measure(&style(LineHeight::Multiplier(1.5))).line_height_px, 15.0);
        assert_eq!(measure(&style(LineHeight::Normal)).line_height_px, 12.0);
    }

    #[test]
    fn invalid_line_height_falls_back_to_normal() {
        assert_eq!(measure(&style(LineHeight::Px(0.0))).line_height_px, 12.0);
        assert_eq!(measure(&style(LineHeight::Px(f64::NAN))).line_height_px, 12.0);
    }

    #[test]
    fn content_width_excludes_chrome_and_never_negative() {
        assert_eq!(measure(&style(LineHeight::Normal)).content_width, 90.0);
        let tiny = SurfaceStyle {
            box_width_px: 4.0,
            ..style(LineHeight::Normal)
        };
        assert_eq!(measure(&tiny).content_width, 0.0);
    }
}
