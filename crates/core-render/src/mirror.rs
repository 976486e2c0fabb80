//! Mirror: an invisible layout proxy of a surface's text.
//!
//! The mirror's text always equals the live surface's value and its
//! font/box styles are copied from the surface, so asking it for the pixel
//! rectangles of a UTF-16 range answers "where is this text drawn" without
//! touching the surface itself.
//!
//! `LayoutMirror` is the deterministic implementation: grapheme clusters
//! advance `char_width_px * egc_width + letter_spacing_px`, `\n` is a hard
//! break, and with `wrap` enabled a line soft-wraps after the last whitespace
//! cluster that fits (or before the overflowing cluster when a single word is
//! wider than the line). Whitespace sitting on a soft-wrap point hangs at the
//! end of its line with zero advance.
//!
//! Coordinates are content-box-local: `(0, 0)` is the top-left of the first
//! line inside padding.
//!
//! Invariants:
//! - Layout always has at least one visual line (empty text included).
//! - Visual lines partition `[0, utf16_len(text)]` in order.
//! - Offsets are clamped into range; no method panics on bad input.

use crate::measure::{BoxMetrics, measure};
use core_surface::{Rect, SurfaceStyle};
use core_text::{clamp_offset, segment};

pub trait Mirror {
    fn set_value(&mut self, text: &str);
    fn update_styles_from(&mut self, style: &SurfaceStyle);
    /// Border-box width in px.
    fn set_width(&mut self, px: f64);
    /// One rect per visual line segment the range spans; degenerate segments omitted.
    fn get_rects(&mut self, start: usize, end: usize) -> Vec<Rect>;
    /// Caret box (zero width, one line tall) at `pos`.
    fn get_caret_rect(&mut self, pos: usize) -> Option<Rect>;
    fn metrics(&self) -> BoxMetrics;
}

#[derive(Debug, Clone, Copy)]
struct Glyph {
    utf16_start: usize,
    utf16_end: usize,
    x: f64,
    advance: f64,
    whitespace: bool,
}

#[derive(Debug, Clone, Default)]
struct VisualLine {
    utf16_start: usize,
    utf16_end: usize,
    glyphs: Vec<Glyph>,
    /// Line ended with `\n` (as opposed to a soft wrap or end of text).
    hard_break: bool,
}

impl VisualLine {
    fn starting_at(offset: usize) -> Self {
        Self {
            utf16_start: offset,
            utf16_end: offset,
            ..Self::default()
        }
    }

    fn end_x(&self) -> f64 {
        self.glyphs.last().map(|g| g.x + g.advance).unwrap_or(0.0)
    }

    /// x of the glyph boundary at or before `offset`.
    fn x_at(&self, offset: usize) -> f64 {
        for g in &self.glyphs {
            if offset < g.utf16_end {
                return g.x;
            }
        }
        self.end_x()
    }
}

#[derive(Debug)]
pub struct LayoutMirror {
    text: String,
    style: SurfaceStyle,
    metrics: BoxMetrics,
    lines: Vec<VisualLine>,
    stale: bool,
    relayouts: u64,
}

impl Default for LayoutMirror {
    fn default() -> Self {
        Self::new()
    }
}

impl LayoutMirror {
    pub fn new() -> Self {
        let style = SurfaceStyle::default();
        Self {
            text: String::new(),
            metrics: measure(&style),
            style,
            lines: Vec::new(),
            stale: true,
            relayouts: 0,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Number of visual lines after the most recent layout.
    pub fn line_count(&mut self) -> usize {
        self.ensure_layout();
        self.lines.len()
    }

    /// Layout passes performed so far (lazy: setters only mark stale).
    pub fn relayouts(&self) -> u64 {
        self.relayouts
    }

    /// Total laid-out height (lines × line height).
    pub fn content_height(&mut self) -> f64 {
        self.ensure_layout();
        self.lines.len() as f64 * self.metrics.line_height_px
    }

    fn ensure_layout(&mut self) {
        if !self.stale {
            return;
        }
        self.lines = self.layout();
        self.stale = false;
        self.relayouts += 1;
        tracing::trace!(target: "render.mirror", lines = self.lines.len(), width = self.metrics.content_width, "mirror_relayout");
    }

    fn layout(&self) -> Vec<VisualLine> {
        let limit = self.metrics.content_width;
        let char_w = self.style.char_width_px;
        let spacing = self.style.letter_spacing_px;
        let mut lines = Vec::new();
        let mut line = VisualLine::starting_at(0);
        for seg in segment(&self.text) {
            if seg.is_newline() {
                line.glyphs.push(Glyph {
                    utf16_start: seg.utf16_start,
                    utf16_end: seg.utf16_end,
                    x: line.end_x(),
                    advance: 0.0,
                    whitespace: true,
                });
                line.utf16_end = seg.utf16_end;
                line.hard_break = true;
                lines.push(std::mem::replace(
                    &mut line,
                    VisualLine::starting_at(seg.utf16_end),
                ));
                continue;
            }
            let advance = f64::from(seg.width) * char_w + spacing;
            let whitespace = seg.is_whitespace();
            let overflows = self.style.wrap
                && !line.glyphs.is_empty()
                && line.end_x() + advance > limit;
            if overflows {
                if whitespace {
                    // Hangs at the end of this line; the next cluster starts a new one.
                    line.glyphs.push(Glyph {
                        utf16_start: seg.utf16_start,
                        utf16_end: seg.utf16_end,
                        x: line.end_x(),
                        advance: 0.0,
                        whitespace,
                    });
                    line.utf16_end = seg.utf16_end;
                    lines.push(std::mem::replace(
                        &mut line,
                        VisualLine::starting_at(seg.utf16_end),
                    ));
                    continue;
                }
                let next = Self::break_line(&mut line);
                lines.push(std::mem::replace(&mut line, next));
            }
            line.glyphs.push(Glyph {
                utf16_start: seg.utf16_start,
                utf16_end: seg.utf16_end,
                x: line.end_x(),
                advance,
                whitespace,
            });
            line.utf16_end = seg.utf16_end;
        }
        lines.push(line);
        lines
    }

    /// Split `line` after its last whitespace cluster (collapsing it) or, with
    /// no break opportunity, at its end. Returns the continuation line.
    fn break_line(line: &mut VisualLine) -> VisualLine {
        let Some(split) = line.glyphs.iter().rposition(|g| g.whitespace).map(|i| i + 1) else {
            return VisualLine::starting_at(line.utf16_end);
        };
        if split == line.glyphs.len() {
            if let Some(ws) = line.glyphs.last_mut() {
                ws.advance = 0.0;
            }
            return VisualLine::starting_at(line.utf16_end);
        }
        let moved: Vec<Glyph> = line.glyphs.drain(split..).collect();
        if let Some(ws) = line.glyphs.last_mut() {
            ws.advance = 0.0;
            line.utf16_end = ws.utf16_end;
        }
        let mut next = VisualLine::starting_at(line.utf16_end);
        let origin = moved.first().map(|g| g.x).unwrap_or(0.0);
        for mut g in moved {
            g.x -= origin;
            next.utf16_end = g.utf16_end;
            next.glyphs.push(g);
        }
        next
    }

    fn clamp(&self, offset: usize) -> usize {
        clamp_offset(&self.text, offset)
    }

    /// Caret straight from layout. Offsets on a soft-wrap boundary are
    /// ambiguous (end of line N or start of N+1) and come back zero-size.
    fn raw_caret(&self, pos: usize) -> Rect {
        let lh = self.metrics.line_height_px;
        for (i, line) in self.lines.iter().enumerate() {
            let is_last = i + 1 == self.lines.len();
            if pos < line.utf16_end || is_last {
                if i > 0 && pos == line.utf16_start && !self.lines[i - 1].hard_break {
                    return Rect::new(line.x_at(pos), i as f64 * lh, 0.0, 0.0);
                }
                return Rect::new(line.x_at(pos), i as f64 * lh, 0.0, lh);
            }
        }
        Rect::new(0.0, 0.0, 0.0, lh)
    }

    /// Right edge of the cluster covering `pos`, on that cluster's line.
    fn trailing_edge(&self, pos: usize) -> Option<Rect> {
        let lh = self.metrics.line_height_px;
        self.lines.iter().enumerate().find_map(|(i, line)| {
            line.glyphs
                .iter()
                .find(|g| pos >= g.utf16_start && pos < g.utf16_end)
                .map(|g| Rect::new(g.x + g.advance, i as f64 * lh, 0.0, lh))
        })
    }
}

impl Mirror for LayoutMirror {
    fn set_value(&mut self, text: &str) {
        if self.text != text {
            self.text = text.to_string();
            self.stale = true;
        }
    }

    fn update_styles_from(&mut self, style: &SurfaceStyle) {
        // Width is owned by `set_width`; keep the current one.
        let width = self.style.box_width_px;
        let next = SurfaceStyle {
            box_width_px: width,
            ..*style
        };
        if next != self.style {
            self.style = next;
            self.metrics = measure(&self.style);
            self.stale = true;
        }
    }

    fn set_width(&mut self, px: f64) {
        let px = if px.is_finite() { px.max(0.0) } else { 0.0 };
        if px != self.style.box_width_px {
            self.style.box_width_px = px;
            self.metrics = measure(&self.style);
            self.stale = true;
        }
    }

    fn get_rects(&mut self, start: usize, end: usize) -> Vec<Rect> {
        self.ensure_layout();
        let start = self.clamp(start);
        let end = self.clamp(end);
        if start >= end {
            return Vec::new();
        }
        let lh = self.metrics.line_height_px;
        let mut out = Vec::new();
        for (i, line) in self.lines.iter().enumerate() {
            let s = start.max(line.utf16_start);
            let e = end.min(line.utf16_end);
            if s >= e {
                continue;
            }
            let x0 = line.x_at(s);
            let x1 = line.x_at(e);
            let rect = Rect::new(x0, i as f64 * lh, x1 - x0, lh);
            if rect.is_degenerate() {
                continue;
            }
            out.push(rect);
        }
        out
    }

    fn get_caret_rect(&mut self, pos: usize) -> Option<Rect> {
        self.ensure_layout();
        let pos = self.clamp(pos);
        let raw = self.raw_caret(pos);
        if raw.height > 0.0 || pos == 0 {
            return Some(raw);
        }
        let prev = self.clamp(pos - 1);
        self.trailing_edge(prev).or(Some(raw))
    }

    fn metrics(&self) -> BoxMetrics {
        self.metrics
    }
}
