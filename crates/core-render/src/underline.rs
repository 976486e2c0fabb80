//! Underline renderer: range descriptors → positioned overlay nodes.
//!
//! Each render pass:
//! 1. Culls descriptors whose padded rect falls outside the viewport grown by
//!    the virtualization margin on both axes.
//! 2. Creates or updates one node per surviving descriptor, keyed by
//!    `descriptor.key`, with a viewport-relative rect (content rect + padding
//!    − scroll). A node whose computed state equals the last sent state is not
//!    re-sent.
//! 3. Removes every previously rendered node not touched this pass. This is
//!    the only place nodes are destroyed besides `clear`.
//!
//! The renderer owns the footprint; the sink owns the actual nodes.

use ahash::{AHashMap, AHashSet};
use core_config::{Palette, UnderlineStyle};
use core_surface::{Edges, Point, Rect, Size};
use core_text::CorrectionKind;

use crate::issue::RangeDescriptor;

/// ARIA role every marker node carries.
pub const NODE_ROLE: &str = "button";

#[derive(Debug, Clone, PartialEq)]
pub struct OverlayNode {
    pub key: String,
    pub issue_id: String,
    pub kind: CorrectionKind,
    /// Relative to the overlay (padding box) after scroll.
    pub rect: Rect,
    pub role: &'static str,
    pub label: String,
    /// `aria-pressed`: this node's issue is the active one.
    pub pressed: bool,
    pub active: bool,
    pub preview: bool,
    pub color: String,
    pub style: UnderlineStyle,
}

pub trait OverlaySink {
    fn create_node(&mut self, node: &OverlayNode);
    fn update_node(&mut self, node: &OverlayNode);
    fn remove_node(&mut self, key: &str);
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    pub padding: Edges,
    pub scroll: Point,
    /// Visible client area of the surface.
    pub client: Size,
    pub line_height: f64,
    pub margin: f64,
    pub active_issue: Option<String>,
    pub preview_issue: Option<String>,
    pub palette: Palette,
    pub style: UnderlineStyle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderStats {
    pub created: usize,
    pub updated: usize,
    pub removed: usize,
    pub culled: usize,
    /// Touched but unchanged; nothing sent.
    pub kept: usize,
}

#[derive(Debug, Default)]
pub struct UnderlineRenderer {
    nodes: AHashMap<String, OverlayNode>,
    passes: u64,
}

impl UnderlineRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(
        &mut self,
        sink: &mut dyn OverlaySink,
        descriptors: &[RangeDescriptor],
        opts: &RenderOptions,
    ) -> RenderStats {
        let mut stats = RenderStats::default();
        let mut touched: AHashSet<&str> = AHashSet::with_capacity(descriptors.len());
        let window = Rect::new(
            opts.scroll.x - opts.margin,
            opts.scroll.y - opts.margin,
            opts.client.width + 2.0 * opts.margin,
            opts.client.height + 2.0 * opts.margin,
        );
        for d in descriptors {
            let padded = d.rect.translate(opts.padding.left, opts.padding.top);
            if !padded.intersects(&window) {
                stats.culled += 1;
                continue;
            }
            touched.insert(d.key.as_str());
            let node = Self::node_for(d, padded, opts);
            match self.nodes.get(&d.key) {
                Some(prev) if *prev == node => stats.kept += 1,
                Some(_) => {
                    sink.update_node(&node);
                    self.nodes.insert(d.key.clone(), node);
                    stats.updated += 1;
                }
                None => {
                    sink.create_node(&node);
                    self.nodes.insert(d.key.clone(), node);
                    stats.created += 1;
                }
            }
        }
        let stale: Vec<String> = self
            .nodes
            .keys()
            .filter(|k| !touched.contains(k.as_str()))
            .cloned()
            .collect();
        for key in stale {
            sink.remove_node(&key);
            self.nodes.remove(&key);
            stats.removed += 1;
        }
        self.passes += 1;
        tracing::trace!(
            target: "render.underline",
            pass = self.passes,
            created = stats.created,
            updated = stats.updated,
            removed = stats.removed,
            culled = stats.culled,
            kept = stats.kept,
            "underline_render"
        );
        stats
    }

    fn node_for(d: &RangeDescriptor, padded: Rect, opts: &RenderOptions) -> OverlayNode {
        let active = opts.active_issue.as_deref() == Some(d.issue_id.as_str());
        let preview = opts.preview_issue.as_deref() == Some(d.issue_id.as_str());
        OverlayNode {
            key: d.key.clone(),
            issue_id: d.issue_id.clone(),
            kind: d.kind,
            rect: padded.translate(-opts.scroll.x, -opts.scroll.y),
            role: NODE_ROLE,
            label: d.label.clone(),
            pressed: active,
            active,
            preview,
            color: opts.palette.color_for(d.kind).to_string(),
            style: opts.style,
        }
    }

    /// Remove every node.
    pub fn clear(&mut self, sink: &mut dyn OverlaySink) -> usize {
        let n = self.nodes.len();
        for key in self.nodes.keys() {
            sink.remove_node(key);
        }
        self.nodes.clear();
        n
    }

    pub fn node(&self, key: &str) -> Option<&OverlayNode> {
        self.nodes.get(key)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Bounding union of every rendered node for `issue_id` (overlay-relative).
    pub fn rect_for_issue(&self, issue_id: &str) -> Option<Rect> {
        self.nodes
            .values()
            .filter(|n| n.issue_id == issue_id)
            .map(|n| n.rect)
            .reduce(|a, b| {
                let x = a.x.min(b.x);
                let y = a.y.min(b.y);
                Rect::new(x, y, a.right().max(b.right()) - x, a.bottom().max(b.bottom()) - y)
            })
    }

    /// Sorted keys currently rendered.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.nodes.keys().cloned().collect();
        keys.sort();
        keys
    }
}
