//! Render target selection.
//!
//! The host's capabilities are probed once when a session is built and pick
//! one of two targets for its lifetime: overlay boxes measured through the
//! mirror, or native range highlights painted by the host.

use core_surface::{HostCapabilities, Rect};

use crate::issue::{Issue, RangeDescriptor};
use crate::native::{HighlightRegistry, NativeHighlighter};
use crate::underline::{OverlaySink, RenderOptions, RenderStats, UnderlineRenderer};

/// Everything a session needs from the page: a node container sitting over
/// the surface's padding box, plus optional native highlighting.
pub trait OverlayHost: OverlaySink + HighlightRegistry {
    fn attach(&mut self);
    fn detach(&mut self);
    /// Place the overlay container (page space).
    fn position(&mut self, frame: Rect);
    fn capabilities(&self) -> HostCapabilities;
}

#[derive(Debug)]
pub enum RenderTarget {
    Overlay(UnderlineRenderer),
    Native(NativeHighlighter),
}

impl RenderTarget {
    pub fn select(caps: HostCapabilities) -> Self {
        if caps.native_range_highlights {
            RenderTarget::Native(NativeHighlighter::new())
        } else {
            RenderTarget::Overlay(UnderlineRenderer::new())
        }
    }

    pub fn needs_measurement(&self) -> bool {
        matches!(self, RenderTarget::Overlay(_))
    }

    pub fn render(
        &mut self,
        host: &mut dyn OverlayHost,
        issues: &[Issue],
        descriptors: &[RangeDescriptor],
        opts: &RenderOptions,
    ) -> RenderStats {
        match self {
            RenderTarget::Overlay(r) => r.render(host, descriptors, opts),
            RenderTarget::Native(n) => {
                let updated = n.publish(host, issues);
                RenderStats {
                    updated,
                    ..RenderStats::default()
                }
            }
        }
    }

    pub fn clear(&mut self, host: &mut dyn OverlayHost) {
        match self {
            RenderTarget::Overlay(r) => {
                r.clear(host);
            }
            RenderTarget::Native(n) => n.clear(host),
        }
    }

    pub fn overlay(&self) -> Option<&UnderlineRenderer> {
        match self {
            RenderTarget::Overlay(r) => Some(r),
            RenderTarget::Native(_) => None,
        }
    }
}
