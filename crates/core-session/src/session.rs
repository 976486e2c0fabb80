use std::cell::RefCell;
use std::rc::Rc;

use core_config::{Palette, UnderlineStyle};
use core_events::SurfaceEvent;
use core_render::{
    BoxMetrics, DirtyFlags, FrameClock, FrameScheduler, FrameToken, Issue, LayoutMirror, Mirror,
    OverlayHost, RangeDescriptor, RenderOptions, RenderStats, RenderTarget, build_descriptors,
    issues_from_corrections, measure,
};
use core_surface::{Rect, Surface, SurfaceId};
use core_text::Correction;
use tokio::task::JoinHandle;

use crate::{SessionHooks, SessionOptions};

pub(crate) struct SessionInner {
    pub(crate) host: Box<dyn OverlayHost>,
    pub(crate) mirror: Box<dyn Mirror>,
    pub(crate) target: RenderTarget,
    pub(crate) scheduler: FrameScheduler,
    pub(crate) dirty: DirtyFlags,
    pub(crate) issues: Vec<Issue>,
    pub(crate) descriptors: Vec<RangeDescriptor>,
    pub(crate) metrics: BoxMetrics,
    pub(crate) active_issue: Option<String>,
    pub(crate) preview_issue: Option<String>,
    /// Single activation held back while a double click may still follow.
    pub(crate) pending_activation: Option<JoinHandle<()>>,
    pub(crate) options: SessionOptions,
    pub(crate) attached: bool,
    pub(crate) disposed: bool,
    pub(crate) stats: SessionStats,
}

/// Counters for flush activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionStats {
    pub flushes: u64,
    pub layouts: u64,
    pub value_syncs: u64,
    pub measurements: u64,
    pub renders: u64,
    pub last_render: RenderStats,
}

pub struct TargetSession {
    pub(crate) surface: Rc<dyn Surface>,
    pub(crate) hooks: Rc<dyn SessionHooks>,
    pub(crate) inner: RefCell<SessionInner>,
}

impl std::fmt::Debug for TargetSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("TargetSession")
            .field("surface", &self.surface.id())
            .field("issues", &inner.issues.len())
            .field("dirty", &inner.dirty)
            .field("attached", &inner.attached)
            .finish_non_exhaustive()
    }
}

impl TargetSession {
    /// Build a session with the shipped `LayoutMirror`. The render target is
    /// picked here from the host's capabilities and never changes.
    pub fn new(
        surface: Rc<dyn Surface>,
        host: Box<dyn OverlayHost>,
        clock: Rc<dyn FrameClock>,
        options: SessionOptions,
        hooks: Rc<dyn SessionHooks>,
    ) -> Self {
        Self::with_mirror(surface, host, Box::new(LayoutMirror::new()), clock, options, hooks)
    }

    pub fn with_mirror(
        surface: Rc<dyn Surface>,
        host: Box<dyn OverlayHost>,
        mirror: Box<dyn Mirror>,
        clock: Rc<dyn FrameClock>,
        options: SessionOptions,
        hooks: Rc<dyn SessionHooks>,
    ) -> Self {
        let caps = host.capabilities();
        let target = RenderTarget::select(caps);
        tracing::debug!(
            target: "session",
            surface = %surface.id(),
            native = caps.native_range_highlights,
            "session_created"
        );
        let metrics = measure(&surface.style());
        Self {
            surface,
            hooks,
            inner: RefCell::new(SessionInner {
                host,
                mirror,
                target,
                scheduler: FrameScheduler::new(clock),
                dirty: DirtyFlags::LAYOUT | DirtyFlags::VALUE_SYNC,
                issues: Vec::new(),
                descriptors: Vec::new(),
                metrics,
                active_issue: None,
                preview_issue: None,
                pending_activation: None,
                options,
                attached: false,
                disposed: false,
                stats: SessionStats::default(),
            }),
        }
    }

    pub fn surface_id(&self) -> SurfaceId {
        self.surface.id()
    }

    pub fn surface(&self) -> &Rc<dyn Surface> {
        &self.surface
    }

    /// Record a host event and request a frame.
    pub fn handle_event(&self, event: SurfaceEvent) {
        let flag = match event {
            SurfaceEvent::Input => DirtyFlags::VALUE_SYNC,
            SurfaceEvent::SurfaceScroll => DirtyFlags::RENDER,
            SurfaceEvent::WindowScroll
            | SurfaceEvent::WindowResize
            | SurfaceEvent::SurfaceResize
            | SurfaceEvent::AttributeMutation => DirtyFlags::LAYOUT,
        };
        tracing::trace!(target: "session", ?event, "session_event");
        self.mark(flag);
    }

    pub(crate) fn mark(&self, flag: DirtyFlags) {
        let mut inner = self.inner.borrow_mut();
        if inner.disposed {
            return;
        }
        inner.dirty.insert(flag);
        inner.scheduler.schedule();
    }

    /// Frame callback from the host's clock. Stale tokens are ignored.
    pub fn on_frame(&self, token: FrameToken) -> bool {
        let accepted = self.inner.borrow_mut().scheduler.take_fired(token);
        if accepted {
            self.flush();
        }
        accepted
    }

    /// Drain all dirty flags now. Also used directly by hosts without a frame
    /// clock; a pending frame is cancelled.
    pub fn flush(&self) {
        let mut guard = self.inner.borrow_mut();
        let inner = &mut *guard;
        if inner.disposed {
            return;
        }
        inner.scheduler.cancel();
        inner.stats.flushes += 1;
        if inner.dirty.take(DirtyFlags::LAYOUT) {
            let style = self.surface.style();
            let border_box = self.surface.bounding_rect();
            inner.mirror.update_styles_from(&style);
            inner.mirror.set_width(border_box.width);
            inner.metrics = measure(&style);
            if inner.attached {
                inner.host.position(overlay_frame(border_box, &inner.metrics));
            }
            inner.dirty.insert(DirtyFlags::MEASUREMENT);
            inner.stats.layouts += 1;
        }
        if inner.dirty.take(DirtyFlags::VALUE_SYNC) {
            inner.mirror.set_value(&self.surface.text());
            inner.dirty.insert(DirtyFlags::MEASUREMENT);
            inner.stats.value_syncs += 1;
        }
        if inner.dirty.take(DirtyFlags::MEASUREMENT) {
            inner.descriptors = if inner.target.needs_measurement() {
                build_descriptors(inner.mirror.as_mut(), &inner.issues)
            } else {
                Vec::new()
            };
            inner.dirty.insert(DirtyFlags::RENDER);
            inner.stats.measurements += 1;
        }
        if inner.dirty.take(DirtyFlags::RENDER) && inner.attached {
            let opts = RenderOptions {
                padding: inner.metrics.padding,
                scroll: self.surface.scroll_offset(),
                client: self.surface.client_size(),
                line_height: inner.metrics.line_height_px,
                margin: inner.options.margin,
                active_issue: inner.active_issue.clone(),
                preview_issue: inner.preview_issue.clone(),
                palette: inner.options.palette.clone(),
                style: inner.options.style,
            };
            let stats = inner.target.render(
                inner.host.as_mut(),
                &inner.issues,
                &inner.descriptors,
                &opts,
            );
            inner.stats.renders += 1;
            inner.stats.last_render = stats;
        }
        tracing::trace!(target: "session", surface = %self.surface.id(), flushes = inner.stats.flushes, "session_flush");
    }

    /// Replace the issue set. The overlay is attached while at least one
    /// issue exists and detached (nodes cleared) when none remain.
    pub fn set_issues(&self, issues: Vec<Issue>) {
        let mut guard = self.inner.borrow_mut();
        let inner = &mut *guard;
        if inner.disposed {
            return;
        }
        inner.issues = issues;
        if inner.issues.is_empty() {
            if inner.attached {
                inner.target.clear(inner.host.as_mut());
                inner.host.detach();
                inner.attached = false;
                tracing::debug!(target: "session", surface = %self.surface.id(), "overlay_detached");
            }
            inner.descriptors.clear();
            inner.active_issue = None;
            inner.preview_issue = None;
            return;
        }
        if !inner.attached {
            inner.host.attach();
            inner.attached = true;
            inner.dirty.insert(DirtyFlags::LAYOUT | DirtyFlags::VALUE_SYNC);
            tracing::debug!(target: "session", surface = %self.surface.id(), issues = inner.issues.len(), "overlay_attached");
        }
        // The text may have changed with the issue set (applied correction).
        inner.dirty.insert(DirtyFlags::VALUE_SYNC | DirtyFlags::MEASUREMENT);
        inner.scheduler.schedule();
    }

    pub fn set_corrections(&self, corrections: &[Correction]) {
        self.set_issues(issues_from_corrections(corrections));
    }

    pub fn issues(&self) -> Vec<Issue> {
        self.inner.borrow().issues.clone()
    }

    pub fn descriptors(&self) -> Vec<RangeDescriptor> {
        self.inner.borrow().descriptors.clone()
    }

    pub fn set_active_issue(&self, id: Option<String>) {
        self.inner.borrow_mut().active_issue = id;
        self.mark(DirtyFlags::RENDER);
    }

    pub fn set_preview_issue(&self, id: Option<String>) {
        self.inner.borrow_mut().preview_issue = id;
        self.mark(DirtyFlags::RENDER);
    }

    pub fn set_underline_style(&self, style: UnderlineStyle) {
        self.inner.borrow_mut().options.style = style;
        self.mark(DirtyFlags::RENDER);
    }

    pub fn set_palette(&self, palette: Palette) {
        self.inner.borrow_mut().options.palette = palette;
        self.mark(DirtyFlags::RENDER);
    }

    pub fn is_attached(&self) -> bool {
        self.inner.borrow().attached
    }

    pub fn is_frame_pending(&self) -> bool {
        self.inner.borrow().scheduler.is_pending()
    }

    pub fn dirty(&self) -> DirtyFlags {
        self.inner.borrow().dirty
    }

    pub fn stats(&self) -> SessionStats {
        self.inner.borrow().stats
    }

    /// Cancel the pending frame, clear nodes and detach. Later calls are no-ops.
    pub fn dispose(&self) {
        let mut guard = self.inner.borrow_mut();
        let inner = &mut *guard;
        if inner.disposed {
            return;
        }
        inner.scheduler.cancel();
        if let Some(pending) = inner.pending_activation.take() {
            pending.abort();
        }
        inner.target.clear(inner.host.as_mut());
        if inner.attached {
            inner.host.detach();
            inner.attached = false;
        }
        inner.issues.clear();
        inner.descriptors.clear();
        inner.dirty = DirtyFlags::empty();
        inner.disposed = true;
        tracing::debug!(target: "session", surface = %self.surface.id(), "session_disposed");
    }
}

/// The overlay covers the padding box: the border box inset by the border.
pub(crate) fn overlay_frame(border_box: Rect, metrics: &BoxMetrics) -> Rect {
    Rect::new(
        border_box.x + metrics.border.left,
        border_box.y + metrics.border.top,
        (border_box.width - metrics.border.horizontal()).max(0.0),
        (border_box.height - metrics.border.vertical()).max(0.0),
    )
}
