//! Frame scheduling.
//!
//! The session never renders synchronously from an event handler. It marks
//! dirty flags and asks the host for one animation frame; further requests
//! before that frame fires coalesce into it. When the frame fires the host
//! hands the token back and the session flushes.
//!
//! `FrameClock` is the host seam (`requestAnimationFrame` / `cancelAnimationFrame`
//! in a browser). `ManualFrameClock` is the deterministic implementation used by
//! tests and the headless binary: frames fire only when `fire()` is called.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering::Relaxed};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameToken(pub u64);

pub trait FrameClock {
    fn request_frame(&self) -> FrameToken;
    fn cancel_frame(&self, token: FrameToken);
}

#[derive(Debug, Default)]
struct FrameMetrics {
    requests: AtomicU64,
    coalesced: AtomicU64,
    fired: AtomicU64,
    cancelled: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameMetricsSnapshot {
    /// Frames actually requested from the clock.
    pub requests: u64,
    /// `schedule` calls absorbed by an already pending frame.
    pub coalesced: u64,
    pub fired: u64,
    pub cancelled: u64,
}

/// At most one pending frame per session.
pub struct FrameScheduler {
    clock: Rc<dyn FrameClock>,
    pending: Option<FrameToken>,
    metrics: FrameMetrics,
}

impl std::fmt::Debug for FrameScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameScheduler")
            .field("pending", &self.pending)
            .field("metrics", &self.metrics)
            .finish()
    }
}

impl FrameScheduler {
    pub fn new(clock: Rc<dyn FrameClock>) -> Self {
        Self {
            clock,
            pending: None,
            metrics: FrameMetrics::default(),
        }
    }

    /// Request a frame unless one is already pending. Returns true when a new
    /// frame was requested.
    pub fn schedule(&mut self) -> bool {
        if self.pending.is_some() {
            self.metrics.coalesced.fetch_add(1, Relaxed);
            return false;
        }
        let token = self.clock.request_frame();
        tracing::trace!(target: "render.frame", token = token.0, "frame_requested");
        self.pending = Some(token);
        self.metrics.requests.fetch_add(1, Relaxed);
        true
    }

    pub fn cancel(&mut self) {
        if let Some(token) = self.pending.take() {
            self.clock.cancel_frame(token);
            self.metrics.cancelled.fetch_add(1, Relaxed);
            tracing::trace!(target: "render.frame", token = token.0, "frame_cancelled");
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Accept a fired frame. False for stale or foreign tokens (already
    /// cancelled, or belonging to another scheduler).
    pub fn take_fired(&mut self, token: FrameToken) -> bool {
        if self.pending != Some(token) {
            return false;
        }
        self.pending = None;
        self.metrics.fired.fetch_add(1, Relaxed);
        true
    }

    pub fn metrics_snapshot(&self) -> FrameMetricsSnapshot {
        FrameMetricsSnapshot {
            requests: self.metrics.requests.load(Relaxed),
            coalesced: self.metrics.coalesced.load(Relaxed),
            fired: self.metrics.fired.load(Relaxed),
            cancelled: self.metrics.cancelled.load(Relaxed),
        }
    }
}

/// Frame clock driven by hand. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct ManualFrameClock {
    inner: Rc<ManualClockState>,
}

#[derive(Debug, Default)]
struct ManualClockState {
    next: Cell<u64>,
    queued: RefCell<Vec<FrameToken>>,
    requests: Cell<u64>,
    cancels: Cell<u64>,
}

impl ManualFrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain and return every frame requested (and not cancelled) so far.
    pub fn fire(&self) -> Vec<FrameToken> {
        std::mem::take(&mut *self.inner.queued.borrow_mut())
    }

    pub fn queued(&self) -> usize {
        self.inner.queued.borrow().len()
    }

    pub fn requests(&self) -> u64 {
        self.inner.requests.get()
    }

    pub fn cancels(&self) -> u64 {
        self.inner.cancels.get()
    }
}

impl FrameClock for ManualFrameClock {
    fn request_frame(&self) -> FrameToken {
        let id = self.inner.next.get() + 1;
        self.inner.next.set(id);
        self.inner.requests.set(self.inner.requests.get() + 1);
        let token = FrameToken(id);
        self.inner.queued.borrow_mut().push(token);
        token
    }

    fn cancel_frame(&self, token: FrameToken) {
        self.inner.cancels.set(self.inner.cancels.get() + 1);
        self.inner.queued.borrow_mut().retain(|t| *t != token);
    }
}
