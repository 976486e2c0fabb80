//! Pointer, keyboard and wheel handling on the overlay layer.
//!
//! Activation fires `SessionHooks::on_activate` with the issue's page-space
//! box nudged down so a popover anchored to it clears the underline.
//!
//! When `autofix_on_double_click` is on, a click only arms single activation;
//! it fires once `double_click_window` passes quietly. A `DoubleClick` in
//! that window cancels it and fires `on_double_activate` instead, and the
//! second `click` of the pair (`click_count > 1`) is swallowed. When off,
//! every click activates at once and double clicks are ignored.

use core_events::{EventDisposition, Key, OverlayEvent};
use core_render::DirtyFlags;
use core_surface::{Point, Rect};

use crate::TargetSession;
use crate::session::overlay_frame;

/// Vertical offset applied to activation anchors.
pub const ANCHOR_NUDGE_PX: f64 = 2.0;

enum Activation {
    Single,
    Double,
}

impl TargetSession {
    pub fn handle_overlay_event(&self, event: OverlayEvent) -> EventDisposition {
        if self.inner.borrow().disposed {
            return EventDisposition::IGNORED;
        }
        match event {
            OverlayEvent::Click {
                issue_id: Some(id),
                click_count,
            } => {
                if !self.inner.borrow().options.autofix_on_double_click {
                    return self.activate(&id, Activation::Single);
                }
                if click_count > 1 {
                    return EventDisposition::handled(false);
                }
                self.defer_activation(&id)
            }
            OverlayEvent::DoubleClick { issue_id: Some(id) } => {
                if !self.inner.borrow().options.autofix_on_double_click {
                    return EventDisposition::IGNORED;
                }
                self.cancel_pending_activation();
                self.activate(&id, Activation::Double)
            }
            OverlayEvent::PointerDown { issue_id: Some(_) } => {
                self.surface.focus();
                EventDisposition::handled(true)
            }
            OverlayEvent::KeyDown {
                issue_id: Some(id),
                chord,
            } if chord.mods.is_empty() && matches!(chord.key, Key::Enter | Key::Space) => {
                self.activate(&id, Activation::Single)
            }
            OverlayEvent::Wheel { delta_x, delta_y } => self.wheel(delta_x, delta_y),
            _ => EventDisposition::IGNORED,
        }
    }

    fn activate(&self, issue_id: &str, kind: Activation) -> EventDisposition {
        let Some(anchor) = self.anchor_for(issue_id) else {
            return EventDisposition::IGNORED;
        };
        tracing::debug!(target: "session", issue = issue_id, double = matches!(kind, Activation::Double), "issue_activated");
        // Borrow released; hooks may call back into the session.
        match kind {
            Activation::Single => self.hooks.on_activate(issue_id, anchor),
            Activation::Double => self.hooks.on_double_activate(issue_id, anchor),
        }
        EventDisposition::handled(true)
    }

    /// Arm single activation for `issue_id` after the double-click window.
    /// The anchor is taken now, at click time.
    fn defer_activation(&self, issue_id: &str) -> EventDisposition {
        let Some(anchor) = self.anchor_for(issue_id) else {
            return EventDisposition::IGNORED;
        };
        let hooks = self.hooks.clone();
        let id = issue_id.to_string();
        let mut inner = self.inner.borrow_mut();
        let window = inner.options.double_click_window;
        if let Some(previous) = inner.pending_activation.take() {
            previous.abort();
        }
        inner.pending_activation = Some(tokio::task::spawn_local(async move {
            tokio::time::sleep(window).await;
            tracing::debug!(target: "session", issue = %id, double = false, "issue_activated");
            hooks.on_activate(&id, anchor);
        }));
        EventDisposition::handled(true)
    }

    fn cancel_pending_activation(&self) {
        if let Some(pending) = self.inner.borrow_mut().pending_activation.take() {
            pending.abort();
            tracing::trace!(target: "session", "single_activation_cancelled");
        }
    }

    /// Page-space box of `issue_id`, nudged down by `ANCHOR_NUDGE_PX`.
    pub fn anchor_for(&self, issue_id: &str) -> Option<Rect> {
        let mut guard = self.inner.borrow_mut();
        let inner = &mut *guard;
        let issue = inner.issues.iter().find(|i| i.id == issue_id)?.clone();
        let frame = overlay_frame(self.surface.bounding_rect(), &inner.metrics);
        let local = match inner.target.overlay().and_then(|r| r.rect_for_issue(issue_id)) {
            Some(rect) => rect,
            None => {
                // Culled or native target: measure directly.
                let scroll = self.surface.scroll_offset();
                let first = inner.mirror.get_rects(issue.start, issue.end).into_iter().next();
                let rect = match first {
                    Some(r) => r,
                    None => inner.mirror.get_caret_rect(issue.start)?,
                };
                rect.translate(
                    inner.metrics.padding.left - scroll.x,
                    inner.metrics.padding.top - scroll.y,
                )
            }
        };
        Some(local.translate(frame.x, frame.y + ANCHOR_NUDGE_PX))
    }

    /// Scroll the surface; prevent default only when the position moved so
    /// the page scrolls once the surface hits its edge.
    fn wheel(&self, dx: f64, dy: f64) -> EventDisposition {
        let before = self.surface.scroll_offset();
        self.surface
            .set_scroll_offset(Point::new(before.x + dx, before.y + dy));
        let after = self.surface.scroll_offset();
        if after == before {
            return EventDisposition::IGNORED;
        }
        self.mark(DirtyFlags::RENDER);
        EventDisposition::handled(true)
    }
}
