//! Target session: one overlay bound to one editable surface.
//!
//! The session owns a mirror, a render target and a frame scheduler, and
//! keeps them in step with the surface. Host events only set dirty flags and
//! request a frame; all measuring and painting happens in `flush`, once per
//! frame, in fixed stage order (layout → value-sync → measurement → render).
//!
//! The session is shared (`Rc<TargetSession>`) between the host's event
//! wiring and the proofreading controller's highlighter, so every method
//! takes `&self`. Internal state sits behind one `RefCell`; it is never
//! borrowed while a `SessionHooks` callback runs.
//!
//! With `autofix_on_double_click` on, click activation is deferred through a
//! `spawn_local` timer, so overlay events must then be delivered from inside a
//! `tokio::task::LocalSet`.

mod interaction;
mod session;

pub use interaction::ANCHOR_NUDGE_PX;
pub use session::{SessionStats, TargetSession};

use std::time::Duration;

use core_config::{Config, Palette, UnderlineStyle};
use core_surface::Rect;

/// How long a single click waits for a double click when autofix is on.
pub const DEFAULT_DOUBLE_CLICK_WINDOW: Duration = Duration::from_millis(300);

/// Activation callbacks. `anchor` is in page coordinates.
pub trait SessionHooks {
    fn on_activate(&self, issue_id: &str, anchor: Rect);
    fn on_double_activate(&self, _issue_id: &str, _anchor: Rect) {}
}

/// Hooks that ignore every activation.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSessionHooks;

impl SessionHooks for NoopSessionHooks {
    fn on_activate(&self, _issue_id: &str, _anchor: Rect) {}
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionOptions {
    pub margin: f64,
    pub autofix_on_double_click: bool,
    pub double_click_window: Duration,
    pub style: UnderlineStyle,
    pub palette: Palette,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            margin: core_config::DEFAULT_VIRTUALIZATION_MARGIN,
            autofix_on_double_click: false,
            double_click_window: DEFAULT_DOUBLE_CLICK_WINDOW,
            style: UnderlineStyle::default(),
            palette: Palette::default(),
        }
    }
}

impl SessionOptions {
    pub fn from_config(config: &Config) -> Self {
        let overlay = &config.file.overlay;
        Self {
            margin: overlay.virtualization_margin,
            autofix_on_double_click: overlay.autofix_on_double_click,
            double_click_window: DEFAULT_DOUBLE_CLICK_WINDOW,
            style: overlay.underline_style,
            palette: config.file.palette.clone(),
        }
    }
}
