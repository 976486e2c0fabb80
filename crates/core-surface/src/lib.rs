//! Host surface abstraction and an in-memory implementation.
//!
//! A surface is the editable control being annotated: a single-line input, a
//! multi-line text control, or a rich editable container. The overlay engine
//! and the proofreading controller only ever talk to it through `Surface`, so
//! a browser binding, a GUI toolkit, or the headless surface used by tests
//! and the CLI are interchangeable.
//!
//! Methods take `&self`; hosts are shared (`Rc<dyn Surface>`) between the
//! session, the controller and the undo manager and use interior mutability.
//! None of the setters may emit notifications synchronously except
//! `dispatch_input`.

use core_text::Utf16Range;
use std::sync::atomic::{AtomicU64, Ordering};

pub mod capabilities;
pub mod geometry;
pub mod headless;
pub mod style;

pub use capabilities::{HostCapabilities, Platform};
pub use geometry::{Edges, Point, Rect, Size};
pub use headless::HeadlessSurface;
pub use style::{LineHeight, SurfaceStyle};

static NEXT_SURFACE_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity of a registered surface; keys every per-surface map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub struct SurfaceId(pub u64);

impl SurfaceId {
    /// Allocate a process-unique id.
    pub fn allocate() -> Self {
        Self(NEXT_SURFACE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "surface#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceKind {
    /// Single-line text control; never wraps.
    TextInput,
    /// Multi-line plain text control.
    TextArea,
    /// Rich editable container; text is derived from its nodes.
    RichContainer,
}

pub trait Surface {
    fn id(&self) -> SurfaceId;
    fn kind(&self) -> SurfaceKind;
    /// Current value (plain text projection for rich containers).
    fn text(&self) -> String;
    /// Replace the whole value. Must not dispatch input.
    fn set_text(&self, text: &str);
    /// Selection in UTF-16 code units.
    fn selection(&self) -> Utf16Range;
    fn set_selection(&self, range: Utf16Range);
    fn style(&self) -> SurfaceStyle;
    /// Border box in page coordinates.
    fn bounding_rect(&self) -> Rect;
    /// Visible content viewport (inside the border).
    fn client_size(&self) -> Size;
    fn scroll_offset(&self) -> Point;
    /// Request a scroll position; the host clamps to its scrollable range.
    fn set_scroll_offset(&self, offset: Point);
    fn focus(&self);
    /// Emit a synthetic input notification to the host's listeners.
    fn dispatch_input(&self);
    /// Merge adjacent text nodes after a programmatic restore (rich containers).
    fn normalize(&self) {}
}
