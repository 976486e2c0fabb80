//! Event types crossing the host boundary.
//!
//! Two directions:
//! * Inbound: surface notifications (`SurfaceEvent`), overlay interaction
//!   (`OverlayEvent`) and keyboard chords (`KeyChord`) the host forwards.
//! * Outbound: `LifecycleEvent` records describing each stage of a correction
//!   run, delivered through a `LifecycleSink`. These are the only
//!   observability surface exposed to the hosting application.

use std::fmt;
use std::sync::atomic::AtomicU64;

pub mod lifecycle;

pub use lifecycle::{
    ChannelLifecycleSink, LifecycleEvent, LifecycleLog, LifecycleReason, LifecycleSink,
    LifecycleStatus, NoopLifecycleSink,
};

// -------------------------------------------------------------------------------------------------
// Telemetry
// -------------------------------------------------------------------------------------------------
// Relaxed atomic counters; inspected by tests and logged by the CLI on shutdown.
// -------------------------------------------------------------------------------------------------
pub static LIFECYCLE_EVENTS_EMITTED: AtomicU64 = AtomicU64::new(0);
pub static LIFECYCLE_SEND_FAILURES: AtomicU64 = AtomicU64::new(0);

/// Notifications a host forwards for one surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceEvent {
    /// Value changed (typing, paste, programmatic replace + synthetic input).
    Input,
    /// The surface's own scroll position changed.
    SurfaceScroll,
    /// The page scrolled; the overlay must be repositioned.
    WindowScroll,
    WindowResize,
    /// Observed size change of the surface box.
    SurfaceResize,
    /// Observed attribute mutation (style/class) on the surface.
    AttributeMutation,
}

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct ModMask: u8 {
        const CTRL  = 0b0000_0001;
        const ALT   = 0b0000_0010;
        const SHIFT = 0b0000_0100;
        const META  = 0b0000_1000;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Enter,
    Space,
    Escape,
    Tab,
    Backspace,
}

/// A key press with its modifier state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyChord {
    pub key: Key,
    pub mods: ModMask,
}

impl KeyChord {
    pub const fn new(key: Key, mods: ModMask) -> Self {
        Self { key, mods }
    }

    pub const fn plain(key: Key) -> Self {
        Self {
            key,
            mods: ModMask::empty(),
        }
    }

    /// Letter key compared case-insensitively (shift may upper-case it).
    pub fn is_letter(&self, letter: char) -> bool {
        matches!(self.key, Key::Char(c) if c.eq_ignore_ascii_case(&letter))
    }
}

impl fmt::Display for KeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}{:?}", self.mods, self.key)
    }
}

/// Interaction on the overlay layer. `issue_id` is the `data-issue-id` of
/// the node under the pointer (or focused node for keys), if any.
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayEvent {
    Click {
        issue_id: Option<String>,
        /// `detail` of the click: 1 for a single click, 2 for the second click of a double.
        click_count: u32,
    },
    DoubleClick {
        issue_id: Option<String>,
    },
    PointerDown {
        issue_id: Option<String>,
    },
    KeyDown {
        issue_id: Option<String>,
        chord: KeyChord,
    },
    Wheel {
        delta_x: f64,
        delta_y: f64,
    },
}

/// What the host should do with the native event after dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EventDisposition {
    pub handled: bool,
    pub prevent_default: bool,
}

impl EventDisposition {
    pub const IGNORED: Self = Self {
        handled: false,
        prevent_default: false,
    };

    pub const fn handled(prevent_default: bool) -> Self {
        Self {
            handled: true,
            prevent_default,
        }
    }
}
