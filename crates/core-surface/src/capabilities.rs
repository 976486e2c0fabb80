//! Host capability probing.
//!
//! Detection runs once when a session is constructed; the result selects a
//! render target for the lifetime of that session instead of branching per
//! call.
//!
//! * `native_range_highlights`: the host can paint arbitrary text ranges
//!   itself, so overlay boxes and mirror measurement are unnecessary.
//! * `platform`: decides the primary shortcut modifier (meta on macOS).

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Platform {
    Mac,
    #[default]
    Other,
}

impl Platform {
    pub fn detect() -> Self {
        if cfg!(target_os = "macos") {
            Platform::Mac
        } else {
            Platform::Other
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub struct HostCapabilities {
    pub native_range_highlights: bool,
    pub platform: Platform,
}

impl HostCapabilities {
    pub fn new(native_range_highlights: bool, platform: Platform) -> Self {
        Self {
            native_range_highlights,
            platform,
        }
    }

    /// Overlay boxes only, platform from the build target.
    pub fn detect() -> Self {
        Self {
            native_range_highlights: false,
            platform: Platform::detect(),
        }
    }
}
