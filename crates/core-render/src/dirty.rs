//! Dirty flags for one overlay session.
//!
//! Four independent bits, consumed in fixed order on each frame flush:
//! layout → value-sync → measurement → render. Each stage takes (clears) its
//! own bit and may set a later one; nothing ever sets an earlier bit during a
//! flush, so a single pass always drains the set.
//!
//! Not thread-safe (mutably borrowed in the single-threaded event loop).

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct DirtyFlags: u8 {
        /// Surface box/style changed: refresh mirror styles, width and overlay position.
        const LAYOUT      = 0b0001;
        /// Surface text changed: copy it into the mirror.
        const VALUE_SYNC  = 0b0010;
        /// Recompute range descriptors from issues.
        const MEASUREMENT = 0b0100;
        /// Push descriptors through the render target.
        const RENDER      = 0b1000;
    }
}

impl DirtyFlags {
    /// Clear `flag` and report whether it was set.
    pub fn take(&mut self, flag: DirtyFlags) -> bool {
        let was = self.contains(flag);
        self.remove(flag);
        was
    }
}
