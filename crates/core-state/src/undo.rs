use core_events::{KeyChord, ModMask};
use core_surface::{Platform, Surface};
use core_text::{Utf16Range, utf16_len};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

/// Default bound on retained undo snapshots.
pub const UNDO_HISTORY_MAX: usize = 100;

/// A full-state snapshot of one surface.
#[derive(Debug, Clone, PartialEq)]
pub struct UndoState<M> {
    pub text: String,
    pub selection_start: usize,
    pub selection_end: usize,
    pub metadata: M,
}

impl<M> UndoState<M> {
    pub fn selection(&self) -> Utf16Range {
        Utf16Range::new(self.selection_start, self.selection_end)
    }
}

/// Bounded undo/redo stacks. Pure data: knows nothing about surfaces.
#[derive(Debug)]
pub struct UndoHistory<M> {
    undo_stack: Vec<UndoState<M>>,
    redo_stack: Vec<UndoState<M>>,
    max_entries: usize,
    /// Pushes skipped because the state equalled the newest undo entry.
    snapshots_skipped: AtomicU64,
}

impl<M: Clone + PartialEq> UndoHistory<M> {
    pub fn new(max_entries: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_entries: max_entries.max(1),
            snapshots_skipped: AtomicU64::new(0),
        }
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }
    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }
    pub fn snapshots_skipped(&self) -> u64 {
        self.snapshots_skipped.load(Ordering::Relaxed)
    }

    /// Record a new state. Returns false when deduplicated; otherwise the redo
    /// stack is cleared.
    pub fn push(&mut self, state: UndoState<M>) -> bool {
        if self.undo_stack.last() == Some(&state) {
            self.snapshots_skipped.fetch_add(1, Ordering::Relaxed);
            trace!(target: "state.undo", undo_depth = self.undo_stack.len(), redo_depth = self.redo_stack.len(), "snapshot_dedupe_skip");
            return false;
        }
        let text_len = utf16_len(&state.text);
        self.undo_stack.push(state);
        trace!(target: "state.undo", undo_depth = self.undo_stack.len(), redo_depth = self.redo_stack.len(), text_len, "push_snapshot");
        if self.undo_stack.len() > self.max_entries {
            let _ = self.undo_stack.remove(0);
            trace!(target: "state.undo", "undo_stack_trimmed");
        }
        self.redo_stack.clear();
        true
    }

    /// Pop the newest undo entry, parking `current` on the redo stack.
    pub fn undo(&mut self, current: UndoState<M>) -> Option<UndoState<M>> {
        let last = self.undo_stack.pop()?;
        self.redo_stack.push(current);
        trace!(target: "state.undo", undo_depth = self.undo_stack.len(), redo_depth = self.redo_stack.len(), "undo_pop");
        Some(last)
    }

    /// Pop the newest redo entry, parking `current` on the undo stack.
    pub fn redo(&mut self, current: UndoState<M>) -> Option<UndoState<M>> {
        let next = self.redo_stack.pop()?;
        self.undo_stack.push(current);
        trace!(target: "state.undo", undo_depth = self.undo_stack.len(), redo_depth = self.redo_stack.len(), "redo_pop");
        Some(next)
    }

    /// Metadata of the newest snapshot (undo stack first, then redo) whose text is `text`.
    pub fn metadata_for_text(&self, text: &str) -> Option<M> {
        self.undo_stack
            .iter()
            .rev()
            .chain(self.redo_stack.iter().rev())
            .find(|s| s.text == text)
            .map(|s| s.metadata.clone())
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

/// Callbacks into the owner of the metadata (the proofreading controller).
pub trait RestoreHooks<M> {
    /// Metadata describing the live state, stored when it is parked on the
    /// opposite stack by undo/redo.
    fn current_metadata(&self) -> M;
    /// Runs after text and selection are restored and before the synthetic
    /// input event is dispatched.
    fn on_restore(&self, metadata: &M);
}

/// Undo/redo for one surface.
///
/// Restore sequence: set text, set selection, normalize (rich containers),
/// `on_restore(metadata)`, then `dispatch_input`. No internal borrow is held
/// while the surface or the hooks run.
pub struct UndoManager<M> {
    surface: Rc<dyn Surface>,
    hooks: Rc<dyn RestoreHooks<M>>,
    history: RefCell<UndoHistory<M>>,
    platform: Platform,
}

impl<M> std::fmt::Debug for UndoManager<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UndoManager")
            .field("surface", &self.surface.id())
            .field("platform", &self.platform)
            .finish_non_exhaustive()
    }
}

impl<M: Clone + PartialEq> UndoManager<M> {
    pub fn new(
        surface: Rc<dyn Surface>,
        hooks: Rc<dyn RestoreHooks<M>>,
        max_entries: usize,
        platform: Platform,
    ) -> Self {
        Self {
            surface,
            hooks,
            history: RefCell::new(UndoHistory::new(max_entries)),
            platform,
        }
    }

    fn snapshot(&self, metadata: M) -> UndoState<M> {
        let sel = self.surface.selection();
        UndoState {
            text: self.surface.text(),
            selection_start: sel.start,
            selection_end: sel.end,
            metadata,
        }
    }

    /// Snapshot the live surface with `metadata`. False when deduplicated.
    pub fn capture(&self, metadata: M) -> bool {
        let state = self.snapshot(metadata);
        self.history.borrow_mut().push(state)
    }

    pub fn undo(&self) -> bool {
        let current = self.snapshot(self.hooks.current_metadata());
        let popped = self.history.borrow_mut().undo(current);
        match popped {
            Some(state) => {
                self.restore(&state);
                true
            }
            None => false,
        }
    }

    pub fn redo(&self) -> bool {
        let current = self.snapshot(self.hooks.current_metadata());
        let popped = self.history.borrow_mut().redo(current);
        match popped {
            Some(state) => {
                self.restore(&state);
                true
            }
            None => false,
        }
    }

    fn restore(&self, state: &UndoState<M>) {
        self.surface.set_text(&state.text);
        self.surface.set_selection(state.selection());
        self.surface.normalize();
        self.hooks.on_restore(&state.metadata);
        self.surface.dispatch_input();
        trace!(target: "state.undo", surface = %self.surface.id(), text_len = utf16_len(&state.text), "state_restored");
    }

    /// Run the undo/redo shortcut in `chord`, if it is one. Returns true when
    /// the key was consumed (the host should prevent its default action),
    /// including when the matching stack was empty.
    pub fn handle_key(&self, chord: &KeyChord) -> bool {
        match shortcut_for(chord, self.platform) {
            Some(Shortcut::Undo) => {
                self.undo();
                true
            }
            Some(Shortcut::Redo) => {
                self.redo();
                true
            }
            None => false,
        }
    }

    pub fn metadata_for_text(&self, text: &str) -> Option<M> {
        self.history.borrow().metadata_for_text(text)
    }

    pub fn clear(&self) {
        self.history.borrow_mut().clear();
    }

    pub fn undo_depth(&self) -> usize {
        self.history.borrow().undo_depth()
    }

    pub fn redo_depth(&self) -> usize {
        self.history.borrow().redo_depth()
    }

    pub fn snapshots_skipped(&self) -> u64 {
        self.history.borrow().snapshots_skipped()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shortcut {
    Undo,
    Redo,
}

/// `mod+Z` undo, `mod+Shift+Z` redo, plus `ctrl+Y` redo off macOS. `mod` is
/// meta on macOS and ctrl elsewhere; alt never matches.
fn shortcut_for(chord: &KeyChord, platform: Platform) -> Option<Shortcut> {
    let primary = match platform {
        Platform::Mac => ModMask::META,
        Platform::Other => ModMask::CTRL,
    };
    let mods = chord.mods;
    if chord.is_letter('z') {
        if mods == primary {
            return Some(Shortcut::Undo);
        }
        if mods == primary | ModMask::SHIFT {
            return Some(Shortcut::Redo);
        }
    }
    if platform == Platform::Other && chord.is_letter('y') && mods == ModMask::CTRL {
        return Some(Shortcut::Redo);
    }
    None
}
