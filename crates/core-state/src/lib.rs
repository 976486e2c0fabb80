//! Per-surface editing state that outlives a single proofreading run.
//!
//! Currently this is the undo/redo history: snapshots of a surface's text,
//! selection and an opaque metadata payload (the proofreading controller
//! stores its correction set there), plus the keyboard shortcuts that drive
//! it.

pub mod undo;

pub use undo::{RestoreHooks, UNDO_HISTORY_MAX, UndoHistory, UndoManager, UndoState};
