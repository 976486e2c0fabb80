//! Proofreading controller.
//!
//! Drives a correction engine per registered surface and keeps each
//! surface's correction set consistent with its live text:
//!
//! * Debounce: `schedule_proofread` (re)arms a timer; expiry calls
//!   `proofread`. An explicit `proofread` cancels the timer.
//! * Guards: while a correction is being applied or history is being
//!   restored, scheduling and runs are throttled so the synthetic input event
//!   does not trigger re-analysis.
//! * Shortcuts: unchanged text, empty text and text with a cached correction
//!   set in undo history never reach the engine.
//! * Staleness: after the engine returns, the live text is re-read; a
//!   mismatch or a newer run discards the result.
//! * Merge: selection-scoped runs replace only corrections starting inside
//!   the selection.
//!
//! Every stage emits a `LifecycleEvent` to the configured sink.
//!
//! Lifecycle for one run:
//! ```text
//! queued ─┬─ throttled
//!         ├─ ignored (unchanged-text | empty-text | restored-from-history)
//!         └─ start ─┬─ complete            (corrections published)
//!                   ├─ complete(stale)     (result dropped)
//!                   ├─ abort → complete(aborted)
//!                   └─ error → complete(error)
//! ```

pub mod controller;
pub mod engine;
pub mod error;
pub mod hooks;
pub mod merge;

pub use controller::{
    ControllerOptions, CorrectionFilter, ProofreadController, ProofreadOptions, ProofreadOutcome,
    RunState,
};
pub use engine::{CorrectionEngine, EngineContext, EngineOutput};
pub use error::{EngineError, ProofreadError, Result};
pub use hooks::{NoopHooks, ProofreadHooks, SessionHighlighter};
