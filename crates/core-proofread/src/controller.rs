use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::Duration;

use ahash::AHashMap;
use core_config::Config;
use core_events::{KeyChord, LifecycleEvent, LifecycleReason, LifecycleSink, LifecycleStatus};
use core_state::{RestoreHooks, UndoManager};
use core_surface::{Platform, Surface, SurfaceId};
use core_text::{Correction, Utf16Range, replace_range, slice, utf16_len};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::engine::{CorrectionEngine, EngineContext, EngineOutput};
use crate::error::{EngineError, ProofreadError, Result};
use crate::hooks::{ProofreadHooks, publish};
use crate::merge::{merge_selection, sanitize, shift_after_apply};

/// Host predicate deciding which engine corrections are kept.
pub type CorrectionFilter = Rc<dyn Fn(&Correction) -> bool>;

type History = UndoManager<Vec<Correction>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    Idle,
    Queued,
    Running,
    Complete,
    Error,
    Aborted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProofreadOptions {
    /// Bypass the unchanged-text and history shortcuts.
    pub force: bool,
    /// Restrict the run to this range and merge results into the existing set.
    /// An empty range means the whole document.
    pub selection: Option<Utf16Range>,
}

impl ProofreadOptions {
    pub fn forced() -> Self {
        Self {
            force: true,
            selection: None,
        }
    }

    pub fn selection(range: Utf16Range) -> Self {
        Self {
            force: false,
            selection: Some(range),
        }
    }
}

/// How a `proofread` call ended (errors aside).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProofreadOutcome {
    Throttled(LifecycleReason),
    Ignored(LifecycleReason),
    Completed {
        correction_count: usize,
        detected: usize,
    },
    Stale,
    Aborted,
}

#[derive(Debug, Clone)]
pub struct ControllerOptions {
    pub debounce: Duration,
    pub history_max: usize,
    pub platform: Platform,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(core_config::DEFAULT_DEBOUNCE_MS),
            history_max: core_config::DEFAULT_HISTORY_MAX,
            platform: Platform::detect(),
        }
    }
}

impl ControllerOptions {
    /// `platform` is the host's (`HostCapabilities::platform`), which picks
    /// the undo modifier; it need not match the build target.
    pub fn from_config(config: &Config, platform: Platform) -> Self {
        Self {
            debounce: config.debounce(),
            history_max: config.file.history.max_entries,
            platform,
        }
    }
}

struct ElementState {
    surface: Rc<dyn Surface>,
    hooks: Rc<dyn ProofreadHooks>,
    corrections: Vec<Correction>,
    debounce: Option<JoinHandle<()>>,
    /// Bumped per schedule; a firing timer only runs if it is still current.
    debounce_generation: u64,
    applying: bool,
    restoring: bool,
    last_text: Option<String>,
    run_state: RunState,
    /// Latest execution that reached the engine.
    execution_id: u64,
    history: Rc<History>,
}

impl ElementState {
    fn guard_reason(&self) -> Option<LifecycleReason> {
        if self.applying {
            Some(LifecycleReason::ApplyingCorrection)
        } else if self.restoring {
            Some(LifecycleReason::RestoringFromHistory)
        } else {
            None
        }
    }

    /// Record how a run ended. A timer armed while it ran keeps the
    /// surface queued.
    fn settle(&mut self, done: RunState) {
        self.run_state = if self.debounce.is_some() {
            RunState::Queued
        } else {
            done
        };
    }

    fn cancel_debounce(&mut self) {
        if let Some(handle) = self.debounce.take() {
            handle.abort();
        }
    }
}

#[derive(Default)]
struct Registry {
    elements: AHashMap<SurfaceId, ElementState>,
    next_execution: u64,
}

enum Prepared {
    Done {
        outcome: ProofreadOutcome,
        publish: Option<(Rc<dyn ProofreadHooks>, Vec<Correction>)>,
    },
    Run {
        text: String,
        selection: Option<Utf16Range>,
    },
}

/// Per-surface proofreading state machine.
///
/// Must be driven from inside a `tokio::task::LocalSet`: debounce timers and
/// deferred flag releases are `spawn_local` tasks. Clones share all state.
pub struct ProofreadController<E> {
    registry: Rc<RefCell<Registry>>,
    engine: Rc<E>,
    filter: CorrectionFilter,
    sink: Rc<dyn LifecycleSink>,
    options: ControllerOptions,
}

impl<E> Clone for ProofreadController<E> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            engine: self.engine.clone(),
            filter: self.filter.clone(),
            sink: self.sink.clone(),
            options: self.options.clone(),
        }
    }
}

impl<E: CorrectionEngine + 'static> ProofreadController<E> {
    pub fn new(engine: Rc<E>, sink: Rc<dyn LifecycleSink>, options: ControllerOptions) -> Self {
        Self {
            registry: Rc::new(RefCell::new(Registry::default())),
            engine,
            filter: Rc::new(|_| true),
            sink,
            options,
        }
    }

    pub fn with_filter(mut self, filter: impl Fn(&Correction) -> bool + 'static) -> Self {
        self.filter = Rc::new(filter);
        self
    }

    pub fn options(&self) -> &ControllerOptions {
        &self.options
    }

    /// Create state (and undo history) for `surface`. Re-registering replaces
    /// the previous state.
    pub fn register(&self, surface: Rc<dyn Surface>, hooks: Rc<dyn ProofreadHooks>) -> SurfaceId {
        let id = surface.id();
        let bridge = Rc::new(HistoryBridge {
            registry: Rc::downgrade(&self.registry),
            id,
        });
        let history = Rc::new(UndoManager::new(
            surface.clone(),
            bridge,
            self.options.history_max,
            self.options.platform,
        ));
        let state = ElementState {
            surface,
            hooks,
            corrections: Vec::new(),
            debounce: None,
            debounce_generation: 0,
            applying: false,
            restoring: false,
            last_text: None,
            run_state: RunState::Idle,
            execution_id: 0,
            history,
        };
        let previous = self.registry.borrow_mut().elements.insert(id, state);
        if let Some(mut previous) = previous {
            previous.cancel_debounce();
        }
        debug!(target: "proofread.controller", surface = %id, "surface_registered");
        id
    }

    /// Drop all state for `id`, cancelling its timer and disposing its history.
    pub fn unregister(&self, id: SurfaceId) -> bool {
        let removed = self.registry.borrow_mut().elements.remove(&id);
        let Some(mut state) = removed else {
            return false;
        };
        state.cancel_debounce();
        state.history.clear();
        state.hooks.clear_highlights();
        debug!(target: "proofread.controller", surface = %id, "surface_unregistered");
        true
    }

    pub fn is_registered(&self, id: SurfaceId) -> bool {
        self.registry.borrow().elements.contains_key(&id)
    }

    pub fn corrections(&self, id: SurfaceId) -> Vec<Correction> {
        self.registry
            .borrow()
            .elements
            .get(&id)
            .map(|s| s.corrections.clone())
            .unwrap_or_default()
    }

    pub fn run_state(&self, id: SurfaceId) -> Option<RunState> {
        self.registry.borrow().elements.get(&id).map(|s| s.run_state)
    }

    pub fn is_applying(&self, id: SurfaceId) -> bool {
        self.registry
            .borrow()
            .elements
            .get(&id)
            .is_some_and(|s| s.applying)
    }

    pub fn is_restoring(&self, id: SurfaceId) -> bool {
        self.registry
            .borrow()
            .elements
            .get(&id)
            .is_some_and(|s| s.restoring)
    }

    fn emit(&self, event: LifecycleEvent) {
        debug!(
            target: "proofread.lifecycle",
            surface = %event.surface_id,
            status = ?event.status,
            execution_id = event.execution_id,
            reason = ?event.reason,
            "lifecycle"
        );
        self.sink.emit(&event);
    }

    /// Arm (or re-arm) the debounce timer. Returns false when throttled.
    pub fn schedule_proofread(&self, id: SurfaceId) -> bool {
        let delay = self.options.debounce;
        let debounce_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        let mut reg = self.registry.borrow_mut();
        let Some(state) = reg.elements.get_mut(&id) else {
            drop(reg);
            self.emit(
                LifecycleEvent::new(id, LifecycleStatus::Throttled, 0, 0)
                    .with_reason(LifecycleReason::MissingState),
            );
            return false;
        };
        let text_len = utf16_len(&state.surface.text());
        let execution_id = state.execution_id;
        if let Some(reason) = state.guard_reason() {
            drop(reg);
            self.emit(
                LifecycleEvent::new(id, LifecycleStatus::Throttled, execution_id, text_len)
                    .with_reason(reason),
            );
            return false;
        }
        state.cancel_debounce();
        state.debounce_generation += 1;
        if state.run_state != RunState::Running {
            state.run_state = RunState::Queued;
        }
        let generation = state.debounce_generation;
        let this = self.clone();
        state.debounce = Some(tokio::task::spawn_local(async move {
            tokio::time::sleep(delay).await;
            if this.take_debounce(id, generation)
                && let Err(err) = this.proofread(id, ProofreadOptions::default()).await
            {
                warn!(target: "proofread.controller", surface = %id, error = %err, "debounced_run_failed");
            }
        }));
        let queue_length = reg
            .elements
            .values()
            .filter(|s| s.debounce.is_some())
            .count();
        drop(reg);
        self.emit(
            LifecycleEvent::new(id, LifecycleStatus::Queued, execution_id, text_len)
                .with_queue(queue_length, debounce_ms),
        );
        true
    }

    /// Claim a fired timer: forget its handle so the run it starts is not
    /// aborted as a "pending debounce".
    fn take_debounce(&self, id: SurfaceId, generation: u64) -> bool {
        let mut reg = self.registry.borrow_mut();
        match reg.elements.get_mut(&id) {
            Some(state) if state.debounce_generation == generation => {
                state.debounce = None;
                true
            }
            _ => false,
        }
    }

    /// Run the engine for `id` now (subject to the guards and shortcuts).
    pub async fn proofread(
        &self,
        id: SurfaceId,
        options: ProofreadOptions,
    ) -> Result<ProofreadOutcome> {
        let execution_id = {
            let mut reg = self.registry.borrow_mut();
            reg.next_execution += 1;
            reg.next_execution
        };
        let mut events = Vec::new();
        let prepared = self.prepare(id, execution_id, options, &mut events);
        // Registry borrow is released; sinks may call back in.
        for event in events {
            self.emit(event);
        }
        let (text, selection) = match prepared {
            Prepared::Done { outcome, publish: p } => {
                if let Some((hooks, corrections)) = p {
                    publish(hooks.as_ref(), &corrections);
                }
                return Ok(outcome);
            }
            Prepared::Run { text, selection } => (text, selection),
        };
        let context = EngineContext {
            execution_id,
            selection,
        };
        let result = self.engine.run(text.clone(), context).await;
        self.finish(id, execution_id, &text, selection, result)
    }

    fn prepare(
        &self,
        id: SurfaceId,
        execution_id: u64,
        options: ProofreadOptions,
        events: &mut Vec<LifecycleEvent>,
    ) -> Prepared {
        let selection = options.selection.filter(|r| !r.is_empty());
        let mut reg = self.registry.borrow_mut();
        let Some(state) = reg.elements.get_mut(&id) else {
            events.push(
                LifecycleEvent::new(id, LifecycleStatus::Queued, execution_id, 0)
                    .with_forced(options.force),
            );
            events.push(
                LifecycleEvent::new(id, LifecycleStatus::Throttled, execution_id, 0)
                    .with_reason(LifecycleReason::MissingState),
            );
            return Prepared::Done {
                outcome: ProofreadOutcome::Throttled(LifecycleReason::MissingState),
                publish: None,
            };
        };
        let text = state.surface.text();
        let text_len = utf16_len(&text);
        let event = |status| LifecycleEvent::new(id, status, execution_id, text_len);
        events.push(event(LifecycleStatus::Queued).with_forced(options.force));
        state.cancel_debounce();

        if let Some(reason) = state.guard_reason() {
            events.push(event(LifecycleStatus::Throttled).with_reason(reason));
            return Prepared::Done {
                outcome: ProofreadOutcome::Throttled(reason),
                publish: None,
            };
        }
        if !options.force && state.last_text.as_deref() == Some(text.as_str()) {
            if state.run_state == RunState::Queued {
                state.run_state = RunState::Complete;
            }
            events.push(event(LifecycleStatus::Ignored).with_reason(LifecycleReason::UnchangedText));
            return Prepared::Done {
                outcome: ProofreadOutcome::Ignored(LifecycleReason::UnchangedText),
                publish: None,
            };
        }
        let scoped = match selection {
            Some(range) => slice(&text, range),
            None => text.as_str(),
        };
        if scoped.trim().is_empty() {
            state.corrections.clear();
            state.run_state = RunState::Idle;
            events.push(
                event(LifecycleStatus::Ignored)
                    .with_reason(LifecycleReason::EmptyText)
                    .with_counts(0, 0),
            );
            return Prepared::Done {
                outcome: ProofreadOutcome::Ignored(LifecycleReason::EmptyText),
                publish: Some((state.hooks.clone(), Vec::new())),
            };
        }
        if !options.force
            && selection.is_none()
            && let Some(cached) = state.history.metadata_for_text(&text)
        {
            state.corrections = cached.clone();
            state.last_text = Some(text);
            state.run_state = RunState::Complete;
            events.push(
                event(LifecycleStatus::Ignored)
                    .with_reason(LifecycleReason::RestoredFromHistory)
                    .with_counts(cached.len(), cached.len()),
            );
            return Prepared::Done {
                outcome: ProofreadOutcome::Ignored(LifecycleReason::RestoredFromHistory),
                publish: Some((state.hooks.clone(), cached)),
            };
        }

        state.execution_id = execution_id;
        state.run_state = RunState::Running;
        events.push(event(LifecycleStatus::Start));
        debug!(target: "proofread.controller", surface = %id, execution_id, text_len, scoped = selection.is_some(), "engine_run_started");
        Prepared::Run { text, selection }
    }

    fn finish(
        &self,
        id: SurfaceId,
        execution_id: u64,
        text: &str,
        selection: Option<Utf16Range>,
        result: std::result::Result<EngineOutput, EngineError>,
    ) -> Result<ProofreadOutcome> {
        let text_len = utf16_len(text);
        let event = |status| LifecycleEvent::new(id, status, execution_id, text_len);
        let mut reg = self.registry.borrow_mut();
        let mut state = reg.elements.get_mut(&id);
        let superseded = state.as_ref().is_none_or(|s| s.execution_id != execution_id);

        match result {
            Err(EngineError::Aborted) => {
                if let Some(s) = state.as_mut()
                    && !superseded
                {
                    s.settle(RunState::Aborted);
                }
                drop(reg);
                self.emit(event(LifecycleStatus::Abort));
                self.emit(event(LifecycleStatus::Complete).with_reason(LifecycleReason::Aborted));
                debug!(target: "proofread.controller", surface = %id, execution_id, "engine_run_aborted");
                Ok(ProofreadOutcome::Aborted)
            }
            Err(err) => {
                let mut clear = None;
                if let Some(s) = state.as_mut()
                    && !superseded
                {
                    s.corrections.clear();
                    s.settle(RunState::Error);
                    clear = Some(s.hooks.clone());
                }
                drop(reg);
                if let Some(hooks) = clear {
                    publish(hooks.as_ref(), &[]);
                }
                let message = err.to_string();
                self.emit(event(LifecycleStatus::Error).with_error(message.clone()));
                self.emit(
                    event(LifecycleStatus::Complete)
                        .with_reason(LifecycleReason::Error)
                        .with_error(message),
                );
                warn!(target: "proofread.controller", surface = %id, execution_id, error = %err, "engine_run_failed");
                Err(ProofreadError::Engine(err))
            }
            Ok(output) => {
                let detected = output.corrections.len();
                let live_matches = state.as_ref().is_some_and(|s| s.surface.text() == text);
                match state {
                    Some(s) if live_matches && !superseded => {
                        let fresh: Vec<Correction> = sanitize(output.corrections, text_len)
                            .into_iter()
                            .filter(|c| (self.filter)(c))
                            .collect();
                        s.corrections = match selection {
                            Some(range) => merge_selection(&s.corrections, fresh, range),
                            None => fresh,
                        };
                        s.last_text = Some(text.to_string());
                        s.settle(RunState::Complete);
                        let hooks = s.hooks.clone();
                        let corrections = s.corrections.clone();
                        drop(reg);
                        publish(hooks.as_ref(), &corrections);
                        let count = corrections.len();
                        self.emit(event(LifecycleStatus::Complete).with_counts(count, detected));
                        debug!(target: "proofread.controller", surface = %id, execution_id, count, detected, "engine_run_complete");
                        Ok(ProofreadOutcome::Completed {
                            correction_count: count,
                            detected,
                        })
                    }
                    other => {
                        if let Some(s) = other
                            && !superseded
                        {
                            s.settle(RunState::Complete);
                        }
                        drop(reg);
                        self.emit(
                            event(LifecycleStatus::Complete)
                                .with_counts(0, detected)
                                .with_reason(LifecycleReason::Stale),
                        );
                        debug!(target: "proofread.controller", surface = %id, execution_id, superseded, "engine_result_stale");
                        Ok(ProofreadOutcome::Stale)
                    }
                }
            }
        }
    }

    /// Replace the span addressed by `correction` in the live text.
    ///
    /// Snapshots history first, shifts the remaining corrections, moves the
    /// caret after the replacement and dispatches a synthetic input event.
    /// Input-driven scheduling is throttled until the next task tick.
    pub fn apply_correction(&self, id: SurfaceId, correction: &Correction) -> bool {
        let (surface, history, before) = {
            let reg = self.registry.borrow();
            let Some(state) = reg.elements.get(&id) else {
                warn!(target: "proofread.controller", surface = %id, "apply_missing_state");
                return false;
            };
            (
                state.surface.clone(),
                state.history.clone(),
                state.corrections.clone(),
            )
        };
        let text = surface.text();
        if correction.is_degenerate() || correction.end_index > utf16_len(&text) {
            warn!(target: "proofread.controller", surface = %id, start = correction.start_index, end = correction.end_index, "apply_out_of_range");
            return false;
        }
        history.capture(before);
        let next_text = replace_range(&text, correction.range(), &correction.replacement_text);
        let (hooks, corrections) = {
            let mut reg = self.registry.borrow_mut();
            let Some(state) = reg.elements.get_mut(&id) else {
                return false;
            };
            state.applying = true;
            state.cancel_debounce();
            state.corrections = shift_after_apply(&state.corrections, correction);
            state.last_text = Some(next_text.clone());
            (state.hooks.clone(), state.corrections.clone())
        };
        surface.set_text(&next_text);
        let caret = correction.start_index + correction.replacement_len();
        surface.set_selection(Utf16Range::new(caret, caret));
        publish(hooks.as_ref(), &corrections);
        surface.dispatch_input();
        release_later(Rc::downgrade(&self.registry), id, Guard::Applying);
        debug!(target: "proofread.controller", surface = %id, remaining = corrections.len(), "correction_applied");
        true
    }

    fn history(&self, id: SurfaceId) -> Option<Rc<History>> {
        self.registry
            .borrow()
            .elements
            .get(&id)
            .map(|s| s.history.clone())
    }

    /// Snapshot the live state before a user-driven mutation.
    pub fn record_history(&self, id: SurfaceId) -> bool {
        let corrections = self.corrections(id);
        self.history(id).is_some_and(|h| h.capture(corrections))
    }

    pub fn undo(&self, id: SurfaceId) -> bool {
        self.history(id).is_some_and(|h| h.undo())
    }

    pub fn redo(&self, id: SurfaceId) -> bool {
        self.history(id).is_some_and(|h| h.redo())
    }

    /// Route an undo/redo shortcut. True when consumed.
    pub fn handle_key(&self, id: SurfaceId, chord: &KeyChord) -> bool {
        self.history(id).is_some_and(|h| h.handle_key(chord))
    }

    /// Forget corrections and the last analysed text for `id`.
    pub fn clear(&self, id: SurfaceId) {
        let hooks = {
            let mut reg = self.registry.borrow_mut();
            let Some(state) = reg.elements.get_mut(&id) else {
                return;
            };
            state.cancel_debounce();
            state.corrections.clear();
            state.last_text = None;
            state.run_state = RunState::Idle;
            state.hooks.clone()
        };
        publish(hooks.as_ref(), &[]);
    }
}

#[derive(Debug, Clone, Copy)]
enum Guard {
    Applying,
    Restoring,
}

/// Clear a guard flag once the current task has yielded, after the
/// synchronous input dispatch it protects has run.
fn release_later(registry: Weak<RefCell<Registry>>, id: SurfaceId, guard: Guard) {
    tokio::task::spawn_local(async move {
        tokio::task::yield_now().await;
        let Some(registry) = registry.upgrade() else {
            return;
        };
        let mut reg = registry.borrow_mut();
        if let Some(state) = reg.elements.get_mut(&id) {
            match guard {
                Guard::Applying => state.applying = false,
                Guard::Restoring => state.restoring = false,
            }
        }
    });
}

/// Undo-history callbacks for one surface.
struct HistoryBridge {
    registry: Weak<RefCell<Registry>>,
    id: SurfaceId,
}

impl RestoreHooks<Vec<Correction>> for HistoryBridge {
    fn current_metadata(&self) -> Vec<Correction> {
        let Some(registry) = self.registry.upgrade() else {
            return Vec::new();
        };
        let reg = registry.borrow();
        reg.elements
            .get(&self.id)
            .map(|s| s.corrections.clone())
            .unwrap_or_default()
    }

    fn on_restore(&self, metadata: &Vec<Correction>) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        let hooks = {
            let mut reg = registry.borrow_mut();
            let Some(state) = reg.elements.get_mut(&self.id) else {
                return;
            };
            state.restoring = true;
            state.cancel_debounce();
            state.corrections = metadata.clone();
            state.last_text = Some(state.surface.text());
            state.run_state = RunState::Complete;
            state.hooks.clone()
        };
        publish(hooks.as_ref(), metadata);
        release_later(self.registry.clone(), self.id, Guard::Restoring);
        debug!(target: "proofread.controller", surface = %self.id, corrections = metadata.len(), "history_restored");
    }
}
