//! Controller behaviour driven end to end on a paused clock.
//!
//! Every test runs inside a `LocalSet` because debounce timers and guard
//! releases are `spawn_local` tasks.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use core_config::Config;
use core_events::{
    Key, KeyChord, LifecycleEvent, LifecycleLog, LifecycleReason, LifecycleSink, LifecycleStatus,
    ModMask,
};
use core_proofread::{
    ControllerOptions, CorrectionEngine, EngineContext, EngineError, EngineOutput,
    ProofreadController, ProofreadError, ProofreadHooks, ProofreadOptions, ProofreadOutcome,
    RunState, SessionHighlighter,
};
use core_render::{HeadlessOverlay, ManualFrameClock};
use core_session::{NoopSessionHooks, SessionOptions, TargetSession};
use core_surface::{HeadlessSurface, HostCapabilities, Platform, Surface, SurfaceId};
use core_text::{Correction, CorrectionKind, Utf16Range};
use pretty_assertions::assert_eq;
use tokio::task::LocalSet;

const DEBOUNCE: Duration = Duration::from_millis(100);

enum Step {
    Reply(Vec<Correction>),
    Delayed(Duration, Vec<Correction>),
    Fail(&'static str),
    Abort,
}

/// Pops one scripted step per call; an empty script replies with nothing.
#[derive(Default)]
struct ScriptedEngine {
    script: RefCell<VecDeque<Step>>,
    calls: RefCell<Vec<(String, EngineContext)>>,
}

impl ScriptedEngine {
    fn push(&self, step: Step) {
        self.script.borrow_mut().push_back(step);
    }

    fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }
}

impl CorrectionEngine for ScriptedEngine {
    async fn run(&self, text: String, context: EngineContext) -> Result<EngineOutput, EngineError> {
        self.calls.borrow_mut().push((text.clone(), context));
        let step = self.script.borrow_mut().pop_front();
        let corrections = match step.unwrap_or(Step::Reply(Vec::new())) {
            Step::Reply(corrections) => corrections,
            Step::Delayed(delay, corrections) => {
                tokio::time::sleep(delay).await;
                corrections
            }
            Step::Fail(message) => return Err(EngineError::failed(message)),
            Step::Abort => return Err(EngineError::Aborted),
        };
        Ok(EngineOutput {
            corrected_text: text,
            corrections,
        })
    }
}

#[derive(Default)]
struct RecordingHooks {
    highlighted: RefCell<Vec<Vec<Correction>>>,
    clears: Cell<usize>,
    changes: Cell<usize>,
}

impl ProofreadHooks for RecordingHooks {
    fn highlight(&self, corrections: &[Correction]) {
        self.highlighted.borrow_mut().push(corrections.to_vec());
    }

    fn clear_highlights(&self) {
        self.clears.set(self.clears.get() + 1);
    }

    fn on_corrections_change(&self, _corrections: &[Correction]) {
        self.changes.set(self.changes.get() + 1);
    }
}

struct Fixture {
    surface: Rc<HeadlessSurface>,
    log: LifecycleLog,
    engine: Rc<ScriptedEngine>,
    hooks: Rc<RecordingHooks>,
    ctl: ProofreadController<ScriptedEngine>,
    id: SurfaceId,
}

impl Fixture {
    fn new(text: &str) -> Self {
        let surface = Rc::new(HeadlessSurface::text_area(text));
        let log = LifecycleLog::new();
        let engine = Rc::new(ScriptedEngine::default());
        let hooks = Rc::new(RecordingHooks::default());
        let ctl = ProofreadController::new(
            engine.clone(),
            Rc::new(log.clone()),
            ControllerOptions {
                debounce: DEBOUNCE,
                history_max: 50,
                platform: Platform::Other,
            },
        );
        let id = ctl.register(surface.clone(), hooks.clone());
        Self {
            surface,
            log,
            engine,
            hooks,
            ctl,
            id,
        }
    }

    /// Schedule a debounced run on every input event, as a host would.
    fn wire_input(&self) {
        let ctl = self.ctl.clone();
        let id = self.id;
        self.surface.on_input(move || {
            ctl.schedule_proofread(id);
        });
    }

    async fn run(&self) -> ProofreadOutcome {
        self.run_with(ProofreadOptions::default()).await
    }

    async fn run_with(&self, options: ProofreadOptions) -> ProofreadOutcome {
        match self.ctl.proofread(self.id, options).await {
            Ok(outcome) => outcome,
            Err(err) => panic!("unexpected engine error: {err}"),
        }
    }

    fn reasons(&self) -> Vec<Option<LifecycleReason>> {
        self.log.events().iter().map(|e| e.reason).collect()
    }
}

fn c(start: usize, end: usize, text: &str) -> Correction {
    Correction::new(start, end, text, CorrectionKind::Spelling)
}

/// Let spawned local tasks (guard releases) run without firing a debounce.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

#[tokio::test(start_paused = true)]
async fn unchanged_text_skips_engine() {
    LocalSet::new()
        .run_until(async {
            let f = Fixture::new("Teh cat");
            f.engine.push(Step::Reply(vec![c(0, 3, "The")]));
            assert_eq!(
                f.run().await,
                ProofreadOutcome::Completed {
                    correction_count: 1,
                    detected: 1
                }
            );
            f.log.clear();

            let outcome = f.run().await;
            assert_eq!(outcome, ProofreadOutcome::Ignored(LifecycleReason::UnchangedText));
            assert_eq!(
                f.log.statuses(),
                vec![LifecycleStatus::Queued, LifecycleStatus::Ignored]
            );
            assert_eq!(f.engine.call_count(), 1);
            assert_eq!(f.ctl.corrections(f.id), vec![c(0, 3, "The")]);

            // Forcing bypasses the shortcut.
            f.run_with(ProofreadOptions::forced()).await;
            assert_eq!(f.engine.call_count(), 2);
            assert_eq!(f.log.events()[2].forced, Some(true));
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn whitespace_only_text_clears_without_engine() {
    LocalSet::new()
        .run_until(async {
            let f = Fixture::new("Teh");
            f.engine.push(Step::Reply(vec![c(0, 3, "The")]));
            f.run().await;
            let clears_before = f.hooks.clears.get();

            f.surface.set_text("  \n ");
            f.log.clear();
            let outcome = f.run().await;
            assert_eq!(outcome, ProofreadOutcome::Ignored(LifecycleReason::EmptyText));
            assert!(f.ctl.corrections(f.id).is_empty());
            assert_eq!(f.hooks.clears.get(), clears_before + 1);
            assert_eq!(f.engine.call_count(), 1);
            let last = f.log.last().expect("event");
            assert_eq!(last.reason, Some(LifecycleReason::EmptyText));
            assert_eq!(last.correction_count, Some(0));
            assert_eq!(f.ctl.run_state(f.id), Some(RunState::Idle));
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn selection_runs_merge_into_existing_set() {
    LocalSet::new()
        .run_until(async {
            let f = Fixture::new("Thsi is teh text");
            f.engine
                .push(Step::Reply(vec![c(8, 11, "the"), c(0, 4, "This")]));
            f.run().await;
            assert_eq!(
                f.ctl.corrections(f.id),
                vec![c(8, 11, "the"), c(0, 4, "This")]
            );

            f.engine.push(Step::Reply(vec![c(0, 4, "Thus")]));
            let opts = ProofreadOptions {
                force: true,
                selection: Some(Utf16Range::new(0, 5)),
            };
            f.run_with(opts).await;
            assert_eq!(
                f.ctl.corrections(f.id),
                vec![c(0, 4, "Thus"), c(8, 11, "the")]
            );
            let (text, context) = f.engine.calls.borrow()[1].clone();
            assert_eq!(text, "Thsi is teh text");
            assert_eq!(context.selection, Some(Utf16Range::new(0, 5)));

            // An empty result clears only what started inside the selection.
            let opts = ProofreadOptions {
                force: true,
                selection: Some(Utf16Range::new(6, 12)),
            };
            let outcome = f.run_with(opts).await;
            assert_eq!(
                outcome,
                ProofreadOutcome::Completed {
                    correction_count: 1,
                    detected: 0
                }
            );
            assert_eq!(f.ctl.corrections(f.id), vec![c(0, 4, "Thus")]);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn empty_selection_means_whole_document() {
    LocalSet::new()
        .run_until(async {
            let f = Fixture::new("Teh cat");
            f.engine.push(Step::Reply(vec![c(0, 3, "The")]));
            f.run_with(ProofreadOptions::selection(Utf16Range::new(4, 4)))
                .await;
            assert_eq!(f.engine.calls.borrow()[0].1.selection, None);
            assert_eq!(f.ctl.corrections(f.id), vec![c(0, 3, "The")]);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn apply_shifts_later_corrections_and_throttles_input() {
    LocalSet::new()
        .run_until(async {
            let f = Fixture::new("Xxxx rest teh end");
            f.wire_input();
            f.engine
                .push(Step::Reply(vec![c(0, 4, "Thisx"), c(10, 13, "the")]));
            f.run().await;
            f.log.clear();

            assert!(f.ctl.apply_correction(f.id, &c(0, 4, "Thisx")));
            assert_eq!(f.surface.text(), "Thisx rest teh end");
            assert_eq!(f.surface.selection(), Utf16Range::new(5, 5));
            assert_eq!(f.ctl.corrections(f.id), vec![c(11, 14, "the")]);
            assert_eq!(f.surface.input_count(), 1);
            assert_eq!(
                f.hooks.highlighted.borrow().last().cloned(),
                Some(vec![c(11, 14, "the")])
            );

            // The synthetic input event was throttled, not queued.
            assert_eq!(f.log.statuses(), vec![LifecycleStatus::Throttled]);
            assert_eq!(f.reasons(), vec![Some(LifecycleReason::ApplyingCorrection)]);
            assert!(f.ctl.is_applying(f.id));

            settle().await;
            assert!(!f.ctl.is_applying(f.id));
            assert!(f.ctl.schedule_proofread(f.id));
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn equal_length_apply_keeps_offsets() {
    LocalSet::new()
        .run_until(async {
            let f = Fixture::new("Xxxx rest teh end");
            f.engine
                .push(Step::Reply(vec![c(0, 4, "This"), c(10, 13, "the")]));
            f.run().await;
            assert!(f.ctl.apply_correction(f.id, &c(0, 4, "This")));
            assert_eq!(f.surface.text(), "This rest teh end");
            assert_eq!(f.ctl.corrections(f.id), vec![c(10, 13, "the")]);

            // The applied text counts as analysed.
            settle().await;
            assert_eq!(
                f.run().await,
                ProofreadOutcome::Ignored(LifecycleReason::UnchangedText)
            );
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn apply_rejects_out_of_range() {
    LocalSet::new()
        .run_until(async {
            let f = Fixture::new("short");
            assert!(!f.ctl.apply_correction(f.id, &c(2, 40, "x")));
            assert!(!f.ctl.apply_correction(f.id, &c(3, 3, "x")));
            assert_eq!(f.surface.text(), "short");
            assert_eq!(f.surface.input_count(), 0);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn debounce_coalesces_bursts() {
    LocalSet::new()
        .run_until(async {
            let f = Fixture::new("");
            f.wire_input();
            for text in ["Teh", "Teh c", "Teh cat"] {
                f.surface.type_text(text);
                tokio::time::sleep(Duration::from_millis(30)).await;
            }
            assert_eq!(f.engine.call_count(), 0);
            tokio::time::sleep(DEBOUNCE * 2).await;

            assert_eq!(f.engine.call_count(), 1);
            assert_eq!(f.engine.calls.borrow()[0].0, "Teh cat");
            let queued: Vec<_> = f
                .log
                .events()
                .into_iter()
                .filter(|e| e.status == LifecycleStatus::Queued && e.debounce_ms.is_some())
                .collect();
            assert_eq!(queued.len(), 3);
            assert!(queued.iter().all(|e| e.debounce_ms == Some(100)));
            assert!(queued.iter().all(|e| e.queue_length == Some(1)));
            let starts = f
                .log
                .statuses()
                .into_iter()
                .filter(|s| *s == LifecycleStatus::Start)
                .count();
            assert_eq!(starts, 1);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn explicit_run_cancels_pending_debounce() {
    LocalSet::new()
        .run_until(async {
            let f = Fixture::new("Teh cat");
            assert!(f.ctl.schedule_proofread(f.id));
            assert_eq!(f.ctl.run_state(f.id), Some(RunState::Queued));
            f.run().await;
            tokio::time::sleep(DEBOUNCE * 2).await;
            assert_eq!(f.engine.call_count(), 1);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn result_for_edited_text_is_stale() {
    LocalSet::new()
        .run_until(async {
            let f = Fixture::new("Teh cat");
            f.engine.push(Step::Delayed(
                Duration::from_millis(50),
                vec![c(0, 3, "The")],
            ));
            let ctl = f.ctl.clone();
            let id = f.id;
            let pending = tokio::task::spawn_local(async move {
                ctl.proofread(id, ProofreadOptions::default()).await
            });
            tokio::time::sleep(Duration::from_millis(10)).await;
            assert_eq!(f.ctl.run_state(f.id), Some(RunState::Running));
            f.surface.set_text("Teh dog");

            let outcome = pending.await.expect("join");
            assert_eq!(outcome, Ok(ProofreadOutcome::Stale));
            assert!(f.ctl.corrections(f.id).is_empty());
            let last = f.log.last().expect("event");
            assert_eq!(last.status, LifecycleStatus::Complete);
            assert_eq!(last.reason, Some(LifecycleReason::Stale));
            assert_eq!(last.correction_count, Some(0));
            assert_eq!(last.detected_issue_count, Some(1));
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn superseded_run_does_not_overwrite_newer_result() {
    LocalSet::new()
        .run_until(async {
            let f = Fixture::new("Teh cat");
            f.engine.push(Step::Delayed(
                Duration::from_millis(50),
                vec![c(0, 3, "Old")],
            ));
            f.engine.push(Step::Reply(vec![c(0, 3, "The")]));
            let ctl = f.ctl.clone();
            let id = f.id;
            let first = tokio::task::spawn_local(async move {
                ctl.proofread(id, ProofreadOptions::default()).await
            });
            tokio::time::sleep(Duration::from_millis(10)).await;

            f.run_with(ProofreadOptions::forced()).await;
            assert_eq!(f.ctl.corrections(f.id), vec![c(0, 3, "The")]);

            assert_eq!(first.await.expect("join"), Ok(ProofreadOutcome::Stale));
            assert_eq!(f.ctl.corrections(f.id), vec![c(0, 3, "The")]);
            assert_eq!(f.ctl.run_state(f.id), Some(RunState::Complete));
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn edit_during_run_leaves_surface_queued_for_the_armed_timer() {
    LocalSet::new()
        .run_until(async {
            let f = Fixture::new("Teh cat");
            f.wire_input();
            f.engine.push(Step::Delayed(
                Duration::from_millis(50),
                vec![c(0, 3, "The")],
            ));
            f.engine.push(Step::Reply(Vec::new()));
            let ctl = f.ctl.clone();
            let id = f.id;
            let first = tokio::task::spawn_local(async move {
                ctl.proofread(id, ProofreadOptions::default()).await
            });
            tokio::time::sleep(Duration::from_millis(10)).await;
            f.surface.type_text("Teh dog");
            assert_eq!(f.ctl.run_state(f.id), Some(RunState::Running));

            assert_eq!(first.await.expect("join"), Ok(ProofreadOutcome::Stale));
            assert_eq!(f.ctl.run_state(f.id), Some(RunState::Queued));

            tokio::time::sleep(DEBOUNCE * 2).await;
            assert_eq!(f.engine.call_count(), 2);
            assert_eq!(f.engine.calls.borrow()[1].0, "Teh dog");
            assert_eq!(f.ctl.run_state(f.id), Some(RunState::Complete));
        })
        .await;
}

/// Reads controller state back from inside every `emit`.
#[derive(Default)]
struct ReadingSink {
    ctl: RefCell<Option<ProofreadController<ScriptedEngine>>>,
    seen: RefCell<Vec<(LifecycleStatus, usize)>>,
}

impl LifecycleSink for ReadingSink {
    fn emit(&self, event: &LifecycleEvent) {
        let ctl = self.ctl.borrow();
        let Some(ctl) = ctl.as_ref() else {
            return;
        };
        let count = ctl.corrections(event.surface_id).len();
        self.seen.borrow_mut().push((event.status, count));
    }
}

#[tokio::test(start_paused = true)]
async fn sinks_may_read_the_controller_while_handling_events() {
    LocalSet::new()
        .run_until(async {
            let surface = Rc::new(HeadlessSurface::text_area("Teh cat"));
            let engine = Rc::new(ScriptedEngine::default());
            engine.push(Step::Reply(vec![c(0, 3, "The")]));
            let sink = Rc::new(ReadingSink::default());
            let ctl = ProofreadController::new(
                engine,
                sink.clone(),
                ControllerOptions {
                    debounce: DEBOUNCE,
                    history_max: 50,
                    platform: Platform::Other,
                },
            );
            *sink.ctl.borrow_mut() = Some(ctl.clone());
            let id = ctl.register(surface.clone(), Rc::new(RecordingHooks::default()));

            let outcome = ctl.proofread(id, ProofreadOptions::default()).await;
            assert!(matches!(outcome, Ok(ProofreadOutcome::Completed { .. })));
            assert!(ctl.schedule_proofread(id));
            let unchanged = ctl.proofread(id, ProofreadOptions::default()).await;
            assert_eq!(
                unchanged,
                Ok(ProofreadOutcome::Ignored(LifecycleReason::UnchangedText))
            );

            assert_eq!(
                *sink.seen.borrow(),
                vec![
                    (LifecycleStatus::Queued, 0),
                    (LifecycleStatus::Start, 0),
                    (LifecycleStatus::Complete, 1),
                    (LifecycleStatus::Queued, 1),
                    (LifecycleStatus::Queued, 1),
                    (LifecycleStatus::Ignored, 1),
                ]
            );
            // Break the controller <-> sink cycle.
            sink.ctl.borrow_mut().take();
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn engine_failure_emits_error_then_complete() {
    LocalSet::new()
        .run_until(async {
            let f = Fixture::new("Teh cat");
            f.engine.push(Step::Reply(vec![c(0, 3, "The")]));
            f.run().await;
            f.surface.set_text("Teh cat sat");
            f.engine.push(Step::Fail("boom"));
            f.log.clear();

            let err = f
                .ctl
                .proofread(f.id, ProofreadOptions::default())
                .await
                .expect_err("engine failure");
            assert_eq!(
                err,
                ProofreadError::Engine(EngineError::Failed("boom".into()))
            );
            assert_eq!(
                f.log.statuses(),
                vec![
                    LifecycleStatus::Queued,
                    LifecycleStatus::Start,
                    LifecycleStatus::Error,
                    LifecycleStatus::Complete,
                ]
            );
            let last = f.log.last().expect("event");
            assert_eq!(last.reason, Some(LifecycleReason::Error));
            assert_eq!(last.error.as_deref(), Some("engine failed: boom"));
            assert!(f.ctl.corrections(f.id).is_empty());
            assert_eq!(f.ctl.run_state(f.id), Some(RunState::Error));
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn aborted_run_is_benign() {
    LocalSet::new()
        .run_until(async {
            let f = Fixture::new("Teh cat");
            f.engine.push(Step::Abort);
            assert_eq!(f.run().await, ProofreadOutcome::Aborted);
            assert_eq!(
                f.log.statuses(),
                vec![
                    LifecycleStatus::Queued,
                    LifecycleStatus::Start,
                    LifecycleStatus::Abort,
                    LifecycleStatus::Complete,
                ]
            );
            assert_eq!(
                f.log.last().and_then(|e| e.reason),
                Some(LifecycleReason::Aborted)
            );
            assert_eq!(f.ctl.run_state(f.id), Some(RunState::Aborted));
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn history_snapshot_short_circuits_engine() {
    LocalSet::new()
        .run_until(async {
            let f = Fixture::new("Teh cat");
            f.engine.push(Step::Reply(vec![c(0, 3, "The")]));
            f.run().await;
            assert!(f.ctl.record_history(f.id));

            f.surface.type_text("Teh cat sat");
            f.run().await;
            assert!(f.ctl.corrections(f.id).is_empty());

            f.surface.set_text("Teh cat");
            f.log.clear();
            let outcome = f.run().await;
            assert_eq!(
                outcome,
                ProofreadOutcome::Ignored(LifecycleReason::RestoredFromHistory)
            );
            assert_eq!(f.ctl.corrections(f.id), vec![c(0, 3, "The")]);
            assert_eq!(f.engine.call_count(), 2);
            let last = f.log.last().expect("event");
            assert_eq!(last.correction_count, Some(1));
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn undo_restores_text_and_corrections_without_reanalysis() {
    LocalSet::new()
        .run_until(async {
            let original = "Xxxx rest teh end";
            let f = Fixture::new(original);
            f.wire_input();
            let before = vec![c(0, 4, "Thisx"), c(10, 13, "the")];
            f.engine.push(Step::Reply(before.clone()));
            f.run().await;
            f.ctl.apply_correction(f.id, &c(0, 4, "Thisx"));
            settle().await;
            f.log.clear();

            let undo = KeyChord::new(Key::Char('z'), ModMask::CTRL);
            assert!(f.ctl.handle_key(f.id, &undo));
            assert_eq!(f.surface.text(), original);
            assert_eq!(f.ctl.corrections(f.id), before);
            assert!(f.ctl.is_restoring(f.id));
            assert_eq!(f.reasons(), vec![Some(LifecycleReason::RestoringFromHistory)]);

            settle().await;
            assert!(!f.ctl.is_restoring(f.id));
            assert_eq!(
                f.run().await,
                ProofreadOutcome::Ignored(LifecycleReason::UnchangedText)
            );
            assert_eq!(f.engine.call_count(), 1);

            assert!(f.ctl.redo(f.id));
            assert_eq!(f.surface.text(), "Thisx rest teh end");
            assert_eq!(f.ctl.corrections(f.id), vec![c(11, 14, "the")]);
            tokio::time::sleep(DEBOUNCE * 2).await;
            assert_eq!(f.engine.call_count(), 1);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn undo_with_empty_stack_still_consumes_shortcut() {
    LocalSet::new()
        .run_until(async {
            let f = Fixture::new("abc");
            assert!(!f.ctl.undo(f.id));
            let undo = KeyChord::new(Key::Char('z'), ModMask::CTRL);
            assert!(f.ctl.handle_key(f.id, &undo));
            assert!(!f.ctl.handle_key(f.id, &KeyChord::plain(Key::Char('z'))));
            assert_eq!(f.surface.text(), "abc");
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn undo_modifier_follows_the_host_platform() {
    LocalSet::new()
        .run_until(async {
            let options = ControllerOptions::from_config(&Config::default(), Platform::Mac);
            assert_eq!(options.platform, Platform::Mac);
            let ctl = ProofreadController::new(
                Rc::new(ScriptedEngine::default()),
                Rc::new(LifecycleLog::new()),
                options,
            );
            let surface = Rc::new(HeadlessSurface::text_area("abc"));
            let id = ctl.register(surface, Rc::new(RecordingHooks::default()));
            let ctrl_z = KeyChord::new(Key::Char('z'), ModMask::CTRL);
            let meta_z = KeyChord::new(Key::Char('z'), ModMask::META);
            assert!(!ctl.handle_key(id, &ctrl_z));
            assert!(ctl.handle_key(id, &meta_z));
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn unknown_surface_is_throttled() {
    LocalSet::new()
        .run_until(async {
            let f = Fixture::new("Teh cat");
            let stranger = SurfaceId(u64::MAX);
            assert!(!f.ctl.schedule_proofread(stranger));
            assert_eq!(
                f.log.last().and_then(|e| e.reason),
                Some(LifecycleReason::MissingState)
            );
            f.log.clear();
            let outcome = f
                .ctl
                .proofread(stranger, ProofreadOptions::default())
                .await;
            assert_eq!(
                outcome,
                Ok(ProofreadOutcome::Throttled(LifecycleReason::MissingState))
            );
            assert_eq!(
                f.log.statuses(),
                vec![LifecycleStatus::Queued, LifecycleStatus::Throttled]
            );
            assert!(!f.ctl.apply_correction(stranger, &c(0, 1, "x")));
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn unregister_cancels_pending_timer() {
    LocalSet::new()
        .run_until(async {
            let f = Fixture::new("Teh cat");
            f.ctl.schedule_proofread(f.id);
            assert!(f.ctl.unregister(f.id));
            assert!(!f.ctl.is_registered(f.id));
            tokio::time::sleep(DEBOUNCE * 2).await;
            assert_eq!(f.engine.call_count(), 0);
            assert!(!f.ctl.unregister(f.id));
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn filter_drops_unwanted_kinds() {
    LocalSet::new()
        .run_until(async {
            let mut f = Fixture::new("Teh cat sat");
            f.ctl = f
                .ctl
                .clone()
                .with_filter(|c| c.kind != CorrectionKind::Style);
            f.id = f.ctl.register(f.surface.clone(), f.hooks.clone());
            let style = Correction::new(4, 7, "kitty", CorrectionKind::Style);
            f.engine.push(Step::Reply(vec![c(0, 3, "The"), style]));
            assert_eq!(
                f.run().await,
                ProofreadOutcome::Completed {
                    correction_count: 1,
                    detected: 2
                }
            );
            assert_eq!(f.ctl.corrections(f.id), vec![c(0, 3, "The")]);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn out_of_bounds_engine_offsets_are_dropped() {
    LocalSet::new()
        .run_until(async {
            let f = Fixture::new("Teh");
            f.engine
                .push(Step::Reply(vec![c(0, 3, "The"), c(2, 9, "x"), c(1, 1, "y")]));
            f.run().await;
            assert_eq!(f.ctl.corrections(f.id), vec![c(0, 3, "The")]);
            assert!(f.hooks.changes.get() >= 1);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn session_highlighter_drives_overlay() {
    LocalSet::new()
        .run_until(async {
            let surface = Rc::new(HeadlessSurface::text_area("Teh cat sat"));
            let overlay = HeadlessOverlay::new(HostCapabilities::new(false, Platform::Other));
            let clock = ManualFrameClock::new();
            let session = Rc::new(TargetSession::new(
                surface.clone(),
                Box::new(overlay.clone()),
                Rc::new(clock.clone()),
                SessionOptions::default(),
                Rc::new(NoopSessionHooks),
            ));
            let engine = Rc::new(ScriptedEngine::default());
            engine.push(Step::Reply(vec![c(0, 3, "The"), c(8, 11, "sat.")]));
            let ctl = ProofreadController::new(
                engine,
                Rc::new(LifecycleLog::new()),
                ControllerOptions::default(),
            );
            let id = ctl.register(surface.clone(), Rc::new(SessionHighlighter::new(session.clone())));
            ctl.proofread(id, ProofreadOptions::default())
                .await
                .expect("run");

            assert_eq!(session.issues().len(), 2);
            assert!(session.is_attached());
            for token in clock.fire() {
                session.on_frame(token);
            }
            assert_eq!(overlay.node_count(), 2);

            ctl.clear(id);
            assert!(!session.is_attached());
            assert_eq!(overlay.node_count(), 0);
        })
        .await;
}
