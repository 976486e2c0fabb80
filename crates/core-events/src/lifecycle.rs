//! Lifecycle event records and sinks.
//!
//! Every stage of a correction run produces one `LifecycleEvent`. Events are
//! serialized camelCase so a host can forward them verbatim to telemetry.
//! Sinks must not block. They run with no controller state borrowed, so a
//! sink may read the controller (corrections, run state) while handling one.

use crate::{LIFECYCLE_EVENTS_EMITTED, LIFECYCLE_SEND_FAILURES};
use core_surface::SurfaceId;
use serde::Serialize;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::Ordering;
use tokio::sync::mpsc::UnboundedSender;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LifecycleStatus {
    Queued,
    Throttled,
    Start,
    Complete,
    Error,
    Abort,
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LifecycleReason {
    MissingState,
    ApplyingCorrection,
    RestoringFromHistory,
    UnchangedText,
    EmptyText,
    RestoredFromHistory,
    Stale,
    Error,
    Aborted,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleEvent {
    pub surface_id: SurfaceId,
    pub status: LifecycleStatus,
    pub execution_id: u64,
    pub text_length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correction_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detected_issue_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<LifecycleReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debounce_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forced: Option<bool>,
}

impl LifecycleEvent {
    pub fn new(
        surface_id: SurfaceId,
        status: LifecycleStatus,
        execution_id: u64,
        text_length: usize,
    ) -> Self {
        Self {
            surface_id,
            status,
            execution_id,
            text_length,
            correction_count: None,
            detected_issue_count: None,
            reason: None,
            error: None,
            queue_length: None,
            debounce_ms: None,
            forced: None,
        }
    }

    pub fn with_reason(mut self, reason: LifecycleReason) -> Self {
        self.reason = Some(reason);
        self
    }

    pub fn with_counts(mut self, corrections: usize, detected: usize) -> Self {
        self.correction_count = Some(corrections);
        self.detected_issue_count = Some(detected);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn with_queue(mut self, queue_length: usize, debounce_ms: u64) -> Self {
        self.queue_length = Some(queue_length);
        self.debounce_ms = Some(debounce_ms);
        self
    }

    pub fn with_forced(mut self, forced: bool) -> Self {
        self.forced = Some(forced);
        self
    }
}

pub trait LifecycleSink {
    fn emit(&self, event: &LifecycleEvent);
}

/// Discards every event.
#[derive(Debug, Default)]
pub struct NoopLifecycleSink;

impl LifecycleSink for NoopLifecycleSink {
    fn emit(&self, _event: &LifecycleEvent) {}
}

/// Shared in-memory log; clones observe the same buffer.
#[derive(Debug, Default, Clone)]
pub struct LifecycleLog {
    events: Rc<RefCell<Vec<LifecycleEvent>>>,
}

impl LifecycleLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events.borrow().clone()
    }

    pub fn statuses(&self) -> Vec<LifecycleStatus> {
        self.events.borrow().iter().map(|e| e.status).collect()
    }

    pub fn last(&self) -> Option<LifecycleEvent> {
        self.events.borrow().last().cloned()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

impl LifecycleSink for LifecycleLog {
    fn emit(&self, event: &LifecycleEvent) {
        LIFECYCLE_EVENTS_EMITTED.fetch_add(1, Ordering::Relaxed);
        self.events.borrow_mut().push(event.clone());
    }
}

/// Forwards events into an unbounded tokio channel (consumer drains at its own pace).
#[derive(Debug, Clone)]
pub struct ChannelLifecycleSink {
    tx: UnboundedSender<LifecycleEvent>,
}

impl ChannelLifecycleSink {
    pub fn new(tx: UnboundedSender<LifecycleEvent>) -> Self {
        Self { tx }
    }
}

impl LifecycleSink for ChannelLifecycleSink {
    fn emit(&self, event: &LifecycleEvent) {
        LIFECYCLE_EVENTS_EMITTED.fetch_add(1, Ordering::Relaxed);
        if self.tx.send(event.clone()).is_err() {
            LIFECYCLE_SEND_FAILURES.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(target: "proofread.lifecycle", status = ?event.status, "lifecycle_channel_closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tokio::sync::mpsc;

    #[test]
    fn serializes_camel_case_and_skips_absent_fields() {
        let ev = LifecycleEvent::new(SurfaceId(7), LifecycleStatus::Ignored, 3, 12)
            .with_reason(LifecycleReason::UnchangedText);
        let json = serde_json::to_string(&ev).unwrap();
        assert_eq!(
            json,
            r#"{"surfaceId":7,"status":"ignored","executionId":3,"textLength":12,"reason":"unchanged-text"}"#
        );
    }

    #[test]
    fn log_records_in_order() {
        let log = LifecycleLog::new();
        let sink: &dyn LifecycleSink = &log;
        sink.emit(&LifecycleEvent::new(SurfaceId(1), LifecycleStatus::Queued, 1, 0));
        sink.emit(&LifecycleEvent::new(SurfaceId(1), LifecycleStatus::Start, 1, 0));
        assert_eq!(
            log.statuses(),
            vec![LifecycleStatus::Queued, LifecycleStatus::Start]
        );
        log.clear();
        assert!(log.events().is_empty());
    }

    #[tokio::test]
    async fn channel_sink_forwards_and_counts_closed_channel() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = ChannelLifecycleSink::new(tx);
        sink.emit(
            &LifecycleEvent::new(SurfaceId(2), LifecycleStatus::Complete, 9, 4).with_counts(1, 2),
        );
        let got = rx.recv().await.expect("event");
        assert_eq!(got.correction_count, Some(1));
        drop(rx);
        let before = LIFECYCLE_SEND_FAILURES.load(Ordering::Relaxed);
        sink.emit(&LifecycleEvent::new(SurfaceId(2), LifecycleStatus::Start, 10, 4));
        assert!(LIFECYCLE_SEND_FAILURES.load(Ordering::Relaxed) > before);
    }
}
