//! One headless proofreading pass over a document.
//!
//! Wires a `HeadlessSurface`, `HeadlessOverlay` and `ManualFrameClock` into a
//! `TargetSession`, drives the controller with the rule engine and collects
//! what a host would have seen. Must run inside a `LocalSet`.

use std::io::Write;
use std::rc::Rc;

use anyhow::{Context, Result, anyhow, bail};
use core_config::Config;
use core_events::{ChannelLifecycleSink, LifecycleEvent, SurfaceEvent};
use core_proofread::{
    ControllerOptions, ProofreadController, ProofreadOptions, ProofreadOutcome, SessionHighlighter,
};
use core_render::{HeadlessOverlay, Issue, ManualFrameClock, OverlayNode};
use core_session::{NoopSessionHooks, SessionOptions, TargetSession};
use core_surface::{HeadlessSurface, HostCapabilities, Platform, Rect, Size, Surface};
use core_text::{Correction, CorrectionKind, Utf16Range};
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::rules::{RuleEngine, RuleSet};

/// Upper bound on frame-drain passes; a flush never schedules another frame.
const MAX_FRAME_PASSES: usize = 8;

#[derive(Debug, Clone)]
pub struct RunRequest {
    pub text: String,
    pub width: f64,
    pub height: f64,
    pub selection: Option<Utf16Range>,
    /// Index into the correction list to apply after the run.
    pub apply: Option<usize>,
    /// Ask the host for native range highlights instead of overlay nodes.
    pub native: bool,
    pub rules: RuleSet,
}

impl RunRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            width: 320.0,
            height: 200.0,
            selection: None,
            apply: None,
            native: false,
            rules: RuleSet::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Report {
    pub outcome: ProofreadOutcome,
    pub text: String,
    pub corrections: Vec<Correction>,
    pub applied: Option<Correction>,
    pub issues: Vec<Issue>,
    pub nodes: Vec<OverlayNode>,
    pub highlights: Vec<(CorrectionKind, Vec<Utf16Range>)>,
    pub overlay_frame: Rect,
    pub events: Vec<LifecycleEvent>,
    pub engine_runs: u64,
}

pub async fn run_document(config: &Config, request: RunRequest) -> Result<Report> {
    let surface = Rc::new(HeadlessSurface::text_area(&request.text));
    let mut style = surface.style();
    style.box_width_px = request.width;
    surface.set_style(style);
    surface.set_bounding_rect(Rect::new(0.0, 0.0, request.width, request.height));
    surface.set_client_size(Size::new(
        (request.width - style.border.horizontal()).max(0.0),
        (request.height - style.border.vertical()).max(0.0),
    ));

    let caps = HostCapabilities::new(request.native, Platform::detect());
    let overlay = HeadlessOverlay::new(caps);
    let clock = ManualFrameClock::new();
    let session = Rc::new(TargetSession::new(
        surface.clone(),
        Box::new(overlay.clone()),
        Rc::new(clock.clone()),
        SessionOptions::from_config(config),
        Rc::new(NoopSessionHooks),
    ));
    let weak = Rc::downgrade(&session);
    surface.on_input(move || {
        if let Some(session) = weak.upgrade() {
            session.handle_event(SurfaceEvent::Input);
        }
    });

    let (tx, mut rx) = mpsc::unbounded_channel();
    let engine = Rc::new(RuleEngine::new(request.rules));
    let controller = ProofreadController::new(
        engine.clone(),
        Rc::new(ChannelLifecycleSink::new(tx)),
        ControllerOptions::from_config(config, caps.platform),
    );
    let id = controller.register(
        surface.clone(),
        Rc::new(SessionHighlighter::new(session.clone())),
    );

    let options = ProofreadOptions {
        force: false,
        selection: request.selection,
    };
    let outcome = controller
        .proofread(id, options)
        .await
        .context("proofreading run failed")?;
    drain_frames(&clock, &session);
    info!(target: "runtime", ?outcome, corrections = controller.corrections(id).len(), "run_complete");

    let applied = match request.apply {
        Some(index) => {
            let corrections = controller.corrections(id);
            let target = corrections.get(index).cloned().ok_or_else(|| {
                anyhow!(
                    "no correction at index {index} ({} available)",
                    corrections.len()
                )
            })?;
            if !controller.apply_correction(id, &target) {
                bail!("correction {index} no longer fits the text");
            }
            // Let the guard release run before frames are drained.
            tokio::task::yield_now().await;
            drain_frames(&clock, &session);
            Some(target)
        }
        None => None,
    };

    let highlights = CorrectionKind::ALL
        .into_iter()
        .map(|kind| (kind, overlay.highlights(kind)))
        .filter(|(_, ranges)| !ranges.is_empty())
        .collect();
    let report = Report {
        outcome,
        text: surface.text(),
        corrections: controller.corrections(id),
        applied,
        issues: session.issues(),
        nodes: overlay.nodes(),
        highlights,
        overlay_frame: overlay.frame(),
        events: Vec::new(),
        engine_runs: engine.runs(),
    };
    controller.unregister(id);
    session.dispose();

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    debug!(target: "runtime", events = events.len(), "lifecycle_drained");
    Ok(Report { events, ..report })
}

fn drain_frames(clock: &ManualFrameClock, session: &TargetSession) {
    for _ in 0..MAX_FRAME_PASSES {
        let tokens = clock.fire();
        if tokens.is_empty() {
            return;
        }
        for token in tokens {
            session.on_frame(token);
        }
    }
}

impl Report {
    pub fn write_text(&self, out: &mut dyn Write) -> std::io::Result<()> {
        writeln!(out, "outcome: {:?}", self.outcome)?;
        if let Some(applied) = &self.applied {
            writeln!(
                out,
                "applied: {}..{} -> {:?}",
                applied.start_index, applied.end_index, applied.replacement_text
            )?;
        }
        writeln!(out, "issues ({}):", self.issues.len())?;
        for (index, issue) in self.issues.iter().enumerate() {
            writeln!(
                out,
                "  [{index}] {} {}..{} {}: {}",
                issue.id, issue.start, issue.end, issue.kind, issue.label
            )?;
        }
        if !self.nodes.is_empty() {
            let f = self.overlay_frame;
            writeln!(
                out,
                "overlay {}x{} at ({}, {}), nodes ({}):",
                f.width,
                f.height,
                f.x,
                f.y,
                self.nodes.len()
            )?;
            for node in &self.nodes {
                let r = node.rect;
                writeln!(
                    out,
                    "  {} x={:.1} y={:.1} w={:.1} h={:.1} {}",
                    node.key, r.x, r.y, r.width, r.height, node.color
                )?;
            }
        }
        for (kind, ranges) in &self.highlights {
            let spans: Vec<String> = ranges
                .iter()
                .map(|r| format!("{}..{}", r.start, r.end))
                .collect();
            writeln!(out, "highlight {kind}: {}", spans.join(", "))?;
        }
        writeln!(out, "events:")?;
        for event in &self.events {
            match event.reason {
                Some(reason) => writeln!(
                    out,
                    "  #{} {:?} ({reason:?})",
                    event.execution_id, event.status
                )?,
                None => writeln!(out, "  #{} {:?}", event.execution_id, event.status)?,
            }
        }
        if self.applied.is_some() {
            writeln!(out, "text:")?;
            writeln!(out, "{}", self.text)?;
        }
        Ok(())
    }

    /// One JSON object per line, tagged by `type`.
    pub fn write_json(&self, out: &mut dyn Write) -> std::io::Result<()> {
        for issue in &self.issues {
            let line = json!({
                "type": "issue",
                "id": issue.id,
                "start": issue.start,
                "end": issue.end,
                "kind": issue.kind.as_str(),
                "label": issue.label,
            });
            writeln!(out, "{line}")?;
        }
        for node in &self.nodes {
            let line = json!({
                "type": "node",
                "key": node.key,
                "issueId": node.issue_id,
                "rect": node.rect,
                "role": node.role,
                "label": node.label,
                "color": node.color,
                "style": node.style.as_str(),
            });
            writeln!(out, "{line}")?;
        }
        for (kind, ranges) in &self.highlights {
            let line = json!({ "type": "highlight", "kind": kind.as_str(), "ranges": ranges });
            writeln!(out, "{line}")?;
        }
        for event in &self.events {
            let line = json!({ "type": "event", "event": event });
            writeln!(out, "{line}")?;
        }
        let line = json!({
            "type": "result",
            "outcome": format!("{:?}", self.outcome),
            "engineRuns": self.engine_runs,
            "applied": self.applied,
            "corrections": self.corrections,
            "text": self.text,
        });
        writeln!(out, "{line}")
    }
}
