//! Issues and range descriptors.
//!
//! An `Issue` is a correction as the overlay sees it: a UTF-16 span, a kind
//! and an accessible label, identified by a stable id. The id is a pure
//! function of `(start, end, ordinal)` where `ordinal` counts earlier issues
//! sharing the same span, so re-rendering the same correction set reuses the
//! same overlay nodes.
//!
//! A `RangeDescriptor` is one visual box of one issue (an issue spanning a
//! soft wrap produces one descriptor per line segment).

use ahash::AHashMap;
use core_surface::Rect;
use core_text::{Correction, CorrectionKind};

use crate::mirror::Mirror;

#[derive(Debug, Clone, PartialEq)]
pub struct Issue {
    pub id: String,
    pub start: usize,
    pub end: usize,
    pub kind: CorrectionKind,
    pub label: String,
}

pub fn issue_id(start: usize, end: usize, ordinal: usize) -> String {
    format!("issue-{start}-{end}-{ordinal}")
}

/// Derive issues from corrections, dropping degenerate spans.
pub fn issues_from_corrections(corrections: &[Correction]) -> Vec<Issue> {
    let mut seen: AHashMap<(usize, usize), usize> = AHashMap::new();
    corrections
        .iter()
        .filter(|c| !c.is_degenerate())
        .map(|c| {
            let ordinal = seen.entry((c.start_index, c.end_index)).or_insert(0);
            let id = issue_id(c.start_index, c.end_index, *ordinal);
            *ordinal += 1;
            Issue {
                id,
                start: c.start_index,
                end: c.end_index,
                kind: c.kind,
                label: c.label(),
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct RangeDescriptor {
    /// `"<issue_id>:<rect_index>"`; the overlay node key.
    pub key: String,
    pub issue_id: String,
    pub kind: CorrectionKind,
    pub rect_index: usize,
    /// Content-box-local.
    pub rect: Rect,
    pub label: String,
}

pub fn descriptor_key(issue_id: &str, rect_index: usize) -> String {
    format!("{issue_id}:{rect_index}")
}

/// Measure every issue through the mirror. Degenerate rects are skipped but
/// keep their index so surviving keys stay stable.
pub fn build_descriptors(mirror: &mut dyn Mirror, issues: &[Issue]) -> Vec<RangeDescriptor> {
    let mut out = Vec::with_capacity(issues.len());
    for issue in issues {
        for (rect_index, rect) in mirror.get_rects(issue.start, issue.end).into_iter().enumerate() {
            if rect.is_degenerate() {
                continue;
            }
            out.push(RangeDescriptor {
                key: descriptor_key(&issue.id, rect_index),
                issue_id: issue.id.clone(),
                kind: issue.kind,
                rect_index,
                rect,
                label: issue.label.clone(),
            });
        }
    }
    out
}
