//! Correction-set arithmetic: validation, selection merge and offset shift.

use core_text::{Correction, Utf16Range};

/// Drop degenerate corrections and those reaching past `text_len`.
pub fn sanitize(corrections: Vec<Correction>, text_len: usize) -> Vec<Correction> {
    corrections
        .into_iter()
        .filter(|c| !c.is_degenerate() && c.end_index <= text_len)
        .collect()
}

/// Replace the part of `existing` that starts inside `selection` with
/// `incoming`. Result is sorted by `(start, end)`; the sort is stable so
/// equal spans keep existing-before-incoming order.
pub fn merge_selection(
    existing: &[Correction],
    incoming: Vec<Correction>,
    selection: Utf16Range,
) -> Vec<Correction> {
    let mut merged: Vec<Correction> = existing
        .iter()
        .filter(|c| !selection.contains(c.start_index))
        .cloned()
        .chain(incoming)
        .collect();
    merged.sort_by_key(|c| (c.start_index, c.end_index));
    merged
}

/// Remove `applied` from `corrections` and move every correction starting
/// after it by the applied length delta. Corrections that would start before
/// offset zero or collapse to nothing are dropped.
pub fn shift_after_apply(corrections: &[Correction], applied: &Correction) -> Vec<Correction> {
    let delta = applied.length_delta();
    let mut removed = false;
    corrections
        .iter()
        .filter(|c| {
            if !removed && *c == applied {
                removed = true;
                return false;
            }
            true
        })
        .filter_map(|c| {
            if c.start_index <= applied.start_index {
                return Some(c.clone());
            }
            let start = c.start_index.checked_add_signed(delta)?;
            let end = c.end_index.checked_add_signed(delta)?;
            let moved = Correction {
                start_index: start,
                end_index: end,
                ..c.clone()
            };
            (!moved.is_degenerate()).then_some(moved)
        })
        .collect()
}
