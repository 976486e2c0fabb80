//! Native range-highlight target.
//!
//! Hosts that can paint text ranges themselves get `(kind, ranges)` groups
//! instead of overlay boxes. No mirror measurement is involved. Only kinds
//! whose range set changed since the last publish are re-sent; kinds that
//! disappeared are published empty.

use std::collections::BTreeMap;

use core_text::{CorrectionKind, Utf16Range};

use crate::issue::Issue;

pub trait HighlightRegistry {
    fn set_highlights(&mut self, _kind: CorrectionKind, _ranges: &[Utf16Range]) {}
    fn clear_highlights(&mut self) {}
}

#[derive(Debug, Default)]
pub struct NativeHighlighter {
    published: BTreeMap<CorrectionKind, Vec<Utf16Range>>,
}

impl NativeHighlighter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of kinds re-published.
    pub fn publish(&mut self, registry: &mut dyn HighlightRegistry, issues: &[Issue]) -> usize {
        let mut next: BTreeMap<CorrectionKind, Vec<Utf16Range>> = BTreeMap::new();
        for issue in issues {
            next.entry(issue.kind)
                .or_default()
                .push(Utf16Range::new(issue.start, issue.end));
        }
        let mut sent = 0;
        for (kind, ranges) in &next {
            if self.published.get(kind) != Some(ranges) {
                registry.set_highlights(*kind, ranges);
                sent += 1;
            }
        }
        for kind in self.published.keys() {
            if !next.contains_key(kind) {
                registry.set_highlights(*kind, &[]);
                sent += 1;
            }
        }
        self.published = next;
        tracing::trace!(target: "render.native", kinds = self.published.len(), sent, "native_publish");
        sent
    }

    pub fn clear(&mut self, registry: &mut dyn HighlightRegistry) {
        self.published.clear();
        registry.clear_highlights();
    }

    pub fn ranges(&self, kind: CorrectionKind) -> &[Utf16Range] {
        self.published.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issue::issues_from_corrections;
    use core_text::Correction;
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct Registry {
        calls: Vec<(CorrectionKind, usize)>,
        cleared: u32,
    }

    impl HighlightRegistry for Registry {
        fn set_highlights(&mut self, kind: CorrectionKind, ranges: &[Utf16Range]) {
            self.calls.push((kind, ranges.len()));
        }
        fn clear_highlights(&mut self) {
            self.cleared += 1;
        }
    }

    #[test]
    fn groups_by_kind_and_skips_unchanged() {
        let issues = issues_from_corrections(&[
            Correction::new(0, 3, "x", CorrectionKind::Spelling),
            Correction::new(4, 6, "y", CorrectionKind::Spelling),
            Correction::new(7, 9, "z", CorrectionKind::Grammar),
        ]);
        let mut reg = Registry::default();
        let mut n = NativeHighlighter::new();
        assert_eq!(n.publish(&mut reg, &issues), 2);
        assert_eq!(n.ranges(CorrectionKind::Spelling).len(), 2);
        assert_eq!(n.publish(&mut reg, &issues), 0);
        assert_eq!(n.publish(&mut reg, &issues[..2]), 1);
        assert_eq!(reg.calls.last(), Some(&(CorrectionKind::Grammar, 0)));
        n.clear(&mut reg);
        assert_eq!(reg.cleared, 1);
        assert!(n.ranges(CorrectionKind::Spelling).is_empty());
    }
}
