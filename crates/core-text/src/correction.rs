//! Correction records produced by a correction engine.
//!
//! Offsets are UTF-16 code units into the exact text snapshot the engine was
//! given. They go stale the instant that text changes; the proofreading
//! controller is responsible for detecting and reconciling that.

use crate::utf16::{Utf16Range, utf16_len};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a correction. Unknown categories deserialize to `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CorrectionKind {
    Spelling,
    Grammar,
    Punctuation,
    Capitalization,
    Preposition,
    MissingWords,
    Style,
    #[default]
    #[serde(other)]
    Other,
}

impl CorrectionKind {
    pub const ALL: [CorrectionKind; 8] = [
        CorrectionKind::Spelling,
        CorrectionKind::Grammar,
        CorrectionKind::Punctuation,
        CorrectionKind::Capitalization,
        CorrectionKind::Preposition,
        CorrectionKind::MissingWords,
        CorrectionKind::Style,
        CorrectionKind::Other,
    ];

    /// Stable kebab-case identifier (matches the serialized form).
    pub fn as_str(self) -> &'static str {
        match self {
            CorrectionKind::Spelling => "spelling",
            CorrectionKind::Grammar => "grammar",
            CorrectionKind::Punctuation => "punctuation",
            CorrectionKind::Capitalization => "capitalization",
            CorrectionKind::Preposition => "preposition",
            CorrectionKind::MissingWords => "missing-words",
            CorrectionKind::Style => "style",
            CorrectionKind::Other => "other",
        }
    }

    fn title(self) -> &'static str {
        match self {
            CorrectionKind::Spelling => "Spelling",
            CorrectionKind::Grammar => "Grammar",
            CorrectionKind::Punctuation => "Punctuation",
            CorrectionKind::Capitalization => "Capitalization",
            CorrectionKind::Preposition => "Preposition",
            CorrectionKind::MissingWords => "Missing words",
            CorrectionKind::Style => "Style",
            CorrectionKind::Other => "Suggestion",
        }
    }
}

impl fmt::Display for CorrectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Correction {
    pub start_index: usize,
    pub end_index: usize,
    pub replacement_text: String,
    #[serde(rename = "type", default)]
    pub kind: CorrectionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl Correction {
    pub fn new(
        start_index: usize,
        end_index: usize,
        replacement_text: impl Into<String>,
        kind: CorrectionKind,
    ) -> Self {
        Self {
            start_index,
            end_index,
            replacement_text: replacement_text.into(),
            kind,
            explanation: None,
        }
    }

    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }

    pub fn range(&self) -> Utf16Range {
        Utf16Range {
            start: self.start_index,
            end: self.end_index,
        }
    }

    /// `end <= start`: carries no span and must be dropped before use.
    pub fn is_degenerate(&self) -> bool {
        self.end_index <= self.start_index
    }

    /// Length of the replacement in UTF-16 code units.
    pub fn replacement_len(&self) -> usize {
        utf16_len(&self.replacement_text)
    }

    /// Signed change in text length when this correction is applied.
    pub fn length_delta(&self) -> isize {
        self.replacement_len() as isize - self.end_index.saturating_sub(self.start_index) as isize
    }

    /// Accessible label, e.g. `Spelling: replace with "This"`.
    pub fn label(&self) -> String {
        if self.replacement_text.is_empty() {
            format!("{}: remove text", self.kind.title())
        } else {
            format!(
                "{}: replace with \"{}\"",
                self.kind.title(),
                self.replacement_text
            )
        }
    }
}
