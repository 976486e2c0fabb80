//! Built-in rule engine used by the CLI.
//!
//! Deterministic and offline: flags repeated words, doubled spaces inside a
//! line, lowercase sentence starts and a standalone lowercase "i". Offsets are
//! UTF-16 code units into the text it was given.

use std::cell::Cell;

use clap::ValueEnum;
use core_proofread::{CorrectionEngine, EngineContext, EngineError, EngineOutput};
use core_text::{Correction, CorrectionKind, replace_range, utf16_len};
use tracing::debug;
use unicode_segmentation::UnicodeSegmentation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Rule {
    RepeatedWords,
    DoubleSpaces,
    SentenceCase,
    LowercaseI,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleSet {
    pub repeated_words: bool,
    pub double_spaces: bool,
    pub sentence_case: bool,
    pub lowercase_i: bool,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            repeated_words: true,
            double_spaces: true,
            sentence_case: true,
            lowercase_i: true,
        }
    }
}

impl RuleSet {
    pub fn without(mut self, rule: Rule) -> Self {
        match rule {
            Rule::RepeatedWords => self.repeated_words = false,
            Rule::DoubleSpaces => self.double_spaces = false,
            Rule::SentenceCase => self.sentence_case = false,
            Rule::LowercaseI => self.lowercase_i = false,
        }
        self
    }
}

#[derive(Debug, Default)]
pub struct RuleEngine {
    rules: RuleSet,
    runs: Cell<u64>,
}

struct Word<'a> {
    text: &'a str,
    byte_start: usize,
    start: usize,
    end: usize,
}

impl Word<'_> {
    fn byte_end(&self) -> usize {
        self.byte_start + self.text.len()
    }
}

impl RuleEngine {
    pub fn new(rules: RuleSet) -> Self {
        Self {
            rules,
            runs: Cell::new(0),
        }
    }

    /// Number of engine runs so far.
    pub fn runs(&self) -> u64 {
        self.runs.get()
    }

    /// All findings for `text`, sorted by `(start, end)`.
    pub fn check(&self, text: &str) -> Vec<Correction> {
        let words = words(text);
        let mut out = Vec::new();
        if self.rules.repeated_words {
            repeated_words(text, &words, &mut out);
        }
        if self.rules.double_spaces {
            double_spaces(text, &mut out);
        }
        if self.rules.sentence_case {
            sentence_case(text, &words, &mut out);
        }
        if self.rules.lowercase_i {
            lowercase_i(&words, &mut out);
        }
        out.sort_by_key(|c| (c.start_index, c.end_index));
        out
    }
}

impl CorrectionEngine for RuleEngine {
    async fn run(&self, text: String, context: EngineContext) -> Result<EngineOutput, EngineError> {
        self.runs.set(self.runs.get() + 1);
        let mut corrections = self.check(&text);
        if let Some(range) = context.selection {
            corrections.retain(|c| range.contains(c.start_index));
        }
        debug!(
            target: "engine.rules",
            execution_id = context.execution_id,
            count = corrections.len(),
            "rules_checked"
        );
        let corrected_text = apply_all(&text, &corrections);
        Ok(EngineOutput {
            corrected_text,
            corrections,
        })
    }
}

fn words(text: &str) -> Vec<Word<'_>> {
    let mut offset = 0;
    let mut out = Vec::new();
    for (byte_start, piece) in text.split_word_bound_indices() {
        let len = utf16_len(piece);
        if piece.chars().any(char::is_alphanumeric) {
            out.push(Word {
                text: piece,
                byte_start,
                start: offset,
                end: offset + len,
            });
        }
        offset += len;
    }
    out
}

fn repeated_words(text: &str, words: &[Word<'_>], out: &mut Vec<Correction>) {
    for pair in words.windows(2) {
        let [prev, word] = pair else {
            continue;
        };
        let gap = &text[prev.byte_end()..word.byte_start];
        let same_line = !gap.is_empty() && gap.chars().all(|c| c == ' ' || c == '\t');
        if same_line
            && word.text.chars().any(char::is_alphabetic)
            && prev.text.to_lowercase() == word.text.to_lowercase()
        {
            out.push(
                Correction::new(prev.end, word.end, "", CorrectionKind::Grammar)
                    .with_explanation(format!("Repeated word \"{}\"", word.text)),
            );
        }
    }
}

/// Runs of two or more spaces between visible characters on one line.
fn double_spaces(text: &str, out: &mut Vec<Correction>) {
    let mut offset = 0;
    let mut run: Option<usize> = None;
    let mut before_run: Option<char> = None;
    let mut prev: Option<char> = None;
    for ch in text.chars() {
        if ch == ' ' {
            if run.is_none() {
                run = Some(offset);
                before_run = prev;
            }
        } else if let Some(start) = run.take() {
            let inside_line = before_run.is_some_and(|c| c != '\n') && ch != '\n';
            if offset - start >= 2 && inside_line {
                out.push(
                    Correction::new(start, offset, " ", CorrectionKind::Style)
                        .with_explanation("Multiple spaces"),
                );
            }
        }
        prev = Some(ch);
        offset += ch.len_utf16();
    }
}

fn sentence_case(text: &str, words: &[Word<'_>], out: &mut Vec<Correction>) {
    for word in words {
        let mut chars = word.text.chars();
        let Some(first) = chars.next() else {
            continue;
        };
        if !first.is_lowercase() {
            continue;
        }
        let prefix = &text[..word.byte_start];
        let before = prefix.trim_end();
        let opens_sentence =
            before.is_empty() || (before.len() < prefix.len() && before.ends_with(['.', '!', '?']));
        if opens_sentence {
            let capitalized: String = first.to_uppercase().chain(chars).collect();
            out.push(
                Correction::new(word.start, word.end, capitalized, CorrectionKind::Capitalization)
                    .with_explanation("Sentence should start with a capital letter"),
            );
        }
    }
}

fn lowercase_i(words: &[Word<'_>], out: &mut Vec<Correction>) {
    for word in words {
        let standalone = word.text == "i" || word.text.starts_with("i'");
        if !standalone || out.iter().any(|c| c.start_index == word.start) {
            continue;
        }
        let fixed = format!("I{}", &word.text[1..]);
        out.push(
            Correction::new(word.start, word.end, fixed, CorrectionKind::Capitalization)
                .with_explanation("The pronoun \"I\" is capitalized"),
        );
    }
}

/// Apply non-overlapping corrections back to front; later overlaps lose.
fn apply_all(text: &str, corrections: &[Correction]) -> String {
    let mut result = text.to_string();
    let mut floor = usize::MAX;
    for c in corrections.iter().rev() {
        if c.end_index <= floor {
            result = replace_range(&result, c.range(), &c.replacement_text);
            floor = c.start_index;
        }
    }
    result
}
