//! Configuration loading and parsing.
//!
//! Parses `proofmark.toml` (or an override path provided by the binary):
//!
//! * `[proofread] debounce_ms`: quiet period before a scheduled run fires.
//! * `[overlay] virtualization_margin`, `underline_style`,
//!   `autofix_on_double_click`.
//! * `[history] max_entries`: undo/redo stack bound per surface.
//! * `[palette]`: `#rrggbb` colour per correction kind.
//!
//! Missing sections fall back to defaults; unknown fields are ignored so the
//! file can evolve without warnings. A parse error logs a warning and yields
//! the defaults. Out-of-range values are clamped by `Config::apply_limits`,
//! which logs under the `config` target when it changes anything.

use anyhow::Result;
use core_text::CorrectionKind;
use serde::Deserialize;
use std::{fs, path::PathBuf};
use tracing::{info, warn};

pub const DEBOUNCE_MS_MAX: u64 = 10_000;
pub const DEFAULT_DEBOUNCE_MS: u64 = 800;
pub const DEFAULT_VIRTUALIZATION_MARGIN: f64 = 200.0;
pub const DEFAULT_HISTORY_MAX: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnderlineStyle {
    Solid,
    #[default]
    Wavy,
    Dotted,
}

impl UnderlineStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            UnderlineStyle::Solid => "solid",
            UnderlineStyle::Wavy => "wavy",
            UnderlineStyle::Dotted => "dotted",
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProofreadConfig {
    #[serde(default = "ProofreadConfig::default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for ProofreadConfig {
    fn default() -> Self {
        Self {
            debounce_ms: Self::default_debounce_ms(),
        }
    }
}

impl ProofreadConfig {
    const fn default_debounce_ms() -> u64 {
        DEFAULT_DEBOUNCE_MS
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct OverlayConfig {
    #[serde(default = "OverlayConfig::default_margin")]
    pub virtualization_margin: f64,
    #[serde(default)]
    pub underline_style: UnderlineStyle,
    #[serde(default)]
    pub autofix_on_double_click: bool,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            virtualization_margin: Self::default_margin(),
            underline_style: UnderlineStyle::default(),
            autofix_on_double_click: false,
        }
    }
}

impl OverlayConfig {
    const fn default_margin() -> f64 {
        DEFAULT_VIRTUALIZATION_MARGIN
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HistoryConfig {
    #[serde(default = "HistoryConfig::default_max_entries")]
    pub max_entries: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_entries: Self::default_max_entries(),
        }
    }
}

impl HistoryConfig {
    const fn default_max_entries() -> usize {
        DEFAULT_HISTORY_MAX
    }
}

/// Underline colour per correction kind (`#rrggbb`).
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default, rename_all = "kebab-case")]
pub struct Palette {
    pub spelling: String,
    pub grammar: String,
    pub punctuation: String,
    pub capitalization: String,
    pub preposition: String,
    pub missing_words: String,
    pub style: String,
    pub other: String,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            spelling: "#e53935".into(),
            grammar: "#1e88e5".into(),
            punctuation: "#8e24aa".into(),
            capitalization: "#fb8c00".into(),
            preposition: "#00897b".into(),
            missing_words: "#6d4c41".into(),
            style: "#43a047".into(),
            other: "#757575".into(),
        }
    }
}

impl Palette {
    pub fn color_for(&self, kind: CorrectionKind) -> &str {
        match kind {
            CorrectionKind::Spelling => &self.spelling,
            CorrectionKind::Grammar => &self.grammar,
            CorrectionKind::Punctuation => &self.punctuation,
            CorrectionKind::Capitalization => &self.capitalization,
            CorrectionKind::Preposition => &self.preposition,
            CorrectionKind::MissingWords => &self.missing_words,
            CorrectionKind::Style => &self.style,
            CorrectionKind::Other => &self.other,
        }
    }

    fn slot_mut(&mut self, kind: CorrectionKind) -> &mut String {
        match kind {
            CorrectionKind::Spelling => &mut self.spelling,
            CorrectionKind::Grammar => &mut self.grammar,
            CorrectionKind::Punctuation => &mut self.punctuation,
            CorrectionKind::Capitalization => &mut self.capitalization,
            CorrectionKind::Preposition => &mut self.preposition,
            CorrectionKind::MissingWords => &mut self.missing_words,
            CorrectionKind::Style => &mut self.style,
            CorrectionKind::Other => &mut self.other,
        }
    }

    /// Replace malformed colours with the default; returns the kinds that were reset.
    pub fn sanitize(&mut self) -> Vec<CorrectionKind> {
        let defaults = Palette::default();
        let mut reset = Vec::new();
        for kind in CorrectionKind::ALL {
            if !is_hex_color(self.color_for(kind)) {
                *self.slot_mut(kind) = defaults.color_for(kind).to_string();
                reset.push(kind);
            }
        }
        reset
    }
}

fn is_hex_color(s: &str) -> bool {
    s.len() == 7 && s.starts_with('#') && s[1..].chars().all(|c| c.is_ascii_hexdigit())
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ConfigFile {
    #[serde(default)]
    pub proofread: ProofreadConfig,
    #[serde(default)]
    pub overlay: OverlayConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub palette: Palette,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub raw: Option<String>, // original file string (optional)
    pub file: ConfigFile,    // parsed (or default) data
}

/// Config path: `./proofmark.toml`, then the platform config dir.
pub fn discover() -> PathBuf {
    let local = PathBuf::from("proofmark.toml");
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("proofmark").join("proofmark.toml");
    }
    PathBuf::from("proofmark.toml")
}

pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    let Ok(content) = fs::read_to_string(&path) else {
        return Ok(Config::default());
    };
    match toml::from_str::<ConfigFile>(&content) {
        Ok(file) => {
            let mut cfg = Config {
                raw: Some(content),
                file,
            };
            cfg.apply_limits();
            Ok(cfg)
        }
        Err(e) => {
            warn!(target: "config", path = %path.display(), error = %e, "config_parse_failed");
            Ok(Config::default())
        }
    }
}

impl Config {
    /// Clamp out-of-range values in place. Returns true if anything changed.
    pub fn apply_limits(&mut self) -> bool {
        let mut changed = false;
        let debounce = self.file.proofread.debounce_ms;
        if debounce > DEBOUNCE_MS_MAX {
            self.file.proofread.debounce_ms = DEBOUNCE_MS_MAX;
            info!(target: "config", raw = debounce, clamped = DEBOUNCE_MS_MAX, "debounce_ms_clamped");
            changed = true;
        }
        let max_entries = self.file.history.max_entries;
        if max_entries == 0 {
            self.file.history.max_entries = 1;
            info!(target: "config", raw = max_entries, clamped = 1, "history_max_entries_clamped");
            changed = true;
        }
        let margin = self.file.overlay.virtualization_margin;
        if !margin.is_finite() || margin < 0.0 {
            self.file.overlay.virtualization_margin = 0.0;
            info!(target: "config", raw = margin, clamped = 0.0, "virtualization_margin_clamped");
            changed = true;
        }
        for kind in self.file.palette.sanitize() {
            warn!(target: "config", kind = kind.as_str(), "palette_color_invalid");
            changed = true;
        }
        changed
    }

    pub fn debounce(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.file.proofread.debounce_ms)
    }
}
