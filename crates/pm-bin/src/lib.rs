//! proofmark: headless driver for the proofreading overlay engine.
//!
//! `rules` is a small offline correction engine; `app` runs one document
//! through surface, session and controller and reports what a host would see.

pub mod app;
pub mod rules;

pub use app::{Report, RunRequest, run_document};
pub use rules::{Rule, RuleEngine, RuleSet};
