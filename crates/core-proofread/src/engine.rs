//! Correction engine seam.
//!
//! The engine is owned by the caller and handed to the controller as an
//! `Rc<E>`; nothing in this crate holds a process-wide instance.
//!
//! Contract: `run` receives the complete surface text and returns
//! corrections with offsets (UTF-16 code units) into that same text. When a
//! selection is present in the context the engine should only report
//! corrections starting inside it; the controller merges them into the
//! existing set.

use std::future::Future;

use core_text::{Correction, Utf16Range};

use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineContext {
    pub execution_id: u64,
    pub selection: Option<Utf16Range>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EngineOutput {
    pub corrected_text: String,
    pub corrections: Vec<Correction>,
}

pub trait CorrectionEngine {
    fn run(
        &self,
        text: String,
        context: EngineContext,
    ) -> impl Future<Output = Result<EngineOutput, EngineError>>;
}
