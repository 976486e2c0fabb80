use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProofreadError>;

/// Failure reported by a correction engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The run was cancelled; reported as a benign terminal state.
    #[error("engine run aborted")]
    Aborted,
    #[error("engine failed: {0}")]
    Failed(String),
}

impl EngineError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProofreadError {
    #[error(transparent)]
    Engine(#[from] EngineError),
}
