use nade_core::AgentId;
use thiserror::Error;

/// Errors surfaced by the step-control protocol and the adapter.
///
/// The transient/fatal split drives the retry policy: `Transient` failures
/// (connector hiccups, engine busy) are retried up to the configured attempt
/// count, `Fatal` failures (malformed network, protocol violation) never are.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("transient connector failure: {0}")]
    Transient(String),

    #[error("fatal engine fault: {0}")]
    Fatal(String),

    #[error("agent {0} not known to the engine")]
    AgentNotFound(AgentId),

    #[error("retries exhausted after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },
}

impl EngineError {
    /// `true` for failures the adapter is allowed to retry.
    #[inline]
    pub fn is_transient(&self) -> bool {
        matches!(self, EngineError::Transient(_))
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
