use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdversityError {
    /// The sampling distribution could not be normalized into valid
    /// probabilities (all candidate mass floored to zero, or non-finite
    /// inputs).  Fatal for the agent-step; the caller falls back to the
    /// naturalistic action.
    #[error("degenerate sampling distribution: {0}")]
    Degenerate(String),

    /// A probability invariant deviated in a way renormalization cannot fix
    /// (non-positive or non-finite total mass).
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("challenge table error: {0}")]
    Table(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type AdversityResult<T> = Result<T, AdversityError>;
