//! Framework error type.
//!
//! Sub-crates define their own error enums and convert them upward via
//! `From` impls where it keeps error sites clean; `CoreError` covers the
//! concerns that belong to this crate (configuration and the probability
//! invariants shared by the adversity machinery).

use thiserror::Error;

/// The top-level error type for `nade-core` and a common base for sub-crates.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    Config(String),

    /// A probability-sum or positivity invariant deviated beyond tolerance
    /// in a way that cannot be corrected by renormalization.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shorthand result type for all `nade-*` crates.
pub type CoreResult<T> = Result<T, CoreError>;
