//! `nade-engine` — the seam between the orchestration core and the external
//! microscopic traffic engine.
//!
//! # Crate layout
//!
//! | Module       | Contents                                                      |
//! |--------------|---------------------------------------------------------------|
//! | [`protocol`] | `StepControl` trait (the synchronous step-control protocol)   |
//! | [`adapter`]  | `SyncAdapter` (bounded retry), `WorldSnapshot` (per-step state)|
//! | [`memory`]   | `MemoryEngine` — in-process straight-segment reference engine |
//! | [`error`]    | `EngineError`, `EngineResult<T>`                              |
//!
//! # Design notes
//!
//! The core never talks to an engine directly: every exchange goes through
//! [`SyncAdapter`], which performs exactly one pull (entries, exits,
//! collisions, all live states) and one push/advance per simulated step.
//! Transient connector failures are retried up to the configured attempt
//! count; deterministic engine faults are surfaced immediately — retrying a
//! malformed-network error cannot help.

pub mod adapter;
pub mod error;
pub mod memory;
pub mod protocol;

#[cfg(test)]
mod tests;

pub use adapter::{SyncAdapter, WorldSnapshot};
pub use error::{EngineError, EngineResult};
pub use memory::{FlakyEngine, MemoryEngine};
pub use protocol::{EngineControl, StateField, StepControl};
