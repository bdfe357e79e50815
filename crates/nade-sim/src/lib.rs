//! `nade-sim` — the run-level scheduler.
//!
//! Drives the whole stack through a fixed phase sequence each step: pull one
//! world snapshot, run the environment's decision round, advance the engine,
//! record the step, evaluate termination.  Exactly one engine round trip per
//! step, which is what keeps seeded runs replayable against a recorded
//! engine sequence.
//!
//! | Module         | Contents                                            |
//! |----------------|-----------------------------------------------------|
//! | [`scheduler`]  | `Scheduler`, `StopHandle`                           |
//! | [`trajectory`] | `Trajectory`, `StepRecord`                          |
//! | [`extractor`]  | `InfoExtractor`, `TerminationReport`, `NoopExtractor` |
//! | [`error`]      | `SimError`, `SimResult<T>`                          |

pub mod error;
pub mod extractor;
pub mod scheduler;
pub mod trajectory;


pub use error::{SimError, SimResult};
pub use extractor::{InfoExtractor, NoopExtractor, TerminationReason, TerminationReport};
pub use scheduler::{Scheduler, StopHandle};
pub use trajectory::{StepRecord, Trajectory};
