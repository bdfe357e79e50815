//! `nade-env` — the multi-agent environment.
//!
//! Owns the agent registry and runs the per-step decision loop: population
//! delta from the engine snapshot, then observe → decide → apply for every
//! live agent in ascending id order.  The adversity pipeline hooks into the
//! decide phase for vehicles; termination predicates close the loop.
//!
//! | Module          | Contents                                          |
//! |-----------------|---------------------------------------------------|
//! | [`environment`] | `Environment`, `AdversityPipeline`, `StepOutcome` |
//! | [`termination`] | `TerminationPredicate` and the built-in stoppers  |
//! | [`error`]       | `EnvError`, `EnvResult<T>`                        |

pub mod environment;
pub mod error;
pub mod termination;

#[cfg(test)]
mod tests;

pub use environment::{
    AdversityPipeline, AgentAction, AgentFault, Environment, StepOutcome,
};
pub use error::{EnvError, EnvResult};
pub use termination::{
    CollisionStop, ExternalStop, Horizon, StopCause, TerminationPredicate,
};
