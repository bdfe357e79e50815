//! `nade-adversity` — the adversarial decision engine.
//!
//! This crate turns a naturalistic driving environment into a naturalistic
//! *adversarial* one: background vehicles near the vehicle under test are
//! occasionally steered into rare, high-challenge maneuvers, and every such
//! substitution is priced by its likelihood ratio so rare-event statistics
//! remain unbiased.
//!
//! # Crate layout
//!
//! | Module          | Contents                                                    |
//! |-----------------|-------------------------------------------------------------|
//! | [`scenario`]    | exhaustive relative-configuration classes + tie-break       |
//! | [`challenge`]   | offline challenge tables (car-following, lane-change)       |
//! | [`criticality`] | `ManeuverDistribution`, `CriticalityEstimator`              |
//! | [`sampler`]     | `AdversarialSelector` — the importance-sampling state machine |
//! | [`weight`]      | `TrajectoryWeight` — log-space likelihood-ratio accumulator |
//! | [`error`]       | `AdversityError`, `AdversityResult<T>`                      |
//!
//! # Why oversample at all?
//!
//! Under purely naturalistic sampling a crash-level maneuver may occur once
//! in 10⁶ steps.  The selector draws such maneuvers with probability
//! proportional to their criticality instead, and records
//! `weight = natural / sampling` for each draw.  The weighted estimator
//! `E[weight × 1(event)]` then equals the naturalistic event frequency while
//! the event itself is observed orders of magnitude more often.

pub mod challenge;
pub mod criticality;
pub mod error;
pub mod sampler;
pub mod scenario;
pub mod weight;

#[cfg(test)]
mod tests;

pub use challenge::{ChallengeTable, ChallengeTables};
pub use criticality::{CriticalityEstimator, CriticalityRecord, ManeuverDistribution, ProbabilityPredictor};
pub use error::{AdversityError, AdversityResult};
pub use sampler::{AdversarialSelector, SampledAction, Selection, SelectorPhase};
pub use scenario::{classify, ScenarioClass};
pub use weight::TrajectoryWeight;
