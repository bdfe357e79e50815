//! The `DecisionModel` trait and its command/info vocabulary.

use nade_core::{AgentRng, Maneuver};
use thiserror::Error;

use crate::Observation;

/// A maneuver-level command produced by a decision model, consumed once by
/// the matching controller in the same step.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum ControlCommand {
    /// Perform a discrete maneuver (the adversarial selector emits these).
    Maneuver(Maneuver),
    /// Fix the longitudinal acceleration for the next action step, m/s².
    SetAcceleration(f64),
    /// Set a traffic light's phase string.
    SetPhase(String),
    /// Do nothing this step — the fallback for an isolated decision fault.
    #[default]
    Noop,
}

impl ControlCommand {
    /// The maneuver label this command corresponds to (for records/logs).
    pub fn maneuver(&self) -> Maneuver {
        match self {
            ControlCommand::Maneuver(m) => *m,
            ControlCommand::SetAcceleration(a) if *a < -0.5 => Maneuver::Brake { decel: -a },
            ControlCommand::SetAcceleration(a) if *a > 0.5 => Maneuver::Accelerate { accel: *a },
            _ => Maneuver::Maintain,
        }
    }
}

/// Whether a command came from the naturalistic model verbatim or from the
/// importance-sampling selector.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub enum DecisionMode {
    #[default]
    Naturalistic,
    Adversarial,
}

/// Auxiliary output of a decision: the likelihood-ratio ingredients the
/// scheduler folds into the trajectory weight.
#[derive(Clone, Debug)]
pub struct DecisionInfo {
    pub mode: DecisionMode,
    /// Naturalistic probability of the action actually taken.
    pub natural_prob: f64,
    /// Probability under the distribution it was actually drawn from.
    pub sampling_prob: f64,
    /// Maneuver label of the taken action.
    pub maneuver: Maneuver,
}

impl DecisionInfo {
    /// Info for an unmodified naturalistic decision: weight exactly 1.
    pub fn naturalistic(maneuver: Maneuver) -> Self {
        Self {
            mode: DecisionMode::Naturalistic,
            natural_prob: 1.0,
            sampling_prob: 1.0,
            maneuver,
        }
    }

    /// The per-step importance weight `natural / sampling`.
    #[inline]
    pub fn weight(&self) -> f64 {
        self.natural_prob / self.sampling_prob
    }
}

/// A decision computation failed for one agent.
///
/// Faults of this kind are isolated: the environment logs them, records them
/// for post-run inspection, and substitutes `ControlCommand::Noop` for the
/// step; other agents still process normally.
#[derive(Debug, Error)]
#[error("decision failed: {0}")]
pub struct DecisionError(pub String);

/// Pluggable per-step decision logic.
///
/// Implementations must be referentially transparent with respect to the
/// input [`Observation`] and the injected random stream: same observation,
/// same RNG state, same output.  Any per-agent state must live in the
/// observation, not in the model.
pub trait DecisionModel: Send + Sync {
    fn decide(
        &self,
        obs: &Observation,
        rng: &mut AgentRng,
    ) -> Result<(ControlCommand, DecisionInfo), DecisionError>;
}
