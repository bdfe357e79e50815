//! Timed traffic-light phase cycling.

use nade_core::AgentRng;

use crate::decision::{ControlCommand, DecisionError, DecisionInfo, DecisionModel};
use crate::Observation;
use nade_core::Maneuver;

/// Cycles through a fixed phase program on a step timer.
///
/// Emits `SetPhase` only on the step where the phase actually changes, so
/// an unchanged light pushes nothing to the engine.
pub struct FixedPhaseModel {
    /// Phase strings in cycle order, e.g. `["GGrr", "yyrr", "rrGG", "rryy"]`.
    pub phases: Vec<String>,
    /// Steps each phase is held for.
    pub steps_per_phase: u64,
}

impl FixedPhaseModel {
    pub fn new(phases: Vec<String>, steps_per_phase: u64) -> Self {
        Self { phases, steps_per_phase: steps_per_phase.max(1) }
    }

    fn phase_at(&self, step: u64) -> &str {
        let idx = (step / self.steps_per_phase) as usize % self.phases.len();
        &self.phases[idx]
    }
}

impl DecisionModel for FixedPhaseModel {
    fn decide(
        &self,
        obs: &Observation,
        _rng: &mut AgentRng,
    ) -> Result<(ControlCommand, DecisionInfo), DecisionError> {
        if self.phases.is_empty() {
            return Err(DecisionError("phase program is empty".into()));
        }
        let wanted = self.phase_at(obs.step.0);
        let current = obs.light.as_ref().map(|l| l.phase.as_str());
        let cmd = if current == Some(wanted) {
            ControlCommand::Noop
        } else {
            ControlCommand::SetPhase(wanted.to_string())
        };
        Ok((cmd, DecisionInfo::naturalistic(Maneuver::Maintain)))
    }
}
