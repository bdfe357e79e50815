//! Controllers: translate maneuver-level commands into engine side effects.

use nade_core::AgentId;
use nade_core::Maneuver;
use nade_engine::EngineControl;
use tracing::warn;

use crate::{ControlCommand, Observation};

/// Applies one agent's command by producing the engine-level side effects
/// for the adapter to push.
///
/// `is_command_legal` is checked first; an illegal command is skipped with a
/// warning rather than applied, mirroring how malformed control requests
/// must not reach the engine.
pub trait Controller: Send + Sync {
    /// Can this controller express `cmd` for this agent kind?
    fn is_command_legal(&self, _agent: AgentId, _cmd: &ControlCommand) -> bool {
        true
    }

    /// Translate `cmd` into zero or more engine side effects.
    fn apply(&self, agent: AgentId, cmd: &ControlCommand, obs: &Observation) -> Vec<EngineControl>;

    /// Legality-checked application; the environment calls this.
    fn checked_apply(
        &self,
        agent: AgentId,
        cmd: &ControlCommand,
        obs: &Observation,
    ) -> Vec<EngineControl> {
        if self.is_command_legal(agent, cmd) {
            self.apply(agent, cmd, obs)
        } else {
            warn!(%agent, ?cmd, "skipping illegal control command");
            vec![]
        }
    }
}

// ── MoveController ────────────────────────────────────────────────────────────

/// Vehicle controller: maneuvers and acceleration setpoints.
pub struct MoveController;

impl Controller for MoveController {
    fn is_command_legal(&self, _agent: AgentId, cmd: &ControlCommand) -> bool {
        !matches!(cmd, ControlCommand::SetPhase(_))
    }

    fn apply(&self, _agent: AgentId, cmd: &ControlCommand, obs: &Observation) -> Vec<EngineControl> {
        match cmd {
            ControlCommand::Maneuver(Maneuver::Maintain) | ControlCommand::Noop => vec![],
            ControlCommand::Maneuver(Maneuver::Brake { decel }) => {
                vec![EngineControl::SetAcceleration(-decel)]
            }
            ControlCommand::Maneuver(Maneuver::Accelerate { accel }) => {
                vec![EngineControl::SetAcceleration(*accel)]
            }
            ControlCommand::Maneuver(Maneuver::CutIn { direction }) => {
                vec![EngineControl::ChangeLane {
                    target_lane: obs.ego.lane_index + direction.lane_delta(),
                }]
            }
            ControlCommand::SetAcceleration(a) => vec![EngineControl::SetAcceleration(*a)],
            ControlCommand::SetPhase(_) => vec![],
        }
    }
}

// ── PhaseController ───────────────────────────────────────────────────────────

/// Traffic-light controller: phase changes only.
pub struct PhaseController;

impl Controller for PhaseController {
    fn is_command_legal(&self, _agent: AgentId, cmd: &ControlCommand) -> bool {
        matches!(cmd, ControlCommand::SetPhase(_) | ControlCommand::Noop)
    }

    fn apply(&self, _agent: AgentId, cmd: &ControlCommand, _obs: &Observation) -> Vec<EngineControl> {
        match cmd {
            ControlCommand::SetPhase(phase) => vec![EngineControl::SetPhase(phase.clone())],
            _ => vec![],
        }
    }
}
