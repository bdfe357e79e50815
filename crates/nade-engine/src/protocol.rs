//! The step-control protocol — the trait an external engine binding must
//! implement.
//!
//! The protocol is synchronous request/response: the scheduler performs one
//! pull of engine state, pushes per-agent side effects, and advances engine
//! time by one configured step.  Entry/exit reporting is cumulative since
//! the previous call, so the adapter sees every population change exactly
//! once even if the engine inserted and removed agents mid-step.

use nade_core::{AgentId, AgentKind, TrafficLightState, VehicleState};

use crate::EngineResult;

/// Per-agent state fields a caller can subscribe to.
///
/// Subscription is an optimization hint: engines that support it push only
/// the subscribed fields each step; engines that don't may ignore it and
/// return full states.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum StateField {
    Position,
    Speed,
    Acceleration,
    Heading,
    Lane,
}

impl StateField {
    /// Every field — the default subscription for newly entered vehicles.
    pub const ALL: [StateField; 5] = [
        StateField::Position,
        StateField::Speed,
        StateField::Acceleration,
        StateField::Heading,
        StateField::Lane,
    ];
}

/// A side effect pushed to the engine for one agent.
///
/// This is the low-level vocabulary of the protocol; maneuver-level commands
/// are translated into these by agent controllers.
#[derive(Clone, Debug, PartialEq)]
pub enum EngineControl {
    /// Fix the agent's longitudinal acceleration for the next step, m/s².
    SetAcceleration(f64),
    /// Move the agent to `target_lane` within the next action step.
    ChangeLane { target_lane: i32 },
    /// Set a traffic light's full phase string.
    SetPhase(String),
}

/// The synchronous step-control protocol against the external engine.
///
/// One implementation per engine binding.  All methods are fallible; see
/// [`EngineError`](crate::EngineError) for the transient/fatal distinction
/// the adapter's retry policy relies on.
pub trait StepControl {
    /// Subscribe to `fields` for `agent`.  Called once when the agent enters.
    fn subscribe(&mut self, agent: AgentId, fields: &[StateField]) -> EngineResult<()>;

    /// Current kinematic state of a vehicle agent.
    fn get_state(&self, agent: AgentId) -> EngineResult<VehicleState>;

    /// Current state of a traffic-light agent.
    fn get_light_state(&self, agent: AgentId) -> EngineResult<TrafficLightState>;

    /// Push one control side effect for `agent`, applied on the next advance.
    fn set_control(&mut self, agent: AgentId, control: &EngineControl) -> EngineResult<()>;

    /// Advance engine time by `step_length_secs`.
    fn advance(&mut self, step_length_secs: f64) -> EngineResult<()>;

    /// Agents that entered the network since the previous call.  Draining.
    fn entries(&mut self) -> EngineResult<Vec<(AgentId, AgentKind)>>;

    /// Agents that left the network since the previous call (arrivals and
    /// collision removals alike).  Draining.
    fn exits(&mut self) -> EngineResult<Vec<AgentId>>;

    /// Collision pairs detected during the most recent advance.
    fn collisions(&self) -> EngineResult<Vec<(AgentId, AgentId)>>;

    /// Every agent currently present in the engine.
    fn live_agents(&self) -> EngineResult<Vec<AgentId>>;
}
