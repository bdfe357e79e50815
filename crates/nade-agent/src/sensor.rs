//! Sensors: per-agent views of the shared world snapshot.
//!
//! An [`Observation`] is ephemeral — produced fresh each step from the
//! snapshot and dropped when the step's decision is made.  Sensors never
//! cache across steps, which is what makes a collision-removed partner
//! impossible to observe afterwards: it simply is not in the next snapshot.

use nade_core::{AgentId, Step, TrafficLightState, VehicleState};
use nade_engine::WorldSnapshot;

/// The six-neighbour local view around an ego vehicle, plus everything in
/// the interaction radius.
#[derive(Clone, Debug, Default)]
pub struct Observation {
    /// Step this observation was taken at.
    pub step: Step,
    /// The observing agent.
    pub agent: AgentId,
    /// Ego kinematics.  Default for traffic lights.
    pub ego: VehicleState,
    pub leader: Option<(AgentId, VehicleState)>,
    pub follower: Option<(AgentId, VehicleState)>,
    pub left_leader: Option<(AgentId, VehicleState)>,
    pub left_follower: Option<(AgentId, VehicleState)>,
    pub right_leader: Option<(AgentId, VehicleState)>,
    pub right_follower: Option<(AgentId, VehicleState)>,
    /// All vehicles within the sensor range, nearest first.
    pub neighbors: Vec<(AgentId, VehicleState)>,
    /// Own state, for traffic-light agents.
    pub light: Option<TrafficLightState>,
}

impl Observation {
    /// Look up a neighbour's state by id, if it was in range this step.
    pub fn neighbor(&self, id: AgentId) -> Option<&VehicleState> {
        self.neighbors.iter().find(|(n, _)| *n == id).map(|(_, s)| s)
    }
}

/// Per-step view construction from the shared snapshot.
pub trait Sensor: Send + Sync {
    fn observe(&self, agent: AgentId, world: &WorldSnapshot) -> Observation;
}

// ── LocalSensor ───────────────────────────────────────────────────────────────

/// The standard vehicle sensor: ego state, the six directional neighbours,
/// and all vehicles within `range_m`.
pub struct LocalSensor {
    /// Observation range in metres.
    pub range_m: f64,
}

impl LocalSensor {
    pub fn new(range_m: f64) -> Self {
        Self { range_m }
    }
}

impl Sensor for LocalSensor {
    fn observe(&self, agent: AgentId, world: &WorldSnapshot) -> Observation {
        let ego = world.vehicle(agent).copied().unwrap_or_default();
        Observation {
            step: world.step,
            agent,
            ego,
            leader: world.leader(agent, 0),
            follower: world.follower(agent, 0),
            left_leader: world.leader(agent, 1),
            left_follower: world.follower(agent, 1),
            right_leader: world.leader(agent, -1),
            right_follower: world.follower(agent, -1),
            neighbors: world.neighbors_within(agent, self.range_m),
            light: None,
        }
    }
}

// ── LightSensor ───────────────────────────────────────────────────────────────

/// Traffic-light ego sensor: reads only the light's own phase state.
pub struct LightSensor;

impl Sensor for LightSensor {
    fn observe(&self, agent: AgentId, world: &WorldSnapshot) -> Observation {
        Observation {
            step: world.step,
            agent,
            light: world.light_states.get(&agent).cloned(),
            ..Observation::default()
        }
    }
}
