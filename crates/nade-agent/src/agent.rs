//! The `Agent` composition and its construction factories.

use nade_core::{AgentId, AgentKind};

use crate::controller::{Controller, MoveController, PhaseController};
use crate::decision::DecisionModel;
use crate::idm::IdmModel;
use crate::sensor::{LightSensor, LocalSensor, Sensor};
use crate::traffic_light::FixedPhaseModel;

/// One live agent: a fixed composition of one sensor, one decision model,
/// and one controller.
///
/// The triad is assigned at creation and immutable thereafter; behavioural
/// variation comes from composing different concrete instances, never from
/// mutating an existing agent.
pub struct Agent {
    pub id: AgentId,
    pub kind: AgentKind,
    pub sensor: Box<dyn Sensor>,
    pub model: Box<dyn DecisionModel>,
    pub controller: Box<dyn Controller>,
}

impl Agent {
    pub fn new(
        id: AgentId,
        kind: AgentKind,
        sensor: Box<dyn Sensor>,
        model: Box<dyn DecisionModel>,
        controller: Box<dyn Controller>,
    ) -> Self {
        Self { id, kind, sensor, model, controller }
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Constructs agents as the engine reports their entry.
///
/// The environment owns exactly one factory; per-kind composition decisions
/// live here and nowhere else.
pub trait AgentFactory: Send + Sync {
    fn create(&self, id: AgentId, kind: AgentKind) -> Agent;
}

// ── Default factories ─────────────────────────────────────────────────────────

/// Local sensor + naturalistic IDM model + move controller.
pub struct DefaultVehicleFactory {
    /// Sensor observation range in metres.
    pub sensor_range_m: f64,
    /// Enable MOBIL lane changes in the naturalistic model.
    pub lane_change: bool,
}

impl Default for DefaultVehicleFactory {
    fn default() -> Self {
        Self { sensor_range_m: 120.0, lane_change: true }
    }
}

impl AgentFactory for DefaultVehicleFactory {
    fn create(&self, id: AgentId, kind: AgentKind) -> Agent {
        match kind {
            AgentKind::Vehicle => Agent::new(
                id,
                kind,
                Box::new(LocalSensor::new(self.sensor_range_m)),
                Box::new(IdmModel { lane_change: self.lane_change, stochastic: false }),
                Box::new(MoveController),
            ),
            AgentKind::TrafficLight => DefaultTrafficLightFactory::default().create(id, kind),
        }
    }
}

/// Light sensor + fixed phase program + phase controller.
pub struct DefaultTrafficLightFactory {
    pub phases: Vec<String>,
    pub steps_per_phase: u64,
}

impl Default for DefaultTrafficLightFactory {
    fn default() -> Self {
        Self {
            phases: vec!["GGrr".into(), "yyrr".into(), "rrGG".into(), "rryy".into()],
            steps_per_phase: 300,
        }
    }
}

impl AgentFactory for DefaultTrafficLightFactory {
    fn create(&self, id: AgentId, kind: AgentKind) -> Agent {
        Agent::new(
            id,
            kind,
            Box::new(LightSensor),
            Box::new(FixedPhaseModel::new(self.phases.clone(), self.steps_per_phase)),
            Box::new(PhaseController),
        )
    }
}
