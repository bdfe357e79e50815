//! Synchronization adapter: bounded retry plus the per-step world snapshot.
//!
//! `SyncAdapter` is the only component that touches the engine.  It pulls
//! one consistent [`WorldSnapshot`] per step (population delta, collisions,
//! every live agent's state) before any agent runs, and pushes controls /
//! advances afterwards — one logical round trip per simulated step.

use nade_core::{AgentId, AgentKind, Step, TrafficLightState, VehicleState};
use rstar::{PointDistance, RTree, RTreeObject, AABB};
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::protocol::{EngineControl, StateField, StepControl};
use crate::{EngineError, EngineResult};

// ── Spatial index entry ───────────────────────────────────────────────────────

/// One vehicle position in the per-step R-tree.
#[derive(Clone, Debug)]
struct VehicleEntry {
    agent: AgentId,
    point: [f64; 2],
}

impl RTreeObject for VehicleEntry {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for VehicleEntry {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.point[0] - point[0];
        let dy = self.point[1] - point[1];
        dx * dx + dy * dy
    }
}

// ── WorldSnapshot ─────────────────────────────────────────────────────────────

/// One consistent view of engine state, pulled once per step.
///
/// All sensor reads for a step go through the same snapshot, so no agent can
/// observe state torn by another agent's control push.  Snapshots are
/// rebuilt from scratch each step and never cached — an agent removed by a
/// collision simply has no entry in the next snapshot.
pub struct WorldSnapshot {
    /// The step this snapshot was pulled at.
    pub step: Step,
    /// Kinematic state of every live vehicle.
    pub states: FxHashMap<AgentId, VehicleState>,
    /// State of every live traffic light.
    pub light_states: FxHashMap<AgentId, TrafficLightState>,
    /// Agents that entered since the previous pull.
    pub entered: Vec<(AgentId, AgentKind)>,
    /// Agents that left since the previous pull (arrivals and collision
    /// removals alike).
    pub exited: Vec<AgentId>,
    /// Collision pairs detected during the engine's last advance.
    pub collisions: Vec<(AgentId, AgentId)>,
    /// R-tree over vehicle positions for interaction-radius queries.
    index: RTree<VehicleEntry>,
}

impl WorldSnapshot {
    /// Build a snapshot from raw pulled state.
    pub fn new(
        step: Step,
        states: FxHashMap<AgentId, VehicleState>,
        light_states: FxHashMap<AgentId, TrafficLightState>,
        entered: Vec<(AgentId, AgentKind)>,
        exited: Vec<AgentId>,
        collisions: Vec<(AgentId, AgentId)>,
    ) -> Self {
        let entries: Vec<VehicleEntry> = states
            .iter()
            .map(|(&agent, s)| VehicleEntry { agent, point: [s.position.0, s.position.1] })
            .collect();
        let index = RTree::bulk_load(entries);
        Self { step, states, light_states, entered, exited, collisions, index }
    }

    /// An empty snapshot (zero live agents) at `step`.
    pub fn empty(step: Step) -> Self {
        Self::new(step, FxHashMap::default(), FxHashMap::default(), vec![], vec![], vec![])
    }

    #[inline]
    pub fn vehicle(&self, agent: AgentId) -> Option<&VehicleState> {
        self.states.get(&agent)
    }

    /// All other vehicles within `radius_m` of `agent`, nearest first
    /// (distance ties broken by ascending id for determinism).
    pub fn neighbors_within(&self, agent: AgentId, radius_m: f64) -> Vec<(AgentId, VehicleState)> {
        let Some(ego) = self.states.get(&agent) else {
            return vec![];
        };
        let center = [ego.position.0, ego.position.1];
        let mut found: Vec<(f64, AgentId)> = self
            .index
            .locate_within_distance(center, radius_m * radius_m)
            .filter(|e| e.agent != agent)
            .map(|e| (e.distance_2(&center), e.agent))
            .collect();
        found.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        found
            .into_iter()
            .map(|(_, id)| (id, self.states[&id]))
            .collect()
    }

    /// Nearest vehicle ahead of `agent` in `ego.lane + lane_delta`.
    pub fn leader(&self, agent: AgentId, lane_delta: i32) -> Option<(AgentId, VehicleState)> {
        self.longitudinal_neighbor(agent, lane_delta, true)
    }

    /// Nearest vehicle behind `agent` in `ego.lane + lane_delta`.
    pub fn follower(&self, agent: AgentId, lane_delta: i32) -> Option<(AgentId, VehicleState)> {
        self.longitudinal_neighbor(agent, lane_delta, false)
    }

    fn longitudinal_neighbor(
        &self,
        agent: AgentId,
        lane_delta: i32,
        ahead: bool,
    ) -> Option<(AgentId, VehicleState)> {
        let ego = self.states.get(&agent)?;
        let lane = ego.lane_index + lane_delta;
        self.states
            .iter()
            .filter(|&(&id, s)| {
                id != agent
                    && s.lane_index == lane
                    && if ahead {
                        s.lane_position > ego.lane_position
                    } else {
                        s.lane_position < ego.lane_position
                    }
            })
            // Argmin over (longitudinal distance, id): deterministic even
            // though the map's iteration order is not.
            .min_by(|(ida, a), (idb, b)| {
                let da = (a.lane_position - ego.lane_position).abs();
                let db = (b.lane_position - ego.lane_position).abs();
                da.total_cmp(&db).then(ida.cmp(idb))
            })
            .map(|(&id, s)| (id, *s))
    }
}

// ── SyncAdapter ───────────────────────────────────────────────────────────────

/// Wraps a [`StepControl`] implementation with bounded retry and snapshot
/// assembly.
///
/// Retry policy: transient failures are re-attempted up to
/// `max_connect_attempts` total tries, then surfaced as
/// [`EngineError::RetriesExhausted`].  Fatal faults and unknown-agent errors
/// are surfaced immediately.
pub struct SyncAdapter<E: StepControl> {
    engine: E,
    max_attempts: u32,
    /// Kinds learned from entry reports; needed to know whether to pull a
    /// vehicle state or a light state for each live agent.
    kinds: FxHashMap<AgentId, AgentKind>,
}

impl<E: StepControl> SyncAdapter<E> {
    pub fn new(engine: E, max_attempts: u32) -> Self {
        Self {
            engine,
            max_attempts: max_attempts.max(1),
            kinds: FxHashMap::default(),
        }
    }

    /// Access the wrapped engine (tests and scenario setup).
    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    fn with_retry<T>(&mut self, mut call: impl FnMut(&mut E) -> EngineResult<T>) -> EngineResult<T> {
        let mut last = String::new();
        for attempt in 1..=self.max_attempts {
            match call(&mut self.engine) {
                Ok(v) => return Ok(v),
                Err(e) if e.is_transient() => {
                    warn!(attempt, max = self.max_attempts, error = %e, "transient engine failure");
                    last = e.to_string();
                }
                Err(e) => return Err(e),
            }
        }
        Err(EngineError::RetriesExhausted { attempts: self.max_attempts, last })
    }

    /// Pull one consistent snapshot: population delta, collisions, and every
    /// live agent's state.  Newly entered vehicles are subscribed to all
    /// state fields as part of the same exchange.
    pub fn pull_snapshot(&mut self, step: Step) -> EngineResult<WorldSnapshot> {
        let entered = self.with_retry(|e| e.entries())?;
        for &(agent, kind) in &entered {
            self.kinds.insert(agent, kind);
            if kind == AgentKind::Vehicle {
                self.with_retry(|e| e.subscribe(agent, &StateField::ALL))?;
            }
        }

        let exited = self.with_retry(|e| e.exits())?;
        for agent in &exited {
            self.kinds.remove(agent);
        }

        let collisions = self.with_retry(|e| e.collisions())?;
        let live = self.with_retry(|e| e.live_agents())?;

        let mut states = FxHashMap::default();
        let mut light_states = FxHashMap::default();
        for agent in live {
            match self.kinds.get(&agent).copied() {
                Some(AgentKind::TrafficLight) => {
                    light_states.insert(agent, self.with_retry(|e| e.get_light_state(agent))?);
                }
                // Unreported kinds default to vehicle: engines that predate
                // entry-kind reporting only manage vehicles.
                _ => {
                    states.insert(agent, self.with_retry(|e| e.get_state(agent))?);
                }
            }
        }

        debug!(
            %step,
            vehicles = states.len(),
            lights = light_states.len(),
            entered = entered.len(),
            exited = exited.len(),
            "pulled snapshot"
        );
        Ok(WorldSnapshot::new(step, states, light_states, entered, exited, collisions))
    }

    /// Push one control side effect for `agent`.
    pub fn push_control(&mut self, agent: AgentId, control: &EngineControl) -> EngineResult<()> {
        self.with_retry(|e| e.set_control(agent, control))
    }

    /// Advance engine time by one step.
    pub fn advance(&mut self, step_length_secs: f64) -> EngineResult<()> {
        self.with_retry(|e| e.advance(step_length_secs))
    }
}
