//! In-process reference engine: a straight multi-lane road segment.
//!
//! `MemoryEngine` exists so the orchestration core can be exercised without
//! an external process: vehicles integrate simple longitudinal kinematics,
//! lane changes complete within one step, and a collision is declared when
//! the bumper-to-bumper gap of a same-lane pair goes non-positive.  Collided
//! vehicles are removed, mirroring how production engines report collision
//! removals through the exit list.

use std::collections::BTreeMap;

use nade_core::{AgentId, AgentKind, TrafficLightState, VehicleState};

use crate::protocol::{EngineControl, StateField, StepControl};
use crate::{EngineError, EngineResult};

const LANE_WIDTH_M: f64 = 3.2;

#[derive(Clone, Debug)]
struct VehicleSlot {
    state: VehicleState,
    /// Acceleration requested for the next advance; `None` means coast at
    /// the current acceleration.
    pending_accel: Option<f64>,
    pending_lane: Option<i32>,
}

/// A minimal engine over one straight segment with `lane_count` lanes.
///
/// Entries and exits can be scheduled ahead of time (by step number) so
/// tests can script population churn deterministically.
pub struct MemoryEngine {
    lane_count: i32,
    step: u64,
    vehicles: BTreeMap<AgentId, VehicleSlot>,
    lights: BTreeMap<AgentId, TrafficLightState>,
    scheduled_entries: BTreeMap<u64, Vec<(AgentId, VehicleState)>>,
    scheduled_exits: BTreeMap<u64, Vec<AgentId>>,
    pending_entries: Vec<(AgentId, AgentKind)>,
    pending_exits: Vec<AgentId>,
    last_collisions: Vec<(AgentId, AgentId)>,
}

impl MemoryEngine {
    pub fn new(lane_count: i32) -> Self {
        Self {
            lane_count: lane_count.max(1),
            step: 0,
            vehicles: BTreeMap::new(),
            lights: BTreeMap::new(),
            scheduled_entries: BTreeMap::new(),
            scheduled_exits: BTreeMap::new(),
            pending_entries: Vec::new(),
            pending_exits: Vec::new(),
            last_collisions: Vec::new(),
        }
    }

    /// Insert a vehicle immediately; it is reported in the next `entries()`.
    pub fn add_vehicle(&mut self, agent: AgentId, state: VehicleState) {
        let mut state = state;
        state.position = (state.lane_position, state.lane_index as f64 * LANE_WIDTH_M);
        self.vehicles.insert(
            agent,
            VehicleSlot { state, pending_accel: None, pending_lane: None },
        );
        self.pending_entries.push((agent, AgentKind::Vehicle));
    }

    /// Insert a traffic light immediately.
    pub fn add_traffic_light(&mut self, agent: AgentId, phase: &str) {
        self.lights.insert(agent, TrafficLightState { phase: phase.to_string() });
        self.pending_entries.push((agent, AgentKind::TrafficLight));
    }

    /// Script a vehicle entry at `step`.
    pub fn schedule_entry(&mut self, step: u64, agent: AgentId, state: VehicleState) {
        self.scheduled_entries.entry(step).or_default().push((agent, state));
    }

    /// Script a vehicle removal at `step` (e.g. route completion).
    pub fn schedule_exit(&mut self, step: u64, agent: AgentId) {
        self.scheduled_exits.entry(step).or_default().push(agent);
    }

    fn remove_vehicle(&mut self, agent: AgentId) {
        if self.vehicles.remove(&agent).is_some() {
            self.pending_exits.push(agent);
        }
    }

    fn detect_collisions(&mut self) {
        self.last_collisions.clear();
        let ids: Vec<AgentId> = self.vehicles.keys().copied().collect();
        let mut removed: Vec<AgentId> = Vec::new();
        for (i, &a) in ids.iter().enumerate() {
            for &b in &ids[i + 1..] {
                let (sa, sb) = (&self.vehicles[&a].state, &self.vehicles[&b].state);
                if sa.lane_index != sb.lane_index {
                    continue;
                }
                let gap = if sa.is_behind(sb) { sa.gap_to(sb) } else { sb.gap_to(sa) };
                if gap <= 0.0 {
                    self.last_collisions.push((a, b));
                    removed.push(a);
                    removed.push(b);
                }
            }
        }
        removed.sort();
        removed.dedup();
        for agent in removed {
            self.remove_vehicle(agent);
        }
    }
}

impl StepControl for MemoryEngine {
    fn subscribe(&mut self, agent: AgentId, _fields: &[StateField]) -> EngineResult<()> {
        if self.vehicles.contains_key(&agent) || self.lights.contains_key(&agent) {
            Ok(())
        } else {
            Err(EngineError::AgentNotFound(agent))
        }
    }

    fn get_state(&self, agent: AgentId) -> EngineResult<VehicleState> {
        self.vehicles
            .get(&agent)
            .map(|v| v.state)
            .ok_or(EngineError::AgentNotFound(agent))
    }

    fn get_light_state(&self, agent: AgentId) -> EngineResult<TrafficLightState> {
        self.lights
            .get(&agent)
            .cloned()
            .ok_or(EngineError::AgentNotFound(agent))
    }

    fn set_control(&mut self, agent: AgentId, control: &EngineControl) -> EngineResult<()> {
        match control {
            EngineControl::SetAcceleration(a) => {
                let slot = self
                    .vehicles
                    .get_mut(&agent)
                    .ok_or(EngineError::AgentNotFound(agent))?;
                slot.pending_accel = Some(*a);
            }
            EngineControl::ChangeLane { target_lane } => {
                let max_lane = self.lane_count - 1;
                let slot = self
                    .vehicles
                    .get_mut(&agent)
                    .ok_or(EngineError::AgentNotFound(agent))?;
                slot.pending_lane = Some((*target_lane).clamp(0, max_lane));
            }
            EngineControl::SetPhase(phase) => {
                let light = self
                    .lights
                    .get_mut(&agent)
                    .ok_or(EngineError::AgentNotFound(agent))?;
                light.phase = phase.clone();
            }
        }
        Ok(())
    }

    fn advance(&mut self, step_length_secs: f64) -> EngineResult<()> {
        let dt = step_length_secs;

        // Apply pending controls, then integrate.
        for slot in self.vehicles.values_mut() {
            if let Some(a) = slot.pending_accel.take() {
                slot.state.acceleration = a;
            }
            if let Some(lane) = slot.pending_lane.take() {
                slot.state.lane_index = lane;
                slot.state.lateral_offset = 0.0;
            }
            slot.state.speed = (slot.state.speed + slot.state.acceleration * dt).max(0.0);
            slot.state.lane_position += slot.state.speed * dt;
            slot.state.position =
                (slot.state.lane_position, slot.state.lane_index as f64 * LANE_WIDTH_M);
        }

        self.detect_collisions();
        self.step += 1;

        // Scheduled churn becomes visible at the new step.
        if let Some(exits) = self.scheduled_exits.remove(&self.step) {
            for agent in exits {
                self.remove_vehicle(agent);
            }
        }
        if let Some(entries) = self.scheduled_entries.remove(&self.step) {
            for (agent, state) in entries {
                self.add_vehicle(agent, state);
            }
        }
        Ok(())
    }

    fn entries(&mut self) -> EngineResult<Vec<(AgentId, AgentKind)>> {
        Ok(std::mem::take(&mut self.pending_entries))
    }

    fn exits(&mut self) -> EngineResult<Vec<AgentId>> {
        Ok(std::mem::take(&mut self.pending_exits))
    }

    fn collisions(&self) -> EngineResult<Vec<(AgentId, AgentId)>> {
        Ok(self.last_collisions.clone())
    }

    fn live_agents(&self) -> EngineResult<Vec<AgentId>> {
        let mut ids: Vec<AgentId> = self.vehicles.keys().copied().collect();
        ids.extend(self.lights.keys().copied());
        ids.sort();
        Ok(ids)
    }
}

// ── FlakyEngine ───────────────────────────────────────────────────────────────

/// Wraps another engine and fails a scripted number of calls — transiently
/// or fatally — before passing through.  Exercises the adapter's retry
/// policy.
pub struct FlakyEngine<E: StepControl> {
    inner: E,
    /// Remaining calls to fail.  Decremented on every protocol call.
    failures_left: u32,
    /// When `true`, injected failures are fatal instead of transient.
    fatal: bool,
}

impl<E: StepControl> FlakyEngine<E> {
    pub fn new(inner: E, failures: u32, fatal: bool) -> Self {
        Self { inner, failures_left: failures, fatal }
    }

    /// Re-arm the fault budget mid-test.
    pub fn arm(&mut self, failures: u32) {
        self.failures_left = failures;
    }

    fn maybe_fail(&mut self) -> EngineResult<()> {
        if self.failures_left == 0 {
            return Ok(());
        }
        self.failures_left -= 1;
        if self.fatal {
            Err(EngineError::Fatal("injected fault".into()))
        } else {
            Err(EngineError::Transient("injected hiccup".into()))
        }
    }
}

impl<E: StepControl> StepControl for FlakyEngine<E> {
    fn subscribe(&mut self, agent: AgentId, fields: &[StateField]) -> EngineResult<()> {
        self.maybe_fail()?;
        self.inner.subscribe(agent, fields)
    }

    fn get_state(&self, agent: AgentId) -> EngineResult<VehicleState> {
        self.inner.get_state(agent)
    }

    fn get_light_state(&self, agent: AgentId) -> EngineResult<TrafficLightState> {
        self.inner.get_light_state(agent)
    }

    fn set_control(&mut self, agent: AgentId, control: &EngineControl) -> EngineResult<()> {
        self.maybe_fail()?;
        self.inner.set_control(agent, control)
    }

    fn advance(&mut self, step_length_secs: f64) -> EngineResult<()> {
        self.maybe_fail()?;
        self.inner.advance(step_length_secs)
    }

    fn entries(&mut self) -> EngineResult<Vec<(AgentId, AgentKind)>> {
        self.maybe_fail()?;
        self.inner.entries()
    }

    fn exits(&mut self) -> EngineResult<Vec<AgentId>> {
        self.maybe_fail()?;
        self.inner.exits()
    }

    fn collisions(&self) -> EngineResult<Vec<(AgentId, AgentId)>> {
        self.inner.collisions()
    }

    fn live_agents(&self) -> EngineResult<Vec<AgentId>> {
        self.inner.live_agents()
    }
}
