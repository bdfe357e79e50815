//! `OutputExtractor` — bridges `InfoExtractor` to the CSV writer.

use nade_core::{AgentId, RunConfig, Step, VehicleState};
use nade_engine::WorldSnapshot;
use nade_env::StepOutcome;
use nade_sim::{InfoExtractor, TerminationReport, Trajectory};
use rustc_hash::FxHashMap;

use crate::csv::CsvOutputWriter;
use crate::row::{CollisionRow, FcdRow, LaneChangeRow, TrajRow};
use crate::{OutputError, OutputResult};

/// An [`InfoExtractor`] that appends per-step rows to the configured CSV
/// files and writes the termination summary.
///
/// Write errors are stored internally because the extractor hooks have no
/// return value.  After the run, check with [`take_error`][Self::take_error].
pub struct OutputExtractor {
    writer:           CsvOutputWriter,
    step_length_secs: f64,
    /// `fcd.csv` includes only vehicles within this radius of the focal
    /// vehicle (the lowest live id); `fcd_all.csv` includes everyone.
    focal_radius_m:   f64,
    prev_lanes:       FxHashMap<AgentId, i32>,
    prev_states:      FxHashMap<AgentId, VehicleState>,
    last_error:       Option<OutputError>,
}

impl OutputExtractor {
    pub fn new(config: &RunConfig) -> OutputResult<Self> {
        let writer = CsvOutputWriter::new(&config.output_path, &config.output_kinds)?;
        Ok(Self {
            writer,
            step_length_secs: config.step_length_secs,
            focal_radius_m: config.adversity.interaction_radius_m,
            prev_lanes: FxHashMap::default(),
            prev_states: FxHashMap::default(),
            last_error: None,
        })
    }

    /// Take the stored write error (if any) after the run returns.
    pub fn take_error(&mut self) -> Option<OutputError> {
        self.last_error.take()
    }

    fn store_err(&mut self, result: OutputResult<()>) {
        if let Err(e) = result {
            if self.last_error.is_none() {
                self.last_error = Some(e);
            }
        }
    }

    fn fcd_row(step: u64, time_secs: f64, id: AgentId, s: &VehicleState) -> FcdRow {
        FcdRow {
            step,
            time_secs,
            agent_id: id.0,
            x: s.position.0,
            y: s.position.1,
            speed: s.speed,
            acceleration: s.acceleration,
            heading: s.heading_deg,
            lane_index: s.lane_index,
        }
    }
}

impl InfoExtractor for OutputExtractor {
    fn on_step(&mut self, step: Step, snapshot: &WorldSnapshot, outcome: &StepOutcome) {
        let time_secs = step.0 as f64 * self.step_length_secs;
        let mut ids: Vec<AgentId> = snapshot.states.keys().copied().collect();
        ids.sort();

        // Maneuver label and weight per acting agent this step.
        let decided: FxHashMap<AgentId, (&'static str, f64)> = outcome
            .actions
            .iter()
            .map(|a| (a.agent, (a.command.maneuver().as_str(), a.weight)))
            .collect();

        let all_rows: Vec<FcdRow> = ids
            .iter()
            .filter_map(|id| snapshot.states.get(id).map(|s| (id, s)))
            .map(|(id, s)| Self::fcd_row(step.0, time_secs, *id, s))
            .collect();
        let result = self.writer.write_fcd_all(&all_rows);
        self.store_err(result);

        if let Some(focal) = ids.first().and_then(|id| snapshot.states.get(id)).copied() {
            let near_rows: Vec<FcdRow> = all_rows
                .iter()
                .filter(|row| {
                    let dx = row.x - focal.position.0;
                    let dy = row.y - focal.position.1;
                    (dx * dx + dy * dy).sqrt() <= self.focal_radius_m
                })
                .copied()
                .collect();
            let result = self.writer.write_fcd(&near_rows);
            self.store_err(result);
        }

        let traj_rows: Vec<TrajRow> = outcome
            .actions
            .iter()
            .filter_map(|a| snapshot.states.get(&a.agent).map(|s| (a, s)))
            .map(|(a, s)| TrajRow {
                step: step.0,
                time_secs,
                agent_id: a.agent.0,
                lane_position: s.lane_position,
                lane_index: s.lane_index,
                speed: s.speed,
                acceleration: s.acceleration,
                maneuver: a.command.maneuver().as_str(),
                weight: a.weight,
            })
            .collect();
        let result = self.writer.write_traj(&traj_rows);
        self.store_err(result);

        let lc_rows: Vec<LaneChangeRow> = ids
            .iter()
            .filter_map(|id| {
                let lane = snapshot.states.get(id)?.lane_index;
                let prev = *self.prev_lanes.get(id)?;
                (prev != lane).then(|| LaneChangeRow {
                    step: step.0,
                    time_secs,
                    agent_id: id.0,
                    from_lane: prev,
                    to_lane: lane,
                    reason: decided.get(id).map_or("unknown", |&(label, _)| label),
                })
            })
            .collect();
        let result = self.writer.write_lane_changes(&lc_rows);
        self.store_err(result);

        // Colliding vehicles are already gone from this snapshot; report
        // them at their last observed state.
        let collision_rows: Vec<CollisionRow> = outcome
            .collisions
            .iter()
            .flat_map(|&(a, b)| [(a, b), (b, a)])
            .filter_map(|(agent, partner)| {
                let s = self.prev_states.get(&agent)?;
                Some(CollisionRow {
                    step: step.0,
                    time_secs,
                    agent_id: agent.0,
                    partner_id: partner.0,
                    lane_index: s.lane_index,
                    lane_position: s.lane_position,
                })
            })
            .collect();
        let result = self.writer.write_collisions(&collision_rows);
        self.store_err(result);

        self.prev_lanes = ids
            .iter()
            .filter_map(|id| snapshot.states.get(id).map(|s| (*id, s.lane_index)))
            .collect();
        self.prev_states = snapshot.states.clone();
    }

    fn on_termination(&mut self, report: &TerminationReport, _trajectory: &Trajectory) {
        let result = self.writer.finish(report);
        self.store_err(result);
    }
}
