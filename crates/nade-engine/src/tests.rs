//! Unit tests for nade-engine.

use nade_core::{AgentId, Step, VehicleState};

use crate::adapter::SyncAdapter;
use crate::memory::{FlakyEngine, MemoryEngine};
use crate::protocol::{EngineControl, StepControl};
use crate::EngineError;

fn vehicle(lane_position: f64, speed: f64, lane_index: i32) -> VehicleState {
    VehicleState {
        speed,
        lane_index,
        lane_position,
        ..VehicleState::default()
    }
}

#[cfg(test)]
mod memory_engine {
    use super::*;

    #[test]
    fn integrates_kinematics() {
        let mut engine = MemoryEngine::new(2);
        engine.add_vehicle(AgentId(0), vehicle(0.0, 10.0, 0));
        engine
            .set_control(AgentId(0), &EngineControl::SetAcceleration(2.0))
            .unwrap();
        engine.advance(0.1).unwrap();
        let s = engine.get_state(AgentId(0)).unwrap();
        assert!((s.speed - 10.2).abs() < 1e-9);
        assert!((s.lane_position - 1.02).abs() < 1e-9);
    }

    #[test]
    fn speed_never_negative() {
        let mut engine = MemoryEngine::new(1);
        engine.add_vehicle(AgentId(0), vehicle(0.0, 0.2, 0));
        engine
            .set_control(AgentId(0), &EngineControl::SetAcceleration(-4.0))
            .unwrap();
        engine.advance(0.1).unwrap();
        engine.advance(0.1).unwrap();
        assert_eq!(engine.get_state(AgentId(0)).unwrap().speed, 0.0);
    }

    #[test]
    fn lane_change_clamped_to_network() {
        let mut engine = MemoryEngine::new(2);
        engine.add_vehicle(AgentId(0), vehicle(0.0, 10.0, 1));
        engine
            .set_control(AgentId(0), &EngineControl::ChangeLane { target_lane: 5 })
            .unwrap();
        engine.advance(0.1).unwrap();
        assert_eq!(engine.get_state(AgentId(0)).unwrap().lane_index, 1);
    }

    #[test]
    fn collision_removes_both_vehicles() {
        let mut engine = MemoryEngine::new(1);
        // Fast follower 4 m behind a stopped lead closes the gap in one step.
        engine.add_vehicle(AgentId(0), vehicle(0.0, 50.0, 0));
        engine.add_vehicle(AgentId(1), vehicle(9.0, 0.0, 0));
        engine.entries().unwrap();
        engine.advance(0.1).unwrap();
        assert_eq!(engine.collisions().unwrap(), vec![(AgentId(0), AgentId(1))]);
        let exits = engine.exits().unwrap();
        assert!(exits.contains(&AgentId(0)) && exits.contains(&AgentId(1)));
        assert!(engine.live_agents().unwrap().is_empty());
    }

    #[test]
    fn scheduled_entries_and_exits() {
        let mut engine = MemoryEngine::new(1);
        engine.schedule_entry(2, AgentId(7), vehicle(0.0, 5.0, 0));
        engine.advance(0.1).unwrap();
        assert!(engine.entries().unwrap().is_empty());
        engine.advance(0.1).unwrap();
        assert_eq!(engine.entries().unwrap().len(), 1);

        engine.schedule_exit(4, AgentId(7));
        engine.advance(0.1).unwrap();
        engine.advance(0.1).unwrap();
        assert_eq!(engine.exits().unwrap(), vec![AgentId(7)]);
    }

    #[test]
    fn unknown_agent_errors() {
        let engine = MemoryEngine::new(1);
        assert!(matches!(
            engine.get_state(AgentId(9)),
            Err(EngineError::AgentNotFound(_))
        ));
    }
}

#[cfg(test)]
mod adapter {
    use super::*;

    fn seeded_engine() -> MemoryEngine {
        let mut engine = MemoryEngine::new(2);
        engine.add_vehicle(AgentId(0), vehicle(0.0, 10.0, 0));
        engine.add_vehicle(AgentId(1), vehicle(40.0, 8.0, 0));
        engine.add_vehicle(AgentId(2), vehicle(35.0, 9.0, 1));
        engine
    }

    #[test]
    fn snapshot_contains_population_and_states() {
        let mut adapter = SyncAdapter::new(seeded_engine(), 3);
        let snap = adapter.pull_snapshot(Step(0)).unwrap();
        assert_eq!(snap.entered.len(), 3);
        assert_eq!(snap.states.len(), 3);
        assert!(snap.exited.is_empty());
        assert!(snap.collisions.is_empty());
    }

    #[test]
    fn neighbors_sorted_nearest_first() {
        let mut adapter = SyncAdapter::new(seeded_engine(), 3);
        let snap = adapter.pull_snapshot(Step(0)).unwrap();
        let neighbors = snap.neighbors_within(AgentId(1), 100.0);
        assert_eq!(neighbors.len(), 2);
        assert_eq!(neighbors[0].0, AgentId(2)); // ~6 m away vs 40 m
        assert_eq!(neighbors[1].0, AgentId(0));
    }

    #[test]
    fn radius_excludes_distant_vehicles() {
        let mut adapter = SyncAdapter::new(seeded_engine(), 3);
        let snap = adapter.pull_snapshot(Step(0)).unwrap();
        let neighbors = snap.neighbors_within(AgentId(0), 20.0);
        assert!(neighbors.is_empty());
    }

    #[test]
    fn leader_and_follower_queries() {
        let mut adapter = SyncAdapter::new(seeded_engine(), 3);
        let snap = adapter.pull_snapshot(Step(0)).unwrap();
        assert_eq!(snap.leader(AgentId(0), 0).map(|(id, _)| id), Some(AgentId(1)));
        assert_eq!(snap.leader(AgentId(0), 1).map(|(id, _)| id), Some(AgentId(2)));
        assert_eq!(snap.follower(AgentId(1), 0).map(|(id, _)| id), Some(AgentId(0)));
        assert!(snap.follower(AgentId(0), 0).is_none());
    }

    #[test]
    fn transient_failures_retried_within_budget() {
        let engine = FlakyEngine::new(seeded_engine(), 2, false);
        let mut adapter = SyncAdapter::new(engine, 5);
        assert!(adapter.pull_snapshot(Step(0)).is_ok());
    }

    #[test]
    fn transient_failures_exhaust_budget() {
        let engine = FlakyEngine::new(seeded_engine(), 10, false);
        let mut adapter = SyncAdapter::new(engine, 3);
        assert!(matches!(
            adapter.pull_snapshot(Step(0)),
            Err(EngineError::RetriesExhausted { attempts: 3, .. })
        ));
    }

    #[test]
    fn fatal_failure_never_retried() {
        let engine = FlakyEngine::new(seeded_engine(), 1, true);
        let mut adapter = SyncAdapter::new(engine, 5);
        assert!(matches!(
            adapter.pull_snapshot(Step(0)),
            Err(EngineError::Fatal(_))
        ));
        // The single injected fault was consumed by the first call — a
        // retrying adapter would have burned through it and succeeded.
    }

    #[test]
    fn empty_snapshot_for_empty_engine() {
        let mut adapter = SyncAdapter::new(MemoryEngine::new(1), 3);
        let snap = adapter.pull_snapshot(Step(0)).unwrap();
        assert!(snap.states.is_empty());
        assert!(snap.neighbors_within(AgentId(0), 50.0).is_empty());
    }
}
