//! Unit tests for nade-env.

use nade_adversity::{
    AdversarialSelector, ChallengeTable, ChallengeTables, CriticalityEstimator, TrajectoryWeight,
};
use nade_agent::{
    Agent, AgentFactory, ControlCommand, DecisionError, DecisionInfo, DecisionMode,
    DecisionModel, IdmModel, LocalSensor, MoveController, Observation,
};
use nade_core::{AgentId, AgentKind, AgentRng, Maneuver, Step, TieBreakPolicy, VehicleState};
use nade_engine::{FlakyEngine, MemoryEngine, SyncAdapter};

use crate::environment::{AdversityPipeline, Environment};
use crate::error::EnvError;
use crate::termination::{
    CollisionStop, ExternalStop, Horizon, StopCause, TerminationPredicate,
};

fn vehicle(lane_position: f64, speed: f64, lane_index: i32) -> VehicleState {
    VehicleState {
        speed,
        lane_index,
        lane_position,
        ..VehicleState::default()
    }
}

struct BrakeModel;

impl DecisionModel for BrakeModel {
    fn decide(
        &self,
        _obs: &Observation,
        _rng: &mut AgentRng,
    ) -> Result<(ControlCommand, DecisionInfo), DecisionError> {
        Ok((
            ControlCommand::Maneuver(Maneuver::HARD_BRAKE),
            DecisionInfo::naturalistic(Maneuver::HARD_BRAKE),
        ))
    }
}

struct FailingModel;

impl DecisionModel for FailingModel {
    fn decide(
        &self,
        _obs: &Observation,
        _rng: &mut AgentRng,
    ) -> Result<(ControlCommand, DecisionInfo), DecisionError> {
        Err(DecisionError("sensor dropout".into()))
    }
}

/// Factory that gives listed agents a failing model and everyone else a
/// hard-braking one.
struct TestFactory {
    failing: Vec<AgentId>,
}

impl AgentFactory for TestFactory {
    fn create(&self, id: AgentId, kind: AgentKind) -> Agent {
        let model: Box<dyn DecisionModel> = if self.failing.contains(&id) {
            Box::new(FailingModel)
        } else {
            Box::new(BrakeModel)
        };
        Agent::new(id, kind, Box::new(LocalSensor::new(120.0)), model, Box::new(MoveController))
    }
}

fn idm_factory() -> Box<dyn AgentFactory> {
    Box::new(nade_agent::DefaultVehicleFactory { sensor_range_m: 120.0, lane_change: false })
}

/// Adversity pipeline configured so nearby pairs always trip the selector.
fn hot_pipeline() -> AdversityPipeline {
    let flat = |v: f64| ChallengeTable::new(vec![0.0], vec![0.0], vec![vec![v]]).unwrap();
    AdversityPipeline {
        predictor: Box::new(IdmModel::default()),
        estimator: CriticalityEstimator::new(
            ChallengeTables { car_following: flat(0.9), lane_change: flat(0.9) },
            120.0,
        ),
        selector: AdversarialSelector::new(1e-4, 1e-4),
        tie_break: TieBreakPolicy::SameLane,
        probability_tolerance: 1e-6,
    }
}

#[cfg(test)]
mod decision_loop {
    use super::*;

    #[test]
    fn zero_agents_is_a_noop_step() {
        let engine = MemoryEngine::new(2);
        let mut adapter = SyncAdapter::new(engine, 3);
        let snapshot = adapter.pull_snapshot(Step(0)).unwrap();

        let mut env = Environment::new(1, Box::new(TestFactory { failing: vec![] }));
        let mut weight = TrajectoryWeight::new();
        let outcome = env.step(&snapshot, &mut adapter, &mut weight).unwrap();

        assert_eq!(outcome.processed, 0);
        assert!(outcome.actions.is_empty());
        assert_eq!(weight.log_weight(), 0.0);
        // Predicates still run against the empty outcome.
        assert!(CollisionStop.evaluate(Step(0), &snapshot, &outcome).is_none());
    }

    #[test]
    fn entering_agents_act_the_same_step() {
        let mut engine = MemoryEngine::new(2);
        engine.add_vehicle(AgentId(0), vehicle(0.0, 30.0, 0));
        engine.add_vehicle(AgentId(1), vehicle(50.0, 30.0, 0));
        let mut adapter = SyncAdapter::new(engine, 3);
        let snapshot = adapter.pull_snapshot(Step(0)).unwrap();

        let mut env = Environment::new(1, Box::new(TestFactory { failing: vec![] }));
        let mut weight = TrajectoryWeight::new();
        let outcome = env.step(&snapshot, &mut adapter, &mut weight).unwrap();

        assert_eq!(env.agent_count(), 2);
        assert_eq!(outcome.processed, 2);
        // Ascending-id order is the replay contract.
        let order: Vec<AgentId> = outcome.actions.iter().map(|a| a.agent).collect();
        assert_eq!(order, vec![AgentId(0), AgentId(1)]);
    }

    #[test]
    fn exited_agents_are_evicted_before_anyone_runs() {
        let mut engine = MemoryEngine::new(2);
        engine.add_vehicle(AgentId(0), vehicle(0.0, 30.0, 0));
        engine.add_vehicle(AgentId(1), vehicle(50.0, 30.0, 0));
        engine.schedule_exit(1, AgentId(1));
        let mut adapter = SyncAdapter::new(engine, 3);

        let mut env = Environment::new(1, Box::new(TestFactory { failing: vec![] }));
        let mut weight = TrajectoryWeight::new();
        let snapshot = adapter.pull_snapshot(Step(0)).unwrap();
        env.step(&snapshot, &mut adapter, &mut weight).unwrap();
        adapter.advance(0.1).unwrap();

        let snapshot = adapter.pull_snapshot(Step(1)).unwrap();
        let outcome = env.step(&snapshot, &mut adapter, &mut weight).unwrap();
        assert_eq!(env.population(), vec![AgentId(0)]);
        assert_eq!(outcome.processed, 1);
    }

    #[test]
    fn decision_fault_skips_only_the_faulted_agent() {
        let mut engine = MemoryEngine::new(2);
        engine.add_vehicle(AgentId(0), vehicle(0.0, 30.0, 0));
        engine.add_vehicle(AgentId(1), vehicle(50.0, 30.0, 0));
        let mut adapter = SyncAdapter::new(engine, 3);
        let snapshot = adapter.pull_snapshot(Step(0)).unwrap();

        let mut env = Environment::new(1, Box::new(TestFactory { failing: vec![AgentId(0)] }));
        let mut weight = TrajectoryWeight::new();
        let outcome = env.step(&snapshot, &mut adapter, &mut weight).unwrap();

        assert_eq!(outcome.processed, 2);
        assert_eq!(env.faults().len(), 1);
        assert_eq!(env.faults()[0].agent, AgentId(0));
        // The faulted agent fell back to Noop; the other still braked.
        assert!(matches!(outcome.actions[0].command, ControlCommand::Noop));
        assert!(matches!(
            outcome.actions[1].command,
            ControlCommand::Maneuver(Maneuver::Brake { .. })
        ));
    }

    #[test]
    fn engine_fault_aborts_the_step() {
        let mut engine = MemoryEngine::new(2);
        engine.add_vehicle(AgentId(0), vehicle(0.0, 30.0, 0));
        let flaky = FlakyEngine::new(engine, 0, true);
        let mut adapter = SyncAdapter::new(flaky, 3);
        let snapshot = adapter.pull_snapshot(Step(0)).unwrap();
        // One fatal failure: the brake command's set_control dies.
        adapter.engine_mut().arm(1);

        let mut env = Environment::new(1, Box::new(TestFactory { failing: vec![] }));
        let mut weight = TrajectoryWeight::new();
        let result = env.step(&snapshot, &mut adapter, &mut weight);
        assert!(matches!(result, Err(EnvError::Engine { agent: AgentId(0), .. })));
    }

    #[test]
    fn collision_removed_pair_never_runs_again() {
        let mut engine = MemoryEngine::new(2);
        // 4 m gap, 50 m/s closing: collides within one 0.1 s step.
        engine.add_vehicle(AgentId(0), vehicle(0.0, 50.0, 0));
        engine.add_vehicle(AgentId(1), vehicle(9.0, 0.0, 0));
        let mut adapter = SyncAdapter::new(engine, 3);

        let mut env = Environment::new(1, Box::new(TestFactory { failing: vec![] }));
        let mut weight = TrajectoryWeight::new();
        let snapshot = adapter.pull_snapshot(Step(0)).unwrap();
        env.step(&snapshot, &mut adapter, &mut weight).unwrap();
        adapter.advance(0.1).unwrap();

        let snapshot = adapter.pull_snapshot(Step(1)).unwrap();
        assert_eq!(snapshot.collisions.len(), 1);
        let outcome = env.step(&snapshot, &mut adapter, &mut weight).unwrap();
        assert_eq!(env.agent_count(), 0);
        assert_eq!(outcome.processed, 0);
        assert_eq!(outcome.collisions.len(), 1);
    }
}

#[cfg(test)]
mod adversity_wiring {
    use super::*;

    #[test]
    fn partnerless_vehicle_keeps_weight_at_one() {
        let mut engine = MemoryEngine::new(2);
        // A lone vehicle has no partners, so the selector never activates.
        engine.add_vehicle(AgentId(0), vehicle(0.0, 30.0, 0));
        let mut adapter = SyncAdapter::new(engine, 3);
        let snapshot = adapter.pull_snapshot(Step(0)).unwrap();

        let mut env = Environment::new(1, idm_factory()).with_adversity(hot_pipeline());
        let mut weight = TrajectoryWeight::new();
        let outcome = env.step(&snapshot, &mut adapter, &mut weight).unwrap();

        assert_eq!(outcome.actions[0].mode, DecisionMode::Naturalistic);
        assert_eq!(outcome.actions[0].weight, 1.0);
        assert_eq!(weight.log_weight(), 0.0);
    }

    #[test]
    fn close_pair_gets_adversarial_substitutions() {
        let mut engine = MemoryEngine::new(2);
        engine.add_vehicle(AgentId(0), vehicle(0.0, 30.0, 0));
        engine.add_vehicle(AgentId(1), vehicle(40.0, 25.0, 0));
        let mut adapter = SyncAdapter::new(engine, 3);

        let mut env = Environment::new(7, idm_factory()).with_adversity(hot_pipeline());
        let mut weight = TrajectoryWeight::new();
        let mut adversarial = 0usize;
        for step in 0..50u64 {
            // Re-pull without advancing so the pair stays put while the
            // per-agent streams keep drawing.
            let snapshot = adapter.pull_snapshot(Step(step)).unwrap();
            let outcome = env.step(&snapshot, &mut adapter, &mut weight).unwrap();
            adversarial += outcome
                .actions
                .iter()
                .filter(|a| a.mode == DecisionMode::Adversarial)
                .count();
        }

        assert!(adversarial > 0, "selector never substituted in 50 steps");
        // Every draw (maintain or adversarial) moved the trajectory weight.
        assert_ne!(weight.log_weight(), 0.0);
        assert!(weight.log_weight().is_finite());
    }

    #[test]
    fn faulted_agent_keeps_its_noop_against_an_active_selector() {
        let mut engine = MemoryEngine::new(2);
        engine.add_vehicle(AgentId(0), vehicle(0.0, 30.0, 0));
        engine.add_vehicle(AgentId(1), vehicle(25.0, 28.0, 0));
        let mut adapter = SyncAdapter::new(engine, 3);

        let factory = TestFactory { failing: vec![AgentId(0)] };
        let mut env = Environment::new(7, Box::new(factory)).with_adversity(hot_pipeline());
        let mut weight = TrajectoryWeight::new();
        for step in 0..50u64 {
            let snapshot = adapter.pull_snapshot(Step(step)).unwrap();
            let outcome = env.step(&snapshot, &mut adapter, &mut weight).unwrap();
            let action = &outcome.actions[0];
            assert_eq!(action.agent, AgentId(0));
            assert!(matches!(action.command, ControlCommand::Noop));
            assert_eq!(action.mode, DecisionMode::Naturalistic);
            assert_eq!(action.weight, 1.0);
        }
        assert_eq!(env.faults().len(), 50);
    }

    #[test]
    fn seeded_replay_reproduces_actions_and_weight() {
        let run = || {
            let mut engine = MemoryEngine::new(2);
            engine.add_vehicle(AgentId(0), vehicle(0.0, 30.0, 0));
            engine.add_vehicle(AgentId(1), vehicle(40.0, 25.0, 0));
            let mut adapter = SyncAdapter::new(engine, 3);
            let mut env = Environment::new(42, idm_factory()).with_adversity(hot_pipeline());
            let mut weight = TrajectoryWeight::new();
            let mut maneuvers = Vec::new();
            for step in 0..20u64 {
                let snapshot = adapter.pull_snapshot(Step(step)).unwrap();
                let outcome = env.step(&snapshot, &mut adapter, &mut weight).unwrap();
                maneuvers
                    .extend(outcome.actions.iter().map(|a| a.command.maneuver().as_str()));
            }
            (maneuvers, weight.log_weight())
        };
        assert_eq!(run(), run());
    }
}

#[cfg(test)]
mod predicates {
    use super::*;
    use crate::environment::StepOutcome;
    use nade_engine::WorldSnapshot;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn collision_stop_reports_the_pair() {
        let snapshot = WorldSnapshot::empty(Step(0));
        let outcome = StepOutcome {
            collisions: vec![(AgentId(2), AgentId(1))],
            ..StepOutcome::default()
        };
        assert_eq!(
            CollisionStop.evaluate(Step(0), &snapshot, &outcome),
            Some(StopCause::Collision(vec![AgentId(1), AgentId(2)]))
        );
    }

    #[test]
    fn horizon_fires_exactly_at_the_limit() {
        let snapshot = WorldSnapshot::empty(Step(0));
        let outcome = StepOutcome::default();
        let mut horizon = Horizon { max_steps: 10 };
        assert!(horizon.evaluate(Step(8), &snapshot, &outcome).is_none());
        assert_eq!(
            horizon.evaluate(Step(9), &snapshot, &outcome),
            Some(StopCause::HorizonReached)
        );
    }

    #[test]
    fn external_stop_observes_the_flag() {
        let snapshot = WorldSnapshot::empty(Step(0));
        let outcome = StepOutcome::default();
        let flag = Arc::new(AtomicBool::new(false));
        let mut stop = ExternalStop::new(flag.clone());
        assert!(stop.evaluate(Step(0), &snapshot, &outcome).is_none());
        flag.store(true, Ordering::Relaxed);
        assert_eq!(
            stop.evaluate(Step(1), &snapshot, &outcome),
            Some(StopCause::ExternalStop)
        );
    }
}
