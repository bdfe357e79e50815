//! The phase-sequenced run scheduler.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use nade_adversity::TrajectoryWeight;
use nade_agent::AgentFactory;
use nade_core::{RunConfig, StepClock};
use nade_engine::{StepControl, SyncAdapter};
use nade_env::{
    AdversityPipeline, CollisionStop, Environment, EnvError, ExternalStop, Horizon,
    StepOutcome, StopCause, TerminationPredicate,
};
use tracing::info;

use crate::error::{SimError, SimResult};
use crate::extractor::{InfoExtractor, TerminationReason, TerminationReport};
use crate::trajectory::{StepRecord, Trajectory};

// ── StopHandle ────────────────────────────────────────────────────────────────

/// Cooperative stop switch for a running scheduler.  Cheap to clone and
/// safe to flip from another thread.
#[derive(Clone)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

// ── Scheduler ─────────────────────────────────────────────────────────────────

/// Drives one run: sync → decide → advance → record → terminate-check,
/// with exactly one engine round trip per step.
pub struct Scheduler<E: StepControl> {
    config: RunConfig,
    clock: StepClock,
    adapter: SyncAdapter<E>,
    env: Environment,
    predicates: Vec<Box<dyn TerminationPredicate>>,
    weight: TrajectoryWeight,
    trajectory: Trajectory,
    stop: Arc<AtomicBool>,
}

impl<E: StepControl> Scheduler<E> {
    /// Scheduler with the adversarial pipeline assembled from the config.
    pub fn new(config: RunConfig, engine: E, factory: Box<dyn AgentFactory>) -> SimResult<Self> {
        let pipeline = AdversityPipeline::from_config(&config.adversity)?;
        Self::build(config, engine, factory, Some(pipeline))
    }

    /// Scheduler without adversity: every agent acts naturalistically and
    /// the trajectory weight stays exactly 1.
    pub fn naturalistic(
        config: RunConfig,
        engine: E,
        factory: Box<dyn AgentFactory>,
    ) -> SimResult<Self> {
        Self::build(config, engine, factory, None)
    }

    /// Scheduler with an explicitly assembled pipeline, for callers that
    /// swap in a non-default predictor or custom challenge tables.
    pub fn with_pipeline(
        config: RunConfig,
        engine: E,
        factory: Box<dyn AgentFactory>,
        pipeline: AdversityPipeline,
    ) -> SimResult<Self> {
        Self::build(config, engine, factory, Some(pipeline))
    }

    fn build(
        config: RunConfig,
        engine: E,
        factory: Box<dyn AgentFactory>,
        pipeline: Option<AdversityPipeline>,
    ) -> SimResult<Self> {
        config.validate()?;
        let clock = config.make_clock();
        let adapter = SyncAdapter::new(engine, config.max_connect_attempts);
        let mut env = Environment::new(config.seed, factory);
        if let Some(pipeline) = pipeline {
            env = env.with_adversity(pipeline);
        }
        let stop = Arc::new(AtomicBool::new(false));
        let predicates: Vec<Box<dyn TerminationPredicate>> = vec![
            Box::new(CollisionStop),
            Box::new(Horizon { max_steps: config.max_steps }),
            Box::new(ExternalStop::new(stop.clone())),
        ];
        Ok(Self {
            config,
            clock,
            adapter,
            env,
            predicates,
            weight: TrajectoryWeight::new(),
            trajectory: Trajectory::new(),
            stop,
        })
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(self.stop.clone())
    }

    /// Install an additional termination predicate, evaluated after the
    /// built-ins each step.
    pub fn add_predicate(&mut self, predicate: Box<dyn TerminationPredicate>) {
        self.predicates.push(predicate);
    }

    pub fn engine_mut(&mut self) -> &mut E {
        self.adapter.engine_mut()
    }

    pub fn trajectory(&self) -> &Trajectory {
        &self.trajectory
    }

    /// Run to termination.
    ///
    /// Fatal faults notify the extractor with a `Fault` report (so partial
    /// output still flushes) and then surface as `Err`; every other ending
    /// returns the report.
    pub fn run(&mut self, extractor: &mut dyn InfoExtractor) -> SimResult<TerminationReport> {
        extractor.on_start(&self.config);
        info!(seed = self.config.seed, max_steps = self.config.max_steps, "run starting");

        loop {
            let step = self.clock.current_step;

            let snapshot = match self.adapter.pull_snapshot(step) {
                Ok(snapshot) => snapshot,
                Err(e) => return Err(self.abort(extractor, vec![], SimError::Engine(e))),
            };

            let outcome = if self.clock.is_action_step() {
                match self.env.step(&snapshot, &mut self.adapter, &mut self.weight) {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        let offenders = match &e {
                            EnvError::Engine { agent, .. } => vec![*agent],
                            EnvError::Weight(_) => vec![],
                        };
                        return Err(self.abort(extractor, offenders, SimError::Env(e)));
                    }
                }
            } else {
                self.env.sync_population(&snapshot);
                StepOutcome {
                    collisions: snapshot.collisions.clone(),
                    ..StepOutcome::default()
                }
            };

            if let Err(e) = self.adapter.advance(self.clock.step_length_secs) {
                return Err(self.abort(extractor, vec![], SimError::Engine(e)));
            }

            self.trajectory.push(StepRecord {
                step,
                population: self.env.population(),
                actions: outcome.actions.clone(),
                log_weight_after: self.weight.log_weight(),
            });
            extractor.on_step(step, &snapshot, &outcome);
            self.clock.advance();

            let cause = self
                .predicates
                .iter_mut()
                .find_map(|p| p.evaluate(step, &snapshot, &outcome));
            if let Some(cause) = cause {
                let report = self.report(cause);
                info!(
                    reason = report.reason.as_str(),
                    steps = report.steps,
                    log_weight = report.final_log_weight,
                    "run terminated"
                );
                extractor.on_termination(&report, &self.trajectory);
                return Ok(report);
            }
        }
    }

    fn report(&self, cause: StopCause) -> TerminationReport {
        let (reason, offending_agents) = match cause {
            StopCause::Collision(agents) => (TerminationReason::Collision, agents),
            StopCause::HorizonReached => (TerminationReason::HorizonReached, vec![]),
            StopCause::ExternalStop => (TerminationReason::ExternalStop, vec![]),
        };
        TerminationReport {
            reason,
            offending_agents,
            final_log_weight: self.weight.log_weight(),
            final_weight: self.weight.weight(),
            steps: self.clock.current_step.0,
            agent_faults: self.env.faults().to_vec(),
        }
    }

    fn abort(
        &mut self,
        extractor: &mut dyn InfoExtractor,
        offending_agents: Vec<nade_core::AgentId>,
        error: SimError,
    ) -> SimError {
        let report = TerminationReport {
            reason: TerminationReason::Fault(error.to_string()),
            offending_agents,
            final_log_weight: self.weight.log_weight(),
            final_weight: self.weight.weight(),
            steps: self.clock.current_step.0,
            agent_faults: self.env.faults().to_vec(),
        };
        extractor.on_termination(&report, &self.trajectory);
        error
    }
}
