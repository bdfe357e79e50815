//! The environment: agent registry plus the per-step decision loop.

use std::collections::BTreeMap;

use nade_adversity::{
    AdversarialSelector, AdversityResult, ChallengeTables, CriticalityEstimator,
    CriticalityRecord, ManeuverDistribution, ProbabilityPredictor, TrajectoryWeight,
};
use nade_agent::{
    Agent, AgentFactory, ControlCommand, DecisionInfo, DecisionMode, IdmModel, Observation,
};
use nade_core::{AdversityConfig, AgentId, AgentKind, AgentRng, Maneuver, Step, TieBreakPolicy};
use nade_engine::{StepControl, SyncAdapter, WorldSnapshot};
use tracing::{debug, warn};

use crate::error::{EnvError, EnvResult};

// ── AdversityPipeline ─────────────────────────────────────────────────────────

/// The full decide-phase adversity stack for vehicle agents: naturalistic
/// probability prediction, pairwise criticality, importance-sampling
/// selection.
pub struct AdversityPipeline {
    pub predictor: Box<dyn ProbabilityPredictor>,
    pub estimator: CriticalityEstimator,
    pub selector: AdversarialSelector,
    pub tie_break: TieBreakPolicy,
    pub probability_tolerance: f64,
}

impl AdversityPipeline {
    /// Assemble from configuration, loading challenge tables from the
    /// resolved data directory (builtin grids when files are absent).
    pub fn from_config(config: &AdversityConfig) -> AdversityResult<Self> {
        let tables = ChallengeTables::load(&config.resolve_data_dir())?;
        Ok(Self {
            predictor: Box::new(IdmModel::default()),
            estimator: CriticalityEstimator::new(tables, config.interaction_radius_m),
            selector: AdversarialSelector::new(
                config.activation_threshold,
                config.floor_probability,
            ),
            tie_break: config.tie_break,
            probability_tolerance: config.probability_tolerance,
        })
    }

    /// Run the full pipeline for one vehicle's observation.
    ///
    /// `Ok(None)` means no partner crossed the activation threshold and
    /// the naturalistic command stands with weight 1.  `Ok(Some(..))` carries the sampled
    /// maneuver's likelihood-ratio ingredients; `command` is `None` when
    /// the maintain entry was drawn (the naturalistic command stands, but
    /// the draw still contributes its weight).
    pub fn decide(
        &self,
        obs: &Observation,
        rng: &mut AgentRng,
    ) -> AdversityResult<Option<(Option<ControlCommand>, DecisionInfo)>> {
        let predicted = self.predictor.predict(obs, self.probability_tolerance)?;
        let records = self.criticality_records(obs, &predicted);
        let selection = self.selector.select(&predicted, records, rng)?;
        let Some(action) = selection.action else {
            return Ok(None);
        };

        let info = DecisionInfo {
            mode: if action.is_adversarial() {
                DecisionMode::Adversarial
            } else {
                DecisionMode::Naturalistic
            },
            natural_prob: action.natural_prob,
            sampling_prob: action.sampling_prob,
            maneuver: action.maneuver,
        };
        let command = action
            .is_adversarial()
            .then(|| ControlCommand::Maneuver(action.maneuver));
        Ok(Some((command, info)))
    }

    fn criticality_records(
        &self,
        obs: &Observation,
        predicted: &ManeuverDistribution,
    ) -> Vec<CriticalityRecord> {
        obs.neighbors
            .iter()
            .map(|(partner, state)| {
                self.estimator
                    .estimate(obs, *partner, state, predicted, self.tie_break)
            })
            .collect()
    }
}

// ── Environment ───────────────────────────────────────────────────────────────

/// One isolated decision fault: the agent skipped its turn this step.
#[derive(Clone, Debug)]
pub struct AgentFault {
    pub step: Step,
    pub agent: AgentId,
    pub message: String,
}

/// What one agent did in one step.
#[derive(Clone, Debug)]
pub struct AgentAction {
    pub agent: AgentId,
    pub command: ControlCommand,
    pub mode: DecisionMode,
    /// Per-step likelihood ratio; exactly 1 for naturalistic decisions.
    pub weight: f64,
}

/// Result of one environment step.
#[derive(Clone, Debug, Default)]
pub struct StepOutcome {
    /// Agents that ran their decision this step.
    pub processed: usize,
    pub actions: Vec<AgentAction>,
    /// Collision pairs reported by the engine for the step just advanced.
    pub collisions: Vec<(AgentId, AgentId)>,
}

struct AgentSlot {
    agent: Agent,
    rng: AgentRng,
}

/// The agent registry and decision loop.
///
/// Iteration order over the registry is ascending `AgentId`, which is what
/// makes seeded runs replayable: a given population and engine sequence
/// always produces the same observe/decide/apply order.
pub struct Environment {
    seed: u64,
    factory: Box<dyn AgentFactory>,
    adversity: Option<AdversityPipeline>,
    registry: BTreeMap<AgentId, AgentSlot>,
    faults: Vec<AgentFault>,
}

impl Environment {
    pub fn new(seed: u64, factory: Box<dyn AgentFactory>) -> Self {
        Self {
            seed,
            factory,
            adversity: None,
            registry: BTreeMap::new(),
            faults: Vec::new(),
        }
    }

    pub fn with_adversity(mut self, pipeline: AdversityPipeline) -> Self {
        self.adversity = Some(pipeline);
        self
    }

    /// Live agent ids in ascending order.
    pub fn population(&self) -> Vec<AgentId> {
        self.registry.keys().copied().collect()
    }

    pub fn agent_count(&self) -> usize {
        self.registry.len()
    }

    /// Decision faults recorded so far, in occurrence order.
    pub fn faults(&self) -> &[AgentFault] {
        &self.faults
    }

    /// Run one full decision round against `snapshot`.
    ///
    /// The population delta is applied first, so agents entering with this
    /// snapshot act this very step and exited agents (collision removals
    /// included) never run again.  A decision fault skips only its own
    /// agent; engine faults abort the step.
    pub fn step<E: StepControl>(
        &mut self,
        snapshot: &WorldSnapshot,
        adapter: &mut SyncAdapter<E>,
        weight: &mut TrajectoryWeight,
    ) -> EnvResult<StepOutcome> {
        self.apply_population_delta(snapshot);

        let mut outcome = StepOutcome {
            collisions: snapshot.collisions.clone(),
            ..StepOutcome::default()
        };

        for (id, slot) in self.registry.iter_mut() {
            let agent = &slot.agent;
            let obs = agent.sensor.observe(*id, snapshot);

            let mut faulted = false;
            let (mut command, mut info) = match agent.model.decide(&obs, &mut slot.rng) {
                Ok(decision) => decision,
                Err(e) => {
                    warn!(agent = id.0, error = %e, "decision fault, agent skips this step");
                    self.faults.push(AgentFault {
                        step: snapshot.step,
                        agent: *id,
                        message: e.to_string(),
                    });
                    faulted = true;
                    (ControlCommand::Noop, DecisionInfo::naturalistic(Maneuver::Maintain))
                }
            };

            // A faulted agent sits the step out at weight 1; the selector
            // must not substitute for a command that was never decided.
            if !faulted && agent.kind == AgentKind::Vehicle {
                if let Some(pipeline) = &self.adversity {
                    match pipeline.decide(&obs, &mut slot.rng) {
                        Ok(Some((override_cmd, sampled_info))) => {
                            if let Some(cmd) = override_cmd {
                                command = cmd;
                            }
                            info = sampled_info;
                        }
                        Ok(None) => {}
                        Err(e) => {
                            warn!(
                                agent = id.0,
                                error = %e,
                                "adversity pipeline degenerate, keeping naturalistic action"
                            );
                        }
                    }
                }
            }

            for control in agent.controller.checked_apply(*id, &command, &obs) {
                adapter
                    .push_control(*id, &control)
                    .map_err(|source| EnvError::Engine { agent: *id, source })?;
            }
            weight.accumulate(info.natural_prob, info.sampling_prob)?;

            outcome.actions.push(AgentAction {
                agent: *id,
                command,
                mode: info.mode,
                weight: info.weight(),
            });
            outcome.processed += 1;
        }

        debug!(
            step = snapshot.step.0,
            processed = outcome.processed,
            collisions = outcome.collisions.len(),
            "environment step complete"
        );
        Ok(outcome)
    }

    /// Apply only the population delta, without running any decisions.
    /// Used on engine steps that fall between decision refreshes.
    pub fn sync_population(&mut self, snapshot: &WorldSnapshot) {
        self.apply_population_delta(snapshot);
    }

    fn apply_population_delta(&mut self, snapshot: &WorldSnapshot) {
        for id in &snapshot.exited {
            if self.registry.remove(id).is_some() {
                debug!(agent = id.0, "agent evicted");
            }
        }
        for (id, kind) in &snapshot.entered {
            let agent = self.factory.create(*id, *kind);
            let rng = AgentRng::new(self.seed, *id);
            if self.registry.insert(*id, AgentSlot { agent, rng }).is_some() {
                warn!(agent = id.0, "re-entry replaced an existing agent");
            }
        }
    }
}
