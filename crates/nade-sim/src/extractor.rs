//! Run observers and the termination report.

use nade_core::{AgentId, RunConfig, Step};
use nade_engine::WorldSnapshot;
use nade_env::{AgentFault, StepOutcome};

use crate::trajectory::Trajectory;

/// Why the run ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TerminationReason {
    Collision,
    HorizonReached,
    ExternalStop,
    /// The run aborted on a fatal fault; carries the fault description.
    Fault(String),
}

impl TerminationReason {
    pub fn as_str(&self) -> &str {
        match self {
            TerminationReason::Collision => "collision",
            TerminationReason::HorizonReached => "horizon",
            TerminationReason::ExternalStop => "external_stop",
            TerminationReason::Fault(_) => "fault",
        }
    }
}

/// The run-level summary handed to extractors at termination.
#[derive(Clone, Debug)]
pub struct TerminationReport {
    pub reason: TerminationReason,
    /// Agents involved in the terminating event (collision pair, or the
    /// agent whose fault aborted the run).
    pub offending_agents: Vec<AgentId>,
    /// Authoritative trajectory weight, log space.
    pub final_log_weight: f64,
    /// Linear-space weight; may underflow to 0 on long adversarial runs.
    pub final_weight: f64,
    /// Steps completed before termination.
    pub steps: u64,
    /// Isolated per-agent decision faults recorded during the run.
    pub agent_faults: Vec<AgentFault>,
}

/// Observer hooks over a run's lifecycle.  All hooks default to no-ops so
/// an extractor implements only what it cares about.
pub trait InfoExtractor {
    fn on_start(&mut self, _config: &RunConfig) {}

    /// Called once per completed step, after the engine has advanced.
    fn on_step(&mut self, _step: Step, _snapshot: &WorldSnapshot, _outcome: &StepOutcome) {}

    fn on_termination(&mut self, _report: &TerminationReport, _trajectory: &Trajectory) {}
}

/// Discards everything.
pub struct NoopExtractor;

impl InfoExtractor for NoopExtractor {}
