//! Termination predicates, evaluated once per step after control
//! application.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use nade_core::{AgentId, Step};
use nade_engine::WorldSnapshot;

use crate::environment::StepOutcome;

/// Why a predicate wants the run stopped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StopCause {
    /// At least one collision occurred; carries the involved agents.
    Collision(Vec<AgentId>),
    HorizonReached,
    ExternalStop,
}

/// One stop condition.  The scheduler evaluates every installed predicate
/// each step and stops at the first cause returned.
pub trait TerminationPredicate: Send {
    fn evaluate(
        &mut self,
        step: Step,
        snapshot: &WorldSnapshot,
        outcome: &StepOutcome,
    ) -> Option<StopCause>;
}

// ── Built-ins ─────────────────────────────────────────────────────────────────

/// Stop on the first collision.
pub struct CollisionStop;

impl TerminationPredicate for CollisionStop {
    fn evaluate(
        &mut self,
        _step: Step,
        _snapshot: &WorldSnapshot,
        outcome: &StepOutcome,
    ) -> Option<StopCause> {
        if outcome.collisions.is_empty() {
            return None;
        }
        let mut agents: Vec<AgentId> = outcome
            .collisions
            .iter()
            .flat_map(|&(a, b)| [a, b])
            .collect();
        agents.sort();
        agents.dedup();
        Some(StopCause::Collision(agents))
    }
}

/// Stop once `max_steps` steps have completed.
pub struct Horizon {
    pub max_steps: u64,
}

impl TerminationPredicate for Horizon {
    fn evaluate(
        &mut self,
        step: Step,
        _snapshot: &WorldSnapshot,
        _outcome: &StepOutcome,
    ) -> Option<StopCause> {
        (step.0 + 1 >= self.max_steps).then_some(StopCause::HorizonReached)
    }
}

/// Cooperative external stop via a shared flag.
pub struct ExternalStop {
    flag: Arc<AtomicBool>,
}

impl ExternalStop {
    pub fn new(flag: Arc<AtomicBool>) -> Self {
        Self { flag }
    }
}

impl TerminationPredicate for ExternalStop {
    fn evaluate(
        &mut self,
        _step: Step,
        _snapshot: &WorldSnapshot,
        _outcome: &StepOutcome,
    ) -> Option<StopCause> {
        self.flag.load(Ordering::Relaxed).then_some(StopCause::ExternalStop)
    }
}
