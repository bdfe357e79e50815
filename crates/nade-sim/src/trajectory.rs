//! The recorded history of one run.

use nade_core::{AgentId, Step};
use nade_env::AgentAction;

/// Everything that happened in one step, as recorded for replay and output.
#[derive(Clone, Debug)]
pub struct StepRecord {
    pub step: Step,
    /// Live agents after the population delta, ascending.
    pub population: Vec<AgentId>,
    pub actions: Vec<AgentAction>,
    /// Accumulated log trajectory weight after this step's draws.
    pub log_weight_after: f64,
}

/// Ordered step records for a whole run.  Owned by the scheduler and handed
/// to the extractor at termination.
#[derive(Clone, Debug, Default)]
pub struct Trajectory {
    records: Vec<StepRecord>,
}

impl Trajectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: StepRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn last(&self) -> Option<&StepRecord> {
        self.records.last()
    }
}
