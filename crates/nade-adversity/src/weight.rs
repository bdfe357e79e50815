//! Log-space trajectory likelihood-ratio accumulator.

use crate::{AdversityError, AdversityResult};

/// Running product of per-step likelihood ratios, kept in log space so a
/// long run of small ratios underflows to `-inf` gracefully instead of
/// collapsing to a denormal product.
#[derive(Clone, Copy, Debug, Default)]
pub struct TrajectoryWeight {
    log_weight: f64,
    steps_accumulated: u64,
}

impl TrajectoryWeight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one draw's (natural, sampling) probability pair into the weight.
    ///
    /// Both probabilities must be finite and strictly positive; the sampler
    /// guarantees this for every entry it can draw, so a violation here is a
    /// caller bug, not a numerical accident.
    pub fn accumulate(&mut self, natural_prob: f64, sampling_prob: f64) -> AdversityResult<()> {
        if !(natural_prob.is_finite() && natural_prob > 0.0) {
            return Err(AdversityError::InvariantViolation(format!(
                "non-positive natural probability {natural_prob}"
            )));
        }
        if !(sampling_prob.is_finite() && sampling_prob > 0.0) {
            return Err(AdversityError::InvariantViolation(format!(
                "non-positive sampling probability {sampling_prob}"
            )));
        }
        self.log_weight += natural_prob.ln() - sampling_prob.ln();
        self.steps_accumulated += 1;
        Ok(())
    }

    pub fn log_weight(&self) -> f64 {
        self.log_weight
    }

    /// The linear-space weight. May underflow to 0 for long adversarial
    /// trajectories; the log form is the authoritative value.
    pub fn weight(&self) -> f64 {
        self.log_weight.exp()
    }

    pub fn steps_accumulated(&self) -> u64 {
        self.steps_accumulated
    }
}
