//! The adversarial selector: importance-sampled maneuver substitution.

use nade_core::{AgentId, AgentRng, Maneuver};
use rand::distributions::{Distribution, WeightedIndex};
use tracing::debug;

use crate::criticality::{CriticalityRecord, ManeuverDistribution};
use crate::{AdversityError, AdversityResult};

// ── SelectorPhase ─────────────────────────────────────────────────────────────

/// Lifecycle of one agent's selection in one step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectorPhase {
    /// Start state, before any criticality record is received.
    Idle,
    /// Criticality records were received and candidates extracted.
    Evaluating,
    /// A sampling distribution was built and drawn from.
    Sampling,
    /// The step's action is settled: the drawn maneuver, or the
    /// naturalistic command verbatim when no partner crossed the threshold.
    Applied,
}

// ── SampledAction ─────────────────────────────────────────────────────────────

/// The outcome of one importance-sampling draw.
#[derive(Clone, Debug)]
pub struct SampledAction {
    pub maneuver: Maneuver,
    /// Probability of the maneuver under the naturalistic model.
    pub natural_prob: f64,
    /// Probability of the maneuver under the sampling distribution.
    pub sampling_prob: f64,
    /// Partner that motivated the maneuver; `None` for the maintain entry.
    pub partner: Option<AgentId>,
}

impl SampledAction {
    /// Per-step likelihood ratio contributed by this draw.
    pub fn weight(&self) -> f64 {
        self.natural_prob / self.sampling_prob
    }

    pub fn is_adversarial(&self) -> bool {
        self.maneuver.is_adversarial()
    }
}

/// Full result of running the selector for one agent in one step.
#[derive(Clone, Debug)]
pub struct Selection {
    /// Phase transitions in order; last entry is the terminal phase.
    pub trace: Vec<SelectorPhase>,
    /// `None` when no partner crossed the threshold and the naturalistic
    /// command stands verbatim at weight 1.
    pub action: Option<SampledAction>,
    pub records: Vec<CriticalityRecord>,
}

impl Selection {
    /// The no-candidate outcome: records were evaluated, nothing crossed
    /// the threshold, the naturalistic command applies unchanged.
    pub fn naturalistic(records: Vec<CriticalityRecord>) -> Self {
        Self {
            trace: vec![SelectorPhase::Idle, SelectorPhase::Evaluating, SelectorPhase::Applied],
            action: None,
            records,
        }
    }

    pub fn phase(&self) -> SelectorPhase {
        *self.trace.last().unwrap_or(&SelectorPhase::Idle)
    }
}

// ── AdversarialSelector ───────────────────────────────────────────────────────

/// Builds the per-step sampling distribution and draws from it.
///
/// The distribution always contains a maintain (naturalistic) entry plus one
/// candidate per partner whose criticality exceeds the activation threshold;
/// each candidate is that partner's highest-challenge adversarial maneuver.
/// Adversarial mass is proportional to criticality, every entry is floored
/// at the floor probability, and the whole vector is renormalized so the
/// likelihood ratio stays well defined.
pub struct AdversarialSelector {
    pub activation_threshold: f64,
    pub floor_probability: f64,
}

impl AdversarialSelector {
    pub fn new(activation_threshold: f64, floor_probability: f64) -> Self {
        Self { activation_threshold, floor_probability }
    }

    /// Run one selection for an agent whose naturalistic distribution is
    /// `predicted` and whose pairwise criticalities are `records`.
    ///
    /// A `Degenerate` error means the sampling distribution could not be
    /// normalized; the caller falls back to the naturalistic action with
    /// weight 1.
    pub fn select(
        &self,
        predicted: &ManeuverDistribution,
        records: Vec<CriticalityRecord>,
        rng: &mut AgentRng,
    ) -> AdversityResult<Selection> {
        let mut candidates: Vec<(AgentId, Maneuver, f64)> = Vec::new();
        for record in &records {
            if record.criticality <= self.activation_threshold {
                continue;
            }
            if let Some((maneuver, _)) = record.peak_adversarial() {
                candidates.push((record.partner, maneuver, record.criticality));
            }
        }
        if candidates.is_empty() {
            return Ok(Selection::naturalistic(records));
        }
        let mut trace = vec![SelectorPhase::Idle, SelectorPhase::Evaluating];

        // Sampling probabilities: criticality-proportional adversarial mass,
        // floored, with the maintain entry absorbing the remainder.
        let adv_mass: f64 = candidates.iter().map(|(_, _, c)| c).sum();
        if !(adv_mass.is_finite() && adv_mass > 0.0) {
            return Err(AdversityError::Degenerate(format!(
                "adversarial mass {adv_mass}"
            )));
        }
        let mut sampling: Vec<f64> = candidates
            .iter()
            .map(|&(_, _, c)| c.max(self.floor_probability))
            .collect();
        let adv_total: f64 = sampling.iter().sum();
        let maintain_sampling = (1.0 - adv_total).max(self.floor_probability);
        sampling.push(maintain_sampling);
        let total: f64 = sampling.iter().sum();
        if !(total.is_finite() && total > 0.0) {
            return Err(AdversityError::Degenerate(format!(
                "sampling mass {total}"
            )));
        }
        for p in &mut sampling {
            *p /= total;
        }

        // Naturalistic probabilities of the same entries.  The maintain
        // entry carries all naturalistic mass not claimed by a candidate.
        let mut natural: Vec<f64> = candidates
            .iter()
            .map(|&(_, m, _)| predicted.probability_of(m))
            .collect();
        let claimed: f64 = natural.iter().sum();
        natural.push((1.0 - claimed).max(0.0));

        trace.push(SelectorPhase::Sampling);
        let index = WeightedIndex::new(&sampling)
            .map_err(|e| AdversityError::Degenerate(e.to_string()))?;
        let drawn = index.sample(rng.inner());

        let action = if drawn < candidates.len() {
            let (partner, maneuver, criticality) = candidates[drawn];
            debug!(
                ?maneuver,
                partner = partner.0,
                criticality,
                sampling_prob = sampling[drawn],
                "adversarial maneuver drawn"
            );
            SampledAction {
                maneuver,
                natural_prob: natural[drawn],
                sampling_prob: sampling[drawn],
                partner: Some(partner),
            }
        } else {
            SampledAction {
                maneuver: Maneuver::Maintain,
                natural_prob: natural[drawn],
                sampling_prob: sampling[drawn],
                partner: None,
            }
        };
        if !(action.sampling_prob > 0.0 && action.natural_prob > 0.0) {
            return Err(AdversityError::Degenerate(format!(
                "drawn entry natural={} sampling={}",
                action.natural_prob, action.sampling_prob
            )));
        }

        trace.push(SelectorPhase::Applied);
        Ok(Selection { trace, action: Some(action), records })
    }
}
