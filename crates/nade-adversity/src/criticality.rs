//! Maneuver distributions and the criticality estimator.

use nade_core::{AgentId, Maneuver, TieBreakPolicy, VehicleState};
use nade_agent::Observation;
use tracing::warn;

use crate::challenge::ChallengeTables;
use crate::scenario::{classify, cut_in_direction, ScenarioClass};
use crate::{AdversityError, AdversityResult};

// ── ManeuverDistribution ──────────────────────────────────────────────────────

/// A probability distribution over discrete maneuvers.
///
/// Probabilities are clamped to [0, 1] and the sum-to-1 invariant is
/// *checked*, not assumed: a deviation beyond tolerance is corrected by
/// renormalization and logged as a warning — never silently ignored.
#[derive(Clone, Debug, Default)]
pub struct ManeuverDistribution(pub Vec<(Maneuver, f64)>);

impl ManeuverDistribution {
    /// Validate, clamp, and renormalize `pairs` into a distribution.
    pub fn normalized(pairs: Vec<(Maneuver, f64)>, tolerance: f64) -> AdversityResult<Self> {
        if pairs.is_empty() {
            return Err(AdversityError::InvariantViolation(
                "empty maneuver distribution".into(),
            ));
        }
        let clamped: Vec<(Maneuver, f64)> = pairs
            .into_iter()
            .map(|(m, p)| (m, if p.is_finite() { p.clamp(0.0, 1.0) } else { 0.0 }))
            .collect();
        let total: f64 = clamped.iter().map(|(_, p)| p).sum();
        if !(total.is_finite() && total > 0.0) {
            return Err(AdversityError::InvariantViolation(format!(
                "maneuver probabilities sum to {total}"
            )));
        }
        if (total - 1.0).abs() > tolerance {
            warn!(sum = total, tolerance, "renormalizing maneuver probabilities");
        }
        Ok(Self(clamped.into_iter().map(|(m, p)| (m, p / total)).collect()))
    }

    /// Probability of `maneuver` (matched by kind), 0 if absent.
    pub fn probability_of(&self, maneuver: Maneuver) -> f64 {
        self.0
            .iter()
            .find(|(m, _)| m.same_kind(maneuver))
            .map_or(0.0, |(_, p)| *p)
    }

    pub fn sum(&self) -> f64 {
        self.0.iter().map(|(_, p)| p).sum()
    }
}

/// Black-box supplier of an agent's naturalistic action probabilities.
///
/// The default implementation wraps the IDM model's incentive softmax; a
/// learned predictor plugs in here without touching the estimator.
pub trait ProbabilityPredictor: Send + Sync {
    fn predict(&self, obs: &Observation, tolerance: f64) -> AdversityResult<ManeuverDistribution>;
}

impl ProbabilityPredictor for nade_agent::IdmModel {
    fn predict(&self, obs: &Observation, tolerance: f64) -> AdversityResult<ManeuverDistribution> {
        ManeuverDistribution::normalized(self.action_probabilities(obs), tolerance)
    }
}

// ── CriticalityRecord ─────────────────────────────────────────────────────────

/// Per-agent-per-step criticality against one partner vehicle.
#[derive(Clone, Debug)]
pub struct CriticalityRecord {
    pub partner: AgentId,
    /// `None` when the pair is outside the decomposed scenario set.
    pub scenario: Option<ScenarioClass>,
    /// One-step challenge per focal maneuver, each in [0, 1].
    pub maneuver_challenges: Vec<(Maneuver, f64)>,
    /// Σ P(maneuver) × Challenge(maneuver).
    pub criticality: f64,
}

impl CriticalityRecord {
    /// The zero-criticality record for an out-of-radius (or unclassifiable)
    /// partner: the naturalistic baseline, no adversarial challenge term.
    pub fn baseline(partner: AgentId) -> Self {
        Self { partner, scenario: None, maneuver_challenges: vec![], criticality: 0.0 }
    }

    /// Highest-challenge adversarial maneuver in this record, if any.
    pub fn peak_adversarial(&self) -> Option<(Maneuver, f64)> {
        self.maneuver_challenges
            .iter()
            .filter(|(m, _)| m.is_adversarial())
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .copied()
    }
}

// ── CriticalityEstimator ──────────────────────────────────────────────────────

/// Pure function of (observation, partner) → criticality.
///
/// For the classified scenario the estimator prices each maneuver in the
/// focal vehicle's predicted action set by the relative state it would
/// produce one action step later, then takes the probability-weighted sum.
pub struct CriticalityEstimator {
    pub tables: ChallengeTables,
    /// Partners farther than this contribute only the baseline.
    pub interaction_radius_m: f64,
    /// Horizon over which a maneuver's kinematics are projected, seconds.
    pub projection_secs: f64,
}

impl CriticalityEstimator {
    pub fn new(tables: ChallengeTables, interaction_radius_m: f64) -> Self {
        Self { tables, interaction_radius_m, projection_secs: 1.0 }
    }

    /// Estimate the focal agent's criticality against one partner.
    ///
    /// `predicted` is the focal vehicle's naturalistic action distribution
    /// (already normalized).  Out-of-radius partners yield the baseline
    /// record.
    pub fn estimate(
        &self,
        obs: &Observation,
        partner: AgentId,
        partner_state: &VehicleState,
        predicted: &ManeuverDistribution,
        tie_break: TieBreakPolicy,
    ) -> CriticalityRecord {
        if obs.ego.distance_to(partner_state) > self.interaction_radius_m {
            return CriticalityRecord::baseline(partner);
        }
        let Some(scenario) = classify(&obs.ego, partner_state, tie_break) else {
            return CriticalityRecord::baseline(partner);
        };

        let toward = cut_in_direction(&obs.ego, partner_state);
        let maneuvers = scenario.maneuver_set(toward);
        if maneuvers.is_empty() {
            return CriticalityRecord {
                partner,
                scenario: Some(scenario),
                maneuver_challenges: vec![],
                criticality: 0.0,
            };
        }

        let maneuver_challenges: Vec<(Maneuver, f64)> = maneuvers
            .into_iter()
            .map(|m| (m, self.challenge(&obs.ego, partner_state, m).clamp(0.0, 1.0)))
            .collect();

        let criticality = maneuver_challenges
            .iter()
            .map(|&(m, c)| predicted.probability_of(m) * c)
            .sum::<f64>()
            .clamp(0.0, 1.0);

        CriticalityRecord {
            partner,
            scenario: Some(scenario),
            maneuver_challenges,
            criticality,
        }
    }

    /// One-step challenge of `maneuver` against the partner: project both
    /// vehicles over the projection horizon, then price the resulting gap
    /// and closing speed with the table the maneuver belongs to.
    fn challenge(&self, ego: &VehicleState, partner: &VehicleState, maneuver: Maneuver) -> f64 {
        let t = self.projection_secs;

        let (ego_accel, lateral) = match maneuver {
            Maneuver::Maintain => (ego.acceleration, false),
            Maneuver::Brake { decel } => (-decel, false),
            Maneuver::Accelerate { accel } => (accel, false),
            Maneuver::CutIn { .. } => (ego.acceleration, true),
        };

        let ego_speed = (ego.speed + ego_accel * t).max(0.0);
        let ego_pos = ego.lane_position + (ego.speed + ego_speed) * 0.5 * t;
        // Partner reacts naturalistically: constant current acceleration.
        let partner_speed = (partner.speed + partner.acceleration * t).max(0.0);
        let partner_pos = partner.lane_position + (partner.speed + partner_speed) * 0.5 * t;

        let (behind_pos, behind_speed, ahead_pos, ahead_speed, ahead_len) =
            if ego_pos <= partner_pos {
                (ego_pos, ego_speed, partner_pos, partner_speed, partner.length)
            } else {
                (partner_pos, partner_speed, ego_pos, ego_speed, ego.length)
            };
        let gap = (ahead_pos - behind_pos - ahead_len).max(0.0);
        let closing = behind_speed - ahead_speed;

        if lateral {
            self.tables.lane_change.lookup(gap, closing)
        } else {
            self.tables.car_following.lookup(gap, closing)
        }
    }
}
