//! Naturalistic car-following (IDM) and lane-change (MOBIL) decision model.
//!
//! - Longitudinal: the Intelligent Driver Model computes an acceleration
//!   from the gap and closing speed to the leader.
//! - Lateral: a MOBIL-style gate changes lane when the acceleration gain
//!   exceeds a threshold and the imposed braking on the new follower stays
//!   within the safety limit.
//!
//! The model is deterministic in the observation; the injected RNG is only
//! consumed when `stochastic` is enabled (acceleration jitter).  It also
//! serves as the naturalistic action-probability predictor: a softmax over
//! maneuver incentives whose output always sums to 1.

use nade_core::{AgentRng, LaneDirection, Maneuver, VehicleState};

use crate::decision::{ControlCommand, DecisionError, DecisionInfo, DecisionModel};
use crate::Observation;

// Longitudinal policy parameters.
const COMFORT_ACC_MAX: f64 = 2.0; // [m/s²]
const COMFORT_ACC_MIN: f64 = -4.0; // [m/s²]
const DISTANCE_WANTED: f64 = 5.0; // [m]
const TIME_WANTED: f64 = 1.5; // [s]
const DESIRED_VELOCITY: f64 = 35.0; // [m/s]
const DELTA: f64 = 4.0;

// Lateral policy parameters.
const POLITENESS: f64 = 0.0; // in [0, 1]
const LANE_CHANGE_MIN_ACC_GAIN: f64 = 0.1; // [m/s²]
const LANE_CHANGE_MAX_BRAKING_IMPOSED: f64 = 4.0; // [m/s²]

/// Sharpness of the incentive-to-probability softmax.
const SOFTMAX_BETA: f64 = 1.5;

/// The naturalistic IDM + MOBIL decision model for background vehicles.
pub struct IdmModel {
    /// Enable MOBIL lane-change decisions (otherwise longitudinal only).
    pub lane_change: bool,
    /// Add uniform jitter to the commanded acceleration.
    pub stochastic: bool,
}

impl Default for IdmModel {
    fn default() -> Self {
        Self { lane_change: true, stochastic: false }
    }
}

impl IdmModel {
    /// IDM acceleration for `ego` given an optional leader, clamped to the
    /// comfort envelope.
    pub fn idm_acceleration(ego: &VehicleState, leader: Option<&VehicleState>) -> f64 {
        let free = COMFORT_ACC_MAX * (1.0 - (ego.speed / DESIRED_VELOCITY).powf(DELTA));
        let acc = match leader {
            None => free,
            Some(lead) => {
                let gap = ego.gap_to(lead).max(0.1);
                let closing = ego.speed - lead.speed;
                let desired_gap = DISTANCE_WANTED
                    + ego.speed * TIME_WANTED
                    + ego.speed * closing / (2.0 * (COMFORT_ACC_MAX * -COMFORT_ACC_MIN).sqrt());
                free - COMFORT_ACC_MAX * (desired_gap.max(0.0) / gap).powi(2)
            }
        };
        acc.clamp(COMFORT_ACC_MIN, COMFORT_ACC_MAX)
    }

    /// MOBIL incentive for changing toward `direction`: the ego acceleration
    /// gain minus the politeness-weighted burden on the new follower.
    /// `None` if the change is unsafe.
    fn mobil_incentive(&self, obs: &Observation, direction: LaneDirection) -> Option<f64> {
        let (new_leader, new_follower) = match direction {
            LaneDirection::Left => (&obs.left_leader, &obs.left_follower),
            LaneDirection::Right => (&obs.right_leader, &obs.right_follower),
        };

        // Safety: the new follower must not be forced to brake beyond the limit.
        if let Some((_, follower)) = new_follower {
            let imposed = Self::idm_acceleration(follower, Some(&obs.ego));
            if imposed < -LANE_CHANGE_MAX_BRAKING_IMPOSED {
                return None;
            }
        }

        let current = Self::idm_acceleration(&obs.ego, obs.leader.as_ref().map(|(_, s)| s));
        let after = Self::idm_acceleration(&obs.ego, new_leader.as_ref().map(|(_, s)| s));

        let follower_burden = match new_follower {
            Some((_, follower)) => {
                let before = Self::idm_acceleration(follower, new_leader.as_ref().map(|(_, s)| s));
                let after_change = Self::idm_acceleration(follower, Some(&obs.ego));
                before - after_change
            }
            None => 0.0,
        };

        Some(after - current - POLITENESS * follower_burden)
    }

    /// Naturalistic probabilities over the discrete maneuver set.
    ///
    /// A softmax over maneuver incentives: maintaining tracks the IDM
    /// acceleration, braking gains mass as the situation demands harder
    /// deceleration, cut-ins track their MOBIL incentive (zero probability
    /// when unsafe).  The returned pairs always sum to 1.
    pub fn action_probabilities(&self, obs: &Observation) -> Vec<(Maneuver, f64)> {
        let idm_acc = Self::idm_acceleration(&obs.ego, obs.leader.as_ref().map(|(_, s)| s));

        // Incentive scale: maintain is the reference at 0.
        let mut utilities: Vec<(Maneuver, f64)> = vec![(Maneuver::Maintain, 0.0)];
        // Braking utility grows as IDM itself calls for deceleration.
        utilities.push((Maneuver::HARD_BRAKE, -2.0 + (-idm_acc).max(0.0)));
        if self.lane_change {
            for direction in [LaneDirection::Left, LaneDirection::Right] {
                if let Some(gain) = self.mobil_incentive(obs, direction) {
                    utilities.push((Maneuver::CutIn { direction }, -2.0 + gain.min(4.0)));
                }
            }
        }

        let max_u = utilities.iter().map(|(_, u)| *u).fold(f64::NEG_INFINITY, f64::max);
        let weights: Vec<f64> = utilities
            .iter()
            .map(|(_, u)| (SOFTMAX_BETA * (u - max_u)).exp())
            .collect();
        let total: f64 = weights.iter().sum();
        utilities
            .into_iter()
            .zip(weights)
            .map(|((m, _), w)| (m, w / total))
            .collect()
    }
}

impl DecisionModel for IdmModel {
    fn decide(
        &self,
        obs: &Observation,
        rng: &mut AgentRng,
    ) -> Result<(ControlCommand, DecisionInfo), DecisionError> {
        // Lateral first: a sufficiently attractive and safe lane change
        // preempts the longitudinal command for this action step.
        if self.lane_change {
            let mut best: Option<(LaneDirection, f64)> = None;
            for direction in [LaneDirection::Left, LaneDirection::Right] {
                if let Some(gain) = self.mobil_incentive(obs, direction) {
                    if gain > LANE_CHANGE_MIN_ACC_GAIN
                        && best.map_or(true, |(_, g)| gain > g)
                    {
                        best = Some((direction, gain));
                    }
                }
            }
            if let Some((direction, _)) = best {
                let maneuver = Maneuver::CutIn { direction };
                return Ok((
                    ControlCommand::Maneuver(maneuver),
                    DecisionInfo::naturalistic(maneuver),
                ));
            }
        }

        let mut acc = Self::idm_acceleration(&obs.ego, obs.leader.as_ref().map(|(_, s)| s));
        if self.stochastic {
            acc = (acc + rng.gen_range(-0.2..0.2)).clamp(COMFORT_ACC_MIN, COMFORT_ACC_MAX);
        }
        let cmd = ControlCommand::SetAcceleration(acc);
        let maneuver = cmd.maneuver();
        Ok((cmd, DecisionInfo::naturalistic(maneuver)))
    }
}
