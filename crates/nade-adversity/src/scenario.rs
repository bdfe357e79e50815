//! Relative-configuration scenario classes.
//!
//! Every (focal, partner) pair inside the interaction radius falls into
//! exactly one class; the class fixes which adversarial maneuvers are
//! meaningful for the pair and which challenge table prices them.

use nade_core::{LaneDirection, Maneuver, TieBreakPolicy, VehicleState};

/// The fixed, exhaustive set of relative configurations.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ScenarioClass {
    /// Partner ahead in the focal vehicle's lane.
    LeadSameLane,
    /// Partner ahead in an adjacent lane.
    LeadAdjacentLane,
    /// Partner behind in the focal vehicle's lane.
    FollowSameLane,
    /// Partner behind in an adjacent lane.
    FollowAdjacentLane,
    /// Partner laterally alongside (longitudinal overlap) — no adversarial
    /// maneuver is defined here.
    BlindSpot,
}

impl ScenarioClass {
    /// The adversarial maneuvers meaningful for the focal vehicle in this
    /// configuration.  `cut_in_toward` is the direction from the focal lane
    /// toward the partner's lane (only meaningful for adjacent classes).
    pub fn maneuver_set(self, cut_in_toward: Option<LaneDirection>) -> Vec<Maneuver> {
        match self {
            // Same-lane lead: the interesting focal behaviours are
            // longitudinal.
            ScenarioClass::LeadSameLane => vec![Maneuver::Maintain, Maneuver::HARD_BRAKE],
            // Adjacent lead: braking still matters, and cutting toward the
            // partner's lane creates the lane-change conflict.
            ScenarioClass::LeadAdjacentLane | ScenarioClass::FollowAdjacentLane => {
                let mut set = vec![Maneuver::Maintain, Maneuver::HARD_BRAKE];
                if let Some(direction) = cut_in_toward {
                    set.push(Maneuver::CutIn { direction });
                }
                set
            }
            // Same-lane follower: a hard brake by the focal vehicle is the
            // classic rear-end challenge.
            ScenarioClass::FollowSameLane => vec![Maneuver::Maintain, Maneuver::HARD_BRAKE],
            ScenarioClass::BlindSpot => vec![],
        }
    }
}

/// Longitudinal overlap fraction below which a lateral neighbour still
/// counts as lead/follow rather than blind spot.
const BLIND_SPOT_OVERLAP_M: f64 = 2.0;

/// Classify the (focal, partner) relative configuration.
///
/// Returns `None` when the pair is more than one lane apart — such pairs
/// are outside the decomposed scenario set entirely.
///
/// A partner that straddles a lane boundary (lateral offset beyond half its
/// width) with the same integer lane index is resolved by `tie_break`: the
/// boundary condition is a policy parameter, not an inferred behaviour.
pub fn classify(
    focal: &VehicleState,
    partner: &VehicleState,
    tie_break: TieBreakPolicy,
) -> Option<ScenarioClass> {
    let mut lane_delta = focal.lane_delta(partner);

    // Lane-straddle tie-break: integer indices agree but the partner's
    // lateral position says it is mostly out of its lane.
    if lane_delta == 0 && partner.lateral_offset.abs() > partner.length.min(2.0) / 2.0 * 0.8 {
        if tie_break == TieBreakPolicy::AdjacentLane {
            lane_delta = if partner.lateral_offset > 0.0 { 1 } else { -1 };
        }
    }

    if lane_delta.abs() > 1 {
        return None;
    }

    let longitudinal = partner.lane_position - focal.lane_position;
    let ahead = longitudinal > BLIND_SPOT_OVERLAP_M;
    let behind = longitudinal < -BLIND_SPOT_OVERLAP_M;

    Some(match (lane_delta, ahead, behind) {
        (0, true, _) => ScenarioClass::LeadSameLane,
        (0, _, true) => ScenarioClass::FollowSameLane,
        // Same lane with longitudinal overlap only happens during a crash;
        // treat as blind spot (no maneuver set) rather than invent one.
        (0, false, false) => ScenarioClass::BlindSpot,
        (_, true, _) => ScenarioClass::LeadAdjacentLane,
        (_, _, true) => ScenarioClass::FollowAdjacentLane,
        (_, false, false) => ScenarioClass::BlindSpot,
    })
}

/// Direction from the focal vehicle's lane toward the partner's lane, if
/// they differ by exactly one lane.
pub fn cut_in_direction(focal: &VehicleState, partner: &VehicleState) -> Option<LaneDirection> {
    match focal.lane_delta(partner) {
        1 => Some(LaneDirection::Left),
        -1 => Some(LaneDirection::Right),
        _ => None,
    }
}
