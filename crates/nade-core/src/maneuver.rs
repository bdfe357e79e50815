//! Maneuver vocabulary shared across all decision-related crates.
//!
//! The same `Maneuver` atoms flow through the naturalistic decision model's
//! action-probability predictions, the criticality estimator's challenge
//! lookups, and the importance sampler's sampling distribution.  Keeping one
//! vocabulary in core means a sampled adversarial action and a predicted
//! naturalistic action are directly comparable.

/// Direction of a lateral (lane-change) maneuver, relative to driving direction.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LaneDirection {
    Left,
    Right,
}

impl LaneDirection {
    /// Signed lane-index delta: left is +1, right is −1.
    #[inline]
    pub fn lane_delta(self) -> i32 {
        match self {
            LaneDirection::Left => 1,
            LaneDirection::Right => -1,
        }
    }
}

/// One discrete maneuver an agent can be asked to perform for a step.
#[derive(Copy, Clone, PartialEq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Maneuver {
    /// Keep the current longitudinal/lateral plan (default state).
    #[default]
    Maintain,
    /// Decelerate at `decel` m/s² (positive magnitude).
    Brake { decel: f64 },
    /// Accelerate at `accel` m/s² (positive magnitude).
    Accelerate { accel: f64 },
    /// Change one lane toward `direction` within this action step.
    CutIn { direction: LaneDirection },
}

impl Maneuver {
    /// A hard brake at the standard emergency deceleration (4 m/s²).
    pub const HARD_BRAKE: Maneuver = Maneuver::Brake { decel: 4.0 };

    /// `true` for maneuvers that only the adversarial selector injects.
    #[inline]
    pub fn is_adversarial(self) -> bool {
        !matches!(self, Maneuver::Maintain)
    }

    /// `true` when both maneuvers are the same kind (ignoring magnitudes):
    /// a 3 m/s² brake and a 4 m/s² brake are both "brake".
    #[inline]
    pub fn same_kind(self, other: Maneuver) -> bool {
        self.as_str() == other.as_str()
    }

    /// Human-readable label, useful for CSV column values and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Maneuver::Maintain => "maintain",
            Maneuver::Brake { .. } => "brake",
            Maneuver::Accelerate { .. } => "accelerate",
            Maneuver::CutIn { direction: LaneDirection::Left } => "cut_in_left",
            Maneuver::CutIn { direction: LaneDirection::Right } => "cut_in_right",
        }
    }
}
