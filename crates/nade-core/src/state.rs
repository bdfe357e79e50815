//! Kinematic agent state as reported by the external engine.
//!
//! `VehicleState` carries exactly the fields the step-control protocol
//! exposes per vehicle (position, speed, acceleration, heading, lane) plus
//! the relative-geometry helpers the scenario classifier and the
//! challenge-table lookups are built on.  States are pulled fresh from the
//! engine every step and never cached across steps.

/// One vehicle's kinematic state at a single step.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VehicleState {
    /// Cartesian position in metres (engine network frame).
    pub position: (f64, f64),
    /// Longitudinal speed in m/s.
    pub speed: f64,
    /// Longitudinal acceleration in m/s².
    pub acceleration: f64,
    /// Heading in degrees (engine convention: 0 = north, clockwise).
    pub heading_deg: f64,
    /// Lane index on the current edge (0 = rightmost).
    pub lane_index: i32,
    /// Distance along the current lane in metres.
    pub lane_position: f64,
    /// Lateral offset from the lane centreline in metres (sublane model).
    pub lateral_offset: f64,
    /// Vehicle length in metres (bumper to bumper).
    pub length: f64,
}

impl VehicleState {
    /// Bumper-to-bumper gap to a vehicle ahead on the same road, in metres.
    ///
    /// Negative means overlap — the pair is in collision.
    #[inline]
    pub fn gap_to(&self, lead: &VehicleState) -> f64 {
        lead.lane_position - self.lane_position - lead.length
    }

    /// Closing speed toward `other`: positive when this vehicle is gaining
    /// on a vehicle ahead (or `other` is gaining on this one from behind).
    #[inline]
    pub fn range_rate(&self, other: &VehicleState) -> f64 {
        if self.is_behind(other) {
            self.speed - other.speed
        } else {
            other.speed - self.speed
        }
    }

    /// `true` if `self` is longitudinally behind `other`.
    #[inline]
    pub fn is_behind(&self, other: &VehicleState) -> bool {
        self.lane_position < other.lane_position
    }

    /// Signed lane-index difference `other − self`.
    #[inline]
    pub fn lane_delta(&self, other: &VehicleState) -> i32 {
        other.lane_index - self.lane_index
    }

    /// Euclidean centre-to-centre distance in metres.
    #[inline]
    pub fn distance_to(&self, other: &VehicleState) -> f64 {
        let dx = other.position.0 - self.position.0;
        let dy = other.position.1 - self.position.1;
        (dx * dx + dy * dy).sqrt()
    }
}

impl Default for VehicleState {
    fn default() -> Self {
        Self {
            position: (0.0, 0.0),
            speed: 0.0,
            acceleration: 0.0,
            heading_deg: 90.0,
            lane_index: 0,
            lane_position: 0.0,
            lateral_offset: 0.0,
            length: 5.0,
        }
    }
}

/// A traffic light's state at a single step.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrafficLightState {
    /// Engine phase string, one char per controlled link ('r', 'y', 'g', 'G').
    pub phase: String,
}
