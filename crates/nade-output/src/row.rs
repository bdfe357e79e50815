//! Plain data row types written by the output files.

/// One vehicle's kinematics at one step (`fcd.csv` / `fcd_all.csv`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FcdRow {
    pub step:         u64,
    pub time_secs:    f64,
    pub agent_id:     u32,
    pub x:            f64,
    pub y:            f64,
    pub speed:        f64,
    pub acceleration: f64,
    pub heading:      f64,
    pub lane_index:   i32,
}

/// One agent's decision at one step (`traj.csv`).
#[derive(Debug, Clone, PartialEq)]
pub struct TrajRow {
    pub step:          u64,
    pub time_secs:     f64,
    pub agent_id:      u32,
    pub lane_position: f64,
    pub lane_index:    i32,
    pub speed:         f64,
    pub acceleration:  f64,
    /// Maneuver label of the action taken ("maintain", "brake", …).
    pub maneuver:      &'static str,
    /// Per-step likelihood ratio; 1 for naturalistic steps.
    pub weight:        f64,
}

/// One observed lane-index transition (`lc.csv`).
#[derive(Debug, Clone, PartialEq)]
pub struct LaneChangeRow {
    pub step:      u64,
    pub time_secs: f64,
    pub agent_id:  u32,
    pub from_lane: i32,
    pub to_lane:   i32,
    /// Maneuver label of the step the change was observed on.
    pub reason:    &'static str,
}

/// One colliding vehicle at removal time (`collision.csv`); a pair yields
/// two rows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionRow {
    pub step:          u64,
    pub time_secs:     f64,
    pub agent_id:      u32,
    pub partner_id:    u32,
    pub lane_index:    i32,
    pub lane_position: f64,
}
