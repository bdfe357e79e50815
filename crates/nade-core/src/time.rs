//! Simulation time model.
//!
//! # Design
//!
//! Time is represented as a monotonically increasing `Step` counter; the
//! mapping to simulated seconds is held in `StepClock`:
//!
//!   sim_time = step * step_length_secs
//!
//! The external engine advances in fixed increments of `step_length_secs`
//! (typically 0.1 s), while agent decisions are refreshed every
//! `action_step_secs` (an integer multiple of the step length, ≥ it).  Using
//! an integer step as the canonical unit keeps replay comparisons exact; the
//! fractional seconds are derived, never stored.

use std::fmt;

// ── Step ─────────────────────────────────────────────────────────────────────

/// An absolute simulation step counter.
///
/// Stored as `u64`: at 0.1 s per step a u64 lasts ~58 billion years, so
/// overflow is not a practical concern.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Step(pub u64);

impl Step {
    pub const ZERO: Step = Step(0);

    /// Return the step `n` increments after `self`.
    #[inline]
    pub fn offset(self, n: u64) -> Step {
        Step(self.0 + n)
    }

    /// Steps elapsed from `earlier` to `self`.
    ///
    /// # Panics
    /// Panics in debug mode if `earlier > self`.
    #[inline]
    pub fn since(self, earlier: Step) -> u64 {
        self.0 - earlier.0
    }
}

impl std::ops::Add<u64> for Step {
    type Output = Step;
    #[inline]
    fn add(self, rhs: u64) -> Step {
        Step(self.0 + rhs)
    }
}

impl std::ops::Sub for Step {
    type Output = u64;
    #[inline]
    fn sub(self, rhs: Step) -> u64 {
        self.0 - rhs.0
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{}", self.0)
    }
}

// ── StepClock ─────────────────────────────────────────────────────────────────

/// Converts between step counts and simulated seconds, and tracks the
/// action-step cadence.
///
/// `StepClock` is cheap to copy and intentionally holds no heap data.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StepClock {
    /// Simulated seconds per engine step (typically 0.1).
    pub step_length_secs: f64,
    /// Seconds between decision refreshes.  Must be ≥ `step_length_secs`.
    pub action_step_secs: f64,
    /// The current step — advanced by `StepClock::advance()` each iteration.
    pub current_step: Step,
}

impl StepClock {
    pub fn new(step_length_secs: f64, action_step_secs: f64) -> Self {
        Self {
            step_length_secs,
            action_step_secs,
            current_step: Step::ZERO,
        }
    }

    /// Advance the clock by one step.
    #[inline]
    pub fn advance(&mut self) {
        self.current_step = Step(self.current_step.0 + 1);
    }

    /// Elapsed simulated seconds since step 0.
    #[inline]
    pub fn sim_time_secs(&self) -> f64 {
        self.current_step.0 as f64 * self.step_length_secs
    }

    /// `true` when agent decisions should be refreshed this step.
    ///
    /// Step 0 is always an action step.  Comparison uses a half-step
    /// tolerance so that floating-point drift across, say, 0.1 s steps with
    /// a 0.5 s action cadence never skips or doubles a refresh.
    pub fn is_action_step(&self) -> bool {
        let ratio = (self.action_step_secs / self.step_length_secs).round().max(1.0) as u64;
        self.current_step.0 % ratio == 0
    }

    /// How many steps span `secs` simulated seconds (rounds up).
    #[inline]
    pub fn steps_for_secs(&self, secs: f64) -> u64 {
        (secs / self.step_length_secs).ceil() as u64
    }
}

impl fmt::Display for StepClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (t={:.2}s)", self.current_step, self.sim_time_secs())
    }
}
