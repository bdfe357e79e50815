//! Run configuration.
//!
//! The configuration is constructed once by the application (typically from
//! a TOML/JSON file via the `serde` feature) and passed by reference to
//! every component that needs it.  No component reads ambient global state;
//! the single environment-variable lookup ([`AdversityConfig::resolve_data_dir`])
//! is explicit and happens exactly once, at table-load time.

use std::path::PathBuf;

use crate::error::{CoreError, CoreResult};

/// Environment variable naming the directory holding the offline challenge
/// and probability tables.  Falls back to the configured `data_dir`, then to
/// the relative default `./data`.
pub const DATA_DIR_ENV: &str = "NADE_DATA_DIR";

/// Output kinds the scheduler can be asked to produce.  Each kind maps to
/// one file with a fixed record schema.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum OutputKind {
    /// Floating-car data for agents near the vehicle under test.
    Fcd,
    /// Floating-car data for every live agent.
    FcdAll,
    /// Per-step trajectory records including maneuver and weight.
    Traj,
    /// Lane-change events.
    LaneChange,
    /// Collision events.
    Collision,
}

impl OutputKind {
    /// File stem used by the CSV backend (`<stem>.csv`).
    pub fn as_str(self) -> &'static str {
        match self {
            OutputKind::Fcd => "fcd",
            OutputKind::FcdAll => "fcd_all",
            OutputKind::Traj => "traj",
            OutputKind::LaneChange => "lc",
            OutputKind::Collision => "collision",
        }
    }
}

/// How to classify a partner vehicle that straddles a lane boundary
/// (lateral offset beyond half its width while the integer lane index still
/// matches the focal vehicle's).
///
/// The underlying scenario decomposition leaves this boundary condition
/// open, so it is an explicit, testable policy rather than an inferred
/// tie-break.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TieBreakPolicy {
    /// Treat a straddling partner as same-lane (conservative: hard-brake
    /// challenges still apply).
    #[default]
    SameLane,
    /// Treat a straddling partner as already in the adjacent lane.
    AdjacentLane,
}

/// Parameters of the adversarial decision engine.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AdversityConfig {
    /// Criticality above which a partner becomes an adversarial candidate.
    pub activation_threshold: f64,
    /// Radius within which partner vehicles are considered, in metres.
    pub interaction_radius_m: f64,
    /// Minimum probability assigned to every sampling-distribution entry,
    /// so no likelihood ratio is ever undefined.
    pub floor_probability: f64,
    /// Tolerance for the sum-to-1 invariant on probability distributions.
    pub probability_tolerance: f64,
    /// Lane-straddle classification policy.
    pub tie_break: TieBreakPolicy,
    /// Directory holding offline challenge tables.  Overridden by the
    /// `NADE_DATA_DIR` environment variable when set.
    pub data_dir: Option<PathBuf>,
}

impl Default for AdversityConfig {
    fn default() -> Self {
        Self {
            activation_threshold: 1e-4,
            interaction_radius_m: 120.0,
            floor_probability: 1e-4,
            probability_tolerance: 1e-6,
            tie_break: TieBreakPolicy::SameLane,
            data_dir: None,
        }
    }
}

impl AdversityConfig {
    /// Resolve the challenge-table directory: env var, then config, then
    /// the default relative path.
    pub fn resolve_data_dir(&self) -> PathBuf {
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            return PathBuf::from(dir);
        }
        self.data_dir.clone().unwrap_or_else(|| PathBuf::from("./data"))
    }

    fn validate(&self) -> CoreResult<()> {
        if !(self.activation_threshold.is_finite() && self.activation_threshold >= 0.0) {
            return Err(CoreError::Config(format!(
                "activation_threshold must be finite and non-negative, got {}",
                self.activation_threshold
            )));
        }
        if self.interaction_radius_m <= 0.0 {
            return Err(CoreError::Config(format!(
                "interaction_radius_m must be positive, got {}",
                self.interaction_radius_m
            )));
        }
        if !(self.floor_probability > 0.0 && self.floor_probability < 1.0) {
            return Err(CoreError::Config(format!(
                "floor_probability must be in (0, 1), got {}",
                self.floor_probability
            )));
        }
        if self.probability_tolerance <= 0.0 {
            return Err(CoreError::Config(
                "probability_tolerance must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Top-level run configuration, consumed (not owned) by the core components.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RunConfig {
    /// Road-network file handed to the external engine.
    pub network_path: PathBuf,
    /// Demand/route configuration file handed to the external engine.
    pub demand_path: PathBuf,
    /// Simulated seconds per engine step.
    pub step_length_secs: f64,
    /// Seconds between decision refreshes.  Must be ≥ `step_length_secs`.
    pub action_step_secs: f64,
    /// Bound on retries for transient connector failures.
    pub max_connect_attempts: u32,
    /// Enable the engine's sublane model.
    pub sublane: bool,
    /// Ask the engine to run with its GUI attached.
    pub gui: bool,
    /// Directory for experiment output files.
    pub output_path: PathBuf,
    /// Which output files to produce.
    pub output_kinds: Vec<OutputKind>,
    /// Master RNG seed.  The same seed always produces identical results.
    pub seed: u64,
    /// Horizon: maximum number of engine steps before the run terminates.
    pub max_steps: u64,
    /// Adversarial decision-engine parameters.
    pub adversity: AdversityConfig,
}

impl RunConfig {
    /// Check cross-field invariants.  Call once before constructing the
    /// scheduler; all later code may assume a valid configuration.
    pub fn validate(&self) -> CoreResult<()> {
        if self.step_length_secs <= 0.0 {
            return Err(CoreError::Config(format!(
                "step_length_secs must be positive, got {}",
                self.step_length_secs
            )));
        }
        if self.action_step_secs + 1e-12 < self.step_length_secs {
            return Err(CoreError::Config(format!(
                "action_step_secs ({}) must be >= step_length_secs ({})",
                self.action_step_secs, self.step_length_secs
            )));
        }
        if self.max_connect_attempts == 0 {
            return Err(CoreError::Config(
                "max_connect_attempts must be at least 1".into(),
            ));
        }
        if self.max_steps == 0 {
            return Err(CoreError::Config("max_steps must be at least 1".into()));
        }
        self.adversity.validate()
    }

    /// Construct a [`StepClock`](crate::StepClock) pre-configured for this run.
    pub fn make_clock(&self) -> crate::StepClock {
        crate::StepClock::new(self.step_length_secs, self.action_step_secs)
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            network_path: PathBuf::from("network.net.xml"),
            demand_path: PathBuf::from("demand.rou.xml"),
            step_length_secs: 0.1,
            action_step_secs: 0.1,
            max_connect_attempts: 10,
            sublane: false,
            gui: false,
            output_path: PathBuf::from("./output"),
            output_kinds: vec![],
            seed: 0,
            max_steps: 36_000,
            adversity: AdversityConfig::default(),
        }
    }
}
