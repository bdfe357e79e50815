//! `nade-core` — foundational types for the `nade-sim` traffic-testing framework.
//!
//! This crate is a dependency of every other `nade-*` crate.  It intentionally
//! has no `nade-*` dependencies and minimal external ones (only `rand` and
//! `thiserror`, plus optional `serde`).
//!
//! # What lives here
//!
//! | Module       | Contents                                                |
//! |--------------|---------------------------------------------------------|
//! | [`ids`]      | `AgentId`                                               |
//! | [`time`]     | `Step`, `StepClock`                                     |
//! | [`rng`]      | `AgentRng` (per-agent), `SimRng` (global)               |
//! | [`config`]   | `RunConfig`, `AdversityConfig`, `OutputKind`            |
//! | [`state`]    | `VehicleState`, `TrafficLightState`, relative geometry  |
//! | [`maneuver`] | `Maneuver`, `LaneDirection`                             |
//! | [`error`]    | `CoreError`, `CoreResult`                               |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types.        |

pub mod config;
pub mod error;
pub mod ids;
pub mod maneuver;
pub mod rng;
pub mod state;
pub mod time;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use config::{AdversityConfig, OutputKind, RunConfig, TieBreakPolicy, DATA_DIR_ENV};
pub use error::{CoreError, CoreResult};
pub use ids::{AgentId, AgentKind};
pub use maneuver::{LaneDirection, Maneuver};
pub use rng::{AgentRng, SimRng};
pub use state::{TrafficLightState, VehicleState};
pub use time::{Step, StepClock};
