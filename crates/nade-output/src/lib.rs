//! `nade-output` — experiment output files for the nade-sim framework.
//!
//! One CSV file per selected [`nade_core::OutputKind`], plus a one-row
//! `termination.csv` summary for every run:
//!
//! | Kind       | File             | Contents                                 |
//! |------------|------------------|------------------------------------------|
//! | `Fcd`      | `fcd.csv`        | kinematics near the focal vehicle        |
//! | `FcdAll`   | `fcd_all.csv`    | kinematics of every live vehicle         |
//! | `Traj`     | `traj.csv`       | per-agent maneuver and weight per step   |
//! | `LaneChange` | `lc.csv`       | observed lane-index transitions          |
//! | `Collision` | `collision.csv` | colliding agents at removal time         |
//!
//! [`OutputExtractor`] implements `nade_sim::InfoExtractor`; write errors
//! are stashed internally (the hooks have no return value) and surfaced via
//! [`OutputExtractor::take_error`] after the run.

pub mod csv;
pub mod error;
pub mod extractor;
pub mod row;


pub use csv::CsvOutputWriter;
pub use error::{OutputError, OutputResult};
pub use extractor::OutputExtractor;
pub use row::{CollisionRow, FcdRow, LaneChangeRow, TrajRow};
