//! Offline challenge tables.
//!
//! A challenge table maps a relative state — bumper gap and closing speed —
//! to the learned one-step probability that the configuration escalates to
//! a crash-level event.  Tables are precomputed offline; this module only
//! loads and interpolates them.
//!
//! File layout: `<data_dir>/car_following.csv` and
//! `<data_dir>/lane_change.csv`, columns `gap_m,range_rate_mps,challenge`,
//! one row per grid cell on a regular (gap × rate) grid.  The data
//! directory is resolved from the `NADE_DATA_DIR` environment variable with
//! a configured/relative fallback; when no files are present the builtin
//! grid is used.

use std::path::Path;

use tracing::{debug, info};

use crate::{AdversityError, AdversityResult};

/// A 2-D binned lookup over (gap, range rate).
///
/// Lookups clamp to the nearest bin, so out-of-range states saturate at the
/// table edges rather than extrapolate.
#[derive(Clone, Debug)]
pub struct ChallengeTable {
    /// Ascending lower edges of the gap bins, metres.
    gap_bins: Vec<f64>,
    /// Ascending lower edges of the closing-speed bins, m/s.
    rate_bins: Vec<f64>,
    /// `values[gap_idx][rate_idx]`, each in [0, 1].
    values: Vec<Vec<f64>>,
}

impl ChallengeTable {
    /// Build from explicit bins.  Values are clamped into [0, 1].
    pub fn new(gap_bins: Vec<f64>, rate_bins: Vec<f64>, values: Vec<Vec<f64>>) -> AdversityResult<Self> {
        if gap_bins.is_empty() || rate_bins.is_empty() {
            return Err(AdversityError::Table("empty bin axis".into()));
        }
        if values.len() != gap_bins.len() || values.iter().any(|row| row.len() != rate_bins.len()) {
            return Err(AdversityError::Table(format!(
                "value grid {}x{} does not match bins {}x{}",
                values.len(),
                values.first().map_or(0, Vec::len),
                gap_bins.len(),
                rate_bins.len()
            )));
        }
        let values = values
            .into_iter()
            .map(|row| row.into_iter().map(|v| v.clamp(0.0, 1.0)).collect())
            .collect();
        Ok(Self { gap_bins, rate_bins, values })
    }

    /// Load one table from a CSV of `gap_m,range_rate_mps,challenge` rows.
    pub fn load(path: &Path) -> AdversityResult<Self> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut rows: Vec<(f64, f64, f64)> = Vec::new();
        for record in reader.records() {
            let record = record?;
            let parse = |i: usize| -> AdversityResult<f64> {
                record
                    .get(i)
                    .and_then(|s| s.trim().parse().ok())
                    .ok_or_else(|| {
                        AdversityError::Table(format!("bad field {i} in {}", path.display()))
                    })
            };
            rows.push((parse(0)?, parse(1)?, parse(2)?));
        }
        if rows.is_empty() {
            return Err(AdversityError::Table(format!("{} has no rows", path.display())));
        }

        let mut gap_bins: Vec<f64> = rows.iter().map(|r| r.0).collect();
        gap_bins.sort_by(f64::total_cmp);
        gap_bins.dedup();
        let mut rate_bins: Vec<f64> = rows.iter().map(|r| r.1).collect();
        rate_bins.sort_by(f64::total_cmp);
        rate_bins.dedup();

        let mut values = vec![vec![0.0; rate_bins.len()]; gap_bins.len()];
        for (gap, rate, value) in rows {
            let gi = gap_bins.partition_point(|&b| b < gap).min(gap_bins.len() - 1);
            let ri = rate_bins.partition_point(|&b| b < rate).min(rate_bins.len() - 1);
            values[gi][ri] = value;
        }
        Self::new(gap_bins, rate_bins, values)
    }

    /// Challenge for a relative state, clamped to the grid.
    pub fn lookup(&self, gap_m: f64, range_rate_mps: f64) -> f64 {
        let gi = bin_index(&self.gap_bins, gap_m);
        let ri = bin_index(&self.rate_bins, range_rate_mps);
        self.values[gi][ri]
    }
}

/// Index of the bin whose lower edge is the greatest one ≤ `value`
/// (saturating at both ends).
fn bin_index(bins: &[f64], value: f64) -> usize {
    match bins.partition_point(|&b| b <= value) {
        0 => 0,
        n => n - 1,
    }
}

/// The pair of tables the criticality estimator composes.
#[derive(Clone, Debug)]
pub struct ChallengeTables {
    pub car_following: ChallengeTable,
    pub lane_change: ChallengeTable,
}

impl ChallengeTables {
    /// Load both tables from `dir`, falling back to the builtin grids for
    /// any file that is absent.
    pub fn load(dir: &Path) -> AdversityResult<Self> {
        let load_or_builtin = |name: &str, builtin: fn() -> ChallengeTable| {
            let path = dir.join(name);
            if path.is_file() {
                info!(path = %path.display(), "loading challenge table");
                ChallengeTable::load(&path)
            } else {
                debug!(path = %path.display(), "challenge table file absent, using builtin");
                Ok(builtin())
            }
        };
        Ok(Self {
            car_following: load_or_builtin("car_following.csv", builtin_car_following)?,
            lane_change: load_or_builtin("lane_change.csv", builtin_lane_change)?,
        })
    }

    /// The builtin precomputed grids — usable without any data directory.
    pub fn builtin() -> Self {
        Self {
            car_following: builtin_car_following(),
            lane_change: builtin_lane_change(),
        }
    }
}

// Builtin grids: gap edges 0/5/10/20/40/80 m, closing-speed edges
// −5/0/2/5/10 m/s.  Challenge rises as the gap shrinks and closing speed
// grows; separating pairs (negative rate) carry negligible challenge.

fn builtin_car_following() -> ChallengeTable {
    ChallengeTable::new(
        vec![0.0, 5.0, 10.0, 20.0, 40.0, 80.0],
        vec![-5.0, 0.0, 2.0, 5.0, 10.0],
        vec![
            vec![0.05, 0.30, 0.60, 0.85, 0.98],
            vec![0.01, 0.10, 0.30, 0.60, 0.90],
            vec![0.002, 0.03, 0.12, 0.35, 0.70],
            vec![0.0005, 0.008, 0.04, 0.15, 0.40],
            vec![0.0001, 0.002, 0.01, 0.05, 0.18],
            vec![0.0, 0.0005, 0.002, 0.01, 0.05],
        ],
    )
    .expect("builtin car-following grid is well-formed")
}

fn builtin_lane_change() -> ChallengeTable {
    ChallengeTable::new(
        vec![0.0, 5.0, 10.0, 20.0, 40.0, 80.0],
        vec![-5.0, 0.0, 2.0, 5.0, 10.0],
        vec![
            vec![0.10, 0.40, 0.70, 0.90, 0.99],
            vec![0.03, 0.15, 0.40, 0.70, 0.92],
            vec![0.008, 0.05, 0.18, 0.45, 0.75],
            vec![0.002, 0.015, 0.06, 0.20, 0.45],
            vec![0.0005, 0.004, 0.015, 0.07, 0.20],
            vec![0.0001, 0.001, 0.004, 0.02, 0.07],
        ],
    )
    .expect("builtin lane-change grid is well-formed")
}
