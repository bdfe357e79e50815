//! CSV output backend.
//!
//! One file per selected output kind, named `<kind>.csv` in the output
//! directory, plus an unconditional one-row `termination.csv` summary.

use std::fs::File;
use std::path::Path;

use csv::Writer;
use nade_core::OutputKind;
use nade_sim::TerminationReport;

use crate::row::{CollisionRow, FcdRow, LaneChangeRow, TrajRow};
use crate::OutputResult;

const FCD_HEADER: [&str; 9] = [
    "step", "time_secs", "agent_id", "x", "y", "speed", "acceleration", "heading", "lane_index",
];

/// Writes experiment output to per-kind CSV files.
pub struct CsvOutputWriter {
    fcd:         Option<Writer<File>>,
    fcd_all:     Option<Writer<File>>,
    traj:        Option<Writer<File>>,
    lane_change: Option<Writer<File>>,
    collision:   Option<Writer<File>>,
    termination: Writer<File>,
    finished:    bool,
}

impl CsvOutputWriter {
    /// Open (or create) one file per kind in `dir` and write the headers.
    /// The directory is created if absent.
    pub fn new(dir: &Path, kinds: &[OutputKind]) -> OutputResult<Self> {
        std::fs::create_dir_all(dir)?;

        let open = |kind: OutputKind, header: &[&str]| -> OutputResult<Option<Writer<File>>> {
            if !kinds.contains(&kind) {
                return Ok(None);
            }
            let mut writer = Writer::from_path(dir.join(format!("{}.csv", kind.as_str())))?;
            writer.write_record(header)?;
            Ok(Some(writer))
        };

        let fcd = open(OutputKind::Fcd, &FCD_HEADER)?;
        let fcd_all = open(OutputKind::FcdAll, &FCD_HEADER)?;
        let traj = open(
            OutputKind::Traj,
            &[
                "step", "time_secs", "agent_id", "lane_position", "lane_index", "speed",
                "acceleration", "maneuver", "weight",
            ],
        )?;
        let lane_change = open(
            OutputKind::LaneChange,
            &["step", "time_secs", "agent_id", "from_lane", "to_lane", "reason"],
        )?;
        let collision = open(
            OutputKind::Collision,
            &["step", "time_secs", "agent_id", "partner_id", "lane_index", "lane_position"],
        )?;

        let mut termination = Writer::from_path(dir.join("termination.csv"))?;
        termination.write_record([
            "reason",
            "steps",
            "offending_agents",
            "final_log_weight",
            "final_weight",
            "agent_faults",
        ])?;

        Ok(Self {
            fcd,
            fcd_all,
            traj,
            lane_change,
            collision,
            termination,
            finished: false,
        })
    }

    pub fn write_fcd(&mut self, rows: &[FcdRow]) -> OutputResult<()> {
        Self::write_fcd_rows(&mut self.fcd, rows)
    }

    pub fn write_fcd_all(&mut self, rows: &[FcdRow]) -> OutputResult<()> {
        Self::write_fcd_rows(&mut self.fcd_all, rows)
    }

    fn write_fcd_rows(writer: &mut Option<Writer<File>>, rows: &[FcdRow]) -> OutputResult<()> {
        let Some(writer) = writer else { return Ok(()) };
        for row in rows {
            writer.write_record(&[
                row.step.to_string(),
                row.time_secs.to_string(),
                row.agent_id.to_string(),
                row.x.to_string(),
                row.y.to_string(),
                row.speed.to_string(),
                row.acceleration.to_string(),
                row.heading.to_string(),
                row.lane_index.to_string(),
            ])?;
        }
        Ok(())
    }

    pub fn write_traj(&mut self, rows: &[TrajRow]) -> OutputResult<()> {
        let Some(writer) = &mut self.traj else { return Ok(()) };
        for row in rows {
            writer.write_record(&[
                row.step.to_string(),
                row.time_secs.to_string(),
                row.agent_id.to_string(),
                row.lane_position.to_string(),
                row.lane_index.to_string(),
                row.speed.to_string(),
                row.acceleration.to_string(),
                row.maneuver.to_string(),
                row.weight.to_string(),
            ])?;
        }
        Ok(())
    }

    pub fn write_lane_changes(&mut self, rows: &[LaneChangeRow]) -> OutputResult<()> {
        let Some(writer) = &mut self.lane_change else { return Ok(()) };
        for row in rows {
            writer.write_record(&[
                row.step.to_string(),
                row.time_secs.to_string(),
                row.agent_id.to_string(),
                row.from_lane.to_string(),
                row.to_lane.to_string(),
                row.reason.to_string(),
            ])?;
        }
        Ok(())
    }

    pub fn write_collisions(&mut self, rows: &[CollisionRow]) -> OutputResult<()> {
        let Some(writer) = &mut self.collision else { return Ok(()) };
        for row in rows {
            writer.write_record(&[
                row.step.to_string(),
                row.time_secs.to_string(),
                row.agent_id.to_string(),
                row.partner_id.to_string(),
                row.lane_index.to_string(),
                row.lane_position.to_string(),
            ])?;
        }
        Ok(())
    }

    /// Write the summary row and flush every open file.  Idempotent.
    pub fn finish(&mut self, report: &TerminationReport) -> OutputResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;

        let offenders = report
            .offending_agents
            .iter()
            .map(|a| a.0.to_string())
            .collect::<Vec<_>>()
            .join(";");
        self.termination.write_record(&[
            report.reason.as_str().to_string(),
            report.steps.to_string(),
            offenders,
            report.final_log_weight.to_string(),
            report.final_weight.to_string(),
            report.agent_faults.len().to_string(),
        ])?;

        for writer in [
            &mut self.fcd,
            &mut self.fcd_all,
            &mut self.traj,
            &mut self.lane_change,
            &mut self.collision,
        ]
        .into_iter()
        .filter_map(|w| w.as_mut())
        {
            writer.flush()?;
        }
        self.termination.flush()?;
        Ok(())
    }
}
