//! highway — smallest example for the nade-sim framework.
//!
//! Runs a platoon of 8 vehicles on a synthetic 2-lane highway segment,
//! first naturalistically and then with the adversarial decision engine,
//! and prints both termination reports side by side.  Swap `MemoryEngine`
//! for a real microscopic-simulator connector to run against an actual
//! road network.
//!
//! Run with:
//!   cargo run -p highway --release

use std::time::Instant;

use anyhow::Result;

use nade_agent::DefaultVehicleFactory;
use nade_core::{AgentId, OutputKind, RunConfig, SimRng, VehicleState};
use nade_engine::MemoryEngine;
use nade_output::OutputExtractor;
use nade_sim::{Scheduler, TerminationReport};

// ── Constants ─────────────────────────────────────────────────────────────────

const VEHICLE_COUNT: u32 = 8;
const SEED: u64 = 42;
const HORIZON_SECS: f64 = 300.0;
const HEADWAY_M: f64 = 30.0;

fn platoon_engine() -> MemoryEngine {
    let mut engine = MemoryEngine::new(2);
    let mut rng = SimRng::new(SEED);
    for i in 0..VEHICLE_COUNT {
        let lane_position = i as f64 * HEADWAY_M;
        engine.add_vehicle(
            AgentId(i),
            VehicleState {
                position: (lane_position, 0.0),
                speed: 28.0 + rng.gen_range(0.0..2.0),
                lane_index: (i % 2) as i32,
                lane_position,
                ..VehicleState::default()
            },
        );
    }
    engine
}

fn config(output_subdir: &str) -> RunConfig {
    let mut config = RunConfig {
        seed: SEED,
        output_path: format!("./output/{output_subdir}").into(),
        output_kinds: vec![
            OutputKind::Fcd,
            OutputKind::Traj,
            OutputKind::LaneChange,
            OutputKind::Collision,
        ],
        ..RunConfig::default()
    };
    config.max_steps = config.make_clock().steps_for_secs(HORIZON_SECS);
    config
}

fn factory() -> Box<DefaultVehicleFactory> {
    Box::new(DefaultVehicleFactory { sensor_range_m: 120.0, lane_change: true })
}

fn summarize(label: &str, report: &TerminationReport, elapsed_secs: f64) {
    println!(
        "{label:>13}: {} after {} steps ({elapsed_secs:.2} s wall), \
         log-weight {:.4}, faults {}",
        report.reason.as_str(),
        report.steps,
        report.final_log_weight,
        report.agent_faults.len(),
    );
    if !report.offending_agents.is_empty() {
        let ids: Vec<String> = report.offending_agents.iter().map(|a| a.0.to_string()).collect();
        println!("{:>13}  involved agents: {}", "", ids.join(", "));
    }
}

fn run_naturalistic() -> Result<TerminationReport> {
    let config = config("naturalistic");
    let mut extractor = OutputExtractor::new(&config)?;
    let mut scheduler = Scheduler::naturalistic(config, platoon_engine(), factory())?;
    let report = scheduler.run(&mut extractor)?;
    if let Some(e) = extractor.take_error() {
        eprintln!("output error: {e}");
    }
    Ok(report)
}

fn run_adversarial() -> Result<TerminationReport> {
    let config = config("adversarial");
    let mut extractor = OutputExtractor::new(&config)?;
    let mut scheduler = Scheduler::new(config, platoon_engine(), factory())?;
    let report = scheduler.run(&mut extractor)?;
    if let Some(e) = extractor.take_error() {
        eprintln!("output error: {e}");
    }
    Ok(report)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let start = Instant::now();
    let naturalistic = run_naturalistic()?;
    let naturalistic_secs = start.elapsed().as_secs_f64();

    let start = Instant::now();
    let adversarial = run_adversarial()?;
    let adversarial_secs = start.elapsed().as_secs_f64();

    summarize("naturalistic", &naturalistic, naturalistic_secs);
    summarize("adversarial", &adversarial, adversarial_secs);
    println!("output written to ./output/");
    Ok(())
}
