//! `nade-agent` — the per-agent capability contract and its concrete variants.
//!
//! # Crate layout
//!
//! | Module            | Contents                                                  |
//! |-------------------|-----------------------------------------------------------|
//! | [`sensor`]        | `Sensor` trait, `Observation`, `LocalSensor`, `LightSensor` |
//! | [`decision`]      | `DecisionModel` trait, `ControlCommand`, `DecisionInfo`   |
//! | [`controller`]    | `Controller` trait, `MoveController`, `PhaseController`   |
//! | [`agent`]         | `Agent` (fixed triad composition), `AgentFactory`         |
//! | [`idm`]           | `IdmModel` — naturalistic car-following + lane-change     |
//! | [`traffic_light`] | `FixedPhaseModel` — timed phase cycling                   |
//!
//! # The triad contract
//!
//! An agent is a fixed composition of one [`Sensor`], one [`DecisionModel`],
//! and one [`Controller`], assigned at creation and immutable thereafter.
//! Each step:
//!
//! ```text
//! sensor.observe(world)  →  Observation          (fresh, never cached)
//! model.decide(obs, rng) →  (ControlCommand, DecisionInfo)
//! controller.apply(cmd)  →  Vec<EngineControl>   (pushed by the adapter)
//! ```
//!
//! Decision models are referentially transparent in `(Observation, AgentRng)`:
//! the only randomness is the explicitly passed, seedable per-agent stream.

pub mod agent;
pub mod controller;
pub mod decision;
pub mod idm;
pub mod sensor;
pub mod traffic_light;


pub use agent::{Agent, AgentFactory, DefaultTrafficLightFactory, DefaultVehicleFactory};
pub use controller::{Controller, MoveController, PhaseController};
pub use decision::{ControlCommand, DecisionError, DecisionInfo, DecisionMode, DecisionModel};
pub use idm::IdmModel;
pub use sensor::{LightSensor, LocalSensor, Observation, Sensor};
pub use traffic_light::FixedPhaseModel;
