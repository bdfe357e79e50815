//! Unit tests for nade-adversity.

use nade_core::{
    AgentId, AgentRng, LaneDirection, Maneuver, Step, TieBreakPolicy, VehicleState,
};
use nade_agent::{IdmModel, Observation};

use crate::challenge::{ChallengeTable, ChallengeTables};
use crate::criticality::{CriticalityEstimator, CriticalityRecord, ManeuverDistribution, ProbabilityPredictor};
use crate::sampler::{AdversarialSelector, SelectorPhase};
use crate::scenario::{classify, cut_in_direction, ScenarioClass};
use crate::weight::TrajectoryWeight;
use crate::AdversityError;

fn vehicle(lane_position: f64, speed: f64, lane_index: i32) -> VehicleState {
    VehicleState {
        speed,
        lane_index,
        lane_position,
        ..VehicleState::default()
    }
}

fn obs_with(ego: VehicleState) -> Observation {
    Observation {
        step: Step(0),
        agent: AgentId(0),
        ego,
        ..Observation::default()
    }
}

/// Tables whose lookup is constant everywhere, for exact arithmetic checks.
fn constant_tables(car_following: f64, lane_change: f64) -> ChallengeTables {
    let flat = |v: f64| {
        ChallengeTable::new(vec![0.0], vec![0.0], vec![vec![v]]).unwrap()
    };
    ChallengeTables {
        car_following: flat(car_following),
        lane_change: flat(lane_change),
    }
}

#[cfg(test)]
mod scenarios {
    use super::*;

    #[test]
    fn four_quadrants() {
        let ego = vehicle(0.0, 30.0, 0);
        let policy = TieBreakPolicy::SameLane;
        assert_eq!(
            classify(&ego, &vehicle(30.0, 25.0, 0), policy),
            Some(ScenarioClass::LeadSameLane)
        );
        assert_eq!(
            classify(&ego, &vehicle(-30.0, 25.0, 0), policy),
            Some(ScenarioClass::FollowSameLane)
        );
        assert_eq!(
            classify(&ego, &vehicle(30.0, 25.0, 1), policy),
            Some(ScenarioClass::LeadAdjacentLane)
        );
        assert_eq!(
            classify(&ego, &vehicle(-30.0, 25.0, -1), policy),
            Some(ScenarioClass::FollowAdjacentLane)
        );
    }

    #[test]
    fn overlapping_adjacent_vehicle_is_blind_spot() {
        let ego = vehicle(0.0, 30.0, 0);
        let scenario = classify(&ego, &vehicle(1.0, 30.0, 1), TieBreakPolicy::SameLane);
        assert_eq!(scenario, Some(ScenarioClass::BlindSpot));
        assert!(ScenarioClass::BlindSpot.maneuver_set(None).is_empty());
    }

    #[test]
    fn two_lanes_apart_is_unclassified() {
        let ego = vehicle(0.0, 30.0, 0);
        assert_eq!(classify(&ego, &vehicle(30.0, 25.0, 2), TieBreakPolicy::SameLane), None);
    }

    #[test]
    fn straddle_resolution_follows_policy() {
        let ego = vehicle(0.0, 30.0, 0);
        let mut straddler = vehicle(30.0, 25.0, 0);
        straddler.lateral_offset = 1.5;
        assert_eq!(
            classify(&ego, &straddler, TieBreakPolicy::SameLane),
            Some(ScenarioClass::LeadSameLane)
        );
        assert_eq!(
            classify(&ego, &straddler, TieBreakPolicy::AdjacentLane),
            Some(ScenarioClass::LeadAdjacentLane)
        );
    }

    #[test]
    fn cut_in_points_toward_partner_lane() {
        let ego = vehicle(0.0, 30.0, 0);
        assert_eq!(cut_in_direction(&ego, &vehicle(30.0, 25.0, 1)), Some(LaneDirection::Left));
        assert_eq!(cut_in_direction(&ego, &vehicle(30.0, 25.0, -1)), Some(LaneDirection::Right));
        assert_eq!(cut_in_direction(&ego, &vehicle(30.0, 25.0, 0)), None);
    }

    #[test]
    fn adjacent_lead_set_includes_cut_in() {
        let set = ScenarioClass::LeadAdjacentLane.maneuver_set(Some(LaneDirection::Left));
        assert!(set.contains(&Maneuver::Maintain));
        assert!(set.contains(&Maneuver::HARD_BRAKE));
        assert!(set.contains(&Maneuver::CutIn { direction: LaneDirection::Left }));
    }
}

#[cfg(test)]
mod challenge_tables {
    use super::*;
    use std::path::Path;

    #[test]
    fn lookup_saturates_at_grid_edges() {
        let t = ChallengeTables::builtin();
        // Far out of range on both axes clamps to the corner cells.
        assert_eq!(t.car_following.lookup(1000.0, -100.0), 0.0);
        assert_eq!(t.car_following.lookup(-5.0, 50.0), 0.98);
    }

    #[test]
    fn lookup_picks_lower_edge_bin() {
        let t = ChallengeTables::builtin();
        // gap 12 falls in the [10, 20) bin, rate 3 in the [2, 5) bin.
        assert_eq!(t.car_following.lookup(12.0, 3.0), 0.12);
    }

    #[test]
    fn mismatched_grid_is_rejected() {
        let r = ChallengeTable::new(vec![0.0, 5.0], vec![0.0], vec![vec![0.1]]);
        assert!(matches!(r, Err(AdversityError::Table(_))));
    }

    #[test]
    fn values_clamp_into_unit_interval() {
        let t = ChallengeTable::new(vec![0.0], vec![0.0], vec![vec![3.0]]).unwrap();
        assert_eq!(t.lookup(0.0, 0.0), 1.0);
    }

    #[test]
    fn csv_roundtrip() {
        let path = std::env::temp_dir().join(format!("challenge-{}.csv", std::process::id()));
        std::fs::write(
            &path,
            "gap_m,range_rate_mps,challenge\n\
             0,0,0.5\n0,5,0.9\n10,0,0.1\n10,5,0.4\n",
        )
        .unwrap();
        let t = ChallengeTable::load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(t.lookup(3.0, 1.0), 0.5);
        assert_eq!(t.lookup(15.0, 7.0), 0.4);
    }

    #[test]
    fn missing_directory_falls_back_to_builtin() {
        let t = ChallengeTables::load(Path::new("/nonexistent/challenge-data")).unwrap();
        assert_eq!(t.car_following.lookup(12.0, 3.0), 0.12);
    }
}

#[cfg(test)]
mod distributions {
    use super::*;

    #[test]
    fn renormalizes_off_by_more_than_tolerance() {
        let d = ManeuverDistribution::normalized(
            vec![(Maneuver::Maintain, 0.5), (Maneuver::HARD_BRAKE, 0.3)],
            1e-6,
        )
        .unwrap();
        assert!((d.sum() - 1.0).abs() < 1e-12);
        assert!((d.probability_of(Maneuver::Maintain) - 0.625).abs() < 1e-12);
    }

    #[test]
    fn clamps_negative_and_non_finite_entries() {
        let d = ManeuverDistribution::normalized(
            vec![(Maneuver::Maintain, 1.0), (Maneuver::HARD_BRAKE, -0.5)],
            1e-6,
        )
        .unwrap();
        assert_eq!(d.probability_of(Maneuver::HARD_BRAKE), 0.0);
        assert_eq!(d.probability_of(Maneuver::Maintain), 1.0);
    }

    #[test]
    fn rejects_empty_and_zero_mass() {
        assert!(ManeuverDistribution::normalized(vec![], 1e-6).is_err());
        assert!(
            ManeuverDistribution::normalized(vec![(Maneuver::Maintain, 0.0)], 1e-6).is_err()
        );
    }

    #[test]
    fn matches_maneuvers_by_kind() {
        let d = ManeuverDistribution::normalized(
            vec![(Maneuver::Maintain, 0.9), (Maneuver::HARD_BRAKE, 0.1)],
            1e-6,
        )
        .unwrap();
        // A milder brake is still "brake".
        assert!((d.probability_of(Maneuver::Brake { decel: 1.0 }) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn idm_predictor_yields_normalized_distribution() {
        let mut obs = obs_with(vehicle(0.0, 30.0, 0));
        obs.leader = Some((AgentId(1), vehicle(40.0, 25.0, 0)));
        let d = IdmModel::default().predict(&obs, 1e-6).unwrap();
        assert!((d.sum() - 1.0).abs() < 1e-9);
        assert!(d.0.iter().all(|(_, p)| *p > 0.0));
    }
}

#[cfg(test)]
mod criticality_estimation {
    use super::*;

    #[test]
    fn criticality_is_probability_weighted_challenge() {
        let estimator = CriticalityEstimator::new(constant_tables(0.01, 0.02), 120.0);
        let obs = obs_with(vehicle(0.0, 30.0, 0));
        let partner = vehicle(40.0, 25.0, 1);
        let predicted = ManeuverDistribution::normalized(
            vec![
                (Maneuver::CutIn { direction: LaneDirection::Left }, 0.3),
                (Maneuver::HARD_BRAKE, 0.7),
            ],
            1e-6,
        )
        .unwrap();

        let record = estimator.estimate(
            &obs,
            AgentId(1),
            &partner,
            &predicted,
            TieBreakPolicy::SameLane,
        );
        assert_eq!(record.scenario, Some(ScenarioClass::LeadAdjacentLane));
        // 0.3 × 0.02 (lane change) + 0.7 × 0.01 (car following) = 0.013.
        assert!((record.criticality - 0.013).abs() < 1e-12);
    }

    #[test]
    fn out_of_radius_partner_is_baseline() {
        let estimator = CriticalityEstimator::new(constant_tables(0.5, 0.5), 120.0);
        let obs = obs_with(vehicle(0.0, 30.0, 0));
        let mut partner = vehicle(40.0, 25.0, 0);
        partner.position = (500.0, 0.0);
        let predicted =
            ManeuverDistribution::normalized(vec![(Maneuver::Maintain, 1.0)], 1e-6).unwrap();

        let record =
            estimator.estimate(&obs, AgentId(1), &partner, &predicted, TieBreakPolicy::SameLane);
        assert_eq!(record.scenario, None);
        assert_eq!(record.criticality, 0.0);
        assert!(record.maneuver_challenges.is_empty());
    }

    #[test]
    fn blind_spot_partner_has_zero_criticality() {
        let estimator = CriticalityEstimator::new(constant_tables(0.5, 0.5), 120.0);
        let obs = obs_with(vehicle(0.0, 30.0, 0));
        let partner = vehicle(1.0, 30.0, 1);
        let predicted =
            ManeuverDistribution::normalized(vec![(Maneuver::Maintain, 1.0)], 1e-6).unwrap();

        let record =
            estimator.estimate(&obs, AgentId(1), &partner, &predicted, TieBreakPolicy::SameLane);
        assert_eq!(record.scenario, Some(ScenarioClass::BlindSpot));
        assert_eq!(record.criticality, 0.0);
    }

    #[test]
    fn closer_faster_pairs_are_more_critical() {
        let estimator = CriticalityEstimator::new(ChallengeTables::builtin(), 120.0);
        let obs_near = obs_with(vehicle(0.0, 35.0, 0));
        let obs_far = obs_with(vehicle(0.0, 25.0, 0));
        let partner = vehicle(20.0, 22.0, 0);
        let predicted = ManeuverDistribution::normalized(
            vec![(Maneuver::Maintain, 0.9), (Maneuver::HARD_BRAKE, 0.1)],
            1e-6,
        )
        .unwrap();

        let near = estimator
            .estimate(&obs_near, AgentId(1), &partner, &predicted, TieBreakPolicy::SameLane);
        let far = estimator
            .estimate(&obs_far, AgentId(1), &partner, &predicted, TieBreakPolicy::SameLane);
        assert!(near.criticality > far.criticality);
    }
}

#[cfg(test)]
mod selector {
    use super::*;

    fn brake_record(partner: u32, criticality: f64) -> CriticalityRecord {
        CriticalityRecord {
            partner: AgentId(partner),
            scenario: Some(ScenarioClass::LeadSameLane),
            maneuver_challenges: vec![
                (Maneuver::Maintain, 0.001),
                (Maneuver::HARD_BRAKE, criticality),
            ],
            criticality,
        }
    }

    fn natural_97_3() -> ManeuverDistribution {
        ManeuverDistribution::normalized(
            vec![(Maneuver::Maintain, 0.97), (Maneuver::HARD_BRAKE, 0.03)],
            1e-6,
        )
        .unwrap()
    }

    #[test]
    fn below_threshold_applies_the_naturalistic_command() {
        let selector = AdversarialSelector::new(1e-4, 1e-4);
        let mut rng = AgentRng::new(7, AgentId(0));
        let selection = selector
            .select(&natural_97_3(), vec![brake_record(1, 5e-5)], &mut rng)
            .unwrap();
        // Records were still evaluated; only the sampling phase is skipped.
        assert_eq!(
            selection.trace,
            vec![SelectorPhase::Idle, SelectorPhase::Evaluating, SelectorPhase::Applied]
        );
        assert_eq!(selection.phase(), SelectorPhase::Applied);
        assert!(selection.action.is_none());
    }

    #[test]
    fn trace_runs_evaluate_sample_apply() {
        let selector = AdversarialSelector::new(1e-4, 1e-4);
        let mut rng = AgentRng::new(7, AgentId(0));
        let selection = selector
            .select(&natural_97_3(), vec![brake_record(1, 0.2)], &mut rng)
            .unwrap();
        assert_eq!(
            selection.trace,
            vec![
                SelectorPhase::Idle,
                SelectorPhase::Evaluating,
                SelectorPhase::Sampling,
                SelectorPhase::Applied,
            ]
        );
        assert!(selection.action.is_some());
    }

    #[test]
    fn oversamples_the_critical_maneuver() {
        let selector = AdversarialSelector::new(1e-4, 1e-4);
        let mut rng = AgentRng::new(42, AgentId(3));
        let predicted = natural_97_3();
        let mut adversarial_draws = 0usize;
        for _ in 0..1000 {
            let selection = selector
                .select(&predicted, vec![brake_record(1, 0.2)], &mut rng)
                .unwrap();
            let action = selection.action.unwrap();
            if action.is_adversarial() {
                adversarial_draws += 1;
                assert_eq!(action.partner, Some(AgentId(1)));
                assert!((action.weight() - 0.03 / 0.2).abs() < 1e-12);
            } else {
                assert!((action.weight() - 0.97 / 0.8).abs() < 1e-12);
            }
        }
        // Sampled at 20% instead of the naturalistic 3%.
        assert!(adversarial_draws > 120, "only {adversarial_draws} adversarial draws");
    }

    #[test]
    fn weighted_frequency_matches_naturalistic_frequency() {
        let selector = AdversarialSelector::new(1e-4, 1e-4);
        let mut rng = AgentRng::new(9, AgentId(5));
        let predicted = natural_97_3();
        let trials = 20_000usize;
        let mut weighted_hits = 0.0;
        for _ in 0..trials {
            let action = selector
                .select(&predicted, vec![brake_record(1, 0.2)], &mut rng)
                .unwrap()
                .action
                .unwrap();
            if action.is_adversarial() {
                weighted_hits += action.weight();
            }
        }
        let estimate = weighted_hits / trials as f64;
        assert!((estimate - 0.03).abs() < 0.01, "estimate {estimate}");
    }

    #[test]
    fn non_finite_criticality_is_degenerate() {
        let selector = AdversarialSelector::new(1e-4, 1e-4);
        let mut rng = AgentRng::new(7, AgentId(0));
        let result = selector.select(&natural_97_3(), vec![brake_record(1, f64::NAN)], &mut rng);
        assert!(matches!(result, Err(AdversityError::Degenerate(_))));
    }

    #[test]
    fn sampling_probabilities_are_floored_and_normalized() {
        let selector = AdversarialSelector::new(1e-6, 1e-3);
        let mut rng = AgentRng::new(11, AgentId(0));
        // Tiny criticality gets lifted to the floor but never to zero.
        let selection = selector
            .select(&natural_97_3(), vec![brake_record(1, 1e-5)], &mut rng)
            .unwrap();
        let action = selection.action.unwrap();
        assert!(action.sampling_prob > 0.0);
        assert!(action.sampling_prob <= 1.0);
    }
}

#[cfg(test)]
mod weights {
    use super::*;

    #[test]
    fn accumulates_in_log_space() {
        let mut w = TrajectoryWeight::new();
        w.accumulate(0.03, 0.2).unwrap();
        w.accumulate(0.97, 0.8).unwrap();
        let expected = (0.03f64 / 0.2) * (0.97 / 0.8);
        assert!((w.weight() - expected).abs() < 1e-12);
        assert!((w.log_weight() - expected.ln()).abs() < 1e-12);
        assert_eq!(w.steps_accumulated(), 2);
    }

    #[test]
    fn fresh_weight_is_one() {
        let w = TrajectoryWeight::new();
        assert_eq!(w.log_weight(), 0.0);
        assert_eq!(w.weight(), 1.0);
    }

    #[test]
    fn rejects_non_positive_probabilities() {
        let mut w = TrajectoryWeight::new();
        assert!(w.accumulate(0.0, 0.5).is_err());
        assert!(w.accumulate(0.5, 0.0).is_err());
        assert!(w.accumulate(f64::NAN, 0.5).is_err());
        assert_eq!(w.steps_accumulated(), 0);
    }
}
