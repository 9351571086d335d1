//! Simulator behaviour against a full reference snapshot.

use std::sync::Arc;

use diamond::config::SimulationConfig;
use diamond::engine::{GameOutcomeSimulator, SimulationRequest};
use diamond::error::PredictionError;
use diamond::types::{Degradation, PitcherSource};

use crate::fixtures::{key, make_snapshot};

fn simulator() -> GameOutcomeSimulator {
    GameOutcomeSimulator::new(Arc::new(SimulationConfig::default())).unwrap()
}

/// Even clubs, even starters, neutral park and no scoring bias, so only the
/// home-field terms separate the two sides.
fn even_matchup_config(home_field_advantage: f64, away_field_boost: f64) -> SimulationConfig {
    let mut config = SimulationConfig::default();
    config.engine.home_field_advantage = home_field_advantage;
    config.engine.away_field_boost = away_field_boost;
    config.engine.home_scoring_boost = 1.0;
    config.engine.away_scoring_boost = 1.0;
    config.engine.total_scoring_adjustment = 1.0;
    config.trials.max_trial_count = EVEN_MATCHUP_TRIALS;
    config
}

const EVEN_MATCHUP_TRIALS: u32 = 40_000;

fn simulate_even_matchup(config: SimulationConfig) -> diamond::engine::SimulationOutput {
    let req = SimulationRequest::new(key("Prairie Pikes", "Harbor Hawks"), EVEN_MATCHUP_TRIALS)
        .with_pitchers(Some("Average Joe"), Some("Average Jim"));
    GameOutcomeSimulator::new(Arc::new(config))
        .unwrap()
        .simulate(&req, &make_snapshot())
        .unwrap()
}

#[test]
fn test_symmetric_teams_home_edge_only() {
    let config = even_matchup_config(0.08, 0.01);
    let engine = config.engine.clone();
    let out = simulate_even_matchup(config);
    let d = &out.distribution;

    assert!(out.degradations.is_empty());
    assert_eq!(out.pitchers.away_pitcher_factor, out.pitchers.home_pitcher_factor);
    assert_eq!(out.rates.park_factor, 1.0);

    // The multipliers differ by the home-field term and nothing else.
    let x = (engine.home_field_advantage - engine.away_field_boost) * engine.team_strength_multiplier;
    let ratio = out.rates.home_multiplier / out.rates.away_multiplier;
    assert!((ratio - (1.0 + x) / (1.0 - x)).abs() < 1e-12, "ratio {ratio}");

    // Expected run gap from that term, scaled by the shared starter factor.
    let gap = out.rates.home_lambda - out.rates.away_lambda;
    assert!((gap - 2.0 * x * engine.base_lambda * out.pitchers.home_pitcher_factor).abs() < 1e-9);
    let observed_gap = d.mean_home_score - d.mean_away_score;
    assert!((observed_gap - gap).abs() < 0.06, "observed {observed_gap:.3} vs {gap:.3}");

    // A tenth of a run per game is worth a point or two, never more than
    // half the run gap.
    let edge = d.home_win_probability - 0.5;
    assert!(edge > 0.0, "home {:.4}", d.home_win_probability);
    assert!(edge < gap / 2.0, "edge {edge:.4} vs gap {gap:.3}");
}

#[test]
fn test_no_home_field_is_a_coin_flip() {
    let out = simulate_even_matchup(even_matchup_config(0.0, 0.0));
    assert_eq!(out.rates.home_lambda, out.rates.away_lambda);
    let p = out.distribution.home_win_probability;
    assert!((p - 0.5).abs() < 0.01, "home {p:.4}");
}

#[test]
fn test_same_game_reproduces_exactly() {
    let req = SimulationRequest::new(key("Valley Voles", "Summit Stags"), 1500);
    let a = simulator().simulate(&req, &make_snapshot()).unwrap();
    let b = simulator().simulate(&req, &make_snapshot()).unwrap();
    assert_eq!(a.distribution, b.distribution);
    assert_eq!(a.rates, b.rates);
}

#[test]
fn test_distribution_is_consistent() {
    let req = SimulationRequest::new(key("Valley Voles", "Summit Stags"), 2000);
    let d = simulator().simulate(&req, &make_snapshot()).unwrap().distribution;

    assert_eq!(d.trials, 2000);
    assert!((d.home_win_probability + d.away_win_probability - 1.0).abs() < 1e-12);
    assert_eq!(d.run_differential_counts.values().sum::<u32>(), 2000);
    assert_eq!(d.total_runs_counts.values().sum::<u32>(), 2000);
    assert!(!d.run_differential_counts.contains_key(&0));
    assert!((d.mean_total - (d.mean_away_score + d.mean_home_score)).abs() < 1e-9);
    assert!(d.total_range.p10 <= d.mean_total && d.mean_total <= d.total_range.p90);
    assert!((0.0..=100.0).contains(&d.model_confidence));
}

#[test]
fn test_strong_home_club_with_ace_dominates() {
    let req = SimulationRequest::new(key("Valley Voles", "Summit Stags"), 3000)
        .with_pitchers(None, Some("Sam Stopper"));
    let out = simulator().simulate(&req, &make_snapshot()).unwrap();
    assert!(out.distribution.home_win_probability > 0.65);
    assert!(out.pitchers.home_pitcher_factor < 1.0);
    assert!(out.rates.away_lambda < out.rates.home_lambda);
    assert_eq!(out.rates.park_factor, 1.10);
}

#[test]
fn test_unknown_pitcher_exactly_neutral() {
    let req = SimulationRequest::new(key("Prairie Pikes", "Harbor Hawks"), 500)
        .with_pitchers(Some("Nobody Special"), Some("Average Jim"));
    let out = simulator().simulate(&req, &make_snapshot()).unwrap();
    assert_eq!(out.pitchers.away_pitcher_factor, 1.0);
    assert_eq!(out.pitchers.away_pitcher_source, PitcherSource::Caller);
    assert!(out.degradations.contains(&Degradation::MissingPitcherStats {
        pitcher: "Nobody Special".into()
    }));
}

#[test]
fn test_unknown_team_degrades() {
    let req = SimulationRequest::new(key("Expansion Club", "Harbor Hawks"), 500);
    let out = simulator().simulate(&req, &make_snapshot()).unwrap();
    assert!(out.degradations.contains(&Degradation::MissingTeamStrength {
        team: "Expansion Club".into()
    }));
    assert!((out.distribution.home_win_probability + out.distribution.away_win_probability - 1.0).abs() < 1e-12);
}

#[test]
fn test_trial_bounds_enforced() {
    let cfg = SimulationConfig::default();
    let max = cfg.trials.max_trial_count;
    let sim = simulator();
    let snapshot = make_snapshot();

    for trials in [0, max + 1] {
        let req = SimulationRequest::new(key("Prairie Pikes", "Harbor Hawks"), trials);
        assert!(matches!(
            sim.simulate(&req, &snapshot),
            Err(PredictionError::SimulationInputInvalid(_))
        ));
    }
    let req = SimulationRequest::new(key("Prairie Pikes", "Harbor Hawks"), 1);
    assert_eq!(sim.simulate(&req, &snapshot).unwrap().distribution.trials, 1);
}
