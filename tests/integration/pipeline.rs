//! Orchestrator and slate runs end to end.

use std::sync::Arc;
use std::time::Duration;

use diamond::config::SimulationConfig;
use diamond::data::{JsonReferenceStore, MarketBook, ResultsBook};
use diamond::engine::{PredictionOrchestrator, PredictionRequest, SlateRunner};
use diamond::error::PredictionError;
use diamond::storage::{self, SlateFile};
use diamond::types::{
    BetType, DataSource, Degradation, GamePrediction, HistoricalResult, MarketLine, PitcherSource,
};

use crate::fixtures::{key, make_orchestrator, make_snapshot, slate_date, temp_dir};

fn simulated(prediction: GamePrediction) -> Box<diamond::types::PredictionRecord> {
    match prediction {
        GamePrediction::Simulated(r) => r,
        GamePrediction::Historical(h) => panic!("expected a simulation for {}", h.game),
    }
}

#[test]
fn test_null_market_leaves_model_untouched() {
    let game = key("Prairie Pikes", "Harbor Hawks");
    let config = SimulationConfig {
        blending: diamond::config::BlendingParameters {
            enabled: true,
            ..Default::default()
        },
        ..Default::default()
    };
    let markets = MarketBook::new().with_line(game.clone(), MarketLine::default());
    let orc = make_orchestrator(config, markets, ResultsBook::new());

    let record = simulated(orc.predict(&PredictionRequest::new(game).with_trials(1500)).unwrap());
    let b = &record.blended;
    assert_eq!(b.home_win_probability, record.distribution.home_win_probability);
    assert_eq!(b.raw_home_win_probability, record.distribution.home_win_probability);
    assert_eq!(b.predicted_total, b.raw_total);
    assert!(!b.moneyline_blended && !b.total_blended);
    assert!(b.market_home_probability.is_none() && b.market_total.is_none());
    assert!(record.market.is_none());
    assert!(record.recommendations.is_empty());
}

#[test]
fn test_played_game_returns_recorded_score() {
    let game = key("Prairie Pikes", "Harbor Hawks");
    let results = ResultsBook::new().with_result(
        game.clone(),
        HistoricalResult {
            away_score: 4,
            home_score: 9,
            predicted_away_score: Some(4.2),
            predicted_home_score: Some(4.6),
            predicted_total_runs: Some(8.8),
        },
    );
    let orc = make_orchestrator(SimulationConfig::default(), MarketBook::new(), results);

    let prediction = orc.predict(&PredictionRequest::new(game)).unwrap();
    assert_eq!(prediction.data_source(), DataSource::Historical);
    let GamePrediction::Historical(h) = prediction else {
        panic!("expected the recorded result");
    };
    assert_eq!((h.result.away_score, h.result.home_score), (4, 9));
    assert_eq!(h.result.winner_correct(), Some(true));
}

#[test]
fn test_schedule_starters_and_market_flow_into_record() {
    let game = key("Valley Voles", "Summit Stags");
    let markets = MarketBook::new().with_line(
        game.clone(),
        MarketLine {
            home_moneyline: Some(-110),
            away_moneyline: Some(-110),
            total_line: Some(8.5),
            over_odds: Some(-110),
            ..Default::default()
        },
    );
    let orc = make_orchestrator(SimulationConfig::default(), markets, ResultsBook::new());

    let record = simulated(orc.predict(&PredictionRequest::new(game).with_trials(2000)).unwrap());
    assert_eq!(record.pitchers.home_pitcher.as_deref(), Some("Sam Stopper"));
    assert_eq!(record.pitchers.home_pitcher_source, PitcherSource::ProbableStarters);
    assert!(record.pitchers.away_pitcher.is_none());
    assert_eq!(record.metadata.trial_count, 2000);
    assert_eq!(record.metadata.recommendations_found, record.recommendations.len());

    // A heavy home favourite priced as a coin flip is value on the home side.
    let best = record.best_recommendation().unwrap();
    assert_eq!(best.side, diamond::types::BetSide::Home);
    assert!(record
        .recommendations
        .windows(2)
        .all(|w| w[0].expected_value >= w[1].expected_value));
    // Under price missing: totals flagged as incomplete and left unpriced.
    assert!(record.degradations.contains(&Degradation::MarketDataIncomplete {
        market: BetType::Total
    }));
    assert!(record.recommendations.iter().all(|r| r.bet_type == BetType::Moneyline));
}

#[test]
fn test_partial_market_neither_blended_nor_priced() {
    let game = key("Valley Voles", "Summit Stags");
    let config = SimulationConfig {
        blending: diamond::config::BlendingParameters {
            enabled: true,
            ..Default::default()
        },
        ..Default::default()
    };
    // Each quote would pull the model hard and look like value on its own.
    let markets = MarketBook::new().with_line(
        game.clone(),
        MarketLine {
            home_moneyline: Some(120),
            total_line: Some(7.5),
            over_odds: Some(-110),
            ..Default::default()
        },
    );
    let orc = make_orchestrator(config, markets, ResultsBook::new());

    let record = simulated(orc.predict(&PredictionRequest::new(game).with_trials(1500)).unwrap());
    let b = &record.blended;
    assert!(!b.moneyline_blended && !b.total_blended);
    assert!(b.market_home_probability.is_none() && b.market_total.is_none());
    assert_eq!(b.home_win_probability, b.raw_home_win_probability);
    assert_eq!(b.predicted_total, b.raw_total);
    assert!(record.recommendations.is_empty());
    for market in [BetType::Moneyline, BetType::Total] {
        assert!(record
            .degradations
            .contains(&Degradation::MarketDataIncomplete { market }));
    }
}

#[test]
fn test_missing_reference_store_fails_request() {
    let orc = PredictionOrchestrator::new(
        Arc::new(SimulationConfig::default()),
        Arc::new(JsonReferenceStore::new(temp_dir("absent"))),
        Arc::new(MarketBook::new()),
        Arc::new(ResultsBook::new()),
    )
    .unwrap();
    let err = orc
        .predict(&PredictionRequest::new(key("Prairie Pikes", "Harbor Hawks")))
        .unwrap_err();
    assert!(matches!(err, PredictionError::ReferenceStoreUnavailable(_)));
    assert!(!err.is_per_game());
}

#[tokio::test]
async fn test_slate_from_json_directory_saved_and_reloaded() {
    let dir = temp_dir("slate");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("team_strength.json"),
        r#"{"Prairie Pikes": 0.0, "Harbor Hawks": 0.0, "Summit Stags": 0.35, "Valley Voles": -0.30}"#,
    )
    .unwrap();
    std::fs::write(
        dir.join("pitchers.json"),
        r#"{"201": {"name": "Sam Stopper", "era": 2.2, "whip": 0.95, "innings_pitched": 150.0, "games_started": 25}}"#,
    )
    .unwrap();
    std::fs::write(
        dir.join("games.json"),
        r#"[
            {"game_date": "2025-08-15", "away_team": "Prairie Pikes", "home_team": "Harbor Hawks"},
            {"game_date": "2025-08-15", "away_team": "Valley Voles", "home_team": "Summit Stags", "home_pitcher": "Sam Stopper"},
            {"game_date": "2025-08-16", "away_team": "Harbor Hawks", "home_team": "Prairie Pikes"}
        ]"#,
    )
    .unwrap();
    // malformed optional file is skipped, not fatal
    std::fs::write(dir.join("bullpens.json"), "not json").unwrap();

    let reference = Arc::new(JsonReferenceStore::new(&dir));
    let snapshot = diamond::data::ReferenceDataProvider::snapshot(reference.as_ref()).unwrap();
    let requests = SlateRunner::requests_for_date(&snapshot, slate_date(), Some(500));
    assert_eq!(requests.len(), 2);

    let orc = PredictionOrchestrator::new(
        Arc::new(SimulationConfig::default()),
        reference,
        Arc::new(MarketBook::new()),
        Arc::new(ResultsBook::new()),
    )
    .unwrap();
    let report = SlateRunner::new(Arc::new(orc), Duration::from_secs(30))
        .run(requests)
        .await
        .unwrap();
    assert_eq!(report.predictions.len(), 2);
    assert!(report.failures.is_empty());

    let out = dir.join("out");
    storage::save_slate(
        &out,
        &SlateFile {
            slate_date: slate_date(),
            config_version: "1.0".into(),
            predictions: report.predictions.clone(),
        },
    )
    .unwrap();
    let loaded = storage::load_slate(&out, slate_date()).unwrap().unwrap();
    assert_eq!(loaded.predictions.len(), 2);
    for (a, b) in loaded.predictions.iter().zip(&report.predictions) {
        assert_eq!(a.game(), b.game());
        let (a, b) = (a.as_simulated().unwrap(), b.as_simulated().unwrap());
        assert_eq!(a.prediction_id, b.prediction_id);
        assert_eq!(a.distribution.run_differential_counts, b.distribution.run_differential_counts);
    }

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_fixture_schedule_matches_snapshot() {
    let snapshot = make_snapshot();
    let games = snapshot.games_on(slate_date());
    assert_eq!(games.len(), 2);
    assert!(games.iter().any(|g| g.home_team == "Summit Stags"));
}
