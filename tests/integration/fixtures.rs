//! Shared reference data and builders for integration tests.
//!
//! Teams and pitchers are fictional so the built-in park table never
//! applies; parks resolve through an explicit table instead.

use chrono::NaiveDate;
use std::path::PathBuf;
use std::sync::Arc;

use diamond::config::SimulationConfig;
use diamond::data::{
    MarketBook, ParkFactorTable, PitcherStats, ReferenceSnapshot, ResultsBook, ScheduledGame,
    StaticReferenceStore,
};
use diamond::engine::PredictionOrchestrator;
use diamond::types::GameKey;

pub fn slate_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 8, 15).unwrap()
}

pub fn key(away: &str, home: &str) -> GameKey {
    GameKey::new(away, home, slate_date())
}

pub fn make_pitcher(name: &str, era: f64, whip: f64) -> PitcherStats {
    PitcherStats {
        name: name.into(),
        era,
        whip,
        innings_pitched: 150.0,
        games_started: 25,
    }
}

pub fn make_game(away: &str, home: &str, away_p: Option<&str>, home_p: Option<&str>) -> ScheduledGame {
    ScheduledGame {
        game_date: slate_date(),
        away_team: away.into(),
        home_team: home.into(),
        away_pitcher: away_p.map(Into::into),
        home_pitcher: home_p.map(Into::into),
    }
}

/// Two even clubs, one strong club and one weak one, with a dated factor
/// for every home park used below.
pub fn make_snapshot() -> ReferenceSnapshot {
    let parks = ParkFactorTable::neutral()
        .with_dated(slate_date(), "Harbor Hawks", 1.0)
        .with_dated(slate_date(), "Valley Voles", 1.0)
        .with_dated(slate_date(), "Summit Stags", 1.10);

    ReferenceSnapshot::new()
        .with_park_factors(parks)
        .with_team_strength("Harbor Hawks", 0.0)
        .with_team_strength("Prairie Pikes", 0.0)
        .with_team_strength("Summit Stags", 0.35)
        .with_team_strength("Valley Voles", -0.30)
        .with_pitcher("101", make_pitcher("Average Joe", 4.00, 1.25))
        .with_pitcher("102", make_pitcher("Average Jim", 4.00, 1.25))
        .with_pitcher("201", make_pitcher("Sam Stopper", 2.20, 0.95))
        .with_game(make_game("Prairie Pikes", "Harbor Hawks", Some("Average Joe"), Some("Average Jim")))
        .with_game(make_game("Valley Voles", "Summit Stags", None, Some("Sam Stopper")))
}

pub fn make_orchestrator(config: SimulationConfig, markets: MarketBook, results: ResultsBook) -> PredictionOrchestrator {
    PredictionOrchestrator::new(
        Arc::new(config),
        Arc::new(StaticReferenceStore::new(make_snapshot())),
        Arc::new(markets),
        Arc::new(results),
    )
    .unwrap()
}

/// Fresh directory under the system temp dir.
pub fn temp_dir(label: &str) -> PathBuf {
    let mut p = std::env::temp_dir();
    p.push(format!("diamond_it_{label}_{}", uuid::Uuid::new_v4()));
    p
}
