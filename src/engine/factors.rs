//! Deterministic run-environment factors.
//!
//! Everything here is a pure function of reference data and configuration:
//! the team strength differential, starting-pitcher quality and the seed a
//! game's random stream starts from.

use sha2::{Digest, Sha256};

use crate::config::{EngineParameters, PitcherQualityBounds};
use crate::data::PitcherStats;
use crate::types::GameKey;

/// Run multipliers from the strength differential alone, before pitcher,
/// park and bias adjustments. Returns `(away, home)`.
pub fn strength_multipliers(away_strength: f64, home_strength: f64, engine: &EngineParameters) -> (f64, f64) {
    let away = away_strength + engine.away_field_boost;
    let home = home_strength + engine.home_field_advantage;
    let diff = home - away;
    (
        1.0 - diff * engine.team_strength_multiplier,
        1.0 + diff * engine.team_strength_multiplier,
    )
}

/// ERA bucket multiplier. Lower is a better pitcher.
pub fn era_factor(era: f64, bounds: &PitcherQualityBounds) -> f64 {
    if era < 2.00 {
        0.60
    } else if era < bounds.ace_era_threshold {
        0.70
    } else if era < bounds.good_era_threshold {
        0.85
    } else if era < 4.25 {
        0.95
    } else if era < bounds.poor_era_threshold {
        1.15
    } else if era < 6.50 {
        1.25
    } else {
        1.40
    }
}

pub fn whip_factor(whip: f64) -> f64 {
    if whip < 1.00 {
        0.80
    } else if whip < 1.15 {
        0.90
    } else if whip < 1.30 {
        0.97
    } else if whip < 1.45 {
        1.08
    } else {
        1.20
    }
}

/// How much of the ERA/WHIP signal to trust given the innings sample.
pub fn innings_reliability(innings_pitched: f64) -> f64 {
    if innings_pitched > 100.0 {
        1.0
    } else if innings_pitched > 50.0 {
        0.8
    } else {
        0.5
    }
}

/// Multiplier a starter applies to the opposing offense. `None` (unknown
/// pitcher) and pitchers below the start threshold are exactly neutral.
pub fn pitcher_quality_factor(
    stats: Option<&PitcherStats>,
    bounds: &PitcherQualityBounds,
    engine: &EngineParameters,
) -> f64 {
    let Some(stats) = stats else {
        return 1.0;
    };
    if stats.games_started < bounds.min_games_started
        || !stats.era.is_finite()
        || !stats.whip.is_finite()
    {
        return 1.0;
    }

    let base = era_factor(stats.era, bounds) * engine.pitcher_era_weight
        + whip_factor(stats.whip) * engine.pitcher_whip_weight;
    let ip = if stats.innings_pitched.is_finite() {
        innings_reliability(stats.innings_pitched)
    } else {
        0.5
    };
    let quality = 1.0 + (base - 1.0) * ip;
    quality.clamp(bounds.min_quality_factor, bounds.max_quality_factor)
}

/// Seed for a game's random stream: first eight bytes (little endian) of
/// SHA-256 over `"away|home|YYYY-MM-DD"`.
pub fn game_seed(game: &GameKey) -> u64 {
    let material = format!(
        "{}|{}|{}",
        game.away_team,
        game.home_team,
        game.game_date.format("%Y-%m-%d")
    );
    let digest = Sha256::digest(material.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
