//! Park and weather run-environment factors.
//!
//! A dated factor (park combined with that day's weather) wins when one is
//! present. Otherwise the season-long park factor is used, and an unknown
//! park is neutral.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

/// Hard bounds on any park/weather multiplier.
pub const PARK_FACTOR_MIN: f64 = 0.80;
pub const PARK_FACTOR_MAX: f64 = 1.20;

/// Season-long park factors used when no dated factor is available.
const STATIC_PARK_FACTORS: &[(&str, f64)] = &[
    ("Colorado Rockies", 1.12),
    ("Texas Rangers", 1.06),
    ("Baltimore Orioles", 1.05),
    ("New York Yankees", 1.05),
    ("Boston Red Sox", 1.04),
    ("Philadelphia Phillies", 1.03),
    ("Cincinnati Reds", 1.02),
    ("Chicago Cubs", 1.02),
    ("Toronto Blue Jays", 1.02),
    ("Minnesota Twins", 1.01),
    ("Atlanta Braves", 1.01),
    ("Washington Nationals", 1.01),
    ("Milwaukee Brewers", 1.00),
    ("Houston Astros", 1.00),
    ("St. Louis Cardinals", 1.00),
    ("Chicago White Sox", 1.00),
    ("Pittsburgh Pirates", 0.99),
    ("Los Angeles Angels", 0.99),
    ("Kansas City Royals", 0.98),
    ("Cleveland Guardians", 0.98),
    ("Tampa Bay Rays", 0.97),
    ("New York Mets", 0.97),
    ("Detroit Tigers", 0.97),
    ("Seattle Mariners", 0.96),
    ("Los Angeles Dodgers", 0.96),
    ("Miami Marlins", 0.95),
    ("San Diego Padres", 0.93),
    ("Athletics", 0.92),
    ("San Francisco Giants", 0.90),
];

/// Where a resolved park factor came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParkFactorSource {
    Dated,
    Static,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParkFactorResolution {
    pub factor: f64,
    pub source: ParkFactorSource,
}

/// Park/weather factors keyed by home team, optionally per date.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParkFactorTable {
    /// Day-specific factors: date -> home team -> multiplier.
    #[serde(default)]
    pub dated: HashMap<NaiveDate, HashMap<String, f64>>,
    /// Season-long overrides of the built-in table.
    #[serde(default, rename = "static")]
    pub static_factors: HashMap<String, f64>,
    /// Skip the built-in season table (used by tests that need neutrality).
    #[serde(default)]
    pub disable_builtin: bool,
}

impl ParkFactorTable {
    /// A table that knows nothing; every park resolves neutral.
    pub fn neutral() -> Self {
        Self {
            disable_builtin: true,
            ..Default::default()
        }
    }

    pub fn with_dated(mut self, date: NaiveDate, team: &str, factor: f64) -> Self {
        self.dated
            .entry(date)
            .or_default()
            .insert(team.to_string(), factor);
        self
    }

    pub fn with_static(mut self, team: &str, factor: f64) -> Self {
        self.static_factors.insert(team.to_string(), factor);
        self
    }

    /// Resolve the factor for a game hosted by `home_team` on `date`.
    pub fn resolve(&self, home_team: &str, date: NaiveDate) -> ParkFactorResolution {
        if let Some(f) = self.dated.get(&date).and_then(|teams| teams.get(home_team)) {
            return ParkFactorResolution {
                factor: bounded(home_team, *f),
                source: ParkFactorSource::Dated,
            };
        }

        let static_factor = self.static_factors.get(home_team).copied().or_else(|| {
            if self.disable_builtin {
                None
            } else {
                builtin_park_factor(home_team)
            }
        });

        match static_factor {
            Some(f) => ParkFactorResolution {
                factor: bounded(home_team, f),
                source: ParkFactorSource::Static,
            },
            None => ParkFactorResolution {
                factor: 1.0,
                source: ParkFactorSource::Neutral,
            },
        }
    }
}

/// Look up the built-in season-long park factor for a home team.
pub fn builtin_park_factor(home_team: &str) -> Option<f64> {
    STATIC_PARK_FACTORS
        .iter()
        .find(|(team, _)| *team == home_team)
        .map(|(_, f)| *f)
}

fn bounded(team: &str, factor: f64) -> f64 {
    if !factor.is_finite() {
        warn!(team, factor, "Non-finite park factor, using neutral");
        return 1.0;
    }
    let clipped = factor.clamp(PARK_FACTOR_MIN, PARK_FACTOR_MAX);
    if clipped != factor {
        warn!(team, factor, clipped, "Park factor outside safety band");
    }
    clipped
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
