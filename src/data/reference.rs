//! Read-only reference snapshot and the stores that produce it.
//!
//! A [`ReferenceSnapshot`] bundles everything the simulator may consult:
//! team strengths, pitcher lines, park factors, the schedule with probable
//! starters, starter projections and bullpen figures. It is built once and
//! shared behind an `Arc`; nothing mutates it afterwards.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

use super::bullpen::{BullpenSource, BullpenStats};
use super::park::{ParkFactorResolution, ParkFactorTable};
use super::{normalize_name, ReferenceDataProvider};
use crate::error::{PredictionError, Result};
use crate::storage;
use crate::types::GameKey;

/// Team strength values are clipped into this band on read.
pub const TEAM_STRENGTH_BOUND: f64 = 0.5;

// ---------------------------------------------------------------------------
// Input records
// ---------------------------------------------------------------------------

/// Season line for one pitcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PitcherStats {
    #[serde(default)]
    pub name: String,
    pub era: f64,
    pub whip: f64,
    pub innings_pitched: f64,
    pub games_started: u32,
}

/// Day-of projection for a starting pitcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StarterProjection {
    pub pitcher_name: String,
    #[serde(default)]
    pub projected_outs: Option<f64>,
    #[serde(default)]
    pub projected_earned_runs: Option<f64>,
    #[serde(default)]
    pub projected_strikeouts: Option<f64>,
}

/// A scheduled game with its announced starters, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledGame {
    pub game_date: NaiveDate,
    pub away_team: String,
    pub home_team: String,
    #[serde(default)]
    pub away_pitcher: Option<String>,
    #[serde(default)]
    pub home_pitcher: Option<String>,
}

impl ScheduledGame {
    pub fn key(&self) -> GameKey {
        GameKey::new(self.away_team.clone(), self.home_team.clone(), self.game_date)
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct ReferenceSnapshot {
    team_strengths: HashMap<String, f64>,
    pitchers: HashMap<String, PitcherStats>,
    /// normalised pitcher name -> pitcher id
    pitcher_names: HashMap<String, String>,
    park_factors: ParkFactorTable,
    schedule: HashMap<GameKey, ScheduledGame>,
    /// normalised pitcher name -> projection
    projections: HashMap<String, StarterProjection>,
    bullpens: HashMap<String, BullpenStats>,
}

impl ReferenceSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_team_strength(mut self, team: &str, strength: f64) -> Self {
        self.team_strengths.insert(team.to_string(), strength);
        self
    }

    pub fn with_pitcher(mut self, id: &str, stats: PitcherStats) -> Self {
        if !stats.name.trim().is_empty() {
            self.pitcher_names
                .insert(normalize_name(&stats.name), id.to_string());
        }
        self.pitchers.insert(id.to_string(), stats);
        self
    }

    pub fn with_park_factors(mut self, table: ParkFactorTable) -> Self {
        self.park_factors = table;
        self
    }

    pub fn with_game(mut self, game: ScheduledGame) -> Self {
        self.schedule.insert(game.key(), game);
        self
    }

    pub fn with_projection(mut self, projection: StarterProjection) -> Self {
        self.projections
            .insert(normalize_name(&projection.pitcher_name), projection);
        self
    }

    pub fn with_bullpen(mut self, team: &str, stats: BullpenStats) -> Self {
        self.bullpens.insert(team.to_string(), stats);
        self
    }

    /// Strength factor for a team, clipped to ±[`TEAM_STRENGTH_BOUND`].
    pub fn team_strength(&self, team: &str) -> Option<f64> {
        self.team_strengths
            .get(team)
            .filter(|s| s.is_finite())
            .map(|s| s.clamp(-TEAM_STRENGTH_BOUND, TEAM_STRENGTH_BOUND))
    }

    /// Find a pitcher by id, falling back to a case-insensitive name match.
    pub fn pitcher(&self, identifier: &str) -> Option<&PitcherStats> {
        self.pitchers.get(identifier).or_else(|| {
            self.pitcher_names
                .get(&normalize_name(identifier))
                .and_then(|id| self.pitchers.get(id))
        })
    }

    pub fn park_factor(&self, home_team: &str, date: NaiveDate) -> ParkFactorResolution {
        self.park_factors.resolve(home_team, date)
    }

    /// Schedule entry (with probable starters) for an exact matchup.
    pub fn scheduled_game(&self, game: &GameKey) -> Option<&ScheduledGame> {
        self.schedule.get(game)
    }

    /// All scheduled games on a date, in a stable order.
    pub fn games_on(&self, date: NaiveDate) -> Vec<ScheduledGame> {
        let mut games: Vec<_> = self
            .schedule
            .values()
            .filter(|g| g.game_date == date)
            .cloned()
            .collect();
        games.sort_by(|a, b| (&a.home_team, &a.away_team).cmp(&(&b.home_team, &b.away_team)));
        games
    }

    pub fn starter_projection(&self, pitcher: &str) -> Option<&StarterProjection> {
        self.projections.get(&normalize_name(pitcher))
    }

    pub fn team_count(&self) -> usize {
        self.team_strengths.len()
    }

    pub fn pitcher_count(&self) -> usize {
        self.pitchers.len()
    }
}

impl BullpenSource for ReferenceSnapshot {
    fn bullpen(&self, team: &str) -> Option<BullpenStats> {
        self.bullpens.get(team).filter(|b| b.era > 0.0).cloned()
    }

    fn label(&self) -> &'static str {
        "reference"
    }
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Serves one fixed snapshot. Used by tests and embedding callers.
#[derive(Debug, Clone)]
pub struct StaticReferenceStore {
    snapshot: Arc<ReferenceSnapshot>,
}

impl StaticReferenceStore {
    pub fn new(snapshot: ReferenceSnapshot) -> Self {
        Self {
            snapshot: Arc::new(snapshot),
        }
    }
}

impl ReferenceDataProvider for StaticReferenceStore {
    fn snapshot(&self) -> Result<Arc<ReferenceSnapshot>> {
        Ok(Arc::clone(&self.snapshot))
    }
}

// ---------------------------------------------------------------------------
// JSON directory store
// ---------------------------------------------------------------------------

const TEAM_STRENGTH_FILE: &str = "team_strength.json";
const PITCHERS_FILE: &str = "pitchers.json";
const PARK_FACTORS_FILE: &str = "park_factors.json";
const GAMES_FILE: &str = "games.json";
const PROJECTIONS_FILE: &str = "starter_projections.json";
const BULLPENS_FILE: &str = "bullpens.json";

/// Loads a snapshot from a directory of JSON files.
///
/// `team_strength.json` and `pitchers.json` are required; without them
/// the store is considered unavailable. The remaining files are optional.
/// The loaded snapshot is cached until [`JsonReferenceStore::reload`].
#[derive(Debug)]
pub struct JsonReferenceStore {
    dir: PathBuf,
    cached: RwLock<Option<Arc<ReferenceSnapshot>>>,
}

impl JsonReferenceStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cached: RwLock::new(None),
        }
    }

    /// Re-read the directory and swap the cached snapshot. On failure the
    /// previous snapshot stays in place.
    pub fn reload(&self) -> Result<Arc<ReferenceSnapshot>> {
        let fresh = Arc::new(self.load()?);
        let mut guard = self.cached.write().unwrap_or_else(|e| e.into_inner());
        *guard = Some(Arc::clone(&fresh));
        Ok(fresh)
    }

    fn load(&self) -> Result<ReferenceSnapshot> {
        let unavailable = |e: anyhow::Error| PredictionError::ReferenceStoreUnavailable(format!("{e:#}"));

        let strengths: HashMap<String, f64> =
            storage::read_json(&self.dir.join(TEAM_STRENGTH_FILE)).map_err(unavailable)?;
        let pitchers: HashMap<String, PitcherStats> =
            storage::read_json(&self.dir.join(PITCHERS_FILE)).map_err(unavailable)?;

        let mut snapshot = ReferenceSnapshot::new();
        for (team, strength) in &strengths {
            if strength.abs() > TEAM_STRENGTH_BOUND {
                warn!(team = %team, strength, "Team strength outside band, will be clipped");
            }
            snapshot = snapshot.with_team_strength(team, *strength);
        }
        for (id, stats) in pitchers {
            snapshot = snapshot.with_pitcher(&id, stats);
        }

        if let Some(table) = self.read_optional::<ParkFactorTable>(PARK_FACTORS_FILE) {
            snapshot = snapshot.with_park_factors(table);
        }
        for game in self.read_optional::<Vec<ScheduledGame>>(GAMES_FILE).unwrap_or_default() {
            snapshot = snapshot.with_game(game);
        }
        for p in self
            .read_optional::<Vec<StarterProjection>>(PROJECTIONS_FILE)
            .unwrap_or_default()
        {
            snapshot = snapshot.with_projection(p);
        }
        for (team, stats) in self
            .read_optional::<HashMap<String, BullpenStats>>(BULLPENS_FILE)
            .unwrap_or_default()
        {
            snapshot = snapshot.with_bullpen(&team, stats);
        }

        info!(
            dir = %self.dir.display(),
            teams = snapshot.team_count(),
            pitchers = snapshot.pitcher_count(),
            games = snapshot.schedule.len(),
            "Reference snapshot loaded"
        );
        Ok(snapshot)
    }

    /// Optional files: absent is fine, malformed is logged and skipped.
    fn read_optional<T: serde::de::DeserializeOwned>(&self, file: &str) -> Option<T> {
        let path = self.dir.join(file);
        if !path.exists() {
            debug!(path = %path.display(), "Optional reference file absent");
            return None;
        }
        match storage::read_json(&path) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(path = %path.display(), error = %format!("{e:#}"), "Skipping unreadable reference file");
                None
            }
        }
    }
}

impl ReferenceDataProvider for JsonReferenceStore {
    fn snapshot(&self) -> Result<Arc<ReferenceSnapshot>> {
        {
            let guard = self.cached.read().unwrap_or_else(|e| e.into_inner());
            if let Some(s) = guard.as_ref() {
                return Ok(Arc::clone(s));
            }
        }
        self.reload()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
