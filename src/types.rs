//! Shared types for the DIAMOND engine.
//!
//! These types form the data model used across all modules. Simulator,
//! strategy and orchestration code depend on them without depending on
//! each other.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Game identity
// ---------------------------------------------------------------------------

/// One scheduled matchup. Team ids are whatever the reference data uses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GameKey {
    pub away_team: String,
    pub home_team: String,
    pub game_date: NaiveDate,
}

impl GameKey {
    pub fn new(away_team: impl Into<String>, home_team: impl Into<String>, game_date: NaiveDate) -> Self {
        Self {
            away_team: away_team.into(),
            home_team: home_team.into(),
            game_date,
        }
    }
}

impl fmt::Display for GameKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {} ({})", self.away_team, self.home_team, self.game_date)
    }
}

/// Which club in a matchup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamSide {
    Away,
    Home,
}

impl fmt::Display for TeamSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TeamSide::Away => write!(f, "away"),
            TeamSide::Home => write!(f, "home"),
        }
    }
}

// ---------------------------------------------------------------------------
// Market data
// ---------------------------------------------------------------------------

/// Sportsbook quote for one game. Every field is optional: `None` means
/// the book has nothing for that market.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketLine {
    pub home_moneyline: Option<i32>,
    pub away_moneyline: Option<i32>,
    pub total_line: Option<f64>,
    pub over_odds: Option<i32>,
    pub under_odds: Option<i32>,
    /// Home team's spread, e.g. `-1.5` when the home side lays the runs.
    pub run_line: Option<f64>,
    pub home_run_line_odds: Option<i32>,
    pub away_run_line_odds: Option<i32>,
}

impl MarketLine {
    /// True when no market at all is quoted.
    pub fn is_empty(&self) -> bool {
        self == &MarketLine::default()
    }
}

/// The three markets the analyzer prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetType {
    Moneyline,
    Total,
    RunLine,
}

impl fmt::Display for BetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BetType::Moneyline => write!(f, "Moneyline"),
            BetType::Total => write!(f, "Total"),
            BetType::RunLine => write!(f, "Run line"),
        }
    }
}

/// Bet direction within a market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetSide {
    Home,
    Away,
    Over,
    Under,
}

impl fmt::Display for BetSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BetSide::Home => write!(f, "Home"),
            BetSide::Away => write!(f, "Away"),
            BetSide::Over => write!(f, "Over"),
            BetSide::Under => write!(f, "Under"),
        }
    }
}

/// Display/filter tier. Never feeds into stake sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConfidenceTier {
    Low,
    Medium,
    High,
}

impl fmt::Display for ConfidenceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfidenceTier::Low => write!(f, "LOW"),
            ConfidenceTier::Medium => write!(f, "MEDIUM"),
            ConfidenceTier::High => write!(f, "HIGH"),
        }
    }
}

/// A positive-EV bet the analyzer is willing to stand behind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueRecommendation {
    pub bet_type: BetType,
    pub side: BetSide,
    /// Total or spread the bet is priced at; `None` for moneylines.
    pub line: Option<f64>,
    /// American odds.
    pub odds: i32,
    pub model_probability: f64,
    pub implied_probability: f64,
    pub edge: f64,
    /// Expected profit per unit staked.
    pub expected_value: f64,
    /// Capped Kelly fraction of bankroll.
    pub kelly_fraction: f64,
    /// `kelly_fraction` applied to the configured unit bankroll.
    pub stake: Decimal,
    pub confidence: ConfidenceTier,
    pub rationale: String,
}

impl fmt::Display for ValueRecommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let line = match self.line {
            Some(l) => format!(" {l}"),
            None => String::new(),
        };
        write!(
            f,
            "{} {}{} ({:+}) | model {:.1}% vs market {:.1}% | EV {:+.3} | Kelly {:.1}% [{}]",
            self.bet_type,
            self.side,
            line,
            self.odds,
            self.model_probability * 100.0,
            self.implied_probability * 100.0,
            self.expected_value,
            self.kelly_fraction * 100.0,
            self.confidence,
        )
    }
}

// ---------------------------------------------------------------------------
// Simulation output
// ---------------------------------------------------------------------------

/// 10th / 90th percentile band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreRange {
    pub p10: f64,
    pub p90: f64,
}

/// Aggregate of all simulated trials for one matchup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameOutcomeDistribution {
    pub trials: u32,
    pub mean_away_score: f64,
    pub mean_home_score: f64,
    pub mean_total: f64,
    pub away_score_range: ScoreRange,
    pub home_score_range: ScoreRange,
    pub total_range: ScoreRange,
    pub home_win_probability: f64,
    pub away_win_probability: f64,
    pub total_runs_std_dev: f64,
    /// 0–100 score that drops as the total-runs spread widens.
    pub model_confidence: f64,
    /// Trial counts keyed by home minus away runs. Zero never appears.
    pub run_differential_counts: BTreeMap<i32, u32>,
    /// Trial counts keyed by total runs.
    pub total_runs_counts: BTreeMap<u32, u32>,
}

impl GameOutcomeDistribution {
    /// Probability the home side covers `home_spread` (e.g. `-1.5`), with
    /// pushes removed from both sides of the ratio.
    pub fn home_cover_probability(&self, home_spread: f64) -> Option<f64> {
        let mut covers = 0u64;
        let mut decided = 0u64;
        for (&diff, &count) in &self.run_differential_counts {
            let margin = diff as f64 + home_spread;
            if margin.abs() < 1e-9 {
                continue;
            }
            decided += count as u64;
            if margin > 0.0 {
                covers += count as u64;
            }
        }
        (decided > 0).then(|| covers as f64 / decided as f64)
    }

    /// Fraction of trials going over `line`, pushes removed.
    pub fn over_probability(&self, line: f64) -> Option<f64> {
        let mut over = 0u64;
        let mut decided = 0u64;
        for (&total, &count) in &self.total_runs_counts {
            let margin = total as f64 - line;
            if margin.abs() < 1e-9 {
                continue;
            }
            decided += count as u64;
            if margin > 0.0 {
                over += count as u64;
            }
        }
        (decided > 0).then(|| over as f64 / decided as f64)
    }
}

/// How a starting pitcher identifier was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PitcherSource {
    /// Supplied explicitly by the caller.
    Caller,
    /// Looked up in the probable-starters table.
    ProbableStarters,
    Unresolved,
}

/// Which starters were used and what they did to the opposing offense.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PitcherDiagnostics {
    pub away_pitcher: Option<String>,
    pub home_pitcher: Option<String>,
    pub away_pitcher_source: PitcherSource,
    pub home_pitcher_source: PitcherSource,
    /// Quality multiplier of the away starter (applied to home scoring).
    pub away_pitcher_factor: f64,
    /// Quality multiplier of the home starter (applied to away scoring).
    pub home_pitcher_factor: f64,
}

/// Expected runs allowed over nine innings by one club's pitching staff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PitchingPlan {
    pub starter_innings: f64,
    pub starter_earned_runs: f64,
    pub strikeout_factor: f64,
    pub bullpen_innings: f64,
    pub bullpen_era: f64,
    pub bullpen_runs: f64,
    pub total_runs_allowed: f64,
}

/// Record of the optional pitching-plan adjustment to the run means.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PitchingPlanAudit {
    pub away_plan: PitchingPlan,
    pub home_plan: PitchingPlan,
    pub projection_weight: f64,
    pub simulation_weight: f64,
    pub away_mean_before: f64,
    pub home_mean_before: f64,
    pub away_mean_after: f64,
    pub home_mean_after: f64,
}

// ---------------------------------------------------------------------------
// Blended prediction
// ---------------------------------------------------------------------------

/// Model numbers before and after market blending. The raw values are
/// always kept next to the blended ones.
///
/// "Raw" means pre-market: when the pitching plan is enabled, `raw_total`
/// and the predicted scores already carry its adjustment. The untouched
/// simulator means live in the distribution and the plan audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlendedPrediction {
    pub raw_home_win_probability: f64,
    pub raw_away_win_probability: f64,
    pub raw_total: f64,
    pub home_win_probability: f64,
    pub away_win_probability: f64,
    pub predicted_total: f64,
    pub predicted_away_score: f64,
    pub predicted_home_score: f64,
    /// Market-implied (de-vigged when possible) home win probability.
    pub market_home_probability: Option<f64>,
    pub market_total: Option<f64>,
    pub moneyline_blended: bool,
    pub total_blended: bool,
}

// ---------------------------------------------------------------------------
// Degradation flags
// ---------------------------------------------------------------------------

/// A recoverable gap in the inputs. The prediction was still produced, with
/// a neutral value standing in for the missing piece.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Degradation {
    MissingTeamStrength { team: String },
    /// No starter could be identified for this side.
    UnresolvedPitcher { side: TeamSide },
    /// A starter was named but has no usable stats.
    MissingPitcherStats { pitcher: String },
    MissingParkFactor { team: String },
    /// Only the season-long park factor was available for the date.
    StaticParkFactor { team: String },
    MarketDataIncomplete { market: BetType },
    InvalidOdds { market: BetType, odds: i32 },
}

impl fmt::Display for Degradation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Degradation::MissingTeamStrength { team } => write!(f, "no strength factor for {team}"),
            Degradation::UnresolvedPitcher { side } => write!(f, "no {side} starter identified"),
            Degradation::MissingPitcherStats { pitcher } => write!(f, "no stats for pitcher {pitcher}"),
            Degradation::MissingParkFactor { team } => write!(f, "no park factor for {team}"),
            Degradation::StaticParkFactor { team } => write!(f, "static park factor used for {team}"),
            Degradation::MarketDataIncomplete { market } => write!(f, "{market} market incomplete"),
            Degradation::InvalidOdds { market, odds } => write!(f, "invalid {market} odds {odds}"),
        }
    }
}

impl Degradation {
    /// Whether this gap touches the simulation inputs (as opposed to only
    /// the betting markets).
    pub fn affects_model(&self) -> bool {
        !matches!(
            self,
            Degradation::MarketDataIncomplete { .. } | Degradation::InvalidOdds { .. }
        )
    }
}

// ---------------------------------------------------------------------------
// Final records
// ---------------------------------------------------------------------------

/// Where a returned record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Simulated,
    Historical,
}

/// Execution metadata attached to every simulated record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionMetadata {
    pub trial_count: u32,
    pub elapsed_ms: f64,
    pub data_source: DataSource,
    pub config_version: String,
    pub recommendations_found: usize,
    pub generated_at: DateTime<Utc>,
}

/// Full output of one simulated game prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub prediction_id: Uuid,
    pub game: GameKey,
    pub distribution: GameOutcomeDistribution,
    pub pitching_plan: Option<PitchingPlanAudit>,
    pub blended: BlendedPrediction,
    pub pitchers: PitcherDiagnostics,
    pub market: Option<MarketLine>,
    /// Ordered by expected value, best first.
    pub recommendations: Vec<ValueRecommendation>,
    pub degradations: Vec<Degradation>,
    pub metadata: ExecutionMetadata,
}

impl PredictionRecord {
    /// True when any model input fell back to a neutral default.
    pub fn is_degraded(&self) -> bool {
        self.degradations.iter().any(Degradation::affects_model)
    }

    pub fn best_recommendation(&self) -> Option<&ValueRecommendation> {
        self.recommendations.first()
    }
}

/// An already-played game as recorded by the results store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalResult {
    pub away_score: u32,
    pub home_score: u32,
    #[serde(default)]
    pub predicted_away_score: Option<f64>,
    #[serde(default)]
    pub predicted_home_score: Option<f64>,
    #[serde(default)]
    pub predicted_total_runs: Option<f64>,
}

impl HistoricalResult {
    pub fn home_won(&self) -> bool {
        self.home_score > self.away_score
    }

    /// Absolute miss on total runs, if a pre-game total was stored.
    pub fn total_error(&self) -> Option<f64> {
        self.predicted_total_runs
            .map(|p| (p - (self.away_score + self.home_score) as f64).abs())
    }

    /// Whether the stored pre-game prediction picked the winner.
    pub fn winner_correct(&self) -> Option<bool> {
        match (self.predicted_away_score, self.predicted_home_score) {
            (Some(a), Some(h)) => Some((h > a) == self.home_won()),
            _ => None,
        }
    }
}

/// Short-circuit output for a game that has already been played.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalRecord {
    pub game: GameKey,
    pub result: HistoricalResult,
    pub data_source: DataSource,
}

/// What the orchestrator hands back for one game.
///
/// Externally tagged: the distribution histograms have integer map keys,
/// which do not survive the buffering an internally tagged enum needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePrediction {
    Historical(HistoricalRecord),
    Simulated(Box<PredictionRecord>),
}

impl GamePrediction {
    pub fn game(&self) -> &GameKey {
        match self {
            GamePrediction::Historical(h) => &h.game,
            GamePrediction::Simulated(p) => &p.game,
        }
    }

    pub fn data_source(&self) -> DataSource {
        match self {
            GamePrediction::Historical(_) => DataSource::Historical,
            GamePrediction::Simulated(_) => DataSource::Simulated,
        }
    }

    pub fn as_simulated(&self) -> Option<&PredictionRecord> {
        match self {
            GamePrediction::Simulated(p) => Some(p),
            GamePrediction::Historical(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
