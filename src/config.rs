//! Configuration loading from TOML with bound validation.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs. Every
//! section has documented defaults, unknown keys are rejected, and
//! `validate()` refuses out-of-range values instead of clamping them.
//!
//! The model parameters ([`SimulationConfig`]) are handed to components as
//! an immutable `Arc`. [`ConfigHandle`] allows a reload between requests by
//! swapping the whole snapshot atomically.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use tracing::info;

use crate::error::PredictionError;

// ---------------------------------------------------------------------------
// Top-level application config
// ---------------------------------------------------------------------------

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub model: SimulationConfig,
    pub data: DataConfig,
    pub slate: SlateConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DataConfig {
    /// Directory holding the reference, market and results JSON files.
    pub reference_dir: PathBuf,
    /// Directory where slate prediction records are written.
    pub output_dir: PathBuf,
    /// Fill missing bullpen lines from the built-in stub table instead of
    /// the league average.
    pub stub_bullpens: bool,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            reference_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("predictions"),
            stub_bullpens: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SlateConfig {
    /// Wall-clock budget for a whole slate.
    pub timeout_secs: u64,
    /// Trials per game. Overrides `preset` when both are set.
    pub trial_count: Option<u32>,
    /// Named trial count from `model.trials`; `default_trials` when neither
    /// this nor `trial_count` is set.
    pub preset: Option<TrialPreset>,
}

impl Default for SlateConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            trial_count: None,
            preset: None,
        }
    }
}

impl AppConfig {
    /// Load and validate configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config = Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to load config file: {path}"))?;
        info!(path, version = %config.model.version, "Configuration loaded");
        Ok(config)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents).context("Failed to parse TOML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> std::result::Result<(), PredictionError> {
        self.model.validate()?;
        if self.slate.timeout_secs == 0 {
            return Err(PredictionError::config("slate.timeout_secs", "must be positive"));
        }
        if let Some(n) = self.slate.trial_count {
            if n == 0 || n > self.model.trials.max_trial_count {
                return Err(PredictionError::config(
                    "slate.trial_count",
                    format!("must be within [1, {}]", self.model.trials.max_trial_count),
                ));
            }
        }
        Ok(())
    }

    /// Trials to request for each slate game.
    pub fn slate_trial_count(&self) -> Option<u32> {
        self.slate
            .trial_count
            .or_else(|| self.slate.preset.map(|p| self.model.trials.preset(p)))
    }
}

// ---------------------------------------------------------------------------
// Model parameters
// ---------------------------------------------------------------------------

/// The complete tunable parameter set used by one prediction run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Free-form version tag, echoed into every prediction record.
    pub version: String,
    pub engine: EngineParameters,
    pub pitcher_quality: PitcherQualityBounds,
    pub trials: TrialParameters,
    pub betting: BettingParameters,
    pub blending: BlendingParameters,
    pub pitching_plan: PitchingPlanParameters,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            engine: EngineParameters::default(),
            pitcher_quality: PitcherQualityBounds::default(),
            trials: TrialParameters::default(),
            betting: BettingParameters::default(),
            blending: BlendingParameters::default(),
            pitching_plan: PitchingPlanParameters::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineParameters {
    pub home_field_advantage: f64,
    pub away_field_boost: f64,
    /// Poisson rate for an average team before multipliers.
    pub base_lambda: f64,
    /// Scales the strength differential into a run multiplier.
    pub team_strength_multiplier: f64,
    pub pitcher_era_weight: f64,
    pub pitcher_whip_weight: f64,
    /// Standard deviation of the per-trial chaos draw.
    pub game_chaos_variance: f64,
    pub chaos_floor: f64,
    pub chaos_ceiling: f64,
    pub total_scoring_adjustment: f64,
    pub home_scoring_boost: f64,
    pub away_scoring_boost: f64,
    pub multiplier_floor: f64,
    pub multiplier_ceiling: f64,
    pub max_runs: u32,
    pub extra_inning_rounds: u32,
    pub extra_inning_score_probability: f64,
}

impl Default for EngineParameters {
    fn default() -> Self {
        Self {
            home_field_advantage: 0.08,
            away_field_boost: 0.01,
            base_lambda: 4.2,
            team_strength_multiplier: 0.17,
            pitcher_era_weight: 0.70,
            pitcher_whip_weight: 0.30,
            game_chaos_variance: 0.35,
            chaos_floor: 0.75,
            chaos_ceiling: 1.25,
            total_scoring_adjustment: 1.03,
            home_scoring_boost: 1.02,
            away_scoring_boost: 0.99,
            multiplier_floor: 0.6,
            multiplier_ceiling: 1.4,
            max_runs: 24,
            extra_inning_rounds: 5,
            extra_inning_score_probability: 0.6,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PitcherQualityBounds {
    pub min_quality_factor: f64,
    pub max_quality_factor: f64,
    pub ace_era_threshold: f64,
    pub good_era_threshold: f64,
    pub poor_era_threshold: f64,
    /// Pitchers with fewer starts are treated as neutral.
    pub min_games_started: u32,
}

impl Default for PitcherQualityBounds {
    fn default() -> Self {
        Self {
            min_quality_factor: 0.50,
            max_quality_factor: 1.60,
            ace_era_threshold: 2.75,
            good_era_threshold: 3.50,
            poor_era_threshold: 5.25,
            min_games_started: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrialParameters {
    pub default_trials: u32,
    pub quick_trials: u32,
    pub detailed_trials: u32,
    /// Hard ceiling; larger requests are rejected before simulating.
    pub max_trial_count: u32,
}

impl Default for TrialParameters {
    fn default() -> Self {
        Self {
            default_trials: 2000,
            quick_trials: 1000,
            detailed_trials: 5000,
            max_trial_count: 10_000,
        }
    }
}

/// Named trial-count presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrialPreset {
    Quick,
    Default,
    Detailed,
}

impl TrialParameters {
    pub fn preset(&self, preset: TrialPreset) -> u32 {
        match preset {
            TrialPreset::Quick => self.quick_trials,
            TrialPreset::Default => self.default_trials,
            TrialPreset::Detailed => self.detailed_trials,
        }
    }
}

/// How the over/under probability is derived for totals markets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TotalsModel {
    /// `0.5 + (predicted_total - line) * total_sensitivity`.
    Linear,
    /// Fraction of simulated trials landing over the line.
    Empirical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BettingParameters {
    pub min_edge: f64,
    /// Upper bound on the Kelly fraction (0.25 = quarter-Kelly).
    pub kelly_cap: f64,
    pub high_confidence_ev: f64,
    pub medium_confidence_ev: f64,
    /// Probability shift per run of distance between predicted total and line.
    pub total_sensitivity: f64,
    pub totals_model: TotalsModel,
    /// Bankroll the Kelly fraction is applied to when reporting a stake.
    pub unit_bankroll: Decimal,
}

impl Default for BettingParameters {
    fn default() -> Self {
        Self {
            min_edge: 0.03,
            kelly_cap: 0.25,
            high_confidence_ev: 0.10,
            medium_confidence_ev: 0.05,
            total_sensitivity: 0.05,
            totals_model: TotalsModel::Linear,
            unit_bankroll: dec!(100),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BlendingParameters {
    pub enabled: bool,
    /// Weight given to the market value, in [0, 1].
    pub market_weight: f64,
    /// Minimum |model - market| home-win probability gap before blending.
    pub moneyline_threshold: f64,
    /// Minimum |model - line| total-runs gap before blending.
    pub total_threshold: f64,
}

impl Default for BlendingParameters {
    fn default() -> Self {
        Self {
            enabled: false,
            market_weight: 0.25,
            moneyline_threshold: 0.02,
            total_threshold: 0.15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PitchingPlanParameters {
    pub enabled: bool,
    pub projection_weight: f64,
    pub simulation_weight: f64,
    /// Starter innings assumed when no projection is available.
    pub default_starter_innings: f64,
    pub league_avg_starter_era: f64,
    pub league_avg_bullpen_era: f64,
    pub league_avg_k9: f64,
}

impl Default for PitchingPlanParameters {
    fn default() -> Self {
        Self {
            enabled: false,
            projection_weight: 0.6,
            simulation_weight: 0.4,
            default_starter_innings: 5.2,
            league_avg_starter_era: 4.30,
            league_avg_bullpen_era: 4.15,
            league_avg_k9: 8.7,
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn check_range(field: &str, value: f64, lo: f64, hi: f64) -> std::result::Result<(), PredictionError> {
    if !value.is_finite() || value < lo || value > hi {
        return Err(PredictionError::config(
            field,
            format!("{value} is outside [{lo}, {hi}]"),
        ));
    }
    Ok(())
}

fn check_positive(field: &str, value: f64, hi: f64) -> std::result::Result<(), PredictionError> {
    if !value.is_finite() || value <= 0.0 || value > hi {
        return Err(PredictionError::config(
            field,
            format!("{value} is outside (0, {hi}]"),
        ));
    }
    Ok(())
}

impl SimulationConfig {
    /// Check every parameter against its valid bound. Never clamps.
    pub fn validate(&self) -> std::result::Result<(), PredictionError> {
        if self.version.trim().is_empty() {
            return Err(PredictionError::config("model.version", "must not be empty"));
        }

        let e = &self.engine;
        check_range("engine.home_field_advantage", e.home_field_advantage, -0.5, 0.5)?;
        check_range("engine.away_field_boost", e.away_field_boost, -0.5, 0.5)?;
        check_positive("engine.base_lambda", e.base_lambda, 15.0)?;
        check_range("engine.team_strength_multiplier", e.team_strength_multiplier, 0.0, 1.0)?;
        check_range("engine.pitcher_era_weight", e.pitcher_era_weight, 0.0, 2.0)?;
        check_range("engine.pitcher_whip_weight", e.pitcher_whip_weight, 0.0, 2.0)?;
        if e.pitcher_era_weight + e.pitcher_whip_weight <= 0.0 {
            return Err(PredictionError::config(
                "engine.pitcher_era_weight",
                "ERA and WHIP weights cannot both be zero",
            ));
        }
        check_range("engine.game_chaos_variance", e.game_chaos_variance, 0.0, 1.0)?;
        check_range("engine.chaos_floor", e.chaos_floor, 0.1, 1.0)?;
        check_range("engine.chaos_ceiling", e.chaos_ceiling, 1.0, 3.0)?;
        check_range("engine.total_scoring_adjustment", e.total_scoring_adjustment, 0.5, 1.5)?;
        check_range("engine.home_scoring_boost", e.home_scoring_boost, 0.5, 1.5)?;
        check_range("engine.away_scoring_boost", e.away_scoring_boost, 0.5, 1.5)?;
        check_range("engine.multiplier_floor", e.multiplier_floor, 0.1, 1.0)?;
        check_range("engine.multiplier_ceiling", e.multiplier_ceiling, 1.0, 3.0)?;
        if e.max_runs == 0 || e.max_runs > 50 {
            return Err(PredictionError::config("engine.max_runs", "must be within [1, 50]"));
        }
        if e.extra_inning_rounds > 20 {
            return Err(PredictionError::config(
                "engine.extra_inning_rounds",
                "must be at most 20",
            ));
        }
        check_range(
            "engine.extra_inning_score_probability",
            e.extra_inning_score_probability,
            0.0,
            1.0,
        )?;

        let p = &self.pitcher_quality;
        check_range("pitcher_quality.min_quality_factor", p.min_quality_factor, 0.1, 1.0)?;
        check_range("pitcher_quality.max_quality_factor", p.max_quality_factor, 1.0, 3.0)?;
        if !(0.0 < p.ace_era_threshold
            && p.ace_era_threshold < p.good_era_threshold
            && p.good_era_threshold < p.poor_era_threshold
            && p.poor_era_threshold < 10.0)
        {
            return Err(PredictionError::config(
                "pitcher_quality.era_thresholds",
                "must satisfy 0 < ace < good < poor < 10",
            ));
        }

        let t = &self.trials;
        if t.max_trial_count == 0 {
            return Err(PredictionError::config("trials.max_trial_count", "must be positive"));
        }
        for (field, n) in [
            ("trials.default_trials", t.default_trials),
            ("trials.quick_trials", t.quick_trials),
            ("trials.detailed_trials", t.detailed_trials),
        ] {
            if n == 0 || n > t.max_trial_count {
                return Err(PredictionError::config(
                    field,
                    format!("must be within [1, {}]", t.max_trial_count),
                ));
            }
        }

        let b = &self.betting;
        check_range("betting.min_edge", b.min_edge, 0.0, 0.5)?;
        check_positive("betting.kelly_cap", b.kelly_cap, 1.0)?;
        check_range("betting.medium_confidence_ev", b.medium_confidence_ev, 0.0, 1.0)?;
        check_range("betting.high_confidence_ev", b.high_confidence_ev, b.medium_confidence_ev, 2.0)?;
        check_positive("betting.total_sensitivity", b.total_sensitivity, 0.5)?;
        if b.unit_bankroll <= Decimal::ZERO {
            return Err(PredictionError::config("betting.unit_bankroll", "must be positive"));
        }

        let m = &self.blending;
        check_range("blending.market_weight", m.market_weight, 0.0, 1.0)?;
        check_range("blending.moneyline_threshold", m.moneyline_threshold, 0.0, 1.0)?;
        check_range("blending.total_threshold", m.total_threshold, 0.0, 10.0)?;

        let pp = &self.pitching_plan;
        check_range("pitching_plan.projection_weight", pp.projection_weight, 0.0, 1.0)?;
        check_range("pitching_plan.simulation_weight", pp.simulation_weight, 0.0, 1.0)?;
        if (pp.projection_weight + pp.simulation_weight - 1.0).abs() > 1e-9 {
            return Err(PredictionError::config(
                "pitching_plan.projection_weight",
                "projection_weight + simulation_weight must equal 1",
            ));
        }
        check_positive("pitching_plan.default_starter_innings", pp.default_starter_innings, 9.0)?;
        check_positive("pitching_plan.league_avg_starter_era", pp.league_avg_starter_era, 15.0)?;
        check_positive("pitching_plan.league_avg_bullpen_era", pp.league_avg_bullpen_era, 15.0)?;
        check_positive("pitching_plan.league_avg_k9", pp.league_avg_k9, 20.0)?;

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Hot-reload handle
// ---------------------------------------------------------------------------

/// Shared holder for the current configuration snapshot.
///
/// Readers take an `Arc` once per request and keep using it even if a
/// reload happens mid-prediction; a reload validates first and then swaps
/// the pointer, so a simulation never observes a half-applied config.
#[derive(Debug)]
pub struct ConfigHandle {
    current: RwLock<Arc<SimulationConfig>>,
}

impl ConfigHandle {
    pub fn new(config: SimulationConfig) -> std::result::Result<Self, PredictionError> {
        config.validate()?;
        Ok(Self {
            current: RwLock::new(Arc::new(config)),
        })
    }

    /// The snapshot in force right now.
    pub fn snapshot(&self) -> Arc<SimulationConfig> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Validate and install a new configuration. The previous snapshot stays
    /// in force if validation fails.
    pub fn reload(&self, config: SimulationConfig) -> std::result::Result<(), PredictionError> {
        config.validate()?;
        let version = config.version.clone();
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        *guard = Arc::new(config);
        info!(version = %version, "Configuration reloaded");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(SimulationConfig::default().validate().is_ok());
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let cfg = AppConfig::from_toml_str("").unwrap();
        assert_eq!(cfg.model.engine.base_lambda, 4.2);
        assert_eq!(cfg.model.betting.kelly_cap, 0.25);
        assert_eq!(cfg.model.trials.default_trials, 2000);
        assert!(!cfg.model.blending.enabled);
    }

    #[test]
    fn test_partial_override() {
        let cfg = AppConfig::from_toml_str(
            r#"
            [model]
            version = "2025-tuned"

            [model.engine]
            home_field_advantage = 0.10

            [model.blending]
            enabled = true
            market_weight = 0.3
            "#,
        )
        .unwrap();
        assert_eq!(cfg.model.version, "2025-tuned");
        assert_eq!(cfg.model.engine.home_field_advantage, 0.10);
        assert_eq!(cfg.model.engine.away_field_boost, 0.01);
        assert!(cfg.model.blending.enabled);
        assert_eq!(cfg.model.blending.market_weight, 0.3);
    }

    #[test]
    fn test_out_of_bound_is_rejected_not_clamped() {
        let err = AppConfig::from_toml_str(
            r#"
            [model.betting]
            kelly_cap = 1.5
            "#,
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("betting.kelly_cap"));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let result = AppConfig::from_toml_str(
            r#"
            [model.engine]
            home_feild_advantage = 0.1
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_blend_weight_bounds() {
        let mut cfg = SimulationConfig::default();
        cfg.blending.market_weight = -0.1;
        assert!(matches!(
            cfg.validate(),
            Err(PredictionError::ConfigurationInvalid { .. })
        ));
    }

    #[test]
    fn test_era_thresholds_must_be_ordered() {
        let mut cfg = SimulationConfig::default();
        cfg.pitcher_quality.good_era_threshold = 2.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_trial_presets_within_max() {
        let mut cfg = SimulationConfig::default();
        cfg.trials.detailed_trials = 20_000;
        assert!(cfg.validate().is_err());
        let t = TrialParameters::default();
        assert_eq!(t.preset(TrialPreset::Quick), 1000);
        assert_eq!(t.preset(TrialPreset::Detailed), 5000);
    }

    #[test]
    fn test_slate_preset_resolves_trial_count() {
        let cfg = AppConfig::from_toml_str(
            r#"
            [slate]
            preset = "quick"

            [model.trials]
            quick_trials = 750
            "#,
        )
        .unwrap();
        assert_eq!(cfg.slate.preset, Some(TrialPreset::Quick));
        assert_eq!(cfg.slate_trial_count(), Some(750));

        let cfg = AppConfig::from_toml_str(
            r#"
            [slate]
            preset = "detailed"
            trial_count = 1200
            "#,
        )
        .unwrap();
        assert_eq!(cfg.slate_trial_count(), Some(1200));

        assert_eq!(AppConfig::default().slate_trial_count(), None);
        assert!(AppConfig::from_toml_str("[slate]\npreset = \"huge\"").is_err());
    }

    #[test]
    fn test_pitching_plan_weights_sum_to_one() {
        let mut cfg = SimulationConfig::default();
        cfg.pitching_plan.projection_weight = 0.7;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_totals_model_parses() {
        let cfg = AppConfig::from_toml_str(
            r#"
            [model.betting]
            totals_model = "empirical"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.model.betting.totals_model, TotalsModel::Empirical);
    }

    #[test]
    fn test_handle_reload_swaps_snapshot() {
        let handle = ConfigHandle::new(SimulationConfig::default()).unwrap();
        let before = handle.snapshot();

        let mut next = SimulationConfig::default();
        next.version = "2.0".into();
        handle.reload(next).unwrap();

        assert_eq!(before.version, "1.0");
        assert_eq!(handle.snapshot().version, "2.0");
    }

    #[test]
    fn test_handle_rejects_invalid_reload() {
        let handle = ConfigHandle::new(SimulationConfig::default()).unwrap();
        let mut bad = SimulationConfig::default();
        bad.engine.base_lambda = 0.0;
        assert!(handle.reload(bad).is_err());
        assert_eq!(handle.snapshot().engine.base_lambda, 4.2);
    }

    #[test]
    fn test_slate_trial_count_checked() {
        let result = AppConfig::from_toml_str(
            r#"
            [slate]
            trial_count = 0
            "#,
        );
        assert!(result.is_err());
    }
}
