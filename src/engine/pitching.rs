//! Starter-plus-bullpen pitching plans.
//!
//! A plan estimates the runs a club's staff allows over nine innings from
//! the starter's day-of projection (or his season ERA) and the bullpen's
//! ERA for the remaining innings. When enabled, the plan totals are mixed
//! into the simulated run means.

use std::sync::Arc;
use tracing::{debug, info};

use crate::config::PitchingPlanParameters;
use crate::data::{is_placeholder_pitcher, BullpenSource, ReferenceSnapshot};
use crate::types::{PitchingPlan, PitchingPlanAudit};

const INNINGS_PER_GAME: f64 = 9.0;
const MIN_BLENDED_MEAN: f64 = 0.1;

pub struct PitchingPlanner {
    params: PitchingPlanParameters,
    /// Consulted when the snapshot has no bullpen line for a club.
    fallback_bullpens: Option<Arc<dyn BullpenSource>>,
}

impl PitchingPlanner {
    pub fn new(params: PitchingPlanParameters) -> Self {
        Self {
            params,
            fallback_bullpens: None,
        }
    }

    pub fn with_fallback_bullpens(mut self, source: Arc<dyn BullpenSource>) -> Self {
        self.fallback_bullpens = Some(source);
        self
    }

    /// Runs allowed by `team`'s staff with `starter` on the mound.
    pub fn plan(&self, reference: &ReferenceSnapshot, starter: Option<&str>, team: &str) -> PitchingPlan {
        let starter = starter.filter(|s| !is_placeholder_pitcher(s));
        let projection = starter.and_then(|s| reference.starter_projection(s));

        let starter_innings = projection
            .and_then(|p| p.projected_outs)
            .filter(|outs| outs.is_finite() && *outs > 0.0)
            .map(|outs| (outs / 3.0).min(INNINGS_PER_GAME))
            .unwrap_or(self.params.default_starter_innings);

        let starter_earned_runs = projection
            .and_then(|p| p.projected_earned_runs)
            .filter(|er| er.is_finite() && *er >= 0.0)
            .unwrap_or_else(|| {
                let era = starter
                    .and_then(|s| reference.pitcher(s))
                    .map(|p| p.era)
                    .filter(|era| era.is_finite() && *era > 0.0)
                    .unwrap_or(self.params.league_avg_starter_era);
                era / INNINGS_PER_GAME * starter_innings
            });

        let strikeout_factor = projection
            .and_then(|p| p.projected_strikeouts)
            .filter(|k| k.is_finite() && *k > 0.0)
            .map(|k| self.strikeout_factor(k, starter_innings))
            .unwrap_or(1.0);

        let bullpen_era = self.bullpen_era(reference, team);
        let bullpen_innings = (INNINGS_PER_GAME - starter_innings).max(0.0);
        let bullpen_runs = bullpen_era / INNINGS_PER_GAME * bullpen_innings;

        PitchingPlan {
            starter_innings,
            starter_earned_runs,
            strikeout_factor,
            bullpen_innings,
            bullpen_era,
            bullpen_runs,
            total_runs_allowed: starter_earned_runs * strikeout_factor + bullpen_runs,
        }
    }

    /// Mix plan totals into simulated means. The away plan's runs allowed
    /// become the home side's expected runs and vice versa.
    pub fn blend_means(
        &self,
        away_mean: f64,
        home_mean: f64,
        away_plan: PitchingPlan,
        home_plan: PitchingPlan,
    ) -> PitchingPlanAudit {
        let wp = self.params.projection_weight;
        let ws = self.params.simulation_weight;
        let away_after = (wp * home_plan.total_runs_allowed + ws * away_mean).max(MIN_BLENDED_MEAN);
        let home_after = (wp * away_plan.total_runs_allowed + ws * home_mean).max(MIN_BLENDED_MEAN);

        info!(
            away_before = format!("{:.2}", away_mean),
            away_after = format!("{:.2}", away_after),
            home_before = format!("{:.2}", home_mean),
            home_after = format!("{:.2}", home_after),
            "Run means blended with pitching plans"
        );

        PitchingPlanAudit {
            away_plan,
            home_plan,
            projection_weight: wp,
            simulation_weight: ws,
            away_mean_before: away_mean,
            home_mean_before: home_mean,
            away_mean_after: away_after,
            home_mean_after: home_after,
        }
    }

    /// Higher strikeout rates suppress runs: `(1 / ratio)^0.25`, bounded.
    fn strikeout_factor(&self, strikeouts: f64, innings: f64) -> f64 {
        let k9 = strikeouts / innings * INNINGS_PER_GAME;
        let ratio = (k9 / self.params.league_avg_k9).clamp(0.4, 2.0);
        (1.0 / ratio).powf(0.25).clamp(0.9, 1.1)
    }

    fn bullpen_era(&self, reference: &ReferenceSnapshot, team: &str) -> f64 {
        if let Some(b) = reference.bullpen(team) {
            return b.era;
        }
        if let Some(source) = &self.fallback_bullpens {
            if let Some(b) = source.bullpen(team).filter(|b| b.era > 0.0) {
                debug!(team, source = source.label(), "Bullpen from fallback source");
                return b.era;
            }
        }
        self.params.league_avg_bullpen_era
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
