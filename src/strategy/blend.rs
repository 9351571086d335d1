//! Market line blending.
//!
//! Pulls the simulator's moneyline probability and total toward the
//! market's when the two disagree by more than a threshold. The moneyline
//! and the total are handled independently, and the raw model values are
//! always carried alongside the blended ones.

use tracing::{debug, info};

use super::odds::{self, AmericanOdds};
use crate::config::BlendingParameters;
use crate::types::{BlendedPrediction, GameOutcomeDistribution, MarketLine};

/// The model numbers going into the blend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelEstimate {
    pub home_win_probability: f64,
    pub away_score: f64,
    pub home_score: f64,
}

impl ModelEstimate {
    pub fn from_distribution(dist: &GameOutcomeDistribution) -> Self {
        Self {
            home_win_probability: dist.home_win_probability,
            away_score: dist.mean_away_score,
            home_score: dist.mean_home_score,
        }
    }

    pub fn total(&self) -> f64 {
        self.away_score + self.home_score
    }
}

/// De-vigged market home win probability. Needs both sides validly quoted;
/// a one-sided moneyline carries the vig and is not used.
pub fn market_home_probability(line: &MarketLine) -> Option<f64> {
    let home = line.home_moneyline.and_then(AmericanOdds::new)?;
    let away = line.away_moneyline.and_then(AmericanOdds::new)?;
    Some(odds::devig(home, away))
}

/// Market total, only when the line and both sides of it are quoted.
pub fn market_total(line: &MarketLine) -> Option<f64> {
    line.over_odds.and_then(AmericanOdds::new)?;
    line.under_odds.and_then(AmericanOdds::new)?;
    line.total_line.filter(|t| t.is_finite() && *t > 0.0)
}

#[derive(Debug, Clone)]
pub struct MarketLineBlender {
    config: BlendingParameters,
}

impl MarketLineBlender {
    pub fn new(config: BlendingParameters) -> Self {
        Self { config }
    }

    /// Blend a model estimate with whatever the market quotes.
    pub fn blend(&self, model: ModelEstimate, market: Option<&MarketLine>) -> BlendedPrediction {
        let raw_home = model.home_win_probability;
        let raw_total = model.total();

        let market_home = market.and_then(market_home_probability);
        let market_total = market.and_then(market_total);

        let (home_p, ml_blended) = self.blend_value(raw_home, market_home, self.config.moneyline_threshold);
        let (total, total_blended) = self.blend_value(raw_total, market_total, self.config.total_threshold);

        // Keep the score split when the total moves.
        let (away_score, home_score) = if total_blended && raw_total > 0.0 {
            let scale = total / raw_total;
            (model.away_score * scale, model.home_score * scale)
        } else {
            (model.away_score, model.home_score)
        };

        if ml_blended || total_blended {
            info!(
                raw_home = format!("{:.3}", raw_home),
                blended_home = format!("{:.3}", home_p),
                raw_total = format!("{:.2}", raw_total),
                blended_total = format!("{:.2}", total),
                "Model blended toward market"
            );
        } else {
            debug!("No blending applied");
        }

        BlendedPrediction {
            raw_home_win_probability: raw_home,
            raw_away_win_probability: 1.0 - raw_home,
            raw_total,
            home_win_probability: home_p,
            away_win_probability: 1.0 - home_p,
            predicted_total: total,
            predicted_away_score: away_score,
            predicted_home_score: home_score,
            market_home_probability: market_home,
            market_total,
            moneyline_blended: ml_blended,
            total_blended,
        }
    }

    /// `(1 − w)·model + w·market` when enabled and the gap exceeds `threshold`.
    fn blend_value(&self, model: f64, market: Option<f64>, threshold: f64) -> (f64, bool) {
        match market {
            Some(m) if self.config.enabled && (model - m).abs() > threshold => {
                let w = self.config.market_weight;
                ((1.0 - w) * model + w * m, true)
            }
            _ => (model, false),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
