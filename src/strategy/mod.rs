//! Strategy engine: odds math, value detection, Kelly sizing and market
//! blending.

pub mod blend;
pub mod edge;
pub mod kelly;
pub mod odds;

use tracing::{debug, info};

use crate::config::{BettingParameters, TotalsModel};
use crate::types::{
    BetSide, BetType, BlendedPrediction, Degradation, GameOutcomeDistribution, MarketLine,
    ValueRecommendation,
};
use edge::{Candidate, Edge, EdgeConfig, EdgeDetector};
use kelly::{KellyCalculator, KellyConfig};
use odds::AmericanOdds;

pub use blend::{MarketLineBlender, ModelEstimate};

/// Totals probabilities are kept away from certainty.
const TOTAL_PROBABILITY_FLOOR: f64 = 0.01;
const TOTAL_PROBABILITY_CEILING: f64 = 0.99;

/// Result of pricing every quoted market for one game.
#[derive(Debug, Clone, Default)]
pub struct ValueAnalysis {
    /// Ordered by expected value, best first.
    pub recommendations: Vec<ValueRecommendation>,
    pub degradations: Vec<Degradation>,
}

// ---------------------------------------------------------------------------
// Analyzer
// ---------------------------------------------------------------------------

/// Pipelines candidate pricing → edge detection → Kelly sizing → ranking.
#[derive(Debug, Clone)]
pub struct BettingValueAnalyzer {
    edge_detector: EdgeDetector,
    kelly: KellyCalculator,
    totals_model: TotalsModel,
    total_sensitivity: f64,
}

impl BettingValueAnalyzer {
    pub fn new(
        edge_detector: EdgeDetector,
        kelly: KellyCalculator,
        totals_model: TotalsModel,
        total_sensitivity: f64,
    ) -> Self {
        Self {
            edge_detector,
            kelly,
            totals_model,
            total_sensitivity,
        }
    }

    pub fn from_config(params: &BettingParameters) -> Self {
        Self::new(
            EdgeDetector::new(EdgeConfig::from(params)),
            KellyCalculator::new(KellyConfig::from(params)),
            params.totals_model,
            params.total_sensitivity,
        )
    }

    /// Price every market in `market` against the blended prediction.
    ///
    /// Markets that are not quoted at all are skipped silently. A market
    /// quoted with pieces missing is flagged and skipped whole; an invalid
    /// price is flagged and only that side is dropped. The other markets
    /// are still priced.
    pub fn analyze(
        &self,
        blended: &BlendedPrediction,
        distribution: &GameOutcomeDistribution,
        market: Option<&MarketLine>,
    ) -> ValueAnalysis {
        let mut analysis = ValueAnalysis::default();
        let Some(market) = market else {
            debug!("No market quoted, nothing to price");
            return analysis;
        };

        let mut candidates = Vec::new();
        self.moneyline_candidates(blended, market, &mut candidates, &mut analysis.degradations);
        self.total_candidates(blended, distribution, market, &mut candidates, &mut analysis.degradations);
        self.run_line_candidates(distribution, market, &mut candidates, &mut analysis.degradations);

        let priced = candidates.len();
        let edges: Vec<Edge> = candidates
            .into_iter()
            .filter_map(|c| self.edge_detector.detect(c))
            .collect();

        let mut recommendations: Vec<ValueRecommendation> =
            edges.into_iter().map(|e| self.recommend(e)).collect();
        recommendations.sort_by(|a, b| {
            b.expected_value
                .partial_cmp(&a.expected_value)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        info!(
            priced,
            recommended = recommendations.len(),
            flagged = analysis.degradations.len(),
            "Value analysis complete"
        );

        analysis.recommendations = recommendations;
        analysis
    }

    /// Over probability for a totals line under the configured model.
    pub fn over_probability(
        &self,
        predicted_total: f64,
        line: f64,
        distribution: &GameOutcomeDistribution,
    ) -> Option<f64> {
        let p = match self.totals_model {
            TotalsModel::Linear => 0.5 + (predicted_total - line) * self.total_sensitivity,
            TotalsModel::Empirical => distribution.over_probability(line)?,
        };
        Some(p.clamp(TOTAL_PROBABILITY_FLOOR, TOTAL_PROBABILITY_CEILING))
    }

    fn recommend(&self, edge: Edge) -> ValueRecommendation {
        let sizing = self.kelly.size(edge.candidate.model_probability, edge.candidate.odds);
        ValueRecommendation {
            bet_type: edge.candidate.bet_type,
            side: edge.candidate.side,
            line: edge.candidate.line,
            odds: edge.candidate.odds.value(),
            model_probability: edge.candidate.model_probability,
            implied_probability: edge.implied_probability,
            edge: edge.edge,
            expected_value: edge.expected_value,
            kelly_fraction: sizing.fraction,
            stake: sizing.stake,
            confidence: edge.confidence,
            rationale: edge.candidate.rationale,
        }
    }

    fn moneyline_candidates(
        &self,
        blended: &BlendedPrediction,
        market: &MarketLine,
        out: &mut Vec<Candidate>,
        flags: &mut Vec<Degradation>,
    ) {
        let (home, away) = (market.home_moneyline, market.away_moneyline);
        if home.is_none() && away.is_none() {
            return;
        }
        if home.is_none() || away.is_none() {
            flags.push(Degradation::MarketDataIncomplete {
                market: BetType::Moneyline,
            });
            return;
        }

        for (side, quoted, p) in [
            (BetSide::Home, home, blended.home_win_probability),
            (BetSide::Away, away, blended.away_win_probability),
        ] {
            if let Some(odds) = price(BetType::Moneyline, quoted, flags) {
                out.push(Candidate {
                    bet_type: BetType::Moneyline,
                    side,
                    line: None,
                    odds,
                    model_probability: p,
                    rationale: format!(
                        "{side} wins {:.1}% in the model vs {:.1}% implied at {odds}",
                        p * 100.0,
                        odds.implied_probability() * 100.0
                    ),
                });
            }
        }
    }

    fn total_candidates(
        &self,
        blended: &BlendedPrediction,
        distribution: &GameOutcomeDistribution,
        market: &MarketLine,
        out: &mut Vec<Candidate>,
        flags: &mut Vec<Degradation>,
    ) {
        let (line, over, under) = (market.total_line, market.over_odds, market.under_odds);
        if line.is_none() && over.is_none() && under.is_none() {
            return;
        }
        let line = match line.filter(|l| l.is_finite() && *l > 0.0) {
            Some(l) if over.is_some() && under.is_some() => l,
            _ => {
                flags.push(Degradation::MarketDataIncomplete {
                    market: BetType::Total,
                });
                return;
            }
        };

        let Some(p_over) = self.over_probability(blended.predicted_total, line, distribution) else {
            return;
        };

        for (side, quoted, p) in [
            (BetSide::Over, over, p_over),
            (BetSide::Under, under, 1.0 - p_over),
        ] {
            if let Some(odds) = price(BetType::Total, quoted, flags) {
                out.push(Candidate {
                    bet_type: BetType::Total,
                    side,
                    line: Some(line),
                    odds,
                    model_probability: p,
                    rationale: format!(
                        "Model total {:.2} vs line {line}: {side} {:.1}% vs {:.1}% implied",
                        blended.predicted_total,
                        p * 100.0,
                        odds.implied_probability() * 100.0
                    ),
                });
            }
        }
    }

    fn run_line_candidates(
        &self,
        distribution: &GameOutcomeDistribution,
        market: &MarketLine,
        out: &mut Vec<Candidate>,
        flags: &mut Vec<Degradation>,
    ) {
        let (spread, home, away) = (
            market.run_line,
            market.home_run_line_odds,
            market.away_run_line_odds,
        );
        if spread.is_none() && home.is_none() && away.is_none() {
            return;
        }
        let spread = match spread.filter(|s| s.is_finite()) {
            Some(s) if home.is_some() && away.is_some() => s,
            _ => {
                flags.push(Degradation::MarketDataIncomplete {
                    market: BetType::RunLine,
                });
                return;
            }
        };

        let Some(p_home) = distribution.home_cover_probability(spread) else {
            return;
        };

        for (side, quoted, line, p) in [
            (BetSide::Home, home, spread, p_home),
            (BetSide::Away, away, -spread, 1.0 - p_home),
        ] {
            if let Some(odds) = price(BetType::RunLine, quoted, flags) {
                out.push(Candidate {
                    bet_type: BetType::RunLine,
                    side,
                    line: Some(line),
                    odds,
                    model_probability: p,
                    rationale: format!(
                        "{side} {line:+} covers in {:.1}% of trials vs {:.1}% implied",
                        p * 100.0,
                        odds.implied_probability() * 100.0
                    ),
                });
            }
        }
    }
}

/// Validate a quoted price, flagging it if it is not a real American price.
fn price(market: BetType, quoted: Option<i32>, flags: &mut Vec<Degradation>) -> Option<AmericanOdds> {
    let raw = quoted?;
    let odds = AmericanOdds::new(raw);
    if odds.is_none() {
        flags.push(Degradation::InvalidOdds { market, odds: raw });
    }
    odds
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
