//! Value detection.
//!
//! Compares a model probability with the price on offer and decides whether
//! the gap is worth acting on. Tiering is for display only.

use tracing::debug;

use super::odds::{self, AmericanOdds};
use crate::config::BettingParameters;
use crate::types::{BetSide, BetType, ConfidenceTier};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Qualification and tiering thresholds.
#[derive(Debug, Clone)]
pub struct EdgeConfig {
    /// Edge over implied probability required before a bet is considered.
    pub min_edge: f64,
    pub high_confidence_ev: f64,
    pub medium_confidence_ev: f64,
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            min_edge: 0.03,
            high_confidence_ev: 0.10,
            medium_confidence_ev: 0.05,
        }
    }
}

impl From<&BettingParameters> for EdgeConfig {
    fn from(params: &BettingParameters) -> Self {
        Self {
            min_edge: params.min_edge,
            high_confidence_ev: params.high_confidence_ev,
            medium_confidence_ev: params.medium_confidence_ev,
        }
    }
}

impl EdgeConfig {
    pub fn tier(&self, expected_value: f64) -> ConfidenceTier {
        if expected_value > self.high_confidence_ev {
            ConfidenceTier::High
        } else if expected_value > self.medium_confidence_ev {
            ConfidenceTier::Medium
        } else {
            ConfidenceTier::Low
        }
    }
}

// ---------------------------------------------------------------------------
// Edge detection
// ---------------------------------------------------------------------------

/// One priced side of one market, before qualification.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub bet_type: BetType,
    pub side: BetSide,
    pub line: Option<f64>,
    pub odds: AmericanOdds,
    pub model_probability: f64,
    pub rationale: String,
}

/// A candidate that cleared the edge and EV bars.
#[derive(Debug, Clone)]
pub struct Edge {
    pub candidate: Candidate,
    pub implied_probability: f64,
    pub edge: f64,
    pub expected_value: f64,
    pub confidence: ConfidenceTier,
}

#[derive(Debug, Clone)]
pub struct EdgeDetector {
    config: EdgeConfig,
}

impl EdgeDetector {
    pub fn new(config: EdgeConfig) -> Self {
        Self { config }
    }

    /// Qualify a candidate: `edge > min_edge` and `EV > 0`.
    pub fn detect(&self, candidate: Candidate) -> Option<Edge> {
        let p = candidate.model_probability;
        if !p.is_finite() {
            return None;
        }
        let implied = candidate.odds.implied_probability();
        let edge = odds::edge(p, candidate.odds);
        let ev = odds::expected_value(p, candidate.odds);

        if edge <= self.config.min_edge || ev <= 0.0 {
            debug!(
                market = %candidate.bet_type,
                side = %candidate.side,
                odds = %candidate.odds,
                edge = format!("{:.1}%", edge * 100.0),
                ev = format!("{:+.3}", ev),
                "No value"
            );
            return None;
        }

        let confidence = self.config.tier(ev);
        debug!(
            market = %candidate.bet_type,
            side = %candidate.side,
            odds = %candidate.odds,
            model = format!("{:.1}%", p * 100.0),
            implied = format!("{:.1}%", implied * 100.0),
            ev = format!("{:+.3}", ev),
            tier = %confidence,
            "Edge detected"
        );

        Some(Edge {
            candidate,
            implied_probability: implied,
            edge,
            expected_value: ev,
            confidence,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
