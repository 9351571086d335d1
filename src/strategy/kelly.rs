//! Kelly criterion position sizing.
//!
//! Computes the bankroll fraction for a priced bet, capped at a fractional
//! Kelly ceiling, and turns it into a stake against a unit bankroll.

use rust_decimal::prelude::*;
use tracing::debug;

use super::odds::AmericanOdds;
use crate::config::BettingParameters;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Kelly sizing configuration.
#[derive(Debug, Clone)]
pub struct KellyConfig {
    /// Maximum fraction of bankroll (0.25 = quarter-Kelly ceiling).
    pub cap: f64,
    /// Bankroll the fraction is applied to when reporting a stake.
    pub unit_bankroll: Decimal,
}

impl Default for KellyConfig {
    fn default() -> Self {
        Self {
            cap: 0.25,
            unit_bankroll: Decimal::ONE_HUNDRED,
        }
    }
}

impl From<&BettingParameters> for KellyConfig {
    fn from(params: &BettingParameters) -> Self {
        Self {
            cap: params.kelly_cap,
            unit_bankroll: params.unit_bankroll,
        }
    }
}

// ---------------------------------------------------------------------------
// Kelly calculator
// ---------------------------------------------------------------------------

/// Sized stake for one bet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KellySizing {
    /// Uncapped `(b·p − q) / b`, may be negative.
    pub raw_fraction: f64,
    /// Clipped to `[0, cap]`.
    pub fraction: f64,
    pub stake: Decimal,
}

#[derive(Debug, Clone)]
pub struct KellyCalculator {
    config: KellyConfig,
}

impl KellyCalculator {
    pub fn new(config: KellyConfig) -> Self {
        Self { config }
    }

    /// Size a bet using the Kelly criterion.
    ///
    /// Kelly formula: f* = (bp - q) / b
    /// where:
    ///   b = net payout per unit staked
    ///   p = model win probability
    ///   q = 1 - p
    pub fn size(&self, probability: f64, odds: AmericanOdds) -> KellySizing {
        let b = odds.payout_multiplier();
        let q = 1.0 - probability;
        let raw = (b * probability - q) / b;

        let fraction = if raw.is_finite() {
            raw.clamp(0.0, self.config.cap)
        } else {
            0.0
        };

        let stake = Decimal::from_f64(fraction)
            .map(|f| (f * self.config.unit_bankroll).round_dp(2))
            .unwrap_or(Decimal::ZERO);

        debug!(
            odds = %odds,
            probability = format!("{:.1}%", probability * 100.0),
            raw_kelly = format!("{:.2}%", raw * 100.0),
            capped = format!("{:.2}%", fraction * 100.0),
            stake = %stake,
            "Bet sized"
        );

        KellySizing {
            raw_fraction: raw,
            fraction,
            stake,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
