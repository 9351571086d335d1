//! American odds arithmetic.
//!
//! `+150` pays 1.5 units per unit staked, `-150` pays 1/1.5. Odds of zero
//! or strictly between -100 and +100 are not valid American prices and are
//! refused at construction.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A validated American price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct AmericanOdds(i32);

impl AmericanOdds {
    pub fn new(odds: i32) -> Option<Self> {
        (odds >= 100 || odds <= -100).then_some(Self(odds))
    }

    pub fn value(&self) -> i32 {
        self.0
    }

    /// Break-even win probability, vig included.
    pub fn implied_probability(&self) -> f64 {
        let o = self.0 as f64;
        if self.0 > 0 {
            100.0 / (o + 100.0)
        } else {
            -o / (-o + 100.0)
        }
    }

    /// Net profit per unit staked on a win.
    pub fn payout_multiplier(&self) -> f64 {
        let o = self.0 as f64;
        if self.0 > 0 {
            o / 100.0
        } else {
            100.0 / -o
        }
    }
}

impl TryFrom<i32> for AmericanOdds {
    type Error = String;

    fn try_from(odds: i32) -> Result<Self, Self::Error> {
        AmericanOdds::new(odds).ok_or_else(|| format!("{odds} is not a valid American price"))
    }
}

impl From<AmericanOdds> for i32 {
    fn from(odds: AmericanOdds) -> i32 {
        odds.0
    }
}

impl fmt::Display for AmericanOdds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:+}", self.0)
    }
}

/// Expected profit per unit staked: `p·b − (1 − p)`.
pub fn expected_value(probability: f64, odds: AmericanOdds) -> f64 {
    probability * odds.payout_multiplier() - (1.0 - probability)
}

/// Model probability minus the market's implied probability.
pub fn edge(probability: f64, odds: AmericanOdds) -> f64 {
    probability - odds.implied_probability()
}

/// Strip the bookmaker margin from a two-way market. Returns the fair
/// probability of the first side.
pub fn devig(first: AmericanOdds, second: AmericanOdds) -> f64 {
    let a = first.implied_probability();
    let b = second.implied_probability();
    a / (a + b)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn odds(o: i32) -> AmericanOdds {
        AmericanOdds::new(o).unwrap()
    }

    #[test]
    fn test_rejects_invalid_prices() {
        assert!(AmericanOdds::new(0).is_none());
        assert!(AmericanOdds::new(50).is_none());
        assert!(AmericanOdds::new(-99).is_none());
        assert!(AmericanOdds::new(100).is_some());
        assert!(AmericanOdds::new(-100).is_some());
    }

    #[test]
    fn test_implied_probability() {
        assert!((odds(-110).implied_probability() - 110.0 / 210.0).abs() < 1e-12);
        assert!((odds(150).implied_probability() - 0.4).abs() < 1e-12);
        assert!((odds(-100).implied_probability() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_payout_multiplier() {
        assert!((odds(150).payout_multiplier() - 1.5).abs() < 1e-12);
        assert!((odds(-200).payout_multiplier() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_ev_zero_at_implied_probability() {
        for o in [-250, -110, 100, 135, 320] {
            let price = odds(o);
            let ev = expected_value(price.implied_probability(), price);
            assert!(ev.abs() < 1e-12, "odds {o}: ev {ev}");
        }
    }

    #[test]
    fn test_edge_sign() {
        assert!(edge(0.60, odds(-110)) > 0.0);
        assert!(edge(0.45, odds(-110)) < 0.0);
    }

    #[test]
    fn test_devig_sums_to_one() {
        let home = devig(odds(-150), odds(130));
        let away = devig(odds(130), odds(-150));
        assert!((home + away - 1.0).abs() < 1e-12);
        assert!(home > odds(130).implied_probability());
        assert!(home < odds(-150).implied_probability());
    }

    #[test]
    fn test_serde_rejects_invalid() {
        assert!(serde_json::from_str::<AmericanOdds>("-110").is_ok());
        assert!(serde_json::from_str::<AmericanOdds>("20").is_err());
    }
}
