//! Blend → price → size, with hand-built model numbers.

use rust_decimal::Decimal;

use diamond::config::{BettingParameters, BlendingParameters};
use diamond::engine::simulator::{aggregate, TrialBatch};
use diamond::strategy::kelly::{KellyCalculator, KellyConfig};
use diamond::strategy::odds::AmericanOdds;
use diamond::strategy::{BettingValueAnalyzer, MarketLineBlender, ModelEstimate};
use diamond::types::{
    BetSide, BetType, ConfidenceTier, GameOutcomeDistribution, MarketLine, ValueRecommendation,
};

fn make_distribution() -> GameOutcomeDistribution {
    aggregate(&TrialBatch {
        away: vec![3, 5, 4, 6, 2, 5, 4, 7],
        home: vec![6, 4, 5, 3, 7, 6, 5, 4],
    })
}

fn model(total: f64) -> ModelEstimate {
    ModelEstimate {
        home_win_probability: 0.5,
        away_score: total / 2.0,
        home_score: total / 2.0,
    }
}

fn totals_market() -> MarketLine {
    MarketLine {
        total_line: Some(7.5),
        over_odds: Some(-110),
        under_odds: Some(-110),
        ..Default::default()
    }
}

#[test]
fn test_over_recommended_when_model_total_is_high() {
    let market = totals_market();
    let blended = MarketLineBlender::new(BlendingParameters::default()).blend(model(9.2), Some(&market));
    assert!(!blended.total_blended);

    let analysis = BettingValueAnalyzer::from_config(&BettingParameters::default())
        .analyze(&blended, &make_distribution(), Some(&market));

    assert_eq!(analysis.recommendations.len(), 1);
    let rec = &analysis.recommendations[0];
    assert_eq!(rec.bet_type, BetType::Total);
    assert_eq!(rec.side, BetSide::Over);
    assert_eq!(rec.line, Some(7.5));
    assert_eq!(rec.odds, -110);

    let p = rec.model_probability;
    assert!((p - 0.585).abs() < 1e-9);
    let expected = p * (100.0 / 110.0) - (1.0 - p);
    assert!((rec.expected_value - expected).abs() < 5e-4);
    assert!(rec.edge > 0.03);
    assert_eq!(rec.confidence, ConfidenceTier::High);
    assert!(rec.kelly_fraction > 0.0 && rec.kelly_fraction <= 0.25);
    assert!(rec.stake > Decimal::ZERO);
}

#[test]
fn test_blended_total_drives_totals_pricing() {
    let market = totals_market();
    let blender = MarketLineBlender::new(BlendingParameters {
        enabled: true,
        ..Default::default()
    });
    let blended = blender.blend(model(9.2), Some(&market));

    assert!(blended.total_blended);
    assert!((blended.raw_total - 9.2).abs() < 1e-9);
    assert!((blended.predicted_total - (0.75 * 9.2 + 0.25 * 7.5)).abs() < 1e-9);
    assert!(blended.predicted_total < blended.raw_total && blended.predicted_total > 7.5);
    // no moneyline quoted, so the win probability is untouched
    assert!(!blended.moneyline_blended);
    assert_eq!(blended.home_win_probability, 0.5);

    let analysis = BettingValueAnalyzer::from_config(&BettingParameters::default())
        .analyze(&blended, &make_distribution(), Some(&market));
    let rec = &analysis.recommendations[0];
    let p = 0.5 + (blended.predicted_total - 7.5) * 0.05;
    assert!((rec.model_probability - p).abs() < 1e-9);
}

#[test]
fn test_unquoted_market_prices_nothing() {
    let market = MarketLine::default();
    let blended = MarketLineBlender::new(BlendingParameters {
        enabled: true,
        ..Default::default()
    })
    .blend(model(9.2), Some(&market));

    assert_eq!(blended.home_win_probability, blended.raw_home_win_probability);
    assert_eq!(blended.predicted_total, blended.raw_total);
    assert!(blended.market_home_probability.is_none());

    let analysis = BettingValueAnalyzer::from_config(&BettingParameters::default())
        .analyze(&blended, &make_distribution(), Some(&market));
    assert!(analysis.recommendations.is_empty());
    assert!(analysis.degradations.is_empty());
}

#[test]
fn test_kelly_fraction_always_bounded() {
    let calc = KellyCalculator::new(KellyConfig::default());
    for price in [-400, -200, -110, 100, 120, 250, 600] {
        let odds = AmericanOdds::new(price).unwrap();
        for i in 0..=20 {
            let p = i as f64 / 20.0;
            let sizing = calc.size(p, odds);
            assert!(
                (0.0..=0.25).contains(&sizing.fraction),
                "p={p} odds={price} fraction={}",
                sizing.fraction
            );
            assert!(sizing.stake >= Decimal::ZERO);
        }
    }
}

#[test]
fn test_recommendation_json_round_trip() {
    let market = totals_market();
    let blended = MarketLineBlender::new(BlendingParameters::default()).blend(model(9.2), Some(&market));
    let analysis = BettingValueAnalyzer::from_config(&BettingParameters::default())
        .analyze(&blended, &make_distribution(), Some(&market));
    let rec = &analysis.recommendations[0];

    let json = serde_json::to_string(rec).unwrap();
    let back: ValueRecommendation = serde_json::from_str(&json).unwrap();
    assert_eq!(back.bet_type, rec.bet_type);
    assert_eq!(back.side, rec.side);
    assert_eq!(back.odds, rec.odds);
    assert_eq!(back.confidence, rec.confidence);
    assert!((back.expected_value - rec.expected_value).abs() < 1e-12);
}
