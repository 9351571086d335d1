//! Batched Monte Carlo game simulator.
//!
//! One call simulates `trial_count` independent games for a matchup and
//! aggregates them into a [`GameOutcomeDistribution`]. The random stream
//! is seeded from the game key, so the same matchup on the same date always
//! reproduces the same distribution regardless of what else is running.
//!
//! Sampling is done in whole-batch passes (all chaos draws, then all away
//! scores, then all home scores). Ties are settled by a bounded number of
//! passes over the still-tied indices.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use statrs::distribution::{Normal, Poisson};
use statrs::statistics::{Data, OrderStatistics, Statistics};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use super::factors::{game_seed, pitcher_quality_factor, strength_multipliers};
use crate::config::SimulationConfig;
use crate::data::{is_placeholder_pitcher, ParkFactorSource, ReferenceSnapshot};
use crate::error::{PredictionError, Result};
use crate::types::{
    Degradation, GameKey, GameOutcomeDistribution, PitcherDiagnostics, PitcherSource, ScoreRange,
    TeamSide,
};

// ---------------------------------------------------------------------------
// Request / output
// ---------------------------------------------------------------------------

/// A named starter and where the name came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Starter {
    pub name: String,
    pub source: PitcherSource,
}

impl Starter {
    pub fn new(name: impl Into<String>, source: PitcherSource) -> Self {
        Self {
            name: name.into(),
            source,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SimulationRequest {
    pub game: GameKey,
    pub trial_count: u32,
    pub away_starter: Option<Starter>,
    pub home_starter: Option<Starter>,
}

impl SimulationRequest {
    pub fn new(game: GameKey, trial_count: u32) -> Self {
        Self {
            game,
            trial_count,
            away_starter: None,
            home_starter: None,
        }
    }

    /// Caller-supplied starters. Placeholder names are kept so the audit
    /// trail shows what was asked for; they still simulate as neutral.
    pub fn with_pitchers(mut self, away: Option<&str>, home: Option<&str>) -> Self {
        self.away_starter = away.map(|n| Starter::new(n, PitcherSource::Caller));
        self.home_starter = home.map(|n| Starter::new(n, PitcherSource::Caller));
        self
    }
}

/// Expected-run inputs after every multiplier, before chaos.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunRates {
    pub away_multiplier: f64,
    pub home_multiplier: f64,
    pub away_lambda: f64,
    pub home_lambda: f64,
    pub park_factor: f64,
}

#[derive(Debug, Clone)]
pub struct SimulationOutput {
    pub distribution: GameOutcomeDistribution,
    pub pitchers: PitcherDiagnostics,
    pub rates: RunRates,
    pub degradations: Vec<Degradation>,
}

/// Struct-of-arrays scores for one batch of trials.
#[derive(Debug, Clone, Default)]
pub struct TrialBatch {
    pub away: Vec<u32>,
    pub home: Vec<u32>,
}

impl TrialBatch {
    pub fn len(&self) -> usize {
        self.away.len()
    }

    pub fn is_empty(&self) -> bool {
        self.away.is_empty()
    }

    pub fn tied_indices(&self) -> Vec<usize> {
        (0..self.len()).filter(|&i| self.away[i] == self.home[i]).collect()
    }

    pub fn home_wins(&self) -> usize {
        self.away.iter().zip(&self.home).filter(|(a, h)| h > a).count()
    }
}

// ---------------------------------------------------------------------------
// Simulator
// ---------------------------------------------------------------------------

pub struct GameOutcomeSimulator {
    config: Arc<SimulationConfig>,
}

impl GameOutcomeSimulator {
    pub fn new(config: Arc<SimulationConfig>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Simulate a matchup against a reference snapshot.
    pub fn simulate(&self, request: &SimulationRequest, reference: &ReferenceSnapshot) -> Result<SimulationOutput> {
        self.validate(request)?;
        let start = Instant::now();
        let engine = &self.config.engine;
        let game = &request.game;
        let mut degradations = Vec::new();

        // 1. strength differential
        let away_strength = self.team_strength(reference, &game.away_team, &mut degradations);
        let home_strength = self.team_strength(reference, &game.home_team, &mut degradations);
        let (mut away_mult, mut home_mult) = strength_multipliers(away_strength, home_strength, engine);

        // 2. opposing starters
        let away_pitcher_factor = self.starter_factor(
            request.away_starter.as_ref(),
            TeamSide::Away,
            reference,
            &mut degradations,
        );
        let home_pitcher_factor = self.starter_factor(
            request.home_starter.as_ref(),
            TeamSide::Home,
            reference,
            &mut degradations,
        );
        away_mult *= home_pitcher_factor;
        home_mult *= away_pitcher_factor;

        // 3. park and weather
        let park = reference.park_factor(&game.home_team, game.game_date);
        match park.source {
            ParkFactorSource::Dated => {}
            ParkFactorSource::Static => degradations.push(Degradation::StaticParkFactor {
                team: game.home_team.clone(),
            }),
            ParkFactorSource::Neutral => degradations.push(Degradation::MissingParkFactor {
                team: game.home_team.clone(),
            }),
        }
        away_mult *= park.factor;
        home_mult *= park.factor;

        // 4. bias terms, 5. safety band
        away_mult *= engine.away_scoring_boost * engine.total_scoring_adjustment;
        home_mult *= engine.home_scoring_boost * engine.total_scoring_adjustment;
        let away_mult = away_mult.clamp(engine.multiplier_floor, engine.multiplier_ceiling);
        let home_mult = home_mult.clamp(engine.multiplier_floor, engine.multiplier_ceiling);

        // 6. rates
        let rates = RunRates {
            away_multiplier: away_mult,
            home_multiplier: home_mult,
            away_lambda: engine.base_lambda * away_mult,
            home_lambda: engine.base_lambda * home_mult,
            park_factor: park.factor,
        };

        // 7-9. sample
        let mut rng = StdRng::seed_from_u64(game_seed(game));
        let batch = self.sample_batch(request.trial_count as usize, &rates, &mut rng)?;

        // 10. aggregate
        let distribution = aggregate(&batch);

        let pitchers = PitcherDiagnostics {
            away_pitcher: request.away_starter.as_ref().map(|s| s.name.clone()),
            home_pitcher: request.home_starter.as_ref().map(|s| s.name.clone()),
            away_pitcher_source: source_of(request.away_starter.as_ref()),
            home_pitcher_source: source_of(request.home_starter.as_ref()),
            away_pitcher_factor,
            home_pitcher_factor,
        };

        info!(
            game = %game,
            trials = request.trial_count,
            away_lambda = format!("{:.3}", rates.away_lambda),
            home_lambda = format!("{:.3}", rates.home_lambda),
            home_win = format!("{:.1}%", distribution.home_win_probability * 100.0),
            total = format!("{:.2}", distribution.mean_total),
            degraded = degradations.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Game simulated"
        );

        Ok(SimulationOutput {
            distribution,
            pitchers,
            rates,
            degradations,
        })
    }

    fn validate(&self, request: &SimulationRequest) -> Result<()> {
        let max = self.config.trials.max_trial_count;
        if request.trial_count == 0 || request.trial_count > max {
            return Err(PredictionError::SimulationInputInvalid(format!(
                "trial_count {} must be within [1, {max}]",
                request.trial_count
            )));
        }
        let game = &request.game;
        if game.away_team.trim().is_empty() || game.home_team.trim().is_empty() {
            return Err(PredictionError::SimulationInputInvalid(
                "team identifiers must not be empty".into(),
            ));
        }
        if game.away_team == game.home_team {
            return Err(PredictionError::SimulationInputInvalid(format!(
                "{} cannot play itself",
                game.home_team
            )));
        }
        Ok(())
    }

    fn team_strength(&self, reference: &ReferenceSnapshot, team: &str, flags: &mut Vec<Degradation>) -> f64 {
        reference.team_strength(team).unwrap_or_else(|| {
            debug!(team, "No team strength, using neutral");
            flags.push(Degradation::MissingTeamStrength { team: team.to_string() });
            0.0
        })
    }

    fn starter_factor(
        &self,
        starter: Option<&Starter>,
        side: TeamSide,
        reference: &ReferenceSnapshot,
        flags: &mut Vec<Degradation>,
    ) -> f64 {
        let name = match starter {
            Some(s) if !is_placeholder_pitcher(&s.name) => s.name.as_str(),
            _ => {
                flags.push(Degradation::UnresolvedPitcher { side });
                return 1.0;
            }
        };
        let stats = reference.pitcher(name);
        if stats.is_none() {
            debug!(pitcher = name, "No pitcher stats, using neutral");
            flags.push(Degradation::MissingPitcherStats {
                pitcher: name.to_string(),
            });
        }
        pitcher_quality_factor(stats, &self.config.pitcher_quality, &self.config.engine)
    }

    fn sample_batch(&self, n: usize, rates: &RunRates, rng: &mut StdRng) -> Result<TrialBatch> {
        let engine = &self.config.engine;

        // shared per-trial chaos
        let chaos: Vec<f64> = if engine.game_chaos_variance > 0.0 {
            let normal = Normal::new(1.0, engine.game_chaos_variance).map_err(invalid_rate)?;
            (0..n)
                .map(|_| {
                    let c: f64 = rng.sample(normal);
                    c.clamp(engine.chaos_floor, engine.chaos_ceiling)
                })
                .collect()
        } else {
            vec![1.0; n]
        };

        let away = draw_scores(rates.away_lambda, &chaos, engine.max_runs, rng)?;
        let home = draw_scores(rates.home_lambda, &chaos, engine.max_runs, rng)?;
        let mut batch = TrialBatch { away, home };

        self.settle_ties(&mut batch, rng);
        Ok(batch)
    }

    /// Extra innings: each round both sides of every tied trial may score;
    /// whatever is still tied after the last round goes to a coin flip.
    fn settle_ties(&self, batch: &mut TrialBatch, rng: &mut StdRng) {
        let engine = &self.config.engine;
        let max = engine.max_runs;
        let p = engine.extra_inning_score_probability;
        let mut tied = batch.tied_indices();
        let initially_tied = tied.len();

        for _ in 0..engine.extra_inning_rounds {
            if tied.is_empty() {
                break;
            }
            for &i in &tied {
                if rng.gen_bool(p) {
                    batch.away[i] = (batch.away[i] + 1).min(max);
                }
                if rng.gen_bool(p) {
                    batch.home[i] = (batch.home[i] + 1).min(max);
                }
            }
            tied.retain(|&i| batch.away[i] == batch.home[i]);
        }

        let flipped = tied.len();
        for &i in &tied {
            let (winner, loser) = if rng.gen_bool(0.5) {
                (&mut batch.home[i], &mut batch.away[i])
            } else {
                (&mut batch.away[i], &mut batch.home[i])
            };
            if *winner < max {
                *winner += 1;
            } else {
                *loser -= 1;
            }
        }

        debug!(initially_tied, flipped, "Ties settled");
    }
}

fn source_of(starter: Option<&Starter>) -> PitcherSource {
    starter.map_or(PitcherSource::Unresolved, |s| s.source)
}

/// One Poisson draw per trial at `lambda × chaos[i]`, clipped to `max_runs`.
fn draw_scores(lambda: f64, chaos: &[f64], max_runs: u32, rng: &mut StdRng) -> Result<Vec<u32>> {
    chaos
        .iter()
        .map(|c| {
            let poisson = Poisson::new(lambda * c).map_err(invalid_rate)?;
            let runs: f64 = rng.sample(poisson);
            Ok((runs as u32).min(max_runs))
        })
        .collect()
}

fn invalid_rate(e: impl std::fmt::Display) -> PredictionError {
    PredictionError::SimulationInputInvalid(format!("bad sampling parameter: {e}"))
}

fn score_range(values: Vec<f64>) -> ScoreRange {
    let mut data = Data::new(values);
    ScoreRange {
        p10: data.percentile(10),
        p90: data.percentile(90),
    }
}

/// Reduce a settled batch to summary statistics.
pub fn aggregate(batch: &TrialBatch) -> GameOutcomeDistribution {
    let n = batch.len();
    let away: Vec<f64> = batch.away.iter().map(|&r| r as f64).collect();
    let home: Vec<f64> = batch.home.iter().map(|&r| r as f64).collect();
    let totals: Vec<f64> = away.iter().zip(&home).map(|(a, h)| a + h).collect();

    let mean_away_score = away.iter().mean();
    let mean_home_score = home.iter().mean();
    let mean_total = totals.iter().mean();
    let total_runs_std_dev = totals.iter().population_std_dev();

    let home_win_probability = batch.home_wins() as f64 / n as f64;

    let mut run_differential_counts = BTreeMap::new();
    let mut total_runs_counts = BTreeMap::new();
    for (&a, &h) in batch.away.iter().zip(&batch.home) {
        *run_differential_counts.entry(h as i32 - a as i32).or_insert(0u32) += 1;
        *total_runs_counts.entry(a + h).or_insert(0u32) += 1;
    }

    GameOutcomeDistribution {
        trials: n as u32,
        mean_away_score,
        mean_home_score,
        mean_total,
        away_score_range: score_range(away),
        home_score_range: score_range(home),
        total_range: score_range(totals),
        home_win_probability,
        away_win_probability: 1.0 - home_win_probability,
        total_runs_std_dev,
        model_confidence: (90.0 - 10.0 * total_runs_std_dev).clamp(0.0, 100.0),
        run_differential_counts,
        total_runs_counts,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
