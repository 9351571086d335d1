//! Per-game prediction pipeline.
//!
//! historical check → starter resolution → simulate → (pitching plan) →
//! market line → blend → value analysis → record.

use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::pitching::PitchingPlanner;
use super::simulator::{GameOutcomeSimulator, SimulationRequest, Starter};
use crate::config::SimulationConfig;
use crate::data::{
    is_placeholder_pitcher, BullpenSource, HistoricalResultProvider, MarketLineProvider,
    ReferenceDataProvider, ReferenceSnapshot,
};
use crate::error::{PredictionError, Result};
use crate::strategy::{BettingValueAnalyzer, MarketLineBlender, ModelEstimate};
use crate::types::{
    DataSource, ExecutionMetadata, GameKey, GamePrediction, HistoricalRecord, PitcherSource,
    PredictionRecord,
};

/// What a caller asks the orchestrator for.
#[derive(Debug, Clone)]
pub struct PredictionRequest {
    pub game: GameKey,
    /// Falls back to the configured default trial count.
    pub trial_count: Option<u32>,
    pub away_pitcher: Option<String>,
    pub home_pitcher: Option<String>,
}

impl PredictionRequest {
    pub fn new(game: GameKey) -> Self {
        Self {
            game,
            trial_count: None,
            away_pitcher: None,
            home_pitcher: None,
        }
    }

    pub fn with_trials(mut self, trials: u32) -> Self {
        self.trial_count = Some(trials);
        self
    }

    pub fn with_pitchers(mut self, away: Option<&str>, home: Option<&str>) -> Self {
        self.away_pitcher = away.map(str::to_string);
        self.home_pitcher = home.map(str::to_string);
        self
    }
}

pub struct PredictionOrchestrator {
    config: Arc<SimulationConfig>,
    reference: Arc<dyn ReferenceDataProvider>,
    markets: Arc<dyn MarketLineProvider>,
    results: Arc<dyn HistoricalResultProvider>,
    simulator: GameOutcomeSimulator,
    blender: MarketLineBlender,
    analyzer: BettingValueAnalyzer,
    planner: PitchingPlanner,
}

impl PredictionOrchestrator {
    pub fn new(
        config: Arc<SimulationConfig>,
        reference: Arc<dyn ReferenceDataProvider>,
        markets: Arc<dyn MarketLineProvider>,
        results: Arc<dyn HistoricalResultProvider>,
    ) -> Result<Self> {
        let simulator = GameOutcomeSimulator::new(Arc::clone(&config))?;
        let blender = MarketLineBlender::new(config.blending.clone());
        let analyzer = BettingValueAnalyzer::from_config(&config.betting);
        let planner = PitchingPlanner::new(config.pitching_plan.clone());
        Ok(Self {
            config,
            reference,
            markets,
            results,
            simulator,
            blender,
            analyzer,
            planner,
        })
    }

    /// Bullpen figures to use when the reference snapshot has none.
    pub fn with_fallback_bullpens(mut self, source: Arc<dyn BullpenSource>) -> Self {
        warn!(source = source.label(), "Fallback bullpen source installed");
        self.planner = self.planner.with_fallback_bullpens(source);
        self
    }

    /// Predict one game, or return its recorded result if it has been played.
    pub fn predict(&self, request: &PredictionRequest) -> Result<GamePrediction> {
        self.predict_cancellable(request, &AtomicBool::new(false))
    }

    /// As [`predict`](Self::predict), but gives up with
    /// [`PredictionError::Cancelled`] at the next step boundary once
    /// `cancel` is set.
    pub fn predict_cancellable(&self, request: &PredictionRequest, cancel: &AtomicBool) -> Result<GamePrediction> {
        let start = Instant::now();
        let game = &request.game;
        let checkpoint = |step: &str| {
            if cancel.load(Ordering::SeqCst) {
                debug!(game = %game, step, "Prediction cancelled");
                Err(PredictionError::Cancelled)
            } else {
                Ok(())
            }
        };

        // Step 1 – already played?
        if let Some(result) = self.results.actual_result(game) {
            info!(game = %game, away = result.away_score, home = result.home_score, "Returning recorded result");
            return Ok(GamePrediction::Historical(HistoricalRecord {
                game: game.clone(),
                result,
                data_source: DataSource::Historical,
            }));
        }

        checkpoint("reference")?;
        let reference = self.reference.snapshot()?;

        // Step 2 – starters
        let (away_starter, home_starter) = resolve_starters(request, &reference);
        let trial_count = request
            .trial_count
            .unwrap_or(self.config.trials.default_trials);
        let sim_request = SimulationRequest {
            game: game.clone(),
            trial_count,
            away_starter,
            home_starter,
        };

        // Step 3 – simulate
        checkpoint("simulate")?;
        let sim = self.simulator.simulate(&sim_request, &reference)?;
        let mut model = ModelEstimate::from_distribution(&sim.distribution);

        // Step 3b – pitching plans
        let pitching_plan = if self.config.pitching_plan.enabled {
            let away_plan = self.planner.plan(&reference, sim.pitchers.away_pitcher.as_deref(), &game.away_team);
            let home_plan = self.planner.plan(&reference, sim.pitchers.home_pitcher.as_deref(), &game.home_team);
            let audit = self.planner.blend_means(model.away_score, model.home_score, away_plan, home_plan);
            model.away_score = audit.away_mean_after;
            model.home_score = audit.home_mean_after;
            Some(audit)
        } else {
            None
        };

        // Step 4 – market
        checkpoint("market")?;
        let market = self.markets.market_line(game);
        if market.is_none() {
            debug!(game = %game, "No market line");
        }

        // Step 5 – blend
        let blended = self.blender.blend(model, market.as_ref());

        // Step 6 – value
        let analysis = self.analyzer.analyze(&blended, &sim.distribution, market.as_ref());

        // Step 7 – record
        let mut degradations = sim.degradations;
        degradations.extend(analysis.degradations);

        let record = PredictionRecord {
            prediction_id: Uuid::new_v4(),
            game: game.clone(),
            distribution: sim.distribution,
            pitching_plan,
            blended,
            pitchers: sim.pitchers,
            market,
            metadata: ExecutionMetadata {
                trial_count,
                elapsed_ms: start.elapsed().as_secs_f64() * 1000.0,
                data_source: DataSource::Simulated,
                config_version: self.config.version.clone(),
                recommendations_found: analysis.recommendations.len(),
                generated_at: Utc::now(),
            },
            recommendations: analysis.recommendations,
            degradations,
        };

        info!(
            game = %game,
            home_win = format!("{:.1}%", record.blended.home_win_probability * 100.0),
            total = format!("{:.2}", record.blended.predicted_total),
            recommendations = record.recommendations.len(),
            degraded = record.is_degraded(),
            elapsed_ms = format!("{:.1}", record.metadata.elapsed_ms),
            "Prediction complete"
        );

        Ok(GamePrediction::Simulated(Box::new(record)))
    }
}

/// Caller-named starters win; otherwise take the schedule's probable
/// starters. Placeholder names from the schedule count as unresolved.
pub fn resolve_starters(
    request: &PredictionRequest,
    reference: &ReferenceSnapshot,
) -> (Option<Starter>, Option<Starter>) {
    let scheduled = reference.scheduled_game(&request.game);
    let pick = |caller: Option<&String>, probable: Option<&String>| {
        match caller.filter(|n| !n.trim().is_empty()) {
            Some(name) => Some(Starter::new(name.clone(), PitcherSource::Caller)),
            None => probable
                .filter(|n| !is_placeholder_pitcher(n))
                .map(|n| Starter::new(n.clone(), PitcherSource::ProbableStarters)),
        }
    };
    (
        pick(
            request.away_pitcher.as_ref(),
            scheduled.and_then(|g| g.away_pitcher.as_ref()),
        ),
        pick(
            request.home_pitcher.as_ref(),
            scheduled.and_then(|g| g.home_pitcher.as_ref()),
        ),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
