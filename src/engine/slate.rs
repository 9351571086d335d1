//! Concurrent slate runner.
//!
//! Each game of a slate is independent, so every prediction runs on its own
//! blocking worker. Workers share only the `Arc`'d orchestrator, which holds
//! read-only data, and a cancel flag. The whole slate is bounded by one
//! timeout; on expiry the flag is raised so running workers stop at their
//! next step instead of finishing work nobody will read.

use chrono::NaiveDate;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use super::orchestrator::{PredictionOrchestrator, PredictionRequest};
use crate::data::ReferenceSnapshot;
use crate::error::{PredictionError, Result};
use crate::types::{GameKey, GamePrediction};

/// Everything produced for a slate.
#[derive(Debug, Default)]
pub struct SlateReport {
    /// In request order.
    pub predictions: Vec<GamePrediction>,
    /// Games rejected individually (bad input, panicked worker).
    pub failures: Vec<(GameKey, PredictionError)>,
    pub elapsed_ms: u64,
}

impl SlateReport {
    pub fn recommendation_count(&self) -> usize {
        self.predictions
            .iter()
            .filter_map(GamePrediction::as_simulated)
            .map(|r| r.recommendations.len())
            .sum()
    }
}

pub struct SlateRunner {
    orchestrator: Arc<PredictionOrchestrator>,
    timeout: Duration,
}

impl SlateRunner {
    pub fn new(orchestrator: Arc<PredictionOrchestrator>, timeout: Duration) -> Self {
        Self {
            orchestrator,
            timeout,
        }
    }

    /// Build one request per scheduled game on `date`, starters left for the
    /// orchestrator to resolve from the schedule.
    pub fn requests_for_date(reference: &ReferenceSnapshot, date: NaiveDate, trial_count: Option<u32>) -> Vec<PredictionRequest> {
        reference
            .games_on(date)
            .into_iter()
            .map(|g| PredictionRequest {
                game: g.key(),
                trial_count,
                away_pitcher: None,
                home_pitcher: None,
            })
            .collect()
    }

    /// Predict every request concurrently.
    ///
    /// Per-game input errors are collected in the report. A fatal error
    /// (e.g. the reference store is gone) fails the whole slate, as does
    /// running past the timeout.
    pub async fn run(&self, requests: Vec<PredictionRequest>) -> Result<SlateReport> {
        let start = Instant::now();
        let total = requests.len();
        let completed = Arc::new(AtomicUsize::new(0));
        let cancel = Arc::new(AtomicBool::new(false));

        info!(games = total, timeout_secs = self.timeout.as_secs_f64(), "Slate started");

        let handles: Vec<_> = requests
            .into_iter()
            .map(|request| {
                let orchestrator = Arc::clone(&self.orchestrator);
                let completed = Arc::clone(&completed);
                let cancel = Arc::clone(&cancel);
                let game = request.game.clone();
                let handle = tokio::task::spawn_blocking(move || {
                    let out = orchestrator.predict_cancellable(&request, &cancel);
                    if !matches!(out, Err(PredictionError::Cancelled)) {
                        completed.fetch_add(1, Ordering::SeqCst);
                    }
                    out
                });
                (game, handle)
            })
            .collect();

        let (games, handles): (Vec<GameKey>, Vec<_>) = handles.into_iter().unzip();
        let aborts: Vec<_> = handles.iter().map(|h| h.abort_handle()).collect();

        let joined = match tokio::time::timeout(self.timeout, futures::future::join_all(handles)).await {
            Ok(joined) => joined,
            Err(_) => {
                cancel.store(true, Ordering::SeqCst);
                // Only workers still queued are stopped here; running ones
                // see the flag.
                for a in &aborts {
                    a.abort();
                }
                let done = completed.load(Ordering::SeqCst);
                let elapsed_ms = start.elapsed().as_millis() as u64;
                error!(elapsed_ms, completed = done, total, "Slate timed out");
                return Err(PredictionError::SlateTimedOut {
                    elapsed_ms,
                    completed: done,
                    total,
                });
            }
        };

        let mut report = SlateReport::default();
        for (game, result) in games.into_iter().zip(joined) {
            let outcome = result.map_err(|e| PredictionError::Task(format!("{game}: {e}")));
            match outcome.and_then(|r| r) {
                Ok(prediction) => report.predictions.push(prediction),
                Err(e) if e.is_per_game() => {
                    warn!(game = %game, error = %e, "Game skipped");
                    report.failures.push((game, e));
                }
                Err(e) => return Err(e),
            }
        }

        report.elapsed_ms = start.elapsed().as_millis() as u64;
        info!(
            predicted = report.predictions.len(),
            failed = report.failures.len(),
            recommendations = report.recommendation_count(),
            elapsed_ms = report.elapsed_ms,
            "Slate complete"
        );
        Ok(report)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
