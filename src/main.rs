//! DIAMOND: MLB game-outcome simulator and betting value engine
//!
//! Entry point. Loads configuration, initialises structured logging,
//! loads the reference, market and results files, predicts every game on
//! the requested slate date and writes the records to disk.

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use diamond::config;
use diamond::data::{
    JsonReferenceStore, MarketBook, ReferenceDataProvider, ResultsBook, StubBullpenProvider,
};
use diamond::engine::{PredictionOrchestrator, SlateReport, SlateRunner};
use diamond::storage::{self, SlateFile};
use diamond::types::GamePrediction;

const BANNER: &str = r#"
 ____ ___    _    __  __  ___  _   _ ____
|  _ \_ _|  / \  |  \/  |/ _ \| \ | |  _ \
| | | | |  / _ \ | |\/| | | | |  \| | | | |
| |_| | | / ___ \| |  | | |_| | |\  | |_| |
|____/___/_/   \_\_|  |_|\___/|_| \_|____/

  MLB game-outcome simulator and betting value engine
  v0.1.0
"#;

const MARKETS_FILE: &str = "markets.json";
const RESULTS_FILE: &str = "results.json";

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let config_path = std::env::var("DIAMOND_CONFIG").unwrap_or_else(|_| "config.toml".into());
    let cfg = if Path::new(&config_path).exists() {
        config::AppConfig::load(&config_path)?
    } else {
        config::AppConfig::default()
    };

    init_logging();

    println!("{BANNER}");
    let slate_date = slate_date()?;
    info!(
        date = %slate_date,
        config_version = %cfg.model.version,
        reference_dir = %cfg.data.reference_dir.display(),
        "DIAMOND starting up"
    );

    // -- Data sources ----------------------------------------------------

    let reference = Arc::new(JsonReferenceStore::new(&cfg.data.reference_dir));
    let snapshot = reference.snapshot()?;

    let markets = load_optional(&cfg.data.reference_dir.join(MARKETS_FILE), MarketBook::load)?
        .unwrap_or_default();
    let results = load_optional(&cfg.data.reference_dir.join(RESULTS_FILE), ResultsBook::load)?
        .unwrap_or_default();
    info!(markets = markets.len(), results = results.len(), "Books loaded");

    // -- Orchestrator ----------------------------------------------------

    let model = Arc::new(cfg.model.clone());
    let mut orchestrator = PredictionOrchestrator::new(
        Arc::clone(&model),
        reference,
        Arc::new(markets),
        Arc::new(results),
    )?;
    if cfg.data.stub_bullpens {
        orchestrator = orchestrator.with_fallback_bullpens(Arc::new(StubBullpenProvider));
    }

    // -- Slate -----------------------------------------------------------

    let requests = SlateRunner::requests_for_date(&snapshot, slate_date, cfg.slate_trial_count());
    if requests.is_empty() {
        warn!(date = %slate_date, "No games scheduled");
        return Ok(());
    }

    let runner = SlateRunner::new(
        Arc::new(orchestrator),
        Duration::from_secs(cfg.slate.timeout_secs),
    );
    let report = match runner.run(requests).await {
        Ok(r) => r,
        Err(e) => {
            error!(error = %e, "Slate failed");
            return Err(e.into());
        }
    };
    log_slate_report(&report);

    let path = storage::save_slate(
        &cfg.data.output_dir,
        &SlateFile {
            slate_date,
            config_version: model.version.clone(),
            predictions: report.predictions,
        },
    )?;
    info!(path = %path.display(), "DIAMOND finished.");

    Ok(())
}

/// Slate date from the first argument, `DIAMOND_DATE`, or today.
fn slate_date() -> Result<NaiveDate> {
    match std::env::args().nth(1).or_else(|| std::env::var("DIAMOND_DATE").ok()) {
        Some(s) => NaiveDate::parse_from_str(&s, "%Y-%m-%d")
            .with_context(|| format!("Invalid slate date (want YYYY-MM-DD): {s}")),
        None => Ok(Local::now().date_naive()),
    }
}

/// Load a book if its file exists.
fn load_optional<T>(path: &Path, load: fn(&Path) -> Result<T>) -> Result<Option<T>> {
    if !path.exists() {
        warn!(path = %path.display(), "Optional input missing, continuing without it");
        return Ok(None);
    }
    load(path).map(Some)
}

/// Log a human-readable slate summary plus the best bet per game.
fn log_slate_report(report: &SlateReport) {
    for prediction in &report.predictions {
        match prediction {
            GamePrediction::Historical(h) => info!(
                game = %h.game,
                away = h.result.away_score,
                home = h.result.home_score,
                picked_winner = ?h.result.winner_correct(),
                total_miss = ?h.result.total_error().map(|e| format!("{e:.2}")),
                "Final"
            ),
            GamePrediction::Simulated(r) => {
                let best = r.best_recommendation().map(|b| {
                    format!(
                        "{:?} {:?} {:+} EV {:.1}% stake ${}",
                        b.bet_type,
                        b.side,
                        b.odds,
                        b.expected_value * 100.0,
                        b.stake
                    )
                });
                info!(
                    game = %r.game,
                    away = format!("{:.2}", r.blended.predicted_away_score),
                    home = format!("{:.2}", r.blended.predicted_home_score),
                    home_win = format!("{:.1}%", r.blended.home_win_probability * 100.0),
                    best = best.as_deref().unwrap_or("-"),
                    "Prediction"
                );
            }
        }
    }
    for (game, e) in &report.failures {
        warn!(game = %game, error = %e, "Game failed");
    }
    info!(
        games = report.predictions.len(),
        failed = report.failures.len(),
        recommendations = report.recommendation_count(),
        elapsed_ms = report.elapsed_ms,
        "Slate complete"
    );
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_env("DIAMOND_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("diamond=info"));

    let json_logging = std::env::var("DIAMOND_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
