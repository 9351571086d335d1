//! In-memory market and results books.
//!
//! Both are keyed by the exact (away, home, date) triple and can be loaded
//! from a JSON list of flat entries:
//!
//! ```json
//! [{"game_date": "2025-08-15", "away_team": "Yankees", "home_team": "Red Sox",
//!   "home_moneyline": -120, "away_moneyline": 105, "total_line": 8.5}]
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

use super::{HistoricalResultProvider, MarketLineProvider};
use crate::storage;
use crate::types::{GameKey, HistoricalResult, MarketLine};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MarketEntry {
    #[serde(flatten)]
    game: GameKey,
    #[serde(flatten)]
    line: MarketLine,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ResultEntry {
    #[serde(flatten)]
    game: GameKey,
    #[serde(flatten)]
    result: HistoricalResult,
}

// ---------------------------------------------------------------------------
// Market lines
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct MarketBook {
    lines: HashMap<GameKey, MarketLine>,
}

impl MarketBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_line(mut self, game: GameKey, line: MarketLine) -> Self {
        self.lines.insert(game, line);
        self
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let entries: Vec<MarketEntry> = storage::read_json(path)?;
        let book = entries
            .into_iter()
            .fold(Self::new(), |book, e| book.with_line(e.game, e.line));
        info!(path = %path.display(), games = book.len(), "Market lines loaded");
        Ok(book)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl MarketLineProvider for MarketBook {
    fn market_line(&self, game: &GameKey) -> Option<MarketLine> {
        self.lines.get(game).filter(|l| !l.is_empty()).cloned()
    }
}

// ---------------------------------------------------------------------------
// Final scores
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct ResultsBook {
    results: HashMap<GameKey, HistoricalResult>,
}

impl ResultsBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_result(mut self, game: GameKey, result: HistoricalResult) -> Self {
        self.results.insert(game, result);
        self
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let entries: Vec<ResultEntry> = storage::read_json(path)?;
        let book = entries
            .into_iter()
            .fold(Self::new(), |book, e| book.with_result(e.game, e.result));
        info!(path = %path.display(), games = book.len(), "Final scores loaded");
        Ok(book)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

impl HistoricalResultProvider for ResultsBook {
    fn actual_result(&self, game: &GameKey) -> Option<HistoricalResult> {
        self.results.get(game).cloned()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
