//! Reference and market data seams.
//!
//! The engine never fetches anything mid-prediction. Collaborators hand it
//! read-only snapshots through the traits below; concrete in-memory and
//! JSON-directory implementations live in the submodules.

pub mod bullpen;
pub mod market;
pub mod park;
pub mod reference;

use std::sync::Arc;

use crate::error::Result;
use crate::types::{GameKey, HistoricalResult, MarketLine};

pub use bullpen::{BullpenSource, BullpenStats, StubBullpenProvider};
pub use market::{MarketBook, ResultsBook};
pub use park::{ParkFactorResolution, ParkFactorSource, ParkFactorTable};
pub use reference::{
    JsonReferenceStore, PitcherStats, ReferenceSnapshot, ScheduledGame, StarterProjection,
    StaticReferenceStore,
};

/// Source of team, pitcher and park reference data.
///
/// `snapshot` is called once per prediction. An `Err` means the whole
/// dataset is unreachable and the request must fail; individual missing
/// entries inside a successful snapshot are not errors.
#[cfg_attr(test, mockall::automock)]
pub trait ReferenceDataProvider: Send + Sync {
    fn snapshot(&self) -> Result<Arc<ReferenceSnapshot>>;
}

/// Sportsbook lines for a matchup. `None` means nothing is quoted.
#[cfg_attr(test, mockall::automock)]
pub trait MarketLineProvider: Send + Sync {
    fn market_line(&self, game: &GameKey) -> Option<MarketLine>;
}

/// Recorded final scores for games that have already been played.
#[cfg_attr(test, mockall::automock)]
pub trait HistoricalResultProvider: Send + Sync {
    fn actual_result(&self, game: &GameKey) -> Option<HistoricalResult>;
}

/// Normalise a person/team identifier for case- and spacing-insensitive
/// lookups.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Identifiers that upstream feeds use when a starter is not yet announced.
pub fn is_placeholder_pitcher(name: &str) -> bool {
    matches!(
        normalize_name(name).as_str(),
        "" | "tbd" | "tba" | "unknown" | "n/a" | "none"
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
