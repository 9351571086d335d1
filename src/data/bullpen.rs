//! Bullpen statistics.
//!
//! Real numbers come from the reference snapshot. [`StubBullpenProvider`]
//! is a **placeholder** that fabricates plausible-looking figures from a
//! hash of the team name; it exists so the pitching-plan path can be
//! exercised without a bullpen feed and must not be mistaken for data.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Season bullpen line for one club.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BullpenStats {
    pub era: f64,
    #[serde(default)]
    pub whip: Option<f64>,
    #[serde(default)]
    pub save_rate: Option<f64>,
    #[serde(default)]
    pub innings: Option<f64>,
}

/// Anything that can answer "what is this club's bullpen like".
pub trait BullpenSource: Send + Sync {
    fn bullpen(&self, team: &str) -> Option<BullpenStats>;

    /// Label reported in logs so stub numbers are never confused with data.
    fn label(&self) -> &'static str;
}

// ---------------------------------------------------------------------------
// Stub provider
// ---------------------------------------------------------------------------

/// Deterministic, hash-derived bullpen figures. NOT real data.
#[derive(Debug, Clone, Default)]
pub struct StubBullpenProvider;

impl StubBullpenProvider {
    fn team_hash(team: &str) -> u64 {
        let digest = Sha256::digest(team.as_bytes());
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        u64::from_le_bytes(bytes)
    }
}

impl BullpenSource for StubBullpenProvider {
    fn bullpen(&self, team: &str) -> Option<BullpenStats> {
        if team.trim().is_empty() {
            return None;
        }
        let h = Self::team_hash(team);
        // ERA in [3.20, 5.20), WHIP in [1.10, 1.50), save rate in [0.65, 0.95)
        let era = 3.20 + (h % 200) as f64 / 100.0;
        let whip = 1.10 + ((h >> 16) % 40) as f64 / 100.0;
        let save_rate = 0.65 + ((h >> 32) % 30) as f64 / 100.0;
        let innings = 450.0 + ((h >> 48) % 70) as f64;
        Some(BullpenStats {
            era,
            whip: Some(whip),
            save_rate: Some(save_rate),
            innings: Some(innings),
        })
    }

    fn label(&self) -> &'static str {
        "stub (hash-derived placeholder)"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
