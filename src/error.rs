//! Typed failures for the prediction pipeline.
//!
//! Only fatal conditions live here. Recoverable gaps in reference or
//! market data are absorbed at the component boundary and surfaced as
//! [`crate::types::Degradation`] flags on the produced record instead.

/// Fatal errors returned to callers of the simulator, orchestrator and
/// slate runner.
#[derive(Debug, thiserror::Error)]
pub enum PredictionError {
    /// The whole reference dataset could not be loaded. A prediction built
    /// from neutral defaults alone would look confident while knowing
    /// nothing, so this aborts the request.
    #[error("Reference store unavailable: {0}")]
    ReferenceStoreUnavailable(String),

    #[error("Invalid configuration ({field}): {reason}")]
    ConfigurationInvalid { field: String, reason: String },

    #[error("Invalid simulation input: {0}")]
    SimulationInputInvalid(String),

    #[error("Slate timed out after {elapsed_ms} ms ({completed}/{total} games finished)")]
    SlateTimedOut {
        elapsed_ms: u64,
        completed: usize,
        total: usize,
    },

    #[error("Prediction task failed: {0}")]
    Task(String),

    /// The owning slate gave up on this game before it finished.
    #[error("Prediction cancelled")]
    Cancelled,
}

impl PredictionError {
    /// Shorthand for a rejected config field.
    pub fn config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        PredictionError::ConfigurationInvalid {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error is specific to one game (the rest of a slate can
    /// still be produced) rather than to the whole run.
    pub fn is_per_game(&self) -> bool {
        matches!(
            self,
            PredictionError::SimulationInputInvalid(_) | PredictionError::Task(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, PredictionError>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
