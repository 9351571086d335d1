//! Core engine: simulate → blend → analyze, one game or a whole slate.

pub mod factors;
pub mod orchestrator;
pub mod pitching;
pub mod simulator;
pub mod slate;

pub use orchestrator::{PredictionOrchestrator, PredictionRequest};
pub use pitching::PitchingPlanner;
pub use simulator::{GameOutcomeSimulator, SimulationOutput, SimulationRequest, Starter};
pub use slate::{SlateReport, SlateRunner};
