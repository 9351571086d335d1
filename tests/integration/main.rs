//! Integration tests for the prediction pipeline.
//!
//! Everything runs against in-memory or temp-directory data; no network.

mod betting;
mod fixtures;
mod pipeline;
mod simulation;
