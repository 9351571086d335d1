//! DIAMOND: MLB game-outcome simulator and betting value engine
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod storage;
pub mod strategy;
pub mod types;
