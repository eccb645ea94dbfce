//! Core domain types and engine logic.

pub mod asset;
pub mod scoring;
pub mod constraints;
pub mod portfolio;
pub mod metrics;
pub mod optimizer;
pub mod simulation;
pub mod backtest;
pub mod drift;
pub mod plan;
pub mod config_validation;
pub mod error;
