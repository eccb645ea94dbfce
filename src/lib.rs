//! folioforge: portfolio construction and risk simulation.
//!
//! Hexagonal architecture: the engine lives in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
