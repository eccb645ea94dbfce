//! Data access port trait.

use crate::domain::asset::{CandidateAsset, HorizonSeries};
use crate::domain::backtest::BenchmarkSeries;
use crate::domain::drift::AllocationSnapshot;
use crate::domain::error::FolioError;
use std::collections::HashMap;

pub trait DataPort {
    /// Candidate pool, validated and in source order.
    fn fetch_candidates(&self) -> Result<Vec<CandidateAsset>, FolioError>;

    /// Accumulated historical returns per symbol. Symbols without history are absent.
    fn fetch_history(&self) -> Result<HashMap<String, HorizonSeries>, FolioError>;

    fn fetch_benchmarks(&self) -> Result<Vec<BenchmarkSeries>, FolioError>;

    /// A named allocation snapshot, in percent.
    fn fetch_allocations(&self, name: &str) -> Result<Vec<AllocationSnapshot>, FolioError>;
}
