#![allow(dead_code)]

use folioforge::domain::asset::{AssetClass, CandidateAsset, HorizonSeries};
use folioforge::domain::backtest::{BenchmarkKind, BenchmarkSeries};
use folioforge::domain::drift::AllocationSnapshot;
use folioforge::domain::error::FolioError;
use folioforge::ports::data_port::DataPort;
use std::collections::HashMap;

pub struct MockDataPort {
    pub candidates: Vec<CandidateAsset>,
    pub history: HashMap<String, HorizonSeries>,
    pub benchmarks: Vec<BenchmarkSeries>,
    pub allocations: HashMap<String, Vec<AllocationSnapshot>>,
    pub error: Option<String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            candidates: Vec::new(),
            history: HashMap::new(),
            benchmarks: Vec::new(),
            allocations: HashMap::new(),
            error: None,
        }
    }

    pub fn with_candidates(mut self, candidates: Vec<CandidateAsset>) -> Self {
        self.candidates = candidates;
        self
    }

    pub fn with_history(mut self, symbol: &str, history: HorizonSeries) -> Self {
        self.history.insert(symbol.to_string(), history);
        self
    }

    pub fn with_benchmark(mut self, benchmark: BenchmarkSeries) -> Self {
        self.benchmarks.push(benchmark);
        self
    }

    pub fn with_allocations(mut self, name: &str, snapshots: Vec<AllocationSnapshot>) -> Self {
        self.allocations.insert(name.to_string(), snapshots);
        self
    }

    pub fn with_error(mut self, reason: &str) -> Self {
        self.error = Some(reason.to_string());
        self
    }

    fn check(&self) -> Result<(), FolioError> {
        match &self.error {
            Some(reason) => Err(FolioError::Data {
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl DataPort for MockDataPort {
    fn fetch_candidates(&self) -> Result<Vec<CandidateAsset>, FolioError> {
        self.check()?;
        Ok(self.candidates.clone())
    }

    fn fetch_history(&self) -> Result<HashMap<String, HorizonSeries>, FolioError> {
        self.check()?;
        Ok(self.history.clone())
    }

    fn fetch_benchmarks(&self) -> Result<Vec<BenchmarkSeries>, FolioError> {
        self.check()?;
        Ok(self.benchmarks.clone())
    }

    fn fetch_allocations(&self, name: &str) -> Result<Vec<AllocationSnapshot>, FolioError> {
        self.check()?;
        self.allocations
            .get(name)
            .cloned()
            .ok_or_else(|| FolioError::Data {
                reason: format!("no allocation named {name}"),
            })
    }
}

/// Liquid candidate with the same figure on every horizon.
pub fn make_candidate(
    symbol: &str,
    class: AssetClass,
    annual_return: f64,
    volatility: f64,
    sharpe: f64,
) -> CandidateAsset {
    let flat = |v: f64| HorizonSeries {
        m12: v,
        m24: v,
        m36: v,
        y5: v,
        y10: v,
    };
    CandidateAsset {
        returns: flat(annual_return),
        volatility: flat(volatility),
        sharpe_ratio: sharpe,
        dividend_yield: 1.5,
        expense_ratio: 0.2,
        aum: 5_000_000_000.0,
        avg_volume: 250_000.0,
        ..CandidateAsset::new(symbol, class)
    }
}

pub fn make_bond(symbol: &str, annual_return: f64) -> CandidateAsset {
    make_candidate(symbol, AssetClass::Bond, annual_return, 5.0, 0.4)
}

pub fn make_equity(symbol: &str, annual_return: f64) -> CandidateAsset {
    make_candidate(symbol, AssetClass::GlobalEquity, annual_return, 16.0, 0.7)
}

/// Three bonds and three equities.
pub fn mixed_pool() -> Vec<CandidateAsset> {
    vec![
        make_bond("BND1", 3.0),
        make_bond("BND2", 3.5),
        make_bond("BND3", 2.5),
        make_equity("EQ1", 9.0),
        make_equity("EQ2", 8.0),
        make_equity("EQ3", 10.0),
    ]
}

pub fn make_benchmark(name: &str, kind: BenchmarkKind, accumulated: f64) -> BenchmarkSeries {
    BenchmarkSeries {
        name: name.to_string(),
        kind,
        accumulated_return: accumulated,
        yearly: Vec::new(),
    }
}

pub fn snapshots(items: &[(&str, f64)]) -> Vec<AllocationSnapshot> {
    items
        .iter()
        .map(|(s, p)| AllocationSnapshot::new(s, *p))
        .collect()
}
