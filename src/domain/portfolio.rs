//! Target portfolio produced by the optimizer.

use crate::domain::asset::AssetClass;
use crate::domain::metrics::PortfolioMetrics;
use serde::Serialize;

pub const WEIGHT_TOLERANCE: f64 = 1e-6;

/// One selected asset and the metrics that drove its weight.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Holding {
    pub symbol: String,
    pub name: String,
    pub asset_class: AssetClass,
    pub bucket: String,
    /// Percent of the portfolio.
    pub weight: f64,
    pub expected_return: f64,
    pub volatility: f64,
    pub sharpe_ratio: f64,
    pub quality_score: f64,
    pub composite_score: f64,
}

/// Outcome of comparing the portfolio against its benchmark hurdles.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct BenchmarkCheck {
    pub benchmarks_beaten: usize,
    pub benchmarks_required: usize,
    pub sharpe_ok: bool,
    pub passed: bool,
    /// True when the single performance-tilt retry was applied.
    pub tilted: bool,
}

/// Ordered holdings (selection order) whose weights sum to 100.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Portfolio {
    pub holdings: Vec<Holding>,
    pub metrics: PortfolioMetrics,
    pub check: BenchmarkCheck,
}

impl Portfolio {
    pub fn empty() -> Self {
        Portfolio::default()
    }

    pub fn is_empty(&self) -> bool {
        self.holdings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.holdings.len()
    }

    pub fn total_weight(&self) -> f64 {
        self.holdings.iter().map(|h| h.weight).sum()
    }

    pub fn weight_of(&self, symbol: &str) -> Option<f64> {
        self.holdings
            .iter()
            .find(|h| h.symbol == symbol)
            .map(|h| h.weight)
    }

    pub fn symbols(&self) -> Vec<&str> {
        self.holdings.iter().map(|h| h.symbol.as_str()).collect()
    }

    pub fn weights(&self) -> Vec<f64> {
        self.holdings.iter().map(|h| h.weight).collect()
    }

    pub fn class_weight(&self, class: AssetClass) -> f64 {
        self.holdings
            .iter()
            .filter(|h| h.asset_class == class)
            .map(|h| h.weight)
            .sum()
    }

    /// Weights are non-negative and sum to 100 within tolerance.
    pub fn is_normalized(&self) -> bool {
        self.is_empty()
            || (self.holdings.iter().all(|h| h.weight >= 0.0)
                && (self.total_weight() - 100.0).abs() <= WEIGHT_TOLERANCE)
    }
}
