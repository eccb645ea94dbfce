//! End-to-end pipeline: score, optimize, then simulate and backtest.

use crate::domain::asset::{CandidateAsset, HorizonSeries};
use crate::domain::backtest::{
    BacktestEngine, BacktestHolding, BacktestResult, BenchmarkSeries, CurrencyAdjustment,
};
use crate::domain::constraints::Constraints;
use crate::domain::optimizer::AllocationOptimizer;
use crate::domain::portfolio::Portfolio;
use crate::domain::scoring::{AssetScorer, ScoredAsset};
use crate::domain::simulation::{SimulationConfig, SimulationEngine, SimulationResult};
use chrono::NaiveDate;
use std::collections::HashMap;
use tracing::info;

/// Historical inputs for the backtest stage.
#[derive(Debug, Clone)]
pub struct BacktestInputs {
    pub as_of: NaiveDate,
    pub history: HashMap<String, HorizonSeries>,
    pub benchmarks: Vec<BenchmarkSeries>,
    pub currency: Option<CurrencyAdjustment>,
}

#[derive(Debug, Clone)]
pub struct PlanRequest {
    pub candidates: Vec<CandidateAsset>,
    pub constraints: Constraints,
    pub simulation: SimulationConfig,
    pub backtest: Option<BacktestInputs>,
}

#[derive(Debug, Clone)]
pub struct InvestmentPlan {
    /// Every candidate, ranked best first.
    pub scored: Vec<ScoredAsset>,
    pub portfolio: Portfolio,
    pub simulation: SimulationResult,
    pub backtest: Option<BacktestResult>,
}

pub fn build_plan(request: &PlanRequest) -> InvestmentPlan {
    let scored = AssetScorer::new().rank(&request.candidates);
    let portfolio = AllocationOptimizer::new().optimize(&scored, &request.constraints, 100.0);
    info!(
        candidates = scored.len(),
        selected = portfolio.len(),
        expected_return = portfolio.metrics.expected_return,
        volatility = portfolio.metrics.expected_volatility,
        "portfolio constructed"
    );

    let simulation = simulate(&portfolio, &request.simulation);

    let backtest = request.backtest.as_ref().map(|inputs| {
        BacktestEngine::new(inputs.as_of).backtest(
            &BacktestHolding::from_portfolio(&portfolio),
            &inputs.history,
            &inputs.benchmarks,
            inputs.currency.as_ref(),
        )
    });

    InvestmentPlan {
        scored,
        portfolio,
        simulation,
        backtest,
    }
}

/// Per-asset projection of a finished portfolio.
pub fn simulate(portfolio: &Portfolio, config: &SimulationConfig) -> SimulationResult {
    let returns: Vec<f64> = portfolio.holdings.iter().map(|h| h.expected_return).collect();
    let vols: Vec<f64> = portfolio.holdings.iter().map(|h| h.volatility).collect();
    SimulationEngine::new(config.clone()).run(&returns, &vols, &portfolio.weights())
}
