//! Ten-year historical backtest against benchmark series.
//!
//! Each holding's ten-year return is taken from the longest positive
//! horizon available, shorter horizons being annualized and compounded out
//! to ten years. Holdings without history fall back to a per-class estimate.
//! The weighted result is converted into the comparison currency and
//! reported next to the benchmarks, which arrive already converted.

use crate::domain::asset::{AssetClass, HorizonSeries};
use crate::domain::portfolio::Portfolio;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

pub const BACKTEST_YEARS: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestHolding {
    pub symbol: String,
    pub asset_class: AssetClass,
    /// Percent of the portfolio.
    pub weight: f64,
}

impl BacktestHolding {
    pub fn from_portfolio(portfolio: &Portfolio) -> Vec<BacktestHolding> {
        portfolio
            .holdings
            .iter()
            .map(|h| BacktestHolding {
                symbol: h.symbol.clone(),
                asset_class: h.asset_class,
                weight: h.weight,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BenchmarkKind {
    EquityIndex,
    BondIndex,
    LocalIndex,
    RiskFree,
}

impl std::str::FromStr for BenchmarkKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "equity" | "equity_index" => Ok(BenchmarkKind::EquityIndex),
            "bond" | "bond_index" => Ok(BenchmarkKind::BondIndex),
            "local" | "local_index" => Ok(BenchmarkKind::LocalIndex),
            "risk_free" | "riskfree" | "cash" => Ok(BenchmarkKind::RiskFree),
            other => Err(format!("unknown benchmark kind '{other}'")),
        }
    }
}

/// Pre-computed benchmark figures, already in the comparison currency.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkSeries {
    pub name: String,
    pub kind: BenchmarkKind,
    /// Ten-year accumulated return, percent.
    pub accumulated_return: f64,
    /// Optional accumulated return at the end of each year, percent.
    pub yearly: Vec<f64>,
}

impl BenchmarkSeries {
    fn has_literal_years(&self) -> bool {
        self.yearly.len() == BACKTEST_YEARS
    }

    /// Return of year `k` implied by the accumulated series.
    fn year_move(&self, k: usize) -> f64 {
        let end = 1.0 + self.yearly[k] / 100.0;
        let start = if k == 0 { 1.0 } else { 1.0 + self.yearly[k - 1] / 100.0 };
        if start > 0.0 { end / start - 1.0 } else { 0.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrencyAdjustment {
    pub from: String,
    pub to: String,
    /// Appreciation of `from` against `to` over the window, percent.
    pub fx_appreciation: f64,
}

impl CurrencyAdjustment {
    pub fn apply(&self, native_pct: f64) -> f64 {
        ((1.0 + native_pct / 100.0) * (1.0 + self.fx_appreciation / 100.0) - 1.0) * 100.0
    }
}

/// Which data fed a holding's ten-year estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnSource {
    TenYear,
    FiveYearCompounded,
    ThreeYearCompounded,
    TwoYearCompounded,
    OneYearCompounded,
    ClassFallback,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoldingEstimate {
    pub symbol: String,
    pub weight: f64,
    pub source: ReturnSource,
    /// Ten-year accumulated return in native currency, percent.
    pub accumulated_return: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Performance {
    pub name: String,
    pub accumulated_return: f64,
    pub annualized_return: f64,
}

impl Performance {
    fn from_accumulated(name: &str, accumulated_pct: f64) -> Self {
        Performance {
            name: name.to_string(),
            accumulated_return: accumulated_pct,
            annualized_return: annualize(accumulated_pct, BACKTEST_YEARS as f64),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearPoint {
    pub year: i32,
    pub portfolio: f64,
    /// Same order as `BacktestResult::benchmarks`.
    pub benchmarks: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub as_of: NaiveDate,
    pub portfolio: Performance,
    pub portfolio_native: Performance,
    pub benchmarks: Vec<Performance>,
    pub yearly: Vec<YearPoint>,
    pub holdings: Vec<HoldingEstimate>,
    pub currency: Option<CurrencyAdjustment>,
    pub literal_yearly: bool,
}

#[derive(Debug, Clone)]
pub struct BacktestEngine {
    as_of: NaiveDate,
}

impl BacktestEngine {
    pub fn new(as_of: NaiveDate) -> Self {
        BacktestEngine { as_of }
    }

    pub fn backtest(
        &self,
        holdings: &[BacktestHolding],
        history: &HashMap<String, HorizonSeries>,
        benchmarks: &[BenchmarkSeries],
        currency: Option<&CurrencyAdjustment>,
    ) -> BacktestResult {
        let total_weight: f64 = holdings.iter().map(|h| h.weight.max(0.0)).sum();
        let estimates: Vec<HoldingEstimate> = holdings
            .iter()
            .map(|h| {
                let (source, accumulated_return) = ten_year_return(history.get(&h.symbol), h.asset_class);
                HoldingEstimate {
                    symbol: h.symbol.clone(),
                    weight: if total_weight > 0.0 {
                        h.weight.max(0.0) / total_weight
                    } else {
                        0.0
                    },
                    source,
                    accumulated_return,
                }
            })
            .collect();

        let native: f64 = estimates.iter().map(|e| e.weight * e.accumulated_return).sum();
        let converted = currency.map_or(native, |c| c.apply(native));
        debug!(
            holdings = estimates.len(),
            native, converted, "portfolio ten-year return"
        );

        let portfolio = Performance::from_accumulated("portfolio", converted);
        let portfolio_native = Performance::from_accumulated("portfolio_native", native);
        let benchmark_figures: Vec<Performance> = benchmarks
            .iter()
            .map(|b| Performance::from_accumulated(&b.name, b.accumulated_return))
            .collect();

        let literal_yearly = benchmarks.iter().any(BenchmarkSeries::has_literal_years);
        let portfolio_years = if literal_yearly {
            blended_years(holdings, &estimates, benchmarks)
        } else {
            interpolated_years(portfolio.annualized_return)
        };

        let first_year = self.as_of.year() - BACKTEST_YEARS as i32 + 1;
        let yearly = (0..BACKTEST_YEARS)
            .map(|k| YearPoint {
                year: first_year + k as i32,
                portfolio: portfolio_years[k],
                benchmarks: benchmarks
                    .iter()
                    .zip(&benchmark_figures)
                    .map(|(b, perf)| {
                        if b.has_literal_years() {
                            b.yearly[k]
                        } else {
                            interpolated_year(perf.annualized_return, k)
                        }
                    })
                    .collect(),
            })
            .collect();

        BacktestResult {
            as_of: self.as_of,
            portfolio,
            portfolio_native,
            benchmarks: benchmark_figures,
            yearly,
            holdings: estimates,
            currency: currency.cloned(),
            literal_yearly,
        }
    }
}

/// `(1 + total)^(1 / years) - 1`, percent in and out.
pub fn annualize(total_pct: f64, years: f64) -> f64 {
    let growth = 1.0 + total_pct / 100.0;
    if growth <= 0.0 || years <= 0.0 {
        return -100.0;
    }
    (growth.powf(1.0 / years) - 1.0) * 100.0
}

/// `(1 + annual)^years - 1`, percent in and out.
pub fn compound(annual_pct: f64, years: f64) -> f64 {
    ((1.0 + annual_pct / 100.0).powf(years) - 1.0) * 100.0
}

/// Ten-year accumulated return for one holding, percent.
fn ten_year_return(history: Option<&HorizonSeries>, class: AssetClass) -> (ReturnSource, f64) {
    if let Some(h) = history {
        let horizons = [
            (h.y10, 10.0, ReturnSource::TenYear),
            (h.y5, 5.0, ReturnSource::FiveYearCompounded),
            (h.m36, 3.0, ReturnSource::ThreeYearCompounded),
            (h.m24, 2.0, ReturnSource::TwoYearCompounded),
            (h.m12, 1.0, ReturnSource::OneYearCompounded),
        ];
        for (value, years, source) in horizons {
            if value.is_finite() && value > 0.0 {
                let projected = if source == ReturnSource::TenYear {
                    value
                } else {
                    compound(annualize(value, years), BACKTEST_YEARS as f64)
                };
                return (source, projected);
            }
        }
    }
    (
        ReturnSource::ClassFallback,
        compound(fallback_annual_return(class), BACKTEST_YEARS as f64),
    )
}

/// Long-run annual return assumed when a holding has no history, percent.
pub fn fallback_annual_return(class: AssetClass) -> f64 {
    match class {
        AssetClass::GlobalEquity => 7.0,
        AssetClass::RegionalEquity => 6.5,
        AssetClass::SectorEquity => 7.5,
        AssetClass::SingleStock => 7.0,
        AssetClass::Bond => 3.0,
        AssetClass::ShortTermBond => 2.0,
        AssetClass::RealEstate => 5.0,
        AssetClass::Commodity => 3.5,
        AssetClass::Cash => 1.5,
    }
}

fn interpolated_year(annualized_pct: f64, k: usize) -> f64 {
    compound(annualized_pct, (k + 1) as f64)
}

fn interpolated_years(annualized_pct: f64) -> Vec<f64> {
    (0..BACKTEST_YEARS)
        .map(|k| interpolated_year(annualized_pct, k))
        .collect()
}

/// Sensitivity of a class to its reference benchmark's yearly move.
fn beta(class: AssetClass, against_bond_index: bool) -> f64 {
    match (class, against_bond_index) {
        (AssetClass::GlobalEquity, _) => 1.0,
        (AssetClass::RegionalEquity, _) => 1.05,
        (AssetClass::SectorEquity, _) => 1.15,
        (AssetClass::SingleStock, _) => 1.2,
        (AssetClass::RealEstate, _) => 0.9,
        (AssetClass::Commodity, _) => 0.5,
        (AssetClass::Bond, true) => 1.0,
        (AssetClass::ShortTermBond, true) => 0.5,
        (AssetClass::Cash, true) => 0.1,
        (AssetClass::Bond, false) => 0.3,
        (AssetClass::ShortTermBond, false) => 0.15,
        (AssetClass::Cash, false) => 0.05,
    }
}

/// Portfolio path built from literal benchmark years: each holding moves by
/// a beta multiple of its reference benchmark's yearly return.
fn blended_years(
    holdings: &[BacktestHolding],
    estimates: &[HoldingEstimate],
    benchmarks: &[BenchmarkSeries],
) -> Vec<f64> {
    let literal: Vec<&BenchmarkSeries> = benchmarks.iter().filter(|b| b.has_literal_years()).collect();
    let equity_ref = literal
        .iter()
        .find(|b| b.kind == BenchmarkKind::EquityIndex)
        .or_else(|| literal.first())
        .copied();
    let bond_ref = literal
        .iter()
        .find(|b| b.kind == BenchmarkKind::BondIndex)
        .copied();

    let mut accumulated = 0.0;
    let mut out = Vec::with_capacity(BACKTEST_YEARS);
    for k in 0..BACKTEST_YEARS {
        let year_return: f64 = holdings
            .iter()
            .zip(estimates)
            .map(|(h, e)| {
                let (reference, on_bonds) = match (h.asset_class.is_fixed_income(), bond_ref) {
                    (true, Some(bond)) => (Some(bond), true),
                    _ => (equity_ref, false),
                };
                let mv = reference.map_or(0.0, |r| r.year_move(k));
                e.weight * beta(h.asset_class, on_bonds) * mv
            })
            .sum();
        accumulated = (1.0 + accumulated) * (1.0 + year_return) - 1.0;
        out.push(accumulated * 100.0);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn engine() -> BacktestEngine {
        BacktestEngine::new(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap())
    }

    fn holding(symbol: &str, class: AssetClass, weight: f64) -> BacktestHolding {
        BacktestHolding {
            symbol: symbol.to_string(),
            asset_class: class,
            weight,
        }
    }

    fn benchmark(name: &str, kind: BenchmarkKind, accumulated: f64) -> BenchmarkSeries {
        BenchmarkSeries {
            name: name.to_string(),
            kind,
            accumulated_return: accumulated,
            yearly: Vec::new(),
        }
    }

    #[test]
    fn single_holding_reproduces_its_own_figures() {
        let mut history = HashMap::new();
        history.insert(
            "VWCE".to_string(),
            HorizonSeries {
                y10: 150.0,
                ..Default::default()
            },
        );
        let result = engine().backtest(
            &[holding("VWCE", AssetClass::GlobalEquity, 100.0)],
            &history,
            &[],
            None,
        );
        assert_relative_eq!(result.portfolio.accumulated_return, 150.0);
        assert_relative_eq!(result.portfolio.annualized_return, annualize(150.0, 10.0));
        assert_relative_eq!(
            result.yearly.last().unwrap().portfolio,
            150.0,
            epsilon = 1e-9
        );
        assert_eq!(result.holdings[0].source, ReturnSource::TenYear);
    }

    #[test]
    fn shorter_horizons_are_compounded_to_ten_years() {
        let mut history = HashMap::new();
        history.insert(
            "NEW".to_string(),
            HorizonSeries {
                m36: 33.1,
                m12: 50.0,
                ..Default::default()
            },
        );
        let result = engine().backtest(
            &[holding("NEW", AssetClass::GlobalEquity, 100.0)],
            &history,
            &[],
            None,
        );
        // 33.1% over three years is 10% a year.
        assert_eq!(result.holdings[0].source, ReturnSource::ThreeYearCompounded);
        assert_relative_eq!(
            result.portfolio.accumulated_return,
            compound(10.0, 10.0),
            epsilon = 1e-9
        );
    }

    #[test]
    fn non_positive_horizons_are_skipped() {
        let (source, _) = ten_year_return(
            Some(&HorizonSeries {
                y10: -5.0,
                y5: 0.0,
                m12: 4.0,
                ..Default::default()
            }),
            AssetClass::Bond,
        );
        assert_eq!(source, ReturnSource::OneYearCompounded);
    }

    #[test]
    fn missing_history_uses_class_fallback() {
        let result = engine().backtest(
            &[holding("BOND", AssetClass::ShortTermBond, 100.0)],
            &HashMap::new(),
            &[],
            None,
        );
        assert_eq!(result.holdings[0].source, ReturnSource::ClassFallback);
        assert_relative_eq!(result.portfolio.annualized_return, 2.0, epsilon = 1e-9);
    }

    #[test]
    fn weights_blend_holdings() {
        let mut history = HashMap::new();
        history.insert("A".to_string(), HorizonSeries { y10: 200.0, ..Default::default() });
        history.insert("B".to_string(), HorizonSeries { y10: 40.0, ..Default::default() });
        let result = engine().backtest(
            &[
                holding("A", AssetClass::GlobalEquity, 60.0),
                holding("B", AssetClass::Bond, 40.0),
            ],
            &history,
            &[],
            None,
        );
        assert_relative_eq!(result.portfolio.accumulated_return, 136.0, epsilon = 1e-9);
    }

    #[test]
    fn currency_adjustment_is_multiplicative() {
        let mut history = HashMap::new();
        history.insert("A".to_string(), HorizonSeries { y10: 100.0, ..Default::default() });
        let fx = CurrencyAdjustment {
            from: "USD".into(),
            to: "EUR".into(),
            fx_appreciation: 10.0,
        };
        let result = engine().backtest(
            &[holding("A", AssetClass::GlobalEquity, 100.0)],
            &history,
            &[],
            Some(&fx),
        );
        assert_relative_eq!(result.portfolio_native.accumulated_return, 100.0);
        assert_relative_eq!(result.portfolio.accumulated_return, 120.0, epsilon = 1e-9);
        assert_eq!(result.currency.as_ref().unwrap().to, "EUR");
    }

    #[test]
    fn benchmarks_are_reported_and_interpolated() {
        let result = engine().backtest(
            &[],
            &HashMap::new(),
            &[benchmark("MSCI World", BenchmarkKind::EquityIndex, 159.37)],
            None,
        );
        assert_eq!(result.benchmarks[0].name, "MSCI World");
        assert_relative_eq!(result.benchmarks[0].annualized_return, 10.0, epsilon = 1e-3);
        assert_eq!(result.yearly.len(), BACKTEST_YEARS);
        assert_eq!(result.yearly[0].year, 2015);
        assert_eq!(result.yearly[9].year, 2024);
        assert_relative_eq!(result.yearly[0].benchmarks[0], 10.0, epsilon = 1e-3);
        assert_eq!(result.portfolio.accumulated_return, 0.0);
        assert!(!result.literal_yearly);
    }

    #[test]
    fn literal_years_drive_the_portfolio_series() {
        let mut equity = benchmark("World", BenchmarkKind::EquityIndex, 0.0);
        // +10% every year
        equity.yearly = (1..=10).map(|k| compound(10.0, k as f64)).collect();
        equity.accumulated_return = equity.yearly[9];
        let mut bonds = benchmark("Agg", BenchmarkKind::BondIndex, 0.0);
        bonds.yearly = (1..=10).map(|k| compound(2.0, k as f64)).collect();
        bonds.accumulated_return = bonds.yearly[9];

        let result = engine().backtest(
            &[
                holding("EQ", AssetClass::SectorEquity, 50.0),
                holding("BD", AssetClass::Bond, 50.0),
            ],
            &HashMap::new(),
            &[equity.clone(), bonds],
            None,
        );
        assert!(result.literal_yearly);
        // 0.5 * 1.15 * 10% + 0.5 * 1.0 * 2% = 6.75% per year
        assert_relative_eq!(result.yearly[0].portfolio, 6.75, epsilon = 1e-9);
        assert_relative_eq!(result.yearly[9].portfolio, compound(6.75, 10.0), epsilon = 1e-9);
        assert_relative_eq!(result.yearly[3].benchmarks[0], equity.yearly[3]);
    }

    #[test]
    fn annualize_and_compound_are_inverse() {
        let total = compound(7.5, 10.0);
        assert_relative_eq!(annualize(total, 10.0), 7.5, epsilon = 1e-9);
        assert_eq!(annualize(-100.0, 10.0), -100.0);
    }
}
