//! CSV report adapter. Writes one file per plan section into an output directory.

use crate::domain::asset::LiquidityTier;
use crate::domain::backtest::BacktestResult;
use crate::domain::error::FolioError;
use crate::domain::plan::InvestmentPlan;
use crate::ports::report_port::ReportPort;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::Path;
use tracing::info;

pub const SCORES_FILE: &str = "scores.csv";
pub const PORTFOLIO_FILE: &str = "portfolio.csv";
pub const SIMULATION_FILE: &str = "simulation.csv";
pub const BACKTEST_FILE: &str = "backtest.csv";
pub const BACKTEST_HOLDINGS_FILE: &str = "backtest_holdings.csv";

#[derive(Debug, Default, Clone, Copy)]
pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        CsvReportAdapter
    }
}

#[derive(Serialize)]
struct ScoreRow<'a> {
    rank: usize,
    symbol: &'a str,
    asset_class: &'a str,
    quality_score: f64,
    risk_adjusted_score: f64,
    diversification_score: f64,
    liquidity_score: f64,
    liquidity_tier: LiquidityTier,
}

fn write_serialized<T: Serialize>(path: &Path, rows: impl IntoIterator<Item = T>) -> Result<(), FolioError> {
    let mut wtr = csv::Writer::from_path(path).map_err(io::Error::from)?;
    for row in rows {
        wtr.serialize(row).map_err(io::Error::from)?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_backtest(path: &Path, result: &BacktestResult) -> Result<(), FolioError> {
    let mut wtr = csv::Writer::from_path(path).map_err(io::Error::from)?;
    let mut header = vec!["year".to_string(), "portfolio".to_string()];
    header.extend(result.benchmarks.iter().map(|b| b.name.clone()));
    wtr.write_record(&header).map_err(io::Error::from)?;

    for point in &result.yearly {
        let mut record = vec![point.year.to_string(), format!("{:.4}", point.portfolio)];
        record.extend(point.benchmarks.iter().map(|v| format!("{v:.4}")));
        wtr.write_record(&record).map_err(io::Error::from)?;
    }
    wtr.flush()?;
    Ok(())
}

impl ReportPort for CsvReportAdapter {
    fn write(&self, plan: &InvestmentPlan, output_path: &str) -> Result<(), FolioError> {
        let dir = Path::new(output_path);
        fs::create_dir_all(dir)?;

        write_serialized(
            &dir.join(SCORES_FILE),
            plan.scored.iter().enumerate().map(|(i, s)| ScoreRow {
                rank: i + 1,
                symbol: s.symbol(),
                asset_class: s.asset.asset_class.as_str(),
                quality_score: s.quality_score,
                risk_adjusted_score: s.risk_adjusted_score,
                diversification_score: s.diversification_score,
                liquidity_score: s.liquidity_score,
                liquidity_tier: s.liquidity_tier(),
            }),
        )?;
        write_serialized(&dir.join(PORTFOLIO_FILE), &plan.portfolio.holdings)?;
        write_serialized(&dir.join(SIMULATION_FILE), &plan.simulation.points)?;

        if let Some(backtest) = &plan.backtest {
            write_backtest(&dir.join(BACKTEST_FILE), backtest)?;
            write_serialized(&dir.join(BACKTEST_HOLDINGS_FILE), &backtest.holdings)?;
        }

        info!(dir = %dir.display(), "reports written");
        Ok(())
    }
}
