//! CSV file data adapter.
//!
//! Reads a data directory laid out as:
//!
//! - `candidates.csv`: one row per candidate asset (required)
//! - `history.csv`: accumulated historical returns per symbol and horizon (optional)
//! - `benchmarks.csv`: ten-year benchmark figures (optional)
//! - `<name>.csv`: allocation snapshots with `symbol,percent` or `symbol,value`

use crate::domain::asset::{validate_candidates, AssetClass, CandidateAsset, HorizonSeries};
use crate::domain::backtest::{BenchmarkKind, BenchmarkSeries, BACKTEST_YEARS};
use crate::domain::drift::{allocations_from_values, AllocationSnapshot};
use crate::domain::error::FolioError;
use crate::ports::data_port::DataPort;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const CANDIDATES_FILE: &str = "candidates.csv";
pub const HISTORY_FILE: &str = "history.csv";
pub const BENCHMARKS_FILE: &str = "benchmarks.csv";

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, file: &str) -> PathBuf {
        self.base_path.join(file)
    }
}

#[derive(Debug, Deserialize)]
struct CandidateRow {
    symbol: String,
    #[serde(default)]
    name: Option<String>,
    asset_class: String,
    #[serde(default)]
    tags: Option<String>,
    #[serde(default)]
    return_12m: Option<f64>,
    #[serde(default)]
    return_24m: Option<f64>,
    #[serde(default)]
    return_36m: Option<f64>,
    #[serde(default)]
    return_5y: Option<f64>,
    #[serde(default)]
    return_10y: Option<f64>,
    #[serde(default)]
    volatility_12m: Option<f64>,
    #[serde(default)]
    volatility_24m: Option<f64>,
    #[serde(default)]
    volatility_36m: Option<f64>,
    #[serde(default)]
    volatility_5y: Option<f64>,
    #[serde(default)]
    volatility_10y: Option<f64>,
    #[serde(default)]
    sharpe_ratio: Option<f64>,
    #[serde(default)]
    dividend_yield: Option<f64>,
    #[serde(default)]
    expense_ratio: Option<f64>,
    #[serde(default)]
    aum: Option<f64>,
    #[serde(default)]
    avg_volume: Option<f64>,
    #[serde(default)]
    max_drawdown: Option<f64>,
}

impl CandidateRow {
    fn into_candidate(self) -> Result<CandidateAsset, FolioError> {
        let symbol = self.symbol.trim().to_string();
        let asset_class: AssetClass =
            self.asset_class
                .parse()
                .map_err(|reason| FolioError::InvalidCandidate {
                    symbol: symbol.clone(),
                    reason,
                })?;
        let tags = self
            .tags
            .map(|t| {
                t.split(';')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(CandidateAsset {
            name: self
                .name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| symbol.clone()),
            symbol,
            asset_class,
            tags,
            returns: HorizonSeries {
                m12: self.return_12m.unwrap_or(0.0),
                m24: self.return_24m.unwrap_or(0.0),
                m36: self.return_36m.unwrap_or(0.0),
                y5: self.return_5y.unwrap_or(0.0),
                y10: self.return_10y.unwrap_or(0.0),
            },
            volatility: HorizonSeries {
                m12: self.volatility_12m.unwrap_or(0.0),
                m24: self.volatility_24m.unwrap_or(0.0),
                m36: self.volatility_36m.unwrap_or(0.0),
                y5: self.volatility_5y.unwrap_or(0.0),
                y10: self.volatility_10y.unwrap_or(0.0),
            },
            sharpe_ratio: self.sharpe_ratio.unwrap_or(0.0),
            dividend_yield: self.dividend_yield.unwrap_or(0.0),
            expense_ratio: self.expense_ratio.unwrap_or(0.0),
            aum: self.aum.unwrap_or(0.0),
            avg_volume: self.avg_volume.unwrap_or(0.0),
            max_drawdown: self.max_drawdown,
        })
    }
}

#[derive(Debug, Deserialize)]
struct HistoryRow {
    symbol: String,
    #[serde(default)]
    return_12m: Option<f64>,
    #[serde(default)]
    return_24m: Option<f64>,
    #[serde(default)]
    return_36m: Option<f64>,
    #[serde(default)]
    return_5y: Option<f64>,
    #[serde(default)]
    return_10y: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct BenchmarkRow {
    name: String,
    kind: String,
    accumulated_return: f64,
    /// Accumulated return at the end of each year, `;` separated.
    #[serde(default)]
    yearly: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AllocationRow {
    symbol: String,
    #[serde(default)]
    percent: Option<f64>,
    #[serde(default)]
    value: Option<f64>,
}

fn read_rows<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Vec<T>, FolioError> {
    let content = fs::read_to_string(path).map_err(|e| FolioError::Data {
        reason: format!("failed to read {}: {}", path.display(), e),
    })?;
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());
    rdr.deserialize()
        .enumerate()
        .map(|(i, row)| {
            row.map_err(|e| FolioError::Data {
                reason: format!("{} row {}: {}", path.display(), i + 1, e),
            })
        })
        .collect()
}

fn parse_yearly(name: &str, raw: Option<String>) -> Result<Vec<f64>, FolioError> {
    let Some(raw) = raw.filter(|r| !r.trim().is_empty()) else {
        return Ok(Vec::new());
    };
    let yearly = raw
        .split(';')
        .map(|v| {
            v.trim().parse::<f64>().map_err(|_| FolioError::Data {
                reason: format!("benchmark {name}: invalid yearly value '{}'", v.trim()),
            })
        })
        .collect::<Result<Vec<f64>, _>>()?;
    if yearly.len() != BACKTEST_YEARS {
        return Err(FolioError::Data {
            reason: format!(
                "benchmark {name}: yearly series has {} values, expected {BACKTEST_YEARS}",
                yearly.len()
            ),
        });
    }
    Ok(yearly)
}

/// Read an allocation file. Rows carry either a `percent` or a market `value`.
pub fn read_allocations(path: &Path) -> Result<Vec<AllocationSnapshot>, FolioError> {
    let rows: Vec<AllocationRow> = read_rows(path)?;
    if rows.iter().all(|r| r.percent.is_some()) {
        return Ok(rows
            .into_iter()
            .filter_map(|r| r.percent.map(|p| AllocationSnapshot::new(r.symbol.trim(), p)))
            .collect());
    }
    if rows.iter().all(|r| r.value.is_some()) {
        let values: Vec<(String, f64)> = rows
            .into_iter()
            .filter_map(|r| r.value.map(|v| (r.symbol.trim().to_string(), v)))
            .collect();
        return Ok(allocations_from_values(&values));
    }
    Err(FolioError::Data {
        reason: format!(
            "{}: every row needs a percent, or every row needs a value",
            path.display()
        ),
    })
}

impl DataPort for CsvAdapter {
    fn fetch_candidates(&self) -> Result<Vec<CandidateAsset>, FolioError> {
        let path = self.csv_path(CANDIDATES_FILE);
        let rows: Vec<CandidateRow> = read_rows(&path)?;
        let candidates = rows
            .into_iter()
            .map(CandidateRow::into_candidate)
            .collect::<Result<Vec<_>, _>>()?;
        validate_candidates(&candidates)?;
        debug!(count = candidates.len(), path = %path.display(), "loaded candidates");
        Ok(candidates)
    }

    fn fetch_history(&self) -> Result<HashMap<String, HorizonSeries>, FolioError> {
        let path = self.csv_path(HISTORY_FILE);
        if !path.exists() {
            return Ok(HashMap::new());
        }
        let rows: Vec<HistoryRow> = read_rows(&path)?;
        Ok(rows
            .into_iter()
            .map(|r| {
                (
                    r.symbol.trim().to_string(),
                    HorizonSeries {
                        m12: r.return_12m.unwrap_or(0.0),
                        m24: r.return_24m.unwrap_or(0.0),
                        m36: r.return_36m.unwrap_or(0.0),
                        y5: r.return_5y.unwrap_or(0.0),
                        y10: r.return_10y.unwrap_or(0.0),
                    },
                )
            })
            .collect())
    }

    fn fetch_benchmarks(&self) -> Result<Vec<BenchmarkSeries>, FolioError> {
        let path = self.csv_path(BENCHMARKS_FILE);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let rows: Vec<BenchmarkRow> = read_rows(&path)?;
        rows.into_iter()
            .map(|r| {
                let kind: BenchmarkKind = r
                    .kind
                    .parse()
                    .map_err(|reason| FolioError::Data { reason })?;
                let yearly = parse_yearly(&r.name, r.yearly)?;
                Ok(BenchmarkSeries {
                    name: r.name,
                    kind,
                    accumulated_return: r.accumulated_return,
                    yearly,
                })
            })
            .collect()
    }

    fn fetch_allocations(&self, name: &str) -> Result<Vec<AllocationSnapshot>, FolioError> {
        read_allocations(&self.csv_path(&format!("{name}.csv")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const CANDIDATES: &str = "\
symbol,name,asset_class,tags,return_12m,return_5y,volatility_12m,volatility_5y,sharpe_ratio,dividend_yield,expense_ratio,aum,avg_volume,max_drawdown
VWCE,Vanguard All-World,global_equity,broad;world,12.5,9.8,14.0,15.5,0.9,1.6,0.22,12000000000,450000,-33.5
AGGH,Global Aggregate Bond,bond,,1.2,0.8,6.0,5.5,0.1,0,0.10,4000000000,90000,
";

    fn setup(files: &[(&str, &str)]) -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();
        for (name, content) in files {
            fs::write(path.join(name), content).unwrap();
        }
        (dir, path)
    }

    #[test]
    fn fetch_candidates_parses_rows() {
        let (_dir, path) = setup(&[(CANDIDATES_FILE, CANDIDATES)]);
        let candidates = CsvAdapter::new(path).fetch_candidates().unwrap();

        assert_eq!(candidates.len(), 2);
        let vwce = &candidates[0];
        assert_eq!(vwce.symbol, "VWCE");
        assert_eq!(vwce.asset_class, AssetClass::GlobalEquity);
        assert_eq!(vwce.tags, vec!["broad".to_string(), "world".to_string()]);
        assert_eq!(vwce.returns.m12, 12.5);
        assert_eq!(vwce.returns.y5, 9.8);
        assert_eq!(vwce.returns.y10, 0.0);
        assert_eq!(vwce.expected_return(), 9.8);
        assert_eq!(vwce.max_drawdown, Some(-33.5));

        let aggh = &candidates[1];
        assert!(aggh.tags.is_empty());
        assert_eq!(aggh.max_drawdown, None);
        assert_eq!(aggh.dividend_yield, 0.0);
    }

    #[test]
    fn missing_name_falls_back_to_symbol() {
        let (_dir, path) = setup(&[(CANDIDATES_FILE, "symbol,asset_class\nXYZ,single_stock\n")]);
        let candidates = CsvAdapter::new(path).fetch_candidates().unwrap();
        assert_eq!(candidates[0].name, "XYZ");
        assert_eq!(candidates[0].aum, 0.0);
    }

    #[test]
    fn duplicate_symbols_rejected() {
        let (_dir, path) = setup(&[(
            CANDIDATES_FILE,
            "symbol,asset_class\nVWCE,global_equity\nvwce,global_equity\n",
        )]);
        let err = CsvAdapter::new(path).fetch_candidates().unwrap_err();
        assert!(matches!(err, FolioError::DuplicateSymbol(_)));
    }

    #[test]
    fn unknown_asset_class_rejected() {
        let (_dir, path) = setup(&[(CANDIDATES_FILE, "symbol,asset_class\nBTC,crypto\n")]);
        let err = CsvAdapter::new(path).fetch_candidates().unwrap_err();
        assert!(matches!(err, FolioError::InvalidCandidate { ref symbol, .. } if symbol == "BTC"));
    }

    #[test]
    fn malformed_number_reports_row() {
        let (_dir, path) = setup(&[(
            CANDIDATES_FILE,
            "symbol,asset_class,aum\nA,bond,lots\n",
        )]);
        let err = CsvAdapter::new(path).fetch_candidates().unwrap_err();
        assert!(err.to_string().contains("row 1"));
    }

    #[test]
    fn missing_candidates_file_is_an_error() {
        let (_dir, path) = setup(&[]);
        let err = CsvAdapter::new(path).fetch_candidates().unwrap_err();
        assert!(matches!(err, FolioError::Data { .. }));
    }

    #[test]
    fn optional_files_default_to_empty() {
        let (_dir, path) = setup(&[]);
        let adapter = CsvAdapter::new(path);
        assert!(adapter.fetch_history().unwrap().is_empty());
        assert!(adapter.fetch_benchmarks().unwrap().is_empty());
    }

    #[test]
    fn fetch_history_keys_by_symbol() {
        let (_dir, path) = setup(&[(
            HISTORY_FILE,
            "symbol,return_5y,return_10y\nVWCE,9.5,10.1\nAGGH,1.0,\n",
        )]);
        let history = CsvAdapter::new(path).fetch_history().unwrap();
        assert_eq!(history["VWCE"].y10, 10.1);
        assert_eq!(history["AGGH"].y10, 0.0);
        assert_eq!(history["AGGH"].y5, 1.0);
    }

    #[test]
    fn fetch_benchmarks_with_yearly_series() {
        let (_dir, path) = setup(&[(
            BENCHMARKS_FILE,
            "name,kind,accumulated_return,yearly\n\
             MSCI World,equity,150,10;21;33;46;61;77;95;114;135;150\n\
             Global Agg,bond,20,\n",
        )]);
        let benchmarks = CsvAdapter::new(path).fetch_benchmarks().unwrap();
        assert_eq!(benchmarks.len(), 2);
        assert_eq!(benchmarks[0].kind, BenchmarkKind::EquityIndex);
        assert_eq!(benchmarks[0].yearly.len(), 10);
        assert_eq!(benchmarks[0].yearly[9], 150.0);
        assert_eq!(benchmarks[1].kind, BenchmarkKind::BondIndex);
        assert!(benchmarks[1].yearly.is_empty());
    }

    #[test]
    fn yearly_series_of_wrong_length_rejected() {
        for yearly in ["5;11;17;24;31;39;47;56;66", "5;11;17;24;31;39;47;56;66;77;88"] {
            let content = format!("name,kind,accumulated_return,yearly\nMSCI World,equity,77,{yearly}\n");
            let (_dir, path) = setup(&[(BENCHMARKS_FILE, content.as_str())]);
            let err = CsvAdapter::new(path).fetch_benchmarks().unwrap_err();
            assert!(matches!(err, FolioError::Data { ref reason } if reason.contains("expected 10")));
        }
    }

    #[test]
    fn bad_benchmark_kind_rejected() {
        let (_dir, path) = setup(&[(BENCHMARKS_FILE, "name,kind,accumulated_return\nX,gold,5\n")]);
        assert!(CsvAdapter::new(path).fetch_benchmarks().is_err());
    }

    #[test]
    fn allocations_from_percentages() {
        let (_dir, path) = setup(&[("current.csv", "symbol,percent\nA,55\nB,45\n")]);
        let snaps = CsvAdapter::new(path).fetch_allocations("current").unwrap();
        assert_eq!(snaps, vec![AllocationSnapshot::new("A", 55.0), AllocationSnapshot::new("B", 45.0)]);
    }

    #[test]
    fn allocations_from_market_values() {
        let (_dir, path) = setup(&[("live.csv", "symbol,value\nA,3000\nB,1000\n")]);
        let snaps = read_allocations(&path.join("live.csv")).unwrap();
        assert_eq!(snaps[0].percent, 75.0);
        assert_eq!(snaps[1].percent, 25.0);
    }

    #[test]
    fn mixed_allocation_rows_rejected() {
        let (_dir, path) = setup(&[("mixed.csv", "symbol,percent,value\nA,50,\nB,,100\n")]);
        assert!(read_allocations(&path.join("mixed.csv")).is_err());
    }
}
