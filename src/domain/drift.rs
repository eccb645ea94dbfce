//! Allocation drift against a target, and the trades that correct it.

use serde::{Deserialize, Serialize};
use std::fmt;

const THRESHOLD_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationSnapshot {
    pub symbol: String,
    /// Percent of the portfolio.
    pub percent: f64,
}

impl AllocationSnapshot {
    pub fn new(symbol: &str, percent: f64) -> Self {
        AllocationSnapshot {
            symbol: symbol.to_string(),
            percent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RebalanceKind {
    Buy,
    Sell,
    Hold,
}

impl fmt::Display for RebalanceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RebalanceKind::Buy => "BUY",
            RebalanceKind::Sell => "SELL",
            RebalanceKind::Hold => "HOLD",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RebalanceAction {
    pub symbol: String,
    pub current_weight: f64,
    pub target_weight: f64,
    /// `current - target`, percentage points.
    pub deviation: f64,
    /// Deviation relative to the target weight, percent.
    pub deviation_percent: f64,
    pub action: RebalanceKind,
    /// 1 is the largest absolute deviation.
    pub priority: usize,
}

impl RebalanceAction {
    /// Currency amount to trade for a portfolio worth `total_value`.
    pub fn trade_amount(&self, total_value: f64) -> f64 {
        self.deviation.abs() / 100.0 * total_value
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriftReport {
    /// Every asset, with HOLD rows for those within the threshold.
    pub rows: Vec<RebalanceAction>,
    pub max_deviation: f64,
    pub needs_rebalance: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriftMonitor {
    pub threshold: f64,
}

impl Default for DriftMonitor {
    fn default() -> Self {
        DriftMonitor { threshold: 5.0 }
    }
}

impl DriftMonitor {
    pub fn new(threshold: f64) -> Self {
        DriftMonitor { threshold }
    }

    /// Actions for assets whose absolute deviation reaches the threshold,
    /// ordered by priority.
    pub fn check_drift(
        &self,
        current: &[AllocationSnapshot],
        target: &[AllocationSnapshot],
    ) -> Vec<RebalanceAction> {
        self.report(current, target)
            .rows
            .into_iter()
            .filter(|r| r.action != RebalanceKind::Hold)
            .collect()
    }

    pub fn report(&self, current: &[AllocationSnapshot], target: &[AllocationSnapshot]) -> DriftReport {
        let mut rows: Vec<RebalanceAction> = union_symbols(current, target)
            .into_iter()
            .map(|symbol| {
                let current_weight = lookup(current, &symbol);
                let target_weight = lookup(target, &symbol);
                let deviation = current_weight - target_weight;
                let action = if deviation.abs() + THRESHOLD_EPSILON < self.threshold {
                    RebalanceKind::Hold
                } else if deviation > 0.0 {
                    RebalanceKind::Sell
                } else {
                    RebalanceKind::Buy
                };
                RebalanceAction {
                    symbol,
                    current_weight,
                    target_weight,
                    deviation,
                    deviation_percent: relative_deviation(deviation, target_weight),
                    action,
                    priority: 0,
                }
            })
            .collect();

        // Stable sort keeps input order between equal deviations.
        rows.sort_by(|a, b| b.deviation.abs().total_cmp(&a.deviation.abs()));
        let mut next = 1;
        for row in rows.iter_mut().filter(|r| r.action != RebalanceKind::Hold) {
            row.priority = next;
            next += 1;
        }

        let max_deviation = rows.first().map_or(0.0, |r| r.deviation.abs());
        let needs_rebalance = rows.iter().any(|r| r.action != RebalanceKind::Hold);
        DriftReport {
            rows,
            max_deviation,
            needs_rebalance,
        }
    }
}

/// Convert live market values into percentages of their total.
pub fn allocations_from_values(values: &[(String, f64)]) -> Vec<AllocationSnapshot> {
    let total: f64 = values.iter().map(|(_, v)| v.max(0.0)).sum();
    values
        .iter()
        .map(|(symbol, v)| AllocationSnapshot {
            symbol: symbol.clone(),
            percent: if total > 0.0 { v.max(0.0) / total * 100.0 } else { 0.0 },
        })
        .collect()
}

/// Target symbols first, then anything only held currently.
fn union_symbols(current: &[AllocationSnapshot], target: &[AllocationSnapshot]) -> Vec<String> {
    let mut symbols: Vec<String> = Vec::new();
    for s in target.iter().chain(current) {
        if !symbols.contains(&s.symbol) {
            symbols.push(s.symbol.clone());
        }
    }
    symbols
}

fn lookup(snapshots: &[AllocationSnapshot], symbol: &str) -> f64 {
    snapshots
        .iter()
        .filter(|s| s.symbol == symbol)
        .map(|s| s.percent)
        .sum()
}

fn relative_deviation(deviation: f64, target: f64) -> f64 {
    if target > 0.0 {
        deviation / target * 100.0
    } else if deviation > 0.0 {
        100.0
    } else {
        0.0
    }
}
