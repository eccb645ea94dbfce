//! Portfolio-level expected return, volatility and Sharpe ratio.
//!
//! There is no covariance matrix. Volatility uses a constant average
//! pairwise correlation:
//! `var = (1 - rho) * sum((w*s)^2) + rho * (sum(w*s))^2`.

use super::portfolio::Holding;
use serde::Serialize;

pub const AVERAGE_CORRELATION: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct PortfolioMetrics {
    /// Annual, percent.
    pub expected_return: f64,
    /// Annual, percent.
    pub expected_volatility: f64,
    pub sharpe_ratio: f64,
}

impl PortfolioMetrics {
    pub fn compute(holdings: &[Holding], risk_free_rate: f64) -> Self {
        let total: f64 = holdings.iter().map(|h| h.weight.max(0.0)).sum();
        if holdings.is_empty() || total <= 0.0 {
            return PortfolioMetrics::default();
        }

        let fractions: Vec<f64> = holdings.iter().map(|h| h.weight.max(0.0) / total).collect();

        let expected_return: f64 = holdings
            .iter()
            .zip(&fractions)
            .map(|(h, w)| w * h.expected_return)
            .sum();

        let expected_volatility = combined_volatility(
            &fractions,
            &holdings.iter().map(|h| h.volatility).collect::<Vec<_>>(),
        );

        let sharpe_ratio = sharpe(expected_return, expected_volatility, risk_free_rate);

        PortfolioMetrics {
            expected_return,
            expected_volatility,
            sharpe_ratio,
        }
    }
}

/// Combine per-asset volatilities (percent) under weights that sum to 1.
pub fn combined_volatility(fractions: &[f64], volatilities: &[f64]) -> f64 {
    let scaled: Vec<f64> = fractions
        .iter()
        .zip(volatilities)
        .map(|(w, s)| w * s.max(0.0))
        .collect();
    let own: f64 = scaled.iter().map(|x| x * x).sum();
    let linear: f64 = scaled.iter().sum();
    let variance = (1.0 - AVERAGE_CORRELATION) * own + AVERAGE_CORRELATION * linear * linear;
    variance.max(0.0).sqrt()
}

pub fn sharpe(return_pct: f64, volatility_pct: f64, risk_free_rate: f64) -> f64 {
    if volatility_pct > 0.0 {
        (return_pct - risk_free_rate) / volatility_pct
    } else {
        0.0
    }
}
