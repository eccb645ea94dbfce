//! Configuration validation.
//!
//! Validates every engine setting before a run starts.

use crate::domain::asset::LiquidityTier;
use crate::domain::constraints::RiskProfile;
use crate::domain::error::FolioError;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub fn validate_engine_config(config: &dyn ConfigPort) -> Result<(), FolioError> {
    validate_portfolio_config(config)?;
    validate_simulation_config(config)?;
    validate_backtest_config(config)?;
    validate_drift_config(config)?;
    Ok(())
}

pub fn validate_portfolio_config(config: &dyn ConfigPort) -> Result<(), FolioError> {
    validate_profile(config)?;
    validate_asset_counts(config)?;
    validate_allocation_bounds(config)?;
    validate_liquidity(config)?;
    validate_rates(config)?;
    validate_buckets(config)?;
    validate_benchmarks(config)?;
    Ok(())
}

fn validate_profile(config: &dyn ConfigPort) -> Result<(), FolioError> {
    match config.get_string("portfolio", "profile") {
        None => Err(FolioError::ConfigMissing {
            section: "portfolio".to_string(),
            key: "profile".to_string(),
        }),
        Some(s) => s
            .parse::<RiskProfile>()
            .map(|_| ())
            .map_err(|e| FolioError::invalid("portfolio", "profile", e)),
    }
}

fn validate_asset_counts(config: &dyn ConfigPort) -> Result<(), FolioError> {
    let min = config.get_int("portfolio", "min_assets", 5);
    let max = config.get_int("portfolio", "max_assets", 12);
    if min < 0 {
        return Err(FolioError::invalid(
            "portfolio",
            "min_assets",
            "min_assets must be non-negative",
        ));
    }
    if max < 1 {
        return Err(FolioError::invalid(
            "portfolio",
            "max_assets",
            "max_assets must be at least 1",
        ));
    }
    if min > max {
        return Err(FolioError::invalid(
            "portfolio",
            "min_assets",
            "min_assets must not exceed max_assets",
        ));
    }
    Ok(())
}

fn validate_allocation_bounds(config: &dyn ConfigPort) -> Result<(), FolioError> {
    let min = config.get_double("portfolio", "min_allocation", 3.0);
    let max = config.get_double("portfolio", "max_allocation", 15.0);
    if !(0.0..=100.0).contains(&min) {
        return Err(FolioError::invalid(
            "portfolio",
            "min_allocation",
            "min_allocation must be between 0 and 100",
        ));
    }
    if max <= 0.0 || max > 100.0 {
        return Err(FolioError::invalid(
            "portfolio",
            "max_allocation",
            "max_allocation must be in (0, 100]",
        ));
    }
    if min > max {
        return Err(FolioError::invalid(
            "portfolio",
            "min_allocation",
            "min_allocation must not exceed max_allocation",
        ));
    }
    let residual = config.get_double("portfolio", "residual_allocation", 1.0);
    if residual < 0.0 {
        return Err(FolioError::invalid(
            "portfolio",
            "residual_allocation",
            "residual_allocation must be non-negative",
        ));
    }
    Ok(())
}

fn validate_liquidity(config: &dyn ConfigPort) -> Result<(), FolioError> {
    if let Some(s) = config.get_string("portfolio", "min_liquidity") {
        s.parse::<LiquidityTier>()
            .map_err(|e| FolioError::invalid("portfolio", "min_liquidity", e))?;
    }
    let quality = config.get_double("portfolio", "min_quality", 0.0);
    if !(0.0..=100.0).contains(&quality) {
        return Err(FolioError::invalid(
            "portfolio",
            "min_quality",
            "min_quality must be between 0 and 100",
        ));
    }
    Ok(())
}

fn validate_rates(config: &dyn ConfigPort) -> Result<(), FolioError> {
    let rf = config.get_double("portfolio", "risk_free_rate", 2.0);
    if !(0.0..100.0).contains(&rf) {
        return Err(FolioError::invalid(
            "portfolio",
            "risk_free_rate",
            "risk_free_rate must be a percentage between 0 and 100",
        ));
    }
    let wins = config.get_int("portfolio", "required_benchmark_wins", 2);
    if wins < 0 {
        return Err(FolioError::invalid(
            "portfolio",
            "required_benchmark_wins",
            "required_benchmark_wins must be non-negative",
        ));
    }
    Ok(())
}

fn validate_buckets(config: &dyn ConfigPort) -> Result<(), FolioError> {
    let Some(raw) = config.get_string("portfolio", "buckets") else {
        return Ok(());
    };
    if raw.trim().is_empty() {
        return Ok(());
    }
    let entries = parse_weighted_list(&raw).map_err(|e| FolioError::invalid("portfolio", "buckets", e))?;
    for (name, _) in &entries {
        if !matches!(name.to_lowercase().as_str(), "equity" | "bond" | "stock") {
            return Err(FolioError::invalid(
                "portfolio",
                "buckets",
                format!("unknown bucket '{name}' (expected equity, bond or stock)"),
            ));
        }
    }
    let total: f64 = entries.iter().map(|(_, p)| p).sum();
    if (total - 100.0).abs() > 1e-6 {
        return Err(FolioError::invalid(
            "portfolio",
            "buckets",
            format!("bucket targets must sum to 100, got {total}"),
        ));
    }
    Ok(())
}

fn validate_benchmarks(config: &dyn ConfigPort) -> Result<(), FolioError> {
    if let Some(raw) = config.get_string("portfolio", "benchmarks") {
        if !raw.trim().is_empty() {
            parse_weighted_list(&raw).map_err(|e| FolioError::invalid("portfolio", "benchmarks", e))?;
        }
    }
    Ok(())
}

pub fn validate_simulation_config(config: &dyn ConfigPort) -> Result<(), FolioError> {
    if config.get_double("simulation", "initial_amount", 10_000.0) < 0.0 {
        return Err(FolioError::invalid(
            "simulation",
            "initial_amount",
            "initial_amount must be non-negative",
        ));
    }
    if config.get_double("simulation", "periodic_contribution", 0.0) < 0.0 {
        return Err(FolioError::invalid(
            "simulation",
            "periodic_contribution",
            "periodic_contribution must be non-negative",
        ));
    }
    if config.get_int("simulation", "horizon_periods", 12) < 1 {
        return Err(FolioError::invalid(
            "simulation",
            "horizon_periods",
            "horizon_periods must be at least 1",
        ));
    }
    if config.get_int("simulation", "periods_per_year", 12) < 1 {
        return Err(FolioError::invalid(
            "simulation",
            "periods_per_year",
            "periods_per_year must be at least 1",
        ));
    }
    if config.get_int("simulation", "trials", 5000) < 1 {
        return Err(FolioError::invalid(
            "simulation",
            "trials",
            "trials must be at least 1",
        ));
    }
    if let Some(seed) = config.get_string("simulation", "seed") {
        if !seed.trim().is_empty() && seed.trim().parse::<u64>().is_err() {
            return Err(FolioError::invalid(
                "simulation",
                "seed",
                "seed must be an unsigned integer",
            ));
        }
    }
    Ok(())
}

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), FolioError> {
    if let Some(date) = config.get_string("backtest", "as_of") {
        parse_date(&date, "as_of")?;
    }
    let from = config.get_string("backtest", "from_currency");
    let to = config.get_string("backtest", "to_currency");
    if from.is_some() != to.is_some() {
        return Err(FolioError::invalid(
            "backtest",
            "to_currency",
            "from_currency and to_currency must be set together",
        ));
    }
    if config.get_double("backtest", "fx_appreciation_pct", 0.0) <= -100.0 {
        return Err(FolioError::invalid(
            "backtest",
            "fx_appreciation_pct",
            "fx_appreciation_pct must be greater than -100",
        ));
    }
    Ok(())
}

pub fn validate_drift_config(config: &dyn ConfigPort) -> Result<(), FolioError> {
    let threshold = config.get_double("drift", "threshold", 5.0);
    if threshold <= 0.0 || threshold >= 100.0 {
        return Err(FolioError::invalid(
            "drift",
            "threshold",
            "threshold must be between 0 and 100",
        ));
    }
    Ok(())
}

pub fn parse_date(value: &str, field: &str) -> Result<NaiveDate, FolioError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| FolioError::ConfigInvalid {
        section: "backtest".to_string(),
        key: field.to_string(),
        reason: format!("invalid {} format, expected YYYY-MM-DD", field),
    })
}

/// Parse `name:percent, name:percent`.
pub fn parse_weighted_list(input: &str) -> Result<Vec<(String, f64)>, String> {
    input
        .split(',')
        .map(|token| {
            let (name, value) = token
                .split_once(':')
                .ok_or_else(|| format!("expected name:percent, got '{}'", token.trim()))?;
            let name = name.trim();
            if name.is_empty() {
                return Err("empty name".to_string());
            }
            let value: f64 = value
                .trim()
                .parse()
                .map_err(|_| format!("invalid percentage for '{name}'"))?;
            if !value.is_finite() || value < 0.0 {
                return Err(format!("percentage for '{name}' must be non-negative"));
            }
            Ok((name.to_string(), value))
        })
        .collect()
}
