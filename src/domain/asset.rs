//! Candidate asset records supplied by an external data source.
//!
//! All return, volatility, yield and cost figures are percentages
//! (`12.5` means 12.5%). Assets under management are in currency units
//! and average volume in units traded per day.

use crate::domain::error::FolioError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Broad classification used for diversification, bucketing and fallbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    GlobalEquity,
    RegionalEquity,
    SectorEquity,
    SingleStock,
    Bond,
    ShortTermBond,
    RealEstate,
    Commodity,
    Cash,
}

impl AssetClass {
    pub const ALL: [AssetClass; 9] = [
        AssetClass::GlobalEquity,
        AssetClass::RegionalEquity,
        AssetClass::SectorEquity,
        AssetClass::SingleStock,
        AssetClass::Bond,
        AssetClass::ShortTermBond,
        AssetClass::RealEstate,
        AssetClass::Commodity,
        AssetClass::Cash,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetClass::GlobalEquity => "global_equity",
            AssetClass::RegionalEquity => "regional_equity",
            AssetClass::SectorEquity => "sector_equity",
            AssetClass::SingleStock => "single_stock",
            AssetClass::Bond => "bond",
            AssetClass::ShortTermBond => "short_term_bond",
            AssetClass::RealEstate => "real_estate",
            AssetClass::Commodity => "commodity",
            AssetClass::Cash => "cash",
        }
    }

    pub fn is_equity(&self) -> bool {
        matches!(
            self,
            AssetClass::GlobalEquity
                | AssetClass::RegionalEquity
                | AssetClass::SectorEquity
                | AssetClass::SingleStock
        )
    }

    pub fn is_fixed_income(&self) -> bool {
        matches!(
            self,
            AssetClass::Bond | AssetClass::ShortTermBond | AssetClass::Cash
        )
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "global_equity" | "equity" | "world" => Ok(AssetClass::GlobalEquity),
            "regional_equity" | "region" => Ok(AssetClass::RegionalEquity),
            "sector_equity" | "sector" => Ok(AssetClass::SectorEquity),
            "single_stock" | "stock" => Ok(AssetClass::SingleStock),
            "bond" | "bonds" => Ok(AssetClass::Bond),
            "short_term_bond" | "short_bond" => Ok(AssetClass::ShortTermBond),
            "real_estate" | "reit" => Ok(AssetClass::RealEstate),
            "commodity" | "commodities" | "gold" => Ok(AssetClass::Commodity),
            "cash" | "money_market" => Ok(AssetClass::Cash),
            other => Err(format!("unknown asset class '{other}'")),
        }
    }
}

/// One figure per lookback horizon. Missing horizons are `0.0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HorizonSeries {
    pub m12: f64,
    pub m24: f64,
    pub m36: f64,
    pub y5: f64,
    pub y10: f64,
}

impl HorizonSeries {
    /// Longest horizon first.
    pub fn by_length(&self) -> [f64; 5] {
        [self.y10, self.y5, self.m36, self.m24, self.m12]
    }

    /// Longest horizon with a non-zero value, or `0.0` when nothing is known.
    pub fn longest_available(&self) -> f64 {
        self.by_length()
            .into_iter()
            .find(|v| *v != 0.0)
            .unwrap_or(0.0)
    }

    fn sanitized(self) -> Self {
        HorizonSeries {
            m12: finite_or_zero(self.m12),
            m24: finite_or_zero(self.m24),
            m36: finite_or_zero(self.m36),
            y5: finite_or_zero(self.y5),
            y10: finite_or_zero(self.y10),
        }
    }

    fn all_finite(&self) -> bool {
        self.by_length().iter().all(|v| v.is_finite())
    }
}

/// Immutable snapshot of a candidate security.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateAsset {
    pub symbol: String,
    pub name: String,
    pub asset_class: AssetClass,
    pub tags: Vec<String>,
    pub returns: HorizonSeries,
    pub volatility: HorizonSeries,
    pub sharpe_ratio: f64,
    pub dividend_yield: f64,
    pub expense_ratio: f64,
    pub aum: f64,
    pub avg_volume: f64,
    /// Largest peak-to-trough decline, as a negative percentage.
    pub max_drawdown: Option<f64>,
}

impl CandidateAsset {
    /// A candidate with every metric missing.
    pub fn new(symbol: &str, asset_class: AssetClass) -> Self {
        CandidateAsset {
            symbol: symbol.to_string(),
            name: symbol.to_string(),
            asset_class,
            tags: Vec::new(),
            returns: HorizonSeries::default(),
            volatility: HorizonSeries::default(),
            sharpe_ratio: 0.0,
            dividend_yield: 0.0,
            expense_ratio: 0.0,
            aum: 0.0,
            avg_volume: 0.0,
            max_drawdown: None,
        }
    }

    /// Long-run annual return estimate (percent).
    pub fn expected_return(&self) -> f64 {
        finite_or_zero(self.returns.longest_available())
    }

    /// Long-run annual volatility estimate (percent).
    pub fn expected_volatility(&self) -> f64 {
        finite_or_zero(self.volatility.longest_available())
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    /// Copy with every non-finite number replaced by zero.
    pub fn sanitized(&self) -> CandidateAsset {
        CandidateAsset {
            returns: self.returns.sanitized(),
            volatility: self.volatility.sanitized(),
            sharpe_ratio: finite_or_zero(self.sharpe_ratio),
            dividend_yield: finite_or_zero(self.dividend_yield),
            expense_ratio: finite_or_zero(self.expense_ratio),
            aum: finite_or_zero(self.aum),
            avg_volume: finite_or_zero(self.avg_volume),
            max_drawdown: self.max_drawdown.map(finite_or_zero),
            ..self.clone()
        }
    }

    /// Boundary check for records arriving from outside the engine.
    pub fn validate(&self) -> Result<(), FolioError> {
        if self.symbol.trim().is_empty() {
            return Err(FolioError::InvalidCandidate {
                symbol: self.name.clone(),
                reason: "empty symbol".into(),
            });
        }
        let scalars = [
            self.sharpe_ratio,
            self.dividend_yield,
            self.expense_ratio,
            self.aum,
            self.avg_volume,
            self.max_drawdown.unwrap_or(0.0),
        ];
        if !self.returns.all_finite()
            || !self.volatility.all_finite()
            || scalars.iter().any(|v| !v.is_finite())
        {
            return Err(FolioError::InvalidCandidate {
                symbol: self.symbol.clone(),
                reason: "non-finite metric".into(),
            });
        }
        if self.aum < 0.0 || self.avg_volume < 0.0 {
            return Err(FolioError::InvalidCandidate {
                symbol: self.symbol.clone(),
                reason: "aum and volume must be non-negative".into(),
            });
        }
        Ok(())
    }
}

/// Validate a whole candidate pool: every record plus symbol uniqueness.
pub fn validate_candidates(candidates: &[CandidateAsset]) -> Result<(), FolioError> {
    let mut seen = HashSet::new();
    for candidate in candidates {
        candidate.validate()?;
        let key = candidate.symbol.trim().to_uppercase();
        if !seen.insert(key.clone()) {
            return Err(FolioError::DuplicateSymbol(key));
        }
    }
    Ok(())
}

/// Coarse liquidity bucket used as a selection filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiquidityTier {
    Low,
    Medium,
    High,
}

impl LiquidityTier {
    pub fn from_score(score: f64) -> Self {
        if score >= 70.0 {
            LiquidityTier::High
        } else if score >= 40.0 {
            LiquidityTier::Medium
        } else {
            LiquidityTier::Low
        }
    }
}

impl FromStr for LiquidityTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(LiquidityTier::Low),
            "medium" => Ok(LiquidityTier::Medium),
            "high" => Ok(LiquidityTier::High),
            other => Err(format!("unknown liquidity tier '{other}'")),
        }
    }
}

pub(crate) fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}
