//! Risk profiles and allocation constraints.

use crate::domain::asset::{AssetClass, LiquidityTier};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskProfile {
    Conservative,
    Moderate,
    Aggressive,
}

impl RiskProfile {
    /// Coefficient applied to volatility when weighting selected assets.
    pub fn risk_aversion(&self) -> f64 {
        match self {
            RiskProfile::Conservative => 3.0,
            RiskProfile::Moderate => 2.0,
            RiskProfile::Aggressive => 1.0,
        }
    }

    /// Per-fund weight cap for ETF buckets.
    pub fn etf_max_allocation(&self) -> f64 {
        match self {
            RiskProfile::Conservative | RiskProfile::Moderate => 15.0,
            RiskProfile::Aggressive => 25.0,
        }
    }
}

impl fmt::Display for RiskProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskProfile::Conservative => "conservative",
            RiskProfile::Moderate => "moderate",
            RiskProfile::Aggressive => "aggressive",
        };
        f.write_str(s)
    }
}

impl FromStr for RiskProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "conservative" => Ok(RiskProfile::Conservative),
            "moderate" => Ok(RiskProfile::Moderate),
            "aggressive" => Ok(RiskProfile::Aggressive),
            other => Err(format!("unknown risk profile '{other}'")),
        }
    }
}

/// A sub-allocation with its own target percentage and weight bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct Bucket {
    pub name: String,
    pub classes: Vec<AssetClass>,
    pub target_percent: f64,
    pub max_assets: Option<usize>,
    pub min_allocation: f64,
    pub max_allocation: f64,
}

impl Bucket {
    pub fn equity_etfs(target_percent: f64, profile: RiskProfile) -> Self {
        Bucket {
            name: "equity".into(),
            classes: vec![
                AssetClass::GlobalEquity,
                AssetClass::RegionalEquity,
                AssetClass::SectorEquity,
                AssetClass::RealEstate,
                AssetClass::Commodity,
            ],
            target_percent,
            max_assets: None,
            min_allocation: 3.0,
            max_allocation: profile.etf_max_allocation(),
        }
    }

    pub fn bond_etfs(target_percent: f64, profile: RiskProfile) -> Self {
        Bucket {
            name: "bond".into(),
            classes: vec![AssetClass::Bond, AssetClass::ShortTermBond, AssetClass::Cash],
            target_percent,
            max_assets: None,
            min_allocation: 3.0,
            max_allocation: profile.etf_max_allocation(),
        }
    }

    pub fn stocks(target_percent: f64) -> Self {
        Bucket {
            name: "stock".into(),
            classes: vec![AssetClass::SingleStock],
            target_percent,
            max_assets: None,
            min_allocation: 2.0,
            max_allocation: 4.0,
        }
    }

    /// Build a named bucket as it appears in configuration.
    pub fn named(name: &str, target_percent: f64, profile: RiskProfile) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "equity" => Some(Bucket::equity_etfs(target_percent, profile)),
            "bond" => Some(Bucket::bond_etfs(target_percent, profile)),
            "stock" => Some(Bucket::stocks(target_percent)),
            _ => None,
        }
    }

    pub fn accepts(&self, class: AssetClass) -> bool {
        self.classes.contains(&class)
    }
}

/// A named return hurdle the finished portfolio is compared against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkTarget {
    pub name: String,
    pub annual_return: f64,
}

impl BenchmarkTarget {
    pub fn new(name: &str, annual_return: f64) -> Self {
        BenchmarkTarget {
            name: name.to_string(),
            annual_return,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassLimit {
    pub class: AssetClass,
    pub min_percent: f64,
    pub max_percent: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Constraints {
    pub profile: RiskProfile,
    /// Target asset count; the portfolio is topped up toward this.
    pub min_assets: usize,
    pub max_assets: usize,
    /// Per-asset bounds used when no buckets are configured.
    pub min_allocation: f64,
    pub max_allocation: f64,
    /// Weight handed to top-up assets before the final renormalization.
    pub residual_allocation: f64,
    pub class_limits: Vec<ClassLimit>,
    pub min_liquidity: LiquidityTier,
    pub min_quality: f64,
    pub buckets: Vec<Bucket>,
    pub benchmark_targets: Vec<BenchmarkTarget>,
    pub required_benchmark_wins: usize,
    pub min_sharpe: f64,
    pub risk_free_rate: f64,
}

impl Constraints {
    pub fn for_profile(profile: RiskProfile) -> Self {
        Constraints {
            profile,
            min_assets: 5,
            max_assets: 12,
            min_allocation: 3.0,
            max_allocation: profile.etf_max_allocation(),
            residual_allocation: 1.0,
            class_limits: Vec::new(),
            min_liquidity: LiquidityTier::Low,
            min_quality: 0.0,
            buckets: Vec::new(),
            benchmark_targets: vec![
                BenchmarkTarget::new("global_equity", 8.0),
                BenchmarkTarget::new("global_bond", 3.0),
                BenchmarkTarget::new("local_index", 6.0),
            ],
            required_benchmark_wins: 2,
            min_sharpe: 0.5,
            risk_free_rate: 2.0,
        }
    }

    pub fn risk_aversion(&self) -> f64 {
        self.profile.risk_aversion()
    }

    pub fn class_limit(&self, class: AssetClass) -> Option<&ClassLimit> {
        self.class_limits.iter().find(|l| l.class == class)
    }
}

impl Default for Constraints {
    fn default() -> Self {
        Constraints::for_profile(RiskProfile::Moderate)
    }
}
