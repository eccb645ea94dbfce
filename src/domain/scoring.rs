//! Asset scoring: bounded quality score plus ranking scores.
//!
//! Every function here is pure. Missing metrics are zero and simply earn no
//! points, so a candidate with no data still gets a (low) score.

use crate::domain::asset::{AssetClass, CandidateAsset, LiquidityTier};

const BILLION: f64 = 1_000_000_000.0;
const MILLION: f64 = 1_000_000.0;

/// Candidate plus derived scores. Recomputed on every scoring call.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredAsset {
    pub asset: CandidateAsset,
    /// Clamped to 0-100.
    pub quality_score: f64,
    /// Unbounded, higher is better. Ranking only.
    pub risk_adjusted_score: f64,
    /// 0-100, broad-market exposure scores high.
    pub diversification_score: f64,
    /// 0-100, AUM and volume weighted.
    pub liquidity_score: f64,
}

impl ScoredAsset {
    pub fn symbol(&self) -> &str {
        &self.asset.symbol
    }

    pub fn liquidity_tier(&self) -> LiquidityTier {
        LiquidityTier::from_score(self.liquidity_score)
    }
}

/// Breakdown of the quality score, useful for reports and tests.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct QualityBreakdown {
    pub sharpe_points: f64,
    pub return_points: f64,
    pub volatility_points: f64,
    pub aum_points: f64,
    pub dividend_points: f64,
    pub expense_penalty: f64,
    pub drawdown_penalty: f64,
    pub consistency_bonus: f64,
}

impl QualityBreakdown {
    pub fn total(&self) -> f64 {
        let raw = self.sharpe_points
            + self.return_points
            + self.volatility_points
            + self.aum_points
            + self.dividend_points
            + self.consistency_bonus
            - self.expense_penalty
            - self.drawdown_penalty;
        raw.clamp(0.0, 100.0)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AssetScorer;

impl AssetScorer {
    pub fn new() -> Self {
        AssetScorer
    }

    pub fn score(&self, candidate: &CandidateAsset) -> ScoredAsset {
        let asset = candidate.sanitized();
        let quality_score = quality_breakdown(&asset).total();
        let risk_adjusted_score = risk_adjusted_score(&asset);
        let diversification_score = diversification_score(&asset);
        let liquidity_score = liquidity_score(&asset);
        ScoredAsset {
            asset,
            quality_score,
            risk_adjusted_score,
            diversification_score,
            liquidity_score,
        }
    }

    /// Score every candidate, preserving input order.
    pub fn score_all(&self, candidates: &[CandidateAsset]) -> Vec<ScoredAsset> {
        candidates.iter().map(|c| self.score(c)).collect()
    }

    /// Score and sort by risk-adjusted score, best first. Ties keep input order.
    pub fn rank(&self, candidates: &[CandidateAsset]) -> Vec<ScoredAsset> {
        let mut scored = self.score_all(candidates);
        scored.sort_by(|a, b| b.risk_adjusted_score.total_cmp(&a.risk_adjusted_score));
        scored
    }
}

pub fn quality_breakdown(asset: &CandidateAsset) -> QualityBreakdown {
    QualityBreakdown {
        sharpe_points: sharpe_points(asset.sharpe_ratio),
        return_points: return_points(asset.returns.m12),
        volatility_points: volatility_points(asset.volatility.m12),
        aum_points: aum_points(asset.aum),
        dividend_points: dividend_points(asset.dividend_yield),
        expense_penalty: expense_penalty(asset.expense_ratio),
        drawdown_penalty: drawdown_penalty(asset.max_drawdown.unwrap_or(0.0)),
        consistency_bonus: consistency_bonus(asset),
    }
}

/// Sharpe band, 0-30 points.
fn sharpe_points(sharpe: f64) -> f64 {
    match sharpe {
        s if s > 1.5 => 30.0,
        s if s > 1.0 => 24.0,
        s if s > 0.75 => 18.0,
        s if s > 0.5 => 12.0,
        s if s > 0.25 => 6.0,
        s if s > 0.0 => 3.0,
        _ => 0.0,
    }
}

/// 12-month return band, 0-25 points.
fn return_points(return_pct: f64) -> f64 {
    match return_pct {
        r if r > 30.0 => 25.0,
        r if r > 20.0 => 20.0,
        r if r > 15.0 => 16.0,
        r if r > 10.0 => 12.0,
        r if r > 5.0 => 8.0,
        r if r > 0.0 => 4.0,
        _ => 0.0,
    }
}

/// Inverse volatility band, 0-20 points. Zero volatility means unknown.
fn volatility_points(vol_pct: f64) -> f64 {
    match vol_pct {
        v if v <= 0.0 => 0.0,
        v if v <= 6.0 => 20.0,
        v if v <= 10.0 => 16.0,
        v if v <= 15.0 => 12.0,
        v if v <= 20.0 => 8.0,
        v if v <= 30.0 => 4.0,
        v if v < 40.0 => 2.0,
        _ => 0.0,
    }
}

/// Assets under management, 0-15 points on a decade scale.
fn aum_points(aum: f64) -> f64 {
    match aum {
        a if a > 100.0 * BILLION => 15.0,
        a if a > 10.0 * BILLION => 12.0,
        a if a > BILLION => 9.0,
        a if a > 500.0 * MILLION => 6.0,
        a if a >= 100.0 * MILLION => 3.0,
        _ => 0.0,
    }
}

/// Dividend yield, 0-10 points.
fn dividend_points(yield_pct: f64) -> f64 {
    match yield_pct {
        y if y > 6.0 => 10.0,
        y if y > 4.0 => 8.0,
        y if y > 3.0 => 6.0,
        y if y > 2.0 => 4.0,
        y if y > 1.0 => 2.0,
        y if y > 0.5 => 1.0,
        _ => 0.0,
    }
}

fn expense_penalty(expense_pct: f64) -> f64 {
    match expense_pct {
        e if e > 1.0 => 20.0,
        e if e > 0.75 => 15.0,
        e if e > 0.5 => 10.0,
        e if e > 0.25 => 5.0,
        e if e > 0.1 => 2.0,
        _ => 0.0,
    }
}

fn drawdown_penalty(drawdown_pct: f64) -> f64 {
    match drawdown_pct.abs() {
        d if d > 50.0 => 10.0,
        d if d > 40.0 => 7.0,
        d if d > 30.0 => 4.0,
        d if d >= 20.0 => 2.0,
        _ => 0.0,
    }
}

/// Up to 5 points for low dispersion across the 12m/24m/36m/5y returns.
/// Needs at least two known horizons.
fn consistency_bonus(asset: &CandidateAsset) -> f64 {
    let r = &asset.returns;
    let known: Vec<f64> = [r.m12, r.m24, r.m36, r.y5]
        .into_iter()
        .filter(|v| *v != 0.0)
        .collect();
    if known.len() < 2 {
        return 0.0;
    }
    let n = known.len() as f64;
    let mean = known.iter().sum::<f64>() / n;
    let stddev = (known.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();
    match stddev {
        s if s < 2.0 => 5.0,
        s if s < 5.0 => 3.0,
        s if s < 10.0 => 1.0,
        _ => 0.0,
    }
}

pub fn risk_adjusted_score(asset: &CandidateAsset) -> f64 {
    let annual_return = asset.expected_return();
    let volatility = asset.expected_volatility();

    let volatility_penalty = if volatility > 15.0 {
        -0.5 * (volatility - 15.0)
    } else {
        0.0
    };

    let aum_bonus = if asset.aum > 0.0 {
        ((asset.aum / (100.0 * MILLION)).log10() * 4.0).clamp(0.0, 10.0)
    } else {
        0.0
    };

    annual_return * 0.4
        + asset.sharpe_ratio * 25.0
        + volatility_penalty
        + aum_bonus
        + stability_bonus(asset)
}

/// 0-8: half from shallow drawdowns, half from fund size.
fn stability_bonus(asset: &CandidateAsset) -> f64 {
    let drawdown_part = match asset.max_drawdown.map(f64::abs) {
        None => 0.0,
        Some(d) if d < 10.0 => 4.0,
        Some(d) if d < 20.0 => 3.0,
        Some(d) if d < 30.0 => 2.0,
        Some(d) if d < 40.0 => 1.0,
        Some(_) => 0.0,
    };
    let aum_part = match asset.aum {
        a if a > 50.0 * BILLION => 4.0,
        a if a > 10.0 * BILLION => 3.0,
        a if a > BILLION => 2.0,
        a if a > 100.0 * MILLION => 1.0,
        _ => 0.0,
    };
    drawdown_part + aum_part
}

/// 60% AUM step plus 40% average-volume step, 0-100.
pub fn liquidity_score(asset: &CandidateAsset) -> f64 {
    let aum_step = match asset.aum {
        a if a > 10.0 * BILLION => 100.0,
        a if a > BILLION => 80.0,
        a if a > 500.0 * MILLION => 60.0,
        a if a > 100.0 * MILLION => 40.0,
        a if a > 10.0 * MILLION => 20.0,
        _ => 0.0,
    };
    let volume_step = match asset.avg_volume {
        v if v > 1_000_000.0 => 100.0,
        v if v > 500_000.0 => 80.0,
        v if v > 100_000.0 => 60.0,
        v if v > 10_000.0 => 40.0,
        v if v > 0.0 => 20.0,
        _ => 0.0,
    };
    aum_step * 0.6 + volume_step * 0.4
}

pub fn diversification_score(asset: &CandidateAsset) -> f64 {
    let base: f64 = match asset.asset_class {
        AssetClass::GlobalEquity => 90.0,
        AssetClass::Bond => 75.0,
        AssetClass::RegionalEquity => 65.0,
        AssetClass::ShortTermBond => 60.0,
        AssetClass::RealEstate => 50.0,
        AssetClass::Commodity => 45.0,
        AssetClass::SectorEquity => 35.0,
        AssetClass::Cash => 30.0,
        AssetClass::SingleStock => 15.0,
    };
    let broad = ["broad", "world", "all-world", "total-market", "aggregate"]
        .iter()
        .any(|t| asset.has_tag(t));
    let narrow = ["thematic", "leveraged", "single-country"]
        .iter()
        .any(|t| asset.has_tag(t));

    let mut score = base;
    if broad {
        score += 10.0;
    }
    if narrow {
        score -= 15.0;
    }
    score.clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::asset::HorizonSeries;

    fn strong_etf() -> CandidateAsset {
        CandidateAsset {
            symbol: "VWCE".into(),
            name: "All-World".into(),
            asset_class: AssetClass::GlobalEquity,
            tags: vec!["world".into()],
            returns: HorizonSeries {
                m12: 18.0,
                m24: 16.0,
                m36: 15.0,
                y5: 14.0,
                y10: 11.0,
            },
            volatility: HorizonSeries {
                m12: 12.0,
                m24: 13.0,
                m36: 14.0,
                y5: 15.0,
                y10: 15.0,
            },
            sharpe_ratio: 1.2,
            dividend_yield: 1.8,
            expense_ratio: 0.22,
            aum: 20.0 * BILLION,
            avg_volume: 600_000.0,
            max_drawdown: Some(-25.0),
        }
    }

    #[test]
    fn quality_breakdown_of_strong_etf() {
        let b = quality_breakdown(&strong_etf());
        assert_eq!(b.sharpe_points, 24.0);
        assert_eq!(b.return_points, 16.0);
        assert_eq!(b.volatility_points, 12.0);
        assert_eq!(b.aum_points, 12.0);
        assert_eq!(b.dividend_points, 2.0);
        assert_eq!(b.expense_penalty, 2.0);
        assert_eq!(b.drawdown_penalty, 2.0);
        assert_eq!(b.consistency_bonus, 5.0);
        assert_eq!(b.total(), 67.0);
    }

    #[test]
    fn band_edges() {
        assert_eq!(sharpe_points(1.51), 30.0);
        assert_eq!(sharpe_points(0.0), 0.0);
        assert_eq!(return_points(30.01), 25.0);
        assert_eq!(return_points(-4.0), 0.0);
        assert_eq!(volatility_points(6.0), 20.0);
        assert_eq!(volatility_points(0.0), 0.0);
        assert_eq!(volatility_points(40.0), 0.0);
        assert_eq!(aum_points(150.0 * BILLION), 15.0);
        assert_eq!(aum_points(99.0 * MILLION), 0.0);
        assert_eq!(dividend_points(6.5), 10.0);
        assert_eq!(dividend_points(0.5), 0.0);
        assert_eq!(expense_penalty(1.5), 20.0);
        assert_eq!(expense_penalty(0.1), 0.0);
        assert_eq!(drawdown_penalty(-55.0), 10.0);
        assert_eq!(drawdown_penalty(-19.0), 0.0);
    }

    #[test]
    fn scoring_is_deterministic() {
        let scorer = AssetScorer::new();
        let a = scorer.score(&strong_etf());
        let b = scorer.score(&strong_etf());
        assert_eq!(a, b);
    }

    #[test]
    fn empty_candidate_gets_low_score_without_panicking() {
        let scored = AssetScorer::new().score(&CandidateAsset::new("EMPTY", AssetClass::SingleStock));
        assert_eq!(scored.quality_score, 0.0);
        assert_eq!(scored.risk_adjusted_score, 0.0);
        assert_eq!(scored.liquidity_score, 0.0);
        assert_eq!(scored.liquidity_tier(), LiquidityTier::Low);
    }

    #[test]
    fn quality_never_negative() {
        let mut bad = CandidateAsset::new("BAD", AssetClass::SectorEquity);
        bad.expense_ratio = 2.5;
        bad.max_drawdown = Some(-70.0);
        let scored = AssetScorer::new().score(&bad);
        assert_eq!(scored.quality_score, 0.0);
    }

    #[test]
    fn expensive_tiny_fund_scores_below_cheap_large_fund() {
        let mut expensive = strong_etf();
        expensive.expense_ratio = 1.5;
        expensive.aum = 50.0 * MILLION;
        expensive.sharpe_ratio = 0.0;

        let mut cheap = expensive.clone();
        cheap.expense_ratio = 0.05;
        cheap.aum = 50.0 * BILLION;

        let scorer = AssetScorer::new();
        assert!(scorer.score(&expensive).quality_score < scorer.score(&cheap).quality_score);
    }

    #[test]
    fn risk_adjusted_score_components() {
        let asset = strong_etf();
        // 11*0.4 + 1.2*25 + 0 (vol 15 not above threshold) + log10(200)*4 + (2 + 3)
        let expected = 4.4 + 30.0 + (200.0_f64).log10() * 4.0 + 5.0;
        approx::assert_relative_eq!(risk_adjusted_score(&asset), expected, epsilon = 1e-9);
    }

    #[test]
    fn high_volatility_is_penalized() {
        let mut calm = strong_etf();
        calm.volatility.y10 = 15.0;
        let mut wild = strong_etf();
        wild.volatility.y10 = 25.0;
        let diff = risk_adjusted_score(&calm) - risk_adjusted_score(&wild);
        approx::assert_relative_eq!(diff, 5.0, epsilon = 1e-9);
    }

    #[test]
    fn liquidity_mixes_aum_and_volume() {
        let asset = strong_etf();
        approx::assert_relative_eq!(liquidity_score(&asset), 100.0 * 0.6 + 80.0 * 0.4);
    }

    #[test]
    fn diversification_prefers_broad_exposure() {
        let broad = strong_etf();
        let mut stock = strong_etf();
        stock.asset_class = AssetClass::SingleStock;
        stock.tags.clear();
        assert_eq!(diversification_score(&broad), 100.0);
        assert_eq!(diversification_score(&stock), 15.0);
    }

    #[test]
    fn rank_orders_by_risk_adjusted_score() {
        let mut weak = strong_etf();
        weak.symbol = "WEAK".into();
        weak.sharpe_ratio = 0.1;
        let ranked = AssetScorer::new().rank(&[weak, strong_etf()]);
        assert_eq!(ranked[0].symbol(), "VWCE");
        assert_eq!(ranked[1].symbol(), "WEAK");
    }
}
