//! Heuristic allocation: bucketed selection plus score-proportional weights.
//!
//! This is deliberately not a mean-variance solver. Candidates are ranked by
//! a composite score, a bounded number are picked per bucket with a soft
//! per-class cap, and weights follow a closed-form risk-adjusted score that
//! is clamped to per-asset bounds and renormalized.

use crate::domain::asset::{AssetClass, CandidateAsset};
use crate::domain::constraints::{Bucket, Constraints};
use crate::domain::metrics::PortfolioMetrics;
use crate::domain::portfolio::{BenchmarkCheck, Holding, Portfolio};
use crate::domain::scoring::ScoredAsset;
use std::collections::{HashMap, HashSet};
use tracing::debug;

const MIN_WEIGHT_SCORE: f64 = 0.1;
const TILT_MAX_WEIGHT: f64 = 25.0;
const TILT_MIN_RETURN: f64 = 10.0;
const TILT_MIN_SHARPE: f64 = 1.0;
const TILT_MAX_BONUS: f64 = 0.5;
const MIN_AUM_FOR_LOG: f64 = 1_000_000.0;

#[derive(Debug, Clone, Copy, Default)]
pub struct AllocationOptimizer;

#[derive(Debug, Clone)]
struct Slot<'a> {
    scored: &'a ScoredAsset,
    bucket: String,
    composite: f64,
    weight: f64,
    min: f64,
    max: f64,
}

impl AllocationOptimizer {
    pub fn new() -> Self {
        AllocationOptimizer
    }

    pub fn optimize(
        &self,
        candidates: &[ScoredAsset],
        constraints: &Constraints,
        total_allocation_percent: f64,
    ) -> Portfolio {
        if total_allocation_percent <= 0.0 {
            debug!(total_allocation_percent, "nothing to allocate");
            return Portfolio::empty();
        }

        let eligible: Vec<&ScoredAsset> = candidates
            .iter()
            .filter(|c| c.liquidity_tier() >= constraints.min_liquidity)
            .filter(|c| c.quality_score >= constraints.min_quality)
            .collect();
        debug!(
            candidates = candidates.len(),
            eligible = eligible.len(),
            "filtered candidate pool"
        );
        if eligible.is_empty() {
            return Portfolio::empty();
        }

        let buckets = effective_buckets(constraints, total_allocation_percent);
        let mut taken: HashSet<&str> = HashSet::new();
        let mut slots: Vec<Slot> = Vec::new();

        for bucket in &buckets {
            let pool: Vec<&ScoredAsset> = eligible
                .iter()
                .copied()
                .filter(|c| bucket.accepts(c.asset.asset_class))
                .filter(|c| !taken.contains(c.symbol()))
                .collect();
            if pool.is_empty() || bucket.target_percent <= 0.0 {
                debug!(bucket = %bucket.name, "bucket has no candidates");
                continue;
            }

            let composites = composite_scores(&pool);
            let count = slot_count(bucket, constraints, total_allocation_percent, pool.len());
            let picked = select(&pool, &composites, count);
            debug!(bucket = %bucket.name, slots = count, picked = picked.len(), "bucket selection");

            let raw = risk_weights(
                picked.iter().map(|&i| &pool[i].asset),
                constraints.risk_aversion(),
                bucket.target_percent,
            );
            let bounds = vec![(bucket.min_allocation, bucket.max_allocation); picked.len()];
            let weights = fit_to_bounds(&raw, &bounds, bucket.target_percent);

            for (&i, weight) in picked.iter().zip(weights) {
                taken.insert(pool[i].symbol());
                slots.push(Slot {
                    scored: pool[i],
                    bucket: bucket.name.clone(),
                    composite: composites[i],
                    weight,
                    min: bucket.min_allocation,
                    max: bucket.max_allocation,
                });
            }
        }

        trim_to_max_assets(&mut slots, &buckets, constraints, total_allocation_percent);
        top_up(&mut slots, &eligible, &taken, constraints);
        apply_class_limits(&mut slots, constraints);

        let raw: Vec<f64> = slots.iter().map(|s| s.weight).collect();
        let bounds: Vec<(f64, f64)> = slots.iter().map(|s| (s.min, s.max)).collect();
        let weights = fit_to_bounds(&raw, &bounds, total_allocation_percent);
        for (slot, w) in slots.iter_mut().zip(weights) {
            slot.weight = w;
        }

        let mut portfolio = build_portfolio(&slots, constraints);
        if !portfolio.check.passed {
            if let Some(tilted) = tilt_for_performance(&slots, constraints, total_allocation_percent) {
                debug!("benchmark check failed, applying performance tilt");
                portfolio = tilted;
            }
        }
        portfolio
    }
}

fn effective_buckets(constraints: &Constraints, total: f64) -> Vec<Bucket> {
    if constraints.buckets.is_empty() {
        return vec![Bucket {
            name: "all".into(),
            classes: AssetClass::ALL.to_vec(),
            target_percent: total,
            max_assets: Some(constraints.max_assets),
            min_allocation: constraints.min_allocation,
            max_allocation: constraints.max_allocation,
        }];
    }
    constraints
        .buckets
        .iter()
        .map(|b| Bucket {
            target_percent: b.target_percent * total / 100.0,
            ..b.clone()
        })
        .collect()
}

/// Composite rank over a bucket pool. Return and Sharpe are min-max scaled
/// to 0-100 within the pool.
pub fn composite_scores(pool: &[&ScoredAsset]) -> Vec<f64> {
    let returns: Vec<f64> = pool.iter().map(|c| c.asset.expected_return()).collect();
    let sharpes: Vec<f64> = pool.iter().map(|c| c.asset.sharpe_ratio).collect();
    let norm_returns = min_max_scale(&returns);
    let norm_sharpes = min_max_scale(&sharpes);

    pool.iter()
        .enumerate()
        .map(|(i, c)| {
            let vol_term = (20.0 - c.asset.expected_volatility()).max(0.0);
            let aum_term = (c.asset.aum.max(MIN_AUM_FOR_LOG) / 1_000_000_000.0).log10();
            0.3 * norm_returns[i]
                + 0.25 * norm_sharpes[i]
                + 0.15 * vol_term
                + 0.2 * c.quality_score
                + 0.1 * aum_term
        })
        .collect()
}

fn min_max_scale(values: &[f64]) -> Vec<f64> {
    let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = hi - lo;
    values
        .iter()
        .map(|v| if span > 0.0 { (v - lo) / span * 100.0 } else { 50.0 })
        .collect()
}

/// The bucket's proportional share of `max_assets`.
fn bucket_share(bucket: &Bucket, constraints: &Constraints, total: f64) -> f64 {
    if constraints.buckets.is_empty() {
        constraints.max_assets as f64
    } else {
        (constraints.max_assets as f64 * bucket.target_percent / total).round()
    }
}

fn slot_count(bucket: &Bucket, constraints: &Constraints, total: f64, available: usize) -> usize {
    let share = bucket_share(bucket, constraints, total);
    let needed = if bucket.max_allocation > 0.0 {
        (bucket.target_percent / bucket.max_allocation).ceil()
    } else {
        1.0
    };
    let room = if bucket.min_allocation > 0.0 {
        (bucket.target_percent / bucket.min_allocation).floor()
    } else {
        f64::INFINITY
    };

    let mut count = share.max(needed).min(room).max(1.0) as usize;
    if let Some(cap) = bucket.max_assets {
        count = count.min(cap.max(1));
    }
    count.min(available)
}

/// Pick `count` pool indices, alternating between the best asset of the
/// least represented class and the best asset overall. Each class is capped
/// at `ceil(count / 3)` until no other class can fill the remaining slots.
fn select(pool: &[&ScoredAsset], composites: &[f64], count: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..pool.len()).collect();
    order.sort_by(|&a, &b| composites[b].total_cmp(&composites[a]));

    let class_cap = count.div_ceil(3).max(1);
    let mut per_class: HashMap<AssetClass, usize> = HashMap::new();
    let mut used = vec![false; pool.len()];
    let mut picked = Vec::with_capacity(count);

    let under_cap = |class: AssetClass, per_class: &HashMap<AssetClass, usize>| {
        per_class.get(&class).copied().unwrap_or(0) < class_cap
    };

    while picked.len() < count {
        let remaining: Vec<usize> = order.iter().copied().filter(|&i| !used[i]).collect();
        if remaining.is_empty() {
            break;
        }

        let by_class_turn = picked.len() % 2 == 0;
        let choice = if by_class_turn {
            // `remaining` is sorted, so the first hit per class is its best.
            remaining
                .iter()
                .copied()
                .filter(|&i| under_cap(pool[i].asset.asset_class, &per_class))
                .min_by_key(|&i| per_class.get(&pool[i].asset.asset_class).copied().unwrap_or(0))
        } else {
            remaining
                .iter()
                .copied()
                .find(|&i| under_cap(pool[i].asset.asset_class, &per_class))
        };

        let index = match choice {
            Some(i) => i,
            None => {
                debug!(class_cap, "class cap relaxed to fill remaining slots");
                remaining[0]
            }
        };
        used[index] = true;
        *per_class.entry(pool[index].asset.asset_class).or_insert(0) += 1;
        picked.push(index);
    }
    picked
}

/// `max(0.1, r - s * aversion + 2 * sharpe)` on fractional return/volatility,
/// scaled to `total`.
fn risk_weights<'a>(
    assets: impl Iterator<Item = &'a CandidateAsset>,
    risk_aversion: f64,
    total: f64,
) -> Vec<f64> {
    let scores: Vec<f64> = assets
        .map(|a| {
            let r = a.expected_return() / 100.0;
            let s = a.expected_volatility() / 100.0;
            (r - s * risk_aversion + 2.0 * a.sharpe_ratio).max(MIN_WEIGHT_SCORE)
        })
        .collect();
    let sum: f64 = scores.iter().sum();
    scores.iter().map(|s| s / sum * total).collect()
}

/// Clamp `raw` into per-entry bounds and rescale so the result sums to
/// `total`. Infeasible bounds are relaxed proportionally: minimums shrink when
/// they cannot fit, maximums grow when they cannot reach the total.
pub fn fit_to_bounds(raw: &[f64], bounds: &[(f64, f64)], total: f64) -> Vec<f64> {
    let n = raw.len();
    if n == 0 {
        return Vec::new();
    }

    let mut mins: Vec<f64> = bounds.iter().map(|b| b.0.max(0.0)).collect();
    let mut maxs: Vec<f64> = bounds.iter().map(|b| b.1.max(b.0).max(0.0)).collect();

    let sum_min: f64 = mins.iter().sum();
    if sum_min > total {
        debug!(sum_min, total, "minimum allocation infeasible, shrinking");
        for m in &mut mins {
            *m *= total / sum_min;
        }
    }
    let sum_max: f64 = maxs.iter().sum();
    if sum_max < total {
        debug!(sum_max, total, "maximum allocation infeasible, widening");
        if sum_max > 0.0 {
            for m in &mut maxs {
                *m *= total / sum_max;
            }
        } else {
            maxs.iter_mut().for_each(|m| *m = total / n as f64);
        }
        for (lo, hi) in mins.iter().zip(maxs.iter_mut()) {
            *hi = hi.max(*lo);
        }
    }

    let mut weights: Vec<f64> = raw.iter().map(|w| w.max(0.0)).collect();
    if weights.iter().sum::<f64>() <= 0.0 {
        weights.iter_mut().for_each(|w| *w = 1.0);
    }
    let mut fixed = vec![false; n];

    for _ in 0..=n {
        let fixed_sum: f64 = (0..n).filter(|&i| fixed[i]).map(|i| weights[i]).sum();
        let free: Vec<usize> = (0..n).filter(|&i| !fixed[i]).collect();
        if free.is_empty() {
            break;
        }
        let remaining = total - fixed_sum;
        let free_sum: f64 = free.iter().map(|&i| weights[i]).sum();
        for &i in &free {
            weights[i] = if free_sum > 0.0 {
                weights[i] * remaining / free_sum
            } else {
                remaining / free.len() as f64
            };
        }

        let excess: f64 = free.iter().map(|&i| (weights[i] - maxs[i]).max(0.0)).sum();
        let deficit: f64 = free.iter().map(|&i| (mins[i] - weights[i]).max(0.0)).sum();
        if excess <= 1e-12 && deficit <= 1e-12 {
            break;
        }
        for &i in &free {
            if excess >= deficit && weights[i] > maxs[i] {
                weights[i] = maxs[i];
                fixed[i] = true;
            } else if excess < deficit && weights[i] < mins[i] {
                weights[i] = mins[i];
                fixed[i] = true;
            }
        }
    }

    let sum: f64 = weights.iter().sum();
    if sum > 0.0 && (sum - total).abs() > 1e-9 {
        weights.iter_mut().for_each(|w| *w *= total / sum);
    }
    weights
}

/// Drop the weakest slots until at most `max_assets` remain. Buckets holding
/// more slots than their share give theirs up first; a bucket keeps its last
/// slot while any other bucket can still give one up. Touched buckets are
/// refit to their target so the weight freed by a dropped slot stays inside
/// its bucket.
fn trim_to_max_assets(slots: &mut Vec<Slot>, buckets: &[Bucket], constraints: &Constraints, total: f64) {
    let limit = constraints.max_assets.max(1);
    if slots.len() <= limit {
        return;
    }
    debug!(selected = slots.len(), max_assets = limit, "trimming selection to max_assets");

    let mut touched: HashSet<String> = HashSet::new();
    while slots.len() > limit {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for slot in slots.iter() {
            *counts.entry(slot.bucket.clone()).or_insert(0) += 1;
        }
        let shared = |slot: &Slot| counts.get(&slot.bucket).copied().unwrap_or(0) > 1;
        let over_share = |slot: &Slot| {
            let count = counts.get(&slot.bucket).copied().unwrap_or(0) as f64;
            buckets
                .iter()
                .find(|b| b.name == slot.bucket)
                .is_some_and(|b| count > bucket_share(b, constraints, total))
        };

        let view: &[Slot] = slots.as_slice();
        let victim = weakest_slot(view, |s| shared(s) && over_share(s))
            .or_else(|| weakest_slot(view, shared))
            .or_else(|| weakest_slot(view, |_| true));
        let Some(index) = victim else {
            break;
        };
        let removed = slots.remove(index);
        touched.insert(removed.bucket);
    }

    for bucket in buckets.iter().filter(|b| touched.contains(&b.name)) {
        let members: Vec<usize> = (0..slots.len()).filter(|&i| slots[i].bucket == bucket.name).collect();
        if members.is_empty() {
            continue;
        }
        let raw: Vec<f64> = members.iter().map(|&i| slots[i].weight).collect();
        let bounds: Vec<(f64, f64)> = members.iter().map(|&i| (slots[i].min, slots[i].max)).collect();
        let weights = fit_to_bounds(&raw, &bounds, bucket.target_percent);
        for (&i, w) in members.iter().zip(weights) {
            slots[i].weight = w;
        }
    }
}

fn weakest_slot<'a>(slots: &[Slot<'a>], keep: impl Fn(&Slot<'a>) -> bool) -> Option<usize> {
    slots
        .iter()
        .enumerate()
        .filter(|(_, s)| keep(s))
        .min_by(|(_, a), (_, b)| a.composite.total_cmp(&b.composite))
        .map(|(i, _)| i)
}

/// Fill up to the target asset count with the next-best spare candidates
/// at a small residual weight. Never goes past `max_assets`.
fn top_up<'a>(
    slots: &mut Vec<Slot<'a>>,
    eligible: &[&'a ScoredAsset],
    taken: &HashSet<&str>,
    constraints: &Constraints,
) {
    let target = constraints.min_assets.min(constraints.max_assets.max(1));
    if slots.len() >= target {
        return;
    }
    let spare: Vec<&ScoredAsset> = eligible
        .iter()
        .copied()
        .filter(|c| !taken.contains(c.symbol()))
        .collect();
    if spare.is_empty() {
        return;
    }

    let composites = composite_scores(&spare);
    let mut order: Vec<usize> = (0..spare.len()).collect();
    order.sort_by(|&a, &b| composites[b].total_cmp(&composites[a]));

    let missing = target - slots.len();
    debug!(missing, spare = spare.len(), "topping up portfolio");
    for i in order.into_iter().take(missing) {
        slots.push(Slot {
            scored: spare[i],
            bucket: "top_up".into(),
            composite: composites[i],
            weight: constraints.residual_allocation,
            min: 0.0,
            max: constraints.max_allocation,
        });
    }
}

/// Translate per-class limits into per-asset bounds so the final fit honors them.
fn apply_class_limits(slots: &mut [Slot], constraints: &Constraints) {
    for limit in &constraints.class_limits {
        let members = slots
            .iter()
            .filter(|s| s.scored.asset.asset_class == limit.class)
            .count();
        if members == 0 {
            continue;
        }
        let share_max = limit.max_percent / members as f64;
        let share_min = limit.min_percent / members as f64;
        for slot in slots
            .iter_mut()
            .filter(|s| s.scored.asset.asset_class == limit.class)
        {
            slot.max = slot.max.min(share_max);
            slot.min = slot.min.max(share_min).min(slot.max);
        }
    }
}

fn build_portfolio(slots: &[Slot], constraints: &Constraints) -> Portfolio {
    let holdings: Vec<Holding> = slots
        .iter()
        .map(|s| {
            let asset = &s.scored.asset;
            Holding {
                symbol: asset.symbol.clone(),
                name: asset.name.clone(),
                asset_class: asset.asset_class,
                bucket: s.bucket.clone(),
                weight: s.weight,
                expected_return: asset.expected_return(),
                volatility: asset.expected_volatility(),
                sharpe_ratio: asset.sharpe_ratio,
                quality_score: s.scored.quality_score,
                composite_score: s.composite,
            }
        })
        .collect();
    let metrics = PortfolioMetrics::compute(&holdings, constraints.risk_free_rate);
    let check = check_benchmarks(&metrics, constraints);
    Portfolio {
        holdings,
        metrics,
        check,
    }
}

/// Expected return must beat the required number of benchmark hurdles and
/// the Sharpe ratio must reach the floor.
pub fn check_benchmarks(metrics: &PortfolioMetrics, constraints: &Constraints) -> BenchmarkCheck {
    let beaten = constraints
        .benchmark_targets
        .iter()
        .filter(|b| metrics.expected_return > b.annual_return)
        .count();
    let required = constraints
        .required_benchmark_wins
        .min(constraints.benchmark_targets.len());
    let sharpe_ok = metrics.sharpe_ratio >= constraints.min_sharpe;
    BenchmarkCheck {
        benchmarks_beaten: beaten,
        benchmarks_required: required,
        sharpe_ok,
        passed: beaten >= required && sharpe_ok,
        tilted: false,
    }
}

/// Single bounded retry: boost strong performers, cap at 25%, renormalize,
/// re-check. Returns `None` when no holding qualifies for the boost.
fn tilt_for_performance(
    slots: &[Slot],
    constraints: &Constraints,
    total: f64,
) -> Option<Portfolio> {
    let mut boosted = false;
    let raw: Vec<f64> = slots
        .iter()
        .map(|s| {
            let asset = &s.scored.asset;
            let ret = asset.expected_return();
            if ret > TILT_MIN_RETURN && asset.sharpe_ratio > TILT_MIN_SHARPE {
                boosted = true;
                let bonus = ((ret - TILT_MIN_RETURN) / 100.0
                    + (asset.sharpe_ratio - TILT_MIN_SHARPE) / 10.0)
                    .min(TILT_MAX_BONUS);
                s.weight * (1.0 + bonus)
            } else {
                s.weight
            }
        })
        .collect();
    if !boosted {
        return None;
    }

    let bounds: Vec<(f64, f64)> = slots
        .iter()
        .map(|s| {
            let cap = s.max.min(TILT_MAX_WEIGHT);
            (s.min.min(cap), cap)
        })
        .collect();
    let weights = fit_to_bounds(&raw, &bounds, total);
    let tilted_slots: Vec<Slot> = slots
        .iter()
        .zip(weights)
        .map(|(s, weight)| Slot {
            weight,
            ..s.clone()
        })
        .collect();

    let mut portfolio = build_portfolio(&tilted_slots, constraints);
    portfolio.check.tilted = true;
    Some(portfolio)
}
