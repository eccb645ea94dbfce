//! Monte Carlo forward projection with percentile bands.
//!
//! The random source is injected. The caller's generator only hands out one
//! seed per trial, in trial order; each trial then draws from its own
//! `StdRng`. Trials are therefore independent of scheduling, and the
//! `parallel` feature produces the same bands as a sequential run.

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use serde::Serialize;
use std::f64::consts::PI;
use tracing::{debug, warn};

pub const PESSIMISTIC_PERCENTILE: f64 = 0.15;
pub const EXPECTED_PERCENTILE: f64 = 0.50;
pub const OPTIMISTIC_PERCENTILE: f64 = 0.85;

/// Annual return guard, fractional.
pub const RETURN_BOUNDS: (f64, f64) = (-0.30, 0.25);
/// Annual volatility guard, fractional.
pub const VOLATILITY_BOUNDS: (f64, f64) = (0.05, 0.35);
/// Per-period, per-asset return clamp.
pub const PERIOD_RETURN_LIMIT: f64 = 0.40;

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub initial_amount: f64,
    pub periodic_contribution: f64,
    pub horizon_periods: usize,
    pub periods_per_year: usize,
    pub trials: usize,
    /// `None` draws a fresh seed from OS entropy.
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            initial_amount: 10_000.0,
            periodic_contribution: 0.0,
            horizon_periods: 12,
            periods_per_year: 12,
            trials: 5000,
            seed: None,
        }
    }
}

/// Percentile values at the end of one period (1-based).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SimulationPoint {
    pub period: usize,
    pub pessimistic_value: f64,
    pub expected_value: f64,
    pub optimistic_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationSummary {
    pub trials: usize,
    pub horizon_periods: usize,
    pub total_contributed: f64,
    pub mean_terminal_value: f64,
    /// Share of trials ending below the capital paid in.
    pub probability_of_loss: f64,
    pub pessimistic_value: f64,
    pub expected_value: f64,
    pub optimistic_value: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SimulationResult {
    pub points: Vec<SimulationPoint>,
    pub summary: Option<SimulationSummary>,
}

impl SimulationResult {
    pub fn terminal(&self) -> Option<&SimulationPoint> {
        self.points.last()
    }
}

/// Per-asset inputs after the realism guard, converted to one period.
#[derive(Debug, Clone, PartialEq)]
struct PeriodInputs {
    returns: Vec<f64>,
    volatilities: Vec<f64>,
    weights: Vec<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct SimulationEngine {
    config: SimulationConfig,
}

impl SimulationEngine {
    pub fn new(config: SimulationConfig) -> Self {
        SimulationEngine { config }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Run with the configured seed, or a fresh one when none is set.
    pub fn run(&self, returns: &[f64], volatilities: &[f64], weights: &[f64]) -> SimulationResult {
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        self.simulate(returns, volatilities, weights, &mut rng)
    }

    /// Single-asset projection from portfolio-level figures (percent).
    pub fn run_portfolio(&self, expected_return: f64, volatility: f64) -> SimulationResult {
        self.run(&[expected_return], &[volatility], &[100.0])
    }

    /// Project the portfolio. Returns, volatilities and weights are percent;
    /// weights are rescaled to sum to one.
    pub fn simulate<R: Rng + ?Sized>(
        &self,
        returns: &[f64],
        volatilities: &[f64],
        weights: &[f64],
        rng: &mut R,
    ) -> SimulationResult {
        let cfg = &self.config;
        if cfg.trials == 0 || cfg.horizon_periods == 0 {
            warn!(
                trials = cfg.trials,
                horizon = cfg.horizon_periods,
                "empty simulation requested"
            );
            return SimulationResult::default();
        }

        let inputs = period_inputs(returns, volatilities, weights, cfg.periods_per_year.max(1));
        let seeds: Vec<u64> = (0..cfg.trials).map(|_| rng.next_u64()).collect();
        debug!(
            assets = inputs.weights.len(),
            trials = cfg.trials,
            periods = cfg.horizon_periods,
            "running monte carlo"
        );

        let paths = run_trials(&seeds, |seed| {
            simulate_trial(&inputs, cfg, &mut StdRng::seed_from_u64(seed))
        });

        let points = (0..cfg.horizon_periods)
            .map(|period| {
                let mut values: Vec<f64> = paths.iter().map(|p| p[period]).collect();
                values.sort_by(f64::total_cmp);
                SimulationPoint {
                    period: period + 1,
                    pessimistic_value: percentile(&values, PESSIMISTIC_PERCENTILE),
                    expected_value: percentile(&values, EXPECTED_PERCENTILE),
                    optimistic_value: percentile(&values, OPTIMISTIC_PERCENTILE),
                }
            })
            .collect::<Vec<_>>();

        let summary = summarize(&paths, &points, cfg);
        SimulationResult {
            points,
            summary: Some(summary),
        }
    }
}

fn period_inputs(
    returns: &[f64],
    volatilities: &[f64],
    weights: &[f64],
    periods_per_year: usize,
) -> PeriodInputs {
    let n = returns.len().min(volatilities.len()).min(weights.len());
    let clean = |v: f64| if v.is_finite() { v } else { 0.0 };
    let weight_sum: f64 = weights[..n].iter().map(|w| clean(*w).max(0.0)).sum();
    let ppy = periods_per_year as f64;

    let mut out = PeriodInputs {
        returns: Vec::with_capacity(n),
        volatilities: Vec::with_capacity(n),
        weights: Vec::with_capacity(n),
    };
    for i in 0..n {
        let annual_return = (clean(returns[i]) / 100.0).clamp(RETURN_BOUNDS.0, RETURN_BOUNDS.1);
        let annual_vol = (clean(volatilities[i]) / 100.0).clamp(VOLATILITY_BOUNDS.0, VOLATILITY_BOUNDS.1);
        out.returns.push(periodic_return(annual_return, ppy));
        out.volatilities.push(annual_vol / ppy.sqrt());
        out.weights.push(if weight_sum > 0.0 {
            clean(weights[i]).max(0.0) / weight_sum
        } else {
            0.0
        });
    }
    out
}

/// `(1 + annual)^(1 / periods) - 1`.
pub fn periodic_return(annual: f64, periods_per_year: f64) -> f64 {
    (1.0 + annual).powf(1.0 / periods_per_year) - 1.0
}

/// Standard normal variate from two uniforms (Box-Muller).
pub fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen_range(0.0..1.0);
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

/// One trajectory: the value at the end of each period.
fn simulate_trial<R: Rng + ?Sized>(inputs: &PeriodInputs, cfg: &SimulationConfig, rng: &mut R) -> Vec<f64> {
    let mut value = cfg.initial_amount;
    let mut path = Vec::with_capacity(cfg.horizon_periods);
    for _ in 0..cfg.horizon_periods {
        let mut portfolio_return = 0.0;
        for i in 0..inputs.weights.len() {
            let z = standard_normal(rng);
            let asset_return = (inputs.returns[i] + inputs.volatilities[i] * z)
                .clamp(-PERIOD_RETURN_LIMIT, PERIOD_RETURN_LIMIT);
            portfolio_return += inputs.weights[i] * asset_return;
        }
        value *= 1.0 + portfolio_return;
        value += cfg.periodic_contribution;
        path.push(value);
    }
    path
}

#[cfg(feature = "parallel")]
fn run_trials<F>(seeds: &[u64], trial: F) -> Vec<Vec<f64>>
where
    F: Fn(u64) -> Vec<f64> + Sync,
{
    use rayon::prelude::*;
    seeds.par_iter().map(|&s| trial(s)).collect()
}

#[cfg(not(feature = "parallel"))]
fn run_trials<F>(seeds: &[u64], trial: F) -> Vec<Vec<f64>>
where
    F: Fn(u64) -> Vec<f64>,
{
    seeds.iter().map(|&s| trial(s)).collect()
}

/// Value at `floor(len * q)` of an ascending slice.
fn percentile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let index = ((sorted.len() as f64 * q).floor() as usize).min(sorted.len() - 1);
    sorted[index]
}

fn summarize(paths: &[Vec<f64>], points: &[SimulationPoint], cfg: &SimulationConfig) -> SimulationSummary {
    let total_contributed =
        cfg.initial_amount + cfg.periodic_contribution * cfg.horizon_periods as f64;
    let terminals: Vec<f64> = paths.iter().filter_map(|p| p.last().copied()).collect();
    let n = terminals.len().max(1) as f64;
    let mean_terminal_value = terminals.iter().sum::<f64>() / n;
    let losses = terminals.iter().filter(|v| **v < total_contributed).count();
    let last = points.last();

    SimulationSummary {
        trials: cfg.trials,
        horizon_periods: cfg.horizon_periods,
        total_contributed,
        mean_terminal_value,
        probability_of_loss: losses as f64 / n,
        pessimistic_value: last.map_or(0.0, |p| p.pessimistic_value),
        expected_value: last.map_or(0.0, |p| p.expected_value),
        optimistic_value: last.map_or(0.0, |p| p.optimistic_value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn config(trials: usize, horizon: usize) -> SimulationConfig {
        SimulationConfig {
            initial_amount: 100_000.0,
            periodic_contribution: 0.0,
            horizon_periods: horizon,
            periods_per_year: 12,
            trials,
            seed: Some(42),
        }
    }

    #[test]
    fn sanity_band_for_reference_scenario() {
        let engine = SimulationEngine::new(config(5000, 12));
        let result = engine.run_portfolio(10.0, 15.0);
        assert_eq!(result.points.len(), 12);
        let terminal = result.terminal().unwrap();
        assert!(terminal.expected_value > 95_000.0);
        assert!(terminal.expected_value < 135_000.0);
    }

    #[test]
    fn percentiles_are_ordered_every_period() {
        let engine = SimulationEngine::new(config(2000, 24));
        let result = engine.run(&[8.0, 3.0], &[18.0, 6.0], &[60.0, 40.0]);
        for p in &result.points {
            assert!(p.pessimistic_value <= p.expected_value);
            assert!(p.expected_value <= p.optimistic_value);
        }
    }

    #[test]
    fn same_seed_is_bit_identical() {
        let engine = SimulationEngine::new(config(500, 12));
        let a = engine.run(&[7.0, 4.0], &[16.0, 5.0], &[70.0, 30.0]);
        let b = engine.run(&[7.0, 4.0], &[16.0, 5.0], &[70.0, 30.0]);
        assert_eq!(a, b);
    }

    #[test]
    fn seed_42_reference_bands() {
        let engine = SimulationEngine::new(config(200, 12));
        let result = engine.run_portfolio(10.0, 15.0);
        let summary = result.summary.unwrap();

        assert_eq!(StdRng::seed_from_u64(42).next_u64(), 9_713_269_763_989_775_522);
        assert_relative_eq!(summary.pessimistic_value, 94_671.475_935_856_64, max_relative = 1e-9);
        assert_relative_eq!(summary.expected_value, 108_657.808_293_644_59, max_relative = 1e-9);
        assert_relative_eq!(summary.optimistic_value, 124_282.276_381_807_55, max_relative = 1e-9);
        assert_relative_eq!(summary.mean_terminal_value, 110_084.017_016_248_86, max_relative = 1e-9);
    }

    #[test]
    fn trial_runner_matches_a_sequential_loop() {
        let cfg = config(64, 12);
        let inputs = period_inputs(&[7.0, 3.0], &[16.0, 5.0], &[70.0, 30.0], cfg.periods_per_year);
        let mut master = StdRng::seed_from_u64(9);
        let seeds: Vec<u64> = (0..cfg.trials).map(|_| master.next_u64()).collect();

        let sequential: Vec<Vec<f64>> = seeds
            .iter()
            .map(|&seed| simulate_trial(&inputs, &cfg, &mut StdRng::seed_from_u64(seed)))
            .collect();
        let runner = run_trials(&seeds, |seed| {
            simulate_trial(&inputs, &cfg, &mut StdRng::seed_from_u64(seed))
        });
        assert_eq!(runner, sequential);

        let engine = SimulationEngine::new(SimulationConfig { seed: Some(9), ..cfg.clone() });
        let result = engine.run(&[7.0, 3.0], &[16.0, 5.0], &[70.0, 30.0]);
        let mut terminals: Vec<f64> = sequential.iter().map(|p| p[11]).collect();
        terminals.sort_by(f64::total_cmp);
        assert_eq!(result.terminal().unwrap().expected_value, percentile(&terminals, EXPECTED_PERCENTILE));
    }

    #[test]
    fn injected_rng_drives_the_outcome() {
        let engine = SimulationEngine::new(config(500, 12));
        let a = engine.simulate(&[7.0], &[16.0], &[100.0], &mut StdRng::seed_from_u64(1));
        let b = engine.simulate(&[7.0], &[16.0], &[100.0], &mut StdRng::seed_from_u64(2));
        assert_ne!(a, b);
    }

    #[test]
    fn inputs_are_clamped_to_realism_bounds() {
        let wild = period_inputs(&[80.0], &[1.0], &[100.0], 12);
        let capped = period_inputs(&[25.0], &[5.0], &[100.0], 12);
        assert_eq!(wild, capped);

        let crash = period_inputs(&[-90.0], &[90.0], &[1.0], 12);
        assert_relative_eq!(crash.returns[0], periodic_return(-0.30, 12.0));
        assert_relative_eq!(crash.volatilities[0], 0.35 / 12.0_f64.sqrt());
    }

    #[test]
    fn periodic_return_compounds_back_to_annual() {
        let monthly = periodic_return(0.10, 12.0);
        assert_relative_eq!((1.0 + monthly).powi(12) - 1.0, 0.10, epsilon = 1e-12);
    }

    #[test]
    fn weights_are_rescaled() {
        let inputs = period_inputs(&[5.0, 5.0], &[10.0, 10.0], &[3.0, 1.0], 12);
        assert_relative_eq!(inputs.weights[0], 0.75);
        assert_relative_eq!(inputs.weights[1], 0.25);
    }

    #[test]
    fn contributions_accumulate_without_assets() {
        let mut cfg = config(10, 6);
        cfg.initial_amount = 1_000.0;
        cfg.periodic_contribution = 100.0;
        let result = SimulationEngine::new(cfg).run(&[], &[], &[]);
        let terminal = result.terminal().unwrap();
        assert_relative_eq!(terminal.expected_value, 1_600.0);
        let summary = result.summary.unwrap();
        assert_relative_eq!(summary.total_contributed, 1_600.0);
        assert_eq!(summary.probability_of_loss, 0.0);
    }

    #[test]
    fn empty_request_returns_nothing() {
        assert!(SimulationEngine::new(config(0, 12)).run_portfolio(5.0, 10.0).points.is_empty());
        assert!(SimulationEngine::new(config(100, 0)).run_portfolio(5.0, 10.0).summary.is_none());
    }

    #[test]
    fn percentile_indices_use_floor() {
        let sorted: Vec<f64> = (0..100).map(|v| v as f64).collect();
        assert_eq!(percentile(&sorted, 0.15), 15.0);
        assert_eq!(percentile(&sorted, 0.50), 50.0);
        assert_eq!(percentile(&sorted, 0.85), 85.0);
        assert_eq!(percentile(&[7.0], 0.85), 7.0);
    }

    #[test]
    fn standard_normal_has_unit_moments() {
        let mut rng = StdRng::seed_from_u64(7);
        let draws: Vec<f64> = (0..20_000).map(|_| standard_normal(&mut rng)).collect();
        let mean = draws.iter().sum::<f64>() / draws.len() as f64;
        let var = draws.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / draws.len() as f64;
        assert!(mean.abs() < 0.05);
        assert!((var - 1.0).abs() < 0.05);
    }
}
