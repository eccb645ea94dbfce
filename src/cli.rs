//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

use crate::adapters::csv_adapter::{read_allocations, CsvAdapter};
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::asset::LiquidityTier;
use crate::domain::backtest::CurrencyAdjustment;
use crate::domain::config_validation::{
    parse_date, parse_weighted_list, validate_drift_config, validate_engine_config,
    validate_simulation_config,
};
use crate::domain::constraints::{BenchmarkTarget, Bucket, Constraints, RiskProfile};
use crate::domain::drift::{DriftMonitor, DriftReport, RebalanceKind};
use crate::domain::error::FolioError;
use crate::domain::plan::{build_plan, BacktestInputs, InvestmentPlan, PlanRequest};
use crate::domain::scoring::AssetScorer;
use crate::domain::simulation::{SimulationConfig, SimulationEngine, SimulationResult};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "folioforge", about = "Portfolio construction and risk simulation")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Score candidates, build a portfolio, then simulate and backtest it
    Plan {
        #[arg(short, long)]
        config: PathBuf,
        /// Directory holding candidates.csv and optional history/benchmark files
        #[arg(short, long)]
        data: PathBuf,
        /// Directory for CSV reports
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Score and rank candidates
    Score {
        #[arg(short, long)]
        data: PathBuf,
    },
    /// Project a single portfolio-level return and volatility
    Simulate {
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Expected annual return, percent
        #[arg(long = "return", allow_hyphen_values = true)]
        expected_return: f64,
        /// Annual volatility, percent
        #[arg(long)]
        volatility: f64,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Compare current holdings to a target allocation
    Drift {
        #[arg(long)]
        current: PathBuf,
        #[arg(long)]
        target: PathBuf,
        /// Percentage points of deviation that trigger a trade
        #[arg(long)]
        threshold: Option<f64>,
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Portfolio value used to size trades
        #[arg(long)]
        value: Option<f64>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Plan {
            config,
            data,
            output,
            seed,
        } => run_plan(&config, &data, output.as_ref(), seed),
        Command::Score { data } => run_score(&data),
        Command::Simulate {
            config,
            expected_return,
            volatility,
            seed,
        } => run_simulate(config.as_ref(), expected_return, volatility, seed),
        Command::Drift {
            current,
            target,
            threshold,
            config,
            value,
        } => run_drift(&current, &target, threshold, config.as_ref(), value),
        Command::Validate { config } => run_validate(&config),
    }
}

fn fail(err: FolioError) -> ExitCode {
    eprintln!("error: {err}");
    (&err).into()
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(fail)
}

pub fn build_constraints(config: &dyn ConfigPort) -> Result<Constraints, FolioError> {
    let profile: RiskProfile = config
        .get_string("portfolio", "profile")
        .ok_or_else(|| FolioError::ConfigMissing {
            section: "portfolio".into(),
            key: "profile".into(),
        })?
        .parse::<RiskProfile>()
        .map_err(|e| FolioError::invalid("portfolio", "profile", e))?;

    let mut c = Constraints::for_profile(profile);
    c.min_assets = config.get_int("portfolio", "min_assets", c.min_assets as i64).max(0) as usize;
    c.max_assets = config.get_int("portfolio", "max_assets", c.max_assets as i64).max(1) as usize;
    c.min_allocation = config.get_double("portfolio", "min_allocation", c.min_allocation);
    c.max_allocation = config.get_double("portfolio", "max_allocation", c.max_allocation);
    c.residual_allocation =
        config.get_double("portfolio", "residual_allocation", c.residual_allocation);
    c.min_quality = config.get_double("portfolio", "min_quality", c.min_quality);
    c.min_sharpe = config.get_double("portfolio", "min_sharpe", c.min_sharpe);
    c.risk_free_rate = config.get_double("portfolio", "risk_free_rate", c.risk_free_rate);
    c.required_benchmark_wins = config
        .get_int(
            "portfolio",
            "required_benchmark_wins",
            c.required_benchmark_wins as i64,
        )
        .max(0) as usize;

    if let Some(tier) = config.get_string("portfolio", "min_liquidity") {
        c.min_liquidity = tier
            .parse::<LiquidityTier>()
            .map_err(|e| FolioError::invalid("portfolio", "min_liquidity", e))?;
    }

    if let Some(raw) = config.get_string("portfolio", "buckets") {
        c.buckets = parse_weighted_list(&raw)
            .map_err(|e| FolioError::invalid("portfolio", "buckets", e))?
            .into_iter()
            .map(|(name, pct)| {
                Bucket::named(&name, pct, profile).ok_or_else(|| {
                    FolioError::invalid("portfolio", "buckets", format!("unknown bucket '{name}'"))
                })
            })
            .collect::<Result<_, _>>()?;
    }

    if let Some(raw) = config.get_string("portfolio", "benchmarks") {
        c.benchmark_targets = parse_weighted_list(&raw)
            .map_err(|e| FolioError::invalid("portfolio", "benchmarks", e))?
            .into_iter()
            .map(|(name, pct)| BenchmarkTarget::new(&name, pct))
            .collect();
    }

    Ok(c)
}

pub fn build_simulation_config(config: &dyn ConfigPort) -> Result<SimulationConfig, FolioError> {
    let defaults = SimulationConfig::default();
    let seed = match config.get_string("simulation", "seed") {
        Some(s) => Some(s.parse::<u64>().map_err(|_| {
            FolioError::invalid("simulation", "seed", "seed must be an unsigned integer")
        })?),
        None => None,
    };
    Ok(SimulationConfig {
        initial_amount: config.get_double("simulation", "initial_amount", defaults.initial_amount),
        periodic_contribution: config.get_double(
            "simulation",
            "periodic_contribution",
            defaults.periodic_contribution,
        ),
        horizon_periods: config
            .get_int("simulation", "horizon_periods", defaults.horizon_periods as i64)
            .max(0) as usize,
        periods_per_year: config
            .get_int("simulation", "periods_per_year", defaults.periods_per_year as i64)
            .max(1) as usize,
        trials: config
            .get_int("simulation", "trials", defaults.trials as i64)
            .max(0) as usize,
        seed,
    })
}

/// `as_of` defaults to today; the currency pair is optional.
pub fn build_backtest_settings(
    config: &dyn ConfigPort,
) -> Result<(NaiveDate, Option<CurrencyAdjustment>), FolioError> {
    let as_of = match config.get_string("backtest", "as_of") {
        Some(s) => parse_date(&s, "as_of")?,
        None => chrono::Local::now().date_naive(),
    };
    let currency = match (
        config.get_string("backtest", "from_currency"),
        config.get_string("backtest", "to_currency"),
    ) {
        (Some(from), Some(to)) => Some(CurrencyAdjustment {
            from,
            to,
            fx_appreciation: config.get_double("backtest", "fx_appreciation_pct", 0.0),
        }),
        _ => None,
    };
    Ok((as_of, currency))
}

pub fn build_plan_request(
    config: &dyn ConfigPort,
    data_port: &dyn DataPort,
    seed_override: Option<u64>,
) -> Result<PlanRequest, FolioError> {
    let constraints = build_constraints(config)?;
    let mut simulation = build_simulation_config(config)?;
    if seed_override.is_some() {
        simulation.seed = seed_override;
    }
    let (as_of, currency) = build_backtest_settings(config)?;

    Ok(PlanRequest {
        candidates: data_port.fetch_candidates()?,
        constraints,
        simulation,
        backtest: Some(BacktestInputs {
            as_of,
            history: data_port.fetch_history()?,
            benchmarks: data_port.fetch_benchmarks()?,
            currency,
        }),
    })
}

fn run_plan(
    config_path: &PathBuf,
    data_dir: &Path,
    output_dir: Option<&PathBuf>,
    seed: Option<u64>,
) -> ExitCode {
    info!(config = %config_path.display(), "loading config");
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    if let Err(e) = validate_engine_config(&config) {
        return fail(e);
    }

    let data_port = CsvAdapter::new(data_dir.to_path_buf());
    let request = match build_plan_request(&config, &data_port, seed) {
        Ok(r) => r,
        Err(e) => return fail(e),
    };
    info!(
        candidates = request.candidates.len(),
        trials = request.simulation.trials,
        "running plan"
    );

    let plan = build_plan(&request);
    print_plan(&plan);

    if let Some(dir) = output_dir {
        let dir = dir.display().to_string();
        if let Err(e) = CsvReportAdapter::new().write(&plan, &dir) {
            return fail(e);
        }
        println!("\nReports written to: {dir}");
    }
    ExitCode::SUCCESS
}

fn print_plan(plan: &InvestmentPlan) {
    let portfolio = &plan.portfolio;
    println!("=== Portfolio ({} holdings) ===", portfolio.len());
    for h in &portfolio.holdings {
        println!(
            "  {:<10} {:<16} {:<7} {:>6.2}%  ret {:>6.2}%  vol {:>6.2}%",
            h.symbol,
            h.asset_class.as_str(),
            h.bucket,
            h.weight,
            h.expected_return,
            h.volatility
        );
    }
    println!("\nExpected Return:  {:.2}%", portfolio.metrics.expected_return);
    println!("Volatility:       {:.2}%", portfolio.metrics.expected_volatility);
    println!("Sharpe Ratio:     {:.2}", portfolio.metrics.sharpe_ratio);
    println!(
        "Benchmarks Beaten: {}/{}{}",
        portfolio.check.benchmarks_beaten,
        portfolio.check.benchmarks_required,
        if portfolio.check.passed { "" } else { " (below target)" }
    );

    print_simulation(&plan.simulation);

    if let Some(bt) = &plan.backtest {
        println!("\n=== Ten-Year Backtest (to {}) ===", bt.as_of);
        println!(
            "  {:<20} {:>9.2}% total  {:>6.2}% p.a.",
            "portfolio", bt.portfolio.accumulated_return, bt.portfolio.annualized_return
        );
        for b in &bt.benchmarks {
            println!(
                "  {:<20} {:>9.2}% total  {:>6.2}% p.a.",
                b.name, b.accumulated_return, b.annualized_return
            );
        }
        if let Some(c) = &bt.currency {
            println!(
                "  (converted {} -> {}, native {:.2}%)",
                c.from, c.to, bt.portfolio_native.accumulated_return
            );
        }
    }
}

fn print_simulation(result: &SimulationResult) {
    println!("\n=== Simulation ===");
    if let Some(s) = &result.summary {
        println!("Trials:           {}", s.trials);
        println!("Contributed:      {:.2}", s.total_contributed);
        println!("Pessimistic:      {:.2}", s.pessimistic_value);
        println!("Expected:         {:.2}", s.expected_value);
        println!("Optimistic:       {:.2}", s.optimistic_value);
        println!("Mean:             {:.2}", s.mean_terminal_value);
        println!("P(loss):          {:.1}%", s.probability_of_loss * 100.0);
    } else if let Some(p) = result.terminal() {
        println!("Terminal value:   {:.2}", p.expected_value);
    } else {
        println!("No periods simulated");
    }
}

fn run_score(data_dir: &Path) -> ExitCode {
    let candidates = match CsvAdapter::new(data_dir.to_path_buf()).fetch_candidates() {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    let ranked = AssetScorer::new().rank(&candidates);

    println!(
        "{:>4}  {:<10} {:<16} {:>7} {:>9} {:>7} {:>7}  tier",
        "rank", "symbol", "class", "quality", "risk_adj", "divers", "liquid"
    );
    for (i, s) in ranked.iter().enumerate() {
        println!(
            "{:>4}  {:<10} {:<16} {:>7.1} {:>9.2} {:>7.1} {:>7.1}  {:?}",
            i + 1,
            s.symbol(),
            s.asset.asset_class.as_str(),
            s.quality_score,
            s.risk_adjusted_score,
            s.diversification_score,
            s.liquidity_score,
            s.liquidity_tier()
        );
    }
    ExitCode::SUCCESS
}

fn run_simulate(
    config_path: Option<&PathBuf>,
    expected_return: f64,
    volatility: f64,
    seed: Option<u64>,
) -> ExitCode {
    let mut sim_config = match config_path {
        Some(path) => {
            let config = match load_config(path) {
                Ok(c) => c,
                Err(code) => return code,
            };
            if let Err(e) = validate_simulation_config(&config) {
                return fail(e);
            }
            match build_simulation_config(&config) {
                Ok(c) => c,
                Err(e) => return fail(e),
            }
        }
        None => SimulationConfig::default(),
    };
    if seed.is_some() {
        sim_config.seed = seed;
    }

    let result = SimulationEngine::new(sim_config).run_portfolio(expected_return, volatility);
    println!("period,pessimistic,expected,optimistic");
    for p in &result.points {
        println!(
            "{},{:.2},{:.2},{:.2}",
            p.period, p.pessimistic_value, p.expected_value, p.optimistic_value
        );
    }
    print_simulation(&result);
    ExitCode::SUCCESS
}

fn run_drift(
    current_path: &Path,
    target_path: &Path,
    threshold: Option<f64>,
    config_path: Option<&PathBuf>,
    value: Option<f64>,
) -> ExitCode {
    let configured = match config_path {
        Some(path) => {
            let config = match load_config(path) {
                Ok(c) => c,
                Err(code) => return code,
            };
            if let Err(e) = validate_drift_config(&config) {
                return fail(e);
            }
            Some(config.get_double("drift", "threshold", DriftMonitor::default().threshold))
        }
        None => None,
    };
    let threshold = threshold
        .or(configured)
        .unwrap_or(DriftMonitor::default().threshold);
    if threshold <= 0.0 || threshold >= 100.0 {
        return fail(FolioError::invalid(
            "drift",
            "threshold",
            "threshold must be between 0 and 100",
        ));
    }

    let current = match read_allocations(current_path) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    let target = match read_allocations(target_path) {
        Ok(t) => t,
        Err(e) => return fail(e),
    };

    let report = DriftMonitor::new(threshold).report(&current, &target);
    print_drift(&report, value);
    ExitCode::SUCCESS
}

fn print_drift(report: &DriftReport, value: Option<f64>) {
    println!("symbol,current,target,deviation,deviation_pct,action,priority,amount");
    for row in &report.rows {
        let amount = match (row.action, value) {
            (RebalanceKind::Hold, _) | (_, None) => String::new(),
            (_, Some(v)) => format!("{:.2}", row.trade_amount(v)),
        };
        println!(
            "{},{:.2},{:.2},{:.2},{:.2},{},{},{}",
            row.symbol,
            row.current_weight,
            row.target_weight,
            row.deviation,
            row.deviation_percent,
            row.action,
            row.priority,
            amount
        );
    }
    if report.needs_rebalance {
        eprintln!("Rebalance needed: max deviation {:.2} points", report.max_deviation);
    } else {
        eprintln!("Within threshold: max deviation {:.2} points", report.max_deviation);
    }
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    if let Err(e) = validate_engine_config(&config) {
        return fail(e);
    }
    let result = build_constraints(&config)
        .and_then(|c| build_simulation_config(&config).map(|s| (c, s)));
    match result {
        Ok((constraints, simulation)) => {
            eprintln!("  profile:  {}", constraints.profile);
            eprintln!("  assets:   {}-{}", constraints.min_assets, constraints.max_assets);
            eprintln!(
                "  buckets:  {}",
                if constraints.buckets.is_empty() {
                    "all".to_string()
                } else {
                    constraints
                        .buckets
                        .iter()
                        .map(|b| format!("{}:{}", b.name, b.target_percent))
                        .collect::<Vec<_>>()
                        .join(", ")
                }
            );
            eprintln!("  trials:   {}", simulation.trials);
            eprintln!("Config validated successfully");
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    #[test]
    fn constraints_from_config() {
        let c = build_constraints(&adapter(
            "[portfolio]\nprofile = aggressive\nmax_assets = 8\nmin_liquidity = medium\n\
             buckets = equity:80, stock:20\nbenchmarks = world:9\nrequired_benchmark_wins = 1\n",
        ))
        .unwrap();
        assert_eq!(c.profile, RiskProfile::Aggressive);
        assert_eq!(c.max_assets, 8);
        assert_eq!(c.max_allocation, 25.0);
        assert_eq!(c.min_liquidity, LiquidityTier::Medium);
        assert_eq!(c.buckets.len(), 2);
        assert_eq!(c.buckets[1].name, "stock");
        assert_eq!(c.buckets[1].target_percent, 20.0);
        assert_eq!(c.benchmark_targets, vec![BenchmarkTarget::new("world", 9.0)]);
        assert_eq!(c.required_benchmark_wins, 1);
    }

    #[test]
    fn constraints_need_a_profile() {
        let err = build_constraints(&adapter("[portfolio]\nmax_assets = 8\n")).unwrap_err();
        assert!(matches!(err, FolioError::ConfigMissing { .. }));
    }

    #[test]
    fn simulation_defaults_and_overrides() {
        let s = build_simulation_config(&adapter("[simulation]\ntrials = 250\nseed = 7\n")).unwrap();
        assert_eq!(s.trials, 250);
        assert_eq!(s.seed, Some(7));
        assert_eq!(s.horizon_periods, 12);
        assert_eq!(s.initial_amount, 10_000.0);
    }

    #[test]
    fn backtest_settings_with_currency() {
        let (as_of, currency) = build_backtest_settings(&adapter(
            "[backtest]\nas_of = 2024-06-30\nfrom_currency = USD\nto_currency = EUR\nfx_appreciation_pct = -3\n",
        ))
        .unwrap();
        assert_eq!(as_of, NaiveDate::from_ymd_opt(2024, 6, 30).unwrap());
        let c = currency.unwrap();
        assert_eq!((c.from.as_str(), c.to.as_str()), ("USD", "EUR"));
        assert_eq!(c.fx_appreciation, -3.0);
    }

    #[test]
    fn backtest_settings_without_currency() {
        let (_, currency) = build_backtest_settings(&adapter("[backtest]\nas_of = 2024-06-30\n")).unwrap();
        assert!(currency.is_none());
    }
}
