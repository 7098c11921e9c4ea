//! Command Line Interface for the LP PnL decomposition.
mod output;

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand, ValueEnum};
use clmm_lvr_backtest::{
    Backtest, BacktestConfig, BacktestError, CompletedRun, Objective, ParamSweep, RangeSpec,
};
use clmm_lvr_data::repositories::{PriceRepository, PriceSeriesSource, ResultRepository};
use clmm_lvr_domain::entities::CandleSeries;
use clmm_lvr_domain::enums::{FeeMode, InterestMode, PoolKind, VolumeSource};
use clmm_lvr_domain::math::Reserves;
use dotenv::dotenv;
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "clmm-lvr")]
#[command(about = "Fee, LVR, impermanent loss and opportunity cost decomposition for CLMM positions", long_about = None)]
struct Cli {
    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decompose one position over the trailing window
    Backtest {
        #[command(flatten)]
        run: RunArgs,

        #[command(flatten)]
        range: RangeArgs,

        #[command(flatten)]
        deposit: DepositArgs,

        /// Also run a full-range position with the same capital and fees
        #[arg(long)]
        compare: bool,
    },
    /// Run the configured parameter grid and rank the completed runs
    Sweep {
        #[command(flatten)]
        run: RunArgs,

        /// Ranking objective
        #[arg(long, value_enum, default_value_t = ObjectiveArg::NetPnl)]
        objective: ObjectiveArg,

        /// Ranked rows to print
        #[arg(long, default_value_t = 10)]
        top: usize,

        /// Run grid points one after another
        #[arg(long)]
        sequential: bool,
    },
}

#[derive(Args)]
struct RunArgs {
    /// OHLCV price history (CSV with header)
    #[arg(short, long)]
    prices: PathBuf,

    /// TOML config file; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Days of history ending at the last candle
    #[arg(short = 'd', long)]
    window_days: Option<u32>,

    /// Capital committed at entry, in quote currency
    #[arg(long)]
    capital: Option<Decimal>,

    /// Pool curve
    #[arg(long, value_enum)]
    pool: Option<PoolArg>,

    /// Fee policy
    #[arg(long, value_enum)]
    fee_mode: Option<FeeModeArg>,

    /// Base fee in basis points
    #[arg(long)]
    base_fee_bps: Option<Decimal>,

    /// Dynamic fee sensitivity to the oracle step
    #[arg(long)]
    fee_k: Option<Decimal>,

    /// Dynamic fee floor in basis points
    #[arg(long)]
    min_fee_bps: Option<Decimal>,

    /// Dynamic fee cap in basis points
    #[arg(long)]
    max_fee_bps: Option<Decimal>,

    /// Regime fee in calm steps, in basis points
    #[arg(long)]
    calm_fee_bps: Option<Decimal>,

    /// Regime fee while rolling volatility is above its mean, in basis points
    #[arg(long)]
    volatile_fee_bps: Option<Decimal>,

    /// Steps in the rolling volatility window of the regime fee
    #[arg(long)]
    volatility_window: Option<usize>,

    /// Annual rate of the interest-bearing alternative (0.08 = 8%)
    #[arg(long)]
    rate: Option<Decimal>,

    /// Interest accrual
    #[arg(long, value_enum)]
    interest: Option<InterestArg>,

    /// Source of fee-generating volume
    #[arg(long, value_enum)]
    volume: Option<VolumeArg>,

    /// Output directory
    #[arg(short, long, default_value = "output")]
    out: PathBuf,

    /// Base name for output files
    #[arg(long)]
    name: Option<String>,
}

impl RunArgs {
    fn backtest_config(&self) -> Result<BacktestConfig> {
        let mut config = match &self.config {
            Some(path) => BacktestConfig::load(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => BacktestConfig::default(),
        };

        if let Some(days) = self.window_days {
            config.window_days = days;
        }
        if let Some(capital) = self.capital {
            config.capital_value = capital;
        }
        if let Some(pool) = self.pool {
            config.pool = pool.into();
        }
        if let Some(mode) = self.fee_mode {
            config.fee_policy.mode = mode.into();
        }
        if let Some(bps) = self.base_fee_bps {
            config.fee_policy.base_bps = bps;
        }
        if let Some(k) = self.fee_k {
            config.fee_policy.sensitivity_k = k;
        }
        if let Some(bps) = self.min_fee_bps {
            config.fee_policy.min_bps = bps;
        }
        if let Some(bps) = self.max_fee_bps {
            config.fee_policy.max_bps = bps;
        }
        if let Some(bps) = self.calm_fee_bps {
            config.fee_policy.calm_bps = bps;
        }
        if let Some(bps) = self.volatile_fee_bps {
            config.fee_policy.volatile_bps = bps;
        }
        if let Some(window) = self.volatility_window {
            config.fee_policy.volatility_window = window;
        }
        if let Some(rate) = self.rate {
            config.annual_interest_rate = rate;
        }
        if let Some(mode) = self.interest {
            config.interest_mode = mode.into();
        }
        if let Some(source) = self.volume {
            config.volume_source = source.into();
        }
        Ok(config)
    }

    fn name_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.name.as_deref().unwrap_or(default)
    }
}

#[derive(Args)]
struct RangeArgs {
    /// Lower price bound
    #[arg(long, requires = "upper", conflicts_with_all = ["width", "lower_tick"])]
    lower: Option<Decimal>,

    /// Upper price bound
    #[arg(long, requires = "lower")]
    upper: Option<Decimal>,

    /// Half-width around the entry price as a fraction (0.10 = +/-10%)
    #[arg(long, conflicts_with = "lower_tick")]
    width: Option<Decimal>,

    /// Lower tick
    #[arg(long, requires = "upper_tick", allow_negative_numbers = true)]
    lower_tick: Option<i32>,

    /// Upper tick
    #[arg(long, requires = "lower_tick", allow_negative_numbers = true)]
    upper_tick: Option<i32>,
}

impl RangeArgs {
    fn spec(&self) -> Option<RangeSpec> {
        match (self.lower, self.upper, self.width, self.lower_tick, self.upper_tick) {
            (Some(lower), Some(upper), ..) => Some(RangeSpec::Bounds { lower, upper }),
            (_, _, Some(width), ..) => Some(RangeSpec::Width { width }),
            (_, _, _, Some(lower_tick), Some(upper_tick)) => Some(RangeSpec::Ticks {
                lower_tick,
                upper_tick,
            }),
            _ => None,
        }
    }
}

#[derive(Args)]
struct DepositArgs {
    /// Base tokens deposited at entry; sizes the position instead of --capital
    #[arg(long, requires = "deposit_quote", conflicts_with = "capital")]
    deposit_base: Option<Decimal>,

    /// Quote tokens deposited at entry
    #[arg(long, requires = "deposit_base")]
    deposit_quote: Option<Decimal>,
}

impl DepositArgs {
    fn reserves(&self) -> Option<Reserves> {
        Some(Reserves {
            base: self.deposit_base?,
            quote: self.deposit_quote?,
        })
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum PoolArg {
    Concentrated,
    ConstantProduct,
}

impl From<PoolArg> for PoolKind {
    fn from(arg: PoolArg) -> Self {
        match arg {
            PoolArg::Concentrated => PoolKind::Concentrated,
            PoolArg::ConstantProduct => PoolKind::ConstantProduct,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum FeeModeArg {
    Static,
    Dynamic,
    Regime,
}

impl From<FeeModeArg> for FeeMode {
    fn from(arg: FeeModeArg) -> Self {
        match arg {
            FeeModeArg::Static => FeeMode::Static,
            FeeModeArg::Dynamic => FeeMode::Dynamic,
            FeeModeArg::Regime => FeeMode::Regime,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum InterestArg {
    Simple,
    Compound,
}

impl From<InterestArg> for InterestMode {
    fn from(arg: InterestArg) -> Self {
        match arg {
            InterestArg::Simple => InterestMode::Simple,
            InterestArg::Compound => InterestMode::Compound,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum VolumeArg {
    Arbitrage,
    Observed,
}

impl From<VolumeArg> for VolumeSource {
    fn from(arg: VolumeArg) -> Self {
        match arg {
            VolumeArg::Arbitrage => VolumeSource::Arbitrage,
            VolumeArg::Observed => VolumeSource::Observed,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ObjectiveArg {
    NetPnl,
    Fees,
    Lvr,
    FeeLvrRatio,
}

impl From<ObjectiveArg> for Objective {
    fn from(arg: ObjectiveArg) -> Self {
        match arg {
            ObjectiveArg::NetPnl => Objective::NetPnl,
            ObjectiveArg::Fees => Objective::Fees,
            ObjectiveArg::Lvr => Objective::Lvr,
            ObjectiveArg::FeeLvrRatio => Objective::FeeLvrRatio,
        }
    }
}

fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to init logging: {}", e))?;

    Ok(())
}

fn load_prices(path: &Path) -> Result<CandleSeries> {
    PriceRepository::new(path)
        .load()
        .with_context(|| format!("failed to load prices from {}", path.display()))
}

/// Saves the partial rows of a halted run and describes the failure.
fn halted(repo: &ResultRepository, name: &str, error: BacktestError) -> anyhow::Error {
    match error {
        BacktestError::Incomplete(incomplete) => {
            match repo.save_results(&format!("{name}_incomplete"), &incomplete.partial) {
                Ok(path) => anyhow!(
                    "{incomplete}; {} partial rows saved to {}",
                    incomplete.partial.len(),
                    path.display()
                ),
                Err(e) => anyhow::Error::new(e)
                    .context(format!("{incomplete}; partial rows could not be saved")),
            }
        }
        e => anyhow::Error::new(e).context("backtest failed"),
    }
}

fn save_run(repo: &ResultRepository, name: &str, run: &CompletedRun, config: &BacktestConfig) -> Result<()> {
    let results = repo.save_results(name, &run.decomposition.results)?;
    let report = output::RunReport::new(run, config);
    let summary = repo.save_summary(&format!("{name}_summary"), &report)?;

    println!("\n📊 Decomposition for {}", run.key);
    output::print_summary(run);
    println!("Results: {}", results.display());
    println!("Summary: {}", summary.display());
    Ok(())
}

fn run_backtest(args: &RunArgs, range: &RangeArgs, deposit: &DepositArgs, compare: bool) -> Result<()> {
    let mut config = args.backtest_config()?;
    if let Some(spec) = range.spec() {
        config.range = spec;
    }
    if let Some(reserves) = deposit.reserves() {
        config.deposit = Some(reserves);
    }
    let backtest = Backtest::new(config).context("invalid backtest configuration")?;
    let series = load_prices(&args.prices)?;
    let repo = ResultRepository::new(&args.out);
    let name = args.name_or("backtest");

    println!(
        "🚀 Decomposing {} candles ({} day window)...",
        series.len(),
        backtest.config().window_days
    );

    if !compare {
        let run = backtest.run(&series).map_err(|e| halted(&repo, name, e))?;
        return save_run(&repo, name, &run, backtest.config());
    }

    let comparison = backtest.compare(&series).map_err(|e| halted(&repo, name, e))?;
    let twin = backtest.config().clone().with_pool(PoolKind::ConstantProduct);
    save_run(&repo, name, &comparison.position, backtest.config())?;
    save_run(&repo, &format!("{name}_full_range"), &comparison.full_range, &twin)?;
    println!("\n⚖️  Against a full-range position");
    output::print_comparison(&comparison);
    Ok(())
}

fn run_sweep(args: &RunArgs, objective: ObjectiveArg, top: usize, sequential: bool) -> Result<()> {
    let config = args.backtest_config()?;
    let grid = config.sweep.clone().unwrap_or_default();
    let mut sweep = ParamSweep::new(&config, &grid).context("invalid sweep grid")?;
    if sequential {
        sweep = sweep.with_parallelism(false);
    }
    let series = load_prices(&args.prices)?;

    println!("🔍 Sweeping {} parameter combinations...", sweep.len());
    let outcome = sweep.run(&series).context("sweep could not start")?;

    for (key, incomplete) in outcome.incomplete() {
        warn!(key = %key, error = %incomplete.error, rows = incomplete.partial.len(), "Run incomplete");
    }

    let table = ResultRepository::new(&args.out)
        .save_sweep_table(args.name_or("sweep"), &outcome.table_rows())?;

    let objective = Objective::from(objective).function();
    let ranked = outcome.ranked(objective.as_ref());
    println!(
        "\n🏆 {} of {} runs completed, top {} shown",
        ranked.len(),
        outcome.len(),
        top.min(ranked.len())
    );
    output::print_ranking(&ranked, top);
    println!("Sweep table: {}", table.display());
    Ok(())
}

fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    match &cli.command {
        Commands::Backtest {
            run,
            range,
            deposit,
            compare,
        } => run_backtest(run, range, deposit, *compare),
        Commands::Sweep {
            run,
            objective,
            top,
            sequential,
        } => run_sweep(run, *objective, *top, *sequential),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("clmm-lvr").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_flags_override_defaults() {
        let cli = parse(&[
            "backtest", "--prices", "p.csv", "--lower", "9.5", "--upper", "10.5", "--fee-mode",
            "static", "--base-fee-bps", "30", "--rate", "0.05", "--volume", "observed",
        ]);
        let Commands::Backtest { run, range, .. } = cli.command else {
            panic!("expected backtest");
        };
        let config = run.backtest_config().unwrap();
        assert_eq!(config.fee_policy.mode, FeeMode::Static);
        assert_eq!(config.fee_policy.base_bps, Decimal::from(30));
        assert_eq!(config.annual_interest_rate, Decimal::new(5, 2));
        assert_eq!(config.volume_source, VolumeSource::Observed);
        assert_eq!(config.window_days, 90);
        assert_eq!(
            range.spec(),
            Some(RangeSpec::Bounds {
                lower: Decimal::new(95, 1),
                upper: Decimal::new(105, 1)
            })
        );
    }

    #[test]
    fn test_range_flags() {
        let cli = parse(&["backtest", "-p", "p.csv", "--lower-tick", "-100", "--upper-tick", "100"]);
        let Commands::Backtest { range, .. } = cli.command else {
            panic!("expected backtest");
        };
        assert_eq!(
            range.spec(),
            Some(RangeSpec::Ticks {
                lower_tick: -100,
                upper_tick: 100
            })
        );

        assert!(
            Cli::try_parse_from(["clmm-lvr", "backtest", "-p", "p.csv", "--lower", "9"]).is_err()
        );
        assert!(
            Cli::try_parse_from([
                "clmm-lvr", "backtest", "-p", "p.csv", "--width", "0.1", "--lower", "9", "--upper",
                "11"
            ])
            .is_err()
        );
    }

    #[test]
    fn test_sweep_options() {
        let cli = parse(&["sweep", "-p", "p.csv", "--objective", "fee-lvr-ratio", "--sequential"]);
        let Commands::Sweep {
            objective,
            sequential,
            top,
            run,
        } = cli.command
        else {
            panic!("expected sweep");
        };
        assert_eq!(Objective::from(objective), Objective::FeeLvrRatio);
        assert!(sequential);
        assert_eq!(top, 10);
        assert_eq!(run.name_or("sweep"), "sweep");
    }

    #[test]
    fn test_pool_regime_and_deposit_flags() {
        let cli = parse(&[
            "backtest", "-p", "p.csv", "--pool", "constant-product", "--fee-mode", "regime",
            "--calm-fee-bps", "25", "--volatile-fee-bps", "60", "--volatility-window", "12",
            "--deposit-base", "1000", "--deposit-quote", "18500", "--compare",
        ]);
        let Commands::Backtest {
            run,
            deposit,
            compare,
            ..
        } = cli.command
        else {
            panic!("expected backtest");
        };
        let config = run.backtest_config().unwrap();
        assert_eq!(config.pool, PoolKind::ConstantProduct);
        assert_eq!(config.fee_policy.mode, FeeMode::Regime);
        assert_eq!(config.fee_policy.calm_bps, Decimal::from(25));
        assert_eq!(config.fee_policy.volatile_bps, Decimal::from(60));
        assert_eq!(config.fee_policy.volatility_window, 12);
        assert_eq!(
            deposit.reserves(),
            Some(Reserves {
                base: Decimal::from(1000),
                quote: Decimal::from(18500)
            })
        );
        assert!(compare);

        assert!(
            Cli::try_parse_from(["clmm-lvr", "backtest", "-p", "p.csv", "--deposit-base", "1"])
                .is_err()
        );
        assert!(
            Cli::try_parse_from([
                "clmm-lvr", "backtest", "-p", "p.csv", "--capital", "5", "--deposit-base", "1",
                "--deposit-quote", "1"
            ])
            .is_err()
        );
    }
}
