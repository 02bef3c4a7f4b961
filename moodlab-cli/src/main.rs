//! MoodLab CLI: sentiment-signal backtests from the command line.
//!
//! Commands:
//! - `backtest`: run one parameter set and save `summary.json` + `trades.csv`
//! - `sweep`: run a parameter grid and save `sweep.csv` + `sweep.json`
//! - `evaluate`: compute metrics from an existing trade-log CSV
//! - `signals`: turn labelled sentiment records into BUY/SELL/HOLD signals

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use moodlab_core::signals::{SignalGenerator, DEFAULT_TREND_THRESHOLD, DEFAULT_TREND_WINDOW};
use moodlab_core::StrategyParams;
use moodlab_runner::data_loader::{load_sentiment, load_trades};
use moodlab_runner::export::{
    export_signals_csv, export_summary_json, export_sweep_json, save_artifacts, save_sweep,
};
use moodlab_runner::runner::log_summary;
use moodlab_runner::{
    run_prepared, synthetic_prices, synthetic_signals, BacktestConfig, BacktestResult, ParamSweep,
    PreparedData, RunResult, SweepAxes, SweepResults,
};

#[derive(Parser)]
#[command(
    name = "moodlab",
    about = "MoodLab CLI: backtest sentiment-driven trading signals"
)]
struct Cli {
    /// Log at debug level (every trade). RUST_LOG takes precedence.
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single backtest.
    Backtest {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        strategy: StrategyArgs,

        /// Print the full result as JSON instead of a summary.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Run every combination of the configured sweep axes.
    Sweep {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        strategy: StrategyArgs,

        /// Use the built-in ATR / take-profit / RSI grid instead of the config's axes.
        #[arg(long, default_value_t = false)]
        default_grid: bool,

        /// Run combinations one at a time.
        #[arg(long, default_value_t = false)]
        sequential: bool,

        /// Rows to print, best ROI first.
        #[arg(long, default_value_t = 10)]
        top: usize,

        /// Print the sweep table as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Compute metrics from an existing trade-log CSV.
    Evaluate {
        /// Trade log with columns action, timestamp, price[, stop_loss].
        #[arg(long)]
        trades: PathBuf,

        /// Balance the first BUY was funded with.
        #[arg(long, default_value_t = 1000.0)]
        capital: f64,

        /// Print metrics as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Generate trading signals from labelled sentiment records.
    Signals {
        /// CSV with a timestamp column and a sentiment_label column.
        #[arg(long)]
        sentiment: PathBuf,

        /// Rolling window, in records.
        #[arg(long, default_value_t = DEFAULT_TREND_WINDOW)]
        window: usize,

        /// Trend level a BUY or SELL must exceed.
        #[arg(long, default_value_t = DEFAULT_TREND_THRESHOLD)]
        threshold: f64,

        /// Output CSV. Defaults to stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Args)]
struct InputArgs {
    /// Path to a TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Price CSV (overrides [data].prices).
    #[arg(long)]
    prices: Option<PathBuf>,

    /// Signal CSV (overrides [data].signals).
    #[arg(long)]
    signals: Option<PathBuf>,

    /// Use seeded synthetic prices and signals instead of files.
    #[arg(long, default_value_t = false)]
    synthetic: bool,

    /// Bar count for --synthetic.
    #[arg(long, default_value_t = 500)]
    bars: usize,

    /// Seed label for --synthetic.
    #[arg(long, default_value = "moodlab")]
    seed: String,

    /// Output directory (overrides [output].dir).
    #[arg(long)]
    out: Option<PathBuf>,
}

/// Per-field overrides of the `[strategy]` section.
#[derive(Args)]
struct StrategyArgs {
    #[arg(long)]
    capital: Option<f64>,
    #[arg(long)]
    stop_loss: Option<f64>,
    #[arg(long)]
    take_profit: Option<f64>,
    /// Enables ATR mode with this multiplier.
    #[arg(long)]
    atr: Option<f64>,
    #[arg(long)]
    ma_window: Option<usize>,
    #[arg(long)]
    rsi_overbought: Option<f64>,
    #[arg(long)]
    rsi_floor: Option<f64>,
    #[arg(long)]
    min_confidence: Option<f64>,
}

impl StrategyArgs {
    fn apply(&self, params: &mut StrategyParams) {
        if let Some(v) = self.capital {
            params.initial_capital = v;
        }
        if let Some(v) = self.stop_loss {
            params.stop_loss_pct = v;
        }
        if let Some(v) = self.take_profit {
            params.take_profit_pct = v;
        }
        if self.atr.is_some() {
            params.atr_multiplier = self.atr;
        }
        if let Some(v) = self.ma_window {
            params.ma_window = v;
        }
        if let Some(v) = self.rsi_overbought {
            params.rsi_overbought = v;
        }
        if let Some(v) = self.rsi_floor {
            params.rsi_floor = v;
        }
        if let Some(v) = self.min_confidence {
            params.min_confidence = v;
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Backtest {
            input,
            strategy,
            json,
        } => run_backtest_cmd(&input, &strategy, json),
        Commands::Sweep {
            input,
            strategy,
            default_grid,
            sequential,
            top,
            json,
        } => run_sweep_cmd(&input, &strategy, default_grid, sequential, top, json),
        Commands::Evaluate {
            trades,
            capital,
            json,
        } => run_evaluate_cmd(&trades, capital, json),
        Commands::Signals {
            sentiment,
            window,
            threshold,
            out,
        } => run_signals_cmd(&sentiment, window, threshold, out.as_deref()),
    }
}

/// Merge the config file (if any) with command-line overrides.
fn resolve_config(input: &InputArgs, strategy: &StrategyArgs) -> Result<BacktestConfig> {
    let mut config = match &input.config {
        Some(path) => BacktestConfig::from_file(path)?,
        None => BacktestConfig::default(),
    };
    if let Some(p) = &input.prices {
        config.data.prices = Some(p.clone());
    }
    if let Some(s) = &input.signals {
        config.data.signals = Some(s.clone());
    }
    if let Some(o) = &input.out {
        config.output.dir = o.clone();
    }
    strategy.apply(&mut config.strategy);
    config.strategy.validate()?;
    Ok(config)
}

fn prepare_data(input: &InputArgs, config: &BacktestConfig) -> Result<PreparedData> {
    if input.synthetic {
        let prices = synthetic_prices(input.bars, &input.seed);
        let signals = synthetic_signals(&prices, &input.seed);
        info!(bars = prices.len(), signals = signals.len(), seed = %input.seed, "using synthetic data");
        return Ok(PreparedData::new(prices, &signals));
    }
    let Some(prices) = config.data.prices.as_deref() else {
        bail!("no price data: pass --prices, set [data].prices, or use --synthetic");
    };
    let data = PreparedData::load(prices, config.data.signals.as_deref())
        .with_context(|| format!("failed to load {}", prices.display()))?;
    Ok(data)
}

fn run_backtest_cmd(input: &InputArgs, strategy: &StrategyArgs, json: bool) -> Result<()> {
    let config = resolve_config(input, strategy)?;
    let data = prepare_data(input, &config)?;
    let result = run_prepared(&data, &config.strategy)?;
    log_summary(&result);

    if json {
        println!("{}", export_summary_json(&result)?);
    } else {
        print_summary(&result);
    }

    let run_dir = save_artifacts(&result, &config.output.dir)?;
    println!("Artifacts saved to: {}", run_dir.display());
    Ok(())
}

fn run_sweep_cmd(
    input: &InputArgs,
    strategy: &StrategyArgs,
    default_grid: bool,
    sequential: bool,
    top: usize,
    json: bool,
) -> Result<()> {
    let config = resolve_config(input, strategy)?;
    let data = prepare_data(input, &config)?;
    let axes = if default_grid {
        SweepAxes::default_grid()
    } else {
        config.sweep.axes.clone()
    };
    let parallel = config.sweep.parallel && !sequential;

    info!(combinations = axes.size(), parallel, "starting sweep");
    let results = ParamSweep::new()
        .with_parallelism(parallel)
        .run(&axes, &config.strategy, &data)?;

    if json {
        println!("{}", export_sweep_json(&results)?);
    } else {
        print_sweep(&results, top);
    }

    let csv_path = save_sweep(&results, &config.output.dir)?;
    println!("Sweep table saved to: {}", csv_path.display());
    Ok(())
}

fn run_evaluate_cmd(trades: &Path, capital: f64, json: bool) -> Result<()> {
    let trades =
        load_trades(trades).with_context(|| format!("failed to load {}", trades.display()))?;
    let metrics = RunResult::evaluate(&trades, capital);
    if json {
        println!("{}", serde_json::to_string_pretty(&metrics)?);
        return Ok(());
    }
    println!();
    println!("=== Trade Log Evaluation ===");
    println!("Trades:         {} ({} round trips)", trades.len(), metrics.trade_count);
    print_metrics(&metrics);
    Ok(())
}

fn run_signals_cmd(sentiment: &Path, window: usize, threshold: f64, out: Option<&Path>) -> Result<()> {
    let records = load_sentiment(sentiment)
        .with_context(|| format!("failed to load {}", sentiment.display()))?;
    let generated = SignalGenerator::new(window, threshold)?.generate(&records);
    let csv = export_signals_csv(&generated)?;
    match out {
        Some(path) => {
            std::fs::write(path, csv)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(records = records.len(), path = %path.display(), "signals written");
        }
        None => print!("{csv}"),
    }
    Ok(())
}

fn format_profit_factor(v: f64) -> String {
    if v.is_infinite() {
        "inf".to_string()
    } else {
        format!("{v:.2}")
    }
}

fn print_metrics(m: &RunResult) {
    println!();
    println!("--- Performance ---");
    println!("Final Balance:  {:.2}", m.final_balance);
    println!("ROI:            {:.2}%", m.roi_pct);
    println!("Win Rate:       {:.1}%", m.win_rate * 100.0);
    println!("Max Drawdown:   {:.2}%", m.max_drawdown_pct);
    println!("Profit Factor:  {}", format_profit_factor(m.profit_factor));
    println!("Sharpe:         {:.3}", m.sharpe_ratio);
    println!();
}

fn print_summary(result: &BacktestResult) {
    println!();
    println!("=== Backtest Result ===");
    println!("Run:            {}", result.run_id);
    println!("Params:         {}", result.params.label());
    println!(
        "Bars:           {} ({} warmup)",
        result.bar_count, result.warmup_skipped
    );
    println!("Signals:        {}", result.signal_count);
    println!("Trades:         {}", result.metrics.trade_count);
    println!("Dataset:        {}", result.dataset_hash);
    print_metrics(&result.metrics);
    for warn in &result.warnings {
        println!("WARNING: {warn}");
    }
}

fn print_sweep(results: &SweepResults, top: usize) {
    let failed = results.all().iter().filter(|r| !r.is_ok()).count();
    println!();
    println!(
        "=== Sweep: {} combinations, {} failed ===",
        results.len(),
        failed
    );
    println!(
        "{:>4}  {:<44}  {:>9}  {:>6}  {:>8}  {:>6}  {:>7}  {:>6}",
        "#", "params", "ROI %", "win %", "max DD %", "PF", "sharpe", "trades"
    );
    for row in results.top_n(top) {
        match &row.result {
            Some(m) => println!(
                "{:>4}  {:<44}  {:>9.2}  {:>6.1}  {:>8.2}  {:>6}  {:>7.3}  {:>6}",
                row.index,
                row.params.label(),
                m.roi_pct,
                m.win_rate * 100.0,
                m.max_drawdown_pct,
                format_profit_factor(m.profit_factor),
                m.sharpe_ratio,
                m.trade_count
            ),
            None => println!(
                "{:>4}  {:<44}  error: {}",
                row.index,
                row.params.label(),
                row.error.as_deref().unwrap_or("unknown")
            ),
        }
    }
    println!();
}
