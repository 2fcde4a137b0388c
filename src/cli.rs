//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use log::{error, info};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::{sibling_path, CsvReportAdapter};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{run_backtest, BacktestConfig};
use crate::domain::config_validation::{
    validate_backtest_config, validate_known_keys, validate_strategy,
};
use crate::domain::error::SpytraderError;
use crate::domain::evaluator::Signal;
use crate::domain::metrics::Metrics;
use crate::domain::strategy::{
    MomentumParams, ReboundParams, SmaCrossoverParams, Strategy, StrategyId, StrategyKind,
};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

const DEFAULT_OUTPUT: &str = "strategy_results.csv";
const DEFAULT_COMPARISON_OUTPUT: &str = "strategy_comparison.csv";

#[derive(Parser, Debug)]
#[command(name = "spytrader", about = "Daily-bar strategy backtester for SPY")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one strategy over the configured data
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// buy_and_hold, sma_crossover, momentum or rebound
        #[arg(short, long)]
        strategy: Option<String>,
        #[arg(short, long)]
        data: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        cash: Option<f64>,
        #[arg(long)]
        commission: Option<f64>,
        /// Validate and print the resolved settings without running
        #[arg(long)]
        dry_run: bool,
    },
    /// Run every strategy over the same data and write one summary row each
    Compare {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        data: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show the date range of a data file
    Info {
        #[arg(short, long)]
        data: PathBuf,
    },
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub strategy: Option<String>,
    pub data: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub cash: Option<f64>,
    pub commission: Option<f64>,
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Backtest {
            config,
            strategy,
            data,
            output,
            cash,
            commission,
            dry_run,
        } => {
            let overrides = Overrides {
                strategy,
                data,
                output,
                cash,
                commission,
            };
            if dry_run {
                run_dry_run(&config, &overrides)
            } else {
                run_backtest_command(&config, &overrides)
            }
        }
        Command::Compare {
            config,
            data,
            output,
        } => run_compare(&config, data, output),
        Command::Validate { config } => run_validate(&config),
        Command::Info { data } => run_info(&data),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, SpytraderError> {
    info!("Loading config from {}", path.display());
    FileConfigAdapter::from_file(path)
}

pub fn build_backtest_config(
    adapter: &dyn ConfigPort,
    overrides: &Overrides,
) -> Result<BacktestConfig, SpytraderError> {
    validate_known_keys(adapter)?;
    let defaults = BacktestConfig::default();

    let data_path = match &overrides.data {
        Some(path) => path.clone(),
        None => adapter
            .get_string("backtest", "data_path")
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.data_path),
    };
    let initial_capital = match overrides.cash {
        Some(cash) => cash,
        None => adapter.get_double("backtest", "initial_capital", defaults.initial_capital)?,
    };
    let commission = match overrides.commission {
        Some(rate) => rate,
        None => adapter.get_double("backtest", "commission", defaults.commission)?,
    };

    let config = BacktestConfig {
        data_path,
        symbol: adapter
            .get_string("backtest", "symbol")
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.symbol),
        start_date: adapter.get_date("backtest", "start_date")?,
        end_date: adapter.get_date("backtest", "end_date")?,
        initial_capital,
        commission,
        risk_free_rate: adapter.get_double("backtest", "risk_free_rate", defaults.risk_free_rate)?,
    };
    validate_backtest_config(&config)?;
    Ok(config)
}

fn strategy_kind(adapter: &dyn ConfigPort, id: StrategyId) -> Result<StrategyKind, SpytraderError> {
    Ok(match id {
        StrategyId::BuyAndHold => StrategyKind::BuyAndHold,
        StrategyId::SmaCrossover => {
            let d = SmaCrossoverParams::default();
            let s = "sma_crossover";
            StrategyKind::SmaCrossover(SmaCrossoverParams {
                fast_period: adapter.get_usize(s, "fast_period", d.fast_period)?,
                slow_period: adapter.get_usize(s, "slow_period", d.slow_period)?,
            })
        }
        StrategyId::Momentum => {
            let d = MomentumParams::default();
            let s = "momentum";
            StrategyKind::Momentum(MomentumParams {
                fast_period: adapter.get_usize(s, "fast_period", d.fast_period)?,
                medium_period: adapter.get_usize(s, "medium_period", d.medium_period)?,
                rsi_period: adapter.get_usize(s, "rsi_period", d.rsi_period)?,
                rsi_oversold: adapter.get_double(s, "rsi_oversold", d.rsi_oversold)?,
                rsi_overbought: adapter.get_double(s, "rsi_overbought", d.rsi_overbought)?,
                trail_percent: adapter.get_double(s, "trail_percent", d.trail_percent)?,
                risk_per_trade: adapter.get_double(s, "risk_per_trade", d.risk_per_trade)?,
                require_macd_confirmation: adapter.get_bool(
                    s,
                    "require_macd_confirmation",
                    d.require_macd_confirmation,
                )?,
                macd_fast: adapter.get_usize(s, "macd_fast", d.macd_fast)?,
                macd_slow: adapter.get_usize(s, "macd_slow", d.macd_slow)?,
                macd_signal: adapter.get_usize(s, "macd_signal", d.macd_signal)?,
            })
        }
        StrategyId::Rebound => {
            let d = ReboundParams::default();
            let s = "rebound";
            StrategyKind::Rebound(ReboundParams {
                lookback: adapter.get_usize(s, "lookback", d.lookback)?,
                drop_threshold: adapter.get_double(s, "drop_threshold", d.drop_threshold)?,
                rise_threshold: adapter.get_double(s, "rise_threshold", d.rise_threshold)?,
                take_profit: adapter.get_double(s, "take_profit", d.take_profit)?,
                stop_loss: adapter.get_double(s, "stop_loss", d.stop_loss)?,
                max_holding_bars: adapter.get_usize(s, "max_holding_bars", d.max_holding_bars)?,
            })
        }
    })
}

/// Build and validate a strategy of the given kind from its config section.
pub fn build_strategy_of(adapter: &dyn ConfigPort, id: StrategyId) -> Result<Strategy, SpytraderError> {
    validate_known_keys(adapter)?;
    let strategy = Strategy {
        name: id.display_name().to_string(),
        kind: strategy_kind(adapter, id)?,
    };
    validate_strategy(&strategy)?;
    Ok(strategy)
}

/// Build the strategy named by `--strategy` or `[strategy] kind`.
pub fn build_strategy(
    adapter: &dyn ConfigPort,
    kind_override: Option<&str>,
) -> Result<Strategy, SpytraderError> {
    let raw = match kind_override {
        Some(kind) => kind.to_string(),
        None => adapter
            .get_string("strategy", "kind")
            .filter(|s| !s.is_empty())
            .ok_or_else(|| SpytraderError::ConfigMissing {
                section: "strategy".into(),
                key: "kind".into(),
            })?,
    };
    let id: StrategyId = raw
        .parse()
        .map_err(|reason: String| SpytraderError::invalid("strategy", "kind", reason))?;

    let mut strategy = build_strategy_of(adapter, id)?;
    let configured_kind = adapter
        .get_string("strategy", "kind")
        .and_then(|k| k.parse::<StrategyId>().ok());
    // A display name only applies to the kind it was written for.
    if configured_kind == Some(id) {
        if let Some(name) = adapter.get_string("strategy", "name").filter(|s| !s.is_empty()) {
            strategy.name = name;
        }
    }
    Ok(strategy)
}

fn output_path(adapter: &dyn ConfigPort, output: Option<&PathBuf>, default: &str) -> PathBuf {
    output.cloned().unwrap_or_else(|| {
        adapter
            .get_string("report", "output")
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(default))
    })
}

/// Load bars, replay them through `strategy` and write the reports.
pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    report_port: &dyn ReportPort,
    strategy: &Strategy,
    bt_config: &BacktestConfig,
    output: &Path,
) -> Result<Metrics, SpytraderError> {
    let bars = data_port.fetch_ohlcv(bt_config.start_date, bt_config.end_date)?;
    if let (Some(first), Some(last)) = (bars.first(), bars.last()) {
        info!("Loaded {} bars, {} to {}", bars.len(), first.date, last.date);
    }

    let result = run_backtest(&bars, strategy, bt_config);
    let metrics = Metrics::compute(&result.portfolio, bt_config.risk_free_rate);

    print_summary(strategy, &metrics, result.signal_count(Signal::EnterLong));
    report_port.write(&result, &metrics, strategy, output)?;
    Ok(metrics)
}

fn print_summary(strategy: &Strategy, metrics: &Metrics, entries: usize) {
    eprintln!("\n=== {} ===", strategy.name);
    eprintln!("Final Equity:     {:.2}", metrics.final_equity);
    eprintln!("Total Return:     {:.2}%", metrics.total_return * 100.0);
    eprintln!("Annualized:       {:.2}%", metrics.annualized_return * 100.0);
    eprintln!("Sharpe Ratio:     {:.2}", metrics.sharpe_ratio);
    eprintln!("Sortino Ratio:    {:.2}", metrics.sortino_ratio);
    eprintln!("Max Drawdown:     -{:.1}%", metrics.max_drawdown * 100.0);
    eprintln!("Entry Signals:    {}", entries);
    eprintln!("Total Trades:     {}", metrics.total_trades);
    eprintln!("Win Rate:         {:.1}%", metrics.win_rate * 100.0);
    eprintln!("Profit Factor:    {:.2}", metrics.profit_factor);
}

fn run_backtest_command(config_path: &Path, overrides: &Overrides) -> Result<(), SpytraderError> {
    let adapter = load_config(config_path)?;
    let bt_config = build_backtest_config(&adapter, overrides)?;
    let strategy = build_strategy(&adapter, overrides.strategy.as_deref())?;
    let output = output_path(&adapter, overrides.output.as_ref(), DEFAULT_OUTPUT);

    let data_port = CsvAdapter::new(&bt_config.data_path, &bt_config.symbol);
    run_backtest_pipeline(&data_port, &CsvReportAdapter, &strategy, &bt_config, &output)?;
    Ok(())
}

pub fn run_dry_run(config_path: &Path, overrides: &Overrides) -> Result<(), SpytraderError> {
    let adapter = load_config(config_path)?;
    let bt_config = build_backtest_config(&adapter, overrides)?;
    let strategy = build_strategy(&adapter, overrides.strategy.as_deref())?;
    let output = output_path(&adapter, overrides.output.as_ref(), DEFAULT_OUTPUT);
    eprintln!("Config validated successfully");

    eprintln!("\nBacktest:");
    eprintln!("  symbol:          {}", bt_config.symbol);
    eprintln!("  data:            {}", bt_config.data_path.display());
    eprintln!(
        "  range:           {} to {}",
        bt_config
            .start_date
            .map_or_else(|| "start".to_string(), |d| d.to_string()),
        bt_config
            .end_date
            .map_or_else(|| "end".to_string(), |d| d.to_string())
    );
    eprintln!("  initial capital: {:.2}", bt_config.initial_capital);
    eprintln!("  commission:      {}", bt_config.commission);

    eprintln!("\nStrategy: {} ({})", strategy.name, strategy.id());
    eprintln!("  {:?}", strategy.kind);

    let indicators = strategy.indicator_plan().indicator_types();
    eprintln!("\nIndicators to compute:");
    if indicators.is_empty() {
        eprintln!("  (none)");
    }
    for ind in &indicators {
        eprintln!("  {}", ind);
    }

    eprintln!("\nReports:");
    eprintln!("  {}", output.display());
    eprintln!("  {}", sibling_path(&output, "trades").display());
    eprintln!("  {}", sibling_path(&output, "summary").display());

    eprintln!("\nDry run complete: configuration is valid");
    Ok(())
}

fn run_compare(
    config_path: &Path,
    data: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<(), SpytraderError> {
    let adapter = load_config(config_path)?;
    let overrides = Overrides {
        data,
        ..Default::default()
    };
    let bt_config = build_backtest_config(&adapter, &overrides)?;
    let output = output.unwrap_or_else(|| PathBuf::from(DEFAULT_COMPARISON_OUTPUT));

    let strategies = StrategyId::ALL
        .iter()
        .map(|&id| build_strategy_of(&adapter, id))
        .collect::<Result<Vec<_>, _>>()?;

    let data_port = CsvAdapter::new(&bt_config.data_path, &bt_config.symbol);
    let bars = data_port.fetch_ohlcv(bt_config.start_date, bt_config.end_date)?;
    info!("Comparing {} strategies over {} bars", strategies.len(), bars.len());

    let mut runs = Vec::with_capacity(strategies.len());
    for strategy in strategies {
        let result = run_backtest(&bars, &strategy, &bt_config);
        let metrics = Metrics::compute(&result.portfolio, bt_config.risk_free_rate);
        print_summary(&strategy, &metrics, result.signal_count(Signal::EnterLong));
        runs.push((strategy, metrics));
    }

    CsvReportAdapter.write_comparison(&runs, &output)
}

fn run_validate(config_path: &Path) -> Result<(), SpytraderError> {
    let adapter = load_config(config_path)?;
    let bt_config = build_backtest_config(&adapter, &Overrides::default())?;
    eprintln!(
        "Backtest settings are valid ({}, capital {:.2})",
        bt_config.symbol, bt_config.initial_capital
    );

    let configured = adapter
        .get_string("strategy", "kind")
        .filter(|s| !s.is_empty());
    if configured.is_some() {
        let strategy = build_strategy(&adapter, None)?;
        eprintln!("Strategy '{}' ({}) is valid", strategy.name, strategy.id());
    }
    for id in StrategyId::ALL {
        build_strategy_of(&adapter, id)?;
    }

    eprintln!("\nConfiguration is valid.");
    Ok(())
}

fn run_info(data: &Path) -> Result<(), SpytraderError> {
    let symbol = data
        .file_stem()
        .map_or_else(|| "data".to_string(), |s| s.to_string_lossy().into_owned());
    let adapter = CsvAdapter::new(data, symbol.clone());

    match adapter.data_range()? {
        Some((min_date, max_date, count)) => {
            println!("{}: {} bars, {} to {}", symbol, count, min_date, max_date);
        }
        None => eprintln!("{}: no data found", symbol),
    }
    Ok(())
}
