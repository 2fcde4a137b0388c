//! Configuration validation.
//!
//! Runs on the typed configuration after file values and command-line
//! overrides are merged, so every bad value is rejected before a bar is read.

use crate::domain::backtest::BacktestConfig;
use crate::domain::error::SpytraderError;
use crate::domain::strategy::{
    MomentumParams, ReboundParams, SmaCrossoverParams, Strategy, StrategyKind,
};
use crate::ports::config_port::ConfigPort;

/// Keys each section accepts. Anything else in these sections is a typo.
const KNOWN_KEYS: [(&str, &[&str]); 6] = [
    (
        "backtest",
        &[
            "data_path",
            "symbol",
            "start_date",
            "end_date",
            "initial_capital",
            "commission",
            "risk_free_rate",
        ],
    ),
    ("strategy", &["kind", "name"]),
    ("sma_crossover", &["fast_period", "slow_period"]),
    (
        "momentum",
        &[
            "fast_period",
            "medium_period",
            "rsi_period",
            "rsi_oversold",
            "rsi_overbought",
            "trail_percent",
            "risk_per_trade",
            "require_macd_confirmation",
            "macd_fast",
            "macd_slow",
            "macd_signal",
        ],
    ),
    (
        "rebound",
        &[
            "lookback",
            "drop_threshold",
            "rise_threshold",
            "take_profit",
            "stop_loss",
            "max_holding_bars",
        ],
    ),
    ("report", &["output"]),
];

/// Reject keys no setting reads, so a misspelt key never falls back to a default.
pub fn validate_known_keys(config: &dyn ConfigPort) -> Result<(), SpytraderError> {
    for (section, known) in KNOWN_KEYS {
        if let Some(key) = config.keys(section).into_iter().find(|k| !known.contains(&k.as_str())) {
            return Err(SpytraderError::invalid(
                section,
                &key,
                format!("unknown key (expected one of: {})", known.join(", ")),
            ));
        }
    }
    Ok(())
}

pub fn validate_backtest_config(config: &BacktestConfig) -> Result<(), SpytraderError> {
    if !config.initial_capital.is_finite() || config.initial_capital <= 0.0 {
        return Err(SpytraderError::invalid(
            "backtest",
            "initial_capital",
            "initial_capital must be positive",
        ));
    }
    if !config.commission.is_finite() || config.commission < 0.0 || config.commission >= 1.0 {
        return Err(SpytraderError::invalid(
            "backtest",
            "commission",
            "commission must be a non-negative fraction below 1",
        ));
    }
    if !(0.0..1.0).contains(&config.risk_free_rate) {
        return Err(SpytraderError::invalid(
            "backtest",
            "risk_free_rate",
            "risk_free_rate must be between 0 and 1",
        ));
    }
    if let (Some(start), Some(end)) = (config.start_date, config.end_date) {
        if start >= end {
            return Err(SpytraderError::invalid(
                "backtest",
                "start_date",
                "start_date must be before end_date",
            ));
        }
    }
    if config.symbol.trim().is_empty() {
        return Err(SpytraderError::ConfigMissing {
            section: "backtest".to_string(),
            key: "symbol".to_string(),
        });
    }
    Ok(())
}

pub fn validate_strategy(strategy: &Strategy) -> Result<(), SpytraderError> {
    match &strategy.kind {
        StrategyKind::BuyAndHold => Ok(()),
        StrategyKind::SmaCrossover(p) => validate_sma_crossover(p),
        StrategyKind::Momentum(p) => validate_momentum(p),
        StrategyKind::Rebound(p) => validate_rebound(p),
    }
}

fn positive_period(section: &str, key: &str, value: usize) -> Result<(), SpytraderError> {
    if value == 0 {
        return Err(SpytraderError::invalid(section, key, format!("{key} must be at least 1")));
    }
    Ok(())
}

fn open_unit_interval(section: &str, key: &str, value: f64) -> Result<(), SpytraderError> {
    if !(value > 0.0 && value < 1.0) {
        return Err(SpytraderError::invalid(
            section,
            key,
            format!("{key} must be between 0 and 1 (exclusive)"),
        ));
    }
    Ok(())
}

fn validate_sma_crossover(p: &SmaCrossoverParams) -> Result<(), SpytraderError> {
    positive_period("sma_crossover", "fast_period", p.fast_period)?;
    positive_period("sma_crossover", "slow_period", p.slow_period)?;
    if p.slow_period <= p.fast_period {
        return Err(SpytraderError::invalid(
            "sma_crossover",
            "slow_period",
            "slow_period must be greater than fast_period",
        ));
    }
    Ok(())
}

fn validate_momentum(p: &MomentumParams) -> Result<(), SpytraderError> {
    const SECTION: &str = "momentum";
    positive_period(SECTION, "fast_period", p.fast_period)?;
    positive_period(SECTION, "medium_period", p.medium_period)?;
    positive_period(SECTION, "rsi_period", p.rsi_period)?;
    if p.medium_period <= p.fast_period {
        return Err(SpytraderError::invalid(
            SECTION,
            "medium_period",
            "medium_period must be greater than fast_period",
        ));
    }
    if !(p.rsi_oversold > 0.0 && p.rsi_oversold < p.rsi_overbought && p.rsi_overbought < 100.0) {
        return Err(SpytraderError::invalid(
            SECTION,
            "rsi_oversold",
            "RSI thresholds must satisfy 0 < rsi_oversold < rsi_overbought < 100",
        ));
    }
    open_unit_interval(SECTION, "trail_percent", p.trail_percent)?;
    if !(p.risk_per_trade > 0.0 && p.risk_per_trade <= 1.0) {
        return Err(SpytraderError::invalid(
            SECTION,
            "risk_per_trade",
            "risk_per_trade must be in (0, 1]",
        ));
    }
    if p.require_macd_confirmation {
        positive_period(SECTION, "macd_fast", p.macd_fast)?;
        positive_period(SECTION, "macd_slow", p.macd_slow)?;
        positive_period(SECTION, "macd_signal", p.macd_signal)?;
        if p.macd_slow <= p.macd_fast {
            return Err(SpytraderError::invalid(
                SECTION,
                "macd_slow",
                "macd_slow must be greater than macd_fast",
            ));
        }
    }
    Ok(())
}

fn validate_rebound(p: &ReboundParams) -> Result<(), SpytraderError> {
    const SECTION: &str = "rebound";
    positive_period(SECTION, "lookback", p.lookback)?;
    open_unit_interval(SECTION, "drop_threshold", p.drop_threshold)?;
    open_unit_interval(SECTION, "rise_threshold", p.rise_threshold)?;
    if !(p.take_profit > 0.0 && p.take_profit.is_finite()) {
        return Err(SpytraderError::invalid(
            SECTION,
            "take_profit",
            "take_profit must be positive",
        ));
    }
    if !(0.0..1.0).contains(&p.stop_loss) {
        return Err(SpytraderError::invalid(
            SECTION,
            "stop_loss",
            "stop_loss must be in [0, 1); 0 disables it",
        ));
    }
    Ok(())
}
