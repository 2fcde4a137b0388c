//! Strategy configuration: which rule set runs and with what parameters.

use crate::domain::indicator::macd::{DEFAULT_FAST, DEFAULT_SIGNAL, DEFAULT_SLOW};
use crate::domain::indicator_state::IndicatorPlan;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmaCrossoverParams {
    pub fast_period: usize,
    pub slow_period: usize,
}

impl Default for SmaCrossoverParams {
    fn default() -> Self {
        SmaCrossoverParams {
            fast_period: 50,
            slow_period: 200,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MomentumParams {
    pub fast_period: usize,
    pub medium_period: usize,
    pub rsi_period: usize,
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    pub trail_percent: f64,
    pub risk_per_trade: f64,
    pub require_macd_confirmation: bool,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
}

impl Default for MomentumParams {
    fn default() -> Self {
        MomentumParams {
            fast_period: 10,
            medium_period: 20,
            rsi_period: 14,
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
            trail_percent: 0.05,
            risk_per_trade: 0.02,
            require_macd_confirmation: false,
            macd_fast: DEFAULT_FAST,
            macd_slow: DEFAULT_SLOW,
            macd_signal: DEFAULT_SIGNAL,
        }
    }
}

impl MomentumParams {
    /// Trailing stop level for a given high-water mark.
    pub fn stop_for(&self, high_water: f64) -> f64 {
        high_water * (1.0 - self.trail_percent)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReboundParams {
    pub lookback: usize,
    pub drop_threshold: f64,
    pub rise_threshold: f64,
    pub take_profit: f64,
    /// 0 disables the stop.
    pub stop_loss: f64,
    /// 0 disables the holding limit.
    pub max_holding_bars: usize,
}

impl Default for ReboundParams {
    fn default() -> Self {
        ReboundParams {
            lookback: 5,
            drop_threshold: 0.10,
            rise_threshold: 0.20,
            take_profit: 0.20,
            stop_loss: 0.0,
            max_holding_bars: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StrategyKind {
    BuyAndHold,
    SmaCrossover(SmaCrossoverParams),
    Momentum(MomentumParams),
    Rebound(ReboundParams),
}

/// Parameter-free identity of a strategy, as written in config and on the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyId {
    BuyAndHold,
    SmaCrossover,
    Momentum,
    Rebound,
}

impl StrategyId {
    pub const ALL: [StrategyId; 4] = [
        StrategyId::BuyAndHold,
        StrategyId::SmaCrossover,
        StrategyId::Momentum,
        StrategyId::Rebound,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyId::BuyAndHold => "buy_and_hold",
            StrategyId::SmaCrossover => "sma_crossover",
            StrategyId::Momentum => "momentum",
            StrategyId::Rebound => "rebound",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            StrategyId::BuyAndHold => "Buy and Hold",
            StrategyId::SmaCrossover => "SMA Crossover",
            StrategyId::Momentum => "Market Momentum",
            StrategyId::Rebound => "Rebound",
        }
    }
}

impl fmt::Display for StrategyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "buy_and_hold" | "buyandhold" => Ok(StrategyId::BuyAndHold),
            "sma_crossover" | "sma" => Ok(StrategyId::SmaCrossover),
            "momentum" | "market_momentum" => Ok(StrategyId::Momentum),
            "rebound" => Ok(StrategyId::Rebound),
            other => Err(format!(
                "unknown strategy '{}' (expected buy_and_hold, sma_crossover, momentum or rebound)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Strategy {
    pub name: String,
    pub kind: StrategyKind,
}

impl Strategy {
    /// A strategy of the given kind with default parameters.
    pub fn with_defaults(id: StrategyId) -> Self {
        let kind = match id {
            StrategyId::BuyAndHold => StrategyKind::BuyAndHold,
            StrategyId::SmaCrossover => StrategyKind::SmaCrossover(SmaCrossoverParams::default()),
            StrategyId::Momentum => StrategyKind::Momentum(MomentumParams::default()),
            StrategyId::Rebound => StrategyKind::Rebound(ReboundParams::default()),
        };
        Strategy {
            name: id.display_name().to_string(),
            kind,
        }
    }

    pub fn id(&self) -> StrategyId {
        match self.kind {
            StrategyKind::BuyAndHold => StrategyId::BuyAndHold,
            StrategyKind::SmaCrossover(_) => StrategyId::SmaCrossover,
            StrategyKind::Momentum(_) => StrategyId::Momentum,
            StrategyKind::Rebound(_) => StrategyId::Rebound,
        }
    }

    pub fn indicator_plan(&self) -> IndicatorPlan {
        match self.kind {
            StrategyKind::BuyAndHold | StrategyKind::Rebound(_) => IndicatorPlan::default(),
            StrategyKind::SmaCrossover(p) => IndicatorPlan {
                fast_ma: Some(p.fast_period),
                slow_ma: Some(p.slow_period),
                ..Default::default()
            },
            StrategyKind::Momentum(p) => IndicatorPlan {
                fast_ma: Some(p.fast_period),
                slow_ma: Some(p.medium_period),
                rsi: Some(p.rsi_period),
                macd: p
                    .require_macd_confirmation
                    .then_some((p.macd_fast, p.macd_slow, p.macd_signal)),
            },
        }
    }

    /// Fraction of available cash committed on entry.
    ///
    /// Momentum risks `risk_per_trade` of equity down to the trailing stop,
    /// so it commits `risk_per_trade / trail_percent`, capped at all cash.
    /// Entries only happen when flat, where equity equals cash.
    pub fn sizing_fraction(&self) -> f64 {
        match self.kind {
            StrategyKind::Momentum(p) => (p.risk_per_trade / p.trail_percent).min(1.0),
            _ => 1.0,
        }
    }
}
