//! Per-bar indicator readings handed to the strategy evaluator.
//!
//! Indicator series are computed once over the loaded bars and then sampled
//! bar by bar. Each series value reads only its trailing window, so sampling
//! index `i` never sees bars after `i`.

use crate::domain::indicator::{compute_indicators, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::OhlcvBar;
use std::collections::HashMap;

/// Which indicators a strategy reads, and in which role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndicatorPlan {
    pub fast_ma: Option<usize>,
    pub slow_ma: Option<usize>,
    pub rsi: Option<usize>,
    pub macd: Option<(usize, usize, usize)>,
}

impl IndicatorPlan {
    pub fn indicator_types(&self) -> Vec<IndicatorType> {
        let mut types = Vec::new();
        if let Some(p) = self.fast_ma {
            types.push(IndicatorType::Sma(p));
        }
        if let Some(p) = self.slow_ma {
            types.push(IndicatorType::Sma(p));
        }
        if let Some(p) = self.rsi {
            types.push(IndicatorType::Rsi(p));
        }
        if let Some((fast, slow, signal)) = self.macd {
            types.push(IndicatorType::Macd { fast, slow, signal });
        }
        types
    }
}

/// Indicator values for a single bar. `None` means the window is not full.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IndicatorSnapshot {
    pub fast_ma: Option<f64>,
    pub slow_ma: Option<f64>,
    pub rsi: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
}

/// Current and previous bar readings; crossings need both.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IndicatorState {
    pub current: IndicatorSnapshot,
    pub previous: IndicatorSnapshot,
}

/// Precomputed series for one run, sampled by bar index.
#[derive(Debug, Clone)]
pub struct IndicatorFrame {
    plan: IndicatorPlan,
    series: HashMap<IndicatorType, IndicatorSeries>,
}

impl IndicatorFrame {
    pub fn new(bars: &[OhlcvBar], plan: IndicatorPlan) -> Self {
        let series = compute_indicators(bars, &plan.indicator_types());
        Self { plan, series }
    }

    pub fn snapshot(&self, index: usize) -> IndicatorSnapshot {
        let simple = |t: IndicatorType| self.series.get(&t).and_then(|s| s.simple_at(index));
        let macd = self.plan.macd.and_then(|(fast, slow, signal)| {
            self.series
                .get(&IndicatorType::Macd { fast, slow, signal })
                .and_then(|s| s.macd_at(index))
        });

        IndicatorSnapshot {
            fast_ma: self.plan.fast_ma.and_then(|p| simple(IndicatorType::Sma(p))),
            slow_ma: self.plan.slow_ma.and_then(|p| simple(IndicatorType::Sma(p))),
            rsi: self.plan.rsi.and_then(|p| simple(IndicatorType::Rsi(p))),
            macd: macd.map(|(line, _)| line),
            macd_signal: macd.map(|(_, signal)| signal),
        }
    }

    pub fn state_at(&self, index: usize) -> IndicatorState {
        IndicatorState {
            current: self.snapshot(index),
            previous: if index == 0 {
                IndicatorSnapshot::default()
            } else {
                self.snapshot(index - 1)
            },
        }
    }
}
