//! Bar-by-bar signal generation.
//!
//! The evaluator is handed one bar at a time together with its indicator
//! readings and the open position, and answers with exactly one [`Signal`].
//! The position is passed in and returned by value; the only state kept
//! between calls is what a strategy needs to remember about past bars.

use crate::domain::indicator_state::IndicatorState;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::position::Position;
use crate::domain::strategy::{MomentumParams, ReboundParams, StrategyKind};
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Signal {
    Hold,
    EnterLong,
    ExitLong,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Hold => write!(f, "HOLD"),
            Signal::EnterLong => write!(f, "ENTER_LONG"),
            Signal::ExitLong => write!(f, "EXIT_LONG"),
        }
    }
}

/// The signal for a bar and the position as updated by that bar.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub signal: Signal,
    pub position: Option<Position>,
}

impl Evaluation {
    fn new(signal: Signal, position: Option<Position>) -> Self {
        Evaluation { signal, position }
    }
}

/// Post-drop state. Stays armed while `bars_since_drop < lookback`, so an
/// entry may come at most `lookback` bars after the drop bar: a window of
/// `lookback + 1` bars counting the drop bar itself.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Armed {
    low: f64,
    bars_since_drop: usize,
}

#[derive(Debug, Clone, PartialEq)]
struct ReboundMemory {
    window: VecDeque<f64>,
    armed: Option<Armed>,
}

impl ReboundMemory {
    fn new(lookback: usize) -> Self {
        ReboundMemory {
            window: VecDeque::with_capacity(lookback),
            armed: None,
        }
    }

    /// Push `close` into the window and update the armed state.
    fn observe(&mut self, close: f64, p: &ReboundParams) {
        if self.window.len() == p.lookback {
            self.window.pop_front();
        }
        self.window.push_back(close);

        let high = self.window.iter().copied().fold(f64::MIN, f64::max);
        let dropped = high > 0.0 && (high - close) / high >= p.drop_threshold;

        self.armed = match (self.armed, dropped) {
            (Some(a), true) => Some(Armed {
                low: a.low.min(close),
                bars_since_drop: 0,
            }),
            (None, true) => Some(Armed {
                low: close,
                bars_since_drop: 0,
            }),
            (Some(a), false) if a.bars_since_drop < p.lookback => Some(Armed {
                low: a.low.min(close),
                bars_since_drop: a.bars_since_drop + 1,
            }),
            _ => None,
        };
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Memory {
    Stateless,
    BuyAndHold { entered: bool },
    Rebound(ReboundMemory),
}

/// Produces one signal per bar for a configured strategy.
#[derive(Debug, Clone)]
pub struct Evaluator {
    kind: StrategyKind,
    memory: Memory,
}

impl Evaluator {
    pub fn new(kind: StrategyKind) -> Self {
        let memory = match kind {
            StrategyKind::BuyAndHold => Memory::BuyAndHold { entered: false },
            StrategyKind::Rebound(p) => Memory::Rebound(ReboundMemory::new(p.lookback)),
            StrategyKind::SmaCrossover(_) | StrategyKind::Momentum(_) => Memory::Stateless,
        };
        Evaluator { kind, memory }
    }

    /// Attach strategy-specific state to a freshly filled position.
    pub fn seed_position(&self, mut position: Position) -> Position {
        if let StrategyKind::Momentum(p) = self.kind {
            position.stop_price = Some(p.stop_for(position.high_water));
        }
        position
    }

    pub fn evaluate(
        &mut self,
        bar: &OhlcvBar,
        state: &IndicatorState,
        position: Option<Position>,
    ) -> Evaluation {
        let position = position.map(|mut pos| {
            pos.bars_held += 1;
            pos.high_water = pos.high_water.max(bar.close);
            pos
        });

        match (self.kind, &mut self.memory) {
            (StrategyKind::BuyAndHold, Memory::BuyAndHold { entered }) => {
                buy_and_hold(entered, position)
            }
            (StrategyKind::SmaCrossover(_), _) => sma_crossover(state, position),
            (StrategyKind::Momentum(p), _) => momentum(&p, bar, state, position),
            (StrategyKind::Rebound(p), Memory::Rebound(memory)) => {
                rebound(&p, memory, bar, position)
            }
            _ => Evaluation::new(Signal::Hold, position),
        }
    }
}

fn buy_and_hold(entered: &mut bool, position: Option<Position>) -> Evaluation {
    if position.is_none() && !*entered {
        *entered = true;
        return Evaluation::new(Signal::EnterLong, None);
    }
    Evaluation::new(Signal::Hold, position)
}

fn sma_crossover(state: &IndicatorState, position: Option<Position>) -> Evaluation {
    let (Some(prev_fast), Some(prev_slow), Some(fast), Some(slow)) = (
        state.previous.fast_ma,
        state.previous.slow_ma,
        state.current.fast_ma,
        state.current.slow_ma,
    ) else {
        return Evaluation::new(Signal::Hold, position);
    };

    let signal = match position {
        None if prev_fast <= prev_slow && fast > slow => Signal::EnterLong,
        Some(_) if prev_fast >= prev_slow && fast < slow => Signal::ExitLong,
        _ => Signal::Hold,
    };
    Evaluation::new(signal, position)
}

fn momentum(
    p: &MomentumParams,
    bar: &OhlcvBar,
    state: &IndicatorState,
    position: Option<Position>,
) -> Evaluation {
    let rsi = state.previous.rsi.zip(state.current.rsi);

    match position {
        Some(mut pos) => {
            let stop = p.stop_for(pos.high_water);
            pos.stop_price = Some(stop);

            let rsi_turned_down = rsi
                .is_some_and(|(prev, curr)| prev >= p.rsi_overbought && curr < p.rsi_overbought);
            let signal = if bar.close < stop || rsi_turned_down {
                Signal::ExitLong
            } else {
                Signal::Hold
            };
            Evaluation::new(signal, Some(pos))
        }
        None => {
            let trend_up = match (state.current.fast_ma, state.current.slow_ma) {
                (Some(fast), Some(medium)) => fast > medium,
                _ => false,
            };
            let rsi_turned_up =
                rsi.is_some_and(|(prev, curr)| prev <= p.rsi_oversold && curr > p.rsi_oversold);
            let macd_ok = !p.require_macd_confirmation
                || matches!(
                    (state.current.macd, state.current.macd_signal),
                    (Some(line), Some(signal)) if line > signal
                );

            let signal = if trend_up && rsi_turned_up && macd_ok {
                Signal::EnterLong
            } else {
                Signal::Hold
            };
            Evaluation::new(signal, None)
        }
    }
}

fn rebound(
    p: &ReboundParams,
    memory: &mut ReboundMemory,
    bar: &OhlcvBar,
    position: Option<Position>,
) -> Evaluation {
    memory.observe(bar.close, p);

    match position {
        Some(pos) => {
            let take_profit = bar.close >= pos.entry_price * (1.0 + p.take_profit);
            let stop_loss = p.stop_loss > 0.0 && bar.close <= pos.entry_price * (1.0 - p.stop_loss);
            let expired = p.max_holding_bars > 0 && pos.bars_held >= p.max_holding_bars;

            let signal = if take_profit || stop_loss || expired {
                Signal::ExitLong
            } else {
                Signal::Hold
            };
            Evaluation::new(signal, Some(pos))
        }
        None => match memory.armed {
            Some(armed)
                if armed.low > 0.0 && (bar.close - armed.low) / armed.low >= p.rise_threshold =>
            {
                memory.armed = None;
                Evaluation::new(Signal::EnterLong, None)
            }
            _ => Evaluation::new(Signal::Hold, None),
        },
    }
}
