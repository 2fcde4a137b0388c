//! Backtest engine: replays bars through a strategy and simulates fills.

use chrono::NaiveDate;
use log::{debug, info, warn};
use serde::Serialize;
use std::path::PathBuf;

use super::evaluator::{Evaluator, Signal};
use super::execution::{enter_long, exit_position, EntryResult, ExecutionConfig};
use super::indicator_state::IndicatorFrame;
use super::ohlcv::OhlcvBar;
use super::portfolio::Portfolio;
use super::position::ExitReason;
use super::strategy::Strategy;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub data_path: PathBuf,
    pub symbol: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub initial_capital: f64,
    /// Fraction of trade value, charged on entry and exit.
    pub commission: f64,
    pub risk_free_rate: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            data_path: PathBuf::from("spy_data.csv"),
            symbol: "SPY".to_string(),
            start_date: None,
            end_date: None,
            initial_capital: 10_000.0,
            commission: 0.001,
            risk_free_rate: 0.01,
        }
    }
}

/// State after one replayed bar, as written to the per-bar report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarRecord {
    pub date: NaiveDate,
    pub close: f64,
    pub signal: Signal,
    pub position: i64,
    pub stop_price: Option<f64>,
    pub cash: f64,
    pub equity: f64,
}

#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub strategy_name: String,
    pub portfolio: Portfolio,
    pub records: Vec<BarRecord>,
}

impl BacktestResult {
    pub fn signal_count(&self, signal: Signal) -> usize {
        self.records.iter().filter(|r| r.signal == signal).count()
    }
}

pub fn run_backtest(bars: &[OhlcvBar], strategy: &Strategy, config: &BacktestConfig) -> BacktestResult {
    let frame = IndicatorFrame::new(bars, strategy.indicator_plan());
    let mut evaluator = Evaluator::new(strategy.kind);
    let exec_config = ExecutionConfig {
        commission: config.commission,
    };
    let fraction = strategy.sizing_fraction();

    let mut portfolio = Portfolio::new(config.initial_capital);
    let mut records = Vec::with_capacity(bars.len());

    info!(
        "Running {} over {} bars of {}",
        strategy.name,
        bars.len(),
        config.symbol
    );

    for (i, bar) in bars.iter().enumerate() {
        let state = frame.state_at(i);
        let evaluation = evaluator.evaluate(bar, &state, portfolio.position.take());
        portfolio.position = evaluation.position;

        match evaluation.signal {
            Signal::EnterLong => {
                match enter_long(&mut portfolio, bar.close, bar.date, fraction, &exec_config) {
                    EntryResult::Entered {
                        quantity,
                        execution_price,
                        commission,
                        ..
                    } => {
                        portfolio.position = portfolio
                            .position
                            .take()
                            .map(|pos| evaluator.seed_position(pos));
                        debug!(
                            "{} BUY {} @ {:.2} (commission {:.2})",
                            bar.date, quantity, execution_price, commission
                        );
                    }
                    EntryResult::InsufficientCapital => {
                        warn!(
                            "{} entry skipped: cash {:.2} buys no whole share at {:.2}",
                            bar.date, portfolio.cash, bar.close
                        );
                    }
                    EntryResult::AlreadyOpen => {
                        warn!("{} entry skipped: a position is already open", bar.date);
                    }
                }
            }
            Signal::ExitLong => {
                if let Some(exit) = exit_position(
                    &mut portfolio,
                    bar.close,
                    bar.date,
                    ExitReason::Signal,
                    &exec_config,
                ) {
                    debug!(
                        "{} SELL {} @ {:.2} (pnl {:.2})",
                        bar.date, exit.quantity, exit.exit_price, exit.pnl
                    );
                }
            }
            Signal::Hold => {}
        }

        let equity = portfolio.total_equity(bar.close);
        portfolio.record_equity(bar.date, equity);
        records.push(BarRecord {
            date: bar.date,
            close: bar.close,
            signal: evaluation.signal,
            position: portfolio.position_size(),
            stop_price: portfolio.position.as_ref().and_then(|p| p.stop_price),
            cash: portfolio.cash,
            equity,
        });
    }

    if let Some(last) = bars.last() {
        liquidate(&mut portfolio, &mut records, last, &exec_config);
    }

    info!(
        "{} finished: {} trades, final equity {:.2}",
        strategy.name,
        portfolio.closed_trades.len(),
        portfolio.final_equity()
    );

    BacktestResult {
        strategy_name: strategy.name.clone(),
        portfolio,
        records,
    }
}

/// Close any position still open after the last bar at that bar's close.
fn liquidate(
    portfolio: &mut Portfolio,
    records: &mut [BarRecord],
    last: &OhlcvBar,
    exec_config: &ExecutionConfig,
) {
    let Some(exit) = exit_position(
        portfolio,
        last.close,
        last.date,
        ExitReason::EndOfRun,
        exec_config,
    ) else {
        return;
    };
    debug!(
        "{} liquidated {} @ {:.2} (pnl {:.2})",
        last.date, exit.quantity, exit.exit_price, exit.pnl
    );

    let equity = portfolio.cash;
    if let Some(point) = portfolio.equity_curve.last_mut() {
        point.equity = equity;
    }
    if let Some(record) = records.last_mut() {
        record.position = 0;
        record.stop_price = None;
        record.cash = portfolio.cash;
        record.equity = equity;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::make_bars;
    use crate::domain::strategy::{SmaCrossoverParams, StrategyId, StrategyKind};
    use approx::assert_relative_eq;

    fn config(commission: f64) -> BacktestConfig {
        BacktestConfig {
            commission,
            ..Default::default()
        }
    }

    #[test]
    fn config_defaults() {
        let c = BacktestConfig::default();
        assert_eq!(c.symbol, "SPY");
        assert_relative_eq!(c.initial_capital, 10_000.0);
        assert_relative_eq!(c.commission, 0.001);
        assert_relative_eq!(c.risk_free_rate, 0.01);
        assert!(c.start_date.is_none());
    }

    #[test]
    fn buy_and_hold_liquidates_at_end() {
        let bars = make_bars(&[100.0, 105.0, 110.0, 120.0]);
        let strategy = Strategy::with_defaults(StrategyId::BuyAndHold);
        let result = run_backtest(&bars, &strategy, &config(0.0));

        assert_eq!(result.records.len(), 4);
        assert_eq!(result.signal_count(Signal::EnterLong), 1);
        assert_eq!(result.signal_count(Signal::ExitLong), 0);

        let trades = &result.portfolio.closed_trades;
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].exit_reason, ExitReason::EndOfRun);
        assert_eq!(trades[0].size, 100);
        assert_relative_eq!(trades[0].pnl, 2_000.0);

        assert!(!result.portfolio.has_position());
        assert_relative_eq!(result.portfolio.final_equity(), 12_000.0);
        let last = result.records.last().unwrap();
        assert_eq!(last.position, 0);
        assert_relative_eq!(last.equity, 12_000.0);
    }

    #[test]
    fn equity_recorded_every_bar() {
        let bars = make_bars(&[100.0, 90.0, 95.0]);
        let strategy = Strategy::with_defaults(StrategyId::BuyAndHold);
        let result = run_backtest(&bars, &strategy, &config(0.0));

        let equity: Vec<f64> = result.portfolio.equity_curve.iter().map(|p| p.equity).collect();
        assert_eq!(equity, vec![10_000.0, 9_000.0, 9_500.0]);
        assert_eq!(result.records[1].position, 100);
        assert_relative_eq!(result.records[1].cash, 0.0);
    }

    #[test]
    fn commission_reduces_final_equity() {
        let bars = make_bars(&[100.0, 100.0]);
        let strategy = Strategy::with_defaults(StrategyId::BuyAndHold);
        let result = run_backtest(&bars, &strategy, &config(0.001));
        // 99 shares: 9.9 to buy and 9.9 to sell.
        assert_relative_eq!(result.portfolio.final_equity(), 10_000.0 - 19.8, epsilon = 1e-9);
        assert_relative_eq!(result.portfolio.closed_trades[0].pnl, -19.8, epsilon = 1e-9);
    }

    #[test]
    fn sma_crossover_fills_at_signal_close() {
        let bars = make_bars(&[1.0, 2.0, 3.0, 2.0, 1.0, 2.0, 3.0, 4.0]);
        let strategy = Strategy {
            name: "sma".into(),
            kind: StrategyKind::SmaCrossover(SmaCrossoverParams {
                fast_period: 2,
                slow_period: 4,
            }),
        };
        let result = run_backtest(&bars, &strategy, &config(0.0));

        assert_eq!(result.records[6].signal, Signal::EnterLong);
        assert_eq!(result.records[6].position, 3_333);
        let trade = &result.portfolio.closed_trades[0];
        assert_relative_eq!(trade.entry_price, 3.0);
        assert_relative_eq!(trade.exit_price, 4.0);
        assert_eq!(trade.exit_reason, ExitReason::EndOfRun);
    }

    #[test]
    fn momentum_records_stop_price() {
        let mut closes: Vec<f64> = (0..40).map(|i| 100.0 - i as f64 * 0.5).collect();
        closes.extend((0..40).map(|i| 80.0 + i as f64));
        let bars = make_bars(&closes);
        let strategy = Strategy::with_defaults(StrategyId::Momentum);
        let result = run_backtest(&bars, &strategy, &BacktestConfig::default());

        for record in &result.records {
            if record.position > 0 {
                assert!(record.stop_price.is_some());
            } else {
                assert!(record.stop_price.is_none());
            }
        }
    }

    #[test]
    fn skipped_entry_stays_flat() {
        let bars = make_bars(&[50_000.0, 51_000.0]);
        let strategy = Strategy::with_defaults(StrategyId::BuyAndHold);
        let result = run_backtest(&bars, &strategy, &config(0.001));

        assert_eq!(result.signal_count(Signal::EnterLong), 1);
        assert!(result.portfolio.closed_trades.is_empty());
        assert!(result.records.iter().all(|r| r.position == 0));
        assert_relative_eq!(result.portfolio.final_equity(), 10_000.0);
    }

    #[test]
    fn empty_series_is_a_no_op() {
        let strategy = Strategy::with_defaults(StrategyId::SmaCrossover);
        let result = run_backtest(&[], &strategy, &BacktestConfig::default());
        assert!(result.records.is_empty());
        assert_relative_eq!(result.portfolio.final_equity(), 10_000.0);
    }
}
