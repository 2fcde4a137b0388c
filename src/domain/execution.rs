//! Fill simulation at the signal bar's close.
//!
//! Whole-share sizing, a percentage commission on both legs, no slippage and
//! no shorting.

use chrono::NaiveDate;

use super::portfolio::Portfolio;
use super::position::{ClosedTrade, ExitReason, Position};

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionConfig {
    /// Fraction of trade value charged per fill, e.g. 0.001 for 0.1%.
    pub commission: f64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        ExecutionConfig { commission: 0.001 }
    }
}

pub fn calculate_commission(trade_value: f64, config: &ExecutionConfig) -> f64 {
    trade_value * config.commission
}

/// Largest whole-share quantity that fits `cash * fraction` and whose cost
/// plus commission does not exceed `cash`.
pub fn entry_quantity(cash: f64, fraction: f64, price: f64, config: &ExecutionConfig) -> i64 {
    if price <= 0.0 || cash <= 0.0 || fraction <= 0.0 {
        return 0;
    }

    let by_fraction = (cash * fraction / price).floor();
    let by_cash = (cash / (price * (1.0 + config.commission))).floor();
    let mut quantity = by_fraction.min(by_cash).max(0.0) as i64;

    while quantity > 0 {
        let cost = quantity as f64 * price;
        if cost + calculate_commission(cost, config) <= cash {
            break;
        }
        quantity -= 1;
    }
    quantity
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntryResult {
    Entered {
        quantity: i64,
        execution_price: f64,
        cost: f64,
        commission: f64,
    },
    InsufficientCapital,
    /// A position is already open; positions never pyramid.
    AlreadyOpen,
}

/// Open a long position at `price`, committing `fraction` of available cash.
pub fn enter_long(
    portfolio: &mut Portfolio,
    price: f64,
    date: NaiveDate,
    fraction: f64,
    config: &ExecutionConfig,
) -> EntryResult {
    if portfolio.has_position() {
        return EntryResult::AlreadyOpen;
    }

    let quantity = entry_quantity(portfolio.cash, fraction, price, config);
    if quantity == 0 {
        return EntryResult::InsufficientCapital;
    }

    let cost = quantity as f64 * price;
    let commission = calculate_commission(cost, config);
    portfolio.cash -= cost + commission;
    portfolio.position = Some(Position::open(date, price, quantity, commission));

    EntryResult::Entered {
        quantity,
        execution_price: price,
        cost,
        commission,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExitResult {
    pub quantity: i64,
    pub exit_price: f64,
    pub exit_value: f64,
    pub exit_commission: f64,
    pub pnl: f64,
}

/// Sell the whole open position at `price` and record the closed trade.
///
/// Returns `None` when flat.
pub fn exit_position(
    portfolio: &mut Portfolio,
    price: f64,
    exit_date: NaiveDate,
    reason: ExitReason,
    config: &ExecutionConfig,
) -> Option<ExitResult> {
    let position = portfolio.position.take()?;

    let exit_value = position.market_value(price);
    let exit_commission = calculate_commission(exit_value, config);
    let pnl = position.unrealized_pnl(price) - position.entry_commission - exit_commission;

    portfolio.cash += exit_value - exit_commission;
    portfolio.record_trade(ClosedTrade {
        entry_date: position.entry_date,
        exit_date,
        entry_price: position.entry_price,
        exit_price: price,
        size: position.size,
        commission: position.entry_commission + exit_commission,
        pnl,
        exit_reason: reason,
    });

    Some(ExitResult {
        quantity: position.size,
        exit_price: price,
        exit_value,
        exit_commission,
        pnl,
    })
}
