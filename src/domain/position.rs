//! Open position and closed trade records.

use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

/// A long position. At most one is open per run.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub size: i64,
    pub entry_commission: f64,
    /// Exit trigger for strategies that carry a stop.
    pub stop_price: Option<f64>,
    /// Highest close since entry, entry bar included.
    pub high_water: f64,
    /// Bars evaluated since the entry bar.
    pub bars_held: usize,
}

impl Position {
    pub fn open(entry_date: NaiveDate, entry_price: f64, size: i64, entry_commission: f64) -> Self {
        Position {
            entry_date,
            entry_price,
            size,
            entry_commission,
            stop_price: None,
            high_water: entry_price,
            bars_held: 0,
        }
    }

    pub fn market_value(&self, price: f64) -> f64 {
        self.size as f64 * price
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.size as f64 * (price - self.entry_price)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitReason {
    Signal,
    EndOfRun,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::Signal => write!(f, "signal"),
            ExitReason::EndOfRun => write!(f, "end_of_run"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClosedTrade {
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
    pub entry_price: f64,
    pub exit_price: f64,
    pub size: i64,
    pub commission: f64,
    pub pnl: f64,
    pub exit_reason: ExitReason,
}

impl ClosedTrade {
    pub fn return_pct(&self) -> f64 {
        let cost = self.entry_price * self.size as f64;
        if cost > 0.0 { self.pnl / cost } else { 0.0 }
    }
}
