//! Portfolio state and equity tracking.

use chrono::NaiveDate;

use super::position::{ClosedTrade, Position};

#[derive(Debug, Clone, PartialEq)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
}

/// Cash, the single open position, and the run's history.
#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    pub cash: f64,
    pub initial_capital: f64,
    pub position: Option<Position>,
    pub closed_trades: Vec<ClosedTrade>,
    pub equity_curve: Vec<EquityPoint>,
}

impl Portfolio {
    pub fn new(initial_capital: f64) -> Self {
        Portfolio {
            cash: initial_capital,
            initial_capital,
            position: None,
            closed_trades: Vec::new(),
            equity_curve: Vec::new(),
        }
    }

    pub fn has_position(&self) -> bool {
        self.position.is_some()
    }

    pub fn position_size(&self) -> i64 {
        self.position.as_ref().map_or(0, |p| p.size)
    }

    pub fn record_trade(&mut self, trade: ClosedTrade) {
        self.closed_trades.push(trade);
    }

    pub fn record_equity(&mut self, date: NaiveDate, equity: f64) {
        self.equity_curve.push(EquityPoint { date, equity });
    }

    /// Cash plus the open position marked at `price`.
    pub fn total_equity(&self, price: f64) -> f64 {
        self.cash + self.position.as_ref().map_or(0.0, |p| p.market_value(price))
    }

    pub fn final_equity(&self) -> f64 {
        self.equity_curve
            .last()
            .map_or(self.initial_capital, |p| p.equity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    #[test]
    fn new_portfolio() {
        let portfolio = Portfolio::new(10_000.0);
        assert!((portfolio.cash - 10_000.0).abs() < f64::EPSILON);
        assert!(!portfolio.has_position());
        assert_eq!(portfolio.position_size(), 0);
        assert!(portfolio.closed_trades.is_empty());
        assert!(portfolio.equity_curve.is_empty());
    }

    #[test]
    fn total_equity_no_position() {
        let portfolio = Portfolio::new(10_000.0);
        assert!((portfolio.total_equity(123.0) - 10_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn total_equity_marks_position() {
        let mut portfolio = Portfolio::new(10_000.0);
        portfolio.cash = 4_000.0;
        portfolio.position = Some(Position::open(date(), 100.0, 60, 0.0));
        assert!((portfolio.total_equity(110.0) - 10_600.0).abs() < f64::EPSILON);
        assert_eq!(portfolio.position_size(), 60);
    }

    #[test]
    fn final_equity_defaults_to_initial() {
        let mut portfolio = Portfolio::new(10_000.0);
        assert!((portfolio.final_equity() - 10_000.0).abs() < f64::EPSILON);
        portfolio.record_equity(date(), 10_500.0);
        assert!((portfolio.final_equity() - 10_500.0).abs() < f64::EPSILON);
    }
}
