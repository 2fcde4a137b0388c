//! Core domain types and logic.

pub mod backtest;
pub mod config_validation;
pub mod error;
pub mod evaluator;
pub mod execution;
pub mod indicator;
pub mod indicator_state;
pub mod metrics;
pub mod ohlcv;
pub mod portfolio;
pub mod position;
pub mod strategy;
