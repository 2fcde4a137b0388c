//! Report generation port trait.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::SpytraderError;
use crate::domain::metrics::Metrics;
use crate::domain::strategy::Strategy;
use std::path::Path;

/// Port for writing backtest reports.
pub trait ReportPort {
    fn write(
        &self,
        result: &BacktestResult,
        metrics: &Metrics,
        strategy: &Strategy,
        output_path: &Path,
    ) -> Result<(), SpytraderError>;

    /// One summary row per strategy run over the same data.
    fn write_comparison(
        &self,
        runs: &[(Strategy, Metrics)],
        output_path: &Path,
    ) -> Result<(), SpytraderError>;
}
