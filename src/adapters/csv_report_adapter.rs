//! CSV report adapter implementing ReportPort.
//!
//! A run writes three files next to each other: the per-bar log at the
//! requested path, `<stem>_trades.csv` and `<stem>_summary.csv`.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use log::info;
use serde::Serialize;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::SpytraderError;
use crate::domain::metrics::Metrics;
use crate::domain::position::{ClosedTrade, ExitReason};
use crate::domain::strategy::Strategy;
use crate::ports::report_port::ReportPort;

const BAR_HEADER: [&str; 7] = ["date", "close", "signal", "position", "stop_price", "cash", "equity"];
const TRADE_HEADER: [&str; 9] = [
    "entry_date",
    "exit_date",
    "entry_price",
    "exit_price",
    "size",
    "commission",
    "pnl",
    "return_pct",
    "exit_reason",
];
const COMPARISON_HEADER: [&str; 12] = [
    "strategy",
    "kind",
    "final_equity",
    "total_return",
    "annualized_return",
    "sharpe_ratio",
    "sortino_ratio",
    "max_drawdown",
    "total_trades",
    "win_rate",
    "profit_factor",
    "avg_trade_duration",
];

#[derive(Serialize)]
struct TradeRow {
    entry_date: NaiveDate,
    exit_date: NaiveDate,
    entry_price: f64,
    exit_price: f64,
    size: i64,
    commission: f64,
    pnl: f64,
    return_pct: f64,
    exit_reason: String,
}

impl From<&ClosedTrade> for TradeRow {
    fn from(t: &ClosedTrade) -> Self {
        TradeRow {
            entry_date: t.entry_date,
            exit_date: t.exit_date,
            entry_price: t.entry_price,
            exit_price: t.exit_price,
            size: t.size,
            commission: t.commission,
            pnl: t.pnl,
            return_pct: t.return_pct(),
            exit_reason: t.exit_reason.to_string(),
        }
    }
}

#[derive(Serialize)]
struct SummaryRow<'a> {
    metric: &'a str,
    value: String,
}

#[derive(Serialize)]
struct ComparisonRow<'a> {
    strategy: &'a str,
    kind: &'static str,
    final_equity: f64,
    total_return: f64,
    annualized_return: f64,
    sharpe_ratio: f64,
    sortino_ratio: f64,
    max_drawdown: f64,
    total_trades: usize,
    win_rate: f64,
    profit_factor: f64,
    avg_trade_duration: f64,
}

pub struct CsvReportAdapter;

/// `dir/name.csv` -> `dir/name_<suffix>.csv`.
pub fn sibling_path(output: &Path, suffix: &str) -> PathBuf {
    let stem = output
        .file_stem()
        .map_or_else(|| "results".to_string(), |s| s.to_string_lossy().into_owned());
    output.with_file_name(format!("{}_{}.csv", stem, suffix))
}

fn report_error(path: &Path, reason: impl ToString) -> SpytraderError {
    SpytraderError::Report {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}

/// Write `rows` with a header row; the header is written even with no rows.
fn write_rows<T: Serialize>(path: &Path, header: &[&str], rows: impl IntoIterator<Item = T>) -> Result<(), SpytraderError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(|e| report_error(path, e))?;
    writer.write_record(header).map_err(|e| report_error(path, e))?;
    for row in rows {
        writer.serialize(row).map_err(|e| report_error(path, e))?;
    }
    writer.flush().map_err(|e| report_error(path, e))?;
    Ok(())
}

impl ReportPort for CsvReportAdapter {
    fn write(
        &self,
        result: &BacktestResult,
        metrics: &Metrics,
        strategy: &Strategy,
        output_path: &Path,
    ) -> Result<(), SpytraderError> {
        write_rows(output_path, &BAR_HEADER, &result.records)?;

        let trades_path = sibling_path(output_path, "trades");
        write_rows(
            &trades_path,
            &TRADE_HEADER,
            result.portfolio.closed_trades.iter().map(TradeRow::from),
        )?;

        let summary_path = sibling_path(output_path, "summary");
        let end_of_run = result
            .portfolio
            .closed_trades
            .iter()
            .filter(|t| t.exit_reason == ExitReason::EndOfRun)
            .count();
        let header_rows = [
            ("strategy", strategy.name.clone()),
            ("kind", strategy.id().to_string()),
            ("bars", result.records.len().to_string()),
            ("end_of_run_exits", end_of_run.to_string()),
        ];
        let rows = header_rows
            .into_iter()
            .chain(metrics.summary_rows())
            .map(|(metric, value)| SummaryRow { metric, value })
            .collect::<Vec<_>>();
        write_rows(&summary_path, &["metric", "value"], rows)?;

        info!(
            "Wrote {}, {} and {}",
            output_path.display(),
            trades_path.display(),
            summary_path.display()
        );
        Ok(())
    }

    fn write_comparison(
        &self,
        runs: &[(Strategy, Metrics)],
        output_path: &Path,
    ) -> Result<(), SpytraderError> {
        let rows = runs.iter().map(|(strategy, m)| ComparisonRow {
            strategy: &strategy.name,
            kind: strategy.id().as_str(),
            final_equity: m.final_equity,
            total_return: m.total_return,
            annualized_return: m.annualized_return,
            sharpe_ratio: m.sharpe_ratio,
            sortino_ratio: m.sortino_ratio,
            max_drawdown: m.max_drawdown,
            total_trades: m.total_trades,
            win_rate: m.win_rate,
            profit_factor: m.profit_factor,
            avg_trade_duration: m.avg_trade_duration,
        });
        write_rows(output_path, &COMPARISON_HEADER, rows)?;
        info!("Wrote comparison of {} strategies to {}", runs.len(), output_path.display());
        Ok(())
    }
}
