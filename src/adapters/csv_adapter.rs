//! CSV file data adapter.
//!
//! Reads daily bars from a file with a `date,open,high,low,close,volume`
//! header. Column names are matched case-insensitively and extra columns
//! are ignored. Every row is validated and the first bad row aborts the load.

use crate::domain::error::SpytraderError;
use crate::domain::ohlcv::OhlcvBar;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use log::debug;
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

const REQUIRED_COLUMNS: [&str; 6] = ["date", "open", "high", "low", "close", "volume"];

pub struct CsvAdapter {
    path: PathBuf,
    symbol: String,
}

/// Positions of the required columns within a record.
struct ColumnMap {
    date: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: usize,
}

impl ColumnMap {
    fn from_headers(headers: &csv::StringRecord, source_name: &str) -> Result<Self, SpytraderError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
                .ok_or_else(|| SpytraderError::DataValidation {
                    source_name: source_name.to_string(),
                    row: 0,
                    line: 1,
                    reason: format!("missing column '{}'", name),
                })
        };
        Ok(ColumnMap {
            date: find(REQUIRED_COLUMNS[0])?,
            open: find(REQUIRED_COLUMNS[1])?,
            high: find(REQUIRED_COLUMNS[2])?,
            low: find(REQUIRED_COLUMNS[3])?,
            close: find(REQUIRED_COLUMNS[4])?,
            volume: find(REQUIRED_COLUMNS[5])?,
        })
    }
}

/// Row-level error context.
struct RowContext<'a> {
    source_name: &'a str,
    row: usize,
    line: u64,
}

impl RowContext<'_> {
    fn error(&self, reason: impl Into<String>) -> SpytraderError {
        SpytraderError::DataValidation {
            source_name: self.source_name.to_string(),
            row: self.row,
            line: self.line,
            reason: reason.into(),
        }
    }

    fn field<'r>(&self, record: &'r csv::StringRecord, index: usize, name: &str) -> Result<&'r str, SpytraderError> {
        match record.get(index) {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(self.error(format!("missing {} value", name))),
        }
    }

    fn price(&self, record: &csv::StringRecord, index: usize, name: &str) -> Result<f64, SpytraderError> {
        let raw = self.field(record, index, name)?;
        let value: f64 = raw
            .parse()
            .map_err(|_| self.error(format!("invalid {} value '{}'", name, raw)))?;
        if !value.is_finite() || value <= 0.0 {
            return Err(self.error(format!("{} must be a positive number, got {}", name, raw)));
        }
        Ok(value)
    }

    fn volume(&self, record: &csv::StringRecord, index: usize) -> Result<i64, SpytraderError> {
        let raw = self.field(record, index, "volume")?;
        let volume = match raw.parse::<i64>() {
            Ok(v) => v,
            Err(_) => match raw.parse::<f64>() {
                Ok(v) if v.is_finite() && v.fract() == 0.0 => v as i64,
                _ => return Err(self.error(format!("invalid volume value '{}'", raw))),
            },
        };
        if volume < 0 {
            return Err(self.error(format!("volume must not be negative, got {}", volume)));
        }
        Ok(volume)
    }
}

/// Parse and validate every row of a bar CSV.
pub fn parse_bars<R: Read>(reader: R, source_name: &str) -> Result<Vec<OhlcvBar>, SpytraderError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr
        .headers()
        .map_err(|e| SpytraderError::DataSource {
            reason: format!("failed to read header of {}: {}", source_name, e),
        })?
        .clone();
    let columns = ColumnMap::from_headers(&headers, source_name)?;

    let mut bars: Vec<OhlcvBar> = Vec::new();
    for (i, result) in rdr.records().enumerate() {
        let row = i + 1;
        let record = result.map_err(|e| SpytraderError::DataValidation {
            source_name: source_name.to_string(),
            row,
            line: e.position().map_or(row as u64 + 1, |p| p.line()),
            reason: format!("malformed record: {}", e),
        })?;
        let ctx = RowContext {
            source_name,
            row,
            line: record.position().map_or(row as u64 + 1, |p| p.line()),
        };

        let date_str = ctx.field(&record, columns.date, "date")?;
        let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
            .map_err(|_| ctx.error(format!("invalid date '{}' (expected YYYY-MM-DD)", date_str)))?;

        let bar = OhlcvBar {
            date,
            open: ctx.price(&record, columns.open, "open")?,
            high: ctx.price(&record, columns.high, "high")?,
            low: ctx.price(&record, columns.low, "low")?,
            close: ctx.price(&record, columns.close, "close")?,
            volume: ctx.volume(&record, columns.volume)?,
        };

        if bar.high < bar.low {
            return Err(ctx.error(format!("high {} is below low {}", bar.high, bar.low)));
        }
        if let Some(prev) = bars.last() {
            if bar.date <= prev.date {
                return Err(ctx.error(format!(
                    "date {} does not follow {} (dates must be strictly ascending)",
                    bar.date, prev.date
                )));
            }
        }
        bars.push(bar);
    }

    Ok(bars)
}

impl CsvAdapter {
    pub fn new(path: impl Into<PathBuf>, symbol: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            symbol: symbol.into(),
        }
    }

    /// Every bar in the file, validated.
    pub fn load_all(&self) -> Result<Vec<OhlcvBar>, SpytraderError> {
        let file = File::open(&self.path).map_err(|e| SpytraderError::DataSource {
            reason: format!("failed to read {}: {}", self.path.display(), e),
        })?;
        let bars = parse_bars(file, &self.path.display().to_string())?;
        debug!("Read {} bars from {}", bars.len(), self.path.display());
        Ok(bars)
    }
}

impl DataPort for CsvAdapter {
    fn fetch_ohlcv(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<OhlcvBar>, SpytraderError> {
        let bars: Vec<OhlcvBar> = self
            .load_all()?
            .into_iter()
            .filter(|b| start_date.is_none_or(|s| b.date >= s))
            .filter(|b| end_date.is_none_or(|e| b.date <= e))
            .collect();

        if bars.is_empty() {
            return Err(SpytraderError::NoData {
                symbol: self.symbol.clone(),
            });
        }
        Ok(bars)
    }

    fn data_range(&self) -> Result<Option<(NaiveDate, NaiveDate, usize)>, SpytraderError> {
        let bars = self.load_all()?;
        Ok(match (bars.first(), bars.last()) {
            (Some(first), Some(last)) => Some((first.date, last.date, bars.len())),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const HEADER: &str = "date,open,high,low,close,volume\n";

    fn write_csv(content: &str) -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("spy.csv");
        fs::write(&path, content).unwrap();
        (dir, path)
    }

    fn sample() -> String {
        format!(
            "{HEADER}\
             2024-01-15,100.0,110.0,90.0,105.0,50000\n\
             2024-01-16,105.0,115.0,100.0,110.0,60000\n\
             2024-01-17,110.0,120.0,105.0,115.0,55000\n"
        )
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn reason_at(result: Result<Vec<OhlcvBar>, SpytraderError>) -> (usize, u64, String) {
        match result {
            Err(SpytraderError::DataValidation {
                row, line, reason, ..
            }) => (row, line, reason),
            other => panic!("expected DataValidation, got {other:?}"),
        }
    }

    #[test]
    fn fetch_ohlcv_returns_correct_data() {
        let (_dir, path) = write_csv(&sample());
        let adapter = CsvAdapter::new(path, "SPY");

        let bars = adapter.fetch_ohlcv(None, None).unwrap();

        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].date, date(15));
        assert_eq!(bars[0].open, 100.0);
        assert_eq!(bars[0].high, 110.0);
        assert_eq!(bars[0].low, 90.0);
        assert_eq!(bars[0].close, 105.0);
        assert_eq!(bars[0].volume, 50000);
    }

    #[test]
    fn fetch_ohlcv_filters_by_date() {
        let (_dir, path) = write_csv(&sample());
        let adapter = CsvAdapter::new(path, "SPY");

        let bars = adapter.fetch_ohlcv(Some(date(16)), Some(date(16))).unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].date, date(16));

        let tail = adapter.fetch_ohlcv(Some(date(16)), None).unwrap();
        assert_eq!(tail.len(), 2);
    }

    #[test]
    fn fetch_ohlcv_empty_range_is_no_data() {
        let (_dir, path) = write_csv(&sample());
        let adapter = CsvAdapter::new(path, "SPY");
        let err = adapter.fetch_ohlcv(Some(date(20)), None).unwrap_err();
        assert!(matches!(err, SpytraderError::NoData { symbol } if symbol == "SPY"));
    }

    #[test]
    fn missing_file_is_data_source_error() {
        let dir = TempDir::new().unwrap();
        let adapter = CsvAdapter::new(dir.path().join("nope.csv"), "SPY");
        assert!(matches!(
            adapter.fetch_ohlcv(None, None),
            Err(SpytraderError::DataSource { .. })
        ));
    }

    #[test]
    fn headers_are_case_insensitive_and_extra_columns_ignored() {
        let content = "Date,Open,High,Low,Close,Adj Close,Volume\n\
                       2024-01-15,100,110,90,105,104.5,50000\n";
        let bars = parse_bars(content.as_bytes(), "yahoo.csv").unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].close, 105.0);
        assert_eq!(bars[0].volume, 50000);
    }

    #[test]
    fn fractional_zero_volume_accepted() {
        let content = format!("{HEADER}2024-01-15,100,110,90,105,50000.0\n");
        let bars = parse_bars(content.as_bytes(), "spy.csv").unwrap();
        assert_eq!(bars[0].volume, 50000);
    }

    #[test]
    fn missing_column_fails() {
        let content = "date,open,high,low,close\n2024-01-15,100,110,90,105\n";
        let (row, _, reason) = reason_at(parse_bars(content.as_bytes(), "spy.csv"));
        assert_eq!(row, 0);
        assert!(reason.contains("volume"));
    }

    #[test]
    fn bad_number_names_row_and_line() {
        let content = format!(
            "{HEADER}2024-01-15,100,110,90,105,50000\n2024-01-16,100,110,90,abc,50000\n"
        );
        let (row, line, reason) = reason_at(parse_bars(content.as_bytes(), "spy.csv"));
        assert_eq!(row, 2);
        assert_eq!(line, 3);
        assert!(reason.contains("close"));
    }

    #[test]
    fn bad_date_fails() {
        let content = format!("{HEADER}01/15/2024,100,110,90,105,50000\n");
        let (row, _, reason) = reason_at(parse_bars(content.as_bytes(), "spy.csv"));
        assert_eq!(row, 1);
        assert!(reason.contains("date"));
    }

    #[test]
    fn non_positive_or_non_finite_price_fails() {
        for bad in ["0", "-5", "NaN", "inf"] {
            let content = format!("{HEADER}2024-01-15,{bad},110,90,105,50000\n");
            let (_, _, reason) = reason_at(parse_bars(content.as_bytes(), "spy.csv"));
            assert!(reason.contains("open"), "{bad}: {reason}");
        }
    }

    #[test]
    fn high_below_low_fails() {
        let content = format!("{HEADER}2024-01-15,100,90,110,105,50000\n");
        let (_, _, reason) = reason_at(parse_bars(content.as_bytes(), "spy.csv"));
        assert!(reason.contains("below low"));
    }

    #[test]
    fn negative_volume_fails() {
        let content = format!("{HEADER}2024-01-15,100,110,90,105,-1\n");
        let (_, _, reason) = reason_at(parse_bars(content.as_bytes(), "spy.csv"));
        assert!(reason.contains("volume"));
    }

    #[test]
    fn dates_must_be_strictly_ascending() {
        let content = format!(
            "{HEADER}2024-01-16,100,110,90,105,50000\n2024-01-15,100,110,90,105,50000\n"
        );
        let (row, _, reason) = reason_at(parse_bars(content.as_bytes(), "spy.csv"));
        assert_eq!(row, 2);
        assert!(reason.contains("ascending"));

        let duplicate = format!(
            "{HEADER}2024-01-16,100,110,90,105,50000\n2024-01-16,100,110,90,105,50000\n"
        );
        assert!(parse_bars(duplicate.as_bytes(), "spy.csv").is_err());
    }

    #[test]
    fn empty_cell_is_missing_value() {
        let content = format!("{HEADER}2024-01-15,100,110,,105,50000\n");
        let (_, _, reason) = reason_at(parse_bars(content.as_bytes(), "spy.csv"));
        assert_eq!(reason, "missing low value");
    }

    #[test]
    fn data_range_reports_bounds() {
        let (_dir, path) = write_csv(&sample());
        let adapter = CsvAdapter::new(path, "SPY");
        assert_eq!(adapter.data_range().unwrap(), Some((date(15), date(17), 3)));

        let (_dir2, empty) = write_csv(HEADER);
        assert_eq!(CsvAdapter::new(empty, "SPY").data_range().unwrap(), None);
    }
}
