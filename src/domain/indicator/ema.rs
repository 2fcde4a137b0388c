//! Exponential moving average over closes, used by MACD.
//!
//! k = 2/(n+1), seed with first SMA, then EMA[i] = C[i]*k + EMA[i-1]*(1-k).
//! Warmup: first (n-1) bars are invalid.

use crate::domain::ohlcv::OhlcvBar;

/// Raw EMA values over closes, `0.0` during warmup.
pub(crate) fn ema_raw_values(bars: &[OhlcvBar], period: usize) -> Vec<f64> {
    if period == 0 || bars.is_empty() {
        return Vec::new();
    }

    let mut values = Vec::with_capacity(bars.len());
    let k = 2.0 / (period as f64 + 1.0);
    let mut ema = 0.0;
    let mut sum = 0.0;

    for (i, bar) in bars.iter().enumerate() {
        if i + 1 < period {
            sum += bar.close;
            values.push(0.0);
            continue;
        }
        ema = if i + 1 == period {
            (sum + bar.close) / period as f64
        } else {
            bar.close * k + ema * (1.0 - k)
        };
        values.push(ema);
    }

    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::make_bars;

    #[test]
    fn ema_warmup_is_zero() {
        let raw = ema_raw_values(&make_bars(&[10.0, 20.0, 30.0, 40.0, 50.0]), 3);
        assert_eq!(raw.len(), 5);
        assert_eq!(raw[0], 0.0);
        assert_eq!(raw[1], 0.0);
        assert!(raw[2] > 0.0);
    }

    #[test]
    fn ema_seed_is_sma() {
        let raw = ema_raw_values(&make_bars(&[10.0, 20.0, 30.0]), 3);
        assert!((raw[2] - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn ema_recursive_calculation() {
        let raw = ema_raw_values(&make_bars(&[10.0, 20.0, 30.0, 40.0, 50.0]), 3);

        let k = 0.5;
        let ema_3 = 40.0 * k + 20.0 * (1.0 - k);
        let ema_4 = 50.0 * k + ema_3 * (1.0 - k);
        assert!((raw[3] - ema_3).abs() < f64::EPSILON);
        assert!((raw[4] - ema_4).abs() < f64::EPSILON);
    }

    #[test]
    fn ema_equal_prices() {
        let raw = ema_raw_values(&make_bars(&[100.0; 6]), 3);
        for v in &raw[2..] {
            assert!((v - 100.0).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn ema_period_two() {
        let raw = ema_raw_values(&make_bars(&[10.0, 20.0, 30.0]), 2);
        assert_eq!(raw[0], 0.0);
        assert!((raw[1] - 15.0).abs() < f64::EPSILON);
    }

    #[test]
    fn ema_empty_and_zero_period() {
        assert!(ema_raw_values(&[], 3).is_empty());
        assert!(ema_raw_values(&make_bars(&[1.0, 2.0]), 0).is_empty());
    }
}
