//! Trend/regime sub-indicators. Each emits a discrete signal in
//! {-1, 0, 1}; the TPI module averages them.
//!
//! Windowed values that are not yet defined are carried as NaN so the
//! comparison logic degrades to "no signal" instead of erroring, matching
//! the charting-platform semantics these detectors were lifted from.

use rsp_data::Ohlcv;

const RSI_PERIOD: usize = 21;
const RSI_SD_WINDOW: usize = 8;

const SUPERTREND_ATR_PERIOD: usize = 5;
const SUPERTREND_MEDIAN_WINDOW: usize = 5;
const SUPERTREND_MULTIPLIER: f64 = 1.35;

const VWAP_WINDOW: usize = 50;
const VWAP_BAND_WIDTH: f64 = 0.5;

/// RSI with Wilder smoothing. Output is NaN until index `period`.
#[must_use]
pub fn rsi_wilder(close: &[f64], period: usize) -> Vec<f64> {
    let n = close.len();
    let mut out = vec![f64::NAN; n];
    if period == 0 || n < period + 1 {
        return out;
    }

    let gains_losses: Vec<(f64, f64)> = close
        .windows(2)
        .map(|w| {
            let change = w[1] - w[0];
            (change.max(0.0), (-change).max(0.0))
        })
        .collect();

    let mut avg_gain: f64 =
        gains_losses[..period].iter().map(|(g, _)| g).sum::<f64>() / period as f64;
    let mut avg_loss: f64 =
        gains_losses[..period].iter().map(|(_, l)| l).sum::<f64>() / period as f64;
    out[period] = rsi_value(avg_gain, avg_loss);

    for (i, (gain, loss)) in gains_losses.iter().enumerate().skip(period) {
        avg_gain = (avg_gain * (period as f64 - 1.0) + gain) / period as f64;
        avg_loss = (avg_loss * (period as f64 - 1.0) + loss) / period as f64;
        out[i + 1] = rsi_value(avg_gain, avg_loss);
    }

    out
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_gain + avg_loss == 0.0 {
        return 50.0;
    }
    100.0 * avg_gain / (avg_gain + avg_loss)
}

/// Population standard deviation of the trailing `window` values, NaN when
/// fewer exist or any of them is NaN.
fn trailing_pop_std(xs: &[f64], window: usize) -> f64 {
    if xs.len() < window || window == 0 {
        return f64::NAN;
    }
    let tail = &xs[xs.len() - window..];
    let m = tail.iter().sum::<f64>() / window as f64;
    (tail.iter().map(|x| (x - m).powi(2)).sum::<f64>() / window as f64).sqrt()
}

/// RSI-deviation signal: `d = RSI_last - stddev(RSI, 8)_last`;
/// short (-1) when RSI < 50, long (+1) when `d > 50` and not short,
/// else neutral. The short condition takes priority.
#[must_use]
pub fn rsi_deviation_signal(close: &[f64]) -> i8 {
    let rsi_series = rsi_wilder(close, RSI_PERIOD);
    let defined: Vec<f64> = rsi_series.iter().copied().filter(|v| !v.is_nan()).collect();

    let rsi_last = defined.last().copied().unwrap_or(f64::NAN);
    let sd_last = trailing_pop_std(&defined, RSI_SD_WINDOW);
    let d = rsi_last - sd_last;

    // NaN comparisons are false, so an undefined RSI or deviation yields 0.
    if rsi_last < 50.0 {
        -1
    } else if d > 50.0 {
        1
    } else {
        0
    }
}

/// Wilder-smoothed Average True Range. NaN until index `period`.
#[must_use]
pub fn atr_wilder(high: &[f64], low: &[f64], close: &[f64], period: usize) -> Vec<f64> {
    let n = close.len();
    let mut out = vec![f64::NAN; n];
    if period == 0 || n < period + 1 {
        return out;
    }

    let tr: Vec<f64> = (1..n)
        .map(|i| {
            let hl = high[i] - low[i];
            let hc = (high[i] - close[i - 1]).abs();
            let lc = (low[i] - close[i - 1]).abs();
            hl.max(hc).max(lc)
        })
        .collect();

    let mut atr = tr[..period].iter().sum::<f64>() / period as f64;
    out[period] = atr;
    for (i, value) in tr.iter().enumerate().skip(period) {
        atr = (atr * (period as f64 - 1.0) + value) / period as f64;
        out[i + 1] = atr;
    }

    out
}

/// Rolling median over `window`, NaN until the window fills.
#[must_use]
pub fn rolling_median(xs: &[f64], window: usize) -> Vec<f64> {
    let n = xs.len();
    let mut out = vec![f64::NAN; n];
    if window == 0 {
        return out;
    }
    for i in (window - 1)..n {
        let mut w: Vec<f64> = xs[i + 1 - window..=i].to_vec();
        w.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        out[i] = if window % 2 == 1 {
            w[window / 2]
        } else {
            (w[window / 2 - 1] + w[window / 2]) / 2.0
        };
    }
    out
}

/// Median Supertrend signal.
///
/// Bands are `median(close, 5) ± 1.35 * ATR(5)`. The classic recurrence
/// ratchets band values toward price (the lower band only rises, the upper
/// band only falls, resetting when price crosses), and direction flips when
/// price crosses the previously-active band. While ATR at `i-1` is still
/// undefined the direction seeds to the short-qualifying side.
#[must_use]
pub fn median_supertrend_signal(series: &Ohlcv) -> i8 {
    let n = series.len();
    if n < 2 {
        return 0;
    }

    let atr = atr_wilder(&series.high, &series.low, &series.close, SUPERTREND_ATR_PERIOD);
    let median = rolling_median(&series.close, SUPERTREND_MEDIAN_WINDOW);
    let upper: Vec<f64> = median
        .iter()
        .zip(&atr)
        .map(|(m, a)| m + SUPERTREND_MULTIPLIER * a)
        .collect();
    let lower: Vec<f64> = median
        .iter()
        .zip(&atr)
        .map(|(m, a)| m - SUPERTREND_MULTIPLIER * a)
        .collect();

    let close = &series.close;
    let mut direction: i8 = 0;
    let mut prev_supertrend = f64::NAN;

    for i in 1..n {
        let prev_lower = lower[i - 1];
        let prev_upper = upper[i - 1];

        // Ratchet: the lower band only rises, the upper band only falls,
        // unless the previous close already crossed the old band.
        let mut l = lower[i];
        if !(l > prev_lower || close[i - 1] < prev_lower) {
            l = prev_lower;
        }
        let mut u = upper[i];
        if !(u < prev_upper || close[i - 1] > prev_upper) {
            u = prev_upper;
        }

        if atr[i - 1].is_nan() {
            direction = 1;
        } else if prev_supertrend == prev_upper {
            direction = if close[i] > u { -1 } else { 1 };
        } else {
            direction = if close[i] < l { 1 } else { -1 };
        }

        prev_supertrend = if direction == -1 { l } else { u };
    }

    // direction -1 is the long-qualifying side of the recurrence.
    match direction {
        d if d < 0 => 1,
        d if d > 0 => -1,
        _ => 0,
    }
}

/// Volume-weighted moving average of the trailing `window` observations.
/// Non-finite sums and zero total volume collapse to 0.
fn vwma_trailing(src: &[f64], volume: &[f64], window: usize) -> f64 {
    let len = src.len().min(volume.len());
    let take = window.min(len);
    let mut sum_vol_price = 0.0;
    let mut sum_vol = 0.0;
    for i in 0..take {
        sum_vol_price += src[len - 1 - i] * volume[len - 1 - i];
        sum_vol += volume[len - 1 - i];
    }
    if sum_vol_price.is_infinite() || sum_vol.is_infinite() || sum_vol <= 0.0 {
        return 0.0;
    }
    sum_vol_price / sum_vol
}

/// Volume-weighted standard deviation around `vwma` over the trailing
/// `window` observations.
fn vw_stddev_trailing(src: &[f64], volume: &[f64], window: usize, vwma: f64) -> f64 {
    let len = src.len().min(volume.len());
    let take = window.min(len);
    let mut sum_var = 0.0;
    let mut sum_vol = 0.0;
    for i in 0..take {
        let idx = len - 1 - i;
        sum_var += volume[idx] * (src[idx] - vwma).powi(2);
        sum_vol += volume[idx];
    }
    let mean_var = sum_var / take as f64;
    let mean_vol = sum_vol / take as f64;
    if mean_var.is_infinite() || mean_vol.is_infinite() {
        return 0.0;
    }
    (mean_var / mean_vol).sqrt()
}

/// Rolling-VWAP trend signals: `(base, trending_up, trending_down)`.
///
/// Base signal is the sign of `close_last - VWMA(50)`; the trend signals
/// fire when the last close escapes the `±0.5σ` volume-weighted band.
/// All-zero volume or fewer than 50 observations short-circuit to zeros.
#[must_use]
pub fn rolling_vwap_signals(series: &Ohlcv) -> (i8, i8, i8) {
    let close = &series.close;
    let volume = &series.volume;

    if volume.iter().all(|v| *v == 0.0) || close.len() < VWAP_WINDOW {
        return (0, 0, 0);
    }

    let vwma = vwma_trailing(close, volume, VWAP_WINDOW);
    let stdev = vw_stddev_trailing(close, volume, VWAP_WINDOW, vwma);

    let upper = vwma + stdev * VWAP_BAND_WIDTH;
    let lower = vwma - stdev * VWAP_BAND_WIDTH;

    let last = *close.last().expect("length checked above");

    let signal = if last > vwma {
        1
    } else if last < vwma {
        -1
    } else {
        0
    };
    let trending_up = i8::from(last > upper);
    let trending_down = if last < lower { -1 } else { 0 };

    (signal, trending_up, trending_down)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_volume(n: usize) -> Vec<f64> {
        vec![1000.0; n]
    }

    fn ohlcv_from_close(close: Vec<f64>, volume: Vec<f64>) -> Ohlcv {
        Ohlcv {
            open: close.clone(),
            high: close.iter().map(|c| c * 1.01).collect(),
            low: close.iter().map(|c| c * 0.99).collect(),
            close,
            volume,
        }
    }

    fn ramp(n: usize, start: f64, step: f64) -> Vec<f64> {
        (0..n).map(|i| start + step * i as f64).collect()
    }

    // ============================================
    // RSI
    // ============================================

    #[test]
    fn rsi_is_100_for_monotonic_rise() {
        let close = ramp(40, 100.0, 1.0);
        let rsi = rsi_wilder(&close, 21);
        assert!(rsi[..21].iter().all(|v| v.is_nan()));
        assert!((rsi.last().unwrap() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn rsi_is_0_for_monotonic_fall() {
        let close = ramp(40, 100.0, -1.0);
        let rsi = rsi_wilder(&close, 21);
        assert!((rsi.last().unwrap() - 0.0).abs() < 1e-9);
    }

    #[test]
    fn rsi_undefined_for_short_series() {
        let rsi = rsi_wilder(&[1.0, 2.0, 3.0], 21);
        assert!(rsi.iter().all(|v| v.is_nan()));
    }

    // ============================================
    // RSI-deviation signal
    // ============================================

    #[test]
    fn rsi_deviation_long_on_strong_steady_uptrend() {
        // Steady climb keeps RSI near 100 with a tiny deviation:
        // d > 50 and RSI >= 50 -> long.
        let close = ramp(120, 100.0, 1.0);
        assert_eq!(rsi_deviation_signal(&close), 1);
    }

    #[test]
    fn rsi_deviation_short_on_downtrend() {
        let close = ramp(120, 300.0, -1.0);
        assert_eq!(rsi_deviation_signal(&close), -1);
    }

    #[test]
    fn rsi_deviation_neutral_without_enough_history() {
        let close = ramp(10, 100.0, 1.0);
        assert_eq!(rsi_deviation_signal(&close), 0);
    }

    // ============================================
    // ATR / median
    // ============================================

    #[test]
    fn atr_defined_from_period_onward() {
        let close = ramp(10, 100.0, 1.0);
        let high: Vec<f64> = close.iter().map(|c| c + 1.0).collect();
        let low: Vec<f64> = close.iter().map(|c| c - 1.0).collect();
        let atr = atr_wilder(&high, &low, &close, 5);

        assert!(atr[..5].iter().all(|v| v.is_nan()));
        assert!(atr[5..].iter().all(|v| !v.is_nan() && *v > 0.0));
    }

    #[test]
    fn rolling_median_odd_window() {
        let xs = vec![5.0, 1.0, 4.0, 2.0, 3.0];
        let med = rolling_median(&xs, 5);
        assert!(med[..4].iter().all(|v| v.is_nan()));
        assert!((med[4] - 3.0).abs() < f64::EPSILON);
    }

    // ============================================
    // Median Supertrend
    // ============================================

    #[test]
    fn supertrend_long_in_sustained_uptrend() {
        let series = ohlcv_from_close(ramp(60, 100.0, 2.0), flat_volume(60));
        assert_eq!(median_supertrend_signal(&series), 1);
    }

    #[test]
    fn supertrend_short_in_sustained_downtrend() {
        let series = ohlcv_from_close(ramp(60, 300.0, -2.0), flat_volume(60));
        assert_eq!(median_supertrend_signal(&series), -1);
    }

    #[test]
    fn supertrend_neutral_on_tiny_series() {
        let series = ohlcv_from_close(vec![100.0], flat_volume(1));
        assert_eq!(median_supertrend_signal(&series), 0);
    }

    // ============================================
    // Rolling VWAP
    // ============================================

    #[test]
    fn vwap_zeroes_on_all_zero_volume() {
        let series = ohlcv_from_close(ramp(80, 100.0, 1.0), vec![0.0; 80]);
        assert_eq!(rolling_vwap_signals(&series), (0, 0, 0));
    }

    #[test]
    fn vwap_zeroes_below_window() {
        let series = ohlcv_from_close(ramp(49, 100.0, 1.0), flat_volume(49));
        assert_eq!(rolling_vwap_signals(&series), (0, 0, 0));
    }

    #[test]
    fn vwap_bullish_and_trending_up_on_breakout() {
        // Flat price, then a sharp rally: last close far above VWMA + band.
        let mut close = vec![100.0; 60];
        close.extend(ramp(10, 101.0, 5.0));
        let n = close.len();
        let series = ohlcv_from_close(close, flat_volume(n));

        let (signal, up, down) = rolling_vwap_signals(&series);
        assert_eq!(signal, 1);
        assert_eq!(up, 1);
        assert_eq!(down, 0);
    }

    #[test]
    fn vwap_bearish_and_trending_down_on_breakdown() {
        let mut close = vec![100.0; 60];
        close.extend(ramp(10, 99.0, -5.0));
        let n = close.len();
        let series = ohlcv_from_close(close, flat_volume(n));

        let (signal, up, down) = rolling_vwap_signals(&series);
        assert_eq!(signal, -1);
        assert_eq!(up, 0);
        assert_eq!(down, -1);
    }
}
