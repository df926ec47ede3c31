//! Trend Position Indicator: the arithmetic mean of the five discrete
//! sub-signals, plus the regime label derived from them.

use crate::indicators::{median_supertrend_signal, rolling_vwap_signals, rsi_deviation_signal};
use rsp_core::types::{Regime, TpiResult};
use rsp_data::Ohlcv;

/// Computes the TPI and regime for one OHLCV series.
///
/// `tpi = (rsi + supertrend + vwap + trending_up + trending_down) / 5`,
/// always in [-1, 1]. Regime precedence, first match wins:
/// trending up, trending down, bullish side of band, bearish side of band,
/// sideways.
#[must_use]
pub fn tpi_aggregate(series: &Ohlcv) -> TpiResult {
    let rsi = rsi_deviation_signal(&series.close);
    let supertrend = median_supertrend_signal(series);
    let (vwap, trending_up, trending_down) = rolling_vwap_signals(series);

    let tpi =
        f64::from(rsi + supertrend + vwap + trending_up + trending_down) / 5.0;

    TpiResult {
        tpi,
        regime: classify(vwap, trending_up, trending_down),
    }
}

/// Regime from the VWAP-family signals, first match wins.
fn classify(vwap: i8, trending_up: i8, trending_down: i8) -> Regime {
    if trending_up == 1 {
        Regime::Up
    } else if trending_down == -1 {
        Regime::Down
    } else if vwap == 1 {
        Regime::UpSideways
    } else if vwap == -1 {
        Regime::DownSideways
    } else {
        Regime::Sideways
    }
}

/// Relative-strength TPI: position-aligns the trailing OHLCV of the asset
/// and the major benchmark, divides element-wise, and runs the same TPI on
/// the ratio series.
#[must_use]
pub fn tpi_vs_major(asset: &Ohlcv, major: &Ohlcv) -> TpiResult {
    tpi_aggregate(&asset.ratio(major))
}
