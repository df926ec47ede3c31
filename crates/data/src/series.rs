use chrono::{DateTime, NaiveDate, Timelike};
use rsp_core::types::{MarketChart, OhlcBar};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One row of a close-only series. `ret` is the day-over-day percent change
/// of close; `None` for the first row of a series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CloseRow {
    pub date: NaiveDate,
    pub marketcap: f64,
    pub volume: f64,
    pub close: f64,
    #[serde(rename = "return")]
    pub ret: Option<f64>,
}

/// One row of an OHLC series (the provider's OHLC endpoint carries no volume).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OhlcRow {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

/// Close-only series ordered by date, no duplicate dates.
#[derive(Debug, Clone, Default)]
pub struct CloseSeries {
    rows: Vec<CloseRow>,
}

impl CloseSeries {
    /// Builds a series from arbitrary rows: sorts by date, keeps the first
    /// row on duplicate dates, and recomputes the return column.
    #[must_use]
    pub fn from_rows(rows: Vec<CloseRow>) -> Self {
        let mut by_date: BTreeMap<NaiveDate, CloseRow> = BTreeMap::new();
        for row in rows {
            by_date.entry(row.date).or_insert(row);
        }
        let mut series = Self {
            rows: by_date.into_values().collect(),
        };
        series.recompute_returns();
        series
    }

    /// Builds a series from a raw market chart. Points are joined on
    /// timestamp and only midnight-UTC observations are kept, so a partial
    /// current-day point never enters the series.
    #[must_use]
    pub fn from_chart(chart: &MarketChart) -> Self {
        let mut joined: BTreeMap<i64, (Option<f64>, Option<f64>, Option<f64>)> = BTreeMap::new();
        for p in &chart.prices {
            joined.entry(p.timestamp_ms).or_default().0 = Some(p.value);
        }
        for p in &chart.marketcaps {
            joined.entry(p.timestamp_ms).or_default().1 = Some(p.value);
        }
        for p in &chart.volumes {
            joined.entry(p.timestamp_ms).or_default().2 = Some(p.value);
        }

        let rows = joined
            .into_iter()
            .filter_map(|(ts, (close, marketcap, volume))| {
                let dt = DateTime::from_timestamp_millis(ts)?;
                if dt.time().num_seconds_from_midnight() != 0 {
                    return None;
                }
                Some(CloseRow {
                    date: dt.date_naive(),
                    marketcap: marketcap.unwrap_or(0.0),
                    volume: volume.unwrap_or(0.0),
                    close: close?,
                    ret: None,
                })
            })
            .collect();

        Self::from_rows(rows)
    }

    /// Merges a refresh fetch into this series. The first row of the delta
    /// is the overlap row and is dropped; on any remaining date conflict the
    /// existing row wins. Returns are recomputed over the merged series.
    #[must_use]
    pub fn merged_with(&self, delta: &Self) -> Self {
        let mut rows = self.rows.clone();
        rows.extend(delta.rows.iter().skip(1).copied());
        Self::from_rows(rows)
    }

    #[must_use]
    pub fn rows(&self) -> &[CloseRow] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.rows.last().map(|r| r.date)
    }

    #[must_use]
    pub fn last_marketcap(&self) -> Option<f64> {
        self.rows.last().map(|r| r.marketcap)
    }

    /// Daily percent returns, first (undefined) observation excluded.
    #[must_use]
    pub fn returns(&self) -> Vec<f64> {
        self.rows.iter().filter_map(|r| r.ret).collect()
    }

    #[must_use]
    pub fn volumes(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.volume).collect()
    }

    fn recompute_returns(&mut self) {
        let closes: Vec<f64> = self.rows.iter().map(|r| r.close).collect();
        for (i, row) in self.rows.iter_mut().enumerate() {
            row.ret = if i == 0 {
                None
            } else {
                Some((closes[i] - closes[i - 1]) / closes[i - 1] * 100.0)
            };
        }
    }
}

/// OHLC series ordered by date, no duplicate dates.
#[derive(Debug, Clone, Default)]
pub struct OhlcSeries {
    rows: Vec<OhlcRow>,
}

impl OhlcSeries {
    #[must_use]
    pub fn from_rows(rows: Vec<OhlcRow>) -> Self {
        let mut by_date: BTreeMap<NaiveDate, OhlcRow> = BTreeMap::new();
        for row in rows {
            by_date.entry(row.date).or_insert(row);
        }
        Self {
            rows: by_date.into_values().collect(),
        }
    }

    /// Builds a series from raw provider bars, keyed by UTC date.
    #[must_use]
    pub fn from_bars(bars: &[OhlcBar]) -> Self {
        let rows = bars
            .iter()
            .filter_map(|bar| {
                let dt = DateTime::from_timestamp_millis(bar.timestamp_ms)?;
                Some(OhlcRow {
                    date: dt.date_naive(),
                    open: bar.open,
                    high: bar.high,
                    low: bar.low,
                    close: bar.close,
                })
            })
            .collect();
        Self::from_rows(rows)
    }

    /// Same overlap-drop / keep-existing merge as `CloseSeries::merged_with`.
    #[must_use]
    pub fn merged_with(&self, delta: &Self) -> Self {
        let mut rows = self.rows.clone();
        rows.extend(delta.rows.iter().skip(1).copied());
        Self::from_rows(rows)
    }

    #[must_use]
    pub fn rows(&self) -> &[OhlcRow] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.rows.last().map(|r| r.date)
    }
}

/// Column-oriented OHLCV view fed to the indicators. The OHLC endpoint has
/// no volume, so volume is spliced in from the close-only series,
/// tail-aligned by position.
#[derive(Debug, Clone, Default)]
pub struct Ohlcv {
    pub open: Vec<f64>,
    pub high: Vec<f64>,
    pub low: Vec<f64>,
    pub close: Vec<f64>,
    pub volume: Vec<f64>,
}

impl Ohlcv {
    /// Splices the close-only series' volume column into the OHLC series.
    /// Both are truncated to the common trailing length.
    #[must_use]
    pub fn from_parts(ohlc: &OhlcSeries, close: &CloseSeries) -> Self {
        let volumes = close.volumes();
        let len = ohlc.len().min(volumes.len());
        let bars = &ohlc.rows()[ohlc.len() - len..];
        let volume = volumes[volumes.len() - len..].to_vec();

        Self {
            open: bars.iter().map(|r| r.open).collect(),
            high: bars.iter().map(|r| r.high).collect(),
            low: bars.iter().map(|r| r.low).collect(),
            close: bars.iter().map(|r| r.close).collect(),
            volume,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.close.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.close.is_empty()
    }

    /// Element-wise ratio of two series, tail-aligned by position to the
    /// common trailing length. All five columns are divided, volume included.
    #[must_use]
    pub fn ratio(&self, denominator: &Self) -> Self {
        let len = self.len().min(denominator.len());
        let div = |num: &[f64], den: &[f64]| {
            num[num.len() - len..]
                .iter()
                .zip(&den[den.len() - len..])
                .map(|(n, d)| n / d)
                .collect::<Vec<f64>>()
        };

        Self {
            open: div(&self.open, &denominator.open),
            high: div(&self.high, &denominator.high),
            low: div(&self.low, &denominator.low),
            close: div(&self.close, &denominator.close),
            volume: div(&self.volume, &denominator.volume),
        }
    }
}
