use crate::series::{CloseSeries, OhlcSeries};
use crate::store::CsvStore;
use anyhow::Result;
use chrono::{NaiveDate, Utc};
use rsp_core::config::CacheConfig;
use rsp_core::error::RspError;
use rsp_core::traits::MarketDataProvider;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// OHLC day windows accepted by the provider. Requested windows are snapped
/// up to the nearest bucket.
const OHLC_DAY_BUCKETS: [u32; 7] = [1, 7, 14, 30, 60, 90, 180];

/// Pure fetch decision for a cached series: nothing, the missing delta, or
/// full history. Kept separate from the I/O executor so it can be tested
/// without a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPlan {
    UpToDate,
    /// Fetch the last `days` days; the first row overlaps the cache tail.
    FetchDelta { days: u32 },
    FetchFull,
}

pub struct FreshnessPolicy;

impl FreshnessPolicy {
    /// Decides what to fetch given the cache tail date and today.
    #[must_use]
    pub fn plan(last_cached: Option<NaiveDate>, today: NaiveDate) -> FetchPlan {
        match last_cached {
            None => FetchPlan::FetchFull,
            Some(last) => {
                let gap = (today - last).num_days();
                if gap <= 0 {
                    FetchPlan::UpToDate
                } else {
                    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                    FetchPlan::FetchDelta { days: gap as u32 + 1 }
                }
            }
        }
    }
}

/// A series handed out by the cache. `stale` marks a series whose refresh
/// fetch failed; the last good cache is returned instead of an error.
#[derive(Debug, Clone)]
pub struct Cached<T> {
    pub series: T,
    pub stale: bool,
}

/// Update-or-create cache over per-asset close-only and OHLC series.
///
/// Every successful fetch path writes the merged series back to disk; a
/// failed refresh never overwrites a good cache.
pub struct SeriesCache {
    provider: Arc<dyn MarketDataProvider>,
    store: CsvStore,
    config: CacheConfig,
}

impl SeriesCache {
    #[must_use]
    pub fn new(provider: Arc<dyn MarketDataProvider>, config: CacheConfig) -> Self {
        let store = CsvStore::new(config.dir.clone());
        Self {
            provider,
            store,
            config,
        }
    }

    /// Returns the close-only series for an asset, fetching full history or
    /// the missing delta as needed.
    ///
    /// # Errors
    /// Returns `DataUnavailable` when no cache exists and the upstream fetch
    /// yields no rows; propagates store read/write failures.
    pub async fn get_close(&self, id: &str) -> Result<Cached<CloseSeries>> {
        let today = Utc::now().date_naive();
        let existing = self.store.read_close(id)?;
        let last = existing.as_ref().and_then(CloseSeries::last_date);

        match FreshnessPolicy::plan(last, today) {
            FetchPlan::UpToDate => {
                debug!(id, "close series up to date");
                Ok(Cached {
                    series: existing.unwrap_or_default(),
                    stale: false,
                })
            }
            FetchPlan::FetchFull => {
                let chart = self
                    .provider
                    .market_chart(id, self.config.close_lookback_days)
                    .await?;
                let series = CloseSeries::from_chart(&chart);
                if series.is_empty() {
                    return Err(RspError::DataUnavailable { id: id.to_string() }.into());
                }
                self.store.write_close(id, &series)?;
                info!(id, rows = series.len(), "cached full close series");
                Ok(Cached {
                    series,
                    stale: false,
                })
            }
            FetchPlan::FetchDelta { days } => {
                let existing = existing.unwrap_or_default();
                match self.provider.market_chart(id, days).await {
                    Ok(chart) => {
                        let delta = CloseSeries::from_chart(&chart);
                        if delta.is_empty() {
                            warn!(id, "close refresh returned no rows, using stale cache");
                            return Ok(Cached {
                                series: existing,
                                stale: true,
                            });
                        }
                        let merged = existing.merged_with(&delta);
                        self.store.write_close(id, &merged)?;
                        debug!(id, rows = merged.len(), "refreshed close series");
                        Ok(Cached {
                            series: merged,
                            stale: false,
                        })
                    }
                    Err(e) => {
                        warn!(id, error = %e, "close refresh failed, using stale cache");
                        Ok(Cached {
                            series: existing,
                            stale: true,
                        })
                    }
                }
            }
        }
    }

    /// Returns the OHLC series for an asset with the same update-or-create
    /// semantics as [`get_close`](Self::get_close). Fetch windows are
    /// snapped up to the provider's day buckets.
    ///
    /// # Errors
    /// Returns `DataUnavailable` when no cache exists and the upstream fetch
    /// yields no rows; propagates store read/write failures.
    pub async fn get_ohlc(&self, id: &str) -> Result<Cached<OhlcSeries>> {
        let today = Utc::now().date_naive();
        let existing = self.store.read_ohlc(id)?;
        let last = existing.as_ref().and_then(OhlcSeries::last_date);

        match FreshnessPolicy::plan(last, today) {
            FetchPlan::UpToDate => {
                debug!(id, "ohlc series up to date");
                Ok(Cached {
                    series: existing.unwrap_or_default(),
                    stale: false,
                })
            }
            FetchPlan::FetchFull => {
                let days = snap_ohlc_days(self.config.ohlc_lookback_days);
                let bars = self.provider.ohlc(id, days).await?;
                let series = OhlcSeries::from_bars(&bars);
                if series.is_empty() {
                    return Err(RspError::DataUnavailable { id: id.to_string() }.into());
                }
                self.store.write_ohlc(id, &series)?;
                info!(id, rows = series.len(), "cached full ohlc series");
                Ok(Cached {
                    series,
                    stale: false,
                })
            }
            FetchPlan::FetchDelta { days } => {
                let existing = existing.unwrap_or_default();
                match self.provider.ohlc(id, snap_ohlc_days(days)).await {
                    Ok(bars) => {
                        let delta = OhlcSeries::from_bars(&bars);
                        if delta.is_empty() {
                            warn!(id, "ohlc refresh returned no rows, using stale cache");
                            return Ok(Cached {
                                series: existing,
                                stale: true,
                            });
                        }
                        let merged = existing.merged_with(&delta);
                        self.store.write_ohlc(id, &merged)?;
                        debug!(id, rows = merged.len(), "refreshed ohlc series");
                        Ok(Cached {
                            series: merged,
                            stale: false,
                        })
                    }
                    Err(e) => {
                        warn!(id, error = %e, "ohlc refresh failed, using stale cache");
                        Ok(Cached {
                            series: existing,
                            stale: true,
                        })
                    }
                }
            }
        }
    }
}

/// Snaps a requested day window up to the nearest provider bucket; windows
/// beyond the largest bucket are capped at it.
#[must_use]
pub fn snap_ohlc_days(days: u32) -> u32 {
    OHLC_DAY_BUCKETS
        .iter()
        .copied()
        .find(|bucket| *bucket >= days)
        .unwrap_or(*OHLC_DAY_BUCKETS.last().expect("buckets are non-empty"))
}
