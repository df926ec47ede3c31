//! Per-asset historical series with incremental update-or-create caching.
//!
//! This crate provides:
//! - Typed close-only and OHLC series with strictly-increasing unique dates
//! - A flat CSV store, one file per asset per series kind
//! - A `SeriesCache` that decides fetch-none / fetch-delta / fetch-full via
//!   a pure freshness policy and merges refreshes without ever overwriting
//!   a good cache with partial data

pub mod cache;
pub mod series;
pub mod store;

pub use cache::{Cached, FetchPlan, FreshnessPolicy, SeriesCache};
pub use series::{CloseRow, CloseSeries, OhlcRow, OhlcSeries, Ohlcv};
pub use store::CsvStore;
