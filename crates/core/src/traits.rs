use crate::types::{AssetCategory, CoinListing, CoinMeta, MarketChart, OhlcBar};
use anyhow::Result;
use async_trait::async_trait;

/// Capability interface over the market-data provider. Any provider that
/// satisfies this contract is interchangeable; the pipeline and cache never
/// talk HTTP directly.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Top assets by market cap, optionally filtered by category.
    async fn market_list(&self, category: AssetCategory, limit: usize)
        -> Result<Vec<CoinListing>>;

    /// Daily OHLC bars covering the last `days` days.
    async fn ohlc(&self, id: &str, days: u32) -> Result<Vec<OhlcBar>>;

    /// Daily close/marketcap/volume chart covering the last `days` days.
    async fn market_chart(&self, id: &str, days: u32) -> Result<MarketChart>;

    /// Contract platforms and categories for a single asset.
    async fn coin_meta(&self, id: &str) -> Result<CoinMeta>;
}
