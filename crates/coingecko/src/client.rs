use anyhow::{Context, Result};
use async_trait::async_trait;
use governor::{clock::DefaultClock, state::InMemoryState, Quota, RateLimiter};
use rsp_core::config::ProviderConfig;
use rsp_core::traits::MarketDataProvider;
use rsp_core::types::{AssetCategory, CoinListing, CoinMeta, MarketChart, OhlcBar, TimePoint};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::debug;

/// Market list page size supported by the provider.
const PAGE_SIZE: usize = 100;

/// Asset ids that are never allowed into the universe.
const BLOCKED_ID_FRAGMENTS: [&str; 1] = ["opacity"];

pub struct CoinGeckoClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    rate_limiter: Arc<RateLimiter<governor::state::direct::NotKeyed, InMemoryState, DefaultClock>>,
}

impl CoinGeckoClient {
    /// Creates a client from provider config. Requests are throttled to the
    /// configured per-minute budget; a zero budget falls back to one.
    #[must_use]
    pub fn new(config: &ProviderConfig) -> Self {
        let per_minute =
            NonZeroU32::new(config.rate_limit_per_minute).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_minute(per_minute)));

        Self {
            http_client: reqwest::Client::new(),
            base_url: config.api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            rate_limiter,
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path_and_query: &str) -> Result<T> {
        self.rate_limiter.until_ready().await;
        let url = format!("{}{}", self.base_url, path_and_query);
        debug!(%url, "GET");

        let mut request = self
            .http_client
            .get(&url)
            .header("accept", "application/json");
        if let Some(key) = &self.api_key {
            request = request.header("x-cg-pro-api-key", key);
        }

        let response = request.send().await?.error_for_status()?;
        let parsed = response
            .json::<T>()
            .await
            .with_context(|| format!("Failed to parse response from {url}"))?;
        Ok(parsed)
    }
}

#[derive(Debug, Deserialize)]
struct MarketListEntry {
    id: String,
    symbol: String,
    market_cap_rank: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct MarketChartPayload {
    prices: Vec<(i64, Option<f64>)>,
    market_caps: Vec<(i64, Option<f64>)>,
    total_volumes: Vec<(i64, Option<f64>)>,
}

#[derive(Debug, Deserialize)]
struct CoinPayload {
    #[serde(default)]
    platforms: BTreeMap<String, Option<String>>,
    #[serde(default)]
    categories: Vec<Option<String>>,
}

fn to_points(raw: Vec<(i64, Option<f64>)>) -> Vec<TimePoint> {
    raw.into_iter()
        .filter_map(|(timestamp_ms, value)| {
            Some(TimePoint {
                timestamp_ms,
                value: value?,
            })
        })
        .collect()
}

fn is_blocked(id: &str) -> bool {
    BLOCKED_ID_FRAGMENTS
        .iter()
        .any(|fragment| id.contains(fragment))
}

#[async_trait]
impl MarketDataProvider for CoinGeckoClient {
    async fn market_list(
        &self,
        category: AssetCategory,
        limit: usize,
    ) -> Result<Vec<CoinListing>> {
        let pages = limit.div_ceil(PAGE_SIZE).max(1);
        let mut listings: Vec<CoinListing> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for page in 1..=pages {
            let mut path = format!(
                "/coins/markets?vs_currency=usd&order=market_cap_desc&per_page={PAGE_SIZE}&page={page}"
            );
            if let Some(slug) = category.provider_slug() {
                path.push_str("&category=");
                path.push_str(slug);
            }

            let entries: Vec<MarketListEntry> = self.get_json(&path).await?;
            if entries.is_empty() {
                break;
            }
            for entry in entries {
                if is_blocked(&entry.id) || !seen.insert(entry.id.clone()) {
                    continue;
                }
                listings.push(CoinListing {
                    id: entry.id,
                    symbol: entry.symbol,
                    market_cap_rank: entry.market_cap_rank,
                });
            }
        }

        listings.truncate(limit);
        Ok(listings)
    }

    async fn ohlc(&self, id: &str, days: u32) -> Result<Vec<OhlcBar>> {
        let path = format!("/coins/{id}/ohlc?vs_currency=usd&days={days}&interval=daily");
        let raw: Vec<Vec<f64>> = self.get_json(&path).await?;

        let bars = raw
            .into_iter()
            .filter_map(|row| {
                if row.len() < 5 {
                    return None;
                }
                #[allow(clippy::cast_possible_truncation)]
                Some(OhlcBar {
                    timestamp_ms: row[0] as i64,
                    open: row[1],
                    high: row[2],
                    low: row[3],
                    close: row[4],
                })
            })
            .collect();
        Ok(bars)
    }

    async fn market_chart(&self, id: &str, days: u32) -> Result<MarketChart> {
        let path = format!("/coins/{id}/market_chart?vs_currency=usd&days={days}&interval=daily");
        let payload: MarketChartPayload = self.get_json(&path).await?;

        Ok(MarketChart {
            prices: to_points(payload.prices),
            marketcaps: to_points(payload.market_caps),
            volumes: to_points(payload.total_volumes),
        })
    }

    async fn coin_meta(&self, id: &str) -> Result<CoinMeta> {
        let path = format!("/coins/{id}");
        let payload: CoinPayload = self.get_json(&path).await?;

        let platforms = payload
            .platforms
            .into_iter()
            .filter_map(|(platform, address)| {
                let address = address?;
                if platform.is_empty() || address.is_empty() {
                    return None;
                }
                Some((platform, address))
            })
            .collect();
        let categories = payload.categories.into_iter().flatten().collect();

        Ok(CoinMeta {
            platforms,
            categories,
        })
    }
}
