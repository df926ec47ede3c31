use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub provider: ProviderConfig,
    pub cache: CacheConfig,
    pub ranking: RankingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    /// Upstream requests allowed per minute.
    pub rate_limit_per_minute: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Directory holding the per-asset series files.
    pub dir: String,
    /// Full-history lookback for close-only series, in days.
    pub close_lookback_days: u32,
    /// Full-history lookback for OHLC series, in days. Snapped to the
    /// provider's supported buckets at fetch time.
    pub ohlc_lookback_days: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    /// Assets below this market cap are dropped at the seeding stage.
    pub min_marketcap: f64,
    pub beta_threshold: f64,
    pub sharpe_threshold: f64,
    pub sortino_threshold: f64,
    pub omega_threshold: f64,
    /// Minimum OHLC rows required before trend analysis.
    pub min_trend_history: usize,
    /// Survivor count above which the median-score cut applies.
    pub max_shortlist: usize,
    /// Bounded fan-out for per-asset fetch/compute work.
    pub concurrency: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            provider: ProviderConfig {
                api_url: "https://pro-api.coingecko.com/api/v3".to_string(),
                api_key: None,
                rate_limit_per_minute: 300,
            },
            cache: CacheConfig {
                dir: "crypto".to_string(),
                close_lookback_days: 600,
                ohlc_lookback_days: 180,
            },
            ranking: RankingConfig::default(),
        }
    }
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            min_marketcap: 10_000_000.0,
            beta_threshold: 1.3,
            sharpe_threshold: 1.98,
            sortino_threshold: 2.89,
            omega_threshold: 1.30,
            min_trend_history: 90,
            max_shortlist: 10,
            concurrency: 8,
        }
    }
}
