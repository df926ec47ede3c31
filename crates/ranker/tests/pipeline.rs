//! End-to-end ranking runs against an in-memory provider and a tempdir
//! cache. Series are built so the trend regimes and betas are known in
//! advance.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use rsp_core::config::{CacheConfig, RankingConfig};
use rsp_core::error::RspError;
use rsp_core::traits::MarketDataProvider;
use rsp_core::types::{
    AssetCategory, CoinListing, CoinMeta, MarketChart, OhlcBar, Regime, TimePoint,
};
use rsp_data::SeriesCache;
use rsp_ranker::RankingPipeline;
use std::collections::BTreeMap;
use std::sync::Arc;

const DAY_MS: i64 = 86_400_000;

struct MockCoin {
    id: &'static str,
    closes: Vec<f64>,
    marketcap: f64,
}

/// Serves fixed daily series ending at today's UTC midnight.
struct MockProvider {
    coins: Vec<MockCoin>,
}

impl MockProvider {
    fn coin(&self, id: &str) -> Option<&MockCoin> {
        self.coins.iter().find(|c| c.id == id)
    }

    fn today_midnight_ms() -> i64 {
        Utc::now()
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .expect("midnight is valid")
            .and_utc()
            .timestamp_millis()
    }

    fn timestamps(n: usize) -> Vec<i64> {
        let end = Self::today_midnight_ms();
        (0..n)
            .map(|i| end - ((n - 1 - i) as i64) * DAY_MS)
            .collect()
    }
}

#[async_trait]
impl MarketDataProvider for MockProvider {
    async fn market_list(
        &self,
        _category: AssetCategory,
        limit: usize,
    ) -> Result<Vec<CoinListing>> {
        Ok(self
            .coins
            .iter()
            .take(limit)
            .enumerate()
            .map(|(rank, coin)| CoinListing {
                id: coin.id.to_string(),
                symbol: coin.id.to_string(),
                market_cap_rank: Some(rank as u32 + 1),
            })
            .collect())
    }

    async fn ohlc(&self, id: &str, _days: u32) -> Result<Vec<OhlcBar>> {
        let coin = self.coin(id).ok_or_else(|| anyhow::anyhow!("unknown id"))?;
        let timestamps = Self::timestamps(coin.closes.len());
        Ok(coin
            .closes
            .iter()
            .zip(&timestamps)
            .map(|(close, ts)| OhlcBar {
                timestamp_ms: *ts,
                open: *close,
                high: close * 1.01,
                low: close * 0.99,
                close: *close,
            })
            .collect())
    }

    async fn market_chart(&self, id: &str, _days: u32) -> Result<MarketChart> {
        let coin = self.coin(id).ok_or_else(|| anyhow::anyhow!("unknown id"))?;
        let timestamps = Self::timestamps(coin.closes.len());
        let points = |value: &dyn Fn(usize) -> f64| -> Vec<TimePoint> {
            timestamps
                .iter()
                .enumerate()
                .map(|(i, ts)| TimePoint {
                    timestamp_ms: *ts,
                    value: value(i),
                })
                .collect()
        };

        Ok(MarketChart {
            prices: points(&|i| coin.closes[i]),
            marketcaps: points(&|_| coin.marketcap),
            volumes: points(&|_| 1000.0),
        })
    }

    async fn coin_meta(&self, id: &str) -> Result<CoinMeta> {
        let mut platforms = BTreeMap::new();
        if id == "alpha-coin" {
            platforms.insert("ethereum".to_string(), "0xabc123".to_string());
        }
        Ok(CoinMeta {
            platforms,
            categories: vec![],
        })
    }
}

/// 60 flat days followed by 60 rising days.
fn benchmark_closes() -> Vec<f64> {
    let mut closes = vec![100.0; 60];
    closes.extend((1..=60).map(|i| 100.0 + 2.0 * f64::from(i)));
    closes
}

/// A price path whose daily returns are `k` times the benchmark's.
fn leveraged_closes(benchmark: &[f64], k: f64, start: f64) -> Vec<f64> {
    let mut out = vec![start];
    for window in benchmark.windows(2) {
        let r = window[1] / window[0] - 1.0;
        let prev = *out.last().expect("seeded with start");
        out.push(prev * (1.0 + k * r));
    }
    out
}

fn pipeline_with(coins: Vec<MockCoin>, dir: &std::path::Path) -> RankingPipeline {
    let provider: Arc<dyn MarketDataProvider> = Arc::new(MockProvider { coins });
    let cache_config = CacheConfig {
        dir: dir.to_string_lossy().into_owned(),
        close_lookback_days: 600,
        ohlc_lookback_days: 180,
    };
    let cache = Arc::new(SeriesCache::new(Arc::clone(&provider), cache_config));
    RankingPipeline::new(provider, cache, RankingConfig::default())
}

#[tokio::test]
async fn full_run_ranks_survivors_and_filters_losers() {
    let dir = tempfile::tempdir().unwrap();
    let benchmark = benchmark_closes();

    let mut down = vec![500.0; 60];
    down.extend((1..=60).map(|i| 500.0 - 4.0 * f64::from(i)));

    let coins = vec![
        MockCoin {
            id: "bitcoin",
            closes: benchmark.clone(),
            marketcap: 1.0e12,
        },
        MockCoin {
            id: "alpha-coin",
            closes: leveraged_closes(&benchmark, 2.0, 100.0),
            marketcap: 5.0e7,
        },
        MockCoin {
            id: "tracker-coin",
            closes: leveraged_closes(&benchmark, 1.0, 300.0),
            marketcap: 5.0e8,
        },
        MockCoin {
            id: "down-coin",
            closes: down,
            marketcap: 2.0e8,
        },
        MockCoin {
            id: "tiny-coin",
            closes: benchmark.clone(),
            marketcap: 5_000_000.0,
        },
    ];

    let pipeline = pipeline_with(coins, dir.path());
    let report = pipeline
        .run(AssetCategory::MemeToken, "bitcoin", 10)
        .await
        .unwrap();

    let ids: Vec<&str> = report
        .assets
        .iter()
        .map(|a| a.record.id.as_str())
        .collect();

    // The major never competes, the sub-floor marketcap is dropped at
    // seeding, and the decliner is dropped by its bearish regime.
    assert!(!ids.contains(&"bitcoin"));
    assert!(!ids.contains(&"tiny-coin"));
    assert!(!ids.contains(&"down-coin"));
    assert_eq!(ids, vec!["alpha-coin", "tracker-coin"]);

    let alpha = &report.assets[0];
    let tracker = &report.assets[1];

    assert!((alpha.record.beta - 2.0).abs() < 1e-9);
    assert!((tracker.record.beta - 1.0).abs() < 1e-9);

    // Both assets trend up against USD; only the leveraged one outruns the
    // major, so it wins the ratio matrix.
    assert_eq!(alpha.vs_usd.regime, Regime::Up);
    assert_eq!(tracker.vs_usd.regime, Regime::Up);
    assert!(alpha.record.score >= tracker.record.score);
    assert!(alpha.matrix_score.is_some());
    assert!(alpha.matrix_score >= tracker.matrix_score);

    assert_eq!(alpha.contracts["ethereum"], "0xabc123");
    assert!(tracker.contracts.is_empty());
}

#[tokio::test]
async fn sub_floor_cohort_is_empty_cohort_error() {
    let dir = tempfile::tempdir().unwrap();
    let benchmark = benchmark_closes();

    let coins = vec![
        MockCoin {
            id: "bitcoin",
            closes: benchmark.clone(),
            marketcap: 1.0e12,
        },
        MockCoin {
            id: "tiny-coin",
            closes: benchmark,
            marketcap: 5_000_000.0,
        },
    ];

    let pipeline = pipeline_with(coins, dir.path());
    let err = pipeline
        .run(AssetCategory::MemeToken, "bitcoin", 10)
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<RspError>(),
        Some(RspError::EmptyCohort)
    ));
}

#[tokio::test]
async fn short_history_is_dropped_at_seeding() {
    let dir = tempfile::tempdir().unwrap();
    let benchmark = benchmark_closes();

    // MemeToken requires 90 days of history; 40 rows is not enough.
    let short: Vec<f64> = benchmark[..40].to_vec();

    let coins = vec![
        MockCoin {
            id: "bitcoin",
            closes: benchmark.clone(),
            marketcap: 1.0e12,
        },
        MockCoin {
            id: "newborn-coin",
            closes: short,
            marketcap: 9.0e8,
        },
        MockCoin {
            id: "tracker-coin",
            closes: leveraged_closes(&benchmark, 1.0, 300.0),
            marketcap: 5.0e8,
        },
    ];

    let pipeline = pipeline_with(coins, dir.path());
    let report = pipeline
        .run(AssetCategory::MemeToken, "bitcoin", 10)
        .await
        .unwrap();

    let ids: Vec<&str> = report
        .assets
        .iter()
        .map(|a| a.record.id.as_str())
        .collect();
    assert_eq!(ids, vec!["tracker-coin"]);

    // A single survivor skips the ratio matrix.
    assert!(report.assets[0].matrix_score.is_none());
}
