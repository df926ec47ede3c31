use anyhow::Result;
use rsp_core::config::RankingConfig;
use rsp_core::error::RspError;
use rsp_core::traits::MarketDataProvider;
use rsp_core::types::{AssetCategory, AssetRecord, CoinListing, Regime, TpiResult};
use rsp_data::{Ohlcv, SeriesCache};
use rsp_signals::{build_matrix_parallel, metrics, tpi_aggregate, tpi_vs_major, MatrixEntry};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// One asset in the terminal ranked list.
#[derive(Debug, Clone)]
pub struct RankedAsset {
    pub record: AssetRecord,
    pub vs_usd: TpiResult,
    pub vs_major: TpiResult,
    /// Count of strictly-positive ratio cells; `None` when the shortlist
    /// was too small to run the matrix.
    pub matrix_score: Option<usize>,
    /// Platform name -> contract address.
    pub contracts: BTreeMap<String, String>,
}

/// Terminal pipeline output, handed to the report renderer.
#[derive(Debug, Clone)]
pub struct RankingReport {
    pub category: AssetCategory,
    pub major_id: String,
    pub assets: Vec<RankedAsset>,
}

/// An asset that survived trend analysis; the OHLCV series is retained for
/// the ratio matrix.
struct AnalysedAsset {
    record: AssetRecord,
    vs_usd: TpiResult,
    vs_major: TpiResult,
    ohlcv: Arc<Ohlcv>,
}

/// Five-stage ranking run: SEEDED -> FILTERED_BY_STATS -> ANALYSED ->
/// MATRIXED -> RANKED. Per-asset failures are skips; only an empty cohort
/// after seeding is terminal.
pub struct RankingPipeline {
    provider: Arc<dyn MarketDataProvider>,
    cache: Arc<SeriesCache>,
    config: RankingConfig,
}

impl RankingPipeline {
    #[must_use]
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        cache: Arc<SeriesCache>,
        config: RankingConfig,
    ) -> Self {
        Self {
            provider,
            cache,
            config,
        }
    }

    /// Runs a full ranking for one category against a major benchmark.
    ///
    /// # Errors
    /// Returns `EmptyCohort` when no asset survives seeding, or an error if
    /// the benchmark series itself cannot be fetched.
    pub async fn run(
        &self,
        category: AssetCategory,
        major_id: &str,
        limit: usize,
    ) -> Result<RankingReport> {
        let lookback = category.metric_lookback();

        info!(%category, major_id, limit, "fetching candidate universe");
        let listings = self.provider.market_list(category, limit).await?;

        let major_close = self.cache.get_close(major_id).await?.series;
        let major_returns: Arc<Vec<f64>> = Arc::new(major_close.returns());

        // SEEDED: refresh close series, apply the marketcap floor and the
        // category history minimum, compute the statistical metrics.
        let mut records = self
            .seed(&listings, major_id, lookback, Arc::clone(&major_returns))
            .await;
        if records.is_empty() {
            return Err(RspError::EmptyCohort.into());
        }
        info!(cohort = records.len(), "seeded");

        // FILTERED_BY_STATS: one point per statistical threshold cleared.
        score_stats(&self.config, &mut records);

        // ANALYSED: trend regimes vs USD and vs the major.
        let major_ohlc = self.cache.get_ohlc(major_id).await?.series;
        let major_ohlcv = Arc::new(Ohlcv::from_parts(&major_ohlc, &major_close));
        let mut analysed = self.analyse(records, major_ohlcv).await;

        for asset in &mut analysed {
            let mut bonus = 0;
            if asset.vs_usd.tpi > 0.0 {
                bonus += 1;
            }
            if asset.vs_usd.regime == Regime::Up {
                bonus += 1;
            }
            if asset.vs_major.tpi > 0.0 {
                bonus += 1;
            }
            if asset.vs_major.regime == Regime::Up {
                bonus += 1;
            }
            asset.record.score += bonus;
        }
        analysed.retain(|asset| {
            let keep = !asset.vs_usd.regime.is_bearish() && !asset.vs_major.regime.is_bearish();
            if !keep {
                debug!(id = %asset.record.id, "dropped by bearish regime");
            }
            keep
        });
        info!(survivors = analysed.len(), "analysed");

        // MATRIXED: median-score cut, then ratio-matrix re-rank.
        analysed.sort_by_key(|asset| std::cmp::Reverse(asset.record.score));
        if analysed.len() > self.config.max_shortlist {
            let scores: Vec<f64> = analysed
                .iter()
                .map(|asset| f64::from(asset.record.score))
                .collect();
            let cutoff = median(&scores);
            analysed.retain(|asset| f64::from(asset.record.score) >= cutoff);
        }

        let assets = if analysed.len() > 1 {
            let entries: Vec<MatrixEntry> = analysed
                .iter()
                .map(|asset| MatrixEntry {
                    id: asset.record.id.clone(),
                    symbol: asset.record.symbol.clone(),
                    series: Arc::clone(&asset.ohlcv),
                })
                .collect();
            let rows = build_matrix_parallel(Arc::new(entries)).await?;

            let mut by_id: BTreeMap<String, AnalysedAsset> = analysed
                .into_iter()
                .map(|asset| (asset.record.id.clone(), asset))
                .collect();
            let mut ranked = Vec::with_capacity(rows.len());
            for row in rows {
                let Some(asset) = by_id.remove(&row.id) else {
                    continue;
                };
                ranked.push(self.finalize(asset, Some(row.score)).await);
            }
            ranked
        } else {
            let mut ranked = Vec::with_capacity(analysed.len());
            for asset in analysed {
                ranked.push(self.finalize(asset, None).await);
            }
            ranked
        };

        // RANKED: terminal state.
        info!(ranked = assets.len(), "ranking complete");
        Ok(RankingReport {
            category,
            major_id: major_id.to_string(),
            assets,
        })
    }

    async fn seed(
        &self,
        listings: &[CoinListing],
        major_id: &str,
        lookback: usize,
        major_returns: Arc<Vec<f64>>,
    ) -> Vec<AssetRecord> {
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let mut set: JoinSet<(usize, Option<AssetRecord>)> = JoinSet::new();

        for (index, listing) in listings.iter().enumerate() {
            if listing.id == major_id {
                continue;
            }
            let cache = Arc::clone(&self.cache);
            let semaphore = Arc::clone(&semaphore);
            let major_returns = Arc::clone(&major_returns);
            let id = listing.id.clone();
            let symbol = listing.symbol.clone();
            let min_marketcap = self.config.min_marketcap;

            set.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return (index, None);
                };
                let record =
                    seed_one(&cache, &id, &symbol, lookback, min_marketcap, &major_returns)
                        .await;
                (index, record)
            });
        }

        let mut slots: Vec<(usize, AssetRecord)> = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, Some(record))) => slots.push((index, record)),
                Ok((_, None)) => {}
                Err(e) => warn!(error = %e, "seed task failed"),
            }
        }
        slots.sort_by_key(|(index, _)| *index);
        slots.into_iter().map(|(_, record)| record).collect()
    }

    async fn analyse(
        &self,
        records: Vec<AssetRecord>,
        major_ohlcv: Arc<Ohlcv>,
    ) -> Vec<AnalysedAsset> {
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let mut set: JoinSet<(usize, Option<AnalysedAsset>)> = JoinSet::new();

        for (index, record) in records.into_iter().enumerate() {
            let cache = Arc::clone(&self.cache);
            let semaphore = Arc::clone(&semaphore);
            let major_ohlcv = Arc::clone(&major_ohlcv);
            let min_rows = self.config.min_trend_history;

            set.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return (index, None);
                };
                let analysed = analyse_one(&cache, record, &major_ohlcv, min_rows).await;
                (index, analysed)
            });
        }

        let mut slots: Vec<(usize, AnalysedAsset)> = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, Some(asset))) => slots.push((index, asset)),
                Ok((_, None)) => {}
                Err(e) => warn!(error = %e, "analyse task failed"),
            }
        }
        slots.sort_by_key(|(index, _)| *index);
        slots.into_iter().map(|(_, asset)| asset).collect()
    }

    async fn finalize(&self, asset: AnalysedAsset, matrix_score: Option<usize>) -> RankedAsset {
        let contracts = match self.provider.coin_meta(&asset.record.id).await {
            Ok(meta) => meta.platforms,
            Err(e) => {
                warn!(id = %asset.record.id, error = %e, "contract lookup failed");
                BTreeMap::new()
            }
        };

        RankedAsset {
            record: asset.record,
            vs_usd: asset.vs_usd,
            vs_major: asset.vs_major,
            matrix_score,
            contracts,
        }
    }
}

/// One point per statistical threshold cleared. Marketcap and alpha are
/// judged against their cohort medians, the rest against fixed thresholds.
fn score_stats(config: &RankingConfig, records: &mut [AssetRecord]) {
    let marketcaps: Vec<f64> = records.iter().map(|r| r.marketcap).collect();
    let alphas: Vec<f64> = records.iter().map(|r| r.alpha).collect();
    let marketcap_median = median(&marketcaps);
    let alpha_median = median(&alphas);

    for record in records.iter_mut() {
        let mut score = 0;
        if record.marketcap < marketcap_median {
            score += 1;
        }
        if record.beta > config.beta_threshold {
            score += 1;
        }
        if record.alpha > alpha_median {
            score += 1;
        }
        if record.sharpe > config.sharpe_threshold {
            score += 1;
        }
        if record.sortino > config.sortino_threshold {
            score += 1;
        }
        if record.omega > config.omega_threshold {
            score += 1;
        }
        record.score = score;
    }
}

async fn seed_one(
    cache: &SeriesCache,
    id: &str,
    symbol: &str,
    lookback: usize,
    min_marketcap: f64,
    major_returns: &[f64],
) -> Option<AssetRecord> {
    let cached = match cache.get_close(id).await {
        Ok(cached) => cached,
        Err(e) => {
            warn!(id, error = %e, "skipping asset: close series unavailable");
            return None;
        }
    };
    let series = cached.series;
    if series.is_empty() {
        return None;
    }

    let marketcap = series.last_marketcap().unwrap_or(0.0);
    if marketcap < min_marketcap {
        debug!(id, marketcap, "skipping asset: below marketcap floor");
        return None;
    }
    if series.len() < lookback {
        debug!(
            id,
            have = series.len(),
            need = lookback,
            "skipping asset: insufficient history"
        );
        return None;
    }

    let returns = series.returns();
    let Some(beta) = metrics::beta(&returns, major_returns, lookback) else {
        warn!(id, "skipping asset: beta undefined against benchmark");
        return None;
    };
    let beta = (beta * 100.0).round() / 100.0;

    Some(AssetRecord {
        id: id.to_string(),
        symbol: symbol.to_string(),
        series_len: series.len(),
        marketcap,
        beta,
        alpha: metrics::alpha(&returns, major_returns, lookback, beta),
        volatility: metrics::volatility(&returns, lookback),
        sharpe: metrics::sharpe(&returns, lookback),
        sortino: metrics::sortino(&returns, lookback),
        omega: metrics::omega(&returns),
        score: 0,
    })
}

async fn analyse_one(
    cache: &SeriesCache,
    record: AssetRecord,
    major_ohlcv: &Ohlcv,
    min_rows: usize,
) -> Option<AnalysedAsset> {
    let ohlc = match cache.get_ohlc(&record.id).await {
        Ok(cached) => cached.series,
        Err(e) => {
            warn!(id = %record.id, error = %e, "skipping asset: ohlc unavailable");
            return None;
        }
    };
    let close = match cache.get_close(&record.id).await {
        Ok(cached) => cached.series,
        Err(e) => {
            warn!(id = %record.id, error = %e, "skipping asset: close unavailable");
            return None;
        }
    };

    let ohlcv = Ohlcv::from_parts(&ohlc, &close);
    if ohlcv.len() < min_rows {
        debug!(
            id = %record.id,
            have = ohlcv.len(),
            need = min_rows,
            "skipping asset: trend history too short"
        );
        return None;
    }

    let vs_usd = tpi_aggregate(&ohlcv);
    let vs_major = tpi_vs_major(&ohlcv, major_ohlcv);

    Some(AnalysedAsset {
        record,
        vs_usd,
        vs_major,
        ohlcv: Arc::new(ohlcv),
    })
}

/// Median in the pandas sense: mean of the two middle values for an even
/// count. Returns NaN for an empty slice, which no comparison satisfies.
fn median(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return f64::NAN;
    }
    let mut sorted = xs.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
}
