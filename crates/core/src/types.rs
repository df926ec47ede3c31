use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Asset universe category. Selects the provider category filter and the
/// lookback window used for the statistical metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssetCategory {
    /// Whole market, no category filter.
    Rsp,
    MemeToken,
    ArtificialIntelligence,
}

impl AssetCategory {
    /// Provider-side category slug, `None` for the unfiltered universe.
    #[must_use]
    pub const fn provider_slug(self) -> Option<&'static str> {
        match self {
            Self::Rsp => None,
            Self::MemeToken => Some("meme-token"),
            Self::ArtificialIntelligence => Some("artificial-intelligence"),
        }
    }

    /// Trailing window (days) for the statistical metrics. Doubles as the
    /// minimum close-series length for an asset to enter the cohort.
    #[must_use]
    pub const fn metric_lookback(self) -> usize {
        match self {
            Self::Rsp => 500,
            Self::MemeToken => 90,
            Self::ArtificialIntelligence => 180,
        }
    }

    /// Default number of candidates fetched from the market list.
    #[must_use]
    pub const fn default_universe(self) -> usize {
        match self {
            Self::Rsp => 300,
            Self::MemeToken | Self::ArtificialIntelligence => 500,
        }
    }
}

impl fmt::Display for AssetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rsp => write!(f, "RSP"),
            Self::MemeToken => write!(f, "Meme Tokens"),
            Self::ArtificialIntelligence => write!(f, "Artificial Intelligence"),
        }
    }
}

/// Categorical trend label derived from the TPI sub-signals.
///
/// Precedence: `Up` (price above the upper VWAP band) beats `Down`, which
/// beats the band-interior bullish/bearish labels, which beat `Sideways`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Regime {
    Up,
    Down,
    UpSideways,
    DownSideways,
    Sideways,
}

impl Regime {
    /// True for `Down` and `DownSideways`; such assets are dropped from
    /// the shortlist after trend analysis.
    #[must_use]
    pub const fn is_bearish(self) -> bool {
        matches!(self, Self::Down | Self::DownSideways)
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::UpSideways => "up s",
            Self::DownSideways => "down s",
            Self::Sideways => "s",
        };
        write!(f, "{label}")
    }
}

/// Trend Position Indicator result: the five-signal composite in [-1, 1]
/// plus its regime label. Recomputed per asset per run, never persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TpiResult {
    pub tpi: f64,
    pub regime: Regime,
}

/// Per-candidate metric row built at the seeding stage and carried through
/// the pipeline. Rebuilt from scratch on every run.
#[derive(Debug, Clone, Serialize)]
pub struct AssetRecord {
    pub id: String,
    pub symbol: String,
    pub series_len: usize,
    pub marketcap: f64,
    pub beta: f64,
    pub alpha: f64,
    pub volatility: f64,
    pub sharpe: f64,
    pub sortino: f64,
    pub omega: f64,
    pub score: u32,
}

/// One entry from the provider's market list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoinListing {
    pub id: String,
    pub symbol: String,
    pub market_cap_rank: Option<u32>,
}

/// Coin metadata: contract platforms and provider categories.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoinMeta {
    /// Platform name -> contract address.
    pub platforms: BTreeMap<String, String>,
    pub categories: Vec<String>,
}

/// A single daily OHLC bar as returned by the provider (no volume).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OhlcBar {
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

/// One (timestamp, value) observation from a market-chart endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimePoint {
    pub timestamp_ms: i64,
    pub value: f64,
}

/// Raw market-chart payload: close prices, market caps, and volumes,
/// each keyed by timestamp.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketChart {
    pub prices: Vec<TimePoint>,
    pub marketcaps: Vec<TimePoint>,
    pub volumes: Vec<TimePoint>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_lookbacks() {
        assert_eq!(AssetCategory::Rsp.metric_lookback(), 500);
        assert_eq!(AssetCategory::MemeToken.metric_lookback(), 90);
        assert_eq!(AssetCategory::ArtificialIntelligence.metric_lookback(), 180);
    }

    #[test]
    fn regime_labels() {
        assert_eq!(Regime::Up.to_string(), "up");
        assert_eq!(Regime::UpSideways.to_string(), "up s");
        assert_eq!(Regime::Sideways.to_string(), "s");
        assert!(Regime::Down.is_bearish());
        assert!(Regime::DownSideways.is_bearish());
        assert!(!Regime::UpSideways.is_bearish());
    }
}
