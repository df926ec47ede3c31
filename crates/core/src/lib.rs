pub mod config;
pub mod config_loader;
pub mod error;
pub mod traits;
pub mod types;

pub use config::{AppConfig, CacheConfig, ProviderConfig, RankingConfig};
pub use config_loader::ConfigLoader;
pub use error::RspError;
pub use traits::MarketDataProvider;
pub use types::{
    AssetCategory, AssetRecord, CoinListing, CoinMeta, MarketChart, OhlcBar, Regime, TimePoint,
    TpiResult,
};
