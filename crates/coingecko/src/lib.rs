//! CoinGecko implementation of the `MarketDataProvider` capability.

pub mod client;

pub use client::CoinGeckoClient;
