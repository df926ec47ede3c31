use clap::{Parser, Subcommand, ValueEnum};
use rsp_coingecko::CoinGeckoClient;
use rsp_core::traits::MarketDataProvider;
use rsp_core::types::AssetCategory;
use rsp_core::ConfigLoader;
use rsp_data::SeriesCache;
use rsp_ranker::{RankingPipeline, ReportFormatter};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "rsp")]
#[command(about = "Relative-strength ranking for crypto assets", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CategoryArg {
    /// Top assets by market cap, no category filter
    Top,
    /// Meme tokens
    Meme,
    /// Artificial-intelligence tokens
    Ai,
}

impl From<CategoryArg> for AssetCategory {
    fn from(arg: CategoryArg) -> Self {
        match arg {
            CategoryArg::Top => AssetCategory::Rsp,
            CategoryArg::Meme => AssetCategory::MemeToken,
            CategoryArg::Ai => AssetCategory::ArtificialIntelligence,
        }
    }
}

/// Supported major benchmarks.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum MajorArg {
    Bitcoin,
    Ethereum,
    Solana,
}

impl MajorArg {
    const fn id(self) -> &'static str {
        match self {
            Self::Bitcoin => "bitcoin",
            Self::Ethereum => "ethereum",
            Self::Solana => "solana",
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full ranking for one category and print the report
    Rank {
        /// Asset category to rank
        #[arg(short = 'C', long, value_enum, default_value = "top")]
        category: CategoryArg,
        /// Benchmark asset for relative-strength metrics
        #[arg(short, long, value_enum, default_value = "bitcoin")]
        major: MajorArg,
        /// Universe size (defaults to the category's usual depth)
        #[arg(short, long)]
        limit: Option<usize>,
        /// Config file path
        #[arg(short, long, default_value = "config/Config.toml")]
        config: String,
    },
    /// Refresh the cached price series for a category without ranking
    Refresh {
        /// Asset category to refresh
        #[arg(short = 'C', long, value_enum, default_value = "top")]
        category: CategoryArg,
        /// Universe size (defaults to the category's usual depth)
        #[arg(short, long)]
        limit: Option<usize>,
        /// Config file path
        #[arg(short, long, default_value = "config/Config.toml")]
        config: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match cli.command {
        Commands::Rank {
            category,
            major,
            limit,
            config,
        } => {
            run_rank(category.into(), major.id(), limit, &config).await?;
        }
        Commands::Refresh {
            category,
            limit,
            config,
        } => {
            run_refresh(category.into(), limit, &config).await?;
        }
    }

    Ok(())
}

async fn run_rank(
    category: AssetCategory,
    major: &str,
    limit: Option<usize>,
    config_path: &str,
) -> anyhow::Result<()> {
    let config = ConfigLoader::load_from(config_path)?;
    let limit = limit.unwrap_or_else(|| category.default_universe());

    tracing::info!(%category, major, limit, "starting ranking run");

    let provider: Arc<dyn MarketDataProvider> = Arc::new(CoinGeckoClient::new(&config.provider));
    let cache = Arc::new(SeriesCache::new(Arc::clone(&provider), config.cache));
    let pipeline = RankingPipeline::new(provider, cache, config.ranking);

    let report = pipeline.run(category, major, limit).await?;
    println!("{}", ReportFormatter::format(&report));

    Ok(())
}

async fn run_refresh(
    category: AssetCategory,
    limit: Option<usize>,
    config_path: &str,
) -> anyhow::Result<()> {
    let config = ConfigLoader::load_from(config_path)?;
    let limit = limit.unwrap_or_else(|| category.default_universe());

    tracing::info!(%category, limit, "refreshing cached series");

    let provider: Arc<dyn MarketDataProvider> = Arc::new(CoinGeckoClient::new(&config.provider));
    let cache = SeriesCache::new(Arc::clone(&provider), config.cache);

    let listings = provider.market_list(category, limit).await?;
    let mut refreshed = 0usize;
    let mut failed = 0usize;
    for listing in &listings {
        match cache.get_close(&listing.id).await {
            Ok(_) => refreshed += 1,
            Err(e) => {
                tracing::warn!(id = %listing.id, error = %e, "close refresh failed");
                failed += 1;
                continue;
            }
        }
        if let Err(e) = cache.get_ohlc(&listing.id).await {
            tracing::warn!(id = %listing.id, error = %e, "ohlc refresh failed");
            failed += 1;
        }
    }

    tracing::info!(refreshed, failed, total = listings.len(), "refresh complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_accepts_the_three_majors_only() {
        for major in ["bitcoin", "ethereum", "solana"] {
            let cli = Cli::try_parse_from(["rsp", "rank", "--major", major]).unwrap();
            let Commands::Rank { major: parsed, .. } = cli.command else {
                panic!("expected rank subcommand");
            };
            assert_eq!(parsed.id(), major);
        }

        assert!(Cli::try_parse_from(["rsp", "rank", "--major", "dogecoin"]).is_err());
    }

    #[test]
    fn rank_defaults_to_bitcoin_major() {
        let cli = Cli::try_parse_from(["rsp", "rank"]).unwrap();
        let Commands::Rank { major, .. } = cli.command else {
            panic!("expected rank subcommand");
        };
        assert_eq!(major.id(), "bitcoin");
    }
}
