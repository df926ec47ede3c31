#![allow(clippy::format_push_string)]
#![allow(clippy::uninlined_format_args)]

use crate::pipeline::{RankedAsset, RankingReport};

pub struct ReportFormatter;

impl ReportFormatter {
    /// Renders the ranked list as a plain-text report, one block per asset.
    #[must_use]
    pub fn format(report: &RankingReport) -> String {
        let mut output = String::new();

        output.push('\n');
        output.push_str("═══════════════════════════════════════════════════════════════\n");
        output.push_str(&format!(
            "  {} RANKING  (major: {})\n",
            report.category, report.major_id
        ));
        output.push_str("═══════════════════════════════════════════════════════════════\n");

        if report.assets.is_empty() {
            output.push_str("\nNo assets survived the ranking run.\n");
            return output;
        }

        for (rank, asset) in report.assets.iter().enumerate() {
            output.push('\n');
            output.push_str(&Self::format_asset(rank + 1, asset));
        }

        output
    }

    fn format_asset(rank: usize, asset: &RankedAsset) -> String {
        let mut output = String::new();
        let record = &asset.record;

        output.push_str(&format!("#{} {} ({})\n", rank, record.symbol.to_uppercase(), record.id));
        output.push_str("───────────────────────────────────────────────────────────────\n");
        output.push_str(&format!(
            "Market Cap:            ${:.0}    History: {} days    Score: {}\n",
            record.marketcap, record.series_len, record.score
        ));
        if let Some(matrix_score) = asset.matrix_score {
            output.push_str(&format!("Matrix Score:          {}\n", matrix_score));
        }
        output.push_str(&format!(
            "Beta: {:.2}   Alpha: {:.2}   Volatility: {:.2}\n",
            record.beta, record.alpha, record.volatility
        ));
        output.push_str(&format!(
            "Sharpe: {:.2}   Sortino: {:.2}   Omega: {:.2}\n",
            record.sharpe, record.sortino, record.omega
        ));
        output.push_str(&format!(
            "vs USD:   TPI {:+.1}   regime: {}\n",
            asset.vs_usd.tpi, asset.vs_usd.regime
        ));
        output.push_str(&format!(
            "vs MAJOR: TPI {:+.1}   regime: {}\n",
            asset.vs_major.tpi, asset.vs_major.regime
        ));

        if asset.contracts.is_empty() {
            output.push_str("Contracts:             (none listed)\n");
        } else {
            output.push_str("Contracts:\n");
            for (platform, address) in &asset.contracts {
                output.push_str(&format!("  {}: {}\n", platform.to_uppercase(), address));
            }
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsp_core::types::{AssetCategory, AssetRecord, Regime, TpiResult};
    use std::collections::BTreeMap;

    fn sample_report() -> RankingReport {
        let record = AssetRecord {
            id: "solana".to_string(),
            symbol: "sol".to_string(),
            series_len: 500,
            marketcap: 6.5e10,
            beta: 1.42,
            alpha: 2.1,
            volatility: 4.3,
            sharpe: 2.11,
            sortino: 3.05,
            omega: 1.4,
            score: 8,
        };
        let mut contracts = BTreeMap::new();
        contracts.insert("solana".to_string(), "So11111111111111".to_string());

        RankingReport {
            category: AssetCategory::Rsp,
            major_id: "bitcoin".to_string(),
            assets: vec![RankedAsset {
                record,
                vs_usd: TpiResult {
                    tpi: 0.6,
                    regime: Regime::Up,
                },
                vs_major: TpiResult {
                    tpi: 0.2,
                    regime: Regime::UpSideways,
                },
                matrix_score: Some(4),
                contracts,
            }],
        }
    }

    #[test]
    fn report_includes_key_fields() {
        let text = ReportFormatter::format(&sample_report());
        assert!(text.contains("SOL (solana)"));
        assert!(text.contains("Matrix Score:          4"));
        assert!(text.contains("regime: up s"));
        assert!(text.contains("SOLANA: So11111111111111"));
    }

    #[test]
    fn empty_report_says_so() {
        let mut report = sample_report();
        report.assets.clear();
        let text = ReportFormatter::format(&report);
        assert!(text.contains("No assets survived"));
    }
}
