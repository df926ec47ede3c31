//! Scoring/ranking pipeline: seeds a candidate cohort from cached series,
//! filters by risk-adjusted statistics, analyses trend regimes, re-ranks
//! the survivors through the cross-asset ratio matrix, and emits the final
//! ordered list.

pub mod pipeline;
pub mod report;

pub use pipeline::{RankedAsset, RankingPipeline, RankingReport};
pub use report::ReportFormatter;
