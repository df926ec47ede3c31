use thiserror::Error;

/// Pipeline-level error taxonomy.
///
/// Per-asset failures are isolated by the pipeline and logged; only
/// `EmptyCohort` terminates a run. Staleness is not an error: the cache
/// returns the last good series with a staleness marker instead.
#[derive(Debug, Error)]
pub enum RspError {
    /// Upstream fetch returned no rows and no cache exists for the asset.
    #[error("no data available for {id}")]
    DataUnavailable { id: String },

    /// Series shorter than the window required by the current category.
    #[error("insufficient history for {id}: have {have}, need {need}")]
    InsufficientHistory { id: String, have: usize, need: usize },

    /// No assets survived the seeding stage; ranking is not attempted.
    #[error("no assets survived seeding")]
    EmptyCohort,
}
