//! Cross-asset ratio matrix: every ordered pair of shortlisted assets is
//! scored by the RSI-deviation signal on their ratio series, and each row
//! is ranked by how many of its ratios are strictly positive.

use crate::indicators::rsi_deviation_signal;
use rsp_data::Ohlcv;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::debug;

/// One shortlisted asset with its OHLCV series, shared read-only across
/// matrix rows.
#[derive(Debug, Clone)]
pub struct MatrixEntry {
    pub id: String,
    pub symbol: String,
    pub series: Arc<Ohlcv>,
}

/// A single matrix cell: the pair signal, or the self-pair diagonal which
/// never contributes to a row score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatrixCell {
    SelfPair,
    Signal(i8),
}

/// One matrix row: the numerator asset's signal against every denominator,
/// in shortlist order, plus the count of strictly-positive cells.
#[derive(Debug, Clone)]
pub struct RatioMatrixRow {
    pub id: String,
    pub symbol: String,
    pub cells: Vec<MatrixCell>,
    pub score: usize,
}

/// Computes one row: fixed numerator, sweep over all denominators.
#[must_use]
pub fn matrix_row(numerator: usize, entries: &[MatrixEntry]) -> RatioMatrixRow {
    let num = &entries[numerator];
    let cells: Vec<MatrixCell> = entries
        .iter()
        .enumerate()
        .map(|(j, den)| {
            if j == numerator {
                MatrixCell::SelfPair
            } else {
                let ratio = num.series.ratio(den.series.as_ref());
                MatrixCell::Signal(rsi_deviation_signal(&ratio.close))
            }
        })
        .collect();

    let score = cells
        .iter()
        .filter(|cell| matches!(cell, MatrixCell::Signal(s) if *s > 0))
        .count();

    RatioMatrixRow {
        id: num.id.clone(),
        symbol: num.symbol.clone(),
        cells,
        score,
    }
}

/// Builds the full matrix sequentially and sorts rows by score descending.
/// Ties keep the original shortlist order.
#[must_use]
pub fn build_matrix(entries: &[MatrixEntry]) -> Vec<RatioMatrixRow> {
    let mut rows: Vec<RatioMatrixRow> = (0..entries.len())
        .map(|i| matrix_row(i, entries))
        .collect();
    rows.sort_by_key(|row| std::cmp::Reverse(row.score));
    rows
}

/// Builds the matrix with the outer loop fanned out over blocking tasks.
/// Each row only reads shared series data, so rows are independent.
///
/// # Errors
/// Returns an error if a row task panics or is cancelled.
pub async fn build_matrix_parallel(
    entries: Arc<Vec<MatrixEntry>>,
) -> anyhow::Result<Vec<RatioMatrixRow>> {
    let mut set = JoinSet::new();
    for i in 0..entries.len() {
        let entries = Arc::clone(&entries);
        set.spawn_blocking(move || (i, matrix_row(i, &entries)));
    }

    let mut rows: Vec<Option<RatioMatrixRow>> = vec![None; entries.len()];
    while let Some(joined) = set.join_next().await {
        let (i, row) = joined?;
        debug!(id = %row.id, score = row.score, "matrix row complete");
        rows[i] = Some(row);
    }

    let mut rows: Vec<RatioMatrixRow> = rows.into_iter().flatten().collect();
    rows.sort_by_key(|row| std::cmp::Reverse(row.score));
    Ok(rows)
}
