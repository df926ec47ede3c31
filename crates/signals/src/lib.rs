//! Signal engine: risk-adjusted-return statistics, trend/regime
//! indicators, the TPI composite, and the cross-asset ratio matrix.
//!
//! Everything here is a pure function of series data. No I/O, no shared
//! mutable state; safe to compute in parallel across assets.

pub mod indicators;
pub mod matrix;
pub mod metrics;
pub mod tpi;

pub use matrix::{build_matrix, build_matrix_parallel, MatrixCell, MatrixEntry, RatioMatrixRow};
pub use tpi::{tpi_aggregate, tpi_vs_major};
