//! Risk-adjusted-return statistics over a trailing window of daily
//! percent returns.
//!
//! Degenerate inputs (zero variance, empty downside, zero sums) return a
//! neutral 0 rather than an error, so a single flat series never aborts a
//! batch run. Omega deliberately uses the whole returns series while every
//! other ratio trims to the trailing window.

/// Trailing `len` observations, or the whole slice if shorter.
fn tail(xs: &[f64], len: usize) -> &[f64] {
    &xs[xs.len().saturating_sub(len)..]
}

fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Population standard deviation.
fn pop_std(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    let m = mean(xs);
    (xs.iter().map(|x| (x - m).powi(2)).sum::<f64>() / xs.len() as f64).sqrt()
}

/// Sample variance (n - 1 denominator).
fn sample_var(xs: &[f64]) -> f64 {
    if xs.len() < 2 {
        return 0.0;
    }
    let m = mean(xs);
    xs.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (xs.len() - 1) as f64
}

/// Sample covariance (n - 1 denominator) of equal-length slices.
fn sample_cov(xs: &[f64], ys: &[f64]) -> f64 {
    if xs.len() < 2 {
        return 0.0;
    }
    let mx = mean(xs);
    let my = mean(ys);
    xs.iter()
        .zip(ys)
        .map(|(x, y)| (x - mx) * (y - my))
        .sum::<f64>()
        / (xs.len() - 1) as f64
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Beta of an instrument against a benchmark over the trailing window:
/// sample covariance of returns over sample variance of benchmark returns.
///
/// Returns `None` when the benchmark variance is zero (undefined; the
/// caller must guard), or when fewer than two paired observations exist.
#[must_use]
pub fn beta(instrument: &[f64], benchmark: &[f64], lookback: usize) -> Option<f64> {
    let i = tail(instrument, lookback);
    let b = tail(benchmark, lookback);
    let len = i.len().min(b.len());
    if len < 2 {
        return None;
    }
    let i = &i[i.len() - len..];
    let b = &b[b.len() - len..];

    let variance = sample_var(b);
    if variance == 0.0 {
        return None;
    }
    Some(sample_cov(i, b) / variance)
}

/// Population standard deviation of the trailing window, rounded to 2
/// decimals.
#[must_use]
pub fn volatility(returns: &[f64], lookback: usize) -> f64 {
    round2(pop_std(tail(returns, lookback)))
}

/// Alpha as a positive excess-return magnitude.
///
/// Returns 0 whenever the trailing sum of either side is negative,
/// regardless of beta; otherwise `sqrt(max(sum_i - beta * sum_b, 0))`.
/// The sqrt clamp silently caps alpha at zero instead of signaling an
/// undefined value; downstream score thresholds depend on that exact
/// behavior.
#[must_use]
pub fn alpha(instrument: &[f64], benchmark: &[f64], lookback: usize, beta: f64) -> f64 {
    let window = lookback.min(instrument.len()).min(benchmark.len());
    let sum_i: f64 = tail(instrument, window).iter().sum();
    let sum_b: f64 = tail(benchmark, window).iter().sum();

    if sum_i < 0.0 || sum_b < 0.0 {
        return 0.0;
    }
    round2((sum_i - sum_b * beta).max(0.0).sqrt())
}

/// Sharpe ratio over the trailing window: `mean / std * sqrt(lookback)`.
/// Returns exactly 0 when the standard deviation is 0.
#[must_use]
pub fn sharpe(returns: &[f64], lookback: usize) -> f64 {
    let window = tail(returns, lookback);
    let std = pop_std(window);
    if std == 0.0 {
        return 0.0;
    }
    round2(mean(window) / std * (lookback as f64).sqrt())
}

/// Sortino ratio: Sharpe with the denominator restricted to the standard
/// deviation of the negative-return subset. Returns 0 when that subset is
/// empty or its deviation is 0 or NaN.
#[must_use]
pub fn sortino(returns: &[f64], lookback: usize) -> f64 {
    let window = tail(returns, lookback);
    let downside: Vec<f64> = window.iter().copied().filter(|r| *r < 0.0).collect();
    if downside.is_empty() {
        return 0.0;
    }
    let std = pop_std(&downside);
    if std == 0.0 || std.is_nan() {
        return 0.0;
    }
    round2(mean(window) / std * (lookback as f64).sqrt())
}

/// Omega ratio: sum of positive returns over the absolute sum of negative
/// returns, computed over the WHOLE series (no lookback trim). Returns 0
/// when either side sums to 0.
#[must_use]
pub fn omega(returns: &[f64]) -> f64 {
    let positive: f64 = returns.iter().filter(|r| **r > 0.0).sum();
    let negative: f64 = -returns.iter().filter(|r| **r < 0.0).sum::<f64>();

    if positive == 0.0 || negative == 0.0 {
        return 0.0;
    }
    round2(positive / negative)
}
