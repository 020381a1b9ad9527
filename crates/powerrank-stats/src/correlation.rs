//! Pearson correlation and lagged autocorrelation.

/// Pearson correlation coefficient of two equal-length samples.
///
/// Returns `None` when the lengths differ, fewer than two pairs are given, or
/// either side has zero variance.
///
/// # Examples
///
/// ```
/// # use powerrank_stats::correlation::pearson;
/// let r = pearson(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]).unwrap();
/// assert!((r - 1.0).abs() < 1e-12);
/// assert_eq!(pearson(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]), None);
/// ```
#[expect(clippy::cast_precision_loss)]
#[must_use]
pub fn pearson(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.len() != b.len() || a.len() < 2 {
        return None;
    }
    let n = a.len() as f64;
    let mean_a = a.iter().sum::<f64>() / n;
    let mean_b = b.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        let dx = x - mean_a;
        let dy = y - mean_b;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }
    if var_a <= 0.0 || var_b <= 0.0 {
        return None;
    }
    let r = cov / (var_a * var_b).sqrt();
    r.is_finite().then(|| r.clamp(-1.0, 1.0))
}

/// Lag-`lag` autocorrelation of a series.
///
/// Computed as the Pearson correlation of `values[lag..]` against
/// `values[..len - lag]`, so each side is centred on its own mean.
///
/// # Examples
///
/// ```
/// # use powerrank_stats::correlation::autocorrelation;
/// let trend = [1.0, 2.0, 3.0, 4.0, 5.0];
/// assert!((autocorrelation(&trend, 1).unwrap() - 1.0).abs() < 1e-12);
/// assert_eq!(autocorrelation(&trend, 4), None); // one pair only
/// ```
#[must_use]
pub fn autocorrelation(values: &[f64], lag: usize) -> Option<f64> {
    if lag >= values.len() {
        return None;
    }
    pearson(&values[lag..], &values[..values.len() - lag])
}
