use std::ops::Range;

/// A histogram over caller-supplied bin edges.
///
/// Bins are half-open `[edge_i, edge_{i+1})` except the last one, which also
/// includes its right edge. Values outside `[first_edge, last_edge]` are not
/// counted.
#[derive(Debug, Clone)]
pub struct Histogram {
    /// The bins comprising the histogram, in edge order.
    pub bins: Vec<HistogramBin>,
}

/// A single bin in a histogram.
#[derive(Debug, Clone)]
pub struct HistogramBin {
    /// The range of values covered by this bin.
    pub range: Range<f64>,
    /// The number of values that fall within this bin.
    pub count: u64,
    /// Probability density of this bin: `count / (total_in_range * width)`.
    ///
    /// Zero when no value falls inside the histogram range.
    pub density: f64,
}

impl HistogramBin {
    /// Centre of the bin.
    #[must_use]
    pub fn center(&self) -> f64 {
        0.5 * (self.range.start + self.range.end)
    }
}

impl Histogram {
    /// Builds a density-normalized histogram from values and bin edges.
    ///
    /// Returns `None` when fewer than two edges are given or the edges are not
    /// strictly increasing.
    ///
    /// # Examples
    ///
    /// ```
    /// # use powerrank_stats::histogram::Histogram;
    /// let histogram = Histogram::with_edges([0.5, 1.5, 1.5, 3.0], &[0.0, 1.0, 2.0, 3.0]).unwrap();
    /// let counts: Vec<u64> = histogram.bins.iter().map(|b| b.count).collect();
    /// assert_eq!(counts, vec![1, 2, 1]);
    /// // the densities integrate to one over the bin widths
    /// let area: f64 = histogram.bins.iter().map(|b| b.density * 1.0).sum();
    /// assert!((area - 1.0).abs() < 1e-12);
    /// ```
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn with_edges<I>(values: I, edges: &[f64]) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        if edges.len() < 2 || !edges.windows(2).all(|w| w[0] < w[1]) {
            return None;
        }

        let mut bins = edges
            .windows(2)
            .map(|w| HistogramBin {
                range: w[0]..w[1],
                count: 0,
                density: 0.0,
            })
            .collect::<Vec<_>>();

        let first = edges[0];
        let last = edges[edges.len() - 1];
        for value in values {
            if !(first..=last).contains(&value) {
                continue;
            }
            // index of the last edge <= value, with the right edge folded into the last bin
            let idx = edges.partition_point(|&edge| edge <= value);
            let bin_idx = idx.saturating_sub(1).min(bins.len() - 1);
            bins[bin_idx].count += 1;
        }

        let total = bins.iter().map(|b| b.count).sum::<u64>();
        if total > 0 {
            for bin in &mut bins {
                let width = bin.range.end - bin.range.start;
                bin.density = bin.count as f64 / (total as f64 * width);
            }
        }

        Some(Self { bins })
    }
}

/// Returns `n` evenly spaced points over `[start, end]`, both ends included.
///
/// # Examples
///
/// ```
/// # use powerrank_stats::histogram::linspace;
/// assert_eq!(linspace(-1.0, 1.0, 5), vec![-1.0, -0.5, 0.0, 0.5, 1.0]);
/// assert_eq!(linspace(2.0, 3.0, 1), vec![2.0]);
/// ```
#[expect(clippy::cast_precision_loss)]
#[must_use]
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => vec![],
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { end } else { start + step * i as f64 })
                .collect()
        }
    }
}

/// Rescales values so that their maximum equals one.
///
/// Used for overlaying curves of different teams; leaves the values untouched
/// when the maximum is not positive.
///
/// # Examples
///
/// ```
/// # use powerrank_stats::histogram::scale_to_peak;
/// assert_eq!(scale_to_peak(&[1.0, 4.0, 2.0]), vec![0.25, 1.0, 0.5]);
/// assert_eq!(scale_to_peak(&[0.0, 0.0]), vec![0.0, 0.0]);
/// ```
#[must_use]
pub fn scale_to_peak(values: &[f64]) -> Vec<f64> {
    let peak = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let denom = if peak > 0.0 { peak } else { 1.0 };
    values.iter().map(|v| v / denom).collect()
}
