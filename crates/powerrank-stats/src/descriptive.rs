/// Descriptive statistics summarizing a dataset.
///
/// This structure contains common measures of central tendency and dispersion
/// for a dataset of `f64` values. Dispersion uses the population (`ddof = 0`)
/// convention; use [`variance`] directly for other conventions.
#[derive(Debug, Clone)]
pub struct DescriptiveStats {
    /// The minimum value in the dataset.
    pub min: f64,
    /// The maximum value in the dataset.
    pub max: f64,
    /// The arithmetic mean (average) of the dataset.
    pub mean: f64,
    /// The median value of the dataset (average of the two middle values for even counts).
    pub median: f64,
    /// The population variance of the dataset.
    pub variance: f64,
    /// The population standard deviation of the dataset.
    pub std_dev: f64,
}

impl DescriptiveStats {
    /// Computes descriptive statistics from unsorted values.
    ///
    /// # Returns
    ///
    /// * `Some(DescriptiveStats)` - if the dataset contains at least one value
    /// * `None` - if the dataset is empty
    ///
    /// # Examples
    ///
    /// ```
    /// # use powerrank_stats::descriptive::DescriptiveStats;
    /// let values = [5.0, 2.0, 4.0, 1.0, 3.0];
    /// let stats = DescriptiveStats::new(values).unwrap();
    /// assert_eq!(stats.min, 1.0);
    /// assert_eq!(stats.max, 5.0);
    /// assert_eq!(stats.mean, 3.0);
    /// assert_eq!(stats.median, 3.0);
    /// ```
    #[must_use]
    pub fn new<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        let mut values = values.into_iter().collect::<Vec<_>>();
        values.sort_by(f64::total_cmp);
        Self::from_sorted(&values)
    }

    /// Computes descriptive statistics from pre-sorted values.
    ///
    /// # Panics
    ///
    /// Panics if `sorted_values` is not sorted in ascending order.
    #[must_use]
    pub fn from_sorted(sorted_values: &[f64]) -> Option<Self> {
        assert!(
            sorted_values.is_sorted_by(|a, b| a <= b),
            "values must be sorted in ascending order"
        );

        let min = *sorted_values.first()?;
        let max = *sorted_values.last()?;
        let mean = mean(sorted_values)?;
        let median = median_sorted(sorted_values)?;
        let variance = variance(sorted_values, 0)?;

        Some(Self {
            min,
            max,
            mean,
            median,
            variance,
            std_dev: variance.sqrt(),
        })
    }
}

/// Arithmetic mean, `None` for an empty slice.
///
/// # Examples
///
/// ```
/// # use powerrank_stats::descriptive::mean;
/// assert_eq!(mean(&[1.0, 2.0, 3.0]), Some(2.0));
/// assert_eq!(mean(&[]), None);
/// ```
#[expect(clippy::cast_precision_loss)]
#[must_use]
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Variance with `ddof` delta degrees of freedom.
///
/// Returns `None` when `values.len() <= ddof`, matching the usual
/// "not enough observations" convention.
///
/// # Examples
///
/// ```
/// # use powerrank_stats::descriptive::variance;
/// let values = [1.0, 2.0, 3.0, 4.0];
/// assert_eq!(variance(&values, 0), Some(1.25));
/// assert!((variance(&values, 1).unwrap() - 5.0 / 3.0).abs() < 1e-12);
/// assert_eq!(variance(&[7.0], 1), None);
/// ```
#[expect(clippy::cast_precision_loss)]
#[must_use]
pub fn variance(values: &[f64], ddof: usize) -> Option<f64> {
    if values.len() <= ddof {
        return None;
    }
    let mean = mean(values)?;
    let sum_sq = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>();
    Some(sum_sq / (values.len() - ddof) as f64)
}

/// Standard deviation with `ddof` delta degrees of freedom.
#[must_use]
pub fn std_dev(values: &[f64], ddof: usize) -> Option<f64> {
    variance(values, ddof).map(f64::sqrt)
}

/// Median of pre-sorted values, averaging the middle pair for even lengths.
#[must_use]
pub fn median_sorted(sorted_values: &[f64]) -> Option<f64> {
    let n = sorted_values.len();
    if n == 0 {
        return None;
    }
    if n % 2 == 1 {
        Some(sorted_values[n / 2])
    } else {
        Some(0.5 * (sorted_values[n / 2 - 1] + sorted_values[n / 2]))
    }
}

/// Median of unsorted values.
///
/// # Examples
///
/// ```
/// # use powerrank_stats::descriptive::median;
/// assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
/// ```
#[must_use]
pub fn median(values: &[f64]) -> Option<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    median_sorted(&sorted)
}

/// Expanding-window standard deviation.
///
/// Element `i` is the standard deviation of `values[..=i]`. Points whose window
/// holds fewer than `min_periods` values, or not more than `ddof` values, are
/// `None`.
///
/// # Examples
///
/// ```
/// # use powerrank_stats::descriptive::expanding_std;
/// let sigma = expanding_std(&[3.0, 5.0, 7.0], 0, 1);
/// assert_eq!(sigma[0], Some(0.0));
/// assert_eq!(sigma[1], Some(1.0));
/// ```
#[expect(clippy::cast_precision_loss)]
#[must_use]
pub fn expanding_std(values: &[f64], ddof: usize, min_periods: usize) -> Vec<Option<f64>> {
    // Welford accumulation keeps the running variance stable for long series.
    let mut count = 0usize;
    let mut running_mean = 0.0;
    let mut m2 = 0.0;
    values
        .iter()
        .map(|&value| {
            count += 1;
            let delta = value - running_mean;
            running_mean += delta / count as f64;
            m2 += delta * (value - running_mean);
            if count < min_periods.max(1) || count <= ddof {
                None
            } else {
                Some((m2 / (count - ddof) as f64).max(0.0).sqrt())
            }
        })
        .collect()
}

/// Standardizes values to zero mean and unit population standard deviation.
///
/// When the standard deviation is zero or undefined, every value maps to
/// `0.0` rather than dividing by zero.
///
/// # Examples
///
/// ```
/// # use powerrank_stats::descriptive::z_scores;
/// assert_eq!(z_scores(&[1.0, 3.0]), vec![-1.0, 1.0]);
/// assert_eq!(z_scores(&[4.0, 4.0]), vec![0.0, 0.0]);
/// ```
#[must_use]
pub fn z_scores(values: &[f64]) -> Vec<f64> {
    let (Some(mean), Some(sd)) = (mean(values), std_dev(values, 0)) else {
        return vec![];
    };
    if sd == 0.0 || !sd.is_finite() {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| (v - mean) / sd).collect()
}

/// First differences `values[i] - values[i - 1]`.
#[must_use]
pub fn diff(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|w| w[1] - w[0]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expanding_std_first_point_is_zero() {
        let sigma = expanding_std(&[12.0, 3.0, 25.0, 8.0], 0, 1);
        assert_eq!(sigma[0], Some(0.0));
        assert!(sigma.iter().all(Option::is_some));
    }

    #[test]
    fn test_expanding_std_matches_batch_std() {
        let values = [4.0, 8.0, 15.0, 16.0, 23.0, 42.0];
        let sigma = expanding_std(&values, 0, 1);
        for (i, s) in sigma.iter().enumerate() {
            let expected = std_dev(&values[..=i], 0).unwrap();
            assert!((s.unwrap() - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn test_expanding_std_ddof_one_leaves_first_undefined() {
        let sigma = expanding_std(&[1.0, 2.0, 3.0], 1, 1);
        assert_eq!(sigma[0], None);
        assert!((sigma[1].unwrap() - 0.5_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_expanding_std_min_periods() {
        let sigma = expanding_std(&[1.0, 2.0, 3.0], 0, 3);
        assert_eq!(sigma[0], None);
        assert_eq!(sigma[1], None);
        assert!(sigma[2].is_some());
    }

    #[test]
    fn test_median_even_and_odd() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[3.0, 1.0, 2.0, 10.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn test_descriptive_stats_empty() {
        assert!(DescriptiveStats::new(Vec::<f64>::new()).is_none());
    }

    #[test]
    fn test_diff() {
        assert_eq!(diff(&[1.0, 4.0, 2.0]), vec![3.0, -2.0]);
        assert!(diff(&[1.0]).is_empty());
    }
}
