/// Precomputed quantile values for a dataset.
///
/// Quantile points are fractions in `[0, 1]`. Values are computed with linear
/// interpolation between the two nearest order statistics, so the 0.5 quantile
/// of an even-length dataset is the average of its two middle values.
///
/// # Examples
///
/// ```
/// use powerrank_stats::quantiles::Quantiles;
///
/// let values = vec![1.0, 2.0, 3.0, 4.0, 5.0];
/// let quantiles = Quantiles::new(&values, &[0.25, 0.5, 0.75]);
///
/// assert_eq!(quantiles.get(0.5), Some(3.0));
/// assert_eq!(quantiles.get(0.25), Some(2.0));
/// assert_eq!(quantiles.get(0.9), None); // Not precomputed
/// ```
#[derive(Debug, Clone)]
pub struct Quantiles {
    /// Quantile-value pairs in the order they were requested.
    values: Vec<(f64, f64)>,
}

impl Quantiles {
    /// Computes quantiles from sorted values.
    ///
    /// # Panics
    ///
    /// Panics if `sorted_values` is not sorted in ascending order.
    #[must_use]
    pub fn from_sorted(sorted_values: &[f64], quantile_points: &[f64]) -> Self {
        assert!(
            sorted_values.is_sorted_by(|a, b| a <= b),
            "values must be sorted in ascending order"
        );

        let values = quantile_points
            .iter()
            .map(|&q| (q, compute_quantile(sorted_values, q)))
            .collect();
        Self { values }
    }

    /// Computes quantiles from unsorted values.
    #[must_use]
    pub fn new(values: &[f64], quantile_points: &[f64]) -> Self {
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        Self::from_sorted(&sorted, quantile_points)
    }

    /// Gets the value at a precomputed quantile point.
    #[must_use]
    pub fn get(&self, quantile: f64) -> Option<f64> {
        self.values.iter().find_map(|(q, value)| {
            if (*q - quantile).abs() < f64::EPSILON {
                Some(*value)
            } else {
                None
            }
        })
    }

    /// Returns all quantile-value pairs as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[(f64, f64)] {
        &self.values
    }
}

/// Computes a single quantile from sorted data using linear interpolation.
///
/// For `n` values the quantile `q` sits at fractional position `q * (n - 1)`;
/// the result interpolates between the two neighbouring values. `q` is clamped
/// to `[0, 1]`.
///
/// # Returns
///
/// The interpolated value, or `f64::NAN` if the input is empty.
///
/// # Examples
///
/// ```
/// use powerrank_stats::quantiles::compute_quantile;
///
/// let values = vec![1.0, 2.0, 3.0, 4.0];
/// assert_eq!(compute_quantile(&values, 0.5), 2.5);
/// assert_eq!(compute_quantile(&values, 0.0), 1.0);
/// assert_eq!(compute_quantile(&values, 1.0), 4.0);
/// ```
#[expect(
    clippy::cast_sign_loss,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss
)]
#[must_use]
pub fn compute_quantile(sorted_values: &[f64], quantile: f64) -> f64 {
    if sorted_values.is_empty() {
        return f64::NAN;
    }
    let position = quantile.clamp(0.0, 1.0) * (sorted_values.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - position.floor();
    sorted_values[lower] + (sorted_values[upper] - sorted_values[lower]) * fraction
}
