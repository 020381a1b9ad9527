//! Markov chain helpers.

const STATIONARY_TOL: f64 = 1e-12;
const STATIONARY_MAX_ITER: usize = 1000;

/// Long-run state occupancy of a row-stochastic transition matrix.
///
/// Starts from the uniform distribution and repeatedly left-multiplies by the
/// matrix until the L1 change drops below `1e-12` or 1000 iterations pass. The
/// result is renormalized to sum to one. If an iterate becomes non-finite or
/// its mass collapses to zero, the uniform distribution is returned instead.
///
/// # Examples
///
/// ```
/// # use powerrank_stats::markov::stationary_distribution;
/// let p = vec![vec![0.9, 0.1], vec![0.5, 0.5]];
/// let pi = stationary_distribution(&p);
/// assert!((pi[0] - 5.0 / 6.0).abs() < 1e-9);
/// assert!((pi[1] - 1.0 / 6.0).abs() < 1e-9);
/// ```
#[expect(clippy::cast_precision_loss)]
#[must_use]
pub fn stationary_distribution(transition: &[Vec<f64>]) -> Vec<f64> {
    let n = transition.len();
    if n == 0 {
        return vec![];
    }
    let uniform = vec![1.0 / n as f64; n];
    let mut v = uniform.clone();

    for _ in 0..STATIONARY_MAX_ITER {
        let next = (0..n)
            .map(|j| {
                (0..n)
                    .map(|i| v[i] * transition[i].get(j).copied().unwrap_or(f64::NAN))
                    .sum::<f64>()
            })
            .collect::<Vec<_>>();
        if next.iter().any(|x| !x.is_finite()) {
            return uniform;
        }
        let change = next.iter().zip(&v).map(|(a, b)| (a - b).abs()).sum::<f64>();
        v = next;
        if change < STATIONARY_TOL {
            break;
        }
    }

    let total = v.iter().sum::<f64>();
    if total > 0.0 {
        v.iter().map(|x| x / total).collect()
    } else {
        uniform
    }
}
