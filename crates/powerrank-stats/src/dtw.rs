//! Dynamic time warping with an absolute-difference step cost.

/// Result of aligning two sequences.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DtwAlignment {
    /// Total cost of the optimal warping path.
    pub cost: f64,
    /// Number of moves on the optimal path.
    pub steps: usize,
}

impl DtwAlignment {
    /// Average cost per step of the path.
    ///
    /// An empty path is counted as `n + m` steps so the ratio stays finite.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn cost_per_step(&self, n: usize, m: usize) -> f64 {
        let steps = if self.steps > 0 { self.steps } else { n + m };
        self.cost / steps.max(1) as f64
    }
}

/// Aligns `a` and `b` with classical DTW.
///
/// `D[i][j] = |a[i] - b[j]| + min(D[i-1][j], D[i][j-1], D[i-1][j-1])`. Ties are
/// broken preferring the up move, then left, then diagonal, so the step count
/// is deterministic. Returns `None` if either sequence is empty.
///
/// # Examples
///
/// ```
/// # use powerrank_stats::dtw::dtw;
/// let alignment = dtw(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]).unwrap();
/// assert_eq!(alignment.cost, 0.0);
///
/// let shifted = dtw(&[0.0, 0.0, 1.0], &[0.0, 1.0, 1.0]).unwrap();
/// assert_eq!(shifted.cost, 0.0);
/// ```
#[must_use]
pub fn dtw(a: &[f64], b: &[f64]) -> Option<DtwAlignment> {
    let n = a.len();
    let m = b.len();
    if n == 0 || m == 0 {
        return None;
    }

    let width = m + 1;
    let mut cost = vec![f64::INFINITY; (n + 1) * width];
    let mut steps = vec![0usize; (n + 1) * width];
    cost[0] = 0.0;

    for i in 1..=n {
        for j in 1..=m {
            let candidates = [
                ((i - 1) * width + j, cost[(i - 1) * width + j]),
                (i * width + j - 1, cost[i * width + j - 1]),
                ((i - 1) * width + j - 1, cost[(i - 1) * width + j - 1]),
            ];
            // first minimum wins: up, left, diagonal
            let (prev, best) = candidates
                .into_iter()
                .fold(candidates[0], |acc, c| if c.1 < acc.1 { c } else { acc });
            let idx = i * width + j;
            cost[idx] = (a[i - 1] - b[j - 1]).abs() + best;
            steps[idx] = steps[prev] + 1;
        }
    }

    let last = n * width + m;
    Some(DtwAlignment {
        cost: cost[last],
        steps: steps[last],
    })
}
