//! Small dense linear algebra helpers.
//!
//! Only what the regression and HMM code needs: a row-major matrix, a Cholesky
//! factorization for covariance matrices, and Householder least squares.

use std::ops::{Index, IndexMut};

/// Relative threshold below which a pivot is treated as zero.
const RANK_TOLERANCE: f64 = 1e-10;

/// A dense row-major matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    /// Creates a `rows × cols` matrix of zeros.
    #[must_use]
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Creates the `n × n` identity matrix.
    #[must_use]
    pub fn identity(n: usize) -> Self {
        let mut m = Self::zeros(n, n);
        for i in 0..n {
            m[(i, i)] = 1.0;
        }
        m
    }

    /// Builds a matrix from equal-length rows.
    ///
    /// Returns `None` if the rows are ragged.
    ///
    /// # Examples
    ///
    /// ```
    /// # use powerrank_stats::linalg::Matrix;
    /// let m = Matrix::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
    /// assert_eq!(m[(1, 0)], 3.0);
    /// assert!(Matrix::from_rows(&[vec![1.0], vec![1.0, 2.0]]).is_none());
    /// ```
    #[must_use]
    pub fn from_rows(rows: &[Vec<f64>]) -> Option<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|r| r.len() != cols) {
            return None;
        }
        Some(Self {
            rows: rows.len(),
            cols,
            data: rows.iter().flatten().copied().collect(),
        })
    }

    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[must_use]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Returns row `i` as a slice.
    #[must_use]
    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    /// Copies the matrix into nested row vectors.
    #[must_use]
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.data.chunks(self.cols.max(1)).map(<[f64]>::to_vec).collect()
    }

    /// Cholesky factor `L` with `self = L Lᵀ`.
    ///
    /// Returns `None` when the matrix is not square or not positive definite.
    ///
    /// # Examples
    ///
    /// ```
    /// # use powerrank_stats::linalg::Matrix;
    /// let a = Matrix::from_rows(&[vec![4.0, 2.0], vec![2.0, 3.0]]).unwrap();
    /// let l = a.cholesky().unwrap();
    /// assert_eq!(l[(0, 0)], 2.0);
    /// assert_eq!(l[(1, 0)], 1.0);
    /// assert!((l[(1, 1)] - 2.0_f64.sqrt()).abs() < 1e-12);
    /// ```
    #[must_use]
    pub fn cholesky(&self) -> Option<Cholesky> {
        if self.rows != self.cols {
            return None;
        }
        let n = self.rows;
        let mut l = Self::zeros(n, n);
        for i in 0..n {
            for j in 0..=i {
                let dot = (0..j).map(|k| l[(i, k)] * l[(j, k)]).sum::<f64>();
                let value = self[(i, j)] - dot;
                if i == j {
                    if value <= 0.0 || !value.is_finite() {
                        return None;
                    }
                    l[(i, j)] = value.sqrt();
                } else {
                    l[(i, j)] = value / l[(j, j)];
                }
            }
        }
        Some(Cholesky { lower: l })
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = f64;

    fn index(&self, (i, j): (usize, usize)) -> &f64 {
        &self.data[i * self.cols + j]
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut f64 {
        &mut self.data[i * self.cols + j]
    }
}

/// Lower-triangular Cholesky factor of a symmetric positive-definite matrix.
#[derive(Debug, Clone)]
pub struct Cholesky {
    lower: Matrix,
}

impl Cholesky {
    /// Natural log of the determinant of the factored matrix.
    #[must_use]
    pub fn ln_det(&self) -> f64 {
        2.0 * (0..self.lower.rows)
            .map(|i| self.lower[(i, i)].ln())
            .sum::<f64>()
    }

    /// Squared Mahalanobis norm `vᵀ A⁻¹ v` via forward substitution.
    #[must_use]
    pub fn mahalanobis_sq(&self, v: &[f64]) -> f64 {
        let n = self.lower.rows;
        let mut z = vec![0.0; n];
        for i in 0..n {
            let dot = (0..i).map(|k| self.lower[(i, k)] * z[k]).sum::<f64>();
            z[i] = (v[i] - dot) / self.lower[(i, i)];
        }
        z.iter().map(|x| x * x).sum()
    }
}

/// Ordinary least squares fit.
#[derive(Debug, Clone)]
pub struct LeastSquares {
    /// Fitted coefficients, one per design column.
    pub coefficients: Vec<f64>,
    /// Sum of squared residuals.
    pub ssr: f64,
}

/// Solves `min ‖X β − y‖²` by Householder QR.
///
/// Returns `None` when the system is underdetermined, the dimensions disagree,
/// or the design matrix is numerically rank-deficient.
///
/// # Examples
///
/// ```
/// # use powerrank_stats::linalg::{Matrix, least_squares};
/// // y = 1 + 2x, exactly
/// let x = Matrix::from_rows(&[
///     vec![1.0, 0.0],
///     vec![1.0, 1.0],
///     vec![1.0, 2.0],
/// ]).unwrap();
/// let fit = least_squares(&x, &[1.0, 3.0, 5.0]).unwrap();
/// assert!((fit.coefficients[0] - 1.0).abs() < 1e-10);
/// assert!((fit.coefficients[1] - 2.0).abs() < 1e-10);
/// assert!(fit.ssr < 1e-20);
/// ```
#[must_use]
pub fn least_squares(design: &Matrix, y: &[f64]) -> Option<LeastSquares> {
    let m = design.rows;
    let n = design.cols;
    if y.len() != m || n == 0 || m < n {
        return None;
    }

    let mut a = design.clone();
    let mut b = y.to_vec();

    let scale = (0..n)
        .map(|j| (0..m).map(|i| a[(i, j)].powi(2)).sum::<f64>().sqrt())
        .fold(0.0, f64::max);
    if scale == 0.0 || !scale.is_finite() {
        return None;
    }
    let tolerance = RANK_TOLERANCE * scale;

    for k in 0..n {
        let norm = (k..m).map(|i| a[(i, k)].powi(2)).sum::<f64>().sqrt();
        if norm <= tolerance {
            return None;
        }
        let alpha = if a[(k, k)] > 0.0 { -norm } else { norm };
        let mut v = (k..m).map(|i| a[(i, k)]).collect::<Vec<_>>();
        v[0] -= alpha;
        let v_norm_sq = v.iter().map(|x| x * x).sum::<f64>();

        for j in k..n {
            let dot = (k..m).map(|i| v[i - k] * a[(i, j)]).sum::<f64>();
            let factor = 2.0 * dot / v_norm_sq;
            for i in k..m {
                a[(i, j)] -= factor * v[i - k];
            }
        }
        let dot = (k..m).map(|i| v[i - k] * b[i]).sum::<f64>();
        let factor = 2.0 * dot / v_norm_sq;
        for i in k..m {
            b[i] -= factor * v[i - k];
        }
    }

    let mut coefficients = vec![0.0; n];
    for k in (0..n).rev() {
        let dot = (k + 1..n).map(|j| a[(k, j)] * coefficients[j]).sum::<f64>();
        coefficients[k] = (b[k] - dot) / a[(k, k)];
    }
    let ssr = b[n..].iter().map(|r| r * r).sum();

    Some(LeastSquares { coefficients, ssr })
}
