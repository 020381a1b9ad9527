//! Hidden Markov models with multivariate Gaussian emissions.
//!
//! Parameters are estimated with Baum-Welch (expectation maximization) using
//! scaled forward/backward passes, and state paths are decoded with Viterbi.
//!
//! # Examples
//!
//! ```
//! use powerrank_stats::hmm::{CovarianceType, GaussianHmm, HmmConfig};
//! use powerrank_stats::linalg::Matrix;
//!
//! let hmm = GaussianHmm::new(
//!     vec![0.5, 0.5],
//!     vec![vec![0.9, 0.1], vec![0.1, 0.9]],
//!     vec![vec![-2.0], vec![2.0]],
//!     vec![Matrix::identity(1), Matrix::identity(1)],
//!     CovarianceType::Diag,
//! )
//! .unwrap();
//! let observations = vec![vec![-2.1], vec![-1.8], vec![2.2], vec![1.9]];
//! assert_eq!(hmm.decode(&observations).unwrap(), vec![0, 0, 1, 1]);
//!
//! let mut fitted = hmm.clone();
//! let summary = fitted.fit(&observations, &HmmConfig::default()).unwrap();
//! assert!(summary.log_likelihood.is_finite());
//! ```

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::linalg::{Cholesky, Matrix};

/// Shape of the per-state covariance matrices.
#[derive(
    Default, Debug, Clone, Copy, PartialEq, Eq, derive_more::FromStr, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum CovarianceType {
    /// Independent features: only the diagonal is estimated.
    Diag,
    /// Unrestricted symmetric positive-definite covariance.
    #[default]
    Full,
}

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum HmmError {
    #[display("no observations to fit")]
    EmptyObservations,
    #[display("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },
    #[display("covariance of state {state} is not positive definite")]
    NotPositiveDefinite { state: usize },
    #[display("log-likelihood became non-finite at iteration {iteration}")]
    NonFiniteLikelihood { iteration: usize },
}

/// Expectation-maximization settings.
#[derive(Debug, Clone, Copy)]
pub struct HmmConfig {
    /// Maximum number of EM iterations.
    pub max_iter: usize,
    /// Stop once the log-likelihood gain falls below this value.
    pub tol: f64,
    /// Added to covariance diagonals after each update.
    pub min_covar: f64,
}

impl Default for HmmConfig {
    fn default() -> Self {
        Self {
            max_iter: 100,
            tol: 1e-4,
            min_covar: 1e-3,
        }
    }
}

/// Outcome of [`GaussianHmm::fit`].
#[derive(Debug, Clone, Copy)]
pub struct FitSummary {
    /// Log-likelihood of the observations under the final E-step parameters.
    pub log_likelihood: f64,
    /// Number of EM iterations performed.
    pub iterations: usize,
    /// Whether the tolerance was reached before the iteration limit.
    pub converged: bool,
}

/// Gaussian-emission hidden Markov model with `K` states and `D` features.
#[derive(Debug, Clone)]
pub struct GaussianHmm {
    start: Vec<f64>,
    transition: Vec<Vec<f64>>,
    means: Vec<Vec<f64>>,
    covariances: Vec<Matrix>,
    covariance_type: CovarianceType,
}

struct Posteriors {
    log_likelihood: f64,
    gamma: Vec<Vec<f64>>,
    xi_sum: Vec<Vec<f64>>,
}

impl GaussianHmm {
    /// Creates a model from explicit parameters.
    ///
    /// With [`CovarianceType::Diag`] the off-diagonal entries of the given
    /// covariances are ignored.
    pub fn new(
        start: Vec<f64>,
        transition: Vec<Vec<f64>>,
        means: Vec<Vec<f64>>,
        covariances: Vec<Matrix>,
        covariance_type: CovarianceType,
    ) -> Result<Self, HmmError> {
        let k = start.len();
        let d = means.first().map_or(0, Vec::len);
        check_len(k, transition.len())?;
        check_len(k, means.len())?;
        check_len(k, covariances.len())?;
        for row in &transition {
            check_len(k, row.len())?;
        }
        for mean in &means {
            check_len(d, mean.len())?;
        }
        for cov in &covariances {
            check_len(d, cov.rows())?;
            check_len(d, cov.cols())?;
        }

        let mut hmm = Self {
            start,
            transition,
            means,
            covariances,
            covariance_type,
        };
        if covariance_type == CovarianceType::Diag {
            for cov in &mut hmm.covariances {
                *cov = diagonal_only(cov);
            }
        }
        hmm.factorize()?;
        Ok(hmm)
    }

    #[must_use]
    pub fn n_states(&self) -> usize {
        self.start.len()
    }

    #[must_use]
    pub fn start(&self) -> &[f64] {
        &self.start
    }

    #[must_use]
    pub fn transition(&self) -> &[Vec<f64>] {
        &self.transition
    }

    #[must_use]
    pub fn means(&self) -> &[Vec<f64>] {
        &self.means
    }

    #[must_use]
    pub fn covariances(&self) -> &[Matrix] {
        &self.covariances
    }

    /// Log-likelihood of an observation sequence.
    pub fn score(&self, observations: &[Vec<f64>]) -> Result<f64, HmmError> {
        let log_emission = self.log_emissions(observations)?;
        Ok(self.posteriors(&log_emission, 0)?.log_likelihood)
    }

    /// Fits the parameters to `observations` with Baum-Welch, starting from
    /// the current parameters.
    pub fn fit(
        &mut self,
        observations: &[Vec<f64>],
        config: &HmmConfig,
    ) -> Result<FitSummary, HmmError> {
        let mut previous: Option<f64> = None;
        let mut summary = FitSummary {
            log_likelihood: f64::NEG_INFINITY,
            iterations: 0,
            converged: false,
        };

        for iteration in 0..config.max_iter {
            let log_emission = self.log_emissions(observations)?;
            let posteriors = self.posteriors(&log_emission, iteration)?;
            summary.log_likelihood = posteriors.log_likelihood;
            summary.iterations = iteration + 1;

            if let Some(prev) = previous
                && (posteriors.log_likelihood - prev).abs() < config.tol
            {
                summary.converged = true;
                break;
            }
            previous = Some(posteriors.log_likelihood);
            self.maximize(observations, &posteriors, config.min_covar)?;
        }

        Ok(summary)
    }

    /// Most likely state path (Viterbi).
    pub fn decode(&self, observations: &[Vec<f64>]) -> Result<Vec<usize>, HmmError> {
        let log_emission = self.log_emissions(observations)?;
        let k = self.n_states();
        let t_len = log_emission.len();
        let log_start = self.start.iter().map(|p| p.ln()).collect::<Vec<_>>();
        let log_trans = self
            .transition
            .iter()
            .map(|row| row.iter().map(|p| p.ln()).collect::<Vec<_>>())
            .collect::<Vec<_>>();

        let mut delta = (0..k)
            .map(|j| log_start[j] + log_emission[0][j])
            .collect::<Vec<_>>();
        let mut backpointers = vec![vec![0usize; k]; t_len];

        for t in 1..t_len {
            let mut next = vec![f64::NEG_INFINITY; k];
            for j in 0..k {
                let (best_i, best) = argmax((0..k).map(|i| delta[i] + log_trans[i][j]));
                next[j] = best + log_emission[t][j];
                backpointers[t][j] = best_i;
            }
            delta = next;
        }

        let (mut state, _) = argmax(delta.iter().copied());
        let mut path = vec![0usize; t_len];
        for t in (0..t_len).rev() {
            path[t] = state;
            state = backpointers[t][state];
        }
        Ok(path)
    }

    fn factorize(&self) -> Result<Vec<Cholesky>, HmmError> {
        self.covariances
            .iter()
            .enumerate()
            .map(|(state, cov)| cov.cholesky().ok_or(HmmError::NotPositiveDefinite { state }))
            .collect()
    }

    fn log_emissions(&self, observations: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, HmmError> {
        if observations.is_empty() {
            return Err(HmmError::EmptyObservations);
        }
        let d = self.means.first().map_or(0, Vec::len);
        for obs in observations {
            check_len(d, obs.len())?;
        }
        let factors = self.factorize()?;
        #[expect(clippy::cast_precision_loss)]
        let log_norm = 0.5 * d as f64 * (2.0 * PI).ln();

        Ok(observations
            .iter()
            .map(|obs| {
                self.means
                    .iter()
                    .zip(&factors)
                    .map(|(mean, chol)| {
                        let centered = obs.iter().zip(mean).map(|(x, m)| x - m).collect::<Vec<_>>();
                        -log_norm - 0.5 * chol.ln_det() - 0.5 * chol.mahalanobis_sq(&centered)
                    })
                    .collect()
            })
            .collect())
    }

    fn posteriors(
        &self,
        log_emission: &[Vec<f64>],
        iteration: usize,
    ) -> Result<Posteriors, HmmError> {
        let k = self.n_states();
        let t_len = log_emission.len();

        // per-time rescaling keeps exp() in range; the offsets are added back
        // to the log-likelihood
        let offsets = log_emission
            .iter()
            .map(|row| row.iter().copied().fold(f64::NEG_INFINITY, f64::max))
            .collect::<Vec<_>>();
        let emission = log_emission
            .iter()
            .zip(&offsets)
            .map(|(row, m)| row.iter().map(|l| (l - m).exp()).collect::<Vec<_>>())
            .collect::<Vec<_>>();

        let mut alpha = vec![vec![0.0; k]; t_len];
        let mut scale = vec![0.0; t_len];
        for t in 0..t_len {
            for j in 0..k {
                let prior = if t == 0 {
                    self.start[j]
                } else {
                    (0..k)
                        .map(|i| alpha[t - 1][i] * self.transition[i][j])
                        .sum()
                };
                alpha[t][j] = prior * emission[t][j];
            }
            let c = alpha[t].iter().sum::<f64>();
            if !(c > 0.0 && c.is_finite()) {
                return Err(HmmError::NonFiniteLikelihood { iteration });
            }
            for a in &mut alpha[t] {
                *a /= c;
            }
            scale[t] = c;
        }

        let log_likelihood = scale
            .iter()
            .zip(&offsets)
            .map(|(c, m)| c.ln() + m)
            .sum::<f64>();
        if !log_likelihood.is_finite() {
            return Err(HmmError::NonFiniteLikelihood { iteration });
        }

        let mut beta = vec![vec![1.0; k]; t_len];
        for t in (0..t_len.saturating_sub(1)).rev() {
            for i in 0..k {
                beta[t][i] = (0..k)
                    .map(|j| self.transition[i][j] * emission[t + 1][j] * beta[t + 1][j])
                    .sum::<f64>()
                    / scale[t + 1];
            }
        }

        let gamma = alpha
            .iter()
            .zip(&beta)
            .map(|(a, b)| {
                let row = a.iter().zip(b).map(|(x, y)| x * y).collect::<Vec<_>>();
                let total = row.iter().sum::<f64>();
                if total > 0.0 {
                    row.iter().map(|x| x / total).collect()
                } else {
                    row
                }
            })
            .collect::<Vec<_>>();

        let mut xi_sum = vec![vec![0.0; k]; k];
        for t in 0..t_len.saturating_sub(1) {
            for i in 0..k {
                for j in 0..k {
                    xi_sum[i][j] += alpha[t][i]
                        * self.transition[i][j]
                        * emission[t + 1][j]
                        * beta[t + 1][j]
                        / scale[t + 1];
                }
            }
        }

        Ok(Posteriors {
            log_likelihood,
            gamma,
            xi_sum,
        })
    }

    fn maximize(
        &mut self,
        observations: &[Vec<f64>],
        posteriors: &Posteriors,
        min_covar: f64,
    ) -> Result<(), HmmError> {
        let k = self.n_states();
        let d = self.means.first().map_or(0, Vec::len);

        self.start.clone_from(&posteriors.gamma[0]);

        for (i, row) in posteriors.xi_sum.iter().enumerate() {
            let total = row.iter().sum::<f64>();
            if total > 0.0 {
                self.transition[i] = row.iter().map(|x| x / total).collect();
            }
        }

        for state in 0..k {
            let weight = posteriors.gamma.iter().map(|g| g[state]).sum::<f64>();
            if weight <= f64::MIN_POSITIVE {
                continue;
            }
            let mut mean = vec![0.0; d];
            for (g, obs) in posteriors.gamma.iter().zip(observations) {
                for (m, x) in mean.iter_mut().zip(obs) {
                    *m += g[state] * x;
                }
            }
            for m in &mut mean {
                *m /= weight;
            }

            let mut cov = Matrix::zeros(d, d);
            for (g, obs) in posteriors.gamma.iter().zip(observations) {
                for r in 0..d {
                    for c in 0..d {
                        cov[(r, c)] += g[state] * (obs[r] - mean[r]) * (obs[c] - mean[c]);
                    }
                }
            }
            for r in 0..d {
                for c in 0..d {
                    cov[(r, c)] /= weight;
                }
                cov[(r, r)] += min_covar;
            }
            if self.covariance_type == CovarianceType::Diag {
                cov = diagonal_only(&cov);
            }

            self.means[state] = mean;
            self.covariances[state] = cov;
        }

        self.factorize().map(|_| ())
    }
}

fn check_len(expected: usize, found: usize) -> Result<(), HmmError> {
    if expected == found {
        Ok(())
    } else {
        Err(HmmError::DimensionMismatch { expected, found })
    }
}

fn diagonal_only(cov: &Matrix) -> Matrix {
    let mut diag = Matrix::zeros(cov.rows(), cov.cols());
    for i in 0..cov.rows().min(cov.cols()) {
        diag[(i, i)] = cov[(i, i)];
    }
    diag
}

/// Index and value of the first maximum; `(0, -inf)` when empty.
fn argmax(values: impl Iterator<Item = f64>) -> (usize, f64) {
    values
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |best, (i, v)| if v > best.1 { (i, v) } else { best })
}

#[cfg(test)]
mod tests {
    use rand::{Rng as _, SeedableRng as _};
    use rand_distr::Normal;
    use rand_pcg::Pcg64;

    use super::*;

    /// Samples a sticky two-regime sequence in two dimensions.
    fn regime_sequence(seed: u64, len: usize) -> (Vec<Vec<f64>>, Vec<usize>) {
        let mut rng = Pcg64::seed_from_u64(seed);
        let noise = Normal::new(0.0, 0.5).unwrap();
        let centers = [[-3.0, -1.0], [3.0, 1.0]];
        let mut state = 0usize;
        let mut observations = vec![];
        let mut states = vec![];
        for _ in 0..len {
            if rng.random::<f64>() < 0.1 {
                state = 1 - state;
            }
            let c = centers[state];
            observations.push(vec![c[0] + rng.sample(noise), c[1] + rng.sample(noise)]);
            states.push(state);
        }
        (observations, states)
    }

    fn initial_model(covariance_type: CovarianceType) -> GaussianHmm {
        GaussianHmm::new(
            vec![0.5, 0.5],
            vec![vec![0.8, 0.2], vec![0.2, 0.8]],
            vec![vec![-1.0, 0.0], vec![1.0, 0.0]],
            vec![Matrix::identity(2), Matrix::identity(2)],
            covariance_type,
        )
        .unwrap()
    }

    #[test]
    fn test_fit_recovers_regimes() {
        let (observations, states) = regime_sequence(11, 200);
        for covariance_type in [CovarianceType::Diag, CovarianceType::Full] {
            let mut hmm = initial_model(covariance_type);
            let summary = hmm.fit(&observations, &HmmConfig::default()).unwrap();
            assert!(summary.log_likelihood.is_finite());
            assert!(summary.iterations >= 2);

            assert!((hmm.means()[0][0] + 3.0).abs() < 0.3);
            assert!((hmm.means()[1][0] - 3.0).abs() < 0.3);

            let decoded = hmm.decode(&observations).unwrap();
            let agree = decoded.iter().zip(&states).filter(|(a, b)| a == b).count();
            assert!(agree >= 195, "{covariance_type:?}: {agree}");
        }
    }

    #[test]
    fn test_fit_keeps_stochastic_rows() {
        let (observations, _) = regime_sequence(3, 120);
        let mut hmm = initial_model(CovarianceType::Full);
        hmm.fit(&observations, &HmmConfig::default()).unwrap();
        for row in hmm.transition() {
            assert!((row.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        }
        assert!((hmm.start().iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_fit_improves_likelihood() {
        let (observations, _) = regime_sequence(5, 150);
        let mut hmm = initial_model(CovarianceType::Diag);
        let before = hmm.score(&observations).unwrap();
        hmm.fit(&observations, &HmmConfig::default()).unwrap();
        let after = hmm.score(&observations).unwrap();
        assert!(after > before);
    }

    #[test]
    fn test_diag_ignores_off_diagonal() {
        let mut cov = Matrix::identity(2);
        cov[(0, 1)] = 0.9;
        cov[(1, 0)] = 0.9;
        let hmm = GaussianHmm::new(
            vec![1.0],
            vec![vec![1.0]],
            vec![vec![0.0, 0.0]],
            vec![cov],
            CovarianceType::Diag,
        )
        .unwrap();
        assert_eq!(hmm.covariances()[0], Matrix::identity(2));
    }

    #[test]
    fn test_rejects_bad_input() {
        let hmm = initial_model(CovarianceType::Full);
        assert!(matches!(hmm.decode(&[]), Err(HmmError::EmptyObservations)));
        assert!(matches!(
            hmm.decode(&[vec![1.0]]),
            Err(HmmError::DimensionMismatch {
                expected: 2,
                found: 1
            })
        ));

        let zero_cov = GaussianHmm::new(
            vec![1.0],
            vec![vec![1.0]],
            vec![vec![0.0]],
            vec![Matrix::zeros(1, 1)],
            CovarianceType::Full,
        );
        assert!(matches!(
            zero_cov,
            Err(HmmError::NotPositiveDefinite { state: 0 })
        ));
    }
}
