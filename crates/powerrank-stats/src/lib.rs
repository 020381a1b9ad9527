//! Numeric building blocks for the power-rank analytics engine.
//!
//! Nothing in this crate knows about teams, dates or tables; every function
//! takes plain slices. The analysis crate wires these primitives into
//! per-team series computations.
//!
//! # Modules
//!
//! - [`descriptive`]: Mean, variance, median, expanding standard deviation, z-scores
//! - [`quantiles`]: Linear-interpolated quantiles
//! - [`histogram`]: Fixed-edge density histograms and evenly spaced grids
//! - [`kde`]: Gaussian kernel density estimation with Silverman bandwidth
//! - [`correlation`]: Pearson correlation and lagged autocorrelation
//! - [`dtw`]: Dynamic time warping with step counting
//! - [`linalg`]: Dense matrices, Cholesky factorization, least squares
//! - [`distribution`]: Log-gamma, incomplete beta and the F-distribution tail
//! - [`cluster`]: Pairwise distances and agglomerative hierarchical clustering
//! - [`markov`]: Stationary distribution of a transition matrix
//! - [`hmm`]: Gaussian hidden Markov models (Baum-Welch, Viterbi)
//!
//! # Examples
//!
//! ## Smoothing a distribution of rank changes
//!
//! ```
//! use powerrank_stats::{histogram::linspace, kde::GaussianKde};
//!
//! let deltas = [-2.0, 0.0, 1.0, 1.0, 3.0];
//! let kde = GaussianKde::new(&deltas, None);
//! let density = kde.evaluate(&linspace(-15.0, 15.0, 300));
//! assert!(density.iter().all(|d| *d >= 0.0));
//! ```
//!
//! ## Comparing two trajectories
//!
//! ```
//! use powerrank_stats::{correlation::pearson, dtw::dtw};
//!
//! let a = [1.0, 2.0, 3.0, 4.0];
//! let b = [2.0, 3.0, 4.0, 5.0];
//! assert!((pearson(&a, &b).unwrap() - 1.0).abs() < 1e-12);
//! assert_eq!(dtw(&a, &a).unwrap().cost, 0.0);
//! ```
//!
//! ## Testing a lagged relationship
//!
//! ```
//! use powerrank_stats::distribution::f_survival;
//!
//! let p_value = f_survival(4.5, 2.0, 20.0).unwrap();
//! assert!(p_value < 0.05);
//! ```

pub mod cluster;
pub mod correlation;
pub mod descriptive;
pub mod distribution;
pub mod dtw;
pub mod histogram;
pub mod hmm;
pub mod kde;
pub mod linalg;
pub mod markov;
pub mod quantiles;
