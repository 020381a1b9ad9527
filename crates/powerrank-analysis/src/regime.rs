//! Good / Mediocre / Bad regime detection on power-rank trajectories.
//!
//! Features are engineered on the whole power table so that the z-scores are
//! cross-sectional (across teams on one date). Each team is then fitted
//! independently with a 3-state Gaussian HMM on
//! `[level_dev, chg_z, mom3_z]`, or labeled by a deterministic quantile
//! heuristic when the data are too sparse or degenerate for a model.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use powerrank_stats::{
    descriptive::{mean, std_dev, variance},
    hmm::{CovarianceType, GaussianHmm, HmmConfig, HmmError},
    linalg::Matrix,
    markov::stationary_distribution,
    quantiles::compute_quantile,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    error::{AnalysisError, ConfigError},
    table::PowerRankRow,
    team::TeamDirectory,
};

/// Names of the three model features, in column order.
pub const MEAN_COLUMNS: [&str; 3] = ["level_dev", "chg_z", "mom3_z"];

const STAY_PROBABILITY: f64 = 0.85;
const COVARIANCE_FLOOR: f64 = 1e-3;
const GOOD_QUANTILE: f64 = 0.60;
const BAD_QUANTILE: f64 = 0.40;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegimeParams {
    /// Fewer usable points than this take the heuristic path.
    pub min_points: usize,
    pub covariance: CovarianceType,
    pub max_iter: usize,
    pub tol: f64,
    pub min_covar: f64,
}

impl Default for RegimeParams {
    fn default() -> Self {
        let hmm = HmmConfig::default();
        Self {
            min_points: 8,
            covariance: CovarianceType::Full,
            max_iter: hmm.max_iter,
            tol: hmm.tol,
            min_covar: hmm.min_covar,
        }
    }
}

impl RegimeParams {
    fn hmm_config(&self) -> HmmConfig {
        HmmConfig {
            max_iter: self.max_iter,
            tol: self.tol,
            min_covar: self.min_covar,
        }
    }
}

/// One power-rank row with its engineered features.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PowerFeatureRow {
    pub date: NaiveDate,
    /// Team display name.
    pub team: String,
    pub rank: f64,
    /// Negated rank, so higher is better.
    pub level: f64,
    /// One-step rank change; `None` on a team's first row.
    pub d_rank: Option<f64>,
    /// Negated rank change, so positive means improvement.
    pub improve: Option<f64>,
    /// Sum of the last three available `improve` values.
    pub mom3: Option<f64>,
    pub level_z: f64,
    pub chg_z: Option<f64>,
    pub mom3_z: f64,
    /// `level_z` minus the team's mean `level_z`.
    pub level_dev: f64,
}

/// Engineers the regime features for every team in the power table.
///
/// Rows come back sorted by team, then date. Cross-sectional z-scores use the
/// population standard deviation of all teams on a date and only center when
/// it is zero or undefined.
#[must_use]
pub fn prepare_power_features(power: &[PowerRankRow]) -> Vec<PowerFeatureRow> {
    let mut sorted = power.iter().collect::<Vec<_>>();
    sorted.sort_by(|a, b| a.team.cmp(&b.team).then(a.date.cmp(&b.date)));

    let mut rows = Vec::with_capacity(sorted.len());
    for team_rows in sorted.chunk_by(|a, b| a.team == b.team) {
        let d_rank = std::iter::once(None)
            .chain(
                team_rows
                    .windows(2)
                    .map(|w| Some(f64::from(w[1].rank) - f64::from(w[0].rank))),
            )
            .collect::<Vec<_>>();
        let improve = d_rank.iter().map(|d| d.map(|d| -d)).collect::<Vec<_>>();
        for (i, row) in team_rows.iter().enumerate() {
            let window = &improve[i.saturating_sub(2)..=i];
            let mom3 = window
                .iter()
                .any(Option::is_some)
                .then(|| window.iter().flatten().sum());
            let rank = f64::from(row.rank);
            rows.push(PowerFeatureRow {
                date: row.date,
                team: row.team.clone(),
                rank,
                level: -rank,
                d_rank: d_rank[i],
                improve: improve[i],
                mom3,
                level_z: 0.0,
                chg_z: None,
                mom3_z: 0.0,
                level_dev: 0.0,
            });
        }
    }

    let mut by_date: BTreeMap<NaiveDate, Vec<usize>> = BTreeMap::new();
    for (i, row) in rows.iter().enumerate() {
        by_date.entry(row.date).or_default().push(i);
    }
    for indices in by_date.values() {
        let level = cross_sectional_z(indices.iter().map(|&i| Some(rows[i].level)));
        let chg = cross_sectional_z(indices.iter().map(|&i| rows[i].improve));
        let mom3 = cross_sectional_z(indices.iter().map(|&i| rows[i].mom3));
        for (k, &i) in indices.iter().enumerate() {
            rows[i].level_z = level[k].unwrap_or(0.0);
            rows[i].chg_z = chg[k];
            rows[i].mom3_z = mom3[k].unwrap_or(0.0);
        }
    }

    for team_rows in rows.chunk_by_mut(|a, b| a.team == b.team) {
        let level_z = team_rows.iter().map(|r| r.level_z).collect::<Vec<_>>();
        let team_mean = mean(&level_z).unwrap_or(0.0);
        for row in team_rows {
            row.level_dev = row.level_z - team_mean;
        }
    }
    rows
}

fn cross_sectional_z<I>(values: I) -> Vec<Option<f64>>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let values = values.into_iter().collect::<Vec<_>>();
    let present = values.iter().flatten().copied().collect::<Vec<_>>();
    let Some(mu) = mean(&present) else {
        return vec![None; values.len()];
    };
    let denom = std_dev(&present, 0)
        .filter(|sd| *sd > 0.0 && sd.is_finite())
        .unwrap_or(1.0);
    values.iter().map(|v| v.map(|v| (v - mu) / denom)).collect()
}

/// Semantic regime, ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Regime {
    Good,
    Mediocre,
    Bad,
}

impl Regime {
    pub const ALL: [Self; 3] = [Self::Good, Self::Mediocre, Self::Bad];

    /// Position in [`Regime::ALL`]; also the reported state number.
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateRow {
    pub date: NaiveDate,
    pub state: usize,
    pub label: Regime,
}

/// Thresholds on `chg_z` used by the heuristic labeling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LabelThresholds {
    pub good_at_or_above: f64,
    pub bad_at_or_below: f64,
}

/// Why the heuristic path was taken.
#[derive(Debug, Clone, PartialEq, derive_more::Display, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FallbackReason {
    #[display("no usable rows")]
    NoRows,
    #[display("{n_used} usable points, at least {min_points} required")]
    TooFewPoints { n_used: usize, min_points: usize },
    #[display("all features are constant")]
    ConstantFeatures,
    #[display("model fit failed: {message}")]
    ModelFailure { message: String },
}

/// How a team's regimes were obtained.
///
/// Matrices and vectors are in `Good, Mediocre, Bad` order; mean vectors follow
/// [`MEAN_COLUMNS`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "path", rename_all = "snake_case")]
pub enum RegimeFit {
    Model {
        transition: [[f64; 3]; 3],
        start: [f64; 3],
        stationary: [f64; 3],
        means: [[f64; 3]; 3],
        log_likelihood: f64,
        iterations: usize,
        converged: bool,
    },
    Heuristic {
        /// `None` when there were no rows to take quantiles of.
        thresholds: Option<LabelThresholds>,
        /// Empirical label frequencies.
        start: [f64; 3],
        /// `None` for labels no row received.
        means: [Option<[f64; 3]>; 3],
        reason: FallbackReason,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InitKind {
    Quantile,
    Fallback,
}

/// Flat model-statistics record, with nulls where the fit path has no value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelStats {
    pub transition: [[Option<f64>; 3]; 3],
    pub start: [f64; 3],
    pub stationary: Option<[f64; 3]>,
    pub means: [Option<[f64; 3]>; 3],
    pub mean_columns: [&'static str; 3],
    pub init: InitKind,
    pub n_used: usize,
    pub fallback_reason: Option<String>,
    pub log_likelihood: Option<f64>,
    pub iterations: Option<usize>,
    pub converged: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegimeReport {
    pub team_code: String,
    pub team_id: String,
    pub label: String,
    /// Number of rows with all three features defined.
    pub n_used: usize,
    /// Sorted by date.
    pub states: Vec<StateRow>,
    pub fit: RegimeFit,
}

impl RegimeReport {
    #[must_use]
    pub fn model_stats(&self) -> ModelStats {
        match &self.fit {
            RegimeFit::Model {
                transition,
                start,
                stationary,
                means,
                log_likelihood,
                iterations,
                converged,
            } => ModelStats {
                transition: transition.map(|row| row.map(Some)),
                start: *start,
                stationary: Some(*stationary),
                means: means.map(Some),
                mean_columns: MEAN_COLUMNS,
                init: InitKind::Quantile,
                n_used: self.n_used,
                fallback_reason: None,
                log_likelihood: Some(*log_likelihood),
                iterations: Some(*iterations),
                converged: Some(*converged),
            },
            RegimeFit::Heuristic {
                start,
                means,
                reason,
                ..
            } => ModelStats {
                transition: [[None; 3]; 3],
                start: *start,
                stationary: None,
                means: *means,
                mean_columns: MEAN_COLUMNS,
                init: InitKind::Fallback,
                n_used: self.n_used,
                fallback_reason: Some(reason.to_string()),
                log_likelihood: None,
                iterations: None,
                converged: None,
            },
        }
    }
}

/// Engineers features from the power table and fits one team.
pub fn fit_team_hmm<S>(
    power: &[PowerRankRow],
    directory: &TeamDirectory,
    team_code: S,
    params: &RegimeParams,
) -> Result<RegimeReport, AnalysisError>
where
    S: AsRef<str>,
{
    let features = prepare_power_features(power);
    fit_team_regimes(&features, directory, team_code, params)
}

/// Fits one team's regimes from precomputed features.
///
/// Rows missing any of the three features (always the team's first row) are
/// not used. Below `min_points` usable rows, with constant features, or when
/// the model fit fails numerically, the heuristic labeling is used and the
/// reason recorded.
pub fn fit_team_regimes<S>(
    features: &[PowerFeatureRow],
    directory: &TeamDirectory,
    team_code: S,
    params: &RegimeParams,
) -> Result<RegimeReport, AnalysisError>
where
    S: AsRef<str>,
{
    if params.min_points == 0 {
        return Err(ConfigError::ZeroMinPoints.into());
    }
    let team = directory.resolve_code(team_code.as_ref())?;

    let mut team_rows = features
        .iter()
        .filter(|row| row.team == team.name)
        .collect::<Vec<_>>();
    team_rows.sort_by_key(|row| row.date);
    let usable = team_rows
        .iter()
        .filter_map(|row| {
            let x = [row.level_dev, row.chg_z?, row.mom3_z];
            x.iter().all(|v| v.is_finite()).then_some((row.date, x))
        })
        .collect::<Vec<_>>();
    let n_used = usable.len();

    let (states, fit) = if n_used == 0 {
        heuristic(&usable, FallbackReason::NoRows)
    } else if n_used < params.min_points {
        heuristic(
            &usable,
            FallbackReason::TooFewPoints {
                n_used,
                min_points: params.min_points,
            },
        )
    } else if features_are_constant(&usable) {
        heuristic(&usable, FallbackReason::ConstantFeatures)
    } else {
        match fit_model(&usable, params) {
            Ok(fitted) => fitted,
            Err(error) => {
                warn!(team = team.code, %error, "regime model failed; using heuristic labels");
                heuristic(
                    &usable,
                    FallbackReason::ModelFailure {
                        message: error.to_string(),
                    },
                )
            }
        }
    };

    match &fit {
        RegimeFit::Model {
            iterations,
            converged,
            log_likelihood,
            ..
        } => debug!(
            team = team.code,
            n_used,
            iterations,
            converged,
            log_likelihood,
            "fitted regime model"
        ),
        RegimeFit::Heuristic { reason, .. } => {
            debug!(team = team.code, n_used, %reason, "heuristic regime labels");
        }
    }

    Ok(RegimeReport {
        team_code: team.code.to_owned(),
        team_id: team.id.to_owned(),
        label: team.name.to_owned(),
        n_used,
        states,
        fit,
    })
}

fn features_are_constant(usable: &[(NaiveDate, [f64; 3])]) -> bool {
    (0..3)
        .map(|c| {
            let column = usable.iter().map(|(_, x)| x[c]).collect::<Vec<_>>();
            std_dev(&column, 0).filter(|sd| sd.is_finite()).unwrap_or(0.0)
        })
        .sum::<f64>()
        == 0.0
}

#[expect(clippy::cast_precision_loss)]
fn heuristic(
    usable: &[(NaiveDate, [f64; 3])],
    reason: FallbackReason,
) -> (Vec<StateRow>, RegimeFit) {
    if usable.is_empty() {
        let fit = RegimeFit::Heuristic {
            thresholds: None,
            start: [0.0; 3],
            means: [None; 3],
            reason,
        };
        return (vec![], fit);
    }

    let mut chg = usable.iter().map(|(_, x)| x[1]).collect::<Vec<_>>();
    chg.sort_by(f64::total_cmp);
    let thresholds = LabelThresholds {
        good_at_or_above: compute_quantile(&chg, GOOD_QUANTILE),
        bad_at_or_below: compute_quantile(&chg, BAD_QUANTILE),
    };

    let states = usable
        .iter()
        .map(|&(date, x)| {
            let label = if x[1] >= thresholds.good_at_or_above {
                Regime::Good
            } else if x[1] <= thresholds.bad_at_or_below {
                Regime::Bad
            } else {
                Regime::Mediocre
            };
            StateRow {
                date,
                state: label.index(),
                label,
            }
        })
        .collect::<Vec<_>>();

    let mut start = [0.0; 3];
    let mut means = [None; 3];
    for regime in Regime::ALL {
        let members = usable
            .iter()
            .zip(&states)
            .filter(|(_, s)| s.label == regime)
            .map(|((_, x), _)| *x)
            .collect::<Vec<_>>();
        start[regime.index()] = members.len() as f64 / usable.len() as f64;
        if !members.is_empty() {
            let n = members.len() as f64;
            let mut sum = [0.0; 3];
            for x in &members {
                for (s, v) in sum.iter_mut().zip(x) {
                    *s += v;
                }
            }
            means[regime.index()] = Some(sum.map(|s| s / n));
        }
    }

    let fit = RegimeFit::Heuristic {
        thresholds: Some(thresholds),
        start,
        means,
        reason,
    };
    (states, fit)
}

fn fit_model(
    usable: &[(NaiveDate, [f64; 3])],
    params: &RegimeParams,
) -> Result<(Vec<StateRow>, RegimeFit), HmmError> {
    let observations = usable.iter().map(|(_, x)| x.to_vec()).collect::<Vec<_>>();

    let mut level_dev = usable.iter().map(|(_, x)| x[0]).collect::<Vec<_>>();
    level_dev.sort_by(f64::total_cmp);
    let q_low = compute_quantile(&level_dev, 0.33);
    let q_high = compute_quantile(&level_dev, 0.66);
    let means = vec![
        vec![q_high, 0.25, 0.25],
        vec![0.0, 0.0, 0.0],
        vec![q_low, -0.25, -0.25],
    ];

    let mut covariance = Matrix::zeros(3, 3);
    for c in 0..3 {
        let column = usable.iter().map(|(_, x)| x[c]).collect::<Vec<_>>();
        covariance[(c, c)] = variance(&column, 1)
            .filter(|v| v.is_finite())
            .unwrap_or(0.0)
            .max(COVARIANCE_FLOOR);
    }

    let mv = (1.0 - STAY_PROBABILITY) / 2.0;
    let transition: Vec<Vec<f64>> = (0..3)
        .map(|i| {
            (0..3)
                .map(|j| if i == j { STAY_PROBABILITY } else { mv })
                .collect()
        })
        .collect();

    let mut hmm = GaussianHmm::new(
        vec![1.0 / 3.0; 3],
        transition,
        means,
        vec![covariance; 3],
        params.covariance,
    )?;
    let summary = hmm.fit(&observations, &params.hmm_config())?;
    let raw_states = hmm.decode(&observations)?;

    // Stable ascending sort on the level_dev mean: highest is Good, lowest Bad.
    let mut ascending = [0, 1, 2];
    ascending.sort_by(|&a, &b| hmm.means()[a][0].total_cmp(&hmm.means()[b][0]));
    let order = [ascending[2], ascending[1], ascending[0]];
    let mut regime_of_state = [Regime::Mediocre; 3];
    for (regime, &state) in Regime::ALL.into_iter().zip(&order) {
        regime_of_state[state] = regime;
    }

    let transition = order.map(|i| order.map(|j| hmm.transition()[i][j]));
    let start = order.map(|i| hmm.start()[i]);
    let means = order.map(|i| {
        let m = &hmm.means()[i];
        [m[0], m[1], m[2]]
    });
    let stationary_vec =
        stationary_distribution(&transition.iter().map(|row| row.to_vec()).collect::<Vec<_>>());
    let stationary = [stationary_vec[0], stationary_vec[1], stationary_vec[2]];

    let states = usable
        .iter()
        .zip(raw_states)
        .map(|(&(date, _), state)| {
            let label = regime_of_state[state];
            StateRow {
                date,
                state: label.index(),
                label,
            }
        })
        .collect();

    let fit = RegimeFit::Model {
        transition,
        start,
        stationary,
        means,
        log_likelihood: summary.log_likelihood,
        iterations: summary.iterations,
        converged: summary.converged,
    };
    Ok((states, fit))
}
