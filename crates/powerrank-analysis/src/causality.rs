//! Granger-causality test of power rank leading league rank.

use powerrank_stats::{
    descriptive::diff,
    distribution::f_survival,
    linalg::{Matrix, least_squares},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    error::{AnalysisError, ConfigError},
    series::aligned_power_mlb,
    table::RankTables,
    team::TeamDirectory,
};

pub const DIRECTION: &str = "power_to_mlb";
pub const DIFFERENCING: &str = "first_difference";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CausalityParams {
    /// Largest lag order requested; capped by the sample size.
    pub max_lag: usize,
    /// Minimum number of differenced observations required to test at all.
    pub min_obs: usize,
    /// Significance threshold applied to the best p-value.
    pub alpha: f64,
}

impl Default for CausalityParams {
    fn default() -> Self {
        Self {
            max_lag: 4,
            min_obs: 6,
            alpha: 0.05,
        }
    }
}

/// Outcome of one nested-model F-test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrangerTest {
    pub f_statistic: f64,
    pub p_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CausalityRow {
    pub lag: usize,
    pub p_value: Option<f64>,
    pub f_statistic: Option<f64>,
    pub team_code: String,
    pub team_id: String,
    pub label: String,
    pub direction: &'static str,
    pub diff: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CausalitySummary {
    pub team_code: String,
    pub team_id: String,
    pub label: String,
    /// Number of dates on which both ranks exist.
    pub n_obs_raw: usize,
    /// Number of differenced observations.
    pub n_obs_used: usize,
    pub max_lag_requested: usize,
    pub max_lag_effective: usize,
    pub best_lag: Option<usize>,
    pub best_p: Option<f64>,
    pub is_significant: bool,
    pub alpha: f64,
    pub direction: &'static str,
    pub diff: &'static str,
    /// Why no test was run, if none was.
    pub skipped_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CausalityReport {
    pub rows: Vec<CausalityRow>,
    pub summary: CausalitySummary,
}

/// Largest lag order that is tested for `n_used` observations.
///
/// Never exceeds `requested`.
#[must_use]
pub fn effective_max_lag(requested: usize, n_used: usize) -> usize {
    requested.min(n_used.saturating_sub(3).max(1))
}

/// SSR-based F-test of whether `lag` lags of `x` improve an autoregression of
/// `y` on its own `lag` lags plus a constant.
///
/// Returns `None` when the regression is not well-posed: mismatched lengths,
/// non-positive residual degrees of freedom, a rank-deficient design or a
/// non-finite statistic.
///
/// # Examples
///
/// ```
/// # use powerrank_analysis::causality::granger_f_test;
/// let x = [3.0, -1.0, 4.0, -1.0, 5.0, -9.0, 2.0, 6.0, -5.0, 3.0, -5.0, 8.0, -9.0, 7.0];
/// // y follows x with one step of delay
/// let mut y = vec![0.0];
/// y.extend(x.iter().take(x.len() - 1).zip([0.1, -0.2].iter().cycle()).map(|(v, e)| v + e));
/// let test = granger_f_test(&y, &x, 1).unwrap();
/// assert!(test.p_value < 0.01);
/// ```
#[expect(clippy::cast_precision_loss)]
#[must_use]
pub fn granger_f_test(y: &[f64], x: &[f64], lag: usize) -> Option<GrangerTest> {
    let n = y.len();
    if x.len() != n || lag == 0 || n <= lag {
        return None;
    }
    let df_num = lag;
    let df_den = n.checked_sub(3 * lag + 1).filter(|&d| d > 0)?;

    let target = &y[lag..];
    let mut restricted = Vec::with_capacity(target.len());
    let mut unrestricted = Vec::with_capacity(target.len());
    for t in lag..n {
        let mut row = vec![1.0];
        row.extend((1..=lag).map(|k| y[t - k]));
        restricted.push(row.clone());
        row.extend((1..=lag).map(|k| x[t - k]));
        unrestricted.push(row);
    }

    let ssr_r = least_squares(&Matrix::from_rows(&restricted)?, target)?.ssr;
    let ssr_u = least_squares(&Matrix::from_rows(&unrestricted)?, target)?.ssr;

    let (df_num, df_den) = (df_num as f64, df_den as f64);
    let f_statistic = ((ssr_r - ssr_u) / df_num) / (ssr_u / df_den);
    let p_value = f_survival(f_statistic, df_num, df_den)?;
    Some(GrangerTest {
        f_statistic,
        p_value,
    })
}

/// Tests whether changes in power rank Granger-cause changes in league rank
/// for one team.
///
/// Both ranks are inner-joined on date and first-differenced. With fewer than
/// `min_obs` differenced observations no test is run and the summary records
/// why. Otherwise lags `1..=effective_max_lag` are tested; lags whose
/// regression is not well-posed report a null p-value and are ignored when
/// picking the best lag.
pub fn granger_power_to_mlb<S>(
    tables: RankTables<'_>,
    directory: &TeamDirectory,
    team_code: S,
    params: &CausalityParams,
) -> Result<CausalityReport, AnalysisError>
where
    S: AsRef<str>,
{
    if params.max_lag == 0 {
        return Err(ConfigError::ZeroMaxLag.into());
    }
    let team = directory.resolve_code(team_code.as_ref())?;
    let aligned = aligned_power_mlb(tables, directory, team.id)?;
    let power = diff(&aligned.iter().map(|a| a.power).collect::<Vec<_>>());
    let mlb = diff(&aligned.iter().map(|a| a.mlb).collect::<Vec<_>>());
    let n_used = mlb.len();

    let mut summary = CausalitySummary {
        team_code: team.code.to_owned(),
        team_id: team.id.to_owned(),
        label: team.name.to_owned(),
        n_obs_raw: aligned.len(),
        n_obs_used: n_used,
        max_lag_requested: params.max_lag,
        max_lag_effective: 0,
        best_lag: None,
        best_p: None,
        is_significant: false,
        alpha: params.alpha,
        direction: DIRECTION,
        diff: DIFFERENCING,
        skipped_reason: None,
    };

    if n_used < params.min_obs {
        debug!(
            team = team.code,
            n_used,
            min_obs = params.min_obs,
            "too few observations for causality test"
        );
        summary.skipped_reason = Some(format!(
            "{n_used} differenced observations, at least {} required",
            params.min_obs
        ));
        return Ok(CausalityReport {
            rows: vec![],
            summary,
        });
    }

    let max_lag = effective_max_lag(params.max_lag, n_used);
    if max_lag < params.max_lag {
        debug!(
            team = team.code,
            requested = params.max_lag,
            effective = max_lag,
            "capped causality lag order"
        );
    }
    summary.max_lag_effective = max_lag;

    let rows = (1..=max_lag)
        .map(|lag| {
            let test = granger_f_test(&mlb, &power, lag);
            if test.is_none() {
                warn!(team = team.code, lag, n_used, "causality regression not well-posed");
            }
            CausalityRow {
                lag,
                p_value: test.map(|t| t.p_value),
                f_statistic: test.map(|t| t.f_statistic),
                team_code: team.code.to_owned(),
                team_id: team.id.to_owned(),
                label: team.name.to_owned(),
                direction: DIRECTION,
                diff: DIFFERENCING,
            }
        })
        .collect::<Vec<_>>();

    let best = rows
        .iter()
        .filter_map(|r| Some((r.lag, r.p_value?)))
        .min_by(|a, b| a.1.total_cmp(&b.1));
    if let Some((lag, p)) = best {
        summary.best_lag = Some(lag);
        summary.best_p = Some(p);
        summary.is_significant = p < params.alpha;
    }
    debug!(
        team = team.code,
        best_lag = ?summary.best_lag,
        best_p = ?summary.best_p,
        "causality test"
    );

    Ok(CausalityReport { rows, summary })
}
