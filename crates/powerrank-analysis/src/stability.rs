//! Expanding-window autocorrelation ("consistency") and its Fisher-z first
//! difference ("stability").
//!
//! For a maximum lag `L`, the lag-1..=L autocorrelation is recomputed at every
//! date from the prefix of the series observed so far, starting once `L + 1`
//! points exist. Stability clips each autocorrelation into `(-0.999, 0.999)`,
//! applies `atanh`, differences consecutive values and optionally smooths the
//! result with an exponentially weighted moving average.

use chrono::NaiveDate;
use powerrank_stats::correlation::autocorrelation;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::{AnalysisError, ConfigError},
    series::{RankSource, rank_series},
    table::RankTables,
    team::TeamDirectory,
};

const ACF_CLIP: f64 = 0.999;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilityParams {
    pub source: RankSource,
    /// Largest autocorrelation lag.
    pub max_lag: usize,
    /// EWMA smoothing factor for the Fisher-z differences; `0` disables it.
    pub alpha: f64,
}

impl Default for StabilityParams {
    fn default() -> Self {
        Self {
            source: RankSource::Power,
            max_lag: 3,
            alpha: 0.25,
        }
    }
}

impl StabilityParams {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_lag == 0 {
            return Err(ConfigError::ZeroMaxLag);
        }
        if !(0.0..=1.0).contains(&self.alpha) {
            return Err(ConfigError::SmoothingOutOfRange { alpha: self.alpha });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StabilityMetric {
    Stability,
    Acf,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StabilityRow {
    pub date: NaiveDate,
    pub lag: usize,
    pub value: f64,
    pub team_code: String,
    pub team_id: String,
    pub label: String,
    pub source: RankSource,
    pub metric: StabilityMetric,
}

/// Both tidy tables of one team, each sorted by lag, then by date.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StabilityReport {
    pub stability: Vec<StabilityRow>,
    pub acf: Vec<StabilityRow>,
}

/// Wide expanding-window ACF: one column per lag, one entry per date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RollingAcf {
    pub dates: Vec<NaiveDate>,
    /// `by_lag[l - 1][i]` is the lag-`l` autocorrelation as of `dates[i]`.
    pub by_lag: Vec<Vec<Option<f64>>>,
}

/// Computes the expanding-window ACF of `values` observed on `dates`.
///
/// The first entry uses the first `max_lag + 1` values; shorter inputs give an
/// empty table.
#[must_use]
pub fn rolling_acf(dates: &[NaiveDate], values: &[f64], max_lag: usize) -> RollingAcf {
    let len = values.len().min(dates.len());
    let mut out = RollingAcf {
        dates: vec![],
        by_lag: vec![vec![]; max_lag],
    };
    for end in (max_lag + 1)..=len {
        out.dates.push(dates[end - 1]);
        let window = &values[..end];
        for (column, lag) in out.by_lag.iter_mut().zip(1..) {
            column.push(autocorrelation(window, lag));
        }
    }
    out
}

/// Fisher-z first differences of one ACF column, EWMA-smoothed when
/// `alpha > 0`.
///
/// A column of fewer than two entries has no defined differences.
#[must_use]
pub fn fisher_z_diff(acf: &[Option<f64>], alpha: f64) -> Vec<Option<f64>> {
    if acf.len() < 2 {
        return vec![None; acf.len()];
    }
    let z = acf
        .iter()
        .map(|r| r.map(|r| r.clamp(-ACF_CLIP, ACF_CLIP).atanh()))
        .collect::<Vec<_>>();
    let dz = std::iter::once(None)
        .chain(z.windows(2).map(|w| Some(w[1]? - w[0]?)))
        .collect::<Vec<_>>();
    if alpha > 0.0 { ewma(&dz, alpha) } else { dz }
}

/// Recursive EWMA (`adjust = false`) that carries its state over gaps.
///
/// Before the first defined value the output is undefined. At a gap the
/// carried mean is reported and its weight decays by `1 - alpha`, so the next
/// defined value is weighted relatively more.
fn ewma(values: &[Option<f64>], alpha: f64) -> Vec<Option<f64>> {
    let decay = 1.0 - alpha;
    let mut state: Option<f64> = None;
    let mut old_weight = 1.0;
    values
        .iter()
        .map(|&value| {
            match (state, value) {
                (Some(mean), Some(x)) => {
                    old_weight *= decay;
                    state = Some((old_weight * mean + alpha * x) / (old_weight + alpha));
                    old_weight = 1.0;
                }
                (Some(_), None) => old_weight *= decay,
                (None, Some(x)) => state = Some(x),
                (None, None) => {}
            }
            state
        })
        .collect()
}

/// Builds the stability and ACF tables of one team.
///
/// Undefined values are left out of the tables. A series shorter than
/// `max_lag + 1` yields two empty tables.
pub fn build_acf_stability<S>(
    tables: RankTables<'_>,
    directory: &TeamDirectory,
    team_code: S,
    params: &StabilityParams,
) -> Result<StabilityReport, AnalysisError>
where
    S: AsRef<str>,
{
    params.validate()?;
    let team = directory.resolve_code(team_code.as_ref())?;
    let series = rank_series(tables, directory, team.id, params.source)?;
    let dates = series.iter().map(|p| p.date).collect::<Vec<_>>();
    let values = series.iter().map(|p| p.rank).collect::<Vec<_>>();

    let acf = rolling_acf(&dates, &values, params.max_lag);
    if acf.dates.is_empty() {
        debug!(
            team = team.code,
            n = values.len(),
            max_lag = params.max_lag,
            "series too short for rolling autocorrelation"
        );
        return Ok(StabilityReport::default());
    }

    let tidy = |by_lag: &[Vec<Option<f64>>], metric: StabilityMetric| {
        let mut rows = vec![];
        for (column, lag) in by_lag.iter().zip(1..) {
            for (&date, &value) in acf.dates.iter().zip(column) {
                let Some(value) = value.filter(|v| v.is_finite()) else {
                    continue;
                };
                rows.push(StabilityRow {
                    date,
                    lag,
                    value,
                    team_code: team.code.to_owned(),
                    team_id: team.id.to_owned(),
                    label: team.name.to_owned(),
                    source: params.source,
                    metric,
                });
            }
        }
        rows
    };

    let stability_wide = acf
        .by_lag
        .iter()
        .map(|column| fisher_z_diff(column, params.alpha))
        .collect::<Vec<_>>();
    let report = StabilityReport {
        stability: tidy(&stability_wide, StabilityMetric::Stability),
        acf: tidy(&acf.by_lag, StabilityMetric::Acf),
    };
    debug!(
        team = team.code,
        acf_rows = report.acf.len(),
        stability_rows = report.stability.len(),
        "rolling autocorrelation"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{directory, power_rows, week};

    fn assert_close(a: Option<f64>, b: f64) {
        let a = a.unwrap();
        assert!((a - b).abs() < 1e-12, "{a} != {b}");
    }

    #[test]
    fn test_rolling_acf_expanding_window() {
        let values = [1.0, 2.0, 3.0, 4.0, 2.0];
        let dates = (0..5).map(week).collect::<Vec<_>>();
        let acf = rolling_acf(&dates, &values, 2);
        assert_eq!(acf.dates, vec![week(2), week(3), week(4)]);
        // lag 1 on [1, 2, 3] is a perfect trend
        assert_close(acf.by_lag[0][0], 1.0);
        // lag 2 on [1, 2, 3] has a single pair
        assert_eq!(acf.by_lag[1][0], None);
        assert_eq!(
            acf.by_lag[0][2],
            autocorrelation(&values, 1),
            "last entry sees the whole series"
        );
    }

    #[test]
    fn test_fisher_z_diff_without_smoothing() {
        let acf = [Some(0.5), Some(0.2), None, Some(1.0)];
        let dz = fisher_z_diff(&acf, 0.0);
        assert_eq!(dz[0], None);
        assert_close(dz[1], 0.2_f64.atanh() - 0.5_f64.atanh());
        assert_eq!(dz[2], None);
        assert_eq!(dz[3], None);
    }

    #[test]
    fn test_fisher_z_diff_clips_boundary() {
        let dz = fisher_z_diff(&[Some(0.0), Some(1.0)], 0.0);
        assert_close(dz[1], 0.999_f64.atanh());
        assert!(dz[1].unwrap().is_finite());
    }

    #[test]
    fn test_ewma_carries_over_gaps() {
        let out = ewma(&[None, Some(1.0), Some(3.0), None, Some(5.0)], 0.5);
        assert_eq!(out[0], None);
        assert_close(out[1], 1.0);
        assert_close(out[2], 2.0);
        // gap reports the carried mean
        assert_close(out[3], 2.0);
        // carried weight decayed twice: 0.25 * 2 + 0.5 * 5 over 0.75
        assert_close(out[4], 4.0);
    }

    #[test]
    fn test_short_series_is_empty() {
        let power = power_rows("Alphas", &[1, 2, 3]);
        let tables = RankTables {
            power: &power,
            standings: &[],
        };
        let report =
            build_acf_stability(tables, &directory(), "AAA", &StabilityParams::default()).unwrap();
        assert!(report.acf.is_empty());
        assert!(report.stability.is_empty());
    }

    #[test]
    fn test_constant_series_does_not_raise() {
        let power = power_rows("Alphas", &[7; 10]);
        let tables = RankTables {
            power: &power,
            standings: &[],
        };
        let report =
            build_acf_stability(tables, &directory(), "AAA", &StabilityParams::default()).unwrap();
        assert!(report.acf.is_empty());
        assert!(report.stability.is_empty());
    }

    #[test]
    fn test_rows_sorted_by_lag_then_date() {
        let power = power_rows("Alphas", &[1, 4, 2, 8, 5, 7, 3, 6, 9, 2]);
        let tables = RankTables {
            power: &power,
            standings: &[],
        };
        let params = StabilityParams {
            max_lag: 2,
            ..StabilityParams::default()
        };
        let report = build_acf_stability(tables, &directory(), "AAA", &params).unwrap();
        assert!(!report.acf.is_empty());
        assert!(!report.stability.is_empty());
        for rows in [&report.acf, &report.stability] {
            assert!(
                rows.windows(2)
                    .all(|w| (w[0].lag, w[0].date) < (w[1].lag, w[1].date))
            );
        }
        assert!(report.acf.iter().all(|r| r.metric == StabilityMetric::Acf));
        assert!(report.acf.iter().all(|r| (-1.0..=1.0).contains(&r.value)));
        // the first ACF date never has a difference
        assert!(report.stability.iter().all(|r| r.date > week(2)));
    }

    #[test]
    fn test_invalid_params() {
        let tables = RankTables {
            power: &[],
            standings: &[],
        };
        let zero_lag = StabilityParams {
            max_lag: 0,
            ..StabilityParams::default()
        };
        assert!(build_acf_stability(tables, &directory(), "AAA", &zero_lag).is_err());
        let bad_alpha = StabilityParams {
            alpha: 1.5,
            ..StabilityParams::default()
        };
        assert!(matches!(
            build_acf_stability(tables, &directory(), "AAA", &bad_alpha),
            Err(AnalysisError::Config {
                error: ConfigError::SmoothingOutOfRange { .. }
            })
        ));
    }
}
