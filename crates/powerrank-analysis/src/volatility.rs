//! Expanding-window rank volatility.

use chrono::NaiveDate;
use powerrank_stats::descriptive::expanding_std;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::AnalysisError,
    series::{RankSource, rank_series},
    table::RankTables,
    team::TeamDirectory,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolatilityParams {
    pub source: RankSource,
    /// Delta degrees of freedom of the standard deviation.
    pub ddof: usize,
    /// Minimum window size before a value is defined.
    pub min_periods: usize,
}

impl Default for VolatilityParams {
    fn default() -> Self {
        Self {
            source: RankSource::Power,
            ddof: 0,
            min_periods: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolatilityRow {
    pub date: NaiveDate,
    pub team_code: String,
    pub team_id: String,
    pub label: String,
    pub sigma: f64,
    pub source: RankSource,
}

/// Expanding standard deviation of each selected team's rank series.
///
/// Points where the window is too small for the standard deviation to be
/// defined are reported as `0`. With the default `ddof = 0` the first point of
/// every team is exactly `0`. Rows are sorted by team code, then by date.
///
/// # Examples
///
/// ```
/// # use std::collections::BTreeMap;
/// # use chrono::NaiveDate;
/// # use powerrank_analysis::{
/// #     table::{PowerRankRow, RankTables},
/// #     team::TeamDirectory,
/// #     volatility::{VolatilityParams, build_rank_volatility},
/// # };
/// let directory = TeamDirectory::new(
///     BTreeMap::from([("147".into(), "Yankees".into())]),
///     BTreeMap::from([("147".into(), "NYY".into())]),
/// )
/// .unwrap();
/// let power = [(7, 3), (14, 5)]
///     .map(|(day, rank)| PowerRankRow {
///         date: NaiveDate::from_ymd_opt(2025, 4, day).unwrap(),
///         team: "Yankees".into(),
///         rank,
///     })
///     .to_vec();
/// let tables = RankTables { power: &power, standings: &[] };
/// let rows = build_rank_volatility(tables, &directory, &["NYY"], &VolatilityParams::default())
///     .unwrap();
/// assert_eq!(rows[0].sigma, 0.0);
/// assert_eq!(rows[1].sigma, 1.0);
/// ```
pub fn build_rank_volatility<S>(
    tables: RankTables<'_>,
    directory: &TeamDirectory,
    selected_codes: &[S],
    params: &VolatilityParams,
) -> Result<Vec<VolatilityRow>, AnalysisError>
where
    S: AsRef<str>,
{
    let mut rows = vec![];
    for code in selected_codes {
        let team = directory.resolve_code(code.as_ref())?;
        let series = rank_series(tables, directory, team.id, params.source)?;
        if series.is_empty() {
            debug!(team = team.code, "no ranks; skipping volatility");
            continue;
        }
        let ranks = series.iter().map(|p| p.rank).collect::<Vec<_>>();
        let sigma = expanding_std(&ranks, params.ddof, params.min_periods);
        rows.extend(series.iter().zip(sigma).map(|(point, sigma)| VolatilityRow {
            date: point.date,
            team_code: team.code.to_owned(),
            team_id: team.id.to_owned(),
            label: team.name.to_owned(),
            sigma: sigma.unwrap_or(0.0),
            source: params.source,
        }));
    }
    rows.sort_by(|a, b| a.team_code.cmp(&b.team_code).then(a.date.cmp(&b.date)));
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{directory, power_rows, standings_rows};

    #[test]
    fn test_first_point_is_zero_for_every_team() {
        let mut power = power_rows("Betas", &[4, 9, 2]);
        power.extend(power_rows("Alphas", &[1, 30]));
        let tables = RankTables {
            power: &power,
            standings: &[],
        };
        let rows = build_rank_volatility(
            tables,
            &directory(),
            &["BBB", "AAA"],
            &VolatilityParams::default(),
        )
        .unwrap();
        assert_eq!(rows.len(), 5);
        // sorted by code
        assert_eq!(rows[0].team_code, "AAA");
        assert_eq!(rows[0].sigma, 0.0);
        assert_eq!(rows[2].team_code, "BBB");
        assert_eq!(rows[2].sigma, 0.0);
        assert!((rows[1].sigma - 14.5).abs() < 1e-12);
    }

    #[test]
    fn test_undefined_points_fill_with_zero() {
        let standings = standings_rows("1", &[3, 5, 7]);
        let tables = RankTables {
            power: &[],
            standings: &standings,
        };
        let params = VolatilityParams {
            source: RankSource::Mlb,
            ddof: 1,
            min_periods: 1,
        };
        let rows = build_rank_volatility(tables, &directory(), &["AAA"], &params).unwrap();
        let sigma = rows.iter().map(|r| r.sigma).collect::<Vec<_>>();
        assert_eq!(sigma[0], 0.0);
        assert!((sigma[1] - 2.0_f64.sqrt()).abs() < 1e-12);
        assert!((sigma[2] - 2.0).abs() < 1e-12);
        assert!(rows.iter().all(|r| r.source == RankSource::Mlb));
    }

    #[test]
    fn test_team_without_rows_is_skipped() {
        let tables = RankTables {
            power: &[],
            standings: &[],
        };
        let rows =
            build_rank_volatility(tables, &directory(), &["CCC"], &VolatilityParams::default())
                .unwrap();
        assert!(rows.is_empty());
    }
}
