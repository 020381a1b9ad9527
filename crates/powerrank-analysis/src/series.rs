//! Per-team rank series and the wide plotting table.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{error::AnalysisError, table::RankTables, team::TeamDirectory};

/// Which ranking a series is drawn from.
#[derive(
    Default,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    derive_more::FromStr,
    derive_more::Display,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum RankSource {
    /// Editorial power rank, keyed by display name.
    #[default]
    #[display("power")]
    Power,
    /// Standings-derived league rank, keyed by team id.
    #[display("mlb")]
    Mlb,
}

/// One observation of a team's rank.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RankPoint {
    pub date: NaiveDate,
    pub rank: f64,
}

/// Power and league rank of one team on a shared date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AlignedRanks {
    pub date: NaiveDate,
    pub power: f64,
    pub mlb: f64,
}

/// Date-ordered rank series of one team.
///
/// The power table is searched by the team's display name and the standings
/// table by its id. A team without rows yields an empty series. Rows sharing a
/// date are kept in table order.
pub fn rank_series(
    tables: RankTables<'_>,
    directory: &TeamDirectory,
    team_id: &str,
    source: RankSource,
) -> Result<Vec<RankPoint>, AnalysisError> {
    let mut points = match source {
        RankSource::Power => {
            let name = directory.display_name(team_id)?;
            tables
                .power
                .iter()
                .filter(|row| row.team == name)
                .map(|row| RankPoint {
                    date: row.date,
                    rank: f64::from(row.rank),
                })
                .collect::<Vec<_>>()
        }
        RankSource::Mlb => tables
            .standings
            .iter()
            .filter(|row| row.team_name == team_id)
            .map(|row| RankPoint {
                date: row.date,
                rank: f64::from(row.mlb_rank),
            })
            .collect(),
    };
    points.sort_by_key(|p| p.date);
    Ok(points)
}

/// Power and league ranks of one team inner-joined on date.
pub fn aligned_power_mlb(
    tables: RankTables<'_>,
    directory: &TeamDirectory,
    team_id: &str,
) -> Result<Vec<AlignedRanks>, AnalysisError> {
    let power = rank_series(tables, directory, team_id, RankSource::Power)?;
    let mlb = rank_series(tables, directory, team_id, RankSource::Mlb)?;
    Ok(inner_join(&power, &mlb)
        .into_iter()
        .map(|(date, power, mlb)| AlignedRanks { date, power, mlb })
        .collect())
}

/// Pairs the values of two date-sorted series that share a date.
///
/// Every combination of rows on a duplicated date is emitted, ordered by the
/// left series.
#[must_use]
pub fn inner_join(left: &[RankPoint], right: &[RankPoint]) -> Vec<(NaiveDate, f64, f64)> {
    let mut joined = vec![];
    for l in left {
        let start = right.partition_point(|r| r.date < l.date);
        for r in right[start..].iter().take_while(|r| r.date == l.date) {
            joined.push((l.date, l.rank, r.rank));
        }
    }
    joined
}

/// One-step differences of a rank series.
#[must_use]
pub fn rank_deltas(series: &[RankPoint]) -> Vec<f64> {
    series.windows(2).map(|w| w[1].rank - w[0].rank).collect()
}

/// Shape of the wide plotting table.
#[derive(
    Default,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    derive_more::FromStr,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum PlotMode {
    /// One power-rank column per team.
    #[default]
    Power,
    /// One league-rank column per team.
    Mlb,
    /// Power rank minus league rank, on dates where both exist.
    Diff,
    /// Power and league rank columns per team.
    Both,
}

/// Wide table of rank series, one column per team and series.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlotTable {
    pub columns: Vec<String>,
    pub rows: Vec<PlotRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotRow {
    pub date: NaiveDate,
    /// One value per column; `None` where the team has no observation.
    pub values: Vec<Option<f64>>,
}

struct TeamColumns {
    names: Vec<String>,
    by_date: BTreeMap<NaiveDate, Vec<Option<f64>>>,
}

/// Builds the wide table for the selected team codes.
///
/// Dates are the union over all selected teams, sorted ascending. When a team
/// has several rows on one date, the last one is shown.
///
/// # Examples
///
/// ```
/// # use std::collections::BTreeMap;
/// # use chrono::NaiveDate;
/// # use powerrank_analysis::{
/// #     series::{PlotMode, build_plot_table},
/// #     table::{PowerRankRow, RankTables},
/// #     team::TeamDirectory,
/// # };
/// let directory = TeamDirectory::new(
///     BTreeMap::from([("147".into(), "Yankees".into())]),
///     BTreeMap::from([("147".into(), "NYY".into())]),
/// )
/// .unwrap();
/// let power = vec![PowerRankRow {
///     date: NaiveDate::from_ymd_opt(2025, 4, 7).unwrap(),
///     team: "Yankees".into(),
///     rank: 3,
/// }];
/// let tables = RankTables { power: &power, standings: &[] };
/// let table = build_plot_table(tables, &directory, &["NYY"], PlotMode::Power).unwrap();
/// assert_eq!(table.columns, vec!["Yankees — Power Rank".to_owned()]);
/// assert_eq!(table.rows[0].values, vec![Some(3.0)]);
/// ```
pub fn build_plot_table<S>(
    tables: RankTables<'_>,
    directory: &TeamDirectory,
    selected_codes: &[S],
    mode: PlotMode,
) -> Result<PlotTable, AnalysisError>
where
    S: AsRef<str>,
{
    let mut teams = Vec::with_capacity(selected_codes.len());
    for code in selected_codes {
        let team = directory.resolve_code(code.as_ref())?;
        let power = rank_series(tables, directory, team.id, RankSource::Power)?;
        let mlb = rank_series(tables, directory, team.id, RankSource::Mlb)?;
        let power_col = format!("{} — Power Rank", team.name);
        let mlb_col = format!("{} — MLB Rank", team.name);

        let columns = match mode {
            PlotMode::Power => TeamColumns {
                names: vec![power_col],
                by_date: power.iter().map(|p| (p.date, vec![Some(p.rank)])).collect(),
            },
            PlotMode::Mlb => TeamColumns {
                names: vec![mlb_col],
                by_date: mlb.iter().map(|p| (p.date, vec![Some(p.rank)])).collect(),
            },
            PlotMode::Diff => {
                let mlb_by_date = last_by_date(&mlb);
                TeamColumns {
                    names: vec![format!("{} — Δ", team.name)],
                    by_date: power
                        .iter()
                        .filter_map(|p| {
                            let league = mlb_by_date.get(&p.date)?;
                            Some((p.date, vec![Some(p.rank - league)]))
                        })
                        .collect(),
                }
            }
            PlotMode::Both => {
                let power_by_date = last_by_date(&power);
                let mlb_by_date = last_by_date(&mlb);
                let dates = power_by_date
                    .keys()
                    .chain(mlb_by_date.keys())
                    .copied()
                    .collect::<BTreeSet<_>>();
                TeamColumns {
                    names: vec![power_col, mlb_col],
                    by_date: dates
                        .into_iter()
                        .map(|date| {
                            let values = vec![
                                power_by_date.get(&date).copied(),
                                mlb_by_date.get(&date).copied(),
                            ];
                            (date, values)
                        })
                        .collect(),
                }
            }
        };
        teams.push(columns);
    }

    let dates = teams
        .iter()
        .flat_map(|t| t.by_date.keys().copied())
        .collect::<BTreeSet<_>>();
    let columns = teams.iter().flat_map(|t| t.names.clone()).collect();
    let rows = dates
        .into_iter()
        .map(|date| {
            let values = teams
                .iter()
                .flat_map(|t| match t.by_date.get(&date) {
                    Some(values) => values.clone(),
                    None => vec![None; t.names.len()],
                })
                .collect();
            PlotRow { date, values }
        })
        .collect();

    Ok(PlotTable { columns, rows })
}

fn last_by_date(series: &[RankPoint]) -> BTreeMap<NaiveDate, f64> {
    series.iter().map(|p| (p.date, p.rank)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::parse_option,
        test_util::{directory, power_rows, standings_rows, week},
    };

    #[test]
    fn test_rank_series_uses_name_for_power_and_id_for_mlb() {
        let power = power_rows("Alphas", &[3, 1]);
        let standings = standings_rows("1", &[5, 4, 2]);
        let tables = RankTables {
            power: &power,
            standings: &standings,
        };
        let directory = directory();
        let p = rank_series(tables, &directory, "1", RankSource::Power).unwrap();
        let m = rank_series(tables, &directory, "1", RankSource::Mlb).unwrap();
        assert_eq!(p.len(), 2);
        assert_eq!(m.len(), 3);
        assert_eq!(m[2].rank, 2.0);
    }

    #[test]
    fn test_rank_series_sorts_and_allows_empty() {
        let mut power = power_rows("Alphas", &[3, 1, 2]);
        power.reverse();
        let tables = RankTables {
            power: &power,
            standings: &[],
        };
        let directory = directory();
        let p = rank_series(tables, &directory, "1", RankSource::Power).unwrap();
        assert!(p.windows(2).all(|w| w[0].date <= w[1].date));
        assert_eq!(p[0].rank, 3.0);
        assert!(
            rank_series(tables, &directory, "2", RankSource::Power)
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn test_rank_series_unknown_id_for_power() {
        let tables = RankTables {
            power: &[],
            standings: &[],
        };
        let result = rank_series(tables, &directory(), "99", RankSource::Power);
        assert!(matches!(result, Err(AnalysisError::UnknownTeamId { .. })));
        // league source never needs the name
        assert!(
            rank_series(tables, &directory(), "99", RankSource::Mlb)
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn test_aligned_inner_join() {
        let power = power_rows("Alphas", &[3, 1, 2, 4]);
        let standings = standings_rows("1", &[10, 9]);
        let tables = RankTables {
            power: &power,
            standings: &standings,
        };
        let aligned = aligned_power_mlb(tables, &directory(), "1").unwrap();
        assert_eq!(aligned.len(), 2);
        assert_eq!(aligned[1].power, 1.0);
        assert_eq!(aligned[1].mlb, 9.0);
    }

    #[test]
    fn test_plot_table_modes() {
        let mut power = power_rows("Alphas", &[3, 1, 2]);
        power.extend(power_rows("Betas", &[7, 8]));
        let standings = standings_rows("1", &[5, 4]);
        let tables = RankTables {
            power: &power,
            standings: &standings,
        };
        let directory = directory();

        let both = build_plot_table(tables, &directory, &["AAA", "BBB"], PlotMode::Both).unwrap();
        assert_eq!(
            both.columns,
            vec![
                "Alphas — Power Rank",
                "Alphas — MLB Rank",
                "Betas — Power Rank",
                "Betas — MLB Rank"
            ]
        );
        assert_eq!(both.rows.len(), 3);
        assert_eq!(both.rows[2].values, vec![Some(2.0), None, None, None]);

        let diff = build_plot_table(tables, &directory, &["AAA"], PlotMode::Diff).unwrap();
        assert_eq!(diff.columns, vec!["Alphas — Δ"]);
        assert_eq!(diff.rows.len(), 2);
        assert_eq!(diff.rows[0].date, week(0));
        assert_eq!(diff.rows[0].values, vec![Some(-2.0)]);
        assert_eq!(diff.rows[1].values, vec![Some(-3.0)]);

        let mlb = build_plot_table(tables, &directory, &["AAA", "BBB"], PlotMode::Mlb).unwrap();
        assert_eq!(mlb.rows.len(), 2);
        assert_eq!(mlb.rows[0].values, vec![Some(5.0), None]);
    }

    #[test]
    fn test_plot_table_errors_and_empty_selection() {
        let tables = RankTables {
            power: &[],
            standings: &[],
        };
        let directory = directory();
        let empty = build_plot_table::<&str>(tables, &directory, &[], PlotMode::Power).unwrap();
        assert!(empty.columns.is_empty());
        assert!(empty.rows.is_empty());
        assert!(matches!(
            build_plot_table(tables, &directory, &["ZZZ"], PlotMode::Power),
            Err(AnalysisError::UnknownTeamCode { .. })
        ));
        assert!(parse_option::<PlotMode>("plot mode", "ratio").is_err());
        assert_eq!(
            parse_option::<PlotMode>("plot mode", "both").unwrap(),
            PlotMode::Both
        );
    }

    #[test]
    fn test_rank_source_display() {
        assert_eq!(RankSource::Mlb.to_string(), "mlb");
        assert_eq!("power".parse::<RankSource>().unwrap(), RankSource::Power);
    }
}
