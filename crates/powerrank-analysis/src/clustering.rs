//! Season clustering of teams by their batting, pitching and fielding stats,
//! summarized against final standings and playoff odds.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::NaiveDate;
use powerrank_stats::{
    cluster::{Linkage, Metric, cut_into_clusters, hierarchical},
    descriptive::{self, mean},
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::{AnalysisError, ConfigError},
    table::{OddsRow, StandingsRow, StatRow, StatTable, StatTables},
};

/// Playoff probability at or above which a team counts as having made it.
pub const PLAYOFF_ODDS_THRESHOLD: f64 = 1.0;

/// Which stat tables feed the feature matrix.
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
pub enum FeatureSelection {
    #[display("batting")]
    Batting,
    #[display("pitching")]
    Pitching,
    #[display("fielding")]
    Fielding,
    /// All available tables, inner-joined on team.
    #[default]
    #[display("combo")]
    Combo,
}

/// Per-group column allowlists, using unprefixed column names.
///
/// Groups left as `None` contribute no columns once an allowlist is given.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnAllowlist {
    pub batting: Option<Vec<String>>,
    pub pitching: Option<Vec<String>>,
    pub fielding: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterParams {
    pub selection: FeatureSelection,
    pub use_cols: Option<ColumnAllowlist>,
    /// Columns whose prefixed name contains any of these substrings are dropped.
    pub drop_cols_contains: Vec<String>,
    /// Standardize every column to zero mean and unit variance.
    pub scale: bool,
    /// Number of flat clusters.
    pub k: usize,
    pub linkage: Linkage,
    pub metric: Metric,
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            selection: FeatureSelection::Combo,
            use_cols: None,
            drop_cols_contains: vec![],
            scale: true,
            k: 6,
            linkage: Linkage::Ward,
            metric: Metric::Euclidean,
        }
    }
}

impl ClusterParams {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.k == 0 {
            return Err(ConfigError::ZeroClusters);
        }
        if self.linkage == Linkage::Ward && self.metric != Metric::Euclidean {
            return Err(ConfigError::WardRequiresEuclidean {
                metric: self.metric,
            });
        }
        Ok(())
    }
}

/// Dense per-team feature matrix, one row per team id.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeatureMatrix {
    pub teams: Vec<String>,
    pub columns: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterAssignment {
    pub team_id: String,
    pub cluster: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterSummaryRow {
    pub cluster: usize,
    pub n_teams: usize,
    /// Mean of the members' latest league rank; `None` if no member has one.
    pub avg_last_mlb_rank: Option<f64>,
    pub median_last_mlb_rank: Option<f64>,
    pub made_playoffs: usize,
    pub pct_playoffs: f64,
    pub teams: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClusterReport {
    /// Sorted by ascending average final rank, then descending playoff share.
    pub summary: Vec<ClusterSummaryRow>,
    pub features: FeatureMatrix,
    pub assignments: Vec<ClusterAssignment>,
}

struct StatGroup<'a> {
    prefix: &'static str,
    table: &'a StatTable,
    allowlist: Option<&'a [String]>,
}

/// Builds the imputed and optionally standardized feature matrix.
///
/// Teams are kept in the order of the first selected table and only when
/// present in every selected table; a team listed twice in one table uses its
/// first row. Missing cells take the column median, or `0` for a column with no
/// value at all.
pub fn build_feature_matrix(
    tables: StatTables<'_>,
    params: &ClusterParams,
) -> Result<FeatureMatrix, AnalysisError> {
    let groups = selected_groups(tables, params);
    if groups.is_empty() {
        return Err(ConfigError::NoStatTables {
            selection: params.selection.to_string(),
        }
        .into());
    }

    // (prefixed name, group index, column index within the group's table)
    let mut columns = groups
        .iter()
        .enumerate()
        .flat_map(|(g, group)| {
            group
                .table
                .columns()
                .iter()
                .enumerate()
                .map(move |(c, name)| (format!("{}_{name}", group.prefix), g, c))
        })
        .collect::<Vec<_>>();

    if params.use_cols.is_some() {
        let mut kept: Vec<(String, usize, usize)> = vec![];
        for group in &groups {
            for name in group.allowlist.unwrap_or_default() {
                let prefixed = format!("{}_{name}", group.prefix);
                if kept.iter().any(|(n, _, _)| *n == prefixed) {
                    continue;
                }
                if let Some(column) = columns.iter().find(|(n, _, _)| *n == prefixed) {
                    kept.push(column.clone());
                }
            }
        }
        columns = kept;
    }
    if !params.drop_cols_contains.is_empty() {
        columns.retain(|(name, _, _)| {
            !params
                .drop_cols_contains
                .iter()
                .any(|token| name.contains(token.as_str()))
        });
    }

    let lookups = groups
        .iter()
        .map(|group| first_row_by_team(group.table))
        .collect::<Vec<_>>();
    let mut teams = vec![];
    let mut raw: Vec<Vec<Option<f64>>> = vec![];
    let mut seen = HashSet::new();
    for row in groups[0].table.rows() {
        if !seen.insert(row.team_name.as_str()) {
            continue;
        }
        let Some(rows) = lookups
            .iter()
            .map(|lookup| lookup.get(row.team_name.as_str()).copied())
            .collect::<Option<Vec<_>>>()
        else {
            continue;
        };
        teams.push(row.team_name.clone());
        raw.push(
            columns
                .iter()
                .map(|&(_, g, c)| rows[g].values.get(c).copied().flatten())
                .collect(),
        );
    }

    let mut values = impute_with_median(&raw, columns.len());
    if params.scale {
        standardize(&mut values, columns.len());
    }
    debug!(
        teams = teams.len(),
        columns = columns.len(),
        selection = %params.selection,
        "built feature matrix"
    );

    Ok(FeatureMatrix {
        teams,
        columns: columns.into_iter().map(|(name, _, _)| name).collect(),
        values,
    })
}

fn selected_groups<'a>(tables: StatTables<'a>, params: &'a ClusterParams) -> Vec<StatGroup<'a>> {
    use FeatureSelection::{Batting, Combo, Fielding, Pitching};

    let allow = params.use_cols.as_ref();
    let candidates = [
        (
            matches!(params.selection, Batting | Combo),
            "bat",
            tables.batting,
            allow.and_then(|a| a.batting.as_deref()),
        ),
        (
            matches!(params.selection, Pitching | Combo),
            "pit",
            tables.pitching,
            allow.and_then(|a| a.pitching.as_deref()),
        ),
        (
            matches!(params.selection, Fielding | Combo),
            "fld",
            tables.fielding,
            allow.and_then(|a| a.fielding.as_deref()),
        ),
    ];
    candidates
        .into_iter()
        .filter_map(|(selected, prefix, table, allowlist)| {
            let table = table.filter(|_| selected)?;
            Some(StatGroup {
                prefix,
                table,
                allowlist,
            })
        })
        .collect()
}

fn first_row_by_team(table: &StatTable) -> HashMap<&str, &StatRow> {
    let mut lookup = HashMap::new();
    for row in table.rows() {
        lookup.entry(row.team_name.as_str()).or_insert(row);
    }
    lookup
}

fn impute_with_median(raw: &[Vec<Option<f64>>], n_cols: usize) -> Vec<Vec<f64>> {
    let medians = (0..n_cols)
        .map(|c| {
            let present = raw.iter().filter_map(|row| row[c]).collect::<Vec<_>>();
            descriptive::median(&present).unwrap_or(0.0)
        })
        .collect::<Vec<_>>();
    raw.iter()
        .map(|row| {
            row.iter()
                .zip(&medians)
                .map(|(value, median)| value.unwrap_or(*median))
                .collect()
        })
        .collect()
}

fn standardize(values: &mut [Vec<f64>], n_cols: usize) {
    for c in 0..n_cols {
        let column = values.iter().map(|row| row[c]).collect::<Vec<_>>();
        let (Some(mu), Some(sd)) = (mean(&column), descriptive::std_dev(&column, 0)) else {
            continue;
        };
        let scale = if sd > 0.0 && sd.is_finite() { sd } else { 1.0 };
        for row in values.iter_mut() {
            row[c] = (row[c] - mu) / scale;
        }
    }
}

/// Cuts the hierarchical clustering of the feature matrix into `k` clusters.
///
/// With more clusters requested than teams, every team gets its own cluster.
pub fn cluster_teams(
    features: &FeatureMatrix,
    params: &ClusterParams,
) -> Result<Vec<ClusterAssignment>, AnalysisError> {
    params.validate()?;
    let merges = hierarchical(&features.values, params.linkage, params.metric);
    let labels = cut_into_clusters(features.teams.len(), &merges, params.k);
    debug!(
        teams = features.teams.len(),
        k = params.k,
        clusters = labels.iter().max().copied().unwrap_or(0),
        linkage = ?params.linkage,
        metric = ?params.metric,
        "cut dendrogram"
    );
    Ok(features
        .teams
        .iter()
        .zip(labels)
        .map(|(team_id, cluster)| ClusterAssignment {
            team_id: team_id.clone(),
            cluster,
        })
        .collect())
}

/// League rank of each team on its latest standings date.
///
/// Among rows sharing that date, the later one in the table wins.
#[must_use]
pub fn last_mlb_rank_per_team(standings: &[StandingsRow]) -> HashMap<&str, u32> {
    let mut latest: HashMap<&str, (NaiveDate, u32)> = HashMap::new();
    for row in standings {
        let entry = latest
            .entry(row.team_name.as_str())
            .or_insert((row.date, row.mlb_rank));
        if row.date >= entry.0 {
            *entry = (row.date, row.mlb_rank);
        }
    }
    latest
        .into_iter()
        .map(|(team, (_, rank))| (team, rank))
        .collect()
}

/// Teams whose playoff odds reach the threshold on the table's last date.
#[must_use]
pub fn playoff_team_ids(odds: &[OddsRow]) -> HashSet<&str> {
    let Some(last_day) = odds.iter().map(|row| row.date).max() else {
        return HashSet::new();
    };
    odds.iter()
        .filter(|row| row.date == last_day && row.make_playoffs_odds >= PLAYOFF_ODDS_THRESHOLD)
        .map(|row| row.team_name.as_str())
        .collect()
}

/// Summarizes each cluster against final standings and playoff odds.
#[expect(clippy::cast_precision_loss)]
#[must_use]
pub fn summarize_clusters(
    assignments: &[ClusterAssignment],
    standings: &[StandingsRow],
    odds: &[OddsRow],
) -> Vec<ClusterSummaryRow> {
    let last_rank = last_mlb_rank_per_team(standings);
    let playoffs = playoff_team_ids(odds);

    let mut members: BTreeMap<usize, Vec<&str>> = BTreeMap::new();
    for assignment in assignments {
        members
            .entry(assignment.cluster)
            .or_default()
            .push(&assignment.team_id);
    }

    let mut rows = members
        .into_iter()
        .map(|(cluster, teams)| {
            let ranks = teams
                .iter()
                .filter_map(|team| last_rank.get(team))
                .map(|&rank| f64::from(rank))
                .collect::<Vec<_>>();
            let made = teams.iter().filter(|team| playoffs.contains(*team)).count();
            let pct_playoffs = made as f64 / teams.len() as f64;
            ClusterSummaryRow {
                cluster,
                n_teams: teams.len(),
                avg_last_mlb_rank: mean(&ranks),
                median_last_mlb_rank: descriptive::median(&ranks),
                made_playoffs: made,
                pct_playoffs,
                teams: teams.into_iter().map(str::to_owned).collect(),
            }
        })
        .collect::<Vec<_>>();

    rows.sort_by(|a, b| {
        let by_rank = match (a.avg_last_mlb_rank, b.avg_last_mlb_rank) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        };
        by_rank.then(b.pct_playoffs.total_cmp(&a.pct_playoffs))
    });
    rows
}

/// Builds features, clusters the teams and summarizes the clusters.
///
/// Configuration errors are reported before any feature is computed.
pub fn cluster_and_summarize_season_stats(
    stats: StatTables<'_>,
    standings: &[StandingsRow],
    odds: &[OddsRow],
    params: &ClusterParams,
) -> Result<ClusterReport, AnalysisError> {
    params.validate()?;
    let features = build_feature_matrix(stats, params)?;
    let assignments = cluster_teams(&features, params)?;
    let summary = summarize_clusters(&assignments, standings, odds);
    Ok(ClusterReport {
        summary,
        features,
        assignments,
    })
}
