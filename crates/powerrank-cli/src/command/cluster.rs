use powerrank_analysis::clustering::{
    ClusterParams, ColumnAllowlist, FeatureSelection, cluster_and_summarize_season_stats,
};
use powerrank_stats::cluster::{Linkage, Metric};

use crate::util::{Output, read_season_file};

use super::SeasonArg;

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct ClusterArg {
    #[clap(flatten)]
    season: SeasonArg,
    /// Stat tables to use: batting, pitching, fielding or combo
    #[arg(long, default_value = "combo")]
    selection: FeatureSelection,
    /// Number of clusters
    #[arg(long, default_value_t = 6)]
    k: usize,
    #[arg(long, default_value = "ward")]
    linkage: Linkage,
    #[arg(long, default_value = "euclidean")]
    metric: Metric,
    /// Keep raw feature scales
    #[arg(long, default_value_t = false)]
    no_scale: bool,
    /// Drop columns whose name contains any of these substrings
    #[arg(long, value_delimiter = ',')]
    drop_cols_contains: Vec<String>,
    /// Batting columns to keep
    #[arg(long, value_delimiter = ',')]
    batting_cols: Option<Vec<String>>,
    /// Pitching columns to keep
    #[arg(long, value_delimiter = ',')]
    pitching_cols: Option<Vec<String>>,
    /// Fielding columns to keep
    #[arg(long, value_delimiter = ',')]
    fielding_cols: Option<Vec<String>>,
}

impl ClusterArg {
    fn use_cols(&self) -> Option<ColumnAllowlist> {
        if self.batting_cols.is_none() && self.pitching_cols.is_none() && self.fielding_cols.is_none()
        {
            return None;
        }
        Some(ColumnAllowlist {
            batting: self.batting_cols.clone(),
            pitching: self.pitching_cols.clone(),
            fielding: self.fielding_cols.clone(),
        })
    }
}

pub(crate) fn run(arg: &ClusterArg) -> anyhow::Result<()> {
    let (season, _directory) = read_season_file(&arg.season.season)?;
    let params = ClusterParams {
        selection: arg.selection,
        use_cols: arg.use_cols(),
        drop_cols_contains: arg.drop_cols_contains.clone(),
        scale: !arg.no_scale,
        k: arg.k,
        linkage: arg.linkage,
        metric: arg.metric,
    };
    let report = cluster_and_summarize_season_stats(
        season.stat_tables(),
        &season.standings,
        &season.odds,
        &params,
    )?;
    Output::save_json(&report, arg.season.output.as_deref())
}
