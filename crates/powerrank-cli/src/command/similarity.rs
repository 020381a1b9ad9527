use powerrank_analysis::{
    series::RankSource,
    similarity::{SimilarityParams, compute_trajectory_similarity},
};

use crate::util::{Output, read_season_file};

use super::SeasonArg;

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct SimilarityArg {
    #[clap(flatten)]
    season: SeasonArg,
    /// First team code
    #[arg(long)]
    team_a: String,
    /// Second team code
    #[arg(long)]
    team_b: String,
    #[arg(long, default_value = "power")]
    source: RankSource,
    #[arg(long, default_value_t = 3)]
    min_overlap: usize,
    /// Per-step raw DTW cost that maps to zero similarity
    #[arg(long, default_value_t = 29.0)]
    max_rank_gap_per_step: f64,
}

pub(crate) fn run(arg: &SimilarityArg) -> anyhow::Result<()> {
    let (season, directory) = read_season_file(&arg.season.season)?;
    let params = SimilarityParams {
        source: arg.source,
        min_overlap: arg.min_overlap,
        max_rank_gap_per_step: arg.max_rank_gap_per_step,
    };
    let report = compute_trajectory_similarity(
        season.rank_tables(),
        &directory,
        &arg.team_a,
        &arg.team_b,
        &params,
    )?;
    Output::save_json(&report, arg.season.output.as_deref())
}
