use powerrank_analysis::{
    distribution::{KdeParams, build_delta_kde_and_hist},
    series::RankSource,
};
use powerrank_stats::histogram::linspace;

use crate::util::{Output, read_season_file, selected_codes};

use super::SeasonArg;

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct KdeArg {
    #[clap(flatten)]
    season: SeasonArg,
    /// Team codes; every team when omitted
    #[arg(long, value_delimiter = ',')]
    teams: Vec<String>,
    /// Rank series the changes are taken from: power or mlb
    #[arg(long, default_value = "power")]
    source: RankSource,
    /// Lower end of the evaluation grid and the histogram range
    #[arg(long, default_value_t = -15.0, allow_negative_numbers = true)]
    min: f64,
    /// Upper end of the evaluation grid and the histogram range
    #[arg(long, default_value_t = 15.0)]
    max: f64,
    /// Number of KDE grid points
    #[arg(long, default_value_t = 300)]
    grid_points: usize,
    /// Number of histogram bin edges
    #[arg(long, default_value_t = 31)]
    bin_edges: usize,
    /// Fixed KDE bandwidth; Silverman's rule when omitted
    #[arg(long)]
    bandwidth: Option<f64>,
}

pub(crate) fn run(arg: &KdeArg) -> anyhow::Result<()> {
    let (season, directory) = read_season_file(&arg.season.season)?;
    let codes = selected_codes(&directory, &arg.teams);
    let params = KdeParams {
        grid: linspace(arg.min, arg.max, arg.grid_points),
        bin_edges: linspace(arg.min, arg.max, arg.bin_edges),
        source: arg.source,
        bandwidth: arg.bandwidth,
    };
    let distribution =
        build_delta_kde_and_hist(season.rank_tables(), &directory, &codes, &params)?;
    Output::save_json(&distribution, arg.season.output.as_deref())
}
