use powerrank_analysis::{
    series::RankSource,
    stability::{StabilityParams, build_acf_stability},
};

use crate::util::{Output, read_season_file};

use super::SeasonArg;

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct StabilityArg {
    #[clap(flatten)]
    season: SeasonArg,
    /// Team code
    #[arg(long)]
    team: String,
    #[arg(long, default_value = "power")]
    source: RankSource,
    /// Largest autocorrelation lag
    #[arg(long, default_value_t = 4)]
    max_lag: usize,
    /// EWMA smoothing of the Fisher-z differences; 0 disables it
    #[arg(long, default_value_t = 0.25)]
    alpha: f64,
}

pub(crate) fn run(arg: &StabilityArg) -> anyhow::Result<()> {
    let (season, directory) = read_season_file(&arg.season.season)?;
    let params = StabilityParams {
        source: arg.source,
        max_lag: arg.max_lag,
        alpha: arg.alpha,
    };
    let report = build_acf_stability(season.rank_tables(), &directory, &arg.team, &params)?;
    Output::save_json(&report, arg.season.output.as_deref())
}
