use powerrank_analysis::causality::{CausalityParams, granger_power_to_mlb};
use tracing::info;

use crate::util::{Output, read_season_file};

use super::SeasonArg;

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct CausalityArg {
    #[clap(flatten)]
    season: SeasonArg,
    /// Team code
    #[arg(long)]
    team: String,
    /// Largest lag order to test
    #[arg(long, default_value_t = 4)]
    max_lag: usize,
    /// Minimum number of differenced observations
    #[arg(long, default_value_t = 6)]
    min_obs: usize,
    /// Significance level of the best lag
    #[arg(long, default_value_t = 0.05)]
    alpha: f64,
}

pub(crate) fn run(arg: &CausalityArg) -> anyhow::Result<()> {
    let (season, directory) = read_season_file(&arg.season.season)?;
    let params = CausalityParams {
        max_lag: arg.max_lag,
        min_obs: arg.min_obs,
        alpha: arg.alpha,
    };
    let report = granger_power_to_mlb(season.rank_tables(), &directory, &arg.team, &params)?;
    if let Some(reason) = &report.summary.skipped_reason {
        info!(team = arg.team, reason, "causality test skipped");
    }
    Output::save_json(&report, arg.season.output.as_deref())
}
