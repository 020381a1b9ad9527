use powerrank_analysis::{
    series::RankSource,
    volatility::{VolatilityParams, build_rank_volatility},
};

use crate::util::{Output, read_season_file, selected_codes};

use super::SeasonArg;

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct VolatilityArg {
    #[clap(flatten)]
    season: SeasonArg,
    /// Team codes; every team when omitted
    #[arg(long, value_delimiter = ',')]
    teams: Vec<String>,
    #[arg(long, default_value = "power")]
    source: RankSource,
    /// Delta degrees of freedom
    #[arg(long, default_value_t = 0)]
    ddof: usize,
    #[arg(long, default_value_t = 1)]
    min_periods: usize,
}

pub(crate) fn run(arg: &VolatilityArg) -> anyhow::Result<()> {
    let (season, directory) = read_season_file(&arg.season.season)?;
    let codes = selected_codes(&directory, &arg.teams);
    let params = VolatilityParams {
        source: arg.source,
        ddof: arg.ddof,
        min_periods: arg.min_periods,
    };
    let rows = build_rank_volatility(season.rank_tables(), &directory, &codes, &params)?;
    Output::save_json(&rows, arg.season.output.as_deref())
}
