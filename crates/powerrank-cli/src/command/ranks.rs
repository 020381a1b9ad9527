use powerrank_analysis::series::{PlotMode, build_plot_table};

use crate::util::{Output, read_season_file, selected_codes};

use super::SeasonArg;

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct RanksArg {
    #[clap(flatten)]
    season: SeasonArg,
    /// Team codes; every team when omitted
    #[arg(long, value_delimiter = ',')]
    teams: Vec<String>,
    /// Series to plot: power, mlb, diff or both
    #[arg(long, default_value = "power")]
    mode: PlotMode,
}

pub(crate) fn run(arg: &RanksArg) -> anyhow::Result<()> {
    let (season, directory) = read_season_file(&arg.season.season)?;
    let codes = selected_codes(&directory, &arg.teams);
    let table = build_plot_table(season.rank_tables(), &directory, &codes, arg.mode)?;
    Output::save_json(&table, arg.season.output.as_deref())
}
