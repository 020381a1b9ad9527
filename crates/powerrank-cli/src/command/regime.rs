use powerrank_analysis::regime::{
    ModelStats, RegimeParams, StateRow, fit_team_regimes, prepare_power_features,
};
use powerrank_stats::hmm::CovarianceType;
use serde::Serialize;
use tracing::info;

use crate::util::{Output, read_season_file, selected_codes};

use super::SeasonArg;

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct RegimeArg {
    #[clap(flatten)]
    season: SeasonArg,
    /// Team codes; every team when omitted
    #[arg(long, value_delimiter = ',')]
    teams: Vec<String>,
    /// Fewer usable points than this use the heuristic labels
    #[arg(long, default_value_t = 8)]
    min_points: usize,
    /// Covariance shape: diag or full
    #[arg(long, default_value = "full")]
    covariance: CovarianceType,
    #[arg(long, default_value_t = 100)]
    max_iter: usize,
    #[arg(long, default_value_t = 1e-4)]
    tol: f64,
}

#[derive(Debug, Serialize)]
struct TeamRegimes {
    team_code: String,
    team_id: String,
    label: String,
    states: Vec<StateRow>,
    stats: ModelStats,
}

pub(crate) fn run(arg: &RegimeArg) -> anyhow::Result<()> {
    let (season, directory) = read_season_file(&arg.season.season)?;
    let params = RegimeParams {
        min_points: arg.min_points,
        covariance: arg.covariance,
        max_iter: arg.max_iter,
        tol: arg.tol,
        ..RegimeParams::default()
    };

    let features = prepare_power_features(&season.power);
    let mut out = vec![];
    for code in selected_codes(&directory, &arg.teams) {
        let report = fit_team_regimes(&features, &directory, &code, &params)?;
        let stats = report.model_stats();
        info!(
            team = report.team_code,
            n_used = report.n_used,
            init = ?stats.init,
            "fitted team regimes"
        );
        out.push(TeamRegimes {
            team_code: report.team_code,
            team_id: report.team_id,
            label: report.label,
            states: report.states,
            stats,
        });
    }
    Output::save_json(&out, arg.season.output.as_deref())
}
