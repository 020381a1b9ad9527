use std::path::PathBuf;

use clap::{Parser, Subcommand};

use self::{
    causality::CausalityArg, cluster::ClusterArg, kde::KdeArg, ranks::RanksArg,
    regime::RegimeArg, similarity::SimilarityArg, stability::StabilityArg,
    volatility::VolatilityArg,
};

mod causality;
mod cluster;
mod kde;
mod ranks;
mod regime;
mod similarity;
mod stability;
mod volatility;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// Analysis to run
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Wide table of power and league rank series
    Ranks(#[clap(flatten)] RanksArg),
    /// KDE and histogram of week-over-week rank changes
    Kde(#[clap(flatten)] KdeArg),
    /// Expanding standard deviation of rank
    Volatility(#[clap(flatten)] VolatilityArg),
    /// Rolling autocorrelation and its Fisher-z stability
    Stability(#[clap(flatten)] StabilityArg),
    /// Granger test of power rank leading league rank
    Causality(#[clap(flatten)] CausalityArg),
    /// Trajectory similarity of two teams
    Similarity(#[clap(flatten)] SimilarityArg),
    /// Hierarchical clustering of season stats
    Cluster(#[clap(flatten)] ClusterArg),
    /// Good / Mediocre / Bad regimes per team
    Regime(#[clap(flatten)] RegimeArg),
}

/// Input and output files shared by every subcommand.
#[derive(Debug, Clone, clap::Args)]
pub(crate) struct SeasonArg {
    /// Season snapshot JSON file
    #[arg(long)]
    season: PathBuf,
    /// Output file path; stdout when omitted
    #[arg(long)]
    output: Option<PathBuf>,
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    match args.mode {
        Mode::Ranks(arg) => ranks::run(&arg)?,
        Mode::Kde(arg) => kde::run(&arg)?,
        Mode::Volatility(arg) => volatility::run(&arg)?,
        Mode::Stability(arg) => stability::run(&arg)?,
        Mode::Causality(arg) => causality::run(&arg)?,
        Mode::Similarity(arg) => similarity::run(&arg)?,
        Mode::Cluster(arg) => cluster::run(&arg)?,
        Mode::Regime(arg) => regime::run(&arg)?,
    }
    Ok(())
}
