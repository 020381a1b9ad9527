use std::str::FromStr;

use powerrank_stats::cluster::Metric;

/// Errors surfaced to the caller before or instead of any computation.
///
/// Insufficient data is never an error: each analysis reports it through
/// empty rows or null fields instead.
#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum AnalysisError {
    #[display("unknown team code `{code}`")]
    UnknownTeamCode { code: String },
    #[display("unknown team id `{team_id}`")]
    UnknownTeamId { team_id: String },
    #[display("inconsistent team mappings: {reason}")]
    InconsistentMappings { reason: String },
    #[display("{error}")]
    Config { error: ConfigError },
}

impl From<ConfigError> for AnalysisError {
    fn from(error: ConfigError) -> Self {
        Self::Config { error }
    }
}

/// Invalid parameters or option strings.
#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum ConfigError {
    #[display("unknown {kind} `{value}`")]
    UnknownOption { kind: &'static str, value: String },
    #[display("ward linkage requires euclidean distance, got {metric:?}")]
    WardRequiresEuclidean { metric: Metric },
    #[display("number of clusters must be at least 1")]
    ZeroClusters,
    #[display("no stat tables available for feature selection `{selection}`")]
    NoStatTables { selection: String },
    #[display("max_lag must be at least 1")]
    ZeroMaxLag,
    #[display("smoothing alpha must be within [0, 1], got {alpha}")]
    SmoothingOutOfRange { alpha: f64 },
    #[display("evaluation grid is empty")]
    EmptyGrid,
    #[display("bin edges must be strictly increasing with at least two entries")]
    InvalidBinEdges,
    #[display("fixed bandwidth must be positive, got {bandwidth}")]
    InvalidBandwidth { bandwidth: f64 },
    #[display("min_points must be at least 1")]
    ZeroMinPoints,
}

/// Parses a string option, mapping failures to [`ConfigError::UnknownOption`].
///
/// # Examples
///
/// ```
/// # use powerrank_analysis::{error::parse_option, series::RankSource};
/// let source: RankSource = parse_option("rank source", "mlb").unwrap();
/// assert_eq!(source, RankSource::Mlb);
/// assert!(parse_option::<RankSource>("rank source", "espn").is_err());
/// ```
pub fn parse_option<T>(kind: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
{
    value.parse().map_err(|_| ConfigError::UnknownOption {
        kind,
        value: value.to_owned(),
    })
}
