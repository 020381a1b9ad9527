//! Pairwise similarity of two teams' rank trajectories.

use powerrank_stats::{
    correlation::pearson,
    descriptive::{diff, mean, z_scores},
    dtw::dtw,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::AnalysisError,
    series::{RankSource, inner_join, rank_series},
    table::RankTables,
    team::TeamDirectory,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityParams {
    pub source: RankSource,
    /// Minimum number of shared dates before any score is computed.
    pub min_overlap: usize,
    /// Per-step raw DTW cost that maps to a similarity of zero.
    pub max_rank_gap_per_step: f64,
}

impl Default for SimilarityParams {
    fn default() -> Self {
        Self {
            source: RankSource::Power,
            min_overlap: 3,
            max_rank_gap_per_step: 29.0,
        }
    }
}

/// Similarity scores of two teams over their shared dates.
///
/// Every score is `None` below the minimum overlap, and the correlations are
/// `None` whenever they are undefined.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarityReport {
    pub team_a: String,
    pub team_b: String,
    pub team_code_a: String,
    pub team_code_b: String,
    pub source: RankSource,
    pub overlap: usize,
    /// Correlation of one-step rank changes.
    pub corr_delta: Option<f64>,
    /// Correlation of standardized rank levels.
    pub corr_levels: Option<f64>,
    pub dtw_z: Option<f64>,
    /// `100 / (1 + per-step cost)` of the standardized-level DTW.
    pub dtw_similarity_z: Option<f64>,
    pub avg_abs_rank_gap: Option<f64>,
    pub dtw_raw: Option<f64>,
    /// Raw-level DTW per-step cost mapped linearly onto `[0, 100]`.
    pub dtw_similarity_raw_0_100: Option<f64>,
}

/// Compares the rank trajectories of two teams on their common dates.
///
/// Never fails for lack of data: below `min_overlap` shared dates only the
/// identities and the overlap count are reported.
pub fn compute_trajectory_similarity<A, B>(
    tables: RankTables<'_>,
    directory: &TeamDirectory,
    team_code_a: A,
    team_code_b: B,
    params: &SimilarityParams,
) -> Result<SimilarityReport, AnalysisError>
where
    A: AsRef<str>,
    B: AsRef<str>,
{
    let team_a = directory.resolve_code(team_code_a.as_ref())?;
    let team_b = directory.resolve_code(team_code_b.as_ref())?;
    let series_a = rank_series(tables, directory, team_a.id, params.source)?;
    let series_b = rank_series(tables, directory, team_b.id, params.source)?;
    let joined = inner_join(&series_a, &series_b);
    let overlap = joined.len();

    let mut report = SimilarityReport {
        team_a: team_a.name.to_owned(),
        team_b: team_b.name.to_owned(),
        team_code_a: team_a.code.to_owned(),
        team_code_b: team_b.code.to_owned(),
        source: params.source,
        overlap,
        corr_delta: None,
        corr_levels: None,
        dtw_z: None,
        dtw_similarity_z: None,
        avg_abs_rank_gap: None,
        dtw_raw: None,
        dtw_similarity_raw_0_100: None,
    };
    if overlap < params.min_overlap || overlap == 0 {
        debug!(
            team_a = team_a.code,
            team_b = team_b.code,
            overlap,
            min_overlap = params.min_overlap,
            "overlap too small for similarity"
        );
        return Ok(report);
    }

    let a = joined.iter().map(|&(_, a, _)| a).collect::<Vec<_>>();
    let b = joined.iter().map(|&(_, _, b)| b).collect::<Vec<_>>();
    let (a_z, b_z) = (z_scores(&a), z_scores(&b));

    report.corr_delta = pearson(&diff(&a), &diff(&b));
    report.corr_levels = pearson(&a_z, &b_z);

    if let Some(alignment) = dtw(&a_z, &b_z) {
        let per_step = alignment.cost_per_step(a_z.len(), b_z.len());
        report.dtw_z = Some(alignment.cost);
        report.dtw_similarity_z = Some(100.0 / (1.0 + per_step));
    }
    if let Some(alignment) = dtw(&a, &b) {
        let per_step = alignment.cost_per_step(a.len(), b.len());
        report.dtw_raw = Some(alignment.cost);
        report.dtw_similarity_raw_0_100 =
            Some(100.0 * (1.0 - per_step / params.max_rank_gap_per_step).max(0.0));
    }
    let gaps = a.iter().zip(&b).map(|(x, y)| (x - y).abs()).collect::<Vec<_>>();
    report.avg_abs_rank_gap = mean(&gaps);

    debug!(
        team_a = team_a.code,
        team_b = team_b.code,
        overlap,
        corr_levels = ?report.corr_levels,
        dtw_similarity_z = ?report.dtw_similarity_z,
        "trajectory similarity"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{directory, power_rows};

    fn report_for(a: &[u32], b: &[u32]) -> SimilarityReport {
        let mut power = power_rows("Alphas", a);
        power.extend(power_rows("Betas", b));
        let tables = RankTables {
            power: &power,
            standings: &[],
        };
        compute_trajectory_similarity(tables, &directory(), "AAA", "BBB", &SimilarityParams::default())
            .unwrap()
    }

    #[test]
    fn test_identical_trajectories() {
        let report = report_for(&[1, 2, 3, 4], &[1, 2, 3, 4]);
        assert_eq!(report.overlap, 4);
        assert_eq!(report.avg_abs_rank_gap, Some(0.0));
        assert!((report.corr_levels.unwrap() - 1.0).abs() < 1e-12);
        assert_eq!(report.dtw_raw, Some(0.0));
        assert_eq!(report.dtw_similarity_raw_0_100, Some(100.0));
        assert_eq!(report.dtw_similarity_z, Some(100.0));
        assert_eq!(report.team_a, "Alphas");
        assert_eq!(report.team_code_b, "BBB");
    }

    #[test]
    fn test_below_min_overlap_is_null() {
        let report = report_for(&[1, 2], &[3, 4, 5]);
        assert_eq!(report.overlap, 2);
        assert_eq!(report.corr_delta, None);
        assert_eq!(report.dtw_z, None);
        assert_eq!(report.avg_abs_rank_gap, None);
    }

    #[test]
    fn test_opposite_trajectories() {
        let report = report_for(&[1, 10, 20, 30], &[30, 21, 11, 1]);
        assert!(report.corr_levels.unwrap() < -0.99);
        assert!(report.corr_delta.unwrap() < -0.99);
        assert!((report.avg_abs_rank_gap.unwrap() - 19.5).abs() < 1e-12);
        let raw = report.dtw_similarity_raw_0_100.unwrap();
        assert!((0.0..100.0).contains(&raw));
        assert!(report.dtw_similarity_z.unwrap() < 100.0);
    }

    #[test]
    fn test_constant_series_has_undefined_correlation() {
        let report = report_for(&[5, 5, 5, 5], &[1, 2, 3, 4]);
        assert_eq!(report.corr_levels, None);
        assert_eq!(report.corr_delta, None);
        assert!(report.dtw_similarity_z.is_some());
    }

    #[test]
    fn test_team_compared_with_itself() {
        let power = power_rows("Gammas", &[8, 3, 12, 5, 9]);
        let tables = RankTables {
            power: &power,
            standings: &[],
        };
        let report = compute_trajectory_similarity(
            tables,
            &directory(),
            "CCC",
            "CCC",
            &SimilarityParams::default(),
        )
        .unwrap();
        assert_eq!(report.dtw_z, Some(0.0));
        assert_eq!(report.dtw_similarity_z, Some(100.0));
    }

    #[test]
    fn test_unknown_code() {
        let tables = RankTables {
            power: &[],
            standings: &[],
        };
        assert!(
            compute_trajectory_similarity(
                tables,
                &directory(),
                "AAA",
                "XYZ",
                &SimilarityParams::default()
            )
            .is_err()
        );
    }
}
