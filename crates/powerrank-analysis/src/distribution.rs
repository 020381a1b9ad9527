//! Rank-change distributions: Gaussian KDE and density histogram per team.

use std::collections::BTreeMap;

use powerrank_stats::{
    histogram::{Histogram, linspace, scale_to_peak},
    kde::GaussianKde,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::{AnalysisError, ConfigError},
    series::{RankSource, rank_deltas, rank_series},
    table::RankTables,
    team::TeamDirectory,
};

/// Parameters of [`build_delta_kde_and_hist`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KdeParams {
    /// Points at which the density is evaluated.
    pub grid: Vec<f64>,
    /// Histogram bin edges, strictly increasing.
    pub bin_edges: Vec<f64>,
    /// Which rank series the deltas are taken from.
    pub source: RankSource,
    /// Fixed bandwidth; `None` selects Silverman's rule.
    pub bandwidth: Option<f64>,
}

impl Default for KdeParams {
    fn default() -> Self {
        Self {
            grid: linspace(-15.0, 15.0, 300),
            bin_edges: linspace(-15.0, 15.0, 31),
            source: RankSource::Power,
            bandwidth: None,
        }
    }
}

impl KdeParams {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.grid.is_empty() {
            return Err(ConfigError::EmptyGrid);
        }
        if self.bin_edges.len() < 2 || !self.bin_edges.windows(2).all(|w| w[0] < w[1]) {
            return Err(ConfigError::InvalidBinEdges);
        }
        match self.bandwidth {
            Some(bandwidth) if !(bandwidth.is_finite() && bandwidth > 0.0) => {
                Err(ConfigError::InvalidBandwidth { bandwidth })
            }
            _ => Ok(()),
        }
    }
}

/// Peak-scaled density at one grid point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KdeRow {
    pub x: f64,
    pub team_code: String,
    pub team_id: String,
    pub label: String,
    pub density: f64,
    pub bandwidth: f64,
}

/// Peak-scaled histogram density of one bin, located at the bin centre.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramRow {
    pub x: f64,
    pub team_code: String,
    pub team_id: String,
    pub label: String,
    pub pdf: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeltaDistribution {
    pub kde: Vec<KdeRow>,
    pub histogram: Vec<HistogramRow>,
    /// Grid point of maximum density per team code; `None` without deltas.
    pub peaks: BTreeMap<String, Option<f64>>,
    /// Bandwidth used per team code; `None` without deltas.
    pub bandwidths: BTreeMap<String, Option<f64>>,
}

/// Builds KDE and histogram rows of one-step rank changes for the selected
/// teams.
///
/// Both curves are computed as true densities first and then rescaled so
/// their peak equals one. Teams without any delta contribute no rows and null
/// entries in the peak and bandwidth maps. Rows are sorted by team code, then
/// by `x`.
pub fn build_delta_kde_and_hist<S>(
    tables: RankTables<'_>,
    directory: &TeamDirectory,
    selected_codes: &[S],
    params: &KdeParams,
) -> Result<DeltaDistribution, AnalysisError>
where
    S: AsRef<str>,
{
    params.validate()?;

    let mut out = DeltaDistribution::default();
    for code in selected_codes {
        let team = directory.resolve_code(code.as_ref())?;
        let series = rank_series(tables, directory, team.id, params.source)?;
        let deltas = rank_deltas(&series);
        if deltas.is_empty() {
            debug!(team = team.code, "no rank changes; skipping density");
            out.peaks.insert(team.code.to_owned(), None);
            out.bandwidths.insert(team.code.to_owned(), None);
            continue;
        }

        let kde = GaussianKde::new(&deltas, params.bandwidth);
        let bandwidth = kde.bandwidth();
        let density = scale_to_peak(&kde.evaluate(&params.grid));
        let peak_x = first_argmax(&density).map(|i| params.grid[i]);
        debug!(team = team.code, n = deltas.len(), bandwidth, ?peak_x, "rank-change density");

        out.peaks.insert(team.code.to_owned(), peak_x);
        out.bandwidths.insert(team.code.to_owned(), Some(bandwidth));
        out.kde.extend(params.grid.iter().zip(&density).map(|(&x, &density)| KdeRow {
            x,
            team_code: team.code.to_owned(),
            team_id: team.id.to_owned(),
            label: team.name.to_owned(),
            density,
            bandwidth,
        }));

        // edges were validated above
        if let Some(histogram) = Histogram::with_edges(deltas.iter().copied(), &params.bin_edges) {
            let densities = histogram.bins.iter().map(|b| b.density).collect::<Vec<_>>();
            let scaled = scale_to_peak(&densities);
            out.histogram
                .extend(histogram.bins.iter().zip(scaled).map(|(bin, pdf)| HistogramRow {
                    x: bin.center(),
                    team_code: team.code.to_owned(),
                    team_id: team.id.to_owned(),
                    label: team.name.to_owned(),
                    pdf,
                }));
        }
    }

    out.kde
        .sort_by(|a, b| a.team_code.cmp(&b.team_code).then(a.x.total_cmp(&b.x)));
    out.histogram
        .sort_by(|a, b| a.team_code.cmp(&b.team_code).then(a.x.total_cmp(&b.x)));
    Ok(out)
}

fn first_argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        if best.is_none_or(|(_, b)| v > b) {
            best = Some((i, v));
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{directory, power_rows};

    fn tables_with(power: &[crate::table::PowerRankRow]) -> RankTables<'_> {
        RankTables {
            power,
            standings: &[],
        }
    }

    #[test]
    fn test_default_params() {
        let params = KdeParams::default();
        assert_eq!(params.grid.len(), 300);
        assert_eq!(params.bin_edges.len(), 31);
        assert_eq!(params.grid[0], -15.0);
        assert_eq!(params.bin_edges[30], 15.0);
    }

    #[test]
    fn test_single_delta_peaks_at_sample() {
        let power = power_rows("Alphas", &[5, 7]);
        let params = KdeParams {
            grid: linspace(-5.0, 5.0, 101),
            ..KdeParams::default()
        };
        let out =
            build_delta_kde_and_hist(tables_with(&power), &directory(), &["AAA"], &params).unwrap();
        assert_eq!(out.kde.len(), 101);
        assert!(out.kde.iter().all(|r| r.density >= 0.0));
        let peak = out.peaks["AAA"].unwrap();
        assert!((peak - 2.0).abs() < 1e-9);
        assert_eq!(out.bandwidths["AAA"], Some(0.3));

        // monotone decay on both sides of the peak
        let peak_idx = out.kde.iter().position(|r| r.density == 1.0).unwrap();
        assert!(out.kde[..=peak_idx].windows(2).all(|w| w[0].density <= w[1].density));
        assert!(out.kde[peak_idx..].windows(2).all(|w| w[0].density >= w[1].density));
    }

    #[test]
    fn test_histogram_scaled_to_peak() {
        let power = power_rows("Alphas", &[5, 6, 7, 9, 9]);
        let out = build_delta_kde_and_hist(
            tables_with(&power),
            &directory(),
            &["AAA"],
            &KdeParams::default(),
        )
        .unwrap();
        assert_eq!(out.histogram.len(), 30);
        let max = out.histogram.iter().map(|r| r.pdf).fold(0.0, f64::max);
        assert!((max - 1.0).abs() < 1e-12);
        // deltas are [1, 1, 2, 0]; bin [1, 2) holds two of them
        let top = out.histogram.iter().find(|r| r.pdf == 1.0).unwrap();
        assert!((top.x - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_team_without_deltas_has_null_peak() {
        let power = power_rows("Alphas", &[5, 6, 7]);
        let mut all = power.clone();
        all.extend(power_rows("Betas", &[3]));
        let out = build_delta_kde_and_hist(
            tables_with(&all),
            &directory(),
            &["BBB", "AAA"],
            &KdeParams::default(),
        )
        .unwrap();
        assert_eq!(out.peaks["BBB"], None);
        assert_eq!(out.bandwidths["BBB"], None);
        assert!(out.kde.iter().all(|r| r.team_code == "AAA"));
        assert!(out.kde.windows(2).all(|w| w[0].x <= w[1].x));
    }

    #[test]
    fn test_fixed_bandwidth_is_floored() {
        let power = power_rows("Alphas", &[5, 6, 8]);
        let params = KdeParams {
            bandwidth: Some(0.1),
            ..KdeParams::default()
        };
        let out =
            build_delta_kde_and_hist(tables_with(&power), &directory(), &["AAA"], &params).unwrap();
        assert_eq!(out.bandwidths["AAA"], Some(0.3));
        assert!(out.kde.iter().all(|r| r.bandwidth == 0.3));
    }

    #[test]
    fn test_invalid_params_rejected() {
        let tables = tables_with(&[]);
        let directory = directory();
        let bad_edges = KdeParams {
            bin_edges: vec![0.0, 0.0],
            ..KdeParams::default()
        };
        assert!(matches!(
            build_delta_kde_and_hist(tables, &directory, &["AAA"], &bad_edges),
            Err(AnalysisError::Config {
                error: ConfigError::InvalidBinEdges
            })
        ));
        let empty_grid = KdeParams {
            grid: vec![],
            ..KdeParams::default()
        };
        assert!(build_delta_kde_and_hist(tables, &directory, &["AAA"], &empty_grid).is_err());
        let bad_bandwidth = KdeParams {
            bandwidth: Some(-1.0),
            ..KdeParams::default()
        };
        assert!(build_delta_kde_and_hist(tables, &directory, &["AAA"], &bad_bandwidth).is_err());
        assert!(matches!(
            build_delta_kde_and_hist(tables, &directory, &["ZZZ"], &KdeParams::default()),
            Err(AnalysisError::UnknownTeamCode { .. })
        ));
    }
}
