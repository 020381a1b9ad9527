//! Pairwise distances and agglomerative hierarchical clustering.
//!
//! Merges are produced in the layout of a classical linkage matrix: original
//! observations are clusters `0..n`, and the cluster created by merge `m` has
//! id `n + m`.

use serde::{Deserialize, Serialize};

/// Distance between two feature vectors.
#[derive(
    Default, Debug, Clone, Copy, PartialEq, Eq, derive_more::FromStr, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    #[default]
    Euclidean,
    SqEuclidean,
    CityBlock,
    Chebyshev,
    Cosine,
}

impl Metric {
    /// Distance between two equal-length vectors.
    ///
    /// For [`Metric::Cosine`], a zero vector is at distance 0 from another zero
    /// vector and at distance 1 from anything else.
    ///
    /// # Examples
    ///
    /// ```
    /// # use powerrank_stats::cluster::Metric;
    /// let a = [0.0, 0.0];
    /// let b = [3.0, 4.0];
    /// assert_eq!(Metric::Euclidean.distance(&a, &b), 5.0);
    /// assert_eq!(Metric::SqEuclidean.distance(&a, &b), 25.0);
    /// assert_eq!(Metric::CityBlock.distance(&a, &b), 7.0);
    /// assert_eq!(Metric::Chebyshev.distance(&a, &b), 4.0);
    /// ```
    #[must_use]
    pub fn distance(self, a: &[f64], b: &[f64]) -> f64 {
        let pairs = a.iter().zip(b);
        match self {
            Self::Euclidean => pairs.map(|(x, y)| (x - y).powi(2)).sum::<f64>().sqrt(),
            Self::SqEuclidean => pairs.map(|(x, y)| (x - y).powi(2)).sum(),
            Self::CityBlock => pairs.map(|(x, y)| (x - y).abs()).sum(),
            Self::Chebyshev => pairs.map(|(x, y)| (x - y).abs()).fold(0.0, f64::max),
            Self::Cosine => {
                let dot = pairs.map(|(x, y)| x * y).sum::<f64>();
                let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
                let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();
                match (norm_a == 0.0, norm_b == 0.0) {
                    (true, true) => 0.0,
                    (true, false) | (false, true) => 1.0,
                    (false, false) => (1.0 - dot / (norm_a * norm_b)).max(0.0),
                }
            }
        }
    }
}

/// Rule for the distance between a newly merged cluster and the others.
#[derive(
    Default, Debug, Clone, Copy, PartialEq, Eq, derive_more::FromStr, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Linkage {
    Single,
    Complete,
    Average,
    Weighted,
    Centroid,
    Median,
    #[default]
    Ward,
}

impl Linkage {
    /// Lance-Williams update: distance from the merge of `s` and `t` to `v`.
    fn update(self, d_sv: f64, d_tv: f64, d_st: f64, n_s: f64, n_t: f64, n_v: f64) -> f64 {
        match self {
            Self::Single => d_sv.min(d_tv),
            Self::Complete => d_sv.max(d_tv),
            Self::Average => (n_s * d_sv + n_t * d_tv) / (n_s + n_t),
            Self::Weighted => 0.5 * (d_sv + d_tv),
            Self::Centroid => {
                let n = n_s + n_t;
                let sq = (n_s * d_sv * d_sv + n_t * d_tv * d_tv) / n
                    - n_s * n_t * d_st * d_st / (n * n);
                sq.max(0.0).sqrt()
            }
            Self::Median => {
                let sq = 0.5 * d_sv * d_sv + 0.5 * d_tv * d_tv - 0.25 * d_st * d_st;
                sq.max(0.0).sqrt()
            }
            Self::Ward => {
                let sq = ((n_v + n_s) * d_sv * d_sv + (n_v + n_t) * d_tv * d_tv
                    - n_v * d_st * d_st)
                    / (n_v + n_s + n_t);
                sq.max(0.0).sqrt()
            }
        }
    }
}

/// One agglomeration step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Merge {
    /// Smaller id of the two merged clusters.
    pub left: usize,
    /// Larger id of the two merged clusters.
    pub right: usize,
    /// Linkage distance at which the merge happened.
    pub distance: f64,
    /// Number of observations in the merged cluster.
    pub size: usize,
}

/// Full symmetric distance matrix of `points` under `metric`.
#[must_use]
pub fn pairwise_distances(points: &[Vec<f64>], metric: Metric) -> Vec<Vec<f64>> {
    let n = points.len();
    let mut distances = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in i + 1..n {
            let d = metric.distance(&points[i], &points[j]);
            distances[i][j] = d;
            distances[j][i] = d;
        }
    }
    distances
}

/// Agglomerative clustering of `points`.
///
/// At each step the closest pair of active clusters is merged; among equal
/// distances the pair found first in row-major order wins. Returns `n - 1`
/// merges for `n` points.
///
/// # Examples
///
/// ```
/// # use powerrank_stats::cluster::{hierarchical, Linkage, Metric};
/// let points = vec![vec![0.0], vec![0.1], vec![5.0]];
/// let merges = hierarchical(&points, Linkage::Single, Metric::Euclidean);
/// assert_eq!(merges.len(), 2);
/// assert_eq!((merges[0].left, merges[0].right), (0, 1));
/// assert_eq!((merges[1].left, merges[1].right), (2, 3));
/// ```
#[expect(clippy::cast_precision_loss)]
#[must_use]
pub fn hierarchical(points: &[Vec<f64>], linkage: Linkage, metric: Metric) -> Vec<Merge> {
    let n = points.len();
    let mut distances = pairwise_distances(points, metric);
    // slot i holds (cluster id, size) of the active cluster stored there
    let mut slots: Vec<Option<(usize, usize)>> = (0..n).map(|i| Some((i, 1))).collect();
    let mut merges = Vec::with_capacity(n.saturating_sub(1));

    for step in 0..n.saturating_sub(1) {
        let mut best: Option<(usize, usize, f64)> = None;
        for i in 0..n {
            if slots[i].is_none() {
                continue;
            }
            for j in i + 1..n {
                if slots[j].is_none() {
                    continue;
                }
                let d = distances[i][j];
                if best.is_none_or(|(_, _, bd)| d < bd) {
                    best = Some((i, j, d));
                }
            }
        }
        let Some((s, t, d_st)) = best else {
            break;
        };
        let (Some((id_s, n_s)), Some((id_t, n_t))) = (slots[s], slots[t]) else {
            break;
        };

        for v in 0..n {
            if v == s || v == t {
                continue;
            }
            let Some((_, n_v)) = slots[v] else {
                continue;
            };
            let d = linkage.update(
                distances[s][v],
                distances[t][v],
                d_st,
                n_s as f64,
                n_t as f64,
                n_v as f64,
            );
            distances[s][v] = d;
            distances[v][s] = d;
        }

        merges.push(Merge {
            left: id_s.min(id_t),
            right: id_s.max(id_t),
            distance: d_st,
            size: n_s + n_t,
        });
        slots[s] = Some((n + step, n_s + n_t));
        slots[t] = None;
    }

    merges
}

/// Cuts a dendrogram into exactly `k` flat clusters.
///
/// Applies the first `n - k` merges. Labels run from 1 and are numbered in the
/// order their first member appears among the observations. `k = 0` is treated
/// as 1, and `k >= n` leaves every observation in its own cluster.
///
/// # Examples
///
/// ```
/// # use powerrank_stats::cluster::{cut_into_clusters, hierarchical, Linkage, Metric};
/// let points = vec![vec![0.0], vec![9.0], vec![0.2], vec![9.1]];
/// let merges = hierarchical(&points, Linkage::Average, Metric::Euclidean);
/// assert_eq!(cut_into_clusters(points.len(), &merges, 2), vec![1, 2, 1, 2]);
/// ```
#[must_use]
pub fn cut_into_clusters(n: usize, merges: &[Merge], k: usize) -> Vec<usize> {
    let applied = n.saturating_sub(k.max(1)).min(merges.len());
    let mut parent: Vec<usize> = (0..n + applied).collect();
    for (m, merge) in merges.iter().take(applied).enumerate() {
        parent[merge.left] = n + m;
        parent[merge.right] = n + m;
    }

    let root = |mut id: usize| {
        while parent[id] != id {
            id = parent[id];
        }
        id
    };

    let mut roots_seen: Vec<usize> = vec![];
    (0..n)
        .map(|i| {
            let r = root(i);
            match roots_seen.iter().position(|&seen| seen == r) {
                Some(pos) => pos + 1,
                None => {
                    roots_seen.push(r);
                    roots_seen.len()
                }
            }
        })
        .collect()
}
