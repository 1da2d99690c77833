//! Novelty Models - Local Outlier Factor
//!
//! `NoveltyModel` is the scoring seam. Scores follow the native novelty
//! convention (higher = more normal); the batch scorer flips the sign.
//!
//! LOF in novelty mode: the reference set is fixed, each query is compared
//! against its k nearest reference points. Per-reference k-distance and
//! local reachability density are derived from the reference set once.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::{BundleError, PipelineError, Result};

/// Guards the reachability mean against division by zero
const LRD_EPS: f64 = 1e-10;

// ============================================================================
// MODEL TRAITS
// ============================================================================

/// Read-only novelty scorer, shared across requests
pub trait NoveltyModel: Send + Sync {
    /// Native score per row of `x`; higher means more normal
    fn score_samples(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>>;

    /// Expected feature width
    fn n_features(&self) -> usize;
}

/// Scorer that needs exclusive access while it runs (native sessions,
/// scratch buffers, ...)
pub trait ExclusiveNoveltyModel: Send {
    fn score_samples_mut(&mut self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>>;

    fn n_features_in(&self) -> usize;
}

impl<M: NoveltyModel> ExclusiveNoveltyModel for M {
    fn score_samples_mut(&mut self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
        self.score_samples(x)
    }

    fn n_features_in(&self) -> usize {
        self.n_features()
    }
}

/// Serializes every scoring call behind one mutex
pub struct SerializedModel<M> {
    inner: Mutex<M>,
    n_features: usize,
}

impl<M: ExclusiveNoveltyModel> SerializedModel<M> {
    pub fn new(model: M) -> Self {
        let n_features = model.n_features_in();
        Self {
            inner: Mutex::new(model),
            n_features,
        }
    }

    pub fn into_inner(self) -> M {
        self.inner.into_inner()
    }
}

impl<M: ExclusiveNoveltyModel> NoveltyModel for SerializedModel<M> {
    fn score_samples(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
        self.inner.lock().score_samples_mut(x)
    }

    fn n_features(&self) -> usize {
        self.n_features
    }
}

// ============================================================================
// LOCAL OUTLIER FACTOR
// ============================================================================

/// Serialized form of `LocalOutlierFactor`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LofParams {
    pub n_neighbors: usize,
    /// Reference points, one row per sample
    pub reference: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "LofParams")]
pub struct LocalOutlierFactor {
    n_neighbors: usize,
    reference: Array2<f64>,
    /// Distance from each reference point to its k-th neighbour
    k_distance: Array1<f64>,
    /// Local reachability density of each reference point
    lrd: Array1<f64>,
}

impl LocalOutlierFactor {
    /// Derive neighbourhood statistics for a reference set.
    ///
    /// Needs at least `n_neighbors + 1` reference rows since a point is
    /// never its own neighbour.
    pub fn new(reference: Array2<f64>, n_neighbors: usize) -> std::result::Result<Self, BundleError> {
        let n = reference.nrows();
        if n_neighbors == 0 {
            return Err(BundleError::Format("n_neighbors must be at least 1".to_string()));
        }
        if n <= n_neighbors {
            return Err(BundleError::Format(format!(
                "reference set has {} rows, need more than n_neighbors = {}",
                n, n_neighbors
            )));
        }
        if reference.ncols() == 0 {
            return Err(BundleError::Format("reference set has no features".to_string()));
        }
        if reference.iter().any(|v| !v.is_finite()) {
            return Err(BundleError::Format("reference set contains non-finite values".to_string()));
        }

        let neighbours: Vec<Vec<(f64, usize)>> = reference
            .axis_iter(Axis(0))
            .enumerate()
            .map(|(i, row)| nearest(row, reference.view(), n_neighbors, Some(i)))
            .collect();

        let k_distance: Array1<f64> = neighbours.iter().map(|nn| nn[n_neighbors - 1].0).collect();

        let lrd: Array1<f64> = neighbours
            .iter()
            .map(|nn| local_reachability_density(nn, &k_distance))
            .collect();

        log::debug!(
            "LOF reference set: {} samples × {} features, k = {}",
            n,
            reference.ncols(),
            n_neighbors
        );

        Ok(Self {
            n_neighbors,
            reference,
            k_distance,
            lrd,
        })
    }

    pub fn n_neighbors(&self) -> usize {
        self.n_neighbors
    }

    pub fn reference_size(&self) -> usize {
        self.reference.nrows()
    }
}

impl TryFrom<LofParams> for LocalOutlierFactor {
    type Error = BundleError;

    fn try_from(params: LofParams) -> std::result::Result<Self, Self::Error> {
        let rows = params.reference.len();
        let cols = params.reference.first().map(Vec::len).unwrap_or(0);
        if params.reference.iter().any(|r| r.len() != cols) {
            return Err(BundleError::Format("reference rows differ in length".to_string()));
        }
        let flat: Vec<f64> = params.reference.into_iter().flatten().collect();
        let reference = Array2::from_shape_vec((rows, cols), flat)
            .map_err(|e| BundleError::Format(format!("reference shape: {}", e)))?;
        Self::new(reference, params.n_neighbors)
    }
}

impl NoveltyModel for LocalOutlierFactor {
    fn score_samples(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
        if x.ncols() != self.reference.ncols() {
            return Err(PipelineError::Scoring(format!(
                "expected {} features, got {}",
                self.reference.ncols(),
                x.ncols()
            )));
        }

        // Full batch × reference distance block; this is what batching bounds
        let distances = pairwise_distances(x, self.reference.view());

        let scores = distances
            .axis_iter(Axis(0))
            .map(|row| {
                let nn = k_smallest(row, self.n_neighbors, None);
                let lrd_q = local_reachability_density(&nn, &self.k_distance);
                let ratio_sum: f64 = nn.iter().map(|&(_, j)| self.lrd[j] / lrd_q).sum();
                -(ratio_sum / nn.len() as f64)
            })
            .collect();

        Ok(scores)
    }

    fn n_features(&self) -> usize {
        self.reference.ncols()
    }
}

// ============================================================================
// HELPERS
// ============================================================================

fn euclidean(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// Row-by-row distances; computed pairwise so a row's distances never
/// depend on which other rows share its batch.
fn pairwise_distances(x: ArrayView2<'_, f64>, reference: ArrayView2<'_, f64>) -> Array2<f64> {
    let mut out = Array2::<f64>::zeros((x.nrows(), reference.nrows()));
    for (i, q) in x.axis_iter(Axis(0)).enumerate() {
        for (j, r) in reference.axis_iter(Axis(0)).enumerate() {
            out[[i, j]] = euclidean(q, r);
        }
    }
    out
}

fn nearest(
    point: ArrayView1<'_, f64>,
    reference: ArrayView2<'_, f64>,
    k: usize,
    exclude: Option<usize>,
) -> Vec<(f64, usize)> {
    let distances: Array1<f64> = reference.axis_iter(Axis(0)).map(|r| euclidean(point, r)).collect();
    k_smallest(distances.view(), k, exclude)
}

/// The `k` smallest `(distance, index)` pairs, ties broken by lower index
fn k_smallest(distances: ArrayView1<'_, f64>, k: usize, exclude: Option<usize>) -> Vec<(f64, usize)> {
    let mut candidates: Vec<(f64, usize)> = distances
        .iter()
        .copied()
        .enumerate()
        .filter(|&(j, _)| Some(j) != exclude)
        .map(|(j, d)| (d, j))
        .collect();

    let cmp = |a: &(f64, usize), b: &(f64, usize)| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1));
    let k = k.min(candidates.len());
    if k < candidates.len() {
        candidates.select_nth_unstable_by(k, cmp);
        candidates.truncate(k);
    }
    candidates.sort_by(cmp);
    candidates
}

fn local_reachability_density(neighbours: &[(f64, usize)], k_distance: &Array1<f64>) -> f64 {
    let reach_sum: f64 = neighbours
        .iter()
        .map(|&(d, j)| d.max(k_distance[j]))
        .sum();
    1.0 / (reach_sum / neighbours.len() as f64 + LRD_EPS)
}
