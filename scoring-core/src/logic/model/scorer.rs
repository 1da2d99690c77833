//! Batch Scorer - Memory-bounded scoring over a feature matrix
//!
//! The matrix is cut into row batches of at most `batch_size` rows; each
//! batch is scored independently and the outputs are concatenated in order.
//! Scoring is row-independent, so the batch size never changes a score.
//!
//! Returned scores are the negated native novelty scores: larger always
//! means more anomalous.

use std::time::Instant;

use ndarray::{ArrayView2, Axis};

use super::lof::NoveltyModel;
use crate::constants::DEFAULT_BATCH_SIZE;
use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchScorer {
    batch_size: usize,
}

impl BatchScorer {
    pub fn new(batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(PipelineError::invalid_parameter("batch_size", "must be at least 1"));
        }
        Ok(Self { batch_size })
    }

    /// One anomaly score per row of `features`, in row order.
    ///
    /// Fails as a whole if any batch fails or yields a non-finite score.
    pub fn score(&self, model: &dyn NoveltyModel, features: ArrayView2<'_, f64>) -> Result<Vec<f64>> {
        if features.ncols() != model.n_features() {
            return Err(PipelineError::Scoring(format!(
                "feature matrix has {} columns, model expects {}",
                features.ncols(),
                model.n_features()
            )));
        }

        let start = Instant::now();
        let mut scores = Vec::with_capacity(features.nrows());

        for (batch_no, batch) in features.axis_chunks_iter(Axis(0), self.batch_size).enumerate() {
            let offset = batch_no * self.batch_size;
            let native = model.score_samples(batch)?;

            if native.len() != batch.nrows() {
                return Err(PipelineError::Scoring(format!(
                    "batch {} returned {} scores for {} rows",
                    batch_no,
                    native.len(),
                    batch.nrows()
                )));
            }

            for (i, &s) in native.iter().enumerate() {
                if !s.is_finite() {
                    return Err(PipelineError::Scoring(format!(
                        "non-finite score at row {}",
                        offset + i
                    )));
                }
                scores.push(-s);
            }

            log::debug!("Scored batch {} ({} rows)", batch_no, batch.nrows());
        }

        log::debug!(
            "Scored {} rows in {} batches ({} ms)",
            scores.len(),
            features.nrows().div_ceil(self.batch_size),
            start.elapsed().as_millis()
        );

        Ok(scores)
    }
}

impl Default for BatchScorer {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::model::lof::LocalOutlierFactor;
    use ndarray::{array, Array1, Array2};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Native score = first feature; counts calls, optionally failing one
    struct Echo {
        calls: AtomicUsize,
        fail_on_call: Option<usize>,
    }

    impl Echo {
        fn new() -> Self {
            Self { calls: AtomicUsize::new(0), fail_on_call: None }
        }
    }

    impl NoveltyModel for Echo {
        fn score_samples(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if Some(call) == self.fail_on_call {
                return Err(PipelineError::Scoring("boom".to_string()));
            }
            Ok(x.column(0).to_owned())
        }

        fn n_features(&self) -> usize {
            1
        }
    }

    fn column(values: &[f64]) -> Array2<f64> {
        Array2::from_shape_vec((values.len(), 1), values.to_vec()).unwrap()
    }

    #[test]
    fn test_negates_native_scores() {
        let scorer = BatchScorer::new(10).unwrap();
        let scores = scorer.score(&Echo::new(), column(&[1.0, -2.0]).view()).unwrap();
        assert_eq!(scores, vec![-1.0, 2.0]);
    }

    #[test]
    fn test_batch_count() {
        let model = Echo::new();
        let scorer = BatchScorer::new(3).unwrap();
        let scores = scorer
            .score(&model, column(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]).view())
            .unwrap();

        assert_eq!(scores.len(), 7);
        assert_eq!(model.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_batching_invariance_with_lof() {
        let reference = Array2::from_shape_fn((30, 2), |(i, j)| ((i * 7 + j * 3) % 11) as f64 / 3.0);
        let lof = LocalOutlierFactor::new(reference, 5).unwrap();
        let x = Array2::from_shape_fn((23, 2), |(i, j)| ((i * 5 + j * 13) % 17) as f64 / 2.0);

        let full = BatchScorer::new(x.nrows()).unwrap().score(&lof, x.view()).unwrap();
        for batch_size in [1, 2, 4, 7, 22, 23, 100] {
            let batched = BatchScorer::new(batch_size).unwrap().score(&lof, x.view()).unwrap();
            assert_eq!(batched, full, "batch_size = {}", batch_size);
        }
    }

    #[test]
    fn test_failure_in_any_batch_aborts() {
        let model = Echo { calls: AtomicUsize::new(0), fail_on_call: Some(1) };
        let scorer = BatchScorer::new(2).unwrap();
        let err = scorer.score(&model, column(&[1.0, 2.0, 3.0, 4.0]).view()).unwrap_err();
        assert_eq!(err, PipelineError::Scoring("boom".to_string()));
    }

    #[test]
    fn test_non_finite_score_rejected() {
        let scorer = BatchScorer::new(2).unwrap();
        let err = scorer
            .score(&Echo::new(), column(&[1.0, 2.0, f64::NAN]).view())
            .unwrap_err();
        assert_eq!(err, PipelineError::Scoring("non-finite score at row 2".to_string()));
    }

    #[test]
    fn test_width_mismatch() {
        let scorer = BatchScorer::default();
        let err = scorer.score(&Echo::new(), array![[1.0, 2.0]].view()).unwrap_err();
        assert!(matches!(err, PipelineError::Scoring(_)));
    }

    #[test]
    fn test_empty_matrix() {
        let scorer = BatchScorer::default();
        let scores = scorer.score(&Echo::new(), Array2::<f64>::zeros((0, 1)).view()).unwrap();
        assert!(scores.is_empty());
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        assert!(matches!(
            BatchScorer::new(0),
            Err(PipelineError::InvalidParameter { .. })
        ));
    }
}
