//! Ranker - Stable descending order by anomaly score
//!
//! Equal scores keep their input order, so the ranking is a total order
//! and repeated requests page through identical sequences.

use std::cmp::Ordering;

use serde::Serialize;

use crate::logic::model::Threshold;

/// A scored row placed in the global ranking
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedRecord<T> {
    /// 0-based position in the ranking
    pub rank: usize,
    /// 0-based position in the input
    pub row: usize,
    pub score: f64,
    pub is_anomaly: bool,
    #[serde(flatten)]
    pub record: T,
}

/// Input indices ordered by score descending, ties by ascending index
pub fn rank_indices(scores: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    // `sort_by` is stable: equal scores keep ascending index order.
    // Scores are finite here, and `-0.0 == 0.0` must count as a tie.
    order.sort_by(|&a, &b| scores[b].partial_cmp(&scores[a]).unwrap_or(Ordering::Equal));
    order
}

/// Rank every record and flag those at or above the threshold.
///
/// `records` and `scores` are parallel; no truncation happens here.
pub fn rank_records<T: Clone>(records: &[T], scores: &[f64], threshold: &Threshold) -> Vec<RankedRecord<T>> {
    debug_assert_eq!(records.len(), scores.len());
    rank_indices(scores)
        .into_iter()
        .enumerate()
        .map(|(rank, row)| RankedRecord {
            rank,
            row,
            score: scores[row],
            is_anomaly: threshold.is_anomaly(scores[row]),
            record: records[row].clone(),
        })
        .collect()
}

/// The `k` highest-scoring indices with their scores
pub fn top_k(scores: &[f64], k: usize) -> (Vec<usize>, Vec<f64>) {
    let indices: Vec<usize> = rank_indices(scores).into_iter().take(k).collect();
    let top_scores = indices.iter().map(|&i| scores[i]).collect();
    (indices, top_scores)
}
