//! Pair classification evaluation.
//!
//! Scores sentence pairs by embedding similarity and measures how well a
//! single decision threshold separates similar (label 1) from dissimilar
//! (label 0) pairs. For each scoring function (cosine similarity, dot
//! product, Euclidean and Manhattan distance) the evaluator finds the
//! threshold maximizing accuracy and, separately, the one maximizing F1, by
//! scanning the midpoints between consecutive sorted scores; average
//! precision is computed over the raw scores. The main score is the best
//! average precision across scoring functions.

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

use crate::metrics::ranking::average_precision;
use crate::similarity::{cosine_similarity, dot_product, euclidean_distance, manhattan_distance};

/// Threshold-based metrics for one scoring function.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdMetrics {
    pub accuracy: f64,
    pub accuracy_threshold: f64,
    pub f1: f64,
    pub f1_threshold: f64,
    pub precision: f64,
    pub recall: f64,
    pub average_precision: f64,
}

/// Pair classification result across all scoring functions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairScores {
    pub cosine: ThresholdMetrics,
    pub dot: ThresholdMetrics,
    pub euclidean: ThresholdMetrics,
    pub manhattan: ThresholdMetrics,
    /// Best accuracy across scoring functions.
    pub max_accuracy: f64,
    /// Best F1 across scoring functions.
    pub max_f1: f64,
    /// Best average precision across scoring functions. Main score.
    pub max_average_precision: f64,
}

impl PairScores {
    pub fn format_summary(&self) -> String {
        format!(
            "max AP: {:.3} | max Acc: {:.1}% | max F1: {:.3}",
            self.max_average_precision,
            self.max_accuracy * 100.0,
            self.max_f1
        )
    }
}

/// Find the threshold maximizing accuracy.
///
/// Pairs are sorted by score (stable, descending when a higher score means
/// more similar) and a prefix sweep counts true positives gained and true
/// negatives lost. Candidate thresholds are the midpoints between adjacent
/// sorted scores, plus the two trivial endpoints (predict everything
/// dissimilar / everything similar), so the reported accuracy is never
/// below that of the majority-class classifier. Returns
/// `(accuracy, threshold)`.
pub fn find_best_accuracy_threshold(
    scores: &[f64],
    labels: &[bool],
    high_score_more_similar: bool,
) -> (f64, f64) {
    debug_assert_eq!(scores.len(), labels.len());
    let n = scores.len();
    if n == 0 || n != labels.len() {
        return (0.0, 0.0);
    }

    let mut rows: Vec<(f64, bool)> = scores.iter().copied().zip(labels.iter().copied()).collect();
    sort_rows(&mut rows, high_score_more_similar);

    let total_positive = labels.iter().filter(|&&l| l).count();
    let total_negative = n - total_positive;

    // Endpoint thresholds sit just outside the observed score range.
    let all_negative_acc = total_negative as f64 / n as f64;
    let all_positive_acc = total_positive as f64 / n as f64;
    let before_first = if high_score_more_similar {
        rows[0].0 + 1.0
    } else {
        rows[0].0 - 1.0
    };
    let past_last = if high_score_more_similar {
        rows[n - 1].0 - 1.0
    } else {
        rows[n - 1].0 + 1.0
    };
    let (mut best_acc, mut best_threshold) = if all_negative_acc >= all_positive_acc {
        (all_negative_acc, before_first)
    } else {
        (all_positive_acc, past_last)
    };

    let mut positive_so_far = 0usize;
    let mut remaining_negatives = total_negative;
    for i in 0..n - 1 {
        if rows[i].1 {
            positive_so_far += 1;
        } else {
            remaining_negatives -= 1;
        }
        let acc = (positive_so_far + remaining_negatives) as f64 / n as f64;
        if acc > best_acc {
            best_acc = acc;
            best_threshold = (rows[i].0 + rows[i + 1].0) / 2.0;
        }
    }

    (best_acc, best_threshold)
}

/// Find the threshold maximizing F1. Returns
/// `(f1, precision, recall, threshold)`; all zeros when no pair is positive.
pub fn find_best_f1_threshold(
    scores: &[f64],
    labels: &[bool],
    high_score_more_similar: bool,
) -> (f64, f64, f64, f64) {
    debug_assert_eq!(scores.len(), labels.len());
    let n = scores.len();
    let total_positive = labels.iter().filter(|&&l| l).count();
    if n == 0 || n != labels.len() || total_positive == 0 {
        return (0.0, 0.0, 0.0, 0.0);
    }

    let mut rows: Vec<(f64, bool)> = scores.iter().copied().zip(labels.iter().copied()).collect();
    sort_rows(&mut rows, high_score_more_similar);

    let mut best_f1 = 0.0;
    let mut best_precision = 0.0;
    let mut best_recall = 0.0;
    let mut threshold = 0.0;
    let mut extracted = 0usize;
    let mut correct = 0usize;

    for i in 0..n - 1 {
        extracted += 1;
        if rows[i].1 {
            correct += 1;
        }
        if correct > 0 {
            let precision = correct as f64 / extracted as f64;
            let recall = correct as f64 / total_positive as f64;
            let f1 = 2.0 * precision * recall / (precision + recall);
            if f1 > best_f1 {
                best_f1 = f1;
                best_precision = precision;
                best_recall = recall;
                threshold = (rows[i].0 + rows[i + 1].0) / 2.0;
            }
        }
    }

    (best_f1, best_precision, best_recall, threshold)
}

/// Stable sort: descending for similarities, ascending for distances. Ties
/// keep their original order, which fixes which of several equally good
/// thresholds is reported.
fn sort_rows(rows: &mut [(f64, bool)], high_score_more_similar: bool) {
    rows.sort_by(|a, b| {
        let ord = a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal);
        if high_score_more_similar {
            ord.reverse()
        } else {
            ord
        }
    });
}

/// All threshold metrics for one score vector.
pub fn threshold_metrics(
    scores: &[f64],
    labels: &[bool],
    high_score_more_similar: bool,
) -> ThresholdMetrics {
    let (accuracy, accuracy_threshold) =
        find_best_accuracy_threshold(scores, labels, high_score_more_similar);
    let (f1, precision, recall, f1_threshold) =
        find_best_f1_threshold(scores, labels, high_score_more_similar);

    // AP ranks high-to-low; distance scores are negated first.
    let ap = if high_score_more_similar {
        average_precision(scores, labels)
    } else {
        let negated: Vec<f64> = scores.iter().map(|s| -s).collect();
        average_precision(&negated, labels)
    };

    ThresholdMetrics {
        accuracy,
        accuracy_threshold,
        f1,
        f1_threshold,
        precision,
        recall,
        average_precision: ap,
    }
}

/// Evaluate pair classification over embedded sentence pairs.
///
/// # Errors
///
/// Fails when the inputs disagree in length, fewer than 2 pairs are given,
/// or the labels do not contain both classes.
pub fn evaluate_pairs(
    embeddings1: &[Vec<f32>],
    embeddings2: &[Vec<f32>],
    labels: &[bool],
) -> Result<PairScores> {
    ensure!(
        embeddings1.len() == embeddings2.len() && embeddings1.len() == labels.len(),
        "pair arrays disagree in length: {} vs {} vs {} labels",
        embeddings1.len(),
        embeddings2.len(),
        labels.len()
    );
    ensure!(labels.len() >= 2, "need at least 2 pairs, got {}", labels.len());
    ensure!(
        labels.iter().any(|&l| l) && labels.iter().any(|&l| !l),
        "labels must contain both a similar (1) and a dissimilar (0) pair"
    );

    let n = labels.len();
    let mut cosine_scores = Vec::with_capacity(n);
    let mut dot_scores = Vec::with_capacity(n);
    let mut euclidean_scores = Vec::with_capacity(n);
    let mut manhattan_scores = Vec::with_capacity(n);
    for (a, b) in embeddings1.iter().zip(embeddings2.iter()) {
        cosine_scores.push(cosine_similarity(a, b));
        dot_scores.push(dot_product(a, b));
        euclidean_scores.push(euclidean_distance(a, b));
        manhattan_scores.push(manhattan_distance(a, b));
    }

    let cosine = threshold_metrics(&cosine_scores, labels, true);
    let dot = threshold_metrics(&dot_scores, labels, true);
    let euclidean = threshold_metrics(&euclidean_scores, labels, false);
    let manhattan = threshold_metrics(&manhattan_scores, labels, false);

    let blocks = [&cosine, &dot, &euclidean, &manhattan];
    let max_accuracy = blocks.iter().map(|m| m.accuracy).fold(0.0, f64::max);
    let max_f1 = blocks.iter().map(|m| m.f1).fold(0.0, f64::max);
    let max_average_precision = blocks
        .iter()
        .map(|m| m.average_precision)
        .fold(0.0, f64::max);

    Ok(PairScores {
        cosine,
        dot,
        euclidean,
        manhattan,
        max_accuracy,
        max_f1,
        max_average_precision,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_separation() {
        // Perfectly separated scores must yield accuracy 1.0.
        let scores = vec![0.9, 0.8, 0.3, 0.1];
        let labels = vec![true, true, false, false];
        let (acc, threshold) = find_best_accuracy_threshold(&scores, &labels, true);
        assert_eq!(acc, 1.0);
        assert!(threshold > 0.3 && threshold < 0.8, "threshold {}", threshold);

        let (f1, precision, recall, _) = find_best_f1_threshold(&scores, &labels, true);
        assert_eq!(f1, 1.0);
        assert_eq!(precision, 1.0);
        assert_eq!(recall, 1.0);
    }

    #[test]
    fn test_accuracy_at_least_majority_class() {
        // 3 positives, 7 negatives with uninformative scores: the reported
        // accuracy may not fall below 0.7 (predict everything dissimilar).
        let scores = vec![0.1, 0.9, 0.2, 0.8, 0.3, 0.7, 0.4, 0.6, 0.5, 0.55];
        let labels = vec![
            true, false, true, false, true, false, false, false, false, false,
        ];
        let majority = 0.7;
        let (acc, _) = find_best_accuracy_threshold(&scores, &labels, true);
        assert!(acc >= majority, "acc {} below majority {}", acc, majority);
    }

    #[test]
    fn test_anticorrelated_scores_fall_back_to_majority() {
        // Scores point the wrong way; the endpoint thresholds still recover
        // the majority-class accuracy.
        let scores = vec![0.9, 0.1];
        let labels = vec![false, true];
        let (acc, _) = find_best_accuracy_threshold(&scores, &labels, true);
        assert_eq!(acc, 0.5);
    }

    #[test]
    fn test_distance_direction() {
        // Distances: low means similar.
        let scores = vec![0.1, 0.2, 5.0, 9.0];
        let labels = vec![true, true, false, false];
        let (acc, threshold) = find_best_accuracy_threshold(&scores, &labels, false);
        assert_eq!(acc, 1.0);
        assert!(threshold > 0.2 && threshold < 5.0);
    }

    #[test]
    fn test_tie_breaking_is_stable() {
        // Equal scores keep input order; the scan still finds a valid split.
        let scores = vec![0.5, 0.5, 0.5, 0.2];
        let labels = vec![true, true, true, false];
        let (acc, _) = find_best_accuracy_threshold(&scores, &labels, true);
        assert_eq!(acc, 1.0);
    }

    #[test]
    fn test_evaluate_pairs_separable() {
        // Similar pairs share direction; dissimilar pairs are orthogonal.
        let embeddings1 = vec![
            vec![1.0, 0.0],
            vec![0.8, 0.1],
            vec![1.0, 0.0],
            vec![0.9, 0.05],
        ];
        let embeddings2 = vec![
            vec![0.9, 0.05],
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![0.05, 0.9],
        ];
        let labels = vec![true, true, false, false];

        let scores = evaluate_pairs(&embeddings1, &embeddings2, &labels).unwrap();
        assert_eq!(scores.cosine.accuracy, 1.0);
        assert!((scores.max_average_precision - 1.0).abs() < 1e-12);
        assert_eq!(scores.max_f1, 1.0);
    }

    #[test]
    fn test_evaluate_pairs_rejects_single_class() {
        let e1 = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        let e2 = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        assert!(evaluate_pairs(&e1, &e2, &[true, true]).is_err());
        assert!(evaluate_pairs(&e1, &e2, &[false, false]).is_err());
    }

    #[test]
    fn test_evaluate_pairs_rejects_length_mismatch() {
        let e1 = vec![vec![1.0, 0.0]];
        let e2 = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        assert!(evaluate_pairs(&e1, &e2, &[true, false]).is_err());
    }
}
