//! Semantic textual similarity evaluation.
//!
//! Correlates embedding-space scores for sentence pairs against gold
//! similarity judgments. Cosine similarity is the primary scoring function
//! (its Spearman correlation is the main score); negated Euclidean and
//! Manhattan distances are reported alongside, following the convention
//! that larger must mean more similar before correlating.

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

use crate::metrics::stats::{pearson_correlation, spearman_correlation};
use crate::similarity::{cosine_similarity, euclidean_distance, manhattan_distance};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StsScores {
    pub cosine_pearson: f64,
    /// Main score.
    pub cosine_spearman: f64,
    pub euclidean_pearson: f64,
    pub euclidean_spearman: f64,
    pub manhattan_pearson: f64,
    pub manhattan_spearman: f64,
}

impl StsScores {
    pub fn format_summary(&self) -> String {
        format!(
            "cosine Spearman: {:.3} | cosine Pearson: {:.3}",
            self.cosine_spearman, self.cosine_pearson
        )
    }
}

/// Normalize gold judgments from `[min_score, max_score]` to `[0, 1]`.
///
/// Errors when the bounds are degenerate (`max <= min`).
pub fn normalize_gold_scores(scores: &[f64], min_score: f64, max_score: f64) -> Result<Vec<f64>> {
    ensure!(
        max_score > min_score,
        "invalid gold score range [{}, {}]",
        min_score,
        max_score
    );
    Ok(scores
        .iter()
        .map(|s| (s - min_score) / (max_score - min_score))
        .collect())
}

/// Correlate embedding scores for each sentence pair against `gold`.
pub fn evaluate_sts(
    embeddings1: &[Vec<f32>],
    embeddings2: &[Vec<f32>],
    gold: &[f64],
) -> Result<StsScores> {
    ensure!(
        embeddings1.len() == embeddings2.len() && embeddings1.len() == gold.len(),
        "STS arrays disagree in length: {} vs {} vs {} gold scores",
        embeddings1.len(),
        embeddings2.len(),
        gold.len()
    );
    ensure!(gold.len() >= 2, "need at least 2 pairs, got {}", gold.len());

    let n = gold.len();
    let mut cosine = Vec::with_capacity(n);
    let mut neg_euclidean = Vec::with_capacity(n);
    let mut neg_manhattan = Vec::with_capacity(n);
    for (a, b) in embeddings1.iter().zip(embeddings2.iter()) {
        cosine.push(cosine_similarity(a, b));
        neg_euclidean.push(-euclidean_distance(a, b));
        neg_manhattan.push(-manhattan_distance(a, b));
    }

    Ok(StsScores {
        cosine_pearson: pearson_correlation(&cosine, gold),
        cosine_spearman: spearman_correlation(&cosine, gold),
        euclidean_pearson: pearson_correlation(&neg_euclidean, gold),
        euclidean_spearman: spearman_correlation(&neg_euclidean, gold),
        manhattan_pearson: pearson_correlation(&neg_manhattan, gold),
        manhattan_spearman: spearman_correlation(&neg_manhattan, gold),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aligned_pairs_correlate_positively() {
        // Pair angles widen as the gold score drops.
        let embeddings1 = vec![vec![1.0, 0.0]; 4];
        let embeddings2 = vec![
            vec![1.0, 0.0],
            vec![0.9, 0.4],
            vec![0.5, 0.9],
            vec![0.0, 1.0],
        ];
        let gold = vec![1.0, 0.7, 0.3, 0.0];

        let scores = evaluate_sts(&embeddings1, &embeddings2, &gold).unwrap();
        assert!((scores.cosine_spearman - 1.0).abs() < 1e-9);
        assert!(scores.cosine_pearson > 0.9);
        assert!(scores.euclidean_spearman > 0.9);
        assert!(scores.manhattan_spearman > 0.9);
    }

    #[test]
    fn test_normalize_gold_scores() {
        let normalized = normalize_gold_scores(&[0.0, 2.5, 5.0], 0.0, 5.0).unwrap();
        assert_eq!(normalized, vec![0.0, 0.5, 1.0]);

        assert!(normalize_gold_scores(&[1.0], 3.0, 3.0).is_err());
    }

    #[test]
    fn test_length_mismatch_errors() {
        let e1 = vec![vec![1.0, 0.0]];
        let e2 = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        assert!(evaluate_sts(&e1, &e2, &[1.0, 0.0]).is_err());
    }
}
