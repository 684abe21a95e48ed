//! Summarization evaluation.
//!
//! For each source text, every machine summary is scored by its best cosine
//! similarity to any human reference summary; those scores are then
//! correlated (Pearson and Spearman) against the per-text gold quality
//! judgments and averaged over texts. Texts whose gold scores are constant
//! carry no ranking signal and are skipped with a warning.

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::metrics::stats::{pearson_correlation, spearman_correlation};
use crate::similarity::cosine_similarity;

/// One embedded summarization instance.
pub struct SummarizationInstance {
    pub human_embeddings: Vec<Vec<f32>>,
    pub machine_embeddings: Vec<Vec<f32>>,
    /// Gold quality judgment per machine summary.
    pub gold_scores: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizationScores {
    pub pearson: f64,
    /// Main score.
    pub spearman: f64,
    pub texts_evaluated: usize,
    pub texts_skipped: usize,
}

impl SummarizationScores {
    pub fn format_summary(&self) -> String {
        format!(
            "Spearman: {:.3} | Pearson: {:.3} | texts: {} (skipped: {})",
            self.spearman, self.pearson, self.texts_evaluated, self.texts_skipped
        )
    }
}

/// Evaluate summarization over embedded instances.
pub fn evaluate_summarization(instances: &[SummarizationInstance]) -> Result<SummarizationScores> {
    ensure!(!instances.is_empty(), "no summarization instances to evaluate");

    let mut pearson_scores = Vec::new();
    let mut spearman_scores = Vec::new();
    let mut texts_skipped = 0usize;

    for (i, instance) in instances.iter().enumerate() {
        ensure!(
            instance.machine_embeddings.len() == instance.gold_scores.len(),
            "text {}: {} machine summaries but {} gold scores",
            i,
            instance.machine_embeddings.len(),
            instance.gold_scores.len()
        );
        ensure!(
            !instance.human_embeddings.is_empty(),
            "text {}: no human reference summaries",
            i
        );

        if instance.machine_embeddings.len() < 2 || constant(&instance.gold_scores) {
            texts_skipped += 1;
            warn!(text = i, "gold scores carry no ranking signal; skipping");
            continue;
        }

        // Each machine summary scores as its closest human reference.
        let scores: Vec<f64> = instance
            .machine_embeddings
            .iter()
            .map(|machine| {
                instance
                    .human_embeddings
                    .iter()
                    .map(|human| cosine_similarity(machine, human))
                    .fold(f64::NEG_INFINITY, f64::max)
            })
            .collect();

        pearson_scores.push(pearson_correlation(&scores, &instance.gold_scores));
        spearman_scores.push(spearman_correlation(&scores, &instance.gold_scores));
    }

    ensure!(
        !pearson_scores.is_empty(),
        "all {} texts were skipped (constant gold scores or a single machine summary each)",
        instances.len()
    );

    let count = pearson_scores.len() as f64;
    Ok(SummarizationScores {
        pearson: pearson_scores.iter().sum::<f64>() / count,
        spearman: spearman_scores.iter().sum::<f64>() / count,
        texts_evaluated: pearson_scores.len(),
        texts_skipped,
    })
}

fn constant(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[0] == w[1])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aligned_judgments_correlate() {
        // Machine summaries drift away from the single human reference as
        // the gold score drops.
        let instance = SummarizationInstance {
            human_embeddings: vec![vec![1.0, 0.0]],
            machine_embeddings: vec![vec![1.0, 0.0], vec![0.8, 0.6], vec![0.0, 1.0]],
            gold_scores: vec![5.0, 3.0, 1.0],
        };
        let scores = evaluate_summarization(&[instance]).unwrap();
        assert!((scores.spearman - 1.0).abs() < 1e-9);
        assert!(scores.pearson > 0.8);
        assert_eq!(scores.texts_evaluated, 1);
    }

    #[test]
    fn test_constant_gold_skipped() {
        let flat = SummarizationInstance {
            human_embeddings: vec![vec![1.0, 0.0]],
            machine_embeddings: vec![vec![1.0, 0.0], vec![0.0, 1.0]],
            gold_scores: vec![3.0, 3.0],
        };
        let good = SummarizationInstance {
            human_embeddings: vec![vec![1.0, 0.0]],
            machine_embeddings: vec![vec![1.0, 0.0], vec![0.0, 1.0]],
            gold_scores: vec![5.0, 1.0],
        };
        let scores = evaluate_summarization(&[flat, good]).unwrap();
        assert_eq!(scores.texts_evaluated, 1);
        assert_eq!(scores.texts_skipped, 1);
    }

    #[test]
    fn test_all_skipped_errors() {
        let flat = SummarizationInstance {
            human_embeddings: vec![vec![1.0, 0.0]],
            machine_embeddings: vec![vec![1.0, 0.0], vec![0.0, 1.0]],
            gold_scores: vec![3.0, 3.0],
        };
        assert!(evaluate_summarization(&[flat]).is_err());
    }

    #[test]
    fn test_mismatched_gold_scores_error() {
        let bad = SummarizationInstance {
            human_embeddings: vec![vec![1.0, 0.0]],
            machine_embeddings: vec![vec![1.0, 0.0]],
            gold_scores: vec![1.0, 2.0],
        };
        assert!(evaluate_summarization(&[bad]).is_err());
    }
}
