//! Reranking evaluation.
//!
//! Each instance pairs a query with a candidate set of known positive and
//! negative documents. Candidates are ranked by cosine similarity to the
//! query; MAP is the main score, with MRR@10 reported alongside. Instances
//! without both a positive and a negative candidate carry no ranking signal
//! and are skipped with a warning, matching the reference harness.

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::metrics::ranking::{average_precision_from_ranking, reciprocal_rank_at_k};
use crate::similarity::cosine_similarity;

/// One embedded reranking instance.
pub struct RerankingInstance {
    pub query_embedding: Vec<f32>,
    pub positive_embeddings: Vec<Vec<f32>>,
    pub negative_embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankingScores {
    pub instance_count: usize,
    pub instances_skipped: usize,
    /// Mean average precision. Main score.
    pub map: f64,
    pub mrr_at_10: f64,
    pub per_instance_ap: Vec<f64>,
}

impl RerankingScores {
    pub fn format_summary(&self) -> String {
        format!(
            "MAP: {:.3} | MRR@10: {:.3} | instances: {} (skipped: {})",
            self.map, self.mrr_at_10, self.instance_count, self.instances_skipped
        )
    }
}

/// Evaluate reranking over embedded instances.
pub fn evaluate_reranking(instances: &[RerankingInstance]) -> Result<RerankingScores> {
    ensure!(!instances.is_empty(), "no reranking instances to evaluate");

    let mut per_instance_ap = Vec::new();
    let mut reciprocal_ranks = Vec::new();
    let mut instances_skipped = 0usize;

    for (i, instance) in instances.iter().enumerate() {
        if instance.positive_embeddings.is_empty() || instance.negative_embeddings.is_empty() {
            instances_skipped += 1;
            warn!(
                instance = i,
                positives = instance.positive_embeddings.len(),
                negatives = instance.negative_embeddings.len(),
                "instance needs at least one positive and one negative candidate; skipping"
            );
            continue;
        }

        // Candidates: positives first, then negatives; rank by similarity
        // with the stable sort preserving that order on ties.
        let mut scored: Vec<(bool, f64)> = instance
            .positive_embeddings
            .iter()
            .map(|doc| (true, cosine_similarity(&instance.query_embedding, doc)))
            .chain(
                instance
                    .negative_embeddings
                    .iter()
                    .map(|doc| (false, cosine_similarity(&instance.query_embedding, doc))),
            )
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let relevant: Vec<bool> = scored.iter().map(|(pos, _)| *pos).collect();
        let total_relevant = instance.positive_embeddings.len();

        per_instance_ap.push(average_precision_from_ranking(&relevant, total_relevant));
        reciprocal_ranks.push(reciprocal_rank_at_k(&relevant, 10));
    }

    ensure!(
        !per_instance_ap.is_empty(),
        "all {} instances were skipped (each needs positives and negatives)",
        instances.len()
    );

    let count = per_instance_ap.len() as f64;
    Ok(RerankingScores {
        instance_count: per_instance_ap.len(),
        instances_skipped,
        map: per_instance_ap.iter().sum::<f64>() / count,
        mrr_at_10: reciprocal_ranks.iter().sum::<f64>() / count,
        per_instance_ap,
    })
}
