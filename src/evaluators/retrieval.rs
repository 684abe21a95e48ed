//! Retrieval evaluation.
//!
//! Ranks corpus documents for each query by cosine similarity and scores the
//! ranking against relevance judgments (qrels) with the BEIR/MTEB metric
//! set: nDCG@K, MRR@K, Precision@K, Recall@K, and MAP. nDCG@10 is the main
//! score. Ties in similarity break by document id so rankings are
//! deterministic.

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::metrics::ranking::{
    average_precision_from_ranking, ndcg_at_k_graded, precision_at_k, recall_at_k,
    reciprocal_rank_at_k,
};
use crate::similarity::cosine_similarity;

/// Cutoffs reported for nDCG/Precision/Recall.
pub const K_VALUES: [usize; 4] = [1, 3, 5, 10];

/// Metrics for one query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalQueryScores {
    pub query_id: String,
    /// Judged-relevant documents for this query.
    pub total_relevant: usize,
    /// nDCG at each cutoff in [`K_VALUES`], graded relevance.
    pub ndcg: Vec<f64>,
    pub precision: Vec<f64>,
    pub recall: Vec<f64>,
    pub mrr_at_10: f64,
    pub average_precision: f64,
    pub top_score: f64,
}

/// Aggregated retrieval metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalScores {
    pub query_count: usize,
    /// Queries dropped because no judged document exists in the corpus.
    pub queries_skipped: usize,
    /// Mean nDCG@10. Main score.
    pub ndcg_at_10: f64,
    pub mrr_at_10: f64,
    pub map: f64,
    pub precision_at_10: f64,
    pub recall_at_10: f64,
    pub per_query: Vec<RetrievalQueryScores>,
}

impl RetrievalScores {
    pub fn format_summary(&self) -> String {
        format!(
            "nDCG@10: {:.3} | MRR@10: {:.3} | MAP: {:.3} | R@10: {:.1}% | queries: {} (skipped: {})",
            self.ndcg_at_10,
            self.mrr_at_10,
            self.map,
            self.recall_at_10 * 100.0,
            self.query_count,
            self.queries_skipped
        )
    }
}

/// Evaluate retrieval over embedded queries and corpus.
///
/// `qrels[i]` maps document id to a relevance grade (>0 means relevant) for
/// query `i`. Queries whose judged documents are all absent from the corpus
/// are skipped and counted, not scored.
pub fn evaluate_retrieval(
    query_ids: &[String],
    query_embeddings: &[Vec<f32>],
    corpus_ids: &[String],
    corpus_embeddings: &[Vec<f32>],
    qrels: &[HashMap<String, u8>],
) -> Result<RetrievalScores> {
    ensure!(
        query_ids.len() == query_embeddings.len() && query_ids.len() == qrels.len(),
        "query arrays disagree in length: {} ids, {} embeddings, {} qrels",
        query_ids.len(),
        query_embeddings.len(),
        qrels.len()
    );
    ensure!(
        corpus_ids.len() == corpus_embeddings.len(),
        "corpus arrays disagree in length: {} ids, {} embeddings",
        corpus_ids.len(),
        corpus_embeddings.len()
    );
    ensure!(!query_ids.is_empty(), "no queries to evaluate");
    ensure!(!corpus_ids.is_empty(), "empty corpus");

    let corpus_id_set: std::collections::HashSet<&str> =
        corpus_ids.iter().map(|s| s.as_str()).collect();

    let mut per_query = Vec::new();
    let mut queries_skipped = 0usize;

    for ((query_id, query_embedding), judgments) in
        query_ids.iter().zip(query_embeddings.iter()).zip(qrels.iter())
    {
        let total_relevant = judgments
            .iter()
            .filter(|(id, &grade)| grade > 0 && corpus_id_set.contains(id.as_str()))
            .count();
        if total_relevant == 0 {
            queries_skipped += 1;
            tracing::warn!(query = %query_id, "no judged-relevant document in corpus; skipping");
            continue;
        }

        // Rank the corpus by similarity, ties broken by document id.
        let mut scored: Vec<(usize, f64)> = corpus_embeddings
            .iter()
            .enumerate()
            .map(|(i, doc)| (i, cosine_similarity(query_embedding, doc)))
            .collect();
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| corpus_ids[a.0].cmp(&corpus_ids[b.0]))
        });

        let grades: Vec<u8> = scored
            .iter()
            .map(|(i, _)| judgments.get(&corpus_ids[*i]).copied().unwrap_or(0))
            .collect();
        let relevant: Vec<bool> = grades.iter().map(|&g| g > 0).collect();
        let all_grades: Vec<u8> = judgments
            .iter()
            .filter(|(id, _)| corpus_id_set.contains(id.as_str()))
            .map(|(_, &g)| g)
            .collect();

        per_query.push(RetrievalQueryScores {
            query_id: query_id.clone(),
            total_relevant,
            ndcg: K_VALUES
                .iter()
                .map(|&k| ndcg_at_k_graded(&grades, k, &all_grades))
                .collect(),
            precision: K_VALUES.iter().map(|&k| precision_at_k(&relevant, k)).collect(),
            recall: K_VALUES
                .iter()
                .map(|&k| recall_at_k(&relevant, k, total_relevant))
                .collect(),
            mrr_at_10: reciprocal_rank_at_k(&relevant, 10),
            average_precision: average_precision_from_ranking(&relevant, total_relevant),
            top_score: scored.first().map(|(_, s)| *s).unwrap_or(0.0),
        });
    }

    ensure!(
        !per_query.is_empty(),
        "all {} queries were skipped; no judged document appears in the corpus",
        query_ids.len()
    );

    let count = per_query.len() as f64;
    let idx10 = K_VALUES.iter().position(|&k| k == 10).expect("10 in K_VALUES");

    Ok(RetrievalScores {
        query_count: per_query.len(),
        queries_skipped,
        ndcg_at_10: per_query.iter().map(|q| q.ndcg[idx10]).sum::<f64>() / count,
        mrr_at_10: per_query.iter().map(|q| q.mrr_at_10).sum::<f64>() / count,
        map: per_query.iter().map(|q| q.average_precision).sum::<f64>() / count,
        precision_at_10: per_query.iter().map(|q| q.precision[idx10]).sum::<f64>() / count,
        recall_at_10: per_query.iter().map(|q| q.recall[idx10]).sum::<f64>() / count,
        per_query,
    })
}
