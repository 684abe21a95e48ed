//! Metric primitives shared by the task evaluators.
//!
//! - `stats` - mean/std, Pearson/Spearman correlation, bootstrap confidence intervals
//! - `vmeasure` - entropy-based external validation for clusterings
//! - `ranking` - Precision@K, Recall@K, MRR, nDCG, MAP, average precision

pub mod ranking;
pub mod stats;
pub mod vmeasure;

pub use ranking::{
    average_precision, average_precision_from_ranking, dcg_at_k, idcg_at_k, ndcg_at_k,
    precision_at_k, recall_at_k, reciprocal_rank_at_k,
};
pub use stats::{
    bootstrap_confidence_interval, mean, mean_std, pearson_correlation, spearman_correlation,
    std_dev, ConfidenceInterval,
};
pub use vmeasure::{homogeneity_completeness_v_measure, v_measure};
