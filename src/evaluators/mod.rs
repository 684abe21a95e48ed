//! Task evaluators.
//!
//! One module per task family. Each evaluator is a plain function over
//! embeddings and gold data returning a serializable score struct; dataset
//! loading and embedding production happen upstream in the runner.
//!
//! - `clustering` - bootstrapped multi-level V-measure evaluation
//! - `pair` - pair classification via threshold search and average precision
//! - `sts` - semantic textual similarity correlation
//! - `retrieval` - ranked retrieval against relevance judgments
//! - `reranking` - candidate-list reranking
//! - `classification` - bootstrapped kNN classification and dialog-state tracking
//! - `summarization` - summary quality correlation

pub mod classification;
pub mod clustering;
pub mod pair;
pub mod reranking;
pub mod retrieval;
pub mod sts;
pub mod summarization;

pub use classification::{
    evaluate_classification, evaluate_dialog_state, ClassificationParams, ClassificationScores,
    DstScores, SlotSeries,
};
pub use clustering::{
    evaluate_clustering_bootstrapped, ClusteringParams, ClusteringScores, LevelScores,
};
pub use pair::{evaluate_pairs, PairScores, ThresholdMetrics};
pub use reranking::{evaluate_reranking, RerankingInstance, RerankingScores};
pub use retrieval::{evaluate_retrieval, RetrievalScores};
pub use sts::{evaluate_sts, normalize_gold_scores, StsScores};
pub use summarization::{evaluate_summarization, SummarizationInstance, SummarizationScores};
