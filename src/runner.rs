//! Evaluation orchestration.
//!
//! Bridges datasets, embedding backends, and evaluators: texts are embedded
//! once in batches, the family-specific evaluator runs over the vectors, and
//! the scores land in a timestamped JSON report.

use anyhow::{ensure, Context, Result};
use chrono::Utc;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::config::EvalConfig;
use crate::data::Dataset;
use crate::embedders::EmbedderBackend;
use crate::evaluators::{
    evaluate_classification, evaluate_clustering_bootstrapped, evaluate_dialog_state,
    evaluate_pairs, evaluate_reranking, evaluate_retrieval, evaluate_sts, evaluate_summarization,
    normalize_gold_scores, ClassificationScores, ClusteringScores, DstScores, PairScores,
    RerankingInstance, RerankingScores, RetrievalScores, SlotSeries, StsScores,
    SummarizationInstance, SummarizationScores,
};
use crate::tasks::TaskFamily;

/// Texts embedded per backend call.
const EMBED_BATCH_SIZE: usize = 32;

/// Scores of one evaluation, tagged by task family.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "task", rename_all = "snake_case")]
pub enum TaskScores {
    Clustering(ClusteringScores),
    PairClassification(PairScores),
    Sts(StsScores),
    Retrieval(RetrievalScores),
    Reranking(RerankingScores),
    Classification(ClassificationScores),
    DialogStateTracking(DstScores),
    Summarization(SummarizationScores),
}

impl TaskScores {
    /// The headline metric value for this task family.
    pub fn main_score(&self) -> f64 {
        match self {
            Self::Clustering(s) => s.v_measure,
            Self::PairClassification(s) => s.max_average_precision,
            Self::Sts(s) => s.cosine_spearman,
            Self::Retrieval(s) => s.ndcg_at_10,
            Self::Reranking(s) => s.map,
            Self::Classification(s) => s.accuracy,
            Self::DialogStateTracking(s) => s.joint_accuracy,
            Self::Summarization(s) => s.spearman,
        }
    }

    pub fn format_summary(&self) -> String {
        match self {
            Self::Clustering(s) => s.format_summary(),
            Self::PairClassification(s) => s.format_summary(),
            Self::Sts(s) => s.format_summary(),
            Self::Retrieval(s) => s.format_summary(),
            Self::Reranking(s) => s.format_summary(),
            Self::Classification(s) => s.format_summary(),
            Self::DialogStateTracking(s) => s.format_summary(),
            Self::Summarization(s) => s.format_summary(),
        }
    }
}

/// A finished evaluation, ready to serialize.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalReport {
    pub timestamp: String,
    pub dataset: String,
    pub task: TaskFamily,
    pub model: String,
    pub seed: u64,
    /// Effective tunables for the run.
    pub config: EvalConfig,
    pub main_score: f64,
    pub scores: TaskScores,
}

impl EvalReport {
    pub fn new(
        dataset: &Dataset,
        model: &str,
        seed: u64,
        config: &EvalConfig,
        scores: TaskScores,
    ) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            dataset: dataset.metadata().name.clone(),
            task: dataset.task(),
            model: model.to_string(),
            seed,
            config: config.clone(),
            main_score: scores.main_score(),
            scores,
        }
    }

    /// Write the report as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create output directory: {:?}", parent))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, &json)
            .with_context(|| format!("Failed to write report: {:?}", path))?;
        Ok(())
    }
}

/// Run the evaluator matching the dataset's task family.
pub async fn run_task(
    dataset: &Dataset,
    backend: &dyn EmbedderBackend,
    config: &EvalConfig,
    rng: &mut ChaCha8Rng,
) -> Result<TaskScores> {
    match dataset {
        Dataset::Clustering(d) => {
            let embeddings = embed_all(backend, &d.sentences).await?;
            let labels = d.label_levels();
            let scores =
                evaluate_clustering_bootstrapped(&embeddings, &labels, &config.clustering, rng)?;
            Ok(TaskScores::Clustering(scores))
        }

        Dataset::PairClassification(d) => {
            let embeddings1 = embed_all(backend, &d.sentence1).await?;
            let embeddings2 = embed_all(backend, &d.sentence2).await?;
            let labels: Vec<bool> = d.labels.iter().map(|&l| l == 1).collect();
            Ok(TaskScores::PairClassification(evaluate_pairs(
                &embeddings1,
                &embeddings2,
                &labels,
            )?))
        }

        Dataset::Sts(d) => {
            let embeddings1 = embed_all(backend, &d.sentence1).await?;
            let embeddings2 = embed_all(backend, &d.sentence2).await?;
            let gold = normalize_gold_scores(&d.scores, d.min_score, d.max_score)?;
            Ok(TaskScores::Sts(evaluate_sts(&embeddings1, &embeddings2, &gold)?))
        }

        Dataset::Retrieval(d) => {
            let query_texts: Vec<String> = d.queries.iter().map(|q| q.text.clone()).collect();
            let corpus_texts: Vec<String> = d.corpus.iter().map(|e| e.text.clone()).collect();
            let query_embeddings = embed_all(backend, &query_texts).await?;
            let corpus_embeddings = embed_all(backend, &corpus_texts).await?;

            let query_ids: Vec<String> = d.queries.iter().map(|q| q.id.clone()).collect();
            let corpus_ids: Vec<String> = d.corpus.iter().map(|e| e.id.clone()).collect();
            let qrels: Vec<_> = d
                .queries
                .iter()
                .map(|q| d.qrels.get(&q.id).cloned().unwrap_or_default())
                .collect();

            Ok(TaskScores::Retrieval(evaluate_retrieval(
                &query_ids,
                &query_embeddings,
                &corpus_ids,
                &corpus_embeddings,
                &qrels,
            )?))
        }

        Dataset::Reranking(d) => {
            let mut instances = Vec::with_capacity(d.instances.len());
            for entry in &d.instances {
                instances.push(RerankingInstance {
                    query_embedding: backend.embed(&entry.query).await?,
                    positive_embeddings: embed_all(backend, &entry.positive).await?,
                    negative_embeddings: embed_all(backend, &entry.negative).await?,
                });
            }
            Ok(TaskScores::Reranking(evaluate_reranking(&instances)?))
        }

        Dataset::Classification(d) => {
            let train_texts: Vec<String> = d.train.iter().map(|e| e.text.clone()).collect();
            let test_texts: Vec<String> = d.test.iter().map(|e| e.text.clone()).collect();
            let train_embeddings = embed_all(backend, &train_texts).await?;
            let test_embeddings = embed_all(backend, &test_texts).await?;
            let train_labels: Vec<String> = d.train.iter().map(|e| e.label.clone()).collect();
            let test_labels: Vec<String> = d.test.iter().map(|e| e.label.clone()).collect();

            Ok(TaskScores::Classification(evaluate_classification(
                &train_embeddings,
                &train_labels,
                &test_embeddings,
                &test_labels,
                &config.classification,
                rng,
            )?))
        }

        Dataset::DialogStateTracking(d) => {
            let train_texts: Vec<String> = d.train.iter().map(|t| t.text.clone()).collect();
            let test_texts: Vec<String> = d.test.iter().map(|t| t.text.clone()).collect();
            let train_embeddings = embed_all(backend, &train_texts).await?;
            let test_embeddings = embed_all(backend, &test_texts).await?;

            let slots: Vec<SlotSeries> = d
                .slots
                .iter()
                .map(|slot| SlotSeries {
                    name: slot.clone(),
                    train: d.train.iter().map(|t| t.slot_value(slot)).collect(),
                    test: d.test.iter().map(|t| t.slot_value(slot)).collect(),
                })
                .collect();

            Ok(TaskScores::DialogStateTracking(evaluate_dialog_state(
                &train_embeddings,
                &test_embeddings,
                &slots,
                &config.classification,
                rng,
            )?))
        }

        Dataset::Summarization(d) => {
            let mut instances = Vec::with_capacity(d.texts.len());
            for entry in &d.texts {
                instances.push(SummarizationInstance {
                    human_embeddings: embed_all(backend, &entry.human_summaries).await?,
                    machine_embeddings: embed_all(backend, &entry.machine_summaries).await?,
                    gold_scores: entry.gold_scores.clone(),
                });
            }
            Ok(TaskScores::Summarization(evaluate_summarization(&instances)?))
        }
    }
}

/// Embed texts in batches, checking the advertised dimensionality.
async fn embed_all(backend: &dyn EmbedderBackend, texts: &[String]) -> Result<Vec<Vec<f32>>> {
    let mut embeddings = Vec::with_capacity(texts.len());
    for (batch_idx, batch) in texts.chunks(EMBED_BATCH_SIZE).enumerate() {
        debug!(
            batch = batch_idx,
            embedded = embeddings.len(),
            total = texts.len(),
            "embedding batch"
        );
        let batch_embeddings = backend.embed_batch(batch).await?;
        ensure!(
            batch_embeddings.len() == batch.len(),
            "backend returned {} embeddings for a batch of {}",
            batch_embeddings.len(),
            batch.len()
        );
        for embedding in &batch_embeddings {
            ensure!(
                embedding.len() == backend.dimensions(),
                "backend '{}' returned a {}-dimensional vector, expected {}",
                backend.name(),
                embedding.len(),
                backend.dimensions()
            );
        }
        embeddings.extend(batch_embeddings);
    }
    Ok(embeddings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{
        ClusteringData, DatasetMetadata, LabelHierarchy, LabeledText, ClassificationData, PairData,
    };
    use crate::embedders::PrecomputedBackend;
    use rand::SeedableRng;
    use std::collections::HashMap;

    fn metadata(task: TaskFamily) -> DatasetMetadata {
        DatasetMetadata {
            name: "test".to_string(),
            task,
            description: String::new(),
            version: None,
        }
    }

    /// Store mapping "a{i}" texts to one region and "b{i}" texts to another.
    fn two_region_backend(count: usize) -> PrecomputedBackend {
        let mut vectors = HashMap::new();
        for i in 0..count {
            let jitter = 0.01 * i as f32;
            vectors.insert(format!("a{}", i), vec![1.0 + jitter, 0.0]);
            vectors.insert(format!("b{}", i), vec![0.0, 1.0 + jitter]);
        }
        PrecomputedBackend::from_vectors("test-model".to_string(), 2, vectors).unwrap()
    }

    #[tokio::test]
    async fn test_run_clustering_task() {
        let count = 30;
        let backend = two_region_backend(count);
        let mut sentences = Vec::new();
        let mut labels = Vec::new();
        for i in 0..count {
            sentences.push(format!("a{}", i));
            labels.push(LabelHierarchy::Single("first".to_string()));
            sentences.push(format!("b{}", i));
            labels.push(LabelHierarchy::Single("second".to_string()));
        }
        let dataset = Dataset::Clustering(ClusteringData {
            metadata: metadata(TaskFamily::Clustering),
            sentences,
            labels,
        });

        let mut config = EvalConfig::default();
        config.clustering.num_trials = 3;
        config.clustering.sample_size = 40;
        config.clustering.batch_size = 16;

        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let scores = run_task(&dataset, &backend, &config, &mut rng).await.unwrap();
        match &scores {
            TaskScores::Clustering(s) => assert!(s.v_measure > 0.8, "v = {}", s.v_measure),
            other => panic!("unexpected scores variant: {:?}", other),
        }
        assert!(scores.main_score() > 0.8);
    }

    #[tokio::test]
    async fn test_run_pair_task() {
        let backend = two_region_backend(4);
        let dataset = Dataset::PairClassification(PairData {
            metadata: metadata(TaskFamily::PairClassification),
            sentence1: vec!["a0".into(), "a1".into(), "a2".into(), "a3".into()],
            sentence2: vec!["a1".into(), "a2".into(), "b0".into(), "b1".into()],
            labels: vec![1, 1, 0, 0],
        });

        let config = EvalConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let scores = run_task(&dataset, &backend, &config, &mut rng).await.unwrap();
        assert!((scores.main_score() - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_run_classification_task_and_report() {
        let backend = two_region_backend(12);
        let train: Vec<LabeledText> = (0..8)
            .flat_map(|i| {
                [
                    LabeledText { text: format!("a{}", i), label: "alpha".into() },
                    LabeledText { text: format!("b{}", i), label: "beta".into() },
                ]
            })
            .collect();
        let test: Vec<LabeledText> = (8..12)
            .flat_map(|i| {
                [
                    LabeledText { text: format!("a{}", i), label: "alpha".into() },
                    LabeledText { text: format!("b{}", i), label: "beta".into() },
                ]
            })
            .collect();
        let dataset = Dataset::Classification(ClassificationData {
            metadata: metadata(TaskFamily::Classification),
            train,
            test,
        });

        let config = EvalConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let scores = run_task(&dataset, &backend, &config, &mut rng).await.unwrap();
        assert_eq!(scores.main_score(), 1.0);

        let report = EvalReport::new(&dataset, backend.name(), config.seed, &config, scores);
        assert_eq!(report.task, TaskFamily::Classification);
        assert_eq!(report.model, "test-model");
        assert_eq!(report.main_score, 1.0);

        // Reports survive a JSON round trip with the task tag intact.
        let json = serde_json::to_string(&report).unwrap();
        let back: EvalReport = serde_json::from_str(&json).unwrap();
        assert!(matches!(back.scores, TaskScores::Classification(_)));
    }

    #[tokio::test]
    async fn test_missing_embedding_fails() {
        let backend = two_region_backend(1);
        let dataset = Dataset::Clustering(ClusteringData {
            metadata: metadata(TaskFamily::Clustering),
            sentences: vec!["not-in-store".to_string(), "a0".to_string()],
            labels: vec![
                LabelHierarchy::Single("x".to_string()),
                LabelHierarchy::Single("y".to_string()),
            ],
        });
        let config = EvalConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(run_task(&dataset, &backend, &config, &mut rng).await.is_err());
    }
}
