//! Dataset file formats.
//!
//! Datasets are JSON documents with a shared metadata header naming the task
//! family, followed by family-specific records. Loading validates shape
//! invariants (parallel-array lengths, binary pair labels, qrels coverage)
//! up front so evaluators can assume well-formed input.
//!
//! ## Example (pair classification)
//!
//! ```json
//! {
//!   "metadata": { "name": "dupq", "task": "pair_classification" },
//!   "sentence1": ["how do I ...", "what is ..."],
//!   "sentence2": ["how can I ...", "where is ..."],
//!   "labels": [1, 0]
//! }
//! ```

use anyhow::{bail, ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::tasks::TaskFamily;

/// Header shared by every dataset file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetMetadata {
    pub name: String,
    pub task: TaskFamily,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Gold cluster label: a single level or a hierarchy list. Datasets in the
/// wild carry both shapes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LabelHierarchy {
    Single(String),
    Levels(Vec<String>),
}

impl LabelHierarchy {
    pub fn levels(&self) -> Vec<String> {
        match self {
            Self::Single(label) => vec![label.clone()],
            Self::Levels(levels) => levels.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusteringData {
    pub metadata: DatasetMetadata,
    pub sentences: Vec<String>,
    pub labels: Vec<LabelHierarchy>,
}

impl ClusteringData {
    pub fn label_levels(&self) -> Vec<Vec<String>> {
        self.labels.iter().map(|l| l.levels()).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairData {
    pub metadata: DatasetMetadata,
    pub sentence1: Vec<String>,
    pub sentence2: Vec<String>,
    /// 1 = similar, 0 = dissimilar.
    pub labels: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StsData {
    pub metadata: DatasetMetadata,
    pub sentence1: Vec<String>,
    pub sentence2: Vec<String>,
    pub scores: Vec<f64>,
    /// Gold score range, used to normalize to [0, 1].
    pub min_score: f64,
    pub max_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalEntry {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalData {
    pub metadata: DatasetMetadata,
    pub queries: Vec<RetrievalEntry>,
    pub corpus: Vec<RetrievalEntry>,
    /// query id -> document id -> relevance grade.
    pub qrels: HashMap<String, HashMap<String, u8>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankingEntry {
    pub query: String,
    pub positive: Vec<String>,
    pub negative: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankingData {
    pub metadata: DatasetMetadata,
    pub instances: Vec<RerankingEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabeledText {
    pub text: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationData {
    pub metadata: DatasetMetadata,
    pub train: Vec<LabeledText>,
    pub test: Vec<LabeledText>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogTurn {
    pub text: String,
    /// Slot name -> value for this turn. Slots absent from the map hold the
    /// empty value and are read as "none".
    #[serde(default)]
    pub state: HashMap<String, String>,
}

impl DialogTurn {
    pub fn slot_value(&self, slot: &str) -> String {
        self.state.get(slot).cloned().unwrap_or_else(|| "none".to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogStateData {
    pub metadata: DatasetMetadata,
    /// Tracked slot names, in report order.
    pub slots: Vec<String>,
    pub train: Vec<DialogTurn>,
    pub test: Vec<DialogTurn>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizationEntry {
    pub text: String,
    pub human_summaries: Vec<String>,
    pub machine_summaries: Vec<String>,
    pub gold_scores: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizationData {
    pub metadata: DatasetMetadata,
    pub texts: Vec<SummarizationEntry>,
}

/// A loaded, validated dataset of any family.
#[derive(Debug, Clone)]
pub enum Dataset {
    Clustering(ClusteringData),
    PairClassification(PairData),
    Sts(StsData),
    Retrieval(RetrievalData),
    Reranking(RerankingData),
    Classification(ClassificationData),
    DialogStateTracking(DialogStateData),
    Summarization(SummarizationData),
}

impl Dataset {
    /// Load a dataset file, dispatching on the `task` field of its metadata
    /// header, and validate it.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read dataset file: {:?}", path))?;

        #[derive(Deserialize)]
        struct Header {
            metadata: DatasetMetadata,
        }
        let header: Header = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse dataset metadata: {:?}", path))?;

        let parse_context = || format!("Failed to parse {} dataset: {:?}", header.metadata.task.name(), path);
        let dataset = match header.metadata.task {
            TaskFamily::Clustering => {
                Self::Clustering(serde_json::from_str(&content).with_context(parse_context)?)
            }
            TaskFamily::PairClassification => {
                Self::PairClassification(serde_json::from_str(&content).with_context(parse_context)?)
            }
            TaskFamily::Sts => Self::Sts(serde_json::from_str(&content).with_context(parse_context)?),
            TaskFamily::Retrieval => {
                Self::Retrieval(serde_json::from_str(&content).with_context(parse_context)?)
            }
            TaskFamily::Reranking => {
                Self::Reranking(serde_json::from_str(&content).with_context(parse_context)?)
            }
            TaskFamily::Classification => {
                Self::Classification(serde_json::from_str(&content).with_context(parse_context)?)
            }
            TaskFamily::DialogStateTracking => {
                Self::DialogStateTracking(serde_json::from_str(&content).with_context(parse_context)?)
            }
            TaskFamily::Summarization => {
                Self::Summarization(serde_json::from_str(&content).with_context(parse_context)?)
            }
        };

        dataset
            .validate()
            .with_context(|| format!("Invalid dataset: {:?}", path))?;
        Ok(dataset)
    }

    pub fn metadata(&self) -> &DatasetMetadata {
        match self {
            Self::Clustering(d) => &d.metadata,
            Self::PairClassification(d) => &d.metadata,
            Self::Sts(d) => &d.metadata,
            Self::Retrieval(d) => &d.metadata,
            Self::Reranking(d) => &d.metadata,
            Self::Classification(d) => &d.metadata,
            Self::DialogStateTracking(d) => &d.metadata,
            Self::Summarization(d) => &d.metadata,
        }
    }

    pub fn task(&self) -> TaskFamily {
        self.metadata().task
    }

    /// Number of primary records (items, pairs, queries, instances, turns).
    pub fn len(&self) -> usize {
        match self {
            Self::Clustering(d) => d.sentences.len(),
            Self::PairClassification(d) => d.labels.len(),
            Self::Sts(d) => d.scores.len(),
            Self::Retrieval(d) => d.queries.len(),
            Self::Reranking(d) => d.instances.len(),
            Self::Classification(d) => d.test.len(),
            Self::DialogStateTracking(d) => d.test.len(),
            Self::Summarization(d) => d.texts.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Shape invariants checked at load time.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Clustering(d) => {
                ensure!(!d.sentences.is_empty(), "no sentences");
                ensure!(
                    d.sentences.len() == d.labels.len(),
                    "{} sentences but {} label entries",
                    d.sentences.len(),
                    d.labels.len()
                );
            }
            Self::PairClassification(d) => {
                ensure!(
                    d.sentence1.len() == d.sentence2.len() && d.sentence1.len() == d.labels.len(),
                    "pair arrays disagree: {} / {} / {} labels",
                    d.sentence1.len(),
                    d.sentence2.len(),
                    d.labels.len()
                );
                ensure!(!d.labels.is_empty(), "no pairs");
                for (i, &label) in d.labels.iter().enumerate() {
                    ensure!(label <= 1, "pair {} has label {}; labels must be 0 or 1", i, label);
                }
                ensure!(
                    d.labels.iter().any(|&l| l == 1) && d.labels.iter().any(|&l| l == 0),
                    "labels must contain both classes"
                );
            }
            Self::Sts(d) => {
                ensure!(
                    d.sentence1.len() == d.sentence2.len() && d.sentence1.len() == d.scores.len(),
                    "STS arrays disagree: {} / {} / {} scores",
                    d.sentence1.len(),
                    d.sentence2.len(),
                    d.scores.len()
                );
                ensure!(!d.scores.is_empty(), "no pairs");
                ensure!(
                    d.max_score > d.min_score,
                    "invalid score range [{}, {}]",
                    d.min_score,
                    d.max_score
                );
            }
            Self::Retrieval(d) => {
                ensure!(!d.queries.is_empty(), "no queries");
                ensure!(!d.corpus.is_empty(), "empty corpus");
                for query in &d.queries {
                    if !d.qrels.contains_key(&query.id) {
                        bail!("query '{}' has no relevance judgments", query.id);
                    }
                }
            }
            Self::Reranking(d) => {
                ensure!(!d.instances.is_empty(), "no instances");
            }
            Self::Classification(d) => {
                ensure!(!d.train.is_empty(), "empty train split");
                ensure!(!d.test.is_empty(), "empty test split");
            }
            Self::DialogStateTracking(d) => {
                ensure!(!d.slots.is_empty(), "no tracked slots");
                ensure!(!d.train.is_empty(), "empty train split");
                ensure!(!d.test.is_empty(), "empty test split");
            }
            Self::Summarization(d) => {
                ensure!(!d.texts.is_empty(), "no texts");
                for (i, entry) in d.texts.iter().enumerate() {
                    ensure!(
                        entry.machine_summaries.len() == entry.gold_scores.len(),
                        "text {}: {} machine summaries but {} gold scores",
                        i,
                        entry.machine_summaries.len(),
                        entry.gold_scores.len()
                    );
                    ensure!(!entry.human_summaries.is_empty(), "text {}: no human summaries", i);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(task: TaskFamily) -> DatasetMetadata {
        DatasetMetadata {
            name: "test".to_string(),
            task,
            description: String::new(),
            version: None,
        }
    }

    #[test]
    fn test_clustering_json_round_trip() {
        let json = r#"{
            "metadata": { "name": "news", "task": "clustering" },
            "sentences": ["a", "b", "c"],
            "labels": ["x", ["y", "y1"], "x"]
        }"#;
        let data: ClusteringData = serde_json::from_str(json).unwrap();
        let levels = data.label_levels();
        assert_eq!(levels[0], vec!["x"]);
        assert_eq!(levels[1], vec!["y", "y1"]);

        let dataset = Dataset::Clustering(data);
        dataset.validate().unwrap();
        assert_eq!(dataset.task(), TaskFamily::Clustering);
        assert_eq!(dataset.len(), 3);
    }

    #[test]
    fn test_pair_validation() {
        let mut data = PairData {
            metadata: metadata(TaskFamily::PairClassification),
            sentence1: vec!["a".into(), "b".into()],
            sentence2: vec!["c".into(), "d".into()],
            labels: vec![1, 0],
        };
        Dataset::PairClassification(data.clone()).validate().unwrap();

        data.labels = vec![1, 2];
        assert!(Dataset::PairClassification(data.clone()).validate().is_err());

        data.labels = vec![1, 1];
        assert!(Dataset::PairClassification(data).validate().is_err());
    }

    #[test]
    fn test_sts_validation() {
        let data = StsData {
            metadata: metadata(TaskFamily::Sts),
            sentence1: vec!["a".into()],
            sentence2: vec!["b".into()],
            scores: vec![2.5],
            min_score: 0.0,
            max_score: 0.0,
        };
        assert!(Dataset::Sts(data).validate().is_err());
    }

    #[test]
    fn test_retrieval_requires_qrels() {
        let data = RetrievalData {
            metadata: metadata(TaskFamily::Retrieval),
            queries: vec![RetrievalEntry { id: "q1".into(), text: "query".into() }],
            corpus: vec![RetrievalEntry { id: "d1".into(), text: "doc".into() }],
            qrels: HashMap::new(),
        };
        assert!(Dataset::Retrieval(data).validate().is_err());
    }

    #[test]
    fn test_dialog_turn_missing_slot_reads_none() {
        let turn = DialogTurn {
            text: "book a table".to_string(),
            state: HashMap::from([("area".to_string(), "north".to_string())]),
        };
        assert_eq!(turn.slot_value("area"), "north");
        assert_eq!(turn.slot_value("food"), "none");
    }

    #[test]
    fn test_load_dispatches_on_task() {
        let dir = std::env::temp_dir().join("embedding-eval-data-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("pairs.json");
        std::fs::write(
            &path,
            r#"{
                "metadata": { "name": "p", "task": "pair_classification" },
                "sentence1": ["a", "b"],
                "sentence2": ["c", "d"],
                "labels": [1, 0]
            }"#,
        )
        .unwrap();

        let dataset = Dataset::load(&path).unwrap();
        assert!(matches!(dataset, Dataset::PairClassification(_)));
        assert_eq!(dataset.metadata().name, "p");
    }
}
