//! Task family definitions.
//!
//! Every dataset declares one of these families in its metadata header; the
//! runner dispatches to the matching evaluator. The original benchmark
//! suites define hundreds of per-dataset task entries on top of these
//! families - here a dataset file carries its own metadata instead.

use serde::{Deserialize, Serialize};

/// Evaluation task family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskFamily {
    Clustering,
    PairClassification,
    Sts,
    Retrieval,
    Reranking,
    Classification,
    DialogStateTracking,
    Summarization,
}

impl TaskFamily {
    pub fn all() -> [TaskFamily; 8] {
        [
            Self::Clustering,
            Self::PairClassification,
            Self::Sts,
            Self::Retrieval,
            Self::Reranking,
            Self::Classification,
            Self::DialogStateTracking,
            Self::Summarization,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Clustering => "clustering",
            Self::PairClassification => "pair_classification",
            Self::Sts => "sts",
            Self::Retrieval => "retrieval",
            Self::Reranking => "reranking",
            Self::Classification => "classification",
            Self::DialogStateTracking => "dialog_state_tracking",
            Self::Summarization => "summarization",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "clustering" => Some(Self::Clustering),
            "pair_classification" | "pair" => Some(Self::PairClassification),
            "sts" | "similarity" => Some(Self::Sts),
            "retrieval" => Some(Self::Retrieval),
            "reranking" => Some(Self::Reranking),
            "classification" => Some(Self::Classification),
            "dialog_state_tracking" | "dst" => Some(Self::DialogStateTracking),
            "summarization" => Some(Self::Summarization),
            _ => None,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Clustering => "Bootstrapped k-means clustering scored with V-measure",
            Self::PairClassification => "Threshold search over pair similarity scores",
            Self::Sts => "Similarity scores correlated against gold judgments",
            Self::Retrieval => "Ranked corpus retrieval against relevance judgments",
            Self::Reranking => "Candidate-list reranking with known positives",
            Self::Classification => "Bootstrapped kNN classification over embeddings",
            Self::DialogStateTracking => "Per-slot classification with joint accuracy",
            Self::Summarization => "Summary quality correlation against human scores",
        }
    }

    /// Name of the headline metric in the score struct.
    pub fn main_score(&self) -> &'static str {
        match self {
            Self::Clustering => "v_measure",
            Self::PairClassification => "max_average_precision",
            Self::Sts => "cosine_spearman",
            Self::Retrieval => "ndcg_at_10",
            Self::Reranking => "map",
            Self::Classification => "accuracy",
            Self::DialogStateTracking => "joint_accuracy",
            Self::Summarization => "spearman",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str() {
        assert_eq!(TaskFamily::from_str("clustering"), Some(TaskFamily::Clustering));
        assert_eq!(TaskFamily::from_str("dst"), Some(TaskFamily::DialogStateTracking));
        assert_eq!(TaskFamily::from_str("STS"), Some(TaskFamily::Sts));
        assert_eq!(TaskFamily::from_str("unknown"), None);
    }

    #[test]
    fn test_serde_round_trip() {
        for family in TaskFamily::all() {
            let json = serde_json::to_string(&family).unwrap();
            assert_eq!(json, format!("\"{}\"", family.name()));
            let back: TaskFamily = serde_json::from_str(&json).unwrap();
            assert_eq!(back, family);
        }
    }
}
