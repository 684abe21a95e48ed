//! Classification and dialog-state-tracking evaluation.
//!
//! Embedding quality is measured by how well a k-nearest-neighbor classifier
//! over the vectors recovers gold labels. To keep large training splits from
//! dominating, each of `n_experiments` runs undersamples the train split to
//! at most `samples_per_label` items per class (drawn with the shared RNG),
//! fits kNN on the subsample, and scores the test split; accuracy and
//! macro-F1 are averaged over experiments with their standard deviation.
//!
//! Dialog-state tracking reuses the same machinery per tracked slot and
//! additionally reports joint accuracy: the fraction of test turns whose
//! every slot is predicted correctly.

use anyhow::{ensure, Result};
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::metrics::stats::mean_std;
use crate::similarity::cosine_similarity;

/// Tunables for the bootstrapped kNN evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationParams {
    /// Undersample-and-score repetitions.
    #[serde(default = "default_n_experiments")]
    pub n_experiments: usize,

    /// Train items kept per class in each experiment.
    #[serde(default = "default_samples_per_label")]
    pub samples_per_label: usize,

    /// Neighbors consulted per prediction.
    #[serde(default = "default_k")]
    pub k: usize,
}

fn default_n_experiments() -> usize {
    10
}
fn default_samples_per_label() -> usize {
    8
}
fn default_k() -> usize {
    3
}

impl Default for ClassificationParams {
    fn default() -> Self {
        Self {
            n_experiments: default_n_experiments(),
            samples_per_label: default_samples_per_label(),
            k: default_k(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationScores {
    /// Mean accuracy over experiments. Main score.
    pub accuracy: f64,
    pub accuracy_std: f64,
    /// Mean macro-F1 over experiments.
    pub f1: f64,
    pub f1_std: f64,
    pub per_experiment_accuracy: Vec<f64>,
    pub per_experiment_f1: Vec<f64>,
}

impl ClassificationScores {
    pub fn format_summary(&self) -> String {
        format!(
            "Acc: {:.1}% ± {:.1}% | macro-F1: {:.3}",
            self.accuracy * 100.0,
            self.accuracy_std * 100.0,
            self.f1
        )
    }
}

/// Gold label series for one tracked dialog slot.
#[derive(Debug, Clone)]
pub struct SlotSeries {
    pub name: String,
    pub train: Vec<String>,
    pub test: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotScores {
    pub slot: String,
    pub accuracy: f64,
    pub f1: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DstScores {
    /// Fraction of test turns with every slot correct, averaged over
    /// experiments. Main score.
    pub joint_accuracy: f64,
    pub per_slot: Vec<SlotScores>,
}

impl DstScores {
    pub fn format_summary(&self) -> String {
        format!(
            "joint Acc: {:.1}% | {} slots",
            self.joint_accuracy * 100.0,
            self.per_slot.len()
        )
    }
}

/// Classify `test` rows by cosine-distance kNN over `train` rows.
///
/// Votes are counted among the `k` most similar train rows; vote ties break
/// toward the label with the larger summed similarity, then lexically, so
/// predictions are deterministic.
pub fn knn_predict(
    train_embeddings: &[&[f32]],
    train_labels: &[&str],
    test_embeddings: &[Vec<f32>],
    k: usize,
) -> Vec<String> {
    let k = k.min(train_embeddings.len()).max(1);
    test_embeddings
        .iter()
        .map(|row| {
            let mut scored: Vec<(usize, f64)> = train_embeddings
                .iter()
                .enumerate()
                .map(|(i, train_row)| (i, cosine_similarity(row, train_row)))
                .collect();
            scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

            let mut votes: BTreeMap<&str, (usize, f64)> = BTreeMap::new();
            for &(i, sim) in scored.iter().take(k) {
                let entry = votes.entry(train_labels[i]).or_insert((0, 0.0));
                entry.0 += 1;
                entry.1 += sim;
            }
            votes
                .iter()
                .max_by(|a, b| {
                    (a.1 .0, a.1 .1)
                        .partial_cmp(&(b.1 .0, b.1 .1))
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .map(|(label, _)| label.to_string())
                .unwrap_or_default()
        })
        .collect()
}

/// Fraction of exact prediction matches.
pub fn accuracy_score(predictions: &[String], gold: &[String]) -> f64 {
    if gold.is_empty() {
        return 0.0;
    }
    let hits = predictions
        .iter()
        .zip(gold.iter())
        .filter(|(p, g)| p == g)
        .count();
    hits as f64 / gold.len() as f64
}

/// Macro-averaged F1 over the union of predicted and gold classes.
pub fn macro_f1(predictions: &[String], gold: &[String]) -> f64 {
    let classes: BTreeSet<&String> = predictions.iter().chain(gold.iter()).collect();
    if classes.is_empty() {
        return 0.0;
    }

    let mut f1_sum = 0.0;
    for class in &classes {
        let mut tp = 0usize;
        let mut fp = 0usize;
        let mut fn_ = 0usize;
        for (p, g) in predictions.iter().zip(gold.iter()) {
            match (&p == class, &g == class) {
                (true, true) => tp += 1,
                (true, false) => fp += 1,
                (false, true) => fn_ += 1,
                (false, false) => {}
            }
        }
        if tp > 0 {
            let precision = tp as f64 / (tp + fp) as f64;
            let recall = tp as f64 / (tp + fn_) as f64;
            f1_sum += 2.0 * precision * recall / (precision + recall);
        }
    }
    f1_sum / classes.len() as f64
}

/// Draw at most `samples_per_label` train indices per class, shuffled with
/// the shared RNG. Classes iterate in sorted order so a fixed seed gives a
/// fixed subsample.
fn undersample_per_label(
    labels: &[String],
    samples_per_label: usize,
    rng: &mut ChaCha8Rng,
) -> Vec<usize> {
    let mut by_label: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (i, label) in labels.iter().enumerate() {
        by_label.entry(label.as_str()).or_default().push(i);
    }

    let mut sampled = Vec::new();
    for indices in by_label.values_mut() {
        indices.shuffle(rng);
        sampled.extend(indices.iter().take(samples_per_label));
    }
    sampled
}

/// Bootstrapped kNN classification evaluation.
pub fn evaluate_classification(
    train_embeddings: &[Vec<f32>],
    train_labels: &[String],
    test_embeddings: &[Vec<f32>],
    test_labels: &[String],
    params: &ClassificationParams,
    rng: &mut ChaCha8Rng,
) -> Result<ClassificationScores> {
    validate_split(train_embeddings, train_labels, "train")?;
    validate_split(test_embeddings, test_labels, "test")?;
    ensure!(params.n_experiments >= 1, "n_experiments must be at least 1");
    ensure!(params.samples_per_label >= 1, "samples_per_label must be at least 1");
    ensure!(params.k >= 1, "k must be at least 1");

    let mut per_experiment_accuracy = Vec::with_capacity(params.n_experiments);
    let mut per_experiment_f1 = Vec::with_capacity(params.n_experiments);

    for _ in 0..params.n_experiments {
        let sampled = undersample_per_label(train_labels, params.samples_per_label, rng);
        let sub_embeddings: Vec<&[f32]> =
            sampled.iter().map(|&i| train_embeddings[i].as_slice()).collect();
        let sub_labels: Vec<&str> = sampled.iter().map(|&i| train_labels[i].as_str()).collect();

        let predictions = knn_predict(&sub_embeddings, &sub_labels, test_embeddings, params.k);
        per_experiment_accuracy.push(accuracy_score(&predictions, test_labels));
        per_experiment_f1.push(macro_f1(&predictions, test_labels));
    }

    let (accuracy, accuracy_std) = mean_std(&per_experiment_accuracy)?;
    let (f1, f1_std) = mean_std(&per_experiment_f1)?;

    Ok(ClassificationScores {
        accuracy,
        accuracy_std,
        f1,
        f1_std,
        per_experiment_accuracy,
        per_experiment_f1,
    })
}

/// Dialog-state tracking: per-slot kNN classification plus joint accuracy.
///
/// All slots share the turn embeddings; each experiment draws a fresh train
/// subsample per slot. A test turn counts toward joint accuracy only when
/// every slot is predicted correctly in that experiment.
pub fn evaluate_dialog_state(
    train_embeddings: &[Vec<f32>],
    test_embeddings: &[Vec<f32>],
    slots: &[SlotSeries],
    params: &ClassificationParams,
    rng: &mut ChaCha8Rng,
) -> Result<DstScores> {
    ensure!(!slots.is_empty(), "no slots to evaluate");
    ensure!(!train_embeddings.is_empty(), "empty train split");
    ensure!(!test_embeddings.is_empty(), "empty test split");
    ensure!(params.n_experiments >= 1, "n_experiments must be at least 1");
    ensure!(params.samples_per_label >= 1, "samples_per_label must be at least 1");
    ensure!(params.k >= 1, "k must be at least 1");
    for slot in slots {
        ensure!(
            slot.train.len() == train_embeddings.len(),
            "slot '{}' has {} train labels for {} train embeddings",
            slot.name,
            slot.train.len(),
            train_embeddings.len()
        );
        ensure!(
            slot.test.len() == test_embeddings.len(),
            "slot '{}' has {} test labels for {} test embeddings",
            slot.name,
            slot.test.len(),
            test_embeddings.len()
        );
    }

    let n_test = test_embeddings.len();
    let mut joint_per_experiment = Vec::with_capacity(params.n_experiments);
    let mut slot_accuracy: Vec<Vec<f64>> = vec![Vec::new(); slots.len()];
    let mut slot_f1: Vec<Vec<f64>> = vec![Vec::new(); slots.len()];

    for _ in 0..params.n_experiments {
        let mut all_correct = vec![true; n_test];
        for (s, slot) in slots.iter().enumerate() {
            let sampled = undersample_per_label(&slot.train, params.samples_per_label, rng);
            let sub_embeddings: Vec<&[f32]> =
                sampled.iter().map(|&i| train_embeddings[i].as_slice()).collect();
            let sub_labels: Vec<&str> = sampled.iter().map(|&i| slot.train[i].as_str()).collect();

            let predictions = knn_predict(&sub_embeddings, &sub_labels, test_embeddings, params.k);
            for (i, (p, g)) in predictions.iter().zip(slot.test.iter()).enumerate() {
                if p != g {
                    all_correct[i] = false;
                }
            }
            slot_accuracy[s].push(accuracy_score(&predictions, &slot.test));
            slot_f1[s].push(macro_f1(&predictions, &slot.test));
        }
        let joint = all_correct.iter().filter(|&&c| c).count() as f64 / n_test as f64;
        joint_per_experiment.push(joint);
    }

    let (joint_accuracy, _) = mean_std(&joint_per_experiment)?;
    let per_slot = slots
        .iter()
        .enumerate()
        .map(|(s, slot)| {
            Ok(SlotScores {
                slot: slot.name.clone(),
                accuracy: mean_std(&slot_accuracy[s])?.0,
                f1: mean_std(&slot_f1[s])?.0,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(DstScores {
        joint_accuracy,
        per_slot,
    })
}

fn validate_split(embeddings: &[Vec<f32>], labels: &[String], split: &str) -> Result<()> {
    ensure!(!embeddings.is_empty(), "empty {} split", split);
    ensure!(
        embeddings.len() == labels.len(),
        "{} split has {} embeddings but {} labels",
        split,
        embeddings.len(),
        labels.len()
    );
    Ok(())
}
