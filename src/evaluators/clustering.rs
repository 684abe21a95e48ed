//! Bootstrapped clustering evaluation.
//!
//! Given embeddings and (possibly hierarchical) gold cluster labels, the
//! evaluator repeatedly draws fixed-size bootstrap samples, clusters each
//! sample with mini-batch k-means, and scores the assignment against the
//! gold labels with V-measure. Labels form a per-item hierarchy (top-level
//! category, sub-category, ...); items may lack deeper levels, and each
//! level is evaluated over the items that define it. The headline score is
//! the mean V-measure pooled across every trial of every level, with its
//! standard deviation as the dispersion estimate.
//!
//! The cluster count at a level always equals the number of distinct gold
//! labels observed there, so clustering granularity matches ground truth.

use anyhow::{bail, ensure, Result};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::warn;

use crate::kmeans::MiniBatchKMeans;
use crate::metrics::stats::mean_std;
use crate::metrics::vmeasure::v_measure;

/// Tunables for the bootstrapped clustering evaluator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusteringParams {
    /// Bootstrap repetitions per hierarchy level.
    #[serde(default = "default_num_trials")]
    pub num_trials: usize,

    /// Items drawn per trial, with replacement.
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,

    /// Mini-batch size for the underlying k-means.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Cap on how many hierarchy levels to evaluate. Unset means every
    /// level present in the data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<usize>,
}

fn default_num_trials() -> usize {
    10
}
fn default_sample_size() -> usize {
    16_384
}
fn default_batch_size() -> usize {
    512
}

impl Default for ClusteringParams {
    fn default() -> Self {
        Self {
            num_trials: default_num_trials(),
            sample_size: default_sample_size(),
            batch_size: default_batch_size(),
            max_depth: None,
        }
    }
}

/// V-measure scores collected at one hierarchy level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelScores {
    /// Hierarchy depth, 0 = top level.
    pub level: usize,
    /// One V-measure per bootstrap trial.
    pub scores: Vec<f64>,
}

impl LevelScores {
    pub fn name(&self) -> String {
        format!("Level {}", self.level)
    }
}

/// Result of a bootstrapped clustering evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusteringScores {
    /// Mean V-measure pooled across all levels and trials. Main score.
    pub v_measure: f64,
    /// Standard deviation of the pooled scores.
    pub v_measure_std: f64,
    /// Per-level score lists, retained for inspection.
    pub levels: Vec<LevelScores>,
}

impl ClusteringScores {
    pub fn format_summary(&self) -> String {
        format!(
            "V-measure: {:.3} ± {:.3} ({} levels, {} trials)",
            self.v_measure,
            self.v_measure_std,
            self.levels.len(),
            self.levels.iter().map(|l| l.scores.len()).sum::<usize>(),
        )
    }
}

/// Run the bootstrapped clustering evaluation.
///
/// `labels[i]` is the label hierarchy of item `i`, outermost level first;
/// lists may vary in length, and an item only participates in the levels it
/// defines. Each of the `num_trials` trials per level draws `sample_size`
/// item indices with replacement from the level pool using `rng`, refits
/// k-means on the sampled embeddings, and records the V-measure of the
/// resulting assignment against the sampled gold labels.
///
/// # Errors
///
/// - `embeddings` and `labels` differ in length, or either is empty
/// - no item defines any label level
/// - a level has fewer than 2 distinct labels
/// - `sample_size` is below the distinct-label count of some level
pub fn evaluate_clustering_bootstrapped(
    embeddings: &[Vec<f32>],
    labels: &[Vec<String>],
    params: &ClusteringParams,
    rng: &mut ChaCha8Rng,
) -> Result<ClusteringScores> {
    ensure!(
        embeddings.len() == labels.len(),
        "got {} embeddings but {} label lists",
        embeddings.len(),
        labels.len()
    );
    ensure!(!embeddings.is_empty(), "no items to evaluate");
    ensure!(params.num_trials >= 1, "num_trials must be at least 1");
    ensure!(params.sample_size >= 1, "sample_size must be at least 1");

    let deepest = labels.iter().map(|l| l.len()).max().unwrap_or(0);
    if deepest == 0 {
        bail!("every item has an empty label hierarchy; nothing to evaluate");
    }
    let depth = match params.max_depth {
        Some(d) => d.min(deepest),
        None => deepest,
    };

    let mut levels = Vec::with_capacity(depth);
    for level in 0..depth {
        // Level view: items that define a label at this depth.
        let mut pool_embeddings: Vec<&[f32]> = Vec::new();
        let mut pool_labels: Vec<&str> = Vec::new();
        for (embedding, hierarchy) in embeddings.iter().zip(labels.iter()) {
            if let Some(label) = hierarchy.get(level) {
                pool_embeddings.push(embedding.as_slice());
                pool_labels.push(label.as_str());
            }
        }

        let pool = pool_labels.len();
        let distinct: usize = pool_labels.iter().collect::<HashSet<_>>().len();
        ensure!(
            distinct >= 2,
            "label level {} has {} distinct class(es) across {} item(s); \
             clustering needs at least 2",
            level,
            distinct,
            pool
        );
        ensure!(
            params.sample_size >= distinct,
            "sample_size {} is below the {} distinct labels of level {}",
            params.sample_size,
            distinct,
            level
        );

        if params.sample_size > pool {
            warn!(
                level,
                pool,
                sample_size = params.sample_size,
                "bootstrap sample exceeds the level pool; \
                 sampling with replacement limits diversity"
            );
        }

        let model = MiniBatchKMeans::new(distinct, params.batch_size);
        let mut scores = Vec::with_capacity(params.num_trials);
        for _ in 0..params.num_trials {
            let sampled: Vec<usize> = (0..params.sample_size)
                .map(|_| rng.gen_range(0..pool))
                .collect();
            let rows: Vec<&[f32]> = sampled.iter().map(|&i| pool_embeddings[i]).collect();
            let gold: Vec<&str> = sampled.iter().map(|&i| pool_labels[i]).collect();

            let assignment = model.fit_predict(&rows, rng)?;
            scores.push(v_measure(&gold, &assignment));
        }

        levels.push(LevelScores { level, scores });
    }

    let pooled: Vec<f64> = levels.iter().flat_map(|l| l.scores.iter().copied()).collect();
    let (v, v_std) = mean_std(&pooled)?;

    Ok(ClusteringScores {
        v_measure: v,
        v_measure_std: v_std,
        levels,
    })
}
