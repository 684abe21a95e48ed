//! Mini-batch k-means over embedding rows.
//!
//! The clustering primitive behind the bootstrapped clustering evaluator:
//! configured with a target cluster count and a batch size, it exposes a
//! single fit-and-predict operation returning one integer cluster id per
//! input row. Centers are seeded with k-means++ (a few restarts, best
//! inertia kept) and refined with counts-based mini-batch updates
//! (Sculley 2010). Every random draw comes from the caller's RNG, so runs
//! are reproducible under a fixed seed.

use anyhow::{ensure, Result};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

/// Mini-batch k-means configuration. Construct with [`MiniBatchKMeans::new`],
/// tune with the builder methods, run with [`MiniBatchKMeans::fit_predict`].
#[derive(Debug, Clone)]
pub struct MiniBatchKMeans {
    /// Number of clusters.
    n_clusters: usize,
    /// Rows sampled per update step.
    batch_size: usize,
    /// Maximum update steps.
    max_iter: usize,
    /// k-means++ seeding restarts; the seeding with the lowest inertia wins.
    n_init: usize,
    /// Early-stop threshold on the total squared center movement per step.
    tol: f64,
}

impl MiniBatchKMeans {
    pub fn new(n_clusters: usize, batch_size: usize) -> Self {
        Self {
            n_clusters,
            batch_size,
            max_iter: 100,
            n_init: 3,
            tol: 1e-6,
        }
    }

    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init;
        self
    }

    pub fn tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Fit on `data` and return a cluster id in `0..n_clusters` per row.
    ///
    /// # Errors
    ///
    /// Fails on empty input, a cluster count of zero or above the row count,
    /// or rows of unequal dimension.
    pub fn fit_predict(&self, data: &[&[f32]], rng: &mut ChaCha8Rng) -> Result<Vec<usize>> {
        let n = data.len();
        let k = self.n_clusters;

        ensure!(n > 0, "cannot cluster an empty set of rows");
        ensure!(
            k >= 1 && k <= n,
            "cluster count must be between 1 and {} (number of rows), got {}",
            n,
            k
        );
        ensure!(self.batch_size > 0, "batch size must be at least 1");

        let dim = data[0].len();
        for (i, row) in data.iter().enumerate() {
            ensure!(
                row.len() == dim,
                "row {} has dimension {}, expected {}",
                i,
                row.len(),
                dim
            );
        }

        // Seeding: a few k-means++ restarts, keep the one with lowest inertia.
        let mut centers = kmeans_plus_plus(data, k, rng);
        if self.n_init > 1 {
            let mut best_inertia = inertia(data, &centers);
            for _ in 1..self.n_init {
                let candidate = kmeans_plus_plus(data, k, rng);
                let candidate_inertia = inertia(data, &candidate);
                if candidate_inertia < best_inertia {
                    best_inertia = candidate_inertia;
                    centers = candidate;
                }
            }
        }

        // Mini-batch refinement with per-center counts-based learning rates.
        let batch = self.batch_size.min(n);
        let mut counts = vec![0u64; k];
        for _ in 0..self.max_iter {
            let mut shift_sq = 0.0f64;
            for _ in 0..batch {
                let idx = rng.gen_range(0..n);
                let row = data[idx];
                let c = nearest_center(row, &centers);
                counts[c] += 1;
                let eta = 1.0 / counts[c] as f32;
                let center = &mut centers[c];
                for (cv, &xv) in center.iter_mut().zip(row.iter()) {
                    let delta = eta * (xv - *cv);
                    *cv += delta;
                    shift_sq += (delta as f64) * (delta as f64);
                }
            }
            if shift_sq < self.tol {
                break;
            }
        }

        Ok(data.iter().map(|row| nearest_center(row, &centers)).collect())
    }
}

/// k-means++ seeding: first center uniform, each further center sampled with
/// probability proportional to its squared distance from the nearest chosen
/// center (Arthur & Vassilvitskii 2007).
fn kmeans_plus_plus(data: &[&[f32]], k: usize, rng: &mut ChaCha8Rng) -> Vec<Vec<f32>> {
    let n = data.len();
    let mut centers: Vec<Vec<f32>> = Vec::with_capacity(k);

    let first = rng.gen_range(0..n);
    centers.push(data[first].to_vec());

    let mut min_dists = vec![f64::INFINITY; n];
    while centers.len() < k {
        let last = centers.last().expect("at least one center");
        for (i, row) in data.iter().enumerate() {
            let d = squared_distance(row, last) as f64;
            if d < min_dists[i] {
                min_dists[i] = d;
            }
        }

        let total: f64 = min_dists.iter().sum();
        if total <= 0.0 {
            // All rows coincide with a chosen center: fall back to uniform.
            let idx = rng.gen_range(0..n);
            centers.push(data[idx].to_vec());
            continue;
        }

        let target = rng.gen::<f64>() * total;
        let mut cumulative = 0.0;
        let mut chosen = n - 1;
        for (i, &d) in min_dists.iter().enumerate() {
            cumulative += d;
            if cumulative >= target {
                chosen = i;
                break;
            }
        }
        centers.push(data[chosen].to_vec());
    }

    centers
}

fn nearest_center(row: &[f32], centers: &[Vec<f32>]) -> usize {
    let mut best = 0usize;
    let mut best_dist = f32::INFINITY;
    for (c, center) in centers.iter().enumerate() {
        let d = squared_distance(row, center);
        if d < best_dist {
            best_dist = d;
            best = c;
        }
    }
    best
}

fn inertia(data: &[&[f32]], centers: &[Vec<f32>]) -> f64 {
    data.iter()
        .map(|row| {
            centers
                .iter()
                .map(|c| squared_distance(row, c) as f64)
                .fold(f64::INFINITY, f64::min)
        })
        .sum()
}

#[inline]
fn squared_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn two_blobs() -> Vec<Vec<f32>> {
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let mut data = Vec::new();
        for _ in 0..20 {
            data.push(vec![rng.gen::<f32>() * 0.5, rng.gen::<f32>() * 0.5]);
        }
        for _ in 0..20 {
            data.push(vec![
                10.0 + rng.gen::<f32>() * 0.5,
                10.0 + rng.gen::<f32>() * 0.5,
            ]);
        }
        data
    }

    #[test]
    fn test_separates_two_blobs() {
        let data = two_blobs();
        let rows: Vec<&[f32]> = data.iter().map(|r| r.as_slice()).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let labels = MiniBatchKMeans::new(2, 16).fit_predict(&rows, &mut rng).unwrap();

        // Each blob maps to a single cluster, and the blobs differ.
        assert!(labels[..20].iter().all(|&l| l == labels[0]));
        assert!(labels[20..].iter().all(|&l| l == labels[20]));
        assert_ne!(labels[0], labels[20]);
    }

    #[test]
    fn test_deterministic_for_fixed_seed() {
        let data = two_blobs();
        let rows: Vec<&[f32]> = data.iter().map(|r| r.as_slice()).collect();
        let model = MiniBatchKMeans::new(2, 16);

        let mut rng1 = ChaCha8Rng::seed_from_u64(5);
        let mut rng2 = ChaCha8Rng::seed_from_u64(5);
        let a = model.fit_predict(&rows, &mut rng1).unwrap();
        let b = model.fit_predict(&rows, &mut rng2).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_identical_rows_do_not_panic() {
        let data = vec![vec![1.0f32, 2.0]; 10];
        let rows: Vec<&[f32]> = data.iter().map(|r| r.as_slice()).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let labels = MiniBatchKMeans::new(3, 4).fit_predict(&rows, &mut rng).unwrap();
        assert_eq!(labels.len(), 10);
        assert!(labels.iter().all(|&l| l < 3));
    }

    #[test]
    fn test_invalid_configurations() {
        let data = vec![vec![0.0f32, 1.0], vec![1.0, 0.0]];
        let rows: Vec<&[f32]> = data.iter().map(|r| r.as_slice()).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        assert!(MiniBatchKMeans::new(0, 4).fit_predict(&rows, &mut rng).is_err());
        assert!(MiniBatchKMeans::new(3, 4).fit_predict(&rows, &mut rng).is_err());
        assert!(MiniBatchKMeans::new(1, 4).fit_predict(&[], &mut rng).is_err());
    }

    #[test]
    fn test_dimension_mismatch() {
        let a = vec![0.0f32, 1.0];
        let b = vec![1.0f32];
        let rows: Vec<&[f32]> = vec![&a, &b];
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        assert!(MiniBatchKMeans::new(1, 4).fit_predict(&rows, &mut rng).is_err());
    }

    #[test]
    fn test_labels_in_range() {
        let data = two_blobs();
        let rows: Vec<&[f32]> = data.iter().map(|r| r.as_slice()).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let labels = MiniBatchKMeans::new(5, 8).fit_predict(&rows, &mut rng).unwrap();
        assert!(labels.iter().all(|&l| l < 5));
    }
}
