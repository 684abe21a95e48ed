//! Summary statistics and correlation coefficients.
//!
//! Population (biased) variance throughout, matching the conventions of the
//! numeric libraries the gold scores in our reference datasets were produced
//! with.

use anyhow::{bail, ensure, Result};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Arithmetic mean.
///
/// Errors on empty input rather than returning NaN: an empty score list
/// always indicates an upstream bug or a degenerate dataset.
pub fn mean(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        bail!("cannot compute mean of an empty slice");
    }
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> Result<f64> {
    let m = mean(values)?;
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    Ok(variance.sqrt())
}

/// Mean and population standard deviation in one pass over the mean.
pub fn mean_std(values: &[f64]) -> Result<(f64, f64)> {
    let m = mean(values)?;
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    Ok((m, variance.sqrt()))
}

/// Pearson correlation coefficient.
///
/// Returns 0.0 when either input has zero variance or the slices are empty
/// or of unequal length - a flat series carries no linear signal.
pub fn pearson_correlation(x: &[f64], y: &[f64]) -> f64 {
    if x.len() != y.len() || x.is_empty() {
        return 0.0;
    }

    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;

    for (xi, yi) in x.iter().zip(y.iter()) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return 0.0;
    }

    cov / (var_x.sqrt() * var_y.sqrt())
}

/// Spearman rank correlation: Pearson over average ranks.
///
/// Ties receive the mean of the ranks they span (fractional ranks), so the
/// coefficient agrees with the tie-corrected definition.
pub fn spearman_correlation(x: &[f64], y: &[f64]) -> f64 {
    if x.len() != y.len() || x.is_empty() {
        return 0.0;
    }
    let rx = average_ranks(x);
    let ry = average_ranks(y);
    pearson_correlation(&rx, &ry)
}

/// Assign 1-based average ranks, ties sharing the mean rank of their span.
fn average_ranks(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        values[a]
            .partial_cmp(&values[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut ranks = vec![0.0; n];
    let mut i = 0;
    while i < n {
        // Find the run of equal values starting at sorted position i.
        let mut j = i + 1;
        while j < n && values[order[j]] == values[order[i]] {
            j += 1;
        }
        // Positions i..j (0-based) correspond to ranks i+1..j+1.
        let avg_rank = (i + j + 1) as f64 / 2.0;
        for &idx in &order[i..j] {
            ranks[idx] = avg_rank;
        }
        i = j;
    }
    ranks
}

/// Bootstrap confidence interval over a set of per-query scores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub mean: f64,
    pub lower: f64,
    pub upper: f64,
    pub confidence_level: f64,
}

/// Percentile-bootstrap confidence interval for the mean of `values`.
///
/// Resamples `values` with replacement `n_bootstrap` times using the shared
/// RNG, so the interval is reproducible under a fixed seed.
pub fn bootstrap_confidence_interval(
    values: &[f64],
    confidence_level: f64,
    n_bootstrap: usize,
    rng: &mut ChaCha8Rng,
) -> Result<ConfidenceInterval> {
    ensure!(n_bootstrap >= 1, "n_bootstrap must be at least 1");
    let (m, _) = mean_std(values)?;
    let n = values.len();

    let mut bootstrap_means: Vec<f64> = Vec::with_capacity(n_bootstrap);
    for _ in 0..n_bootstrap {
        let mut sum = 0.0;
        for _ in 0..n {
            sum += values[rng.gen_range(0..n)];
        }
        bootstrap_means.push(sum / n as f64);
    }

    bootstrap_means.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let alpha = 1.0 - confidence_level;
    let lower_idx = ((alpha / 2.0) * n_bootstrap as f64) as usize;
    let upper_idx = (((1.0 - alpha / 2.0) * n_bootstrap as f64) as usize).min(n_bootstrap - 1);

    Ok(ConfidenceInterval {
        mean: m,
        lower: bootstrap_means.get(lower_idx).copied().unwrap_or(m),
        upper: bootstrap_means.get(upper_idx).copied().unwrap_or(m),
        confidence_level,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_mean_std() {
        let values = vec![1.0, 2.0, 3.0, 4.0];
        let (m, s) = mean_std(&values).unwrap();
        assert!((m - 2.5).abs() < 1e-12);
        // Population std of [1,2,3,4] = sqrt(1.25)
        assert!((s - 1.25f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_mean_empty_errors() {
        assert!(mean(&[]).is_err());
        assert!(std_dev(&[]).is_err());
    }

    #[test]
    fn test_pearson_perfect() {
        let x = vec![1.0, 2.0, 3.0, 4.0];
        let y = vec![2.0, 4.0, 6.0, 8.0];
        assert!((pearson_correlation(&x, &y) - 1.0).abs() < 1e-12);

        let neg: Vec<f64> = y.iter().map(|v| -v).collect();
        assert!((pearson_correlation(&x, &neg) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_pearson_constant_input() {
        let x = vec![1.0, 1.0, 1.0];
        let y = vec![1.0, 2.0, 3.0];
        assert_eq!(pearson_correlation(&x, &y), 0.0);
    }

    #[test]
    fn test_spearman_monotone() {
        // Monotone but non-linear: Spearman is 1, Pearson is not.
        let x = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let y = vec![1.0, 8.0, 27.0, 64.0, 125.0];
        assert!((spearman_correlation(&x, &y) - 1.0).abs() < 1e-12);
        assert!(pearson_correlation(&x, &y) < 1.0);
    }

    #[test]
    fn test_spearman_ties() {
        let x = vec![1.0, 2.0, 2.0, 3.0];
        let ranks = average_ranks(&x);
        assert_eq!(ranks, vec![1.0, 2.5, 2.5, 4.0]);
    }

    #[test]
    fn test_bootstrap_ci_contains_mean() {
        let values: Vec<f64> = (0..50).map(|i| 0.5 + 0.01 * (i % 7) as f64).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let ci = bootstrap_confidence_interval(&values, 0.95, 1000, &mut rng).unwrap();
        assert!(ci.lower <= ci.mean && ci.mean <= ci.upper);
    }

    #[test]
    fn test_bootstrap_ci_deterministic() {
        let values: Vec<f64> = (0..20).map(|i| (i as f64).sin().abs()).collect();
        let mut rng1 = ChaCha8Rng::seed_from_u64(3);
        let mut rng2 = ChaCha8Rng::seed_from_u64(3);
        let a = bootstrap_confidence_interval(&values, 0.9, 500, &mut rng1).unwrap();
        let b = bootstrap_confidence_interval(&values, 0.9, 500, &mut rng2).unwrap();
        assert_eq!(a.lower, b.lower);
        assert_eq!(a.upper, b.upper);
    }
}
