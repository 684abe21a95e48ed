//! V-measure: external validation of a clustering against gold labels.
//!
//! Homogeneity measures whether each cluster contains only members of a
//! single class; completeness measures whether all members of a class land
//! in the same cluster. V-measure is their harmonic mean. All three are
//! bounded to [0, 1] and invariant to any relabeling of either partition,
//! which is why cluster assignments with arbitrary integer ids can be scored
//! against string gold labels directly.
//!
//! Reference: Rosenberg & Hirschberg (2007). "V-Measure: A conditional
//! entropy-based external cluster evaluation measure."

use std::collections::HashMap;
use std::hash::Hash;

/// Homogeneity, completeness, and V-measure of `pred` against `gold`.
///
/// Entropies use natural log over the joint contingency table. Degenerate
/// partitions are defined rather than erroneous: a single-class gold
/// partition has homogeneity 1, a single-cluster prediction has
/// completeness 1, and if both terms are 0 the V-measure is 0 (no division
/// by zero).
///
/// Returns `(0.0, 0.0, 0.0)` for empty or length-mismatched input.
pub fn homogeneity_completeness_v_measure<G, P>(gold: &[G], pred: &[P]) -> (f64, f64, f64)
where
    G: Hash + Eq,
    P: Hash + Eq,
{
    if gold.is_empty() || gold.len() != pred.len() {
        return (0.0, 0.0, 0.0);
    }

    let n = gold.len() as f64;

    // Contingency table and marginals, keyed by dense ids.
    let mut gold_ids: HashMap<&G, usize> = HashMap::new();
    let mut pred_ids: HashMap<&P, usize> = HashMap::new();
    let mut gold_counts: Vec<f64> = Vec::new();
    let mut pred_counts: Vec<f64> = Vec::new();
    let mut joint: HashMap<(usize, usize), f64> = HashMap::new();

    for (g, p) in gold.iter().zip(pred.iter()) {
        let next_g = gold_ids.len();
        let gi = *gold_ids.entry(g).or_insert(next_g);
        if gi == gold_counts.len() {
            gold_counts.push(0.0);
        }
        gold_counts[gi] += 1.0;

        let next_p = pred_ids.len();
        let pi = *pred_ids.entry(p).or_insert(next_p);
        if pi == pred_counts.len() {
            pred_counts.push(0.0);
        }
        pred_counts[pi] += 1.0;

        *joint.entry((gi, pi)).or_insert(0.0) += 1.0;
    }

    let h_gold = entropy_from_counts(&gold_counts, n);
    let h_pred = entropy_from_counts(&pred_counts, n);

    // H(gold | pred) = -sum_{g,p} (n_gp / n) * ln(n_gp / n_p)
    let mut h_gold_given_pred = 0.0;
    let mut h_pred_given_gold = 0.0;
    for (&(gi, pi), &count) in &joint {
        let p_joint = count / n;
        h_gold_given_pred -= p_joint * (count / pred_counts[pi]).ln();
        h_pred_given_gold -= p_joint * (count / gold_counts[gi]).ln();
    }

    let homogeneity = if h_gold > 0.0 {
        1.0 - h_gold_given_pred / h_gold
    } else {
        1.0
    };
    let completeness = if h_pred > 0.0 {
        1.0 - h_pred_given_gold / h_pred
    } else {
        1.0
    };

    let v = if homogeneity + completeness > 0.0 {
        2.0 * homogeneity * completeness / (homogeneity + completeness)
    } else {
        0.0
    };

    // Conditional entropies can overshoot by float noise; clamp to [0, 1].
    (
        homogeneity.clamp(0.0, 1.0),
        completeness.clamp(0.0, 1.0),
        v.clamp(0.0, 1.0),
    )
}

/// V-measure alone; see [`homogeneity_completeness_v_measure`].
pub fn v_measure<G, P>(gold: &[G], pred: &[P]) -> f64
where
    G: Hash + Eq,
    P: Hash + Eq,
{
    homogeneity_completeness_v_measure(gold, pred).2
}

fn entropy_from_counts(counts: &[f64], n: f64) -> f64 {
    counts
        .iter()
        .filter(|&&c| c > 0.0)
        .map(|&c| {
            let p = c / n;
            -p * p.ln()
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_clustering() {
        let gold = vec!["a", "a", "b", "b"];
        let pred = vec![0usize, 0, 1, 1];
        let (h, c, v) = homogeneity_completeness_v_measure(&gold, &pred);
        assert!((h - 1.0).abs() < 1e-12);
        assert!((c - 1.0).abs() < 1e-12);
        assert!((v - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_permutation_invariance() {
        let gold = vec!["x", "x", "y", "y", "z", "z"];
        let pred = vec![2usize, 2, 0, 0, 1, 1];
        // Swap prediction ids with an arbitrary bijection.
        let relabeled: Vec<usize> = pred.iter().map(|&p| (p + 5) * 3).collect();
        assert!((v_measure(&gold, &pred) - v_measure(&gold, &relabeled)).abs() < 1e-12);

        // Relabel the gold classes too.
        let gold_relabeled: Vec<&str> = gold
            .iter()
            .map(|&g| match g {
                "x" => "beta",
                "y" => "gamma",
                _ => "alpha",
            })
            .collect();
        assert!((v_measure(&gold, &pred) - v_measure(&gold_relabeled, &pred)).abs() < 1e-12);
    }

    #[test]
    fn test_single_cluster_prediction() {
        // Everything in one cluster: complete but not homogeneous.
        let gold = vec!["a", "a", "b", "b"];
        let pred = vec![0usize, 0, 0, 0];
        let (h, c, v) = homogeneity_completeness_v_measure(&gold, &pred);
        assert_eq!(h, 0.0);
        assert_eq!(c, 1.0);
        assert_eq!(v, 0.0);
    }

    #[test]
    fn test_single_class_gold() {
        // One gold class: homogeneous by definition.
        let gold = vec!["a", "a", "a", "a"];
        let pred = vec![0usize, 1, 0, 1];
        let (h, c, _) = homogeneity_completeness_v_measure(&gold, &pred);
        assert_eq!(h, 1.0);
        assert_eq!(c, 0.0);
    }

    #[test]
    fn test_bounded() {
        let gold = vec!["a", "b", "a", "b", "c", "c", "a"];
        let pred = vec![0usize, 0, 1, 1, 2, 0, 2];
        let (h, c, v) = homogeneity_completeness_v_measure(&gold, &pred);
        for score in [h, c, v] {
            assert!((0.0..=1.0).contains(&score), "score {} out of range", score);
        }
    }

    #[test]
    fn test_partial_agreement_known_value() {
        // Classic example: two classes split across two clusters with one
        // item misplaced. V-measure must be strictly between 0 and 1.
        let gold = vec![0usize, 0, 0, 1, 1, 1];
        let pred = vec![0usize, 0, 1, 1, 1, 1];
        let v = v_measure(&gold, &pred);
        assert!(v > 0.3 && v < 1.0, "v = {}", v);
    }

    #[test]
    fn test_empty_input() {
        let gold: Vec<&str> = vec![];
        let pred: Vec<usize> = vec![];
        assert_eq!(v_measure(&gold, &pred), 0.0);
    }
}
