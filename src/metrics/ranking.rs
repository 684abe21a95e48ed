//! Ranked-list metrics: Precision@K, Recall@K, MRR, nDCG, and average
//! precision.
//!
//! All functions take relevance in rank order (index 0 = rank 1). nDCG@K is
//! the BEIR/MTEB standard formulation: IDCG is computed from the total number
//! of relevant documents, not the number found in the ranking.

/// Fraction of relevant items in the top K.
pub fn precision_at_k(relevant: &[bool], k: usize) -> f64 {
    if k == 0 {
        return 0.0;
    }
    let hits = relevant.iter().take(k).filter(|&&r| r).count();
    hits as f64 / k as f64
}

/// Fraction of ALL relevant items found in the top K.
pub fn recall_at_k(relevant: &[bool], k: usize, total_relevant: usize) -> f64 {
    if total_relevant == 0 {
        return 0.0;
    }
    let hits = relevant.iter().take(k).filter(|&&r| r).count();
    hits as f64 / total_relevant as f64
}

/// Reciprocal rank of the first relevant item within the top K; 0 if none.
pub fn reciprocal_rank_at_k(relevant: &[bool], k: usize) -> f64 {
    relevant
        .iter()
        .take(k)
        .position(|&r| r)
        .map(|i| 1.0 / (i + 1) as f64)
        .unwrap_or(0.0)
}

/// DCG@K with binary relevance: sum of 1/log2(rank + 1) over relevant hits.
pub fn dcg_at_k(relevant: &[bool], k: usize) -> f64 {
    relevant
        .iter()
        .take(k)
        .enumerate()
        .filter(|(_, &r)| r)
        .map(|(i, _)| 1.0 / (i as f64 + 2.0).log2())
        .sum()
}

/// Ideal DCG@K assuming all `total_relevant` items ranked at the top.
pub fn idcg_at_k(total_relevant: usize, k: usize) -> f64 {
    (0..total_relevant.min(k))
        .map(|i| 1.0 / (i as f64 + 2.0).log2())
        .sum()
}

/// nDCG@K with binary relevance.
///
/// IDCG uses `total_relevant` (the number of judged-relevant documents for
/// the query), not the found count.
pub fn ndcg_at_k(relevant: &[bool], k: usize, total_relevant: usize) -> f64 {
    let idcg = idcg_at_k(total_relevant, k);
    if idcg == 0.0 {
        return 0.0;
    }
    dcg_at_k(relevant, k) / idcg
}

/// DCG@K with graded relevance: (2^grade - 1) / log2(rank + 1).
pub fn dcg_at_k_graded(grades: &[u8], k: usize) -> f64 {
    grades
        .iter()
        .take(k)
        .enumerate()
        .map(|(i, &g)| {
            let gain = 2.0f64.powi(g as i32) - 1.0;
            gain / (i as f64 + 2.0).log2()
        })
        .sum()
}

/// nDCG@K with graded relevance. `all_grades` holds the grades of every
/// judged document for the query (the ideal ranking is derived from it).
pub fn ndcg_at_k_graded(grades_in_rank_order: &[u8], k: usize, all_grades: &[u8]) -> f64 {
    let mut ideal: Vec<u8> = all_grades.to_vec();
    ideal.sort_by(|a, b| b.cmp(a));
    let idcg = dcg_at_k_graded(&ideal, k);
    if idcg == 0.0 {
        return 0.0;
    }
    dcg_at_k_graded(grades_in_rank_order, k) / idcg
}

/// Average precision of a ranked relevance list: the mean of precision at
/// each relevant position, with `total_relevant` as the denominator.
pub fn average_precision_from_ranking(relevant: &[bool], total_relevant: usize) -> f64 {
    if total_relevant == 0 {
        return 0.0;
    }
    let mut hits = 0usize;
    let mut sum = 0.0;
    for (i, &r) in relevant.iter().enumerate() {
        if r {
            hits += 1;
            sum += hits as f64 / (i + 1) as f64;
        }
    }
    sum / total_relevant as f64
}

/// Average precision over (score, label) pairs, higher score ranked first.
///
/// Step-wise summation over distinct score thresholds,
/// `AP = sum_n (R_n - R_{n-1}) * P_n`, with tied scores collapsed into one
/// threshold so the result does not depend on the order of ties. Returns 0.0
/// when there are no positive labels.
pub fn average_precision(scores: &[f64], labels: &[bool]) -> f64 {
    debug_assert_eq!(scores.len(), labels.len());
    let total_positive = labels.iter().filter(|&&l| l).count();
    if total_positive == 0 || scores.len() != labels.len() {
        return 0.0;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut ap = 0.0;
    let mut tp = 0usize;
    let mut seen = 0usize;
    let mut prev_recall = 0.0;

    let mut i = 0;
    while i < order.len() {
        // Advance through the whole group of tied scores before scoring.
        let group_score = scores[order[i]];
        while i < order.len() && scores[order[i]] == group_score {
            if labels[order[i]] {
                tp += 1;
            }
            seen += 1;
            i += 1;
        }
        let recall = tp as f64 / total_positive as f64;
        let precision = tp as f64 / seen as f64;
        ap += (recall - prev_recall) * precision;
        prev_recall = recall;
    }

    ap
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precision_at_k() {
        let relevant = vec![true, false, true, false, false];
        assert_eq!(precision_at_k(&relevant, 1), 1.0);
        assert!((precision_at_k(&relevant, 3) - 2.0 / 3.0).abs() < 1e-12);
        assert!((precision_at_k(&relevant, 5) - 0.4).abs() < 1e-12);
        assert_eq!(precision_at_k(&relevant, 0), 0.0);
    }

    #[test]
    fn test_recall_at_k() {
        let relevant = vec![true, false, true];
        assert!((recall_at_k(&relevant, 3, 3) - 2.0 / 3.0).abs() < 1e-12);
        assert!((recall_at_k(&relevant, 1, 3) - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(recall_at_k(&relevant, 3, 0), 0.0);
    }

    #[test]
    fn test_reciprocal_rank() {
        assert_eq!(reciprocal_rank_at_k(&[false, false, true], 10), 1.0 / 3.0);
        assert_eq!(reciprocal_rank_at_k(&[true], 10), 1.0);
        assert_eq!(reciprocal_rank_at_k(&[false, false], 10), 0.0);
        // Relevant item below the cutoff does not count.
        assert_eq!(reciprocal_rank_at_k(&[false, false, true], 2), 0.0);
    }

    #[test]
    fn test_ndcg_binary() {
        // Relevant at rank 1, one relevant total: perfect.
        assert!((ndcg_at_k(&[true, false], 10, 1) - 1.0).abs() < 1e-12);
        // Relevant at rank 2: DCG = 1/log2(3) ~ 0.631.
        let v = ndcg_at_k(&[false, true], 10, 1);
        assert!((v - 0.6309).abs() < 1e-3);
        // No judged relevant documents.
        assert_eq!(ndcg_at_k(&[false], 10, 0), 0.0);
        // IDCG uses total_relevant: 2 judged, 1 found at rank 2.
        let v = ndcg_at_k(&[false, true, false], 10, 2);
        assert!((v - 0.6309 / 1.6309).abs() < 1e-3);
    }

    #[test]
    fn test_ndcg_graded() {
        // Perfect order of grades [3, 1].
        assert!((ndcg_at_k_graded(&[3, 1], 10, &[3, 1]) - 1.0).abs() < 1e-12);
        // Swapped order is penalized.
        let v = ndcg_at_k_graded(&[1, 3], 10, &[3, 1]);
        assert!(v < 1.0 && v > 0.5);
    }

    #[test]
    fn test_average_precision_from_ranking() {
        // Relevant at ranks 1 and 3 of 2 total: (1/1 + 2/3) / 2.
        let ap = average_precision_from_ranking(&[true, false, true], 2);
        assert!((ap - (1.0 + 2.0 / 3.0) / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_average_precision_perfect_separation() {
        let scores = vec![0.9, 0.8, 0.3, 0.1];
        let labels = vec![true, true, false, false];
        assert!((average_precision(&scores, &labels) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_average_precision_interleaved() {
        // Ranks: pos, neg, pos, neg -> AP = (1/1 + 2/3) / 2.
        let scores = vec![0.9, 0.8, 0.7, 0.6];
        let labels = vec![true, false, true, false];
        assert!((average_precision(&scores, &labels) - (1.0 + 2.0 / 3.0) / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_average_precision_tied_scores() {
        // All scores tied: one threshold, AP = precision = positives / n.
        let scores = vec![0.5, 0.5, 0.5, 0.5];
        let labels = vec![true, false, true, false];
        assert!((average_precision(&scores, &labels) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_average_precision_no_positives() {
        assert_eq!(average_precision(&[0.9, 0.1], &[false, false]), 0.0);
    }
}
