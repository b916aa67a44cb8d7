//! Ranking metrics: NDCG@k, average precision, and reciprocal rank, plus the
//! reductions used when aggregating across queries.
//!
//! All functions are pure and deterministic. They reject empty score slices
//! with `InvalidInput` -- callers must special-case empty result lists as
//! ndcg = map = mrr = 0 instead of calling in.

use crate::error::{EvalError, Result};
use crate::scale::RelevanceScore;

/// Discounted cumulative gain over the first `k` scores, 1-indexed:
/// `sum_i (2^score_i - 1) / log2(i + 1)`.
fn dcg(scores: &[RelevanceScore], k: usize) -> f64 {
    scores
        .iter()
        .take(k)
        .enumerate()
        .map(|(i, score)| score.gain() / ((i + 2) as f64).log2())
        .sum()
}

/// Normalized DCG at cutoff `k`.
///
/// IDCG is the DCG of the same scores sorted descending. When IDCG is 0
/// (every score carries zero gain, which cannot happen on the 1-4 scale, or
/// `k` is 0), NDCG is defined as 0. With fewer than `k` scores, only the
/// available scores contribute.
pub fn ndcg(scores: &[RelevanceScore], k: usize) -> Result<f64> {
    if scores.is_empty() {
        return Err(EvalError::InvalidInput(
            "ndcg requires at least one score".to_string(),
        ));
    }

    let mut ideal: Vec<RelevanceScore> = scores.to_vec();
    ideal.sort_unstable_by(|a, b| b.cmp(a));

    let idcg = dcg(&ideal, k);
    if idcg == 0.0 {
        return Ok(0.0);
    }
    Ok(dcg(scores, k) / idcg)
}

/// Average precision for a single query.
///
/// A hit counts as relevant per the scale's binary predicate. For each rank
/// holding a relevant hit, precision at that rank is accumulated; the sum is
/// divided by the number of relevant hits. 0 when nothing is relevant.
/// Averaging across queries (MAP) is the approach runner's job.
pub fn average_precision(scores: &[RelevanceScore]) -> Result<f64> {
    if scores.is_empty() {
        return Err(EvalError::InvalidInput(
            "average_precision requires at least one score".to_string(),
        ));
    }

    let mut relevant_seen = 0usize;
    let mut precision_sum = 0.0;
    for (i, score) in scores.iter().enumerate() {
        if score.is_relevant() {
            relevant_seen += 1;
            precision_sum += relevant_seen as f64 / (i + 1) as f64;
        }
    }

    if relevant_seen == 0 {
        return Ok(0.0);
    }
    Ok(precision_sum / relevant_seen as f64)
}

/// Reciprocal of the 1-based rank of the first relevant hit; 0 when no hit is
/// relevant. Averaging across queries (MRR) is the approach runner's job.
pub fn reciprocal_rank(scores: &[RelevanceScore]) -> Result<f64> {
    if scores.is_empty() {
        return Err(EvalError::InvalidInput(
            "reciprocal_rank requires at least one score".to_string(),
        ));
    }

    for (i, score) in scores.iter().enumerate() {
        if score.is_relevant() {
            return Ok(1.0 / (i + 1) as f64);
        }
    }
    Ok(0.0)
}

/// Arithmetic mean; 0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Median; 0 for an empty slice.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable_by(|a, b| a.partial_cmp(b).expect("metric values are finite"));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Sample standard deviation; 0 with fewer than two observations.
pub fn stddev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance =
        values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(values: &[u8]) -> Vec<RelevanceScore> {
        values
            .iter()
            .map(|&v| RelevanceScore::try_from(v).unwrap())
            .collect()
    }

    #[test]
    fn ndcg_is_one_when_sorted_descending() {
        let s = scores(&[4, 3, 2, 1]);
        assert!((ndcg(&s, 4).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn ndcg_in_unit_interval() {
        for seq in [
            vec![1u8, 2, 3, 4],
            vec![4, 4, 4],
            vec![1, 1, 1],
            vec![2, 4, 1, 3, 3],
        ] {
            let s = scores(&seq);
            let value = ndcg(&s, s.len()).unwrap();
            assert!((0.0..=1.0 + 1e-12).contains(&value), "ndcg {} out of range", value);
        }
    }

    #[test]
    fn ndcg_rewards_relevant_up_front() {
        let front = ndcg(&scores(&[4, 1, 1]), 3).unwrap();
        let back = ndcg(&scores(&[1, 1, 4]), 3).unwrap();
        assert!(front > back, "ndcg {} should exceed {}", front, back);
        assert!((front - 1.0).abs() < 1e-12, "descending order is ideal");
    }

    #[test]
    fn ndcg_truncates_at_k() {
        // Same first two ranks, but a second highly-relevant hit at rank 3
        // raises the ideal ordering, so NDCG@2 drops below the [4,1,1] case.
        let a = ndcg(&scores(&[4, 1, 1]), 2).unwrap();
        let b = ndcg(&scores(&[4, 1, 4]), 2).unwrap();
        assert!((a - 1.0).abs() < 1e-12);
        assert!(b < a);
    }

    #[test]
    fn ndcg_short_list_uses_available_hits() {
        let s = scores(&[3, 2]);
        let value = ndcg(&s, 10).unwrap();
        assert!((value - 1.0).abs() < 1e-12);
    }

    #[test]
    fn ndcg_k_zero_is_zero() {
        assert_eq!(ndcg(&scores(&[4, 3]), 0).unwrap(), 0.0);
    }

    #[test]
    fn ndcg_empty_rejected() {
        assert!(matches!(ndcg(&[], 5), Err(EvalError::InvalidInput(_))));
    }

    #[test]
    fn reciprocal_rank_positions() {
        assert_eq!(reciprocal_rank(&scores(&[4, 1, 1])).unwrap(), 1.0);
        assert!((reciprocal_rank(&scores(&[1, 1, 4])).unwrap() - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(reciprocal_rank(&scores(&[1, 1, 1])).unwrap(), 0.0);
    }

    #[test]
    fn reciprocal_rank_threshold_is_three() {
        // Partially relevant (2) does not count; moderately relevant (3) does.
        assert_eq!(reciprocal_rank(&scores(&[2, 2])).unwrap(), 0.0);
        assert_eq!(reciprocal_rank(&scores(&[2, 3])).unwrap(), 0.5);
    }

    #[test]
    fn reciprocal_rank_empty_rejected() {
        assert!(matches!(
            reciprocal_rank(&[]),
            Err(EvalError::InvalidInput(_))
        ));
    }

    #[test]
    fn average_precision_worked_example() {
        // Relevant at ranks 1 and 3: AP = (1/1 + 2/3) / 2 = 5/6.
        let ap = average_precision(&scores(&[4, 1, 3])).unwrap();
        assert!((ap - 5.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn average_precision_none_relevant() {
        assert_eq!(average_precision(&scores(&[1, 2, 1])).unwrap(), 0.0);
    }

    #[test]
    fn average_precision_all_relevant_is_one() {
        assert!((average_precision(&scores(&[4, 3, 4])).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn average_precision_empty_rejected() {
        assert!(matches!(
            average_precision(&[]),
            Err(EvalError::InvalidInput(_))
        ));
    }

    #[test]
    fn mean_median_stddev() {
        assert_eq!(mean(&[]), 0.0);
        assert!((mean(&[0.5, 1.0]) - 0.75).abs() < 1e-12);
        assert_eq!(median(&[0.1, 0.9, 0.5]), 0.5);
        assert!((median(&[0.2, 0.4]) - 0.3).abs() < 1e-12);
        assert_eq!(stddev(&[0.5]), 0.0);
        // Sample stddev of {1, 3} is sqrt(2).
        assert!((stddev(&[1.0, 3.0]) - 2.0_f64.sqrt()).abs() < 1e-12);
    }
}
