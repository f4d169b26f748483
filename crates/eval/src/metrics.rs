use serde::{Deserialize, Serialize};

use retrieval::RetrievalResult;

/// Retrieval quality for one configuration at a fixed K.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalMetrics {
    pub recall: f64,
    pub precision: f64,
}

/// Fraction of queries whose ground-truth chunk appears among the top-K
/// ranked matches. An empty result set scores 0.0.
pub fn recall_at_k(results: &[RetrievalResult], k: usize) -> f64 {
    if results.is_empty() {
        return 0.0;
    }
    let correct = results.iter().filter(|r| hit_in_top_k(r, k)).count();
    correct as f64 / results.len() as f64
}

/// Per-query relevance (0 or 1, single ground-truth chunk) divided by K,
/// averaged over queries. The denominator stays K even when fewer than K
/// matches were returned, so Precision@K == Recall@K / K by construction.
pub fn precision_at_k(results: &[RetrievalResult], k: usize) -> f64 {
    if results.is_empty() || k == 0 {
        return 0.0;
    }
    let total: f64 = results
        .iter()
        .map(|r| if hit_in_top_k(r, k) { 1.0 / k as f64 } else { 0.0 })
        .sum();
    total / results.len() as f64
}

pub fn evaluate(results: &[RetrievalResult], k: usize) -> EvalMetrics {
    EvalMetrics {
        recall: recall_at_k(results, k),
        precision: precision_at_k(results, k),
    }
}

fn hit_in_top_k(result: &RetrievalResult, k: usize) -> bool {
    result
        .similar_chunks
        .iter()
        .take(k)
        .any(|chunk| chunk.id == result.question_data.chunk_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use retrieval::{RetrievalQuery, ScoredChunk};

    fn result(true_chunk: &str, ranked: &[(&str, f32)]) -> RetrievalResult {
        RetrievalResult {
            question_data: RetrievalQuery {
                chunk_id: true_chunk.to_string(),
                text: "chunk text".to_string(),
                question: "a question".to_string(),
            },
            similar_chunks: ranked
                .iter()
                .map(|(id, score)| ScoredChunk {
                    id: id.to_string(),
                    score: *score,
                })
                .collect(),
        }
    }

    #[test]
    fn empty_results_score_zero() {
        assert_eq!(recall_at_k(&[], 2), 0.0);
        assert_eq!(precision_at_k(&[], 2), 0.0);
    }

    #[test]
    fn hit_at_second_rank_scores_recall_one_precision_half() {
        let results = vec![result("1-0", &[("2-3", 0.9), ("1-0", 0.8)])];

        assert_eq!(recall_at_k(&results, 2), 1.0);
        assert_eq!(precision_at_k(&results, 2), 0.5);
    }

    #[test]
    fn truncation_excludes_matches_past_k() {
        let results = vec![result("1-0", &[("2-3", 0.9), ("1-0", 0.8)])];

        assert_eq!(recall_at_k(&results, 1), 0.0);
        assert_eq!(precision_at_k(&results, 1), 0.0);
    }

    #[test]
    fn recall_is_monotone_in_k() {
        let results = vec![
            result("1-0", &[("2-3", 0.9), ("1-0", 0.8), ("3-0", 0.7)]),
            result("2-1", &[("2-1", 0.95)]),
            result("3-2", &[("1-0", 0.5), ("2-0", 0.4)]),
        ];

        let mut previous = 0.0;
        for k in 1..=5 {
            let recall = recall_at_k(&results, k);
            assert!(recall >= previous, "recall dropped at k={}", k);
            previous = recall;
        }
    }

    #[test]
    fn precision_equals_recall_divided_by_k() {
        let results = vec![
            result("1-0", &[("2-3", 0.9), ("1-0", 0.8), ("3-0", 0.7)]),
            result("2-1", &[("2-1", 0.95)]),
            result("3-2", &[("1-0", 0.5), ("2-0", 0.4)]),
        ];

        for k in 1..=4 {
            let recall = recall_at_k(&results, k);
            let precision = precision_at_k(&results, k);
            assert!((precision - recall / k as f64).abs() < 1e-12);
        }
    }

    #[test]
    fn averages_over_all_queries() {
        let results = vec![
            result("1-0", &[("1-0", 0.9)]),
            result("2-0", &[("9-9", 0.9)]),
        ];

        assert_eq!(recall_at_k(&results, 1), 0.5);
        assert_eq!(precision_at_k(&results, 1), 0.5);
    }
}
