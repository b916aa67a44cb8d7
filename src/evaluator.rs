//! Per-query evaluation orchestration: obtain judgments (retrying transient
//! judge failures with bounded exponential backoff), validate them against the
//! hit list, compute metrics, and package an `EvalResult`.

use crate::error::{EvalError, Result};
use crate::judge::{Judge, JudgeResponse};
use crate::metrics;
use crate::model::{EvalResult, JudgedHit, QueryMetrics, SearchResult, TokenUsage};
use crate::scale::RelevanceScore;
use std::sync::Arc;
use std::time::Duration;

/// Bounded retry for transient judge failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first call.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles per attempt.
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
        }
    }
}

/// Evaluates one query's search result against the judge.
#[derive(Clone)]
pub struct Evaluator {
    judge: Arc<dyn Judge>,
    retry: RetryPolicy,
    /// NDCG cutoff; None evaluates the full hit list.
    ndcg_k: Option<usize>,
}

impl Evaluator {
    pub fn new(judge: Arc<dyn Judge>) -> Self {
        Evaluator {
            judge,
            retry: RetryPolicy::default(),
            ndcg_k: None,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_ndcg_k(mut self, k: usize) -> Self {
        self.ndcg_k = Some(k);
        self
    }

    /// Evaluate one query's ranked hits.
    ///
    /// An empty hit list short-circuits to all-zero metrics without calling
    /// the judge. A judgment count that differs from the hit count is a
    /// protocol violation, fatal to this query and never retried.
    pub async fn evaluate(&self, search_result: &SearchResult) -> Result<EvalResult> {
        let query = &search_result.query;
        let hits = &search_result.hits;

        if hits.is_empty() {
            log::debug!("'{}': empty result list, metrics are zero", query.text);
            return Ok(EvalResult {
                query: query.clone(),
                metrics: QueryMetrics::zero(),
                hits: Vec::new(),
                usage: TokenUsage::default(),
            });
        }

        let response = self.judge_with_retry(search_result).await?;
        if response.judgments.len() != hits.len() {
            return Err(EvalError::JudgmentCountMismatch {
                expected: hits.len(),
                actual: response.judgments.len(),
            });
        }

        let scores: Vec<RelevanceScore> =
            response.judgments.iter().map(|j| j.score).collect();
        let k = self.ndcg_k.unwrap_or(scores.len());
        let computed = QueryMetrics {
            ndcg: metrics::ndcg(&scores, k)?,
            map: metrics::average_precision(&scores)?,
            mrr: metrics::reciprocal_rank(&scores)?,
        };

        let judged = hits
            .iter()
            .zip(response.judgments)
            .enumerate()
            .map(|(index, (hit, judgment))| JudgedHit {
                index,
                hit_id: hit.id_or_index(index),
                fields: hit.fields.clone(),
                score: judgment.score,
                relevant: judgment.score.is_relevant(),
                justification: judgment.justification,
            })
            .collect();

        Ok(EvalResult {
            query: query.clone(),
            metrics: computed,
            hits: judged,
            usage: response.usage,
        })
    }

    async fn judge_with_retry(&self, search_result: &SearchResult) -> Result<JudgeResponse> {
        let query = &search_result.query;
        let max_attempts = self.retry.max_attempts.max(1);
        let mut delay = self.retry.initial_backoff;
        let mut attempt = 0;

        loop {
            match self.judge.judge(query, &search_result.hits).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_transient() && attempt + 1 < max_attempts => {
                    log::warn!(
                        "judge retry {}/{} for '{}' after: {}",
                        attempt + 1,
                        max_attempts - 1,
                        query.text,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
