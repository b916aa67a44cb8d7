//! Runs the evaluator over a full query set for one named approach.
//!
//! Queries evaluate independently under a bounded concurrency limit; results
//! merge at a single accumulation point indexed by query position, so the
//! summary always lists outcomes in query-set order no matter the completion
//! order. Aggregates are a pure reduction over the successes after every task
//! has completed or failed.

use crate::error::{EvalError, Result};
use crate::evaluator::Evaluator;
use crate::model::{AggregateMetrics, ApproachSummary, Query, QueryEval, SearchResult, TokenUsage};
use std::sync::Arc;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;

/// Search backend boundary: maps a query to its ranked hits. May fail; a
/// failure is recorded against that query and never aborts the run.
pub type SearchFn = dyn Fn(&Query) -> Result<SearchResult> + Send + Sync;

/// Run-wide knobs.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Maximum in-flight query evaluations (judge rate limits drive this).
    pub concurrency: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions { concurrency: 4 }
    }
}

/// Drives per-query evaluation across a query set for one named approach.
pub struct ApproachRunner {
    evaluator: Evaluator,
    options: RunOptions,
}

impl ApproachRunner {
    pub fn new(evaluator: Evaluator) -> Self {
        ApproachRunner {
            evaluator,
            options: RunOptions::default(),
        }
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    /// Evaluate every query and aggregate into a summary.
    pub async fn run(
        &self,
        name: &str,
        search_fn: Arc<SearchFn>,
        queries: &[Query],
    ) -> ApproachSummary {
        let (_keepalive, rx) = watch::channel(false);
        self.run_with_cancel(name, search_fn, queries, rx).await
    }

    /// Like [`run`](Self::run), but aborts cooperatively when `cancel` turns
    /// true: in-flight evaluations stop, completed results are retained, and
    /// unfinished queries are recorded as cancelled failures, yielding a
    /// partial summary.
    pub async fn run_with_cancel(
        &self,
        name: &str,
        search_fn: Arc<SearchFn>,
        queries: &[Query],
        mut cancel: watch::Receiver<bool>,
    ) -> ApproachSummary {
        log::info!("evaluating '{}' over {} queries", name, queries.len());
        let semaphore = Arc::new(Semaphore::new(self.options.concurrency.max(1)));
        let mut join_set = JoinSet::new();

        for (idx, query) in queries.iter().cloned().enumerate() {
            let semaphore = semaphore.clone();
            let search_fn = search_fn.clone();
            let evaluator = self.evaluator.clone();
            join_set.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("semaphore never closed");
                let outcome = evaluate_query(&evaluator, search_fn.as_ref(), &query).await;
                (idx, outcome)
            });
        }

        let mut outcomes: Vec<Option<QueryEval>> = Vec::new();
        outcomes.resize_with(queries.len(), || None);
        let mut aborted = false;

        loop {
            tokio::select! {
                joined = join_set.join_next() => {
                    match joined {
                        None => break,
                        Some(Ok((idx, outcome))) => outcomes[idx] = Some(outcome),
                        Some(Err(join_err)) => {
                            if !join_err.is_cancelled() {
                                log::error!("evaluation task panicked: {}", join_err);
                            }
                        }
                    }
                }
                _ = cancelled(&mut cancel), if !aborted => {
                    log::info!("run '{}' cancelled; keeping completed results", name);
                    join_set.abort_all();
                    aborted = true;
                }
            }
        }

        let query_evals: Vec<QueryEval> = outcomes
            .into_iter()
            .zip(queries.iter())
            .map(|(outcome, query)| {
                outcome.unwrap_or_else(|| QueryEval::Failed {
                    query: query.clone(),
                    error: EvalError::Cancelled.to_string(),
                })
            })
            .collect();

        let metrics = AggregateMetrics::from_results(query_evals.iter().filter_map(QueryEval::result));
        let failure_count = query_evals.iter().filter(|q| q.result().is_none()).count();
        let mut usage = TokenUsage::default();
        for result in query_evals.iter().filter_map(QueryEval::result) {
            usage.accumulate(result.usage);
        }
        if failure_count > 0 {
            log::warn!(
                "'{}': {}/{} queries failed and are excluded from aggregates",
                name,
                failure_count,
                query_evals.len()
            );
        }

        ApproachSummary {
            name: name.to_string(),
            queries: query_evals,
            metrics,
            failure_count,
            usage,
        }
    }
}

/// Resolves once the cancel flag turns true; never resolves otherwise.
async fn cancelled(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow() {
            return;
        }
        if rx.changed().await.is_err() {
            // Sender dropped without cancelling; no signal can arrive anymore.
            std::future::pending::<()>().await;
        }
    }
}

async fn evaluate_query(evaluator: &Evaluator, search_fn: &SearchFn, query: &Query) -> QueryEval {
    let search_result = match search_fn(query) {
        Ok(result) => result,
        Err(e) => {
            return QueryEval::Failed {
                query: query.clone(),
                error: format!("search: {}", e),
            }
        }
    };
    match evaluator.evaluate(&search_result).await {
        Ok(result) => QueryEval::Evaluated(result),
        Err(e) => QueryEval::Failed {
            query: query.clone(),
            error: e.to_string(),
        },
    }
}
