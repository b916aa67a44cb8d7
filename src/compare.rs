//! Cross-approach comparison: per-query per-metric winners, win counts, and
//! mean-metric deltas against a baseline.

use crate::error::{EvalError, Result};
use crate::model::{ApproachSummary, QueryMetrics};
use serde::{Deserialize, Serialize};

/// The approach that scored highest for one query/metric cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Winner {
    pub approach: String,
    pub value: f64,
}

/// Winning approach per metric for one query. `None` when no approach
/// evaluated that query successfully.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryWinners {
    pub query: String,
    pub ndcg: Option<Winner>,
    pub map: Option<Winner>,
    pub mrr: Option<Winner>,
}

/// How many queries an approach won, per metric.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WinCounts {
    pub approach: String,
    pub ndcg: usize,
    pub map: usize,
    pub mrr: usize,
}

/// Mean-metric difference of one approach against the baseline (first-listed)
/// approach. The baseline's own deltas are zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaselineDelta {
    pub approach: String,
    pub ndcg: f64,
    pub map: f64,
    pub mrr: f64,
}

/// Output of [`compare`]: winners per query, win counts, and baseline deltas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub approaches: Vec<String>,
    pub baseline: String,
    pub queries: Vec<QueryWinners>,
    pub win_counts: Vec<WinCounts>,
    pub mean_deltas: Vec<BaselineDelta>,
}

/// Compare two or more summaries over the same ordered query set.
///
/// For each query and metric the strictly highest score wins; ties go to the
/// approach listed first. Approaches that failed a query are skipped for that
/// query. Deltas are each approach's mean minus the first (baseline)
/// summary's mean.
pub fn compare(summaries: &[ApproachSummary]) -> Result<ComparisonReport> {
    if summaries.len() < 2 {
        return Err(EvalError::InvalidInput(format!(
            "comparison needs at least two summaries, got {}",
            summaries.len()
        )));
    }

    let reference = summaries[0].query_texts();
    for summary in &summaries[1..] {
        let texts = summary.query_texts();
        if texts != reference {
            return Err(EvalError::QuerySetMismatch(format!(
                "'{}' evaluated a different query set than '{}'",
                summary.name, summaries[0].name
            )));
        }
    }

    let mut queries = Vec::with_capacity(reference.len());
    let mut win_counts: Vec<WinCounts> = summaries
        .iter()
        .map(|s| WinCounts {
            approach: s.name.clone(),
            ndcg: 0,
            map: 0,
            mrr: 0,
        })
        .collect();

    for (query_idx, query_text) in reference.iter().enumerate() {
        let ndcg = winner_for(summaries, query_idx, |m| m.ndcg);
        let map = winner_for(summaries, query_idx, |m| m.map);
        let mrr = winner_for(summaries, query_idx, |m| m.mrr);

        for counts in win_counts.iter_mut() {
            if ndcg.as_ref().map(|w| w.approach == counts.approach) == Some(true) {
                counts.ndcg += 1;
            }
            if map.as_ref().map(|w| w.approach == counts.approach) == Some(true) {
                counts.map += 1;
            }
            if mrr.as_ref().map(|w| w.approach == counts.approach) == Some(true) {
                counts.mrr += 1;
            }
        }

        queries.push(QueryWinners {
            query: query_text.to_string(),
            ndcg,
            map,
            mrr,
        });
    }

    let baseline = &summaries[0];
    let mean_deltas = summaries
        .iter()
        .map(|summary| BaselineDelta {
            approach: summary.name.clone(),
            ndcg: summary.metrics.ndcg.mean - baseline.metrics.ndcg.mean,
            map: summary.metrics.map.mean - baseline.metrics.map.mean,
            mrr: summary.metrics.mrr.mean - baseline.metrics.mrr.mean,
        })
        .collect();

    Ok(ComparisonReport {
        approaches: summaries.iter().map(|s| s.name.clone()).collect(),
        baseline: baseline.name.clone(),
        queries,
        win_counts,
        mean_deltas,
    })
}

/// Strictly-highest evaluated score for one query, ties won by the
/// first-listed summary.
fn winner_for(
    summaries: &[ApproachSummary],
    query_idx: usize,
    metric: fn(&QueryMetrics) -> f64,
) -> Option<Winner> {
    let mut best: Option<Winner> = None;
    for summary in summaries {
        let Some(result) = summary.queries[query_idx].result() else {
            continue;
        };
        let value = metric(&result.metrics);
        let beats = match &best {
            Some(current) => value > current.value,
            None => true,
        };
        if beats {
            best = Some(Winner {
                approach: summary.name.clone(),
                value,
            });
        }
    }
    best
}
