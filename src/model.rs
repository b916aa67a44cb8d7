//! Core data model: queries, hits, judgments, per-query results, and
//! per-approach summaries.

use crate::metrics;
use crate::scale::RelevanceScore;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Ordered named fields of a search hit. Field order is preserved end-to-end
/// (serde_json's preserve_order feature) so the judge sees hits exactly as the
/// search backend produced them.
pub type HitFields = serde_json::Map<String, Value>;

/// A search query. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Query {
    pub text: String,
}

impl Query {
    pub fn new(text: impl Into<String>) -> Self {
        Query { text: text.into() }
    }
}

/// One retrieved item: an ordered mapping of named fields. Common fields are
/// "id" and "text", but none are required.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SearchHit {
    pub fields: HitFields,
}

impl SearchHit {
    /// Hit identifier from the "id" field, or a positional fallback.
    pub fn id_or_index(&self, index: usize) -> String {
        match self.fields.get("id").and_then(Value::as_str) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => format!("hit-{}", index),
        }
    }

    /// String value of a named field, if present.
    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }
}

impl FromIterator<(String, Value)> for SearchHit {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        SearchHit {
            fields: iter.into_iter().collect(),
        }
    }
}

/// A query paired with its ranked hits. Hit order is the ranking order
/// produced by the system under test; index 0 is rank 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub query: Query,
    pub hits: Vec<SearchHit>,
}

/// One (query, hit) relevance judgment from the judge service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelevanceJudgment {
    pub score: RelevanceScore,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub justification: Option<String>,
}

/// A judged hit in the structured output shape: index, fields, the graded
/// score, the binary relevance label, and the judge's justification when
/// debug was requested.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgedHit {
    pub index: usize,
    pub hit_id: String,
    pub fields: HitFields,
    pub score: RelevanceScore,
    pub relevant: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub justification: Option<String>,
}

/// Computed metric values for one query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QueryMetrics {
    pub ndcg: f64,
    pub map: f64,
    pub mrr: f64,
}

impl QueryMetrics {
    /// All-zero metrics, used for empty result lists.
    pub fn zero() -> Self {
        QueryMetrics {
            ndcg: 0.0,
            map: 0.0,
            mrr: 0.0,
        }
    }
}

/// Judge token accounting, summed across a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl TokenUsage {
    pub fn accumulate(&mut self, other: TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }
}

/// Evaluation of one query: the judged hits in ranking order plus the
/// computed metrics. Invariant: `hits.len()` equals the evaluated
/// `SearchResult`'s hit count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalResult {
    pub query: Query,
    pub metrics: QueryMetrics,
    pub hits: Vec<JudgedHit>,
    pub usage: TokenUsage,
}

impl EvalResult {
    /// Number of hits judged relevant.
    pub fn relevant_count(&self) -> usize {
        self.hits.iter().filter(|h| h.relevant).count()
    }
}

/// Per-query outcome within an approach run. Failures are retained for
/// reporting but excluded from aggregate metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QueryEval {
    Evaluated(EvalResult),
    Failed { query: Query, error: String },
}

impl QueryEval {
    pub fn query(&self) -> &Query {
        match self {
            QueryEval::Evaluated(result) => &result.query,
            QueryEval::Failed { query, .. } => query,
        }
    }

    pub fn result(&self) -> Option<&EvalResult> {
        match self {
            QueryEval::Evaluated(result) => Some(result),
            QueryEval::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            QueryEval::Evaluated(_) => None,
            QueryEval::Failed { error, .. } => Some(error),
        }
    }
}

/// Distribution of one metric across a summary's evaluated queries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricStats {
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub stddev: f64,
}

impl MetricStats {
    /// Stats over a value set; all-zero when no query was evaluated.
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return MetricStats {
                mean: 0.0,
                median: 0.0,
                min: 0.0,
                max: 0.0,
                stddev: 0.0,
            };
        }
        MetricStats {
            mean: metrics::mean(values),
            median: metrics::median(values),
            min: values.iter().cloned().fold(f64::INFINITY, f64::min),
            max: values.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
            stddev: metrics::stddev(values),
        }
    }
}

/// Aggregate metric distributions for one approach.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregateMetrics {
    pub ndcg: MetricStats,
    pub map: MetricStats,
    pub mrr: MetricStats,
}

impl AggregateMetrics {
    /// Aggregate over successfully evaluated queries only.
    pub fn from_results<'a>(results: impl Iterator<Item = &'a EvalResult>) -> Self {
        let mut ndcg = Vec::new();
        let mut map = Vec::new();
        let mut mrr = Vec::new();
        for result in results {
            ndcg.push(result.metrics.ndcg);
            map.push(result.metrics.map);
            mrr.push(result.metrics.mrr);
        }
        AggregateMetrics {
            ndcg: MetricStats::from_values(&ndcg),
            map: MetricStats::from_values(&map),
            mrr: MetricStats::from_values(&mrr),
        }
    }
}

/// Everything one approach run produced: per-query outcomes in query-set
/// order, aggregate metrics over the successes, and the failure count.
/// Read-only once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApproachSummary {
    pub name: String,
    pub queries: Vec<QueryEval>,
    pub metrics: AggregateMetrics,
    pub failure_count: usize,
    pub usage: TokenUsage,
}

impl ApproachSummary {
    /// Successfully evaluated results, in query-set order.
    pub fn evaluated(&self) -> impl Iterator<Item = &EvalResult> {
        self.queries.iter().filter_map(QueryEval::result)
    }

    /// The ordered query texts this summary covers (including failed queries).
    pub fn query_texts(&self) -> Vec<&str> {
        self.queries.iter().map(|q| q.query().text.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn hit(pairs: &[(&str, Value)]) -> SearchHit {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn hit_id_falls_back_to_index() {
        let with_id = hit(&[("id", json!("doc1")), ("text", json!("Paris"))]);
        assert_eq!(with_id.id_or_index(3), "doc1");

        let without_id = hit(&[("text", json!("Paris"))]);
        assert_eq!(without_id.id_or_index(3), "hit-3");
    }

    #[test]
    fn hit_field_order_preserved() {
        let h = hit(&[
            ("id", json!("doc1")),
            ("title", json!("Capitals")),
            ("text", json!("Paris")),
        ]);
        let keys: Vec<&String> = h.fields.keys().collect();
        assert_eq!(keys, ["id", "title", "text"]);
        // Order survives a serde round-trip too.
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(json, r#"{"id":"doc1","title":"Capitals","text":"Paris"}"#);
    }

    #[test]
    fn metric_stats_empty_is_zero() {
        let stats = MetricStats::from_values(&[]);
        assert_eq!(stats.mean, 0.0);
        assert_eq!(stats.stddev, 0.0);
    }

    #[test]
    fn metric_stats_basic() {
        let stats = MetricStats::from_values(&[0.2, 0.4, 0.9]);
        assert!((stats.mean - 0.5).abs() < 1e-9);
        assert_eq!(stats.median, 0.4);
        assert_eq!(stats.min, 0.2);
        assert_eq!(stats.max, 0.9);
        assert!(stats.stddev > 0.0);
    }

    #[test]
    fn query_eval_accessors() {
        let failed = QueryEval::Failed {
            query: Query::new("q"),
            error: "search failed".to_string(),
        };
        assert_eq!(failed.query().text, "q");
        assert!(failed.result().is_none());
        assert_eq!(failed.error(), Some("search failed"));
    }

    #[test]
    fn token_usage_accumulates() {
        let mut total = TokenUsage::default();
        total.accumulate(TokenUsage {
            input_tokens: 100,
            output_tokens: 40,
        });
        total.accumulate(TokenUsage {
            input_tokens: 50,
            output_tokens: 10,
        });
        assert_eq!(total.input_tokens, 150);
        assert_eq!(total.output_tokens, 50);
    }
}
