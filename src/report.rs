//! Structured report emission and evaluation input loading.
//!
//! Summaries and comparisons are emitted as JSON for external renderers;
//! producing markdown or HTML from this data is a consumer's job, not ours.

use crate::compare::ComparisonReport;
use crate::error::{EvalError, Result};
use crate::model::{ApproachSummary, Query, SearchHit};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Top-level structured output of an evaluation run: every approach summary
/// plus the comparison when two or more approaches were evaluated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub generated_at: DateTime<Utc>,
    pub approaches: Vec<ApproachSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison: Option<ComparisonReport>,
}

impl EvaluationReport {
    pub fn new(approaches: Vec<ApproachSummary>, comparison: Option<ComparisonReport>) -> Self {
        EvaluationReport {
            generated_at: Utc::now(),
            approaches,
            comparison,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| EvalError::Parse(format!("serialize report: {}", e)))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        log::info!("report written to {}", path.display());
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw)
            .map_err(|e| EvalError::Parse(format!("{}: {}", path.display(), e)))
    }
}

/// Load queries from a JSON array of `{"text": ...}` objects.
pub fn load_queries(path: &Path) -> Result<Vec<Query>> {
    let raw = std::fs::read_to_string(path)?;
    let queries: Vec<Query> = serde_json::from_str(&raw)
        .map_err(|e| EvalError::Parse(format!("{}: {}", path.display(), e)))?;
    if queries.is_empty() {
        return Err(EvalError::InvalidInput(format!(
            "no queries in {}",
            path.display()
        )));
    }
    Ok(queries)
}

/// Load preloaded hits from a JSON object mapping query text to an ordered
/// hit list.
pub fn load_hits(path: &Path) -> Result<HashMap<String, Vec<SearchHit>>> {
    let raw = std::fs::read_to_string(path)?;
    serde_json::from_str(&raw)
        .map_err(|e| EvalError::Parse(format!("{}: {}", path.display(), e)))
}
