//! Judgment client adapters: the `Judge` trait plus the HTTP client for the
//! remote judge service and a deterministic offline mock.

pub mod http;
pub mod mock;

pub use http::HttpJudge;
pub use mock::MockJudge;

use crate::error::Result;
use crate::model::{Query, RelevanceJudgment, SearchHit, TokenUsage};
use async_trait::async_trait;

/// Ordered judgments plus token accounting for one judge call.
#[derive(Debug, Clone)]
pub struct JudgeResponse {
    /// One judgment per hit, in the same order as the hits supplied.
    pub judgments: Vec<RelevanceJudgment>,
    pub usage: TokenUsage,
}

/// Boundary to the external relevance judge.
///
/// Implementations translate a query and its ordered hits into the judge's
/// request/response shapes and return one judgment per hit in hit order. No
/// metric computation happens here. Errors split into
/// `JudgeUnavailable` (transient, retried by the orchestrator) and
/// `JudgeResponseInvalid` (permanent, surfaced per query).
#[async_trait]
pub trait Judge: Send + Sync {
    async fn judge(&self, query: &Query, hits: &[SearchHit]) -> Result<JudgeResponse>;
}
