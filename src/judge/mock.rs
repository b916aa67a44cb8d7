//! Deterministic offline judge for tests and dry runs: a hit is highly
//! relevant when any query word appears in any of its string fields.

use crate::error::Result;
use crate::judge::{Judge, JudgeResponse};
use crate::model::{Query, RelevanceJudgment, SearchHit, TokenUsage};
use crate::scale::RelevanceScore;
use async_trait::async_trait;
use serde_json::Value;

/// Keyword-overlap judge. No network, no state; identical inputs always
/// produce identical judgments, which makes it suitable for idempotence and
/// pipeline tests as well as `--mock` CLI runs.
#[derive(Debug, Clone, Default)]
pub struct MockJudge;

impl MockJudge {
    pub fn new() -> Self {
        MockJudge
    }

    fn score_hit(query: &Query, hit: &SearchHit) -> RelevanceScore {
        let query_words: Vec<String> = query
            .text
            .to_lowercase()
            .split_whitespace()
            .map(String::from)
            .collect();
        let matched = hit.fields.values().any(|value| match value {
            Value::String(text) => {
                let text = text.to_lowercase();
                query_words.iter().any(|word| text.contains(word))
            }
            _ => false,
        });
        if matched {
            RelevanceScore::HighlyRelevant
        } else {
            RelevanceScore::PartiallyRelevant
        }
    }
}

#[async_trait]
impl Judge for MockJudge {
    async fn judge(&self, query: &Query, hits: &[SearchHit]) -> Result<JudgeResponse> {
        let judgments = hits
            .iter()
            .map(|hit| {
                let score = Self::score_hit(query, hit);
                RelevanceJudgment {
                    score,
                    confidence: None,
                    justification: Some(if score.is_relevant() {
                        "Hit text overlaps the query terms".to_string()
                    } else {
                        "No query term appears in the hit fields".to_string()
                    }),
                }
            })
            .collect();
        Ok(JudgeResponse {
            judgments,
            usage: TokenUsage {
                input_tokens: 1000,
                output_tokens: 500,
            },
        })
    }
}
