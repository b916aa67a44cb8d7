//! HTTP client for the remote judge service.
//!
//! The wire protocol scores hits 0-3; [`RelevanceScore::from_wire`] translates
//! to the canonical 1-4 scale. The wire response also carries a `relevant`
//! flag and service-side metrics; both are ignored -- the binary predicate and
//! the metric engine in this crate are the source of truth.

use crate::config::JudgeConfig;
use crate::error::{EvalError, Result};
use crate::judge::{Judge, JudgeResponse};
use crate::model::{Query, RelevanceJudgment, SearchHit, TokenUsage};
use crate::scale::RelevanceScore;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Serialize)]
struct WireRequest<'a> {
    query: WireQuery<'a>,
    eval: WireEvalSpec<'a>,
    hits: &'a [SearchHit],
}

#[derive(Serialize)]
struct WireQuery<'a> {
    inputs: WireInputs<'a>,
}

#[derive(Serialize)]
struct WireInputs<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct WireEvalSpec<'a> {
    fields: &'a [String],
    debug: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
}

#[derive(Deserialize)]
struct WireResponse {
    hits: Vec<WireHitEval>,
    #[serde(default)]
    usage: WireUsage,
}

#[derive(Deserialize)]
struct WireHitEval {
    index: usize,
    /// 0-3 wire scale; absence is a protocol violation.
    score: Option<u8>,
    #[serde(default)]
    confidence: Option<f32>,
    #[serde(default)]
    justification: Option<String>,
}

#[derive(Deserialize, Default)]
struct WireUsage {
    #[serde(default)]
    evaluation_input_tokens: u64,
    #[serde(default)]
    evaluation_output_tokens: u64,
}

/// Judge client backed by the remote evals endpoint.
///
/// Endpoint, API key, judging model, evaluated fields, and the debug flag are
/// explicit construction-time state. Retry on transient failure lives in the
/// orchestrator, not here.
pub struct HttpJudge {
    client: Client,
    endpoint: String,
    api_key: String,
    model: Option<String>,
    fields: Vec<String>,
    debug: bool,
}

impl HttpJudge {
    /// Create a new judge client.
    ///
    /// `fields` names the hit fields the judge should evaluate; an empty list
    /// falls back to `["text"]`. `debug` asks the service for per-hit
    /// justifications.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created (should not happen in
    /// normal operation).
    pub fn new(
        endpoint: String,
        api_key: String,
        model: Option<String>,
        fields: Vec<String>,
        debug: bool,
        timeout: Duration,
    ) -> Self {
        let fields = if fields.is_empty() {
            vec!["text".to_string()]
        } else {
            fields
        };

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            endpoint,
            api_key,
            model,
            fields,
            debug,
        }
    }

    /// Build a judge client from configuration, reading the API key from the
    /// configured environment variable.
    pub fn from_config(config: &JudgeConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            EvalError::Config(format!(
                "Environment variable {} not set. Set it in your .env file or as an environment variable.",
                config.api_key_env
            ))
        })?;
        Ok(Self::new(
            config.endpoint.clone(),
            api_key,
            config.model.clone(),
            config.fields.clone(),
            config.debug,
            Duration::from_secs(config.timeout_secs),
        ))
    }

    async fn call(&self, query: &Query, hits: &[SearchHit]) -> Result<WireResponse> {
        let request = WireRequest {
            query: WireQuery {
                inputs: WireInputs { text: &query.text },
            },
            eval: WireEvalSpec {
                fields: &self.fields,
                debug: self.debug,
                model: self.model.as_deref(),
            },
            hits,
        };

        let start = std::time::Instant::now();
        let response = self
            .client
            .post(&self.endpoint)
            .header("Api-Key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| EvalError::JudgeUnavailable(format!("Network error: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            // 429 and 5xx are worth retrying; anything else means our request
            // was rejected and a retry would fail the same way.
            if status.as_u16() == 429 || status.is_server_error() {
                return Err(EvalError::JudgeUnavailable(format!(
                    "Judge API error {}: {}",
                    status, body
                )));
            }
            return Err(EvalError::JudgeResponseInvalid(format!(
                "Judge API error {}: {}",
                status, body
            )));
        }

        let wire: WireResponse = response
            .json()
            .await
            .map_err(|e| EvalError::JudgeResponseInvalid(format!("Failed to parse response: {}", e)))?;
        log::debug!(
            "judge call for '{}' ({} hits) took {:?}",
            query.text,
            hits.len(),
            start.elapsed()
        );
        Ok(wire)
    }
}

/// Restore hit order from the per-hit `index` values and translate wire
/// scores to the canonical scale.
fn parse_wire_response(mut wire: WireResponse) -> Result<JudgeResponse> {
    wire.hits.sort_unstable_by_key(|h| h.index);
    let mut judgments = Vec::with_capacity(wire.hits.len());
    for hit in wire.hits {
        let score = hit.score.ok_or_else(|| {
            EvalError::JudgeResponseInvalid(format!("hit {} missing score", hit.index))
        })?;
        judgments.push(RelevanceJudgment {
            score: RelevanceScore::from_wire(score)?,
            confidence: hit.confidence,
            justification: hit.justification,
        });
    }
    Ok(JudgeResponse {
        judgments,
        usage: TokenUsage {
            input_tokens: wire.usage.evaluation_input_tokens,
            output_tokens: wire.usage.evaluation_output_tokens,
        },
    })
}

#[async_trait]
impl Judge for HttpJudge {
    async fn judge(&self, query: &Query, hits: &[SearchHit]) -> Result<JudgeResponse> {
        let wire = self.call(query, hits).await?;
        parse_wire_response(wire)
    }
}
