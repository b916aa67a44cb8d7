//! Evaluation CLI: judge preloaded hits for each query and report NDCG, MAP,
//! and MRR, emitting the structured result as JSON.

use clap::Parser;
use searcheval::{
    evaluator::{Evaluator, RetryPolicy},
    judge::{HttpJudge, Judge, MockJudge},
    model::Query,
    report::{self, EvaluationReport},
    runner::{ApproachRunner, RunOptions, SearchFn},
    Config, SearchResult,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Evaluate one search approach from preloaded hits.
#[derive(Parser, Debug)]
#[command(name = "searcheval")]
struct Args {
    /// Path to queries JSON (array of {"text": ...}).
    #[arg(long, default_value = "queries.json")]
    queries: PathBuf,

    /// Path to hits JSON (object mapping query text to an ordered hit list).
    #[arg(long)]
    hits: PathBuf,

    /// Approach name used in the report.
    #[arg(long, default_value = "api_evaluation")]
    name: String,

    /// Write the structured report here instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Use the deterministic offline judge instead of the configured service.
    #[arg(long)]
    mock: bool,
}

/// Search function over preloaded hits: queries with no entry get an empty
/// result list (which evaluates to all-zero metrics).
fn preloaded_search(hits_by_query: HashMap<String, Vec<searcheval::SearchHit>>) -> Arc<SearchFn> {
    Arc::new(move |query: &Query| {
        let hits = match hits_by_query.get(&query.text) {
            Some(hits) => hits.clone(),
            None => {
                log::warn!("no hits found for query: {}", query.text);
                Vec::new()
            }
        };
        Ok(SearchResult {
            query: query.clone(),
            hits,
        })
    })
}

/// Build judge + evaluator + runner from config, or defaults for --mock.
fn build_runner(mock: bool) -> anyhow::Result<ApproachRunner> {
    if mock {
        let judge: Arc<dyn Judge> = Arc::new(MockJudge::new());
        return Ok(ApproachRunner::new(Evaluator::new(judge)));
    }

    let config = Config::load()?;
    let judge: Arc<dyn Judge> = Arc::new(HttpJudge::from_config(&config.judge)?);
    let mut evaluator = Evaluator::new(judge).with_retry(RetryPolicy {
        max_attempts: config.judge.max_retries,
        initial_backoff: Duration::from_millis(config.judge.backoff_ms),
    });
    if let Some(k) = config.run.ndcg_k {
        evaluator = evaluator.with_ndcg_k(k);
    }
    Ok(ApproachRunner::new(evaluator).with_options(RunOptions {
        concurrency: config.run.concurrency,
    }))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().filter_or("RUST_LOG", "info")).init();

    let args = Args::parse();
    let queries = report::load_queries(&args.queries)?;
    let hits_by_query = report::load_hits(&args.hits)?;

    println!(
        "Running evaluation on {} queries ('{}')\n",
        queries.len(),
        args.name
    );

    let runner = build_runner(args.mock)?;
    let summary = runner
        .run(&args.name, preloaded_search(hits_by_query), &queries)
        .await;

    for query_eval in &summary.queries {
        match query_eval.result() {
            Some(result) => println!(
                "  {} (NDCG: {:.4}, MAP: {:.4}, MRR: {:.4}, relevant: {}/{})",
                result.query.text,
                result.metrics.ndcg,
                result.metrics.map,
                result.metrics.mrr,
                result.relevant_count(),
                result.hits.len()
            ),
            None => println!(
                "  {} FAILED: {}",
                query_eval.query().text,
                query_eval.error().unwrap_or("unknown")
            ),
        }
    }

    println!("\n=== Evaluation Results ('{}') ===", summary.name);
    println!("NDCG (mean): {:.4}", summary.metrics.ndcg.mean);
    println!("MAP  (mean): {:.4}", summary.metrics.map.mean);
    println!("MRR  (mean): {:.4}", summary.metrics.mrr.mean);
    println!(
        "Failures:    {}/{}",
        summary.failure_count,
        summary.queries.len()
    );
    println!(
        "Judge usage: {} input / {} output tokens",
        summary.usage.input_tokens, summary.usage.output_tokens
    );

    let all_failed = summary.failure_count == summary.queries.len();
    let report = EvaluationReport::new(vec![summary], None);
    match &args.output {
        Some(path) => report.save(path)?,
        None => println!("\n{}", report.to_json()?),
    }

    if all_failed {
        anyhow::bail!("every query failed evaluation");
    }
    Ok(())
}
