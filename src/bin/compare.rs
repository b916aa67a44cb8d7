//! Comparison CLI: evaluate several named approaches over one query set and
//! emit the comparison report.

use clap::Parser;
use searcheval::{
    compare::compare,
    evaluator::{Evaluator, RetryPolicy},
    judge::{HttpJudge, Judge, MockJudge},
    model::Query,
    report::{self, EvaluationReport},
    runner::{ApproachRunner, RunOptions, SearchFn},
    Config, SearchHit, SearchResult,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Compare search approaches over the same query set.
#[derive(Parser, Debug)]
#[command(name = "compare")]
struct Args {
    /// Path to queries JSON (array of {"text": ...}).
    #[arg(long, default_value = "queries.json")]
    queries: PathBuf,

    /// Approach as name=hits.json; repeat per approach. The first is the
    /// comparison baseline.
    #[arg(long = "approach", required = true)]
    approaches: Vec<String>,

    /// Write the structured report here instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Use the deterministic offline judge instead of the configured service.
    #[arg(long)]
    mock: bool,
}

fn parse_approach(spec: &str) -> anyhow::Result<(String, PathBuf)> {
    match spec.split_once('=') {
        Some((name, path)) if !name.is_empty() && !path.is_empty() => {
            Ok((name.to_string(), PathBuf::from(path)))
        }
        _ => anyhow::bail!("--approach expects name=hits.json, got '{}'", spec),
    }
}

fn preloaded_search(hits_by_query: HashMap<String, Vec<SearchHit>>) -> Arc<SearchFn> {
    Arc::new(move |query: &Query| {
        let hits = hits_by_query.get(&query.text).cloned().unwrap_or_else(|| {
            log::warn!("no hits found for query: {}", query.text);
            Vec::new()
        });
        Ok(SearchResult {
            query: query.clone(),
            hits,
        })
    })
}

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
    let specs: Vec<(String, PathBuf)> = args
        .approaches
        .iter()
        .map(|s| parse_approach(s))
        .collect::<anyhow::Result<_>>()?;
    if specs.len() < 2 {
        anyhow::bail!("comparison needs at least two --approach arguments");
    }

    let queries = report::load_queries(&args.queries)?;
    let runner = build_runner(args.mock)?;

    let mut summaries = Vec::with_capacity(specs.len());
    for (name, hits_path) in &specs {
        println!("Evaluating '{}' on {} queries...", name, queries.len());
        let hits_by_query = report::load_hits(hits_path)?;
        let summary = runner
            .run(name, preloaded_search(hits_by_query), &queries)
            .await;
        println!(
            "  NDCG {:.4} | MAP {:.4} | MRR {:.4} | failures {}/{}",
            summary.metrics.ndcg.mean,
            summary.metrics.map.mean,
            summary.metrics.mrr.mean,
            summary.failure_count,
            summary.queries.len()
        );
        summaries.push(summary);
    }

    let comparison = compare(&summaries)?;

    println!("\n=== Comparison (baseline: '{}') ===", comparison.baseline);
    for counts in &comparison.win_counts {
        println!(
            "  {}: {} NDCG wins, {} MAP wins, {} MRR wins",
            counts.approach, counts.ndcg, counts.map, counts.mrr
        );
    }
    for delta in &comparison.mean_deltas {
        println!(
            "  {} vs baseline: NDCG {:+.4}, MAP {:+.4}, MRR {:+.4}",
            delta.approach, delta.ndcg, delta.map, delta.mrr
        );
    }

    let report = EvaluationReport::new(summaries, Some(comparison));
    match &args.output {
        Some(path) => report.save(path)?,
        None => println!("\n{}", report.to_json()?),
    }
    Ok(())
}
