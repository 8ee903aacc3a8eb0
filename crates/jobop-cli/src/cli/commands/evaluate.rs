//! `jobop evaluate` – run a persisted failure record through the retry policy.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use jobop_core::clock::{Clock, SystemClock};
use jobop_core::retry::{
    ApiMethod, CallError, ClusterApiError, RetryDecision, RetryEvaluator, RetryPolicy,
};
use std::fs;
use std::path::Path;

fn describe(decision: RetryDecision) -> String {
    match decision {
        RetryDecision::FailFast => "fail fast".to_string(),
        RetryDecision::GiveUp => "give up".to_string(),
        RetryDecision::RetryNow => "retry now".to_string(),
        RetryDecision::Wait => "wait (restamp or advance the attempt first)".to_string(),
    }
}

pub fn run_evaluate(
    policy: &RetryPolicy,
    path: &Path,
    attempt: u32,
    last_update: Option<DateTime<Utc>>,
) -> Result<()> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading failure record {}", path.display()))?;
    let record: ClusterApiError = serde_json::from_str(&data)
        .with_context(|| format!("parsing failure record {}", path.display()))?;

    let clock = SystemClock;
    let last_update = last_update
        .or(record.last_update_time())
        .unwrap_or_else(|| clock.now());
    let failure = CallError::Api(record);
    let (elapsed, within_budget) = policy.within_error_budget(&clock, last_update);

    let method = failure
        .api()
        .and_then(|e| e.method())
        .map_or("-", ApiMethod::as_str);
    println!("method:            {}", method);
    println!("retryable:         {}", policy.is_retryable(Some(&failure)));
    println!("fail fast:         {}", policy.is_fail_fast(Some(&failure)));
    println!(
        "retries remaining: {}",
        policy.has_retries_remaining(Some(&failure), attempt)
    );
    println!(
        "elapsed:           {}s (within budget: {})",
        elapsed.as_secs(),
        within_budget
    );
    let decision = policy.decide(&clock, Some(&failure), last_update, attempt);
    println!("decision:          {}", describe(decision));
    Ok(())
}
