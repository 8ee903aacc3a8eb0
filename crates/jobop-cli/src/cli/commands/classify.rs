//! `jobop classify` – build a status record for a failed call.

use anyhow::{anyhow, Result};
use jobop_core::clock::{Clock, SystemClock};
use jobop_core::retry::{classify, ApiMethod, Classification, ClusterApiError};

#[derive(Debug, Clone)]
pub struct ClassifyArgs {
    pub method: ApiMethod,
    pub code: String,
    pub retryable: bool,
    pub fail_fast: bool,
    pub max_retries: u32,
    pub cause: Option<String>,
    pub stamp: bool,
    pub context: Vec<String>,
}

fn build_record(args: &ClassifyArgs, clock: &dyn Clock) -> ClusterApiError {
    let class = Classification {
        error_code: args.code.clone(),
        is_retryable: args.retryable,
        is_fail_fast: args.fail_fast,
        max_retries: args.max_retries,
    };
    let context: Vec<&str> = args.context.iter().map(String::as_str).collect();
    let cause = args.cause.as_ref().map(|c| anyhow!("{}", c));
    let record = classify(cause, args.method, class, &context);
    if args.stamp {
        record.with_last_update_time(clock.now())
    } else {
        record
    }
}

pub fn run_classify(args: ClassifyArgs) -> Result<()> {
    let record = build_record(&args, &SystemClock);
    tracing::info!(
        "classified {} failure code={}",
        args.method,
        record.error_code()
    );
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}
