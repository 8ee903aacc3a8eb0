//! `jobop backoff` – print the backoff schedule.

use jobop_core::retry::{RetryEvaluator, RetryPolicy};

/// Print one jittered delay per attempt, with the cap for reference.
pub fn run_backoff(policy: &RetryPolicy, attempts: u32) {
    println!(
        "base={}ms max={}ms error_budget={}s",
        policy.base_backoff().as_millis(),
        policy.max_backoff().as_millis(),
        policy.max_error_wait().as_secs()
    );
    println!("{:<8} {}", "ATTEMPT", "DELAY_MS");
    for attempt in 0..attempts {
        let delay = policy.compute_backoff_delay(attempt);
        let capped = if delay >= policy.max_backoff() { " (capped)" } else { "" };
        println!("{:<8} {}{}", attempt, delay.as_millis(), capped);
    }
}
