//! Combined retry verdict for one reconciliation pass.

use chrono::{DateTime, Utc};

use super::error::CallError;
use super::policy::RetryEvaluator;
use crate::clock::Clock;

/// Verdict returned by [`RetryEvaluator::decide`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Abort the current reconciliation attempt regardless of retry budget.
    FailFast,
    /// Not retryable, out of retries, or past the error budget. Surface the failure.
    GiveUp,
    /// Still inside the backoff window; issue the call again.
    RetryNow,
    /// Past the backoff window, so no retry on this pass. Asking again with the
    /// same `last_update` and `attempt` keeps answering `Wait` until the error
    /// budget runs out; stamp a new `last_update` or advance `attempt` first.
    Wait,
}

pub(super) fn decide_in_order<E: RetryEvaluator + ?Sized>(
    evaluator: &E,
    clock: &dyn Clock,
    failure: Option<&CallError>,
    last_update: DateTime<Utc>,
    attempt: u32,
) -> RetryDecision {
    let decision = if evaluator.is_fail_fast(failure) {
        RetryDecision::FailFast
    } else if !evaluator.is_retryable(failure) || !evaluator.has_retries_remaining(failure, attempt)
    {
        RetryDecision::GiveUp
    } else {
        let (elapsed, within_budget) = evaluator.within_error_budget(clock, last_update);
        if !within_budget {
            RetryDecision::GiveUp
        } else if elapsed <= evaluator.compute_backoff_delay(attempt) {
            RetryDecision::RetryNow
        } else {
            RetryDecision::Wait
        }
    };
    tracing::debug!(
        "retry decision attempt={} method={:?} decision={:?}",
        attempt,
        failure.and_then(CallError::api).and_then(|e| e.method()),
        decision
    );
    decision
}
