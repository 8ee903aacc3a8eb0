//! Exponential backoff with jitter and the retry queries built on it.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

use super::decide::{decide_in_order, RetryDecision};
use super::error::CallError;
use crate::clock::Clock;
use crate::config::RetryConfig;

/// Questions a reconciliation loop asks about a failed control-plane call.
///
/// Absent failures and failures that were never classified (`CallError::Other`)
/// get the conservative answer everywhere: not retryable, not fail-fast, no
/// retries remaining. None of these methods fail.
pub trait RetryEvaluator {
    fn is_retryable(&self, failure: Option<&CallError>) -> bool;

    /// `attempt <= max_retries`; the attempt equal to the bound still counts.
    fn has_retries_remaining(&self, failure: Option<&CallError>, attempt: u32) -> bool;

    fn is_fail_fast(&self, failure: Option<&CallError>) -> bool;

    /// Elapsed time since `last_update`, and whether it is still within the error budget.
    fn within_error_budget(&self, clock: &dyn Clock, last_update: DateTime<Utc>)
        -> (Duration, bool);

    /// Jittered exponential backoff for the given attempt, capped at the policy maximum.
    fn compute_backoff_delay(&self, attempt: u32) -> Duration;

    fn should_retry_now(&self, clock: &dyn Clock, last_update: DateTime<Utc>, attempt: u32)
        -> bool;

    /// Combine the queries above into one verdict.
    ///
    /// Checked in order: fail-fast, retryable, retry budget, error budget,
    /// backoff window.
    fn decide(
        &self,
        clock: &dyn Clock,
        failure: Option<&CallError>,
        last_update: DateTime<Utc>,
        attempt: u32,
    ) -> RetryDecision {
        decide_in_order(self, clock, failure, last_update, attempt)
    }
}

/// Exponential backoff policy with jitter and hard caps.
///
/// Holds no per-call state. The jitter generator is owned by the policy and
/// locked per draw, so one policy can be shared across reconciliation workers.
#[derive(Debug)]
pub struct RetryPolicy<R = StdRng> {
    base_backoff: Duration,
    max_error_wait: Duration,
    max_backoff: Duration,
    rng: Mutex<R>,
}

impl RetryPolicy<StdRng> {
    /// Policy with an OS-seeded jitter generator.
    pub fn new(base_backoff: Duration, max_error_wait: Duration, max_backoff: Duration) -> Self {
        Self::with_rng(base_backoff, max_error_wait, max_backoff, StdRng::from_os_rng())
    }

    /// Policy whose jitter sequence is reproducible.
    pub fn with_seed(
        base_backoff: Duration,
        max_error_wait: Duration,
        max_backoff: Duration,
        seed: u64,
    ) -> Self {
        Self::with_rng(
            base_backoff,
            max_error_wait,
            max_backoff,
            StdRng::seed_from_u64(seed),
        )
    }

    pub fn from_config(cfg: &RetryConfig) -> Self {
        Self::new(cfg.base_backoff(), cfg.max_error_wait(), cfg.max_backoff())
    }
}

impl Default for RetryPolicy<StdRng> {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl<R: RngCore> RetryPolicy<R> {
    pub fn with_rng(
        base_backoff: Duration,
        max_error_wait: Duration,
        max_backoff: Duration,
        rng: R,
    ) -> Self {
        Self {
            base_backoff,
            max_error_wait,
            max_backoff,
            rng: Mutex::new(rng),
        }
    }

    pub fn base_backoff(&self) -> Duration {
        self.base_backoff
    }

    pub fn max_error_wait(&self) -> Duration {
        self.max_error_wait
    }

    pub fn max_backoff(&self) -> Duration {
        self.max_backoff
    }

    fn jitter_ms(&self, base_ms: u64) -> u64 {
        if base_ms == 0 {
            return 0;
        }
        self.rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .random_range(0..base_ms)
    }
}

impl<R: RngCore> RetryEvaluator for RetryPolicy<R> {
    fn is_retryable(&self, failure: Option<&CallError>) -> bool {
        failure
            .and_then(CallError::api)
            .is_some_and(|e| e.is_retryable())
    }

    fn has_retries_remaining(&self, failure: Option<&CallError>, attempt: u32) -> bool {
        failure
            .and_then(CallError::api)
            .is_some_and(|e| attempt <= e.max_retries())
    }

    fn is_fail_fast(&self, failure: Option<&CallError>) -> bool {
        failure
            .and_then(CallError::api)
            .is_some_and(|e| e.is_fail_fast())
    }

    fn within_error_budget(
        &self,
        clock: &dyn Clock,
        last_update: DateTime<Utc>,
    ) -> (Duration, bool) {
        let elapsed = clock.since(last_update);
        (elapsed, elapsed <= self.max_error_wait)
    }

    fn compute_backoff_delay(&self, attempt: u32) -> Duration {
        let base_ms = u64::try_from(self.base_backoff.as_millis()).unwrap_or(u64::MAX);
        // Uniform in [base, 2*base), then scaled by 2^attempt. Saturates
        // rather than wrapping for large attempts; the cap applies after.
        let window = base_ms.saturating_add(self.jitter_ms(base_ms));
        let delay_ms = match 1u64.checked_shl(attempt) {
            Some(factor) => factor.saturating_mul(window),
            None if window == 0 => 0,
            None => u64::MAX,
        };
        Duration::from_millis(delay_ms).min(self.max_backoff)
    }

    fn should_retry_now(
        &self,
        clock: &dyn Clock,
        last_update: DateTime<Utc>,
        attempt: u32,
    ) -> bool {
        clock.since(last_update) <= self.compute_backoff_delay(attempt)
    }
}
