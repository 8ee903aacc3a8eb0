//! Integration tests: a reconciliation loop driving the retry policy with a fake clock.

use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use jobop_core::clock::{Clock, FakeClock};
use jobop_core::retry::{
    classify, ApiMethod, CallError, Classification, ClusterApiError, RetryDecision,
    RetryEvaluator, RetryPolicy, GLOBAL_FAILURE,
};

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 9, 14, 10, 30, 0).unwrap()
}

fn policy() -> RetryPolicy {
    RetryPolicy::with_seed(
        Duration::from_millis(100),
        Duration::from_secs(300),
        Duration::from_millis(10_000),
        2024,
    )
}

/// Stand-in for the remote-call layer.
fn submit_job(fail: bool) -> Result<String, CallError> {
    if fail {
        Err(classify(
            Some(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "request timed out",
            )),
            ApiMethod::SubmitJob,
            Classification::retryable(GLOBAL_FAILURE, 20),
            &["job", "wordcount"],
        )
        .into())
    } else {
        Ok("job-1".to_string())
    }
}

#[test]
fn retry_budget_runs_out_on_the_twenty_second_check() {
    let p = policy();
    let err = submit_job(true).unwrap_err();

    for attempt in 0..=20 {
        assert!(
            p.has_retries_remaining(Some(&err), attempt),
            "attempt {} should still have budget",
            attempt
        );
    }
    assert!(!p.has_retries_remaining(Some(&err), 21));
}

#[test]
fn loop_retries_then_gives_up_when_budget_exhausted() {
    let p = policy();
    let clock = FakeClock::new(start());
    let mut attempt = 0u32;
    let mut retries = 0u32;

    let final_decision = loop {
        let err = submit_job(true).unwrap_err();
        let failure = match &err {
            CallError::Api(e) => e.clone().with_last_update_time(clock.now()),
            CallError::Other(e) => panic!("unexpected unclassified failure: {e}"),
        };
        let last_update = failure.last_update_time().unwrap();
        let persisted = CallError::Api(failure);

        // next reconciliation pass, 50ms later: always inside the window
        clock.step(Duration::from_millis(50));
        match p.decide(&clock, Some(&persisted), last_update, attempt) {
            RetryDecision::RetryNow => {
                retries += 1;
                attempt += 1;
            }
            other => break other,
        }
    };

    assert_eq!(final_decision, RetryDecision::GiveUp);
    assert_eq!(retries, 21);
    assert_eq!(attempt, 21);
}

#[test]
fn long_outage_exhausts_error_budget() {
    let p = policy();
    let clock = FakeClock::new(start());
    let err = submit_job(true).unwrap_err();

    clock.step(Duration::from_secs(300));
    assert_eq!(
        p.within_error_budget(&clock, start()),
        (Duration::from_secs(300), true)
    );

    clock.step(Duration::from_secs(1));
    let (elapsed, ok) = p.within_error_budget(&clock, start());
    assert_eq!(elapsed, Duration::from_secs(301));
    assert!(!ok);
    assert_eq!(
        p.decide(&clock, Some(&err), start(), 0),
        RetryDecision::GiveUp
    );
}

#[test]
fn success_needs_no_decision() {
    let p = policy();
    let outcome = submit_job(false);
    assert_eq!(outcome.as_deref().ok(), Some("job-1"));
    let failure = outcome.as_ref().err();
    assert!(!p.is_retryable(failure));
    assert!(!p.is_fail_fast(failure));
}

#[test]
fn backoff_schedule_matches_documented_windows() {
    let p = policy();
    for _ in 0..100 {
        let d0 = p.compute_backoff_delay(0);
        assert!(Duration::from_millis(100) <= d0 && d0 < Duration::from_millis(200));
        let d3 = p.compute_backoff_delay(3);
        assert!(Duration::from_millis(800) <= d3 && d3 < Duration::from_millis(1600));
        assert_eq!(p.compute_backoff_delay(20), Duration::from_millis(10_000));
    }
}

#[test]
fn persisted_status_snapshot_is_independent() {
    let live = ClusterApiError::non_retryable(
        None::<std::io::Error>,
        ApiMethod::CancelJobWithSavepoint,
        "409",
        &["savepoint in progress"],
    )
    .with_last_update_time(start());

    let json = serde_json::to_string(&live).unwrap();
    let snapshot: ClusterApiError = serde_json::from_str(&json).unwrap();
    assert_eq!(snapshot, live);

    let moved = snapshot
        .clone()
        .with_last_update_time(start() + chrono::TimeDelta::minutes(1));
    assert_eq!(live.last_update_time(), Some(start()));
    assert_eq!(snapshot.last_update_time(), Some(start()));
    assert_ne!(moved.last_update_time(), live.last_update_time());
    assert!(!json.contains("isRetryable"));
    assert!(!json.contains("maxRetries"));
}
