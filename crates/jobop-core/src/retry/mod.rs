//! Failure classification and retry policy.
//!
//! This module turns failed control-plane calls into structured failures
//! (operation, error code, retry metadata) and evaluates them against an
//! exponential backoff policy so that the reconciliation loop can decide
//! whether to retry, wait, give up or fail fast.

mod classify;
mod decide;
mod error;
mod policy;

pub use classify::{classify, classify_http_status, Classification};
pub use decide::RetryDecision;
pub use error::{
    ApiMethod, CallError, ClusterApiError, UnknownMethod, DEFAULT_RETRIES, GLOBAL_FAILURE,
    JSON_UNMARSHAL_ERROR, NO_RETRIES,
};
pub use policy::{RetryEvaluator, RetryPolicy};
