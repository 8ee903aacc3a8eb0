//! Classify failed control-plane calls into structured failures.

use std::sync::Arc;

use super::error::{
    ApiMethod, ClusterApiError, DEFAULT_RETRIES, GLOBAL_FAILURE, JSON_UNMARSHAL_ERROR, NO_RETRIES,
};

/// Retry parameters attached to a failure when it is classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub error_code: String,
    pub is_retryable: bool,
    pub is_fail_fast: bool,
    pub max_retries: u32,
}

impl Classification {
    /// Transient failure, worth retrying up to `max_retries` times.
    pub fn retryable(error_code: impl Into<String>, max_retries: u32) -> Self {
        Self {
            error_code: error_code.into(),
            is_retryable: true,
            is_fail_fast: false,
            max_retries,
        }
    }

    /// Failure that should abort the current reconciliation attempt.
    pub fn non_retryable(error_code: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            is_retryable: false,
            is_fail_fast: true,
            max_retries: NO_RETRIES,
        }
    }

    /// Final failure that is surfaced but does not abort the reconciliation cycle.
    pub fn terminal(error_code: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            is_retryable: false,
            is_fail_fast: false,
            max_retries: NO_RETRIES,
        }
    }

    /// The remote response could not be decoded.
    pub fn decode() -> Self {
        Self::non_retryable(JSON_UNMARSHAL_ERROR)
    }
}

/// Build a [`ClusterApiError`] for a failed call to `method`.
///
/// Without a cause the message is synthesized from the method, code and
/// context. With a cause the same summary is prefixed to the cause's message
/// and the cause stays reachable through `source()`.
pub fn classify<E>(
    cause: Option<E>,
    method: ApiMethod,
    class: Classification,
    context: &[&str],
) -> ClusterApiError
where
    E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
{
    let summary = format!(
        "{} call failed with status {} and message [{}]",
        method,
        class.error_code,
        context.join(" ")
    );
    let cause: Option<Arc<dyn std::error::Error + Send + Sync + 'static>> = cause.map(|e| {
        let boxed: Box<dyn std::error::Error + Send + Sync + 'static> = e.into();
        Arc::from(boxed)
    });
    let message = match &cause {
        Some(e) => format!("{}: {}", summary, e),
        None => summary,
    };
    ClusterApiError::from_parts(
        message,
        method,
        class.error_code,
        class.is_retryable,
        class.is_fail_fast,
        class.max_retries,
        cause,
    )
}

impl ClusterApiError {
    /// Transient failure with the given retry bound.
    pub fn retryable<E>(
        cause: Option<E>,
        method: ApiMethod,
        error_code: &str,
        max_retries: u32,
        context: &[&str],
    ) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        classify(
            cause,
            method,
            Classification::retryable(error_code, max_retries),
            context,
        )
    }

    /// Fail-fast failure with no retries.
    pub fn non_retryable<E>(
        cause: Option<E>,
        method: ApiMethod,
        error_code: &str,
        context: &[&str],
    ) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        classify(
            cause,
            method,
            Classification::non_retryable(error_code),
            context,
        )
    }

    /// Response body for `method` could not be decoded.
    pub fn decode(cause: serde_json::Error, method: ApiMethod) -> Self {
        classify(Some(cause), method, Classification::decode(), &[])
    }
}

/// Classify a non-success HTTP status returned by the control plane.
///
/// Throttling and server errors are retried with [`DEFAULT_RETRIES`]; anything
/// else (bad request, not found, conflict) is not. The status number becomes
/// the error code. Status 0 means no response was received.
pub fn classify_http_status(status: u16) -> Classification {
    match status {
        0 => Classification::retryable(GLOBAL_FAILURE, DEFAULT_RETRIES),
        429 | 500..=599 => Classification::retryable(status.to_string(), DEFAULT_RETRIES),
        _ => Classification::non_retryable(status.to_string()),
    }
}
