//! Structured failure type for control-plane calls.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Error code for a call that failed without a more specific category.
pub const GLOBAL_FAILURE: &str = "FAILED";
/// Error code for a response body that could not be decoded.
pub const JSON_UNMARSHAL_ERROR: &str = "JSONUNMARSHALERROR";
/// Retry bound used for transient failures when the caller has no better number.
pub const DEFAULT_RETRIES: u32 = 20;
/// Retry bound for failures that must not be retried.
pub const NO_RETRIES: u32 = 0;

/// Remote operations exposed by the cluster's control-plane API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApiMethod {
    SubmitJob,
    CancelJobWithSavepoint,
    ForceCancelJob,
    CheckSavepointStatus,
    GetJobs,
    GetClusterOverview,
    GetLatestCheckpoint,
    GetJobConfig,
    GetTaskManagers,
    GetCheckpointCounts,
    GetJobOverview,
}

impl ApiMethod {
    pub const ALL: [ApiMethod; 11] = [
        ApiMethod::SubmitJob,
        ApiMethod::CancelJobWithSavepoint,
        ApiMethod::ForceCancelJob,
        ApiMethod::CheckSavepointStatus,
        ApiMethod::GetJobs,
        ApiMethod::GetClusterOverview,
        ApiMethod::GetLatestCheckpoint,
        ApiMethod::GetJobConfig,
        ApiMethod::GetTaskManagers,
        ApiMethod::GetCheckpointCounts,
        ApiMethod::GetJobOverview,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ApiMethod::SubmitJob => "SubmitJob",
            ApiMethod::CancelJobWithSavepoint => "CancelJobWithSavepoint",
            ApiMethod::ForceCancelJob => "ForceCancelJob",
            ApiMethod::CheckSavepointStatus => "CheckSavepointStatus",
            ApiMethod::GetJobs => "GetJobs",
            ApiMethod::GetClusterOverview => "GetClusterOverview",
            ApiMethod::GetLatestCheckpoint => "GetLatestCheckpoint",
            ApiMethod::GetJobConfig => "GetJobConfig",
            ApiMethod::GetTaskManagers => "GetTaskManagers",
            ApiMethod::GetCheckpointCounts => "GetCheckpointCounts",
            ApiMethod::GetJobOverview => "GetJobOverview",
        }
    }
}

impl fmt::Display for ApiMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string does not name a known [`ApiMethod`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown api method: {0}")]
pub struct UnknownMethod(pub String);

impl FromStr for ApiMethod {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ApiMethod::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownMethod(s.to_string()))
    }
}

type Cause = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// A classified failure of one control-plane call.
///
/// Carries the operation that failed, a machine-readable code and the retry
/// parameters chosen when the failure was classified. The value is persisted
/// as part of resource status, so it serializes to a sparse camelCase record
/// and never changes after construction; a new one is built per failed
/// attempt. The wrapped cause (if any) is kept for `source()` but is not
/// serialized.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterApiError {
    #[serde(rename = "appError", default, skip_serializing_if = "String::is_empty")]
    message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    method: Option<ApiMethod>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    error_code: String,
    #[serde(default, skip_serializing_if = "is_false")]
    is_retryable: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    is_fail_fast: bool,
    #[serde(default, skip_serializing_if = "is_zero")]
    max_retries: u32,
    #[serde(rename = "startedAt", default, skip_serializing_if = "Option::is_none")]
    last_update_time: Option<DateTime<Utc>>,
    #[serde(skip)]
    cause: Option<Cause>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

impl ClusterApiError {
    pub(crate) fn from_parts(
        message: String,
        method: ApiMethod,
        error_code: String,
        is_retryable: bool,
        is_fail_fast: bool,
        max_retries: u32,
        cause: Option<Cause>,
    ) -> Self {
        Self {
            message,
            method: Some(method),
            error_code,
            is_retryable,
            is_fail_fast,
            max_retries,
            last_update_time: None,
            cause,
        }
    }

    /// Returns a copy of this failure stamped with the time it was observed.
    pub fn with_last_update_time(mut self, at: DateTime<Utc>) -> Self {
        self.last_update_time = Some(at);
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Always set on construction; may be absent in records read back from status.
    pub fn method(&self) -> Option<ApiMethod> {
        self.method
    }

    pub fn error_code(&self) -> &str {
        &self.error_code
    }

    pub fn is_retryable(&self) -> bool {
        self.is_retryable
    }

    pub fn is_fail_fast(&self) -> bool {
        self.is_fail_fast
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn last_update_time(&self) -> Option<DateTime<Utc>> {
        self.last_update_time
    }
}

impl fmt::Debug for ClusterApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterApiError")
            .field("message", &self.message)
            .field("method", &self.method)
            .field("error_code", &self.error_code)
            .field("is_retryable", &self.is_retryable)
            .field("is_fail_fast", &self.is_fail_fast)
            .field("max_retries", &self.max_retries)
            .field("last_update_time", &self.last_update_time)
            .finish()
    }
}

// The cause is already folded into `message`.
impl PartialEq for ClusterApiError {
    fn eq(&self, other: &Self) -> bool {
        self.message == other.message
            && self.method == other.method
            && self.error_code == other.error_code
            && self.is_retryable == other.is_retryable
            && self.is_fail_fast == other.is_fail_fast
            && self.max_retries == other.max_retries
            && self.last_update_time == other.last_update_time
    }
}

impl Eq for ClusterApiError {}

impl fmt::Display for ClusterApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ClusterApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.cause {
            Some(e) => Some(e.as_ref()),
            None => None,
        }
    }
}

/// Error half of a control-plane call result.
///
/// The remote-call layer returns `Result<T, CallError>`: either a classified
/// failure or something it could not classify. The retry evaluator treats
/// `Other` the same as no failure at all.
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    #[error(transparent)]
    Api(#[from] ClusterApiError),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CallError {
    /// The classified failure, if this is one.
    pub fn api(&self) -> Option<&ClusterApiError> {
        match self {
            CallError::Api(e) => Some(e),
            CallError::Other(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> ClusterApiError {
        ClusterApiError::from_parts(
            "SubmitJob call failed with status FAILED and message []".to_string(),
            ApiMethod::SubmitJob,
            GLOBAL_FAILURE.to_string(),
            true,
            false,
            DEFAULT_RETRIES,
            None,
        )
    }

    #[test]
    fn method_parses_case_insensitively() {
        assert_eq!("GetJobs".parse::<ApiMethod>(), Ok(ApiMethod::GetJobs));
        assert_eq!(
            "forcecanceljob".parse::<ApiMethod>(),
            Ok(ApiMethod::ForceCancelJob)
        );
        assert_eq!(
            "Nope".parse::<ApiMethod>(),
            Err(UnknownMethod("Nope".to_string()))
        );
    }

    #[test]
    fn every_method_displays_its_parseable_name() {
        for m in ApiMethod::ALL {
            assert_eq!(m.to_string().parse::<ApiMethod>(), Ok(m));
        }
    }

    #[test]
    fn serializes_sparse_record() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "appError": "SubmitJob call failed with status FAILED and message []",
                "method": "SubmitJob",
                "errorCode": "FAILED",
                "isRetryable": true,
                "maxRetries": 20,
            })
        );
    }

    #[test]
    fn timestamp_serializes_as_started_at() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let json = serde_json::to_value(sample().with_last_update_time(at)).unwrap();
        assert_eq!(json["startedAt"], "2024-03-01T12:00:00Z");
    }

    #[test]
    fn deserializes_sparse_record_with_defaults() {
        let parsed: ClusterApiError =
            serde_json::from_str(r#"{"method":"GetJobs","isFailFast":true}"#).unwrap();
        assert_eq!(parsed.method(), Some(ApiMethod::GetJobs));
        assert!(parsed.is_fail_fast());
        assert!(!parsed.is_retryable());
        assert_eq!(parsed.max_retries(), 0);
        assert_eq!(parsed.error_code(), "");
        assert!(parsed.last_update_time().is_none());
    }

    #[test]
    fn deserializes_record_without_method() {
        let parsed: ClusterApiError = serde_json::from_str(
            r#"{"appError":"call failed","errorCode":"FAILED","isRetryable":true,"maxRetries":3}"#,
        )
        .unwrap();
        assert_eq!(parsed.method(), None);
        assert!(parsed.is_retryable());
        assert_eq!(parsed.max_retries(), 3);

        let json = serde_json::to_value(&parsed).unwrap();
        assert!(json.get("method").is_none());
    }

    #[test]
    fn persisted_record_reads_back_equal() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let original = sample().with_last_update_time(at);
        let text = serde_json::to_string(&original).unwrap();
        let parsed: ClusterApiError = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn clone_does_not_alias_timestamp() {
        let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2024, 3, 1, 13, 0, 0).unwrap();
        let original = sample().with_last_update_time(t0);

        let copy = original.clone().with_last_update_time(t1);

        assert_eq!(original.last_update_time(), Some(t0));
        assert_eq!(copy.last_update_time(), Some(t1));
        assert_eq!(copy.message(), original.message());
        assert_eq!(copy.max_retries(), original.max_retries());
        assert_ne!(copy, original);
    }

    #[test]
    fn call_error_exposes_only_classified_failures() {
        let api: CallError = sample().into();
        assert!(api.api().is_some());
        let other: CallError = anyhow::anyhow!("socket closed").into();
        assert!(other.api().is_none());
        assert_eq!(other.to_string(), "socket closed");
    }
}
