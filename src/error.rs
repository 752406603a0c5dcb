use std::fmt::Display;

use thiserror::Error;
use tracing_error::{ExtractSpanTrace, SpanTrace};

use crate::models::status::StatusReason;
use crate::spec_builder::SpecBuildError;
use crate::store::StoreError;

#[derive(Debug)]
pub struct SpannedErr<T> {
    pub err: T,
    pub span_trace: SpanTrace,
}

impl<T> SpannedErr<T> {
    pub fn capture(err: T) -> Self {
        SpannedErr {
            err,
            span_trace: SpanTrace::capture(),
        }
    }
}

pub trait SpannedExt<T, E> {
    fn with_span_trace(self) -> Result<T, SpannedErr<E>>;
}

impl<T, E> SpannedExt<T, E> for Result<T, E> {
    fn with_span_trace(self) -> Result<T, SpannedErr<E>> {
        self.map_err(SpannedErr::capture)
    }
}

impl<E> ExtractSpanTrace for SpannedErr<E> {
    fn span_trace(&self) -> Option<&SpanTrace> {
        Some(&self.span_trace)
    }
}

impl<T: Display> Display for SpannedErr<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.err, f)
    }
}

impl<U: std::error::Error> std::error::Error for SpannedErr<U> {}

/// Causes that reach callers as `Unknown`
#[derive(Error, Debug)]
pub enum InternalError {
    #[error("{0}")]
    Store(#[from] StoreError),

    #[error("{0}")]
    SpecBuild(#[from] SpecBuildError),

    #[error("Failed to serialize {what}: {source}")]
    Serialize {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{kind} '{name}' has no uid and cannot own other resources")]
    MissingUid { kind: String, name: String },

    #[error("{0} is not supported yet")]
    Unsupported(&'static str),
}

/// Errors returned by the batch and job handlers
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{kind} {name} not found")]
    NotFound { kind: String, name: String },

    #[error("{kind} is invalid: {reason}")]
    Invalid { kind: String, reason: String },

    #[error("{0}")]
    Unknown(SpannedErr<InternalError>),
}

impl ApiError {
    pub fn not_found(kind: impl Into<String>, name: impl Into<String>) -> Self {
        ApiError::NotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }

    pub fn invalid(kind: impl Into<String>, reason: impl Display) -> Self {
        ApiError::Invalid {
            kind: kind.into(),
            reason: reason.to_string(),
        }
    }

    pub fn unknown(err: impl Into<InternalError>) -> Self {
        ApiError::Unknown(SpannedErr::capture(err.into()))
    }

    pub fn reason(&self) -> StatusReason {
        match self {
            ApiError::NotFound { .. } => StatusReason::NotFound,
            ApiError::Invalid { .. } => StatusReason::Invalid,
            ApiError::Unknown(_) => StatusReason::Unknown,
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::NotFound { .. } => 404,
            ApiError::Invalid { .. } => 422,
            ApiError::Unknown(_) => 500,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::unknown(err)
    }
}

impl From<SpecBuildError> for ApiError {
    fn from(err: SpecBuildError) -> Self {
        ApiError::unknown(err)
    }
}

impl From<InternalError> for ApiError {
    fn from(err: InternalError) -> Self {
        ApiError::unknown(err)
    }
}

impl ExtractSpanTrace for ApiError {
    fn span_trace(&self) -> Option<&SpanTrace> {
        match self {
            ApiError::Unknown(e) => e.span_trace(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_mapping() {
        let not_found = ApiError::not_found("batch", "batch-1");
        assert_eq!(not_found.to_string(), "batch batch-1 not found");
        assert_eq!(not_found.status_code(), 404);
        assert_eq!(not_found.reason(), StatusReason::NotFound);

        let invalid = ApiError::invalid("BatchScheduleDescription", "expected value");
        assert_eq!(
            invalid.to_string(),
            "BatchScheduleDescription is invalid: expected value"
        );
        assert_eq!(invalid.status_code(), 422);
        assert_eq!(invalid.reason(), StatusReason::Invalid);

        let unknown = ApiError::unknown(InternalError::Unsupported("stop batch"));
        assert_eq!(unknown.to_string(), "stop batch is not supported yet");
        assert_eq!(unknown.status_code(), 500);
        assert_eq!(unknown.reason(), StatusReason::Unknown);
        assert!(unknown.span_trace().is_some());
    }
}
