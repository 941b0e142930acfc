//! Terminal results of portal operations.
//!
//! Every operation resolves to exactly one [`OperationResult`]. Payload
//! carrying statuses (`Success`, `Completed`) can only be built through
//! constructors that take the payload, so a successful result always has one.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::SagresError;
use crate::transport::Page;

/// Status codes attached to results.
pub mod codes {
    pub const LOGIN_SUCCESS: u16 = 200;
    pub const INVALID_LOGIN: u16 = 401;
    pub const SESSION_TIMEOUT: u16 = 440;
    pub const UNKNOWN_LOGIN_STATE: u16 = 500;
    pub const DOCUMENT_LINK_NOT_FOUND: u16 = 600;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Success,
    Completed,
    NetworkError,
    ResponseFailed,
    InvalidLogin,
    ApprovalError,
    UnknownFailure,
}

impl Status {
    pub fn carries_payload(self) -> bool {
        matches!(self, Status::Success | Status::Completed)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::Success => "SUCCESS",
            Status::Completed => "COMPLETED",
            Status::NetworkError => "NETWORK_ERROR",
            Status::ResponseFailed => "RESPONSE_FAILED",
            Status::InvalidLogin => "INVALID_LOGIN",
            Status::ApprovalError => "APPROVAL_ERROR",
            Status::UnknownFailure => "UNKNOWN_FAILURE",
        };
        f.write_str(name)
    }
}

/// Outcome of one operation.
#[derive(Debug, Clone)]
pub struct OperationResult<T> {
    status: Status,
    code: Option<u16>,
    message: Option<String>,
    cause: Option<Arc<SagresError>>,
    document: Option<Page>,
    payload: Option<T>,
}

impl<T> OperationResult<T> {
    pub fn success(payload: T) -> Self {
        Self::with_payload(Status::Success, payload)
    }

    pub fn completed(payload: T) -> Self {
        Self::with_payload(Status::Completed, payload)
    }

    fn with_payload(status: Status, payload: T) -> Self {
        Self {
            status,
            code: None,
            message: None,
            cause: None,
            document: None,
            payload: Some(payload),
        }
    }

    /// A result without payload. Payload-carrying statuses are downgraded to
    /// `UnknownFailure`.
    pub fn failure(status: Status) -> Self {
        let status = if status.carries_payload() {
            Status::UnknownFailure
        } else {
            status
        };
        Self {
            status,
            code: None,
            message: None,
            cause: None,
            document: None,
            payload: None,
        }
    }

    pub fn network_error(error: SagresError) -> Self {
        Self::failure(Status::NetworkError).with_cause(error)
    }

    /// Non-2xx response: `ResponseFailed` with the HTTP status as code.
    pub fn response_failed(page: Page) -> Self {
        Self::failure(Status::ResponseFailed)
            .with_code(page.status)
            .with_message(format!("Unexpected status {}", page.status))
            .with_document(page)
    }

    pub fn approval_error(message: impl Into<String>) -> Self {
        Self::failure(Status::ApprovalError).with_message(message)
    }

    pub fn unknown_failure(message: impl Into<String>) -> Self {
        Self::failure(Status::UnknownFailure).with_message(message)
    }

    /// Map a transport or parsing error to its status.
    pub fn from_error(error: SagresError) -> Self {
        if error.is_network() {
            return Self::network_error(error);
        }
        let result = match &error {
            SagresError::Status { status, .. } => {
                Self::failure(Status::ResponseFailed).with_code(*status)
            }
            other => Self::unknown_failure(other.to_string()),
        };
        result.with_cause(error)
    }

    pub fn with_code(mut self, code: u16) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_cause(mut self, cause: SagresError) -> Self {
        self.cause = Some(Arc::new(cause));
        self
    }

    pub fn with_document(mut self, document: Page) -> Self {
        self.document = Some(document);
        self
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn code(&self) -> Option<u16> {
        self.code
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn cause(&self) -> Option<&Arc<SagresError>> {
        self.cause.as_ref()
    }

    pub fn document(&self) -> Option<&Page> {
        self.document.as_ref()
    }

    pub fn payload(&self) -> Option<&T> {
        self.payload.as_ref()
    }

    pub fn into_payload(self) -> Option<T> {
        self.payload
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }

    pub fn is_ok(&self) -> bool {
        self.status.carries_payload()
    }

    pub fn map<U, F>(self, f: F) -> OperationResult<U>
    where
        F: FnOnce(T) -> U,
    {
        OperationResult {
            status: self.status,
            code: self.code,
            message: self.message,
            cause: self.cause,
            document: self.document,
            payload: self.payload.map(f),
        }
    }

    /// Re-type a failed result, dropping any payload.
    pub fn propagate<U>(self) -> OperationResult<U> {
        let mut result = OperationResult::failure(self.status);
        result.code = self.code;
        result.message = self.message;
        result.cause = self.cause;
        result.document = self.document;
        result
    }
}

/// A unit of portal work that resolves to one terminal result.
#[async_trait]
pub trait Operation: Send + Sync {
    type Output: Send;

    async fn execute(&self) -> OperationResult<Self::Output>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_always_has_payload() {
        let ok = OperationResult::success(3);
        assert!(ok.is_success());
        assert_eq!(ok.payload(), Some(&3));

        let forced: OperationResult<i32> = OperationResult::failure(Status::Success);
        assert_eq!(forced.status(), Status::UnknownFailure);
        assert!(forced.payload().is_none());
    }

    #[test]
    fn test_error_mapping() {
        let net: OperationResult<()> = OperationResult::from_error(SagresError::Cancelled);
        assert_eq!(net.status(), Status::NetworkError);
        assert!(net.cause().unwrap().is_cancelled());

        let http: OperationResult<()> = OperationResult::from_error(SagresError::Status {
            status: 503,
            url: "http://h/".into(),
        });
        assert_eq!(http.status(), Status::ResponseFailed);
        assert_eq!(http.code(), Some(503));

        let parse: OperationResult<()> =
            OperationResult::from_error(SagresError::Parse("bad".into()));
        assert_eq!(parse.status(), Status::UnknownFailure);
    }

    #[test]
    fn test_response_failed_keeps_document() {
        let result: OperationResult<()> =
            OperationResult::response_failed(Page::new("http://h/x", 404, "missing"));
        assert_eq!(result.status(), Status::ResponseFailed);
        assert_eq!(result.code(), Some(404));
        assert_eq!(result.document().unwrap().body, "missing");
    }

    #[test]
    fn test_propagate_and_map() {
        let failed: OperationResult<u8> =
            OperationResult::approval_error("no semester").with_code(1);
        let retyped: OperationResult<String> = failed.propagate();
        assert_eq!(retyped.status(), Status::ApprovalError);
        assert_eq!(retyped.message(), Some("no semester"));

        let mapped = OperationResult::completed(2).map(|n| n * 10);
        assert_eq!(mapped.status(), Status::Completed);
        assert_eq!(mapped.into_payload(), Some(20));
        assert_eq!(Status::ApprovalError.to_string(), "APPROVAL_ERROR");
    }
}
