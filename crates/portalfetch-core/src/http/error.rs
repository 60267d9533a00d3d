use std::time::Duration;

use crate::retry::{classify_curl_error, classify_http_status, Classify, ErrorKind};

/// Failure of one fetch, classified for retry decisions.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// No response received (DNS, connect, reset).
    #[error("transport error: {0}")]
    Transport(#[from] curl::Error),
    /// No complete response within the per-call bound; the transfer was cancelled.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    /// Response with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    /// 2xx response whose body is not the expected JSON.
    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// The blocking transfer task panicked or was cancelled.
    #[error("fetch task failed: {0}")]
    Task(String),
}

impl FetchError {
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Logical absence of the entity, as opposed to a failing upstream.
    pub fn is_not_found(&self) -> bool {
        matches!(self.status(), Some(404 | 410))
    }
}

impl Classify for FetchError {
    fn kind(&self) -> ErrorKind {
        match self {
            FetchError::Transport(e) => classify_curl_error(e),
            FetchError::Timeout(_) => ErrorKind::Timeout,
            FetchError::Status { status, .. } => classify_http_status(*status),
            FetchError::Decode(_) | FetchError::InvalidRequest(_) | FetchError::Task(_) => {
                ErrorKind::Other
            }
        }
    }
}
