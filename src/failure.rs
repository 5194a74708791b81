// src/failure.rs
// Failure taxonomy shared by the transport and the workflow controller

use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of reasons a classification attempt did not succeed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    /// Local file failed the type/size check; nothing was sent
    Validation,
    /// Request exceeded the configured timeout
    Timeout,
    /// No response received (DNS, refused, reset)
    NetworkUnreachable,
    /// HTTP 413
    PayloadTooLarge,
    /// HTTP 415
    UnsupportedMedia,
    /// Any other non-2xx status
    ServerRejected,
    /// Body unparseable, or parsed but not a valid result
    ResponseMalformed,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 7] = [
        ErrorKind::Validation,
        ErrorKind::Timeout,
        ErrorKind::NetworkUnreachable,
        ErrorKind::PayloadTooLarge,
        ErrorKind::UnsupportedMedia,
        ErrorKind::ServerRejected,
        ErrorKind::ResponseMalformed,
    ];

    /// Whether repeating the identical request can reasonably succeed
    pub fn retryable(self) -> bool {
        match self {
            ErrorKind::Validation | ErrorKind::PayloadTooLarge | ErrorKind::UnsupportedMedia => {
                false
            }
            ErrorKind::Timeout
            | ErrorKind::NetworkUnreachable
            | ErrorKind::ServerRejected
            | ErrorKind::ResponseMalformed => true,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Timeout => "timeout",
            ErrorKind::NetworkUnreachable => "network-unreachable",
            ErrorKind::PayloadTooLarge => "payload-too-large",
            ErrorKind::UnsupportedMedia => "unsupported-media",
            ErrorKind::ServerRejected => "server-rejected",
            ErrorKind::ResponseMalformed => "response-malformed",
        }
    }

    /// Human-readable message used when nothing more specific is known
    pub fn default_message(self) -> &'static str {
        match self {
            ErrorKind::Validation => "The selected file is not an acceptable image.",
            ErrorKind::Timeout => "The request took too long.",
            ErrorKind::NetworkUnreachable => "Network error - no response received.",
            ErrorKind::PayloadTooLarge => "The image is too large.",
            ErrorKind::UnsupportedMedia => "The file type is not supported.",
            ErrorKind::ServerRejected => "The classifier rejected the request.",
            ErrorKind::ResponseMalformed => "Invalid response format from server.",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which stage produced a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureOrigin {
    /// Rejected at file selection, before any network call
    Selection,
    /// Classified by the transport (timeouts, status codes, unparseable bodies)
    Transport,
    /// 2xx body that failed result validation
    ResponseShape,
}

/// Why the latest attempt did not yield a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub kind: ErrorKind,
    pub message: String,
    pub retryable: bool,
    pub origin: FailureOrigin,
    /// HTTP status, when one was received
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl FailureRecord {
    /// Build a record whose `retryable` flag is the kind's default
    pub fn new(kind: ErrorKind, message: impl Into<String>, origin: FailureOrigin) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable: kind.retryable(),
            origin,
            status: None,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message, FailureOrigin::Selection)
    }

    pub fn malformed_shape(message: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::ResponseMalformed,
            message,
            FailureOrigin::ResponseShape,
        )
    }

    pub fn with_status(mut self, status: Option<u16>) -> Self {
        self.status = status;
        self
    }
}

impl fmt::Display for FailureRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}
