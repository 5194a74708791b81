// src/transport/mod.rs
// One network exchange per call, every outcome mapped to a value

pub mod http;

pub use http::HttpTransport;

use crate::asset::ImageAsset;
use crate::failure::{ErrorKind, FailureOrigin, FailureRecord};
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// A 2xx response whose body parsed as JSON. The body is not interpreted here.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Value,
}

/// A classified transport-level failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct TransportFailure {
    pub kind: ErrorKind,
    pub message: String,
    pub status: Option<u16>,
}

impl TransportFailure {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
        }
    }

    /// Failure for a non-2xx status. `detail` is the server's own explanation, if any.
    pub fn from_status(status: u16, detail: Option<String>) -> Self {
        let kind = classify_status(status);
        let message = match detail {
            Some(detail) => format!("{} ({})", kind.default_message(), detail),
            None => kind.default_message().to_string(),
        };
        Self {
            kind,
            message,
            status: Some(status),
        }
    }
}

impl From<TransportFailure> for FailureRecord {
    fn from(failure: TransportFailure) -> Self {
        FailureRecord::new(failure.kind, failure.message, FailureOrigin::Transport)
            .with_status(failure.status)
    }
}

pub type TransportOutcome = Result<RawResponse, TransportFailure>;

/// Seam between the workflow controller and the network.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Upload `asset` to the classifier. Must not panic and must not mutate the asset.
    async fn submit(&self, asset: &ImageAsset) -> TransportOutcome;
}

/// Map a non-2xx status to its failure kind
pub fn classify_status(status: u16) -> ErrorKind {
    match status {
        413 => ErrorKind::PayloadTooLarge,
        415 => ErrorKind::UnsupportedMedia,
        _ => ErrorKind::ServerRejected,
    }
}

/// Extract the `detail` string from a JSON error envelope like `{"detail": "..."}`
pub fn server_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("detail")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(String::from)
}
