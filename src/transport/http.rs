// src/transport/http.rs
// reqwest-backed transport: multipart upload with a per-instance timeout

use crate::asset::ImageAsset;
use crate::config::ClientConfig;
use crate::error::Result;
use crate::failure::ErrorKind;
use crate::transport::{RawResponse, Transport, TransportFailure, TransportOutcome, server_detail};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, StatusCode};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Multipart field the classifier reads the image from
pub const UPLOAD_FIELD: &str = "file";

/// HTTP client for one classifier endpoint
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    classify_url: String,
    health_url: String,
    timeout: Duration,
}

impl HttpTransport {
    /// Build a dedicated client from `config`
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()?;
        Ok(Self::from_client(client, config))
    }

    /// Reuse an existing reqwest::Client. The configured timeout is still applied per request.
    pub fn from_client(client: Client, config: &ClientConfig) -> Self {
        Self {
            client,
            classify_url: config.classify_url(),
            health_url: config.health_url(),
            timeout: config.timeout,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.classify_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Query the service status route (`GET /`)
    pub async fn health(&self) -> TransportOutcome {
        self.exchange(self.client.get(&self.health_url)).await
    }

    /// Send the request and map whatever happens into a `TransportOutcome`
    async fn exchange(&self, request: RequestBuilder) -> TransportOutcome {
        let started = Instant::now();
        let response = match request.timeout(self.timeout).send().await {
            Ok(response) => response,
            Err(e) => return Err(self.send_failure(&e, started)),
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return Err(self.body_failure(&e, status, started)),
        };

        if !status.is_success() {
            let failure = TransportFailure::from_status(status.as_u16(), server_detail(&body));
            warn!(
                status = status.as_u16(),
                kind = %failure.kind,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Classifier returned error status"
            );
            return Err(failure);
        }

        match serde_json::from_str(&body) {
            Ok(body) => {
                info!(
                    status = status.as_u16(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Classifier responded"
                );
                Ok(RawResponse {
                    status: status.as_u16(),
                    body,
                })
            }
            Err(e) => {
                warn!(status = status.as_u16(), error = %e, "Classifier body is not JSON");
                Err(TransportFailure {
                    kind: ErrorKind::ResponseMalformed,
                    message: format!("{} ({})", ErrorKind::ResponseMalformed.default_message(), e),
                    status: Some(status.as_u16()),
                })
            }
        }
    }

    fn send_failure(&self, e: &reqwest::Error, started: Instant) -> TransportFailure {
        let kind = if e.is_timeout() {
            ErrorKind::Timeout
        } else {
            ErrorKind::NetworkUnreachable
        };
        warn!(
            kind = %kind,
            error = %e,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Classifier request failed"
        );
        let message = match kind {
            ErrorKind::Timeout => format!(
                "{} (no answer within {}s)",
                kind.default_message(),
                self.timeout.as_secs_f64()
            ),
            _ => kind.default_message().to_string(),
        };
        TransportFailure::new(kind, message)
    }

    /// The status line arrived but the body did not
    fn body_failure(
        &self,
        e: &reqwest::Error,
        status: StatusCode,
        started: Instant,
    ) -> TransportFailure {
        if e.is_timeout() {
            return self.send_failure(e, started);
        }
        if !status.is_success() {
            return TransportFailure::from_status(status.as_u16(), None);
        }
        warn!(status = status.as_u16(), error = %e, "Classifier body was cut off");
        TransportFailure {
            kind: ErrorKind::NetworkUnreachable,
            message: ErrorKind::NetworkUnreachable.default_message().to_string(),
            status: Some(status.as_u16()),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn submit(&self, asset: &ImageAsset) -> TransportOutcome {
        let part = Part::bytes(asset.data().to_vec()).file_name(asset.file_name().to_string());
        let part = match part.mime_str(asset.media_type()) {
            Ok(part) => part,
            Err(e) => {
                return Err(TransportFailure::new(
                    ErrorKind::Validation,
                    format!("invalid media type '{}': {}", asset.media_type(), e),
                ));
            }
        };
        let form = Form::new().part(UPLOAD_FIELD, part);

        debug!(
            url = %self.classify_url,
            file = asset.file_name(),
            bytes = asset.size(),
            "Uploading image for classification"
        );
        self.exchange(self.client.post(&self.classify_url).multipart(form))
            .await
    }
}
