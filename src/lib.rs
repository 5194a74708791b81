// src/lib.rs
// Doggy Detective - dog breed classification client

pub mod asset;
pub mod config;
pub mod error;
pub mod failure;
pub mod report;
pub mod transport;
pub mod workflow;

pub use asset::{AssetRejection, ImageAsset};
pub use config::{ClientConfig, ConfidenceScale};
pub use error::{DetectiveError, Result};
pub use failure::{ErrorKind, FailureOrigin, FailureRecord};
pub use transport::{HttpTransport, RawResponse, Transport, TransportFailure, TransportOutcome};
pub use workflow::{
    BreedPrediction, ClassificationResult, Controller, Snapshot, Workflow, WorkflowPhase,
};
