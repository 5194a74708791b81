// src/workflow/controller.rs
// Classification workflow state machine. No I/O: the caller runs each Dispatch
// through a Transport and feeds the outcome back with `complete`.

use crate::asset::ImageAsset;
use crate::config::{ClientConfig, ConfidenceScale};
use crate::failure::FailureRecord;
use crate::transport::TransportOutcome;
use crate::workflow::result::ClassificationResult;
use crate::workflow::validate::validate_response;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Current lifecycle phase. Exactly one is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkflowPhase {
    Idle,
    AssetSelected,
    Submitting,
    Succeeded,
    Failed,
}

/// A request the caller must send. `generation` ties the answer back to this attempt.
#[derive(Debug, Clone)]
pub struct Dispatch {
    pub generation: u64,
    pub asset: Arc<ImageAsset>,
}

/// Read-only view for the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub phase: WorkflowPhase,
    pub result: Option<ClassificationResult>,
    pub failure: Option<FailureRecord>,
    pub retry_offered: bool,
}

#[derive(Debug)]
pub struct Controller {
    phase: WorkflowPhase,
    asset: Option<Arc<ImageAsset>>,
    result: Option<ClassificationResult>,
    failure: Option<FailureRecord>,
    /// Bumped on every dispatch, selection and reset; older answers are dropped
    generation: u64,
    max_upload_bytes: u64,
    scale: ConfidenceScale,
}

impl Controller {
    pub fn new(max_upload_bytes: u64, scale: ConfidenceScale) -> Self {
        Self {
            phase: WorkflowPhase::Idle,
            asset: None,
            result: None,
            failure: None,
            generation: 0,
            max_upload_bytes,
            scale,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.max_upload_bytes, config.confidence_scale)
    }

    pub fn phase(&self) -> WorkflowPhase {
        self.phase
    }

    pub fn asset(&self) -> Option<&ImageAsset> {
        self.asset.as_deref()
    }

    pub fn result(&self) -> Option<&ClassificationResult> {
        self.result.as_ref()
    }

    pub fn failure(&self) -> Option<&FailureRecord> {
        self.failure.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether `retry` would dispatch
    pub fn retry_offered(&self) -> bool {
        self.phase == WorkflowPhase::Failed
            && self.asset.is_some()
            && self.failure.as_ref().is_some_and(|f| f.retryable)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            phase: self.phase,
            result: self.result.clone(),
            failure: self.failure.clone(),
            retry_offered: self.retry_offered(),
        }
    }

    /// Offer a newly chosen file.
    ///
    /// A valid file replaces whatever came before, including an in-flight request.
    /// An invalid file leaves phase, asset and result untouched and returns a
    /// `validation` failure; no request is ever made for it. The record is only
    /// kept as the current failure in `Idle` and `AssetSelected`.
    pub fn select_asset(&mut self, candidate: ImageAsset) -> Result<(), FailureRecord> {
        if let Err(rejection) = candidate.validate(self.max_upload_bytes) {
            let record = FailureRecord::validation(rejection.to_string());
            warn!(
                file = candidate.file_name(),
                reason = %rejection,
                "Rejected image at selection"
            );
            // a shown result or a pending/failed attempt keeps its own state
            if matches!(self.phase, WorkflowPhase::Idle | WorkflowPhase::AssetSelected) {
                self.failure = Some(record.clone());
            }
            return Err(record);
        }

        if self.phase == WorkflowPhase::Submitting {
            debug!(generation = self.generation, "New selection supersedes in-flight request");
        }
        debug!(
            file = candidate.file_name(),
            bytes = candidate.size(),
            "Image selected"
        );
        self.generation += 1;
        self.asset = Some(Arc::new(candidate));
        self.result = None;
        self.failure = None;
        self.phase = WorkflowPhase::AssetSelected;
        Ok(())
    }

    /// Start an attempt for the selected asset. No-op unless in `AssetSelected`.
    pub fn submit(&mut self) -> Option<Dispatch> {
        if self.phase != WorkflowPhase::AssetSelected {
            debug!(phase = ?self.phase, "Ignoring submit");
            return None;
        }
        self.begin_attempt()
    }

    /// Re-issue the identical request. No-op unless `Failed` with a retryable record.
    pub fn retry(&mut self) -> Option<Dispatch> {
        if !self.retry_offered() {
            debug!(phase = ?self.phase, "Ignoring retry");
            return None;
        }
        self.begin_attempt()
    }

    /// Back to `Idle` from anywhere; any in-flight answer will be dropped.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.asset = None;
        self.result = None;
        self.failure = None;
        self.phase = WorkflowPhase::Idle;
        debug!("Workflow reset");
    }

    fn begin_attempt(&mut self) -> Option<Dispatch> {
        let asset = self.asset.clone()?;
        self.generation += 1;
        self.result = None;
        self.failure = None;
        self.phase = WorkflowPhase::Submitting;
        debug!(generation = self.generation, file = asset.file_name(), "Dispatching");
        Some(Dispatch {
            generation: self.generation,
            asset,
        })
    }

    /// Apply the outcome of a dispatched request.
    ///
    /// Returns false (and changes nothing) when the request has been superseded.
    pub fn complete(&mut self, generation: u64, outcome: TransportOutcome) -> bool {
        if generation != self.generation || self.phase != WorkflowPhase::Submitting {
            warn!(
                generation,
                current = self.generation,
                "Discarding stale classification response"
            );
            return false;
        }

        let validated = match outcome {
            Ok(raw) => validate_response(raw.body, self.scale),
            Err(failure) => Err(FailureRecord::from(failure)),
        };

        match validated {
            Ok(result) => {
                info!(
                    top_breed = %result.top().breed,
                    confidence = result.top().confidence,
                    predictions = result.len(),
                    "Classification succeeded"
                );
                self.result = Some(result);
                self.failure = None;
                self.phase = WorkflowPhase::Succeeded;
            }
            Err(record) => {
                warn!(
                    kind = %record.kind,
                    origin = ?record.origin,
                    retryable = record.retryable,
                    message = %record.message,
                    "Classification failed"
                );
                self.result = None;
                self.failure = Some(record);
                self.phase = WorkflowPhase::Failed;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::env::DEFAULT_MAX_UPLOAD_BYTES;
    use crate::failure::{ErrorKind, FailureOrigin};
    use crate::transport::{RawResponse, TransportFailure};
    use serde_json::json;

    const MIB: usize = 1024 * 1024;

    fn controller() -> Controller {
        Controller::new(DEFAULT_MAX_UPLOAD_BYTES, ConfidenceScale::Auto)
    }

    fn image(name: &str, size: usize) -> ImageAsset {
        ImageAsset::new(name, "image/jpeg", vec![7; size])
    }

    fn ok(body: serde_json::Value) -> TransportOutcome {
        Ok(RawResponse { status: 200, body })
    }

    fn labrador() -> TransportOutcome {
        ok(json!([
            {"breed": "Labrador Retriever", "confidence": 92.3},
            {"breed": "Golden Retriever", "confidence": 5.1}
        ]))
    }

    fn failed_with(kind: ErrorKind) -> Controller {
        let mut ctl = controller();
        ctl.select_asset(image("dog.jpg", 10)).unwrap();
        let dispatch = ctl.submit().unwrap();
        ctl.complete(dispatch.generation, Err(TransportFailure::new(kind, "boom")));
        ctl
    }

    // ========================================================================
    // Selection
    // ========================================================================

    #[test]
    fn test_initial_state() {
        let ctl = controller();
        assert_eq!(ctl.phase(), WorkflowPhase::Idle);
        assert!(ctl.asset().is_none());
        assert!(ctl.result().is_none());
        assert!(ctl.failure().is_none());
        assert!(!ctl.retry_offered());
    }

    #[test]
    fn test_select_valid_asset() {
        let mut ctl = controller();
        ctl.select_asset(image("dog.jpg", 2 * MIB)).unwrap();
        assert_eq!(ctl.phase(), WorkflowPhase::AssetSelected);
        assert_eq!(ctl.asset().unwrap().file_name(), "dog.jpg");
    }

    #[test]
    fn test_oversized_rejected_at_selection() {
        let mut ctl = controller();
        let record = ctl.select_asset(image("huge.jpg", 15 * MIB)).unwrap_err();
        assert_eq!(record.kind, ErrorKind::Validation);
        assert!(!record.retryable);
        assert_eq!(record.origin, FailureOrigin::Selection);
        assert_eq!(ctl.phase(), WorkflowPhase::Idle);
        assert_eq!(ctl.failure(), Some(&record));
        assert!(ctl.submit().is_none());
    }

    #[test]
    fn test_size_boundary() {
        let mut ctl = controller();
        assert!(ctl.select_asset(image("max.jpg", 10 * MIB)).is_ok());

        let mut ctl = controller();
        let record = ctl.select_asset(image("over.jpg", 10 * MIB + 1)).unwrap_err();
        assert_eq!(record.kind, ErrorKind::Validation);
    }

    #[test]
    fn test_non_image_rejected_at_selection() {
        let mut ctl = controller();
        let asset = ImageAsset::new("notes.txt", "text/plain", vec![1]);
        assert_eq!(ctl.select_asset(asset).unwrap_err().kind, ErrorKind::Validation);
        assert_eq!(ctl.phase(), WorkflowPhase::Idle);
    }

    #[test]
    fn test_invalid_selection_keeps_previous_asset() {
        let mut ctl = controller();
        ctl.select_asset(image("dog.jpg", 10)).unwrap();
        ctl.select_asset(image("huge.jpg", 15 * MIB)).unwrap_err();
        assert_eq!(ctl.phase(), WorkflowPhase::AssetSelected);
        assert_eq!(ctl.asset().unwrap().file_name(), "dog.jpg");
        // a valid submit clears the validation record
        ctl.submit().unwrap();
        assert!(ctl.failure().is_none());
    }

    #[test]
    fn test_invalid_selection_after_success_leaves_snapshot() {
        let mut ctl = controller();
        ctl.select_asset(image("a.jpg", 10)).unwrap();
        let a = ctl.submit().unwrap();
        ctl.complete(a.generation, labrador());
        let before = ctl.snapshot();

        let notes = ImageAsset::new("notes.txt", "text/plain", vec![1]);
        let record = ctl.select_asset(notes).unwrap_err();
        assert_eq!(record.kind, ErrorKind::Validation);
        assert_eq!(ctl.snapshot(), before);
        assert!(ctl.failure().is_none());
        assert_eq!(ctl.asset().unwrap().file_name(), "a.jpg");
    }

    #[test]
    fn test_invalid_selection_after_timeout_keeps_retry() {
        let mut ctl = failed_with(ErrorKind::Timeout);
        let before = ctl.snapshot();
        assert!(before.retry_offered);

        let notes = ImageAsset::new("notes.txt", "text/plain", vec![1]);
        assert_eq!(ctl.select_asset(notes).unwrap_err().kind, ErrorKind::Validation);
        assert_eq!(ctl.snapshot(), before);
        assert_eq!(ctl.failure().unwrap().kind, ErrorKind::Timeout);
        assert!(ctl.retry_offered());
        assert!(ctl.retry().is_some());
    }

    #[test]
    fn test_invalid_selection_while_submitting_leaves_snapshot() {
        let mut ctl = controller();
        ctl.select_asset(image("a.jpg", 10)).unwrap();
        let a = ctl.submit().unwrap();
        let before = ctl.snapshot();

        ctl.select_asset(image("huge.jpg", 15 * MIB)).unwrap_err();
        assert_eq!(ctl.snapshot(), before);
        assert!(ctl.complete(a.generation, labrador()));
    }

    // ========================================================================
    // Submission
    // ========================================================================

    #[test]
    fn test_submit_success_scenario() {
        let mut ctl = controller();
        ctl.select_asset(image("dog.jpg", 2 * MIB)).unwrap();
        let dispatch = ctl.submit().unwrap();
        assert_eq!(ctl.phase(), WorkflowPhase::Submitting);
        assert_eq!(dispatch.asset.file_name(), "dog.jpg");

        assert!(ctl.complete(dispatch.generation, labrador()));
        assert_eq!(ctl.phase(), WorkflowPhase::Succeeded);
        let result = ctl.result().unwrap();
        assert_eq!(result.top().breed, "Labrador Retriever");
        assert_eq!(result.top().confidence, 92.3);
        assert_eq!(result.predictions()[1].breed, "Golden Retriever");
        assert!(ctl.failure().is_none());
    }

    #[test]
    fn test_submit_without_asset_is_noop() {
        let mut ctl = controller();
        assert!(ctl.submit().is_none());
        assert_eq!(ctl.phase(), WorkflowPhase::Idle);
    }

    #[test]
    fn test_double_submit_dispatches_once() {
        let mut ctl = controller();
        ctl.select_asset(image("dog.jpg", 10)).unwrap();
        assert!(ctl.submit().is_some());
        let generation = ctl.generation();
        assert!(ctl.submit().is_none());
        assert_eq!(ctl.generation(), generation);
        assert_eq!(ctl.phase(), WorkflowPhase::Submitting);
    }

    #[test]
    fn test_empty_results_fail_malformed() {
        let mut ctl = controller();
        ctl.select_asset(image("dog.jpg", 10)).unwrap();
        let dispatch = ctl.submit().unwrap();
        ctl.complete(dispatch.generation, ok(json!({"results": []})));
        assert_eq!(ctl.phase(), WorkflowPhase::Failed);
        let failure = ctl.failure().unwrap();
        assert_eq!(failure.kind, ErrorKind::ResponseMalformed);
        assert_eq!(failure.origin, FailureOrigin::ResponseShape);
        assert!(ctl.result().is_none());
    }

    #[test]
    fn test_payload_too_large_not_retryable() {
        let mut ctl = controller();
        ctl.select_asset(image("dog.jpg", 10)).unwrap();
        let dispatch = ctl.submit().unwrap();
        ctl.complete(dispatch.generation, Err(TransportFailure::from_status(413, None)));
        assert_eq!(ctl.phase(), WorkflowPhase::Failed);
        let failure = ctl.failure().unwrap();
        assert_eq!(failure.kind, ErrorKind::PayloadTooLarge);
        assert!(!failure.retryable);
        assert_eq!(failure.origin, FailureOrigin::Transport);
        assert!(!ctl.retry_offered());
    }

    // ========================================================================
    // Retry
    // ========================================================================

    #[test]
    fn test_retry_after_timeout_reissues_same_asset() {
        let mut ctl = failed_with(ErrorKind::Timeout);
        assert!(ctl.retry_offered());
        let first_asset = ctl.asset().unwrap().clone();

        let dispatch = ctl.retry().unwrap();
        assert_eq!(*dispatch.asset, first_asset);
        assert_eq!(ctl.phase(), WorkflowPhase::Submitting);
        assert!(ctl.failure().is_none());

        ctl.complete(dispatch.generation, labrador());
        assert_eq!(ctl.phase(), WorkflowPhase::Succeeded);
    }

    #[test]
    fn test_retry_noop_when_not_retryable() {
        let mut ctl = failed_with(ErrorKind::UnsupportedMedia);
        let before = ctl.snapshot();
        assert!(ctl.retry().is_none());
        assert_eq!(ctl.snapshot(), before);
    }

    #[test]
    fn test_retry_noop_outside_failed() {
        let mut ctl = controller();
        assert!(ctl.retry().is_none());
        assert_eq!(ctl.phase(), WorkflowPhase::Idle);

        ctl.select_asset(image("dog.jpg", 10)).unwrap();
        assert!(ctl.retry().is_none());
        assert_eq!(ctl.phase(), WorkflowPhase::AssetSelected);

        let dispatch = ctl.submit().unwrap();
        assert!(ctl.retry().is_none());
        ctl.complete(dispatch.generation, labrador());
        let before = ctl.snapshot();
        assert!(ctl.retry().is_none());
        assert_eq!(ctl.snapshot(), before);
    }

    #[test]
    fn test_submit_from_failed_is_noop() {
        let mut ctl = failed_with(ErrorKind::ServerRejected);
        assert!(ctl.submit().is_none());
        assert_eq!(ctl.phase(), WorkflowPhase::Failed);
    }

    // ========================================================================
    // Supersession and reset
    // ========================================================================

    #[test]
    fn test_stale_response_discarded_after_new_selection() {
        let mut ctl = controller();
        ctl.select_asset(image("a.jpg", 10)).unwrap();
        let a = ctl.submit().unwrap();

        ctl.select_asset(image("b.jpg", 10)).unwrap();
        let b = ctl.submit().unwrap();
        assert!(ctl.complete(b.generation, Err(TransportFailure::from_status(500, None))));
        let after_b = ctl.snapshot();

        assert!(!ctl.complete(a.generation, labrador()));
        assert_eq!(ctl.snapshot(), after_b);
        assert_eq!(ctl.asset().unwrap().file_name(), "b.jpg");
    }

    #[test]
    fn test_stale_response_discarded_while_newer_in_flight() {
        let mut ctl = controller();
        ctl.select_asset(image("a.jpg", 10)).unwrap();
        let a = ctl.submit().unwrap();
        ctl.select_asset(image("b.jpg", 10)).unwrap();
        let b = ctl.submit().unwrap();

        assert!(!ctl.complete(a.generation, labrador()));
        assert_eq!(ctl.phase(), WorkflowPhase::Submitting);
        assert!(ctl.complete(b.generation, labrador()));
        assert_eq!(ctl.phase(), WorkflowPhase::Succeeded);
    }

    #[test]
    fn test_completion_after_selection_without_submit_ignored() {
        let mut ctl = controller();
        ctl.select_asset(image("a.jpg", 10)).unwrap();
        let a = ctl.submit().unwrap();
        ctl.select_asset(image("b.jpg", 10)).unwrap();

        assert!(!ctl.complete(a.generation, labrador()));
        assert_eq!(ctl.phase(), WorkflowPhase::AssetSelected);
        assert!(ctl.result().is_none());
    }

    #[test]
    fn test_reset_from_any_phase() {
        let mut ctl = controller();
        ctl.select_asset(image("a.jpg", 10)).unwrap();
        let a = ctl.submit().unwrap();
        ctl.reset();
        assert_eq!(ctl.phase(), WorkflowPhase::Idle);
        assert!(ctl.asset().is_none());
        assert!(!ctl.complete(a.generation, labrador()));
        assert_eq!(ctl.phase(), WorkflowPhase::Idle);

        let mut ctl = failed_with(ErrorKind::Timeout);
        ctl.reset();
        assert_eq!(ctl.snapshot(), controller().snapshot());
    }

    #[test]
    fn test_new_selection_after_success_clears_result() {
        let mut ctl = controller();
        ctl.select_asset(image("a.jpg", 10)).unwrap();
        let a = ctl.submit().unwrap();
        ctl.complete(a.generation, labrador());

        ctl.select_asset(image("b.jpg", 10)).unwrap();
        assert_eq!(ctl.phase(), WorkflowPhase::AssetSelected);
        assert!(ctl.result().is_none());
    }

    #[test]
    fn test_fraction_scale_normalized_in_result() {
        let mut ctl = controller();
        ctl.select_asset(image("a.jpg", 10)).unwrap();
        let a = ctl.submit().unwrap();
        ctl.complete(
            a.generation,
            ok(json!([{"breed": "Labrador", "confidence": 0.95}, {"breed": "Pug", "confidence": 0.05}])),
        );
        assert!((ctl.result().unwrap().top().confidence - 95.0).abs() < 1e-9);
    }
}
