// src/workflow/mod.rs
// Classification workflow: pure state machine plus an async driver around a Transport

pub mod controller;
pub mod result;
pub mod validate;

pub use controller::{Controller, Dispatch, Snapshot, WorkflowPhase};
pub use result::{BreedPrediction, ClassificationResult};
pub use validate::validate_response;

use crate::asset::ImageAsset;
use crate::failure::FailureRecord;
use crate::transport::Transport;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

fn lock(controller: &Mutex<Controller>) -> MutexGuard<'_, Controller> {
    controller.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Drives a [`Controller`] against a [`Transport`].
///
/// Each dispatch runs as a tokio task. Selecting a new image or resetting aborts
/// the task in flight; the controller's generation check still guards against any
/// answer that lands anyway. Every transition is published on a watch channel.
///
/// `submit` and `retry` spawn onto the current tokio runtime.
pub struct Workflow<T: Transport + 'static> {
    transport: Arc<T>,
    controller: Arc<Mutex<Controller>>,
    state_tx: Arc<watch::Sender<Snapshot>>,
    in_flight: Option<JoinHandle<()>>,
}

impl<T: Transport + 'static> Workflow<T> {
    pub fn new(transport: T, controller: Controller) -> Self {
        let (state_tx, _) = watch::channel(controller.snapshot());
        Self {
            transport: Arc::new(transport),
            controller: Arc::new(Mutex::new(controller)),
            state_tx: Arc::new(state_tx),
            in_flight: None,
        }
    }

    /// Receive a fresh `Snapshot` after every transition
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.state_tx.subscribe()
    }

    pub fn snapshot(&self) -> Snapshot {
        lock(&self.controller).snapshot()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn select_asset(&mut self, asset: ImageAsset) -> Result<(), FailureRecord> {
        let outcome = {
            let mut ctl = lock(&self.controller);
            let outcome = ctl.select_asset(asset);
            self.state_tx.send_replace(ctl.snapshot());
            outcome
        };
        if outcome.is_ok() {
            self.cancel_in_flight();
        }
        outcome
    }

    /// Returns false when nothing was dispatched
    pub fn submit(&mut self) -> bool {
        let dispatch = {
            let mut ctl = lock(&self.controller);
            let dispatch = ctl.submit();
            self.state_tx.send_replace(ctl.snapshot());
            dispatch
        };
        self.spawn(dispatch)
    }

    /// Returns false when nothing was dispatched
    pub fn retry(&mut self) -> bool {
        let dispatch = {
            let mut ctl = lock(&self.controller);
            let dispatch = ctl.retry();
            self.state_tx.send_replace(ctl.snapshot());
            dispatch
        };
        self.spawn(dispatch)
    }

    pub fn reset(&mut self) {
        {
            let mut ctl = lock(&self.controller);
            ctl.reset();
            self.state_tx.send_replace(ctl.snapshot());
        }
        self.cancel_in_flight();
    }

    /// Wait for the in-flight request, if any, and return the resulting state
    pub async fn settled(&mut self) -> Snapshot {
        if let Some(handle) = self.in_flight.take() {
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    warn!(error = %e, "Classification task failed");
                }
            }
        }
        self.snapshot()
    }

    /// Select, submit and wait in one call
    pub async fn classify(&mut self, asset: ImageAsset) -> Snapshot {
        if self.select_asset(asset).is_ok() {
            self.submit();
        }
        self.settled().await
    }

    fn spawn(&mut self, dispatch: Option<Dispatch>) -> bool {
        let Some(dispatch) = dispatch else {
            return false;
        };

        let transport = Arc::clone(&self.transport);
        let controller = Arc::clone(&self.controller);
        let state_tx = Arc::clone(&self.state_tx);
        let handle = tokio::spawn(async move {
            let outcome = transport.submit(&dispatch.asset).await;
            let mut ctl = lock(&controller);
            if ctl.complete(dispatch.generation, outcome) {
                state_tx.send_replace(ctl.snapshot());
            }
        });
        self.in_flight = Some(handle);
        true
    }

    fn cancel_in_flight(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            if !handle.is_finished() {
                debug!("Aborting superseded classification request");
            }
            handle.abort();
        }
    }
}

impl<T: Transport + 'static> Drop for Workflow<T> {
    fn drop(&mut self) {
        self.cancel_in_flight();
    }
}
