//! Ingestion coordinator.
//!
//! Drives one capture through analyze and persist, holding the single piece
//! of process state that gates which actions are allowed. Exactly one
//! submission can be in flight per coordinator; everything else gets `Busy`.

use chrono::Utc;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

use crate::common::OwnerId;
use crate::kernel::camera::{Camera, CameraError, CameraOptions, CameraSession};
use crate::kernel::recognition_client::RecognitionError;
use crate::kernel::telemetry::emit;
use crate::kernel::ServerDeps;

use super::capture::CaptureSource;
use super::models::Receipt;
use super::persistence::{PersistError, PersistenceGateway};
use super::recognition::RecognitionResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    Analyzing,
    Ready,
    Persisting,
    /// Persisted. Equivalent to `Idle` for starting a new capture.
    Done,
    /// Terminal until the user selects a new capture or retries.
    Failed,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Validation condition, not a system error: submit needs a capture.
    #[error("no capture selected")]
    NoCapture,

    #[error("a scan is already in flight")]
    Busy,

    #[error(transparent)]
    Camera(#[from] CameraError),

    #[error(transparent)]
    Recognition(#[from] RecognitionError),

    /// Blob or header persistence failure. Item-insert failures never reach
    /// here; they surface as a partial-success `ScanOutcome`.
    #[error(transparent)]
    Persistence(PersistError),
}

/// Terminal result of a successful (or partially successful) submission.
#[derive(Debug)]
pub struct ScanOutcome {
    pub receipt: Receipt,
    pub recognition: RecognitionResult,
    /// False when the header was saved but the item batch failed.
    pub items_saved: bool,
}

struct Inner {
    state: PipelineState,
    /// True from the moment a submission is admitted until it reaches a
    /// terminal state. Spans the `Ready` transition, where `state` alone
    /// would briefly look admittable between lock acquisitions.
    run_active: bool,
    capture: Option<Arc<CaptureSource>>,
    recognition: Option<RecognitionResult>,
    camera: Option<CameraSession>,
}

impl Inner {
    fn in_flight(&self) -> bool {
        self.run_active
    }
}

pub struct IngestionCoordinator {
    deps: ServerDeps,
    inner: Mutex<Inner>,
}

impl IngestionCoordinator {
    pub fn new(deps: ServerDeps) -> Self {
        Self {
            deps,
            inner: Mutex::new(Inner {
                state: PipelineState::Idle,
                run_active: false,
                capture: None,
                recognition: None,
                camera: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("coordinator state lock poisoned")
    }

    /// Move the running submission into a terminal state and admit the next
    /// request.
    fn finish(&self, state: PipelineState, clear_capture: bool) {
        let mut inner = self.lock();
        inner.state = state;
        inner.run_active = false;
        if clear_capture {
            inner.capture = None;
        }
    }

    pub fn state(&self) -> PipelineState {
        self.lock().state
    }

    /// The recognition result stays readable across Persisting/Failed/Done;
    /// the recognized data is useful even when persistence failed.
    pub fn last_recognition(&self) -> Option<RecognitionResult> {
        self.lock().recognition.clone()
    }

    pub fn has_capture(&self) -> bool {
        self.lock().capture.is_some()
    }

    /// Make a capture the active one, discarding any stale recognition
    /// result, and return to `Idle`. Rejected while a scan is in flight.
    pub fn select_capture(&self, capture: CaptureSource) -> Result<(), PipelineError> {
        let mut inner = self.lock();
        if inner.in_flight() {
            return Err(PipelineError::Busy);
        }
        inner.capture = Some(Arc::new(capture));
        inner.recognition = None;
        inner.state = PipelineState::Idle;
        Ok(())
    }

    /// Open a camera session. At most one session exists per coordinator:
    /// opening a new one implicitly closes the prior one.
    pub fn open_camera(&self, options: &CameraOptions) -> Result<(), PipelineError> {
        let mut inner = self.lock();
        if inner.in_flight() {
            return Err(PipelineError::Busy);
        }
        if let Some(mut prior) = inner.camera.take() {
            prior.close();
        }
        inner.camera = Some(Camera::open(options)?);
        Ok(())
    }

    /// Sample one frame from the open session into the active capture.
    ///
    /// The session is released on every exit: after a successful capture and
    /// after a capture error. A `NoActiveFrame` during warm-up therefore
    /// requires reopening the camera.
    pub fn capture_from_camera(&self) -> Result<(), PipelineError> {
        let mut inner = self.lock();
        if inner.in_flight() {
            return Err(PipelineError::Busy);
        }
        let mut session = inner.camera.take().ok_or_else(|| {
            PipelineError::Camera(CameraError::DeviceUnavailable(
                "no open camera session".to_string(),
            ))
        })?;

        let bytes = match session.capture_frame() {
            Ok(bytes) => bytes,
            Err(err) => {
                session.close();
                return Err(err.into());
            }
        };
        session.close();

        inner.capture = Some(Arc::new(CaptureSource::from_camera_frame(bytes, Utc::now())));
        inner.recognition = None;
        inner.state = PipelineState::Idle;
        Ok(())
    }

    /// Close the open camera session, if any. Cancellation, not an error.
    pub fn close_camera(&self) {
        if let Some(mut session) = self.lock().camera.take() {
            session.close();
        }
    }

    /// Run the active capture through analyze and persist.
    ///
    /// Recognition success chains directly into persistence; there is no
    /// confirmation step in between. Once submitted the pipeline runs to a
    /// terminal state, and a second submission is rejected until then.
    pub async fn submit(&self, owner: &OwnerId) -> Result<ScanOutcome, PipelineError> {
        let capture = {
            let mut inner = self.lock();
            if inner.in_flight() {
                return Err(PipelineError::Busy);
            }
            let Some(capture) = inner.capture.clone() else {
                return Err(PipelineError::NoCapture);
            };
            inner.recognition = None;
            inner.state = PipelineState::Analyzing;
            inner.run_active = true;
            capture
        };

        emit(
            &self.deps.telemetry,
            "receipt.analyze",
            serde_json::json!({ "owner": owner.as_str(), "filename": capture.filename }),
        );

        let recognition = match self.deps.recognition.analyze(&capture).await {
            Ok(recognition) => recognition,
            Err(err) => {
                self.finish(PipelineState::Failed, false);
                return Err(err.into());
            }
        };

        {
            let mut inner = self.lock();
            inner.recognition = Some(recognition.clone());
            inner.state = PipelineState::Ready;
        }

        // Ready chains straight into persistence.
        self.lock().state = PipelineState::Persisting;
        let gateway = PersistenceGateway::new(
            self.deps.blob_store.clone(),
            self.deps.receipt_store.clone(),
        );

        match gateway.persist(&capture, &recognition, owner).await {
            Ok(outcome) => {
                self.finish(PipelineState::Done, true);
                emit(
                    &self.deps.telemetry,
                    "receipt.persisted",
                    serde_json::json!({ "receipt_id": outcome.receipt.id }),
                );
                Ok(ScanOutcome {
                    receipt: outcome.receipt,
                    recognition,
                    items_saved: true,
                })
            }
            Err(PersistError::ItemInsert { receipt, source }) => {
                // Partial success: the header exists, items do not.
                tracing::warn!(receipt_id = receipt.id, error = %source, "line items were not saved");
                self.finish(PipelineState::Done, true);
                Ok(ScanOutcome {
                    receipt,
                    recognition,
                    items_saved: false,
                })
            }
            Err(err) => {
                self.finish(PipelineState::Failed, false);
                Err(PipelineError::Persistence(err))
            }
        }
    }
}

impl Drop for IngestionCoordinator {
    fn drop(&mut self) {
        // Pipeline teardown releases the device unconditionally.
        if let Ok(mut inner) = self.inner.lock() {
            if let Some(mut session) = inner.camera.take() {
                session.close();
            }
        }
    }
}
