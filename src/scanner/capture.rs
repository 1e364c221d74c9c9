// SPDX-License-Identifier: GPL-3.0-only

//! Live capture session control
//!
//! The controller owns at most one capture session. Each session gets a new
//! generation number; events are tagged with it so the screen can drop
//! anything a superseded session emitted after it was stopped.

use super::presenter::DetectionResult;
use super::{ScannerEvent, UiSender};
use crate::backends::camera::types::{BackendError, BackendResult, CameraDevice, CameraFrame};
use crate::decoding::{CAPTURE_SYMBOLS, MetadataObject, SymbolType};
use crate::errors::CaptureError;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, trace, warn};

/// Output of a running session
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Frame for the preview pane
    Preview(CameraFrame),
    /// Symbols decoded from one frame, in detection order
    Metadata(Vec<MetadataObject>),
}

/// Callback a session pushes its events through; called from session threads
pub type SessionSink = Arc<dyn Fn(SessionEvent) + Send + Sync>;

/// An opened default video device
#[derive(Debug, Clone)]
pub struct VideoInput {
    pub device: CameraDevice,
}

/// Metadata output restricted to a symbol set
#[derive(Clone)]
pub struct MetadataOutput {
    pub symbols: Vec<SymbolType>,
    pub sink: SessionSink,
}

/// One capture session
pub trait CaptureSession: Send {
    fn add_input(&mut self, input: VideoInput) -> BackendResult<()>;
    fn add_metadata_output(&mut self, output: MetadataOutput) -> BackendResult<()>;
    fn attach_preview(&mut self, preview: SessionSink);
    fn start_running(&mut self) -> BackendResult<()>;
    /// Stop delivering events; no-op when not running
    fn stop_running(&mut self);
    fn is_running(&self) -> bool;
}

/// Factory for devices and sessions
pub trait CaptureBackend: Send {
    fn open_default_input(&mut self) -> BackendResult<VideoInput>;
    fn create_session(&mut self) -> Box<dyn CaptureSession>;
}

/// What a session event means for the screen
#[derive(Debug, Clone)]
pub enum CaptureUpdate {
    Preview(CameraFrame),
    /// First decoded payload; the session has been stopped
    Detected(DetectionResult),
}

pub type SharedBackend = Arc<Mutex<Box<dyn CaptureBackend>>>;

/// Session setup detached from the controller so it can run off the UI thread
///
/// Opening the device and bringing the pipeline up can block for seconds.
pub struct SetupJob {
    generation: u64,
    backend: SharedBackend,
    sink: SessionSink,
}

impl SetupJob {
    /// Run every setup step in order; the first failing step ends the job
    pub fn run(self) -> PreparedSession {
        let result = self.build();
        PreparedSession {
            generation: self.generation,
            result,
        }
    }

    fn build(&self) -> Result<Box<dyn CaptureSession>, CaptureError> {
        let mut backend = self.backend.lock().map_err(|_| {
            step_failed(CaptureError::DeviceUnavailable(
                "Capture backend lock poisoned".to_string(),
            ))
        })?;

        let input = backend
            .open_default_input()
            .map_err(|e| step_failed(CaptureError::DeviceUnavailable(e.to_string())))?;
        debug!(device = %input.device.name, path = %input.device.path, "Opened video input");

        let mut session = backend.create_session();
        drop(backend);

        session
            .add_input(input)
            .map_err(|e| step_failed(CaptureError::InputRejected(e.to_string())))?;

        session
            .add_metadata_output(MetadataOutput {
                symbols: CAPTURE_SYMBOLS.to_vec(),
                sink: self.sink.clone(),
            })
            .map_err(|e| step_failed(CaptureError::OutputRejected(e.to_string())))?;

        session.attach_preview(self.sink.clone());

        if let Err(e) = session.start_running() {
            session.stop_running();
            return Err(step_failed(start_error(e)));
        }
        Ok(session)
    }
}

/// A finished setup on its way back to the controller
pub struct PreparedSession {
    generation: u64,
    result: Result<Box<dyn CaptureSession>, CaptureError>,
}

impl std::fmt::Debug for PreparedSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreparedSession")
            .field("generation", &self.generation)
            .field("ok", &self.result.is_ok())
            .finish()
    }
}

pub struct CaptureController {
    backend: SharedBackend,
    session: Option<Box<dyn CaptureSession>>,
    generation: u64,
    /// Generation of the setup still in flight, if any
    pending: Option<u64>,
    events: UiSender,
}

impl CaptureController {
    pub fn new(backend: Box<dyn CaptureBackend>, events: UiSender) -> Self {
        Self {
            backend: Arc::new(Mutex::new(backend)),
            session: None,
            generation: 0,
            pending: None,
            events,
        }
    }

    /// Stop any previous session and prepare setup of a fresh one
    ///
    /// The returned job may run on any thread; hand its result to
    /// [`finish_setup`](Self::finish_setup).
    pub fn begin_setup(&mut self) -> SetupJob {
        self.stop();
        self.generation += 1;
        self.pending = Some(self.generation);
        info!(generation = self.generation, "Setting up capture session");

        SetupJob {
            generation: self.generation,
            backend: self.backend.clone(),
            sink: self.sink(self.generation),
        }
    }

    /// Adopt a finished setup
    ///
    /// Returns None when the setup was superseded by a newer one or by
    /// `stop()`; its session is stopped and dropped. On failure nothing is
    /// left running and the error names the step that failed.
    pub fn finish_setup(&mut self, prepared: PreparedSession) -> Option<Result<(), CaptureError>> {
        if self.pending != Some(prepared.generation) {
            debug!(generation = prepared.generation, "Discarding superseded capture setup");
            if let Ok(mut session) = prepared.result {
                session.stop_running();
            }
            return None;
        }
        self.pending = None;

        match prepared.result {
            Ok(session) => {
                self.session = Some(session);
                info!(generation = prepared.generation, "Capture session running");
                Some(Ok(()))
            }
            Err(e) => Some(Err(e)),
        }
    }

    /// Interpret one event from the session with the given generation
    ///
    /// Events from a stale or stopped session yield nothing. The first
    /// metadata batch whose leading object carries a payload stops the
    /// session; later batches are ignored.
    pub fn handle_session_event(
        &mut self,
        generation: u64,
        event: SessionEvent,
    ) -> Option<CaptureUpdate> {
        if !self.accepts(generation) {
            trace!(generation, current = self.generation, "Dropping stale session event");
            return None;
        }

        match event {
            SessionEvent::Preview(frame) => Some(CaptureUpdate::Preview(frame)),
            SessionEvent::Metadata(objects) => {
                let first = objects.into_iter().next()?;
                let Some(payload) = first.payload else {
                    debug!(symbol = %first.symbol, "Detected symbol without payload, still listening");
                    return None;
                };
                info!(symbol = %first.symbol, payload = %payload, "Detected barcode");
                self.stop();
                Some(CaptureUpdate::Detected(DetectionResult::Success(payload)))
            }
        }
    }

    /// Stop the current session and abandon any setup in flight; safe to
    /// call repeatedly
    pub fn stop(&mut self) {
        self.pending = None;
        if let Some(mut session) = self.session.take() {
            info!(generation = self.generation, "Stopping capture session");
            session.stop_running();
        }
    }

    pub fn is_running(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.is_running())
    }

    /// Whether events tagged with `generation` are still wanted
    pub fn accepts(&self, generation: u64) -> bool {
        generation == self.generation && self.is_running()
    }

    fn sink(&self, generation: u64) -> SessionSink {
        let events = self.events.clone();
        Arc::new(move |event| {
            // Receiver gone means the screen is shutting down
            let _ = events.unbounded_send(ScannerEvent::Session { generation, event });
        })
    }
}

impl Drop for CaptureController {
    fn drop(&mut self) {
        self.stop();
    }
}

fn step_failed(err: CaptureError) -> CaptureError {
    warn!(error = %err, detail = err.detail(), "Capture setup failed");
    err
}

fn start_error(err: BackendError) -> CaptureError {
    CaptureError::DeviceUnavailable(err.to_string())
}
