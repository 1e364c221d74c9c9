// SPDX-License-Identifier: GPL-3.0-only

//! Scanner screen model
//!
//! `ScannerScreen` owns the permission gate, source selector, capture
//! controller, still-image detector and result presenter. Collaborator
//! callbacks may fire on any thread; they only post `ScannerEvent`s onto the
//! screen's queue, and all state changes happen in `pump()` on the UI thread.
//! Camera setup runs on its own short-lived thread and reports back the same
//! way.

pub mod capture;
pub mod payload;
pub mod permission;
pub mod presenter;
pub mod source;
pub mod still;

pub use capture::{
    CaptureBackend, CaptureController, CaptureSession, CaptureUpdate, MetadataOutput,
    PreparedSession, SessionEvent, SessionSink, SetupJob, VideoInput,
};
pub use payload::PayloadKind;
pub use permission::{AccessReply, AuthorizationState, CameraAuthority, GateOutcome, PermissionGate};
pub use presenter::{DetectionResult, ResultOrigin, ResultPresenter};
pub use source::{ImagePicker, PickOutcome, PickReply, PickedImage, SourceChoice, SourceSelector};
pub use still::{BarcodeVision, StillImageDetector, VisionReply};

use crate::backends::camera::types::CameraFrame;
use crate::errors::{AppError, AppResult, CaptureError, ScanError};
use futures::channel::mpsc;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Everything collaborators deliver back to the screen
#[derive(Debug)]
pub enum ScannerEvent {
    Access { attempt: u64, outcome: GateOutcome },
    ImagePicked { attempt: u64, outcome: PickOutcome },
    StillDetected { attempt: u64, result: DetectionResult },
    SessionPrepared(PreparedSession),
    Session { generation: u64, event: SessionEvent },
}

pub type UiSender = mpsc::UnboundedSender<ScannerEvent>;
pub type UiReceiver = mpsc::UnboundedReceiver<ScannerEvent>;

/// Platform implementations the screen is built from
pub struct Collaborators {
    pub authority: Arc<dyn CameraAuthority>,
    pub picker: Arc<dyn ImagePicker>,
    pub vision: Arc<dyn BarcodeVision>,
    pub capture: Box<dyn CaptureBackend>,
}

/// Where the screen is in a scan attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    AwaitingPermission,
    ChoosingSource,
    DenialNotice,
    PickingImage,
    DetectingImage,
    StartingCamera,
    Scanning,
}

/// Preview panes
#[derive(Debug, Clone, Default)]
pub struct ViewState {
    pub camera_visible: bool,
    pub camera_frame: Option<CameraFrame>,
    pub image_visible: bool,
    pub image_frame: Option<CameraFrame>,
}

impl ViewState {
    fn hide_camera(&mut self) {
        self.camera_visible = false;
        self.camera_frame = None;
    }

    fn hide_image(&mut self) {
        self.image_visible = false;
        self.image_frame = None;
    }
}

pub struct ScannerScreen {
    gate: PermissionGate,
    selector: SourceSelector,
    capture: CaptureController,
    still: StillImageDetector,
    presenter: ResultPresenter,
    picker: Arc<dyn ImagePicker>,
    view: ViewState,
    phase: Phase,
    attempt: u64,
    events_tx: UiSender,
    events_rx: UiReceiver,
}

impl ScannerScreen {
    pub fn new(collaborators: Collaborators) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded();
        Self {
            gate: PermissionGate::new(collaborators.authority),
            selector: SourceSelector::default(),
            capture: CaptureController::new(collaborators.capture, events_tx.clone()),
            still: StillImageDetector::new(collaborators.vision),
            presenter: ResultPresenter::default(),
            picker: collaborators.picker,
            view: ViewState::default(),
            phase: Phase::Idle,
            attempt: 0,
            events_tx,
            events_rx,
        }
    }

    /// Start a new scan attempt, superseding any attempt in progress
    pub fn detect_barcode_pressed(&mut self) {
        self.capture.stop();
        self.clear_data();
        self.attempt += 1;
        self.phase = Phase::AwaitingPermission;
        info!(attempt = self.attempt, "Scan requested");

        let events = self.events_tx.clone();
        let attempt = self.attempt;
        self.gate.request_camera_access(move |outcome| {
            let _ = events.unbounded_send(ScannerEvent::Access { attempt, outcome });
        });
    }

    /// Act on the source selector; ignored unless the selector is showing
    pub fn choose_source(&mut self, choice: SourceChoice) {
        if self.phase != Phase::ChoosingSource {
            debug!(?choice, phase = ?self.phase, "Source choice outside selector, ignoring");
            return;
        }
        debug!(?choice, "Source chosen");

        match choice {
            SourceChoice::Cancel => self.phase = Phase::Idle,
            SourceChoice::Gallery => {
                self.capture.stop();
                self.view.hide_camera();
                self.phase = Phase::PickingImage;

                let events = self.events_tx.clone();
                let attempt = self.attempt;
                self.picker.pick_image(Box::new(move |outcome| {
                    let _ = events.unbounded_send(ScannerEvent::ImagePicked { attempt, outcome });
                }));
            }
            SourceChoice::Camera => {
                self.view.hide_image();
                self.view.camera_visible = true;
                self.phase = Phase::StartingCamera;

                let job = self.capture.begin_setup();
                let events = self.events_tx.clone();
                let spawned = std::thread::Builder::new()
                    .name("capture-setup".to_string())
                    .spawn(move || {
                        let prepared = job.run();
                        let _ = events.unbounded_send(ScannerEvent::SessionPrepared(prepared));
                    });
                if let Err(e) = spawned {
                    self.capture.stop();
                    self.capture_failed(CaptureError::DeviceUnavailable(e.to_string()));
                }
            }
        }
    }

    /// Close the denial notice, optionally following its settings link
    pub fn dismiss_notice(&mut self, open_settings: bool) {
        if self.phase != Phase::DenialNotice {
            return;
        }
        if open_settings {
            self.gate.open_settings();
        }
        self.phase = Phase::Idle;
    }

    /// Hand the displayed payload to the desktop's default handler
    pub fn open_payload(&self) -> AppResult<()> {
        let Some(payload) = self.presenter.payload() else {
            return Err(AppError::Other("No barcode to open".to_string()));
        };
        let kind = PayloadKind::classify(payload);
        let Some(target) = kind.open_target() else {
            return Err(AppError::Other(format!("{} payloads cannot be opened", kind.label())));
        };
        info!(target = %target, "Opening payload");
        open::that_detached(&target)
            .map_err(|e| AppError::Other(format!("Failed to open {}: {}", target, e)))
    }

    /// Apply every queued event; returns whether anything arrived
    pub fn pump(&mut self) -> bool {
        let mut changed = false;
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_event(event);
            changed = true;
        }
        changed
    }

    /// Screen is going away: release the camera
    pub fn exit(&mut self) {
        self.capture.stop();
        self.phase = Phase::Idle;
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn presenter(&self) -> &ResultPresenter {
        &self.presenter
    }

    pub fn status_line(&self) -> String {
        self.presenter.status_line()
    }

    pub fn selector(&self) -> &SourceSelector {
        &self.selector
    }

    pub fn selector_mut(&mut self) -> &mut SourceSelector {
        &mut self.selector
    }

    pub fn is_capturing(&self) -> bool {
        self.capture.is_running()
    }

    fn clear_data(&mut self) {
        self.presenter.clear();
        self.view = ViewState::default();
    }

    fn capture_failed(&mut self, err: CaptureError) {
        self.presenter.show_error(&ScanError::Capture(err));
        self.view.hide_camera();
        self.phase = Phase::Idle;
    }

    fn handle_event(&mut self, event: ScannerEvent) {
        match event {
            ScannerEvent::Access { attempt, outcome } => {
                if !self.is_current(attempt, Phase::AwaitingPermission) {
                    return;
                }
                self.phase = match outcome {
                    GateOutcome::Proceed => {
                        self.selector.reset();
                        Phase::ChoosingSource
                    }
                    GateOutcome::DenialNotice => Phase::DenialNotice,
                    GateOutcome::Ignored => Phase::Idle,
                };
            }
            ScannerEvent::ImagePicked { attempt, outcome } => {
                if !self.is_current(attempt, Phase::PickingImage) {
                    return;
                }
                match outcome {
                    PickOutcome::Cancelled => {
                        debug!("Image picker dismissed");
                        self.phase = Phase::Idle;
                    }
                    PickOutcome::Failed(reason) => {
                        warn!(reason = %reason, "Picked image could not be loaded");
                        self.presenter.show(ResultOrigin::Image, DetectionResult::Failure(reason));
                        self.phase = Phase::Idle;
                    }
                    PickOutcome::Picked(image) => {
                        self.view.image_frame = Some(image.preview_frame());
                        self.view.image_visible = true;
                        self.phase = Phase::DetectingImage;

                        let events = self.events_tx.clone();
                        self.still.detect(image, move |result| {
                            let _ = events.unbounded_send(ScannerEvent::StillDetected { attempt, result });
                        });
                    }
                }
            }
            ScannerEvent::StillDetected { attempt, result } => {
                if !self.is_current(attempt, Phase::DetectingImage) {
                    return;
                }
                self.presenter.show(ResultOrigin::Image, result);
                self.phase = Phase::Idle;
            }
            ScannerEvent::SessionPrepared(prepared) => {
                match self.capture.finish_setup(prepared) {
                    Some(Ok(())) => self.phase = Phase::Scanning,
                    Some(Err(e)) => self.capture_failed(e),
                    None => {}
                }
            }
            ScannerEvent::Session { generation, event } => {
                match self.capture.handle_session_event(generation, event) {
                    Some(CaptureUpdate::Preview(frame)) => {
                        if self.view.camera_visible {
                            self.view.camera_frame = Some(frame);
                        }
                    }
                    Some(CaptureUpdate::Detected(result)) => {
                        self.presenter.show(ResultOrigin::Camera, result);
                        self.phase = Phase::Idle;
                    }
                    None => {}
                }
            }
        }
    }

    fn is_current(&self, attempt: u64, phase: Phase) -> bool {
        let current = attempt == self.attempt && self.phase == phase;
        if !current {
            debug!(
                attempt,
                current_attempt = self.attempt,
                phase = ?self.phase,
                "Dropping superseded event"
            );
        }
        current
    }
}

impl Drop for ScannerScreen {
    fn drop(&mut self) {
        self.exit();
    }
}
