// SPDX-License-Identifier: GPL-3.0-only

//! Scanner screen flows driven through fake collaborators

use barcode_scanner::backends::camera::{
    BackendError, BackendResult, CameraBackendType, CameraDevice, CameraFrame,
};
use barcode_scanner::decoding::{
    CAPTURE_SYMBOLS, DecodeError, DecodedSymbol, Observation, SymbolType,
};
use barcode_scanner::scanner::{
    AccessReply, AuthorizationState, BarcodeVision, CameraAuthority, CaptureBackend,
    CaptureController, CaptureSession, Collaborators, DetectionResult, ImagePicker,
    MetadataOutput, Phase, PickOutcome, PickReply, PickedImage, ScannerScreen, SessionEvent,
    SessionSink, SourceChoice, VideoInput, VisionReply,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc as std_mpsc;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

// ===== Fakes =====

struct FakeAuthority {
    state: AuthorizationState,
    grant: bool,
    settings_opened: AtomicUsize,
}

impl CameraAuthority for FakeAuthority {
    fn authorization_status(&self) -> AuthorizationState {
        self.state
    }

    fn request_access(&self, reply: AccessReply) {
        reply(self.grant);
    }

    fn open_settings(&self) -> Result<(), String> {
        self.settings_opened.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

enum PickPlan {
    Image,
    Cancel,
    Fail(&'static str),
}

#[derive(Default)]
struct FakePicker {
    plans: Mutex<VecDeque<PickPlan>>,
    presented: AtomicUsize,
}

impl ImagePicker for FakePicker {
    fn pick_image(&self, reply: PickReply) {
        self.presented.fetch_add(1, Ordering::SeqCst);
        let plan = self
            .plans
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(PickPlan::Cancel);
        reply(match plan {
            PickPlan::Image => PickOutcome::Picked(PickedImage::from_rgba(image::RgbaImage::new(8, 8))),
            PickPlan::Cancel => PickOutcome::Cancelled,
            PickPlan::Fail(reason) => PickOutcome::Failed(reason.to_string()),
        });
    }
}

#[derive(Default)]
struct FakeVision {
    result: Mutex<Option<Result<Vec<Observation>, DecodeError>>>,
    /// Hold replies instead of answering immediately
    defer: bool,
    held: Mutex<Vec<VisionReply>>,
    calls: AtomicUsize,
}

impl FakeVision {
    fn answering(result: Result<Vec<Observation>, DecodeError>) -> Self {
        Self {
            result: Mutex::new(Some(result)),
            ..Self::default()
        }
    }

    fn release(&self, result: Result<Vec<Observation>, DecodeError>) {
        for reply in self.held.lock().unwrap().drain(..) {
            reply(result.clone());
        }
    }
}

impl BarcodeVision for FakeVision {
    fn detect_barcodes(&self, _image: PickedImage, reply: VisionReply) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.defer {
            self.held.lock().unwrap().push(reply);
            return;
        }
        let result = self.result.lock().unwrap().clone().unwrap_or(Ok(Vec::new()));
        reply(result);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailAt {
    Open,
    Input,
    Output,
    Start,
}

#[derive(Default)]
struct SessionState {
    running: bool,
    symbols: Vec<SymbolType>,
    metadata: Option<SessionSink>,
    preview: Option<SessionSink>,
    stop_calls: usize,
}

#[derive(Default)]
struct CaptureLog {
    fail_at: Option<FailAt>,
    sessions: Vec<Arc<Mutex<SessionState>>>,
}

impl CaptureLog {
    fn running_sessions(&self) -> usize {
        self.sessions
            .iter()
            .filter(|s| s.lock().unwrap().running)
            .count()
    }
}

struct FakeBackend {
    log: Arc<Mutex<CaptureLog>>,
    /// Blocks opening the device until released
    gate: Option<std_mpsc::Receiver<()>>,
}

impl CaptureBackend for FakeBackend {
    fn open_default_input(&mut self) -> BackendResult<VideoInput> {
        if let Some(gate) = &self.gate {
            let _ = gate.recv();
        }
        if self.log.lock().unwrap().fail_at == Some(FailAt::Open) {
            return Err(BackendError::DeviceNotFound("no camera".to_string()));
        }
        Ok(VideoInput {
            device: CameraDevice {
                name: "Fake Camera".to_string(),
                path: String::new(),
                backend: CameraBackendType::PipeWire,
            },
        })
    }

    fn create_session(&mut self) -> Box<dyn CaptureSession> {
        let state = Arc::new(Mutex::new(SessionState::default()));
        let mut log = self.log.lock().unwrap();
        log.sessions.push(state.clone());
        Box::new(FakeSession {
            state,
            fail_at: log.fail_at,
        })
    }
}

struct FakeSession {
    state: Arc<Mutex<SessionState>>,
    fail_at: Option<FailAt>,
}

impl CaptureSession for FakeSession {
    fn add_input(&mut self, _input: VideoInput) -> BackendResult<()> {
        match self.fail_at {
            Some(FailAt::Input) => Err(BackendError::InvalidState("busy".to_string())),
            _ => Ok(()),
        }
    }

    fn add_metadata_output(&mut self, output: MetadataOutput) -> BackendResult<()> {
        if self.fail_at == Some(FailAt::Output) {
            return Err(BackendError::FormatNotSupported("metadata".to_string()));
        }
        let mut state = self.state.lock().unwrap();
        state.symbols = output.symbols;
        state.metadata = Some(output.sink);
        Ok(())
    }

    fn attach_preview(&mut self, preview: SessionSink) {
        self.state.lock().unwrap().preview = Some(preview);
    }

    fn start_running(&mut self) -> BackendResult<()> {
        if self.fail_at == Some(FailAt::Start) {
            return Err(BackendError::DeviceNotFound("device vanished".to_string()));
        }
        self.state.lock().unwrap().running = true;
        Ok(())
    }

    fn stop_running(&mut self) {
        let mut state = self.state.lock().unwrap();
        state.running = false;
        state.stop_calls += 1;
    }

    fn is_running(&self) -> bool {
        self.state.lock().unwrap().running
    }
}

// ===== Rig =====

struct Rig {
    screen: ScannerScreen,
    authority: Arc<FakeAuthority>,
    picker: Arc<FakePicker>,
    vision: Arc<FakeVision>,
    capture: Arc<Mutex<CaptureLog>>,
}

impl Rig {
    fn new(state: AuthorizationState) -> Self {
        Self::build(state, true, FakeVision::default())
    }

    fn with_vision(vision: FakeVision) -> Self {
        Self::build(AuthorizationState::Authorized, true, vision)
    }

    fn build(state: AuthorizationState, grant: bool, vision: FakeVision) -> Self {
        Self::assemble(state, grant, vision, None)
    }

    /// Camera setup waits until the returned sender fires
    fn gated() -> (Self, std_mpsc::Sender<()>) {
        let (release, gate) = std_mpsc::channel();
        let rig = Self::assemble(
            AuthorizationState::Authorized,
            true,
            FakeVision::default(),
            Some(gate),
        );
        (rig, release)
    }

    fn assemble(
        state: AuthorizationState,
        grant: bool,
        vision: FakeVision,
        gate: Option<std_mpsc::Receiver<()>>,
    ) -> Self {
        let authority = Arc::new(FakeAuthority {
            state,
            grant,
            settings_opened: AtomicUsize::new(0),
        });
        let picker = Arc::new(FakePicker::default());
        let vision = Arc::new(vision);
        let capture = Arc::new(Mutex::new(CaptureLog::default()));

        let screen = ScannerScreen::new(Collaborators {
            authority: authority.clone(),
            picker: picker.clone(),
            vision: vision.clone(),
            capture: Box::new(FakeBackend {
                log: capture.clone(),
                gate,
            }),
        });

        Self {
            screen,
            authority,
            picker,
            vision,
            capture,
        }
    }

    fn press_detect(&mut self) {
        self.screen.detect_barcode_pressed();
        self.screen.pump();
    }

    fn choose(&mut self, choice: SourceChoice) {
        self.screen.choose_source(choice);
        self.wait_until(|rig| rig.screen.phase() != Phase::StartingCamera);
    }

    /// Pump until `done` holds; camera setup reports back from its own thread
    fn wait_until(&mut self, done: impl Fn(&Rig) -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            self.screen.pump();
            if done(self) {
                return;
            }
            assert!(Instant::now() < deadline, "timed out in phase {:?}", self.screen.phase());
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    fn plan_pick(&self, plan: PickPlan) {
        self.picker.plans.lock().unwrap().push_back(plan);
    }

    fn fail_capture_at(&self, step: FailAt) {
        self.capture.lock().unwrap().fail_at = Some(step);
    }

    fn session(&self, index: usize) -> Arc<Mutex<SessionState>> {
        self.capture.lock().unwrap().sessions[index].clone()
    }

    /// Emit metadata from session `index` and let the screen process it
    fn emit_metadata(&mut self, index: usize, objects: Vec<DecodedSymbol>) {
        let sink = self.session(index).lock().unwrap().metadata.clone();
        if let Some(sink) = sink {
            sink(SessionEvent::Metadata(objects));
        }
        self.screen.pump();
    }

    fn running_sessions(&self) -> usize {
        self.capture.lock().unwrap().running_sessions()
    }
}

fn qr(payload: &str) -> DecodedSymbol {
    DecodedSymbol::new(SymbolType::Qr, payload)
}

// ===== Permission =====

#[test]
fn test_permission_states_route_to_one_outcome() {
    let cases = [
        (AuthorizationState::Authorized, true, Phase::ChoosingSource),
        (AuthorizationState::NotDetermined, true, Phase::ChoosingSource),
        (AuthorizationState::NotDetermined, false, Phase::DenialNotice),
        (AuthorizationState::Denied, true, Phase::DenialNotice),
        (AuthorizationState::Restricted, true, Phase::DenialNotice),
        (AuthorizationState::Unknown, true, Phase::Idle),
    ];

    for (state, grant, expected) in cases {
        let mut rig = Rig::build(state, grant, FakeVision::default());
        rig.press_detect();
        assert_eq!(rig.screen.phase(), expected, "state {:?}, grant {}", state, grant);
        assert_eq!(rig.screen.status_line(), "", "state {:?}", state);
        assert_eq!(rig.running_sessions(), 0);
    }
}

#[test]
fn test_denial_notice_settings_link() {
    let mut rig = Rig::new(AuthorizationState::Denied);
    rig.press_detect();
    rig.screen.dismiss_notice(true);
    assert_eq!(rig.screen.phase(), Phase::Idle);
    assert_eq!(rig.authority.settings_opened.load(Ordering::SeqCst), 1);

    rig.press_detect();
    rig.screen.dismiss_notice(false);
    assert_eq!(rig.screen.phase(), Phase::Idle);
    assert_eq!(rig.authority.settings_opened.load(Ordering::SeqCst), 1);
}

#[test]
fn test_source_choice_ignored_outside_selector() {
    let mut rig = Rig::new(AuthorizationState::Denied);
    rig.press_detect();
    rig.choose(SourceChoice::Camera);

    assert_eq!(rig.screen.phase(), Phase::DenialNotice);
    assert!(rig.capture.lock().unwrap().sessions.is_empty());
}

// ===== Camera path =====

#[test]
fn test_first_payload_wins_and_stops_the_session() {
    let mut rig = Rig::new(AuthorizationState::Authorized);
    rig.press_detect();
    rig.choose(SourceChoice::Camera);
    assert_eq!(rig.screen.phase(), Phase::Scanning);
    assert!(rig.screen.view().camera_visible);
    assert_eq!(rig.running_sessions(), 1);
    assert_eq!(rig.session(0).lock().unwrap().symbols, CAPTURE_SYMBOLS.to_vec());

    rig.emit_metadata(0, Vec::new());
    assert_eq!(rig.screen.phase(), Phase::Scanning);
    assert_eq!(rig.screen.status_line(), "");

    rig.emit_metadata(0, vec![qr("ABC123"), qr("ignored")]);
    assert_eq!(
        rig.screen.presenter().current(),
        Some(&DetectionResult::Success("ABC123".to_string()))
    );
    assert_eq!(rig.screen.status_line(), "🔍 Detected barcode: ABC123");
    assert_eq!(rig.screen.phase(), Phase::Idle);
    assert_eq!(rig.running_sessions(), 0);

    // Anything the stopped session still emits is dropped
    rig.emit_metadata(0, vec![qr("XYZ")]);
    assert_eq!(rig.screen.status_line(), "🔍 Detected barcode: ABC123");
}

#[test]
fn test_first_object_without_payload_keeps_listening() {
    let mut rig = Rig::new(AuthorizationState::Authorized);
    rig.press_detect();
    rig.choose(SourceChoice::Camera);

    rig.emit_metadata(0, vec![DecodedSymbol::without_payload(SymbolType::Pdf417), qr("later")]);
    assert_eq!(rig.screen.phase(), Phase::Scanning);
    assert_eq!(rig.running_sessions(), 1);

    rig.emit_metadata(0, vec![qr("found")]);
    assert_eq!(rig.screen.status_line(), "🔍 Detected barcode: found");
}

#[test]
fn test_restart_leaves_one_running_session() {
    let mut rig = Rig::new(AuthorizationState::Authorized);
    rig.press_detect();
    rig.choose(SourceChoice::Camera);
    rig.press_detect();
    rig.choose(SourceChoice::Camera);

    assert_eq!(rig.capture.lock().unwrap().sessions.len(), 2);
    assert_eq!(rig.running_sessions(), 1);
    assert!(!rig.session(0).lock().unwrap().running);

    // The superseded session's late results are discarded
    rig.session(0).lock().unwrap().running = true;
    rig.emit_metadata(0, vec![qr("stale")]);
    assert_eq!(rig.screen.status_line(), "");
    assert_eq!(rig.screen.phase(), Phase::Scanning);

    rig.emit_metadata(1, vec![qr("fresh")]);
    assert_eq!(rig.screen.status_line(), "🔍 Detected barcode: fresh");
}

#[test]
fn test_preview_frames_fill_the_camera_pane() {
    let mut rig = Rig::new(AuthorizationState::Authorized);
    rig.press_detect();
    rig.choose(SourceChoice::Camera);

    let preview = rig.session(0).lock().unwrap().preview.clone().unwrap();
    preview(SessionEvent::Preview(CameraFrame::from_rgba_image(
        &image::RgbaImage::new(4, 4),
    )));
    rig.screen.pump();

    let view = rig.screen.view();
    assert!(view.camera_visible);
    assert_eq!(view.camera_frame.as_ref().map(|f| f.width), Some(4));
}

#[test]
fn test_setup_failures_name_the_step() {
    let cases = [
        (FailAt::Open, "Error: Failed to access camera"),
        (FailAt::Input, "Error: Failed to add camera input"),
        (FailAt::Output, "Error: Failed to add metadata output"),
        (FailAt::Start, "Error: Failed to access camera"),
    ];

    for (step, expected) in cases {
        let mut rig = Rig::new(AuthorizationState::Authorized);
        rig.fail_capture_at(step);
        rig.press_detect();
        rig.choose(SourceChoice::Camera);

        assert_eq!(rig.screen.status_line(), expected, "{:?}", step);
        assert_eq!(rig.screen.phase(), Phase::Idle);
        assert_eq!(rig.running_sessions(), 0, "{:?}", step);
        assert!(!rig.screen.is_capturing());
        assert!(!rig.screen.view().camera_visible);
    }
}

#[test]
fn test_stop_is_idempotent() {
    let log = Arc::new(Mutex::new(CaptureLog::default()));
    let (sender, _receiver) = futures::channel::mpsc::unbounded();
    let backend = FakeBackend {
        log: log.clone(),
        gate: None,
    };
    let mut controller = CaptureController::new(Box::new(backend), sender);

    controller.stop();
    let prepared = controller.begin_setup().run();
    assert!(matches!(controller.finish_setup(prepared), Some(Ok(()))));
    assert!(controller.is_running());

    controller.stop();
    controller.stop();
    assert!(!controller.is_running());
    let session = log.lock().unwrap().sessions[0].clone();
    assert_eq!(session.lock().unwrap().stop_calls, 1);
}

#[test]
fn test_camera_setup_does_not_block_the_screen() {
    let (mut rig, release) = Rig::gated();
    rig.press_detect();
    rig.screen.choose_source(SourceChoice::Camera);
    rig.screen.pump();

    assert_eq!(rig.screen.phase(), Phase::StartingCamera);
    assert!(rig.screen.view().camera_visible);
    assert_eq!(rig.running_sessions(), 0);

    release.send(()).unwrap();
    rig.wait_until(|rig| rig.screen.phase() != Phase::StartingCamera);
    assert_eq!(rig.screen.phase(), Phase::Scanning);
    assert_eq!(rig.running_sessions(), 1);
}

#[test]
fn test_superseded_camera_setup_is_discarded() {
    let (mut rig, release) = Rig::gated();
    rig.press_detect();
    rig.screen.choose_source(SourceChoice::Camera);

    // A new attempt starts while the device is still opening
    rig.press_detect();
    release.send(()).unwrap();
    rig.wait_until(|rig| {
        let log = rig.capture.lock().unwrap();
        log.sessions
            .first()
            .is_some_and(|s| s.lock().unwrap().stop_calls >= 1)
    });

    assert_eq!(rig.screen.phase(), Phase::ChoosingSource);
    assert_eq!(rig.running_sessions(), 0);
    assert!(!rig.screen.is_capturing());
}

#[test]
fn test_exit_while_camera_starts_leaves_nothing_running() {
    let (mut rig, release) = Rig::gated();
    rig.press_detect();
    rig.screen.choose_source(SourceChoice::Camera);
    rig.screen.exit();
    assert_eq!(rig.screen.phase(), Phase::Idle);

    release.send(()).unwrap();
    rig.wait_until(|rig| {
        let log = rig.capture.lock().unwrap();
        log.sessions
            .first()
            .is_some_and(|s| s.lock().unwrap().stop_calls >= 1)
    });
    assert_eq!(rig.running_sessions(), 0);
    assert_eq!(rig.screen.status_line(), "");
}

#[test]
fn test_exit_stops_capture() {
    let mut rig = Rig::new(AuthorizationState::Authorized);
    rig.press_detect();
    rig.choose(SourceChoice::Camera);
    rig.screen.exit();

    assert_eq!(rig.running_sessions(), 0);
    assert_eq!(rig.screen.phase(), Phase::Idle);
}

// ===== Gallery path =====

#[test]
fn test_gallery_success() {
    let mut rig = Rig::with_vision(FakeVision::answering(Ok(vec![
        DecodedSymbol::new(SymbolType::Ean13, "4006381333931"),
        qr("second"),
    ])));
    rig.plan_pick(PickPlan::Image);
    rig.press_detect();
    rig.choose(SourceChoice::Gallery);

    assert_eq!(rig.screen.status_line(), "Found barcode: 4006381333931");
    assert_eq!(rig.screen.phase(), Phase::Idle);
    assert!(rig.screen.view().image_visible);
    assert!(rig.screen.view().image_frame.is_some());
    assert!(!rig.screen.view().camera_visible);
}

#[test]
fn test_gallery_without_observations_is_generic_failure() {
    let mut rig = Rig::with_vision(FakeVision::answering(Ok(Vec::new())));
    rig.plan_pick(PickPlan::Image);
    rig.press_detect();
    rig.choose(SourceChoice::Gallery);

    assert_eq!(
        rig.screen.presenter().current(),
        Some(&DetectionResult::Failure(
            "Something went wrong. Please try again".to_string()
        ))
    );
    assert_eq!(
        rig.screen.status_line(),
        "Error: Something went wrong. Please try again"
    );
}

#[test]
fn test_gallery_empty_payload_is_unknown() {
    let mut rig = Rig::with_vision(FakeVision::answering(Ok(vec![qr("")])));
    rig.plan_pick(PickPlan::Image);
    rig.press_detect();
    rig.choose(SourceChoice::Gallery);

    assert_eq!(
        rig.screen.presenter().current(),
        Some(&DetectionResult::Success("Unknown".to_string()))
    );
}

#[test]
fn test_gallery_engine_error_is_shown() {
    let mut rig = Rig::with_vision(FakeVision::answering(Err(DecodeError::InvalidImage(
        "bad pixels".to_string(),
    ))));
    rig.plan_pick(PickPlan::Image);
    rig.press_detect();
    rig.choose(SourceChoice::Gallery);

    assert_eq!(rig.screen.status_line(), "Error: Invalid image: bad pixels");
}

#[test]
fn test_gallery_cancel_changes_nothing() {
    let mut rig = Rig::new(AuthorizationState::Authorized);
    rig.plan_pick(PickPlan::Cancel);
    rig.press_detect();
    let status_before = rig.screen.status_line();

    rig.choose(SourceChoice::Gallery);

    assert_eq!(rig.screen.status_line(), status_before);
    assert_eq!(rig.screen.phase(), Phase::Idle);
    assert!(!rig.screen.view().image_visible);
    assert!(!rig.screen.view().camera_visible);
    assert_eq!(rig.vision.calls.load(Ordering::SeqCst), 0);
    assert_eq!(rig.running_sessions(), 0);
}

#[test]
fn test_gallery_load_failure_is_shown() {
    let mut rig = Rig::new(AuthorizationState::Authorized);
    rig.plan_pick(PickPlan::Fail("Unsupported image format"));
    rig.press_detect();
    rig.choose(SourceChoice::Gallery);

    assert_eq!(rig.screen.status_line(), "Error: Unsupported image format");
    assert_eq!(rig.vision.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_gallery_stops_a_running_camera() {
    let mut rig = Rig::new(AuthorizationState::Authorized);
    rig.press_detect();
    rig.choose(SourceChoice::Camera);
    assert_eq!(rig.running_sessions(), 1);

    rig.plan_pick(PickPlan::Cancel);
    rig.press_detect();
    assert_eq!(rig.running_sessions(), 0);
    rig.choose(SourceChoice::Gallery);

    assert_eq!(rig.running_sessions(), 0);
    assert!(!rig.screen.view().camera_visible);
}

#[test]
fn test_superseded_still_detection_is_discarded() {
    let mut rig = Rig::with_vision(FakeVision {
        defer: true,
        ..FakeVision::default()
    });
    rig.plan_pick(PickPlan::Image);
    rig.press_detect();
    rig.choose(SourceChoice::Gallery);
    assert_eq!(rig.screen.phase(), Phase::DetectingImage);

    // A new attempt starts before the old detection answers
    rig.press_detect();
    rig.vision.release(Ok(vec![qr("old")]));
    rig.screen.pump();

    assert_eq!(rig.screen.status_line(), "");
    assert_eq!(rig.screen.phase(), Phase::ChoosingSource);
}

#[test]
fn test_cancel_closes_the_selector() {
    let mut rig = Rig::new(AuthorizationState::Authorized);
    rig.press_detect();
    rig.choose(SourceChoice::Cancel);

    assert_eq!(rig.screen.phase(), Phase::Idle);
    assert_eq!(rig.picker.presented.load(Ordering::SeqCst), 0);
    assert!(rig.capture.lock().unwrap().sessions.is_empty());
}

#[test]
fn test_detect_clears_previous_result() {
    let mut rig = Rig::with_vision(FakeVision::answering(Ok(vec![qr("ABC123")])));
    rig.plan_pick(PickPlan::Image);
    rig.press_detect();
    rig.choose(SourceChoice::Gallery);
    assert_eq!(rig.screen.status_line(), "Found barcode: ABC123");

    rig.press_detect();
    assert_eq!(rig.screen.status_line(), "");
    assert!(!rig.screen.view().image_visible);
}
