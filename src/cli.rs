// SPDX-License-Identifier: GPL-3.0-only

//! Headless commands
//!
//! - Listing available cameras
//! - Detecting a barcode in an image file
//! - Scanning with the camera until the first barcode

use barcode_scanner::backends::camera::enumerate_cameras;
use barcode_scanner::backends::picker::PathPicker;
use barcode_scanner::backends::system_collaborators;
use barcode_scanner::constants::{detection, labels, timing};
use barcode_scanner::decoding::DecoderVision;
use barcode_scanner::scanner::{
    DetectionResult, ImagePicker, Phase, PickOutcome, ScannerScreen, SourceChoice,
    StillImageDetector,
};
use barcode_scanner::{Config, ScanError};
use futures::channel::oneshot;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::info;

/// List all cameras for the configured backend
pub fn list_cameras(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    gstreamer::init()?;

    let cameras = enumerate_cameras(config.backend);
    if cameras.is_empty() {
        println!("No cameras found ({}).", config.backend);
        return Ok(());
    }

    println!("Available cameras ({}):", config.backend);
    println!();
    for (index, camera) in cameras.iter().enumerate() {
        let marker = if index == config.camera_index { "*" } else { " " };
        if camera.path.is_empty() {
            println!(" {}[{}] {}", marker, index, camera.name);
        } else {
            println!(" {}[{}] {} ({})", marker, index, camera.name, camera.path);
        }
    }

    Ok(())
}

/// Detect the first barcode in an image file
pub fn scan_image(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Runtime::new()?;
    let picker = PathPicker::new(path.to_path_buf());
    let detector = StillImageDetector::new(Arc::new(DecoderVision::new(
        runtime.handle().clone(),
        detection::STILL_MAX_DIMENSION,
    )));

    let (sender, receiver) = oneshot::channel();
    picker.pick_image(Box::new(move |outcome| match outcome {
        PickOutcome::Picked(image) => detector.detect(image, move |result| {
            let _ = sender.send(result);
        }),
        PickOutcome::Cancelled => {
            let _ = sender.send(DetectionResult::Failure("No image selected".to_string()));
        }
        PickOutcome::Failed(reason) => {
            let _ = sender.send(DetectionResult::Failure(reason));
        }
    }));

    match runtime.block_on(receiver)? {
        DetectionResult::Success(payload) => {
            println!("{}{}", labels::FOUND_PREFIX, payload);
            Ok(())
        }
        DetectionResult::Failure(reason) => Err(ScanError::Detection(reason).into()),
    }
}

/// Run the camera scan flow without a screen
///
/// Goes through the same permission gate and capture controller as the
/// terminal screen, choosing the camera source automatically.
pub fn scan_camera(config: &Config, timeout: Option<u64>) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Runtime::new()?;
    let mut screen = ScannerScreen::new(system_collaborators(runtime.handle().clone(), config));

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        ctrlc::set_handler(move || stop.store(true, Ordering::SeqCst))?;
    }

    let deadline = timeout.map(|secs| Instant::now() + Duration::from_secs(secs));
    let mut announced = false;

    screen.detect_barcode_pressed();
    loop {
        screen.pump();
        match screen.phase() {
            Phase::ChoosingSource => screen.choose_source(SourceChoice::Camera),
            Phase::DenialNotice => {
                screen.dismiss_notice(false);
                eprintln!("{}: {}", labels::DENIED_TITLE, labels::DENIED_MESSAGE);
                return Err(ScanError::PermissionDenied.into());
            }
            Phase::Scanning if !announced => {
                println!("Scanning... (Ctrl+C to stop)");
                announced = true;
            }
            Phase::Idle => break,
            _ => {}
        }

        if stop.load(Ordering::SeqCst) {
            info!("Scan interrupted");
            screen.exit();
            println!("Stopped.");
            return Ok(());
        }
        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            screen.exit();
            return Err(ScanError::Generic("No barcode found before the timeout".to_string()).into());
        }

        std::thread::sleep(timing::UI_POLL_INTERVAL);
    }
    screen.exit();

    match screen.presenter().current() {
        Some(DetectionResult::Success(payload)) => {
            println!("{}{}", labels::DETECTED_PREFIX, payload);
            Ok(())
        }
        Some(DetectionResult::Failure(reason)) => Err(ScanError::Detection(reason.clone()).into()),
        None => Err(ScanError::Generic("Camera authorization status is unknown".to_string()).into()),
    }
}
