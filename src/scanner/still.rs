// SPDX-License-Identifier: GPL-3.0-only

//! One-shot barcode detection over a picked image

use super::presenter::DetectionResult;
use super::source::PickedImage;
use crate::constants::UNKNOWN_PAYLOAD;
use crate::decoding::{DecodeError, Observation};
use crate::errors::ScanError;
use std::sync::Arc;
use tracing::{debug, warn};

/// Continuation for a detection request; invoked exactly once
pub type VisionReply = Box<dyn FnOnce(Result<Vec<Observation>, DecodeError>) + Send>;

/// Still-image barcode detection engine
pub trait BarcodeVision: Send + Sync {
    /// Detect every barcode in `image`; `reply` may run on any thread
    fn detect_barcodes(&self, image: PickedImage, reply: VisionReply);
}

pub struct StillImageDetector {
    vision: Arc<dyn BarcodeVision>,
}

impl StillImageDetector {
    pub fn new(vision: Arc<dyn BarcodeVision>) -> Self {
        Self { vision }
    }

    /// Run one detection; `deliver` receives exactly one result
    pub fn detect<F>(&self, image: PickedImage, deliver: F)
    where
        F: FnOnce(DetectionResult) + Send + 'static,
    {
        debug!(
            width = image.pixels.width(),
            height = image.pixels.height(),
            source = ?image.source,
            "Detecting barcodes in picked image"
        );
        self.vision
            .detect_barcodes(image, Box::new(move |outcome| deliver(interpret(outcome))));
    }
}

/// Map an engine outcome onto a single detection result
///
/// Only the first observation counts. A located symbol without a string value
/// still counts as a success.
pub fn interpret(outcome: Result<Vec<Observation>, DecodeError>) -> DetectionResult {
    match outcome {
        Ok(observations) => match observations.into_iter().next() {
            Some(first) => {
                DetectionResult::Success(first.payload.unwrap_or_else(|| UNKNOWN_PAYLOAD.to_string()))
            }
            None => DetectionResult::from(ScanError::NoSymbolFound),
        },
        Err(e) => {
            warn!(error = %e, "Barcode detection failed");
            DetectionResult::Failure(e.to_string())
        }
    }
}
