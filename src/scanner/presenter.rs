// SPDX-License-Identifier: GPL-3.0-only

//! Single-line result display

use super::payload::PayloadKind;
use crate::constants::labels;
use crate::errors::ScanError;

/// Outcome of one detection, consumed once by the presenter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectionResult {
    Success(String),
    Failure(String),
}

impl DetectionResult {
    pub fn payload(&self) -> Option<&str> {
        match self {
            DetectionResult::Success(payload) => Some(payload),
            DetectionResult::Failure(_) => None,
        }
    }
}

impl From<ScanError> for DetectionResult {
    fn from(err: ScanError) -> Self {
        DetectionResult::Failure(err.to_string())
    }
}

/// Which path produced a result; successes are worded differently
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultOrigin {
    Camera,
    Image,
}

impl ResultOrigin {
    fn success_prefix(self) -> &'static str {
        match self {
            ResultOrigin::Camera => labels::DETECTED_PREFIX,
            ResultOrigin::Image => labels::FOUND_PREFIX,
        }
    }
}

/// Owns the status line; keeps no history
#[derive(Debug, Clone, Default)]
pub struct ResultPresenter {
    current: Option<(ResultOrigin, DetectionResult)>,
}

impl ResultPresenter {
    /// Replace whatever is displayed with `result`
    pub fn show(&mut self, origin: ResultOrigin, result: DetectionResult) {
        self.current = Some((origin, result));
    }

    pub fn show_error(&mut self, err: &ScanError) {
        self.show(ResultOrigin::Camera, DetectionResult::from(err.clone()));
    }

    pub fn clear(&mut self) {
        self.current = None;
    }

    pub fn current(&self) -> Option<&DetectionResult> {
        self.current.as_ref().map(|(_, result)| result)
    }

    /// Payload of the displayed success, if any
    pub fn payload(&self) -> Option<&str> {
        self.current().and_then(DetectionResult::payload)
    }

    /// Text of the status label; empty when cleared
    pub fn status_line(&self) -> String {
        match &self.current {
            None => String::new(),
            Some((origin, DetectionResult::Success(payload))) => {
                let prefix = origin.success_prefix();
                let kind = PayloadKind::classify(payload);
                match kind {
                    PayloadKind::Text => format!("{}{}", prefix, payload),
                    _ => format!("{}{} [{}]", prefix, payload, kind.label()),
                }
            }
            Some((_, DetectionResult::Failure(reason))) => {
                format!("{}{}", labels::ERROR_PREFIX, reason)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CaptureError;

    #[test]
    fn test_show_replaces_previous_result() {
        let mut presenter = ResultPresenter::default();
        presenter.show(ResultOrigin::Camera, DetectionResult::Success("first".to_string()));
        presenter.show(ResultOrigin::Image, DetectionResult::Failure("second".to_string()));

        assert_eq!(presenter.status_line(), "Error: second");
        assert_eq!(presenter.payload(), None);
    }

    #[test]
    fn test_clear_empties_the_status_line() {
        let mut presenter = ResultPresenter::default();
        presenter.show(ResultOrigin::Camera, DetectionResult::Success("ABC123".to_string()));
        assert_eq!(presenter.status_line(), "🔍 Detected barcode: ABC123");

        presenter.clear();
        assert_eq!(presenter.status_line(), "");
        assert!(presenter.current().is_none());
    }

    #[test]
    fn test_capture_errors_render_as_error_lines() {
        let mut presenter = ResultPresenter::default();
        presenter.show_error(&ScanError::Capture(CaptureError::DeviceUnavailable(
            "no camera".to_string(),
        )));
        assert_eq!(presenter.status_line(), "Error: Failed to access camera");
    }

    #[test]
    fn test_urls_are_labelled() {
        let mut presenter = ResultPresenter::default();
        presenter.show(
            ResultOrigin::Camera,
            DetectionResult::Success("https://example.com".to_string()),
        );
        assert_eq!(
            presenter.status_line(),
            "🔍 Detected barcode: https://example.com [URL]"
        );
    }

    #[test]
    fn test_image_results_are_found_not_detected() {
        let mut presenter = ResultPresenter::default();
        presenter.show(ResultOrigin::Image, DetectionResult::Success("4006381333931".to_string()));
        assert_eq!(presenter.status_line(), "Found barcode: 4006381333931");
    }
}
