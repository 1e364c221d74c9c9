// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use std::time::Duration;

/// Application identifier (config/cache directory names, portal request tokens)
pub const APP_ID: &str = "barcode-scanner";

/// Failure text when a still image yields no barcode and no engine error
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong. Please try again";

/// Payload shown when a decoded observation carries no string value
pub const UNKNOWN_PAYLOAD: &str = "Unknown";

/// Screen and control labels
pub mod labels {
    pub const SCREEN_TITLE: &str = "Home";
    pub const DETECT_BUTTON: &str = "Detect Barcode";

    pub const SOURCE_TITLE: &str = "Options";
    pub const SOURCE_MESSAGE: &str = "Choose an action";
    pub const GALLERY: &str = "Gallery";
    pub const CAMERA: &str = "Camera";
    pub const CANCEL: &str = "Cancel";

    pub const DENIED_TITLE: &str = "Camera Permission Denied";
    pub const DENIED_MESSAGE: &str =
        "Go to Settings > Privacy > Camera to allow access to your camera.";
    pub const SETTINGS: &str = "Settings";
    pub const OKAY: &str = "Okay";

    /// Live capture success
    pub const DETECTED_PREFIX: &str = "🔍 Detected barcode: ";
    /// Picked image success
    pub const FOUND_PREFIX: &str = "Found barcode: ";
    pub const ERROR_PREFIX: &str = "Error: ";
}

/// Frame processing
pub mod detection {
    /// Frames are downscaled so the longest side is at most this many pixels
    pub const DEFAULT_MAX_DIMENSION: u32 = 640;

    /// Picked images keep more detail; detection runs once, not per frame
    pub const STILL_MAX_DIMENSION: u32 = 2048;

    /// Frames queued between the appsink and the detection worker
    pub const WORKER_QUEUE_DEPTH: usize = 2;
}

/// GStreamer pipeline settings
pub mod pipeline {
    /// Maximum buffer queue size (keep small for low latency)
    pub const MAX_BUFFERS: u32 = 2;

    /// Output pixel format for appsink
    pub const OUTPUT_FORMAT: &str = "RGBA";
}

/// Timing constants
pub mod timing {
    use super::Duration;

    /// Frame counter modulo for periodic logging
    pub const FRAME_LOG_INTERVAL: u64 = 30;

    /// Pipeline state change timeout on start
    pub const START_TIMEOUT_SECS: u64 = 5;

    /// Pipeline state change timeout on stop
    pub const STOP_TIMEOUT_SECS: u64 = 2;

    /// Terminal input poll interval (also bounds UI queue latency)
    pub const UI_POLL_INTERVAL: Duration = Duration::from_millis(16);
}

/// XDG desktop portal names
pub mod portal {
    pub const BUS_NAME: &str = "org.freedesktop.portal.Desktop";
    pub const OBJECT_PATH: &str = "/org/freedesktop/portal/desktop";
    pub const CAMERA_INTERFACE: &str = "org.freedesktop.portal.Camera";
    pub const REQUEST_INTERFACE: &str = "org.freedesktop.portal.Request";
    pub const REQUEST_PATH_PREFIX: &str = "/org/freedesktop/portal/desktop/request";

    /// Marker file present inside a Flatpak sandbox
    pub const FLATPAK_INFO: &str = "/.flatpak-info";
}

/// Image file extensions offered by the gallery picker
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp", "tif", "tiff"];
