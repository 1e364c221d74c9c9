// SPDX-License-Identifier: GPL-3.0-only

//! Platform implementations of the scanner's collaborators
//!
//! - [`camera`]: GStreamer capture backend and sessions
//! - [`portal`]: camera authorization (desktop portal or device nodes)
//! - [`picker`]: gallery image pickers

pub mod camera;
pub mod picker;
pub mod portal;

use crate::config::Config;
use crate::constants::detection;
use crate::decoding::DecoderVision;
use crate::scanner::Collaborators;
use std::sync::Arc;
use tokio::runtime::Handle;

/// Collaborators for the desktop session the app runs in
pub fn system_collaborators(runtime: Handle, config: &Config) -> Collaborators {
    Collaborators {
        authority: portal::system_authority(runtime.clone(), config),
        picker: Arc::new(picker::RfdPicker::new(
            runtime.clone(),
            config.gallery_directory(),
        )),
        vision: Arc::new(DecoderVision::new(runtime, detection::STILL_MAX_DIMENSION)),
        capture: Box::new(camera::GstCaptureBackend::new(config)),
    }
}
