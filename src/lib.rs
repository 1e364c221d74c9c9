// SPDX-License-Identifier: GPL-3.0-only

//! Barcode Scanner - scan barcodes and QR codes from a camera or an image
//!
//! # Architecture
//!
//! - [`scanner`]: the scanner screen model and its components (permission
//!   gate, source selector, capture controller, still-image detector, result
//!   presenter) plus the collaborator traits they call
//! - [`decoding`]: grayscale conversion and barcode decoding
//! - [`backends`]: GStreamer capture, camera authorization, image pickers
//! - [`terminal`]: the interactive terminal screen
//! - [`config`]: user configuration handling

pub mod backends;
pub mod config;
pub mod constants;
pub mod decoding;
pub mod errors;
pub mod scanner;
pub mod terminal;

pub use config::Config;
pub use errors::{AppError, AppResult, CaptureError, ScanError};
pub use scanner::{DetectionResult, ScannerScreen};
