// SPDX-License-Identifier: GPL-3.0-only

//! Camera capture over GStreamer
//!
//! ```text
//! pipewiresrc | v4l2src ─► decodebin ─► videoconvert ─► appsink (RGBA)
//!                                                          │ FrameSender
//!                                                          ▼
//!                                              detection worker thread
//!                                               ├─► preview sink
//!                                               └─► metadata sink
//! ```

pub mod enumeration;
pub mod pipeline;
pub mod session;
pub mod types;

pub use enumeration::{enumerate_cameras, is_backend_available};
pub use pipeline::CapturePipeline;
pub use session::{GstCaptureBackend, GstCaptureSession};
pub use types::*;
