// SPDX-License-Identifier: GPL-3.0-only

//! GStreamer capture pipeline delivering RGBA frames

use super::types::*;
use crate::constants::{pipeline, timing};
use gstreamer::prelude::*;
use gstreamer_app::AppSink;
use gstreamer_video::VideoInfo;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Camera source, decode and convert to RGBA, into an appsink
///
/// Frames go to the `FrameSender` with `try_send`; when the consumer falls
/// behind, frames are dropped rather than queued.
pub struct CapturePipeline {
    pipeline: gstreamer::Pipeline,
    appsink: AppSink,
}

impl CapturePipeline {
    /// Build the pipeline for `device` and set it playing
    pub fn new(device: &CameraDevice, frame_sender: FrameSender) -> BackendResult<Self> {
        info!(device = %device.name, path = %device.path, backend = %device.backend, "Creating capture pipeline");

        gstreamer::init().map_err(|e| BackendError::InitializationFailed(e.to_string()))?;

        let description = pipeline_description(device);
        debug!(pipeline = %description, "Launching pipeline");

        let pipeline = gstreamer::parse::launch(&description)
            .map_err(|e| BackendError::InitializationFailed(e.to_string()))?
            .dynamic_cast::<gstreamer::Pipeline>()
            .map_err(|_| BackendError::InitializationFailed("Not a pipeline".to_string()))?;

        let appsink = pipeline
            .by_name("sink")
            .ok_or_else(|| BackendError::InitializationFailed("Failed to get appsink".to_string()))?
            .dynamic_cast::<AppSink>()
            .map_err(|_| {
                BackendError::InitializationFailed("Failed to cast appsink".to_string())
            })?;

        appsink.set_property("emit-signals", true);
        appsink.set_property("sync", false);
        appsink.set_property("max-buffers", pipeline::MAX_BUFFERS);
        appsink.set_property("drop", true);
        appsink.set_property("enable-last-sample", false);

        let frame_counter = Arc::new(AtomicU64::new(0));
        appsink.set_callbacks(
            gstreamer_app::AppSinkCallbacks::builder()
                .new_sample(move |appsink| {
                    let frame_num = frame_counter.fetch_add(1, Ordering::Relaxed);
                    let captured_at = Instant::now();

                    let sample = appsink.pull_sample().map_err(|e| {
                        if frame_num % timing::FRAME_LOG_INTERVAL == 0 {
                            error!(frame = frame_num, error = ?e, "Failed to pull sample");
                        }
                        gstreamer::FlowError::Eos
                    })?;

                    let buffer = sample.buffer().ok_or(gstreamer::FlowError::Error)?;
                    if buffer.flags().contains(gstreamer::BufferFlags::CORRUPTED) {
                        if frame_num % timing::FRAME_LOG_INTERVAL == 0 {
                            warn!(frame = frame_num, "Buffer marked as corrupted, skipping frame");
                        }
                        return Ok(gstreamer::FlowSuccess::Ok);
                    }

                    let caps = sample.caps().ok_or(gstreamer::FlowError::Error)?;
                    let video_info = VideoInfo::from_caps(caps).map_err(|e| {
                        error!(frame = frame_num, error = ?e, "Failed to get video info");
                        gstreamer::FlowError::Error
                    })?;
                    let format = PixelFormat::from_gst_format(&video_info.format().to_string())
                        .ok_or(gstreamer::FlowError::NotNegotiated)?;

                    let map = buffer.map_readable().map_err(|e| {
                        error!(frame = frame_num, error = ?e, "Failed to map buffer");
                        gstreamer::FlowError::Error
                    })?;

                    let frame = CameraFrame {
                        width: video_info.width(),
                        height: video_info.height(),
                        data: Arc::from(map.as_slice()),
                        format,
                        stride: video_info.stride()[0] as u32,
                        captured_at,
                    };

                    let mut sender = frame_sender.clone();
                    match sender.try_send(frame) {
                        Ok(()) => {
                            if frame_num % timing::FRAME_LOG_INTERVAL == 0 {
                                debug!(
                                    frame = frame_num,
                                    width = video_info.width(),
                                    height = video_info.height(),
                                    elapsed_us = captured_at.elapsed().as_micros(),
                                    "Frame delivered"
                                );
                            }
                        }
                        Err(e) if e.is_disconnected() => {
                            debug!("Frame receiver closed, ending stream");
                            return Err(gstreamer::FlowError::Eos);
                        }
                        Err(_) => {
                            if frame_num % timing::FRAME_LOG_INTERVAL == 0 {
                                debug!(frame = frame_num, "Frame dropped (channel full)");
                            }
                        }
                    }

                    Ok(gstreamer::FlowSuccess::Ok)
                })
                .build(),
        );

        let pipeline = Self { pipeline, appsink };

        // On failure `pipeline` drops here, which releases the device
        pipeline.pipeline.set_state(gstreamer::State::Playing).map_err(|e| {
            BackendError::DeviceNotFound(format!("Failed to start pipeline: {}", e))
        })?;

        let (result, state, pending) = pipeline.pipeline.state(gstreamer::ClockTime::from_seconds(
            timing::START_TIMEOUT_SECS,
        ));
        debug!(result = ?result, state = ?state, pending = ?pending, "Pipeline state");
        if let Err(e) = result {
            return Err(BackendError::DeviceNotFound(format!(
                "Pipeline failed to reach PLAYING: {:?}",
                e
            )));
        }
        if state != gstreamer::State::Playing {
            warn!(state = ?state, "Pipeline is not in PLAYING state yet");
        }

        info!("Capture pipeline running");
        Ok(pipeline)
    }

    /// Stop streaming and release the device
    pub fn stop(self) {
        info!("Stopping capture pipeline");
        self.release();
        let (result, state, _) = self.pipeline.state(gstreamer::ClockTime::from_seconds(
            timing::STOP_TIMEOUT_SECS,
        ));
        match result {
            Ok(_) => info!(state = ?state, "Capture pipeline stopped"),
            Err(e) => debug!(error = ?e, state = ?state, "Pipeline state change had issues"),
        }
    }

    fn release(&self) {
        // Dropping the callbacks drops the frame sender, which ends the worker
        self.appsink
            .set_callbacks(gstreamer_app::AppSinkCallbacks::builder().build());
        if let Err(e) = self.pipeline.set_state(gstreamer::State::Null) {
            warn!(error = %e, "Failed to set pipeline to NULL");
        }
    }
}

impl Drop for CapturePipeline {
    fn drop(&mut self) {
        self.release();
    }
}

/// `gst-launch` description for `device`
pub fn pipeline_description(device: &CameraDevice) -> String {
    let source = match device.backend {
        CameraBackendType::PipeWire => {
            let mut source = String::from("pipewiresrc do-timestamp=true");
            if let Some(target) = pipewire_target(&device.path) {
                source.push_str(&format!(" target-object={}", target));
            }
            source
        }
        CameraBackendType::V4l2 => format!("v4l2src device={}", device.path),
    };

    format!(
        "{source} ! queue max-size-buffers={buffers} leaky=downstream ! decodebin ! videoconvert ! video/x-raw,format={format} ! appsink name=sink",
        buffers = pipeline::MAX_BUFFERS,
        format = pipeline::OUTPUT_FORMAT,
    )
}

/// `target-object` value for a PipeWire device path; None auto-selects
fn pipewire_target(path: &str) -> Option<&str> {
    if path.is_empty() {
        return None;
    }
    path.strip_prefix("pipewire-serial-")
        .or_else(|| path.strip_prefix("pipewire-"))
        .or(Some(path))
}
