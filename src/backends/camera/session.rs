// SPDX-License-Identifier: GPL-3.0-only

//! GStreamer-backed capture sessions
//!
//! A running session is one `CapturePipeline` plus one detection worker
//! thread. The pipeline pushes frames into a small bounded channel; the
//! worker converts each frame to luma, hands it to the preview sink, decodes
//! it and reports any symbols through the metadata sink.

use super::enumeration::{enumerate_cameras, is_backend_available};
use super::pipeline::CapturePipeline;
use super::types::*;
use crate::config::Config;
use crate::constants::detection;
use crate::decoding::{BarcodeDecoder, LumaImage};
use crate::scanner::{
    CaptureBackend, CaptureSession, MetadataOutput, SessionEvent, SessionSink, VideoInput,
};
use futures::StreamExt;
use futures::channel::mpsc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use tracing::{debug, info, trace, warn};

/// Opens the configured camera and builds GStreamer sessions
pub struct GstCaptureBackend {
    backend: CameraBackendType,
    camera_index: usize,
    max_dimension: u32,
}

impl GstCaptureBackend {
    pub fn new(config: &Config) -> Self {
        Self {
            backend: config.backend,
            camera_index: config.camera_index,
            max_dimension: config.max_dimension,
        }
    }
}

impl CaptureBackend for GstCaptureBackend {
    fn open_default_input(&mut self) -> BackendResult<VideoInput> {
        gstreamer::init().map_err(|e| BackendError::InitializationFailed(e.to_string()))?;
        if !is_backend_available(self.backend) {
            return Err(BackendError::NotAvailable(format!(
                "GStreamer element {} is not installed",
                self.backend.source_element()
            )));
        }

        let mut cameras = enumerate_cameras(self.backend);
        if cameras.is_empty() {
            return Err(BackendError::DeviceNotFound(format!(
                "No {} cameras found",
                self.backend
            )));
        }

        let index = if self.camera_index < cameras.len() {
            self.camera_index
        } else {
            warn!(
                requested = self.camera_index,
                available = cameras.len(),
                "Configured camera index out of range, using first camera"
            );
            0
        };
        let device = cameras.swap_remove(index);
        info!(name = %device.name, path = %device.path, "Selected camera");
        Ok(VideoInput { device })
    }

    fn create_session(&mut self) -> Box<dyn CaptureSession> {
        Box::new(GstCaptureSession::new(self.max_dimension))
    }
}

/// One capture session: configured input and outputs, then a running pipeline
pub struct GstCaptureSession {
    max_dimension: u32,
    input: Option<VideoInput>,
    output: Option<MetadataOutput>,
    preview: Option<SessionSink>,
    pipeline: Option<CapturePipeline>,
    worker: Option<JoinHandle<()>>,
    /// Tells the worker to quit without decoding frames still queued
    stop: Arc<AtomicBool>,
}

impl GstCaptureSession {
    pub fn new(max_dimension: u32) -> Self {
        Self {
            max_dimension,
            input: None,
            output: None,
            preview: None,
            pipeline: None,
            worker: None,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    fn join_worker(&mut self) {
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            warn!("Detection worker panicked");
        }
    }
}

impl CaptureSession for GstCaptureSession {
    fn add_input(&mut self, input: VideoInput) -> BackendResult<()> {
        if self.input.is_some() {
            return Err(BackendError::InvalidState(
                "Session already has an input".to_string(),
            ));
        }
        if input.device.backend == CameraBackendType::V4l2
            && !std::path::Path::new(&input.device.path).exists()
        {
            return Err(BackendError::DeviceNotFound(input.device.path));
        }
        self.input = Some(input);
        Ok(())
    }

    fn add_metadata_output(&mut self, output: MetadataOutput) -> BackendResult<()> {
        if self.input.is_none() {
            return Err(BackendError::InvalidState(
                "Metadata output needs an input".to_string(),
            ));
        }
        if self.output.is_some() {
            return Err(BackendError::InvalidState(
                "Session already has a metadata output".to_string(),
            ));
        }
        if output.symbols.is_empty() {
            return Err(BackendError::FormatNotSupported(
                "No symbol types requested".to_string(),
            ));
        }
        debug!(symbols = ?output.symbols, "Metadata output added");
        self.output = Some(output);
        Ok(())
    }

    fn attach_preview(&mut self, preview: SessionSink) {
        self.preview = Some(preview);
    }

    fn start_running(&mut self) -> BackendResult<()> {
        if self.pipeline.is_some() {
            return Ok(());
        }
        let device = self
            .input
            .as_ref()
            .map(|input| input.device.clone())
            .ok_or_else(|| BackendError::InvalidState("Session has no input".to_string()))?;

        let (sender, receiver) = mpsc::channel(detection::WORKER_QUEUE_DEPTH);
        self.stop = Arc::new(AtomicBool::new(false));
        let worker = spawn_detection_worker(
            receiver,
            self.output.clone(),
            self.preview.clone(),
            self.max_dimension,
            self.stop.clone(),
        )?;
        self.worker = Some(worker);

        match CapturePipeline::new(&device, sender) {
            Ok(pipeline) => {
                self.pipeline = Some(pipeline);
                Ok(())
            }
            Err(e) => {
                // The sender is gone with the failed pipeline; the worker exits
                self.join_worker();
                Err(e)
            }
        }
    }

    fn stop_running(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(pipeline) = self.pipeline.take() {
            pipeline.stop();
        }
        self.join_worker();
    }

    fn is_running(&self) -> bool {
        self.pipeline.is_some()
    }
}

impl Drop for GstCaptureSession {
    fn drop(&mut self) {
        self.stop_running();
    }
}

fn spawn_detection_worker(
    mut frames: FrameReceiver,
    output: Option<MetadataOutput>,
    preview: Option<SessionSink>,
    max_dimension: u32,
    stop: Arc<AtomicBool>,
) -> BackendResult<JoinHandle<()>> {
    let decoder = output
        .as_ref()
        .map(|output| BarcodeDecoder::new(&output.symbols));

    std::thread::Builder::new()
        .name("barcode-detect".to_string())
        .spawn(move || {
            debug!("Detection worker started");
            let mut frame_count: u64 = 0;
            while let Some(frame) = pollster::block_on(frames.next()) {
                if stop.load(Ordering::SeqCst) {
                    debug!("Detection worker stopping, dropping queued frames");
                    break;
                }
                frame_count += 1;
                if !frame.is_complete() {
                    trace!(frame = frame_count, "Skipping incomplete frame");
                    continue;
                }

                let luma = output
                    .as_ref()
                    .map(|_| LumaImage::from_frame(&frame, max_dimension));

                if let Some(preview) = &preview {
                    preview(SessionEvent::Preview(frame));
                }

                let (Some(output), Some(decoder), Some(luma)) = (&output, &decoder, luma) else {
                    continue;
                };
                match decoder.decode(&luma) {
                    Ok(objects) if !objects.is_empty() => {
                        (output.sink)(SessionEvent::Metadata(objects));
                    }
                    Ok(_) => {}
                    Err(e) => debug!(error = %e, "Frame decode failed"),
                }
            }
            debug!(frames = frame_count, "Detection worker finished");
        })
        .map_err(BackendError::from)
}
