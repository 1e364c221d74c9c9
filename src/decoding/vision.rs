// SPDX-License-Identifier: GPL-3.0-only

//! Still-image detection on the blocking thread pool

use super::decoder::BarcodeDecoder;
use super::luma::LumaImage;
use crate::scanner::{BarcodeVision, PickedImage, VisionReply};
use tokio::runtime::Handle;
use tracing::debug;

/// `BarcodeVision` backed by `BarcodeDecoder`
///
/// Decoding is CPU-bound, so each request runs via `spawn_blocking`.
pub struct DecoderVision {
    runtime: Handle,
    decoder: BarcodeDecoder,
    max_dimension: u32,
}

impl DecoderVision {
    pub fn new(runtime: Handle, max_dimension: u32) -> Self {
        Self {
            runtime,
            decoder: BarcodeDecoder::all(),
            max_dimension,
        }
    }
}

impl BarcodeVision for DecoderVision {
    fn detect_barcodes(&self, image: PickedImage, reply: VisionReply) {
        let decoder = self.decoder.clone();
        let max_dimension = self.max_dimension;
        self.runtime.spawn_blocking(move || {
            let luma = LumaImage::from_rgba(&image.pixels, max_dimension);
            debug!(width = luma.width, height = luma.height, "Decoding picked image");
            reply(decoder.decode(&luma));
        });
    }
}
