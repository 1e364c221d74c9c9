// SPDX-License-Identifier: GPL-3.0-only

//! Barcode decoding
//!
//! Frames and picked images are reduced to grayscale (`LumaImage`), decoded by
//! `BarcodeDecoder`, and reported as `DecodedSymbol`s. The camera path calls
//! them metadata objects, the still-image path observations.

pub mod decoder;
pub mod luma;
pub mod symbology;
pub mod vision;

pub use decoder::{BarcodeDecoder, DecodeError, DecodedSymbol};
pub use luma::LumaImage;
pub use symbology::{CAPTURE_SYMBOLS, SymbolType};
pub use vision::DecoderVision;

/// A symbol decoded from a live capture frame
pub type MetadataObject = DecodedSymbol;

/// A symbol found in a still image
pub type Observation = DecodedSymbol;
