// SPDX-License-Identifier: GPL-3.0-only

//! Barcode decoding over grayscale images
//!
//! QR codes go through rqrr; every other symbology (and QR codes rqrr
//! missed) goes through rxing's multi-barcode reader. Results outside the
//! decoder's allowed set are dropped, duplicates are merged and QR results
//! come first.

use super::luma::LumaImage;
use super::symbology::SymbolType;
use rxing::DecodeHints;
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, trace};

/// One decoded code: a metadata object (camera) or an observation (still image)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedSymbol {
    pub symbol: SymbolType,
    /// Decoded string value; empty strings are stored as None
    pub payload: Option<String>,
}

impl DecodedSymbol {
    pub fn new(symbol: SymbolType, payload: impl Into<String>) -> Self {
        let payload = payload.into();
        Self {
            symbol,
            payload: if payload.is_empty() {
                None
            } else {
                Some(payload)
            },
        }
    }

    /// A symbol that was located but carried no string value
    pub fn without_payload(symbol: SymbolType) -> Self {
        Self {
            symbol,
            payload: None,
        }
    }
}

/// Errors from the detection engine itself (not "nothing found")
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Image has no pixels
    EmptyImage,
    /// Pixel buffer does not match the declared dimensions
    BufferMismatch { expected: usize, actual: usize },
    /// Image could not be loaded or converted
    InvalidImage(String),
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::EmptyImage => write!(f, "The image is empty"),
            DecodeError::BufferMismatch { expected, actual } => write!(
                f,
                "Image buffer has {} bytes, expected {}",
                actual, expected
            ),
            DecodeError::InvalidImage(msg) => write!(f, "Invalid image: {}", msg),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Decoder restricted to a set of symbologies
#[derive(Debug, Clone)]
pub struct BarcodeDecoder {
    symbols: Vec<SymbolType>,
}

impl BarcodeDecoder {
    pub fn new(symbols: &[SymbolType]) -> Self {
        Self {
            symbols: symbols.to_vec(),
        }
    }

    /// Decoder for the full still-image vocabulary
    pub fn all() -> Self {
        Self::new(&SymbolType::ALL)
    }

    pub fn allows(&self, symbol: SymbolType) -> bool {
        self.symbols.contains(&symbol)
    }

    /// Decode every allowed symbol found in the image
    pub fn decode(&self, image: &LumaImage) -> Result<Vec<DecodedSymbol>, DecodeError> {
        if image.width == 0 || image.height == 0 {
            return Err(DecodeError::EmptyImage);
        }
        let expected = (image.width as usize) * (image.height as usize);
        if image.data.len() != expected {
            return Err(DecodeError::BufferMismatch {
                expected,
                actual: image.data.len(),
            });
        }

        let start = Instant::now();
        let qr = if self.allows(SymbolType::Qr) {
            decode_qr(image)
        } else {
            Vec::new()
        };
        let found = self.merge(qr, decode_rxing(image, &self.symbols));

        trace!(
            width = image.width,
            height = image.height,
            count = found.len(),
            elapsed_ms = start.elapsed().as_millis(),
            "Barcode decode pass complete"
        );

        Ok(found)
    }

    /// Combine both readers' results: allowed symbols only, no duplicates,
    /// QR first and everything else in reader order
    fn merge(&self, qr: Vec<DecodedSymbol>, others: Vec<DecodedSymbol>) -> Vec<DecodedSymbol> {
        let mut found = qr;
        for symbol in others.into_iter().filter_map(|s| self.admit(s)) {
            if !found.contains(&symbol) {
                found.push(symbol);
            }
        }
        found.sort_by_key(|s| s.symbol != SymbolType::Qr);
        found
    }

    /// UPC-A is EAN-13 with a leading zero; report it as such when only
    /// EAN-13 is allowed
    fn admit(&self, symbol: DecodedSymbol) -> Option<DecodedSymbol> {
        if self.allows(symbol.symbol) {
            return Some(symbol);
        }
        if symbol.symbol == SymbolType::UpcA && self.allows(SymbolType::Ean13) {
            let payload = symbol.payload.map(|digits| format!("0{}", digits));
            return Some(DecodedSymbol {
                symbol: SymbolType::Ean13,
                payload,
            });
        }
        None
    }
}

fn decode_qr(image: &LumaImage) -> Vec<DecodedSymbol> {
    let width = image.width as usize;
    let height = image.height as usize;
    let mut prepared =
        rqrr::PreparedImage::prepare_from_greyscale(width, height, |x, y| image.data[y * width + x]);

    let mut symbols = Vec::new();
    for grid in prepared.detect_grids() {
        match grid.decode() {
            Ok((_meta, content)) => {
                debug!(content = %content, "Decoded QR code");
                symbols.push(DecodedSymbol::new(SymbolType::Qr, content));
            }
            Err(e) => {
                debug!(error = ?e, "Failed to decode QR grid");
            }
        }
    }
    symbols
}

fn decode_rxing(image: &LumaImage, symbols: &[SymbolType]) -> Vec<DecodedSymbol> {
    if symbols.is_empty() {
        return Vec::new();
    }
    // Without a format list rxing splits leading-zero EAN-13 off as UPC-A
    let mut hints = DecodeHints {
        PossibleFormats: Some(symbols.iter().map(|s| s.to_rxing()).collect::<HashSet<_>>()),
        ..DecodeHints::default()
    };

    match rxing::helpers::detect_multiple_in_luma_with_hints(
        image.data.clone(),
        image.width,
        image.height,
        &mut hints,
    ) {
        Ok(results) => results
            .iter()
            .filter_map(|result| {
                let symbol = SymbolType::from_rxing(result.getBarcodeFormat())?;
                debug!(symbol = %symbol, content = %result.getText(), "Decoded barcode");
                Some(DecodedSymbol::new(symbol, result.getText()))
            })
            .collect(),
        Err(e) => {
            // rxing reports "nothing here" as an error
            trace!(error = ?e, "rxing found no barcodes");
            Vec::new()
        }
    }
}
