// SPDX-License-Identifier: GPL-3.0-only

//! Barcode symbol vocabulary

use rxing::BarcodeFormat;

/// Machine-readable code formats the decoders can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolType {
    Qr,
    Ean13,
    Ean8,
    Code128,
    Pdf417,
    Code39,
    UpcA,
    UpcE,
    Code93,
    Codabar,
    Itf,
    DataMatrix,
    Aztec,
}

/// Symbols the live capture path is restricted to
pub const CAPTURE_SYMBOLS: [SymbolType; 6] = [
    SymbolType::Qr,
    SymbolType::Ean13,
    SymbolType::Ean8,
    SymbolType::Code128,
    SymbolType::Pdf417,
    SymbolType::Code39,
];

impl SymbolType {
    /// Everything the still-image path looks for
    pub const ALL: [SymbolType; 13] = [
        SymbolType::Qr,
        SymbolType::Ean13,
        SymbolType::Ean8,
        SymbolType::Code128,
        SymbolType::Pdf417,
        SymbolType::Code39,
        SymbolType::UpcA,
        SymbolType::UpcE,
        SymbolType::Code93,
        SymbolType::Codabar,
        SymbolType::Itf,
        SymbolType::DataMatrix,
        SymbolType::Aztec,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Qr => "QR",
            Self::Ean13 => "EAN-13",
            Self::Ean8 => "EAN-8",
            Self::Code128 => "Code 128",
            Self::Pdf417 => "PDF417",
            Self::Code39 => "Code 39",
            Self::UpcA => "UPC-A",
            Self::UpcE => "UPC-E",
            Self::Code93 => "Code 93",
            Self::Codabar => "Codabar",
            Self::Itf => "ITF",
            Self::DataMatrix => "Data Matrix",
            Self::Aztec => "Aztec",
        }
    }

    pub fn to_rxing(self) -> BarcodeFormat {
        match self {
            Self::Qr => BarcodeFormat::QR_CODE,
            Self::Ean13 => BarcodeFormat::EAN_13,
            Self::Ean8 => BarcodeFormat::EAN_8,
            Self::Code128 => BarcodeFormat::CODE_128,
            Self::Pdf417 => BarcodeFormat::PDF_417,
            Self::Code39 => BarcodeFormat::CODE_39,
            Self::UpcA => BarcodeFormat::UPC_A,
            Self::UpcE => BarcodeFormat::UPC_E,
            Self::Code93 => BarcodeFormat::CODE_93,
            Self::Codabar => BarcodeFormat::CODABAR,
            Self::Itf => BarcodeFormat::ITF,
            Self::DataMatrix => BarcodeFormat::DATA_MATRIX,
            Self::Aztec => BarcodeFormat::AZTEC,
        }
    }

    /// Map an rxing format; formats outside the vocabulary yield None
    pub fn from_rxing(format: &BarcodeFormat) -> Option<Self> {
        match format {
            BarcodeFormat::QR_CODE => Some(Self::Qr),
            BarcodeFormat::EAN_13 => Some(Self::Ean13),
            BarcodeFormat::EAN_8 => Some(Self::Ean8),
            BarcodeFormat::CODE_128 => Some(Self::Code128),
            BarcodeFormat::PDF_417 => Some(Self::Pdf417),
            BarcodeFormat::CODE_39 => Some(Self::Code39),
            BarcodeFormat::UPC_A => Some(Self::UpcA),
            BarcodeFormat::UPC_E => Some(Self::UpcE),
            BarcodeFormat::CODE_93 => Some(Self::Code93),
            BarcodeFormat::CODABAR => Some(Self::Codabar),
            BarcodeFormat::ITF => Some(Self::Itf),
            BarcodeFormat::DATA_MATRIX => Some(Self::DataMatrix),
            BarcodeFormat::AZTEC => Some(Self::Aztec),
            _ => None,
        }
    }
}

impl std::fmt::Display for SymbolType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_symbols_are_a_subset_of_all() {
        for symbol in CAPTURE_SYMBOLS {
            assert!(SymbolType::ALL.contains(&symbol), "{} missing", symbol);
        }
        assert!(SymbolType::ALL.len() > CAPTURE_SYMBOLS.len());
    }

    #[test]
    fn test_rxing_mapping() {
        assert_eq!(
            SymbolType::from_rxing(&BarcodeFormat::EAN_13),
            Some(SymbolType::Ean13)
        );
        assert_eq!(SymbolType::from_rxing(&BarcodeFormat::MAXICODE), None);
        for symbol in SymbolType::ALL {
            assert_eq!(SymbolType::from_rxing(&symbol.to_rxing()), Some(symbol));
        }
    }
}
