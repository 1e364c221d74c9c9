// SPDX-License-Identifier: GPL-3.0-only

//! Acquisition source selection and the picked-image type

use crate::backends::camera::types::CameraFrame;
use crate::constants::labels;
use crate::errors::AppResult;
use std::path::{Path, PathBuf};

/// One entry of the source selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceChoice {
    Gallery,
    Camera,
    Cancel,
}

impl SourceChoice {
    /// Choices in display order
    pub const ALL: [SourceChoice; 3] = [
        SourceChoice::Gallery,
        SourceChoice::Camera,
        SourceChoice::Cancel,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SourceChoice::Gallery => labels::GALLERY,
            SourceChoice::Camera => labels::CAMERA,
            SourceChoice::Cancel => labels::CANCEL,
        }
    }

    /// Key hint shown next to the label
    pub fn key_hint(&self) -> &'static str {
        match self {
            SourceChoice::Gallery => "g",
            SourceChoice::Camera => "c",
            SourceChoice::Cancel => "Esc",
        }
    }
}

/// Highlight state of the source selector popup
#[derive(Debug, Clone, Default)]
pub struct SourceSelector {
    highlighted: usize,
}

impl SourceSelector {
    pub fn title(&self) -> &'static str {
        labels::SOURCE_TITLE
    }

    pub fn message(&self) -> &'static str {
        labels::SOURCE_MESSAGE
    }

    pub fn choices(&self) -> &'static [SourceChoice] {
        &SourceChoice::ALL
    }

    pub fn highlighted(&self) -> SourceChoice {
        SourceChoice::ALL[self.highlighted]
    }

    pub fn highlight_next(&mut self) {
        self.highlighted = (self.highlighted + 1) % SourceChoice::ALL.len();
    }

    pub fn highlight_previous(&mut self) {
        self.highlighted = self
            .highlighted
            .checked_sub(1)
            .unwrap_or(SourceChoice::ALL.len() - 1);
    }

    pub fn reset(&mut self) {
        self.highlighted = 0;
    }
}

/// An image picked from the gallery, owned until detection completes
#[derive(Debug, Clone)]
pub struct PickedImage {
    pub source: Option<PathBuf>,
    pub pixels: image::RgbaImage,
}

impl PickedImage {
    pub fn from_rgba(pixels: image::RgbaImage) -> Self {
        Self {
            source: None,
            pixels,
        }
    }

    /// Load and decode an image file
    pub fn open(path: &Path) -> AppResult<Self> {
        let pixels = image::open(path)?.to_rgba8();
        Ok(Self {
            source: Some(path.to_path_buf()),
            pixels,
        })
    }

    /// Copy for the still-image preview pane
    pub fn preview_frame(&self) -> CameraFrame {
        CameraFrame::from_rgba_image(&self.pixels)
    }
}

/// Result of one picker presentation
#[derive(Debug)]
pub enum PickOutcome {
    Picked(PickedImage),
    /// Dismissed without a selection: no result and no error
    Cancelled,
    /// A file was chosen but could not be loaded
    Failed(String),
}

/// Continuation for a pick; invoked exactly once
pub type PickReply = Box<dyn FnOnce(PickOutcome) + Send>;

/// Gallery image picker
pub trait ImagePicker: Send + Sync {
    fn pick_image(&self, reply: PickReply);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_order_and_wraparound() {
        let mut selector = SourceSelector::default();
        assert_eq!(selector.highlighted(), SourceChoice::Gallery);

        selector.highlight_next();
        assert_eq!(selector.highlighted(), SourceChoice::Camera);
        selector.highlight_next();
        selector.highlight_next();
        assert_eq!(selector.highlighted(), SourceChoice::Gallery);

        selector.highlight_previous();
        assert_eq!(selector.highlighted(), SourceChoice::Cancel);
        selector.reset();
        assert_eq!(selector.highlighted(), SourceChoice::Gallery);
    }

    #[test]
    fn test_preview_frame_matches_image() {
        let image = PickedImage::from_rgba(image::RgbaImage::new(3, 2));
        let frame = image.preview_frame();
        assert_eq!((frame.width, frame.height, frame.stride), (3, 2, 12));
        assert!(frame.is_complete());
    }
}
