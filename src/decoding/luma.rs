// SPDX-License-Identifier: GPL-3.0-only

//! Grayscale conversion for barcode decoding
//!
//! Both decoders work on 8-bit luma. Camera frames arrive with row padding
//! and at full sensor resolution, so conversion strips the stride and, when
//! the frame is larger than the configured maximum, downscales it with
//! bilinear sampling.

use crate::backends::camera::types::{CameraFrame, PixelFormat};

/// Tightly packed 8-bit grayscale image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LumaImage {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl LumaImage {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data,
        }
    }

    /// Convert a camera frame, downscaling so neither side exceeds `max_dimension`
    pub fn from_frame(frame: &CameraFrame, max_dimension: u32) -> Self {
        let sampler = FrameSampler { frame };
        Self::sample(frame.width, frame.height, max_dimension, |x, y| sampler.luma(x, y))
    }

    /// Convert an RGBA image, downscaling so neither side exceeds `max_dimension`
    pub fn from_rgba(image: &image::RgbaImage, max_dimension: u32) -> Self {
        let (width, height) = image.dimensions();
        Self::sample(width, height, max_dimension, |x, y| {
            let p = image.get_pixel(x, y).0;
            rgb_to_luma(p[0], p[1], p[2])
        })
    }

    fn sample(width: u32, height: u32, max_dimension: u32, luma: impl Fn(u32, u32) -> u8) -> Self {
        if width == 0 || height == 0 {
            return Self::new(width, height, Vec::new());
        }

        let (dst_width, dst_height) = scaled_dimensions(width, height, max_dimension);

        if dst_width == width && dst_height == height {
            let mut data = Vec::with_capacity((width * height) as usize);
            for y in 0..height {
                for x in 0..width {
                    data.push(luma(x, y));
                }
            }
            return Self::new(width, height, data);
        }

        let x_ratio = width as f32 / dst_width as f32;
        let y_ratio = height as f32 / dst_height as f32;
        let mut data = Vec::with_capacity((dst_width * dst_height) as usize);

        for y in 0..dst_height {
            for x in 0..dst_width {
                let src_x = x as f32 * x_ratio;
                let src_y = y as f32 * y_ratio;

                let x0 = src_x as u32;
                let y0 = src_y as u32;
                let x1 = (x0 + 1).min(width - 1);
                let y1 = (y0 + 1).min(height - 1);

                let x_frac = src_x - x0 as f32;
                let y_frac = src_y - y0 as f32;

                let p00 = luma(x0, y0) as f32;
                let p01 = luma(x1, y0) as f32;
                let p10 = luma(x0, y1) as f32;
                let p11 = luma(x1, y1) as f32;

                let value = p00 * (1.0 - x_frac) * (1.0 - y_frac)
                    + p01 * x_frac * (1.0 - y_frac)
                    + p10 * (1.0 - x_frac) * y_frac
                    + p11 * x_frac * y_frac;

                data.push(value.round().clamp(0.0, 255.0) as u8);
            }
        }

        Self::new(dst_width, dst_height, data)
    }
}

/// Dimensions after fitting the longest side into `max_dimension`
pub fn scaled_dimensions(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    if max_dimension == 0 || (width <= max_dimension && height <= max_dimension) {
        return (width, height);
    }
    let scale = (width as f32 / max_dimension as f32).max(height as f32 / max_dimension as f32);
    let new_width = ((width as f32 / scale) as u32).max(1);
    let new_height = ((height as f32 / scale) as u32).max(1);
    (new_width, new_height)
}

/// BT.601 luma, integer approximation
pub fn rgb_to_luma(r: u8, g: u8, b: u8) -> u8 {
    ((77 * r as u32 + 150 * g as u32 + 29 * b as u32) >> 8) as u8
}

struct FrameSampler<'a> {
    frame: &'a CameraFrame,
}

impl FrameSampler<'_> {
    fn luma(&self, x: u32, y: u32) -> u8 {
        let frame = self.frame;
        let data = frame.data_slice();
        let bpp = frame.format.bytes_per_pixel() as usize;
        let idx = (y as usize) * (frame.stride as usize) + (x as usize) * bpp;

        match frame.format {
            PixelFormat::Gray8 => data.get(idx).copied().unwrap_or(0),
            PixelFormat::RGBA | PixelFormat::RGB24 => {
                if idx + 2 < data.len() {
                    rgb_to_luma(data[idx], data[idx + 1], data[idx + 2])
                } else {
                    0
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Instant;

    #[test]
    fn test_stride_padding_is_dropped() {
        // 2x2 RGBA with two bytes of padding per row
        let data: Vec<u8> = vec![
            255, 255, 255, 255, // white
            0, 0, 0, 255, // black
            9, 9, // stride padding
            0, 0, 0, 255, // black
            255, 255, 255, 255, // white
            9, 9, // stride padding
        ];
        let frame = CameraFrame {
            width: 2,
            height: 2,
            data: Arc::from(data.as_slice()),
            format: PixelFormat::RGBA,
            stride: 10,
            captured_at: Instant::now(),
        };

        let luma = LumaImage::from_frame(&frame, 640);
        assert_eq!((luma.width, luma.height), (2, 2));
        assert_eq!(luma.data, vec![255, 0, 0, 255]);
    }

    #[test]
    fn test_large_frames_are_downscaled() {
        // 4x2 gradient, fitted into 2 pixels wide
        let data: Vec<u8> = vec![0, 85, 170, 255, 0, 85, 170, 255];
        let frame = CameraFrame {
            width: 4,
            height: 2,
            data: Arc::from(data.as_slice()),
            format: PixelFormat::Gray8,
            stride: 4,
            captured_at: Instant::now(),
        };

        let luma = LumaImage::from_frame(&frame, 2);
        assert_eq!((luma.width, luma.height), (2, 1));
        assert!(luma.data[0] < 100);
        assert!(luma.data[1] > 150);
    }

    #[test]
    fn test_scaled_dimensions_keep_aspect() {
        assert_eq!(scaled_dimensions(1920, 1080, 640), (640, 360));
        assert_eq!(scaled_dimensions(320, 240, 640), (320, 240));
        assert_eq!(scaled_dimensions(100, 10_000, 640), (6, 640));
    }
}
