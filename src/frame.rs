//! Video frames as they move between the source, the detector and the display.
//!
//! - `VideoFrame`: owned RGB24 pixels with dimensions and a capture sequence number.
//! - `BoundingBox`: normalized (0..1) box used for overlays.
//!
//! Frames are validated on construction so later stages can index pixels
//! without re-checking lengths.

use anyhow::{anyhow, Context, Result};
use image::imageops::{self, FilterType};
use image::RgbImage;

/// Width every frame is scaled to before detection.
pub const PROCESSING_WIDTH: u32 = 640;

/// Outline thickness for detection overlays, in pixels.
const BOX_THICKNESS: u32 = 2;

/// Height matching `width` at a 16:9 aspect ratio.
pub fn processing_height(width: u32) -> u32 {
    (u64::from(width) * 9 / 16) as u32
}

/// Owned RGB24 frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VideoFrame {
    data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Monotonic index assigned by the source.
    pub sequence: u64,
}

impl VideoFrame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, sequence: u64) -> Result<Self> {
        let expected = rgb_len(width, height)?;
        if data.len() != expected {
            return Err(anyhow!(
                "RGB frame length mismatch: expected {}, got {}",
                expected,
                data.len()
            ));
        }
        Ok(Self {
            data,
            width,
            height,
            sequence,
        })
    }

    /// Solid-colour frame, mostly useful for synthetic sources and tests.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3], sequence: u64) -> Result<Self> {
        let len = rgb_len(width, height)?;
        let data = rgb.iter().copied().cycle().take(len).collect();
        Self::new(data, width, height, sequence)
    }

    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 3;
        Some([self.data[idx], self.data[idx + 1], self.data[idx + 2]])
    }

    /// Scaled copy of this frame. Returns a plain clone when the size already matches.
    pub fn resized(&self, width: u32, height: u32) -> Result<VideoFrame> {
        if width == 0 || height == 0 {
            return Err(anyhow!("cannot resize frame to {}x{}", width, height));
        }
        if width == self.width && height == self.height {
            return Ok(self.clone());
        }
        let src = RgbImage::from_raw(self.width, self.height, self.data.clone())
            .context("frame buffer does not match its dimensions")?;
        let scaled = imageops::resize(&src, width, height, FilterType::Triangle);
        VideoFrame::new(scaled.into_raw(), width, height, self.sequence)
    }

    /// Draw the outline of a normalized box.
    pub fn draw_box(&mut self, bbox: &BoundingBox, rgb: [u8; 3]) {
        if self.width == 0 || self.height == 0 {
            return;
        }
        let (x0, y0, x1, y1) = bbox.to_pixels(self.width, self.height);
        for t in 0..BOX_THICKNESS {
            for x in x0..=x1 {
                self.put(x, y0.saturating_add(t), rgb);
                self.put(x, y1.saturating_sub(t), rgb);
            }
            for y in y0..=y1 {
                self.put(x0.saturating_add(t), y, rgb);
                self.put(x1.saturating_sub(t), y, rgb);
            }
        }
    }

    fn put(&mut self, x: u32, y: u32, rgb: [u8; 3]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 3;
        self.data[idx..idx + 3].copy_from_slice(&rgb);
    }
}

fn rgb_len(width: u32, height: u32) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(3))
        .ok_or_else(|| anyhow!("frame dimensions overflow"))
}

/// Axis-aligned box in normalized coordinates (top-left origin).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl BoundingBox {
    /// Inclusive pixel corners, clamped to the frame.
    fn to_pixels(self, width: u32, height: u32) -> (u32, u32, u32, u32) {
        let clamp = |v: f32, max: u32| -> u32 {
            let px = (v.clamp(0.0, 1.0) * max as f32).round() as u32;
            px.min(max - 1)
        };
        let x0 = clamp(self.x, width);
        let y0 = clamp(self.y, height);
        let x1 = clamp(self.x + self.w, width).max(x0);
        let y1 = clamp(self.y + self.h, height).max(y0);
        (x0, y0, x1, y1)
    }
}
