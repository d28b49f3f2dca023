//! Synthetic frame source for `stub://` locations.
//!
//! Produces a slowly drifting gradient with a little per-frame noise and an
//! occasional scene shift, paced to the configured frame rate.

use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{Duration, Instant};

use super::{FrameSource, SourceStats};
use crate::config::StreamSettings;
use crate::frame::VideoFrame;

/// Frames between scene shifts.
const SCENE_FRAMES: u64 = 50;

pub struct SyntheticSource {
    settings: StreamSettings,
    rng: StdRng,
    frame_count: u64,
    scene_state: u8,
    paced: bool,
    last_frame_at: Option<Instant>,
}

impl SyntheticSource {
    pub fn new(settings: StreamSettings) -> Self {
        Self {
            settings,
            rng: StdRng::seed_from_u64(0x5eed),
            frame_count: 0,
            scene_state: 0,
            paced: true,
            last_frame_at: None,
        }
    }

    /// Emit frames as fast as they are requested instead of at `target_fps`.
    pub fn unpaced(mut self) -> Self {
        self.paced = false;
        self
    }

    fn frame_interval(&self) -> Duration {
        Duration::from_millis(1000 / self.settings.target_fps.max(1) as u64)
    }

    fn generate_pixels(&mut self) -> Vec<u8> {
        let width = self.settings.width as usize;
        let height = self.settings.height as usize;

        if self.frame_count % SCENE_FRAMES == 0 {
            self.scene_state = self.scene_state.wrapping_add(1);
        }
        let noise: u8 = self.rng.gen_range(0..4);
        let shift = self.scene_state as usize * 37 + self.frame_count as usize;

        let mut pixels = vec![0u8; width * height * 3];
        for (i, px) in pixels.chunks_exact_mut(3).enumerate() {
            let x = i % width;
            let y = i / width;
            px[0] = ((x + shift) % 256) as u8;
            px[1] = ((y * 2 + shift) % 256) as u8;
            px[2] = (self.scene_state.wrapping_mul(40)).wrapping_add(noise);
        }
        pixels
    }
}

impl FrameSource for SyntheticSource {
    fn connect(&mut self) -> Result<()> {
        log::info!(
            "SyntheticSource: connected to {} ({}x{} @ {} fps)",
            self.settings.source,
            self.settings.width,
            self.settings.height,
            self.settings.target_fps
        );
        Ok(())
    }

    fn next_frame(&mut self) -> Result<VideoFrame> {
        if self.paced {
            if let Some(last) = self.last_frame_at {
                let interval = self.frame_interval();
                let elapsed = last.elapsed();
                if elapsed < interval {
                    std::thread::sleep(interval - elapsed);
                }
            }
        }
        self.last_frame_at = Some(Instant::now());
        self.frame_count += 1;

        let pixels = self.generate_pixels();
        VideoFrame::new(
            pixels,
            self.settings.width,
            self.settings.height,
            self.frame_count,
        )
    }

    fn is_healthy(&self) -> bool {
        true
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            location: self.settings.source.clone(),
        }
    }
}
