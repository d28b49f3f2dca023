//! Streaming collaborator: where frames come from and where annotated frames go.
//!
//! Sources:
//! - `stub://...`: synthetic scene, always available (demos and tests)
//! - `/dev/videoN`: V4L2 webcam (feature: ingest-v4l2)
//!
//! Sinks receive the frame to display for every processed input frame,
//! annotated or not.

mod normalize;
pub mod synthetic;
#[cfg(feature = "ingest-v4l2")]
pub mod v4l2;

use anyhow::{anyhow, Result};
use std::sync::{Arc, Mutex, PoisonError};

pub use normalize::{normalize_to_rgb, PixelFormat};
pub use synthetic::SyntheticSource;
#[cfg(feature = "ingest-v4l2")]
pub use v4l2::V4l2Source;

use crate::config::StreamSettings;
use crate::frame::VideoFrame;

/// Statistics for a frame source.
#[derive(Clone, Debug)]
pub struct SourceStats {
    pub frames_captured: u64,
    pub location: String,
}

/// Supplies raw frames at its own cadence.
///
/// Not `Send`: device handles stay on the thread that opened them.
pub trait FrameSource {
    /// Open the underlying stream or device.
    fn connect(&mut self) -> Result<()>;

    /// Block until the next frame is available.
    fn next_frame(&mut self) -> Result<VideoFrame>;

    fn is_healthy(&self) -> bool;

    fn stats(&self) -> SourceStats;
}

/// Accepts frames for display.
pub trait FrameSink: Send {
    fn show(&mut self, frame: &VideoFrame) -> Result<()>;
}

/// Open the source named by `settings.source`.
pub fn open_source(settings: &StreamSettings) -> Result<Box<dyn FrameSource>> {
    if settings.source.starts_with("stub://") {
        return Ok(Box::new(SyntheticSource::new(settings.clone())));
    }
    if settings.source.contains("://") {
        return Err(anyhow!(
            "unsupported frame source {} (expected stub:// or a device path)",
            settings.source
        ));
    }
    #[cfg(feature = "ingest-v4l2")]
    {
        Ok(Box::new(V4l2Source::new(settings.clone())))
    }
    #[cfg(not(feature = "ingest-v4l2"))]
    {
        Err(anyhow!(
            "webcam capture from {} requires the ingest-v4l2 feature",
            settings.source
        ))
    }
}

/// Sink that keeps only the most recent frame, shareable with a viewer.
#[derive(Clone, Default)]
pub struct LatestFrameSink {
    latest: Arc<Mutex<Option<VideoFrame>>>,
    shown: Arc<Mutex<u64>>,
}

impl LatestFrameSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latest(&self) -> Option<VideoFrame> {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn frames_shown(&self) -> u64 {
        *self.shown.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl FrameSink for LatestFrameSink {
    fn show(&mut self, frame: &VideoFrame) -> Result<()> {
        *self
            .latest
            .lock()
            .map_err(|_| anyhow!("frame sink lock poisoned"))? = Some(frame.clone());
        *self
            .shown
            .lock()
            .map_err(|_| anyhow!("frame sink lock poisoned"))? += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(source: &str) -> StreamSettings {
        StreamSettings {
            source: source.to_string(),
            target_fps: 10,
            width: 64,
            height: 48,
        }
    }

    #[test]
    fn stub_scheme_opens_synthetic_source() -> Result<()> {
        let mut source = open_source(&settings("stub://webcam"))?;
        source.connect()?;
        let frame = source.next_frame()?;
        assert_eq!((frame.width, frame.height), (64, 48));
        Ok(())
    }

    #[test]
    fn network_urls_are_rejected() {
        assert!(open_source(&settings("rtsp://camera/stream")).is_err());
    }

    #[test]
    fn latest_sink_keeps_last_frame() -> Result<()> {
        let mut sink = LatestFrameSink::new();
        let viewer = sink.clone();
        sink.show(&VideoFrame::filled(2, 2, [1, 1, 1], 1)?)?;
        sink.show(&VideoFrame::filled(2, 2, [2, 2, 2], 2)?)?;

        assert_eq!(viewer.frames_shown(), 2);
        assert_eq!(viewer.latest().map(|f| f.sequence), Some(2));
        Ok(())
    }
}
