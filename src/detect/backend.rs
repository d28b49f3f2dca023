use anyhow::Result;

use crate::detect::names::ClassNames;
use crate::detect::result::DetectionResult;
use crate::frame::VideoFrame;

/// Object detector backend.
///
/// A backend owns its model and the class-index to label table that goes
/// with it. The reconciler only ever sees class indices and that table.
pub trait DetectorBackend: Send {
    /// Backend identifier, used for registry lookup and logs.
    fn name(&self) -> &'static str;

    /// Label table for the class indices this backend reports.
    fn class_names(&self) -> &ClassNames;

    /// Run detection on a frame, keeping detections at or above `confidence`.
    ///
    /// The frame is borrowed for the duration of the call only.
    fn detect(&mut self, frame: &VideoFrame, confidence: f32) -> Result<DetectionResult>;

    /// Optional warm-up hook, called once before the first frame.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
