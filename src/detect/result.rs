use anyhow::{anyhow, Result};

use crate::category::LabelSet;
use crate::detect::names::ClassNames;
use crate::frame::BoundingBox;

/// One detected object.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    /// Index into the backend's `ClassNames`.
    pub class_index: usize,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

/// Result of running detection on a frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DetectionResult {
    pub detections: Vec<Detection>,
}

impl DetectionResult {
    pub fn new(detections: Vec<Detection>) -> Self {
        Self { detections }
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    /// Unique labels across all detections.
    ///
    /// Fails if any class index is missing from `names`.
    pub fn labels(&self, names: &ClassNames) -> Result<LabelSet> {
        let mut labels = LabelSet::new();
        for detection in &self.detections {
            let label = names.get(detection.class_index).ok_or_else(|| {
                anyhow!(
                    "class index {} outside name table ({} classes)",
                    detection.class_index,
                    names.len()
                )
            })?;
            labels.insert(label);
        }
        Ok(labels)
    }
}
