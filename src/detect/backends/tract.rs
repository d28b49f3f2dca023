#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::detect::backend::DetectorBackend;
use crate::detect::decode::{decode_head, HeadShape};
use crate::detect::names::ClassNames;
use crate::detect::result::DetectionResult;
use crate::frame::VideoFrame;

/// Tract-based backend for YOLOv8-style ONNX detectors.
///
/// Frames are stretched to the model input size; boxes come back normalized,
/// so they map onto the caller's frame without rescaling.
pub struct TractBackend {
    model: SimplePlan<TypedFact, Box<dyn TypedOp>>,
    names: ClassNames,
    width: u32,
    height: u32,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(
        model_path: P,
        names: ClassNames,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        if names.is_empty() {
            return Err(anyhow!("tract backend needs a non-empty class name table"));
        }
        let model_path = model_path.as_ref();
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    f32::datum_type(),
                    tvec!(1, 3, height as usize, width as usize),
                ),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        log::info!(
            "TractBackend: loaded {} ({}x{}, {} classes)",
            model_path.display(),
            width,
            height,
            names.len()
        );

        Ok(Self {
            model,
            names,
            width,
            height,
        })
    }

    fn build_input(&self, frame: &VideoFrame) -> Result<Tensor> {
        let frame = frame.resized(self.width, self.height)?;
        let pixels = frame.pixels();
        let width = self.width as usize;
        let input = tract_ndarray::Array4::from_shape_fn(
            (1, 3, self.height as usize, width),
            |(_, channel, y, x)| {
                let idx = (y * width + x) * 3 + channel;
                pixels[idx] as f32 / 255.0
            },
        );
        Ok(input.into_tensor())
    }
}

impl DetectorBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn class_names(&self) -> &ClassNames {
        &self.names
    }

    fn detect(&mut self, frame: &VideoFrame, confidence: f32) -> Result<DetectionResult> {
        let input = self.build_input(frame)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let view = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;
        let dims = view.shape().to_vec();
        let anchors = *dims
            .last()
            .ok_or_else(|| anyhow!("model output has no dimensions"))?;
        let values: Vec<f32> = view.iter().copied().collect();

        let detections = decode_head(
            &values,
            HeadShape {
                classes: self.names.len(),
                anchors,
                input_width: self.width,
                input_height: self.height,
            },
            confidence,
        )?;
        Ok(DetectionResult::new(detections))
    }

    fn warm_up(&mut self) -> Result<()> {
        let blank = VideoFrame::filled(self.width, self.height, [0, 0, 0], 0)?;
        self.detect(&blank, 1.0).map(|_| ())
    }
}
