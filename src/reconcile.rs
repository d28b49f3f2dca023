//! Per-frame detection-to-category reconciliation.
//!
//! `FrameReconciler::process` is invoked once per decoded frame by whatever
//! drives the stream. It runs detection, reduces the detections to a
//! `LabelSet`, and publishes a new `CategorizedResult` to the `SessionState`
//! only when that set differs from the previous frame's.
//!
//! Failures never escape: the outcome always carries a frame the caller can
//! display, either annotated or the original one untouched.

use std::fmt;
use std::sync::Arc;

use anyhow::{anyhow, Result};

use crate::category::{classify, CategorizedResult, CategoryTables, LabelSet, WasteCategory};
use crate::config::SorterConfig;
use crate::detect::{DetectionResult, SharedBackend};
use crate::frame::{processing_height, VideoFrame, PROCESSING_WIDTH};
use crate::state::SessionState;

/// Detection threshold applied to every frame unless configured otherwise.
pub const DEFAULT_CONFIDENCE: f32 = 0.6;

/// Knobs for the per-frame pipeline.
#[derive(Clone, Copy, Debug)]
pub struct ReconcilerSettings {
    pub confidence: f32,
    pub width: u32,
    pub height: u32,
}

impl ReconcilerSettings {
    pub fn from_config(cfg: &SorterConfig) -> Self {
        let (width, height) = cfg.detector.processing_size();
        Self {
            confidence: cfg.detector.confidence,
            width,
            height,
        }
    }
}

impl Default for ReconcilerSettings {
    fn default() -> Self {
        Self {
            confidence: DEFAULT_CONFIDENCE,
            width: PROCESSING_WIDTH,
            height: processing_height(PROCESSING_WIDTH),
        }
    }
}

/// A frame that could not be processed.
#[derive(Debug)]
pub struct FrameError {
    sequence: u64,
    message: String,
}

impl FrameError {
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frame {} processing failed: {}", self.sequence, self.message)
    }
}

impl std::error::Error for FrameError {}

/// What the caller gets back for each frame.
#[derive(Debug)]
pub enum FrameOutcome {
    /// Detection ran. `update` is set when the label set changed.
    Annotated {
        frame: VideoFrame,
        update: Option<CategorizedResult>,
    },
    /// Detection failed; `frame` is the original input.
    Passthrough { frame: VideoFrame, error: FrameError },
}

impl FrameOutcome {
    /// Frame to display.
    pub fn frame(&self) -> &VideoFrame {
        match self {
            FrameOutcome::Annotated { frame, .. } | FrameOutcome::Passthrough { frame, .. } => frame,
        }
    }

    pub fn into_frame(self) -> VideoFrame {
        match self {
            FrameOutcome::Annotated { frame, .. } | FrameOutcome::Passthrough { frame, .. } => frame,
        }
    }

    pub fn update(&self) -> Option<&CategorizedResult> {
        match self {
            FrameOutcome::Annotated { update, .. } => update.as_ref(),
            FrameOutcome::Passthrough { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&FrameError> {
        match self {
            FrameOutcome::Passthrough { error, .. } => Some(error),
            FrameOutcome::Annotated { .. } => None,
        }
    }
}

/// Overlay colour for a detection, keyed on its category.
pub fn overlay_color(category: Option<WasteCategory>) -> [u8; 3] {
    match category {
        Some(WasteCategory::Recyclable) => [40, 180, 70],
        Some(WasteCategory::NonRecyclable) => [150, 150, 150],
        Some(WasteCategory::Hazardous) => [220, 40, 40],
        None => [240, 200, 40],
    }
}

/// Tracks the previous frame's labels and publishes category changes.
pub struct FrameReconciler {
    detector: SharedBackend,
    tables: Arc<CategoryTables>,
    state: SessionState,
    settings: ReconcilerSettings,
    previous: LabelSet,
}

impl FrameReconciler {
    pub fn new(
        detector: SharedBackend,
        tables: Arc<CategoryTables>,
        state: SessionState,
        settings: ReconcilerSettings,
    ) -> Self {
        Self {
            detector,
            tables,
            state,
            settings,
            previous: LabelSet::new(),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Labels seen on the last successfully processed frame.
    pub fn previous_labels(&self) -> &LabelSet {
        &self.previous
    }

    /// Forget the previous frame's labels (stream restart).
    pub fn reset(&mut self) {
        self.previous = LabelSet::new();
    }

    /// Process one frame. Never fails; see `FrameOutcome`.
    pub fn process(&mut self, frame: VideoFrame) -> FrameOutcome {
        match self.try_process(&frame) {
            Ok((annotated, update)) => FrameOutcome::Annotated {
                frame: annotated,
                update,
            },
            Err(err) => {
                let error = FrameError {
                    sequence: frame.sequence,
                    message: format!("{:#}", err),
                };
                log::error!("{}", error);
                FrameOutcome::Passthrough { frame, error }
            }
        }
    }

    fn try_process(&mut self, frame: &VideoFrame) -> Result<(VideoFrame, Option<CategorizedResult>)> {
        let mut resized = frame.resized(self.settings.width, self.settings.height)?;

        let (detections, labels, names) = {
            let mut detector = self
                .detector
                .lock()
                .map_err(|_| anyhow!("detector lock poisoned"))?;
            let detections = detector.detect(&resized, self.settings.confidence)?;
            let names = detector.class_names();
            let labels = detections.labels(names)?;
            let names: Vec<Option<String>> = detections
                .detections
                .iter()
                .map(|d| names.get(d.class_index).map(str::to_string))
                .collect();
            (detections, labels, names)
        };
        log::debug!(
            "frame {}: {} detections, {} labels",
            frame.sequence,
            detections.detections.len(),
            labels.len()
        );

        self.annotate(&mut resized, &detections, &names);

        if labels == self.previous {
            return Ok((resized, None));
        }

        let result = classify(&labels, &self.tables);
        log::info!(
            "frame {}: labels changed to {:?} (recyclable={}, non_recyclable={}, hazardous={})",
            frame.sequence,
            labels.iter().collect::<Vec<_>>(),
            result.recyclable.len(),
            result.non_recyclable.len(),
            result.hazardous.len()
        );
        self.state.publish(result.clone());
        self.previous = labels;
        Ok((resized, Some(result)))
    }

    fn annotate(&self, frame: &mut VideoFrame, detections: &DetectionResult, names: &[Option<String>]) {
        for (detection, name) in detections.detections.iter().zip(names) {
            let category = name
                .as_deref()
                .and_then(|label| self.tables.category_of(label));
            frame.draw_box(&detection.bbox, overlay_color(category));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{ClassNames, ScriptStep, ScriptedBackend};
    use std::sync::Mutex;

    fn tables() -> Arc<CategoryTables> {
        Arc::new(CategoryTables::new(
            ["glass_bottle"].into_iter().collect(),
            ["chip_bag"].into_iter().collect(),
            ["battery"].into_iter().collect(),
        ))
    }

    fn reconciler(script: Vec<ScriptStep>) -> FrameReconciler {
        let names = ClassNames::new(vec![
            "glass_bottle".into(),
            "banana_peel".into(),
            "battery".into(),
        ]);
        let backend: SharedBackend = Arc::new(Mutex::new(ScriptedBackend::new(names, script)));
        FrameReconciler::new(
            backend,
            tables(),
            SessionState::new(),
            ReconcilerSettings {
                confidence: 0.6,
                width: 64,
                height: 36,
            },
        )
    }

    fn frame(sequence: u64) -> VideoFrame {
        VideoFrame::filled(128, 96, [0, 0, 0], sequence).unwrap()
    }

    #[test]
    fn change_publishes_and_marks_dirty() {
        let mut r = reconciler(vec![ScriptStep::Detect(vec![(0, 0.9), (1, 0.8)])]);
        let outcome = r.process(frame(1));

        let update = outcome.update().cloned().expect("update");
        assert_eq!(update.recyclable, ["glass_bottle"].into_iter().collect::<LabelSet>());
        assert!(update.non_recyclable.is_empty());
        assert!(update.hazardous.is_empty());
        assert!(r.state().is_dirty());
        assert_eq!(outcome.frame().width, 64);
        assert_eq!(outcome.frame().height, 36);
    }

    #[test]
    fn unchanged_labels_do_not_raise_dirty() {
        let mut r = reconciler(vec![ScriptStep::Detect(vec![(2, 0.9)])]);
        assert!(r.process(frame(1)).update().is_some());
        assert!(r.state().take_pending().is_some());

        let second = r.process(frame(2));
        assert!(second.update().is_none());
        assert!(second.error().is_none());
        assert!(!r.state().is_dirty());
        assert_eq!(r.state().update_count(), 1);
    }

    #[test]
    fn empty_first_frame_is_not_a_change() {
        let mut r = reconciler(vec![ScriptStep::Detect(vec![])]);
        assert!(r.process(frame(1)).update().is_none());
        assert!(!r.state().is_dirty());
    }

    #[test]
    fn clearing_all_labels_publishes_empty_result() {
        let mut r = reconciler(vec![
            ScriptStep::Detect(vec![(2, 0.9)]),
            ScriptStep::Detect(vec![]),
        ]);
        r.process(frame(1));
        assert!(r.state().take_pending().is_some());

        let outcome = r.process(frame(2));
        let update = outcome.update().expect("update");
        assert!(update.is_empty());
        assert!(r.state().is_dirty());
        assert!(r.previous_labels().is_empty());
        assert_eq!(r.state().update_count(), 2);
    }

    #[test]
    fn detection_failure_returns_original_frame() {
        let mut r = reconciler(vec![
            ScriptStep::Detect(vec![(0, 0.9)]),
            ScriptStep::Fail("malformed frame".into()),
        ]);
        r.process(frame(1));
        r.state().take_pending();

        let original = frame(2);
        let outcome = r.process(original.clone());
        let error = outcome.error().expect("error");
        assert_eq!(error.sequence(), 2);
        assert!(error.message().contains("malformed frame"));
        assert!(!r.state().is_dirty());
        assert_eq!(r.previous_labels(), &["glass_bottle"].into_iter().collect::<LabelSet>());
        assert_eq!(outcome.into_frame(), original);
    }

    #[test]
    fn unknown_class_index_is_a_frame_failure() {
        let mut r = reconciler(vec![ScriptStep::Detect(vec![(9, 0.9)])]);
        let outcome = r.process(frame(1));
        assert!(outcome.error().is_some());
        assert!(!r.state().is_dirty());
        assert!(r.previous_labels().is_empty());
    }

    #[test]
    fn reset_makes_next_frame_a_change_again() {
        let mut r = reconciler(vec![ScriptStep::Detect(vec![(0, 0.9)])]);
        assert!(r.process(frame(1)).update().is_some());
        assert!(r.process(frame(2)).update().is_none());
        r.reset();
        assert!(r.process(frame(3)).update().is_some());
    }

    #[test]
    fn overlays_use_category_colours() {
        let mut r = reconciler(vec![ScriptStep::Detect(vec![(2, 0.9)])]);
        let outcome = r.process(frame(1));
        let drawn = outcome
            .frame()
            .pixels()
            .chunks(3)
            .any(|px| px == overlay_color(Some(WasteCategory::Hazardous)));
        assert!(drawn);
    }
}
