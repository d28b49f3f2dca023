use anyhow::{anyhow, Result};

use crate::detect::backend::DetectorBackend;
use crate::detect::names::ClassNames;
use crate::detect::result::{Detection, DetectionResult};
use crate::frame::{BoundingBox, VideoFrame};

/// Class table used by the demo backend when no names file is configured.
pub const DEMO_CLASSES: &[&str] = &[
    "glass_bottle",
    "plastic_bottle",
    "aluminium_can",
    "cardboard_box",
    "paper",
    "chip_bag",
    "styrofoam_cup",
    "plastic_bag",
    "battery",
    "paint_can",
    "light_bulb",
    "banana_peel",
];

/// One scripted frame worth of output.
#[derive(Clone, Debug, PartialEq)]
pub enum ScriptStep {
    /// `(class_index, confidence)` pairs reported for the frame.
    Detect(Vec<(usize, f32)>),
    /// Detection fails with this message.
    Fail(String),
}

/// Deterministic backend that replays a fixed script, one step per frame.
///
/// Each step is held for `hold` consecutive frames, then the script advances
/// and wraps around. Boxes are laid out left to right so overlays are visible.
pub struct ScriptedBackend {
    names: ClassNames,
    script: Vec<ScriptStep>,
    hold: u32,
    calls: u64,
}

impl ScriptedBackend {
    pub fn new(names: ClassNames, script: Vec<ScriptStep>) -> Self {
        Self {
            names,
            script,
            hold: 1,
            calls: 0,
        }
    }

    /// Cycle through a handful of scenes drawn from `names`, each held for `hold` frames.
    pub fn demo(names: ClassNames, hold: u32) -> Self {
        let n = names.len();
        let scene = |picks: &[usize]| {
            ScriptStep::Detect(
                picks
                    .iter()
                    .filter(|&&i| i < n)
                    .map(|&i| (i, 0.8))
                    .collect(),
            )
        };
        let script = if n == 0 {
            vec![ScriptStep::Detect(Vec::new())]
        } else {
            vec![
                ScriptStep::Detect(Vec::new()),
                scene(&[0]),
                scene(&[0, n / 2]),
                scene(&[n.saturating_sub(1), n / 2, 1]),
                scene(&[n.saturating_sub(2)]),
            ]
        };
        Self::new(names, script).with_hold(hold)
    }

    pub fn with_hold(mut self, hold: u32) -> Self {
        self.hold = hold.max(1);
        self
    }

    fn current_step(&self) -> Option<&ScriptStep> {
        if self.script.is_empty() {
            return None;
        }
        let index = (self.calls / self.hold as u64) as usize % self.script.len();
        self.script.get(index)
    }
}

impl DetectorBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn class_names(&self) -> &ClassNames {
        &self.names
    }

    fn detect(&mut self, _frame: &VideoFrame, confidence: f32) -> Result<DetectionResult> {
        let step = self.current_step().cloned();
        self.calls += 1;

        let picks = match step {
            None => return Ok(DetectionResult::default()),
            Some(ScriptStep::Fail(message)) => return Err(anyhow!(message)),
            Some(ScriptStep::Detect(picks)) => picks,
        };

        let slot = 1.0 / picks.len().max(1) as f32;
        let detections = picks
            .into_iter()
            .enumerate()
            .filter(|(_, (_, score))| *score >= confidence)
            .map(|(i, (class_index, score))| Detection {
                class_index,
                confidence: score,
                bbox: BoundingBox {
                    x: i as f32 * slot + slot * 0.1,
                    y: 0.25,
                    w: slot * 0.8,
                    h: 0.5,
                },
            })
            .collect();
        Ok(DetectionResult::new(detections))
    }
}
