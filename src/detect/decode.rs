//! Decoding of YOLOv8-style detection heads.
//!
//! The head output is laid out as `[1, 4 + classes, anchors]`: for each anchor,
//! `cx, cy, w, h` in input pixels followed by one score per class.

use anyhow::{anyhow, Result};

use crate::detect::result::Detection;
use crate::frame::BoundingBox;

/// IoU above which two same-class boxes are considered duplicates.
pub const NMS_IOU_THRESHOLD: f32 = 0.45;

/// Upper bound on detections kept per frame.
pub const MAX_DETECTIONS: usize = 100;

#[derive(Clone, Copy, Debug)]
pub struct HeadShape {
    pub classes: usize,
    pub anchors: usize,
    pub input_width: u32,
    pub input_height: u32,
}

/// Turn raw head output into thresholded, de-duplicated detections.
pub fn decode_head(output: &[f32], shape: HeadShape, confidence: f32) -> Result<Vec<Detection>> {
    let rows = shape.classes + 4;
    let expected = rows
        .checked_mul(shape.anchors)
        .ok_or_else(|| anyhow!("detection head dimensions overflow"))?;
    if output.len() != expected {
        return Err(anyhow!(
            "detection head has {} values, expected {} ({} rows x {} anchors)",
            output.len(),
            expected,
            rows,
            shape.anchors
        ));
    }

    let at = |row: usize, anchor: usize| output[row * shape.anchors + anchor];
    let iw = shape.input_width as f32;
    let ih = shape.input_height as f32;

    let mut candidates = Vec::new();
    for anchor in 0..shape.anchors {
        let (class_index, score) = (0..shape.classes)
            .map(|c| (c, at(4 + c, anchor)))
            .fold((0, f32::NEG_INFINITY), |best, cur| {
                if cur.1 > best.1 {
                    cur
                } else {
                    best
                }
            });
        if !score.is_finite() || score < confidence {
            continue;
        }
        let (cx, cy, w, h) = (at(0, anchor), at(1, anchor), at(2, anchor), at(3, anchor));
        candidates.push(Detection {
            class_index,
            confidence: score,
            bbox: BoundingBox {
                x: (cx - w / 2.0) / iw,
                y: (cy - h / 2.0) / ih,
                w: w / iw,
                h: h / ih,
            },
        });
    }

    Ok(non_max_suppression(candidates, NMS_IOU_THRESHOLD))
}

/// Greedy per-class NMS, highest confidence first.
pub fn non_max_suppression(mut candidates: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    let mut kept: Vec<Detection> = Vec::new();
    for candidate in candidates {
        let duplicate = kept.iter().any(|k| {
            k.class_index == candidate.class_index && iou(&k.bbox, &candidate.bbox) > iou_threshold
        });
        if !duplicate {
            kept.push(candidate);
            if kept.len() == MAX_DETECTIONS {
                break;
            }
        }
    }
    kept
}

fn iou(a: &BoundingBox, b: &BoundingBox) -> f32 {
    let x0 = a.x.max(b.x);
    let y0 = a.y.max(b.y);
    let x1 = (a.x + a.w).min(b.x + b.w);
    let y1 = (a.y + a.h).min(b.y + b.h);
    let inter = (x1 - x0).max(0.0) * (y1 - y0).max(0.0);
    let union = a.w * a.h + b.w * b.h - inter;
    if union <= 0.0 {
        0.0
    } else {
        inter / union
    }
}
