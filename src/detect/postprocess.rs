//! YOLO-style output decoding.
//!
//! Single-stage detectors in the YOLOv8 family emit one `[4 + C, N]` tensor per
//! image: rows 0..4 hold `cx, cy, w, h` in model-input pixels, the remaining
//! `C` rows hold per-class scores, and each of the `N` columns is one anchor.

use std::cmp::Ordering;

use anyhow::{anyhow, Result};

use crate::detect::result::{BoundingBox, Detection};

/// IoU above which a lower-scored box of the same class is suppressed.
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.45;

/// Geometry needed to map model-input coordinates back onto the frame.
#[derive(Clone, Copy, Debug)]
pub struct Rescale {
    pub input_width: u32,
    pub input_height: u32,
    pub frame_width: u32,
    pub frame_height: u32,
}

#[derive(Clone, Copy, Debug)]
struct Candidate {
    class_id: u32,
    score: f32,
    x_min: f32,
    y_min: f32,
    x_max: f32,
    y_max: f32,
}

/// Decode a row-major `[channels, anchors]` output into frame-space detections.
///
/// Detections are returned highest confidence first.
pub fn decode_yolo(
    output: &[f32],
    channels: usize,
    anchors: usize,
    confidence_threshold: f32,
    iou_threshold: f32,
    rescale: Rescale,
) -> Result<Vec<Detection>> {
    if channels < 5 {
        return Err(anyhow!("expected at least 5 output channels, got {}", channels));
    }
    if output.len() != channels * anchors {
        return Err(anyhow!(
            "output length {} does not match {}x{}",
            output.len(),
            channels,
            anchors
        ));
    }
    let at = |c: usize, n: usize| output[c * anchors + n];

    let mut candidates = Vec::new();
    for n in 0..anchors {
        let (class_id, score) = (4..channels)
            .map(|c| (c - 4, at(c, n)))
            .fold((0usize, f32::NEG_INFINITY), |best, cur| {
                if cur.1 > best.1 {
                    cur
                } else {
                    best
                }
            });
        if !score.is_finite() || score < confidence_threshold {
            continue;
        }
        let (cx, cy, w, h) = (at(0, n), at(1, n), at(2, n), at(3, n));
        candidates.push(Candidate {
            class_id: class_id as u32,
            score,
            x_min: cx - w / 2.0,
            y_min: cy - h / 2.0,
            x_max: cx + w / 2.0,
            y_max: cy + h / 2.0,
        });
    }

    let kept = non_max_suppression(candidates, iou_threshold);
    let sx = rescale.frame_width as f32 / rescale.input_width.max(1) as f32;
    let sy = rescale.frame_height as f32 / rescale.input_height.max(1) as f32;
    let max_x = rescale.frame_width as f32;
    let max_y = rescale.frame_height as f32;

    Ok(kept
        .into_iter()
        .map(|c| {
            let bbox = BoundingBox::new(
                (c.x_min * sx).clamp(0.0, max_x) as i32,
                (c.y_min * sy).clamp(0.0, max_y) as i32,
                (c.x_max * sx).clamp(0.0, max_x) as i32,
                (c.y_max * sy).clamp(0.0, max_y) as i32,
            );
            Detection::new(c.class_id, c.score, bbox)
        })
        .collect())
}

fn non_max_suppression(mut candidates: Vec<Candidate>, iou_threshold: f32) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    let mut kept: Vec<Candidate> = Vec::with_capacity(candidates.len());
    for cand in candidates {
        let suppressed = kept
            .iter()
            .any(|k| k.class_id == cand.class_id && iou(k, &cand) > iou_threshold);
        if !suppressed {
            kept.push(cand);
        }
    }
    kept
}

fn iou(a: &Candidate, b: &Candidate) -> f32 {
    let ix = (a.x_max.min(b.x_max) - a.x_min.max(b.x_min)).max(0.0);
    let iy = (a.y_max.min(b.y_max) - a.y_min.max(b.y_min)).max(0.0);
    let inter = ix * iy;
    let area_a = (a.x_max - a.x_min) * (a.y_max - a.y_min);
    let area_b = (b.x_max - b.x_min) * (b.y_max - b.y_min);
    let union = area_a + area_b - inter;
    if union <= 0.0 {
        0.0
    } else {
        inter / union
    }
}
