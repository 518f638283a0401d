//! Operator overlay.
//!
//! The control loop builds an `Overlay` each iteration from its own state and
//! hands it to an `OverlayRenderer`. Rendering is cosmetic: nothing a renderer
//! does feeds back into control decisions.

mod palette;
mod snapshot;

use std::time::Instant;

use anyhow::Result;

pub use palette::ClassPalette;
pub use snapshot::SnapshotRenderer;

use crate::control::{AnchorPoint, ModeMachine, PERSON_CLASS_ID};
use crate::detect::{BoundingBox, Detection, LabelMap};
use crate::frame::Frame;

/// One labelled box to draw.
#[derive(Clone, Debug, PartialEq)]
pub struct BoxAnnotation {
    pub bbox: BoundingBox,
    pub label: String,
    pub color: [u8; 3],
}

#[derive(Clone, Debug, PartialEq)]
pub struct Overlay {
    pub boxes: Vec<BoxAnnotation>,
    /// Lines through the followed target's anchor.
    pub crosshair: Option<AnchorPoint>,
    pub fps_text: String,
    pub mode_text: String,
}

impl Overlay {
    /// Build the overlay for one frame.
    ///
    /// Detection mode shows every box; follow mode shows person boxes only,
    /// plus a crosshair on the selected target.
    pub fn build(
        machine: &ModeMachine,
        detections: &[Detection],
        anchor: Option<AnchorPoint>,
        labels: &LabelMap,
        palette: &ClassPalette,
        fps: Option<f64>,
    ) -> Self {
        let following = machine.is_following();
        let boxes = detections
            .iter()
            .filter(|d| !following || d.class_id == PERSON_CLASS_ID)
            .map(|d| BoxAnnotation {
                bbox: d.bbox,
                label: format!("{} {:.2}%", labels.name(d.class_id), d.confidence),
                color: palette.color(d.class_id),
            })
            .collect();
        let fps_text = match fps {
            Some(fps) => format!("FPS: {}", fps as i64),
            None => "FPS: --".to_string(),
        };
        Self {
            boxes,
            crosshair: if following { anchor } else { None },
            fps_text,
            mode_text: machine.to_string(),
        }
    }
}

/// Instantaneous frame-rate meter.
#[derive(Debug, Default)]
pub struct FrameRate {
    last_tick: Option<Instant>,
    current: Option<f64>,
}

impl FrameRate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a frame; returns the rate over the last interval.
    pub fn tick(&mut self) -> Option<f64> {
        self.tick_at(Instant::now())
    }

    pub fn tick_at(&mut self, now: Instant) -> Option<f64> {
        self.current = self.last_tick.and_then(|last| {
            let secs = now.saturating_duration_since(last).as_secs_f64();
            (secs > 0.0).then(|| 1.0 / secs)
        });
        self.last_tick = Some(now);
        self.current
    }

    pub fn current(&self) -> Option<f64> {
        self.current
    }
}

/// Draws the overlay somewhere the operator can see it.
pub trait OverlayRenderer {
    fn render(&mut self, frame: &Frame, overlay: &Overlay) -> Result<()>;

    /// Release display resources. Called once when the loop stops.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<R: OverlayRenderer + ?Sized> OverlayRenderer for Box<R> {
    fn render(&mut self, frame: &Frame, overlay: &Overlay) -> Result<()> {
        (**self).render(frame, overlay)
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

/// Headless renderer: overlay summary at debug level, mode changes at info.
#[derive(Debug, Default)]
pub struct LogRenderer {
    last_mode_text: Option<String>,
    frames: u64,
}

impl LogRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl OverlayRenderer for LogRenderer {
    fn render(&mut self, frame: &Frame, overlay: &Overlay) -> Result<()> {
        self.frames += 1;
        if self.last_mode_text.as_deref() != Some(overlay.mode_text.as_str()) {
            log::info!("overlay: {}", overlay.mode_text);
            self.last_mode_text = Some(overlay.mode_text.clone());
        }
        log::debug!(
            "{}x{} {} boxes={} crosshair={:?} {}",
            frame.width(),
            frame.height(),
            overlay.fps_text,
            overlay.boxes.len(),
            overlay.crosshair,
            overlay
                .boxes
                .iter()
                .map(|b| b.label.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        log::info!("overlay closed after {} frames", self.frames);
        Ok(())
    }
}
