use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use image::{ImageFormat, Rgb, RgbImage};

use super::{Overlay, OverlayRenderer};
use crate::control::AnchorPoint;
use crate::detect::BoundingBox;
use crate::frame::Frame;

const BOX_THICKNESS: i32 = 3;
const CROSSHAIR_THICKNESS: i32 = 2;
const CROSSHAIR_COLOR: [u8; 3] = [0, 255, 0];

/// Writes the annotated frame to a JPEG file every `every` frames.
///
/// The file is replaced atomically (write to a sibling, then rename), so a
/// viewer polling the path never sees a partial image.
pub struct SnapshotRenderer {
    path: PathBuf,
    every: u64,
    frames: u64,
    written: u64,
}

impl SnapshotRenderer {
    pub fn new<P: Into<PathBuf>>(path: P, every: u64) -> Result<Self> {
        if every == 0 {
            return Err(anyhow!("snapshot interval must be at least one frame"));
        }
        Ok(Self {
            path: path.into(),
            every,
            frames: 0,
            written: 0,
        })
    }

    fn write(&self, image: &RgbImage) -> Result<()> {
        let tmp = self.path.with_extension("tmp.jpg");
        image
            .save_with_format(&tmp, ImageFormat::Jpeg)
            .with_context(|| format!("write snapshot {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("replace snapshot {}", self.path.display()))?;
        Ok(())
    }
}

impl OverlayRenderer for SnapshotRenderer {
    fn render(&mut self, frame: &Frame, overlay: &Overlay) -> Result<()> {
        self.frames += 1;
        if self.frames % self.every != 0 {
            return Ok(());
        }
        let mut image = frame.image().clone();
        annotate(&mut image, overlay);
        self.write(&image)?;
        self.written += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        log::info!(
            "wrote {} snapshots to {}",
            self.written,
            self.path.display()
        );
        Ok(())
    }
}

/// Draw boxes and crosshair into `image`. Text is left to the viewer.
pub(crate) fn annotate(image: &mut RgbImage, overlay: &Overlay) {
    for b in &overlay.boxes {
        draw_box(image, &b.bbox, b.color);
    }
    if let Some(anchor) = overlay.crosshair {
        draw_crosshair(image, anchor);
    }
}

fn fill_rect(image: &mut RgbImage, x0: i32, y0: i32, x1: i32, y1: i32, color: [u8; 3]) {
    let (w, h) = (image.width() as i32, image.height() as i32);
    let (x0, x1) = (x0.clamp(0, w), x1.clamp(0, w));
    let (y0, y1) = (y0.clamp(0, h), y1.clamp(0, h));
    for y in y0..y1 {
        for x in x0..x1 {
            image.put_pixel(x as u32, y as u32, Rgb(color));
        }
    }
}

fn draw_box(image: &mut RgbImage, bbox: &BoundingBox, color: [u8; 3]) {
    let t = BOX_THICKNESS;
    let BoundingBox {
        x_min,
        y_min,
        x_max,
        y_max,
    } = *bbox;
    fill_rect(image, x_min, y_min, x_max + 1, y_min + t, color);
    fill_rect(image, x_min, y_max + 1 - t, x_max + 1, y_max + 1, color);
    fill_rect(image, x_min, y_min, x_min + t, y_max + 1, color);
    fill_rect(image, x_max + 1 - t, y_min, x_max + 1, y_max + 1, color);
}

fn draw_crosshair(image: &mut RgbImage, anchor: AnchorPoint) {
    let (w, h) = (image.width() as i32, image.height() as i32);
    let half = CROSSHAIR_THICKNESS / 2;
    fill_rect(image, anchor.x - half, 0, anchor.x - half + CROSSHAIR_THICKNESS, h, CROSSHAIR_COLOR);
    fill_rect(image, 0, anchor.y - half, w, anchor.y - half + CROSSHAIR_THICKNESS, CROSSHAIR_COLOR);
}
