#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use image::imageops::{self, FilterType};
use tract_onnx::prelude::*;

use crate::detect::backend::DetectorBackend;
use crate::detect::postprocess::{decode_yolo, Rescale, DEFAULT_IOU_THRESHOLD};
use crate::detect::result::Detection;
use crate::frame::Frame;

/// Tract-based backend for YOLOv8-family ONNX detectors.
///
/// This backend loads a local model file and performs inference on RGB frames.
/// It does not perform any network I/O or write to disk beyond model loading.
pub struct TractBackend {
    model: TypedRunnableModel<TypedModel>,
    input_width: u32,
    input_height: u32,
    confidence_threshold: f32,
    iou_threshold: f32,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P, input_width: u32, input_height: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    f32::datum_type(),
                    tvec!(1, 3, input_height as usize, input_width as usize),
                ),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            model,
            input_width,
            input_height,
            confidence_threshold: 0.5,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
        })
    }

    /// Override the default confidence threshold.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    fn build_input(&self, frame: &Frame) -> Tensor {
        let resized = if frame.width() == self.input_width && frame.height() == self.input_height {
            frame.image().clone()
        } else {
            imageops::resize(
                frame.image(),
                self.input_width,
                self.input_height,
                FilterType::Triangle,
            )
        };
        let input = tract_ndarray::Array4::from_shape_fn(
            (1, 3, self.input_height as usize, self.input_width as usize),
            |(_, channel, y, x)| resized.get_pixel(x as u32, y as u32)[channel] as f32 / 255.0,
        );
        input.into_tensor()
    }
}

impl DetectorBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
        let input = self.build_input(frame);
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
        let shape = view.shape().to_vec();
        let (channels, anchors) = match shape.as_slice() {
            [1, channels, anchors] => (*channels, *anchors),
            other => return Err(anyhow!("unexpected model output shape {:?}", other)),
        };
        let flat: Vec<f32> = view.iter().copied().collect();

        decode_yolo(
            &flat,
            channels,
            anchors,
            self.confidence_threshold,
            self.iou_threshold,
            Rescale {
                input_width: self.input_width,
                input_height: self.input_height,
                frame_width: frame.width(),
                frame_height: frame.height(),
            },
        )
    }

    fn warm_up(&mut self) -> Result<()> {
        let blank = Frame::from_rgb(
            self.input_width,
            self.input_height,
            vec![0; (self.input_width * self.input_height * 3) as usize],
        )?;
        self.detect(&blank).map(|_| ())
    }
}
