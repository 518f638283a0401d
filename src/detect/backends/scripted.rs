use std::collections::VecDeque;

use anyhow::{anyhow, Result};

use crate::detect::backend::DetectorBackend;
use crate::detect::result::Detection;
use crate::frame::Frame;

/// Scripted backend for tests and dry runs.
///
/// Each `detect` call pops the next scripted outcome. Once the script is
/// exhausted every frame yields no detections.
pub struct ScriptedBackend {
    script: VecDeque<std::result::Result<Vec<Detection>, String>>,
    confidence_threshold: f32,
    calls: u64,
}

impl ScriptedBackend {
    pub fn new(confidence_threshold: f32) -> Self {
        Self {
            script: VecDeque::new(),
            confidence_threshold,
            calls: 0,
        }
    }

    /// Queue the detections for one frame.
    pub fn push(&mut self, detections: Vec<Detection>) -> &mut Self {
        self.script.push_back(Ok(detections));
        self
    }

    /// Queue an inference failure for one frame.
    pub fn push_failure(&mut self, reason: &str) -> &mut Self {
        self.script.push_back(Err(reason.to_string()));
        self
    }

    pub fn with_frames<I>(mut self, frames: I) -> Self
    where
        I: IntoIterator<Item = Vec<Detection>>,
    {
        self.script.extend(frames.into_iter().map(Ok));
        self
    }

    /// Number of `detect` calls made so far.
    pub fn calls(&self) -> u64 {
        self.calls
    }
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self::new(0.5)
    }
}

impl DetectorBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }

    fn detect(&mut self, _frame: &Frame) -> Result<Vec<Detection>> {
        self.calls += 1;
        match self.script.pop_front() {
            Some(Ok(detections)) => Ok(detections
                .into_iter()
                .filter(|d| d.confidence >= self.confidence_threshold)
                .collect()),
            Some(Err(reason)) => Err(anyhow!("scripted inference failure: {}", reason)),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::result::BoundingBox;

    fn frame() -> Frame {
        Frame::from_rgb(2, 2, vec![0; 12]).unwrap()
    }

    #[test]
    fn scripted_backend_applies_threshold_and_order() {
        let weak = Detection::new(0, 0.3, BoundingBox::new(0, 0, 10, 10));
        let strong = Detection::new(2, 0.9, BoundingBox::new(5, 5, 20, 20));
        let person = Detection::new(0, 0.5, BoundingBox::new(1, 1, 2, 2));
        let mut backend =
            ScriptedBackend::new(0.5).with_frames([vec![weak, strong.clone(), person.clone()]]);

        let out = backend.detect(&frame()).unwrap();
        assert_eq!(out, vec![strong, person]);

        assert!(backend.detect(&frame()).unwrap().is_empty());
        assert_eq!(backend.calls(), 2);
    }

    #[test]
    fn scripted_failure_surfaces_as_error() {
        let mut backend = ScriptedBackend::default();
        backend.push_failure("gpu lost");
        let err = backend.detect(&frame()).unwrap_err();
        assert!(err.to_string().contains("gpu lost"));
    }
}
