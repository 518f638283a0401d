use anyhow::Result;

use crate::detect::result::Detection;
use crate::frame::Frame;

/// Detector backend trait.
///
/// Backends are opaque to the control loop: only the output contract and the
/// call latency matter.
///
/// - Detections are returned in the backend's own order; callers rely on that
///   order for tie-breaking.
/// - Confidence filtering happens here, against a threshold fixed at
///   construction. Callers do not re-filter.
/// - Calls are independent. A backend may keep scratch buffers but must not
///   carry detections from one frame into the next.
pub trait DetectorBackend {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Minimum confidence a detection needs to be reported.
    fn confidence_threshold(&self) -> f32;

    /// Run detection on a frame.
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<D: DetectorBackend + ?Sized> DetectorBackend for Box<D> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn confidence_threshold(&self) -> f32 {
        (**self).confidence_threshold()
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
        (**self).detect(frame)
    }

    fn warm_up(&mut self) -> Result<()> {
        (**self).warm_up()
    }
}
