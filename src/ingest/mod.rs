//! Frame ingestion sources.
//!
//! This module provides different sources for decoded frames:
//! - HTTP JPEG/MJPEG cameras (ESP32-CAM style firmware)
//! - Synthetic source (testing)
//!
//! Sources are responsible for:
//! - Bounding each acquisition with a short timeout
//! - Decoding to RGB8 in memory
//! - Turning every failure into an absent frame (logged, never raised)
//!
//! Sources MUST NOT retry internally. The control loop retries by asking again
//! on its next iteration.

pub mod http;
pub mod synthetic;

pub use http::{HttpSnapshotSource, HttpSourceConfig};
pub use synthetic::{Acquisition, SyntheticSource};

use crate::frame::Frame;

/// Acquisition counters reported in the loop's health line.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SourceStats {
    pub frames_captured: u64,
    pub failures: u64,
    pub source: String,
}

/// Anything that can hand the control loop one frame per call.
pub trait FrameSource {
    /// Acquire one frame, or `None` when acquisition failed this time.
    fn get_frame(&mut self) -> Option<Frame>;

    fn stats(&self) -> SourceStats;

    /// Whether the most recent acquisitions are succeeding.
    fn is_healthy(&self) -> bool;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn get_frame(&mut self) -> Option<Frame> {
        (**self).get_frame()
    }

    fn stats(&self) -> SourceStats {
        (**self).stats()
    }

    fn is_healthy(&self) -> bool {
        (**self).is_healthy()
    }
}
