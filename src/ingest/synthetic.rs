use std::collections::VecDeque;

use super::{FrameSource, SourceStats};
use crate::frame::Frame;

/// Outcome of one scripted acquisition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Acquisition {
    Frame,
    Failure,
}

/// Synthetic frame source for tests and offline runs.
///
/// Produces flat gradient frames of a fixed size. A script of acquisition
/// outcomes can be queued; once it is exhausted every call yields a frame.
pub struct SyntheticSource {
    width: u32,
    height: u32,
    script: VecDeque<Acquisition>,
    frame_count: u64,
    failure_count: u64,
    last_failed: bool,
}

impl SyntheticSource {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            script: VecDeque::new(),
            frame_count: 0,
            failure_count: 0,
            last_failed: false,
        }
    }

    pub fn with_script<I>(mut self, script: I) -> Self
    where
        I: IntoIterator<Item = Acquisition>,
    {
        self.script.extend(script);
        self
    }

    fn synthesize(&self) -> Frame {
        let shade = (self.frame_count % 256) as u8;
        let width = self.width.max(1);
        let image = image::RgbImage::from_fn(width, self.height.max(1), |x, _| {
            image::Rgb([shade, (x * 255 / width) as u8, 128])
        });
        Frame::new(image)
    }
}

impl FrameSource for SyntheticSource {
    fn get_frame(&mut self) -> Option<Frame> {
        match self.script.pop_front().unwrap_or(Acquisition::Frame) {
            Acquisition::Frame => {
                let frame = self.synthesize();
                self.frame_count += 1;
                self.last_failed = false;
                Some(frame)
            }
            Acquisition::Failure => {
                self.failure_count += 1;
                self.last_failed = true;
                log::warn!("error getting frame: synthetic acquisition failure");
                None
            }
        }
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            failures: self.failure_count,
            source: format!("synthetic {}x{}", self.width, self.height),
        }
    }

    fn is_healthy(&self) -> bool {
        !self.last_failed
    }
}
