//! HTTP camera frame source.
//!
//! This module provides `HttpSnapshotSource` for ingesting frames from network
//! cameras (ESP32-CAM style firmware) that serve JPEG over HTTP.
//!
//! Each `get_frame` call performs one bounded GET:
//! - `image/jpeg` bodies are decoded whole
//! - `multipart/*` (MJPEG) bodies are read until the first complete JPEG
//!
//! Failures never escape: they are logged and reported as an absent frame so
//! the control loop can retry on its next iteration.

use std::io::Read;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use url::Url;

use super::{FrameSource, SourceStats};
use crate::frame::Frame;

const MAX_JPEG_BYTES: usize = 5 * 1024 * 1024;

/// Configuration for an HTTP camera source.
#[derive(Clone, Debug)]
pub struct HttpSourceConfig {
    /// Snapshot or stream URL (http:// or https://).
    pub url: String,
    /// Upper bound on one acquisition, including body read.
    pub timeout: Duration,
}

impl Default for HttpSourceConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:81/capture".to_string(),
            timeout: Duration::from_secs(2),
        }
    }
}

pub struct HttpSnapshotSource {
    config: HttpSourceConfig,
    agent: ureq::Agent,
    last_frame_at: Option<Instant>,
    frame_count: u64,
    failure_count: u64,
    last_error: Option<String>,
}

impl HttpSnapshotSource {
    pub fn new(config: HttpSourceConfig) -> Result<Self> {
        let url = Url::parse(&config.url).context("parse camera url")?;
        match url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(anyhow!(
                    "unsupported camera scheme '{}'; expected http(s)",
                    other
                ))
            }
        }
        let agent = ureq::AgentBuilder::new().timeout(config.timeout).build();
        Ok(Self {
            config,
            agent,
            last_frame_at: None,
            frame_count: 0,
            failure_count: 0,
            last_error: None,
        })
    }

    /// Fetch and decode one frame.
    pub fn fetch(&mut self) -> Result<Frame> {
        let response = self
            .agent
            .get(&self.config.url)
            .call()
            .with_context(|| format!("fetch frame from {}", self.config.url))?;
        let multipart = response
            .header("Content-Type")
            .unwrap_or("")
            .to_ascii_lowercase()
            .contains("multipart");
        let reader = response.into_reader().take(MAX_JPEG_BYTES as u64 + 1);
        let jpeg = if multipart {
            read_first_jpeg(reader)?
        } else {
            read_whole_body(reader)?
        };
        decode_jpeg(&jpeg)
    }
}

impl FrameSource for HttpSnapshotSource {
    fn get_frame(&mut self) -> Option<Frame> {
        match self.fetch() {
            Ok(frame) => {
                self.frame_count += 1;
                self.last_frame_at = Some(Instant::now());
                self.last_error = None;
                Some(frame)
            }
            Err(e) => {
                self.failure_count += 1;
                log::warn!("error getting frame: {:#}", e);
                self.last_error = Some(e.to_string());
                None
            }
        }
    }

    fn is_healthy(&self) -> bool {
        if self.last_error.is_some() {
            return false;
        }
        self.last_frame_at
            .is_some_and(|at| at.elapsed() <= self.config.timeout.saturating_mul(3))
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            failures: self.failure_count,
            source: self.config.url.clone(),
        }
    }
}

fn read_whole_body(mut reader: impl Read) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes).context("read jpeg body")?;
    if bytes.is_empty() {
        return Err(anyhow!("empty jpeg body"));
    }
    if bytes.len() > MAX_JPEG_BYTES {
        return Err(anyhow!("jpeg body exceeds {} bytes", MAX_JPEG_BYTES));
    }
    Ok(bytes)
}

fn read_first_jpeg(mut reader: impl Read) -> Result<Vec<u8>> {
    let mut buffer = Vec::with_capacity(64 * 1024);
    let mut chunk = vec![0u8; 8192];
    let mut scan = JpegScan::default();
    loop {
        if let Some((start, end)) = scan.advance(&buffer) {
            buffer.truncate(end);
            return Ok(buffer.split_off(start));
        }
        let read = reader.read(&mut chunk).context("read mjpeg chunk")?;
        if read == 0 {
            return Err(anyhow!("mjpeg stream ended before a complete frame"));
        }
        buffer.extend_from_slice(&chunk[..read]);
    }
}

fn decode_jpeg(bytes: &[u8]) -> Result<Frame> {
    let image = image::load_from_memory(bytes).context("decode jpeg")?;
    Ok(Frame::new(image.into_rgb8()))
}

/// Incremental search for the first SOI..EOI span of a growing buffer.
///
/// Each call resumes where the previous one stopped, so every byte is
/// examined a bounded number of times however the body is chunked.
#[derive(Debug, Default)]
struct JpegScan {
    start: Option<usize>,
    cursor: usize,
}

impl JpegScan {
    fn advance(&mut self, buffer: &[u8]) -> Option<(usize, usize)> {
        let start = match self.start {
            Some(start) => start,
            None => match find_marker(buffer, self.cursor, 0xD8) {
                Some(start) => {
                    self.start = Some(start);
                    self.cursor = start + 2;
                    start
                }
                None => {
                    // Keep a trailing 0xFF in range for the next call.
                    self.cursor = buffer.len().saturating_sub(1);
                    return None;
                }
            },
        };
        match find_marker(buffer, self.cursor, 0xD9) {
            Some(eoi) => Some((start, eoi + 2)),
            None => {
                self.cursor = buffer.len().saturating_sub(1).max(start + 2);
                None
            }
        }
    }
}

fn find_marker(buffer: &[u8], from: usize, marker: u8) -> Option<usize> {
    buffer
        .get(from..)?
        .windows(2)
        .position(|w| w == [0xFF, marker])
        .map(|pos| from + pos)
}
