use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::control::PolicyThresholds;
use crate::instruction::WireFormat;

const DEFAULT_STREAM_URL: &str = "http://127.0.0.1:81/capture";
const DEFAULT_COMMAND_URL: &str = "http://127.0.0.1:80/command";
const DEFAULT_LABELS_PATH: &str = "utils/coco.txt";
const DEFAULT_MODEL_PATH: &str = "weights/yolov8n.onnx";
const DEFAULT_CONFIDENCE: f32 = 0.5;
const DEFAULT_MODEL_INPUT: u32 = 640;
const DEFAULT_FRAME_TIMEOUT_MS: u64 = 2_000;
const DEFAULT_DISPATCH_TIMEOUT_MS: u64 = 100;
const DEFAULT_SNAPSHOT_EVERY: u64 = 1;

#[derive(Debug, Deserialize, Default)]
struct PilotConfigFile {
    stream: Option<StreamConfigFile>,
    command: Option<CommandConfigFile>,
    detector: Option<DetectorConfigFile>,
    labels_path: Option<PathBuf>,
    policy: Option<PolicyConfigFile>,
    snapshot: Option<SnapshotConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct StreamConfigFile {
    url: Option<String>,
    timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct CommandConfigFile {
    url: Option<String>,
    timeout_ms: Option<u64>,
    wire_format: Option<WireFormat>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    model_path: Option<PathBuf>,
    confidence: Option<f32>,
    input_width: Option<u32>,
    input_height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct PolicyConfigFile {
    reference_width: Option<u32>,
    servo_left: Option<u32>,
    servo_right: Option<u32>,
    motor_left: Option<u32>,
    motor_right: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct SnapshotConfigFile {
    path: Option<PathBuf>,
    every: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct PilotConfig {
    pub stream: StreamSettings,
    pub command: CommandSettings,
    pub detector: DetectorSettings,
    pub labels_path: PathBuf,
    pub policy: PolicyThresholds,
    pub snapshot: Option<SnapshotSettings>,
}

#[derive(Debug, Clone)]
pub struct StreamSettings {
    pub url: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct CommandSettings {
    pub url: String,
    pub timeout: Duration,
    pub wire_format: WireFormat,
}

#[derive(Debug, Clone)]
pub struct DetectorSettings {
    pub model_path: PathBuf,
    pub confidence_threshold: f32,
    pub input_width: u32,
    pub input_height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotSettings {
    pub path: PathBuf,
    pub every: u64,
}

/// Command-line overrides. `None` leaves the loaded value untouched.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub stream_url: Option<String>,
    pub command_url: Option<String>,
    pub labels_path: Option<PathBuf>,
    pub model_path: Option<PathBuf>,
    pub confidence: Option<f32>,
    pub wire_format: Option<WireFormat>,
    pub snapshot_path: Option<PathBuf>,
    pub snapshot_every: Option<u64>,
}

impl Default for PilotConfig {
    fn default() -> Self {
        Self::from_file(PilotConfigFile::default())
    }
}

impl PilotConfig {
    /// Load from `PILOT_CONFIG` (JSON, or TOML by extension), then apply
    /// `PILOT_*` environment overrides, then validate.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("PILOT_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: PilotConfigFile) -> Self {
        let stream = file.stream.unwrap_or_default();
        let command = file.command.unwrap_or_default();
        let detector = file.detector.unwrap_or_default();
        let policy_file = file.policy.unwrap_or_default();
        let policy_defaults = PolicyThresholds::default();

        let snapshot = file.snapshot.and_then(|snapshot| {
            snapshot.path.map(|path| SnapshotSettings {
                path,
                every: snapshot.every.unwrap_or(DEFAULT_SNAPSHOT_EVERY),
            })
        });

        Self {
            stream: StreamSettings {
                url: stream
                    .url
                    .unwrap_or_else(|| DEFAULT_STREAM_URL.to_string()),
                timeout: Duration::from_millis(
                    stream.timeout_ms.unwrap_or(DEFAULT_FRAME_TIMEOUT_MS),
                ),
            },
            command: CommandSettings {
                url: command
                    .url
                    .unwrap_or_else(|| DEFAULT_COMMAND_URL.to_string()),
                timeout: Duration::from_millis(
                    command.timeout_ms.unwrap_or(DEFAULT_DISPATCH_TIMEOUT_MS),
                ),
                wire_format: command.wire_format.unwrap_or_default(),
            },
            detector: DetectorSettings {
                model_path: detector
                    .model_path
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH)),
                confidence_threshold: detector.confidence.unwrap_or(DEFAULT_CONFIDENCE),
                input_width: detector.input_width.unwrap_or(DEFAULT_MODEL_INPUT),
                input_height: detector.input_height.unwrap_or(DEFAULT_MODEL_INPUT),
            },
            labels_path: file
                .labels_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LABELS_PATH)),
            policy: PolicyThresholds {
                reference_width: policy_file
                    .reference_width
                    .unwrap_or(policy_defaults.reference_width),
                servo_left: policy_file.servo_left.unwrap_or(policy_defaults.servo_left),
                servo_right: policy_file
                    .servo_right
                    .unwrap_or(policy_defaults.servo_right),
                motor_left: policy_file.motor_left.unwrap_or(policy_defaults.motor_left),
                motor_right: policy_file
                    .motor_right
                    .unwrap_or(policy_defaults.motor_right),
            },
            snapshot,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(url) = env_nonempty("PILOT_STREAM_URL") {
            self.stream.url = url;
        }
        if let Some(url) = env_nonempty("PILOT_COMMAND_URL") {
            self.command.url = url;
        }
        if let Some(path) = env_nonempty("PILOT_LABELS_PATH") {
            self.labels_path = PathBuf::from(path);
        }
        if let Some(path) = env_nonempty("PILOT_MODEL_PATH") {
            self.detector.model_path = PathBuf::from(path);
        }
        if let Some(confidence) = env_nonempty("PILOT_CONFIDENCE") {
            self.detector.confidence_threshold = confidence
                .parse()
                .map_err(|_| anyhow!("PILOT_CONFIDENCE must be a number between 0 and 1"))?;
        }
        if let Some(ms) = env_nonempty("PILOT_FRAME_TIMEOUT_MS") {
            let ms: u64 = ms.parse().map_err(|_| {
                anyhow!("PILOT_FRAME_TIMEOUT_MS must be an integer number of milliseconds")
            })?;
            self.stream.timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = env_nonempty("PILOT_DISPATCH_TIMEOUT_MS") {
            let ms: u64 = ms.parse().map_err(|_| {
                anyhow!("PILOT_DISPATCH_TIMEOUT_MS must be an integer number of milliseconds")
            })?;
            self.command.timeout = Duration::from_millis(ms);
        }
        if let Some(format) = env_nonempty("PILOT_WIRE_FORMAT") {
            self.command.wire_format = format.parse()?;
        }
        if let Some(path) = env_nonempty("PILOT_SNAPSHOT_PATH") {
            let every = self
                .snapshot
                .as_ref()
                .map(|s| s.every)
                .unwrap_or(DEFAULT_SNAPSHOT_EVERY);
            self.snapshot = Some(SnapshotSettings {
                path: PathBuf::from(path),
                every,
            });
        }
        Ok(())
    }

    /// Apply command-line overrides on top of file and environment values.
    ///
    /// The snapshot path and interval override independently: an interval
    /// alone retunes the configured snapshot, a path alone keeps the
    /// configured interval.
    pub fn apply_overrides(&mut self, overrides: &CliOverrides) {
        if let Some(url) = &overrides.stream_url {
            self.stream.url = url.clone();
        }
        if let Some(url) = &overrides.command_url {
            self.command.url = url.clone();
        }
        if let Some(path) = &overrides.labels_path {
            self.labels_path = path.clone();
        }
        if let Some(path) = &overrides.model_path {
            self.detector.model_path = path.clone();
        }
        if let Some(confidence) = overrides.confidence {
            self.detector.confidence_threshold = confidence;
        }
        if let Some(format) = overrides.wire_format {
            self.command.wire_format = format;
        }

        let configured = self.snapshot.take();
        let path = overrides
            .snapshot_path
            .clone()
            .or_else(|| configured.as_ref().map(|s| s.path.clone()));
        self.snapshot = match path {
            Some(path) => Some(SnapshotSettings {
                path,
                every: overrides
                    .snapshot_every
                    .or(configured.as_ref().map(|s| s.every))
                    .unwrap_or(DEFAULT_SNAPSHOT_EVERY),
            }),
            None => {
                if overrides.snapshot_every.is_some() {
                    log::warn!("snapshot interval given without a snapshot path; ignoring it");
                }
                None
            }
        };
    }

    pub fn validate(&self) -> Result<()> {
        validate_http_url("stream url", &self.stream.url)?;
        validate_http_url("command url", &self.command.url)?;
        if !(0.0..=1.0).contains(&self.detector.confidence_threshold) {
            return Err(anyhow!(
                "confidence threshold {} must be within [0, 1]",
                self.detector.confidence_threshold
            ));
        }
        if self.detector.input_width == 0 || self.detector.input_height == 0 {
            return Err(anyhow!("detector input size must be non-zero"));
        }
        if self.stream.timeout.is_zero() {
            return Err(anyhow!("frame timeout must be greater than zero"));
        }
        if self.command.timeout.is_zero() {
            return Err(anyhow!("dispatch timeout must be greater than zero"));
        }
        if let Some(snapshot) = &self.snapshot {
            if snapshot.every == 0 {
                return Err(anyhow!("snapshot interval must be at least one frame"));
            }
        }
        self.policy.validate()
    }
}

fn read_config_file(path: &Path) -> Result<PilotConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn validate_http_url(what: &str, raw: &str) -> Result<()> {
    let url = Url::parse(raw).map_err(|e| anyhow!("invalid {} '{}': {}", what, raw, e))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(anyhow!(
            "{} '{}' uses unsupported scheme '{}'",
            what,
            raw,
            other
        )),
    }
}
