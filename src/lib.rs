//! Follow Pilot
//!
//! A perception-to-actuation loop for a remotely operated vehicle: frames from
//! a network camera go through an object detector, and in follow mode the
//! position of the last person detection in each frame becomes discrete
//! steering commands sent over a best-effort HTTP channel.
//!
//! # Architecture
//!
//! The loop holds to four rules:
//!
//! 1. **Never stall**: acquisition and dispatch are the only blocking points,
//!    each bounded by a short timeout and never retried.
//! 2. **Lose the target, stop the vehicle**: in follow mode a frame without a
//!    person always produces `stop`.
//! 3. **Detection mode never actuates**.
//! 4. **Nothing inside the loop is fatal**: failed frames are skipped, failed
//!    sends are dropped, only an operator quit ends the loop.
//!
//! # Module Structure
//!
//! - `ingest`: Frame sources (HTTP camera, synthetic)
//! - `detect`: Detector backends, detections, label taxonomy
//! - `control`: Mode state machine, target locator, command policy, loop
//! - `dispatch`: Best-effort instruction delivery
//! - `input`: Operator events
//! - `overlay`: Annotated operator view
//! - `config`: File + environment configuration

pub mod config;
pub mod control;
pub mod detect;
pub mod dispatch;
pub mod frame;
pub mod ingest;
pub mod input;
pub mod instruction;
pub mod overlay;

pub use config::PilotConfig;
pub use control::{
    locate_target, AnchorPoint, CommandPolicy, ControlLoop, FollowSubMode, IterationReport,
    LoopStats, Mode, ModeMachine, PolicyThresholds, StopHandle, Transition, PERSON_CLASS_ID,
};
pub use detect::{BoundingBox, Detection, DetectorBackend, LabelMap, ScriptedBackend};
pub use dispatch::{
    DispatchStats, Dispatcher, HttpDispatcher, HttpDispatcherConfig, NullDispatcher,
    RecordingDispatcher,
};
pub use frame::Frame;
pub use ingest::{
    Acquisition, FrameSource, HttpSnapshotSource, HttpSourceConfig, SourceStats, SyntheticSource,
};
pub use input::{InputEvent, InputSource, ScriptedInput, StdinInput};
pub use instruction::{Instruction, WireFormat};
pub use overlay::{LogRenderer, Overlay, OverlayRenderer, SnapshotRenderer};
