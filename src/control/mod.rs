//! Decision core: mode state machine, target locator, command policy and
//! the loop that drives them.

mod locator;
mod mode;
mod policy;
mod runner;

pub use locator::{locate_target, AnchorPoint, PERSON_CLASS_ID};
pub use mode::{FollowSubMode, Mode, ModeMachine, Transition};
pub use policy::{CommandPolicy, PolicyThresholds, REFERENCE_FRAME_WIDTH};
pub use runner::{ControlLoop, IterationReport, LoopStats, StopHandle};
