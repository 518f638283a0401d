mod backend;
mod backends;
mod labels;
pub mod postprocess;
mod result;

pub use backend::DetectorBackend;
pub use backends::ScriptedBackend;
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use labels::{LabelMap, UNKNOWN_LABEL};
pub use result::{BoundingBox, Detection};
