pub mod core;
pub mod models;
pub mod platform;

pub use core::config::AnalyzerConfig;
pub use core::pipeline::{PipelineError, VideoAnnotator};
pub use models::metrics::{DominantLimb, Metrics};
pub use models::video::ProcessOutput;
pub use platform::pose::{DefaultPoseBackend, NullBackend, PoseBackend, PoseSession};
