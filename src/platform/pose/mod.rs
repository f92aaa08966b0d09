// Pose estimation platform integration
// Provides the MediaPipe bridge and the session guard

pub mod mediapipe_bridge;

pub use mediapipe_bridge::{
    DefaultPoseBackend, NullBackend, PoseBackend, PoseSession, SessionGuard,
};
