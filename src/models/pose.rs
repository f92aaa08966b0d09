// Data models for single-person 2D pose estimation

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ==============================================================================
// Keypoints
// ==============================================================================

/// A 2D landmark in normalized image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint2D {
    pub x: f32, // Normalized [0, 1] across the frame width
    pub y: f32, // Normalized [0, 1] across the frame height
}

impl Keypoint2D {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance in normalized space
    pub fn distance_to(&self, other: &Keypoint2D) -> f64 {
        let dx = self.x as f64 - other.x as f64;
        let dy = self.y as f64 - other.y as f64;
        (dx * dx + dy * dy).sqrt()
    }

    /// Pixel position for a frame of the given size
    pub fn to_pixel(&self, width: u32, height: u32) -> (f32, f32) {
        (self.x * width as f32, self.y * height as f32)
    }
}

/// Ordered landmarks of one detected pose in one frame.
///
/// The position of a keypoint in the set is its landmark identity, as defined
/// by the model (see [`BodyLandmark`] for the 33-point topology).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeypointSet(Vec<Keypoint2D>);

impl KeypointSet {
    pub fn new(keypoints: Vec<Keypoint2D>) -> Self {
        Self(keypoints)
    }

    pub fn from_pairs(pairs: &[(f32, f32)]) -> Self {
        Self(pairs.iter().map(|&(x, y)| Keypoint2D::new(x, y)).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Keypoint2D> {
        self.0.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Keypoint2D> {
        self.0.iter()
    }

    /// Per-landmark displacement from `previous` to `self`.
    ///
    /// Returns `None` when the two sets do not have the same landmark count.
    pub fn displacements_from(&self, previous: &KeypointSet) -> Option<Vec<f64>> {
        if self.len() != previous.len() {
            return None;
        }

        Some(
            self.0
                .iter()
                .zip(previous.0.iter())
                .map(|(current, prev)| current.distance_to(prev))
                .collect(),
        )
    }
}

/// Outcome of running the estimator on one frame
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FrameResult {
    pub keypoints: Option<KeypointSet>,
}

impl FrameResult {
    pub fn no_pose() -> Self {
        Self { keypoints: None }
    }

    pub fn with_pose(keypoints: KeypointSet) -> Self {
        Self {
            keypoints: Some(keypoints),
        }
    }

    pub fn has_pose(&self) -> bool {
        self.keypoints.is_some()
    }
}

// ==============================================================================
// Body topology (33 keypoints)
// ==============================================================================

/// MediaPipe Pose Landmark indices (33 total)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BodyLandmark {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

impl BodyLandmark {
    pub fn index(self) -> usize {
        self as usize
    }
}

pub const BODY_LANDMARK_COUNT: usize = 33;

/// Left-side limb joints used for dominant limb scoring
pub const LEFT_LIMB_LANDMARKS: [BodyLandmark; 6] = [
    BodyLandmark::LeftShoulder,
    BodyLandmark::LeftElbow,
    BodyLandmark::LeftWrist,
    BodyLandmark::LeftHip,
    BodyLandmark::LeftKnee,
    BodyLandmark::LeftAnkle,
];

/// Right-side limb joints used for dominant limb scoring
pub const RIGHT_LIMB_LANDMARKS: [BodyLandmark; 6] = [
    BodyLandmark::RightShoulder,
    BodyLandmark::RightElbow,
    BodyLandmark::RightWrist,
    BodyLandmark::RightHip,
    BodyLandmark::RightKnee,
    BodyLandmark::RightAnkle,
];

/// Connectivity graph of the 33-point body model (pairs of landmark indices)
pub const POSE_CONNECTIONS: [(usize, usize); 35] = [
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 7),
    (0, 4),
    (4, 5),
    (5, 6),
    (6, 8),
    (9, 10),
    (11, 12), // shoulders
    (11, 13),
    (13, 15),
    (15, 17),
    (15, 19),
    (15, 21),
    (17, 19),
    (12, 14),
    (14, 16),
    (16, 18),
    (16, 20),
    (16, 22),
    (18, 20),
    (11, 23),
    (12, 24),
    (23, 24), // hips
    (23, 25),
    (24, 26),
    (25, 27),
    (26, 28),
    (27, 29),
    (28, 30),
    (29, 31),
    (30, 32),
    (27, 31),
    (28, 32),
];

/// Landmark count and connectivity supplied by an estimator backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Skeleton {
    pub landmark_count: usize,
    pub connections: &'static [(usize, usize)],
}

impl Skeleton {
    pub const fn body() -> Self {
        Self {
            landmark_count: BODY_LANDMARK_COUNT,
            connections: &POSE_CONNECTIONS,
        }
    }
}

// ==============================================================================
// Configuration
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EstimatorConfig {
    pub min_detection_confidence: f32,          // Minimum confidence for detection (default: 0.5)
    pub min_tracking_confidence: f32,           // Minimum confidence for tracking (default: 0.5)
    pub model_complexity: ModelComplexity,      // Model complexity (0=lite, 1=full, 2=heavy)
    pub model_path: Option<PathBuf>,            // Landmark model for native backends
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelComplexity {
    Lite = 0,   // Fastest, less accurate
    Full = 1,   // Balanced
    Heavy = 2,  // Slowest, most accurate
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            min_detection_confidence: 0.5,
            min_tracking_confidence: 0.5,
            model_complexity: ModelComplexity::Full,
            model_path: None,
        }
    }
}

impl EstimatorConfig {
    pub fn validate(&self) -> PoseResult<()> {
        for (name, value) in [
            ("min_detection_confidence", self.min_detection_confidence),
            ("min_tracking_confidence", self.min_tracking_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(PoseError::InvalidConfig(format!(
                    "{} must be between 0.0 and 1.0, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

// ==============================================================================
// Error Types
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum PoseError {
    #[error("Pose session already closed")]
    SessionClosed,

    #[error("Model loading failed: {0}")]
    ModelLoadFailed(String),

    #[error("Inference failed: {0}")]
    InferenceFailed(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type PoseResult<T> = Result<T, PoseError>;
