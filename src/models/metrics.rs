// Aggregate movement metrics for one analyzed video

use serde::{Deserialize, Serialize};

/// Body side that moved the most over a video
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DominantLimb {
    Left,
    Right,
}

impl DominantLimb {
    /// Ties go to the right side.
    pub fn from_displacements(left: f64, right: f64) -> Self {
        if left > right {
            DominantLimb::Left
        } else {
            DominantLimb::Right
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DominantLimb::Left => "left",
            DominantLimb::Right => "right",
        }
    }
}

/// Final metrics of a pipeline run.
///
/// Serializes to the same JSON object the upload endpoint returns, with
/// `dominant_limb` as `null` when no displacement was sampled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub frames_processed: u64,
    pub frames_with_pose: u64,
    pub avg_movement_intensity: f64,
    pub dominant_limb: Option<DominantLimb>,
}

/// Round to a fixed number of decimal places.
///
/// Goes through the formatter, which rounds the exact binary value with ties
/// to even, so results do not pick up error from scaling by a power of ten.
pub fn round_to(value: f64, decimals: usize) -> f64 {
    format!("{:.*}", decimals, value).parse().unwrap_or(value)
}
