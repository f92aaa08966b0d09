// Data structures for decoded video streams and pipeline output

use super::metrics::Metrics;
use serde::{Deserialize, Serialize};

/// Frame rate used when a source does not report a usable one
pub const FALLBACK_FPS: f64 = 30.0;

/// Properties of an opened input stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    /// Reported frame rate, `None` when zero, negative or unreadable
    pub frame_rate: Option<f64>,
    /// Expected number of frames, 0 when the container does not say
    pub frame_count: u64,
}

impl VideoInfo {
    pub fn frame_rate_or(&self, fallback: f64) -> f64 {
        self.frame_rate.unwrap_or(fallback)
    }
}

/// Keep only rates that can time an output stream
pub fn usable_frame_rate(rate: f64) -> Option<f64> {
    if rate.is_finite() && rate > 0.0 {
        Some(rate)
    } else {
        None
    }
}

/// Result of one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessOutput {
    pub frames_written: u64,
    pub output_frame_rate: f64,
    pub metrics: Metrics,
}
