// Data models for pose estimation, movement metrics, and video processing

pub mod pose;
pub mod metrics;
pub mod video;
