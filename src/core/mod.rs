pub mod config;
pub mod ffmpeg_wrapper;
pub mod video_encoder;

// Frame annotation and movement analysis
pub mod overlay;
pub mod movement;
pub mod pipeline;
