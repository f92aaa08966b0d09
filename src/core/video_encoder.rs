use crate::core::ffmpeg_wrapper::{FFmpegEncoder, FFmpegError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VideoEncoderError {
    #[error("FFmpeg error: {0}")]
    FFmpeg(#[from] FFmpegError),
    #[error("Invalid codec: {0}")]
    InvalidCodec(String),
    #[error("Invalid quality: {0}")]
    InvalidQuality(String),
    #[error("No usable encoder among {tried:?}: {last}")]
    NoUsableEncoder { tried: Vec<String>, last: FFmpegError },
}

pub type Result<T> = std::result::Result<T, VideoEncoderError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VideoCodec {
    H264,
    Mpeg4,
}

impl VideoCodec {
    pub fn from_config(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "h264" => Ok(VideoCodec::H264),
            "mpeg4" | "mp4v" => Ok(VideoCodec::Mpeg4),
            _ => Err(VideoEncoderError::InvalidCodec(format!(
                "{}. Must be one of: h264, mpeg4",
                value
            ))),
        }
    }

    pub fn to_ffmpeg_codec_name(&self, hardware_acceleration: bool, platform: &str) -> String {
        match self {
            VideoCodec::H264 => {
                if hardware_acceleration {
                    match platform {
                        "macos" => "h264_videotoolbox".to_string(),
                        "windows" => "h264_nvenc".to_string(), // Could also try h264_qsv
                        "linux" => "h264_vaapi".to_string(),   // Could also try h264_nvenc
                        _ => "libx264".to_string(),
                    }
                } else {
                    "libx264".to_string()
                }
            }
            VideoCodec::Mpeg4 => "mpeg4".to_string(),
        }
    }

    pub fn software_fallback_name(&self) -> &'static str {
        match self {
            VideoCodec::H264 => "libx264",
            VideoCodec::Mpeg4 => "mpeg4",
        }
    }

    /// Encoder names to try in order, most preferred first
    pub fn candidate_encoders(&self, hardware_acceleration: bool, platform: &str) -> Vec<String> {
        let mut names = vec![self.to_ffmpeg_codec_name(hardware_acceleration, platform)];
        for fallback in [self.software_fallback_name(), "mpeg4"] {
            if !names.iter().any(|name| name == fallback) {
                names.push(fallback.to_string());
            }
        }
        names
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompressionQuality {
    High,   // CRF 18-23
    Medium, // CRF 23-28 (default)
    Low,    // CRF 28-35
}

impl CompressionQuality {
    pub fn from_config(value: &str) -> Result<Self> {
        match value {
            "High" => Ok(CompressionQuality::High),
            "Medium" => Ok(CompressionQuality::Medium),
            "Low" => Ok(CompressionQuality::Low),
            _ => Err(VideoEncoderError::InvalidQuality(format!(
                "{}. Must be one of: High, Medium, Low",
                value
            ))),
        }
    }

    pub fn to_crf(&self) -> u32 {
        match self {
            CompressionQuality::High => 20,
            CompressionQuality::Medium => 25,
            CompressionQuality::Low => 30,
        }
    }
}

/// Picks an encoder for the output file, falling back to software codecs
pub struct VideoEncoder {
    codec: VideoCodec,
    quality: CompressionQuality,
    hardware_acceleration: bool,
    platform: String,
}

impl VideoEncoder {
    pub fn new(
        codec: VideoCodec,
        quality: CompressionQuality,
        hardware_acceleration: bool,
    ) -> Self {
        let platform = if cfg!(target_os = "macos") {
            "macos"
        } else if cfg!(target_os = "windows") {
            "windows"
        } else if cfg!(target_os = "linux") {
            "linux"
        } else {
            "unknown"
        };

        Self {
            codec,
            quality,
            hardware_acceleration,
            platform: platform.to_string(),
        }
    }

    /// Open the first encoder that accepts this output.
    ///
    /// Returns the encoder together with the FFmpeg codec name that opened.
    pub fn open(
        &self,
        output_path: &Path,
        width: u32,
        height: u32,
        fps: f64,
    ) -> Result<(FFmpegEncoder, String)> {
        let candidates = self
            .codec
            .candidate_encoders(self.hardware_acceleration, &self.platform);
        let crf = self.quality.to_crf();

        let mut last_error = None;
        for name in &candidates {
            match FFmpegEncoder::new(output_path, width, height, fps, name, crf) {
                Ok(encoder) => return Ok((encoder, name.clone())),
                Err(e) => {
                    tracing::warn!("Encoder {} unavailable: {}", name, e);
                    last_error = Some(e);
                }
            }
        }

        Err(VideoEncoderError::NoUsableEncoder {
            tried: candidates,
            last: last_error.unwrap_or_else(|| FFmpegError::CodecNotFound("none".to_string())),
        })
    }
}
