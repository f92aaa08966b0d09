use crate::core::overlay::OverlayStyle;
use crate::core::video_encoder::{CompressionQuality, VideoCodec};
use crate::models::pose::{EstimatorConfig, ModelComplexity};
use crate::models::video::FALLBACK_FPS;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Analyzer configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Skeleton and frame counter drawing style
    pub overlay: OverlayStyle,
    /// TrueType font for the frame counter
    pub font_path: PathBuf,
    /// Minimum confidence for a pose detection (0.0-1.0)
    pub min_detection_confidence: f32,
    /// Minimum confidence to keep tracking a pose (0.0-1.0)
    pub min_tracking_confidence: f32,
    /// Estimator model size
    pub model_complexity: ModelComplexity,
    /// Landmark model used by the ONNX backend
    pub model_path: Option<PathBuf>,
    /// Video codec to use: "h264" or "mpeg4"
    pub video_codec: String,
    /// Video compression quality: "High", "Medium", or "Low"
    pub video_quality: String,
    /// Try a hardware encoder before the software ones
    pub hardware_acceleration: bool,
    /// Output frame rate when the source reports none
    pub fallback_fps: f64,
    /// Frame cap applied by callers that do not pass one
    pub default_max_frames: u32,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            overlay: OverlayStyle::default(),
            font_path: PathBuf::from("/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf"),
            min_detection_confidence: 0.5,
            min_tracking_confidence: 0.5,
            model_complexity: ModelComplexity::Full,
            model_path: None,
            video_codec: "h264".to_string(),
            video_quality: "Medium".to_string(),
            hardware_acceleration: false,
            fallback_fps: FALLBACK_FPS,
            default_max_frames: 300,
        }
    }
}

impl AnalyzerConfig {
    /// Load configuration from file, creating with defaults if it doesn't exist
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = Self::get_config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            // Create default config and save it
            let config = Self::default();
            config.save()?;
            Ok(config)
        }
    }

    /// Load and validate configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)?;
        let config: AnalyzerConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        let config_path = Self::get_config_path()?;
        self.save_to(&config_path)
    }

    /// Save configuration to an explicit path
    pub fn save_to(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        self.validate()?;

        // Create parent directories if they don't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Serialize and write to file with pretty formatting
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.overlay.validate()?;
        self.estimator().validate()?;

        VideoCodec::from_config(&self.video_codec)?;
        CompressionQuality::from_config(&self.video_quality)?;

        if !(self.fallback_fps.is_finite() && self.fallback_fps > 0.0) {
            return Err(format!(
                "Invalid fallback FPS: {}. Must be greater than 0",
                self.fallback_fps
            )
            .into());
        }

        if self.default_max_frames == 0 {
            return Err("Default max frames must be at least 1".into());
        }

        Ok(())
    }

    /// Reset to default configuration
    pub fn reset() -> Result<Self, Box<dyn std::error::Error>> {
        let config = Self::default();
        config.save()?;
        Ok(config)
    }

    /// Settings handed to the pose estimator
    pub fn estimator(&self) -> EstimatorConfig {
        EstimatorConfig {
            min_detection_confidence: self.min_detection_confidence,
            min_tracking_confidence: self.min_tracking_confidence,
            model_complexity: self.model_complexity,
            model_path: self.model_path.clone(),
        }
    }

    /// Get the configuration file path
    fn get_config_path() -> Result<PathBuf, Box<dyn std::error::Error>> {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .map_err(|_| "Could not determine home directory")?;

        let mut path = PathBuf::from(home);
        path.push(".dance_analyzer");
        path.push("config");
        path.push("settings.json");

        Ok(path)
    }
}
