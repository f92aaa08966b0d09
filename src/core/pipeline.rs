// Video annotation pipeline
// Decodes a video, runs the pose estimator on every frame, draws the skeleton
// and frame counter, re-encodes the result and derives movement metrics.

use crate::core::config::AnalyzerConfig;
use crate::core::ffmpeg_wrapper::{FFmpegDecoder, FFmpegError};
use crate::core::movement::MovementAccumulator;
use crate::core::overlay::{draw_skeleton, frame_label, FrameLabeler};
use crate::core::video_encoder::{CompressionQuality, VideoCodec, VideoEncoder};
use crate::models::pose::PoseError;
use crate::models::video::{usable_frame_rate, ProcessOutput};
use crate::platform::pose::{PoseBackend, SessionGuard};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Input video not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to open video: {0}")]
    Open(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Pose inference failed: {0}")]
    Inference(#[from] PoseError),

    #[error("Video processing failed: {0}")]
    Video(#[from] FFmpegError),

    #[error("Task join error: {0}")]
    TaskFailed(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Annotates dance videos with the detected skeleton and reports movement metrics
#[derive(Clone)]
pub struct VideoAnnotator {
    backend: Arc<dyn PoseBackend>,
    config: AnalyzerConfig,
}

impl VideoAnnotator {
    pub fn new(backend: Arc<dyn PoseBackend>, config: AnalyzerConfig) -> Self {
        Self { backend, config }
    }

    /// Annotate `input_path` into `output_path`.
    ///
    /// * `target_fps` - Output frame rate; the source rate is used when absent or not positive
    /// * `max_frames` - Stop after this many frames; must be at least 1
    ///
    /// Decoder, estimator session and encoder are released on every return path.
    pub fn process(
        &self,
        input_path: &Path,
        output_path: &Path,
        target_fps: Option<f64>,
        max_frames: Option<u32>,
    ) -> Result<ProcessOutput> {
        if max_frames == Some(0) {
            return Err(PipelineError::InvalidArgument(
                "max_frames must be at least 1".to_string(),
            ));
        }

        if !input_path.is_file() {
            return Err(PipelineError::NotFound(input_path.to_path_buf()));
        }

        let codec = VideoCodec::from_config(&self.config.video_codec)
            .map_err(|e| PipelineError::InvalidArgument(e.to_string()))?;
        let quality = CompressionQuality::from_config(&self.config.video_quality)
            .map_err(|e| PipelineError::InvalidArgument(e.to_string()))?;

        let mut decoder = FFmpegDecoder::open(input_path)
            .map_err(|e| PipelineError::Open(format!("{}: {}", input_path.display(), e)))?;
        let info = decoder.info().clone();

        let output_fps = match target_fps.and_then(usable_frame_rate) {
            Some(fps) => fps,
            None => {
                if info.frame_rate.is_none() {
                    tracing::warn!(
                        "Source frame rate unavailable, using fallback {} fps",
                        self.config.fallback_fps
                    );
                }
                info.frame_rate_or(self.config.fallback_fps)
            }
        };

        // Setup failures are reported as Open; Inference is reserved for per-frame errors
        let session = self.backend.open(&self.config.estimator()).map_err(|e| match e {
            PoseError::ModelLoadFailed(_) | PoseError::InvalidConfig(_) => {
                PipelineError::Open(format!("pose estimator: {}", e))
            }
            other => PipelineError::Inference(other),
        })?;
        let mut session = SessionGuard::new(session);
        let skeleton = self.backend.skeleton();

        let (mut encoder, codec_name) =
            VideoEncoder::new(codec, quality, self.config.hardware_acceleration)
                .open(output_path, info.width, info.height, output_fps)
                .map_err(|e| PipelineError::Open(format!("{}: {}", output_path.display(), e)))?;

        tracing::info!(
            input = %input_path.display(),
            width = info.width,
            height = info.height,
            source_fps = ?info.frame_rate,
            output_fps,
            expected_frames = info.frame_count,
            codec = %codec_name,
            estimator = %self.backend.get_model_info(),
            "Annotating video"
        );

        let labeler = FrameLabeler::new(&self.config.font_path);
        let style = &self.config.overlay;
        let limit = max_frames.map(u64::from);

        let mut accumulator = MovementAccumulator::new();
        let mut frames_written: u64 = 0;

        while limit.map_or(true, |limit| frames_written < limit) {
            let mut frame = match decoder.next_frame()? {
                Some(frame) => frame,
                None => break,
            };

            let result = session.infer(&frame)?;
            if let Some(keypoints) = result.keypoints.as_ref() {
                draw_skeleton(&mut frame, keypoints, &skeleton, style);
            }
            accumulator = accumulator.observe(result.keypoints.as_ref());

            labeler.draw(
                &mut frame,
                &frame_label(frames_written + 1, info.frame_count),
                style,
            );

            encoder.encode_frame(&frame)?;
            frames_written += 1;
        }

        encoder.finish()?;
        session.close();

        let metrics = accumulator.finalize(frames_written);

        tracing::info!(
            output = %output_path.display(),
            frames_written,
            frames_with_pose = metrics.frames_with_pose,
            avg_movement_intensity = metrics.avg_movement_intensity,
            dominant_limb = metrics.dominant_limb.map(|limb| limb.as_str()),
            "Annotation finished"
        );

        Ok(ProcessOutput {
            frames_written,
            output_frame_rate: output_fps,
            metrics,
        })
    }

    /// Run [`VideoAnnotator::process`] on the blocking thread pool
    pub async fn process_async(
        &self,
        input_path: PathBuf,
        output_path: PathBuf,
        target_fps: Option<f64>,
        max_frames: Option<u32>,
    ) -> Result<ProcessOutput> {
        let annotator = self.clone();

        tokio::task::spawn_blocking(move || {
            annotator.process(&input_path, &output_path, target_fps, max_frames)
        })
        .await
        .map_err(|e| PipelineError::TaskFailed(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ffmpeg_wrapper::FFmpegEncoder;
    use crate::models::metrics::DominantLimb;
    use crate::models::pose::{
        EstimatorConfig, FrameResult, Keypoint2D, KeypointSet, PoseResult, Skeleton,
        BODY_LANDMARK_COUNT,
    };
    use crate::platform::pose::{NullBackend, PoseSession};
    use approx::assert_relative_eq;
    use image::{Rgb, RgbImage};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const WIDTH: u32 = 160;
    const HEIGHT: u32 = 120;

    /// Dark frames with a white square sweeping left to right
    fn write_moving_marker_video(path: &Path, frames: u32, fps: f64) {
        let mut encoder = FFmpegEncoder::new(path, WIDTH, HEIGHT, fps, "mpeg4", 25).unwrap();
        for i in 0..frames {
            let mut frame = RgbImage::from_pixel(WIDTH, HEIGHT, Rgb([20, 20, 20]));
            let left = 10 + i * 8;
            for y in 50..70 {
                for x in left..(left + 20).min(WIDTH) {
                    frame.put_pixel(x, y, Rgb([255, 255, 255]));
                }
            }
            encoder.encode_frame(&frame).unwrap();
        }
        encoder.finish().unwrap();
    }

    fn test_config() -> AnalyzerConfig {
        AnalyzerConfig {
            video_codec: "mpeg4".to_string(),
            font_path: PathBuf::from("/nonexistent/font.ttf"),
            ..AnalyzerConfig::default()
        }
    }

    /// Reports a pose on every `detect_every`-th frame, drifting right each call
    struct ScriptedBackend {
        detect_every: usize,
        fail_at: Option<usize>,
        closes: Arc<AtomicUsize>,
    }

    impl ScriptedBackend {
        fn new(detect_every: usize) -> Self {
            Self {
                detect_every,
                fail_at: None,
                closes: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    struct ScriptedSession {
        calls: usize,
        detect_every: usize,
        fail_at: Option<usize>,
        closes: Arc<AtomicUsize>,
        closed: bool,
    }

    impl PoseBackend for ScriptedBackend {
        fn open(&self, _config: &EstimatorConfig) -> PoseResult<Box<dyn PoseSession>> {
            Ok(Box::new(ScriptedSession {
                calls: 0,
                detect_every: self.detect_every,
                fail_at: self.fail_at,
                closes: self.closes.clone(),
                closed: false,
            }))
        }

        fn skeleton(&self) -> Skeleton {
            Skeleton::body()
        }

        fn get_model_info(&self) -> String {
            "scripted".to_string()
        }
    }

    impl PoseSession for ScriptedSession {
        fn infer(&mut self, _frame: &RgbImage) -> PoseResult<FrameResult> {
            if self.closed {
                return Err(PoseError::SessionClosed);
            }
            self.calls += 1;
            if self.fail_at == Some(self.calls) {
                return Err(PoseError::InferenceFailed("scripted failure".to_string()));
            }
            if self.calls % self.detect_every != 0 {
                return Ok(FrameResult::no_pose());
            }

            let x = 0.1 + 0.01 * self.calls as f32;
            Ok(FrameResult::with_pose(KeypointSet::new(vec![
                Keypoint2D::new(x, 0.5);
                BODY_LANDMARK_COUNT
            ])))
        }

        fn close(&mut self) {
            if !self.closed {
                self.closed = true;
                self.closes.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    #[test]
    fn test_annotates_every_frame_at_target_rate() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.mp4");
        let output = dir.path().join("output.mp4");
        write_moving_marker_video(&input, 15, 10.0);

        let backend = Arc::new(ScriptedBackend::new(1));
        let closes = backend.closes.clone();
        let annotator = VideoAnnotator::new(backend, test_config());

        let result = annotator.process(&input, &output, Some(10.0), None).unwrap();

        assert_eq!(result.frames_written, 15);
        assert_eq!(result.output_frame_rate, 10.0);
        assert_eq!(result.metrics.frames_processed, result.frames_written);
        assert_eq!(result.metrics.frames_with_pose, 15);
        assert!(result.metrics.avg_movement_intensity >= 0.0);
        assert!(result.metrics.avg_movement_intensity < 1.0);
        assert_relative_eq!(result.metrics.avg_movement_intensity, 0.01, epsilon = 1e-5);
        assert_eq!(result.metrics.dominant_limb, Some(DominantLimb::Right));
        assert_eq!(closes.load(Ordering::SeqCst), 1);

        let mut decoder = FFmpegDecoder::open(&output).unwrap();
        let info = decoder.info().clone();
        assert_eq!((info.width, info.height), (WIDTH, HEIGHT));
        assert!((info.frame_rate.unwrap() - 10.0).abs() < 1e-3);
        let mut decoded = 0;
        while decoder.next_frame().unwrap().is_some() {
            decoded += 1;
        }
        assert_eq!(decoded, 15);
    }

    #[test]
    fn test_source_rate_used_without_target() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.mp4");
        let output = dir.path().join("output.mp4");
        write_moving_marker_video(&input, 6, 12.0);

        let annotator = VideoAnnotator::new(Arc::new(ScriptedBackend::new(1)), test_config());

        // Non-positive targets are ignored
        let result = annotator.process(&input, &output, Some(0.0), None).unwrap();
        assert!((result.output_frame_rate - 12.0).abs() < 1e-3);
    }

    #[test]
    fn test_max_frames_caps_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.mp4");
        let output = dir.path().join("output.mp4");
        write_moving_marker_video(&input, 15, 10.0);

        let annotator = VideoAnnotator::new(Arc::new(ScriptedBackend::new(1)), test_config());
        let result = annotator.process(&input, &output, None, Some(5)).unwrap();

        assert_eq!(result.frames_written, 5);
        assert_eq!(result.metrics.frames_processed, 5);
        assert!(output.exists());
    }

    #[test]
    fn test_zero_max_frames_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.mp4");
        let output = dir.path().join("output.mp4");
        write_moving_marker_video(&input, 3, 10.0);

        let annotator = VideoAnnotator::new(Arc::new(NullBackend), test_config());
        let result = annotator.process(&input, &output, None, Some(0));

        assert!(matches!(result, Err(PipelineError::InvalidArgument(_))));
        assert!(!output.exists());
    }

    #[test]
    fn test_missing_input_creates_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("missing.mp4");
        let output = dir.path().join("output.mp4");

        let annotator = VideoAnnotator::new(Arc::new(NullBackend), test_config());
        let result = annotator.process(&input, &output, Some(10.0), None);

        assert!(matches!(result, Err(PipelineError::NotFound(_))));
        assert!(!output.exists());
    }

    #[test]
    fn test_undecodable_input_is_open_error() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("broken.mp4");
        let output = dir.path().join("output.mp4");
        std::fs::write(&input, b"not a video").unwrap();

        let annotator = VideoAnnotator::new(Arc::new(NullBackend), test_config());
        let result = annotator.process(&input, &output, None, None);

        assert!(matches!(result, Err(PipelineError::Open(_))));
    }

    #[test]
    fn test_no_poses_still_writes_every_frame() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.mp4");
        let output = dir.path().join("output.mp4");
        write_moving_marker_video(&input, 8, 10.0);

        let annotator = VideoAnnotator::new(Arc::new(NullBackend), test_config());
        let result = annotator.process(&input, &output, None, None).unwrap();

        assert_eq!(result.frames_written, 8);
        assert_eq!(result.metrics.frames_with_pose, 0);
        assert_eq!(result.metrics.avg_movement_intensity, 0.0);
        assert_eq!(result.metrics.dominant_limb, None);
        assert!(output.exists());
    }

    #[test]
    fn test_sparse_detections_keep_tracking() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.mp4");
        let output = dir.path().join("output.mp4");
        write_moving_marker_video(&input, 9, 10.0);

        // Poses on calls 3, 6 and 9, each 0.03 further right than the last
        let annotator = VideoAnnotator::new(Arc::new(ScriptedBackend::new(3)), test_config());
        let result = annotator.process(&input, &output, None, None).unwrap();

        assert_eq!(result.metrics.frames_with_pose, 3);
        assert_relative_eq!(result.metrics.avg_movement_intensity, 0.03, epsilon = 1e-5);
    }

    #[test]
    fn test_inference_failure_aborts_and_closes_session() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.mp4");
        let output = dir.path().join("output.mp4");
        write_moving_marker_video(&input, 10, 10.0);

        let backend = ScriptedBackend {
            fail_at: Some(4),
            ..ScriptedBackend::new(1)
        };
        let closes = backend.closes.clone();
        let annotator = VideoAnnotator::new(Arc::new(backend), test_config());

        let result = annotator.process(&input, &output, None, None);
        assert!(matches!(result, Err(PipelineError::Inference(_))));
        assert_eq!(closes.load(Ordering::SeqCst), 1);

        // Frames annotated before the failure are still a playable file
        let mut decoder = FFmpegDecoder::open(&output).unwrap();
        let mut decoded = 0;
        while decoder.next_frame().unwrap().is_some() {
            decoded += 1;
        }
        assert_eq!(decoded, 3);
    }

    /// Backend whose model can never be loaded
    struct UnloadableBackend;

    impl PoseBackend for UnloadableBackend {
        fn open(&self, _config: &EstimatorConfig) -> PoseResult<Box<dyn PoseSession>> {
            Err(PoseError::ModelLoadFailed("weights missing".to_string()))
        }

        fn skeleton(&self) -> Skeleton {
            Skeleton::body()
        }

        fn get_model_info(&self) -> String {
            "unloadable".to_string()
        }
    }

    #[test]
    fn test_model_load_failure_is_open_error() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.mp4");
        let output = dir.path().join("output.mp4");
        write_moving_marker_video(&input, 4, 10.0);

        let annotator = VideoAnnotator::new(Arc::new(UnloadableBackend), test_config());
        let result = annotator.process(&input, &output, None, None);

        match result {
            Err(PipelineError::Open(message)) => assert!(message.contains("weights missing")),
            other => panic!("expected Open error, got {:?}", other),
        }
        assert!(!output.exists());
    }

    #[test]
    fn test_invalid_estimator_settings_are_open_error() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.mp4");
        let output = dir.path().join("output.mp4");
        write_moving_marker_video(&input, 4, 10.0);

        let config = AnalyzerConfig {
            min_detection_confidence: 1.5,
            ..test_config()
        };
        let annotator = VideoAnnotator::new(Arc::new(NullBackend), config);
        let result = annotator.process(&input, &output, None, None);

        assert!(matches!(result, Err(PipelineError::Open(_))));
        assert!(!output.exists());
    }

    #[test]
    fn test_repeated_runs_are_identical() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.mp4");
        write_moving_marker_video(&input, 10, 10.0);

        let annotator = VideoAnnotator::new(Arc::new(ScriptedBackend::new(2)), test_config());
        let first = annotator
            .process(&input, &dir.path().join("first.mp4"), Some(10.0), None)
            .unwrap();
        let second = annotator
            .process(&input, &dir.path().join("second.mp4"), Some(10.0), None)
            .unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_process_async_matches_sync() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.mp4");
        write_moving_marker_video(&input, 7, 10.0);

        let annotator = VideoAnnotator::new(Arc::new(ScriptedBackend::new(1)), test_config());
        let sync_result = annotator
            .process(&input, &dir.path().join("sync.mp4"), Some(10.0), Some(5))
            .unwrap();
        let async_result = annotator
            .process_async(input.clone(), dir.path().join("async.mp4"), Some(10.0), Some(5))
            .await
            .unwrap();

        assert_eq!(sync_result, async_result);
        assert_eq!(async_result.frames_written, 5);
    }
}
