// MediaPipe integration bridge
// Provides an abstraction over single-person body pose models
// Can be implemented using PyO3 (Python) or ONNX Runtime (Rust native)

use crate::models::pose::{EstimatorConfig, FrameResult, PoseResult, Skeleton};
use image::RgbImage;
use std::ops::{Deref, DerefMut};

/// A loaded model that can open per-video tracking sessions
pub trait PoseBackend: Send + Sync {
    /// Load the model and start a fresh tracking session
    fn open(&self, config: &EstimatorConfig) -> PoseResult<Box<dyn PoseSession>>;

    /// Landmark count and connectivity of the poses this backend reports
    fn skeleton(&self) -> Skeleton;

    /// Get model info
    fn get_model_info(&self) -> String;
}

/// Stateful estimator session for one video.
///
/// Tracking state carries over between `infer` calls, so frames must be fed in
/// presentation order.
pub trait PoseSession {
    /// Run inference on one RGB frame
    fn infer(&mut self, frame: &RgbImage) -> PoseResult<FrameResult>;

    /// Release model resources. Safe to call more than once.
    fn close(&mut self);
}

/// Closes the wrapped session when dropped
pub struct SessionGuard {
    session: Box<dyn PoseSession>,
}

impl SessionGuard {
    pub fn new(session: Box<dyn PoseSession>) -> Self {
        Self { session }
    }
}

impl Deref for SessionGuard {
    type Target = dyn PoseSession;

    fn deref(&self) -> &Self::Target {
        self.session.as_ref()
    }
}

impl DerefMut for SessionGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.session.as_mut()
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.session.close();
    }
}

// ==============================================================================
// Null Implementation (always available)
// ==============================================================================

/// Backend that never detects a pose
#[derive(Debug, Clone, Copy, Default)]
pub struct NullBackend;

pub struct NullSession {
    closed: bool,
}

impl PoseBackend for NullBackend {
    fn open(&self, config: &EstimatorConfig) -> PoseResult<Box<dyn PoseSession>> {
        config.validate()?;
        tracing::warn!(
            "Using null pose estimator (no inference). Enable the 'ml-pyo3' or 'ml-onnx' feature for detection"
        );
        Ok(Box::new(NullSession { closed: false }))
    }

    fn skeleton(&self) -> Skeleton {
        Skeleton::body()
    }

    fn get_model_info(&self) -> String {
        "Null estimator (no ML inference)".to_string()
    }
}

impl PoseSession for NullSession {
    fn infer(&mut self, _frame: &RgbImage) -> PoseResult<FrameResult> {
        if self.closed {
            return Err(crate::models::pose::PoseError::SessionClosed);
        }
        Ok(FrameResult::no_pose())
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

// ==============================================================================
// PyO3 Implementation (Python MediaPipe)
// ==============================================================================

#[cfg(feature = "ml-pyo3")]
pub mod pyo3_backend {
    use super::*;
    use crate::models::pose::{Keypoint2D, KeypointSet, PoseError};
    use pyo3::prelude::*;
    use pyo3::types::{PyBytes, PyDict};

    /// MediaPipe Pose through the Python `mediapipe` package
    #[derive(Debug, Clone, Copy, Default)]
    pub struct PyO3MediaPipe;

    pub struct PyO3Session {
        pose: Option<Py<PyAny>>,
        numpy: Py<PyModule>,
    }

    fn load_failed(e: PyErr) -> PoseError {
        PoseError::ModelLoadFailed(e.to_string())
    }

    fn inference_failed(e: PyErr) -> PoseError {
        PoseError::InferenceFailed(e.to_string())
    }

    impl PoseBackend for PyO3MediaPipe {
        fn open(&self, config: &EstimatorConfig) -> PoseResult<Box<dyn PoseSession>> {
            config.validate()?;

            Python::with_gil(|py| {
                let mp_pose = py.import_bound("mediapipe.solutions.pose").map_err(|e| {
                    PoseError::ModelLoadFailed(format!(
                        "Failed to import mediapipe: {}. Make sure Python dependencies are installed (pip install mediapipe numpy)",
                        e
                    ))
                })?;
                let numpy = py.import_bound("numpy").map_err(load_failed)?;

                let kwargs = PyDict::new_bound(py);
                kwargs.set_item("static_image_mode", false).map_err(load_failed)?;
                kwargs
                    .set_item("model_complexity", config.model_complexity as u8)
                    .map_err(load_failed)?;
                kwargs
                    .set_item("min_detection_confidence", config.min_detection_confidence)
                    .map_err(load_failed)?;
                kwargs
                    .set_item("min_tracking_confidence", config.min_tracking_confidence)
                    .map_err(load_failed)?;

                let pose = mp_pose
                    .getattr("Pose")
                    .and_then(|class| class.call((), Some(&kwargs)))
                    .map_err(load_failed)?;

                tracing::debug!(
                    complexity = config.model_complexity as u8,
                    "MediaPipe pose session opened"
                );

                Ok(Box::new(PyO3Session {
                    pose: Some(pose.unbind()),
                    numpy: numpy.unbind(),
                }) as Box<dyn PoseSession>)
            })
        }

        fn skeleton(&self) -> Skeleton {
            Skeleton::body()
        }

        fn get_model_info(&self) -> String {
            "PyO3 MediaPipe Bridge (Python backend)".to_string()
        }
    }

    impl PoseSession for PyO3Session {
        fn infer(&mut self, frame: &RgbImage) -> PoseResult<FrameResult> {
            let pose = self.pose.as_ref().ok_or(PoseError::SessionClosed)?;
            let (width, height) = frame.dimensions();

            Python::with_gil(|py| {
                let bytes = PyBytes::new_bound(py, frame.as_raw());
                let array = self
                    .numpy
                    .bind(py)
                    .call_method1("frombuffer", (bytes, "uint8"))
                    .and_then(|flat| flat.call_method1("reshape", ((height, width, 3),)))
                    .map_err(inference_failed)?;

                let results = pose
                    .bind(py)
                    .call_method1("process", (array,))
                    .map_err(inference_failed)?;
                let landmarks = results.getattr("pose_landmarks").map_err(inference_failed)?;
                if landmarks.is_none() {
                    return Ok(FrameResult::no_pose());
                }

                let mut keypoints = Vec::new();
                for landmark in landmarks
                    .getattr("landmark")
                    .and_then(|list| list.iter())
                    .map_err(inference_failed)?
                {
                    let landmark = landmark.map_err(inference_failed)?;
                    let x: f32 = landmark
                        .getattr("x")
                        .and_then(|v| v.extract())
                        .map_err(inference_failed)?;
                    let y: f32 = landmark
                        .getattr("y")
                        .and_then(|v| v.extract())
                        .map_err(inference_failed)?;
                    keypoints.push(Keypoint2D::new(x, y));
                }

                Ok(FrameResult::with_pose(KeypointSet::new(keypoints)))
            })
        }

        fn close(&mut self) {
            if let Some(pose) = self.pose.take() {
                Python::with_gil(|py| {
                    if let Err(e) = pose.call_method0(py, "close") {
                        tracing::warn!("Failed to close MediaPipe pose session: {}", e);
                    }
                });
            }
        }
    }
}

// ==============================================================================
// ONNX Runtime Implementation (Pure Rust)
// ==============================================================================

#[cfg(feature = "ml-onnx")]
pub mod onnx_backend {
    use super::*;
    use crate::models::pose::{Keypoint2D, KeypointSet, PoseError, BODY_LANDMARK_COUNT};
    use image::imageops::{self, FilterType};
    use ort::{
        memory::Allocator,
        session::{builder::GraphOptimizationLevel, Session},
        value::Tensor,
    };

    /// Square input side of the BlazePose landmark model
    const INPUT_SIZE: u32 = 256;
    /// Values per landmark in the first output (x, y, z, visibility, presence)
    const LANDMARK_STRIDE: usize = 5;

    /// BlazePose-style landmark model run with ONNX Runtime
    #[derive(Debug, Clone, Copy, Default)]
    pub struct OnnxMediaPipe;

    pub struct OnnxSession {
        session: Option<Session>,
        min_presence: f32,
    }

    fn ort_failed(e: ort::Error) -> PoseError {
        PoseError::InferenceFailed(e.to_string())
    }

    impl PoseBackend for OnnxMediaPipe {
        fn open(&self, config: &EstimatorConfig) -> PoseResult<Box<dyn PoseSession>> {
            config.validate()?;

            let model_path = config.model_path.as_ref().ok_or_else(|| {
                PoseError::ModelLoadFailed("model_path is required for the ONNX backend".to_string())
            })?;

            let session = Session::builder()
                .and_then(|builder| builder.with_optimization_level(GraphOptimizationLevel::Level3))
                .and_then(|builder| builder.commit_from_file(model_path))
                .map_err(|e| {
                    PoseError::ModelLoadFailed(format!("{}: {}", model_path.display(), e))
                })?;

            tracing::debug!(model = %model_path.display(), "ONNX pose session opened");

            Ok(Box::new(OnnxSession {
                session: Some(session),
                min_presence: config.min_detection_confidence,
            }))
        }

        fn skeleton(&self) -> Skeleton {
            Skeleton::body()
        }

        fn get_model_info(&self) -> String {
            "ONNX Runtime MediaPipe Bridge (Rust native)".to_string()
        }
    }

    impl PoseSession for OnnxSession {
        fn infer(&mut self, frame: &RgbImage) -> PoseResult<FrameResult> {
            let session = self.session.as_mut().ok_or(PoseError::SessionClosed)?;

            // NHWC float input scaled to [0, 1]
            let resized = imageops::resize(frame, INPUT_SIZE, INPUT_SIZE, FilterType::Triangle);
            let shape = [1usize, INPUT_SIZE as usize, INPUT_SIZE as usize, 3];
            let mut input = Tensor::<f32>::new(&Allocator::default(), shape).map_err(ort_failed)?;
            {
                let (_, data) = input.try_extract_tensor_mut::<f32>().map_err(ort_failed)?;
                for (dst, src) in data.iter_mut().zip(resized.as_raw().iter()) {
                    *dst = *src as f32 / 255.0;
                }
            }

            let outputs = session.run(ort::inputs![input]).map_err(ort_failed)?;
            let mut values = outputs.values();
            let (landmarks, presence) = match (values.next(), values.next()) {
                (Some(landmarks), Some(presence)) => (landmarks, presence),
                _ => {
                    return Err(PoseError::InferenceFailed(
                        "expected landmark and presence outputs".to_string(),
                    ))
                }
            };

            let (_, presence) = presence.try_extract_tensor::<f32>().map_err(ort_failed)?;
            let score = presence.first().copied().map(sigmoid).unwrap_or(0.0);
            if score < self.min_presence {
                return Ok(FrameResult::no_pose());
            }

            let (_, raw) = landmarks.try_extract_tensor::<f32>().map_err(ort_failed)?;
            if raw.len() < BODY_LANDMARK_COUNT * LANDMARK_STRIDE {
                return Err(PoseError::InferenceFailed(format!(
                    "landmark output too short: {} values",
                    raw.len()
                )));
            }

            let keypoints = raw
                .chunks_exact(LANDMARK_STRIDE)
                .take(BODY_LANDMARK_COUNT)
                .map(|values| {
                    Keypoint2D::new(values[0] / INPUT_SIZE as f32, values[1] / INPUT_SIZE as f32)
                })
                .collect();

            Ok(FrameResult::with_pose(KeypointSet::new(keypoints)))
        }

        fn close(&mut self) {
            self.session = None;
        }
    }

    fn sigmoid(logit: f32) -> f32 {
        1.0 / (1.0 + (-logit).exp())
    }
}

// ==============================================================================
// Default Backend Selection
// ==============================================================================

#[cfg(feature = "ml-pyo3")]
pub type DefaultPoseBackend = pyo3_backend::PyO3MediaPipe;

#[cfg(all(feature = "ml-onnx", not(feature = "ml-pyo3")))]
pub type DefaultPoseBackend = onnx_backend::OnnxMediaPipe;

#[cfg(not(any(feature = "ml-pyo3", feature = "ml-onnx")))]
pub type DefaultPoseBackend = NullBackend;
