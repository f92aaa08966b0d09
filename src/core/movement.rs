// Movement tracking - measures how far body landmarks travel between frames

use crate::models::metrics::{round_to, DominantLimb, Metrics};
use crate::models::pose::{BodyLandmark, KeypointSet, LEFT_LIMB_LANDMARKS, RIGHT_LIMB_LANDMARKS};

/// Decimal places kept in the reported movement intensity
const INTENSITY_DECIMALS: usize = 5;

/// Running totals of landmark displacement over a video.
///
/// The accumulator is threaded through the frame loop by value: each frame
/// calls [`MovementAccumulator::observe`] and gets the updated state back, and
/// [`MovementAccumulator::finalize`] consumes it once the loop ends.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MovementAccumulator {
    pub total_displacement: f64,
    pub total_point_samples: u64,
    pub left_displacement: f64,
    pub right_displacement: f64,
    pub frames_with_pose: u64,
    pub previous_keypoints: Option<KeypointSet>,
}

impl MovementAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one frame's estimator output into the totals.
    ///
    /// Frames without a pose leave the previous keypoints in place, so a missed
    /// detection does not break tracking. A landmark-count mismatch with the
    /// previous pose skips the comparison for this frame.
    pub fn observe(mut self, keypoints: Option<&KeypointSet>) -> Self {
        let current = match keypoints {
            Some(current) => current,
            None => return self,
        };

        self.frames_with_pose += 1;

        if let Some(previous) = self.previous_keypoints.as_ref() {
            match current.displacements_from(previous) {
                Some(diffs) => {
                    self.total_displacement += diffs.iter().sum::<f64>();
                    self.total_point_samples += diffs.len() as u64;
                    self.left_displacement += side_sum(&diffs, &LEFT_LIMB_LANDMARKS);
                    self.right_displacement += side_sum(&diffs, &RIGHT_LIMB_LANDMARKS);
                }
                None => {
                    tracing::debug!(
                        previous = previous.len(),
                        current = current.len(),
                        "landmark count changed, skipping displacement"
                    );
                }
            }
        }

        self.previous_keypoints = Some(current.clone());
        self
    }

    /// Derive the final metrics
    pub fn finalize(self, frames_written: u64) -> Metrics {
        let (avg_movement_intensity, dominant_limb) = if self.total_point_samples > 0 {
            let average = self.total_displacement / self.total_point_samples as f64;
            (
                round_to(average, INTENSITY_DECIMALS),
                Some(DominantLimb::from_displacements(
                    self.left_displacement,
                    self.right_displacement,
                )),
            )
        } else {
            (0.0, None)
        };

        Metrics {
            frames_processed: frames_written,
            frames_with_pose: self.frames_with_pose,
            avg_movement_intensity,
            dominant_limb,
        }
    }
}

/// Sum the displacements of one body side, ignoring indices the model lacks
fn side_sum(diffs: &[f64], side: &[BodyLandmark]) -> f64 {
    side.iter()
        .filter_map(|landmark| diffs.get(landmark.index()))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::pose::{Keypoint2D, BODY_LANDMARK_COUNT};
    use approx::assert_relative_eq;

    fn uniform_pose(x: f32, y: f32) -> KeypointSet {
        KeypointSet::new(vec![Keypoint2D::new(x, y); BODY_LANDMARK_COUNT])
    }

    fn shift_landmarks(base: &KeypointSet, indices: &[BodyLandmark], dx: f32) -> KeypointSet {
        let mut points: Vec<Keypoint2D> = base.iter().copied().collect();
        for landmark in indices {
            points[landmark.index()].x += dx;
        }
        KeypointSet::new(points)
    }

    #[test]
    fn test_single_pose_has_no_movement() {
        let pose = uniform_pose(0.5, 0.5);
        let metrics = MovementAccumulator::new().observe(Some(&pose)).finalize(1);

        assert_eq!(metrics.frames_processed, 1);
        assert_eq!(metrics.frames_with_pose, 1);
        assert_eq!(metrics.avg_movement_intensity, 0.0);
        assert_eq!(metrics.dominant_limb, None);
    }

    #[test]
    fn test_uniform_shift_intensity() {
        let first = uniform_pose(0.1, 0.5);
        let second = uniform_pose(0.2, 0.5);

        let acc = MovementAccumulator::new()
            .observe(Some(&first))
            .observe(Some(&second));

        assert_eq!(acc.total_point_samples, BODY_LANDMARK_COUNT as u64);
        assert_relative_eq!(acc.total_displacement, 0.1 * 33.0, epsilon = 1e-5);

        let metrics = acc.finalize(2);
        assert_relative_eq!(metrics.avg_movement_intensity, 0.1, epsilon = 1e-5);
        // Every joint moved by the same amount on both sides
        assert_eq!(metrics.dominant_limb, Some(DominantLimb::Right));
    }

    #[test]
    fn test_left_side_dominates() {
        let base = uniform_pose(0.5, 0.5);
        let moved = shift_landmarks(&base, &LEFT_LIMB_LANDMARKS, 0.05);

        let acc = MovementAccumulator::new()
            .observe(Some(&base))
            .observe(Some(&moved));

        assert_relative_eq!(acc.left_displacement, 0.3, epsilon = 1e-5);
        assert_eq!(acc.right_displacement, 0.0);
        assert_eq!(acc.finalize(2).dominant_limb, Some(DominantLimb::Left));
    }

    #[test]
    fn test_missed_frame_keeps_previous_pose() {
        let first = uniform_pose(0.1, 0.1);
        let third = uniform_pose(0.1, 0.3);

        let acc = MovementAccumulator::new()
            .observe(Some(&first))
            .observe(None)
            .observe(Some(&third));

        assert_eq!(acc.frames_with_pose, 2);
        assert_eq!(acc.total_point_samples, 33);
        assert_relative_eq!(acc.total_displacement, 0.2 * 33.0, epsilon = 1e-5);
    }

    #[test]
    fn test_landmark_count_mismatch_skips_comparison() {
        let full = uniform_pose(0.1, 0.1);
        let partial = KeypointSet::new(vec![Keypoint2D::new(0.9, 0.9); 17]);

        let acc = MovementAccumulator::new()
            .observe(Some(&full))
            .observe(Some(&partial));

        assert_eq!(acc.frames_with_pose, 2);
        assert_eq!(acc.total_point_samples, 0);
        assert_eq!(acc.previous_keypoints.as_ref().map(|k| k.len()), Some(17));

        let metrics = acc.finalize(2);
        assert_eq!(metrics.avg_movement_intensity, 0.0);
        assert_eq!(metrics.dominant_limb, None);
    }

    #[test]
    fn test_short_keypoint_sets_ignore_missing_limbs() {
        let first = KeypointSet::from_pairs(&[(0.0, 0.0); 12]);
        let second = KeypointSet::from_pairs(&[(0.0, 0.5); 12]);

        let acc = MovementAccumulator::new()
            .observe(Some(&first))
            .observe(Some(&second));

        // Only the left shoulder (11) exists in a 12-point set
        assert_relative_eq!(acc.left_displacement, 0.5, epsilon = 1e-6);
        assert_eq!(acc.right_displacement, 0.0);
    }

    #[test]
    fn test_no_poses_at_all() {
        let metrics = (0..10)
            .fold(MovementAccumulator::new(), |acc, _| acc.observe(None))
            .finalize(10);

        assert_eq!(metrics.frames_processed, 10);
        assert_eq!(metrics.frames_with_pose, 0);
        assert_eq!(metrics.avg_movement_intensity, 0.0);
        assert!(metrics.dominant_limb.is_none());
    }
}
